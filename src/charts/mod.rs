//! Charts module - Chart rendering

mod renderer;

pub use renderer::{BarChart, DashboardRenderer, RenderError, PALETTE};
