//! Static Chart Renderer
//! Writes the dashboard charts as PNG bar charts plus a JSON dump of the report.
//!
//! Charts:
//! 1. Revenue by gender
//! 2. Highest rated products
//! 3. Average spend per subscription status
//! 4. Total revenue per subscription status
//! 5. Revenue by age group

use crate::report::DashboardReport;
use plotters::prelude::*;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const WIDTH: u32 = 900;
const HEIGHT: u32 = 540;

pub const PALETTE: [RGBColor; 10] = [
    RGBColor(52, 152, 219),  // Blue
    RGBColor(231, 76, 60),   // Red
    RGBColor(46, 204, 113),  // Green
    RGBColor(155, 89, 182),  // Purple
    RGBColor(243, 156, 18),  // Orange
    RGBColor(26, 188, 156),  // Teal
    RGBColor(233, 30, 99),   // Pink
    RGBColor(0, 188, 212),   // Cyan
    RGBColor(121, 85, 72),   // Brown
    RGBColor(96, 125, 139),  // Blue Grey
];

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Drawing error: {0}")]
    Draw(String),
}

/// One bar chart: a label and a value per bar.
#[derive(Debug, Clone, PartialEq)]
pub struct BarChart {
    pub file_name: &'static str,
    pub title: &'static str,
    pub x_desc: &'static str,
    pub y_desc: &'static str,
    pub bars: Vec<(String, f64)>,
}

pub struct DashboardRenderer;

impl DashboardRenderer {
    /// Charts for every non-empty report section.
    pub fn charts_for(report: &DashboardReport) -> Vec<BarChart> {
        let charts = vec![
            BarChart {
                file_name: "revenue_by_gender.png",
                title: "Revenue Share by Gender",
                x_desc: "gender",
                y_desc: "revenue",
                bars: report
                    .revenue_by_gender
                    .iter()
                    .map(|r| (group_label(&r.gender), r.revenue))
                    .collect(),
            },
            BarChart {
                file_name: "top_rated_items.png",
                title: "Highest Rated Products",
                x_desc: "item_purchased",
                y_desc: "avg_rating",
                bars: report
                    .top_rated_items
                    .iter()
                    .map(|r| (group_label(&r.item_purchased), r.avg_rating))
                    .collect(),
            },
            BarChart {
                file_name: "subscription_avg_spend.png",
                title: "Average Spend per Customer",
                x_desc: "subscription_status",
                y_desc: "avg_spend",
                bars: report
                    .subscription_spend
                    .iter()
                    .map(|r| (group_label(&r.subscription_status), r.avg_spend))
                    .collect(),
            },
            BarChart {
                file_name: "subscription_total_revenue.png",
                title: "Total Revenue Contribution",
                x_desc: "subscription_status",
                y_desc: "total_revenue",
                bars: report
                    .subscription_spend
                    .iter()
                    .map(|r| (group_label(&r.subscription_status), r.total_revenue))
                    .collect(),
            },
            BarChart {
                file_name: "revenue_by_age_group.png",
                title: "Revenue Distribution by Age",
                x_desc: "age_group",
                y_desc: "total_revenue",
                bars: report
                    .revenue_by_age_group
                    .iter()
                    .map(|r| (group_label(&r.age_group), r.total_revenue))
                    .collect(),
            },
        ];

        charts.into_iter().filter(|c| !c.bars.is_empty()).collect()
    }

    /// Write `report.json` and every chart into `out_dir`, charts in parallel.
    pub fn render(report: &DashboardReport, out_dir: &Path) -> Result<Vec<PathBuf>, RenderError> {
        fs::create_dir_all(out_dir)?;

        let json_path = out_dir.join("report.json");
        fs::write(&json_path, serde_json::to_string_pretty(report)?)?;

        let charts = Self::charts_for(report);
        let mut written: Vec<PathBuf> = charts
            .par_iter()
            .map(|chart| {
                let path = out_dir.join(chart.file_name);
                Self::render_bar_chart(chart, &path).map(|_| path)
            })
            .collect::<Result<_, _>>()?;

        written.insert(0, json_path);
        Ok(written)
    }

    /// Draw one bar chart to a PNG file.
    pub fn render_bar_chart(chart: &BarChart, path: &Path) -> Result<(), RenderError> {
        let labels: Vec<String> = chart.bars.iter().map(|(label, _)| label.clone()).collect();
        let y_max = Self::y_upper_bound(&chart.bars);

        let root = BitMapBackend::new(path, (WIDTH, HEIGHT)).into_drawing_area();
        root.fill(&WHITE).map_err(draw_err)?;

        let mut ctx = ChartBuilder::on(&root)
            .caption(chart.title, ("sans-serif", 24.0))
            .margin(15)
            .x_label_area_size(45)
            .y_label_area_size(70)
            .build_cartesian_2d((0..labels.len()).into_segmented(), 0f64..y_max)
            .map_err(draw_err)?;

        ctx.configure_mesh()
            .disable_x_mesh()
            .x_desc(chart.x_desc)
            .y_desc(chart.y_desc)
            .x_labels(labels.len())
            .x_label_formatter(&|v: &SegmentValue<usize>| match v {
                SegmentValue::CenterOf(i) => labels.get(*i).cloned().unwrap_or_default(),
                _ => String::new(),
            })
            .draw()
            .map_err(draw_err)?;

        ctx.draw_series(chart.bars.iter().enumerate().map(|(i, (_, value))| {
            let color = PALETTE[i % PALETTE.len()];
            let mut bar = Rectangle::new(
                [(SegmentValue::Exact(i), 0.0), (SegmentValue::Exact(i + 1), *value)],
                color.filled(),
            );
            bar.set_margin(0, 0, 8, 8);
            bar
        }))
        .map_err(draw_err)?;

        root.present().map_err(draw_err)?;
        Ok(())
    }

    /// Top of the y axis: 10% headroom over the largest bar.
    fn y_upper_bound(bars: &[(String, f64)]) -> f64 {
        let max = bars
            .iter()
            .map(|(_, v)| *v)
            .filter(|v| v.is_finite())
            .fold(0.0_f64, f64::max);
        if max > 0.0 {
            max * 1.1
        } else {
            1.0
        }
    }
}

/// Bar label for a group key; NULL keys get their own bar.
fn group_label(key: &Option<String>) -> String {
    key.clone().unwrap_or_else(|| "n/a".to_string())
}

fn draw_err<E: std::fmt::Display>(err: E) -> RenderError {
    RenderError::Draw(err.to_string())
}
