//! Report module - dashboard queries and console tables

mod queries;

pub use queries::{
    AgeGroupRevenue, DashboardReport, GenderRevenue, ItemRating, ReportClient, SampleRows,
    SubscriptionSpend, SAMPLE_LIMIT, TOP_ITEMS_LIMIT,
};

use crate::store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Failed to decode row: {0}")]
    Decode(#[from] sqlx::Error),
}

/// Render rows as a plain text table with left-aligned columns.
pub fn format_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let line = |cells: Vec<&str>| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let mut out = vec![line(headers.to_vec())];
    out.push(
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    for row in rows {
        out.push(line(row.iter().map(String::as_str).collect()));
    }
    out.join("\n")
}

impl DashboardReport {
    /// Console rendering of every section.
    pub fn to_text(&self) -> String {
        let mut sections = Vec::new();

        sections.push(String::from("1. Total Revenue by Gender"));
        if self.gender_filter.is_empty() {
            sections.push(String::from("Please select at least one gender."));
        } else {
            let rows: Vec<Vec<String>> = self
                .revenue_by_gender
                .iter()
                .map(|r| vec![r.gender.clone().unwrap_or_default(), format!("{:.2}", r.revenue)])
                .collect();
            sections.push(format_table(&["gender", "revenue"], &rows));
        }

        sections.push(String::from("\n2. Top 5 Products by Rating"));
        let rows: Vec<Vec<String>> = self
            .top_rated_items
            .iter()
            .map(|r| {
                vec![
                    r.item_purchased.clone().unwrap_or_default(),
                    format!("{:.2}", r.avg_rating),
                ]
            })
            .collect();
        sections.push(format_table(&["item_purchased", "avg_rating"], &rows));

        sections.push(String::from("\n3. Subscription Status vs Spending"));
        let rows: Vec<Vec<String>> = self
            .subscription_spend
            .iter()
            .map(|r| {
                vec![
                    r.subscription_status.clone().unwrap_or_default(),
                    r.total_customers.to_string(),
                    format!("{:.2}", r.avg_spend),
                    format!("{:.2}", r.total_revenue),
                ]
            })
            .collect();
        sections.push(format_table(
            &["subscription_status", "total_customers", "avg_spend", "total_revenue"],
            &rows,
        ));

        sections.push(String::from("\n4. Revenue by Age Group"));
        let rows: Vec<Vec<String>> = self
            .revenue_by_age_group
            .iter()
            .map(|r| {
                vec![
                    r.age_group.clone().unwrap_or_default(),
                    format!("{:.2}", r.total_revenue),
                ]
            })
            .collect();
        sections.push(format_table(&["age_group", "total_revenue"], &rows));

        if let Some(sample) = &self.sample {
            sections.push(String::from("\nRaw Data Sample"));
            let headers: Vec<&str> = sample.columns.iter().map(String::as_str).collect();
            sections.push(format_table(&headers, &sample.rows));
        }

        sections.join("\n")
    }
}
