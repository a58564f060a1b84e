//! Read-only aggregate queries over the `customer` table.

use super::ReportError;
use crate::data::schema::TABLE_NAME;
use crate::settings::Destination;
use crate::store::SqlStore;
use serde::Serialize;
use sqlx::any::AnyRow;
use sqlx::{Column, Row};
use tracing::info;

pub const TOP_ITEMS_LIMIT: usize = 5;
pub const SAMPLE_LIMIT: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenderRevenue {
    pub gender: Option<String>,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemRating {
    pub item_purchased: Option<String>,
    pub avg_rating: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubscriptionSpend {
    pub subscription_status: Option<String>,
    pub total_customers: i64,
    pub avg_spend: f64,
    pub total_revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgeGroupRevenue {
    pub age_group: Option<String>,
    pub total_revenue: f64,
}

/// Raw rows rendered as text.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SampleRows {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Every dashboard section in one value.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardReport {
    pub gender_filter: Vec<String>,
    pub revenue_by_gender: Vec<GenderRevenue>,
    pub top_rated_items: Vec<ItemRating>,
    pub subscription_spend: Vec<SubscriptionSpend>,
    pub revenue_by_age_group: Vec<AgeGroupRevenue>,
    pub sample: Option<SampleRows>,
}

/// Issues the dashboard queries against one store connection.
pub struct ReportClient {
    store: SqlStore,
}

impl ReportClient {
    pub fn new(store: SqlStore) -> Self {
        Self { store }
    }

    pub fn connect(destination: &Destination) -> Result<Self, ReportError> {
        Ok(Self::new(SqlStore::connect(destination)?))
    }

    /// Run every query in order, stopping at the first failure.
    pub fn build_dashboard(
        &mut self,
        genders: &[String],
        sample: Option<usize>,
    ) -> Result<DashboardReport, ReportError> {
        let revenue_by_gender = self.revenue_by_gender(genders)?;
        let top_rated_items = self.top_rated_items(TOP_ITEMS_LIMIT)?;
        let subscription_spend = self.subscription_spend()?;
        let revenue_by_age_group = self.revenue_by_age_group()?;
        let sample = match sample {
            Some(limit) => Some(self.sample_rows(limit)?),
            None => None,
        };

        Ok(DashboardReport {
            gender_filter: genders.to_vec(),
            revenue_by_gender,
            top_rated_items,
            subscription_spend,
            revenue_by_age_group,
            sample,
        })
    }

    /// Total revenue per gender, restricted to `genders`.
    pub fn revenue_by_gender(&mut self, genders: &[String]) -> Result<Vec<GenderRevenue>, ReportError> {
        if genders.is_empty() {
            info!("No gender selected, skipping revenue by gender");
            return Ok(Vec::new());
        }

        let placeholders = self.store.dialect().placeholders(1, genders.len());
        let sql = format!(
            "SELECT gender, SUM(purchase_amount) AS revenue FROM {} \
             WHERE gender IN ({}) GROUP BY gender ORDER BY gender",
            TABLE_NAME, placeholders
        );

        self.store
            .fetch_all(&sql, genders)?
            .iter()
            .map(|row| -> Result<GenderRevenue, ReportError> {
                Ok(GenderRevenue {
                    gender: row.try_get("gender")?,
                    revenue: row.try_get::<Option<f64>, _>("revenue")?.unwrap_or(0.0),
                })
            })
            .collect()
    }

    /// Items with the highest mean review rating.
    pub fn top_rated_items(&mut self, limit: usize) -> Result<Vec<ItemRating>, ReportError> {
        let sql = format!(
            "SELECT item_purchased, AVG(review_rating) AS avg_rating FROM {} \
             WHERE review_rating IS NOT NULL GROUP BY item_purchased \
             ORDER BY avg_rating DESC LIMIT {}",
            TABLE_NAME, limit
        );

        self.store
            .fetch_all(&sql, &[])?
            .iter()
            .map(|row| -> Result<ItemRating, ReportError> {
                Ok(ItemRating {
                    item_purchased: row.try_get("item_purchased")?,
                    avg_rating: round2(row.try_get("avg_rating")?),
                })
            })
            .collect()
    }

    /// Customer count, mean spend and revenue per subscription status.
    pub fn subscription_spend(&mut self) -> Result<Vec<SubscriptionSpend>, ReportError> {
        let sql = format!(
            "SELECT subscription_status, COUNT(customer_id) AS total_customers, \
             AVG(purchase_amount) AS avg_spend, SUM(purchase_amount) AS total_revenue \
             FROM {} GROUP BY subscription_status ORDER BY subscription_status",
            TABLE_NAME
        );

        self.store
            .fetch_all(&sql, &[])?
            .iter()
            .map(|row| -> Result<SubscriptionSpend, ReportError> {
                Ok(SubscriptionSpend {
                    subscription_status: row.try_get("subscription_status")?,
                    total_customers: row.try_get("total_customers")?,
                    avg_spend: round2(row.try_get::<Option<f64>, _>("avg_spend")?.unwrap_or(0.0)),
                    total_revenue: round2(
                        row.try_get::<Option<f64>, _>("total_revenue")?.unwrap_or(0.0),
                    ),
                })
            })
            .collect()
    }

    /// Total revenue per age group, largest first.
    pub fn revenue_by_age_group(&mut self) -> Result<Vec<AgeGroupRevenue>, ReportError> {
        let sql = format!(
            "SELECT age_group, SUM(purchase_amount) AS total_revenue FROM {} \
             GROUP BY age_group ORDER BY total_revenue DESC",
            TABLE_NAME
        );

        self.store
            .fetch_all(&sql, &[])?
            .iter()
            .map(|row| -> Result<AgeGroupRevenue, ReportError> {
                Ok(AgeGroupRevenue {
                    age_group: row.try_get("age_group")?,
                    total_revenue: row.try_get::<Option<f64>, _>("total_revenue")?.unwrap_or(0.0),
                })
            })
            .collect()
    }

    /// First `limit` raw rows of the table.
    pub fn sample_rows(&mut self, limit: usize) -> Result<SampleRows, ReportError> {
        let sql = format!("SELECT * FROM {} LIMIT {}", TABLE_NAME, limit);
        let rows = self.store.fetch_all(&sql, &[])?;

        let columns = rows
            .first()
            .map(|row| row.columns().iter().map(|c| c.name().to_string()).collect())
            .unwrap_or_default();
        let rows = rows
            .iter()
            .map(|row| (0..row.len()).map(|idx| cell_text(row, idx)).collect())
            .collect();

        Ok(SampleRows { columns, rows })
    }

    pub fn close(self) -> Result<(), ReportError> {
        Ok(self.store.close()?)
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn cell_text(row: &AnyRow, idx: usize) -> String {
    if let Ok(v) = row.try_get::<Option<String>, _>(idx) {
        return v.unwrap_or_default();
    }
    if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
        return v.map(|v| v.to_string()).unwrap_or_default();
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(idx) {
        return v.map(|v| v.to_string()).unwrap_or_default();
    }
    if let Ok(v) = row.try_get::<Option<bool>, _>(idx) {
        return v.map(|v| v.to_string()).unwrap_or_default();
    }
    String::new()
}
