//! Customer table schema: column names, labels and lookup tables.

/// Destination table written by the pipeline and read by the dashboard.
pub const TABLE_NAME: &str = "customer";

pub const CUSTOMER_ID: &str = "customer_id";
pub const AGE: &str = "age";
pub const GENDER: &str = "gender";
pub const ITEM_PURCHASED: &str = "item_purchased";
pub const CATEGORY: &str = "category";
pub const PURCHASE_AMOUNT: &str = "purchase_amount";
pub const REVIEW_RATING: &str = "review_rating";
pub const SUBSCRIPTION_STATUS: &str = "subscription_status";
pub const FREQUENCY_OF_PURCHASES: &str = "frequency_of_purchases";
pub const DISCOUNT_APPLIED: &str = "discount_applied";
pub const PROMO_CODE_USED: &str = "promo_code_used";

pub const AGE_GROUP: &str = "age_group";
pub const PURCHASE_FREQUENCY_DAYS: &str = "purchase_frequency_days";

/// Normalized prefix of the currency column, e.g. `purchase_amount_(usd)`.
const PURCHASE_AMOUNT_UNIT_PREFIX: &str = "purchase_amount_(";

/// Age buckets in increasing age order.
pub const AGE_GROUP_LABELS: [&str; 4] = ["Young Adult", "Adult", "Middle-aged", "Senior"];

/// Purchase frequency label to day count.
pub const FREQUENCY_DAYS: [(&str, i64); 7] = [
    ("Weekly", 7),
    ("Fortnightly", 14),
    ("Bi-Weekly", 14),
    ("Monthly", 30),
    ("Quarterly", 90),
    ("Every 3 Months", 90),
    ("Annually", 365),
];

/// Lowercase a header and replace spaces with underscores.
pub fn snake_case_header(name: &str) -> String {
    name.to_lowercase().replace(' ', "_")
}

/// Final column name for a raw CSV header.
pub fn normalize_header(name: &str) -> String {
    let snake = snake_case_header(name);
    if snake.starts_with(PURCHASE_AMOUNT_UNIT_PREFIX) && snake.ends_with(')') {
        PURCHASE_AMOUNT.to_string()
    } else {
        snake
    }
}

/// Day count for a frequency label; exact match only.
pub fn frequency_days(label: &str) -> Option<i64> {
    FREQUENCY_DAYS
        .iter()
        .find(|(name, _)| *name == label)
        .map(|(_, days)| *days)
}
