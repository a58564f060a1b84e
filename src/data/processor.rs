//! Data Processor Module
//! Cleaning and enrichment steps applied to the customer behavior export.

use crate::data::schema::{
    frequency_days, normalize_header, snake_case_header, AGE, AGE_GROUP, AGE_GROUP_LABELS,
    CATEGORY, DISCOUNT_APPLIED, FREQUENCY_OF_PURCHASES, PROMO_CODE_USED, PURCHASE_AMOUNT,
    PURCHASE_FREQUENCY_DAYS, REVIEW_RATING,
};
use crate::stats::StatsCalculator;
use polars::prelude::*;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("Missing required column: {0}")]
    MissingColumn(String),
    #[error("Age quartile edges must be unique, got {0:?}")]
    NonUniqueAgeEdges(Vec<f64>),
}

/// Result of the full cleaning pass.
#[derive(Debug, Clone)]
pub struct TransformOutcome {
    pub df: DataFrame,
    pub imputed_ratings: usize,
    pub promo_code_dropped: bool,
}

/// Handles data cleaning and transformation operations.
pub struct DataProcessor;

impl DataProcessor {
    /// Run every cleaning step in order.
    pub fn transform(df: DataFrame) -> Result<TransformOutcome, ProcessorError> {
        let (df, imputed_ratings) = Self::impute_ratings_by_category(df)?;
        let df = Self::normalize_column_names(df)?;
        let df = Self::add_age_group(df)?;
        let df = Self::add_purchase_frequency_days(df)?;
        let (df, promo_code_dropped) = Self::drop_redundant_promo_column(df)?;

        info!(rows = df.height(), columns = df.width(), "Final shape");
        Ok(TransformOutcome {
            df,
            imputed_ratings,
            promo_code_dropped,
        })
    }

    /// Fill missing review ratings with the median rating of the row's category.
    ///
    /// Categories without any observed rating, and rows without a category,
    /// keep their missing values. Returns the number of imputed cells.
    pub fn impute_ratings_by_category(
        mut df: DataFrame,
    ) -> Result<(DataFrame, usize), ProcessorError> {
        let rating_name = Self::find_column(&df, REVIEW_RATING)?;
        let category_name = Self::find_column(&df, CATEGORY)?;

        let ratings_f64 = df.column(&rating_name)?.cast(&DataType::Float64)?;
        let ratings: Vec<Option<f64>> = ratings_f64
            .f64()?
            .into_iter()
            .map(|r| r.filter(|v| !v.is_nan()))
            .collect();

        if ratings.iter().all(Option::is_some) {
            return Ok((df, 0));
        }
        info!("Imputing missing review ratings");

        let categories_str = df.column(&category_name)?.cast(&DataType::String)?;
        let categories: Vec<Option<&str>> = categories_str.str()?.into_iter().collect();

        // Group observed ratings by category
        let mut observed: HashMap<&str, Vec<f64>> = HashMap::new();
        for (category, rating) in categories.iter().zip(&ratings) {
            if let (Some(category), Some(rating)) = (category, rating) {
                observed.entry(*category).or_default().push(*rating);
            }
        }

        let medians: HashMap<&str, f64> = observed
            .iter()
            .filter_map(|(category, values)| {
                StatsCalculator::median(values).map(|m| (*category, m))
            })
            .collect();
        debug!(?medians, "Per-category rating medians");

        // Scatter medians back onto the missing cells
        let mut imputed = 0usize;
        let filled: Vec<Option<f64>> = ratings
            .iter()
            .zip(&categories)
            .map(|(rating, category)| match (rating, category) {
                (Some(r), _) => Some(*r),
                (None, Some(category)) => {
                    let median = medians.get(category).copied();
                    if median.is_some() {
                        imputed += 1;
                    }
                    median
                }
                (None, None) => None,
            })
            .collect();

        let remaining = filled.iter().filter(|r| r.is_none()).count();
        if remaining > 0 {
            warn!(remaining, "Review ratings still missing after imputation");
        }

        df.with_column(Column::new(rating_name.as_str().into(), filled))?;
        Ok((df, imputed))
    }

    /// Snake-case every header and give the currency column its canonical name.
    pub fn normalize_column_names(mut df: DataFrame) -> Result<DataFrame, ProcessorError> {
        info!("Renaming columns");
        let names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();

        for name in names {
            let normalized = normalize_header(&name);
            if normalized != name {
                df.rename(&name, normalized.as_str().into())?;
            }
        }

        if let Ok(amount) = df.column(PURCHASE_AMOUNT) {
            let amount = amount.cast(&DataType::Float64)?;
            df.with_column(amount)?;
        }

        Ok(df)
    }

    /// Bucket `age` into its quartiles.
    pub fn add_age_group(mut df: DataFrame) -> Result<DataFrame, ProcessorError> {
        info!("Creating age_group column");
        let ages_f64 = Self::require(&df, AGE)?.cast(&DataType::Float64)?;
        let ages: Vec<Option<f64>> = ages_f64.f64()?.into_iter().collect();
        let observed: Vec<f64> = ages.iter().flatten().copied().collect();

        let groups: Vec<Option<&str>> = match StatsCalculator::quartile_edges(&observed) {
            None => vec![None; ages.len()],
            Some(edges) => {
                if !StatsCalculator::edges_are_unique(&edges) {
                    return Err(ProcessorError::NonUniqueAgeEdges(edges.to_vec()));
                }
                debug!(?edges, "Age quartile edges");
                ages.iter()
                    .map(|age| {
                        age.and_then(|a| StatsCalculator::bin_index(&edges, a))
                            .map(|idx| AGE_GROUP_LABELS[idx])
                    })
                    .collect()
            }
        };

        df.with_column(Column::new(AGE_GROUP.into(), groups))?;
        Ok(df)
    }

    /// Map the purchase frequency label to a day count.
    pub fn add_purchase_frequency_days(mut df: DataFrame) -> Result<DataFrame, ProcessorError> {
        info!("Creating purchase_frequency_days column");
        let labels = Self::require(&df, FREQUENCY_OF_PURCHASES)?.cast(&DataType::String)?;
        let labels_ca = labels.str()?;

        let days: Vec<Option<i64>> = labels_ca
            .into_iter()
            .map(|label| label.and_then(frequency_days))
            .collect();

        let unmapped = labels_ca
            .into_iter()
            .zip(&days)
            .filter(|(label, day)| label.is_some() && day.is_none())
            .count();
        if unmapped > 0 {
            warn!(unmapped, "Unmapped purchase frequency labels");
        }

        df.with_column(Column::new(PURCHASE_FREQUENCY_DAYS.into(), days))?;
        Ok(df)
    }

    /// Drop `promo_code_used` when it repeats `discount_applied` on every row.
    pub fn drop_redundant_promo_column(
        df: DataFrame,
    ) -> Result<(DataFrame, bool), ProcessorError> {
        if df.column(DISCOUNT_APPLIED).is_err() || df.column(PROMO_CODE_USED).is_err() {
            return Ok((df, false));
        }

        let discount = df.column(DISCOUNT_APPLIED)?.cast(&DataType::String)?;
        let promo = df.column(PROMO_CODE_USED)?.cast(&DataType::String)?;
        let identical = discount
            .str()?
            .into_iter()
            .zip(promo.str()?.into_iter())
            .all(|pair| matches!(pair, (Some(a), Some(b)) if a == b));

        if identical {
            info!("Dropping redundant 'promo_code_used' column");
            Ok((df.drop(PROMO_CODE_USED)?, true))
        } else {
            Ok((df, false))
        }
    }

    /// Header whose snake-cased form equals `target`.
    fn find_column(df: &DataFrame, target: &str) -> Result<String, ProcessorError> {
        df.get_column_names()
            .iter()
            .map(|s| s.to_string())
            .find(|name| snake_case_header(name) == target)
            .ok_or_else(|| ProcessorError::MissingColumn(target.to_string()))
    }

    fn require<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Column, ProcessorError> {
        df.column(name)
            .map_err(|_| ProcessorError::MissingColumn(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ratings(df: &DataFrame, name: &str) -> Vec<Option<f64>> {
        df.column(name).unwrap().f64().unwrap().into_iter().collect()
    }

    fn strings(df: &DataFrame, name: &str) -> Vec<Option<String>> {
        df.column(name)
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .map(|s| s.map(str::to_string))
            .collect()
    }

    #[test]
    fn imputes_with_median_of_own_category() {
        let df = df!(
            "Category" => &["A", "A", "A", "B", "B", "B"],
            "Review Rating" => &[Some(3.0), Some(5.0), None, Some(2.0), Some(2.0), None]
        )
        .unwrap();

        let (out, imputed) = DataProcessor::impute_ratings_by_category(df).unwrap();
        assert_eq!(imputed, 2);
        assert_eq!(
            ratings(&out, "Review Rating"),
            vec![Some(3.0), Some(5.0), Some(4.0), Some(2.0), Some(2.0), Some(2.0)]
        );
    }

    #[test]
    fn imputation_does_not_use_global_median() {
        let df = df!(
            "Category" => &["A", "A", "A", "B", "B", "B", "B"],
            "Review Rating" => &[Some(1.0), Some(1.0), None, Some(9.0), Some(9.0), Some(9.0), Some(9.0)]
        )
        .unwrap();

        let (out, _) = DataProcessor::impute_ratings_by_category(df).unwrap();
        assert_eq!(ratings(&out, "Review Rating")[2], Some(1.0));
    }

    #[test]
    fn unrated_category_and_missing_category_stay_missing() {
        let df = df!(
            "Category" => &[Some("A"), Some("A"), Some("C"), None],
            "Review Rating" => &[Some(4.0), None, None, None]
        )
        .unwrap();

        let (out, imputed) = DataProcessor::impute_ratings_by_category(df).unwrap();
        assert_eq!(imputed, 1);
        assert_eq!(
            ratings(&out, "Review Rating"),
            vec![Some(4.0), Some(4.0), None, None]
        );
    }

    #[test]
    fn complete_ratings_are_untouched() {
        let df = df!(
            "Category" => &["A", "B"],
            "Review Rating" => &[3.1, 4.2]
        )
        .unwrap();

        let (out, imputed) = DataProcessor::impute_ratings_by_category(df).unwrap();
        assert_eq!(imputed, 0);
        assert_eq!(ratings(&out, "Review Rating"), vec![Some(3.1), Some(4.2)]);
    }

    #[test]
    fn missing_rating_column_is_an_error() {
        let df = df!("Category" => &["A"]).unwrap();
        let err = DataProcessor::impute_ratings_by_category(df).unwrap_err();
        assert!(matches!(err, ProcessorError::MissingColumn(c) if c == REVIEW_RATING));
    }

    #[test]
    fn column_names_are_normalized() {
        let df = df!(
            "Customer ID" => &[1i64, 2],
            "Purchase Amount (USD)" => &[53i64, 64],
            "Frequency of Purchases" => &["Weekly", "Annually"]
        )
        .unwrap();

        let out = DataProcessor::normalize_column_names(df).unwrap();
        let names: Vec<String> = out
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(
            names,
            vec!["customer_id", "purchase_amount", "frequency_of_purchases"]
        );
        assert_eq!(
            out.column("purchase_amount").unwrap().dtype(),
            &DataType::Float64
        );
    }

    #[test]
    fn age_groups_follow_data_quartiles() {
        let ages: Vec<i64> = vec![18, 70, 25, 33, 41, 52, 64, 19, 45, 38, 29, 60];
        let df = df!("age" => &ages).unwrap();

        let out = DataProcessor::add_age_group(df).unwrap();
        let groups = strings(&out, AGE_GROUP);

        let as_f64: Vec<f64> = ages.iter().map(|a| *a as f64).collect();
        let edges = StatsCalculator::quartile_edges(&as_f64).unwrap();

        for (age, group) in ages.iter().zip(&groups) {
            let idx = StatsCalculator::bin_index(&edges, *age as f64).unwrap();
            assert_eq!(group.as_deref(), Some(AGE_GROUP_LABELS[idx]));
        }
        assert!(groups.iter().all(Option::is_some));

        // Label order follows increasing age
        let rank = |label: &str| AGE_GROUP_LABELS.iter().position(|l| *l == label).unwrap();
        let mut pairs: Vec<(i64, usize)> = ages
            .iter()
            .zip(&groups)
            .map(|(a, g)| (*a, rank(g.as_deref().unwrap())))
            .collect();
        pairs.sort();
        assert!(pairs.windows(2).all(|w| w[0].1 <= w[1].1));
        assert_eq!(pairs.first().unwrap().1, 0);
        assert_eq!(pairs.last().unwrap().1, 3);
    }

    #[test]
    fn missing_age_gives_missing_group() {
        let df = df!("age" => &[Some(20i64), None, Some(30), Some(40), Some(50), Some(60)]).unwrap();
        let out = DataProcessor::add_age_group(df).unwrap();
        let groups = strings(&out, AGE_GROUP);
        assert_eq!(groups[1], None);
        assert_eq!(groups.iter().filter(|g| g.is_some()).count(), 5);
    }

    #[test]
    fn duplicate_age_edges_fail() {
        let df = df!("age" => &[30i64, 30, 30, 30, 40]).unwrap();
        let err = DataProcessor::add_age_group(df).unwrap_err();
        assert!(matches!(err, ProcessorError::NonUniqueAgeEdges(_)));
    }

    #[test]
    fn frequency_days_lookup_with_unmapped_labels() {
        let df = df!(
            "frequency_of_purchases" => &[Some("Weekly"), Some("Fortnightly"), Some("Every 3 Months"), Some("Daily"), None]
        )
        .unwrap();

        let out = DataProcessor::add_purchase_frequency_days(df).unwrap();
        let days: Vec<Option<i64>> = out
            .column(PURCHASE_FREQUENCY_DAYS)
            .unwrap()
            .i64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(days, vec![Some(7), Some(14), Some(90), None, None]);
    }

    #[test]
    fn identical_promo_column_is_dropped() {
        let flags: Vec<&str> = (0..100).map(|i| if i % 3 == 0 { "Yes" } else { "No" }).collect();
        let df = df!(
            "discount_applied" => &flags,
            "promo_code_used" => &flags
        )
        .unwrap();

        let (out, dropped) = DataProcessor::drop_redundant_promo_column(df).unwrap();
        assert!(dropped);
        assert!(out.column(PROMO_CODE_USED).is_err());
        assert_eq!(out.height(), 100);
    }

    #[test]
    fn one_differing_row_keeps_promo_column() {
        let flags: Vec<&str> = (0..100).map(|i| if i % 3 == 0 { "Yes" } else { "No" }).collect();
        let mut promo = flags.clone();
        promo[58] = "Yes";
        assert_ne!(flags[58], promo[58]);
        let df = df!(
            "discount_applied" => &flags,
            "promo_code_used" => &promo
        )
        .unwrap();

        let (out, dropped) = DataProcessor::drop_redundant_promo_column(df).unwrap();
        assert!(!dropped);
        assert!(out.column(PROMO_CODE_USED).is_ok());
    }

    #[test]
    fn missing_flags_never_compare_equal() {
        let df = df!(
            "discount_applied" => &[Some("Yes"), None],
            "promo_code_used" => &[Some("Yes"), None]
        )
        .unwrap();

        let (_, dropped) = DataProcessor::drop_redundant_promo_column(df).unwrap();
        assert!(!dropped);
    }

    #[test]
    fn absent_promo_column_is_a_no_op() {
        let df = df!("discount_applied" => &["Yes", "No"]).unwrap();
        let (out, dropped) = DataProcessor::drop_redundant_promo_column(df).unwrap();
        assert!(!dropped);
        assert_eq!(out.width(), 1);
    }

    #[test]
    fn transform_keeps_rows_and_adds_derived_columns() {
        let df = df!(
            "Customer ID" => &[1i64, 2, 3, 4, 5, 6],
            "Age" => &[21i64, 34, 47, 55, 62, 29],
            "Category" => &["A", "A", "A", "B", "B", "B"],
            "Purchase Amount (USD)" => &[10i64, 20, 30, 40, 50, 60],
            "Review Rating" => &[Some(3.0), Some(5.0), None, Some(2.0), Some(2.0), None],
            "Frequency of Purchases" => &["Weekly", "Monthly", "Quarterly", "Annually", "Bi-Weekly", "Hourly"],
            "Discount Applied" => &["Yes", "No", "Yes", "No", "Yes", "No"],
            "Promo Code Used" => &["Yes", "No", "Yes", "No", "Yes", "No"]
        )
        .unwrap();

        let outcome = DataProcessor::transform(df).unwrap();
        let out = &outcome.df;
        assert_eq!(out.height(), 6);
        assert_eq!(outcome.imputed_ratings, 2);
        assert!(outcome.promo_code_dropped);

        let names: Vec<String> = out
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "customer_id",
                "age",
                "category",
                "purchase_amount",
                "review_rating",
                "frequency_of_purchases",
                "discount_applied",
                "age_group",
                "purchase_frequency_days",
            ]
        );
        assert_eq!(ratings(out, REVIEW_RATING)[2], Some(4.0));
        assert_eq!(ratings(out, REVIEW_RATING)[5], Some(2.0));
    }
}
