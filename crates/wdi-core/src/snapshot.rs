use std::collections::HashMap;

use polars::prelude::*;
use tracing::{info, warn};

use crate::config::{SnapshotPolicy, SnapshotSpec};
use crate::error::Result;
use crate::loader::{COUNTRY_COL, YEAR_COL};

pub struct SnapshotOutcome {
    pub frame: DataFrame,
    /// Countries dropped for incompleteness. Observability only.
    pub dropped_countries: usize,
}

/// Keep the maximum-year row per country: sort by `(country, year)`
/// ascending and retain the last occurrence of each country.
pub fn latest_per_country(df: &DataFrame) -> Result<DataFrame> {
    let sorted = df
        .clone()
        .lazy()
        .sort([COUNTRY_COL, YEAR_COL], SortMultipleOptions::default())
        .collect()?;

    let countries = sorted.column(COUNTRY_COL)?.str()?;
    let mut last_seen: HashMap<Option<String>, usize> = HashMap::new();
    for idx in 0..sorted.height() {
        last_seen.insert(countries.get(idx).map(|s| s.to_string()), idx);
    }

    let mut keep = vec![false; sorted.height()];
    for idx in last_seen.into_values() {
        keep[idx] = true;
    }

    let mask = BooleanChunked::from_slice("keep".into(), &keep);
    Ok(sorted.filter(&mask)?)
}

/// Restrict to rows of one exact year.
pub fn filter_year(df: &DataFrame, year: i64) -> Result<DataFrame> {
    let filtered = df
        .clone()
        .lazy()
        .filter(col(YEAR_COL).cast(DataType::Int64).eq(lit(year)))
        .collect()?;
    Ok(filtered)
}

/// Collapse the filled time series to one snapshot row per country under
/// the configured policy.
pub fn reduce(df: &DataFrame, spec: &SnapshotSpec) -> Result<SnapshotOutcome> {
    let latest = latest_per_country(df)?;
    let before = latest.height();

    let frame = match spec.policy {
        SnapshotPolicy::LastAvailable => {
            let present: Vec<String> = spec
                .critical_indicators
                .iter()
                .filter(|name| latest.column(name.as_str()).is_ok())
                .cloned()
                .collect();
            if present.is_empty() {
                warn!("No critical indicators present, dropping rows with any missing value");
                drop_missing(&latest, &all_columns(&latest))?
            } else {
                drop_missing(&latest, &present)?
            }
        }
        SnapshotPolicy::FilteredComplete => drop_missing(&latest, &all_columns(&latest))?,
    };

    let dropped_countries = before - frame.height();
    info!(
        dropped = dropped_countries,
        "Dropped countries with incomplete profiles"
    );

    Ok(SnapshotOutcome {
        frame,
        dropped_countries,
    })
}

fn all_columns(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect()
}

fn drop_missing(df: &DataFrame, subset: &[String]) -> Result<DataFrame> {
    let mut predicate = lit(true);
    for name in subset {
        predicate = predicate.and(col(name.as_str()).is_not_null());
    }
    Ok(df.clone().lazy().filter(predicate).collect()?)
}
