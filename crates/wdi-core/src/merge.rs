use std::collections::HashSet;

use polars::prelude::*;

use crate::error::{PipelineError, Result};
use crate::loader::{COUNTRY_COL, YEAR_COL};

/// Remove duplicate `(year, country)` rows, keeping the first occurrence in
/// input order. Must run before any join so the join stays key-preserving.
pub fn dedup_keys(df: &DataFrame) -> Result<DataFrame> {
    let years = df.column(YEAR_COL)?.i64()?;
    let countries = df.column(COUNTRY_COL)?.str()?;

    let mut seen: HashSet<(Option<i64>, Option<String>)> = HashSet::new();
    let mut keep = Vec::with_capacity(df.height());
    for idx in 0..df.height() {
        let key = (years.get(idx), countries.get(idx).map(|s| s.to_string()));
        keep.push(seen.insert(key));
    }

    let mask = BooleanChunked::from_slice("keep".into(), &keep);
    Ok(df.filter(&mask)?)
}

/// Fold key-deduplicated subsets into one table via outer join on
/// `(year, country)`. The first subset seeds the accumulator; column order
/// follows first introduction. An empty input is the "nothing to merge"
/// pipeline failure.
pub fn accumulate(subsets: Vec<DataFrame>) -> Result<DataFrame> {
    let mut iter = subsets.into_iter();
    let mut merged = iter.next().ok_or(PipelineError::NothingToMerge)?;

    for subset in iter {
        merged = merged
            .lazy()
            .join(
                subset.lazy(),
                [col(YEAR_COL), col(COUNTRY_COL)],
                [col(YEAR_COL), col(COUNTRY_COL)],
                JoinArgs::new(JoinType::Full).with_coalesce(JoinCoalesce::CoalesceColumns),
            )
            .collect()?;
    }

    Ok(merged)
}
