use polars::prelude::pivot::pivot_stable;
use polars::prelude::*;

use crate::error::Result;
use crate::loader::{COUNTRY_COL, YEAR_COL};

/// Sort by `(country, year)` ascending and propagate the most recent prior
/// value of each target column forward within each country partition. The
/// first chronological row of a partition has no prior value and stays
/// missing; a column with no value anywhere in a partition stays missing.
pub fn forward_fill(df: &DataFrame, columns: &[String]) -> Result<DataFrame> {
    let targets = resolve_targets(df, columns);
    let exprs: Vec<Expr> = targets
        .iter()
        .map(|name| {
            col(name.as_str())
                .fill_null_with_strategy(FillNullStrategy::Forward(None))
                .over([col(COUNTRY_COL)])
        })
        .collect();

    let filled = df
        .clone()
        .lazy()
        .sort([COUNTRY_COL, YEAR_COL], SortMultipleOptions::default())
        .with_columns(exprs)
        .collect()?;
    Ok(filled)
}

/// Propagate the nearest future value of each target column backward in
/// time: pivot the series to one column per year, fill across columns in
/// descending year order, then restore the long shape. The round trip
/// reproduces exactly the `(country, year)` keys present before the pivot.
pub fn backward_fill(df: &DataFrame, columns: &[String]) -> Result<DataFrame> {
    let targets = resolve_targets(df, columns);
    let mut restored = df.clone();
    for target in &targets {
        restored = backward_fill_series(&restored, target)?;
    }
    Ok(restored)
}

fn resolve_targets(df: &DataFrame, columns: &[String]) -> Vec<String> {
    if columns.is_empty() {
        df.get_column_names()
            .iter()
            .filter(|name| name.as_str() != YEAR_COL && name.as_str() != COUNTRY_COL)
            .map(|name| name.to_string())
            .collect()
    } else {
        columns
            .iter()
            .filter(|name| df.column(name.as_str()).is_ok())
            .cloned()
            .collect()
    }
}

fn backward_fill_series(df: &DataFrame, target: &str) -> Result<DataFrame> {
    let series_df = df.select([COUNTRY_COL, YEAR_COL, target])?;
    let wide = pivot_stable(
        &series_df,
        [YEAR_COL],
        Some([COUNTRY_COL]),
        Some([target]),
        false,
        None,
        None,
    )?;

    // Year columns newest first, so each fill step pulls from the future side.
    let mut year_cols: Vec<(i64, String)> = wide
        .get_column_names()
        .iter()
        .filter_map(|name| {
            name.as_str()
                .parse::<i64>()
                .ok()
                .map(|year| (year, name.to_string()))
        })
        .collect();
    year_cols.sort_by_key(|(year, _)| std::cmp::Reverse(*year));

    if year_cols.is_empty() {
        return Ok(df.clone());
    }

    let mut lf = wide.lazy();
    for pair in year_cols.windows(2) {
        let (_, newer) = &pair[0];
        let (_, older) = &pair[1];
        lf = lf.with_column(
            col(older.as_str())
                .fill_null(col(newer.as_str()))
                .alias(older.as_str()),
        );
    }
    let filled = lf.collect()?;

    let on: Vec<&str> = year_cols.iter().map(|(_, name)| name.as_str()).collect();
    let long = filled
        .unpivot(on, [COUNTRY_COL])?
        .lazy()
        .select([
            col(COUNTRY_COL),
            col("variable").cast(DataType::Int64).alias(YEAR_COL),
            col("value").alias(target),
        ])
        .collect()?;

    // Joining the filled series back onto the original keys restores the
    // exact pre-pivot key set; the pivot's country-by-year grid may be wider.
    let original_order: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    let mut base = df.clone();
    base.drop_in_place(target)?;

    let joined = base
        .lazy()
        .join(
            long.lazy(),
            [col(COUNTRY_COL), col(YEAR_COL)],
            [col(COUNTRY_COL), col(YEAR_COL)],
            JoinArgs::new(JoinType::Left),
        )
        .collect()?;

    Ok(joined.select(original_order)?)
}
