use polars::prelude::*;

use crate::config::{BucketKind, BucketSpec};
use crate::error::{PipelineError, Result};

/// Append a labeled categorical column derived from a numeric one. Missing
/// inputs yield missing buckets.
pub fn apply(df: &DataFrame, spec: &BucketSpec) -> Result<DataFrame> {
    let values = df.column(spec.column.as_str())?.cast(&DataType::Float64)?;
    let values = values.f64()?;

    let labels = match &spec.kind {
        BucketKind::FixedBins { bins, labels } => fixed_bins(values, bins, labels),
        BucketKind::Quantiles { labels } => quantile_tiers(values, labels)?,
    };

    let mut out = df.clone();
    out.with_column(Series::new(spec.output.as_str().into(), labels))?;
    Ok(out)
}

/// Interval assignment with the lowest bound inclusive and right edges
/// inclusive; values outside the outer bins stay missing.
fn fixed_bins(values: &Float64Chunked, bins: &[f64], labels: &[String]) -> Vec<Option<String>> {
    values
        .into_iter()
        .map(|opt| {
            opt.and_then(|value| {
                if value < bins[0] || value > bins[bins.len() - 1] {
                    return None;
                }
                let slot = bins
                    .windows(2)
                    .position(|edge| value <= edge[1])
                    .unwrap_or(labels.len() - 1);
                Some(labels[slot].clone())
            })
        })
        .collect()
}

/// Equal-frequency tiers over the non-missing values, one per label, with
/// linearly interpolated quantile cut points.
fn quantile_tiers(values: &Float64Chunked, labels: &[String]) -> Result<Vec<Option<String>>> {
    let mut sorted: Vec<f64> = values.into_iter().flatten().collect();
    if sorted.is_empty() {
        return Err(PipelineError::Processing(
            "no non-missing values to assign tiers over".to_string(),
        ));
    }
    sorted.sort_by(f64::total_cmp);

    let tiers = labels.len();
    let cuts: Vec<f64> = (1..tiers)
        .map(|j| quantile(&sorted, j as f64 / tiers as f64))
        .collect();

    Ok(values
        .into_iter()
        .map(|opt| {
            opt.map(|value| {
                let mut slot = 0;
                while slot < cuts.len() && value > cuts[slot] {
                    slot += 1;
                }
                labels[slot].clone()
            })
        })
        .collect())
}

fn quantile(sorted: &[f64], q: f64) -> f64 {
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let weight = position - lower as f64;
    sorted[lower] * (1.0 - weight) + sorted[upper] * weight
}
