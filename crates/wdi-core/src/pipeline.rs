use std::path::{Path, PathBuf};

use polars::prelude::*;
use tracing::info;

use crate::config::{FillDirection, PipelineConfig};
use crate::error::{PipelineError, Result};
use crate::loader::{self, SourceReport, COUNTRY_COL, YEAR_COL};
use crate::{buckets, country_meta, fill, merge, outputs, snapshot};

#[derive(Debug)]
pub struct PipelineOutcome {
    pub frame: DataFrame,
    pub reports: Vec<SourceReport>,
    pub dropped_countries: usize,
    pub output_path: PathBuf,
}

/// Run one configured pipeline end to end: load and select each source,
/// dedup, fold into the outer-join accumulator, filter and fill along the
/// time axis, reduce to snapshots, and only then write the CSV artifact.
pub fn run(
    config: &PipelineConfig,
    data_dir: &Path,
    output_override: Option<&Path>,
    country_meta_path: Option<&Path>,
) -> Result<PipelineOutcome> {
    config.validate()?;
    info!(pipeline = config.name.as_str(), "Starting merge");

    let mut subsets = Vec::with_capacity(config.sources.len());
    let mut reports = Vec::with_capacity(config.sources.len());
    for spec in &config.sources {
        let (loaded, report) = loader::load_source(data_dir, spec);
        if let Some(source) = loaded {
            info!(source = source.name.as_str(), "Merging source");
            subsets.push(merge::dedup_keys(&source.frame)?);
        }
        reports.push(report);
    }

    if subsets.is_empty() {
        return Err(PipelineError::NothingToMerge);
    }

    let mut merged = merge::accumulate(subsets)?;

    if let Some(min_year) = config.min_year {
        merged = merged
            .lazy()
            .filter(col(YEAR_COL).gt_eq(lit(min_year)))
            .collect()?;
    }

    merged = merged
        .lazy()
        .sort([COUNTRY_COL, YEAR_COL], SortMultipleOptions::default())
        .collect()?;

    if let Some(fill_spec) = &config.fill {
        merged = match fill_spec.direction {
            FillDirection::Forward => fill::forward_fill(&merged, &fill_spec.columns)?,
            FillDirection::Backward => fill::backward_fill(&merged, &fill_spec.columns)?,
        };
    }

    let (mut final_df, dropped_countries) = match &config.snapshot {
        Some(spec) => {
            let outcome = snapshot::reduce(&merged, spec)?;
            (outcome.frame, outcome.dropped_countries)
        }
        None => (merged, 0),
    };

    if let Some(meta_path) = country_meta_path {
        let meta = country_meta::load(meta_path)?;
        final_df = country_meta::attach(&final_df, &meta)?;
    }

    for bucket in &config.buckets {
        final_df = buckets::apply(&final_df, bucket)?;
    }

    let output_path = output_override
        .map(Path::to_path_buf)
        .unwrap_or_else(|| data_dir.join(&config.output));
    outputs::write_csv(&mut final_df, &output_path)?;
    info!(
        rows = final_df.height(),
        path = %output_path.display(),
        "Wrote output"
    );

    Ok(PipelineOutcome {
        frame: final_df,
        reports,
        dropped_countries,
        output_path,
    })
}
