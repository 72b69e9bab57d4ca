use std::io::Cursor;
use std::path::Path;

use polars::prelude::*;
use tracing::warn;

use crate::config::{EmptySelectionPolicy, SourceSpec};
use crate::error::Result;

pub const YEAR_COL: &str = "year";
pub const COUNTRY_COL: &str = "country";

/// Outcome of attempting to load one configured source.
#[derive(Debug)]
pub struct SourceReport {
    pub name: String,
    pub status: SourceStatus,
    /// Requested indicators the source turned out not to carry.
    pub missing_indicators: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceStatus {
    Loaded { columns: Vec<String> },
    SkippedMissingFile,
    SkippedMissingKeys,
    SkippedNoIndicators,
    Failed { message: String },
}

#[derive(Debug)]
pub struct LoadedSource {
    pub name: String,
    pub frame: DataFrame,
}

enum SubsetOutcome {
    MissingKeys,
    NoIndicators { missing: Vec<String> },
    Loaded { frame: DataFrame, missing: Vec<String> },
}

/// Rename every column to its trimmed, lower-cased form. Values and row
/// order are untouched; applying this twice yields the same table.
pub fn normalize_columns(df: &DataFrame) -> Result<DataFrame> {
    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.as_str().trim().to_lowercase())
        .collect();

    let mut normalized = df.clone();
    normalized.set_column_names(names.iter().map(|name| name.as_str()))?;
    Ok(normalized)
}

pub fn has_key_columns(df: &DataFrame) -> bool {
    df.column(YEAR_COL).is_ok() && df.column(COUNTRY_COL).is_ok()
}

/// Reduce a normalized table to `[year, country] + present(requested)`,
/// reporting requested indicators the table does not carry. The selector
/// never invents a column.
pub fn select_indicators(df: &DataFrame, spec: &SourceSpec) -> Result<(DataFrame, Vec<String>)> {
    let mut selected = vec![YEAR_COL.to_string(), COUNTRY_COL.to_string()];
    let mut missing = Vec::new();

    for indicator in &spec.indicators {
        if df.column(indicator.as_str()).is_ok() {
            selected.push(indicator.clone());
        } else {
            missing.push(indicator.clone());
        }
    }

    let subset = df.select(selected)?;
    Ok((subset, missing))
}

pub fn read_csv_bytes(content: &[u8]) -> Result<DataFrame> {
    let cursor = Cursor::new(content);
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(100))
        .into_reader_with_file_handle(cursor)
        .finish()?;
    Ok(df)
}

/// Load a CSV from disk with normalized column names. Used directly by the
/// clustering and metadata commands, which read previously written artifacts.
pub fn read_csv_file(path: &Path) -> Result<DataFrame> {
    let content = std::fs::read(path)?;
    let df = read_csv_bytes(&content)?;
    normalize_columns(&df)
}

fn cast_key_columns(df: DataFrame) -> Result<DataFrame> {
    let typed = df
        .lazy()
        .with_columns([
            col(YEAR_COL).cast(DataType::Int64),
            col(COUNTRY_COL).cast(DataType::String),
        ])
        .collect()?;
    Ok(typed)
}

/// Load one configured source, applying normalization, the key-column
/// check, and indicator selection. Every failure mode here is non-fatal:
/// the report says what happened and the pipeline moves on.
pub fn load_source(data_dir: &Path, spec: &SourceSpec) -> (Option<LoadedSource>, SourceReport) {
    let report = |status, missing_indicators| SourceReport {
        name: spec.name.clone(),
        status,
        missing_indicators,
    };

    let path = data_dir.join(&spec.file);
    if !path.is_file() {
        warn!(
            source = spec.name.as_str(),
            file = spec.file.as_str(),
            "File not found, skipping"
        );
        return (None, report(SourceStatus::SkippedMissingFile, Vec::new()));
    }

    match load_subset(&path, spec) {
        Ok(SubsetOutcome::MissingKeys) => {
            warn!(
                source = spec.name.as_str(),
                "Missing 'year' or 'country' column, skipping source"
            );
            (None, report(SourceStatus::SkippedMissingKeys, Vec::new()))
        }
        Ok(SubsetOutcome::NoIndicators { missing }) => {
            warn!(
                source = spec.name.as_str(),
                "No requested indicators found, skipping source"
            );
            (None, report(SourceStatus::SkippedNoIndicators, missing))
        }
        Ok(SubsetOutcome::Loaded { frame, missing }) => {
            for indicator in &missing {
                warn!(
                    source = spec.name.as_str(),
                    indicator = indicator.as_str(),
                    "Requested indicator not present in source"
                );
            }
            let columns = frame
                .get_column_names()
                .iter()
                .map(|name| name.to_string())
                .collect();
            (
                Some(LoadedSource {
                    name: spec.name.clone(),
                    frame,
                }),
                report(SourceStatus::Loaded { columns }, missing),
            )
        }
        Err(err) => {
            warn!(
                source = spec.name.as_str(),
                error = %err,
                "Failed to load source, skipping"
            );
            (
                None,
                report(
                    SourceStatus::Failed {
                        message: err.to_string(),
                    },
                    Vec::new(),
                ),
            )
        }
    }
}

fn load_subset(path: &Path, spec: &SourceSpec) -> Result<SubsetOutcome> {
    let content = std::fs::read(path)?;
    let raw = read_csv_bytes(&content)?;
    let normalized = normalize_columns(&raw)?;

    if !has_key_columns(&normalized) {
        return Ok(SubsetOutcome::MissingKeys);
    }

    let (subset, missing) = select_indicators(&normalized, spec)?;
    let found_any = subset.width() > 2;
    if !found_any
        && !spec.indicators.is_empty()
        && spec.on_no_indicators == EmptySelectionPolicy::Skip
    {
        return Ok(SubsetOutcome::NoIndicators { missing });
    }

    let frame = cast_key_columns(subset)?;
    Ok(SubsetOutcome::Loaded { frame, missing })
}
