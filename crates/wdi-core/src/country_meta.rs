use std::path::Path;

use polars::prelude::*;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::error::{PipelineError, Result};
use crate::loader::{self, COUNTRY_COL};

pub const WORLD_BANK_COUNTRY_URL: &str =
    "https://api.worldbank.org/v2/country?format=json&per_page=300";

const ISO3_COL: &str = "iso3";

#[derive(Debug, Clone, Serialize)]
pub struct CountryMeta {
    pub iso3: String,
    pub country_name: String,
    pub region: String,
    pub income_group: String,
}

/// Fetch country metadata from the World Bank API, dropping aggregate rows
/// and lower-casing ISO3 codes so they join against indicator data.
pub fn fetch(url: &str) -> Result<Vec<CountryMeta>> {
    let payload: Value = reqwest::blocking::get(url)?.error_for_status()?.json()?;
    let records = parse_payload(&payload)?;
    info!(countries = records.len(), "Fetched country metadata");
    Ok(records)
}

/// The response envelope is `[paging metadata, [country objects]]`.
pub fn parse_payload(payload: &Value) -> Result<Vec<CountryMeta>> {
    let countries = payload
        .get(1)
        .and_then(Value::as_array)
        .ok_or_else(|| {
            PipelineError::Processing("unexpected country API response shape".to_string())
        })?;

    let mut records = Vec::with_capacity(countries.len());
    for entry in countries {
        let iso3 = string_field(entry, &["id"])?;
        let country_name = string_field(entry, &["name"])?;
        let region = string_field(entry, &["region", "value"])?;
        let income_group = string_field(entry, &["incomeLevel", "value"])?;

        // Regional/income aggregates are not countries.
        if region.to_lowercase().contains("aggregate")
            || income_group.to_lowercase().contains("income only")
        {
            continue;
        }

        records.push(CountryMeta {
            iso3: iso3.to_lowercase(),
            country_name,
            region,
            income_group,
        });
    }

    Ok(records)
}

fn string_field(entry: &Value, path: &[&str]) -> Result<String> {
    let mut value = entry;
    for key in path {
        value = value.get(key).ok_or_else(|| {
            PipelineError::Processing(format!("country record missing field '{}'", path.join(".")))
        })?;
    }
    value
        .as_str()
        .map(|s| s.to_string())
        .ok_or_else(|| {
            PipelineError::Processing(format!("country field '{}' is not a string", path.join(".")))
        })
}

pub fn write_meta_csv(records: &[CountryMeta], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Load a previously written metadata CSV for use as a join partner.
pub fn load(path: &Path) -> Result<DataFrame> {
    let df = loader::read_csv_file(path)?;
    if df.column(ISO3_COL).is_err() {
        return Err(PipelineError::Processing(format!(
            "country metadata file {} has no '{}' column",
            path.display(),
            ISO3_COL
        )));
    }
    Ok(df)
}

/// Left-join metadata onto a snapshot on `country == iso3`. Countries
/// without metadata keep their rows with the metadata columns missing.
pub fn attach(df: &DataFrame, meta: &DataFrame) -> Result<DataFrame> {
    let joined = df
        .clone()
        .lazy()
        .join(
            meta.clone().lazy(),
            [col(COUNTRY_COL)],
            [col(ISO3_COL)],
            JoinArgs::new(JoinType::Left),
        )
        .collect()?;
    Ok(joined)
}
