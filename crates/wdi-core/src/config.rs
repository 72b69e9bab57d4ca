use std::collections::HashSet;
use std::path::Path;

use once_cell::sync::Lazy;
use serde::Deserialize;

use crate::error::{PipelineError, Result};

/// Direction of the temporal gap fill applied to the merged table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FillDirection {
    /// Propagate the most recent prior value forward in time.
    Forward,
    /// Propagate the nearest future value backward in time.
    Backward,
}

/// How the filled time series collapses to one row per country.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SnapshotPolicy {
    /// Keep the maximum-year row per country, then drop countries still
    /// missing any critical indicator.
    LastAvailable,
    /// Keep the maximum-year row per country, then drop rows with any
    /// remaining missing value.
    FilteredComplete,
}

/// What to do with a source when none of its requested indicators exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmptySelectionPolicy {
    /// Exclude the source from the merge entirely.
    #[default]
    Skip,
    /// Merge its `(year, country)` keys anyway, contributing no indicators.
    KeepKeys,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceSpec {
    pub name: String,
    pub file: String,
    #[serde(default)]
    pub indicators: Vec<String>,
    #[serde(default)]
    pub on_no_indicators: EmptySelectionPolicy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FillSpec {
    pub direction: FillDirection,
    /// Columns the fill applies to; every indicator column when empty.
    #[serde(default)]
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotSpec {
    pub policy: SnapshotPolicy,
    #[serde(default)]
    pub critical_indicators: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum BucketKind {
    /// Fixed intervals: lowest bound inclusive, right edges inclusive.
    FixedBins { bins: Vec<f64>, labels: Vec<String> },
    /// Equal-frequency tiers, one per label.
    Quantiles { labels: Vec<String> },
}

#[derive(Debug, Clone, Deserialize)]
pub struct BucketSpec {
    pub column: String,
    pub output: String,
    #[serde(flatten)]
    pub kind: BucketKind,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    pub name: String,
    pub output: String,
    pub sources: Vec<SourceSpec>,
    #[serde(default)]
    pub min_year: Option<i64>,
    #[serde(default)]
    pub fill: Option<FillSpec>,
    #[serde(default)]
    pub snapshot: Option<SnapshotSpec>,
    #[serde(default)]
    pub buckets: Vec<BucketSpec>,
}

impl PipelineConfig {
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Structural checks performed at load time rather than discovered
    /// mid-run via lookups.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(PipelineError::Config("pipeline name is empty".to_string()));
        }
        if self.output.trim().is_empty() {
            return Err(PipelineError::Config(format!(
                "pipeline '{}' has no output file",
                self.name
            )));
        }
        if self.sources.is_empty() {
            return Err(PipelineError::Config(format!(
                "pipeline '{}' has no sources",
                self.name
            )));
        }

        let mut seen = HashSet::new();
        for source in &self.sources {
            if source.name.trim().is_empty() || source.file.trim().is_empty() {
                return Err(PipelineError::Config(format!(
                    "pipeline '{}' has a source with an empty name or file",
                    self.name
                )));
            }
            if !seen.insert(source.name.as_str()) {
                return Err(PipelineError::Config(format!(
                    "pipeline '{}' lists source '{}' twice",
                    self.name, source.name
                )));
            }
        }

        for bucket in &self.buckets {
            match &bucket.kind {
                BucketKind::FixedBins { bins, labels } => {
                    if bins.len() < 2 || labels.len() + 1 != bins.len() {
                        return Err(PipelineError::Config(format!(
                            "bucket '{}' needs exactly one label per interval",
                            bucket.output
                        )));
                    }
                    if bins.windows(2).any(|pair| pair[0] >= pair[1]) {
                        return Err(PipelineError::Config(format!(
                            "bucket '{}' bins must be strictly increasing",
                            bucket.output
                        )));
                    }
                }
                BucketKind::Quantiles { labels } => {
                    if labels.is_empty() {
                        return Err(PipelineError::Config(format!(
                            "bucket '{}' has no labels",
                            bucket.output
                        )));
                    }
                }
            }
        }

        Ok(())
    }
}

fn source(
    name: &str,
    file: &str,
    indicators: &[&str],
    on_no_indicators: EmptySelectionPolicy,
) -> SourceSpec {
    SourceSpec {
        name: name.to_string(),
        file: file.to_string(),
        indicators: indicators.iter().map(|s| s.to_string()).collect(),
        on_no_indicators,
    }
}

fn socioeconomic_profiles() -> PipelineConfig {
    let keep = EmptySelectionPolicy::KeepKeys;
    PipelineConfig {
        name: "socioeconomic-profiles".to_string(),
        output: "socioeconomic_profiles.csv".to_string(),
        sources: vec![
            source(
                "economy_growth",
                "economy_growth.csv",
                &["gdp per capita (current us$)"],
                keep,
            ),
            source(
                "financial_sector",
                "financial_sector.csv",
                &[
                    "inflation, consumer prices (annual %)",
                    "domestic credit to private sector (% of gdp)",
                ],
                keep,
            ),
            source(
                "poverty",
                "poverty.csv",
                &["poverty headcount ratio at $6.85 a day (2017 ppp) (% of population)"],
                keep,
            ),
            source(
                "education",
                "education.csv",
                &[
                    "literacy rate, adult total (% of people ages 15 and above)",
                    "school enrollment, secondary (% gross)",
                ],
                keep,
            ),
            source(
                "infrastructure",
                "infrastructure.csv",
                &[
                    "individuals using the internet (% of population)",
                    "mobile cellular subscriptions (per 100 people)",
                    "electric power consumption (kwh per capita)",
                ],
                keep,
            ),
            source(
                "agriculture_rural_development",
                "agriculture_rural_development.csv",
                &["rural population (% of total population)"],
                keep,
            ),
            source(
                "climate_change",
                "climate_change.csv",
                &["population growth (annual %)"],
                keep,
            ),
            source(
                "environment",
                "environment.csv",
                &[
                    "renewable energy consumption (% of total final energy consumption)",
                    "total greenhouse gas emissions excluding lulucf per capita (t co2e/capita)",
                ],
                keep,
            ),
        ],
        min_year: Some(2010),
        fill: Some(FillSpec {
            direction: FillDirection::Forward,
            columns: Vec::new(),
        }),
        snapshot: Some(SnapshotSpec {
            policy: SnapshotPolicy::FilteredComplete,
            critical_indicators: Vec::new(),
        }),
        buckets: Vec::new(),
    }
}

fn education_health_gap() -> PipelineConfig {
    let keep = EmptySelectionPolicy::KeepKeys;
    PipelineConfig {
        name: "education-health-gap".to_string(),
        output: "education_health_gap_data.csv".to_string(),
        sources: vec![
            source(
                "education",
                "education.csv",
                &[
                    "literacy rate, adult total (% of people ages 15 and above)",
                    "primary completion rate, total (% of relevant age group)",
                    "school enrollment, secondary (% gross)",
                ],
                keep,
            ),
            source(
                "economy_growth",
                "economy_growth.csv",
                &["gdp per capita (current us$)"],
                keep,
            ),
            source(
                "agriculture_rural_development",
                "agriculture_rural_development.csv",
                &["access to electricity, rural (% of rural population)"],
                keep,
            ),
            source(
                "poverty",
                "poverty.csv",
                &["poverty headcount ratio at $6.85 a day (2017 ppp) (% of population)"],
                keep,
            ),
            source(
                "infrastructure",
                "infrastructure.csv",
                &["individuals using the internet (% of population)"],
                keep,
            ),
        ],
        min_year: Some(1990),
        fill: Some(FillSpec {
            direction: FillDirection::Backward,
            columns: vec![
                "poverty headcount ratio at $6.85 a day (2017 ppp) (% of population)".to_string(),
            ],
        }),
        snapshot: None,
        buckets: Vec::new(),
    }
}

fn prosperity_sustainability() -> PipelineConfig {
    let skip = EmptySelectionPolicy::Skip;
    PipelineConfig {
        name: "prosperity-sustainability".to_string(),
        output: "prosperity_sustainability.csv".to_string(),
        sources: vec![
            source(
                "economy_growth",
                "economy_growth.csv",
                &["gdp per capita (current us$)", "gdp (current us$)"],
                skip,
            ),
            source(
                "financial_sector",
                "financial_sector.csv",
                &["inflation, consumer prices (annual %)"],
                skip,
            ),
            source(
                "poverty",
                "poverty.csv",
                &["poverty headcount ratio at $6.85 a day (2017 ppp) (% of population)"],
                skip,
            ),
            source(
                "environment",
                "environment.csv",
                &[
                    "renewable energy consumption (% of total final energy consumption)",
                    "pm2.5 air pollution, mean annual exposure (micrograms per cubic meter)",
                    "total greenhouse gas emissions excluding lulucf per capita (t co2e/capita)",
                ],
                skip,
            ),
            source(
                "climate_change",
                "climate_change.csv",
                &["energy use (kg of oil equivalent) per $1,000 gdp (constant 2021 ppp)"],
                skip,
            ),
            source(
                "infrastructure",
                "infrastructure.csv",
                &["access to electricity (% of population)"],
                skip,
            ),
        ],
        min_year: Some(2010),
        fill: Some(FillSpec {
            direction: FillDirection::Forward,
            columns: Vec::new(),
        }),
        snapshot: Some(SnapshotSpec {
            policy: SnapshotPolicy::LastAvailable,
            critical_indicators: vec![
                "gdp per capita (current us$)".to_string(),
                "gdp (current us$)".to_string(),
                "total greenhouse gas emissions excluding lulucf per capita (t co2e/capita)"
                    .to_string(),
                "renewable energy consumption (% of total final energy consumption)".to_string(),
            ],
        }),
        buckets: Vec::new(),
    }
}

static BUILTIN_PIPELINES: Lazy<Vec<PipelineConfig>> = Lazy::new(|| {
    vec![
        socioeconomic_profiles(),
        education_health_gap(),
        prosperity_sustainability(),
    ]
});

pub fn builtin_pipelines() -> &'static [PipelineConfig] {
    BUILTIN_PIPELINES.as_slice()
}

pub fn find_builtin(name: &str) -> Option<&'static PipelineConfig> {
    BUILTIN_PIPELINES.iter().find(|config| config.name == name)
}
