use comfy_table::Table;
use polars::prelude::*;
use smartcore::cluster::kmeans::{KMeans, KMeansParameters};
use smartcore::linalg::basic::matrix::DenseMatrix;
use tracing::info;

use crate::error::{PipelineError, Result};
use crate::loader::COUNTRY_COL;

pub const CLUSTER_COL: &str = "cluster";

/// Countries with a complete feature vector, ready for clustering.
#[derive(Debug)]
pub struct FeatureMatrix {
    pub countries: Vec<String>,
    pub features: Vec<String>,
    pub rows: Vec<Vec<f64>>,
    /// Rows discarded because a feature (or the country) was missing.
    pub dropped: usize,
}

#[derive(Debug)]
pub struct ClusterOutcome {
    pub frame: DataFrame,
    pub labels: Vec<i32>,
    pub matrix: FeatureMatrix,
    pub clusters: usize,
}

/// Select `country` plus the requested features and drop every row with a
/// missing value among them.
pub fn feature_matrix(df: &DataFrame, features: &[String]) -> Result<FeatureMatrix> {
    if features.is_empty() {
        return Err(PipelineError::Config(
            "clustering needs at least one feature column".to_string(),
        ));
    }

    let countries = df.column(COUNTRY_COL)?.str()?.clone();
    let mut feature_cols = Vec::with_capacity(features.len());
    for feature in features {
        let values = df
            .column(feature.as_str())
            .map_err(|_| {
                PipelineError::Config(format!("feature column '{feature}' not found"))
            })?
            .cast(&DataType::Float64)?;
        feature_cols.push(values.f64()?.clone());
    }

    let mut kept_countries = Vec::new();
    let mut rows = Vec::new();
    for idx in 0..df.height() {
        let Some(country) = countries.get(idx) else {
            continue;
        };
        let values: Vec<Option<f64>> = feature_cols.iter().map(|c| c.get(idx)).collect();
        if values.iter().any(Option::is_none) {
            continue;
        }
        kept_countries.push(country.to_string());
        rows.push(values.into_iter().flatten().collect());
    }

    let dropped = df.height() - rows.len();
    info!(
        complete = rows.len(),
        dropped = dropped,
        "Prepared feature matrix"
    );

    Ok(FeatureMatrix {
        countries: kept_countries,
        features: features.to_vec(),
        rows,
        dropped,
    })
}

/// Scale each column to zero mean and unit variance. A constant column is
/// centered only, since its deviation is zero.
pub fn standardize(rows: &mut [Vec<f64>]) {
    if rows.is_empty() {
        return;
    }
    let count = rows.len() as f64;
    let width = rows[0].len();

    for j in 0..width {
        let mean = rows.iter().map(|row| row[j]).sum::<f64>() / count;
        let variance = rows.iter().map(|row| (row[j] - mean).powi(2)).sum::<f64>() / count;
        let deviation = variance.sqrt();
        for row in rows.iter_mut() {
            row[j] -= mean;
            if deviation > 0.0 {
                row[j] /= deviation;
            }
        }
    }
}

pub fn kmeans_labels(rows: &Vec<Vec<f64>>, clusters: usize) -> Result<Vec<i32>> {
    let matrix = DenseMatrix::from_2d_vec(rows);
    let model: KMeans<f64, i32, DenseMatrix<f64>, Vec<i32>> =
        KMeans::fit(&matrix, KMeansParameters::default().with_k(clusters))
            .map_err(|err| PipelineError::Clustering(err.to_string()))?;
    model
        .predict(&matrix)
        .map_err(|err| PipelineError::Clustering(err.to_string()))
}

/// Standardize the feature matrix, partition it into `clusters` groups, and
/// return a `country, cluster, features...` table with unscaled values.
pub fn cluster_snapshot(df: &DataFrame, features: &[String], clusters: usize) -> Result<ClusterOutcome> {
    let matrix = feature_matrix(df, features)?;
    if matrix.rows.len() < clusters {
        return Err(PipelineError::Clustering(format!(
            "{} complete rows cannot form {} clusters",
            matrix.rows.len(),
            clusters
        )));
    }

    let mut scaled = matrix.rows.clone();
    standardize(&mut scaled);
    let labels = kmeans_labels(&scaled, clusters)?;

    let mut columns: Vec<Column> = Vec::with_capacity(matrix.features.len() + 2);
    columns.push(Series::new(COUNTRY_COL.into(), matrix.countries.clone()).into());
    columns.push(Series::new(CLUSTER_COL.into(), labels.clone()).into());
    for (j, feature) in matrix.features.iter().enumerate() {
        let values: Vec<f64> = matrix.rows.iter().map(|row| row[j]).collect();
        columns.push(Series::new(feature.as_str().into(), values).into());
    }

    Ok(ClusterOutcome {
        frame: DataFrame::new(columns)?,
        labels,
        matrix,
        clusters,
    })
}

/// Per-cluster summary: size, feature means, and a few sample countries.
pub fn summary_table(outcome: &ClusterOutcome) -> Table {
    const SAMPLE_COUNTRIES: usize = 5;

    let mut header = vec!["cluster".to_string(), "countries".to_string()];
    for feature in &outcome.matrix.features {
        header.push(format!("mean {feature}"));
    }
    header.push("sample".to_string());

    let mut table = Table::new();
    table.set_header(header);

    for cluster in 0..outcome.clusters as i32 {
        let member_rows: Vec<usize> = outcome
            .labels
            .iter()
            .enumerate()
            .filter(|(_, &label)| label == cluster)
            .map(|(idx, _)| idx)
            .collect();

        let mut row = vec![cluster.to_string(), member_rows.len().to_string()];
        for j in 0..outcome.matrix.features.len() {
            let mean = if member_rows.is_empty() {
                f64::NAN
            } else {
                member_rows
                    .iter()
                    .map(|&idx| outcome.matrix.rows[idx][j])
                    .sum::<f64>()
                    / member_rows.len() as f64
            };
            row.push(format!("{mean:.2}"));
        }

        let sample: Vec<&str> = member_rows
            .iter()
            .take(SAMPLE_COUNTRIES)
            .map(|&idx| outcome.matrix.countries[idx].as_str())
            .collect();
        row.push(sample.join(", "));

        table.add_row(row);
    }

    table
}
