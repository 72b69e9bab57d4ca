use polars::prelude::*;
use wdi_core::buckets;
use wdi_core::config::{BucketKind, BucketSpec};

fn literacy_spec() -> BucketSpec {
    BucketSpec {
        column: "literacy".to_string(),
        output: "literacy_bucket".to_string(),
        kind: BucketKind::FixedBins {
            bins: vec![0.0, 60.0, 80.0, 90.0, 100.0],
            labels: vec![
                "<60%".to_string(),
                "60-80%".to_string(),
                "80-90%".to_string(),
                "90-100%".to_string(),
            ],
        },
    }
}

#[test]
fn fixed_bins_respect_inclusive_edges() {
    let df = df![
        "country" => ["a", "b", "c", "d", "e", "f"],
        "literacy" => [Some(0.0), Some(60.0), Some(60.5), Some(100.0), Some(101.0), None],
    ]
    .expect("df");

    let out = buckets::apply(&df, &literacy_spec()).expect("buckets");
    let labels = out
        .column("literacy_bucket")
        .expect("bucket column")
        .str()
        .expect("str");

    assert_eq!(labels.get(0), Some("<60%"));
    assert_eq!(labels.get(1), Some("<60%"));
    assert_eq!(labels.get(2), Some("60-80%"));
    assert_eq!(labels.get(3), Some("90-100%"));
    assert_eq!(labels.get(4), None);
    assert_eq!(labels.get(5), None);
}

#[test]
fn quantile_tiers_spread_values_across_all_labels() {
    let df = df![
        "country" => ["a", "b", "c", "d", "e", "f", "g", "h"],
        "gdp" => [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0],
    ]
    .expect("df");

    let spec = BucketSpec {
        column: "gdp".to_string(),
        output: "gdp_tier".to_string(),
        kind: BucketKind::Quantiles {
            labels: vec![
                "Low GDP".to_string(),
                "Lower-Mid GDP".to_string(),
                "Upper-Mid GDP".to_string(),
                "High GDP".to_string(),
            ],
        },
    };

    let out = buckets::apply(&df, &spec).expect("buckets");
    let tiers = out
        .column("gdp_tier")
        .expect("tier column")
        .str()
        .expect("str");

    let assigned: Vec<&str> = (0..out.height())
        .map(|idx| tiers.get(idx).expect("tier"))
        .collect();
    assert_eq!(
        assigned,
        vec![
            "Low GDP",
            "Low GDP",
            "Lower-Mid GDP",
            "Lower-Mid GDP",
            "Upper-Mid GDP",
            "Upper-Mid GDP",
            "High GDP",
            "High GDP",
        ]
    );
}

#[test]
fn quantile_tiers_keep_missing_values_missing() {
    let df = df![
        "country" => ["a", "b", "c"],
        "gdp" => [Some(1.0), None, Some(3.0)],
    ]
    .expect("df");

    let spec = BucketSpec {
        column: "gdp".to_string(),
        output: "gdp_tier".to_string(),
        kind: BucketKind::Quantiles {
            labels: vec!["low".to_string(), "high".to_string()],
        },
    };

    let out = buckets::apply(&df, &spec).expect("buckets");
    let tiers = out
        .column("gdp_tier")
        .expect("tier column")
        .str()
        .expect("str");
    assert_eq!(tiers.get(1), None);
}
