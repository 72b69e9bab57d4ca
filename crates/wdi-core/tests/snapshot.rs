use polars::prelude::*;
use wdi_core::config::{SnapshotPolicy, SnapshotSpec};
use wdi_core::snapshot;

fn sample() -> DataFrame {
    df![
        "year" => [2010i64, 2012, 2011, 2011],
        "country" => ["x", "x", "y", "z"],
        "gdp" => [Some(100.0), Some(110.0), None, Some(50.0)],
        "life" => [Some(70.0), Some(71.0), Some(60.0), None],
    ]
    .expect("df")
}

#[test]
fn latest_per_country_keeps_exactly_one_row_per_country() {
    let latest = snapshot::latest_per_country(&sample()).expect("latest");
    assert_eq!(latest.height(), 3);

    let countries = latest
        .column("country")
        .expect("country")
        .str()
        .expect("str");
    let years = latest.column("year").expect("year").i64().expect("i64");
    for idx in 0..latest.height() {
        if countries.get(idx) == Some("x") {
            assert_eq!(years.get(idx), Some(2012));
        }
    }
}

#[test]
fn last_available_drops_only_countries_missing_critical_indicators() {
    let spec = SnapshotSpec {
        policy: SnapshotPolicy::LastAvailable,
        critical_indicators: vec!["gdp".to_string()],
    };

    let outcome = snapshot::reduce(&sample(), &spec).expect("reduce");
    // "y" has no gdp at all; "z" is merely missing life and stays.
    assert_eq!(outcome.frame.height(), 2);
    assert_eq!(outcome.dropped_countries, 1);

    let countries = outcome
        .frame
        .column("country")
        .expect("country")
        .str()
        .expect("str");
    let mut kept: Vec<String> = (0..outcome.frame.height())
        .map(|idx| countries.get(idx).expect("country").to_string())
        .collect();
    kept.sort();
    assert_eq!(kept, vec!["x".to_string(), "z".to_string()]);
}

#[test]
fn critical_indicators_absent_from_the_table_are_ignored() {
    let spec = SnapshotSpec {
        policy: SnapshotPolicy::LastAvailable,
        critical_indicators: vec!["gdp".to_string(), "not a column".to_string()],
    };

    let outcome = snapshot::reduce(&sample(), &spec).expect("reduce");
    assert_eq!(outcome.frame.height(), 2);
}

#[test]
fn filtered_complete_drops_rows_with_any_missing_value() {
    let spec = SnapshotSpec {
        policy: SnapshotPolicy::FilteredComplete,
        critical_indicators: Vec::new(),
    };

    let outcome = snapshot::reduce(&sample(), &spec).expect("reduce");
    // Only "x" (2012) has a complete row.
    assert_eq!(outcome.frame.height(), 1);
    assert_eq!(outcome.dropped_countries, 2);

    let countries = outcome
        .frame
        .column("country")
        .expect("country")
        .str()
        .expect("str");
    assert_eq!(countries.get(0), Some("x"));
}

#[test]
fn filter_year_restricts_to_one_year() {
    let filtered = snapshot::filter_year(&sample(), 2011).expect("filter");
    assert_eq!(filtered.height(), 2);

    let years = filtered.column("year").expect("year").i64().expect("i64");
    for idx in 0..filtered.height() {
        assert_eq!(years.get(idx), Some(2011));
    }
}
