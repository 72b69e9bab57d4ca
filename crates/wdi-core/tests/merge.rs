use polars::prelude::*;
use wdi_core::error::PipelineError;
use wdi_core::merge;

#[test]
fn dedup_keeps_first_occurrence_per_key() {
    let df = df![
        "year" => [2010i64, 2010, 2011],
        "country" => ["x", "x", "y"],
        "gdp" => [1.0, 2.0, 3.0],
    ]
    .expect("df");

    let deduped = merge::dedup_keys(&df).expect("dedup");
    assert_eq!(deduped.height(), 2);

    let gdp = deduped.column("gdp").expect("gdp").f64().expect("f64");
    assert_eq!(gdp.get(0), Some(1.0));
    assert_eq!(gdp.get(1), Some(3.0));
}

#[test]
fn dedup_leaves_unique_keys_untouched() {
    let df = df![
        "year" => [2010i64, 2011, 2010],
        "country" => ["x", "x", "y"],
        "gdp" => [1.0, 2.0, 3.0],
    ]
    .expect("df");

    let deduped = merge::dedup_keys(&df).expect("dedup");
    assert!(df.equals_missing(&deduped));
}

#[test]
fn outer_join_keeps_rows_from_both_sides_with_missing_markers() {
    let a = df![
        "year" => [2010i64, 2012],
        "country" => ["x", "x"],
        "gdp" => [100.0, 110.0],
    ]
    .expect("a");
    let b = df![
        "year" => [2011i64],
        "country" => ["x"],
        "life" => [70.0],
    ]
    .expect("b");

    let merged = merge::accumulate(vec![a, b]).expect("merge");
    assert_eq!(merged.height(), 3);

    // Column order follows first introduction.
    let names: Vec<String> = merged
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    assert_eq!(names, vec!["year", "country", "gdp", "life"]);

    let sorted = merged
        .lazy()
        .sort(["year"], SortMultipleOptions::default())
        .collect()
        .expect("sort");
    let gdp = sorted.column("gdp").expect("gdp").f64().expect("f64");
    let life = sorted.column("life").expect("life").f64().expect("f64");

    assert_eq!(gdp.get(0), Some(100.0));
    assert_eq!(life.get(0), None);
    assert_eq!(gdp.get(1), None);
    assert_eq!(life.get(1), Some(70.0));
    assert_eq!(gdp.get(2), Some(110.0));
    assert_eq!(life.get(2), None);
}

#[test]
fn join_keys_appear_exactly_once() {
    let a = df![
        "year" => [2010i64, 2011],
        "country" => ["x", "y"],
        "gdp" => [1.0, 2.0],
    ]
    .expect("a");
    let b = df![
        "year" => [2010i64, 2011],
        "country" => ["x", "z"],
        "life" => [70.0, 71.0],
    ]
    .expect("b");

    let merged = merge::accumulate(vec![a, b]).expect("merge");
    assert_eq!(merged.height(), 3);

    let years = merged.column("year").expect("year").i64().expect("i64");
    let countries = merged
        .column("country")
        .expect("country")
        .str()
        .expect("str");
    let mut keys: Vec<(i64, String)> = (0..merged.height())
        .map(|idx| {
            (
                years.get(idx).expect("year value"),
                countries.get(idx).expect("country value").to_string(),
            )
        })
        .collect();
    keys.sort();
    keys.dedup();
    assert_eq!(keys.len(), 3);
}

#[test]
fn empty_input_is_the_nothing_to_merge_failure() {
    let err = merge::accumulate(Vec::new()).expect_err("must fail");
    assert!(matches!(err, PipelineError::NothingToMerge));
}
