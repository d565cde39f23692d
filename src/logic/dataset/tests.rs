use super::*;
use serde_json::{json, Value};
use std::fs;
use tempfile::tempdir;

fn row(pairs: &[(&str, Value)]) -> Row {
    pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

#[test]
fn test_summary_scenario_numeric_and_label() {
    let rows = parse_csv("sensor_1,label\n10,a\n20,b\n30,c\n").unwrap();
    let summaries = summarize(&rows);

    assert_eq!(summaries.len(), 1);
    let s = &summaries[0];
    assert_eq!(s.feature, "sensor_1");
    assert_eq!(s.count, 3);
    assert!((s.mean - 20.0).abs() < 1e-9);
    assert!((s.std - 8.16).abs() < 0.01);
    assert_eq!(s.min, 10.0);
    assert_eq!(s.max, 30.0);
}

#[test]
fn test_column_is_numeric_if_any_row_is() {
    let rows = vec![
        row(&[("sensor_1", json!("n/a")), ("sensor_2", json!(1.5))]),
        row(&[("sensor_1", json!(4)), ("sensor_2", json!(2.5))]),
        row(&[("sensor_1", Value::Null)]),
    ];
    let summaries = summarize(&rows);

    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].feature, "sensor_1");
    // Only one parseable value, the text and null cells are not counted as zero
    assert_eq!(summaries[0].count, 1);
    assert_eq!(summaries[0].mean, 4.0);
    assert_eq!(summaries[1].count, 2);

    for s in &summaries {
        assert!(s.count <= rows.len());
    }
}

#[test]
fn test_numeric_strings_count() {
    let rows = vec![row(&[("v", json!(" 3.5 "))]), row(&[("v", json!("NaN"))]), row(&[("v", json!("inf"))])];
    let summaries = summarize(&rows);
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].count, 1);
    assert_eq!(summaries[0].max, 3.5);
}

#[test]
fn test_constant_column() {
    let rows = parse_csv("temp\n5\n5\n5\n5\n").unwrap();
    let s = &summarize(&rows)[0];
    assert_eq!(s.std, 0.0);

    let bins = histogram(&rows, "temp", 20);
    assert_eq!(bins.len(), 20);
    assert_eq!(bins[0].count, 4);
    assert_eq!(bins.iter().filter(|b| b.count > 0).count(), 1);
    assert_eq!(bins[0].bin, "5.00");
    assert_eq!(bins[1].bin, "6.00");
}

#[test]
fn test_histogram_max_lands_in_last_bin() {
    let rows: Vec<Row> = (0..=10).map(|i| row(&[("x", json!(i as f64))])).collect();
    let bins = histogram(&rows, "x", 5);

    assert_eq!(bins.len(), 5);
    assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 11);
    // width 2: [0,2) [2,4) [4,6) [6,8) [8,10] with 10 clamped into the last bin
    assert_eq!(bins.iter().map(|b| b.count).collect::<Vec<_>>(), vec![2, 2, 2, 2, 3]);
    assert_eq!(bins[4].bin, "8.00");
}

#[test]
fn test_histogram_without_numbers_is_empty() {
    let rows = parse_csv("label\na\nb\n").unwrap();
    assert!(histogram(&rows, "label", 20).is_empty());
    assert!(histogram(&rows, "missing", 20).is_empty());
    assert!(histogram(&[], "label", 20).is_empty());
}

#[test]
fn test_empty_upload_degrades() {
    assert!(summarize(&[]).is_empty());
    assert!(parse_rows_lossy("").is_empty());
    assert!(parse_rows_lossy("\n\n").is_empty());
}

#[test]
fn test_malformed_upload_is_empty_not_error() {
    assert!(matches!(
        parse_csv("a,b\n1,\"unterminated\n"),
        Err(CsvError::UnterminatedQuote { line: 2 })
    ));
    assert!(parse_rows_lossy("a,b\n1,\"unterminated\n").is_empty());
}

#[test]
fn test_type_inference_and_empty_lines() {
    let rows = parse_csv("sensor_1,ok,note,gap\n\n1,true,hello,\r\n2.5,false,\"x, y\",\n").unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["sensor_1"], json!(1));
    assert_eq!(rows[0]["ok"], json!(true));
    assert_eq!(rows[0]["note"], json!("hello"));
    assert_eq!(rows[0]["gap"], Value::Null);
    assert_eq!(rows[1]["sensor_1"], json!(2.5));
    assert_eq!(rows[1]["note"], json!("x, y"));
}

#[test]
fn test_short_rows_omit_keys() {
    let rows = parse_csv("a,b,c\n1,2\n1,2,3,4\n").unwrap();
    assert_eq!(rows[0].len(), 2);
    assert!(rows[0].get("c").is_none());
    assert_eq!(rows[1].len(), 3);
}

#[test]
fn test_header_order_is_preserved() {
    let rows = parse_csv("zeta,alpha,mid\n1,2,3\n").unwrap();
    let names: Vec<_> = summarize(&rows).into_iter().map(|s| s.feature).collect();
    assert_eq!(names, vec!["zeta", "alpha", "mid"]);
}

#[test]
fn test_read_rows_from_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("upload.csv");
    fs::write(&path, "sensor_1,sensor_2\n10,20\n30,40\n").unwrap();

    let rows = read_rows(&path);
    assert_eq!(rows.len(), 2);

    assert!(read_rows(&dir.path().join("missing.csv")).is_empty());
}

#[test]
fn test_write_csv_quotes() {
    let out = write_csv(
        &["name", "note"],
        vec![
            vec!["a".to_string(), "plain".to_string()],
            vec!["b".to_string(), "has, comma and \"quote\"".to_string()],
        ],
    );
    assert_eq!(out, "name,note\na,plain\nb,\"has, comma and \"\"quote\"\"\"\n");

    // Round trip through the parser
    let rows = parse_csv(&out).unwrap();
    assert_eq!(rows[1]["note"], json!("has, comma and \"quote\""));
}
