//! Fixture builders for batch directories.

#![allow(dead_code)]

use std::path::Path;

/// One input row and the yearly series its output row reports.
pub struct Row<'a> {
    pub scenario: &'a str,
    pub years: Vec<(i32, f64, f64)>,
}

pub fn row<'a>(scenario: &'a str, years: &[(i32, f64, f64)]) -> Row<'a> {
    Row { scenario, years: years.to_vec() }
}

/// The upstream table form: header row then one row per year.
pub fn yearly_report(years: &[(i32, f64, f64)]) -> String {
    let mut table = vec![serde_json::json!(["Year", "DB Top-Ups", "MB Top-Ups"])];
    table.extend(years.iter().map(|(y, db, mb)| serde_json::json!([y, db, mb])));
    serde_json::Value::Array(table).to_string()
}

pub fn write_input(dir: &Path, id: &str, scenarios: &[&str]) {
    let mut writer = csv::Writer::from_path(dir.join(format!("{id}_input.csv"))).unwrap();
    writer.write_record(["Scenario", "TaxType", "Gender", "IssueAge"]).unwrap();
    for scenario in scenarios {
        writer.write_record([*scenario, "Qualified", "F", "65"]).unwrap();
    }
    writer.flush().unwrap();
}

pub fn write_output_cells(dir: &Path, id: &str, cells: &[String]) {
    let mut writer = csv::Writer::from_path(dir.join(format!("{id}_output.csv"))).unwrap();
    writer.write_record(["YearlyReport"]).unwrap();
    for cell in cells {
        writer.write_record([cell.as_str()]).unwrap();
    }
    writer.flush().unwrap();
}

/// Write a complete `<id>_input.csv` / `<id>_output.csv` pair.
pub fn write_pair(dir: &Path, id: &str, rows: &[Row<'_>]) {
    let scenarios: Vec<&str> = rows.iter().map(|r| r.scenario).collect();
    write_input(dir, id, &scenarios);
    let cells: Vec<String> = rows.iter().map(|r| yearly_report(&r.years)).collect();
    write_output_cells(dir, id, &cells);
}

/// Scenario A beats scenario B over 2025-2026.
pub fn write_two_scenarios(dir: &Path) {
    write_pair(
        dir,
        "5f0c6a1e-0000-4000-8000-000000000001",
        &[
            row("1", &[(2025, -10.0, 0.0), (2026, -5.0, 0.0)]),
            row("2", &[(2025, 2.0, 0.0), (2026, 1.0, 0.0)]),
        ],
    );
}

pub fn assert_close(actual: f64, expected: f64, what: &str) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "{what}: expected {expected}, got {actual}"
    );
}
