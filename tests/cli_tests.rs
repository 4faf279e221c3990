use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn reports_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("dairy-reports"))
}

fn write_json(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    path
}

const SNF_ORDERS: &str = r#"{
  "data": [
    {"id": 1, "orderNo": "SNF-1", "customerName": "Asha", "city": "Pune",
     "depot": {"id": 1, "name": "Pune Depot"}, "paymentStatus": "PAID",
     "paymentMode": "UPI", "itemCount": 2, "totalAmount": 200},
    {"id": 2, "orderNo": "SNF-2", "customerName": "Ravi", "city": "Mumbai",
     "depot": null, "paymentStatus": null, "itemCount": 1, "totalAmount": 80}
  ],
  "totalPages": 1,
  "totalRecords": 2
}"#;

const GROUPED_DELIVERIES: &str = r#"{
  "data": [
    {
      "level": "agency", "id": 1, "name": "North",
      "totals": {"totalQuantity": 3, "totalAmount": 150, "itemCount": 2},
      "data": [
        {"id": 10, "customerName": "Asha", "agencyName": "North", "quantity": 1, "amount": 50},
        {"id": 11, "customerName": "Ravi", "agencyName": "North", "quantity": 2, "amount": 100}
      ]
    }
  ],
  "totals": {"totalQuantity": 3, "totalAmount": 150, "itemCount": 2}
}"#;

#[test]
fn test_help() {
    reports_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Dairy subscription report"));
}

#[test]
fn test_version() {
    reports_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("dairy-reports"));
}

#[test]
fn test_init_creates_config() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("reports-config");

    reports_cmd()
        .args(["-C", config_path.to_str().unwrap(), "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized report config"));

    assert!(config_path.join("config.toml").exists());
    assert!(config_path.join("session.toml").exists());
    assert!(config_path.join("reports.toml").exists());
    assert!(config_path.join("output").is_dir());
}

#[test]
fn test_init_fails_if_exists() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("reports-config");

    reports_cmd()
        .args(["-C", config_path.to_str().unwrap(), "init"])
        .assert()
        .success();

    reports_cmd()
        .args(["-C", config_path.to_str().unwrap(), "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_status_without_init() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("nonexistent");

    reports_cmd()
        .args(["-C", config_path.to_str().unwrap(), "status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_status_after_init() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("reports-config");

    reports_cmd()
        .args(["-C", config_path.to_str().unwrap(), "init"])
        .assert()
        .success();

    reports_cmd()
        .args(["-C", config_path.to_str().unwrap(), "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Report Status"))
        .stdout(predicate::str::contains("http://localhost:3000"))
        .stdout(predicate::str::contains("no token"));
}

#[test]
fn test_reports_list() {
    reports_cmd()
        .arg("reports")
        .assert()
        .success()
        .stdout(predicate::str::contains("snf-orders"))
        .stdout(predicate::str::contains("/api/reports/purchases"))
        .stdout(predicate::str::contains("Exception Report"));
}

#[test]
fn test_show_flat_input() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_json(temp_dir.path(), "snf.json", SNF_ORDERS);

    reports_cmd()
        .args(["-C", temp_dir.path().join("cfg").to_str().unwrap()])
        .args(["show", "snf-orders", "--input", input.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Order No"))
        .stdout(predicate::str::contains("SNF-1"))
        .stdout(predicate::str::contains("Pune Depot"))
        .stdout(predicate::str::contains("Total records: 2"));
}

#[test]
fn test_show_grouped_collapsed_and_expanded() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_json(temp_dir.path(), "deliveries.json", GROUPED_DELIVERIES);
    let cfg = temp_dir.path().join("cfg");

    reports_cmd()
        .args(["-C", cfg.to_str().unwrap()])
        .args(["show", "delivery-agency", "--input", input.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Agency: North [agency:1]"))
        .stdout(predicate::str::contains("Asha").not())
        .stdout(predicate::str::contains("--expand-all"));

    reports_cmd()
        .args(["-C", cfg.to_str().unwrap()])
        .args(["show", "delivery-agency", "--input", input.to_str().unwrap()])
        .args(["--expand", "agency:1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Asha"))
        .stdout(predicate::str::contains("Ravi"));
}

#[test]
fn test_summary_buckets_missing_values() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_json(temp_dir.path(), "snf.json", SNF_ORDERS);

    reports_cmd()
        .args(["-C", temp_dir.path().join("cfg").to_str().unwrap()])
        .args(["summary", "snf-orders", "--input", input.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("By depot"))
        .stdout(predicate::str::contains("No Depot"))
        .stdout(predicate::str::contains("NOT_SPECIFIED"))
        .stdout(predicate::str::contains("280.00"))
        .stdout(predicate::str::contains("140.00"));
}

#[test]
fn test_summary_unsupported_report() {
    reports_cmd()
        .args(["summary", "purchase", "--input", "unused.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("has no client-side summary"));
}

#[test]
fn test_export_xlsx_to_output_path() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_json(temp_dir.path(), "deliveries.json", GROUPED_DELIVERIES);
    let output = temp_dir.path().join("deliveries.xlsx");

    reports_cmd()
        .args(["-C", temp_dir.path().join("cfg").to_str().unwrap()])
        .args(["export", "delivery-agency", "--input", input.to_str().unwrap()])
        .args(["-o", output.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported Delivery Agency Report"))
        .stdout(predicate::str::contains("Rows:   2"));

    let bytes = fs::read(&output).unwrap();
    assert_eq!(&bytes[..2], b"PK");
}

#[test]
fn test_export_names_file_after_range() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("reports-config");
    let input = write_json(temp_dir.path(), "snf.json", SNF_ORDERS);

    reports_cmd()
        .args(["-C", config_path.to_str().unwrap(), "init"])
        .assert()
        .success();

    reports_cmd()
        .args(["-C", config_path.to_str().unwrap()])
        .args(["export", "snf-orders", "--input", input.to_str().unwrap()])
        .args(["--from", "2024-01-01", "--to", "2024-01-31"])
        .assert()
        .success();

    assert!(config_path
        .join("output")
        .join("SNF_Orders_Report_2024-01-01_to_2024-01-31.xlsx")
        .exists());
}

#[test]
fn test_export_empty_data() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_json(temp_dir.path(), "empty.json", r#"{"data": [], "totalPages": 0}"#);
    let output = temp_dir.path().join("empty.xlsx");

    reports_cmd()
        .args(["-C", temp_dir.path().join("cfg").to_str().unwrap()])
        .args(["export", "purchase", "--input", input.to_str().unwrap()])
        .args(["-o", output.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("No data to export"));

    assert!(!output.exists());
}

#[test]
fn test_unknown_report() {
    reports_cmd()
        .args(["export", "banners"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown report 'banners'"));
}

#[test]
fn test_export_without_token() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("reports-config");

    reports_cmd()
        .args(["-C", config_path.to_str().unwrap(), "init"])
        .assert()
        .success();

    reports_cmd()
        .args(["-C", config_path.to_str().unwrap(), "export", "purchase"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No auth token"));
}

#[test]
fn test_agency_role_cannot_view_admin_reports() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("reports-config");

    reports_cmd()
        .args(["-C", config_path.to_str().unwrap(), "init"])
        .assert()
        .success();

    fs::write(
        config_path.join("session.toml"),
        "agencyId = 4\n[user]\nrole = \"AGENCY\"\ntoken = \"t\"\n",
    )
    .unwrap();

    reports_cmd()
        .args(["-C", config_path.to_str().unwrap(), "show", "purchase"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("don't have permission"));
}

#[test]
fn test_invalid_date_range() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_json(temp_dir.path(), "snf.json", SNF_ORDERS);

    reports_cmd()
        .args(["-C", temp_dir.path().join("cfg").to_str().unwrap()])
        .args(["show", "snf-orders", "--input", input.to_str().unwrap()])
        .args(["--from", "2024-02-01", "--to", "2024-01-01"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid date range"));
}
