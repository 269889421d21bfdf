//! End-to-end tests of the `northload` binary in dry-run mode

mod common;

use assert_cmd::Command;
use common::{DataDir, CUSTOMERS_CSV, ORDERS_CSV, PRODUCTS_CSV};
use predicates::prelude::*;
use std::fs;

const ENV_VARS: &[&str] = &[
    "NORTHLOAD_CONFIG",
    "DB_HOST",
    "DB_PORT",
    "DB_USER",
    "DB_PASS",
    "DB_NAME",
    "DB_MAX_CONNECTIONS",
    "DB_CONNECT_TIMEOUT",
    "ETL_DATA_DIR",
    "ETL_SCHEMA",
    "ETL_BATCH_SIZE",
    "LOG_LEVEL",
    "LOG_OUTPUT",
    "LOG_FORMAT",
];

/// Binary isolated from the caller's environment, run inside `data`
fn northload(data: &DataDir) -> Command {
    let mut cmd = Command::cargo_bin("northload").unwrap();
    for var in ENV_VARS {
        cmd.env_remove(var);
    }
    cmd.current_dir(data.path());
    cmd.arg("--data-dir").arg(data.path()).arg("--dry-run");
    cmd
}

#[test]
fn test_all_datasets_present_exits_zero() {
    let data = DataDir::new();
    data.write("customers", CUSTOMERS_CSV);
    data.write("products", PRODUCTS_CSV);
    data.write("orders", ORDERS_CSV);
    data.write("order_details", "order_id,product_id,quantity\n10248,1,12\n");

    northload(&data)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "loaded customers: 3 rows -> \"public\".\"customers\"",
        ))
        .stdout(predicate::str::contains(
            "loaded order_details: 1 rows -> \"public\".\"order_details\"",
        ))
        .stdout(predicate::str::contains("batch completed: 4 succeeded, 0 failed, 10 rows"));
}

#[test]
fn test_missing_source_exits_one_and_reports_others() {
    let data = DataDir::new();
    data.write("customers", CUSTOMERS_CSV);

    northload(&data)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("loaded customers: 3 rows"))
        .stdout(predicate::str::contains("failed products: SourceUnavailable:"))
        .stdout(predicate::str::contains("failed orders: SourceUnavailable:"));
}

#[test]
fn test_dataset_flag_restricts_the_batch() {
    let data = DataDir::new();
    data.write("customers", CUSTOMERS_CSV);

    northload(&data)
        .args(["--dataset", "customers"])
        .assert()
        .success()
        .stdout(predicate::str::contains("products").not());
}

#[test]
fn test_unknown_dataset_is_a_failed_job() {
    let data = DataDir::new();
    data.write("customers", CUSTOMERS_CSV);

    northload(&data)
        .args(["--dataset", "widgets", "--dataset", "customers"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains(
            "failed widgets: UnknownDataset: no destination configured for dataset 'widgets'",
        ))
        .stdout(predicate::str::contains("loaded customers: 3 rows"));
}

#[test]
fn test_json_summary() {
    let data = DataDir::new();
    data.write("customers", CUSTOMERS_CSV);

    let output = northload(&data)
        .args(["--dataset", "customers", "--dataset", "orders", "--json"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["succeeded"], 1);
    assert_eq!(json["failed"], 1);
    assert_eq!(json["rows"], 3);
    assert_eq!(json["jobs"][0]["dataset"], "customers");
    assert_eq!(json["jobs"][0]["checksum"].as_str().unwrap().len(), 64);
    assert_eq!(json["jobs"][1]["error_kind"], "SourceUnavailable");
}

#[test]
fn test_config_file_remaps_datasets() {
    let data = DataDir::new();
    fs::write(data.path().join("clients_export.csv"), CUSTOMERS_CSV).unwrap();
    let config = data.path().join("northload.toml");
    fs::write(
        &config,
        r#"
schema = "staging"

[[datasets]]
key = "customers"
file = "clients_export.csv"
"#,
    )
    .unwrap();

    northload(&data)
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "loaded customers: 3 rows -> \"staging\".\"customers\"",
        ))
        .stdout(predicate::str::contains("batch completed: 1 succeeded, 0 failed"));
}

#[test]
fn test_invalid_config_exits_two() {
    let data = DataDir::new();
    let config = data.path().join("northload.toml");
    fs::write(&config, "batch_size = 0\n").unwrap();

    northload(&data)
        .arg("--config")
        .arg(&config)
        .assert()
        .code(2)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("batch_size must be greater than 0"));
}

#[test]
fn test_invalid_env_exits_two() {
    let data = DataDir::new();

    northload(&data)
        .env("DB_PORT", "not-a-port")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("DB_PORT"));
}
