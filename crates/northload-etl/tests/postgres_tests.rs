//! Table replacement against a real PostgreSQL server
//!
//! Run with `cargo test -p northload-etl --test postgres_tests -- --ignored`.

mod common;

use common::{DataDir, TestPostgres, CUSTOMERS_CSV, ORDERS_CSV, PRODUCTS_CSV};
use northload_etl::replace::{PgTableReplacer, TableReplacer};
use northload_etl::resolver::{DestinationResolver, TableName};
use northload_etl::rowset::{ColumnDescriptor, ColumnType, RowSet, Value};
use northload_etl::{ErrorKind, Pipeline};
use std::sync::Arc;

fn orders_rows(n: i64) -> RowSet {
    RowSet::new(
        vec![
            ColumnDescriptor::new("order_id", ColumnType::Integer),
            ColumnDescriptor::new("note", ColumnType::Text),
        ],
        (1..=n)
            .map(|i| {
                let note = if i % 2 == 0 {
                    Value::Null
                } else {
                    Value::Text(format!("order {}", i))
                };
                vec![Value::Integer(i), note]
            })
            .collect(),
    )
    .unwrap()
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_batch_creates_typed_tables() {
    let pg = TestPostgres::start().await.unwrap();
    let data = DataDir::new();
    data.write("customers", CUSTOMERS_CSV);
    data.write("products", PRODUCTS_CSV);
    data.write("orders", ORDERS_CSV);

    let replacer = Arc::new(PgTableReplacer::new(pg.pool().clone()));
    let pipe = Pipeline::new(DestinationResolver::with_defaults("public").unwrap(), replacer);
    let report = pipe
        .run(pipe.selected_jobs(
            data.path(),
            &["customers".into(), "products".into(), "orders".into()],
        ))
        .await;
    assert!(!report.has_failures(), "{}", report.render_text());

    assert_eq!(pg.row_count("public.customers").await.unwrap(), 3);
    let name: String = sqlx::query_scalar("SELECT name FROM public.customers WHERE customer_id = 1")
        .fetch_one(pg.pool())
        .await
        .unwrap();
    assert_eq!(name, "Alice");

    let types = pg.column_types("public", "products").await.unwrap();
    let types: Vec<&str> = types.iter().map(|(_, t)| t.as_str()).collect();
    assert_eq!(types, vec!["bigint", "text", "double precision", "boolean"]);

    let types = pg.column_types("public", "orders").await.unwrap();
    assert_eq!(types[2], ("order_date".to_string(), "date".to_string()));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_replace_cascades_to_dependent_views() {
    let pg = TestPostgres::start().await.unwrap();
    let replacer = PgTableReplacer::new(pg.pool().clone());
    let orders = TableName::new("public", "orders").unwrap();

    replacer.replace(&orders, &orders_rows(3)).await.unwrap();
    sqlx::query("CREATE VIEW public.odd_orders AS SELECT * FROM public.orders WHERE order_id % 2 = 1")
        .execute(pg.pool())
        .await
        .unwrap();
    sqlx::query("CREATE VIEW public.odd_order_count AS SELECT count(*) FROM public.odd_orders")
        .execute(pg.pool())
        .await
        .unwrap();

    replacer.replace(&orders, &orders_rows(5)).await.unwrap();

    assert_eq!(pg.row_count("public.orders").await.unwrap(), 5);
    assert!(!pg.view_exists("public", "odd_orders").await.unwrap());
    assert!(!pg.view_exists("public", "odd_order_count").await.unwrap());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_failed_insert_rolls_back() {
    let pg = TestPostgres::start().await.unwrap();
    let replacer = PgTableReplacer::new(pg.pool().clone());
    let orders = TableName::new("public", "orders").unwrap();

    replacer.replace(&orders, &orders_rows(2)).await.unwrap();
    sqlx::query("CREATE VIEW public.all_orders AS SELECT * FROM public.orders")
        .execute(pg.pool())
        .await
        .unwrap();

    // Text bound into a BIGINT column makes the INSERT fail after DROP and CREATE ran
    let bad = RowSet::new(
        vec![ColumnDescriptor::new("order_id", ColumnType::Integer)],
        vec![vec![Value::Text("not a number".into())]],
    )
    .unwrap();
    let err = replacer.replace(&orders, &bad).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::WriteFailure);

    assert_eq!(pg.row_count("public.orders").await.unwrap(), 2);
    assert!(pg.view_exists("public", "all_orders").await.unwrap());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_batches_split_by_size() {
    let pg = TestPostgres::start().await.unwrap();
    let replacer = PgTableReplacer::new(pg.pool().clone()).with_batch_size(4);
    let orders = TableName::new("public", "orders").unwrap();

    let stats = replacer.replace(&orders, &orders_rows(10)).await.unwrap();
    assert_eq!(stats.rows_written, 10);
    assert_eq!(stats.statements, 3);

    let nulls: i64 = sqlx::query_scalar("SELECT count(*) FROM public.orders WHERE note IS NULL")
        .fetch_one(pg.pool())
        .await
        .unwrap();
    assert_eq!(nulls, 5);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_missing_schema_is_schema_conflict() {
    let pg = TestPostgres::start().await.unwrap();
    let replacer = PgTableReplacer::new(pg.pool().clone());
    let table = TableName::new("no_such_schema", "orders").unwrap();

    let err = replacer.replace(&table, &orders_rows(1)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SchemaConflict);
}
