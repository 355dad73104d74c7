//! Migration runner tests using in-memory SurrealDB.

use surrealdb::Surreal;
use surrealdb::engine::local::Mem;
use surrealdb_types::SurrealValue;

#[derive(Debug, SurrealValue)]
struct MigrationRow {
    version: u32,
}

#[tokio::test]
async fn migrations_apply_cleanly() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    larder_db::run_migrations(&db).await.unwrap();

    let mut result = db.query("SELECT version FROM _migration").await.unwrap();
    let rows: Vec<MigrationRow> = result.take(0).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].version, 1);
}

#[tokio::test]
async fn rerunning_migrations_is_idempotent() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    larder_db::run_migrations(&db).await.unwrap();
    larder_db::run_migrations(&db).await.unwrap();

    // The version record must not be duplicated.
    let mut result = db.query("SELECT version FROM _migration").await.unwrap();
    let rows: Vec<MigrationRow> = result.take(0).unwrap();
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn schema_enforces_the_unit_constraint() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    larder_db::run_migrations(&db).await.unwrap();

    let result = db
        .query(
            "CREATE pantry_item SET pantry_id = 'p', \
             product_name = 'Milk', product_category = 'Dairy', \
             quantity = 1.0, unit = 'FURLONGS', version = 1",
        )
        .await
        .unwrap()
        .check();
    assert!(result.is_err(), "bogus unit must be rejected");
}

#[tokio::test]
async fn schema_v1_is_exposed_for_inspection() {
    assert!(larder_db::schema_v1().contains("DEFINE TABLE pantry_item"));
}
