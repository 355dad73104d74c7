//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode for data integrity.
//! UUIDs are stored as strings. Enums are stored as strings with
//! ASSERT constraints for validation. Calendar dates (purchase,
//! expiration) are stored as ISO `YYYY-MM-DD` strings.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
    #[allow(dead_code)]
    name: String,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1 — initial table definitions
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Users (global scope)
-- =======================================================================
DEFINE TABLE user SCHEMAFULL;
DEFINE FIELD username ON TABLE user TYPE string;
DEFINE FIELD email ON TABLE user TYPE string;
DEFINE FIELD password_hash ON TABLE user TYPE string;
DEFINE FIELD created_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_user_username ON TABLE user COLUMNS username UNIQUE;
DEFINE INDEX idx_user_email ON TABLE user COLUMNS email UNIQUE;

-- =======================================================================
-- Groups (global scope)
-- =======================================================================
DEFINE TABLE group SCHEMAFULL;
DEFINE FIELD name ON TABLE group TYPE string;
DEFINE FIELD created_by ON TABLE group TYPE string;
DEFINE FIELD created_at ON TABLE group TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE group TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_group_name ON TABLE group COLUMNS name UNIQUE;

-- =======================================================================
-- Pantries (one per group)
-- =======================================================================
DEFINE TABLE pantry SCHEMAFULL;
DEFINE FIELD group_id ON TABLE pantry TYPE string;
DEFINE FIELD created_at ON TABLE pantry TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_pantry_group ON TABLE pantry COLUMNS group_id UNIQUE;

-- =======================================================================
-- Pantry items (stock rows)
-- =======================================================================
DEFINE TABLE pantry_item SCHEMAFULL;
DEFINE FIELD pantry_id ON TABLE pantry_item TYPE string;
DEFINE FIELD product_name ON TABLE pantry_item TYPE string;
DEFINE FIELD product_category ON TABLE pantry_item TYPE string;
DEFINE FIELD quantity ON TABLE pantry_item TYPE float;
DEFINE FIELD reserved_quantity ON TABLE pantry_item TYPE float \
    DEFAULT 0.0;
DEFINE FIELD unit ON TABLE pantry_item TYPE string \
    ASSERT $value IN ['GRAMS', 'KILOGRAMS', 'MILLILITERS', 'LITERS', \
    'PIECES', 'PACKS'];
DEFINE FIELD purchase_date ON TABLE pantry_item TYPE option<string>;
DEFINE FIELD expiration_date ON TABLE pantry_item TYPE option<string>;
DEFINE FIELD placement ON TABLE pantry_item TYPE option<string>;
DEFINE FIELD version ON TABLE pantry_item TYPE int DEFAULT 1;
DEFINE FIELD created_at ON TABLE pantry_item TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE pantry_item TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_pantry_item_product ON TABLE pantry_item \
    COLUMNS pantry_id, product_name, product_category, unit UNIQUE;
DEFINE INDEX idx_pantry_item_pantry ON TABLE pantry_item \
    COLUMNS pantry_id;

-- =======================================================================
-- Shopping lists (group scope)
-- =======================================================================
DEFINE TABLE shopping_list SCHEMAFULL;
DEFINE FIELD group_id ON TABLE shopping_list TYPE string;
DEFINE FIELD name ON TABLE shopping_list TYPE string;
DEFINE FIELD pantry_id ON TABLE shopping_list TYPE option<string>;
DEFINE FIELD created_at ON TABLE shopping_list TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE shopping_list TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_shopping_list_group_name ON TABLE shopping_list \
    COLUMNS group_id, name UNIQUE;
DEFINE INDEX idx_shopping_list_pantry ON TABLE shopping_list \
    COLUMNS pantry_id;

-- =======================================================================
-- Shopping list items
-- =======================================================================
DEFINE TABLE shopping_list_item SCHEMAFULL;
DEFINE FIELD list_id ON TABLE shopping_list_item TYPE string;
DEFINE FIELD product_name ON TABLE shopping_list_item TYPE string;
DEFINE FIELD product_category ON TABLE shopping_list_item TYPE string;
DEFINE FIELD quantity ON TABLE shopping_list_item TYPE float;
DEFINE FIELD unit ON TABLE shopping_list_item TYPE string \
    ASSERT $value IN ['GRAMS', 'KILOGRAMS', 'MILLILITERS', 'LITERS', \
    'PIECES', 'PACKS'];
DEFINE FIELD purchased ON TABLE shopping_list_item TYPE bool \
    DEFAULT false;
DEFINE FIELD created_at ON TABLE shopping_list_item TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE shopping_list_item TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_shopping_list_item_list ON TABLE shopping_list_item \
    COLUMNS list_id;

-- =======================================================================
-- Authority grants (user x group x kind)
-- =======================================================================
DEFINE TABLE authority SCHEMAFULL;
DEFINE FIELD user_id ON TABLE authority TYPE string;
DEFINE FIELD group_id ON TABLE authority TYPE string;
DEFINE FIELD kind ON TABLE authority TYPE string \
    ASSERT $value IN ['READ', 'ADD', 'DELETE', 'RESERVE', 'MODIFY', \
    'MODIFY_PANTRY', 'MODIFY_GROUP', 'ADD_TO_GROUP'];
DEFINE FIELD created_at ON TABLE authority TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_authority_grant ON TABLE authority \
    COLUMNS user_id, group_id, kind UNIQUE;
DEFINE INDEX idx_authority_group ON TABLE authority COLUMNS group_id;

-- =======================================================================
-- Recipes (global scope)
-- =======================================================================
DEFINE TABLE recipe SCHEMAFULL;
DEFINE FIELD name ON TABLE recipe TYPE string;
DEFINE FIELD preparation ON TABLE recipe TYPE string;
DEFINE FIELD prep_time_minutes ON TABLE recipe TYPE int;
DEFINE FIELD cuisine ON TABLE recipe TYPE string;
DEFINE FIELD portions ON TABLE recipe TYPE int;
DEFINE FIELD created_by ON TABLE recipe TYPE string;
DEFINE FIELD image ON TABLE recipe TYPE string;
DEFINE FIELD created_at ON TABLE recipe TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE recipe TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_recipe_creator ON TABLE recipe COLUMNS created_by;

-- =======================================================================
-- Recipe ingredients (ordered child rows)
-- =======================================================================
DEFINE TABLE recipe_ingredient SCHEMAFULL;
DEFINE FIELD recipe_id ON TABLE recipe_ingredient TYPE string;
DEFINE FIELD position ON TABLE recipe_ingredient TYPE int;
DEFINE FIELD product_name ON TABLE recipe_ingredient TYPE string;
DEFINE FIELD product_category ON TABLE recipe_ingredient TYPE string;
DEFINE FIELD required_quantity ON TABLE recipe_ingredient TYPE float;
DEFINE FIELD unit ON TABLE recipe_ingredient TYPE string \
    ASSERT $value IN ['GRAMS', 'KILOGRAMS', 'MILLILITERS', 'LITERS', \
    'PIECES', 'PACKS'];
DEFINE INDEX idx_recipe_ingredient_position ON TABLE recipe_ingredient \
    COLUMNS recipe_id, position UNIQUE;

-- =======================================================================
-- Graph Edge Tables (relations)
-- =======================================================================

-- User -> Group membership
DEFINE TABLE member_of TYPE RELATION SCHEMAFULL;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
/// All DEFINE statements are idempotent so re-running is safe.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    // Ensure migration tracking table exists (idempotent).
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    // Determine current schema version.
    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version > current_version {
            info!(
                version = migration.version,
                name = migration.name,
                "Applying migration"
            );
            db.query(migration.sql).await?.check().map_err(|e| {
                DbError::Migration(format!(
                    "Migration v{} '{}' failed: {}",
                    migration.version, migration.name, e,
                ))
            })?;

            // Record the applied migration.
            db.query(
                "CREATE _migration SET version = $version, \
                 name = $name",
            )
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "Failed to record migration v{}: {}",
                    migration.version, e,
                ))
            })?;

            info!(
                version = migration.version,
                "Migration applied successfully"
            );
        }
    }

    Ok(())
}

/// Returns the raw schema DDL for version 1.
///
/// Exposed for testing with in-memory SurrealDB instances that
/// bypass the migration runner.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}
