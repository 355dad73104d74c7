//! SurrealDB implementations of [`PantryRepository`] and
//! [`PantryItemRepository`].
//!
//! Stock rows carry a `version` counter. `store` and `delete_versioned`
//! only touch a row that still holds the expected version, which gives
//! the services their compare-and-swap write primitive. Calendar dates
//! are stored as ISO `YYYY-MM-DD` strings.

use chrono::{DateTime, NaiveDate, Utc};
use larder_core::error::LarderResult;
use larder_core::models::pantry::{NewPantryItem, Pantry, PantryItem, TransferPlan};
use larder_core::models::product::{Product, Unit};
use larder_core::repository::{
    ITEM_PAGE_SIZE, ItemFilter, PaginatedResult, PantryItemRepository, PantryRepository,
    SortColumn, SortDirection,
};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

fn date_to_string(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn parse_date(s: &str) -> Result<NaiveDate, DbError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| DbError::Data(format!("invalid date `{s}`: {e}")))
}

fn parse_unit(s: &str) -> Result<Unit, DbError> {
    Unit::parse(s).ok_or_else(|| DbError::Data(format!("unknown unit: {s}")))
}

/// Map a sort column onto a pantry_item column. Columns that only exist
/// on shopping-list rows fall back to the product name.
fn sort_column_sql(column: SortColumn) -> &'static str {
    match column {
        SortColumn::Name | SortColumn::Purchased => "product_name",
        SortColumn::Category => "product_category",
        SortColumn::Quantity => "quantity",
        SortColumn::Unit => "unit",
        SortColumn::PurchaseDate => "purchase_date",
        SortColumn::ExpirationDate => "expiration_date",
        SortColumn::Placement => "placement",
        SortColumn::CreatedAt => "created_at",
    }
}

fn direction_sql(direction: SortDirection) -> &'static str {
    match direction {
        SortDirection::Ascending => "ASC",
        SortDirection::Descending => "DESC",
    }
}

// -----------------------------------------------------------------------
// Pantries
// -----------------------------------------------------------------------

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct PantryRow {
    group_id: String,
    created_at: DateTime<Utc>,
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct PantryRowWithId {
    record_id: String,
    group_id: String,
    created_at: DateTime<Utc>,
}

impl PantryRow {
    fn into_pantry(self, id: Uuid) -> Result<Pantry, DbError> {
        let group_id = Uuid::parse_str(&self.group_id)
            .map_err(|e| DbError::Data(format!("invalid group UUID: {e}")))?;
        Ok(Pantry {
            id,
            group_id,
            created_at: self.created_at,
        })
    }
}

impl PantryRowWithId {
    fn try_into_pantry(self) -> Result<Pantry, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Data(format!("invalid pantry UUID: {e}")))?;
        let group_id = Uuid::parse_str(&self.group_id)
            .map_err(|e| DbError::Data(format!("invalid group UUID: {e}")))?;
        Ok(Pantry {
            id,
            group_id,
            created_at: self.created_at,
        })
    }
}

/// SurrealDB implementation of the Pantry repository.
#[derive(Clone)]
pub struct SurrealPantryRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealPantryRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> PantryRepository for SurrealPantryRepository<C> {
    async fn get_by_id(&self, id: Uuid) -> LarderResult<Pantry> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('pantry', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PantryRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "pantry".into(),
            id: id_str,
        })?;

        Ok(row.into_pantry(id)?)
    }

    async fn get_by_group(&self, group_id: Uuid) -> LarderResult<Pantry> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM pantry \
                 WHERE group_id = $group_id",
            )
            .bind(("group_id", group_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PantryRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "pantry".into(),
            id: format!("group={group_id}"),
        })?;

        Ok(row.try_into_pantry()?)
    }
}

// -----------------------------------------------------------------------
// Pantry items
// -----------------------------------------------------------------------

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct PantryItemRow {
    pantry_id: String,
    product_name: String,
    product_category: String,
    quantity: f64,
    reserved_quantity: f64,
    unit: String,
    purchase_date: Option<String>,
    expiration_date: Option<String>,
    placement: Option<String>,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct PantryItemRowWithId {
    record_id: String,
    pantry_id: String,
    product_name: String,
    product_category: String,
    quantity: f64,
    reserved_quantity: f64,
    unit: String,
    purchase_date: Option<String>,
    expiration_date: Option<String>,
    placement: Option<String>,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PantryItemRow {
    fn into_item(self, id: Uuid) -> Result<PantryItem, DbError> {
        let pantry_id = Uuid::parse_str(&self.pantry_id)
            .map_err(|e| DbError::Data(format!("invalid pantry UUID: {e}")))?;
        Ok(PantryItem {
            id,
            pantry_id,
            product: Product {
                name: self.product_name,
                category: self.product_category,
            },
            quantity: self.quantity,
            reserved_quantity: self.reserved_quantity,
            unit: parse_unit(&self.unit)?,
            purchase_date: self.purchase_date.as_deref().map(parse_date).transpose()?,
            expiration_date: self.expiration_date.as_deref().map(parse_date).transpose()?,
            placement: self.placement,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl PantryItemRowWithId {
    fn try_into_item(self) -> Result<PantryItem, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Data(format!("invalid item UUID: {e}")))?;
        let pantry_id = Uuid::parse_str(&self.pantry_id)
            .map_err(|e| DbError::Data(format!("invalid pantry UUID: {e}")))?;
        Ok(PantryItem {
            id,
            pantry_id,
            product: Product {
                name: self.product_name,
                category: self.product_category,
            },
            quantity: self.quantity,
            reserved_quantity: self.reserved_quantity,
            unit: parse_unit(&self.unit)?,
            purchase_date: self.purchase_date.as_deref().map(parse_date).transpose()?,
            expiration_date: self.expiration_date.as_deref().map(parse_date).transpose()?,
            placement: self.placement,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// SurrealDB implementation of the PantryItem repository.
#[derive(Clone)]
pub struct SurrealPantryItemRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealPantryItemRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> PantryItemRepository for SurrealPantryItemRepository<C> {
    async fn create(&self, input: NewPantryItem) -> LarderResult<PantryItem> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('pantry_item', $id) SET \
                 pantry_id = $pantry_id, \
                 product_name = $product_name, \
                 product_category = $product_category, \
                 quantity = $quantity, reserved_quantity = 0.0, \
                 unit = $unit, purchase_date = $purchase_date, \
                 expiration_date = $expiration_date, \
                 placement = $placement, version = 1",
            )
            .bind(("id", id_str.clone()))
            .bind(("pantry_id", input.pantry_id.to_string()))
            .bind(("product_name", input.product.name))
            .bind(("product_category", input.product.category))
            .bind(("quantity", input.quantity))
            .bind(("unit", input.unit.as_str()))
            .bind(("purchase_date", input.purchase_date.map(date_to_string)))
            .bind(("expiration_date", input.expiration_date.map(date_to_string)))
            .bind(("placement", input.placement))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(DbError::from)?;

        let rows: Vec<PantryItemRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "pantry item".into(),
            id: id_str,
        })?;

        Ok(row.into_item(id)?)
    }

    async fn get(&self, pantry_id: Uuid, item_id: Uuid) -> LarderResult<PantryItem> {
        let id_str = item_id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT * FROM type::record('pantry_item', $id) \
                 WHERE pantry_id = $pantry_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("pantry_id", pantry_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PantryItemRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "pantry item".into(),
            id: id_str,
        })?;

        Ok(row.into_item(item_id)?)
    }

    async fn find_by_product(
        &self,
        pantry_id: Uuid,
        product: &Product,
        unit: Unit,
    ) -> LarderResult<Option<PantryItem>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM pantry_item \
                 WHERE pantry_id = $pantry_id \
                 AND product_name = $product_name \
                 AND product_category = $product_category \
                 AND unit = $unit",
            )
            .bind(("pantry_id", pantry_id.to_string()))
            .bind(("product_name", product.name.clone()))
            .bind(("product_category", product.category.clone()))
            .bind(("unit", unit.as_str()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PantryItemRowWithId> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(row.try_into_item()?)),
            None => Ok(None),
        }
    }

    async fn list(
        &self,
        pantry_id: Uuid,
        filter: &ItemFilter,
    ) -> LarderResult<PaginatedResult<PantryItem>> {
        let pantry_id_str = pantry_id.to_string();
        let filter_term = filter.filter_value.as_ref().map(|v| v.to_lowercase());
        let filter_clause = if filter_term.is_some() {
            " AND (string::lowercase(product_name) CONTAINS $filter \
             OR string::lowercase(product_category) CONTAINS $filter \
             OR string::lowercase(placement ?? '') CONTAINS $filter)"
        } else {
            ""
        };

        let count_query = format!(
            "SELECT count() AS total FROM pantry_item \
             WHERE pantry_id = $pantry_id{filter_clause} GROUP ALL"
        );
        let mut builder = self
            .db
            .query(count_query)
            .bind(("pantry_id", pantry_id_str.clone()));
        if let Some(ref term) = filter_term {
            builder = builder.bind(("filter", term.clone()));
        }
        let mut count_result = builder.await.map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let data_query = format!(
            "SELECT meta::id(id) AS record_id, * FROM pantry_item \
             WHERE pantry_id = $pantry_id{filter_clause} \
             ORDER BY {column} {direction} \
             LIMIT $limit START $offset",
            column = sort_column_sql(filter.sort),
            direction = direction_sql(filter.direction),
        );
        let mut builder = self
            .db
            .query(data_query)
            .bind(("pantry_id", pantry_id_str))
            .bind(("limit", ITEM_PAGE_SIZE))
            .bind(("offset", filter.offset()));
        if let Some(term) = filter_term {
            builder = builder.bind(("filter", term));
        }
        let mut result = builder.await.map_err(DbError::from)?;

        let rows: Vec<PantryItemRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(|row| row.try_into_item())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: filter.offset(),
            limit: ITEM_PAGE_SIZE,
        })
    }

    async fn all(&self, pantry_id: Uuid) -> LarderResult<Vec<PantryItem>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM pantry_item \
                 WHERE pantry_id = $pantry_id ORDER BY created_at ASC",
            )
            .bind(("pantry_id", pantry_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PantryItemRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(|row| row.try_into_item())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(items)
    }

    async fn store(&self, item: &PantryItem) -> LarderResult<Option<PantryItem>> {
        let mut result = self
            .db
            .query(
                "UPDATE type::record('pantry_item', $id) SET \
                 quantity = $quantity, \
                 reserved_quantity = $reserved_quantity, \
                 unit = $unit, purchase_date = $purchase_date, \
                 expiration_date = $expiration_date, \
                 placement = $placement, \
                 version = version + 1, updated_at = time::now() \
                 WHERE pantry_id = $pantry_id \
                 AND version = $expected_version",
            )
            .bind(("id", item.id.to_string()))
            .bind(("pantry_id", item.pantry_id.to_string()))
            .bind(("quantity", item.quantity))
            .bind(("reserved_quantity", item.reserved_quantity))
            .bind(("unit", item.unit.as_str()))
            .bind(("purchase_date", item.purchase_date.map(date_to_string)))
            .bind(("expiration_date", item.expiration_date.map(date_to_string)))
            .bind(("placement", item.placement.clone()))
            .bind(("expected_version", item.version))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        // An empty result means the version moved on (or the row is
        // gone); the caller decides whether to retry.
        let rows: Vec<PantryItemRow> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(row.into_item(item.id)?)),
            None => Ok(None),
        }
    }

    async fn apply_transfer(&self, plan: &TransferPlan) -> LarderResult<()> {
        if plan.is_empty() {
            return Ok(());
        }

        let mut statements = vec!["BEGIN TRANSACTION;".to_string()];
        for i in 0..plan.additions.len() {
            statements.push(format!(
                "UPDATE type::record('pantry_item', $add_id_{i}) SET \
                 quantity = quantity + $add_amount_{i}, \
                 version = version + 1, updated_at = time::now();"
            ));
        }
        for i in 0..plan.creations.len() {
            statements.push(format!(
                "CREATE type::record('pantry_item', $new_id_{i}) SET \
                 pantry_id = $new_pantry_{i}, \
                 product_name = $new_name_{i}, \
                 product_category = $new_category_{i}, \
                 quantity = $new_quantity_{i}, reserved_quantity = 0.0, \
                 unit = $new_unit_{i}, \
                 purchase_date = $new_purchase_{i}, \
                 expiration_date = $new_expiration_{i}, \
                 placement = $new_placement_{i}, version = 1;"
            ));
        }
        for i in 0..plan.removed_list_items.len() {
            statements.push(format!(
                "DELETE type::record('shopping_list_item', $rm_id_{i});"
            ));
        }
        statements.push("COMMIT TRANSACTION;".to_string());

        let mut builder = self.db.query(statements.join(" "));
        for (i, addition) in plan.additions.iter().enumerate() {
            builder = builder
                .bind((format!("add_id_{i}"), addition.item_id.to_string()))
                .bind((format!("add_amount_{i}"), addition.amount));
        }
        for (i, creation) in plan.creations.iter().enumerate() {
            builder = builder
                .bind((format!("new_id_{i}"), Uuid::new_v4().to_string()))
                .bind((format!("new_pantry_{i}"), creation.pantry_id.to_string()))
                .bind((format!("new_name_{i}"), creation.product.name.clone()))
                .bind((
                    format!("new_category_{i}"),
                    creation.product.category.clone(),
                ))
                .bind((format!("new_quantity_{i}"), creation.quantity))
                .bind((format!("new_unit_{i}"), creation.unit.as_str()))
                .bind((
                    format!("new_purchase_{i}"),
                    creation.purchase_date.map(date_to_string),
                ))
                .bind((
                    format!("new_expiration_{i}"),
                    creation.expiration_date.map(date_to_string),
                ))
                .bind((format!("new_placement_{i}"), creation.placement.clone()));
        }
        for (i, item_id) in plan.removed_list_items.iter().enumerate() {
            builder = builder.bind((format!("rm_id_{i}"), item_id.to_string()));
        }

        builder
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn delete(&self, pantry_id: Uuid, item_id: Uuid) -> LarderResult<()> {
        self.db
            .query(
                "DELETE type::record('pantry_item', $id) \
                 WHERE pantry_id = $pantry_id",
            )
            .bind(("id", item_id.to_string()))
            .bind(("pantry_id", pantry_id.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn delete_versioned(
        &self,
        pantry_id: Uuid,
        item_id: Uuid,
        expected_version: u64,
    ) -> LarderResult<bool> {
        let mut result = self
            .db
            .query(
                "DELETE type::record('pantry_item', $id) \
                 WHERE pantry_id = $pantry_id \
                 AND version = $expected_version RETURN BEFORE",
            )
            .bind(("id", item_id.to_string()))
            .bind(("pantry_id", pantry_id.to_string()))
            .bind(("expected_version", expected_version))
            .await
            .map_err(DbError::from)?;

        let removed: Vec<PantryItemRow> = result.take(0).map_err(DbError::from)?;
        Ok(!removed.is_empty())
    }
}
