//! SurrealDB implementations of [`ShoppingListRepository`] and
//! [`ShoppingListItemRepository`].
//!
//! Merge batches are applied as one transaction so a demand batch never
//! lands half-way.

use chrono::{DateTime, Utc};
use larder_core::error::LarderResult;
use larder_core::models::product::Product;
use larder_core::models::shopping_list::{
    CreateShoppingList, MergeAction, NewShoppingListItem, ShoppingList, ShoppingListItem,
};
use larder_core::repository::{
    ITEM_PAGE_SIZE, ItemFilter, PaginatedResult, ShoppingListItemRepository,
    ShoppingListRepository, SortColumn, SortDirection,
};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

fn parse_unit(s: &str) -> Result<larder_core::models::product::Unit, DbError> {
    larder_core::models::product::Unit::parse(s)
        .ok_or_else(|| DbError::Data(format!("unknown unit: {s}")))
}

/// Map a sort column onto a shopping_list_item column. Columns that
/// only exist on pantry rows fall back to the product name.
fn sort_column_sql(column: SortColumn) -> &'static str {
    match column {
        SortColumn::Name
        | SortColumn::PurchaseDate
        | SortColumn::ExpirationDate
        | SortColumn::Placement => "product_name",
        SortColumn::Category => "product_category",
        SortColumn::Quantity => "quantity",
        SortColumn::Unit => "unit",
        SortColumn::Purchased => "purchased",
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
// Shopping lists
// -----------------------------------------------------------------------

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct ShoppingListRow {
    group_id: String,
    name: String,
    pantry_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct ShoppingListRowWithId {
    record_id: String,
    group_id: String,
    name: String,
    pantry_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ShoppingListRow {
    fn into_list(self, id: Uuid) -> Result<ShoppingList, DbError> {
        let group_id = Uuid::parse_str(&self.group_id)
            .map_err(|e| DbError::Data(format!("invalid group UUID: {e}")))?;
        let pantry_id = self
            .pantry_id
            .as_deref()
            .map(Uuid::parse_str)
            .transpose()
            .map_err(|e| DbError::Data(format!("invalid pantry UUID: {e}")))?;
        Ok(ShoppingList {
            id,
            group_id,
            name: self.name,
            pantry_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl ShoppingListRowWithId {
    fn try_into_list(self) -> Result<ShoppingList, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Data(format!("invalid list UUID: {e}")))?;
        let group_id = Uuid::parse_str(&self.group_id)
            .map_err(|e| DbError::Data(format!("invalid group UUID: {e}")))?;
        let pantry_id = self
            .pantry_id
            .as_deref()
            .map(Uuid::parse_str)
            .transpose()
            .map_err(|e| DbError::Data(format!("invalid pantry UUID: {e}")))?;
        Ok(ShoppingList {
            id,
            group_id,
            name: self.name,
            pantry_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the ShoppingList repository.
#[derive(Clone)]
pub struct SurrealShoppingListRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealShoppingListRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> ShoppingListRepository for SurrealShoppingListRepository<C> {
    async fn create(&self, input: CreateShoppingList) -> LarderResult<ShoppingList> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('shopping_list', $id) SET \
                 group_id = $group_id, name = $name, \
                 pantry_id = $pantry_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("group_id", input.group_id.to_string()))
            .bind(("name", input.name))
            .bind(("pantry_id", input.pantry_id.map(|p| p.to_string())))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(DbError::from)?;

        let rows: Vec<ShoppingListRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "shopping list".into(),
            id: id_str,
        })?;

        Ok(row.into_list(id)?)
    }

    async fn get(&self, group_id: Uuid, list_id: Uuid) -> LarderResult<ShoppingList> {
        let id_str = list_id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT * FROM type::record('shopping_list', $id) \
                 WHERE group_id = $group_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("group_id", group_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ShoppingListRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "shopping list".into(),
            id: id_str,
        })?;

        Ok(row.into_list(list_id)?)
    }

    async fn find_by_name(&self, group_id: Uuid, name: &str) -> LarderResult<Option<ShoppingList>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM shopping_list \
                 WHERE group_id = $group_id AND name = $name",
            )
            .bind(("group_id", group_id.to_string()))
            .bind(("name", name.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ShoppingListRowWithId> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(row.try_into_list()?)),
            None => Ok(None),
        }
    }

    async fn list_for_group(&self, group_id: Uuid) -> LarderResult<Vec<ShoppingList>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM shopping_list \
                 WHERE group_id = $group_id ORDER BY created_at ASC",
            )
            .bind(("group_id", group_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ShoppingListRowWithId> = result.take(0).map_err(DbError::from)?;
        let lists = rows
            .into_iter()
            .map(|row| row.try_into_list())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(lists)
    }

    async fn find_linked(&self, pantry_id: Uuid) -> LarderResult<Option<ShoppingList>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM shopping_list \
                 WHERE pantry_id = $pantry_id \
                 ORDER BY created_at ASC LIMIT 1",
            )
            .bind(("pantry_id", pantry_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ShoppingListRowWithId> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(row.try_into_list()?)),
            None => Ok(None),
        }
    }

    async fn delete(&self, group_id: Uuid, list_id: Uuid) -> LarderResult<()> {
        self.db
            .query(
                "BEGIN TRANSACTION; \
                 DELETE shopping_list_item WHERE list_id = $id; \
                 DELETE type::record('shopping_list', $id) \
                 WHERE group_id = $group_id; \
                 COMMIT TRANSACTION;",
            )
            .bind(("id", list_id.to_string()))
            .bind(("group_id", group_id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        Ok(())
    }
}

// -----------------------------------------------------------------------
// Shopping list items
// -----------------------------------------------------------------------

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct ShoppingListItemRow {
    list_id: String,
    product_name: String,
    product_category: String,
    quantity: f64,
    unit: String,
    purchased: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct ShoppingListItemRowWithId {
    record_id: String,
    list_id: String,
    product_name: String,
    product_category: String,
    quantity: f64,
    unit: String,
    purchased: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ShoppingListItemRow {
    fn into_item(self, id: Uuid) -> Result<ShoppingListItem, DbError> {
        let list_id = Uuid::parse_str(&self.list_id)
            .map_err(|e| DbError::Data(format!("invalid list UUID: {e}")))?;
        Ok(ShoppingListItem {
            id,
            list_id,
            product: Product {
                name: self.product_name,
                category: self.product_category,
            },
            quantity: self.quantity,
            unit: parse_unit(&self.unit)?,
            purchased: self.purchased,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl ShoppingListItemRowWithId {
    fn try_into_item(self) -> Result<ShoppingListItem, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Data(format!("invalid item UUID: {e}")))?;
        let list_id = Uuid::parse_str(&self.list_id)
            .map_err(|e| DbError::Data(format!("invalid list UUID: {e}")))?;
        Ok(ShoppingListItem {
            id,
            list_id,
            product: Product {
                name: self.product_name,
                category: self.product_category,
            },
            quantity: self.quantity,
            unit: parse_unit(&self.unit)?,
            purchased: self.purchased,
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

/// SurrealDB implementation of the ShoppingListItem repository.
#[derive(Clone)]
pub struct SurrealShoppingListItemRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealShoppingListItemRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> ShoppingListItemRepository for SurrealShoppingListItemRepository<C> {
    async fn create(&self, input: NewShoppingListItem) -> LarderResult<ShoppingListItem> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('shopping_list_item', $id) SET \
                 list_id = $list_id, product_name = $product_name, \
                 product_category = $product_category, \
                 quantity = $quantity, unit = $unit, purchased = false",
            )
            .bind(("id", id_str.clone()))
            .bind(("list_id", input.list_id.to_string()))
            .bind(("product_name", input.product.name))
            .bind(("product_category", input.product.category))
            .bind(("quantity", input.quantity))
            .bind(("unit", input.unit.as_str()))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(DbError::from)?;

        let rows: Vec<ShoppingListItemRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "shopping list item".into(),
            id: id_str,
        })?;

        Ok(row.into_item(id)?)
    }

    async fn get(&self, list_id: Uuid, item_id: Uuid) -> LarderResult<ShoppingListItem> {
        let id_str = item_id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT * FROM type::record('shopping_list_item', $id) \
                 WHERE list_id = $list_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("list_id", list_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ShoppingListItemRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "shopping list item".into(),
            id: id_str,
        })?;

        Ok(row.into_item(item_id)?)
    }

    async fn list(
        &self,
        list_id: Uuid,
        filter: &ItemFilter,
    ) -> LarderResult<PaginatedResult<ShoppingListItem>> {
        let list_id_str = list_id.to_string();
        let filter_term = filter.filter_value.as_ref().map(|v| v.to_lowercase());
        let filter_clause = if filter_term.is_some() {
            " AND (string::lowercase(product_name) CONTAINS $filter \
             OR string::lowercase(product_category) CONTAINS $filter)"
        } else {
            ""
        };

        let count_query = format!(
            "SELECT count() AS total FROM shopping_list_item \
             WHERE list_id = $list_id{filter_clause} GROUP ALL"
        );
        let mut builder = self
            .db
            .query(count_query)
            .bind(("list_id", list_id_str.clone()));
        if let Some(ref term) = filter_term {
            builder = builder.bind(("filter", term.clone()));
        }
        let mut count_result = builder.await.map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let data_query = format!(
            "SELECT meta::id(id) AS record_id, * FROM shopping_list_item \
             WHERE list_id = $list_id{filter_clause} \
             ORDER BY {column} {direction} \
             LIMIT $limit START $offset",
            column = sort_column_sql(filter.sort),
            direction = direction_sql(filter.direction),
        );
        let mut builder = self
            .db
            .query(data_query)
            .bind(("list_id", list_id_str))
            .bind(("limit", ITEM_PAGE_SIZE))
            .bind(("offset", filter.offset()));
        if let Some(term) = filter_term {
            builder = builder.bind(("filter", term));
        }
        let mut result = builder.await.map_err(DbError::from)?;

        let rows: Vec<ShoppingListItemRowWithId> = result.take(0).map_err(DbError::from)?;
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

    async fn unpurchased(&self, list_id: Uuid) -> LarderResult<Vec<ShoppingListItem>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM shopping_list_item \
                 WHERE list_id = $list_id AND purchased = false \
                 ORDER BY created_at ASC",
            )
            .bind(("list_id", list_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ShoppingListItemRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(|row| row.try_into_item())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(items)
    }

    async fn purchased(&self, list_id: Uuid) -> LarderResult<Vec<ShoppingListItem>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM shopping_list_item \
                 WHERE list_id = $list_id AND purchased = true \
                 ORDER BY created_at ASC",
            )
            .bind(("list_id", list_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ShoppingListItemRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(|row| row.try_into_item())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(items)
    }

    async fn set_quantity(
        &self,
        list_id: Uuid,
        item_id: Uuid,
        quantity: f64,
    ) -> LarderResult<ShoppingListItem> {
        let id_str = item_id.to_string();

        let mut result = self
            .db
            .query(
                "UPDATE type::record('shopping_list_item', $id) SET \
                 quantity = $quantity, updated_at = time::now() \
                 WHERE list_id = $list_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("list_id", list_id.to_string()))
            .bind(("quantity", quantity))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        let rows: Vec<ShoppingListItemRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "shopping list item".into(),
            id: id_str,
        })?;

        Ok(row.into_item(item_id)?)
    }

    async fn set_purchased(
        &self,
        list_id: Uuid,
        item_id: Uuid,
        purchased: bool,
    ) -> LarderResult<ShoppingListItem> {
        let id_str = item_id.to_string();

        let mut result = self
            .db
            .query(
                "UPDATE type::record('shopping_list_item', $id) SET \
                 purchased = $purchased, updated_at = time::now() \
                 WHERE list_id = $list_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("list_id", list_id.to_string()))
            .bind(("purchased", purchased))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        let rows: Vec<ShoppingListItemRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "shopping list item".into(),
            id: id_str,
        })?;

        Ok(row.into_item(item_id)?)
    }

    async fn apply_merge(&self, list_id: Uuid, actions: &[MergeAction]) -> LarderResult<()> {
        if actions.is_empty() {
            return Ok(());
        }

        let mut statements = vec!["BEGIN TRANSACTION;".to_string()];
        for (i, action) in actions.iter().enumerate() {
            match action {
                MergeAction::Increment { .. } => statements.push(format!(
                    "UPDATE type::record('shopping_list_item', $item_id_{i}) SET \
                     quantity = quantity + $amount_{i}, \
                     updated_at = time::now() \
                     WHERE list_id = $list_id;"
                )),
                MergeAction::Insert(_) => statements.push(format!(
                    "CREATE type::record('shopping_list_item', $item_id_{i}) SET \
                     list_id = $list_id, product_name = $name_{i}, \
                     product_category = $category_{i}, \
                     quantity = $amount_{i}, unit = $unit_{i}, \
                     purchased = false;"
                )),
            }
        }
        statements.push("COMMIT TRANSACTION;".to_string());

        let mut builder = self
            .db
            .query(statements.join(" "))
            .bind(("list_id", list_id.to_string()));
        for (i, action) in actions.iter().enumerate() {
            match action {
                MergeAction::Increment { item_id, by } => {
                    builder = builder
                        .bind((format!("item_id_{i}"), item_id.to_string()))
                        .bind((format!("amount_{i}"), *by));
                }
                MergeAction::Insert(input) => {
                    builder = builder
                        .bind((format!("item_id_{i}"), Uuid::new_v4().to_string()))
                        .bind((format!("name_{i}"), input.product.name.clone()))
                        .bind((format!("category_{i}"), input.product.category.clone()))
                        .bind((format!("amount_{i}"), input.quantity))
                        .bind((format!("unit_{i}"), input.unit.as_str()));
                }
            }
        }

        builder
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn delete(&self, list_id: Uuid, item_id: Uuid) -> LarderResult<()> {
        self.db
            .query(
                "DELETE type::record('shopping_list_item', $id) \
                 WHERE list_id = $list_id",
            )
            .bind(("id", item_id.to_string()))
            .bind(("list_id", list_id.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }
}
