//! Shopping-list domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::product::{Product, Unit};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShoppingList {
    pub id: Uuid,
    pub group_id: Uuid,
    /// Unique within the owning group.
    pub name: String,
    /// Pantry this list feeds; shortfalls from meal planning are routed
    /// to a linked list when no explicit target is given.
    pub pantry_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateShoppingList {
    pub group_id: Uuid,
    pub name: String,
    pub pantry_id: Option<Uuid>,
}

/// One row on a shopping list.
///
/// Invariant: at most one *unpurchased* row per (product, unit) within
/// a list; the merger enforces this. Purchased rows are frozen history
/// until transferred or removed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShoppingListItem {
    pub id: Uuid,
    pub list_id: Uuid,
    pub product: Product,
    pub quantity: f64,
    pub unit: Unit,
    pub purchased: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewShoppingListItem {
    pub list_id: Uuid,
    pub product: Product,
    pub quantity: f64,
    pub unit: Unit,
}

/// One step of folding incoming demand into a list, as decided by the
/// merger. A batch of actions is applied atomically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MergeAction {
    /// Grow an existing unpurchased row.
    Increment { item_id: Uuid, by: f64 },
    /// Append a fresh unpurchased row.
    Insert(NewShoppingListItem),
}
