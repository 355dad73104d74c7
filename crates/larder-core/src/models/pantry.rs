//! Pantry and pantry-item domain models.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::product::{Product, Unit};

/// Exactly one pantry exists per group, created alongside it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pantry {
    pub id: Uuid,
    pub group_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// One stock row in a pantry.
///
/// Invariant: `0 <= reserved_quantity <= quantity` at all times, and
/// at most one row per (product, unit) within a pantry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PantryItem {
    pub id: Uuid,
    pub pantry_id: Uuid,
    pub product: Product,
    pub quantity: f64,
    /// Portion of `quantity` earmarked for planned meals.
    pub reserved_quantity: f64,
    pub unit: Unit,
    pub purchase_date: Option<NaiveDate>,
    pub expiration_date: Option<NaiveDate>,
    /// Free-form storage location label ("freezer", "top shelf", ...).
    pub placement: Option<String>,
    /// Optimistic-concurrency counter, bumped on every stored write.
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PantryItem {
    /// Stock not yet earmarked by a reservation.
    pub fn available(&self) -> f64 {
        self.quantity - self.reserved_quantity
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPantryItem {
    pub pantry_id: Uuid,
    pub product: Product,
    pub quantity: f64,
    pub unit: Unit,
    pub purchase_date: Option<NaiveDate>,
    pub expiration_date: Option<NaiveDate>,
    pub placement: Option<String>,
}

/// Direct user edit of a pantry item.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PantryItemPatch {
    pub quantity: Option<f64>,
    pub unit: Option<Unit>,
    /// `Some(Some(val))` = set, `Some(None)` = clear, `None` = no change.
    pub purchase_date: Option<Option<NaiveDate>>,
    pub expiration_date: Option<Option<NaiveDate>>,
    pub placement: Option<Option<String>>,
}

/// Quantity increase to an existing pantry item, produced by a
/// shopping-list transfer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockAddition {
    pub item_id: Uuid,
    pub amount: f64,
}

/// The full effect of transferring a list's purchased items into a
/// pantry. Applied as one atomic write.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransferPlan {
    /// Purchased quantities folded into existing pantry rows.
    pub additions: Vec<StockAddition>,
    /// Purchased products with no matching pantry row.
    pub creations: Vec<NewPantryItem>,
    /// Shopping-list items to delete once stocked.
    pub removed_list_items: Vec<Uuid>,
}

impl TransferPlan {
    pub fn is_empty(&self) -> bool {
        self.additions.is_empty() && self.creations.is_empty() && self.removed_list_items.is_empty()
    }
}
