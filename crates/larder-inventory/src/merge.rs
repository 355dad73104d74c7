//! Duplicate-free folding of product demand into a shopping list.
//!
//! Every write path into a list goes through [`ShoppingListMerger`], whether
//! the demand comes from a user adding items by hand or from meal-planning
//! shortfalls. The merger never touches storage itself; it emits a batch of
//! [`MergeAction`]s for the repository to apply in one transaction.

use larder_core::models::product::{Product, Unit};
use larder_core::models::shopping_list::{MergeAction, NewShoppingListItem, ShoppingListItem};
use uuid::Uuid;

/// A quantity of a product wanted on a shopping list.
#[derive(Debug, Clone, PartialEq)]
pub struct Demand {
    pub product: Product,
    pub quantity: f64,
    pub unit: Unit,
}

/// Folds incoming demand into an existing list without creating duplicates.
///
/// Two rows are the same entry when their products are structurally
/// equal and their units match. Purchased rows are history and are
/// never merge targets; a purchased entry for flour does not stop a
/// fresh flour demand from creating a new unpurchased row.
pub struct ShoppingListMerger;

impl ShoppingListMerger {
    /// Plans the merge of `incoming` into the list identified by `list_id`.
    ///
    /// `existing` is the current state of the list; purchased rows may be
    /// included and are ignored. Demands that match an unpurchased row
    /// become increments, the rest become inserts. Repeated demands for the
    /// same product within one batch are combined first, so a batch never
    /// produces two actions against the same entry.
    pub fn merge(
        list_id: Uuid,
        existing: &[ShoppingListItem],
        incoming: &[Demand],
    ) -> Vec<MergeAction> {
        let mut increments: Vec<(Uuid, f64)> = Vec::new();
        let mut inserts: Vec<NewShoppingListItem> = Vec::new();

        for demand in incoming {
            let target = existing
                .iter()
                .find(|row| !row.purchased && row.product == demand.product && row.unit == demand.unit);

            if let Some(row) = target {
                match increments.iter_mut().find(|(id, _)| *id == row.id) {
                    Some((_, by)) => *by += demand.quantity,
                    None => increments.push((row.id, demand.quantity)),
                }
            } else if let Some(pending) = inserts
                .iter_mut()
                .find(|new| new.product == demand.product && new.unit == demand.unit)
            {
                pending.quantity += demand.quantity;
            } else {
                inserts.push(NewShoppingListItem {
                    list_id,
                    product: demand.product.clone(),
                    quantity: demand.quantity,
                    unit: demand.unit,
                });
            }
        }

        increments
            .into_iter()
            .map(|(item_id, by)| MergeAction::Increment { item_id, by })
            .chain(inserts.into_iter().map(MergeAction::Insert))
            .collect()
    }
}
