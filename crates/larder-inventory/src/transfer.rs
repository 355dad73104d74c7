//! Planning the move of purchased shopping-list items into a pantry.

use chrono::NaiveDate;
use larder_core::models::pantry::{NewPantryItem, PantryItem, StockAddition, TransferPlan};
use larder_core::models::shopping_list::ShoppingListItem;
use uuid::Uuid;

/// Turns the purchased rows of a list into a [`TransferPlan`] against a
/// pantry snapshot.
///
/// Purchased quantities fold into the pantry row with the same product and
/// unit; products the pantry has never seen become new rows with today as
/// their purchase date and no reservation. Every transferred list row is
/// marked for deletion. Unpurchased rows are left alone.
pub struct TransferPlanner;

impl TransferPlanner {
    pub fn plan(
        pantry_id: Uuid,
        pantry_items: &[PantryItem],
        list_items: &[ShoppingListItem],
        today: NaiveDate,
    ) -> TransferPlan {
        let mut plan = TransferPlan::default();

        for row in list_items {
            if !row.purchased {
                continue;
            }
            plan.removed_list_items.push(row.id);

            let target = pantry_items
                .iter()
                .find(|item| item.product == row.product && item.unit == row.unit);

            if let Some(item) = target {
                match plan.additions.iter_mut().find(|a| a.item_id == item.id) {
                    Some(addition) => addition.amount += row.quantity,
                    None => plan.additions.push(StockAddition {
                        item_id: item.id,
                        amount: row.quantity,
                    }),
                }
            } else if let Some(pending) = plan
                .creations
                .iter_mut()
                .find(|new| new.product == row.product && new.unit == row.unit)
            {
                pending.quantity += row.quantity;
            } else {
                plan.creations.push(NewPantryItem {
                    pantry_id,
                    product: row.product.clone(),
                    quantity: row.quantity,
                    unit: row.unit,
                    purchase_date: Some(today),
                    expiration_date: None,
                    placement: None,
                });
            }
        }

        plan
    }
}
