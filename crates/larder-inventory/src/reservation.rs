//! Reservation planning of recipe ingredients against pantry stock.
//!
//! [`ReservationEngine`] is a pure pass over an in-memory pantry snapshot.
//! It decides how much of each ingredient can be earmarked and what is
//! missing; persisting those decisions (and racing other writers) is the
//! meal-planning service's job.

use larder_core::error::LarderResult;
use larder_core::ledger::{PantryLedger, QUANTITY_EPSILON};
use larder_core::models::pantry::PantryItem;
use larder_core::models::product::{Product, Unit};
use larder_core::models::recipe::RecipeIngredient;
use uuid::Uuid;

use crate::merge::Demand;

/// How one ingredient line fared against the pantry.
#[derive(Debug, Clone, PartialEq)]
pub struct ReservationResult {
    pub product: Product,
    pub unit: Unit,
    pub requested: f64,
    /// Amount actually earmarked, in `[0, requested]`.
    pub reserved: f64,
    /// The matched pantry row, if any.
    pub item_id: Option<Uuid>,
}

/// Outcome of planning a whole recipe.
#[derive(Debug, Clone, Default)]
pub struct ReservationOutcome {
    pub reservations: Vec<ReservationResult>,
    /// Missing quantities, ready to be merged into a shopping list.
    pub shortfalls: Vec<Demand>,
}

impl ReservationOutcome {
    pub fn fully_satisfied(&self) -> bool {
        self.shortfalls.is_empty()
    }
}

/// Matches ingredient lines to pantry rows and splits each requirement
/// into a reserved part and a shortfall.
///
/// An ingredient matches the row with the structurally equal product and
/// the same unit; a quantity of the right product in a different unit is
/// not stock. Lines are processed in recipe order, so when two lines want
/// the same product the earlier one is served first and the later one
/// sees the reduced availability.
pub struct ReservationEngine;

impl ReservationEngine {
    /// Plans `ingredients` against `items`, earmarking stock on the
    /// snapshot as it goes. Partial coverage is kept: a shortfall on one
    /// line never rolls back reservations made for earlier lines.
    pub fn plan(
        items: &mut [PantryItem],
        ingredients: &[RecipeIngredient],
    ) -> LarderResult<ReservationOutcome> {
        let mut outcome = ReservationOutcome::default();

        for ingredient in ingredients {
            let matched = items
                .iter_mut()
                .find(|item| item.product == ingredient.product && item.unit == ingredient.unit);

            let (reserved, item_id) = match matched {
                Some(item) => {
                    let satisfied = ingredient
                        .required_quantity
                        .min(item.available())
                        .max(0.0);
                    if satisfied > QUANTITY_EPSILON {
                        PantryLedger::reserve(item, satisfied)?;
                        (satisfied, Some(item.id))
                    } else {
                        (0.0, Some(item.id))
                    }
                }
                None => (0.0, None),
            };

            let missing = ingredient.required_quantity - reserved;
            if missing > QUANTITY_EPSILON {
                outcome.shortfalls.push(Demand {
                    product: ingredient.product.clone(),
                    quantity: missing,
                    unit: ingredient.unit,
                });
            }

            outcome.reservations.push(ReservationResult {
                product: ingredient.product.clone(),
                unit: ingredient.unit,
                requested: ingredient.required_quantity,
                reserved,
                item_id,
            });
        }

        Ok(outcome)
    }
}
