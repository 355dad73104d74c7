//! The pantry stock ledger.
//!
//! Pure quantity arithmetic on a single [`PantryItem`], shared by the
//! reservation engine and the direct stock operations. Every function
//! either applies its full delta or leaves the item untouched, and all
//! of them preserve `0 <= reserved_quantity <= quantity`.

use crate::error::{FieldViolation, LarderError, LarderResult};
use crate::models::pantry::PantryItem;

/// Tolerance for floating-point dust in quantity comparisons.
pub const QUANTITY_EPSILON: f64 = 1e-9;

/// Below this a stock row counts as depleted and is removed.
pub const MIN_STOCK: f64 = 1e-9;

/// Stateless stock arithmetic. Callers persist the mutated item as part
/// of their own unit of work.
pub struct PantryLedger;

impl PantryLedger {
    /// Earmark `amount` of unreserved stock.
    ///
    /// Fails with [`LarderError::InsufficientStock`] when `amount`
    /// exceeds the unreserved remainder, leaving the item unchanged.
    pub fn reserve(item: &mut PantryItem, amount: f64) -> LarderResult<()> {
        require_positive(amount)?;
        let available = item.available();
        if amount > available + QUANTITY_EPSILON {
            return Err(LarderError::InsufficientStock {
                requested: amount,
                available,
            });
        }
        item.reserved_quantity = (item.reserved_quantity + amount).min(item.quantity);
        Ok(())
    }

    /// Return earmarked stock to the unreserved pool.
    ///
    /// Releasing more than is currently reserved clamps the reservation
    /// to zero rather than failing.
    pub fn release(item: &mut PantryItem, amount: f64) -> LarderResult<()> {
        require_positive(amount)?;
        let released = amount.min(item.reserved_quantity);
        item.reserved_quantity -= released;
        Ok(())
    }

    /// Remove `amount` from stock, drawing down the reservation first
    /// and unreserved stock for the remainder.
    ///
    /// Fails with [`LarderError::InsufficientStock`] when `amount`
    /// exceeds the total quantity, leaving the item unchanged.
    pub fn consume(item: &mut PantryItem, amount: f64) -> LarderResult<()> {
        require_positive(amount)?;
        if amount > item.quantity + QUANTITY_EPSILON {
            return Err(LarderError::InsufficientStock {
                requested: amount,
                available: item.quantity,
            });
        }
        let from_reserved = amount.min(item.reserved_quantity);
        item.reserved_quantity -= from_reserved;
        item.quantity = (item.quantity - amount).max(0.0);
        if item.reserved_quantity > item.quantity {
            item.reserved_quantity = item.quantity;
        }
        Ok(())
    }

    /// Whether the row holds no meaningful stock and should be removed.
    pub fn is_depleted(item: &PantryItem) -> bool {
        item.quantity <= MIN_STOCK
    }
}

fn require_positive(amount: f64) -> LarderResult<()> {
    // `!(x > 0.0)` also catches NaN.
    if !(amount > 0.0) {
        return Err(LarderError::Validation {
            violations: vec![FieldViolation::new(
                "amount",
                "must be greater than zero",
            )],
        });
    }
    Ok(())
}
