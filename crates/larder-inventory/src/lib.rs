//! Inventory domain for Larder: pantry stock, shopping lists, recipes,
//! and the reconciliation engines that connect them.
//!
//! The engines ([`reservation`], [`merge`], [`transfer`]) are pure and
//! operate on in-memory snapshots; the services wrap them with
//! authority checks and versioned repository writes.

pub mod merge;
pub mod pantry;
pub mod recipe;
pub mod reservation;
pub mod shopping_list;
pub mod transfer;

use larder_core::error::LarderError;

/// Attempts before a contended stock write gives up.
pub(crate) const MAX_WRITE_ATTEMPTS: usize = 5;

pub(crate) fn contention_exhausted() -> LarderError {
    LarderError::Conflict("stock row is contended, please retry".into())
}
