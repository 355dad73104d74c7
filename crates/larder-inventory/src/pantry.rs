//! Pantry stock operations.
//!
//! Every stock write runs an optimistic loop: fetch the row, apply the
//! ledger to the copy, persist with a versioned compare-and-swap store.
//! Losing a race refetches and re-runs the ledger, so stock checks
//! always judge current state and the reserved-within-quantity
//! invariant holds under concurrent writers.

use larder_auth::guard::{AccessGuard, require_identity};
use larder_core::error::{LarderError, LarderResult};
use larder_core::ledger::{PantryLedger, QUANTITY_EPSILON};
use larder_core::models::authority::AuthorityKind;
use larder_core::models::pantry::{NewPantryItem, Pantry, PantryItem, PantryItemPatch};
use larder_core::models::user::Identity;
use larder_core::repository::{
    AuthorityRepository, ItemFilter, PaginatedResult, PantryItemRepository, PantryRepository,
};
use larder_core::validate::{validate_new_pantry_item, validate_pantry_item_patch};
use tracing::info;
use uuid::Uuid;

use crate::{MAX_WRITE_ATTEMPTS, contention_exhausted};

/// Stock operations on a group's pantry.
///
/// Pantries are addressed by their owning group; every operation
/// resolves the pantry first, then runs its authority check, then
/// touches stock.
pub struct PantryService<P, I, A>
where
    P: PantryRepository,
    I: PantryItemRepository,
    A: AuthorityRepository,
{
    pantries: P,
    items: I,
    guard: AccessGuard<A>,
}

impl<P, I, A> PantryService<P, I, A>
where
    P: PantryRepository,
    I: PantryItemRepository,
    A: AuthorityRepository,
{
    pub fn new(pantries: P, items: I, guard: AccessGuard<A>) -> Self {
        Self {
            pantries,
            items,
            guard,
        }
    }

    pub async fn group_pantry(
        &self,
        caller: Option<&Identity>,
        group_id: Uuid,
    ) -> LarderResult<Pantry> {
        let identity = require_identity(caller)?;
        let pantry = self.pantries.get_by_group(group_id).await?;
        self.guard
            .require(identity, group_id, AuthorityKind::Read)
            .await?;
        Ok(pantry)
    }

    /// One page of the pantry's stock per the filter contract.
    pub async fn pantry_items(
        &self,
        caller: Option<&Identity>,
        group_id: Uuid,
        filter: &ItemFilter,
    ) -> LarderResult<PaginatedResult<PantryItem>> {
        let identity = require_identity(caller)?;
        let pantry = self.pantries.get_by_group(group_id).await?;
        self.guard
            .require(identity, group_id, AuthorityKind::Read)
            .await?;
        self.items.list(pantry.id, filter).await
    }

    /// Add stock to the group's pantry.
    ///
    /// When the pantry already tracks this product in the same unit the
    /// quantities merge into the existing row and any optional fields
    /// the input provides overwrite the stored ones; otherwise a new
    /// row is created. The input's pantry id is ignored in favour of
    /// the addressed group's pantry.
    pub async fn add_item(
        &self,
        caller: Option<&Identity>,
        group_id: Uuid,
        mut input: NewPantryItem,
    ) -> LarderResult<PantryItem> {
        let identity = require_identity(caller)?;
        let pantry = self.pantries.get_by_group(group_id).await?;
        self.guard
            .require(identity, group_id, AuthorityKind::Add)
            .await?;
        input.pantry_id = pantry.id;
        validate_new_pantry_item(&input)?;

        for _ in 0..MAX_WRITE_ATTEMPTS {
            let existing = self
                .items
                .find_by_product(pantry.id, &input.product, input.unit)
                .await?;

            let Some(mut item) = existing else {
                let created = self.items.create(input.clone()).await?;
                info!(pantry = %pantry.id, item = %created.id, "pantry item created");
                return Ok(created);
            };

            item.quantity += input.quantity;
            if input.purchase_date.is_some() {
                item.purchase_date = input.purchase_date;
            }
            if input.expiration_date.is_some() {
                item.expiration_date = input.expiration_date;
            }
            if input.placement.is_some() {
                item.placement = input.placement.clone();
            }

            if let Some(updated) = self.items.store(&item).await? {
                info!(pantry = %pantry.id, item = %updated.id, "stock merged into existing row");
                return Ok(updated);
            }
        }
        Err(contention_exhausted())
    }

    /// Direct edit of a stock row.
    pub async fn update_item(
        &self,
        caller: Option<&Identity>,
        group_id: Uuid,
        item_id: Uuid,
        patch: &PantryItemPatch,
    ) -> LarderResult<PantryItem> {
        let identity = require_identity(caller)?;
        let pantry = self.pantries.get_by_group(group_id).await?;
        self.guard
            .require(identity, group_id, AuthorityKind::ModifyPantry)
            .await?;
        validate_pantry_item_patch(patch)?;

        for _ in 0..MAX_WRITE_ATTEMPTS {
            let mut item = self.items.get(pantry.id, item_id).await?;

            if let Some(quantity) = patch.quantity {
                // A direct edit may not undercut existing reservations.
                if quantity + QUANTITY_EPSILON < item.reserved_quantity {
                    return Err(LarderError::InsufficientStock {
                        requested: quantity,
                        available: item.reserved_quantity,
                    });
                }
                item.quantity = quantity;
            }
            if let Some(unit) = patch.unit
                && unit != item.unit
            {
                // One row per (product, unit): a unit change must not
                // collide with a row already tracking that combination.
                if self
                    .items
                    .find_by_product(pantry.id, &item.product, unit)
                    .await?
                    .is_some()
                {
                    return Err(LarderError::AlreadyExists {
                        entity: "pantry item".into(),
                    });
                }
                item.unit = unit;
            }
            if let Some(purchase_date) = patch.purchase_date {
                item.purchase_date = purchase_date;
            }
            if let Some(expiration_date) = patch.expiration_date {
                item.expiration_date = expiration_date;
            }
            if let Some(placement) = &patch.placement {
                item.placement = placement.clone();
            }

            if let Some(updated) = self.items.store(&item).await? {
                return Ok(updated);
            }
        }
        Err(contention_exhausted())
    }

    pub async fn remove_item(
        &self,
        caller: Option<&Identity>,
        group_id: Uuid,
        item_id: Uuid,
    ) -> LarderResult<()> {
        let identity = require_identity(caller)?;
        let pantry = self.pantries.get_by_group(group_id).await?;
        self.guard
            .require(identity, group_id, AuthorityKind::Delete)
            .await?;

        // Containment: the row must belong to this group's pantry.
        self.items.get(pantry.id, item_id).await?;
        self.items.delete(pantry.id, item_id).await?;
        info!(pantry = %pantry.id, item = %item_id, "pantry item removed");
        Ok(())
    }

    /// Earmark `amount` of a row for planned consumption.
    pub async fn reserve_stock(
        &self,
        caller: Option<&Identity>,
        group_id: Uuid,
        item_id: Uuid,
        amount: f64,
    ) -> LarderResult<PantryItem> {
        let identity = require_identity(caller)?;
        let pantry = self.pantries.get_by_group(group_id).await?;
        self.guard
            .require(identity, group_id, AuthorityKind::Reserve)
            .await?;

        for _ in 0..MAX_WRITE_ATTEMPTS {
            let mut item = self.items.get(pantry.id, item_id).await?;
            PantryLedger::reserve(&mut item, amount)?;
            if let Some(updated) = self.items.store(&item).await? {
                return Ok(updated);
            }
        }
        Err(contention_exhausted())
    }

    /// Give back part of a reservation. Amounts beyond the reserved
    /// portion are clamped, so releasing is always safe.
    pub async fn release_stock(
        &self,
        caller: Option<&Identity>,
        group_id: Uuid,
        item_id: Uuid,
        amount: f64,
    ) -> LarderResult<PantryItem> {
        let identity = require_identity(caller)?;
        let pantry = self.pantries.get_by_group(group_id).await?;
        self.guard
            .require(identity, group_id, AuthorityKind::Reserve)
            .await?;

        for _ in 0..MAX_WRITE_ATTEMPTS {
            let mut item = self.items.get(pantry.id, item_id).await?;
            PantryLedger::release(&mut item, amount)?;
            if let Some(updated) = self.items.store(&item).await? {
                return Ok(updated);
            }
        }
        Err(contention_exhausted())
    }

    /// Consume stock, drawing down the reserved portion first. A row
    /// whose quantity reaches zero is removed; `None` reports that
    /// removal.
    pub async fn consume_stock(
        &self,
        caller: Option<&Identity>,
        group_id: Uuid,
        item_id: Uuid,
        amount: f64,
    ) -> LarderResult<Option<PantryItem>> {
        let identity = require_identity(caller)?;
        let pantry = self.pantries.get_by_group(group_id).await?;
        self.guard
            .require(identity, group_id, AuthorityKind::ModifyPantry)
            .await?;

        for _ in 0..MAX_WRITE_ATTEMPTS {
            let mut item = self.items.get(pantry.id, item_id).await?;
            PantryLedger::consume(&mut item, amount)?;

            if PantryLedger::is_depleted(&item) {
                // The delete is version-guarded like any other stock
                // write; a concurrent restock wins the race.
                if self
                    .items
                    .delete_versioned(pantry.id, item_id, item.version)
                    .await?
                {
                    info!(pantry = %pantry.id, item = %item_id, "stock depleted, row removed");
                    return Ok(None);
                }
                continue;
            }

            if let Some(updated) = self.items.store(&item).await? {
                return Ok(Some(updated));
            }
        }
        Err(contention_exhausted())
    }
}
