//! Shopping-list operations, including the transfer of purchased
//! items into the pantry.

use chrono::Utc;
use larder_auth::guard::{AccessGuard, require_identity};
use larder_core::error::{LarderError, LarderResult};
use larder_core::models::authority::AuthorityKind;
use larder_core::models::pantry::TransferPlan;
use larder_core::models::shopping_list::{CreateShoppingList, ShoppingList, ShoppingListItem};
use larder_core::models::user::Identity;
use larder_core::repository::{
    AuthorityRepository, ItemFilter, PaginatedResult, PantryItemRepository, PantryRepository,
    ShoppingListItemRepository, ShoppingListRepository,
};
use larder_core::validate::{Violations, validate_list_name};
use tracing::info;
use uuid::Uuid;

use crate::merge::{Demand, ShoppingListMerger};
use crate::transfer::TransferPlanner;

/// Shopping-list administration for one group.
///
/// All demand entering a list flows through the merger, which is what
/// keeps a list free of duplicate unpurchased rows.
pub struct ShoppingListService<L, S, P, I, A>
where
    L: ShoppingListRepository,
    S: ShoppingListItemRepository,
    P: PantryRepository,
    I: PantryItemRepository,
    A: AuthorityRepository,
{
    lists: L,
    list_items: S,
    pantries: P,
    pantry_items: I,
    guard: AccessGuard<A>,
}

impl<L, S, P, I, A> ShoppingListService<L, S, P, I, A>
where
    L: ShoppingListRepository,
    S: ShoppingListItemRepository,
    P: PantryRepository,
    I: PantryItemRepository,
    A: AuthorityRepository,
{
    pub fn new(lists: L, list_items: S, pantries: P, pantry_items: I, guard: AccessGuard<A>) -> Self {
        Self {
            lists,
            list_items,
            pantries,
            pantry_items,
            guard,
        }
    }

    /// Create a list in the group, optionally linked to the group's
    /// pantry. A linked list is the default target for meal-planning
    /// shortfalls.
    pub async fn create_list(
        &self,
        caller: Option<&Identity>,
        group_id: Uuid,
        name: &str,
        link_pantry: bool,
    ) -> LarderResult<ShoppingList> {
        let identity = require_identity(caller)?;
        self.guard
            .require(identity, group_id, AuthorityKind::Add)
            .await?;
        validate_list_name(name)?;

        // List names are unique within their group.
        if self.lists.find_by_name(group_id, name).await?.is_some() {
            return Err(LarderError::AlreadyExists {
                entity: "shopping list".into(),
            });
        }

        let pantry_id = if link_pantry {
            Some(self.pantries.get_by_group(group_id).await?.id)
        } else {
            None
        };

        let list = self
            .lists
            .create(CreateShoppingList {
                group_id,
                name: name.to_string(),
                pantry_id,
            })
            .await?;

        info!(group = %group_id, list = %list.id, name = %list.name, "shopping list created");
        Ok(list)
    }

    pub async fn group_lists(
        &self,
        caller: Option<&Identity>,
        group_id: Uuid,
    ) -> LarderResult<Vec<ShoppingList>> {
        let identity = require_identity(caller)?;
        self.guard
            .require(identity, group_id, AuthorityKind::Read)
            .await?;
        self.lists.list_for_group(group_id).await
    }

    /// Delete a list; its items go with it.
    pub async fn delete_list(
        &self,
        caller: Option<&Identity>,
        group_id: Uuid,
        list_id: Uuid,
    ) -> LarderResult<()> {
        let identity = require_identity(caller)?;
        self.guard
            .require(identity, group_id, AuthorityKind::Delete)
            .await?;

        self.lists.get(group_id, list_id).await?;
        self.lists.delete(group_id, list_id).await?;
        info!(group = %group_id, list = %list_id, "shopping list deleted");
        Ok(())
    }

    /// One page of a list's items per the filter contract.
    pub async fn list_items(
        &self,
        caller: Option<&Identity>,
        group_id: Uuid,
        list_id: Uuid,
        filter: &ItemFilter,
    ) -> LarderResult<PaginatedResult<ShoppingListItem>> {
        let identity = require_identity(caller)?;
        self.guard
            .require(identity, group_id, AuthorityKind::Read)
            .await?;
        let list = self.lists.get(group_id, list_id).await?;
        self.list_items.list(list.id, filter).await
    }

    /// Add demand to a list. Entries matching an unpurchased row merge
    /// into it; the rest become new rows. Purchased rows are never
    /// touched.
    pub async fn add_items(
        &self,
        caller: Option<&Identity>,
        group_id: Uuid,
        list_id: Uuid,
        entries: &[Demand],
    ) -> LarderResult<()> {
        let identity = require_identity(caller)?;
        self.guard
            .require(identity, group_id, AuthorityKind::Add)
            .await?;
        validate_demands(entries)?;

        let list = self.lists.get(group_id, list_id).await?;
        let existing = self.list_items.unpurchased(list.id).await?;
        let actions = ShoppingListMerger::merge(list.id, &existing, entries);
        if actions.is_empty() {
            return Ok(());
        }

        self.list_items.apply_merge(list.id, &actions).await?;
        info!(list = %list.id, actions = actions.len(), "demand merged into shopping list");
        Ok(())
    }

    pub async fn set_item_quantity(
        &self,
        caller: Option<&Identity>,
        group_id: Uuid,
        list_id: Uuid,
        item_id: Uuid,
        quantity: f64,
    ) -> LarderResult<ShoppingListItem> {
        let identity = require_identity(caller)?;
        self.guard
            .require(identity, group_id, AuthorityKind::Modify)
            .await?;

        let mut v = Violations::new();
        v.require(
            quantity > 0.0 && quantity.is_finite(),
            "quantity",
            "must be greater than zero",
        );
        v.finish()?;

        let list = self.lists.get(group_id, list_id).await?;
        self.list_items.set_quantity(list.id, item_id, quantity).await
    }

    /// Flip the purchased flag.
    ///
    /// Un-marking re-exposes the row as a merge target, so it is
    /// refused while another unpurchased row for the same product and
    /// unit exists.
    pub async fn set_purchased(
        &self,
        caller: Option<&Identity>,
        group_id: Uuid,
        list_id: Uuid,
        item_id: Uuid,
        purchased: bool,
    ) -> LarderResult<ShoppingListItem> {
        let identity = require_identity(caller)?;
        self.guard
            .require(identity, group_id, AuthorityKind::Modify)
            .await?;
        let list = self.lists.get(group_id, list_id).await?;

        if !purchased {
            let item = self.list_items.get(list.id, item_id).await?;
            let collision = self
                .list_items
                .unpurchased(list.id)
                .await?
                .into_iter()
                .any(|row| row.id != item.id && row.product == item.product && row.unit == item.unit);
            if collision {
                return Err(LarderError::Conflict(
                    "an unpurchased entry for this product already exists on the list".into(),
                ));
            }
        }

        self.list_items.set_purchased(list.id, item_id, purchased).await
    }

    pub async fn remove_item(
        &self,
        caller: Option<&Identity>,
        group_id: Uuid,
        list_id: Uuid,
        item_id: Uuid,
    ) -> LarderResult<()> {
        let identity = require_identity(caller)?;
        self.guard
            .require(identity, group_id, AuthorityKind::Delete)
            .await?;

        let list = self.lists.get(group_id, list_id).await?;
        self.list_items.get(list.id, item_id).await?;
        self.list_items.delete(list.id, item_id).await
    }

    /// Move the list's purchased items into the pantry: quantities fold
    /// into matching stock rows, unknown products become new rows, and
    /// the transferred list rows disappear, all in one unit of work.
    ///
    /// The target is the list's linked pantry when set, otherwise the
    /// owning group's pantry. Returns the applied plan.
    pub async fn transfer_purchased(
        &self,
        caller: Option<&Identity>,
        group_id: Uuid,
        list_id: Uuid,
    ) -> LarderResult<TransferPlan> {
        let identity = require_identity(caller)?;
        self.guard
            .require(identity, group_id, AuthorityKind::ModifyPantry)
            .await?;
        let list = self.lists.get(group_id, list_id).await?;

        let purchased = self.list_items.purchased(list.id).await?;
        if purchased.is_empty() {
            return Ok(TransferPlan::default());
        }

        let pantry = match list.pantry_id {
            Some(pantry_id) => self.pantries.get_by_id(pantry_id).await?,
            None => self.pantries.get_by_group(group_id).await?,
        };

        let snapshot = self.pantry_items.all(pantry.id).await?;
        let plan = TransferPlanner::plan(pantry.id, &snapshot, &purchased, Utc::now().date_naive());
        self.pantry_items.apply_transfer(&plan).await?;

        info!(
            list = %list.id,
            pantry = %pantry.id,
            additions = plan.additions.len(),
            creations = plan.creations.len(),
            "purchased items transferred to pantry"
        );
        Ok(plan)
    }
}

fn validate_demands(entries: &[Demand]) -> LarderResult<()> {
    let mut v = Violations::new();
    v.require(!entries.is_empty(), "entries", "must contain at least one entry");
    for (idx, demand) in entries.iter().enumerate() {
        if demand.product.name.trim().is_empty() {
            v.add(&format!("entries[{idx}].product.name"), "must not be empty");
        }
        if demand.product.category.trim().is_empty() {
            v.add(&format!("entries[{idx}].product.category"), "must not be empty");
        }
        if !(demand.quantity > 0.0 && demand.quantity.is_finite()) {
            v.add(&format!("entries[{idx}].quantity"), "must be greater than zero");
        }
    }
    v.finish()
}
