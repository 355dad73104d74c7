//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Item repositories are scoped by
//! their owning pantry or list id to enforce containment; a row is only
//! ever visible through its owner.

use std::collections::BTreeSet;

use uuid::Uuid;

use crate::error::LarderResult;
use crate::models::{
    authority::{Authority, AuthorityKind},
    group::{CreateGroup, Group},
    pantry::{NewPantryItem, Pantry, PantryItem, TransferPlan},
    product::{Product, Unit},
    recipe::{CreateRecipe, Recipe},
    shopping_list::{CreateShoppingList, MergeAction, NewShoppingListItem, ShoppingList,
        ShoppingListItem},
    user::{CreateUser, User},
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

/// Fixed page size for the item filter contract.
pub const ITEM_PAGE_SIZE: u64 = 20;

/// Sortable columns for item views. Columns that do not exist on the
/// queried item type fall back to the product name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortColumn {
    #[default]
    Name,
    Category,
    Quantity,
    Unit,
    PurchaseDate,
    ExpirationDate,
    Placement,
    Purchased,
    CreatedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

/// Filter/sort/page contract for pantry and shopping-list item views.
#[derive(Debug, Clone, Default)]
pub struct ItemFilter {
    /// Case-insensitive substring matched against product name,
    /// category, and placement.
    pub filter_value: Option<String>,
    pub sort: SortColumn,
    pub direction: SortDirection,
    /// Zero-based page index; pages hold [`ITEM_PAGE_SIZE`] rows.
    pub page: u32,
}

impl ItemFilter {
    pub fn offset(&self) -> u64 {
        u64::from(self.page) * ITEM_PAGE_SIZE
    }
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

pub trait UserRepository: Send + Sync {
    /// Persist a new account. The raw password is hashed with Argon2id
    /// before storage.
    fn create(&self, input: CreateUser) -> impl Future<Output = LarderResult<User>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = LarderResult<User>> + Send;
    fn get_by_email(&self, email: &str) -> impl Future<Output = LarderResult<User>> + Send;
    fn get_by_username(&self, username: &str) -> impl Future<Output = LarderResult<User>> + Send;
}

// ---------------------------------------------------------------------------
// Groups & membership
// ---------------------------------------------------------------------------

pub trait GroupRepository: Send + Sync {
    /// Create a group together with its single pantry, atomically.
    fn create(&self, input: CreateGroup) -> impl Future<Output = LarderResult<Group>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = LarderResult<Group>> + Send;
    fn find_by_name(&self, name: &str)
    -> impl Future<Output = LarderResult<Option<Group>>> + Send;
    fn rename(&self, id: Uuid, name: &str) -> impl Future<Output = LarderResult<Group>> + Send;

    /// Delete the group and everything it owns: pantry, pantry items,
    /// shopping lists and their items, authority grants, and membership
    /// edges, all in one transaction.
    fn delete(&self, id: Uuid) -> impl Future<Output = LarderResult<()>> + Send;

    /// Add a user to a group (creates a `member_of` edge).
    fn add_member(
        &self,
        user_id: Uuid,
        group_id: Uuid,
    ) -> impl Future<Output = LarderResult<()>> + Send;

    /// Remove a user from a group.
    fn remove_member(
        &self,
        user_id: Uuid,
        group_id: Uuid,
    ) -> impl Future<Output = LarderResult<()>> + Send;

    fn is_member(
        &self,
        user_id: Uuid,
        group_id: Uuid,
    ) -> impl Future<Output = LarderResult<bool>> + Send;

    /// Get all members of a group.
    fn get_members(
        &self,
        group_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = LarderResult<PaginatedResult<User>>> + Send;

    /// Get all groups a user belongs to.
    fn get_user_groups(&self, user_id: Uuid)
    -> impl Future<Output = LarderResult<Vec<Group>>> + Send;
}

// ---------------------------------------------------------------------------
// Authority grants
// ---------------------------------------------------------------------------

pub trait AuthorityRepository: Send + Sync {
    fn grant(
        &self,
        user_id: Uuid,
        group_id: Uuid,
        kind: AuthorityKind,
    ) -> impl Future<Output = LarderResult<Authority>> + Send;

    /// Create several grants for one user in one transaction. Used when
    /// bootstrapping a group creator's full authority set.
    fn grant_set(
        &self,
        user_id: Uuid,
        group_id: Uuid,
        kinds: &[AuthorityKind],
    ) -> impl Future<Output = LarderResult<()>> + Send;

    fn revoke(
        &self,
        user_id: Uuid,
        group_id: Uuid,
        kind: AuthorityKind,
    ) -> impl Future<Output = LarderResult<()>> + Send;

    /// Drop every grant a user holds on a group. Used when a member
    /// leaves.
    fn revoke_all(
        &self,
        user_id: Uuid,
        group_id: Uuid,
    ) -> impl Future<Output = LarderResult<()>> + Send;

    fn has_grant(
        &self,
        user_id: Uuid,
        group_id: Uuid,
        kind: AuthorityKind,
    ) -> impl Future<Output = LarderResult<bool>> + Send;

    /// The full authority set an identity holds on one group.
    fn grants_for(
        &self,
        user_id: Uuid,
        group_id: Uuid,
    ) -> impl Future<Output = LarderResult<BTreeSet<AuthorityKind>>> + Send;

    /// The union of authority kinds a user holds across all groups.
    /// Feeds the token's role claim.
    fn kinds_for_user(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = LarderResult<BTreeSet<AuthorityKind>>> + Send;
}

// ---------------------------------------------------------------------------
// Pantries & stock
// ---------------------------------------------------------------------------

pub trait PantryRepository: Send + Sync {
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = LarderResult<Pantry>> + Send;
    fn get_by_group(&self, group_id: Uuid) -> impl Future<Output = LarderResult<Pantry>> + Send;
}

pub trait PantryItemRepository: Send + Sync {
    fn create(
        &self,
        input: NewPantryItem,
    ) -> impl Future<Output = LarderResult<PantryItem>> + Send;

    fn get(
        &self,
        pantry_id: Uuid,
        item_id: Uuid,
    ) -> impl Future<Output = LarderResult<PantryItem>> + Send;

    /// Locate the row holding the structurally-equal product in the
    /// exact unit, if any.
    fn find_by_product(
        &self,
        pantry_id: Uuid,
        product: &Product,
        unit: Unit,
    ) -> impl Future<Output = LarderResult<Option<PantryItem>>> + Send;

    fn list(
        &self,
        pantry_id: Uuid,
        filter: &ItemFilter,
    ) -> impl Future<Output = LarderResult<PaginatedResult<PantryItem>>> + Send;

    /// Full unpaginated snapshot, for reservation matching.
    fn all(&self, pantry_id: Uuid) -> impl Future<Output = LarderResult<Vec<PantryItem>>> + Send;

    /// Compare-and-swap write: persists every mutable field of `item`
    /// only if the stored row still carries `item.version`, bumping the
    /// version on success. `None` means another writer got there first.
    fn store(
        &self,
        item: &PantryItem,
    ) -> impl Future<Output = LarderResult<Option<PantryItem>>> + Send;

    /// Apply a shopping-list transfer atomically: grow matched rows,
    /// create rows for unmatched products, and remove the transferred
    /// shopping-list items.
    fn apply_transfer(
        &self,
        plan: &TransferPlan,
    ) -> impl Future<Output = LarderResult<()>> + Send;

    fn delete(
        &self,
        pantry_id: Uuid,
        item_id: Uuid,
    ) -> impl Future<Output = LarderResult<()>> + Send;

    /// Remove the row only if it still carries `expected_version`.
    /// Returns `false` when another writer touched the row first.
    fn delete_versioned(
        &self,
        pantry_id: Uuid,
        item_id: Uuid,
        expected_version: u64,
    ) -> impl Future<Output = LarderResult<bool>> + Send;
}

// ---------------------------------------------------------------------------
// Shopping lists
// ---------------------------------------------------------------------------

pub trait ShoppingListRepository: Send + Sync {
    fn create(
        &self,
        input: CreateShoppingList,
    ) -> impl Future<Output = LarderResult<ShoppingList>> + Send;

    fn get(
        &self,
        group_id: Uuid,
        list_id: Uuid,
    ) -> impl Future<Output = LarderResult<ShoppingList>> + Send;

    fn find_by_name(
        &self,
        group_id: Uuid,
        name: &str,
    ) -> impl Future<Output = LarderResult<Option<ShoppingList>>> + Send;

    fn list_for_group(
        &self,
        group_id: Uuid,
    ) -> impl Future<Output = LarderResult<Vec<ShoppingList>>> + Send;

    /// The first list linked to the given pantry, if any. Default
    /// shortfall routing target.
    fn find_linked(
        &self,
        pantry_id: Uuid,
    ) -> impl Future<Output = LarderResult<Option<ShoppingList>>> + Send;

    /// Delete the list and all of its items in one transaction.
    fn delete(
        &self,
        group_id: Uuid,
        list_id: Uuid,
    ) -> impl Future<Output = LarderResult<()>> + Send;
}

pub trait ShoppingListItemRepository: Send + Sync {
    fn create(
        &self,
        input: NewShoppingListItem,
    ) -> impl Future<Output = LarderResult<ShoppingListItem>> + Send;

    fn get(
        &self,
        list_id: Uuid,
        item_id: Uuid,
    ) -> impl Future<Output = LarderResult<ShoppingListItem>> + Send;

    fn list(
        &self,
        list_id: Uuid,
        filter: &ItemFilter,
    ) -> impl Future<Output = LarderResult<PaginatedResult<ShoppingListItem>>> + Send;

    /// Unpurchased rows only: the set of valid merge targets.
    fn unpurchased(
        &self,
        list_id: Uuid,
    ) -> impl Future<Output = LarderResult<Vec<ShoppingListItem>>> + Send;

    /// Purchased rows only: the set eligible for pantry transfer.
    fn purchased(
        &self,
        list_id: Uuid,
    ) -> impl Future<Output = LarderResult<Vec<ShoppingListItem>>> + Send;

    fn set_quantity(
        &self,
        list_id: Uuid,
        item_id: Uuid,
        quantity: f64,
    ) -> impl Future<Output = LarderResult<ShoppingListItem>> + Send;

    fn set_purchased(
        &self,
        list_id: Uuid,
        item_id: Uuid,
        purchased: bool,
    ) -> impl Future<Output = LarderResult<ShoppingListItem>> + Send;

    /// Apply a batch of merge actions in one transaction.
    fn apply_merge(
        &self,
        list_id: Uuid,
        actions: &[MergeAction],
    ) -> impl Future<Output = LarderResult<()>> + Send;

    fn delete(
        &self,
        list_id: Uuid,
        item_id: Uuid,
    ) -> impl Future<Output = LarderResult<()>> + Send;
}

// ---------------------------------------------------------------------------
// Recipes
// ---------------------------------------------------------------------------

pub trait RecipeRepository: Send + Sync {
    /// Persist the recipe and its ordered ingredient lines atomically.
    fn create(&self, input: CreateRecipe) -> impl Future<Output = LarderResult<Recipe>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = LarderResult<Recipe>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = LarderResult<PaginatedResult<Recipe>>> + Send;
    fn list_by_creator(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = LarderResult<Vec<Recipe>>> + Send;
    fn delete(&self, id: Uuid) -> impl Future<Output = LarderResult<()>> + Send;
}
