//! SurrealDB repository implementations.
//!
//! Each repository owns a cloned client handle and implements one of
//! the traits from `larder_core::repository`. Application UUIDs double
//! as record ids (`type::record('table', $id)`), so reads can address
//! rows directly and list queries recover the id via `meta::id(id)`.

mod authority;
mod group;
mod pantry;
mod recipe;
mod shopping_list;
mod user;

pub use authority::SurrealAuthorityRepository;
pub use group::SurrealGroupRepository;
pub use pantry::{SurrealPantryItemRepository, SurrealPantryRepository};
pub use recipe::SurrealRecipeRepository;
pub use shopping_list::{SurrealShoppingListItemRepository, SurrealShoppingListRepository};
pub use user::SurrealUserRepository;
