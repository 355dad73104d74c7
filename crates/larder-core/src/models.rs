//! Domain models for Larder.
//!
//! These are the core types shared across all crates.

pub mod authority;
pub mod group;
pub mod pantry;
pub mod product;
pub mod recipe;
pub mod shopping_list;
pub mod user;
