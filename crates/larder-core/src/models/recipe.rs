//! Recipe domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::product::{Product, Unit};

/// One ingredient line of a recipe. Order matters: reservation
/// processes ingredients in list order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeIngredient {
    pub product: Product,
    pub required_quantity: f64,
    pub unit: Unit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    pub id: Uuid,
    pub name: String,
    pub preparation: String,
    pub prep_time_minutes: u32,
    pub cuisine: String,
    /// Number of portions the ingredient quantities yield.
    pub portions: u32,
    pub created_by: Uuid,
    pub ingredients: Vec<RecipeIngredient>,
    /// Raw image bytes. Stored compressed at rest; a corrupt stored
    /// blob decodes to an empty image rather than an error.
    pub image: Vec<u8>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRecipe {
    pub name: String,
    pub preparation: String,
    pub prep_time_minutes: u32,
    pub cuisine: String,
    pub portions: u32,
    pub created_by: Uuid,
    pub ingredients: Vec<RecipeIngredient>,
    pub image: Vec<u8>,
}
