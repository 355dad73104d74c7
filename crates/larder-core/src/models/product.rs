//! Product value type and measurement units.

use serde::{Deserialize, Serialize};

/// A (name, category) pair identifying what a pantry or shopping-list
/// row is about.
///
/// Equality is structural on name + category; there is no surrogate
/// identifier. Two records with the same name and category denote the
/// same product. Products are always embedded by value inside the
/// richer item records, never referenced.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    pub category: String,
}

impl Product {
    pub fn new(name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
        }
    }
}

/// Fixed set of measurement units.
///
/// Matching between recipes, pantry stock, and shopping lists requires
/// an exact unit match; no conversion between units is ever attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Unit {
    Grams,
    Kilograms,
    Milliliters,
    Liters,
    Pieces,
    Packs,
}

impl Unit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Grams => "GRAMS",
            Unit::Kilograms => "KILOGRAMS",
            Unit::Milliliters => "MILLILITERS",
            Unit::Liters => "LITERS",
            Unit::Pieces => "PIECES",
            Unit::Packs => "PACKS",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "GRAMS" => Some(Unit::Grams),
            "KILOGRAMS" => Some(Unit::Kilograms),
            "MILLILITERS" => Some(Unit::Milliliters),
            "LITERS" => Some(Unit::Liters),
            "PIECES" => Some(Unit::Pieces),
            "PACKS" => Some(Unit::Packs),
            _ => None,
        }
    }
}
