//! Explicit input validators.
//!
//! Each validator inspects a whole input and reports *every* violated
//! field in one [`LarderError::Validation`], so callers see the full
//! picture instead of fixing fields one at a time.

use crate::error::{FieldViolation, LarderError, LarderResult};
use crate::models::pantry::{NewPantryItem, PantryItemPatch};
use crate::models::recipe::CreateRecipe;
use crate::models::shopping_list::NewShoppingListItem;
use crate::models::user::CreateUser;

/// Longest accepted name or label.
pub const MAX_NAME_LEN: usize = 120;

/// Accumulates field violations across one input.
#[derive(Debug, Default)]
pub struct Violations {
    entries: Vec<FieldViolation>,
}

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: &str) {
        self.entries.push(FieldViolation::new(field, message));
    }

    pub fn require(&mut self, ok: bool, field: &str, message: &str) {
        if !ok {
            self.add(field, message);
        }
    }

    /// `Ok(())` when nothing was violated, the collected
    /// [`LarderError::Validation`] otherwise.
    pub fn finish(self) -> LarderResult<()> {
        if self.entries.is_empty() {
            Ok(())
        } else {
            Err(LarderError::Validation {
                violations: self.entries,
            })
        }
    }
}

fn named(v: &mut Violations, field: &str, value: &str) {
    let trimmed = value.trim();
    v.require(!trimmed.is_empty(), field, "must not be empty");
    v.require(
        value.len() <= MAX_NAME_LEN,
        field,
        "must be at most 120 characters",
    );
}

fn positive(v: &mut Violations, field: &str, value: f64) {
    v.require(value > 0.0 && value.is_finite(), field, "must be greater than zero");
}

pub fn validate_registration(input: &CreateUser, min_password_len: usize) -> LarderResult<()> {
    let mut v = Violations::new();
    named(&mut v, "username", &input.username);
    named(&mut v, "email", &input.email);
    v.require(
        input.email.contains('@'),
        "email",
        "must be a valid email address",
    );
    v.require(
        input.password.len() >= min_password_len,
        "password",
        "is too short",
    );
    v.finish()
}

pub fn validate_group_name(name: &str) -> LarderResult<()> {
    let mut v = Violations::new();
    named(&mut v, "name", name);
    v.finish()
}

pub fn validate_list_name(name: &str) -> LarderResult<()> {
    let mut v = Violations::new();
    named(&mut v, "name", name);
    v.finish()
}

pub fn validate_new_pantry_item(input: &NewPantryItem) -> LarderResult<()> {
    let mut v = Violations::new();
    named(&mut v, "product.name", &input.product.name);
    named(&mut v, "product.category", &input.product.category);
    positive(&mut v, "quantity", input.quantity);
    if let Some(placement) = &input.placement {
        named(&mut v, "placement", placement);
    }
    if let (Some(purchase), Some(expiration)) = (input.purchase_date, input.expiration_date) {
        v.require(
            purchase <= expiration,
            "expiration_date",
            "must not precede the purchase date",
        );
    }
    v.finish()
}

pub fn validate_pantry_item_patch(patch: &PantryItemPatch) -> LarderResult<()> {
    let mut v = Violations::new();
    if let Some(quantity) = patch.quantity {
        positive(&mut v, "quantity", quantity);
    }
    if let Some(Some(placement)) = &patch.placement {
        named(&mut v, "placement", placement);
    }
    v.finish()
}

pub fn validate_new_list_item(input: &NewShoppingListItem) -> LarderResult<()> {
    let mut v = Violations::new();
    named(&mut v, "product.name", &input.product.name);
    named(&mut v, "product.category", &input.product.category);
    positive(&mut v, "quantity", input.quantity);
    v.finish()
}

pub fn validate_recipe(input: &CreateRecipe) -> LarderResult<()> {
    let mut v = Violations::new();
    named(&mut v, "name", &input.name);
    v.require(
        !input.preparation.trim().is_empty(),
        "preparation",
        "must not be empty",
    );
    named(&mut v, "cuisine", &input.cuisine);
    v.require(input.portions >= 1, "portions", "must be at least 1");
    v.require(
        !input.ingredients.is_empty(),
        "ingredients",
        "must contain at least one entry",
    );
    for (idx, ingredient) in input.ingredients.iter().enumerate() {
        let field = format!("ingredients[{idx}]");
        if ingredient.product.name.trim().is_empty() {
            v.add(&field, "product name must not be empty");
        }
        if !(ingredient.required_quantity > 0.0 && ingredient.required_quantity.is_finite()) {
            v.add(&field, "required quantity must be greater than zero");
        }
    }
    v.finish()
}

/// Requested portion count for meal planning.
pub fn validate_portions(portions: u32) -> LarderResult<()> {
    let mut v = Violations::new();
    v.require(portions >= 1, "portions", "must be at least 1");
    v.finish()
}
