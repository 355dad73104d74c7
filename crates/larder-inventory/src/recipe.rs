//! Recipes and meal planning.
//!
//! Recipes belong to their creator and are readable by any
//! authenticated user; planning a meal runs a recipe against one
//! group's pantry.

use larder_auth::guard::{AccessGuard, require_identity};
use larder_core::error::{LarderError, LarderResult};
use larder_core::ledger::{PantryLedger, QUANTITY_EPSILON};
use larder_core::models::authority::AuthorityKind;
use larder_core::models::recipe::{CreateRecipe, Recipe, RecipeIngredient};
use larder_core::models::user::Identity;
use larder_core::repository::{
    AuthorityRepository, PaginatedResult, Pagination, PantryItemRepository, PantryRepository,
    RecipeRepository, ShoppingListItemRepository, ShoppingListRepository,
};
use larder_core::validate::{validate_portions, validate_recipe};
use tracing::info;
use uuid::Uuid;

use crate::merge::{Demand, ShoppingListMerger};
use crate::reservation::{ReservationEngine, ReservationResult};
use crate::{MAX_WRITE_ATTEMPTS, contention_exhausted};

/// A request to cook a recipe from one group's pantry.
#[derive(Debug, Clone)]
pub struct MealPlanRequest {
    pub group_id: Uuid,
    pub recipe_id: Uuid,
    /// Portions to cook; defaults to the recipe's own count. Every
    /// ingredient quantity scales proportionally.
    pub portions: Option<u32>,
    /// With `false` the plan only reports what it would do.
    pub reserve: bool,
    /// Explicit routing target for shortfalls. Must belong to the
    /// group.
    pub shortfall_list: Option<Uuid>,
}

/// What a meal plan did (or, for a dry run, would do).
#[derive(Debug, Clone)]
pub struct MealPlanOutcome {
    pub reservations: Vec<ReservationResult>,
    pub shortfalls: Vec<Demand>,
    /// List the shortfalls were merged into, when one was available.
    pub routed_to: Option<Uuid>,
}

pub struct RecipeService<R, P, I, L, S, A>
where
    R: RecipeRepository,
    P: PantryRepository,
    I: PantryItemRepository,
    L: ShoppingListRepository,
    S: ShoppingListItemRepository,
    A: AuthorityRepository,
{
    recipes: R,
    pantries: P,
    pantry_items: I,
    lists: L,
    list_items: S,
    guard: AccessGuard<A>,
}

impl<R, P, I, L, S, A> RecipeService<R, P, I, L, S, A>
where
    R: RecipeRepository,
    P: PantryRepository,
    I: PantryItemRepository,
    L: ShoppingListRepository,
    S: ShoppingListItemRepository,
    A: AuthorityRepository,
{
    pub fn new(
        recipes: R,
        pantries: P,
        pantry_items: I,
        lists: L,
        list_items: S,
        guard: AccessGuard<A>,
    ) -> Self {
        Self {
            recipes,
            pantries,
            pantry_items,
            lists,
            list_items,
            guard,
        }
    }

    /// Create a recipe owned by the caller. The creator on the input is
    /// overwritten with the caller's identity.
    pub async fn create_recipe(
        &self,
        caller: Option<&Identity>,
        mut input: CreateRecipe,
    ) -> LarderResult<Recipe> {
        let identity = require_identity(caller)?;
        input.created_by = identity.user_id;
        validate_recipe(&input)?;

        let recipe = self.recipes.create(input).await?;
        info!(recipe = %recipe.id, name = %recipe.name, "recipe created");
        Ok(recipe)
    }

    pub async fn get_recipe(&self, caller: Option<&Identity>, id: Uuid) -> LarderResult<Recipe> {
        require_identity(caller)?;
        self.recipes.get_by_id(id).await
    }

    pub async fn list_recipes(
        &self,
        caller: Option<&Identity>,
        pagination: Pagination,
    ) -> LarderResult<PaginatedResult<Recipe>> {
        require_identity(caller)?;
        self.recipes.list(pagination).await
    }

    /// Recipes the caller created.
    pub async fn my_recipes(&self, caller: Option<&Identity>) -> LarderResult<Vec<Recipe>> {
        let identity = require_identity(caller)?;
        self.recipes.list_by_creator(identity.user_id).await
    }

    /// Delete a recipe. Only its creator may.
    pub async fn delete_recipe(&self, caller: Option<&Identity>, id: Uuid) -> LarderResult<()> {
        let identity = require_identity(caller)?;
        let recipe = self.recipes.get_by_id(id).await?;
        if recipe.created_by != identity.user_id {
            return Err(LarderError::AuthorizationDenied {
                reason: "only the recipe creator may delete it".into(),
            });
        }

        self.recipes.delete(id).await?;
        info!(recipe = %id, "recipe deleted");
        Ok(())
    }

    /// Plan a meal: reserve what the pantry can cover and route what it
    /// cannot onto a shopping list.
    ///
    /// Shortfalls go to the explicit `shortfall_list` when given, else
    /// to the first list linked to the pantry, else they are returned
    /// unrouted. With `reserve = false` nothing is written; the outcome
    /// reports what a live run would have reserved.
    pub async fn plan_meal(
        &self,
        caller: Option<&Identity>,
        request: MealPlanRequest,
    ) -> LarderResult<MealPlanOutcome> {
        let identity = require_identity(caller)?;
        let recipe = self.recipes.get_by_id(request.recipe_id).await?;
        let pantry = self.pantries.get_by_group(request.group_id).await?;

        // A dry run only reads stock; a live run earmarks it.
        let needed = if request.reserve {
            AuthorityKind::Reserve
        } else {
            AuthorityKind::Read
        };
        self.guard.require(identity, request.group_id, needed).await?;

        let scaled = scale_ingredients(&recipe, request.portions)?;

        if !request.reserve {
            let mut snapshot = self.pantry_items.all(pantry.id).await?;
            let outcome = ReservationEngine::plan(&mut snapshot, &scaled)?;
            return Ok(MealPlanOutcome {
                reservations: outcome.reservations,
                shortfalls: outcome.shortfalls,
                routed_to: None,
            });
        }

        // Live run: one versioned write per ingredient, in recipe
        // order. Each line refetches, so a second line for the same
        // product sees what the first already earmarked, and partial
        // coverage stands even when a later line falls short.
        let mut reservations = Vec::with_capacity(scaled.len());
        let mut shortfalls: Vec<Demand> = Vec::new();

        for ingredient in &scaled {
            let mut attempts = 0;
            let (reserved, item_id) = loop {
                attempts += 1;
                let found = self
                    .pantry_items
                    .find_by_product(pantry.id, &ingredient.product, ingredient.unit)
                    .await?;
                let Some(mut item) = found else {
                    break (0.0, None);
                };

                let satisfied = ingredient
                    .required_quantity
                    .min(item.available())
                    .max(0.0);
                if satisfied <= QUANTITY_EPSILON {
                    break (0.0, Some(item.id));
                }

                PantryLedger::reserve(&mut item, satisfied)?;
                match self.pantry_items.store(&item).await? {
                    Some(updated) => break (satisfied, Some(updated.id)),
                    None if attempts < MAX_WRITE_ATTEMPTS => continue,
                    None => return Err(contention_exhausted()),
                }
            };

            let missing = ingredient.required_quantity - reserved;
            if missing > QUANTITY_EPSILON {
                shortfalls.push(Demand {
                    product: ingredient.product.clone(),
                    quantity: missing,
                    unit: ingredient.unit,
                });
            }
            reservations.push(ReservationResult {
                product: ingredient.product.clone(),
                unit: ingredient.unit,
                requested: ingredient.required_quantity,
                reserved,
                item_id,
            });
        }

        let routed_to = if shortfalls.is_empty() {
            None
        } else {
            let target = match request.shortfall_list {
                Some(list_id) => Some(self.lists.get(request.group_id, list_id).await?),
                None => self.lists.find_linked(pantry.id).await?,
            };
            match target {
                Some(list) => {
                    let existing = self.list_items.unpurchased(list.id).await?;
                    let actions = ShoppingListMerger::merge(list.id, &existing, &shortfalls);
                    self.list_items.apply_merge(list.id, &actions).await?;
                    Some(list.id)
                }
                None => None,
            }
        };

        info!(
            recipe = %recipe.id,
            group = %request.group_id,
            lines = reservations.len(),
            short = shortfalls.len(),
            routed = routed_to.is_some(),
            "meal planned"
        );
        Ok(MealPlanOutcome {
            reservations,
            shortfalls,
            routed_to,
        })
    }
}

/// Ingredient quantities scaled to the requested portion count.
fn scale_ingredients(
    recipe: &Recipe,
    portions: Option<u32>,
) -> LarderResult<Vec<RecipeIngredient>> {
    let factor = match portions {
        Some(requested) => {
            validate_portions(requested)?;
            f64::from(requested) / f64::from(recipe.portions)
        }
        None => 1.0,
    };
    Ok(recipe
        .ingredients
        .iter()
        .map(|ingredient| RecipeIngredient {
            product: ingredient.product.clone(),
            required_quantity: ingredient.required_quantity * factor,
            unit: ingredient.unit,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use larder_core::models::product::{Product, Unit};

    fn recipe_with(portions: u32, quantities: &[f64]) -> Recipe {
        let now = Utc::now();
        Recipe {
            id: Uuid::new_v4(),
            name: "Pizza".into(),
            preparation: "Stretch, top, bake.".into(),
            prep_time_minutes: 90,
            cuisine: "Italian".into(),
            portions,
            created_by: Uuid::new_v4(),
            ingredients: quantities
                .iter()
                .map(|q| RecipeIngredient {
                    product: Product::new("Flour", "Baking"),
                    required_quantity: *q,
                    unit: Unit::Grams,
                })
                .collect(),
            image: vec![],
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn no_override_keeps_recipe_quantities() {
        let recipe = recipe_with(4, &[500.0]);
        let scaled = scale_ingredients(&recipe, None).unwrap();
        assert!((scaled[0].required_quantity - 500.0).abs() < 1e-9);
    }

    #[test]
    fn override_scales_proportionally() {
        let recipe = recipe_with(4, &[500.0, 120.0]);
        let scaled = scale_ingredients(&recipe, Some(6)).unwrap();
        assert!((scaled[0].required_quantity - 750.0).abs() < 1e-9);
        assert!((scaled[1].required_quantity - 180.0).abs() < 1e-9);
    }

    #[test]
    fn zero_portions_are_rejected() {
        let recipe = recipe_with(4, &[500.0]);
        assert!(scale_ingredients(&recipe, Some(0)).is_err());
    }
}
