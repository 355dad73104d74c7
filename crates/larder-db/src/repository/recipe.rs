//! SurrealDB implementation of [`RecipeRepository`].
//!
//! A recipe spans two tables: the `recipe` row and its ordered
//! `recipe_ingredient` child rows, written together in one transaction.
//! Images pass through the codec in [`crate::image`] on the way in and
//! out.

use chrono::{DateTime, Utc};
use larder_core::error::LarderResult;
use larder_core::models::product::{Product, Unit};
use larder_core::models::recipe::{CreateRecipe, Recipe, RecipeIngredient};
use larder_core::repository::{PaginatedResult, Pagination, RecipeRepository};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;
use crate::image::{compress_image, decompress_image};

fn parse_unit(s: &str) -> Result<Unit, DbError> {
    Unit::parse(s).ok_or_else(|| DbError::Data(format!("unknown unit: {s}")))
}

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct RecipeRow {
    name: String,
    preparation: String,
    prep_time_minutes: u32,
    cuisine: String,
    portions: u32,
    created_by: String,
    image: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct RecipeRowWithId {
    record_id: String,
    name: String,
    preparation: String,
    prep_time_minutes: u32,
    cuisine: String,
    portions: u32,
    created_by: String,
    image: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RecipeRow {
    fn into_recipe(self, id: Uuid, ingredients: Vec<RecipeIngredient>) -> Result<Recipe, DbError> {
        let created_by = Uuid::parse_str(&self.created_by)
            .map_err(|e| DbError::Data(format!("invalid creator UUID: {e}")))?;
        Ok(Recipe {
            id,
            name: self.name,
            preparation: self.preparation,
            prep_time_minutes: self.prep_time_minutes,
            cuisine: self.cuisine,
            portions: self.portions,
            created_by,
            ingredients,
            image: decompress_image(&self.image),
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl RecipeRowWithId {
    fn try_into_recipe(self, ingredients: Vec<RecipeIngredient>) -> Result<Recipe, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Data(format!("invalid recipe UUID: {e}")))?;
        let created_by = Uuid::parse_str(&self.created_by)
            .map_err(|e| DbError::Data(format!("invalid creator UUID: {e}")))?;
        Ok(Recipe {
            id,
            name: self.name,
            preparation: self.preparation,
            prep_time_minutes: self.prep_time_minutes,
            cuisine: self.cuisine,
            portions: self.portions,
            created_by,
            ingredients,
            image: decompress_image(&self.image),
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// DB-side row struct for ingredient lines.
#[derive(Debug, SurrealValue)]
struct IngredientRow {
    product_name: String,
    product_category: String,
    required_quantity: f64,
    unit: String,
}

impl IngredientRow {
    fn try_into_ingredient(self) -> Result<RecipeIngredient, DbError> {
        Ok(RecipeIngredient {
            product: Product {
                name: self.product_name,
                category: self.product_category,
            },
            required_quantity: self.required_quantity,
            unit: parse_unit(&self.unit)?,
        })
    }
}

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// SurrealDB implementation of the Recipe repository.
#[derive(Clone)]
pub struct SurrealRecipeRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealRecipeRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    /// Ingredient lines for one recipe, in authoring order.
    async fn fetch_ingredients(&self, recipe_id: &str) -> Result<Vec<RecipeIngredient>, DbError> {
        let mut result = self
            .db
            .query(
                "SELECT * FROM recipe_ingredient \
                 WHERE recipe_id = $recipe_id ORDER BY position ASC",
            )
            .bind(("recipe_id", recipe_id.to_string()))
            .await?;

        let rows: Vec<IngredientRow> = result.take(0)?;
        rows.into_iter()
            .map(|row| row.try_into_ingredient())
            .collect()
    }
}

impl<C: Connection> RecipeRepository for SurrealRecipeRepository<C> {
    async fn create(&self, input: CreateRecipe) -> LarderResult<Recipe> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let image = compress_image(&input.image);

        let mut statements = vec![
            "BEGIN TRANSACTION;".to_string(),
            "CREATE type::record('recipe', $id) SET \
             name = $name, preparation = $preparation, \
             prep_time_minutes = $prep_time_minutes, \
             cuisine = $cuisine, portions = $portions, \
             created_by = $created_by, image = $image;"
                .to_string(),
        ];
        for i in 0..input.ingredients.len() {
            statements.push(format!(
                "CREATE recipe_ingredient SET recipe_id = $id, \
                 position = {i}, product_name = $ing_name_{i}, \
                 product_category = $ing_category_{i}, \
                 required_quantity = $ing_quantity_{i}, \
                 unit = $ing_unit_{i};"
            ));
        }
        statements.push("COMMIT TRANSACTION;".to_string());

        let mut builder = self
            .db
            .query(statements.join(" "))
            .bind(("id", id_str))
            .bind(("name", input.name))
            .bind(("preparation", input.preparation))
            .bind(("prep_time_minutes", input.prep_time_minutes))
            .bind(("cuisine", input.cuisine))
            .bind(("portions", input.portions))
            .bind(("created_by", input.created_by.to_string()))
            .bind(("image", image));
        for (i, ingredient) in input.ingredients.iter().enumerate() {
            builder = builder
                .bind((format!("ing_name_{i}"), ingredient.product.name.clone()))
                .bind((
                    format!("ing_category_{i}"),
                    ingredient.product.category.clone(),
                ))
                .bind((format!("ing_quantity_{i}"), ingredient.required_quantity))
                .bind((format!("ing_unit_{i}"), ingredient.unit.as_str()));
        }

        builder
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        // Statement indexes inside a transaction are unreliable, so read
        // the created recipe back by id.
        self.get_by_id(id).await
    }

    async fn get_by_id(&self, id: Uuid) -> LarderResult<Recipe> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('recipe', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RecipeRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "recipe".into(),
            id: id_str.clone(),
        })?;

        let ingredients = self.fetch_ingredients(&id_str).await?;
        Ok(row.into_recipe(id, ingredients)?)
    }

    async fn list(&self, pagination: Pagination) -> LarderResult<PaginatedResult<Recipe>> {
        let mut count_result = self
            .db
            .query("SELECT count() AS total FROM recipe GROUP ALL")
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM recipe \
                 ORDER BY created_at DESC \
                 LIMIT $limit START $offset",
            )
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RecipeRowWithId> = result.take(0).map_err(DbError::from)?;

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            let ingredients = self.fetch_ingredients(&row.record_id).await?;
            items.push(row.try_into_recipe(ingredients)?);
        }

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn list_by_creator(&self, user_id: Uuid) -> LarderResult<Vec<Recipe>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM recipe \
                 WHERE created_by = $created_by \
                 ORDER BY created_at DESC",
            )
            .bind(("created_by", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RecipeRowWithId> = result.take(0).map_err(DbError::from)?;

        let mut recipes = Vec::with_capacity(rows.len());
        for row in rows {
            let ingredients = self.fetch_ingredients(&row.record_id).await?;
            recipes.push(row.try_into_recipe(ingredients)?);
        }

        Ok(recipes)
    }

    async fn delete(&self, id: Uuid) -> LarderResult<()> {
        self.db
            .query(
                "BEGIN TRANSACTION; \
                 DELETE recipe_ingredient WHERE recipe_id = $id; \
                 DELETE type::record('recipe', $id); \
                 COMMIT TRANSACTION;",
            )
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        Ok(())
    }
}
