//! Integration tests for the recipe repository using in-memory SurrealDB.

use larder_core::error::LarderError;
use larder_core::models::product::{Product, Unit};
use larder_core::models::recipe::{CreateRecipe, RecipeIngredient};
use larder_core::repository::{Pagination, RecipeRepository};
use larder_db::repository::SurrealRecipeRepository;
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

async fn setup() -> (Surreal<Db>, SurrealRecipeRepository<Db>) {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    larder_db::run_migrations(&db).await.unwrap();
    let recipes = SurrealRecipeRepository::new(db.clone());
    (db, recipes)
}

fn ingredient(name: &str, quantity: f64, unit: Unit) -> RecipeIngredient {
    RecipeIngredient {
        product: Product {
            name: name.to_string(),
            category: "Misc".to_string(),
        },
        required_quantity: quantity,
        unit,
    }
}

fn carbonara(created_by: Uuid) -> CreateRecipe {
    CreateRecipe {
        name: "Carbonara".to_string(),
        preparation: "Cook pasta, fry guanciale, fold in eggs and cheese.".to_string(),
        prep_time_minutes: 25,
        cuisine: "Italian".to_string(),
        portions: 4,
        created_by,
        ingredients: vec![
            ingredient("Spaghetti", 400.0, Unit::Grams),
            ingredient("Guanciale", 150.0, Unit::Grams),
            ingredient("Eggs", 4.0, Unit::Pieces),
            ingredient("Pecorino", 100.0, Unit::Grams),
        ],
        image: Vec::new(),
    }
}

#[tokio::test]
async fn create_preserves_ingredient_order() {
    let (_, recipes) = setup().await;

    let created = recipes.create(carbonara(Uuid::new_v4())).await.unwrap();

    assert_eq!(created.name, "Carbonara");
    assert_eq!(created.portions, 4);
    let names: Vec<&str> = created
        .ingredients
        .iter()
        .map(|i| i.product.name.as_str())
        .collect();
    assert_eq!(names, vec!["Spaghetti", "Guanciale", "Eggs", "Pecorino"]);
}

#[tokio::test]
async fn get_by_id_returns_the_full_recipe() {
    let (_, recipes) = setup().await;
    let creator = Uuid::new_v4();

    let created = recipes.create(carbonara(creator)).await.unwrap();
    let fetched = recipes.get_by_id(created.id).await.unwrap();

    assert_eq!(fetched.id, created.id);
    assert_eq!(fetched.created_by, creator);
    assert_eq!(fetched.prep_time_minutes, 25);
    assert_eq!(fetched.ingredients.len(), 4);
    assert_eq!(fetched.ingredients[1].required_quantity, 150.0);
    assert_eq!(fetched.ingredients[1].unit, Unit::Grams);
}

#[tokio::test]
async fn get_by_id_for_unknown_recipe_is_not_found() {
    let (_, recipes) = setup().await;

    let err = recipes.get_by_id(Uuid::new_v4()).await.unwrap_err();

    assert!(matches!(err, LarderError::NotFound { .. }));
}

#[tokio::test]
async fn images_round_trip_through_compressed_storage() {
    let (_, recipes) = setup().await;

    let mut input = carbonara(Uuid::new_v4());
    input.image = vec![0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0xAA, 0xBB];

    let created = recipes.create(input.clone()).await.unwrap();
    assert_eq!(created.image, input.image);

    let fetched = recipes.get_by_id(created.id).await.unwrap();
    assert_eq!(fetched.image, input.image);
}

#[tokio::test]
async fn a_corrupt_stored_image_decodes_to_an_empty_image() {
    let (db, recipes) = setup().await;

    let mut input = carbonara(Uuid::new_v4());
    input.image = vec![1, 2, 3, 4, 5];
    let created = recipes.create(input).await.unwrap();

    // Corrupt the stored blob behind the repository's back.
    db.query("UPDATE type::record('recipe', $id) SET image = 'not a blob'")
        .bind(("id", created.id.to_string()))
        .await
        .unwrap()
        .check()
        .unwrap();

    let fetched = recipes.get_by_id(created.id).await.unwrap();
    assert!(fetched.image.is_empty());
}

#[tokio::test]
async fn list_paginates_newest_first() {
    let (_, recipes) = setup().await;
    let creator = Uuid::new_v4();

    for n in 0..3 {
        let mut input = carbonara(creator);
        input.name = format!("Recipe {n}");
        recipes.create(input).await.unwrap();
    }

    let page = recipes
        .list(Pagination {
            offset: 0,
            limit: 2,
        })
        .await
        .unwrap();
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.total, 3);

    let rest = recipes
        .list(Pagination {
            offset: 2,
            limit: 2,
        })
        .await
        .unwrap();
    assert_eq!(rest.items.len(), 1);
    assert_eq!(rest.total, 3);
}

#[tokio::test]
async fn list_by_creator_filters_on_the_author() {
    let (_, recipes) = setup().await;
    let ana = Uuid::new_v4();
    let ben = Uuid::new_v4();

    let mut first = carbonara(ana);
    first.name = "Ana's Carbonara".to_string();
    recipes.create(first).await.unwrap();
    let mut second = carbonara(ben);
    second.name = "Ben's Carbonara".to_string();
    recipes.create(second).await.unwrap();

    let anas = recipes.list_by_creator(ana).await.unwrap();
    assert_eq!(anas.len(), 1);
    assert_eq!(anas[0].name, "Ana's Carbonara");
    assert_eq!(anas[0].created_by, ana);
}

#[tokio::test]
async fn delete_removes_the_recipe_and_its_ingredients() {
    let (db, recipes) = setup().await;

    let created = recipes.create(carbonara(Uuid::new_v4())).await.unwrap();
    recipes.delete(created.id).await.unwrap();

    assert!(recipes.get_by_id(created.id).await.is_err());

    // The ingredient rows must be gone too.
    #[derive(Debug, SurrealValue)]
    struct CountRow {
        total: u64,
    }
    let mut result = db
        .query("SELECT count() AS total FROM recipe_ingredient GROUP ALL")
        .await
        .unwrap();
    let rows: Vec<CountRow> = result.take(0).unwrap();
    assert_eq!(rows.first().map(|r| r.total).unwrap_or(0), 0);
}
