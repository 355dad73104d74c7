//! End-to-end meal planning flows against in-memory SurrealDB.

use larder_auth::guard::AccessGuard;
use larder_core::error::LarderError;
use larder_core::models::authority::AuthorityKind;
use larder_core::models::group::CreateGroup;
use larder_core::models::pantry::NewPantryItem;
use larder_core::models::product::{Product, Unit};
use larder_core::models::recipe::{CreateRecipe, RecipeIngredient};
use larder_core::models::shopping_list::CreateShoppingList;
use larder_core::models::user::Identity;
use larder_core::repository::{
    AuthorityRepository, GroupRepository, PantryItemRepository, PantryRepository,
    ShoppingListItemRepository, ShoppingListRepository,
};
use larder_db::repository::{
    SurrealAuthorityRepository, SurrealGroupRepository, SurrealPantryItemRepository,
    SurrealPantryRepository, SurrealRecipeRepository, SurrealShoppingListItemRepository,
    SurrealShoppingListRepository,
};
use larder_inventory::recipe::{MealPlanRequest, RecipeService};
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;
use uuid::Uuid;

type Db = surrealdb::engine::local::Db;
type Service = RecipeService<
    SurrealRecipeRepository<Db>,
    SurrealPantryRepository<Db>,
    SurrealPantryItemRepository<Db>,
    SurrealShoppingListRepository<Db>,
    SurrealShoppingListItemRepository<Db>,
    SurrealAuthorityRepository<Db>,
>;

async fn setup() -> (Surreal<Db>, Service, Identity, Uuid) {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    larder_db::run_migrations(&db).await.unwrap();

    let identity = Identity {
        user_id: Uuid::new_v4(),
        username: "cook".into(),
        email: "cook@example.com".into(),
    };

    let groups = SurrealGroupRepository::new(db.clone());
    let group = groups
        .create(CreateGroup {
            name: "Home".into(),
            created_by: identity.user_id,
        })
        .await
        .unwrap();

    let authorities = SurrealAuthorityRepository::new(db.clone());
    authorities
        .grant_set(identity.user_id, group.id, &AuthorityKind::ALL)
        .await
        .unwrap();

    let service = RecipeService::new(
        SurrealRecipeRepository::new(db.clone()),
        SurrealPantryRepository::new(db.clone()),
        SurrealPantryItemRepository::new(db.clone()),
        SurrealShoppingListRepository::new(db.clone()),
        SurrealShoppingListItemRepository::new(db.clone()),
        AccessGuard::new(SurrealAuthorityRepository::new(db.clone())),
    );
    (db, service, identity, group.id)
}

fn ingredient(name: &str, category: &str, quantity: f64, unit: Unit) -> RecipeIngredient {
    RecipeIngredient {
        product: Product::new(name, category),
        required_quantity: quantity,
        unit,
    }
}

/// Four portions: 200 g flour, 300 ml milk, 3 eggs.
fn pancakes(created_by: Uuid) -> CreateRecipe {
    CreateRecipe {
        name: "Pancakes".into(),
        preparation: "Whisk everything, fry in a hot pan.".into(),
        prep_time_minutes: 20,
        cuisine: "Breakfast".into(),
        portions: 4,
        created_by,
        ingredients: vec![
            ingredient("Flour", "Baking", 200.0, Unit::Grams),
            ingredient("Milk", "Dairy", 300.0, Unit::Milliliters),
            ingredient("Eggs", "Dairy", 3.0, Unit::Pieces),
        ],
        image: Vec::new(),
    }
}

async fn seed_stock(db: &Surreal<Db>, pantry_id: Uuid, name: &str, category: &str, quantity: f64, unit: Unit) {
    SurrealPantryItemRepository::new(db.clone())
        .create(NewPantryItem {
            pantry_id,
            product: Product::new(name, category),
            quantity,
            unit,
            purchase_date: None,
            expiration_date: None,
            placement: None,
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn a_live_run_reserves_stock_and_routes_the_rest() {
    let (db, service, identity, group_id) = setup().await;
    let pantry = SurrealPantryRepository::new(db.clone())
        .get_by_group(group_id)
        .await
        .unwrap();

    // Enough flour, a splash of milk, no eggs at all.
    seed_stock(&db, pantry.id, "Flour", "Baking", 500.0, Unit::Grams).await;
    seed_stock(&db, pantry.id, "Milk", "Dairy", 100.0, Unit::Milliliters).await;

    let list = SurrealShoppingListRepository::new(db.clone())
        .create(CreateShoppingList {
            group_id,
            name: "Weekly".into(),
            pantry_id: Some(pantry.id),
        })
        .await
        .unwrap();

    let recipe = service
        .create_recipe(Some(&identity), pancakes(identity.user_id))
        .await
        .unwrap();

    let outcome = service
        .plan_meal(
            Some(&identity),
            MealPlanRequest {
                group_id,
                recipe_id: recipe.id,
                portions: None,
                reserve: true,
                shortfall_list: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(outcome.reservations.len(), 3);
    let flour = &outcome.reservations[0];
    assert_eq!(flour.requested, 200.0);
    assert_eq!(flour.reserved, 200.0);
    assert!(flour.item_id.is_some());
    let milk = &outcome.reservations[1];
    assert_eq!(milk.requested, 300.0);
    assert_eq!(milk.reserved, 100.0);
    let eggs = &outcome.reservations[2];
    assert_eq!(eggs.reserved, 0.0);
    assert_eq!(eggs.item_id, None);

    assert_eq!(outcome.shortfalls.len(), 2);
    assert_eq!(outcome.routed_to, Some(list.id));

    // The earmarks landed on the rows.
    let items = SurrealPantryItemRepository::new(db.clone());
    let flour_row = items
        .find_by_product(pantry.id, &Product::new("Flour", "Baking"), Unit::Grams)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(flour_row.reserved_quantity, 200.0);
    let milk_row = items
        .find_by_product(pantry.id, &Product::new("Milk", "Dairy"), Unit::Milliliters)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(milk_row.reserved_quantity, 100.0);

    // Missing quantities became open list entries.
    let open = SurrealShoppingListItemRepository::new(db)
        .unpurchased(list.id)
        .await
        .unwrap();
    assert_eq!(open.len(), 2);
    let milk_wish = open.iter().find(|i| i.product.name == "Milk").unwrap();
    assert_eq!(milk_wish.quantity, 200.0);
    let eggs_wish = open.iter().find(|i| i.product.name == "Eggs").unwrap();
    assert_eq!(eggs_wish.quantity, 3.0);
}

#[tokio::test]
async fn a_dry_run_writes_nothing() {
    let (db, service, identity, group_id) = setup().await;
    let pantry = SurrealPantryRepository::new(db.clone())
        .get_by_group(group_id)
        .await
        .unwrap();
    seed_stock(&db, pantry.id, "Flour", "Baking", 500.0, Unit::Grams).await;
    let list = SurrealShoppingListRepository::new(db.clone())
        .create(CreateShoppingList {
            group_id,
            name: "Weekly".into(),
            pantry_id: Some(pantry.id),
        })
        .await
        .unwrap();
    let recipe = service
        .create_recipe(Some(&identity), pancakes(identity.user_id))
        .await
        .unwrap();

    let outcome = service
        .plan_meal(
            Some(&identity),
            MealPlanRequest {
                group_id,
                recipe_id: recipe.id,
                portions: None,
                reserve: false,
                shortfall_list: None,
            },
        )
        .await
        .unwrap();

    // The outcome predicts a live run without touching anything.
    assert_eq!(outcome.reservations[0].reserved, 200.0);
    assert_eq!(outcome.shortfalls.len(), 2);
    assert_eq!(outcome.routed_to, None);

    let flour_row = SurrealPantryItemRepository::new(db.clone())
        .find_by_product(pantry.id, &Product::new("Flour", "Baking"), Unit::Grams)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(flour_row.reserved_quantity, 0.0);
    let open = SurrealShoppingListItemRepository::new(db)
        .unpurchased(list.id)
        .await
        .unwrap();
    assert!(open.is_empty());
}

#[tokio::test]
async fn read_grant_allows_dry_runs_but_not_live_ones() {
    let (db, service, identity, group_id) = setup().await;
    let recipe = service
        .create_recipe(Some(&identity), pancakes(identity.user_id))
        .await
        .unwrap();

    let viewer = Identity {
        user_id: Uuid::new_v4(),
        username: "viewer".into(),
        email: "viewer@example.com".into(),
    };
    SurrealAuthorityRepository::new(db)
        .grant(viewer.user_id, group_id, AuthorityKind::Read)
        .await
        .unwrap();

    let request = MealPlanRequest {
        group_id,
        recipe_id: recipe.id,
        portions: None,
        reserve: false,
        shortfall_list: None,
    };
    service
        .plan_meal(Some(&viewer), request.clone())
        .await
        .unwrap();

    let err = service
        .plan_meal(
            Some(&viewer),
            MealPlanRequest {
                reserve: true,
                ..request
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LarderError::AuthorizationDenied { .. }));
}

#[tokio::test]
async fn portions_scale_every_ingredient() {
    let (db, service, identity, group_id) = setup().await;
    let pantry = SurrealPantryRepository::new(db.clone())
        .get_by_group(group_id)
        .await
        .unwrap();
    seed_stock(&db, pantry.id, "Flour", "Baking", 500.0, Unit::Grams).await;
    let recipe = service
        .create_recipe(Some(&identity), pancakes(identity.user_id))
        .await
        .unwrap();

    // Half the portions, half the flour.
    let outcome = service
        .plan_meal(
            Some(&identity),
            MealPlanRequest {
                group_id,
                recipe_id: recipe.id,
                portions: Some(2),
                reserve: false,
                shortfall_list: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(outcome.reservations[0].requested, 100.0);
    assert_eq!(outcome.reservations[1].requested, 150.0);

    let err = service
        .plan_meal(
            Some(&identity),
            MealPlanRequest {
                group_id,
                recipe_id: recipe.id,
                portions: Some(0),
                reserve: false,
                shortfall_list: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LarderError::Validation { .. }));
}

#[tokio::test]
async fn an_explicit_target_list_wins_over_the_linked_one() {
    let (db, service, identity, group_id) = setup().await;
    let pantry = SurrealPantryRepository::new(db.clone())
        .get_by_group(group_id)
        .await
        .unwrap();
    let lists = SurrealShoppingListRepository::new(db.clone());
    let weekly = lists
        .create(CreateShoppingList {
            group_id,
            name: "Weekly".into(),
            pantry_id: Some(pantry.id),
        })
        .await
        .unwrap();
    let extras = lists
        .create(CreateShoppingList {
            group_id,
            name: "Extras".into(),
            pantry_id: None,
        })
        .await
        .unwrap();
    let recipe = service
        .create_recipe(Some(&identity), pancakes(identity.user_id))
        .await
        .unwrap();

    let outcome = service
        .plan_meal(
            Some(&identity),
            MealPlanRequest {
                group_id,
                recipe_id: recipe.id,
                portions: None,
                reserve: true,
                shortfall_list: Some(extras.id),
            },
        )
        .await
        .unwrap();
    assert_eq!(outcome.routed_to, Some(extras.id));

    let list_items = SurrealShoppingListItemRepository::new(db);
    assert_eq!(list_items.unpurchased(extras.id).await.unwrap().len(), 3);
    assert!(list_items.unpurchased(weekly.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn an_unknown_target_list_fails_the_plan() {
    let (_db, service, identity, group_id) = setup().await;
    let recipe = service
        .create_recipe(Some(&identity), pancakes(identity.user_id))
        .await
        .unwrap();

    let err = service
        .plan_meal(
            Some(&identity),
            MealPlanRequest {
                group_id,
                recipe_id: recipe.id,
                portions: None,
                reserve: true,
                shortfall_list: Some(Uuid::new_v4()),
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, LarderError::NotFound { .. }));
}

#[tokio::test]
async fn shortfalls_stay_unrouted_without_any_list() {
    let (_db, service, identity, group_id) = setup().await;
    let recipe = service
        .create_recipe(Some(&identity), pancakes(identity.user_id))
        .await
        .unwrap();

    let outcome = service
        .plan_meal(
            Some(&identity),
            MealPlanRequest {
                group_id,
                recipe_id: recipe.id,
                portions: None,
                reserve: true,
                shortfall_list: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(outcome.shortfalls.len(), 3);
    assert_eq!(outcome.routed_to, None);
}

#[tokio::test]
async fn a_fully_stocked_pantry_routes_nothing() {
    let (db, service, identity, group_id) = setup().await;
    let pantry = SurrealPantryRepository::new(db.clone())
        .get_by_group(group_id)
        .await
        .unwrap();
    seed_stock(&db, pantry.id, "Flour", "Baking", 1000.0, Unit::Grams).await;
    seed_stock(&db, pantry.id, "Milk", "Dairy", 1000.0, Unit::Milliliters).await;
    seed_stock(&db, pantry.id, "Eggs", "Dairy", 12.0, Unit::Pieces).await;
    let recipe = service
        .create_recipe(Some(&identity), pancakes(identity.user_id))
        .await
        .unwrap();

    let outcome = service
        .plan_meal(
            Some(&identity),
            MealPlanRequest {
                group_id,
                recipe_id: recipe.id,
                portions: None,
                reserve: true,
                shortfall_list: None,
            },
        )
        .await
        .unwrap();

    assert!(outcome.shortfalls.is_empty());
    assert_eq!(outcome.routed_to, None);
    assert!(outcome.reservations.iter().all(|r| r.reserved == r.requested));
}

#[tokio::test]
async fn only_the_creator_may_delete_a_recipe() {
    let (_db, service, identity, _group_id) = setup().await;
    let recipe = service
        .create_recipe(Some(&identity), pancakes(identity.user_id))
        .await
        .unwrap();

    let outsider = Identity {
        user_id: Uuid::new_v4(),
        username: "outsider".into(),
        email: "outsider@example.com".into(),
    };
    let err = service
        .delete_recipe(Some(&outsider), recipe.id)
        .await
        .unwrap_err();
    assert!(matches!(err, LarderError::AuthorizationDenied { .. }));

    service.delete_recipe(Some(&identity), recipe.id).await.unwrap();
    let err = service
        .get_recipe(Some(&identity), recipe.id)
        .await
        .unwrap_err();
    assert!(matches!(err, LarderError::NotFound { .. }));
}
