//! Integration tests for group administration against in-memory SurrealDB.

use std::collections::BTreeSet;

use larder_auth::guard::AccessGuard;
use larder_core::error::LarderError;
use larder_core::models::authority::AuthorityKind;
use larder_core::models::user::{CreateUser, Identity};
use larder_core::repository::{Pagination, UserRepository};
use larder_db::repository::{
    SurrealAuthorityRepository, SurrealGroupRepository, SurrealUserRepository,
};
use larder_groups::service::GroupService;
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;
use uuid::Uuid;

type Db = surrealdb::engine::local::Db;
type Service = GroupService<
    SurrealGroupRepository<Db>,
    SurrealUserRepository<Db>,
    SurrealAuthorityRepository<Db>,
>;

async fn setup() -> (Surreal<Db>, Service) {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    larder_db::run_migrations(&db).await.unwrap();

    let service = GroupService::new(
        SurrealGroupRepository::new(db.clone()),
        SurrealUserRepository::new(db.clone()),
        AccessGuard::new(SurrealAuthorityRepository::new(db.clone())),
    );
    (db, service)
}

/// Registers a user and returns their identity.
async fn register(db: &Surreal<Db>, name: &str) -> Identity {
    let user = SurrealUserRepository::new(db.clone())
        .create(CreateUser {
            username: name.into(),
            email: format!("{name}@example.com"),
            password: "correct horse battery staple".into(),
        })
        .await
        .unwrap();
    Identity::of(&user)
}

#[tokio::test]
async fn creating_a_group_bootstraps_the_creator() {
    let (db, service) = setup().await;
    let alice = register(&db, "alice").await;

    let group = service.create_group(Some(&alice), "Home").await.unwrap();

    let mine = service.my_groups(Some(&alice)).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].id, group.id);

    let kinds = service.my_authorities(Some(&alice), group.id).await.unwrap();
    assert_eq!(kinds, BTreeSet::from(AuthorityKind::ALL));

    let members = service
        .group_members(Some(&alice), group.id, Pagination::default())
        .await
        .unwrap();
    assert_eq!(members.total, 1);
    assert_eq!(members.items[0].username, "alice");
}

#[tokio::test]
async fn group_names_are_unique_system_wide() {
    let (db, service) = setup().await;
    let alice = register(&db, "alice").await;
    let bob = register(&db, "bob").await;

    service.create_group(Some(&alice), "Home").await.unwrap();
    let err = service.create_group(Some(&bob), "Home").await.unwrap_err();

    assert!(matches!(err, LarderError::AlreadyExists { .. }));
}

#[tokio::test]
async fn blank_group_names_are_rejected() {
    let (db, service) = setup().await;
    let alice = register(&db, "alice").await;

    let err = service.create_group(Some(&alice), "   ").await.unwrap_err();

    assert!(matches!(err, LarderError::Validation { .. }));
}

#[tokio::test]
async fn anonymous_callers_cannot_create_groups() {
    let (_db, service) = setup().await;

    let err = service.create_group(None, "Home").await.unwrap_err();

    assert!(matches!(err, LarderError::AuthenticationFailed { .. }));
}

#[tokio::test]
async fn reading_a_group_needs_the_read_grant() {
    let (db, service) = setup().await;
    let alice = register(&db, "alice").await;
    let bob = register(&db, "bob").await;
    let group = service.create_group(Some(&alice), "Home").await.unwrap();

    let err = service.get_group(Some(&bob), group.id).await.unwrap_err();
    assert!(matches!(err, LarderError::AuthorizationDenied { .. }));

    let err = service
        .get_group(Some(&alice), Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, LarderError::NotFound { .. }));
}

#[tokio::test]
async fn renaming_takes_modify_group_and_a_free_name() {
    let (db, service) = setup().await;
    let alice = register(&db, "alice").await;
    let bob = register(&db, "bob").await;
    let home = service.create_group(Some(&alice), "Home").await.unwrap();
    service.create_group(Some(&bob), "Cabin").await.unwrap();
    service
        .add_member(Some(&alice), home.id, "bob@example.com")
        .await
        .unwrap();

    // Read alone does not allow renaming.
    let err = service
        .rename_group(Some(&bob), home.id, "Bob's place")
        .await
        .unwrap_err();
    assert!(matches!(err, LarderError::AuthorizationDenied { .. }));

    let err = service
        .rename_group(Some(&alice), home.id, "Cabin")
        .await
        .unwrap_err();
    assert!(matches!(err, LarderError::AlreadyExists { .. }));

    // Renaming to the current name is a no-op, not a collision.
    service
        .rename_group(Some(&alice), home.id, "Home")
        .await
        .unwrap();

    let renamed = service
        .rename_group(Some(&alice), home.id, "Homestead")
        .await
        .unwrap();
    assert_eq!(renamed.name, "Homestead");
}

#[tokio::test]
async fn deleting_a_group_takes_modify_group() {
    let (db, service) = setup().await;
    let alice = register(&db, "alice").await;
    let bob = register(&db, "bob").await;
    let group = service.create_group(Some(&alice), "Home").await.unwrap();
    service
        .add_member(Some(&alice), group.id, "bob@example.com")
        .await
        .unwrap();

    let err = service.delete_group(Some(&bob), group.id).await.unwrap_err();
    assert!(matches!(err, LarderError::AuthorizationDenied { .. }));

    service.delete_group(Some(&alice), group.id).await.unwrap();
    let err = service.get_group(Some(&alice), group.id).await.unwrap_err();
    assert!(matches!(err, LarderError::NotFound { .. }));
}

#[tokio::test]
async fn new_members_join_with_read_only() {
    let (db, service) = setup().await;
    let alice = register(&db, "alice").await;
    let bob = register(&db, "bob").await;
    register(&db, "carol").await;
    let group = service.create_group(Some(&alice), "Home").await.unwrap();

    let joined = service
        .add_member(Some(&alice), group.id, "bob@example.com")
        .await
        .unwrap();
    assert_eq!(joined.id, bob.user_id);

    let kinds = service.my_authorities(Some(&bob), group.id).await.unwrap();
    assert_eq!(kinds, BTreeSet::from([AuthorityKind::Read]));

    let members = service
        .group_members(Some(&bob), group.id, Pagination::default())
        .await
        .unwrap();
    assert_eq!(members.total, 2);

    // Read does not include inviting others.
    let err = service
        .add_member(Some(&bob), group.id, "carol@example.com")
        .await
        .unwrap_err();
    assert!(matches!(err, LarderError::AuthorizationDenied { .. }));
}

#[tokio::test]
async fn unknown_or_duplicate_members_are_rejected() {
    let (db, service) = setup().await;
    let alice = register(&db, "alice").await;
    register(&db, "bob").await;
    let group = service.create_group(Some(&alice), "Home").await.unwrap();
    service
        .add_member(Some(&alice), group.id, "bob@example.com")
        .await
        .unwrap();

    let err = service
        .add_member(Some(&alice), group.id, "nobody@example.com")
        .await
        .unwrap_err();
    assert!(matches!(err, LarderError::NotFound { .. }));

    let err = service
        .add_member(Some(&alice), group.id, "bob@example.com")
        .await
        .unwrap_err();
    assert!(matches!(err, LarderError::AlreadyExists { .. }));
}

#[tokio::test]
async fn members_may_leave_but_the_creator_may_not() {
    let (db, service) = setup().await;
    let alice = register(&db, "alice").await;
    let bob = register(&db, "bob").await;
    let group = service.create_group(Some(&alice), "Home").await.unwrap();
    service
        .add_member(Some(&alice), group.id, "bob@example.com")
        .await
        .unwrap();

    // Leaving needs no special grant and drops every authority held.
    service
        .remove_member(Some(&bob), group.id, bob.user_id)
        .await
        .unwrap();
    let kinds = service.my_authorities(Some(&bob), group.id).await.unwrap();
    assert!(kinds.is_empty());

    let err = service
        .remove_member(Some(&alice), group.id, alice.user_id)
        .await
        .unwrap_err();
    assert!(matches!(err, LarderError::Conflict(_)));
}

#[tokio::test]
async fn removing_someone_else_takes_modify_group() {
    let (db, service) = setup().await;
    let alice = register(&db, "alice").await;
    let bob = register(&db, "bob").await;
    let carol = register(&db, "carol").await;
    let group = service.create_group(Some(&alice), "Home").await.unwrap();
    service
        .add_member(Some(&alice), group.id, "bob@example.com")
        .await
        .unwrap();
    service
        .add_member(Some(&alice), group.id, "carol@example.com")
        .await
        .unwrap();

    let err = service
        .remove_member(Some(&carol), group.id, bob.user_id)
        .await
        .unwrap_err();
    assert!(matches!(err, LarderError::AuthorizationDenied { .. }));

    service
        .remove_member(Some(&alice), group.id, bob.user_id)
        .await
        .unwrap();

    let err = service
        .remove_member(Some(&alice), group.id, bob.user_id)
        .await
        .unwrap_err();
    assert!(matches!(err, LarderError::NotFound { .. }));
}

#[tokio::test]
async fn authorities_are_granted_and_revoked_per_member() {
    let (db, service) = setup().await;
    let alice = register(&db, "alice").await;
    let bob = register(&db, "bob").await;
    let group = service.create_group(Some(&alice), "Home").await.unwrap();
    service
        .add_member(Some(&alice), group.id, "bob@example.com")
        .await
        .unwrap();

    let authority = service
        .grant_authority(Some(&alice), group.id, bob.user_id, AuthorityKind::Add)
        .await
        .unwrap();
    assert_eq!(authority.user_id, bob.user_id);
    assert_eq!(authority.kind, AuthorityKind::Add);

    let kinds = service.my_authorities(Some(&bob), group.id).await.unwrap();
    assert_eq!(kinds, BTreeSet::from([AuthorityKind::Read, AuthorityKind::Add]));

    let err = service
        .grant_authority(Some(&alice), group.id, bob.user_id, AuthorityKind::Add)
        .await
        .unwrap_err();
    assert!(matches!(err, LarderError::AlreadyExists { .. }));

    service
        .revoke_authority(Some(&alice), group.id, bob.user_id, AuthorityKind::Add)
        .await
        .unwrap();
    let kinds = service.my_authorities(Some(&bob), group.id).await.unwrap();
    assert_eq!(kinds, BTreeSet::from([AuthorityKind::Read]));

    let err = service
        .revoke_authority(Some(&alice), group.id, bob.user_id, AuthorityKind::Add)
        .await
        .unwrap_err();
    assert!(matches!(err, LarderError::NotFound { .. }));
}

#[tokio::test]
async fn grants_target_members_only() {
    let (db, service) = setup().await;
    let alice = register(&db, "alice").await;
    let carol = register(&db, "carol").await;
    let group = service.create_group(Some(&alice), "Home").await.unwrap();

    let err = service
        .grant_authority(Some(&alice), group.id, carol.user_id, AuthorityKind::Add)
        .await
        .unwrap_err();

    assert!(matches!(err, LarderError::NotFound { .. }));
}

#[tokio::test]
async fn the_creators_grants_are_untouchable() {
    let (db, service) = setup().await;
    let alice = register(&db, "alice").await;
    let group = service.create_group(Some(&alice), "Home").await.unwrap();

    let err = service
        .revoke_authority(Some(&alice), group.id, alice.user_id, AuthorityKind::Read)
        .await
        .unwrap_err();

    assert!(matches!(err, LarderError::Conflict(_)));
}
