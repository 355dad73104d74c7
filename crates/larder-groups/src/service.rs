//! Group administration: lifecycle, membership, and grants.

use larder_auth::guard::{AccessGuard, require_identity};
use larder_core::error::{LarderError, LarderResult};
use larder_core::models::authority::{Authority, AuthorityKind};
use larder_core::models::group::{CreateGroup, Group};
use larder_core::models::user::{Identity, User};
use larder_core::repository::{
    AuthorityRepository, GroupRepository, PaginatedResult, Pagination, UserRepository,
};
use larder_core::validate::validate_group_name;
use tracing::info;
use uuid::Uuid;

/// Group administration over the group, user, and grant stores.
///
/// Every operation resolves the target group first, then runs its
/// authority check, then mutates.
pub struct GroupService<G, U, A>
where
    G: GroupRepository,
    U: UserRepository,
    A: AuthorityRepository,
{
    groups: G,
    users: U,
    guard: AccessGuard<A>,
}

impl<G, U, A> GroupService<G, U, A>
where
    G: GroupRepository,
    U: UserRepository,
    A: AuthorityRepository,
{
    pub fn new(groups: G, users: U, guard: AccessGuard<A>) -> Self {
        Self {
            groups,
            users,
            guard,
        }
    }

    /// Create a group. The caller becomes creator and first member and
    /// receives every authority kind; the group's pantry is created
    /// alongside it.
    pub async fn create_group(
        &self,
        caller: Option<&Identity>,
        name: &str,
    ) -> LarderResult<Group> {
        let identity = require_identity(caller)?;
        validate_group_name(name)?;

        // Group names are unique across the whole system.
        if self.groups.find_by_name(name).await?.is_some() {
            return Err(LarderError::AlreadyExists {
                entity: "group".into(),
            });
        }

        let group = self
            .groups
            .create(CreateGroup {
                name: name.to_string(),
                created_by: identity.user_id,
            })
            .await?;

        self.groups.add_member(identity.user_id, group.id).await?;
        self.guard
            .store()
            .grant_set(identity.user_id, group.id, &AuthorityKind::ALL)
            .await?;

        info!(group = %group.id, name = %group.name, "group created");
        Ok(group)
    }

    pub async fn get_group(&self, caller: Option<&Identity>, group_id: Uuid) -> LarderResult<Group> {
        let identity = require_identity(caller)?;
        let group = self.groups.get_by_id(group_id).await?;
        self.guard
            .require(identity, group.id, AuthorityKind::Read)
            .await?;
        Ok(group)
    }

    /// Groups the caller belongs to.
    pub async fn my_groups(&self, caller: Option<&Identity>) -> LarderResult<Vec<Group>> {
        let identity = require_identity(caller)?;
        self.groups.get_user_groups(identity.user_id).await
    }

    pub async fn rename_group(
        &self,
        caller: Option<&Identity>,
        group_id: Uuid,
        new_name: &str,
    ) -> LarderResult<Group> {
        let identity = require_identity(caller)?;
        let group = self.groups.get_by_id(group_id).await?;
        self.guard
            .require(identity, group.id, AuthorityKind::ModifyGroup)
            .await?;
        validate_group_name(new_name)?;

        if let Some(existing) = self.groups.find_by_name(new_name).await?
            && existing.id != group_id
        {
            return Err(LarderError::AlreadyExists {
                entity: "group".into(),
            });
        }

        self.groups.rename(group_id, new_name).await
    }

    /// Delete a group and everything it owns: pantry, stock, shopping
    /// lists, grants, and membership edges go with it.
    pub async fn delete_group(&self, caller: Option<&Identity>, group_id: Uuid) -> LarderResult<()> {
        let identity = require_identity(caller)?;
        let group = self.groups.get_by_id(group_id).await?;
        self.guard
            .require(identity, group.id, AuthorityKind::ModifyGroup)
            .await?;

        self.groups.delete(group_id).await?;
        info!(group = %group_id, "group deleted");
        Ok(())
    }

    pub async fn group_members(
        &self,
        caller: Option<&Identity>,
        group_id: Uuid,
        pagination: Pagination,
    ) -> LarderResult<PaginatedResult<User>> {
        let identity = require_identity(caller)?;
        let group = self.groups.get_by_id(group_id).await?;
        self.guard
            .require(identity, group.id, AuthorityKind::Read)
            .await?;
        self.groups.get_members(group_id, pagination).await
    }

    /// Add a user (looked up by login email) to the group. New members
    /// start with READ only.
    pub async fn add_member(
        &self,
        caller: Option<&Identity>,
        group_id: Uuid,
        email: &str,
    ) -> LarderResult<User> {
        let identity = require_identity(caller)?;
        let group = self.groups.get_by_id(group_id).await?;
        self.guard
            .require(identity, group.id, AuthorityKind::AddToGroup)
            .await?;

        let user = self.users.get_by_email(email).await?;
        if self.groups.is_member(user.id, group_id).await? {
            return Err(LarderError::AlreadyExists {
                entity: "membership".into(),
            });
        }

        self.groups.add_member(user.id, group_id).await?;
        self.guard
            .store()
            .grant(user.id, group_id, AuthorityKind::Read)
            .await?;

        info!(group = %group_id, user = %user.id, "member added");
        Ok(user)
    }

    /// Remove a member, dropping every grant they hold on the group.
    ///
    /// Members may remove themselves (leave); removing anyone else
    /// takes MODIFY_GROUP. The creator can never be removed — deleting
    /// the group is the only way out for them.
    pub async fn remove_member(
        &self,
        caller: Option<&Identity>,
        group_id: Uuid,
        user_id: Uuid,
    ) -> LarderResult<()> {
        let identity = require_identity(caller)?;
        let group = self.groups.get_by_id(group_id).await?;

        if user_id == group.created_by {
            return Err(LarderError::Conflict(
                "the group creator cannot be removed".into(),
            ));
        }
        if user_id != identity.user_id {
            self.guard
                .require(identity, group.id, AuthorityKind::ModifyGroup)
                .await?;
        }
        if !self.groups.is_member(user_id, group_id).await? {
            return Err(LarderError::NotFound {
                entity: "membership".into(),
                id: user_id.to_string(),
            });
        }

        self.groups.remove_member(user_id, group_id).await?;
        self.guard.store().revoke_all(user_id, group_id).await?;

        info!(group = %group_id, user = %user_id, "member removed");
        Ok(())
    }

    /// Grant an authority kind to a member. Duplicates are rejected.
    pub async fn grant_authority(
        &self,
        caller: Option<&Identity>,
        group_id: Uuid,
        user_id: Uuid,
        kind: AuthorityKind,
    ) -> LarderResult<Authority> {
        let identity = require_identity(caller)?;
        let group = self.groups.get_by_id(group_id).await?;
        self.guard
            .require(identity, group.id, AuthorityKind::ModifyGroup)
            .await?;

        if !self.groups.is_member(user_id, group_id).await? {
            return Err(LarderError::NotFound {
                entity: "membership".into(),
                id: user_id.to_string(),
            });
        }
        if self.guard.store().has_grant(user_id, group_id, kind).await? {
            return Err(LarderError::AlreadyExists {
                entity: "authority".into(),
            });
        }

        self.guard.store().grant(user_id, group_id, kind).await
    }

    /// Revoke a single authority kind. The creator's grants are
    /// untouchable.
    pub async fn revoke_authority(
        &self,
        caller: Option<&Identity>,
        group_id: Uuid,
        user_id: Uuid,
        kind: AuthorityKind,
    ) -> LarderResult<()> {
        let identity = require_identity(caller)?;
        let group = self.groups.get_by_id(group_id).await?;
        self.guard
            .require(identity, group.id, AuthorityKind::ModifyGroup)
            .await?;

        if user_id == group.created_by {
            return Err(LarderError::Conflict(
                "the group creator's authorities cannot be revoked".into(),
            ));
        }
        if !self.guard.store().has_grant(user_id, group_id, kind).await? {
            return Err(LarderError::NotFound {
                entity: "authority".into(),
                id: format!("{} for {user_id}", kind.as_str()),
            });
        }

        self.guard.store().revoke(user_id, group_id, kind).await
    }

    /// The authority kinds the caller holds on one group.
    pub async fn my_authorities(
        &self,
        caller: Option<&Identity>,
        group_id: Uuid,
    ) -> LarderResult<std::collections::BTreeSet<AuthorityKind>> {
        let identity = require_identity(caller)?;
        let group = self.groups.get_by_id(group_id).await?;
        self.guard.grants_for(identity, group.id).await
    }
}
