//! SurrealDB implementation of [`AuthorityRepository`].
//!
//! Grants are plain rows keyed by the (user, group, kind) triple; a
//! unique index guarantees at most one row per triple. Rows carry no
//! application-level id of their own.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use larder_core::error::LarderResult;
use larder_core::models::authority::{Authority, AuthorityKind};
use larder_core::repository::AuthorityRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct AuthorityRow {
    user_id: String,
    group_id: String,
    kind: String,
    created_at: DateTime<Utc>,
}

fn parse_kind(s: &str) -> Result<AuthorityKind, DbError> {
    AuthorityKind::parse(s).ok_or_else(|| DbError::Data(format!("unknown authority kind: {s}")))
}

impl AuthorityRow {
    fn try_into_authority(self) -> Result<Authority, DbError> {
        let user_id = Uuid::parse_str(&self.user_id)
            .map_err(|e| DbError::Data(format!("invalid user UUID: {e}")))?;
        let group_id = Uuid::parse_str(&self.group_id)
            .map_err(|e| DbError::Data(format!("invalid group UUID: {e}")))?;
        Ok(Authority {
            user_id,
            group_id,
            kind: parse_kind(&self.kind)?,
            created_at: self.created_at,
        })
    }
}

/// Row struct for queries that project the kind column only.
#[derive(Debug, SurrealValue)]
struct KindRow {
    kind: String,
}

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// SurrealDB implementation of the Authority repository.
#[derive(Clone)]
pub struct SurrealAuthorityRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealAuthorityRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> AuthorityRepository for SurrealAuthorityRepository<C> {
    async fn grant(
        &self,
        user_id: Uuid,
        group_id: Uuid,
        kind: AuthorityKind,
    ) -> LarderResult<Authority> {
        let mut result = self
            .db
            .query(
                "CREATE authority SET user_id = $user_id, \
                 group_id = $group_id, kind = $kind",
            )
            .bind(("user_id", user_id.to_string()))
            .bind(("group_id", group_id.to_string()))
            .bind(("kind", kind.as_str()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        let rows: Vec<AuthorityRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "authority grant".into(),
            id: format!("{} for user={user_id}", kind.as_str()),
        })?;

        Ok(row.try_into_authority()?)
    }

    async fn grant_set(
        &self,
        user_id: Uuid,
        group_id: Uuid,
        kinds: &[AuthorityKind],
    ) -> LarderResult<()> {
        if kinds.is_empty() {
            return Ok(());
        }

        let mut statements = vec!["BEGIN TRANSACTION;".to_string()];
        for i in 0..kinds.len() {
            statements.push(format!(
                "CREATE authority SET user_id = $user_id, \
                 group_id = $group_id, kind = $kind_{i};"
            ));
        }
        statements.push("COMMIT TRANSACTION;".to_string());
        let query = statements.join(" ");

        let mut builder = self
            .db
            .query(query)
            .bind(("user_id", user_id.to_string()))
            .bind(("group_id", group_id.to_string()));
        for (i, kind) in kinds.iter().enumerate() {
            builder = builder.bind((format!("kind_{i}"), kind.as_str()));
        }

        builder
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn revoke(&self, user_id: Uuid, group_id: Uuid, kind: AuthorityKind) -> LarderResult<()> {
        let mut result = self
            .db
            .query(
                "DELETE authority WHERE user_id = $user_id AND \
                 group_id = $group_id AND kind = $kind RETURN BEFORE",
            )
            .bind(("user_id", user_id.to_string()))
            .bind(("group_id", group_id.to_string()))
            .bind(("kind", kind.as_str()))
            .await
            .map_err(DbError::from)?;

        let removed: Vec<AuthorityRow> = result.take(0).map_err(DbError::from)?;
        if removed.is_empty() {
            return Err(DbError::NotFound {
                entity: "authority grant".into(),
                id: format!("{} for user={user_id}", kind.as_str()),
            }
            .into());
        }

        Ok(())
    }

    async fn revoke_all(&self, user_id: Uuid, group_id: Uuid) -> LarderResult<()> {
        self.db
            .query(
                "DELETE authority WHERE user_id = $user_id AND \
                 group_id = $group_id",
            )
            .bind(("user_id", user_id.to_string()))
            .bind(("group_id", group_id.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn has_grant(
        &self,
        user_id: Uuid,
        group_id: Uuid,
        kind: AuthorityKind,
    ) -> LarderResult<bool> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM authority \
                 WHERE user_id = $user_id AND group_id = $group_id \
                 AND kind = $kind GROUP ALL",
            )
            .bind(("user_id", user_id.to_string()))
            .bind(("group_id", group_id.to_string()))
            .bind(("kind", kind.as_str()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0) > 0)
    }

    async fn grants_for(
        &self,
        user_id: Uuid,
        group_id: Uuid,
    ) -> LarderResult<BTreeSet<AuthorityKind>> {
        let mut result = self
            .db
            .query(
                "SELECT kind FROM authority \
                 WHERE user_id = $user_id AND group_id = $group_id",
            )
            .bind(("user_id", user_id.to_string()))
            .bind(("group_id", group_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<KindRow> = result.take(0).map_err(DbError::from)?;
        let kinds = rows
            .iter()
            .map(|row| parse_kind(&row.kind))
            .collect::<Result<BTreeSet<_>, DbError>>()?;

        Ok(kinds)
    }

    async fn kinds_for_user(&self, user_id: Uuid) -> LarderResult<BTreeSet<AuthorityKind>> {
        let mut result = self
            .db
            .query("SELECT kind FROM authority WHERE user_id = $user_id")
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<KindRow> = result.take(0).map_err(DbError::from)?;
        let kinds = rows
            .iter()
            .map(|row| parse_kind(&row.kind))
            .collect::<Result<BTreeSet<_>, DbError>>()?;

        Ok(kinds)
    }
}
