//! SurrealDB implementation of [`GroupRepository`].
//!
//! Group creation and deletion are multi-statement transactions: a
//! group never exists without its pantry, and deleting a group takes
//! every owned row (stock, lists, grants, membership edges) with it.

use chrono::{DateTime, Utc};
use larder_core::error::LarderResult;
use larder_core::models::group::{CreateGroup, Group};
use larder_core::models::user::User;
use larder_core::repository::{GroupRepository, PaginatedResult, Pagination};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct GroupRow {
    name: String,
    created_by: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct GroupRowWithId {
    record_id: String,
    name: String,
    created_by: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl GroupRow {
    fn into_group(self, id: Uuid) -> Result<Group, DbError> {
        let created_by = Uuid::parse_str(&self.created_by)
            .map_err(|e| DbError::Data(format!("invalid creator UUID: {e}")))?;
        Ok(Group {
            id,
            name: self.name,
            created_by,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl GroupRowWithId {
    fn try_into_group(self) -> Result<Group, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Data(format!("invalid group UUID: {e}")))?;
        let created_by = Uuid::parse_str(&self.created_by)
            .map_err(|e| DbError::Data(format!("invalid creator UUID: {e}")))?;
        Ok(Group {
            id,
            name: self.name,
            created_by,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// DB-side row struct for user members returned from edge queries.
#[derive(Debug, SurrealValue)]
struct MemberRow {
    record_id: String,
    username: String,
    email: String,
    password_hash: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl MemberRow {
    fn try_into_user(self) -> Result<User, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Data(format!("invalid user UUID: {e}")))?;
        Ok(User {
            id,
            username: self.username,
            email: self.email,
            password_hash: self.password_hash,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// SurrealDB implementation of the Group repository.
#[derive(Clone)]
pub struct SurrealGroupRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealGroupRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> GroupRepository for SurrealGroupRepository<C> {
    async fn create(&self, input: CreateGroup) -> LarderResult<Group> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let pantry_id_str = Uuid::new_v4().to_string();
        let created_by_str = input.created_by.to_string();

        // Group and pantry are born together or not at all.
        let result = self
            .db
            .query(
                "BEGIN TRANSACTION; \
                 CREATE type::record('group', $id) SET \
                 name = $name, created_by = $created_by; \
                 CREATE type::record('pantry', $pantry_id) SET \
                 group_id = $id; \
                 COMMIT TRANSACTION;",
            )
            .bind(("id", id_str.clone()))
            .bind(("pantry_id", pantry_id_str))
            .bind(("name", input.name))
            .bind(("created_by", created_by_str))
            .await
            .map_err(DbError::from)?;

        result.check().map_err(DbError::from)?;

        // Statement indexes inside a transaction are unreliable, so read
        // the created group back by id.
        self.get_by_id(id).await
    }

    async fn get_by_id(&self, id: Uuid) -> LarderResult<Group> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('group', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<GroupRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "group".into(),
            id: id_str,
        })?;

        Ok(row.into_group(id)?)
    }

    async fn find_by_name(&self, name: &str) -> LarderResult<Option<Group>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM group \
                 WHERE name = $name",
            )
            .bind(("name", name.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<GroupRowWithId> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(row.try_into_group()?)),
            None => Ok(None),
        }
    }

    async fn rename(&self, id: Uuid, name: &str) -> LarderResult<Group> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "UPDATE type::record('group', $id) SET \
                 name = $name, updated_at = time::now()",
            )
            .bind(("id", id_str.clone()))
            .bind(("name", name.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        let rows: Vec<GroupRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "group".into(),
            id: id_str,
        })?;

        Ok(row.into_group(id)?)
    }

    async fn delete(&self, id: Uuid) -> LarderResult<()> {
        let id_str = id.to_string();

        // Owned rows reference their owner by UUID string, so the item
        // tables are emptied via subqueries before the owners go.
        self.db
            .query(
                "BEGIN TRANSACTION; \
                 DELETE pantry_item WHERE pantry_id IN (\
                     SELECT VALUE meta::id(id) FROM pantry \
                     WHERE group_id = $id\
                 ); \
                 DELETE shopping_list_item WHERE list_id IN (\
                     SELECT VALUE meta::id(id) FROM shopping_list \
                     WHERE group_id = $id\
                 ); \
                 DELETE shopping_list WHERE group_id = $id; \
                 DELETE pantry WHERE group_id = $id; \
                 DELETE authority WHERE group_id = $id; \
                 DELETE member_of WHERE out = type::record('group', $id); \
                 DELETE type::record('group', $id); \
                 COMMIT TRANSACTION;",
            )
            .bind(("id", id_str))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn add_member(&self, user_id: Uuid, group_id: Uuid) -> LarderResult<()> {
        let user_id_str = user_id.to_string();
        let group_id_str = group_id.to_string();

        // Verify both records exist before creating the edge.
        let mut check = self
            .db
            .query(
                "SELECT count() AS total FROM user \
                 WHERE id = type::record('user', $user_id) GROUP ALL; \
                 SELECT count() AS total FROM group \
                 WHERE id = type::record('group', $group_id) GROUP ALL;",
            )
            .bind(("user_id", user_id_str.clone()))
            .bind(("group_id", group_id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let user_count: Vec<CountRow> = check.take(0).map_err(DbError::from)?;
        if user_count.first().map(|r| r.total).unwrap_or(0) == 0 {
            return Err(DbError::NotFound {
                entity: "user".into(),
                id: user_id_str,
            }
            .into());
        }

        let group_count: Vec<CountRow> = check.take(1).map_err(DbError::from)?;
        if group_count.first().map(|r| r.total).unwrap_or(0) == 0 {
            return Err(DbError::NotFound {
                entity: "group".into(),
                id: group_id_str,
            }
            .into());
        }

        // Create the membership edge.
        let query = format!("RELATE user:`{user_id_str}` -> member_of -> group:`{group_id_str}`;");

        self.db.query(query).await.map_err(DbError::from)?;

        Ok(())
    }

    async fn remove_member(&self, user_id: Uuid, group_id: Uuid) -> LarderResult<()> {
        let user_id_str = user_id.to_string();
        let group_id_str = group_id.to_string();

        self.db
            .query(
                "DELETE member_of WHERE \
                 in = type::record('user', $user_id) AND \
                 out = type::record('group', $group_id)",
            )
            .bind(("user_id", user_id_str))
            .bind(("group_id", group_id_str))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn is_member(&self, user_id: Uuid, group_id: Uuid) -> LarderResult<bool> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM member_of \
                 WHERE in = type::record('user', $user_id) AND \
                 out = type::record('group', $group_id) GROUP ALL",
            )
            .bind(("user_id", user_id.to_string()))
            .bind(("group_id", group_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0) > 0)
    }

    async fn get_members(
        &self,
        group_id: Uuid,
        pagination: Pagination,
    ) -> LarderResult<PaginatedResult<User>> {
        let group_id_str = group_id.to_string();

        // Count total members.
        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM member_of \
                 WHERE out = type::record('group', $group_id) GROUP ALL",
            )
            .bind(("group_id", group_id_str.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        // Fetch member users via the edge.
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM user \
                 WHERE id IN (\
                     SELECT VALUE in FROM member_of \
                     WHERE out = type::record('group', $group_id)\
                 ) \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("group_id", group_id_str))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<MemberRow> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_user())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn get_user_groups(&self, user_id: Uuid) -> LarderResult<Vec<Group>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM group \
                 WHERE id IN (\
                     SELECT VALUE out FROM member_of \
                     WHERE in = type::record('user', $user_id)\
                 ) \
                 ORDER BY created_at ASC",
            )
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<GroupRowWithId> = result.take(0).map_err(DbError::from)?;

        let groups = rows
            .into_iter()
            .map(|row| row.try_into_group())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(groups)
    }
}
