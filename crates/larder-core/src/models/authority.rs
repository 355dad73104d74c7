//! Authority grants: the per-group permission model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The named permissions grantable to a user within one group.
///
/// Grants never cross group boundaries; holding a kind on group A says
/// nothing about group B.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthorityKind {
    /// View the group's pantry, shopping lists, and members.
    Read,
    /// Add pantry or shopping-list items.
    Add,
    /// Remove pantry or shopping-list items and whole shopping lists.
    Delete,
    /// Reserve and release pantry stock.
    Reserve,
    /// Edit shopping-list items (quantity, purchase flag).
    Modify,
    /// Edit pantry items, consume stock, accept transfers.
    ModifyPantry,
    /// Administer the group: rename, delete, manage grants, remove members.
    ModifyGroup,
    /// Invite users into the group.
    AddToGroup,
}

impl AuthorityKind {
    /// Every kind, in grant-bootstrap order.
    pub const ALL: [AuthorityKind; 8] = [
        AuthorityKind::Read,
        AuthorityKind::Add,
        AuthorityKind::Delete,
        AuthorityKind::Reserve,
        AuthorityKind::Modify,
        AuthorityKind::ModifyPantry,
        AuthorityKind::ModifyGroup,
        AuthorityKind::AddToGroup,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AuthorityKind::Read => "READ",
            AuthorityKind::Add => "ADD",
            AuthorityKind::Delete => "DELETE",
            AuthorityKind::Reserve => "RESERVE",
            AuthorityKind::Modify => "MODIFY",
            AuthorityKind::ModifyPantry => "MODIFY_PANTRY",
            AuthorityKind::ModifyGroup => "MODIFY_GROUP",
            AuthorityKind::AddToGroup => "ADD_TO_GROUP",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "READ" => Some(AuthorityKind::Read),
            "ADD" => Some(AuthorityKind::Add),
            "DELETE" => Some(AuthorityKind::Delete),
            "RESERVE" => Some(AuthorityKind::Reserve),
            "MODIFY" => Some(AuthorityKind::Modify),
            "MODIFY_PANTRY" => Some(AuthorityKind::ModifyPantry),
            "MODIFY_GROUP" => Some(AuthorityKind::ModifyGroup),
            "ADD_TO_GROUP" => Some(AuthorityKind::AddToGroup),
            _ => None,
        }
    }
}

/// A single grant tuple. At most one exists per
/// (user, group, kind) triple.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Authority {
    pub user_id: Uuid,
    pub group_id: Uuid,
    pub kind: AuthorityKind,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_strings_round_trip() {
        for kind in AuthorityKind::ALL {
            assert_eq!(AuthorityKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(AuthorityKind::parse("SUDO"), None);
    }
}
