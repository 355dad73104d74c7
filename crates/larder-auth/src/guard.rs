//! Per-group authority enforcement.
//!
//! Every mutating pantry, shopping-list, and group operation runs its
//! authority check here before touching any state. Checks are always
//! scoped to a single group; a grant on one group says nothing about
//! another.

use std::collections::BTreeSet;

use larder_core::error::{LarderError, LarderResult};
use larder_core::models::authority::AuthorityKind;
use larder_core::models::user::Identity;
use larder_core::repository::AuthorityRepository;
use uuid::Uuid;

/// Reject anonymous callers before any authority lookup.
pub fn require_identity(caller: Option<&Identity>) -> LarderResult<&Identity> {
    caller.ok_or(LarderError::AuthenticationFailed {
        reason: "authentication required".into(),
    })
}

/// Wraps the grant store and answers "may this identity do that here?".
#[derive(Clone)]
pub struct AccessGuard<A: AuthorityRepository> {
    authorities: A,
}

impl<A: AuthorityRepository> AccessGuard<A> {
    pub fn new(authorities: A) -> Self {
        Self { authorities }
    }

    /// The underlying grant store, for grant administration paths.
    pub fn store(&self) -> &A {
        &self.authorities
    }

    /// Fail with [`LarderError::AuthorizationDenied`] unless `identity`
    /// holds `kind` on the group.
    pub async fn require(
        &self,
        identity: &Identity,
        group_id: Uuid,
        kind: AuthorityKind,
    ) -> LarderResult<()> {
        if self
            .authorities
            .has_grant(identity.user_id, group_id, kind)
            .await?
        {
            Ok(())
        } else {
            Err(LarderError::AuthorizationDenied {
                reason: format!("{} required on group {group_id}", kind.as_str()),
            })
        }
    }

    /// The full authority set the identity holds on one group.
    pub async fn grants_for(
        &self,
        identity: &Identity,
        group_id: Uuid,
    ) -> LarderResult<BTreeSet<AuthorityKind>> {
        self.authorities.grants_for(identity.user_id, group_id).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use larder_core::models::authority::Authority;

    use super::*;

    /// In-memory grant store for guard tests.
    #[derive(Default)]
    struct MapAuthorityRepository {
        grants: Mutex<BTreeMap<(Uuid, Uuid), BTreeSet<AuthorityKind>>>,
    }

    impl MapAuthorityRepository {
        fn with(entries: &[(Uuid, Uuid, AuthorityKind)]) -> Self {
            let repo = Self::default();
            {
                let mut grants = repo.grants.lock().unwrap();
                for (user, group, kind) in entries {
                    grants.entry((*user, *group)).or_default().insert(*kind);
                }
            }
            repo
        }
    }

    impl AuthorityRepository for MapAuthorityRepository {
        async fn grant(
            &self,
            user_id: Uuid,
            group_id: Uuid,
            kind: AuthorityKind,
        ) -> LarderResult<Authority> {
            self.grants
                .lock()
                .unwrap()
                .entry((user_id, group_id))
                .or_default()
                .insert(kind);
            Ok(Authority {
                user_id,
                group_id,
                kind,
                created_at: chrono::Utc::now(),
            })
        }

        async fn grant_set(
            &self,
            user_id: Uuid,
            group_id: Uuid,
            kinds: &[AuthorityKind],
        ) -> LarderResult<()> {
            let mut grants = self.grants.lock().unwrap();
            let entry = grants.entry((user_id, group_id)).or_default();
            entry.extend(kinds.iter().copied());
            Ok(())
        }

        async fn revoke(
            &self,
            user_id: Uuid,
            group_id: Uuid,
            kind: AuthorityKind,
        ) -> LarderResult<()> {
            if let Some(set) = self.grants.lock().unwrap().get_mut(&(user_id, group_id)) {
                set.remove(&kind);
            }
            Ok(())
        }

        async fn revoke_all(&self, user_id: Uuid, group_id: Uuid) -> LarderResult<()> {
            self.grants.lock().unwrap().remove(&(user_id, group_id));
            Ok(())
        }

        async fn has_grant(
            &self,
            user_id: Uuid,
            group_id: Uuid,
            kind: AuthorityKind,
        ) -> LarderResult<bool> {
            Ok(self
                .grants
                .lock()
                .unwrap()
                .get(&(user_id, group_id))
                .is_some_and(|set| set.contains(&kind)))
        }

        async fn grants_for(
            &self,
            user_id: Uuid,
            group_id: Uuid,
        ) -> LarderResult<BTreeSet<AuthorityKind>> {
            Ok(self
                .grants
                .lock()
                .unwrap()
                .get(&(user_id, group_id))
                .cloned()
                .unwrap_or_default())
        }

        async fn kinds_for_user(&self, user_id: Uuid) -> LarderResult<BTreeSet<AuthorityKind>> {
            let grants = self.grants.lock().unwrap();
            Ok(grants
                .iter()
                .filter(|((user, _), _)| *user == user_id)
                .flat_map(|(_, kinds)| kinds.iter().copied())
                .collect())
        }
    }

    fn identity(user_id: Uuid) -> Identity {
        Identity {
            user_id,
            username: "alice".into(),
            email: "alice@example.com".into(),
        }
    }

    #[tokio::test]
    async fn holder_passes_the_check() {
        let user = Uuid::new_v4();
        let group = Uuid::new_v4();
        let guard = AccessGuard::new(MapAuthorityRepository::with(&[(
            user,
            group,
            AuthorityKind::Reserve,
        )]));

        assert!(
            guard
                .require(&identity(user), group, AuthorityKind::Reserve)
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn missing_kind_is_denied() {
        let user = Uuid::new_v4();
        let group = Uuid::new_v4();
        let guard = AccessGuard::new(MapAuthorityRepository::with(&[(
            user,
            group,
            AuthorityKind::Read,
        )]));

        let err = guard
            .require(&identity(user), group, AuthorityKind::Reserve)
            .await
            .unwrap_err();
        assert!(matches!(err, LarderError::AuthorizationDenied { .. }));
    }

    #[tokio::test]
    async fn grants_never_cross_group_boundaries() {
        let user = Uuid::new_v4();
        let group_a = Uuid::new_v4();
        let group_b = Uuid::new_v4();
        let guard = AccessGuard::new(MapAuthorityRepository::with(&[(
            user,
            group_a,
            AuthorityKind::ModifyPantry,
        )]));

        let err = guard
            .require(&identity(user), group_b, AuthorityKind::ModifyPantry)
            .await
            .unwrap_err();
        assert!(matches!(err, LarderError::AuthorizationDenied { .. }));
    }

    #[test]
    fn anonymous_callers_are_rejected() {
        let err = require_identity(None).unwrap_err();
        assert!(matches!(err, LarderError::AuthenticationFailed { .. }));
    }
}
