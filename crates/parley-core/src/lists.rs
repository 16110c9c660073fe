use std::sync::Arc;

use parley_db::{Database, is_constraint_violation, queries};
use parley_types::models::{ListKind, ListMember, UserRef};
use rusqlite::Connection;
use tracing::{debug, info};

use crate::accounts::resolve_in;
use crate::error::{DomainError, Entity, Scope};

/// Per-user contact and block lists.
pub struct ListStore {
    db: Arc<Database>,
}

impl ListStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Add `candidate` to `owner`'s list and return the resolved login.
    ///
    /// The existence check and the insert share a transaction; the primary
    /// key on (list, member) turns a lost race into `AlreadyMember` too.
    pub fn add_member(
        &self,
        kind: ListKind,
        owner: &str,
        candidate: &UserRef,
    ) -> Result<String, DomainError> {
        self.db.with_tx(|tx| {
            let list_id = owned_list(tx, kind, owner)?;
            let member = resolve_in(tx, candidate)?;

            if kind == ListKind::Block && member == owner {
                return Err(DomainError::SelfReference {
                    action: "block",
                    login: member,
                });
            }

            let already_member = || DomainError::AlreadyMember {
                scope: Scope::List(kind),
                member: member.clone(),
            };

            if queries::list_contains(tx, list_id, &member)? {
                return Err(already_member());
            }

            queries::insert_list_member(tx, list_id, &member).map_err(|e| {
                if is_constraint_violation(&e) {
                    already_member()
                } else {
                    DomainError::StoreUnavailable(e)
                }
            })?;

            info!("{} added {} to their {} list", owner, member, kind);
            Ok(member)
        })
    }

    /// Remove `candidate` from `owner`'s list and return the resolved login.
    pub fn remove_member(
        &self,
        kind: ListKind,
        owner: &str,
        candidate: &UserRef,
    ) -> Result<String, DomainError> {
        self.db.with_tx(|tx| {
            let list_id = owned_list(tx, kind, owner)?;
            let member = resolve_in(tx, candidate)?;

            if queries::delete_list_member(tx, list_id, &member)? == 0 {
                return Err(DomainError::NotMember {
                    scope: Scope::List(kind),
                    member,
                });
            }

            info!("{} removed {} from their {} list", owner, member, kind);
            Ok(member)
        })
    }

    pub fn list_members(&self, kind: ListKind, owner: &str) -> Result<Vec<ListMember>, DomainError> {
        self.db.with_tx(|tx| {
            let list_id = owned_list(tx, kind, owner)?;
            let members: Vec<ListMember> = queries::list_members(tx, list_id)?
                .into_iter()
                .map(|row| ListMember {
                    login: row.login,
                    status: row.status,
                })
                .collect();

            debug!("{} has {} entries in their {} list", owner, members.len(), kind);
            Ok(members)
        })
    }
}

fn owned_list(conn: &Connection, kind: ListKind, owner: &str) -> Result<i64, DomainError> {
    queries::list_id_for(conn, owner, kind.as_str())?
        .ok_or_else(|| DomainError::not_found(Entity::User, owner))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{seed_users, test_db};

    fn login(s: &str) -> UserRef {
        UserRef::Login(s.to_string())
    }

    fn store() -> ListStore {
        let db = test_db();
        seed_users(&db, &["alice", "bob", "carol"]);
        ListStore::new(db)
    }

    #[test]
    fn test_block_self_is_rejected() {
        let lists = store();
        for user in ["alice", "bob", "carol"] {
            let err = lists.add_member(ListKind::Block, user, &login(user)).unwrap_err();
            assert!(matches!(err, DomainError::SelfReference { action: "block", .. }));
        }
        assert!(lists.list_members(ListKind::Block, "alice").unwrap().is_empty());
    }

    #[test]
    fn test_block_self_by_phone_is_rejected() {
        let lists = store();
        let err = lists
            .add_member(ListKind::Block, "alice", &UserRef::Phone("555-alice".into()))
            .unwrap_err();
        assert!(matches!(err, DomainError::SelfReference { .. }));
    }

    #[test]
    fn test_second_add_is_already_member() {
        let lists = store();
        for kind in [ListKind::Contact, ListKind::Block] {
            assert_eq!(lists.add_member(kind, "alice", &login("bob")).unwrap(), "bob");
            let err = lists.add_member(kind, "alice", &login("bob")).unwrap_err();
            assert!(matches!(err, DomainError::AlreadyMember { scope: Scope::List(k), .. } if k == kind));
            assert_eq!(lists.list_members(kind, "alice").unwrap().len(), 1);
        }
    }

    #[test]
    fn test_concurrent_adds_store_one_row() {
        let lists = store();
        let results: Vec<_> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..2)
                .map(|_| s.spawn(|| lists.add_member(ListKind::Contact, "alice", &login("carol"))))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results.iter().any(|r| matches!(r, Err(DomainError::AlreadyMember { .. }))));
        assert_eq!(lists.list_members(ListKind::Contact, "alice").unwrap().len(), 1);
    }

    #[test]
    fn test_add_by_phone_resolves_login() {
        let lists = store();
        let added = lists
            .add_member(ListKind::Contact, "alice", &UserRef::Phone("555-carol".into()))
            .unwrap();
        assert_eq!(added, "carol");

        let err = lists
            .add_member(ListKind::Contact, "alice", &UserRef::Phone("000-0000".into()))
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { entity: Entity::PhoneNumber, .. }));
    }

    #[test]
    fn test_contact_self_is_allowed() {
        let lists = store();
        lists.add_member(ListKind::Contact, "alice", &login("alice")).unwrap();
    }

    #[test]
    fn test_remove_missing_member() {
        let lists = store();
        let err = lists.remove_member(ListKind::Block, "alice", &login("bob")).unwrap_err();
        assert!(matches!(err, DomainError::NotMember { .. }));

        lists.add_member(ListKind::Block, "alice", &login("bob")).unwrap();
        lists.remove_member(ListKind::Block, "alice", &login("bob")).unwrap();
        assert!(lists.list_members(ListKind::Block, "alice").unwrap().is_empty());
    }

    #[test]
    fn test_lists_are_independent_per_kind_and_owner() {
        let lists = store();
        lists.add_member(ListKind::Contact, "alice", &login("bob")).unwrap();
        lists.add_member(ListKind::Block, "alice", &login("carol")).unwrap();
        lists.add_member(ListKind::Contact, "bob", &login("carol")).unwrap();

        let contacts: Vec<_> = lists
            .list_members(ListKind::Contact, "alice")
            .unwrap()
            .into_iter()
            .map(|m| m.login)
            .collect();
        assert_eq!(contacts, vec!["bob"]);

        let blocked: Vec<_> = lists
            .list_members(ListKind::Block, "alice")
            .unwrap()
            .into_iter()
            .map(|m| m.login)
            .collect();
        assert_eq!(blocked, vec!["carol"]);
    }

    #[test]
    fn test_unknown_owner_or_candidate() {
        let lists = store();
        assert!(matches!(
            lists.add_member(ListKind::Contact, "ghost", &login("bob")),
            Err(DomainError::NotFound { entity: Entity::User, .. })
        ));
        assert!(matches!(
            lists.add_member(ListKind::Contact, "alice", &login("ghost")),
            Err(DomainError::NotFound { entity: Entity::User, .. })
        ));
    }
}
