use std::sync::Arc;

use parley_db::{Database, is_constraint_violation, queries};
use parley_types::models::{ListKind, User, UserRef};
use rusqlite::Connection;
use tracing::{info, warn};

use crate::error::{DomainError, Entity};

/// User rows and the two lists every user owns.
///
/// The credential is stored as an opaque string; hashing and verification
/// belong to whoever authenticates requests.
pub struct AccountRegistry {
    db: Arc<Database>,
}

impl AccountRegistry {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Create a user together with an empty block list and contact list.
    pub fn create(&self, login: &str, phone: &str, credential: &str) -> Result<User, DomainError> {
        self.db.with_tx(|tx| {
            if queries::user_exists(tx, login)? {
                return Err(DomainError::AlreadyExists {
                    entity: Entity::User,
                    id: login.to_string(),
                });
            }
            if !queries::logins_by_phone(tx, phone)?.is_empty() {
                return Err(DomainError::AlreadyExists {
                    entity: Entity::PhoneNumber,
                    id: phone.to_string(),
                });
            }

            let block_list = queries::insert_list(tx, ListKind::Block.as_str())?;
            let contact_list = queries::insert_list(tx, ListKind::Contact.as_str())?;

            queries::insert_user(tx, login, credential, phone, contact_list, block_list).map_err(
                |e| {
                    if is_constraint_violation(&e) {
                        DomainError::AlreadyExists {
                            entity: Entity::User,
                            id: login.to_string(),
                        }
                    } else {
                        DomainError::StoreUnavailable(e)
                    }
                },
            )?;

            info!("Account created: {}", login);
            Ok(User {
                login: login.to_string(),
                phone_num: phone.to_string(),
                status: None,
            })
        })
    }

    pub fn find(&self, user: &UserRef) -> Result<User, DomainError> {
        self.db.with_tx(|tx| {
            let login = resolve_in(tx, user)?;
            let row = queries::get_user(tx, &login)?
                .ok_or_else(|| DomainError::not_found(Entity::User, &login))?;
            Ok(User {
                login: row.login,
                phone_num: row.phone_num,
                status: row.status,
            })
        })
    }

    /// The stored credential for `login`, for the caller to verify.
    pub fn credential(&self, login: &str) -> Result<String, DomainError> {
        self.db
            .with_conn(|conn| queries::get_user(conn, login))?
            .map(|row| row.password)
            .ok_or_else(|| DomainError::not_found(Entity::User, login))
    }

    pub fn set_status(&self, login: &str, status: Option<&str>) -> Result<(), DomainError> {
        let updated = self
            .db
            .with_conn(|conn| queries::set_status(conn, login, status))?;
        if updated == 0 {
            return Err(DomainError::not_found(Entity::User, login));
        }
        Ok(())
    }

    /// Delete a user and everything that belongs to them: both lists, every
    /// list and chat membership, chats they started, messages they wrote and
    /// notifications addressed to them.
    pub fn delete(&self, login: &str) -> Result<(), DomainError> {
        self.db.with_tx(|tx| {
            let user = queries::get_user(tx, login)?
                .ok_or_else(|| DomainError::not_found(Entity::User, login))?;

            queries::delete_user(tx, login)?;
            queries::delete_list(tx, user.contact_list)?;
            queries::delete_list(tx, user.block_list)?;

            info!("Account deleted: {}", login);
            Ok(())
        })
    }
}

/// Resolve a login or phone number to an existing login.
pub(crate) fn resolve_in(conn: &Connection, user: &UserRef) -> Result<String, DomainError> {
    match user {
        UserRef::Login(login) => {
            if queries::user_exists(conn, login)? {
                Ok(login.clone())
            } else {
                Err(DomainError::not_found(Entity::User, login))
            }
        }
        UserRef::Phone(phone) => {
            let mut logins = queries::logins_by_phone(conn, phone)?;
            if logins.len() > 1 {
                warn!("Phone number {} maps to {} accounts", phone, logins.len());
            }
            match logins.len() {
                1 => Ok(logins.remove(0)),
                _ => Err(DomainError::not_found(Entity::PhoneNumber, phone)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{seed_users, test_db};

    #[test]
    fn test_create_and_find_by_phone() {
        let db = test_db();
        let accounts = AccountRegistry::new(db);
        accounts.create("alice", "555-0001", "hash").unwrap();

        let user = accounts.find(&UserRef::Phone("555-0001".into())).unwrap();
        assert_eq!(user.login, "alice");
        assert_eq!(accounts.credential("alice").unwrap(), "hash");
    }

    #[test]
    fn test_duplicate_login_or_phone_rejected() {
        let db = test_db();
        let accounts = AccountRegistry::new(db);
        accounts.create("alice", "555-0001", "hash").unwrap();

        let err = accounts.create("alice", "555-0002", "hash").unwrap_err();
        assert!(matches!(err, DomainError::AlreadyExists { entity: Entity::User, .. }));

        let err = accounts.create("bob", "555-0001", "hash").unwrap_err();
        assert!(matches!(
            err,
            DomainError::AlreadyExists {
                entity: Entity::PhoneNumber,
                ..
            }
        ));
    }

    #[test]
    fn test_unknown_user_lookups() {
        let db = test_db();
        let accounts = AccountRegistry::new(db);

        assert!(matches!(
            accounts.find(&UserRef::Login("ghost".into())),
            Err(DomainError::NotFound { entity: Entity::User, .. })
        ));
        assert!(matches!(
            accounts.find(&UserRef::Phone("000".into())),
            Err(DomainError::NotFound {
                entity: Entity::PhoneNumber,
                ..
            })
        ));
        assert!(matches!(
            accounts.set_status("ghost", Some("away")),
            Err(DomainError::NotFound { .. })
        ));
    }

    #[test]
    fn test_status_round_trip() {
        let db = test_db();
        seed_users(&db, &["alice"]);
        let accounts = AccountRegistry::new(db);

        accounts.set_status("alice", Some("on holiday")).unwrap();
        let user = accounts.find(&UserRef::Login("alice".into())).unwrap();
        assert_eq!(user.status.as_deref(), Some("on holiday"));
    }

    #[test]
    fn test_delete_removes_user_and_lists() {
        let db = test_db();
        seed_users(&db, &["alice"]);
        let accounts = AccountRegistry::new(db.clone());

        accounts.delete("alice").unwrap();

        let lists: i64 = db
            .with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM user_list", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(lists, 0);
        assert!(matches!(accounts.delete("alice"), Err(DomainError::NotFound { .. })));
    }
}
