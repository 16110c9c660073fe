use std::sync::Arc;

use parley_db::Database;

use crate::accounts::AccountRegistry;

pub(crate) fn test_db() -> Arc<Database> {
    Arc::new(Database::open_in_memory().unwrap())
}

/// Register each login with a phone number derived from it.
pub(crate) fn seed_users(db: &Arc<Database>, logins: &[&str]) {
    let accounts = AccountRegistry::new(db.clone());
    for login in logins {
        accounts
            .create(login, &format!("555-{}", login), "not-a-real-hash")
            .unwrap();
    }
}
