//! Messaging domain core: contact and block lists, chats and their
//! membership, the message ledger with expiry, and notification fan-out.
//!
//! Every component holds a shared [`parley_db::Database`] handle. Operations
//! that touch more than one relation run inside a single store transaction.

pub mod accounts;
pub mod chats;
mod convert;
pub mod error;
pub mod facade;
pub mod ledger;
pub mod lists;
pub mod notify;

#[cfg(test)]
mod testutil;

pub use accounts::AccountRegistry;
pub use chats::ChatDirectory;
pub use error::{DomainError, Entity, Scope};
pub use facade::Messenger;
pub use ledger::MessageLedger;
pub use lists::ListStore;
pub use notify::NotificationHub;
