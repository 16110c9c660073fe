use std::sync::Arc;

use chrono::Utc;
use parley_db::Database;
use parley_types::models::{
    ChatKind, ChatSummary, ListKind, ListMember, MessageDraft, MessagePage, MessageWindow, Notification,
    Session, User, UserRef,
};

use crate::accounts::AccountRegistry;
use crate::chats::{ChatDirectory, live_kind, load_chat, require_member};
use crate::error::DomainError;
use crate::ledger::MessageLedger;
use crate::notify::NotificationHub;
use crate::lists::ListStore;

/// Entry point for callers acting on behalf of a signed-in user.
///
/// Built once by the composition root around the shared store handle; every
/// method routes straight to the component that owns the rule.
pub struct Messenger {
    db: Arc<Database>,
    accounts: AccountRegistry,
    lists: ListStore,
    chats: ChatDirectory,
    ledger: MessageLedger,
    notifications: NotificationHub,
}

impl Messenger {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            accounts: AccountRegistry::new(db.clone()),
            lists: ListStore::new(db.clone()),
            chats: ChatDirectory::new(db.clone()),
            ledger: MessageLedger::new(db.clone()),
            notifications: NotificationHub::new(db.clone()),
            db,
        }
    }

    // -- Accounts --

    pub fn register(&self, login: &str, phone: &str, credential: &str) -> Result<User, DomainError> {
        self.accounts.create(login, phone, credential)
    }

    pub fn credential_for(&self, login: &str) -> Result<String, DomainError> {
        self.accounts.credential(login)
    }

    pub fn profile(&self, session: &Session) -> Result<User, DomainError> {
        self.accounts.find(&UserRef::Login(session.login.clone()))
    }

    pub fn set_status(&self, session: &Session, status: Option<&str>) -> Result<(), DomainError> {
        self.accounts.set_status(&session.login, status)
    }

    pub fn delete_account(&self, session: &Session) -> Result<(), DomainError> {
        self.accounts.delete(&session.login)
    }

    // -- Lists --

    pub fn add_to_list(
        &self,
        session: &Session,
        kind: ListKind,
        candidate: &UserRef,
    ) -> Result<String, DomainError> {
        self.lists.add_member(kind, &session.login, candidate)
    }

    pub fn remove_from_list(
        &self,
        session: &Session,
        kind: ListKind,
        candidate: &UserRef,
    ) -> Result<String, DomainError> {
        self.lists.remove_member(kind, &session.login, candidate)
    }

    pub fn list(&self, session: &Session, kind: ListKind) -> Result<Vec<ListMember>, DomainError> {
        self.lists.list_members(kind, &session.login)
    }

    // -- Chats --

    pub fn create_chat(&self, session: &Session) -> Result<i64, DomainError> {
        self.chats.create_chat(&session.login)
    }

    pub fn add_chat_member(&self, session: &Session, chat_id: i64, login: &str) -> Result<(), DomainError> {
        self.chats.add_member(chat_id, &session.login, login)
    }

    pub fn remove_chat_member(
        &self,
        session: &Session,
        chat_id: i64,
        login: &str,
    ) -> Result<(), DomainError> {
        self.chats.remove_member(chat_id, &session.login, login)
    }

    pub fn delete_chat(&self, session: &Session, chat_id: i64) -> Result<(), DomainError> {
        self.chats.delete_chat(chat_id, &session.login)
    }

    /// Private or group, from the membership as it stands. Members only.
    pub fn classify(&self, session: &Session, chat_id: i64) -> Result<ChatKind, DomainError> {
        self.db.with_tx(|tx| {
            load_chat(tx, chat_id)?;
            require_member(tx, chat_id, &session.login)?;
            live_kind(tx, chat_id)
        })
    }

    pub fn chat_members(&self, session: &Session, chat_id: i64) -> Result<Vec<String>, DomainError> {
        self.chats.members(chat_id, &session.login)
    }

    pub fn chats(&self, session: &Session) -> Result<Vec<ChatSummary>, DomainError> {
        self.chats.chats_for(&session.login)
    }

    pub fn administered_chats(&self, session: &Session) -> Result<Vec<i64>, DomainError> {
        self.chats.administered_by(&session.login)
    }

    // -- Messages --

    /// View a chat: drop its expired messages, mark the viewer's
    /// notifications for it as read, and return one window of history.
    /// A viewer outside the chat changes nothing.
    pub fn open_chat(
        &self,
        session: &Session,
        chat_id: i64,
        window: MessageWindow,
    ) -> Result<MessagePage, DomainError> {
        let now = Utc::now();
        self.db.with_tx(|tx| {
            let page = MessageLedger::list_visible_in(tx, chat_id, &session.login, window, now)?;
            MessageLedger::purge_expired_in(tx, chat_id, now)?;
            NotificationHub::clear_in(tx, &session.login, chat_id)?;
            Ok(page)
        })
    }

    pub fn send_message(
        &self,
        session: &Session,
        chat_id: i64,
        draft: &MessageDraft,
    ) -> Result<i64, DomainError> {
        self.ledger.create(chat_id, &session.login, draft)
    }

    pub fn edit_message(&self, session: &Session, message_id: i64, body: &str) -> Result<(), DomainError> {
        self.ledger.edit(message_id, &session.login, body)
    }

    pub fn delete_message(&self, session: &Session, message_id: i64) -> Result<(), DomainError> {
        self.ledger.delete(message_id, &session.login)
    }

    pub fn notifications(&self, session: &Session) -> Result<Vec<Notification>, DomainError> {
        self.notifications.pending_for(&session.login)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Entity;
    use chrono::Duration;

    fn messenger() -> Messenger {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let m = Messenger::new(db);
        for (login, phone) in [("alice", "555-0001"), ("bob", "555-0002"), ("carol", "555-0003")] {
            m.register(login, phone, "hash").unwrap();
        }
        m
    }

    #[test]
    fn test_end_to_end_notification_cycle() {
        let m = messenger();
        let alice = Session::new("alice");
        let bob = Session::new("bob");

        let chat = m.create_chat(&alice).unwrap();
        m.add_chat_member(&alice, chat, "bob").unwrap();
        let msg = m.send_message(&alice, chat, &MessageDraft::text("hi")).unwrap();

        let pending = m.notifications(&bob).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].message_id, msg);
        assert_eq!(pending[0].sender, "alice");

        let page = m.open_chat(&bob, chat, MessageWindow::default()).unwrap();
        assert_eq!(page.messages[0].body, "hi");
        assert!(m.notifications(&bob).unwrap().is_empty());
    }

    #[test]
    fn test_open_chat_purges_expired() {
        let m = messenger();
        let alice = Session::new("alice");
        let bob = Session::new("bob");

        let chat = m.create_chat(&alice).unwrap();
        m.add_chat_member(&alice, chat, "bob").unwrap();
        let draft = MessageDraft::text("gone soon").expires_at(Utc::now() - Duration::seconds(1));
        m.send_message(&alice, chat, &draft).unwrap();
        assert_eq!(m.notifications(&bob).unwrap().len(), 1);

        // alice has nothing to clear, but the purge runs for anyone viewing
        m.open_chat(&alice, chat, MessageWindow::default()).unwrap();
        assert!(m.notifications(&bob).unwrap().is_empty());
    }

    #[test]
    fn test_outsider_open_changes_nothing() {
        let m = messenger();
        let alice = Session::new("alice");
        let bob = Session::new("bob");
        let carol = Session::new("carol");

        let chat = m.create_chat(&alice).unwrap();
        m.add_chat_member(&alice, chat, "bob").unwrap();
        let draft = MessageDraft::text("expired").expires_at(Utc::now() - Duration::seconds(1));
        m.send_message(&alice, chat, &draft).unwrap();

        assert!(matches!(
            m.open_chat(&carol, chat, MessageWindow::default()),
            Err(DomainError::NotAuthorized { entity: Entity::Chat, .. })
        ));
        assert_eq!(m.notifications(&bob).unwrap().len(), 1);
    }

    #[test]
    fn test_removed_member_has_nothing_pending() {
        let m = messenger();
        let alice = Session::new("alice");
        let bob = Session::new("bob");

        let chat = m.create_chat(&alice).unwrap();
        m.add_chat_member(&alice, chat, "bob").unwrap();
        m.send_message(&alice, chat, &MessageDraft::text("hi")).unwrap();
        assert_eq!(m.notifications(&bob).unwrap().len(), 1);

        m.remove_chat_member(&alice, chat, "bob").unwrap();

        assert!(matches!(
            m.open_chat(&bob, chat, MessageWindow::default()),
            Err(DomainError::NotAuthorized { .. })
        ));
        assert!(m.notifications(&bob).unwrap().is_empty());
    }

    #[test]
    fn test_classify_through_session() {
        let m = messenger();
        let alice = Session::new("alice");
        let carol = Session::new("carol");

        let chat = m.create_chat(&alice).unwrap();
        m.add_chat_member(&alice, chat, "bob").unwrap();
        assert_eq!(m.classify(&alice, chat).unwrap(), ChatKind::Private);

        m.add_chat_member(&alice, chat, "carol").unwrap();
        assert_eq!(m.classify(&carol, chat).unwrap(), ChatKind::Group);

        m.remove_chat_member(&alice, chat, "carol").unwrap();
        assert!(matches!(
            m.classify(&carol, chat),
            Err(DomainError::NotAuthorized { .. })
        ));
        assert_eq!(m.classify(&alice, chat).unwrap(), ChatKind::Private);
    }

    #[test]
    fn test_delete_account_cascades() {
        let m = messenger();
        let alice = Session::new("alice");
        let bob = Session::new("bob");

        let alices = m.create_chat(&alice).unwrap();
        m.add_chat_member(&alice, alices, "bob").unwrap();
        let bobs = m.create_chat(&bob).unwrap();
        m.add_chat_member(&bob, bobs, "alice").unwrap();
        m.send_message(&alice, bobs, &MessageDraft::text("from alice")).unwrap();
        m.add_to_list(&bob, ListKind::Contact, &UserRef::Login("alice".into()))
            .unwrap();

        m.delete_account(&alice).unwrap();

        // Alice's own chat went with her; bob's chat survives without her
        let chats = m.chats(&bob).unwrap();
        assert_eq!(chats.len(), 1);
        assert_eq!(chats[0].id, bobs);
        assert_eq!(m.chat_members(&bob, bobs).unwrap(), vec!["bob"]);
        assert!(m.list(&bob, ListKind::Contact).unwrap().is_empty());

        let page = m.open_chat(&bob, bobs, MessageWindow::default()).unwrap();
        assert!(page.messages.iter().all(|msg| msg.author != "alice"));

        assert!(matches!(
            m.credential_for("alice"),
            Err(DomainError::NotFound { .. })
        ));
    }

    #[test]
    fn test_status_shows_in_contacts() {
        let m = messenger();
        let alice = Session::new("alice");
        let bob = Session::new("bob");

        m.set_status(&bob, Some("busy")).unwrap();
        m.add_to_list(&alice, ListKind::Contact, &UserRef::Phone("555-0002".into()))
            .unwrap();

        let contacts = m.list(&alice, ListKind::Contact).unwrap();
        assert_eq!(contacts[0].login, "bob");
        assert_eq!(contacts[0].status.as_deref(), Some("busy"));
        assert_eq!(m.profile(&bob).unwrap().phone_num, "555-0002");
    }
}
