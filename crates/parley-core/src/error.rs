use std::fmt;

use parley_types::models::ListKind;
use thiserror::Error;

/// The kind of record a failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    User,
    PhoneNumber,
    Chat,
    Message,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::User => "user",
            Self::PhoneNumber => "phone number",
            Self::Chat => "chat",
            Self::Message => "message",
        })
    }
}

/// The set a membership failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    List(ListKind),
    Chat(i64),
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List(kind) => write!(f, "{} list", kind),
            Self::Chat(id) => write!(f, "chat {}", id),
        }
    }
}

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("{entity} {id} not found")]
    NotFound { entity: Entity, id: String },

    #[error("{member} is already in the {scope}")]
    AlreadyMember { scope: Scope, member: String },

    #[error("{member} is not in the {scope}")]
    NotMember { scope: Scope, member: String },

    #[error("{login} cannot {action} themselves")]
    SelfReference { action: &'static str, login: String },

    #[error("{actor} has no access to {entity} {id}")]
    NotAuthorized {
        actor: String,
        entity: Entity,
        id: String,
    },

    #[error("{entity} {id} is already registered")]
    AlreadyExists { entity: Entity, id: String },

    #[error("invalid login or password")]
    InvalidCredentials,

    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] anyhow::Error),
}

impl DomainError {
    pub fn not_found(entity: Entity, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn not_authorized(actor: &str, entity: Entity, id: impl ToString) -> Self {
        Self::NotAuthorized {
            actor: actor.to_string(),
            entity,
            id: id.to_string(),
        }
    }

    /// Stable tag for callers that render or route on the failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::AlreadyMember { .. } => "already_member",
            Self::NotMember { .. } => "not_member",
            Self::SelfReference { .. } => "self_reference",
            Self::NotAuthorized { .. } => "not_authorized",
            Self::AlreadyExists { .. } => "already_exists",
            Self::InvalidCredentials => "invalid_credentials",
            Self::StoreUnavailable(_) => "store_unavailable",
        }
    }

    /// Only store failures are worth retrying; everything else is final for
    /// the request that produced it.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_store_errors_are_retryable() {
        assert!(DomainError::StoreUnavailable(anyhow::anyhow!("disk gone")).is_retryable());
        assert!(!DomainError::not_found(Entity::Chat, 4).is_retryable());
        assert!(!DomainError::InvalidCredentials.is_retryable());
    }

    #[test]
    fn test_messages_carry_entity_and_id() {
        let err = DomainError::not_found(Entity::Message, 42);
        assert_eq!(err.to_string(), "message 42 not found");
        assert_eq!(err.kind(), "not_found");

        let err = DomainError::AlreadyMember {
            scope: Scope::List(ListKind::Block),
            member: "bob".into(),
        };
        assert_eq!(err.to_string(), "bob is already in the block list");

        let err = DomainError::not_authorized("mallory", Entity::Chat, 7);
        assert_eq!(err.to_string(), "mallory has no access to chat 7");
    }
}
