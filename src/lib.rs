//! # pleme-content-graph
//!
//! GraphQL content service for Pleme platform: posts and their comments,
//! served from an in-memory store behind an API-key role gate.
//!
//! ## Features
//!
//! - **Role Gate** - `Bearer <key>` identity resolution and per-operation authorization
//! - **Cursor Pagination** - Relay-style connections where the cursor is the post id
//! - **Offset Pagination** - flat `offset`/`limit` windows
//! - **Batched Lookups** - order-preserving `postIds` and per-request comment loading
//! - **Response Envelope** - all-or-nothing `data`/`errors` JSON with status mapping
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use pleme_content_graph::{build_schema, router, IdentityConfig, IdentityGate, InMemoryStore, SharedStore};
//!
//! # async fn example() {
//! let store: SharedStore = Arc::new(InMemoryStore::seeded());
//! let schema = build_schema(store.clone());
//! let gate = Arc::new(IdentityGate::from_config(&IdentityConfig::default()));
//! let app = router(schema, gate, store);
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod dataloaders;
pub mod pagination;
pub mod relationships;
pub mod resolvers;
pub mod response;
pub mod schema;
pub mod store;

pub use auth::{
    authorize, get_request_context, graphql_handler, router, Decision, IdentityGate, Operation,
    RequestContext, Role,
};
pub use config::{Config, IdentityConfig};
pub use dataloaders::{BatchLoader, CommentLoader, CommentsByPostLoader, DataLoader};
pub use pagination::{Connection, CursorArgs, Edge, OffsetArgs, PageInfo};
pub use response::{assemble, Assembled, VALIDATION_ERROR};
pub use schema::{build_schema, ContentSchema};
pub use store::{Comment, ContentStore, InMemoryStore, Post, SharedStore};

use async_graphql::ErrorExtensions;
use thiserror::Error;

/// Content service errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContentError {
    #[error("Unauthenticated")]
    Unauthenticated,

    #[error("Forbidden: {operation} requires the admin role")]
    Forbidden { operation: Operation },

    /// Rendered with the validation marker so the envelope maps it to 400;
    /// the offending argument travels in the error extensions.
    #[error("{}", VALIDATION_ERROR)]
    InvalidArgument {
        argument: &'static str,
        reason: String,
    },

    #[error("Internal server error")]
    Internal(String),
}

impl ContentError {
    /// Shorthand for argument validation failures
    pub fn invalid_argument(argument: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            argument,
            reason: reason.into(),
        }
    }

    /// Machine-readable code placed in `extensions.code`
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::Forbidden { .. } => "FORBIDDEN",
            Self::InvalidArgument { .. } => "INVALID_ARGUMENT",
            Self::Internal(_) => "INTERNAL",
        }
    }
}

impl ErrorExtensions for ContentError {
    fn extend(&self) -> async_graphql::Error {
        async_graphql::Error::new(self.to_string()).extend_with(|_, e| {
            e.set("code", self.code());
            if let Self::InvalidArgument { argument, reason } = self {
                e.set("argument", *argument);
                e.set("reason", reason.as_str());
            }
        })
    }
}

/// Result type for content operations
pub type Result<T> = std::result::Result<T, ContentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_argument_uses_validation_marker() {
        let err = ContentError::invalid_argument("offset", "must be non-negative");
        assert_eq!(err.to_string(), VALIDATION_ERROR);
        assert_eq!(err.code(), "INVALID_ARGUMENT");
    }

    #[test]
    fn test_forbidden_names_operation() {
        let err = ContentError::Forbidden {
            operation: Operation::ListPosts,
        };
        assert!(err.to_string().starts_with("Forbidden"));
        assert!(err.to_string().contains("posts"));
    }

    #[test]
    fn test_extend_sets_code() {
        let err = ContentError::invalid_argument("ids", "must not be empty").extend();
        let extensions = serde_json::to_value(err.extensions.expect("extensions set")).unwrap();
        assert_eq!(extensions["code"], "INVALID_ARGUMENT");
        assert_eq!(extensions["argument"], "ids");
        assert_eq!(extensions["reason"], "must not be empty");
    }
}
