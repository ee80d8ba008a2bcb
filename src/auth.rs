//! API-key authentication, role authorization and the GraphQL HTTP handler
//!
//! Provides helpers for:
//! - Resolving a `Bearer <key>` Authorization header into a [`RequestContext`]
//! - Deciding whether a role may perform an [`Operation`]
//! - Reading the request context back out of a resolver's GraphQL context
//! - The Axum handler and router for the `/graphql` endpoint

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_graphql::Context;
use axum::{
    body::Bytes,
    extract::Extension,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use serde::Deserialize;
use tracing::{debug, warn, Instrument};
use uuid::Uuid;

use crate::config::IdentityConfig;
use crate::dataloaders::CommentLoader;
use crate::response::{self, Assembled};
use crate::schema::ContentSchema;
use crate::store::SharedStore;
use crate::{ContentError, Result};

const BEARER_SCHEME: &str = "Bearer";

/// Caller role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Client,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Client => f.write_str("client"),
            Role::Admin => f.write_str("admin"),
        }
    }
}

/// Per-request identity, attached to the GraphQL request before execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub role: Role,
    pub user_name: String,
    pub request_id: Uuid,
}

/// Operations subject to the role gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Cursor-paginated `posts`
    ListPosts,
    GetPost,
    GetPostsByIds,
    ListPostsOffset,
    ListComments,
}

impl Operation {
    /// Role an identity must hold, `None` when any caller may proceed
    pub fn required_role(self) -> Option<Role> {
        match self {
            Operation::ListPosts => Some(Role::Admin),
            Operation::GetPost
            | Operation::GetPostsByIds
            | Operation::ListPostsOffset
            | Operation::ListComments => None,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::ListPosts => "posts",
            Operation::GetPost => "post",
            Operation::GetPostsByIds => "postIds",
            Operation::ListPostsOffset => "postsOffset",
            Operation::ListComments => "comments",
        };
        f.write_str(name)
    }
}

/// Authorization outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

/// Decide whether `role` may perform `operation`
pub fn authorize(role: Role, operation: Operation) -> Decision {
    match operation.required_role() {
        None => Decision::Allow,
        Some(required) if required == role => Decision::Allow,
        Some(_) => Decision::Deny,
    }
}

/// Check the caller against `operation`
///
/// This is the first thing every root resolver does. Operations without a
/// required role pass even when no request context is attached.
pub fn require(ctx: &Context<'_>, operation: Operation) -> Result<()> {
    if operation.required_role().is_none() {
        return Ok(());
    }

    let request = get_request_context(ctx).ok_or(ContentError::Unauthenticated)?;
    match authorize(request.role, operation) {
        Decision::Allow => Ok(()),
        Decision::Deny => {
            debug!(
                request_id = %request.request_id,
                user = %request.user_name,
                role = %request.role,
                %operation,
                "operation denied"
            );
            Err(ContentError::Forbidden { operation })
        }
    }
}

/// Maps API keys to identities
#[derive(Debug, Clone)]
pub struct IdentityGate {
    users_by_key: HashMap<String, String>,
    admin_user: String,
}

impl IdentityGate {
    /// Build the gate from the configured key table
    pub fn from_config(config: &IdentityConfig) -> Self {
        Self {
            users_by_key: config
                .api_keys
                .iter()
                .map(|(key, user)| (key.clone(), user.clone()))
                .collect(),
            admin_user: config.admin_user.clone(),
        }
    }

    /// Resolve a raw Authorization header value
    ///
    /// The value must be exactly `Bearer <key>` with a single space and a
    /// non-empty key; the key must be known.
    pub fn resolve_identity(&self, raw_auth_header: &str) -> Result<RequestContext> {
        let key = match raw_auth_header.split_once(' ') {
            Some((BEARER_SCHEME, key)) if !key.is_empty() && !key.contains(' ') => key,
            _ => return Err(ContentError::Unauthenticated),
        };

        let user_name = self
            .users_by_key
            .get(key)
            .ok_or(ContentError::Unauthenticated)?;

        let role = if *user_name == self.admin_user {
            Role::Admin
        } else {
            Role::Client
        };

        Ok(RequestContext {
            role,
            user_name: user_name.clone(),
            request_id: Uuid::new_v4(),
        })
    }
}

/// JSON body accepted by `/graphql`
///
/// `query` is required; a body without it is rejected before the engine runs.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphQLBody {
    query: String,
    #[serde(default)]
    variables: Option<async_graphql::Variables>,
    #[serde(default)]
    operation_name: Option<String>,
}

impl From<GraphQLBody> for async_graphql::Request {
    fn from(body: GraphQLBody) -> Self {
        let mut request = async_graphql::Request::new(body.query);
        if let Some(variables) = body.variables {
            request = request.variables(variables);
        }
        if let Some(operation_name) = body.operation_name {
            request = request.operation_name(operation_name);
        }
        request
    }
}

/// Extract the raw Authorization header value
pub fn extract_authorization(headers: &HeaderMap) -> Option<&str> {
    headers.get(AUTHORIZATION).and_then(|h| h.to_str().ok())
}

/// Get the request context from GraphQL context
///
/// # Example
///
/// ```rust,no_run
/// use async_graphql::Context;
/// use pleme_content_graph::auth::get_request_context;
///
/// fn resolver(ctx: &Context<'_>) -> Option<String> {
///     get_request_context(ctx).map(|r| r.user_name)
/// }
/// ```
pub fn get_request_context(ctx: &Context<'_>) -> Option<RequestContext> {
    ctx.data_opt::<RequestContext>().cloned()
}

/// GraphQL handler with the role gate in front of the engine
///
/// Order matters: the credential is checked first (401), then the body is
/// parsed (400), and only then is the query executed.
pub async fn graphql_handler(
    Extension(schema): Extension<ContentSchema>,
    Extension(gate): Extension<Arc<IdentityGate>>,
    Extension(store): Extension<SharedStore>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let context = match gate.resolve_identity(extract_authorization(&headers).unwrap_or_default()) {
        Ok(context) => context,
        Err(_) => {
            warn!("rejected request with missing or unknown credential");
            return into_response(response::reject(StatusCode::UNAUTHORIZED, "Unauthorized"));
        }
    };

    let span = tracing::info_span!(
        "graphql",
        request_id = %context.request_id,
        user = %context.user_name,
        role = %context.role,
    );

    async move {
        let request: async_graphql::Request = match serde_json::from_slice::<GraphQLBody>(&body) {
            Ok(body) => body.into(),
            Err(err) => {
                debug!(error = %err, "unparsable request body");
                return into_response(response::reject(StatusCode::BAD_REQUEST, "Invalid request"));
            }
        };

        let request = request
            .data(context)
            .data(CommentLoader::for_store(store));

        let result = schema.execute(request).await;
        let assembled = response::assemble(&result);
        debug!(
            status = assembled.status.as_u16(),
            errors = result.errors.len(),
            "request complete"
        );
        into_response(assembled)
    }
    .instrument(span)
    .await
}

fn into_response(assembled: Assembled) -> Response {
    (
        assembled.status,
        [(axum::http::header::CONTENT_TYPE, "application/json")],
        assembled.body,
    )
        .into_response()
}

/// Router exposing `POST /graphql`
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use pleme_content_graph::{build_schema, router, IdentityConfig, IdentityGate, InMemoryStore, SharedStore};
///
/// # async fn example() {
/// let store: SharedStore = Arc::new(InMemoryStore::seeded());
/// let gate = Arc::new(IdentityGate::from_config(&IdentityConfig::default()));
/// let app = router(build_schema(store.clone()), gate, store);
/// # }
/// ```
pub fn router(schema: ContentSchema, gate: Arc<IdentityGate>, store: SharedStore) -> Router {
    Router::new()
        .route("/graphql", post(graphql_handler))
        .layer(Extension(schema))
        .layer(Extension(gate))
        .layer(Extension(store))
}
