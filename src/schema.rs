//! Schema construction

use async_graphql::{extensions::Tracing, EmptyMutation, EmptySubscription, Schema};

use crate::resolvers::QueryRoot;
use crate::store::SharedStore;

/// Read-only content schema
pub type ContentSchema = Schema<QueryRoot, EmptyMutation, EmptySubscription>;

/// Build the schema over `store`
///
/// Request-scoped values (the caller's `RequestContext` and the comment
/// loader) are attached per request by the HTTP handler, not here.
pub fn build_schema(store: SharedStore) -> ContentSchema {
    Schema::build(QueryRoot, EmptyMutation, EmptySubscription)
        .data(store)
        .extension(Tracing)
        .finish()
}
