//! Root query fields
//!
//! Every resolver runs the role gate first, then validates its arguments,
//! and only then touches the store.

use async_graphql::{Context, ErrorExtensions, Object, Result};
use tracing::{debug, error};

use crate::auth::{self, Operation};
use crate::pagination::{Connection, CursorArgs, OffsetArgs};
use crate::relationships::prefetch_comments;
use crate::store::{Comment, Post, SharedStore};
use crate::ContentError;

fn field_error(err: ContentError) -> async_graphql::Error {
    err.extend()
}

/// Store attached to the schema
///
/// A schema built without one is a wiring bug; the detail is logged and the
/// caller only sees a generic internal error.
pub(crate) fn shared_store<'a>(ctx: &Context<'a>) -> Result<&'a SharedStore> {
    ctx.data::<SharedStore>().map_err(|err| {
        let err = ContentError::Internal(err.message);
        error!(error = ?err, "content store missing from schema data");
        field_error(err)
    })
}

/// Root query type
#[derive(Default)]
pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// Cursor-paginated posts; admin only
    ///
    /// The cursor of each edge is the post id. An `after` that matches no post
    /// restarts from the beginning.
    async fn posts(
        &self,
        ctx: &Context<'_>,
        #[graphql(default = 10)] first: i32,
        after: Option<String>,
    ) -> Result<Connection<Post>> {
        auth::require(ctx, Operation::ListPosts).map_err(field_error)?;

        let args = CursorArgs { first, after };
        let store = shared_store(ctx)?;
        let connection = args.paginate(store.posts()).map_err(field_error)?;

        let comments_selected = ctx
            .look_ahead()
            .field("edges")
            .field("node")
            .field("comments")
            .exists();
        prefetch_comments(
            ctx,
            comments_selected,
            connection.edges.iter().map(|edge| &edge.node),
        )
        .await;

        debug!(
            first = args.first,
            after = ?args.after,
            returned = connection.edges.len(),
            has_next_page = connection.page_info.has_next_page,
            "cursor page"
        );
        Ok(connection)
    }

    /// Single post by id; null when absent
    async fn post(&self, ctx: &Context<'_>, id: String) -> Result<Option<Post>> {
        auth::require(ctx, Operation::GetPost).map_err(field_error)?;

        let store = shared_store(ctx)?;
        Ok(store.get_by_id(&id))
    }

    /// Posts for the given ids, in the order the ids were given
    ///
    /// Ids with no post resolve to `null` in their position.
    async fn post_ids(&self, ctx: &Context<'_>, ids: Vec<String>) -> Result<Vec<Option<Post>>> {
        auth::require(ctx, Operation::GetPostsByIds).map_err(field_error)?;

        if ids.is_empty() {
            return Err(field_error(ContentError::invalid_argument(
                "ids",
                "'ids' must not be empty",
            )));
        }

        let store = shared_store(ctx)?;
        let posts = store.get_by_ids(&ids);

        let comments_selected = ctx.look_ahead().field("comments").exists();
        prefetch_comments(ctx, comments_selected, posts.iter().flatten()).await;

        Ok(posts)
    }

    /// Offset-paginated posts
    async fn posts_offset(
        &self,
        ctx: &Context<'_>,
        #[graphql(default = 0)] offset: i32,
        #[graphql(default = 10)] limit: i32,
    ) -> Result<Vec<Post>> {
        auth::require(ctx, Operation::ListPostsOffset).map_err(field_error)?;

        let args = OffsetArgs { offset, limit };
        let store = shared_store(ctx)?;
        let posts = args.paginate(store.posts()).map_err(field_error)?;

        let comments_selected = ctx.look_ahead().field("comments").exists();
        prefetch_comments(ctx, comments_selected, posts.iter()).await;

        debug!(offset, limit, returned = posts.len(), "offset page");
        Ok(posts)
    }

    /// Comments attached to a post id; the post need not exist
    async fn comments(&self, ctx: &Context<'_>, post_id: String) -> Result<Vec<Comment>> {
        auth::require(ctx, Operation::ListComments).map_err(field_error)?;

        let store = shared_store(ctx)?;
        Ok(store.get_comments_by_post_id(&post_id))
    }
}

#[cfg(test)]
mod tests {
    use crate::auth::{RequestContext, Role};
    use crate::dataloaders::CommentLoader;
    use crate::schema::{build_schema, ContentSchema};
    use crate::store::{InMemoryStore, SharedStore};
    use async_graphql::{Request, Response};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use uuid::Uuid;

    fn store() -> SharedStore {
        Arc::new(InMemoryStore::seeded())
    }

    fn schema() -> ContentSchema {
        build_schema(store())
    }

    fn context(role: Role) -> RequestContext {
        RequestContext {
            role,
            user_name: role.to_string(),
            request_id: Uuid::new_v4(),
        }
    }

    async fn run(role: Option<Role>, query: &str) -> Response {
        let mut request = Request::new(query);
        if let Some(role) = role {
            request = request.data(context(role));
        }
        schema().execute(request).await
    }

    fn data(response: &Response) -> Value {
        assert!(response.errors.is_empty(), "unexpected errors: {:?}", response.errors);
        serde_json::to_value(&response.data).unwrap()
    }

    #[tokio::test]
    async fn test_posts_requires_admin() {
        let response = run(
            Some(Role::Client),
            "{ posts(first:5){ edges{ node{id} } pageInfo{hasNextPage} } }",
        )
        .await;
        assert_eq!(response.errors.len(), 1);
        assert!(response.errors[0].message.starts_with("Forbidden"));
    }

    #[tokio::test]
    async fn test_posts_without_context_is_unauthenticated() {
        let response = run(None, "{ posts { edges { cursor } } }").await;
        assert_eq!(response.errors.len(), 1);
        assert_eq!(response.errors[0].message, "Unauthenticated");
    }

    #[tokio::test]
    async fn test_posts_forbidden_even_with_bad_arguments() {
        // the role check happens before argument validation
        let response = run(Some(Role::Client), "{ posts(first:-1){ edges { cursor } } }").await;
        assert!(response.errors[0].message.starts_with("Forbidden"));
    }

    #[tokio::test]
    async fn test_posts_default_page() {
        let response = run(
            Some(Role::Admin),
            "{ posts { edges { cursor } pageInfo { hasNextPage endCursor } } }",
        )
        .await;
        let data = data(&response);
        assert_eq!(data["posts"]["edges"].as_array().unwrap().len(), 10);
        assert_eq!(
            data["posts"]["pageInfo"],
            json!({"hasNextPage": false, "endCursor": "10"})
        );
    }

    #[tokio::test]
    async fn test_posts_empty_window() {
        let response = run(
            Some(Role::Admin),
            r#"{ posts(after:"10"){ edges { cursor } pageInfo { hasNextPage endCursor } } }"#,
        )
        .await;
        assert_eq!(
            data(&response),
            json!({"posts": {"edges": [], "pageInfo": {"hasNextPage": false, "endCursor": null}}})
        );
    }

    #[tokio::test]
    async fn test_posts_unknown_cursor_restarts() {
        let response = run(
            Some(Role::Admin),
            r#"{ posts(first:1, after:"zzz"){ edges { node { id } } } }"#,
        )
        .await;
        assert_eq!(
            data(&response),
            json!({"posts": {"edges": [{"node": {"id": "1"}}]}})
        );
    }

    #[tokio::test]
    async fn test_posts_negative_first() {
        let response = run(Some(Role::Admin), "{ posts(first:-2){ edges { cursor } } }").await;
        assert_eq!(response.errors[0].message, "Validation error");
    }

    #[tokio::test]
    async fn test_client_can_read_single_post() {
        let response = run(Some(Role::Client), r#"{ post(id:"2"){ id title } }"#).await;
        assert_eq!(
            data(&response),
            json!({"post": {"id": "2", "title": "Post 2"}})
        );
    }

    #[tokio::test]
    async fn test_missing_post_is_null() {
        let response = run(Some(Role::Client), r#"{ post(id:"404"){ id } }"#).await;
        assert_eq!(data(&response), json!({"post": null}));
    }

    #[tokio::test]
    async fn test_post_ids_order_and_null_fill() {
        let response = run(Some(Role::Client), r#"{ postIds(ids:["3","1","9","99"]){ id } }"#).await;
        assert_eq!(
            data(&response),
            json!({"postIds": [{"id": "3"}, {"id": "1"}, {"id": "9"}, null]})
        );
    }

    #[tokio::test]
    async fn test_post_ids_rejects_empty_list() {
        let response = run(Some(Role::Client), "{ postIds(ids:[]){ id } }").await;
        assert_eq!(response.errors.len(), 1);
        assert_eq!(response.errors[0].message, "Validation error");
    }

    #[tokio::test]
    async fn test_posts_offset() {
        let response = run(Some(Role::Client), "{ postsOffset { id } }").await;
        assert_eq!(data(&response)["postsOffset"].as_array().unwrap().len(), 10);

        let response = run(Some(Role::Client), "{ postsOffset(offset:10, limit:10) { id } }").await;
        assert_eq!(data(&response), json!({"postsOffset": []}));

        let response = run(Some(Role::Client), "{ postsOffset(offset:2, limit:2) { title } }").await;
        assert_eq!(
            data(&response),
            json!({"postsOffset": [{"title": "Post 3"}, {"title": "Post 4"}]})
        );
    }

    #[tokio::test]
    async fn test_posts_offset_negative_limit() {
        let response = run(Some(Role::Client), "{ postsOffset(limit:-1) { id } }").await;
        assert_eq!(response.errors[0].message, "Validation error");
    }

    #[tokio::test]
    async fn test_invalid_argument_reports_field_path() {
        let response = run(
            Some(Role::Client),
            r#"{ post(id:"1") { id } postsOffset(offset:-1) { id } }"#,
        )
        .await;
        assert_eq!(response.errors.len(), 1);
        let error = serde_json::to_value(&response.errors[0]).unwrap();
        assert_eq!(error["path"], json!(["postsOffset"]));
        assert_eq!(error["extensions"]["code"], "INVALID_ARGUMENT");
        assert_eq!(error["extensions"]["reason"], "'offset' must be non-negative");
    }

    #[tokio::test]
    async fn test_comments_root_field() {
        let response = run(Some(Role::Client), r#"{ comments(postId:"1"){ id postId content } }"#).await;
        assert_eq!(
            data(&response),
            json!({"comments": [
                {"id": "1", "postId": "1", "content": "Comment 1 on Post 1"},
                {"id": "2", "postId": "1", "content": "Comment 2 on Post 1"}
            ]})
        );

        let response = run(Some(Role::Client), r#"{ comments(postId:"nope"){ id } }"#).await;
        assert_eq!(data(&response), json!({"comments": []}));
    }

    #[tokio::test]
    async fn test_nested_comments_with_and_without_loader() {
        let query = "{ postsOffset(limit:4) { id comments { id } } }";
        let expected = json!({"postsOffset": [
            {"id": "1", "comments": [{"id": "1"}, {"id": "2"}]},
            {"id": "2", "comments": [{"id": "3"}]},
            {"id": "3", "comments": [{"id": "4"}, {"id": "5"}]},
            {"id": "4", "comments": [{"id": "6"}]}
        ]});

        let direct = run(Some(Role::Client), query).await;
        assert_eq!(data(&direct), expected);

        let request = Request::new(query)
            .data(context(Role::Client))
            .data(CommentLoader::for_store(store()));
        let batched = schema().execute(request).await;
        assert_eq!(data(&batched), expected);
    }

    #[tokio::test]
    async fn test_nested_comments_under_cursor_edges() {
        let request = Request::new(
            r#"{ posts(first:2, after:"2"){ edges { node { id comments { content } } } } }"#,
        )
        .data(context(Role::Admin))
        .data(CommentLoader::for_store(store()));
        let response = schema().execute(request).await;
        assert_eq!(
            data(&response),
            json!({"posts": {"edges": [
                {"node": {"id": "3", "comments": [
                    {"content": "Comment 1 on Post 3"},
                    {"content": "Comment 2 on Post 3"}
                ]}},
                {"node": {"id": "4", "comments": [{"content": "Comment 1 on Post 4"}]}}
            ]}})
        );
    }

    #[tokio::test]
    async fn test_missing_store_is_generic_internal_error() {
        use async_graphql::{EmptyMutation, EmptySubscription, Schema};

        let bare = Schema::build(super::QueryRoot, EmptyMutation, EmptySubscription).finish();
        let response = bare.execute(r#"{ post(id:"1") { id } }"#).await;

        let error = serde_json::to_value(&response.errors[0]).unwrap();
        assert_eq!(error["message"], "Internal server error");
        assert_eq!(error["extensions"]["code"], "INTERNAL");
    }
}
