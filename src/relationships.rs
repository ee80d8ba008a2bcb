//! Post → comments relationship
//!
//! `Post.comments` is only resolved when a query selects it. List resolvers
//! can warm the request's [`CommentLoader`] ahead of time so sibling posts
//! share a single scan.

use async_graphql::{ComplexObject, Context, Result};

use crate::dataloaders::CommentLoader;
use crate::resolvers::shared_store;
use crate::store::{Comment, Post};

#[ComplexObject]
impl Post {
    /// Comments on this post, in store order
    async fn comments(&self, ctx: &Context<'_>) -> Result<Vec<Comment>> {
        resolve_comments(ctx, &self.id).await
    }
}

/// Comments for one post, through the request loader when one is attached
pub async fn resolve_comments(ctx: &Context<'_>, post_id: &str) -> Result<Vec<Comment>> {
    if let Some(loader) = ctx.data_opt::<CommentLoader>() {
        return Ok(loader.load(post_id.to_string()).await.unwrap_or_default());
    }

    let store = shared_store(ctx)?;
    Ok(store.get_comments_by_post_id(post_id))
}

/// Warm the loader for every post in `posts` when `selected` is true
///
/// Callers pass whether their selection reaches `comments` on the items.
pub async fn prefetch_comments<'a, I>(ctx: &Context<'_>, selected: bool, posts: I)
where
    I: IntoIterator<Item = &'a Post>,
{
    if !selected {
        return;
    }
    if let Some(loader) = ctx.data_opt::<CommentLoader>() {
        let keys: Vec<String> = posts.into_iter().map(|post| post.id.clone()).collect();
        if !keys.is_empty() {
            loader.load_many(keys).await;
        }
    }
}
