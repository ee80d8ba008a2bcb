//! Read-only content store
//!
//! Posts and comments live in ordered, static collections. Insertion order is
//! the pagination order, so cursors encode a position in [`ContentStore::posts`]
//! and stay valid only while that order is preserved.

use std::collections::HashMap;
use std::sync::Arc;

use async_graphql::SimpleObject;
use serde::{Deserialize, Serialize};

/// A post
#[derive(SimpleObject, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[graphql(complex)]
pub struct Post {
    pub id: String,
    pub title: String,
}

/// A comment attached to a post
///
/// `post_id` is not checked against the post collection.
#[derive(SimpleObject, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub content: String,
}

/// Store accessors consumed by the field resolvers
pub trait ContentStore: Send + Sync {
    /// All posts in store order
    fn posts(&self) -> &[Post];

    /// All comments in store order
    fn comments(&self) -> &[Comment];

    /// First post with a matching id
    fn get_by_id(&self, id: &str) -> Option<Post> {
        self.posts().iter().find(|post| post.id == id).cloned()
    }

    /// Posts for each input id, in input order
    ///
    /// Slot `i` of the output always corresponds to `ids[i]`; ids with no
    /// matching post yield `None` in their slot.
    fn get_by_ids(&self, ids: &[String]) -> Vec<Option<Post>> {
        ids.iter().map(|id| self.get_by_id(id)).collect()
    }

    /// Comments whose `post_id` equals the argument, in store order
    fn get_comments_by_post_id(&self, post_id: &str) -> Vec<Comment> {
        self.comments()
            .iter()
            .filter(|comment| comment.post_id == post_id)
            .cloned()
            .collect()
    }

    /// Comments for several posts in a single scan
    ///
    /// Every requested id gets an entry, empty when nothing matches.
    fn comments_by_post_ids(&self, post_ids: &[String]) -> HashMap<String, Vec<Comment>> {
        let mut grouped: HashMap<String, Vec<Comment>> = post_ids
            .iter()
            .map(|id| (id.clone(), Vec::new()))
            .collect();

        for comment in self.comments() {
            if let Some(bucket) = grouped.get_mut(&comment.post_id) {
                bucket.push(comment.clone());
            }
        }

        grouped
    }
}

/// Store handle shared between the schema and the HTTP layer
pub type SharedStore = Arc<dyn ContentStore>;

/// Static in-memory store
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    posts: Vec<Post>,
    comments: Vec<Comment>,
}

impl InMemoryStore {
    /// Create a store over the given collections
    pub fn new(posts: Vec<Post>, comments: Vec<Comment>) -> Self {
        Self { posts, comments }
    }

    /// Store with the demo data set served by the binary
    ///
    /// Ten posts (`"1"`..`"10"`) and six comments spread over posts 1-4.
    pub fn seeded() -> Self {
        let posts = (1..=10)
            .map(|n| Post {
                id: n.to_string(),
                title: format!("Post {}", n),
            })
            .collect();

        let comments = [
            ("1", "1", 1),
            ("2", "1", 2),
            ("3", "2", 1),
            ("4", "3", 1),
            ("5", "3", 2),
            ("6", "4", 1),
        ]
        .into_iter()
        .map(|(id, post_id, nth)| Comment {
            id: id.to_string(),
            post_id: post_id.to_string(),
            content: format!("Comment {} on Post {}", nth, post_id),
        })
        .collect();

        Self::new(posts, comments)
    }
}

impl ContentStore for InMemoryStore {
    fn posts(&self) -> &[Post] {
        &self.posts
    }

    fn comments(&self) -> &[Comment] {
        &self.comments
    }
}
