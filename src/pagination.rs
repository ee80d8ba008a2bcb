//! Cursor and offset pagination over ordered collections
//!
//! Cursors are the node id itself and mean "resume after this element".

use async_graphql::{OutputType, SimpleObject};

use crate::store::Post;
use crate::{ContentError, Result};

/// Default page size for both strategies
pub const DEFAULT_PAGE_SIZE: i32 = 10;

/// Page information
#[derive(SimpleObject, Debug, Clone, PartialEq, Eq)]
pub struct PageInfo {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

impl PageInfo {
    fn empty() -> Self {
        Self {
            has_next_page: false,
            end_cursor: None,
        }
    }
}

/// Edge in a connection
#[derive(SimpleObject, Debug, Clone)]
#[graphql(concrete(name = "PostEdge", params(Post)))]
pub struct Edge<T: OutputType> {
    pub cursor: String,
    pub node: T,
}

/// Connection (paginated result)
#[derive(SimpleObject, Debug, Clone)]
#[graphql(concrete(name = "PostConnection", params(Post)))]
pub struct Connection<T: OutputType>
where
    Edge<T>: OutputType,
{
    pub edges: Vec<Edge<T>>,
    pub page_info: PageInfo,
}

/// Anything that can be addressed by a cursor
pub trait Cursored {
    fn cursor(&self) -> &str;
}

impl Cursored for Post {
    fn cursor(&self) -> &str {
        &self.id
    }
}

impl<T: OutputType + Cursored + Clone> Connection<T>
where
    Edge<T>: OutputType,
{
    /// Build a connection from a window and whether more items follow it
    pub fn new(window: &[T], has_next: bool) -> Self {
        let edges: Vec<Edge<T>> = window
            .iter()
            .map(|node| Edge {
                cursor: node.cursor().to_string(),
                node: node.clone(),
            })
            .collect();

        let page_info = match edges.last() {
            Some(last) => PageInfo {
                has_next_page: has_next,
                end_cursor: Some(last.cursor.clone()),
            },
            None => PageInfo::empty(),
        };

        Self { edges, page_info }
    }

    /// Create empty connection
    pub fn empty() -> Self {
        Self {
            edges: Vec::new(),
            page_info: PageInfo::empty(),
        }
    }
}

/// Forward cursor pagination arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorArgs {
    /// Number of items to return
    pub first: i32,

    /// Cursor to resume after; `None` and `""` both start at the beginning
    pub after: Option<String>,
}

impl Default for CursorArgs {
    fn default() -> Self {
        Self {
            first: DEFAULT_PAGE_SIZE,
            after: None,
        }
    }
}

impl CursorArgs {
    /// Validate cursor arguments
    pub fn validate(&self) -> Result<()> {
        if self.first < 0 {
            return Err(ContentError::invalid_argument(
                "first",
                "'first' must be non-negative",
            ));
        }
        Ok(())
    }

    /// Index of the first element of the window
    ///
    /// A cursor that matches nothing restarts at 0.
    pub fn start_index<T: Cursored>(&self, items: &[T]) -> usize {
        match self.after.as_deref() {
            None | Some("") => 0,
            Some(after) => items
                .iter()
                .position(|item| item.cursor() == after)
                .map_or(0, |pos| pos + 1),
        }
    }

    /// Window the items and wrap them in a connection
    pub fn paginate<T>(&self, items: &[T]) -> Result<Connection<T>>
    where
        T: OutputType + Cursored + Clone,
        Edge<T>: OutputType,
    {
        self.validate()?;

        let start = self.start_index(items);
        let end = start.saturating_add(self.first as usize).min(items.len());
        if start >= end {
            return Ok(Connection::empty());
        }

        Ok(Connection::new(&items[start..end], end < items.len()))
    }
}

/// Offset pagination arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetArgs {
    pub offset: i32,
    pub limit: i32,
}

impl Default for OffsetArgs {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl OffsetArgs {
    /// Validate offset arguments
    pub fn validate(&self) -> Result<()> {
        if self.offset < 0 {
            return Err(ContentError::invalid_argument(
                "offset",
                "'offset' must be non-negative",
            ));
        }
        if self.limit < 0 {
            return Err(ContentError::invalid_argument(
                "limit",
                "'limit' must be non-negative",
            ));
        }
        Ok(())
    }

    /// Flat window `items[offset..offset + limit]`, clamped to the collection
    pub fn paginate<T: Clone>(&self, items: &[T]) -> Result<Vec<T>> {
        self.validate()?;

        let start = self.offset as usize;
        let end = start.saturating_add(self.limit as usize).min(items.len());
        if start >= end {
            return Ok(Vec::new());
        }

        Ok(items[start..end].to_vec())
    }
}
