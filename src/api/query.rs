//! Query vocabulary shared by every data source

use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

/// Named relations the client reads and writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Relation {
    /// Posts (items)
    Posts,
    /// User profiles (actors)
    Users,
    /// Like edges
    Likes,
    /// Follow edges
    Follows,
    /// Save edges
    Saves,
    /// Collections
    Collections,
    /// Activity log
    Activity,
}

impl Relation {
    /// Table name on the backend
    pub const fn table(&self) -> &'static str {
        match self {
            Self::Posts => "posts",
            Self::Users => "users",
            Self::Likes => "likes",
            Self::Follows => "follows",
            Self::Saves => "saves",
            Self::Collections => "collections",
            Self::Activity => "activity",
        }
    }

    /// Columns forming the relation's unique key
    pub const fn unique_key(&self) -> &'static [&'static str] {
        match self {
            Self::Posts | Self::Collections | Self::Activity => &["id"],
            Self::Users => &["handle"],
            Self::Likes => &["user_id", "post_id"],
            Self::Follows => &["follower_id", "following_id"],
            Self::Saves => &["user_id", "post_id", "collection_id"],
        }
    }

    /// Whether the backend assigns an `id` on insert
    pub const fn has_generated_id(&self) -> bool {
        matches!(
            self,
            Self::Posts | Self::Users | Self::Collections | Self::Activity
        )
    }
}

impl std::fmt::Display for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.table())
    }
}

/// A row predicate
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `column = value`
    Eq(&'static str, Value),
    /// `column <> value`
    Neq(&'static str, Value),
    /// `column IN (values)`
    In(&'static str, Vec<Value>),
    /// Case-insensitive pattern match, `*` as wildcard
    ILike(&'static str, String),
    /// `column IS NULL`
    IsNull(&'static str),
}

impl Filter {
    /// Equality against anything serializable to JSON
    pub fn eq(column: &'static str, value: impl Into<Value>) -> Self {
        Self::Eq(column, value.into())
    }

    /// Membership against a list of serializable values
    pub fn any_of<I, V>(column: &'static str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::In(column, values.into_iter().map(Into::into).collect())
    }

    /// Equality against an id column
    pub fn id(column: &'static str, id: Uuid) -> Self {
        Self::Eq(column, Value::String(id.to_string()))
    }

    /// Membership against a set of ids
    pub fn ids<I>(column: &'static str, ids: I) -> Self
    where
        I: IntoIterator<Item = Uuid>,
    {
        Self::In(
            column,
            ids.into_iter().map(|id| Value::String(id.to_string())).collect(),
        )
    }

    /// Column the filter reads
    pub const fn column(&self) -> &'static str {
        match self {
            Self::Eq(c, _) | Self::Neq(c, _) | Self::In(c, _) | Self::ILike(c, _) | Self::IsNull(c) => c,
        }
    }
}

/// Sort key and direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Order {
    /// Column to sort by
    pub column: &'static str,
    /// Newest/largest first
    pub descending: bool,
}

impl Order {
    /// Descending order on `column`
    pub const fn desc(column: &'static str) -> Self {
        Self {
            column,
            descending: true,
        }
    }

    /// Ascending order on `column`
    pub const fn asc(column: &'static str) -> Self {
        Self {
            column,
            descending: false,
        }
    }
}

/// Row window `[offset, offset + limit)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    /// First row
    pub offset: usize,
    /// Maximum number of rows
    pub limit: usize,
}

impl Range {
    /// Window for zero-based page `page` of `size` rows
    pub const fn page(page: usize, size: usize) -> Self {
        Self {
            offset: page * size,
            limit: size,
        }
    }

    /// Last row index covered, inclusive
    pub const fn end_inclusive(&self) -> usize {
        (self.offset + self.limit).saturating_sub(1)
    }
}

/// A many-to-one embed: `alias` receives the `relation` row whose `id`
/// equals this row's `foreign_key`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Embed {
    /// Field name the embedded row appears under
    pub alias: &'static str,
    /// Relation to pull from
    pub relation: Relation,
    /// Column on the outer row pointing at `relation.id`
    pub foreign_key: &'static str,
}

/// A read request
#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    /// Relation to read
    pub relation: Relation,
    /// Row predicates, all of which must hold
    pub filters: Vec<Filter>,
    /// Embedded relations
    pub embeds: Vec<Embed>,
    /// Sort key
    pub order: Option<Order>,
    /// Row window
    pub range: Option<Range>,
}

impl Select {
    /// Read every row of `relation`
    pub const fn from(relation: Relation) -> Self {
        Self {
            relation,
            filters: Vec::new(),
            embeds: Vec::new(),
            order: None,
            range: None,
        }
    }

    /// Add a predicate
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Embed a related row
    pub fn embed(mut self, alias: &'static str, relation: Relation, foreign_key: &'static str) -> Self {
        self.embeds.push(Embed {
            alias,
            relation,
            foreign_key,
        });
        self
    }

    /// Set the sort key
    pub const fn order(mut self, order: Order) -> Self {
        self.order = Some(order);
        self
    }

    /// Set the row window
    pub const fn range(mut self, range: Range) -> Self {
        self.range = Some(range);
        self
    }
}

/// Failure talking to a data source
#[derive(Debug, Error)]
pub enum StoreError {
    /// Network or transport failure
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered with an error status
    #[error("{relation} request rejected ({status}): {message}")]
    Rejected {
        /// Relation the request targeted
        relation: Relation,
        /// HTTP status
        status: u16,
        /// Backend message
        message: String,
    },

    /// A unique key already exists
    #[error("duplicate key in {relation}: {key}")]
    Conflict {
        /// Relation the insert targeted
        relation: Relation,
        /// Offending key, rendered
        key: String,
    },

    /// A row could not be decoded into its model
    #[error("malformed {relation} row: {source}")]
    Decode {
        /// Relation the row came from
        relation: Relation,
        /// Underlying serde error
        #[source]
        source: serde_json::Error,
    },

    /// The source is unreachable
    #[error("{0} unavailable")]
    Unavailable(String),
}

/// Decode rows into a model, tagging failures with the relation
pub fn decode_rows<T>(relation: Relation, rows: Vec<Value>) -> Result<Vec<T>, StoreError>
where
    T: serde::de::DeserializeOwned,
{
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(|source| StoreError::Decode { relation, source }))
        .collect()
}

/// Serialize a model into a row
pub fn encode_row<T: serde::Serialize>(relation: Relation, value: &T) -> Result<Value, StoreError> {
    serde_json::to_value(value).map_err(|source| StoreError::Decode { relation, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_window_is_inclusive_of_last_row() {
        let range = Range::page(2, 10);
        assert_eq!(range.offset, 20);
        assert_eq!(range.end_inclusive(), 29);
    }

    #[test]
    fn builder_collects_clauses() {
        let select = Select::from(Relation::Posts)
            .filter(Filter::eq("user_id", "u1"))
            .embed("author", Relation::Users, "user_id")
            .order(Order::desc("created_at"))
            .range(Range::page(0, 10));

        assert_eq!(select.filters.len(), 1);
        assert_eq!(select.embeds[0].relation, Relation::Users);
        assert_eq!(select.order, Some(Order::desc("created_at")));
    }
}
