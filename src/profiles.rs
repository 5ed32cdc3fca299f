//! Profile lookups

use uuid::Uuid;

use crate::api::query::decode_rows;
use crate::api::{DataSource, Filter, Range, Relation, Select};
use crate::error::{Error, Result};
use crate::models::{Actor, validate_handle};

async fn first<S: DataSource>(source: &S, filter: Filter) -> Result<Option<Actor>> {
    let query = Select::from(Relation::Users)
        .filter(filter)
        .range(Range { offset: 0, limit: 1 });
    let rows: Vec<Actor> = decode_rows(Relation::Users, source.select(&query).await?)?;
    Ok(rows.into_iter().next())
}

/// Fetch a profile by id
pub async fn get_actor<S: DataSource>(source: &S, id: Uuid) -> Result<Actor> {
    first(source, Filter::id("id", id))
        .await?
        .ok_or_else(|| Error::not_found("actor", id))
}

/// Fetch a profile by handle; a leading `@` is ignored
pub async fn find_by_handle<S: DataSource>(source: &S, handle: &str) -> Result<Actor> {
    let handle = handle.trim().trim_start_matches('@');
    validate_handle(handle)?;

    tracing::debug!("looking up @{handle}");
    first(source, Filter::eq("handle", handle))
        .await?
        .ok_or_else(|| Error::not_found("actor", format!("@{handle}")))
}
