//! In-process data source
//!
//! Holds every relation as a list of JSON rows and evaluates the same query
//! vocabulary the REST client sends. Backs demo mode; also records each call
//! and can fail a chosen call, which the tests rely on.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use super::DataSource;
use super::query::{Filter, Order, Relation, Select, StoreError};

/// Which verb a call used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    /// Read
    Select,
    /// Create
    Insert,
    /// Patch
    Update,
    /// Remove
    Delete,
}

/// A recorded call
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    /// Verb used
    pub verb: Verb,
    /// Relation targeted
    pub relation: Relation,
    /// Predicates sent with the call
    pub filters: Vec<Filter>,
    /// Rows sent (inserts) or returned (everything else)
    pub rows: usize,
}

#[derive(Default)]
struct Inner {
    tables: BTreeMap<Relation, Vec<Value>>,
    calls: Vec<Call>,
    failures: Vec<(Verb, Relation)>,
}

/// In-memory relations
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Load rows directly, bypassing the call log and key checks
    pub fn seed<T: Serialize>(&self, relation: Relation, items: &[T]) -> Result<(), StoreError> {
        let rows = items
            .iter()
            .map(|item| super::query::encode_row(relation, item))
            .collect::<Result<Vec<_>, _>>()?;
        self.lock().tables.entry(relation).or_default().extend(rows);
        Ok(())
    }

    /// Snapshot of a relation
    pub fn rows(&self, relation: Relation) -> Vec<Value> {
        self.lock().tables.get(&relation).cloned().unwrap_or_default()
    }

    /// Make the next `verb` call against `relation` fail
    pub fn fail_next(&self, verb: Verb, relation: Relation) {
        self.lock().failures.push((verb, relation));
    }

    /// Every call issued so far
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Number of `verb` calls issued against `relation`
    pub fn count(&self, verb: Verb, relation: Relation) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.verb == verb && c.relation == relation)
            .count()
    }

    /// Forget recorded calls
    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    fn record(inner: &mut Inner, verb: Verb, relation: Relation, filters: &[Filter], rows: usize) -> Result<(), StoreError> {
        inner.calls.push(Call {
            verb,
            relation,
            filters: filters.to_vec(),
            rows,
        });

        if let Some(pos) = inner
            .failures
            .iter()
            .position(|(v, r)| *v == verb && *r == relation)
        {
            inner.failures.remove(pos);
            return Err(StoreError::Unavailable(format!("{relation} ({verb:?})")));
        }
        Ok(())
    }
}

impl DataSource for MemoryStore {
    async fn select(&self, query: &Select) -> Result<Vec<Value>, StoreError> {
        let mut inner = self.lock();
        Self::record(&mut inner, Verb::Select, query.relation, &query.filters, 0)?;

        let mut rows: Vec<Value> = inner
            .tables
            .get(&query.relation)
            .map(|rows| {
                rows.iter()
                    .filter(|row| matches_all(row, &query.filters))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        for embed in &query.embeds {
            let related = inner.tables.get(&embed.relation);
            for row in &mut rows {
                let target = row.get(embed.foreign_key).cloned().unwrap_or(Value::Null);
                let found = related
                    .and_then(|r| r.iter().find(|c| !target.is_null() && c.get("id") == Some(&target)))
                    .cloned()
                    .unwrap_or(Value::Null);
                if let Value::Object(map) = row {
                    map.insert(embed.alias.to_string(), found);
                }
            }
        }

        if let Some(order) = query.order {
            sort_rows(&mut rows, order);
        }

        if let Some(range) = query.range {
            rows = rows.into_iter().skip(range.offset).take(range.limit).collect();
        }

        if let Some(call) = inner.calls.last_mut() {
            call.rows = rows.len();
        }
        Ok(rows)
    }

    async fn insert(&self, relation: Relation, rows: Vec<Value>) -> Result<Vec<Value>, StoreError> {
        let mut inner = self.lock();
        Self::record(&mut inner, Verb::Insert, relation, &[], rows.len())?;

        let now = Value::String(Utc::now().to_rfc3339());
        let mut prepared = Vec::with_capacity(rows.len());
        for row in rows {
            let Value::Object(mut map) = row else {
                return Err(StoreError::Rejected {
                    relation,
                    status: 400,
                    message: "row must be an object".to_string(),
                });
            };
            if relation.has_generated_id() && !map.contains_key("id") {
                map.insert("id".to_string(), Value::String(Uuid::new_v4().to_string()));
            }
            map.entry("created_at").or_insert_with(|| now.clone());
            prepared.push(Value::Object(map));
        }

        let table = inner.tables.entry(relation).or_default();
        for (i, row) in prepared.iter().enumerate() {
            let clashes = |other: &Value| {
                same_key(row, other, relation.unique_key())
                    || (relation.has_generated_id() && same_key(row, other, &["id"]))
            };
            if table.iter().any(clashes) || prepared[..i].iter().any(clashes) {
                return Err(StoreError::Conflict {
                    relation,
                    key: render_key(row, relation.unique_key()),
                });
            }
        }

        table.extend(prepared.iter().cloned());
        Ok(prepared)
    }

    async fn update(
        &self,
        relation: Relation,
        patch: Value,
        filters: &[Filter],
    ) -> Result<Vec<Value>, StoreError> {
        let mut inner = self.lock();
        Self::record(&mut inner, Verb::Update, relation, filters, 0)?;

        let Value::Object(patch) = patch else {
            return Err(StoreError::Rejected {
                relation,
                status: 400,
                message: "patch must be an object".to_string(),
            });
        };

        let mut affected = Vec::new();
        if let Some(table) = inner.tables.get_mut(&relation) {
            for row in table.iter_mut().filter(|row| matches_all(row, filters)) {
                if let Value::Object(map) = row {
                    merge(map, &patch);
                }
                affected.push(row.clone());
            }
        }

        if let Some(call) = inner.calls.last_mut() {
            call.rows = affected.len();
        }
        Ok(affected)
    }

    async fn delete(&self, relation: Relation, filters: &[Filter]) -> Result<(), StoreError> {
        let mut inner = self.lock();
        Self::record(&mut inner, Verb::Delete, relation, filters, 0)?;

        let mut removed = 0;
        if let Some(table) = inner.tables.get_mut(&relation) {
            let before = table.len();
            table.retain(|row| !matches_all(row, filters));
            removed = before - table.len();
        }

        if let Some(call) = inner.calls.last_mut() {
            call.rows = removed;
        }
        Ok(())
    }
}

// ==================== Evaluation ====================

fn matches_all(row: &Value, filters: &[Filter]) -> bool {
    filters.iter().all(|f| matches(row, f))
}

fn matches(row: &Value, filter: &Filter) -> bool {
    let value = row.get(filter.column()).unwrap_or(&Value::Null);
    match filter {
        Filter::Eq(_, expected) => value == expected,
        Filter::Neq(_, expected) => !value.is_null() && value != expected,
        Filter::In(_, options) => options.contains(value),
        Filter::ILike(_, pattern) => value
            .as_str()
            .is_some_and(|s| glob_match(&pattern.to_lowercase(), &s.to_lowercase())),
        Filter::IsNull(_) => value.is_null(),
    }
}

/// `*` matches any run of characters
fn glob_match(pattern: &str, text: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == text;
    }

    let mut rest = text;
    let last = parts.len() - 1;
    for (i, part) in parts.iter().enumerate() {
        if i == 0 {
            let Some(stripped) = rest.strip_prefix(part) else {
                return false;
            };
            rest = stripped;
        } else if i == last {
            return rest.ends_with(part);
        } else if let Some(pos) = rest.find(part) {
            rest = &rest[pos + part.len()..];
        } else {
            return false;
        }
    }
    true
}

fn sort_rows(rows: &mut [Value], order: Order) {
    rows.sort_by(|a, b| {
        let left = a.get(order.column).unwrap_or(&Value::Null);
        let right = b.get(order.column).unwrap_or(&Value::Null);
        let ord = compare_values(left, right);
        if order.descending { ord.reverse() } else { ord }
    });
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => {
            match (x.parse::<DateTime<Utc>>(), y.parse::<DateTime<Utc>>()) {
                (Ok(dx), Ok(dy)) => dx.cmp(&dy),
                _ => x.cmp(y),
            }
        }
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

fn same_key(a: &Value, b: &Value, columns: &[&str]) -> bool {
    columns
        .iter()
        .all(|c| a.get(*c).is_some_and(|v| !v.is_null() && Some(v) == b.get(*c)))
}

fn render_key(row: &Value, columns: &[&str]) -> String {
    columns
        .iter()
        .map(|c| format!("{c}={}", row.get(*c).unwrap_or(&Value::Null)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn merge(target: &mut Map<String, Value>, patch: &Map<String, Value>) {
    for (k, v) in patch {
        target.insert(k.clone(), v.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::query::Range;
    use serde_json::json;

    #[tokio::test]
    async fn select_orders_by_timestamp_not_text() {
        let store = MemoryStore::new();
        store
            .seed(
                Relation::Posts,
                &[
                    json!({ "id": "a", "created_at": "2026-01-01T00:00:00Z" }),
                    json!({ "id": "b", "created_at": "2026-01-01T00:00:00.500Z" }),
                ],
            )
            .unwrap();

        let rows = store
            .select(&Select::from(Relation::Posts).order(Order::desc("created_at")))
            .await
            .unwrap();
        assert_eq!(rows[0]["id"], "b");
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_edge() {
        let store = MemoryStore::new();
        let like = json!({ "user_id": "u1", "post_id": "p1" });

        store.insert(Relation::Likes, vec![like.clone()]).await.unwrap();
        let err = store.insert(Relation::Likes, vec![like]).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
        assert_eq!(store.rows(Relation::Likes).len(), 1);
    }

    #[tokio::test]
    async fn embed_resolves_or_nulls() {
        let store = MemoryStore::new();
        store
            .seed(Relation::Posts, &[json!({ "id": "p1" })])
            .unwrap();
        store
            .seed(
                Relation::Saves,
                &[
                    json!({ "post_id": "p1", "collection_id": "c" }),
                    json!({ "post_id": "gone", "collection_id": "c" }),
                ],
            )
            .unwrap();

        let rows = store
            .select(&Select::from(Relation::Saves).embed("post", Relation::Posts, "post_id"))
            .await
            .unwrap();
        assert_eq!(rows[0]["post"]["id"], "p1");
        assert!(rows[1]["post"].is_null());
    }

    #[tokio::test]
    async fn injected_failure_fires_once_and_is_logged() {
        let store = MemoryStore::new();
        store.fail_next(Verb::Select, Relation::Users);

        let query = Select::from(Relation::Users).range(Range::page(0, 10));
        assert!(store.select(&query).await.is_err());
        assert!(store.select(&query).await.is_ok());
        assert_eq!(store.count(Verb::Select, Relation::Users), 2);
    }

    #[test]
    fn glob_handles_inner_wildcards() {
        assert!(glob_match("*ra*", "mira"));
        assert!(glob_match("m*a", "mira"));
        assert!(!glob_match("m*x", "mira"));
        assert!(glob_match("mira", "mira"));
    }

    #[tokio::test]
    async fn update_and_delete_touch_only_matching_rows() {
        let store = MemoryStore::new();
        store
            .seed(
                Relation::Collections,
                &[json!({ "id": "c1", "name": "A" }), json!({ "id": "c2", "name": "B" })],
            )
            .unwrap();

        let updated = store
            .update(Relation::Collections, json!({ "name": "Z" }), &[Filter::eq("id", "c1")])
            .await
            .unwrap();
        assert_eq!(updated.len(), 1);

        store
            .delete(Relation::Collections, &[Filter::eq("id", "c2")])
            .await
            .unwrap();
        let rows = store.rows(Relation::Collections);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["name"], "Z");
    }
}
