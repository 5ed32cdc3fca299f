//! PostgREST client for the hosted backend

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;

use super::DataSource;
use super::query::{Filter, Relation, Select, StoreError};

/// REST client speaking the PostgREST dialect under `/rest/v1`
pub struct RestClient {
    client: Client,
    base_url: String,
    api_key: String,
    access_token: Option<String>,
}

impl RestClient {
    /// Create a new client
    ///
    /// `access_token` is the signed-in user's JWT; requests fall back to the
    /// project key when it is absent.
    pub fn new(
        base_url: &str,
        api_key: &str,
        access_token: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            access_token: access_token.map(str::to_string),
        })
    }

    /// Build table URL
    fn table_url(&self, relation: Relation, params: &[(String, String)]) -> String {
        let url = format!("{}/rest/v1/{}", self.base_url, relation.table());
        if params.is_empty() {
            url
        } else {
            format!("{url}?{}", encode_params(params))
        }
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let bearer = self.access_token.as_deref().unwrap_or(&self.api_key);
        request
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {bearer}"))
    }

    async fn send(&self, relation: Relation, request: RequestBuilder) -> Result<Response, StoreError> {
        let response = self.authorized(request).send().await?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        tracing::debug!("{relation} request failed with {status}: {message}");

        if status == 409 {
            Err(StoreError::Conflict {
                relation,
                key: message,
            })
        } else {
            Err(StoreError::Rejected {
                relation,
                status,
                message,
            })
        }
    }
}

impl DataSource for RestClient {
    async fn select(&self, query: &Select) -> Result<Vec<Value>, StoreError> {
        let url = self.table_url(query.relation, &select_params(query));
        tracing::debug!("GET {url}");

        let response = self.send(query.relation, self.client.get(&url)).await?;
        Ok(response.json().await?)
    }

    async fn insert(&self, relation: Relation, rows: Vec<Value>) -> Result<Vec<Value>, StoreError> {
        let url = self.table_url(relation, &[]);
        tracing::debug!("POST {url} ({} rows)", rows.len());

        let request = self
            .client
            .post(&url)
            .header("Prefer", "return=representation")
            .json(&rows);

        let response = self.send(relation, request).await?;
        Ok(response.json().await?)
    }

    async fn update(
        &self,
        relation: Relation,
        patch: Value,
        filters: &[Filter],
    ) -> Result<Vec<Value>, StoreError> {
        let url = self.table_url(relation, &filter_params(filters));
        tracing::debug!("PATCH {url}");

        let request = self
            .client
            .patch(&url)
            .header("Prefer", "return=representation")
            .json(&patch);

        let response = self.send(relation, request).await?;
        Ok(response.json().await?)
    }

    async fn delete(&self, relation: Relation, filters: &[Filter]) -> Result<(), StoreError> {
        let url = self.table_url(relation, &filter_params(filters));
        tracing::debug!("DELETE {url}");

        self.send(relation, self.client.delete(&url)).await?;
        Ok(())
    }
}

// ==================== Query encoding ====================

/// Query-string pairs for a read
pub fn select_params(query: &Select) -> Vec<(String, String)> {
    let mut columns = String::from("*");
    for embed in &query.embeds {
        columns.push_str(&format!(
            ",{}:{}!{}(*)",
            embed.alias,
            embed.relation.table(),
            embed.foreign_key
        ));
    }

    let mut params = vec![("select".to_string(), columns)];
    params.extend(filter_params(&query.filters));

    if let Some(order) = query.order {
        let direction = if order.descending { "desc" } else { "asc" };
        params.push(("order".to_string(), format!("{}.{direction}", order.column)));
    }

    if let Some(range) = query.range {
        params.push(("offset".to_string(), range.offset.to_string()));
        params.push(("limit".to_string(), range.limit.to_string()));
    }

    params
}

/// Query-string pairs for row predicates
pub fn filter_params(filters: &[Filter]) -> Vec<(String, String)> {
    filters
        .iter()
        .map(|filter| {
            let operand = match filter {
                Filter::Eq(_, v) => format!("eq.{}", render_value(v)),
                Filter::Neq(_, v) => format!("neq.{}", render_value(v)),
                Filter::In(_, values) => {
                    let items: Vec<String> = values.iter().map(render_list_item).collect();
                    format!("in.({})", items.join(","))
                }
                Filter::ILike(_, pattern) => format!("ilike.{pattern}"),
                Filter::IsNull(_) => "is.null".to_string(),
            };
            (filter.column().to_string(), operand)
        })
        .collect()
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn render_list_item(value: &Value) -> String {
    let raw = render_value(value);
    // Backslashes first so the quote escapes stay intact
    if raw.contains([',', '(', ')', '"', '\\']) {
        format!("\"{}\"", raw.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        raw
    }
}

fn encode_params(params: &[(String, String)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::query::{Order, Range};
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn feed_query_encodes_embed_order_and_window() {
        let query = Select::from(Relation::Posts)
            .embed("author", Relation::Users, "user_id")
            .order(Order::desc("created_at"))
            .range(Range::page(1, 10));

        let params = select_params(&query);
        assert_eq!(params[0], ("select".to_string(), "*,author:users!user_id(*)".to_string()));
        assert!(params.contains(&("order".to_string(), "created_at.desc".to_string())));
        assert!(params.contains(&("offset".to_string(), "10".to_string())));
        assert!(params.contains(&("limit".to_string(), "10".to_string())));
    }

    #[test]
    fn membership_filter_quotes_reserved_characters() {
        let a = Uuid::new_v4();
        let params = filter_params(&[
            Filter::ids("user_id", [a]),
            Filter::any_of("name", ["fall, winter"]),
            Filter::IsNull("post_id"),
            Filter::eq("is_default", json!(true)),
        ]);

        assert_eq!(params[0].1, format!("in.({a})"));
        assert_eq!(params[1].1, "in.(\"fall, winter\")");
        assert_eq!(params[2].1, "is.null");
        assert_eq!(params[3].1, "eq.true");
    }

    #[test]
    fn membership_filter_escapes_backslashes_before_quotes() {
        let params = filter_params(&[Filter::any_of("name", [r"a\b", r#"say "hi"\"#])]);
        assert_eq!(params[0].1, r#"in.("a\\b","say \"hi\"\\")"#);
    }

    #[test]
    fn table_url_percent_encodes_operands() {
        let client = RestClient::new(
            "https://project.example.co/",
            "anon",
            None,
            Duration::from_secs(5),
        )
        .unwrap();

        let url = client.table_url(
            Relation::Users,
            &[("handle".to_string(), "ilike.*mi ra*".to_string())],
        );
        assert_eq!(
            url,
            "https://project.example.co/rest/v1/users?handle=ilike.%2Ami%20ra%2A"
        );
    }
}
