//! PostgREST backend.
//!
//! Talks to a Supabase-style REST endpoint:
//! - `POST   /rest/v1/{table}`
//! - `PATCH  /rest/v1/{table}?id=eq.{id}&user_id=eq.{owner}`
//! - `DELETE /rest/v1/{table}?id=eq.{id}&user_id=eq.{owner}`
//! - `GET    /rest/v1/{table}?user_id=eq.{owner}&select=*`

use std::time::Duration;

use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::Value;

use super::{RemoteBackend, RemoteError, RemoteResult};
use crate::model::{CollectionSchema, Record};

/// Postgres unique-violation code.
const UNIQUE_VIOLATION: &str = "23505";

/// Connection settings for a [`RestBackend`].
#[derive(Debug, Clone)]
pub struct RestConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`
    pub url: String,
    /// Public API key sent as `apikey`
    pub api_key: String,
    /// User access token; falls back to the API key for `Authorization`
    pub access_token: Option<String>,
}

/// PostgREST error body.
#[derive(Debug, Deserialize)]
struct PostgrestError {
    code: Option<String>,
    message: Option<String>,
}

/// Remote backend over HTTP.
pub struct RestBackend {
    client: reqwest::Client,
    config: RestConfig,
}

impl RestBackend {
    /// Create a backend for the given project.
    #[must_use]
    pub fn new(config: RestConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn table_url(&self, schema: &CollectionSchema) -> String {
        format!(
            "{}/rest/v1/{}",
            self.config.url.trim_end_matches('/'),
            schema.name
        )
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let bearer = self
            .config
            .access_token
            .as_deref()
            .unwrap_or(&self.config.api_key);

        self.client
            .request(method, url)
            .header("apikey", &self.config.api_key)
            .bearer_auth(bearer)
    }

    fn scoped(
        &self,
        method: Method,
        schema: &CollectionSchema,
        id: &str,
        owner: &str,
    ) -> RequestBuilder {
        self.request(method, &self.table_url(schema))
            .query(&[
                (schema.id_field, format!("eq.{id}")),
                (schema.owner_field, format!("eq.{owner}")),
            ])
            .header("Prefer", "return=representation")
    }

    /// Send and read the body, mapping transport and status failures.
    async fn send(&self, request: RequestBuilder, id: &str) -> RemoteResult<String> {
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;

        if status.is_success() {
            Ok(body)
        } else {
            Err(classify(status, &body, id))
        }
    }

    /// Send a request that returns the affected rows; no rows means not found.
    async fn send_for_rows(&self, request: RequestBuilder, id: &str) -> RemoteResult<()> {
        let body = self.send(request, id).await?;
        let rows = parse_rows(&body)?;
        if rows.is_empty() {
            return Err(RemoteError::NotFound { id: id.to_string() });
        }
        Ok(())
    }
}

fn transport_error(err: reqwest::Error) -> RemoteError {
    RemoteError::Unreachable(err.to_string())
}

/// Map a non-success response to a `RemoteError`.
fn classify(status: StatusCode, body: &str, id: &str) -> RemoteError {
    let parsed: Option<PostgrestError> = serde_json::from_str(body).ok();
    let code = parsed.as_ref().and_then(|p| p.code.as_deref());
    let message = parsed
        .as_ref()
        .and_then(|p| p.message.clone())
        .unwrap_or_else(|| body.to_string());

    if status == StatusCode::CONFLICT || code == Some(UNIQUE_VIOLATION) {
        return RemoteError::Conflict { id: id.to_string() };
    }
    if status.is_server_error() {
        return RemoteError::Server {
            status: status.as_u16(),
            message,
        };
    }
    RemoteError::Rejected {
        status: status.as_u16(),
        message,
    }
}

fn parse_rows(body: &str) -> RemoteResult<Vec<Record>> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    let value: Value =
        serde_json::from_str(body).map_err(|e| RemoteError::Malformed(e.to_string()))?;
    match value {
        Value::Array(rows) => rows
            .into_iter()
            .map(|row| match row {
                Value::Object(map) => Ok(map),
                other => Err(RemoteError::Malformed(format!("expected row object, got {other}"))),
            })
            .collect(),
        other => Err(RemoteError::Malformed(format!("expected row array, got {other}"))),
    }
}

impl RemoteBackend for RestBackend {
    async fn insert(&self, schema: &CollectionSchema, record: &Record) -> RemoteResult<()> {
        let id = schema.record_id(record).unwrap_or_default().to_string();
        let request = self
            .request(Method::POST, &self.table_url(schema))
            .header("Prefer", "return=minimal")
            .json(record);
        self.send(request, &id).await.map(|_| ())
    }

    async fn update(
        &self,
        schema: &CollectionSchema,
        id: &str,
        owner: &str,
        fields: &Record,
    ) -> RemoteResult<()> {
        let request = self.scoped(Method::PATCH, schema, id, owner).json(fields);
        self.send_for_rows(request, id).await
    }

    async fn delete(&self, schema: &CollectionSchema, id: &str, owner: &str) -> RemoteResult<()> {
        let request = self.scoped(Method::DELETE, schema, id, owner);
        self.send_for_rows(request, id).await
    }

    async fn select_all(&self, schema: &CollectionSchema, owner: &str) -> RemoteResult<Vec<Record>> {
        let request = self
            .request(Method::GET, &self.table_url(schema))
            .query(&[
                (schema.owner_field, format!("eq.{owner}")),
                ("select", "*".to_string()),
            ]);
        let body = self.send(request, "").await?;
        parse_rows(&body)
    }

    async fn is_reachable(&self) -> bool {
        let url = format!("{}/rest/v1/", self.config.url.trim_end_matches('/'));
        self.request(Method::GET, &url)
            .timeout(Duration::from_secs(2))
            .send()
            .await
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::record::TASKS;

    fn backend() -> RestBackend {
        RestBackend::new(RestConfig {
            url: "https://example.supabase.co/".into(),
            api_key: "anon".into(),
            access_token: None,
        })
    }

    #[test]
    fn test_table_url_trims_trailing_slash() {
        assert_eq!(
            backend().table_url(&TASKS),
            "https://example.supabase.co/rest/v1/tasks"
        );
    }

    #[test]
    fn test_classify_conflicts() {
        assert_eq!(
            classify(StatusCode::CONFLICT, "", "t1"),
            RemoteError::Conflict { id: "t1".into() }
        );
        let body = r#"{"code":"23505","message":"duplicate key value violates unique constraint"}"#;
        assert_eq!(
            classify(StatusCode::BAD_REQUEST, body, "t1"),
            RemoteError::Conflict { id: "t1".into() }
        );
    }

    #[test]
    fn test_classify_server_and_rejected() {
        let err = classify(StatusCode::SERVICE_UNAVAILABLE, "down", "t1");
        assert!(err.is_transient());

        let body = r#"{"code":"42501","message":"permission denied"}"#;
        assert_eq!(
            classify(StatusCode::FORBIDDEN, body, "t1"),
            RemoteError::Rejected {
                status: 403,
                message: "permission denied".into()
            }
        );
    }

    #[test]
    fn test_parse_rows() {
        assert!(parse_rows("").unwrap().is_empty());
        assert!(parse_rows("[]").unwrap().is_empty());
        assert_eq!(parse_rows(r#"[{"id":"t1"}]"#).unwrap().len(), 1);
        assert!(matches!(parse_rows("{}"), Err(RemoteError::Malformed(_))));
        assert!(matches!(parse_rows("[1]"), Err(RemoteError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transient() {
        let backend = RestBackend::new(RestConfig {
            url: "http://127.0.0.1:9".into(),
            api_key: "anon".into(),
            access_token: None,
        });
        let err = backend.select_all(&TASKS, "u1").await.unwrap_err();
        assert!(err.is_transient());
        assert!(!backend.is_reachable().await);
    }
}
