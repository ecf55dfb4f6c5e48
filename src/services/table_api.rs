use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Request, RequestBuilder, Response};
use serde_json::Value;
use thiserror::Error;

use crate::core::config::Settings;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub(crate) enum TableApiError {
    #[error("table API is not configured (missing {0})")]
    NotConfigured(&'static str),
    #[error("table API request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("table API returned {status} for {table}: {message}")]
    Status { table: String, status: u16, message: String },
    #[error("table API returned an unexpected body for {table}: {source}")]
    Decode {
        table: String,
        #[source]
        source: serde_json::Error,
    },
}

/// One PostgREST row filter, rendered as `column=<op>.<value>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Filter<'a> {
    column: &'a str,
    condition: Condition<'a>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Condition<'a> {
    Eq(&'a str),
    NotNull,
}

impl<'a> Filter<'a> {
    pub(crate) fn eq(column: &'a str, value: &'a str) -> Self {
        Self { column, condition: Condition::Eq(value) }
    }

    /// Matches every row with a value in `column`; PostgREST refuses
    /// unfiltered deletes.
    pub(crate) fn not_null(column: &'a str) -> Self {
        Self { column, condition: Condition::NotNull }
    }

    /// Whether `row` satisfies the filter, for in-process stores.
    #[cfg(test)]
    pub(crate) fn matches(&self, row: &Value) -> bool {
        let cell = row.get(self.column);
        match self.condition {
            Condition::Eq(value) => cell.and_then(Value::as_str) == Some(value),
            Condition::NotNull => cell.is_some_and(|cell| !cell.is_null()),
        }
    }

    fn query_pair(&self) -> (String, String) {
        let condition = match self.condition {
            Condition::Eq(value) => format!("eq.{value}"),
            Condition::NotNull => "not.is.null".to_string(),
        };
        (self.column.to_string(), condition)
    }
}

/// Row-level access to named tables. The seeder is written against this so
/// its batching and reconciliation run without a live store.
#[async_trait]
pub(crate) trait TableStore: Send + Sync {
    async fn select(
        &self,
        table: &str,
        filter: Option<Filter<'_>>,
    ) -> Result<Vec<Value>, TableApiError>;

    /// Bulk insert; returns the rows the store accepted.
    async fn insert(&self, table: &str, rows: Vec<Value>) -> Result<Vec<Value>, TableApiError>;

    async fn update(
        &self,
        table: &str,
        filter: Filter<'_>,
        patch: Value,
    ) -> Result<Vec<Value>, TableApiError>;

    async fn delete(&self, table: &str, filter: Filter<'_>) -> Result<(), TableApiError>;
}

/// Client for the hosted store's REST interface over named tables
/// (`/rest/v1/{table}`).
#[derive(Debug, Clone)]
pub(crate) struct TableApiClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl TableApiClient {
    pub(crate) fn from_settings(settings: &Settings) -> Result<Self, TableApiError> {
        let config = settings.table_api();
        if config.base_url.trim().is_empty() {
            return Err(TableApiError::NotConfigured("SUPABASE_URL"));
        }
        if config.api_key.trim().is_empty() {
            return Err(TableApiError::NotConfigured("SUPABASE_SERVICE_ROLE_KEY"));
        }

        Self::new(&config.base_url, &config.api_key, Duration::from_secs(config.timeout_seconds))
    }

    pub(crate) fn new(
        base_url: &str,
        api_key: &str,
        timeout: Duration,
    ) -> Result<Self, TableApiError> {
        let client = Client::builder().connect_timeout(CONNECT_TIMEOUT).timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            api_key: api_key.trim().to_string(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request.header("apikey", &self.api_key).bearer_auth(&self.api_key)
    }

    /// `GET ?select=*`, optionally narrowed by one filter.
    pub(crate) fn build_select(
        &self,
        table: &str,
        filter: Option<Filter<'_>>,
    ) -> Result<Request, TableApiError> {
        let mut query = vec![("select".to_string(), "*".to_string())];
        query.extend(filter.map(|filter| filter.query_pair()));

        Ok(self.authorize(self.client.get(self.table_url(table))).query(&query).build()?)
    }

    pub(crate) fn build_insert(&self, table: &str, rows: &[Value]) -> Result<Request, TableApiError> {
        Ok(self
            .authorize(self.client.post(self.table_url(table)))
            .header("Prefer", "return=representation")
            .json(rows)
            .build()?)
    }

    pub(crate) fn build_update(
        &self,
        table: &str,
        filter: Filter<'_>,
        patch: &Value,
    ) -> Result<Request, TableApiError> {
        Ok(self
            .authorize(self.client.patch(self.table_url(table)))
            .query(&[filter.query_pair()])
            .header("Prefer", "return=representation")
            .json(patch)
            .build()?)
    }

    pub(crate) fn build_delete(
        &self,
        table: &str,
        filter: Filter<'_>,
    ) -> Result<Request, TableApiError> {
        Ok(self
            .authorize(self.client.delete(self.table_url(table)))
            .query(&[filter.query_pair()])
            .build()?)
    }
}

#[async_trait]
impl TableStore for TableApiClient {
    async fn select(
        &self,
        table: &str,
        filter: Option<Filter<'_>>,
    ) -> Result<Vec<Value>, TableApiError> {
        let response = self.client.execute(self.build_select(table, filter)?).await?;
        decode(table, response).await
    }

    async fn insert(&self, table: &str, rows: Vec<Value>) -> Result<Vec<Value>, TableApiError> {
        let response = self.client.execute(self.build_insert(table, &rows)?).await?;
        decode(table, response).await
    }

    async fn update(
        &self,
        table: &str,
        filter: Filter<'_>,
        patch: Value,
    ) -> Result<Vec<Value>, TableApiError> {
        let response = self.client.execute(self.build_update(table, filter, &patch)?).await?;
        decode(table, response).await
    }

    async fn delete(&self, table: &str, filter: Filter<'_>) -> Result<(), TableApiError> {
        let response = self.client.execute(self.build_delete(table, filter)?).await?;
        ensure_success(table, response).await?;
        Ok(())
    }
}

async fn ensure_success(table: &str, response: Response) -> Result<Response, TableApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(TableApiError::Status {
        table: table.to_string(),
        status: status.as_u16(),
        message: error_message(&body),
    })
}

async fn decode(table: &str, response: Response) -> Result<Vec<Value>, TableApiError> {
    let body = ensure_success(table, response).await?.text().await?;
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(&body)
        .map_err(|source| TableApiError::Decode { table: table.to_string(), source })
}

/// PostgREST errors carry `message` (and often `details`); anything else is
/// passed through verbatim.
fn error_message(body: &str) -> String {
    let Ok(parsed) = serde_json::from_str::<Value>(body) else {
        return body.trim().to_string();
    };
    let message = parsed.get("message").and_then(Value::as_str);
    let details = parsed.get("details").and_then(Value::as_str);
    match (message, details) {
        (Some(message), Some(details)) => format!("{message} ({details})"),
        (Some(message), None) => message.to_string(),
        _ => body.trim().to_string(),
    }
}
