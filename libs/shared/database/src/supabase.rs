use reqwest::{
    Client,
    header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, AUTHORIZATION},
    Method,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};

use shared_config::AppConfig;

use crate::error::DbError;

/// PostgREST client for the relational store.
///
/// Every call authenticates with the service key: row access rules live in
/// the API layer, not in the store.
#[derive(Clone)]
pub struct SupabaseClient {
    client: Client,
    base_url: String,
    service_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.database_url.trim_end_matches('/').to_string(),
            service_key: config.database_service_key.clone(),
        }
    }

    fn get_headers(&self) -> Result<HeaderMap, DbError> {
        let mut headers = HeaderMap::new();

        let key = HeaderValue::from_str(&self.service_key)
            .map_err(|e| DbError::InvalidHeader(e.to_string()))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.service_key))
            .map_err(|e| DbError::InvalidHeader(e.to_string()))?;

        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        Ok(headers)
    }

    fn representation() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("prefer"),
            HeaderValue::from_static("return=representation"),
        );
        headers
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
    ) -> Result<reqwest::Response, DbError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let mut headers = self.get_headers()?;
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let mut req = self.client.request(method, &url).headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("Store error ({}): {}", status, error_text);
            return Err(DbError::from_response(status.as_u16(), &error_text));
        }

        Ok(response)
    }

    pub async fn request<T>(&self, method: Method, path: &str, body: Option<Value>) -> Result<T, DbError>
    where T: DeserializeOwned {
        self.request_with_headers(method, path, body, None).await
    }

    pub async fn request_with_headers<T>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
    ) -> Result<T, DbError>
    where T: DeserializeOwned {
        let response = self.send(method, path, body, extra_headers).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Fires a request whose response body is irrelevant.
    pub async fn execute(&self, method: Method, path: &str, body: Option<Value>) -> Result<(), DbError> {
        self.send(method, path, body, None).await?;
        Ok(())
    }

    pub async fn select<T>(&self, path: &str) -> Result<Vec<T>, DbError>
    where T: DeserializeOwned {
        self.request(Method::GET, path, None).await
    }

    pub async fn select_one<T>(&self, path: &str) -> Result<Option<T>, DbError>
    where T: DeserializeOwned {
        let rows: Vec<T> = self.select(path).await?;
        Ok(rows.into_iter().next())
    }

    pub async fn insert<T>(&self, table: &str, body: Value) -> Result<T, DbError>
    where T: DeserializeOwned {
        let path = format!("/rest/v1/{}", table);
        let rows: Vec<T> = self
            .request_with_headers(Method::POST, &path, Some(body), Some(Self::representation()))
            .await?;

        rows.into_iter()
            .next()
            .ok_or_else(|| DbError::Api { status: 201, message: format!("Insert into {} returned no rows", table) })
    }

    pub async fn insert_many<T>(&self, table: &str, rows: Vec<Value>) -> Result<Vec<T>, DbError>
    where T: DeserializeOwned {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let path = format!("/rest/v1/{}", table);
        self.request_with_headers(Method::POST, &path, Some(Value::Array(rows)), Some(Self::representation()))
            .await
    }

    /// Inserts or merges on the given unique column.
    pub async fn upsert<T>(&self, table: &str, on_conflict: &str, body: Value) -> Result<T, DbError>
    where T: DeserializeOwned {
        let path = format!("/rest/v1/{}?on_conflict={}", table, on_conflict);
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("prefer"),
            HeaderValue::from_static("resolution=merge-duplicates,return=representation"),
        );

        let rows: Vec<T> = self
            .request_with_headers(Method::POST, &path, Some(body), Some(headers))
            .await?;

        rows.into_iter()
            .next()
            .ok_or_else(|| DbError::Api { status: 201, message: format!("Upsert into {} returned no rows", table) })
    }

    pub async fn update<T>(&self, table: &str, filter: &str, body: Value) -> Result<Vec<T>, DbError>
    where T: DeserializeOwned {
        let path = format!("/rest/v1/{}?{}", table, filter);
        self.request_with_headers(Method::PATCH, &path, Some(body), Some(Self::representation()))
            .await
    }

    pub async fn delete(&self, table: &str, filter: &str) -> Result<(), DbError> {
        let path = format!("/rest/v1/{}?{}", table, filter);
        self.execute(Method::DELETE, &path, None).await
    }

    /// Exact row count for `filter` using the `Content-Range` header.
    pub async fn count(&self, table: &str, filter: &str) -> Result<u64, DbError> {
        let path = if filter.is_empty() {
            format!("/rest/v1/{}?select=id", table)
        } else {
            format!("/rest/v1/{}?select=id&{}", table, filter)
        };

        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static("prefer"), HeaderValue::from_static("count=exact"));
        headers.insert(HeaderName::from_static("range-unit"), HeaderValue::from_static("items"));
        headers.insert(HeaderName::from_static("range"), HeaderValue::from_static("0-0"));

        let response = self.send(Method::GET, &path, None, Some(headers)).await?;

        let range = response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        parse_content_range(&range).ok_or_else(|| DbError::Api {
            status: response.status().as_u16(),
            message: format!("Missing or invalid Content-Range header: '{}'", range),
        })
    }

    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }
}

/// Parses the total out of `0-0/42` or `*/0`.
pub fn parse_content_range(value: &str) -> Option<u64> {
    let (_, total) = value.split_once('/')?;
    total.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_content_range_totals() {
        assert_eq!(parse_content_range("0-0/42"), Some(42));
        assert_eq!(parse_content_range("*/0"), Some(0));
        assert_eq!(parse_content_range("0-24/*"), None);
        assert_eq!(parse_content_range(""), None);
    }
}
