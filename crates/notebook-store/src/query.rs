//! Authenticated HTTP access to the remote API with page following.
//!
//! List endpoints of the remote host return one page per response and
//! announce the next one through the `X-Next-Page` header. [`QueryClient::query`]
//! follows that cursor until it is absent or empty and returns every item in
//! page order.

use std::collections::BTreeMap;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::multipart::Form;
use reqwest::{Method, Response};
use serde::de::DeserializeOwned;

use crate::error::{StoreError, StoreResult};

/// Path prefix of the versioned REST API.
pub const API_PREFIX: &str = "api/v4";

/// Response header carrying the continuation cursor.
pub const NEXT_PAGE_HEADER: &str = "x-next-page";

/// Request header carrying the access token.
pub const TOKEN_HEADER: &str = "private-token";

/// Query parameter the continuation cursor is written to.
pub const PAGE_PARAM: &str = "page";

/// Per-call request settings merged with the client's defaults.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// HTTP method (GET by default).
    pub method: Method,
    /// Form fields, sent as `multipart/form-data` when present.
    pub data: Option<BTreeMap<String, String>>,
}

impl RequestOptions {
    /// A request with the given method and no body.
    pub fn new(method: Method) -> Self {
        Self { method, data: None }
    }

    /// A request with the given method and form body.
    pub fn form<K, V>(method: Method, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            method,
            data: Some(
                fields
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }
}

/// HTTP client bound to one installation of the remote API.
#[derive(Debug, Clone)]
pub struct QueryClient {
    http: reqwest::Client,
    base_url: String,
}

impl QueryClient {
    /// Build a client for `base_url`, sending `token` with every request.
    pub fn new(base_url: &str, token: Option<&str>) -> StoreResult<Self> {
        let mut builder = reqwest::Client::builder();

        if let Some(token) = token {
            let mut headers = HeaderMap::new();
            let value = HeaderValue::from_str(token).map_err(|e| StoreError::InvalidOption {
                name: "token".to_string(),
                reason: e.to_string(),
            })?;
            headers.insert(HeaderName::from_static(TOKEN_HEADER), value);
            builder = builder.default_headers(headers);
        }

        Ok(Self::with_client(builder.build()?, base_url))
    }

    /// Wrap an already configured `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Base URL of the installation, without trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL of an API action such as `projects/1/repository/tree`.
    pub fn endpoint(&self, action: &str) -> String {
        format!("{}/{}/{}", self.base_url, API_PREFIX, action)
    }

    /// Perform one request and reject non-success statuses.
    pub async fn fetch(&self, action: &str, options: &RequestOptions) -> StoreResult<Response> {
        let url = self.endpoint(action);
        let mut request = self.http.request(options.method.clone(), &url);

        if let Some(data) = &options.data {
            let form = data
                .iter()
                .fold(Form::new(), |form, (key, value)| {
                    form.text(key.clone(), value.clone())
                });
            request = request.multipart(form);
        }

        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(
                method = %options.method,
                action,
                status = status.as_u16(),
                "Remote API rejected request"
            );
            Err(StoreError::Http {
                status: status.as_u16(),
                body,
            })
        }
    }

    /// Fetch a single JSON object.
    pub async fn get<T: DeserializeOwned>(&self, action: &str) -> StoreResult<T> {
        let response = self.fetch(action, &RequestOptions::default()).await?;
        Ok(response.json::<T>().await?)
    }

    /// Fetch a JSON list, following continuation pages until exhausted.
    ///
    /// Items are returned in page order. The same `options` are sent with
    /// every page.
    pub async fn query<T: DeserializeOwned>(
        &self,
        action: &str,
        options: &RequestOptions,
    ) -> StoreResult<Vec<T>> {
        let mut action = action.to_string();
        let mut accumulated = Vec::new();
        let mut pages = 0usize;

        loop {
            let response = self.fetch(&action, options).await?;
            let next_page = next_page(response.headers());
            let page: Vec<T> = response.json().await?;

            pages += 1;
            accumulated.extend(page);

            match next_page {
                Some(cursor) => action = merge_query(&action, &[(PAGE_PARAM, cursor.as_str())]),
                None => break,
            }
        }

        tracing::trace!(action = %action, pages, items = accumulated.len(), "Query complete");
        Ok(accumulated)
    }
}

/// Continuation cursor of a response, if one is announced.
fn next_page(headers: &HeaderMap) -> Option<String> {
    headers
        .get(NEXT_PAGE_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Merge `params` into the query string of `action`.
///
/// Existing parameters are decoded and kept in place; a parameter also
/// present in `params` takes the new value. Remaining new parameters are
/// appended. Keys and values are percent-encoded on output.
pub fn merge_query(action: &str, params: &[(&str, &str)]) -> String {
    let (path, query) = action.split_once('?').unwrap_or((action, ""));

    let mut merged: Vec<(String, String)> = query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode(key), decode(value))
        })
        .collect();

    for (key, value) in params {
        match merged.iter_mut().find(|(existing, _)| existing == key) {
            Some(entry) => entry.1 = value.to_string(),
            None => merged.push((key.to_string(), value.to_string())),
        }
    }

    if merged.is_empty() {
        return path.to_string();
    }

    let query = merged
        .iter()
        .map(|(key, value)| format!("{}={}", urlencoding::encode(key), urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&");

    format!("{path}?{query}")
}

fn decode(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

// ============================================================================
// Tests
// ============================================================================
