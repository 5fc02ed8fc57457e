//! HTTP gateway to the platform REST API
//!
//! Bearer-token client for the data and tooling REST endpoints. Rejections that
//! carry the platform's `[{message, errorCode, fields}]` body are surfaced as
//! `Error::Remote` so duplicate classification keeps working across transports.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Map, Value};
use tracing::debug;
use url::Url;

use super::types::{Identity, QueryResult, RemoteError, ResourceKind, SaveResult};
use super::RemoteResourceGateway;
use crate::errors::{Error, Result};

/// Default REST API version
pub const DEFAULT_API_VERSION: &str = "58.0";

/// HTTP gateway configuration
#[derive(Debug, Clone)]
pub struct HttpGatewayConfig {
    /// Instance base URL (e.g., "https://example.my.salesforce.com")
    pub instance_url: String,

    /// OAuth access token used as bearer credential
    pub access_token: String,

    /// REST API version without the leading "v"
    pub api_version: String,

    /// Request timeout in seconds
    pub timeout: u64,

    /// Enable verbose request/response logging
    pub verbose: bool,
}

impl HttpGatewayConfig {
    pub fn new<U: Into<String>, T: Into<String>>(instance_url: U, access_token: T) -> Self {
        Self {
            instance_url: instance_url.into(),
            access_token: access_token.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout: 30,
            verbose: false,
        }
    }
}

/// Gateway implementation backed by `reqwest`
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    config: HttpGatewayConfig,
    instance: Url,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    user_id: String,
    preferred_username: String,
}

impl HttpGateway {
    pub fn new(config: HttpGatewayConfig) -> Result<Self> {
        let instance = Url::parse(config.instance_url.trim_end_matches('/')).map_err(|e| {
            Error::config(format!("Invalid instance URL '{}': {}", config.instance_url, e))
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()
            .map_err(|e| Error::transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config, instance })
    }

    /// Get the instance URL
    pub fn instance_url(&self) -> &str {
        self.instance.as_str()
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.instance
            .join(path)
            .map_err(|e| Error::config(format!("Invalid request path '{}': {}", path, e)))
    }

    fn data_url(&self, path: &str) -> Result<Url> {
        self.url(&format!("/services/data/v{}/{}", self.config.api_version, path))
    }

    fn query_url(&self, path: &str, soql: &str) -> Result<Url> {
        let mut url = self.data_url(path)?;
        url.query_pairs_mut().append_pair("q", soql);
        Ok(url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.bearer_auth(&self.config.access_token)
    }

    fn log_body(&self, label: &str, body: &Value) {
        if self.config.verbose {
            let body_json = serde_json::to_string_pretty(body)
                .unwrap_or_else(|_| "<unable to serialize>".to_string());
            debug!("{}:\n{}", label, body_json);
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, operation: &str) -> Result<T> {
        debug!("GET {}", url);
        let response = self.authorized(self.client.get(url)).send().await?;
        self.handle_response(response, operation).await
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        url: Url,
        body: &Value,
        operation: &str,
    ) -> Result<T> {
        debug!("POST {}", url);
        self.log_body("Request body", body);
        let response = self.authorized(self.client.post(url)).json(body).send().await?;
        self.handle_response(response, operation).await
    }

    /// Handle HTTP response, checking status and deserializing JSON
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: Response,
        operation: &str,
    ) -> Result<T> {
        let status = response.status();
        debug!("Response status: {}", status);

        let body = response.text().await?;
        if self.config.verbose {
            debug!("Response body:\n{}", body);
        }

        if !status.is_success() {
            return Err(rejection(operation, status, &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            Error::transport(format!(
                "Failed to deserialize {} response: {}: {}",
                operation, e, body
            ))
        })
    }

    /// Find a tooling component by full name
    async fn tooling_lookup(&self, kind: ResourceKind, identifier: &str) -> Result<Option<Value>> {
        let soql = format!(
            "SELECT Id, FullName, Metadata FROM {} WHERE FullName = '{}'",
            kind,
            soql_escape(identifier)
        );
        let url = self.query_url("tooling/query", &soql)?;
        let result: QueryResult = self.get_json(url, &format!("Read {}", kind)).await?;
        Ok(result.records.into_iter().next())
    }
}

/// Convert an unsuccessful response into a structured error
fn rejection(operation: &str, status: StatusCode, body: &str) -> Error {
    match serde_json::from_str::<Vec<RemoteError>>(body) {
        Ok(errors) if !errors.is_empty() => Error::remote(operation, errors),
        _ => Error::remote(
            operation,
            vec![RemoteError {
                status_code: status.as_u16().to_string(),
                ..RemoteError::from_message(format!("HTTP {}: {}", status, body))
            }],
        ),
    }
}

/// Escape a value for use inside a single-quoted SOQL literal
pub fn soql_escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

#[async_trait]
impl RemoteResourceGateway for HttpGateway {
    async fn metadata_read(&self, kind: ResourceKind, identifier: &str) -> Result<Option<Value>> {
        let Some(record) = self.tooling_lookup(kind, identifier).await? else {
            return Ok(None);
        };

        let mut metadata = match record.get("Metadata") {
            Some(Value::Object(map)) => map.clone(),
            _ => Map::new(),
        };
        if let Some(full_name) = record.get("FullName") {
            metadata.insert("fullName".to_string(), full_name.clone());
        }
        Ok(Some(Value::Object(metadata)))
    }

    async fn metadata_create(&self, kind: ResourceKind, record: Value) -> Result<SaveResult> {
        let mut metadata = match record {
            Value::Object(map) => map,
            other => {
                return Err(Error::internal(format!("{} record must be an object: {}", kind, other)))
            }
        };
        let full_name = metadata.remove("fullName").unwrap_or(Value::Null);
        let body = json!({ "FullName": full_name.clone(), "Metadata": metadata });

        let url = self.data_url(&format!("tooling/sobjects/{}", kind))?;
        let mut result: SaveResult =
            self.post_json(url, &body, &format!("Create {}", kind)).await?;
        if let Value::String(name) = full_name {
            result.full_name = Some(name);
        }
        Ok(result)
    }

    async fn metadata_delete(&self, kind: ResourceKind, identifier: &str) -> Result<SaveResult> {
        let Some(record) = self.tooling_lookup(kind, identifier).await? else {
            return Ok(SaveResult::failed(vec![RemoteError {
                status_code: "NOT_FOUND".to_string(),
                ..RemoteError::from_message(format!("{} {} does not exist", kind, identifier))
            }]));
        };
        let id = record.get("Id").and_then(Value::as_str).ok_or_else(|| {
            Error::internal(format!("{} {} lookup returned no Id", kind, identifier))
        })?;

        let url = self.data_url(&format!("tooling/sobjects/{}/{}", kind, id))?;
        debug!("DELETE {}", url);
        let response = self.authorized(self.client.delete(url)).send().await?;
        let status = response.status();
        debug!("Response status: {}", status);

        if status.is_success() {
            Ok(SaveResult::succeeded(identifier))
        } else {
            let body = response.text().await?;
            Err(rejection(&format!("Delete {}", kind), status, &body))
        }
    }

    async fn query(&self, soql: &str) -> Result<QueryResult> {
        let url = self.query_url("query", soql)?;
        self.get_json(url, "Query").await
    }

    async fn identity(&self) -> Result<Identity> {
        let url = self.url("/services/oauth2/userinfo")?;
        let info: UserInfo = self.get_json(url, "Identity").await?;
        Ok(Identity { user_id: info.user_id, username: info.preferred_username })
    }

    async fn record_create(&self, kind: ResourceKind, fields: Value) -> Result<SaveResult> {
        let url = self.data_url(&format!("sobjects/{}", kind))?;
        self.post_json(url, &fields, &format!("Create {}", kind)).await
    }
}
