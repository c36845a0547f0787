//! HTTP Fusion Client
//!
//! One client for every resource category. Paths are derived from
//! [`Scope`] and [`ResourceCategory`] instead of one generated class per
//! resource type.

use super::ClientConfig;
use crate::domain::ports::{
    collection_path, resource_path, InventoryApi, Operation, OperationsApi, ResourceApi,
    ResourceCategory, Scope,
};
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde_json::Value;
use tracing::debug;

/// REST client for a Fusion endpoint
#[derive(Debug, Clone)]
pub struct FusionClient {
    http: reqwest::Client,
    base_url: String,
}

impl FusionClient {
    /// Create a new client
    pub fn new(config: ClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &config.access_token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|e| {
                Error::Configuration(format!("Invalid access token: {}", e))
            })?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, format!("{}{}", self.base_url, path))
    }

    /// Send a request and decode the JSON body. `subject` names what a 404
    /// refers to.
    async fn send(&self, request: RequestBuilder, subject: (&str, &str)) -> Result<Value> {
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        debug!("Fusion responded {} for {}/{}", status, subject.0, subject.1);

        if status == StatusCode::NOT_FOUND {
            return Err(Error::ResourceNotFound {
                kind: subject.0.to_string(),
                name: subject.1.to_string(),
            });
        }

        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
                message: error_message(status, &text),
            });
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    async fn send_operation(
        &self,
        request: RequestBuilder,
        subject: (&str, &str),
    ) -> Result<Operation> {
        let body = self.send(request, subject).await?;
        Ok(serde_json::from_value(body)?)
    }
}

/// Pull a readable message out of an error response
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        let message = value
            .get("message")
            .or_else(|| value.pointer("/error/message"))
            .and_then(Value::as_str);
        if let Some(message) = message {
            return message.to_string();
        }
    }

    if body.trim().is_empty() {
        status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string()
    } else {
        body.trim().to_string()
    }
}

/// Collections come back either wrapped in `items` or as a bare array
fn into_items(body: Value) -> Result<Vec<Value>> {
    match body {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => match map.remove("items") {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(Error::Internal(
                "List response did not contain an items array".into(),
            )),
        },
        Value::Null => Ok(Vec::new()),
        other => Err(Error::Internal(format!(
            "Unexpected list response: {}",
            other
        ))),
    }
}

#[async_trait]
impl ResourceApi for FusionClient {
    async fn get(&self, scope: &Scope, category: ResourceCategory, name: &str) -> Result<Value> {
        let path = resource_path(scope, category, name)?;
        let kind = category.to_string();
        let qualified = scope.qualify(name);
        self.send(self.request(Method::GET, &path), (&kind, &qualified))
            .await
    }

    async fn list(&self, scope: &Scope, category: ResourceCategory) -> Result<Vec<Value>> {
        let path = collection_path(scope, category)?;
        let kind = category.to_string();
        let qualified = scope.qualify("*");
        let body = self
            .send(self.request(Method::GET, &path), (&kind, &qualified))
            .await?;
        into_items(body)
    }

    async fn create(
        &self,
        scope: &Scope,
        category: ResourceCategory,
        body: Value,
    ) -> Result<Operation> {
        let path = collection_path(scope, category)?;
        let kind = category.to_string();
        let name = body
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let qualified = scope.qualify(&name);
        self.send_operation(
            self.request(Method::POST, &path).json(&body),
            (&kind, &qualified),
        )
        .await
    }

    async fn update(
        &self,
        scope: &Scope,
        category: ResourceCategory,
        name: &str,
        patch: Value,
    ) -> Result<Operation> {
        let path = resource_path(scope, category, name)?;
        let kind = category.to_string();
        let qualified = scope.qualify(name);
        self.send_operation(
            self.request(Method::PATCH, &path).json(&patch),
            (&kind, &qualified),
        )
        .await
    }

    async fn delete(
        &self,
        scope: &Scope,
        category: ResourceCategory,
        name: &str,
    ) -> Result<Operation> {
        let path = resource_path(scope, category, name)?;
        let kind = category.to_string();
        let qualified = scope.qualify(name);
        self.send_operation(self.request(Method::DELETE, &path), (&kind, &qualified))
            .await
    }
}

#[async_trait]
impl OperationsApi for FusionClient {
    async fn get_operation(&self, id: &str) -> Result<Operation> {
        let path = format!("/operations/{}", urlencoding::encode(id));
        self.send_operation(self.request(Method::GET, &path), ("Operation", id))
            .await
    }
}

#[async_trait]
impl InventoryApi for FusionClient {
    async fn version(&self) -> Result<String> {
        let body = self
            .send(self.request(Method::GET, "/version"), ("Version", "version"))
            .await?;
        body.get("version")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| Error::Internal("Version response did not contain a version".into()))
    }

    async fn array_space(&self, zone: &str, array: &str) -> Result<Value> {
        let path = format!(
            "{}/space",
            resource_path(&Scope::zone(zone), ResourceCategory::Array, array)?
        );
        let qualified = format!("{}/{}", zone, array);
        self.send(self.request(Method::GET, &path), ("ArraySpace", &qualified))
            .await
    }

    async fn array_performance(&self, zone: &str, array: &str) -> Result<Value> {
        let path = format!(
            "{}/performance",
            resource_path(&Scope::zone(zone), ResourceCategory::Array, array)?
        );
        let qualified = format!("{}/{}", zone, array);
        self.send(self.request(Method::GET, &path), ("ArrayPerformance", &qualified))
            .await
    }
}
