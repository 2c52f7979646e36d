use std::fmt;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Jitter, Quota, RateLimiter};
use reqwest::{RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::api::types::{
    CreateVirtualClusterInput, CreateVirtualClusterOutput, DeleteVirtualClusterOutput,
    DescribeVirtualClusterOutput,
};
use crate::config::{ProviderConfig, RateLimitConfig};
use crate::errors::{ApiError, RESOURCE_NOT_FOUND_CODE};
use crate::observability::api_metrics;

const ERROR_TYPE_HEADER: &str = "x-amzn-ErrorType";

/// Remote control-plane operations consumed by the virtual cluster resource.
///
/// Handed explicitly to every resource operation so tests can swap in a fake.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait EmrContainersApi: Send + Sync {
    async fn create_virtual_cluster(
        &self,
        input: &CreateVirtualClusterInput,
    ) -> Result<CreateVirtualClusterOutput, ApiError>;

    async fn describe_virtual_cluster(
        &self,
        id: &str,
    ) -> Result<DescribeVirtualClusterOutput, ApiError>;

    async fn delete_virtual_cluster(&self, id: &str)
        -> Result<DeleteVirtualClusterOutput, ApiError>;
}

/// REST/JSON client for the control plane, rate limited per process.
pub struct HttpEmrContainersClient {
    http: reqwest::Client,
    endpoint: Url,
    token: Option<String>,
    rate_limiter: Arc<DefaultDirectRateLimiter>,
}

impl fmt::Debug for HttpEmrContainersClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpEmrContainersClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("authenticated", &self.token.is_some())
            .finish_non_exhaustive()
    }
}

impl HttpEmrContainersClient {
    pub fn new(
        endpoint: impl Into<String>,
        token: Option<String>,
        rate_limit: &RateLimitConfig,
    ) -> Result<Self, ApiError> {
        let per_second = NonZeroU32::new(rate_limit.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(rate_limit.burst).unwrap_or(per_second);
        let quota = Quota::per_second(per_second).allow_burst(burst);

        let endpoint = endpoint.into();
        let endpoint = Url::parse(&endpoint)
            .map_err(|e| ApiError::InvalidEndpoint(format!("{endpoint}: {e}")))?;
        if endpoint.cannot_be_a_base() {
            return Err(ApiError::InvalidEndpoint(endpoint.to_string()));
        }

        let http = reqwest::Client::builder()
            .user_agent(concat!("vcluster/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            http,
            endpoint,
            token,
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
        })
    }

    pub fn from_config(config: &ProviderConfig) -> Result<Self, ApiError> {
        Self::new(config.endpoint(), config.token.clone(), &config.rate_limit)
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Each segment is percent-encoded into exactly one path segment.
    fn url(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidEndpoint(self.endpoint.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn virtual_cluster_url(&self, id: &str) -> Result<Url, ApiError> {
        self.url(&["virtualclusters", id])
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        self.rate_limiter
            .until_ready_with_jitter(Jitter::up_to(Duration::from_millis(50)))
            .await;

        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        api_metrics().record_request();
        let response = request.send().await.inspect_err(|_| api_metrics().record_error())?;

        if !response.status().is_success() {
            let err = error_from_response(response).await;
            if err.is_not_found() {
                api_metrics().record_not_found();
            } else {
                api_metrics().record_error();
            }
            return Err(err);
        }

        let body = response.bytes().await?;
        if body.is_empty() {
            return serde_json::from_value(Value::Object(Default::default()))
                .map_err(|e| ApiError::InvalidResponse(e.to_string()));
        }
        serde_json::from_slice(&body).map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl EmrContainersApi for HttpEmrContainersClient {
    async fn create_virtual_cluster(
        &self,
        input: &CreateVirtualClusterInput,
    ) -> Result<CreateVirtualClusterOutput, ApiError> {
        debug!(name = %input.name, "CreateVirtualCluster");
        let url = self.url(&["virtualclusters"])?;
        self.send(self.http.post(url).json(input)).await
    }

    async fn describe_virtual_cluster(
        &self,
        id: &str,
    ) -> Result<DescribeVirtualClusterOutput, ApiError> {
        debug!(id, "DescribeVirtualCluster");
        self.send(self.http.get(self.virtual_cluster_url(id)?)).await
    }

    async fn delete_virtual_cluster(
        &self,
        id: &str,
    ) -> Result<DeleteVirtualClusterOutput, ApiError> {
        debug!(id, "DeleteVirtualCluster");
        self.send(self.http.delete(self.virtual_cluster_url(id)?)).await
    }
}

/// Classify a non-2xx response. The code comes from the error type header,
/// falling back to the body's `__type`/`code`.
async fn error_from_response(response: Response) -> ApiError {
    let status = response.status();
    let header_code = response
        .headers()
        .get(ERROR_TYPE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(normalize_error_code);

    let body: Value = response.json().await.unwrap_or(Value::Null);
    let body_code = ["__type", "code", "Code"]
        .iter()
        .find_map(|key| body.get(key).and_then(Value::as_str))
        .map(normalize_error_code);
    let message = ["message", "Message"]
        .iter()
        .find_map(|key| body.get(key).and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string());

    match header_code.or(body_code) {
        Some(code) if code == RESOURCE_NOT_FOUND_CODE => ApiError::NotFound { message },
        Some(code) => ApiError::Service {
            code,
            message,
            status: status.as_u16(),
        },
        None => ApiError::Service {
            code: "UnknownError".to_string(),
            message,
            status: status.as_u16(),
        },
    }
}

/// `ResourceNotFoundException:http://internal...` and
/// `com.amazonaws.emrcontainers#ResourceNotFoundException` both become the bare code.
fn normalize_error_code(raw: &str) -> String {
    let code = raw.split(':').next().unwrap_or(raw);
    code.rsplit('#').next().unwrap_or(code).trim().to_string()
}
