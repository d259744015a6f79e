//! HTTP client implementation and timed trials

pub mod server_timing;


pub use server_timing::ServerTiming;

use crate::{
    error::{AppError, Result, TrialError},
    models::{metrics::RawSample, Config, TestMetadata, TestSpec},
    types::TestKind,
};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::time::timeout;

/// Transport seam between the runner and the speed test service
#[async_trait]
pub trait SpeedTestClient: Send + Sync {
    /// Execute one timed probe for `spec`
    async fn run_trial(&self, spec: &TestSpec) -> std::result::Result<RawSample, TrialError>;

    /// Fetch descriptive metadata about the client connection
    async fn fetch_metadata(&self) -> Result<TestMetadata>;
}

/// Addresses of the service endpoints, derived from a base URL
#[derive(Debug, Clone)]
pub struct Endpoint {
    base: Url,
}

impl Endpoint {
    pub fn new(base_url: &str) -> Result<Self> {
        let mut base = Url::parse(base_url)
            .map_err(|e| AppError::config(format!("Invalid base URL '{}': {}", base_url, e)))?;
        if base.host_str().is_none() {
            return Err(AppError::config(format!("Base URL must have a host: {}", base_url)));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self { base })
    }

    /// `GET` endpoint returning exactly `bytes` bytes
    pub fn download_url(&self, bytes: u64) -> Result<Url> {
        let mut url = self.join("__down")?;
        url.query_pairs_mut().append_pair("bytes", &bytes.to_string());
        Ok(url)
    }

    /// `POST` endpoint accepting an arbitrary body
    pub fn upload_url(&self) -> Result<Url> {
        self.join("__up")
    }

    pub fn meta_url(&self) -> Result<Url> {
        self.join("meta")
    }

    fn join(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .map_err(|e| AppError::internal(format!("Failed to build {} URL: {}", path, e)))
    }
}

/// Body of the metadata endpoint
#[derive(Debug, Deserialize)]
struct MetaResponse {
    #[serde(rename = "clientIp")]
    client_ip: Option<String>,
    #[serde(rename = "asOrganization")]
    as_organization: Option<String>,
    colo: Option<String>,
    city: Option<String>,
    region: Option<String>,
}

impl From<MetaResponse> for TestMetadata {
    fn from(meta: MetaResponse) -> Self {
        Self {
            ip: meta.client_ip,
            isp: meta.as_organization,
            location_code: meta.colo,
            location_city: meta.city,
            location_region: meta.region,
        }
    }
}

/// Speed test client over reqwest
pub struct NetworkClient {
    client: Client,
    endpoint: Endpoint,
    trial_timeout: Duration,
}

impl NetworkClient {
    /// Create a new network client
    pub fn new(base_url: &str, connect_timeout: Duration, trial_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(trial_timeout)
            .user_agent(crate::defaults::USER_AGENT)
            .build()
            .map_err(|e| AppError::network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: Endpoint::new(base_url)?,
            trial_timeout,
        })
    }

    /// Create a client from the application configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.base_url, config.connect_timeout(), config.timeout())
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    fn build_request(&self, spec: &TestSpec) -> std::result::Result<RequestBuilder, TrialError> {
        let wire_bytes = spec.wire_bytes();
        let request = match spec.kind() {
            TestKind::Latency | TestKind::Download => {
                let url = self
                    .endpoint
                    .download_url(wire_bytes)
                    .map_err(|e| TrialError::ConnectionFailure(e.to_string()))?;
                self.client.get(url)
            }
            TestKind::Upload => {
                let url = self
                    .endpoint
                    .upload_url()
                    .map_err(|e| TrialError::ConnectionFailure(e.to_string()))?;
                let length = usize::try_from(wire_bytes).map_err(|_| {
                    TrialError::MalformedResponse(format!("upload payload of {} bytes is too large", wire_bytes))
                })?;
                self.client.post(url).body(vec![b'0'; length])
            }
        };
        Ok(request)
    }

    /// Send one probe and time it. The request, including any upload body,
    /// is fully built before the clock starts.
    async fn execute_trial(&self, spec: &TestSpec) -> std::result::Result<RawSample, TrialError> {
        let request = self.build_request(spec)?;

        let start = Instant::now();
        let response = request
            .send()
            .await
            .map_err(|e| TrialError::from_transport(&e, self.trial_timeout))?;
        let time_to_headers = start.elapsed();

        let status = response.status();
        if !status.is_success() {
            return Err(TrialError::MalformedResponse(format!("unexpected status {}", status)));
        }
        let server_time = ServerTiming::from_headers(response.headers())?;

        match spec.kind() {
            TestKind::Latency => {
                let received = self.drain_body(response, spec.wire_bytes()).await?;
                Ok(RawSample::new(time_to_headers, server_time, received))
            }
            TestKind::Download => {
                let received = self.drain_body(response, spec.wire_bytes()).await?;
                Ok(RawSample::new(start.elapsed(), server_time, received))
            }
            TestKind::Upload => {
                self.drain_body(response, 0).await?;
                Ok(RawSample::new(start.elapsed(), server_time, spec.wire_bytes()))
            }
        }
    }

    /// Read the body to completion and count its bytes. A body that ends
    /// or breaks before `expected` bytes is a `ShortTransfer`.
    async fn drain_body(&self, response: Response, expected: u64) -> std::result::Result<u64, TrialError> {
        let mut stream = response.bytes_stream();
        let mut received: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| {
                if expected > 0 && !e.is_timeout() && (e.is_body() || e.is_decode()) {
                    TrialError::ShortTransfer { expected, received }
                } else {
                    TrialError::from_transport(&e, self.trial_timeout)
                }
            })?;
            received += chunk.len() as u64;
        }
        if received < expected {
            return Err(TrialError::ShortTransfer { expected, received });
        }
        Ok(received)
    }
}

#[async_trait]
impl SpeedTestClient for NetworkClient {
    async fn run_trial(&self, spec: &TestSpec) -> std::result::Result<RawSample, TrialError> {
        match timeout(self.trial_timeout, self.execute_trial(spec)).await {
            Ok(result) => result,
            Err(_) => Err(TrialError::Timeout(self.trial_timeout)),
        }
    }

    async fn fetch_metadata(&self) -> Result<TestMetadata> {
        let url = self.endpoint.meta_url()?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::http_request(format!("Metadata request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::http_request(format!(
                "Metadata request returned status {}", response.status()
            )));
        }

        let meta: MetaResponse = response
            .json()
            .await
            .map_err(|e| AppError::parse(format!("Invalid metadata response: {}", e)))?;
        Ok(meta.into())
    }
}
