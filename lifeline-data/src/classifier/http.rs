//! HTTP-backed [`GeoClassifier`] posting to the cluster service.
//!
//! Each call posts `{"latitude": .., "longitude": ..}` to
//! `{base_url}nearby-donors` and reads the `cluster` field of the answer.
//! Transport and decoding failures are reported as [`ClassifierError`]s; the
//! matching engine turns them into the unknown label.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use lifeline_core::{ClassifierError, ClusterAssignment, Coordinate, GeoClassifier};
use log::debug;
use reqwest::Client;
use thiserror::Error;
use url::Url;

use super::wire::{ClusterResponse, DonorRequest};

/// Error type for [`HttpClusterClassifier`] construction failures.
#[derive(Debug, Error)]
pub enum ProviderBuildError {
    /// Failed to build the HTTP client.
    #[error("failed to build HTTP client")]
    HttpClient(#[source] reqwest::Error),
    /// The base URL does not parse.
    #[error("invalid classifier base URL {base_url:?}")]
    InvalidBaseUrl {
        /// Rejected URL.
        base_url: String,
        /// Parser error.
        #[source]
        source: url::ParseError,
    },
}

/// Default user agent for classifier requests.
pub const DEFAULT_USER_AGENT: &str = "lifeline-classifier/0.1";

/// Default service root.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api/";

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

const ENDPOINT: &str = "nearby-donors";

/// Configuration for [`HttpClusterClassifier`].
#[derive(Debug, Clone)]
pub struct HttpClusterClassifierConfig {
    /// Service root, for example `"http://localhost:8080/api/"`.
    pub base_url: String,
    /// Request timeout duration.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
}

impl Default for HttpClusterClassifierConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

impl HttpClusterClassifierConfig {
    /// Create a new configuration with the given base URL.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Resolve the endpoint URL.
    ///
    /// A missing trailing slash on the base is tolerated so that
    /// `http://host/api` and `http://host/api/` resolve alike.
    fn endpoint(&self) -> Result<Url, ProviderBuildError> {
        let invalid = |source| ProviderBuildError::InvalidBaseUrl {
            base_url: self.base_url.clone(),
            source,
        };
        let mut root = self.base_url.trim().to_owned();
        if !root.ends_with('/') {
            root.push('/');
        }
        Url::parse(&root)
            .and_then(|base| base.join(ENDPOINT))
            .map_err(invalid)
    }
}

/// Cluster classifier backed by the remote service.
///
/// The classifier has an explicit lifecycle: [`open`](Self::open) builds the
/// HTTP client and [`close`](Self::close) makes every later call fail with
/// [`ClassifierError::ModelUnavailable`].
#[derive(Debug)]
pub struct HttpClusterClassifier {
    client: Client,
    config: HttpClusterClassifierConfig,
    endpoint: Url,
    open: AtomicBool,
}

impl HttpClusterClassifier {
    /// Open a classifier with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client fails
    /// to build.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ProviderBuildError> {
        Self::open(HttpClusterClassifierConfig::new(base_url))
    }

    /// Open a classifier with explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client fails
    /// to build.
    pub fn open(config: HttpClusterClassifierConfig) -> Result<Self, ProviderBuildError> {
        let endpoint = config.endpoint()?;
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(config.timeout)
            .timeout(config.timeout)
            .build()
            .map_err(ProviderBuildError::HttpClient)?;
        Ok(Self {
            client,
            config,
            endpoint,
            open: AtomicBool::new(true),
        })
    }

    /// Release the classifier. Later calls fail without touching the network.
    pub fn close(&self) {
        self.open.store(false, Ordering::Release);
    }

    /// Whether [`close`](Self::close) has not been called yet.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// URL every classification is posted to.
    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Convert a reqwest error to a `ClassifierError`.
    fn convert_reqwest_error(&self, error: &reqwest::Error) -> ClassifierError {
        let url = self.endpoint.to_string();
        if error.is_timeout() {
            return ClassifierError::Timeout {
                url,
                timeout_secs: self.config.timeout.as_secs(),
            };
        }

        if let Some(status) = error.status() {
            return ClassifierError::HttpError {
                url,
                status: status.as_u16(),
                message: error.to_string(),
            };
        }

        if error.is_decode() {
            return ClassifierError::ParseError {
                message: error.to_string(),
            };
        }

        ClassifierError::NetworkError {
            url,
            message: error.to_string(),
        }
    }
}

#[async_trait]
impl GeoClassifier for HttpClusterClassifier {
    async fn classify(&self, coordinate: Coordinate) -> Result<ClusterAssignment, ClassifierError> {
        if !self.is_open() {
            return Err(ClassifierError::ModelUnavailable {
                message: "classifier has been closed".to_owned(),
            });
        }

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&DonorRequest::from(coordinate))
            .send()
            .await
            .map_err(|err| self.convert_reqwest_error(&err))?
            .error_for_status()
            .map_err(|err| self.convert_reqwest_error(&err))?;

        let body: ClusterResponse =
            response
                .json()
                .await
                .map_err(|err| ClassifierError::ParseError {
                    message: err.to_string(),
                })?;
        debug!("cluster service placed ({coordinate}) in cluster {}", body.cluster);
        Ok(body.into())
    }
}
