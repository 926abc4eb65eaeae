//! Client configuration

use crate::{ClientError, Result};
use std::time::Duration;
use url::Url;

/// Default REST API base URL
pub const DEFAULT_REST_API_BASE: &str = "https://api.uploadcare.com";
/// Default upload API base URL
pub const DEFAULT_UPLOAD_API_BASE: &str = "https://upload.uploadcare.com";

/// Hash used for signed upload tokens
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    /// HMAC with SHA-256
    #[default]
    HmacSha256,
    /// HMAC with SHA-512
    HmacSha512,
}

/// Client configuration
#[derive(Clone, Debug)]
pub struct Config {
    /// Project public key
    pub public_key: String,
    /// Project secret key
    pub secret_key: String,
    /// REST API base URL
    pub rest_api_base: String,
    /// Upload API base URL
    pub upload_api_base: String,
    /// Authenticate uploads with short-lived signed tokens
    pub sign_based_upload_auth: bool,
    /// Hash used for upload signatures
    pub signature_algorithm: SignatureAlgorithm,
    /// Lifetime of each upload signature
    pub signature_expiry: Duration,
    /// Retries allowed after a throttled (429) response
    pub max_throttle_retries: u32,
    /// Fixed delay between throttled attempts
    pub retry_backoff: Duration,
    /// Request timeout
    pub timeout: Duration,
    /// User agent string
    pub user_agent: String,
    /// REST API version
    pub api_version: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            public_key: String::new(),
            secret_key: String::new(),
            rest_api_base: DEFAULT_REST_API_BASE.to_string(),
            upload_api_base: DEFAULT_UPLOAD_API_BASE.to_string(),
            sign_based_upload_auth: false,
            signature_algorithm: SignatureAlgorithm::default(),
            signature_expiry: Duration::from_secs(60),
            max_throttle_retries: 3,
            // the upload API does not return Retry-After
            retry_backoff: Duration::from_secs(5),
            timeout: Duration::from_secs(30),
            user_agent: format!("ucare-client/{}", env!("CARGO_PKG_VERSION")),
            api_version: "v0.5".to_string(),
        }
    }
}

impl Config {
    /// Create a new config with the given project keys
    pub fn new(public_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            public_key: public_key.into(),
            secret_key: secret_key.into(),
            ..Default::default()
        }
    }

    /// Enable signed upload authentication
    pub fn with_signed_uploads(mut self) -> Self {
        self.sign_based_upload_auth = true;
        self
    }

    /// Set the upload signature hash
    pub fn with_signature_algorithm(mut self, algorithm: SignatureAlgorithm) -> Self {
        self.signature_algorithm = algorithm;
        self
    }

    /// Set the REST API base URL
    pub fn with_rest_api_base(mut self, base: impl Into<String>) -> Self {
        self.rest_api_base = base.into();
        self
    }

    /// Set the upload API base URL
    pub fn with_upload_api_base(mut self, base: impl Into<String>) -> Self {
        self.upload_api_base = base.into();
        self
    }

    /// Set the throttle retry budget and the delay between attempts
    pub fn with_throttle_retries(mut self, max_retries: u32, backoff: Duration) -> Self {
        self.max_throttle_retries = max_retries;
        self.retry_backoff = backoff;
        self
    }

    /// Set timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Check the config before building a client
    pub fn validate(&self) -> Result<()> {
        if self.public_key.is_empty() {
            return Err(ClientError::Config("public key is required".to_string()));
        }
        if self.sign_based_upload_auth && self.secret_key.is_empty() {
            return Err(ClientError::Config(
                "secret key is required for signed uploads".to_string(),
            ));
        }
        Url::parse(&self.rest_api_base)?;
        Url::parse(&self.upload_api_base)?;
        Ok(())
    }

    /// `Accept` header value for REST API requests
    pub fn rest_accept_header(&self) -> String {
        format!("application/vnd.uploadcare-{}+json", self.api_version)
    }
}
