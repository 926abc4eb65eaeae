//! Main client implementation

use crate::{
    auth::{rest_auth_header, upload_auth_from_config, UploadAuth},
    request::{resolve_url, EncodeRequest, Endpoint, Request},
    transport::{RetryPolicy, Transport},
    ClientError, Config, Result,
};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client as HttpClient, Method};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Uploadcare API client
///
/// Holds no per-call state; clone it or share it behind an `Arc` to issue
/// calls concurrently.
#[derive(Clone, Debug)]
pub struct Client {
    config: Arc<Config>,
    transport: Transport,
    rest_base: Url,
    upload_base: Url,
    rest_headers: HeaderMap,
}

impl Client {
    /// Create a new client with the given configuration
    pub fn new(config: Config) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(config.timeout)
            .user_agent(format!("{}/{}", config.user_agent, config.public_key))
            .build()
            .map_err(ClientError::Transport)?;

        Self::with_http_client(config, http)
    }

    /// Create a client on top of a caller-provided HTTP client
    pub fn with_http_client(config: Config, http: HttpClient) -> Result<Self> {
        config.validate()?;
        let upload_auth = upload_auth_from_config(&config)?;
        Self::with_upload_auth(config, http, upload_auth)
    }

    /// Create a client with a custom upload auth provider
    pub fn with_upload_auth(
        config: Config,
        http: HttpClient,
        upload_auth: Arc<dyn UploadAuth>,
    ) -> Result<Self> {
        let rest_base = Url::parse(&config.rest_api_base)?;
        let upload_base = Url::parse(&config.upload_api_base)?;

        let mut authorization = header_value(&rest_auth_header(&config.public_key, &config.secret_key))?;
        authorization.set_sensitive(true);

        let mut rest_headers = HeaderMap::new();
        rest_headers.insert(header::AUTHORIZATION, authorization);
        rest_headers.insert(header::ACCEPT, header_value(&config.rest_accept_header())?);

        let transport = Transport::new(http, upload_auth, RetryPolicy::from(&config));

        Ok(Self {
            config: Arc::new(config),
            transport,
            rest_base,
            upload_base,
            rest_headers,
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the transport
    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Build a request for `target` on `endpoint`.
    ///
    /// `target` is a path relative to the endpoint base or an absolute URL.
    /// The payload, if any, is encoded immediately so encoding failures are
    /// reported here rather than on send.
    pub fn new_request<'a>(
        &self,
        endpoint: Endpoint,
        method: Method,
        target: &str,
        payload: Option<Box<dyn EncodeRequest + 'a>>,
    ) -> Result<Request<'a>> {
        let base = match endpoint {
            Endpoint::RestApi => &self.rest_base,
            Endpoint::UploadApi => &self.upload_base,
        };
        let url = resolve_url(base, target)?;
        let headers = match endpoint {
            Endpoint::RestApi => self.rest_headers.clone(),
            Endpoint::UploadApi => HeaderMap::new(),
        };

        let mut request = Request::new(endpoint, method, url, headers, payload);
        request.prepare(self.transport.http(), self.transport.upload_auth())?;

        debug!(%endpoint, method = %request.method(), url = %request.url(), "created new request");
        Ok(request)
    }

    /// Execute a request and decode its JSON result
    pub async fn execute_json<T: DeserializeOwned>(&self, request: &mut Request<'_>) -> Result<T> {
        self.transport.execute_json(request).await
    }

    /// Execute a request, discarding the response body
    pub async fn execute(&self, request: &mut Request<'_>) -> Result<()> {
        self.transport.execute(request).await
    }

    /// Build and execute in one step, decoding the JSON result
    pub async fn resource_op<'a, T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        method: Method,
        target: &str,
        payload: Option<Box<dyn EncodeRequest + 'a>>,
    ) -> Result<T> {
        let mut request = self.new_request(endpoint, method, target, payload)?;
        self.execute_json(&mut request).await
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| ClientError::Config(format!("invalid header value: {}", e)))
}
