//! Request building
//!
//! A [`Request`] owns everything needed to produce the outgoing HTTP request
//! again: resolved URL, endpoint headers and the payload encoder. The engine
//! re-materializes it before every retry, which re-reads seekable streams and
//! asks the auth provider for fresh credentials.

use crate::auth::UploadAuth;
use crate::transport::CancellationSignal;
use crate::{ClientError, Result};
use reqwest::header::HeaderMap;
use reqwest::{Method, RequestBuilder};
use std::fmt;
use url::Url;

/// One of the two API surfaces
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// Metadata/REST API, authenticated by header
    RestApi,
    /// Upload API, authenticated inside the request body
    UploadApi,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RestApi => write!(f, "rest"),
            Self::UploadApi => write!(f, "upload"),
        }
    }
}

/// A parameter object that knows how to put itself into a request.
///
/// Called once per attempt. Implementations must produce the same body every
/// time, apart from freshly issued credentials.
pub trait EncodeRequest: Send {
    /// Add this payload (query, form body, ...) to `builder`
    fn encode_request(
        &mut self,
        builder: RequestBuilder,
        auth: &dyn UploadAuth,
    ) -> Result<RequestBuilder>;
}

/// Resolve `target` against `base`.
///
/// Absolute URLs (such as pagination links returned by the server) are taken
/// verbatim but must share the base's scheme, host and port, since endpoint
/// credentials are attached to whatever URL comes out of here. Anything else
/// is joined onto the endpoint base.
pub fn resolve_url(base: &Url, target: &str) -> Result<Url> {
    match Url::parse(target) {
        Ok(url) if url.origin() == base.origin() => Ok(url),
        Ok(url) => Err(ClientError::Config(format!(
            "refusing URL outside endpoint origin {}: {}",
            base.origin().ascii_serialization(),
            url.origin().ascii_serialization()
        ))),
        Err(url::ParseError::RelativeUrlWithoutBase) => Ok(base.join(target)?),
        Err(e) => Err(e.into()),
    }
}

/// A fully-formed, retryable request
pub struct Request<'a> {
    endpoint: Endpoint,
    method: Method,
    url: Url,
    headers: HeaderMap,
    payload: Option<Box<dyn EncodeRequest + 'a>>,
    cancellation: Option<CancellationSignal>,
    prepared: Option<reqwest::Request>,
}

impl<'a> Request<'a> {
    pub(crate) fn new(
        endpoint: Endpoint,
        method: Method,
        url: Url,
        headers: HeaderMap,
        payload: Option<Box<dyn EncodeRequest + 'a>>,
    ) -> Self {
        Self {
            endpoint,
            method,
            url,
            headers,
            payload,
            cancellation: None,
            prepared: None,
        }
    }

    /// Attach a cancellation signal observed by every attempt and backoff
    pub fn with_cancellation(mut self, signal: CancellationSignal) -> Self {
        self.cancellation = Some(signal);
        self
    }

    pub fn endpoint(&self) -> Endpoint {
        self.endpoint
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn cancellation(&self) -> Option<&CancellationSignal> {
        self.cancellation.as_ref()
    }

    /// Whether the request carries a payload that is re-encoded on retry
    pub fn has_payload(&self) -> bool {
        self.payload.is_some()
    }

    /// Build the outgoing request, invoking the payload encoder
    pub fn materialize(
        &mut self,
        http: &reqwest::Client,
        auth: &dyn UploadAuth,
    ) -> Result<reqwest::Request> {
        let mut builder = http
            .request(self.method.clone(), self.url.clone())
            .headers(self.headers.clone());
        if let Some(payload) = self.payload.as_mut() {
            builder = payload.encode_request(builder, auth)?;
        }
        Ok(builder.build()?)
    }

    /// Encode once up front so payload errors surface at build time
    pub(crate) fn prepare(&mut self, http: &reqwest::Client, auth: &dyn UploadAuth) -> Result<()> {
        let prepared = self.materialize(http, auth)?;
        self.prepared = Some(prepared);
        Ok(())
    }

    pub(crate) fn take_prepared(&mut self) -> Option<reqwest::Request> {
        self.prepared.take()
    }
}

impl fmt::Debug for Request<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("endpoint", &self.endpoint)
            .field("method", &self.method)
            .field("url", &self.url.as_str())
            .field("has_payload", &self.payload.is_some())
            .finish_non_exhaustive()
    }
}
