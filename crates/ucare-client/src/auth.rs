//! Upload API authentication
//!
//! The upload API takes its credentials inside the request body rather than
//! in a header. An [`UploadAuth`] provider is handed to every payload encoder
//! and is invoked once per attempt, so retried requests always carry a fresh
//! signature.

use crate::config::{Config, SignatureAlgorithm};
use crate::{ClientError, Result};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Sha256, Sha512};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Credentials stamped into an upload API request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadCredentials {
    /// Project public key
    pub public_key: String,
    /// Hex signature, present for signed auth only
    pub signature: Option<String>,
    /// Signature expiry as unix seconds, present for signed auth only
    pub expire: Option<i64>,
}

/// Source of upload API credentials.
///
/// Implementations hold no per-call state and may be invoked concurrently.
pub trait UploadAuth: Send + Sync + fmt::Debug {
    /// Compute the credentials for one request attempt
    fn credentials(&self) -> UploadCredentials;
}

/// Build the provider selected by the config
pub fn upload_auth_from_config(config: &Config) -> Result<Arc<dyn UploadAuth>> {
    if config.sign_based_upload_auth {
        Ok(Arc::new(SignedAuth::new(
            &config.public_key,
            &config.secret_key,
            config.signature_algorithm,
            config.signature_expiry,
        )?))
    } else {
        Ok(Arc::new(SimpleAuth::new(&config.public_key)))
    }
}

/// Public key only
#[derive(Clone, Debug)]
pub struct SimpleAuth {
    public_key: String,
}

impl SimpleAuth {
    pub fn new(public_key: impl Into<String>) -> Self {
        Self {
            public_key: public_key.into(),
        }
    }
}

impl UploadAuth for SimpleAuth {
    fn credentials(&self) -> UploadCredentials {
        UploadCredentials {
            public_key: self.public_key.clone(),
            signature: None,
            expire: None,
        }
    }
}

#[derive(Clone)]
enum KeyedMac {
    Sha256(Hmac<Sha256>),
    Sha512(Hmac<Sha512>),
}

impl KeyedMac {
    fn sign(&self, message: &[u8]) -> String {
        match self {
            Self::Sha256(mac) => {
                let mut mac = mac.clone();
                mac.update(message);
                hex::encode(mac.finalize().into_bytes())
            }
            Self::Sha512(mac) => {
                let mut mac = mac.clone();
                mac.update(message);
                hex::encode(mac.finalize().into_bytes())
            }
        }
    }
}

/// Time-limited signed token
///
/// The signature is the hex HMAC of the decimal expiry timestamp, keyed by
/// the project secret key.
#[derive(Clone)]
pub struct SignedAuth {
    public_key: String,
    algorithm: SignatureAlgorithm,
    expiry: Duration,
    expiry_secs: i64,
    mac: KeyedMac,
}

impl SignedAuth {
    pub fn new(
        public_key: impl Into<String>,
        secret_key: &str,
        algorithm: SignatureAlgorithm,
        expiry: Duration,
    ) -> Result<Self> {
        let expiry_secs = i64::try_from(expiry.as_secs()).map_err(|_| {
            ClientError::Config(format!("signature expiry out of range: {:?}", expiry))
        })?;
        let key = secret_key.as_bytes();
        let mac = match algorithm {
            SignatureAlgorithm::HmacSha256 => KeyedMac::Sha256(
                Hmac::<Sha256>::new_from_slice(key)
                    .map_err(|e| ClientError::Config(format!("invalid secret key: {}", e)))?,
            ),
            SignatureAlgorithm::HmacSha512 => KeyedMac::Sha512(
                Hmac::<Sha512>::new_from_slice(key)
                    .map_err(|e| ClientError::Config(format!("invalid secret key: {}", e)))?,
            ),
        };

        Ok(Self {
            public_key: public_key.into(),
            algorithm,
            expiry,
            expiry_secs,
            mac,
        })
    }

    /// Credentials as they would be issued at `now`
    pub fn credentials_at(&self, now: DateTime<Utc>) -> UploadCredentials {
        let expire = now.timestamp().saturating_add(self.expiry_secs);
        UploadCredentials {
            public_key: self.public_key.clone(),
            signature: Some(self.mac.sign(expire.to_string().as_bytes())),
            expire: Some(expire),
        }
    }
}

impl UploadAuth for SignedAuth {
    fn credentials(&self) -> UploadCredentials {
        self.credentials_at(Utc::now())
    }
}

impl fmt::Debug for SignedAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignedAuth")
            .field("public_key", &self.public_key)
            .field("algorithm", &self.algorithm)
            .field("expiry", &self.expiry)
            .finish_non_exhaustive()
    }
}

/// `Authorization` header value for the REST API
pub fn rest_auth_header(public_key: &str, secret_key: &str) -> String {
    format!("Uploadcare.Simple {}:{}", public_key, secret_key)
}
