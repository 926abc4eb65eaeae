//! # Uploadcare Client SDK
//!
//! A client SDK for the Uploadcare upload and REST APIs.
//!
//! ## Features
//!
//! - **Two endpoints**: REST API (header auth) and upload API (body auth)
//! - **Signed uploads**: optional short-lived HMAC tokens, re-issued per attempt
//! - **Throttle retry**: 429 responses are retried with a fixed backoff
//! - **Typed errors**: one [`ClientError`] variant per failure kind
//!
//! ## Example
//!
//! ```rust,ignore
//! use ucare_client::{Client, Config, FileParams, ListParams, Ordering};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = Client::new(Config::new("public-key", "secret-key").with_signed_uploads())?;
//!
//!     // Upload a file
//!     let mut file = std::fs::File::open("photo.jpg")?;
//!     let id = client.upload_file(FileParams::new(&mut file, "photo.jpg")).await?;
//!     println!("uploaded {}", id);
//!
//!     // List the largest stored files
//!     let page = client
//!         .list_files(ListParams::new().stored(true).ordering(Ordering::SizeDesc))
//!         .await?;
//!     println!("{} files", page.total);
//!
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod codec;
mod client;
mod config;
mod error;
pub mod file;
pub mod request;
pub mod transport;
mod types;
pub mod upload;

pub use auth::{SignedAuth, SimpleAuth, UploadAuth, UploadCredentials};
pub use client::Client;
pub use config::{Config, SignatureAlgorithm};
pub use error::{ClientError, Result};
pub use file::{ListParams, Ordering};
pub use request::{EncodeRequest, Endpoint, Request};
pub use transport::{CancellationSignal, RetryPolicy};
pub use types::*;
pub use upload::{FileParams, StoreMode};
