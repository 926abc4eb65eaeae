//! Common types for the client SDK

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stored file as described by the REST API
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FileInfo {
    /// File id
    pub uuid: Uuid,
    /// Upload time
    pub datetime_uploaded: Option<DateTime<Utc>>,
    /// Time the file was stored, if it is
    #[serde(default)]
    pub datetime_stored: Option<DateTime<Utc>>,
    /// Time the file was removed, if it was
    #[serde(default)]
    pub datetime_removed: Option<DateTime<Utc>>,
    /// Size in bytes
    #[serde(default)]
    pub size: u64,
    /// MIME type
    #[serde(default)]
    pub mime_type: Option<String>,
    /// Filename at upload time
    #[serde(default)]
    pub original_filename: Option<String>,
    /// CDN URL of the original file
    #[serde(default)]
    pub original_file_url: Option<String>,
    /// Whether the file is an image
    #[serde(default)]
    pub is_image: bool,
    /// Whether the file is ready to be served
    #[serde(default)]
    pub is_ready: bool,
}

/// One page of a file listing
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FileList {
    /// URL of the next page
    pub next: Option<String>,
    /// URL of the previous page
    pub previous: Option<String>,
    /// Total number of files matching the filter
    #[serde(default)]
    pub total: u64,
    /// Page size
    #[serde(default)]
    pub per_page: u64,
    /// Files on this page
    #[serde(default)]
    pub results: Vec<FileInfo>,
}

/// Direct upload response
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UploadResult {
    /// Id of the new file
    pub file: String,
}
