//! File listing on the REST API

use crate::{
    auth::UploadAuth,
    codec::encode_query,
    request::{EncodeRequest, Endpoint},
    types::FileList,
    Client, Result,
};
use reqwest::{Method, RequestBuilder};
use serde::Serialize;
use tracing::{debug, instrument};

const LIST_PATH: &str = "/files/";

/// Sort order of a file listing
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Ordering {
    /// Oldest first
    #[serde(rename = "datetime_uploaded")]
    UploadedAtAsc,
    /// Newest first
    #[serde(rename = "-datetime_uploaded")]
    UploadedAtDesc,
    /// Smallest first
    #[serde(rename = "size")]
    SizeAsc,
    /// Largest first
    #[serde(rename = "-size")]
    SizeDesc,
}

impl Ordering {
    /// Wire token for this ordering
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UploadedAtAsc => "datetime_uploaded",
            Self::UploadedAtDesc => "-datetime_uploaded",
            Self::SizeAsc => "size",
            Self::SizeDesc => "-size",
        }
    }
}

/// Filters for listing files
#[derive(Clone, Debug, Default, Serialize)]
pub struct ListParams {
    /// Include only removed (or only live) files
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removed: Option<bool>,
    /// Include only stored (or only unstored) files
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stored: Option<bool>,
    /// Page size
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    /// Sort order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ordering: Option<Ordering>,
}

impl ListParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn removed(mut self, removed: bool) -> Self {
        self.removed = Some(removed);
        self
    }

    pub fn stored(mut self, stored: bool) -> Self {
        self.stored = Some(stored);
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn ordering(mut self, ordering: Ordering) -> Self {
        self.ordering = Some(ordering);
        self
    }
}

impl EncodeRequest for ListParams {
    fn encode_request(
        &mut self,
        builder: RequestBuilder,
        _auth: &dyn UploadAuth,
    ) -> Result<RequestBuilder> {
        let pairs = encode_query(&*self)?;
        if pairs.is_empty() {
            return Ok(builder);
        }
        Ok(builder.query(&pairs))
    }
}

impl Client {
    /// List files matching `params`
    #[instrument(skip(self))]
    pub async fn list_files(&self, params: ListParams) -> Result<FileList> {
        let list: FileList = self
            .resource_op(Endpoint::RestApi, Method::GET, LIST_PATH, Some(Box::new(params)))
            .await?;
        debug!(total = list.total, page = list.results.len(), "listed files");
        Ok(list)
    }

    /// Fetch the page behind a `next`/`previous` link of a previous listing
    #[instrument(skip(self))]
    pub async fn list_files_page(&self, page_url: &str) -> Result<FileList> {
        self.resource_op(Endpoint::RestApi, Method::GET, page_url, None)
            .await
    }
}
