//! Direct file upload (RFC 7578 multipart form)

use crate::{
    auth::UploadAuth,
    codec::{encode_form, read_from_start, FilePart},
    request::{EncodeRequest, Endpoint},
    types::UploadResult,
    Client, ClientError, Result,
};
use reqwest::{Method, RequestBuilder};
use serde::Serialize;
use std::io::{Read, Seek};
use tracing::{debug, instrument};

const DIRECT_UPLOAD_PATH: &str = "/base/";
const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Whether an uploaded file is stored permanently
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum StoreMode {
    #[serde(rename = "1")]
    Always,
    #[serde(rename = "0")]
    Never,
    /// Follow the project setting
    #[serde(rename = "auto")]
    Auto,
}

/// Parameters of a direct upload.
///
/// `data` is read in full on every attempt, rewinding it first, so a
/// throttled upload can be sent again. Pass `&mut file` to keep ownership of
/// the stream. Files over 100 MB are rejected by the server with
/// [`ClientError::FileTooLarge`].
#[derive(Debug)]
pub struct FileParams<R> {
    /// File content
    pub data: R,
    /// Filename reported to the server
    pub name: String,
    /// MIME type; guessed from `name` when absent
    pub content_type: Option<String>,
    /// Storing behaviour
    pub to_store: Option<StoreMode>,
}

impl<R: Read + Seek> FileParams<R> {
    pub fn new(data: R, name: impl Into<String>) -> Self {
        Self {
            data,
            name: name.into(),
            content_type: None,
            to_store: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_store(mut self, store: StoreMode) -> Self {
        self.to_store = Some(store);
        self
    }

    fn resolved_content_type(&self) -> String {
        match self.content_type.as_deref() {
            Some(ct) if !ct.is_empty() => ct.to_string(),
            _ => mime_guess::from_path(&self.name)
                .first_raw()
                .unwrap_or(FALLBACK_CONTENT_TYPE)
                .to_string(),
        }
    }
}

#[derive(Serialize)]
struct UploadFields<'a> {
    #[serde(rename = "UPLOADCARE_PUB_KEY")]
    pub_key: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    signature: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expire: Option<i64>,
    #[serde(rename = "UPLOADCARE_STORE", skip_serializing_if = "Option::is_none")]
    store: Option<StoreMode>,
}

impl<R: Read + Seek + Send> EncodeRequest for FileParams<R> {
    fn encode_request(
        &mut self,
        builder: RequestBuilder,
        auth: &dyn UploadAuth,
    ) -> Result<RequestBuilder> {
        if self.name.is_empty() {
            return Err(ClientError::Encoding("file name is required".to_string()));
        }

        let creds = auth.credentials();
        let fields = UploadFields {
            pub_key: &creds.public_key,
            signature: creds.signature.as_deref(),
            expire: creds.expire,
            store: self.to_store,
        };
        let file = FilePart {
            field: "file".to_string(),
            file_name: self.name.clone(),
            content_type: self.resolved_content_type(),
            data: read_from_start(&mut self.data)?,
        };

        let body = encode_form(&fields, Some(file))?;
        debug!(content_type = %body.content_type, "encoded upload form");
        Ok(builder.multipart(body.form))
    }
}

impl Client {
    /// Upload a file and return its id
    #[instrument(skip(self, params), fields(name = %params.name))]
    pub async fn upload_file<R>(&self, params: FileParams<R>) -> Result<String>
    where
        R: Read + Seek + Send,
    {
        let result: UploadResult = self
            .resource_op(
                Endpoint::UploadApi,
                Method::POST,
                DIRECT_UPLOAD_PATH,
                Some(Box::new(params)),
            )
            .await?;

        debug!(file = %result.file, "uploaded file");
        Ok(result.file)
    }
}
