//! Parameter encoding for query strings and multipart forms
//!
//! Parameter structs describe their wire shape with serde attributes: the
//! (renamed) field name is the transmitted name, and
//! `skip_serializing_if = "Option::is_none"` marks a field as omit-if-empty.
//! Scalars are rendered as text: strings verbatim, booleans as
//! `"true"`/`"false"`, numbers in decimal. Nested values are rejected.

use crate::{ClientError, Result};
use reqwest::multipart::{Form, Part};
use serde::Serialize;
use serde_json::Value;
use std::io::{Read, Seek, SeekFrom};

/// Encode `params` as ordered `name=value` pairs for a URL query.
///
/// Absent and empty fields produce no pair, so a struct with nothing set
/// yields an empty vector.
pub fn encode_query<T: Serialize + ?Sized>(params: &T) -> Result<Vec<(String, String)>> {
    flatten(params)
}

/// A binary file part of a multipart form
#[derive(Clone, Debug)]
pub struct FilePart {
    /// Form field name
    pub field: String,
    /// Filename reported to the server
    pub file_name: String,
    /// MIME type of the content
    pub content_type: String,
    /// File content
    pub data: Vec<u8>,
}

/// Multipart body together with its `Content-Type` header value
#[derive(Debug)]
pub struct FormBody {
    /// `multipart/form-data; boundary=...`
    pub content_type: String,
    /// The form itself
    pub form: Form,
}

/// Encode `fields` as text parts, followed by an optional file part.
pub fn encode_form<T: Serialize + ?Sized>(fields: &T, file: Option<FilePart>) -> Result<FormBody> {
    let mut form = Form::new();
    for (name, value) in flatten(fields)? {
        form = form.text(name, value);
    }

    if let Some(file) = file {
        let part = Part::bytes(file.data)
            .file_name(file.file_name)
            .mime_str(&file.content_type)
            .map_err(|e| {
                ClientError::Encoding(format!("invalid content type {:?}: {}", file.content_type, e))
            })?;
        form = form.part(file.field, part);
    }

    Ok(FormBody {
        content_type: format!("multipart/form-data; boundary={}", form.boundary()),
        form,
    })
}

/// Rewind `reader` and read it in full.
///
/// Called once per attempt, so a retried upload sends the same bytes.
pub fn read_from_start<R: Read + Seek + ?Sized>(reader: &mut R) -> Result<Vec<u8>> {
    reader.seek(SeekFrom::Start(0))?;
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;
    Ok(data)
}

fn flatten<T: Serialize + ?Sized>(params: &T) -> Result<Vec<(String, String)>> {
    let value = serde_json::to_value(params)
        .map_err(|e| ClientError::Encoding(e.to_string()))?;

    let fields = match value {
        Value::Object(fields) => fields,
        Value::Null => return Ok(Vec::new()),
        other => {
            return Err(ClientError::Encoding(format!(
                "expected a struct of parameters, got {}",
                kind(&other)
            )))
        }
    };

    let mut pairs = Vec::with_capacity(fields.len());
    for (name, value) in fields {
        let text = match value {
            Value::Null => continue,
            Value::String(s) if s.is_empty() => continue,
            Value::String(s) => s,
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            other => {
                return Err(ClientError::Encoding(format!(
                    "field {:?}: unsupported {} value",
                    name,
                    kind(&other)
                )))
            }
        };
        pairs.push((name, text));
    }
    Ok(pairs)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
