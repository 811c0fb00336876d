use std::collections::HashSet;
use std::path::PathBuf;

use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use crate::config::ResponseMode;
use crate::Error;

///Decoded response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    ///Structured body, [`ResponseMode::Json`].
    Json(Value),
    ///Opaque body, [`ResponseMode::Bytes`].
    Bytes(Bytes),
}

impl Payload {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Payload::Json(value) => Some(value),
            Payload::Bytes(_) => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Payload::Json(_) => None,
            Payload::Bytes(data) => Some(data),
        }
    }
}

///A completed request: HTTP status plus the payload the response mode selected.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    status: u16,
    payload: Payload,
}

impl Response {
    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn into_payload(self) -> Payload {
        self.payload
    }

    ///Converts to a result that models success or error based on http status codes.
    ///
    /// If the code suggests 'success', returns Ok(self).
    /// Otherwise, returns Err(Error::StatusCode).
    pub fn check_status(self) -> Result<Response, Error> {
        if (200..=299).contains(&self.status) {
            Ok(self)
        } else {
            Err(Error::StatusCode(self.status))
        }
    }

    ///Deserialize the payload into `T`.
    ///
    /// A JSON payload converts directly; a bytes payload is parsed first.
    pub fn json<T: DeserializeOwned>(self) -> Result<T, Error> {
        match self.payload {
            Payload::Json(value) => Ok(serde_json::from_value(value)?),
            Payload::Bytes(data) => Ok(serde_json::from_slice(&data)?),
        }
    }
}

///Read the raw response through content-type validation and the
///mode-selected decoder.
pub(crate) async fn decode(
    raw: reqwest::Response,
    accepted: &HashSet<String>,
    mode: ResponseMode,
    head: bool,
) -> Result<Response, Error> {
    let status = raw.status().as_u16();
    let content_type = raw
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);
    check_content_type(accepted, content_type.as_deref())?;
    let data = raw.bytes().await?;
    let payload = match mode {
        ResponseMode::Json => {
            let empty_ok = head || status == 204 || status == 205;
            Payload::Json(parse_json(&data, empty_ok)?)
        }
        ResponseMode::Bytes => Payload::Bytes(data),
    };
    Ok(Response { status, payload })
}

///Bodies a HEAD request or a 204/205 leave empty decode as null; everything
///else must parse.
fn parse_json(data: &[u8], empty_ok: bool) -> Result<Value, Error> {
    if data.is_empty() && empty_ok {
        return Ok(Value::Null);
    }
    serde_json::from_slice(data).map_err(|error| {
        warn!(%error, "response body is not valid json");
        Error::Decode(error)
    })
}

///Membership check against the accepted set, on the content type's essence
///(parameters stripped, lowercased). `type/*` and `*/*` entries act as
///wildcards; a missing header passes.
fn check_content_type(accepted: &HashSet<String>, header: Option<&str>) -> Result<(), Error> {
    let raw = match header {
        Some(raw) => raw,
        None => return Ok(()),
    };
    let essence = raw
        .split(';')
        .next()
        .unwrap_or(raw)
        .trim()
        .to_ascii_lowercase();
    if accepted.contains(&essence) || accepted.contains("*/*") {
        return Ok(());
    }
    if let Some((kind, _)) = essence.split_once('/') {
        if accepted.contains(&format!("{kind}/*")) {
            return Ok(());
        }
    }
    warn!(content_type = %essence, "content type not in accepted set");
    Err(Error::ContentType(essence))
}

///A completed download.
///
/// When no destination was supplied the file lives in a temporary directory
/// owned by this value and is deleted when it is dropped.
#[derive(Debug)]
pub struct Downloaded {
    _tempdir: Option<tempfile::TempDir>,
    path: PathBuf,
    status: u16,
}

impl Downloaded {
    pub(crate) fn new(tempdir: Option<tempfile::TempDir>, path: PathBuf, status: u16) -> Downloaded {
        Downloaded {
            _tempdir: tempdir,
            path,
            status,
        }
    }

    pub fn copy_path(&self) -> PathBuf {
        self.path.clone()
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    ///Converts to a result that models success or error based on http status codes.
    pub fn check_status(&self) -> Result<(), Error> {
        if (200..=299).contains(&self.status) {
            Ok(())
        } else {
            Err(Error::StatusCode(self.status))
        }
    }
}
