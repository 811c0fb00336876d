use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::{StreamExt, TryStreamExt};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::Body;
use tokio_util::io::ReaderStream;
use tracing::debug;
use url::Url;

use crate::client::Client;
use crate::config::{Method, Progress, ResponseMode};
use crate::response::{self, Response};
use crate::Error;

const CHUNK: usize = 64 * 1024;

///Something to upload: an in-memory buffer or a file on disk.
#[derive(Debug, Clone)]
pub enum Source {
    Bytes(Bytes),
    File(PathBuf),
}

///Builder for an upload request.
///
/// With neither parameters nor a file key, the single source streams up as
/// the raw request body. Either one (or more than one source) switches the
/// dispatch to a multipart form. The response is decoded as JSON.
pub struct Upload<'a> {
    client: &'a Client,
    to: String,
    source: Source,
    more: Vec<Source>,
    file_key: Option<String>,
    mime_type: Option<String>,
    parameters: Option<HashMap<String, String>>,
    method: Method,
    headers: HeaderMap,
    progress: Option<Progress>,
}

impl<'a> Upload<'a> {
    pub(crate) fn new(client: &'a Client, source: Source, to: &str) -> Upload<'a> {
        Upload {
            client,
            to: to.to_owned(),
            source,
            more: Vec::new(),
            file_key: None,
            mime_type: None,
            parameters: None,
            method: Method::Post,
            headers: HeaderMap::new(),
            progress: None,
        }
    }

    ///Upload another source under the same form field key.
    pub fn and_source(mut self, source: Source) -> Self {
        self.more.push(source);
        self
    }

    ///Form field key the sources are appended under. Forces multipart.
    pub fn file_key(mut self, file_key: &str) -> Self {
        self.file_key = Some(file_key.to_owned());
        self
    }

    ///Mime type of the sources. Multipart parts without one go up as
    ///application/octet-stream.
    pub fn mime_type(mut self, mime_type: &str) -> Self {
        self.mime_type = Some(mime_type.to_owned());
        self
    }

    ///Extra form fields. Forces multipart.
    pub fn parameters(mut self, parameters: HashMap<String, String>) -> Self {
        self.parameters = Some(parameters);
        self
    }

    ///Verb to upload with.
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    ///Set (or unset) a header field.
    pub fn header(mut self, key: HeaderName, value: Option<HeaderValue>) -> Self {
        match value {
            Some(value) => {
                self.headers.insert(key, value);
            }
            None => {
                self.headers.remove(&key);
            }
        }
        self
    }

    ///Progress callback, called with a non-decreasing fraction in [0, 1].
    pub fn progress(mut self, progress: impl Fn(f64) + Send + Sync + 'static) -> Self {
        self.progress = Some(Arc::new(progress));
        self
    }

    ///Dispatch the upload.
    pub async fn perform(self) -> Result<Response, Error> {
        let Upload {
            client,
            to,
            source,
            more,
            file_key,
            mime_type,
            parameters,
            method,
            headers,
            progress,
        } = self;
        let url = match Url::parse(&to) {
            Ok(url) => url,
            Err(_) => return Err(Error::InvalidURL(to)),
        };

        let multipart = parameters.is_some() || file_key.is_some() || !more.is_empty();
        debug!(url = %url, multipart, "dispatching upload");

        let total = total_len(&source, &more).await?;
        let sent = Arc::new(AtomicU64::new(0));
        let builder = client
            .http
            .request(method.as_http(), url)
            .headers(headers);

        let raw = if multipart {
            let mut form = Form::new();
            if let Some(parameters) = parameters {
                for (key, value) in parameters {
                    form = form.text(key, value);
                }
            }
            let key = file_key.unwrap_or_else(|| "file".to_owned());
            for source in std::iter::once(source).chain(more) {
                let part = part(
                    source,
                    mime_type.as_deref(),
                    total,
                    sent.clone(),
                    progress.clone(),
                )
                .await?;
                form = form.part(key.clone(), part);
            }
            builder.multipart(form).send().await?
        } else {
            let (stream, _) = open(source).await?;
            let body = Body::wrap_stream(instrument(stream, total, sent, progress.clone()));
            builder.body(body).send().await?
        };

        if let Some(progress) = &progress {
            progress(1.0);
        }
        response::decode(
            raw,
            &client.defaults.accepted_content_types,
            ResponseMode::Json,
            false,
        )
        .await
    }
}

type ByteStream = BoxStream<'static, Result<Bytes, std::io::Error>>;

async fn total_len(source: &Source, more: &[Source]) -> Result<u64, Error> {
    let mut total = 0;
    for source in std::iter::once(source).chain(more) {
        total += match source {
            Source::Bytes(bytes) => bytes.len() as u64,
            Source::File(path) => tokio::fs::metadata(path).await?.len(),
        };
    }
    Ok(total)
}

async fn open(source: Source) -> Result<(ByteStream, u64), Error> {
    match source {
        Source::Bytes(bytes) => {
            let len = bytes.len() as u64;
            let chunks: Vec<Result<Bytes, std::io::Error>> = (0..bytes.len())
                .step_by(CHUNK)
                .map(|at| Ok(bytes.slice(at..bytes.len().min(at + CHUNK))))
                .collect();
            Ok((futures_util::stream::iter(chunks).boxed(), len))
        }
        Source::File(path) => {
            let len = tokio::fs::metadata(&path).await?.len();
            let file = tokio::fs::File::open(&path).await?;
            Ok((ReaderStream::new(file).boxed(), len))
        }
    }
}

///Tick the progress callback as chunks move, against the combined total.
fn instrument(
    stream: ByteStream,
    total: u64,
    sent: Arc<AtomicU64>,
    progress: Option<Progress>,
) -> impl futures_util::Stream<Item = Result<Bytes, std::io::Error>> {
    stream.inspect_ok(move |chunk| {
        let done = sent.fetch_add(chunk.len() as u64, Ordering::Relaxed) + chunk.len() as u64;
        if let Some(progress) = &progress {
            if total > 0 {
                progress((done as f64 / total as f64).min(1.0));
            }
        }
    })
}

async fn part(
    source: Source,
    mime_type: Option<&str>,
    total: u64,
    sent: Arc<AtomicU64>,
    progress: Option<Progress>,
) -> Result<Part, Error> {
    let mime = mime_type.unwrap_or("application/octet-stream");
    let file_name = match &source {
        Source::File(path) => path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned()),
        Source::Bytes(_) => None,
    }
    // name in-memory uploads after the mime subtype
    .unwrap_or_else(|| format!("upload.{}", mime.rsplit('/').next().unwrap_or("bin")));

    let (stream, len) = open(source).await?;
    let body = Body::wrap_stream(instrument(stream, total, sent, progress));
    let part = Part::stream_with_length(body, len)
        .file_name(file_name)
        .mime_str(mime)?;
    Ok(part)
}
