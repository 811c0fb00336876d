use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT_ENCODING, USER_AGENT};
use url::Url;

use crate::Error;

///Request parameter map.
///
/// Values are JSON scalars; nested values are rejected by the engine when it
/// encodes them into a query string or form body.
pub type Parameters = serde_json::Map<String, serde_json::Value>;

pub(crate) type Progress = Arc<dyn Fn(f64) + Send + Sync>;

///Timeout applied when neither the call nor the defaults set one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

///Content types every request accepts unless a call adds more.
static DEFAULT_ACCEPTED_CONTENT_TYPES: Lazy<HashSet<String>> = Lazy::new(|| {
    [
        "application/json",
        "text/json",
        "text/javascript",
        "text/html",
        "text/plain",
        "application/atom+xml",
        "application/xml",
        "text/xml",
        "image/png",
        "image/jpeg",
        "multipart/form-data",
    ]
    .into_iter()
    .map(str::to_owned)
    .collect()
});

///HTTP verb for a dispatched request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Head,
    Options,
    Connect,
}

impl Method {
    pub(crate) fn as_http(self) -> reqwest::Method {
        match self {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
            Method::Head => reqwest::Method::HEAD,
            Method::Options => reqwest::Method::OPTIONS,
            Method::Connect => reqwest::Method::CONNECT,
        }
    }

    ///Verbs whose [`RequestEncoding::UrlDefault`] placement is the query string.
    pub(crate) fn encodes_in_query(self) -> bool {
        matches!(self, Method::Get | Method::Head | Method::Delete)
    }
}

///Where request parameters are placed on the outgoing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestEncoding {
    ///JSON-serialized request body.
    JsonBody,
    ///Query string for GET/HEAD/DELETE, URL-encoded body otherwise.
    #[default]
    UrlDefault,
    ///Always the query string.
    UrlQueryString,
    ///Always a URL-encoded body.
    UrlEncodedBody,
}

///How the response body is handed back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseMode {
    ///Parse the body as JSON.
    #[default]
    Json,
    ///Opaque bytes, no parsing.
    Bytes,
}

///Default options a [`Client`](crate::Client) applies to every request.
///
/// Build one with the setters below and hand it to
/// [`Client::with_defaults`](crate::Client::with_defaults). Per-call setters on
/// the request builders override the scalar fields; headers and accepted
/// content types always merge into this stack instead of replacing it.
#[derive(Debug, Clone)]
pub struct Defaults {
    pub(crate) timeout: Duration,
    pub(crate) encoding: RequestEncoding,
    pub(crate) response_mode: ResponseMode,
    pub(crate) headers: HeaderMap,
    pub(crate) accepted_content_types: HashSet<String>,
}

impl Default for Defaults {
    fn default() -> Defaults {
        Defaults {
            timeout: DEFAULT_TIMEOUT,
            encoding: RequestEncoding::default(),
            response_mode: ResponseMode::default(),
            headers: HeaderMap::new(),
            accepted_content_types: DEFAULT_ACCEPTED_CONTENT_TYPES.clone(),
        }
    }
}

impl Defaults {
    pub fn new() -> Defaults {
        Defaults::default()
    }

    ///Timeout for requests that do not set their own.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    ///Parameter placement for requests that do not set their own.
    pub fn encoding(mut self, encoding: RequestEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    ///Response handling for requests that do not set their own.
    pub fn response_mode(mut self, response_mode: ResponseMode) -> Self {
        self.response_mode = response_mode;
        self
    }

    ///Install a default header. Per-call headers win on key collision.
    pub fn header(mut self, key: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(key, value);
        self
    }

    ///Merge a whole header map into the defaults.
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        for (key, value) in headers.iter() {
            self.headers.insert(key.clone(), value.clone());
        }
        self
    }

    ///Accept an extra response content type.
    ///
    /// Additive: the built-in set cannot be removed.
    pub fn accept_content_type(mut self, content_type: &str) -> Self {
        self.accepted_content_types
            .insert(content_type.to_ascii_lowercase());
        self
    }

    ///Conventional Accept-Encoding / User-Agent pair, not installed by default.
    pub fn standard_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT_ENCODING,
            HeaderValue::from_static("gzip;q=1.0, compress;q=0.5"),
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("fetchr/", env!("CARGO_PKG_VERSION"))),
        );
        headers
    }
}

///Per-call overrides collected by the request builders.
#[derive(Debug, Clone, Default)]
pub(crate) struct CallOptions {
    pub(crate) parameters: Option<Parameters>,
    pub(crate) timeout: Option<Duration>,
    pub(crate) encoding: Option<RequestEncoding>,
    pub(crate) response_mode: Option<ResponseMode>,
    pub(crate) headers: HeaderMap,
    pub(crate) accepted_content_types: HashSet<String>,
}

///The fully merged parameters for one dispatch. Never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Resolved {
    pub(crate) url: Url,
    pub(crate) method: Method,
    pub(crate) parameters: Option<Parameters>,
    pub(crate) timeout: Duration,
    pub(crate) encoding: RequestEncoding,
    pub(crate) response_mode: ResponseMode,
    pub(crate) headers: HeaderMap,
    pub(crate) accepted_content_types: HashSet<String>,
}

impl Resolved {
    ///Merge one call's options over the default stack.
    ///
    /// Scalars: call value if set, else the default. Headers: defaults with
    /// call entries layered on top, call wins on key collision. Accepted
    /// content types: union.
    ///
    /// # Errors
    /// [`Error::InvalidURL`] if `base` + `path` is not an absolute URL.
    pub(crate) fn resolve(
        method: Method,
        base: &str,
        path: &str,
        call: CallOptions,
        defaults: &Defaults,
    ) -> Result<Resolved, Error> {
        let spelled = format!("{}{}", base, path);
        let url = match Url::parse(&spelled) {
            Ok(url) => url,
            Err(_) => return Err(Error::InvalidURL(spelled)),
        };

        let mut headers = defaults.headers.clone();
        for (key, value) in call.headers.iter() {
            headers.insert(key.clone(), value.clone());
        }

        let mut accepted_content_types = defaults.accepted_content_types.clone();
        accepted_content_types.extend(call.accepted_content_types);

        Ok(Resolved {
            url,
            method,
            parameters: call.parameters,
            timeout: call.timeout.unwrap_or(defaults.timeout),
            encoding: call.encoding.unwrap_or(defaults.encoding),
            response_mode: call.response_mode.unwrap_or(defaults.response_mode),
            headers,
            accepted_content_types,
        })
    }
}
