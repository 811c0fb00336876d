use crate::config::{Defaults, Method};
use crate::download::Download;
use crate::request::Request;
use crate::upload::{Source, Upload};

///Handle on the HTTP engine plus the defaults applied to every request made
///through it.
///
/// This models the shared state involved in a group of requests: one engine
/// (with its connection pool) and one [`Defaults`] stack. Cloning is cheap;
/// clones share the engine.
#[derive(Debug, Clone, Default)]
pub struct Client {
    pub(crate) http: reqwest::Client,
    pub(crate) defaults: Defaults,
}

impl Client {
    ///Client with the library defaults.
    pub fn new() -> Client {
        Client::default()
    }

    ///Client with a caller-supplied default stack.
    pub fn with_defaults(defaults: Defaults) -> Client {
        Client {
            http: reqwest::Client::new(),
            defaults,
        }
    }

    ///Start a request with an explicit verb.
    ///
    /// `base` and `path` are concatenated verbatim; pass an empty `path` when
    /// `base` is already the full URL.
    pub fn request(&self, method: Method, base: &str, path: &str) -> Request<'_> {
        Request::new(self, method, base, path)
    }

    ///GET request builder.
    pub fn get(&self, base: &str, path: &str) -> Request<'_> {
        self.request(Method::Get, base, path)
    }

    ///POST request builder.
    pub fn post(&self, base: &str, path: &str) -> Request<'_> {
        self.request(Method::Post, base, path)
    }

    ///PUT request builder.
    pub fn put(&self, base: &str, path: &str) -> Request<'_> {
        self.request(Method::Put, base, path)
    }

    ///DELETE request builder.
    pub fn delete(&self, base: &str, path: &str) -> Request<'_> {
        self.request(Method::Delete, base, path)
    }

    ///HEAD request builder.
    pub fn head(&self, base: &str, path: &str) -> Request<'_> {
        self.request(Method::Head, base, path)
    }

    ///OPTIONS request builder.
    pub fn options(&self, base: &str, path: &str) -> Request<'_> {
        self.request(Method::Options, base, path)
    }

    ///CONNECT request builder. Whether the verb is honored is up to the engine.
    pub fn connect(&self, base: &str, path: &str) -> Request<'_> {
        self.request(Method::Connect, base, path)
    }

    ///Start an upload of `source` to `to`.
    ///
    /// With neither [`parameters`](Upload::parameters) nor a
    /// [`file_key`](Upload::file_key) the source streams up as the raw request
    /// body; either one switches the dispatch to a multipart form.
    pub fn upload(&self, source: Source, to: &str) -> Upload<'_> {
        Upload::new(self, source, to)
    }

    ///Start a download of `url`.
    pub fn download(&self, url: &str) -> Download<'_> {
        Download::new(self, url)
    }
}
