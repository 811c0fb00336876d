/*! Per-verb HTTP helpers with layered defaults for Rust

This library can be compared to calling [reqwest](https://github.com/seanmonstar/reqwest) by hand, but rather
than assembling each request from scratch, it resolves a small set of per-call options against a configurable
default stack and hands the merged result to the engine. All transport work (TLS, pooling, redirects, HTTP/2)
stays in the engine; this crate only decides *what* gets dispatched and *how* the response comes back.

Advantages:
* One-line GET/POST/PUT/DELETE/HEAD/OPTIONS/CONNECT with sane defaults for timeout, headers and encoding
* A single [`Defaults`] value replaces scattered per-request configuration
* Upload and download helpers with progress reporting; multipart assembly is chosen automatically
* Responses come back pre-validated (content type) and pre-decoded (JSON or raw bytes)

Disadvantages:
* No retry, caching or reachability logic; the engine or the caller owns those
* Response bodies are buffered before decoding, not streamed to the caller

```no_run
# async fn example() -> Result<(), fetchr::Error> {
let client = fetchr::Client::new();
let user: serde_json::Value = client
    .get("https://api.example.com/", "users/1")
    .perform()
    .await?
    .json()?;
# Ok(())
# }
```
*/

mod client;
mod config;
mod download;
mod request;
mod response;
mod upload;

pub use client::Client;
pub use config::{Defaults, Method, Parameters, RequestEncoding, ResponseMode, DEFAULT_TIMEOUT};
pub use download::Download;
pub use request::Request;
pub use response::{Downloaded, Payload, Response};
pub use upload::{Source, Upload};

use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
#[non_exhaustive]
pub enum Error {
    ///Base url and path do not concatenate into an absolute URL.
    #[error("invalid url {0}")]
    InvalidURL(String),
    ///The response's Content-Type is outside the accepted set.
    #[error("unacceptable content type {0}")]
    ContentType(String),
    ///Whatever the engine reported: DNS, connect, TLS, timeout.
    #[error("transport error {0}")]
    Transport(#[from] reqwest::Error),
    ///A response advertised as JSON did not parse.
    #[error("json decode error {0}")]
    Decode(#[from] serde_json::Error),
    ///Local file access during upload or download.
    #[error("io error {0}")]
    Io(#[from] std::io::Error),
    ///Raised by the `check_status` helpers on a non-2xx response.
    #[error("status code {0}")]
    StatusCode(u16),
}
