use std::time::Duration;

use reqwest::header::{HeaderName, HeaderValue};
use tracing::debug;

use crate::client::Client;
use crate::config::{CallOptions, Method, Parameters, RequestEncoding, Resolved, ResponseMode};
use crate::response::{self, Response};
use crate::Error;

///Builder for one dispatched request.
///
/// Created by the verb helpers on [`Client`]. The setters override the
/// client's defaults for this call only; headers and accepted content types
/// merge into the default stack instead of replacing it. Dropped without
/// [`perform`](Request::perform), nothing is sent.
pub struct Request<'a> {
    client: &'a Client,
    method: Method,
    base: String,
    path: String,
    call: CallOptions,
}

impl<'a> Request<'a> {
    pub(crate) fn new(client: &'a Client, method: Method, base: &str, path: &str) -> Request<'a> {
        Request {
            client,
            method,
            base: base.to_owned(),
            path: path.to_owned(),
            call: CallOptions::default(),
        }
    }

    ///Attach the full parameter map for this call.
    pub fn parameters(mut self, parameters: Parameters) -> Self {
        self.call.parameters = Some(parameters);
        self
    }

    ///Attach one parameter.
    pub fn parameter(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.call
            .parameters
            .get_or_insert_with(Parameters::new)
            .insert(key.to_owned(), value.into());
        self
    }

    ///Timeout for this call.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.call.timeout = Some(timeout);
        self
    }

    ///Parameter placement for this call.
    pub fn encoding(mut self, encoding: RequestEncoding) -> Self {
        self.call.encoding = Some(encoding);
        self
    }

    ///Response handling for this call.
    pub fn response_mode(mut self, response_mode: ResponseMode) -> Self {
        self.call.response_mode = Some(response_mode);
        self
    }

    ///Set (or unset) a header field.
    pub fn header(mut self, key: HeaderName, value: Option<HeaderValue>) -> Self {
        match value {
            Some(value) => {
                self.call.headers.insert(key, value);
            }
            None => {
                self.call.headers.remove(&key);
            }
        }
        self
    }

    ///Accept an extra response content type for this call.
    pub fn accept_content_type(mut self, content_type: &str) -> Self {
        self.call
            .accepted_content_types
            .insert(content_type.to_ascii_lowercase());
        self
    }

    ///Resolve the option stack and dispatch.
    ///
    /// # Errors
    /// [`Error::InvalidURL`] before anything is sent; [`Error::Transport`],
    /// [`Error::ContentType`] or [`Error::Decode`] from the response side.
    pub async fn perform(self) -> Result<Response, Error> {
        let Request {
            client,
            method,
            base,
            path,
            call,
        } = self;
        let resolved = Resolved::resolve(method, &base, &path, call, &client.defaults)?;
        debug!(method = ?resolved.method, url = %resolved.url, "dispatching request");
        let raw = send(&client.http, &resolved).await?;
        response::decode(
            raw,
            &resolved.accepted_content_types,
            resolved.response_mode,
            resolved.method == Method::Head,
        )
        .await
    }
}

fn apply_parameters(
    builder: reqwest::RequestBuilder,
    method: Method,
    encoding: RequestEncoding,
    parameters: &Parameters,
) -> reqwest::RequestBuilder {
    match encoding {
        RequestEncoding::JsonBody => builder.json(parameters),
        RequestEncoding::UrlDefault if method.encodes_in_query() => builder.query(parameters),
        RequestEncoding::UrlDefault | RequestEncoding::UrlEncodedBody => builder.form(parameters),
        RequestEncoding::UrlQueryString => builder.query(parameters),
    }
}

async fn send(http: &reqwest::Client, resolved: &Resolved) -> Result<reqwest::Response, Error> {
    let mut builder = http
        .request(resolved.method.as_http(), resolved.url.clone())
        .timeout(resolved.timeout)
        .headers(resolved.headers.clone());
    if let Some(parameters) = &resolved.parameters {
        builder = apply_parameters(builder, resolved.method, resolved.encoding, parameters);
    }
    Ok(builder.send().await?)
}

#[cfg(test)]
mod test {
    use crate::{Client, Defaults, Error, Payload, RequestEncoding, ResponseMode};
    use httpmock::prelude::*;
    use reqwest::header::HeaderValue;
    use serde_json::json;

    #[tokio::test]
    async fn get_json() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/users/1");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"id":1}"#);
        });

        let response = Client::new()
            .get(&server.base_url(), "/users/1")
            .perform()
            .await
            .unwrap();

        mock.assert();
        assert_eq!(response.status(), 200);
        assert_eq!(response.payload(), &Payload::Json(json!({"id": 1})));
    }

    #[tokio::test]
    async fn query_parameters_for_get() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/search").query_param("q", "rust");
            then.status(200).json_body(json!({"hits": 0}));
        });

        Client::new()
            .get(&server.base_url(), "/search")
            .parameter("q", "rust")
            .perform()
            .await
            .unwrap();

        mock.assert();
    }

    #[tokio::test]
    async fn json_body_for_post() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/users")
                .header("content-type", "application/json")
                .json_body(json!({"name": "sam"}));
            then.status(200).json_body(json!({"id": 2}));
        });

        Client::new()
            .post(&server.base_url(), "/users")
            .encoding(RequestEncoding::JsonBody)
            .parameter("name", "sam")
            .perform()
            .await
            .unwrap();

        mock.assert();
    }

    #[tokio::test]
    async fn form_body_for_post_by_default() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/login")
                .header("content-type", "application/x-www-form-urlencoded")
                .body_includes("user=sam")
                .body_includes("password=2");
            then.status(200).json_body(json!({"ok": true}));
        });

        // UrlDefault moves parameters into the body for POST
        Client::new()
            .post(&server.base_url(), "/login")
            .parameter("user", "sam")
            .parameter("password", "2")
            .perform()
            .await
            .unwrap();

        mock.assert();
    }

    #[tokio::test]
    async fn call_header_overrides_default_header() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/whoami")
                .header("x-app", "call")
                .header("x-keep", "kept");
            then.status(200).json_body(json!({}));
        });

        let defaults = Defaults::new()
            .header("x-app".parse().unwrap(), HeaderValue::from_static("base"))
            .header("x-keep".parse().unwrap(), HeaderValue::from_static("kept"));
        Client::with_defaults(defaults)
            .get(&server.base_url(), "/whoami")
            .header("x-app".parse().unwrap(), Some(HeaderValue::from_static("call")))
            .perform()
            .await
            .unwrap();

        mock.assert();
    }

    #[tokio::test]
    async fn unacceptable_content_type_is_an_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/report");
            then.status(200)
                .header("content-type", "text/csv")
                .body("a,b\n1,2\n");
        });

        let result = Client::new()
            .get(&server.base_url(), "/report")
            .perform()
            .await;

        assert!(matches!(result, Err(Error::ContentType(ref found)) if found == "text/csv"));
    }

    #[tokio::test]
    async fn per_call_accept_content_type_widens_the_set() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/report");
            then.status(200)
                .header("content-type", "text/csv")
                .body("a,b\n1,2\n");
        });

        let response = Client::new()
            .get(&server.base_url(), "/report")
            .accept_content_type("text/csv")
            .response_mode(ResponseMode::Bytes)
            .perform()
            .await
            .unwrap();

        assert_eq!(
            response.payload().as_bytes().unwrap().as_ref(),
            b"a,b\n1,2\n"
        );
    }

    #[tokio::test]
    async fn bytes_mode_passes_anything_through() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/blob");
            then.status(200)
                .header("content-type", "text/plain")
                .body("not json at all {{{");
        });

        let response = Client::new()
            .get(&server.base_url(), "/blob")
            .response_mode(ResponseMode::Bytes)
            .perform()
            .await
            .unwrap();

        assert_eq!(
            response.payload().as_bytes().unwrap().as_ref(),
            b"not json at all {{{"
        );
    }

    #[tokio::test]
    async fn invalid_json_is_a_decode_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/broken");
            then.status(200)
                .header("content-type", "application/json")
                .body("{not json");
        });

        let result = Client::new()
            .get(&server.base_url(), "/broken")
            .perform()
            .await;

        assert!(matches!(result, Err(Error::Decode(_))));
    }

    #[tokio::test]
    async fn check_status_flags_server_errors() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/boom");
            then.status(500).json_body(json!({"error": "oops"}));
        });

        let response = Client::new()
            .get(&server.base_url(), "/boom")
            .perform()
            .await
            .unwrap();

        assert!(matches!(
            response.check_status(),
            Err(Error::StatusCode(500))
        ));
    }

    #[tokio::test]
    async fn invalid_url_fails_before_dispatch() {
        let result = Client::new().get("users/", "1").perform().await;
        assert!(matches!(result, Err(Error::InvalidURL(_))));
    }

    #[tokio::test]
    async fn head_with_empty_body_decodes_as_null() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(httpmock::Method::HEAD).path("/ping");
            then.status(200).header("content-type", "application/json");
        });

        let response = Client::new()
            .head(&server.base_url(), "/ping")
            .perform()
            .await
            .unwrap();

        assert_eq!(response.payload(), &Payload::Json(serde_json::Value::Null));
    }
}
