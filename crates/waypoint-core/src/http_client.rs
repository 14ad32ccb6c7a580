use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Query parameters whose values must never reach logs.
const SENSITIVE_PARAMS: [&str; 3] = ["key", "api_key", "apikey"];

/// Minimal HTTP method set needed by provider adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// Authentication strategy applied to outgoing HTTP requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpAuth {
    None,
    Header { name: String, value: String },
    QueryParam { name: String, value: String },
}

impl HttpAuth {
    pub fn apply(&self, request: &mut HttpRequest) {
        match self {
            Self::None => {}
            Self::Header { name, value } => {
                request
                    .headers
                    .insert(name.to_ascii_lowercase(), value.clone());
            }
            Self::QueryParam { name, value } => {
                let separator = if request.url.contains('?') { '&' } else { '?' };
                request.url = format!(
                    "{}{separator}{name}={}",
                    request.url,
                    urlencoding::encode(value)
                );
            }
        }
    }
}

/// HTTP request envelope used by adapter transport calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
    pub timeout: Duration,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: BTreeMap::new(),
            body: None,
            timeout: Duration::from_secs(15),
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_auth(mut self, auth: &HttpAuth) -> Self {
        auth.apply(&mut self);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// URL with credential query values masked, safe for logging.
    pub fn redacted_url(&self) -> String {
        let Some((base, query)) = self.url.split_once('?') else {
            return self.url.clone();
        };

        let pairs = query
            .split('&')
            .map(|pair| match pair.split_once('=') {
                Some((name, _)) if SENSITIVE_PARAMS.contains(&name.to_ascii_lowercase().as_str()) => {
                    format!("{name}=***")
                }
                _ => pair.to_owned(),
            })
            .collect::<Vec<_>>();

        format!("{base}?{}", pairs.join("&"))
    }
}

/// HTTP response envelope returned by an adapter transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn ok_json(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn with_status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Transport-level HTTP error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpError {
    message: String,
    timed_out: bool,
}

impl HttpError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timed_out: false,
        }
    }

    pub fn timed_out(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timed_out: true,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn is_timeout(&self) -> bool {
        self.timed_out
    }
}

impl Display for HttpError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for HttpError {}

pub type HttpFuture<'a> = Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>>;

/// Adapter transport contract.
///
/// Dropping the returned future must abandon the underlying request and
/// release its connection; the timeout controller relies on this.
pub trait HttpClient: Send + Sync {
    fn execute<'a>(&'a self, request: HttpRequest) -> HttpFuture<'a>;
}

/// Transport returning one canned response and recording every request.
///
/// Used for deterministic offline tests of adapter request shaping and parsing.
#[derive(Debug)]
pub struct StaticHttpClient {
    response: Result<HttpResponse, HttpError>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl StaticHttpClient {
    pub fn new(response: Result<HttpResponse, HttpError>) -> Self {
        Self {
            response,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn ok_json(body: impl Into<String>) -> Self {
        Self::new(Ok(HttpResponse::ok_json(body)))
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl HttpClient for StaticHttpClient {
    fn execute<'a>(&'a self, request: HttpRequest) -> HttpFuture<'a> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(request);
        let response = self.response.clone();
        Box::pin(async move { response })
    }
}

/// Production HTTP client using reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: Arc<reqwest::Client>,
}

impl ReqwestHttpClient {
    /// Create a client identifying itself with `user_agent`.
    pub fn new(user_agent: &str) -> Self {
        Self {
            client: Arc::new(
                reqwest::Client::builder()
                    .user_agent(user_agent)
                    .build()
                    .unwrap_or_else(|_| reqwest::Client::new()),
            ),
        }
    }

    /// Create a ReqwestHttpClient with a custom reqwest::Client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client: Arc::new(client),
        }
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new(concat!("waypoint/", env!("CARGO_PKG_VERSION")))
    }
}

impl HttpClient for ReqwestHttpClient {
    fn execute<'a>(&'a self, request: HttpRequest) -> HttpFuture<'a> {
        Box::pin(async move {
            let mut builder = match request.method {
                HttpMethod::Get => self.client.get(&request.url),
                HttpMethod::Post => self.client.post(&request.url),
            };

            for (name, value) in &request.headers {
                builder = builder.header(name, value);
            }

            builder = builder.timeout(request.timeout);

            if let Some(body) = request.body {
                builder = builder.body(body);
            }

            // reqwest errors embed the URL; strip it so keys never leak into messages.
            let response = builder.send().await.map_err(|e| {
                let e = e.without_url();
                if e.is_timeout() {
                    HttpError::timed_out(format!("request timeout: {e}"))
                } else if e.is_connect() {
                    HttpError::new(format!("connection failed: {e}"))
                } else {
                    HttpError::new(format!("request failed: {e}"))
                }
            })?;

            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .map_err(|e| HttpError::new(format!("failed to read response body: {}", e.without_url())))?;

            Ok(HttpResponse { status, body })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_param_auth_appends_to_existing_query() {
        let request = HttpRequest::get("https://example.test/geocode/json?address=x")
            .with_auth(&HttpAuth::QueryParam {
                name: String::from("key"),
                value: String::from("secret key"),
            });

        assert_eq!(
            request.url,
            "https://example.test/geocode/json?address=x&key=secret%20key"
        );
    }

    #[test]
    fn custom_header_auth_preserves_name_and_value() {
        let request = HttpRequest::get("https://example.test/route").with_auth(&HttpAuth::Header {
            name: String::from("X-API-Key"),
            value: String::from("demo"),
        });

        assert_eq!(
            request.headers.get("x-api-key").map(String::as_str),
            Some("demo")
        );
    }

    #[test]
    fn redacted_url_masks_credentials_only() {
        let request = HttpRequest::get("https://example.test/json?address=Bangkok&key=abc123");
        assert_eq!(
            request.redacted_url(),
            "https://example.test/json?address=Bangkok&key=***"
        );
    }

    #[tokio::test]
    async fn static_client_records_requests() {
        let client = StaticHttpClient::ok_json("[]");
        let response = client
            .execute(HttpRequest::get("https://example.test/a"))
            .await
            .expect("canned response");

        assert!(response.is_success());
        assert_eq!(client.requests().len(), 1);
        assert_eq!(client.requests()[0].url, "https://example.test/a");
    }
}
