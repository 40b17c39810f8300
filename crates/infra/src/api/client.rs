//! Authenticated API client
//!
//! Issues requests against `{base_url}/api/v1` with a bearer token. A 401
//! response triggers one token renewal and one retry of the same request;
//! nothing else is retried.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use ofleet_domain::constants::API_VERSION_PATH;
use ofleet_domain::OfleetConfig;
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use super::auth::{AccessTokenProvider, ApiAuthService};
use super::errors::ApiError;
use crate::http::HttpClient;

/// Authenticated client for the OFleet REST API
pub struct ApiClient {
    http_client: Arc<HttpClient>,
    auth: Arc<dyn AccessTokenProvider>,
    api_url: String,
    timeout: Duration,
}

impl ApiClient {
    /// Create a client that authenticates with the configured OAuth
    /// credentials
    ///
    /// No network I/O happens here; the first token is fetched on the first
    /// request.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Config` if the configuration is invalid or the HTTP
    /// clients cannot be built
    pub fn new(config: OfleetConfig) -> Result<Self, ApiError> {
        config.validate()?;
        let auth = Arc::new(ApiAuthService::new(&config)?);
        Self::with_auth(config, auth)
    }

    /// Shorthand for [`Self::new`] with default transport settings
    ///
    /// # Errors
    ///
    /// See [`Self::new`]
    pub fn with_credentials(
        base_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Result<Self, ApiError> {
        Self::new(OfleetConfig::new(base_url, client_id, client_secret))
    }

    /// Create a client with an explicit token provider
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Config` if the HTTP client cannot be built
    pub fn with_auth(
        config: OfleetConfig,
        auth: Arc<dyn AccessTokenProvider>,
    ) -> Result<Self, ApiError> {
        let mut builder =
            HttpClient::builder().accept_invalid_certs(config.accept_invalid_certs);
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }
        let http_client = builder.build()?;

        Ok(Self {
            http_client: Arc::new(http_client),
            auth,
            api_url: format!("{}{}", config.normalized_base_url(), API_VERSION_PATH),
            timeout: config.timeout(),
        })
    }

    /// Create a builder for fluent configuration
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    /// Versioned API root, e.g. `https://fleet.example.com/api/v1`
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Execute a GET request and decode the JSON response
    ///
    /// # Arguments
    ///
    /// * `path` - API path below `/api/v1` (e.g., "/agencies/list")
    ///
    /// # Errors
    ///
    /// Returns error if the request fails, the server answers with a
    /// non-success status, or the body cannot be decoded as `T`
    #[instrument(skip(self), fields(path = %path))]
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let exchange = self.execute(Method::GET, path, |request| Ok(request)).await?;
        let result = exchange.decode_json().await?;

        info!(path = %path, "GET request successful");
        Ok(result)
    }

    /// Execute a GET request and return the body unparsed
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the server answers with a
    /// non-success status
    #[instrument(skip(self), fields(path = %path))]
    pub async fn get_raw(&self, path: &str) -> Result<Bytes, ApiError> {
        let exchange = self.execute(Method::GET, path, |request| Ok(request)).await?;
        let (_, body) = exchange.success_body().await?;

        info!(path = %path, size = body.len(), "GET (raw) request successful");
        Ok(body)
    }

    /// Execute a POST request with a JSON body
    ///
    /// # Arguments
    ///
    /// * `path` - API path
    /// * `body` - Request body, serialized structurally with serde
    ///
    /// # Errors
    ///
    /// Returns error if the body cannot be serialized, the request fails, or
    /// the response cannot be decoded as `R`
    #[instrument(skip(self, body), fields(path = %path))]
    pub async fn post<T: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<R, ApiError> {
        let body_json = serde_json::to_value(body)
            .map_err(|e| ApiError::InvalidInput(format!("Failed to serialize body: {e}")))?;

        let exchange =
            self.execute(Method::POST, path, |request| Ok(request.json(&body_json))).await?;
        let result = exchange.decode_json().await?;

        info!(path = %path, "POST request successful");
        Ok(result)
    }

    /// Upload one file as a multipart form
    ///
    /// # Arguments
    ///
    /// * `path` - API path
    /// * `field_name` - Name of the single file part
    /// * `content` - File bytes
    /// * `file_name` - File name announced in the part
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the response cannot be decoded
    #[instrument(skip(self, content), fields(path = %path, size = content.len()))]
    pub async fn upload<R: DeserializeOwned>(
        &self,
        path: &str,
        field_name: &str,
        content: &[u8],
        file_name: &str,
    ) -> Result<R, ApiError> {
        // Multipart bodies are consumed on send, so each attempt builds its own.
        let build_form = |request: RequestBuilder| {
            let part = Part::bytes(content.to_vec())
                .file_name(file_name.to_string())
                .mime_str("application/octet-stream")
                .map_err(|e| ApiError::InvalidInput(format!("Invalid upload part: {e}")))?;
            Ok(request.multipart(Form::new().part(field_name.to_string(), part)))
        };

        let exchange = self.execute(Method::POST, path, build_form).await?;
        let result = exchange.decode_json().await?;

        info!(path = %path, field = %field_name, "Upload successful");
        Ok(result)
    }

    /// Send the request, renewing the token and retrying once on 401
    async fn execute<F>(&self, method: Method, path: &str, build: F) -> Result<Exchange, ApiError>
    where
        F: Fn(RequestBuilder) -> Result<RequestBuilder, ApiError>,
    {
        let url = format!("{}{}", self.api_url, path);
        debug!(%method, url = %url, "API request");

        let token = self.auth.access_token().await?;
        let exchange = self.send_once(&method, url, &token, &build).await?;

        if exchange.response.status() != StatusCode::UNAUTHORIZED {
            return Ok(exchange);
        }

        let url = exchange.url;
        drop(exchange.response);
        warn!(%method, url = %url, "Request rejected with 401, renewing token and retrying once");
        let token = self.auth.refresh_after_rejection(&token).await?;
        self.send_once(&method, url, &token, &build).await
    }

    /// One attempt; its deadline also bounds the later body read
    async fn send_once<F>(
        &self,
        method: &Method,
        url: String,
        token: &str,
        build: &F,
    ) -> Result<Exchange, ApiError>
    where
        F: Fn(RequestBuilder) -> Result<RequestBuilder, ApiError>,
    {
        let request = build(self.http_client.request(method.clone(), &url).bearer_auth(token))?;
        let deadline = Instant::now() + self.timeout;

        match tokio::time::timeout_at(deadline, self.http_client.send(request)).await {
            Ok(Ok(response)) => Ok(Exchange { response, url, deadline, timeout: self.timeout }),
            Ok(Err(err)) => Err(ApiError::from(err)),
            Err(_) => Err(ApiError::Timeout(self.timeout)),
        }
    }
}

/// A response whose body must arrive before the attempt's deadline
struct Exchange {
    response: Response,
    url: String,
    deadline: Instant,
    timeout: Duration,
}

impl Exchange {
    /// Read the whole body; a non-success status becomes `ApiError::Remote`
    async fn success_body(self) -> Result<(StatusCode, Bytes), ApiError> {
        let Self { response, url, deadline, timeout } = self;
        let status = response.status();

        let body = match tokio::time::timeout_at(deadline, response.bytes()).await {
            Ok(Ok(body)) => body,
            // The status is what matters for a failed exchange.
            Ok(Err(_)) if !status.is_success() => Bytes::new(),
            Ok(Err(e)) => {
                return Err(ApiError::Transport(format!("Failed to read response body: {e}")))
            }
            Err(_) => return Err(ApiError::Timeout(timeout)),
        };

        if !status.is_success() {
            return Err(ApiError::Remote {
                status: status.as_u16(),
                url,
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        Ok((status, body))
    }

    async fn decode_json<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        let url = self.url.clone();
        let (status, body) = self.success_body().await?;

        // An empty body (including 204/205) decodes like JSON `null`.
        if body.iter().all(u8::is_ascii_whitespace) {
            return serde_json::from_value(serde_json::Value::Null).map_err(|_| {
                ApiError::Decode(format!(
                    "Empty response ({}) from {url} cannot be decoded into the expected type",
                    status.as_u16()
                ))
            });
        }

        serde_json::from_slice(&body)
            .map_err(|e| ApiError::Decode(format!("Failed to parse response from {url}: {e}")))
    }
}

/// Builder for API client
#[derive(Default)]
pub struct ApiClientBuilder {
    config: Option<OfleetConfig>,
    auth: Option<Arc<dyn AccessTokenProvider>>,
}

impl ApiClientBuilder {
    /// Set the client configuration
    pub fn config(mut self, config: OfleetConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Override the token provider (defaults to OAuth with the configured
    /// credentials)
    pub fn auth(mut self, auth: Arc<dyn AccessTokenProvider>) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Build the API client
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is missing or client creation fails
    pub fn build(self) -> Result<ApiClient, ApiError> {
        let config =
            self.config.ok_or_else(|| ApiError::Config("Configuration not set".to_string()))?;

        match self.auth {
            Some(auth) => ApiClient::with_auth(config, auth),
            None => ApiClient::new(config),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    /// Hands out `initial` first and `refreshed` after a rejection
    struct MockAuthProvider {
        initial: String,
        refreshed: String,
        refresh_calls: AtomicUsize,
        fail_refresh: bool,
    }

    impl MockAuthProvider {
        fn new(initial: &str, refreshed: &str) -> Self {
            Self {
                initial: initial.to_string(),
                refreshed: refreshed.to_string(),
                refresh_calls: AtomicUsize::new(0),
                fail_refresh: false,
            }
        }

        fn failing(initial: &str) -> Self {
            Self { fail_refresh: true, ..Self::new(initial, "") }
        }
    }

    #[async_trait]
    impl AccessTokenProvider for MockAuthProvider {
        async fn access_token(&self) -> Result<String, ApiError> {
            if self.refresh_calls.load(Ordering::SeqCst) == 0 {
                Ok(self.initial.clone())
            } else {
                Ok(self.refreshed.clone())
            }
        }

        async fn refresh_after_rejection(&self, _rejected: &str) -> Result<String, ApiError> {
            self.refresh_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_refresh {
                return Err(ApiError::Auth("refresh rejected".to_string()));
            }
            Ok(self.refreshed.clone())
        }
    }

    #[derive(Debug, serde::Serialize, serde::Deserialize, PartialEq)]
    struct TestResponse {
        message: String,
    }

    fn client_for(server: &MockServer, auth: Arc<MockAuthProvider>) -> ApiClient {
        let config = OfleetConfig::new(server.uri(), "id", "secret");
        ApiClient::with_auth(config, auth).unwrap()
    }

    #[tokio::test]
    async fn test_get_with_json_response() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/test"))
            .and(header("Authorization", "Bearer test-token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(TestResponse { message: "success".to_string() }),
            )
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server, Arc::new(MockAuthProvider::new("test-token", "")));

        let result: Result<TestResponse, ApiError> = client.get("/test").await;
        assert_eq!(result.unwrap().message, "success");
    }

    #[tokio::test]
    async fn test_get_with_204_no_content() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/no-content"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server, Arc::new(MockAuthProvider::new("t", "")));

        // () should deserialize from null successfully
        let result: Result<(), ApiError> = client.get("/no-content").await;
        assert!(result.is_ok());

        let value: serde_json::Value = client.get("/no-content").await.unwrap();
        assert!(value.is_null());
    }

    #[tokio::test]
    async fn test_get_raw_returns_bytes() {
        let mock_server = MockServer::start().await;
        let pdf = b"%PDF-1.4 fake".to_vec();

        Mock::given(method("GET"))
            .and(path("/api/v1/print/contract/7"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(pdf.clone()))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server, Arc::new(MockAuthProvider::new("t", "")));

        let body = client.get_raw("/print/contract/7").await.unwrap();
        assert_eq!(body.as_ref(), pdf.as_slice());
    }

    #[tokio::test]
    async fn test_post_sends_json_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/v1/create"))
            .and(body_json(serde_json::json!({"data": "test"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(TestResponse { message: "created".to_string() }),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server, Arc::new(MockAuthProvider::new("t", "")));

        let request = serde_json::json!({"data": "test"});
        let result: TestResponse = client.post("/create", &request).await.unwrap();
        assert_eq!(result.message, "created");
    }

    #[tokio::test]
    async fn test_non_success_status_is_remote_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/notfound"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Not found"))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server, Arc::new(MockAuthProvider::new("t", "")));

        let err = client.get::<serde_json::Value>("/notfound").await.unwrap_err();
        match err {
            ApiError::Remote { status, url, body } => {
                assert_eq!(status, 404);
                assert!(url.ends_with("/api/v1/notfound"));
                assert_eq!(body, "Not found");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invalid_json_is_decode_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/garbled"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server, Arc::new(MockAuthProvider::new("t", "")));

        let err = client.get::<serde_json::Value>("/garbled").await.unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[tokio::test]
    async fn test_token_refresh_on_401_then_retry() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/data"))
            .and(header("Authorization", "Bearer old-token"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/v1/data"))
            .and(header("Authorization", "Bearer new-token"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(TestResponse { message: "ok".into() }),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let auth = Arc::new(MockAuthProvider::new("old-token", "new-token"));
        let client = client_for(&mock_server, auth.clone());

        let result: TestResponse = client.get("/data").await.unwrap();
        assert_eq!(result.message, "ok");
        assert_eq!(auth.refresh_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_second_401_is_remote_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/data"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
            .expect(2)
            .mount(&mock_server)
            .await;

        let auth = Arc::new(MockAuthProvider::new("old-token", "new-token"));
        let client = client_for(&mock_server, auth.clone());

        let err = client.get::<serde_json::Value>("/data").await.unwrap_err();
        assert_eq!(err.status(), Some(401));
        assert_eq!(auth.refresh_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_refresh_failure_is_auth_error_without_retry() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/data"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server, Arc::new(MockAuthProvider::failing("old-token")));

        let err = client.get::<serde_json::Value>("/data").await.unwrap_err();
        assert!(matches!(err, ApiError::Auth(_)));
    }

    #[tokio::test]
    async fn test_upload_sends_single_named_part() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/v1/clients/client/5/update/id-card"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": 5})))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server, Arc::new(MockAuthProvider::new("t", "")));

        let result: serde_json::Value = client
            .upload("/clients/client/5/update/id-card", "idCard", b"image-bytes", "card.png")
            .await
            .unwrap();
        assert_eq!(result["id"], 5);

        let requests = mock_server.received_requests().await.unwrap();
        let content_type = requests[0].headers.get("content-type").unwrap().to_str().unwrap();
        assert!(content_type.starts_with("multipart/form-data"));
        let body = String::from_utf8_lossy(&requests[0].body);
        assert!(body.contains("name=\"idCard\""));
        assert!(body.contains("filename=\"card.png\""));
        assert!(body.contains("image-bytes"));
    }

    #[tokio::test]
    async fn test_upload_retries_with_fresh_form_after_401() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/v1/upload"))
            .and(header("Authorization", "Bearer old-token"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path("/api/v1/upload"))
            .and(header("Authorization", "Bearer new-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client =
            client_for(&mock_server, Arc::new(MockAuthProvider::new("old-token", "new-token")));

        let result: serde_json::Value =
            client.upload("/upload", "file", b"abc", "a.txt").await.unwrap();
        assert!(result.is_object());

        let requests = mock_server.received_requests().await.unwrap();
        assert!(String::from_utf8_lossy(&requests[1].body).contains("abc"));
    }

    #[tokio::test]
    async fn test_timeout_is_reported() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/slow"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&mock_server)
            .await;

        let mut config = OfleetConfig::new(mock_server.uri(), "id", "secret");
        config.timeout_secs = 1;
        let client =
            ApiClient::with_auth(config, Arc::new(MockAuthProvider::new("t", ""))).unwrap();

        let err = client.get::<serde_json::Value>("/slow").await.unwrap_err();
        assert!(matches!(err, ApiError::Timeout(d) if d == Duration::from_secs(1)));
    }

    /// Serves headers announcing a body that never finishes
    async fn stalled_body_server() -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0_u8; 4096];
            let _ = socket.read(&mut request).await;
            let _ = socket
                .write_all(
                    b"HTTP/1.1 200 OK\r\nContent-Type: application/pdf\r\n\
                      Content-Length: 1000\r\n\r\n%PDF-partial",
                )
                .await;
            tokio::time::sleep(Duration::from_secs(10)).await;
        });

        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_stalled_body_hits_deadline() {
        let mut config = OfleetConfig::new(stalled_body_server().await, "id", "secret");
        config.timeout_secs = 1;
        let client =
            ApiClient::with_auth(config, Arc::new(MockAuthProvider::new("t", ""))).unwrap();

        let started = std::time::Instant::now();
        let err = client.get_raw("/print/contract/1").await.unwrap_err();

        assert!(matches!(err, ApiError::Timeout(d) if d == Duration::from_secs(1)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_api_url_trims_trailing_slash() {
        let config = OfleetConfig::new("https://fleet.example.com/", "id", "secret");
        let client = ApiClient::new(config).unwrap();
        assert_eq!(client.api_url(), "https://fleet.example.com/api/v1");
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let result = ApiClient::with_credentials("", "id", "secret");
        assert!(matches!(result, Err(ApiError::Config(_))));
    }

    #[tokio::test]
    async fn test_builder_pattern() {
        let auth = Arc::new(MockAuthProvider::new("t", ""));
        let config = OfleetConfig::new("https://fleet.example.com", "id", "secret");

        assert!(ApiClient::builder().config(config.clone()).auth(auth).build().is_ok());
        assert!(ApiClient::builder().config(config).build().is_ok());
    }

    #[tokio::test]
    async fn test_builder_missing_config() {
        let result = ApiClient::builder().build();
        assert!(matches!(result, Err(ApiError::Config(_))));
    }
}
