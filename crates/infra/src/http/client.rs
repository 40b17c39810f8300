use ofleet_domain::OfleetError;
use reqwest::{Client as ReqwestClient, Method, RequestBuilder, Response};
use tracing::{debug, warn};

/// Thin wrapper over a pooled `reqwest` client.
///
/// Sends exactly one attempt per call; the only retry in the client is the
/// authentication retry in [`crate::api::ApiClient`].
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: ReqwestClient,
}

impl HttpClient {
    /// Start building a new HTTP client.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Convenience constructor with default configuration.
    pub fn new() -> Result<Self, OfleetError> {
        Self::builder().build()
    }

    /// Create a request builder using the underlying reqwest client.
    pub fn request<U>(&self, method: Method, url: U) -> RequestBuilder
    where
        U: reqwest::IntoUrl,
    {
        self.client.request(method, url)
    }

    /// Execute the provided request builder once.
    ///
    /// Any response, whatever its status, is returned as `Ok`.
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response, OfleetError> {
        let request = builder
            .build()
            .map_err(|err| OfleetError::InvalidInput(format!("invalid request: {err}")))?;

        let method = request.method().clone();
        let url = request.url().clone();
        debug!(%method, %url, "sending HTTP request");

        match self.client.execute(request).await {
            Ok(response) => {
                debug!(%method, %url, status = %response.status(), "received HTTP response");
                Ok(response)
            }
            Err(err) => {
                debug!(%method, %url, error = %err, "HTTP request failed");
                Err(map_transport_error(&err))
            }
        }
    }
}

fn map_transport_error(err: &reqwest::Error) -> OfleetError {
    if err.is_connect() {
        OfleetError::Network(format!("connection failed: {err}"))
    } else {
        OfleetError::Network(err.to_string())
    }
}

/// Builder for [`HttpClient`].
#[derive(Debug, Default)]
pub struct HttpClientBuilder {
    user_agent: Option<String>,
    accept_invalid_certs: bool,
}

impl HttpClientBuilder {
    /// Set the `User-Agent` header.
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Skip TLS certificate verification (self-signed deployments only).
    pub fn accept_invalid_certs(mut self, enabled: bool) -> Self {
        self.accept_invalid_certs = enabled;
        self
    }

    /// Build the underlying reqwest client.
    pub fn build(self) -> Result<HttpClient, OfleetError> {
        let mut builder = ReqwestClient::builder();

        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        if self.accept_invalid_certs {
            warn!("TLS certificate verification disabled for API requests");
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder
            .build()
            .map_err(|err| OfleetError::Config(format!("failed to build HTTP client: {err}")))?;

        Ok(HttpClient { client })
    }
}
