//! Mock implementations of the auth traits

// Test doubles keep error docs implicit; failures are scripted by the caller.
#![allow(clippy::missing_errors_doc)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::auth::{OAuthClientError, OAuthClientTrait, TokenSet};

type ScriptedResponses = Arc<Mutex<VecDeque<Result<TokenSet, OAuthClientError>>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Scripted OAuth client
///
/// Each grant pops the next queued response. When a queue is empty a fresh
/// token named after the call count is returned, so unscripted tests still
/// see distinct tokens.
#[derive(Debug, Clone, Default)]
pub struct MockOAuthClient {
    client_credentials_responses: ScriptedResponses,
    refresh_responses: ScriptedResponses,
    client_credentials_calls: Arc<AtomicUsize>,
    refresh_calls: Arc<AtomicUsize>,
    refresh_tokens_seen: Arc<Mutex<Vec<String>>>,
    delay: Option<Duration>,
}

impl MockOAuthClient {
    /// Create a new mock OAuth client with empty scripts
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long inside every grant (widens race windows in tests)
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue the result of the next client-credentials grant
    pub fn push_client_credentials(&self, response: Result<TokenSet, OAuthClientError>) {
        lock(&self.client_credentials_responses).push_back(response);
    }

    /// Queue the result of the next refresh-token grant
    pub fn push_refresh(&self, response: Result<TokenSet, OAuthClientError>) {
        lock(&self.refresh_responses).push_back(response);
    }

    /// Number of client-credentials requests seen
    #[must_use]
    pub fn client_credentials_calls(&self) -> usize {
        self.client_credentials_calls.load(Ordering::SeqCst)
    }

    /// Number of refresh requests seen
    #[must_use]
    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    /// Refresh tokens passed to `refresh_access_token`, in call order
    #[must_use]
    pub fn refresh_tokens_seen(&self) -> Vec<String> {
        lock(&self.refresh_tokens_seen).clone()
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl OAuthClientTrait for MockOAuthClient {
    async fn client_credentials(&self) -> Result<TokenSet, OAuthClientError> {
        let call = self.client_credentials_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.pause().await;

        lock(&self.client_credentials_responses).pop_front().unwrap_or_else(|| {
            Ok(TokenSet::new(
                format!("mock_access_token_{call}"),
                Some(format!("mock_refresh_token_{call}")),
                Some(3600),
                None,
            ))
        })
    }

    async fn refresh_access_token(
        &self,
        refresh_token: &str,
    ) -> Result<TokenSet, OAuthClientError> {
        let call = self.refresh_calls.fetch_add(1, Ordering::SeqCst) + 1;
        lock(&self.refresh_tokens_seen).push(refresh_token.to_string());
        self.pause().await;

        lock(&self.refresh_responses).pop_front().unwrap_or_else(|| {
            Ok(TokenSet::new(
                format!("refreshed_access_token_{call}"),
                Some(format!("refreshed_refresh_token_{call}")),
                Some(3600),
                None,
            ))
        })
    }
}
