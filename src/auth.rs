//! Credential providers injected into every HTTP-calling component.
//!
//! The game API authenticates with bearer tokens. Instead of a process-wide
//! token variable, each [`ApiClient`](crate::transports::http::ApiClient) receives a
//! [`TokenProvider`]. The provider hands out the current access token and,
//! when the API answers `401`, is asked once to [`refresh`](TokenProvider::refresh),
//! which returns the replacement token.
//!
//! Two providers ship with the crate:
//!
//! - [`StaticTokenProvider`]: a fixed token that cannot be refreshed
//! - [`RefreshingTokenProvider`]: logs in and refreshes against `/auth`
//!   (requires the `transport-http` feature)

use std::fmt;

use async_trait::async_trait;

use crate::error::{OceanSaverError, Result};

/// Access and refresh token pair issued by `/auth`.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Short-lived bearer token.
    pub access_token: String,
    /// Long-lived token used to obtain a new access token.
    pub refresh_token: Option<String>,
}

impl Credentials {
    /// Credentials with both tokens.
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: Some(refresh_token.into()),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &"<redacted>")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .finish()
    }
}

/// Supplies bearer tokens to HTTP clients.
#[async_trait]
pub trait TokenProvider: Send + Sync + 'static {
    /// The token to attach to the next request, if the user is signed in.
    async fn access_token(&self) -> Option<String>;

    /// Obtain a new access token after the API rejected the current one.
    ///
    /// # Errors
    ///
    /// Returns [`OceanSaverError::Unauthorized`] when no new token can be
    /// obtained; the caller then gives up without retrying.
    async fn refresh(&self) -> Result<String>;
}

/// A fixed token. Refreshing always fails.
#[derive(Clone, Default)]
pub struct StaticTokenProvider {
    token: Option<String>,
}

impl StaticTokenProvider {
    /// Provider that always returns `token`.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    /// Provider for anonymous requests (no `Authorization` header).
    pub fn anonymous() -> Self {
        Self::default()
    }
}

impl fmt::Debug for StaticTokenProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticTokenProvider")
            .field("has_token", &self.token.is_some())
            .finish()
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Option<String> {
        self.token.clone()
    }

    async fn refresh(&self) -> Result<String> {
        Err(OceanSaverError::Unauthorized)
    }
}

#[cfg(feature = "transport-http")]
pub use self::http::RefreshingTokenProvider;

#[cfg(feature = "transport-http")]
mod http {
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio::sync::{Mutex, RwLock};
    use tracing::{debug, info, warn};

    use super::{Credentials, TokenProvider};
    use crate::error::{OceanSaverError, Result};
    use crate::protocol::{LoginRequest, RefreshRequest, TokenResponse};

    /// Token provider backed by the `/auth` endpoints.
    ///
    /// A failed refresh signs the user out: stored credentials are cleared so
    /// later requests go out anonymously until [`login`](Self::login) succeeds.
    ///
    /// Refreshes are serialized. A caller that was waiting while another
    /// refresh replaced the access token gets that token instead of spending
    /// the (possibly rotated) refresh token a second time.
    #[derive(Clone)]
    pub struct RefreshingTokenProvider {
        http: reqwest::Client,
        base_url: Arc<str>,
        credentials: Arc<RwLock<Option<Credentials>>>,
        refreshing: Arc<Mutex<()>>,
    }

    impl RefreshingTokenProvider {
        /// Provider for the API at `base_url`, initially signed out.
        pub fn new(http: reqwest::Client, base_url: &str) -> Self {
            Self {
                http,
                base_url: Arc::from(base_url.trim_end_matches('/')),
                credentials: Arc::new(RwLock::new(None)),
                refreshing: Arc::new(Mutex::new(())),
            }
        }

        /// Seed the provider with previously stored credentials.
        #[must_use]
        pub fn with_credentials(self, credentials: Credentials) -> Self {
            // Fresh Arc, so nothing else can observe the lock yet.
            Self {
                credentials: Arc::new(RwLock::new(Some(credentials))),
                ..self
            }
        }

        /// Current credentials, e.g. for persisting between sessions.
        pub async fn credentials(&self) -> Option<Credentials> {
            self.credentials.read().await.clone()
        }

        /// Forget the stored credentials.
        pub async fn sign_out(&self) {
            *self.credentials.write().await = None;
        }

        /// Sign in with e-mail and password (`POST /auth`).
        ///
        /// # Errors
        ///
        /// [`OceanSaverError::Http`] when the server rejects the login,
        /// [`OceanSaverError::Transport`] on connection failure.
        pub async fn login(&self, email: &str, password: &str) -> Result<Credentials> {
            let response = self
                .http
                .post(format!("{}/auth", self.base_url))
                .json(&LoginRequest {
                    email: email.to_string(),
                    password: password.to_string(),
                })
                .send()
                .await
                .map_err(|e| OceanSaverError::Transport(e.to_string()))?;

            if !response.status().is_success() {
                return Err(OceanSaverError::http(response.status().as_u16(), "login"));
            }
            let tokens: TokenResponse = response
                .json()
                .await
                .map_err(|e| OceanSaverError::Transport(e.to_string()))?;

            let credentials = Credentials {
                access_token: tokens.access_token,
                refresh_token: tokens.refresh_token,
            };
            *self.credentials.write().await = Some(credentials.clone());
            info!("signed in");
            Ok(credentials)
        }

        async fn request_refresh(&self, refresh_token: String) -> Result<TokenResponse> {
            let response = self
                .http
                .post(format!("{}/auth/refresh", self.base_url))
                .json(&RefreshRequest { refresh_token })
                .send()
                .await
                .map_err(|e| OceanSaverError::Transport(e.to_string()))?;
            if !response.status().is_success() {
                return Err(OceanSaverError::http(
                    response.status().as_u16(),
                    "token refresh",
                ));
            }
            response
                .json()
                .await
                .map_err(|e| OceanSaverError::Transport(e.to_string()))
        }
    }

    impl std::fmt::Debug for RefreshingTokenProvider {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("RefreshingTokenProvider")
                .field("base_url", &self.base_url)
                .finish_non_exhaustive()
        }
    }

    #[async_trait]
    impl TokenProvider for RefreshingTokenProvider {
        async fn access_token(&self) -> Option<String> {
            self.credentials
                .read()
                .await
                .as_ref()
                .map(|c| c.access_token.clone())
        }

        async fn refresh(&self) -> Result<String> {
            let rejected = self.access_token().await;
            let _guard = self.refreshing.lock().await;

            let stored = self.credentials.read().await.clone();
            if let Some(current) = stored.as_ref().map(|c| &c.access_token) {
                if rejected.as_ref() != Some(current) {
                    debug!("access token already refreshed by a concurrent request");
                    return Ok(current.clone());
                }
            }
            let Some(refresh_token) = stored.and_then(|c| c.refresh_token) else {
                debug!("no refresh token stored; cannot refresh");
                return Err(OceanSaverError::Unauthorized);
            };

            match self.request_refresh(refresh_token.clone()).await {
                Ok(tokens) => {
                    let credentials = Credentials {
                        access_token: tokens.access_token.clone(),
                        // Keep the old refresh token unless the server rotated it.
                        refresh_token: Some(tokens.refresh_token.unwrap_or(refresh_token)),
                    };
                    *self.credentials.write().await = Some(credentials);
                    debug!("access token refreshed");
                    Ok(tokens.access_token)
                }
                Err(e) => {
                    warn!("token refresh failed, signing out: {e}");
                    self.sign_out().await;
                    Err(OceanSaverError::Unauthorized)
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_provider_cannot_refresh() {
        let provider = StaticTokenProvider::new("tok");
        assert_eq!(provider.access_token().await.as_deref(), Some("tok"));
        assert!(matches!(
            provider.refresh().await,
            Err(OceanSaverError::Unauthorized)
        ));
        assert!(StaticTokenProvider::anonymous().access_token().await.is_none());
    }

    #[test]
    fn credentials_debug_redacts_tokens() {
        let debug_str = format!("{:?}", Credentials::new("secret-access", "secret-refresh"));
        assert!(!debug_str.contains("secret"));
        assert!(debug_str.contains("redacted"));
    }

    #[cfg(feature = "transport-http")]
    #[tokio::test]
    async fn refreshing_provider_without_refresh_token_is_unauthorized() {
        let provider = RefreshingTokenProvider::new(reqwest::Client::new(), "http://127.0.0.1:1");
        assert!(provider.access_token().await.is_none());
        assert!(matches!(
            provider.refresh().await,
            Err(OceanSaverError::Unauthorized)
        ));
    }
}
