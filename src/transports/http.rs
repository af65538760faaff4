//! HTTP implementation of the game API using `reqwest`.
//!
//! [`ApiClient`] is the one type that talks to the backend. It implements
//! [`RoomService`] for the room controller, [`StreamOpener`] for the score
//! stream, and exposes the account, trash, store and coupon endpoints
//! directly.
//!
//! Every request carries `Authorization: Bearer <token>` from the injected
//! [`TokenProvider`]. A `401` answer triggers exactly one
//! [`refresh`](TokenProvider::refresh) and one retry of a freshly built
//! request; a second `401` or a failed refresh yields
//! [`OceanSaverError::Unauthorized`].
//!
//! # Feature gate
//!
//! This module is only available when the `transport-http` feature is enabled
//! (it is enabled by default).
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), ocean_saver_client::OceanSaverError> {
//! use std::sync::Arc;
//! use ocean_saver_client::{ApiClient, ClientConfig, RoomService, StaticTokenProvider};
//!
//! let api = ApiClient::new(&ClientConfig::from_env(), Arc::new(StaticTokenProvider::new("token")))?;
//! for room in api.list_rooms().await? {
//!     println!("{} ({} members)", room.title, room.member_count());
//! }
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use reqwest::{header, multipart, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::auth::TokenProvider;
use crate::config::ClientConfig;
use crate::error::{OceanSaverError, Result};
use crate::location::{resolve_location, LocationPolicy, LocationSource};
use crate::protocol::{
    Coupon, CouponRequest, CreateRoomRequest, Experience, ExperienceId, JoinRoomRequest,
    RankingEntry, RecycleGuide, RecycleGuideRequest, Room, RoomId, SignupRequest,
    StoreReceipt, StoreRegistrationRequest, TrashId, TrashItem, TrashReceipt, User,
};
use crate::service::RoomService;
use crate::transport::{ChunkSource, OpenError, StreamEndpoint, StreamOpener};

/// An image to upload with a trash or recycle submission.
#[derive(Clone)]
pub struct TrashPhoto {
    /// File name reported in the multipart part.
    pub file_name: String,
    /// MIME type, e.g. `image/jpeg`.
    pub mime_type: String,
    /// Raw image bytes.
    pub bytes: Vec<u8>,
}

impl TrashPhoto {
    /// A JPEG photo.
    pub fn jpeg(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: "image/jpeg".to_string(),
            bytes,
        }
    }

    fn to_form(&self, location: &str) -> Result<multipart::Form> {
        let part = multipart::Part::bytes(self.bytes.clone())
            .file_name(self.file_name.clone())
            .mime_str(&self.mime_type)
            .map_err(|e| OceanSaverError::Config(format!("invalid photo MIME type: {e}")))?;
        Ok(multipart::Form::new()
            .part("imageData", part)
            .text("location", location.to_string()))
    }
}

impl fmt::Debug for TrashPhoto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrashPhoto")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// HTTP client for the Ocean Saver game API.
///
/// Cheap to clone; clones share the connection pool and token provider.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Arc<str>,
    request_timeout: Option<Duration>,
    tokens: Arc<dyn TokenProvider>,
}

impl ApiClient {
    /// Build a client with a fresh connection pool.
    ///
    /// # Errors
    ///
    /// [`OceanSaverError::Config`] if the HTTP client cannot be constructed.
    pub fn new(config: &ClientConfig, tokens: Arc<dyn TokenProvider>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| OceanSaverError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::with_http_client(http, config, tokens))
    }

    /// Build a client around an existing `reqwest::Client`.
    pub fn with_http_client(
        http: reqwest::Client,
        config: &ClientConfig,
        tokens: Arc<dyn TokenProvider>,
    ) -> Self {
        Self {
            http,
            base_url: Arc::from(config.base_url.trim_end_matches('/')),
            request_timeout: config.request_timeout,
            tokens,
        }
    }

    /// Base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ── Users ───────────────────────────────────────────────────────

    /// `GET /users`: the signed-in account.
    ///
    /// Its `nickname` is the identity to hand to
    /// [`RoomController::start`](crate::RoomController::start).
    ///
    /// # Errors
    ///
    /// [`OceanSaverError::Http`] on a non-success status,
    /// [`OceanSaverError::Unauthorized`] when nobody is signed in.
    pub async fn current_user(&self) -> Result<User> {
        let response = self
            .send_authorized("get user", |api| Ok(api.request(Method::GET, "/users")))
            .await?;
        decode_json(check_status(response, "get user")?, "get user").await
    }

    /// `POST /users`: create an account. Sent without credentials.
    ///
    /// # Errors
    ///
    /// [`OceanSaverError::Http`] when the server refuses the sign-up
    /// (taken e-mail or nickname).
    pub async fn signup(&self, request: &SignupRequest) -> Result<()> {
        let response = send(self.request(Method::POST, "/users").json(request)).await?;
        check_status(response, "sign up")?;
        Ok(())
    }

    /// `GET /users/rank/{limit}`: the top `limit` players, best first.
    ///
    /// # Errors
    ///
    /// [`OceanSaverError::Http`] on a non-success status.
    pub async fn rankings(&self, limit: u32) -> Result<Vec<RankingEntry>> {
        let path = format!("/users/rank/{limit}");
        let response = self
            .send_authorized("get rankings", |api| Ok(api.request(Method::GET, &path)))
            .await?;
        decode_json(check_status(response, "get rankings")?, "get rankings").await
    }

    /// `GET /users/coupon`: coupons owned by the signed-in user.
    ///
    /// # Errors
    ///
    /// [`OceanSaverError::Http`] on a non-success status.
    pub async fn my_coupons(&self) -> Result<Vec<Coupon>> {
        let response = self
            .send_authorized("list coupons", |api| {
                Ok(api.request(Method::GET, "/users/coupon"))
            })
            .await?;
        decode_json(check_status(response, "list coupons")?, "list coupons").await
    }

    // ── Trash endpoints ─────────────────────────────────────────────

    /// `GET /trashes`: the signed-in user's submissions.
    ///
    /// # Errors
    ///
    /// [`OceanSaverError::Http`] on a non-success status.
    pub async fn list_trashes(&self) -> Result<Vec<TrashItem>> {
        let response = self
            .send_authorized("list trashes", |api| Ok(api.request(Method::GET, "/trashes")))
            .await?;
        decode_json(check_status(response, "list trashes")?, "list trashes").await
    }

    /// `POST /trashes`: first verification step (collection photo).
    ///
    /// # Errors
    ///
    /// [`OceanSaverError::Http`] on a non-success status.
    pub async fn submit_trash(&self, photo: &TrashPhoto, location: &str) -> Result<TrashReceipt> {
        let response = self
            .send_authorized("submit trash", |api| {
                Ok(api
                    .request(Method::POST, "/trashes")
                    .multipart(photo.to_form(location)?))
            })
            .await?;
        decode_optional_json(check_status(response, "submit trash")?).await
    }

    /// `PATCH /trashes/{id}`: second verification step (recycling photo).
    ///
    /// # Errors
    ///
    /// [`OceanSaverError::Http`] on a non-success status.
    pub async fn submit_recycle(
        &self,
        trash_id: TrashId,
        photo: &TrashPhoto,
        location: &str,
    ) -> Result<TrashReceipt> {
        let path = format!("/trashes/{trash_id}");
        let response = self
            .send_authorized("submit recycle", |api| {
                Ok(api
                    .request(Method::PATCH, &path)
                    .multipart(photo.to_form(location)?))
            })
            .await?;
        decode_optional_json(check_status(response, "submit recycle")?).await
    }

    /// Resolve the position through `source` and `policy`, then submit the photo.
    ///
    /// # Errors
    ///
    /// [`OceanSaverError::LocationUnavailable`] under
    /// [`LocationPolicy::BestEffort`] when no position is available, otherwise
    /// the errors of [`submit_trash`](Self::submit_trash).
    pub async fn submit_trash_at(
        &self,
        photo: &TrashPhoto,
        source: &dyn LocationSource,
        policy: LocationPolicy,
    ) -> Result<TrashReceipt> {
        let location = resolve_location(source, policy).await?;
        self.submit_trash(photo, &location.to_string()).await
    }

    /// `PATCH /trashes/{id}/approval`: confirm a submission (admin only).
    ///
    /// # Errors
    ///
    /// [`OceanSaverError::Http`] on a non-success status, e.g. `403` for
    /// non-admins.
    pub async fn approve_trash(&self, trash_id: TrashId) -> Result<()> {
        let path = format!("/trashes/{trash_id}/approval");
        let response = self
            .send_authorized("approve trash", |api| Ok(api.request(Method::PATCH, &path)))
            .await?;
        check_status(response, "approve trash")?;
        Ok(())
    }

    /// `POST /recycle/guide`: disposal instructions for an item at a place.
    ///
    /// # Errors
    ///
    /// [`OceanSaverError::Http`] on a non-success status.
    pub async fn recycle_guide(&self, trash_name: &str, location: &str) -> Result<RecycleGuide> {
        let body = RecycleGuideRequest {
            trash_name: trash_name.to_string(),
            location: location.to_string(),
        };
        let response = self
            .send_authorized("recycle guide", |api| {
                Ok(api.request(Method::POST, "/recycle/guide").json(&body))
            })
            .await?;
        decode_json(check_status(response, "recycle guide")?, "recycle guide").await
    }

    // ── Store experiences ───────────────────────────────────────────

    /// `GET /experiences`: every partner offer.
    ///
    /// # Errors
    ///
    /// [`OceanSaverError::Http`] on a non-success status.
    pub async fn list_experiences(&self) -> Result<Vec<Experience>> {
        let response = self
            .send_authorized("list experiences", |api| {
                Ok(api.request(Method::GET, "/experiences"))
            })
            .await?;
        decode_json(check_status(response, "list experiences")?, "list experiences").await
    }

    /// `GET /experiences/{id}`.
    ///
    /// # Errors
    ///
    /// [`OceanSaverError::Http`] on a non-success status (`404` for an unknown id).
    pub async fn get_experience(&self, id: &ExperienceId) -> Result<Experience> {
        let path = format!("/experiences/{id}");
        let response = self
            .send_authorized("get experience", |api| Ok(api.request(Method::GET, &path)))
            .await?;
        decode_json(check_status(response, "get experience")?, "get experience").await
    }

    /// `POST /experiences`: register a store as its owner.
    ///
    /// # Errors
    ///
    /// [`OceanSaverError::Http`] on a non-success status.
    pub async fn register_store(&self, request: &StoreRegistrationRequest) -> Result<StoreReceipt> {
        let response = self
            .send_authorized("register store", |api| {
                Ok(api.request(Method::POST, "/experiences").json(request))
            })
            .await?;
        decode_optional_json(check_status(response, "register store")?).await
    }

    /// `POST /experiences/{id}/coupons`: attach a coupon to an offer.
    ///
    /// # Errors
    ///
    /// [`OceanSaverError::Http`] on a non-success status.
    pub async fn register_coupon(&self, experience: &ExperienceId, name: &str) -> Result<()> {
        let path = format!("/experiences/{experience}/coupons");
        let body = CouponRequest {
            name: name.to_string(),
        };
        let response = self
            .send_authorized("register coupon", |api| {
                Ok(api.request(Method::POST, &path).json(&body))
            })
            .await?;
        check_status(response, "register coupon")?;
        Ok(())
    }

    // ── Internal helpers ────────────────────────────────────────────

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .http
            .request(method, format!("{}{}", self.base_url, path));
        match self.request_timeout {
            Some(timeout) => builder.timeout(timeout),
            None => builder,
        }
    }

    /// Send a request built by `build`, refreshing the token once on `401`.
    ///
    /// `build` is called again for the retry, so request bodies are rebuilt
    /// rather than reused.
    async fn send_authorized<B>(&self, context: &str, build: B) -> Result<Response>
    where
        B: Fn(&Self) -> Result<RequestBuilder>,
    {
        let token = self.tokens.access_token().await;
        let response = send(with_bearer(build(self)?, token.as_deref())).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        debug!(context, "401 unauthorized; attempting token refresh");
        let token = match self.tokens.refresh().await {
            Ok(token) => token,
            Err(e) => {
                warn!(context, "token refresh failed: {e}");
                return Err(OceanSaverError::Unauthorized);
            }
        };

        let retry = send(with_bearer(build(self)?, Some(&token))).await?;
        if retry.status() == StatusCode::UNAUTHORIZED {
            warn!(context, "request still unauthorized after refresh");
            return Err(OceanSaverError::Unauthorized);
        }
        Ok(retry)
    }
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

fn with_bearer(builder: RequestBuilder, token: Option<&str>) -> RequestBuilder {
    match token {
        Some(token) => builder.bearer_auth(token),
        None => builder,
    }
}

async fn send(builder: RequestBuilder) -> Result<Response> {
    builder.send().await.map_err(|e| {
        if e.is_timeout() {
            OceanSaverError::Timeout
        } else {
            OceanSaverError::Transport(e.to_string())
        }
    })
}

fn check_status(response: Response, context: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        debug!(context, status = status.as_u16(), "request rejected");
        Err(OceanSaverError::http(status.as_u16(), context))
    }
}

async fn decode_json<T: DeserializeOwned>(response: Response, context: &str) -> Result<T> {
    let body = response
        .bytes()
        .await
        .map_err(|e| OceanSaverError::Transport(format!("{context}: {e}")))?;
    Ok(serde_json::from_slice(&body)?)
}

/// Decode a body that may legitimately be empty (`201`/`204` without content).
async fn decode_optional_json<T: DeserializeOwned + Default>(response: Response) -> Result<T> {
    let body = response
        .text()
        .await
        .map_err(|e| OceanSaverError::Transport(e.to_string()))?;
    if body.trim().is_empty() {
        return Ok(T::default());
    }
    match serde_json::from_str(&body) {
        Ok(value) => Ok(value),
        Err(e) => {
            warn!("ignoring unparseable response body: {e}");
            Ok(T::default())
        }
    }
}

// ── RoomService ─────────────────────────────────────────────────────

#[async_trait]
impl RoomService for ApiClient {
    async fn list_rooms(&self) -> Result<Vec<Room>> {
        let response = self
            .send_authorized("list rooms", |api| {
                Ok(api.request(Method::GET, "/games/rooms"))
            })
            .await?;
        decode_json(check_status(response, "list rooms")?, "list rooms").await
    }

    async fn create_room(&self, request: &CreateRoomRequest) -> Result<Room> {
        let response = self
            .send_authorized("create room", |api| {
                Ok(api.request(Method::POST, "/games/rooms").json(request))
            })
            .await?;
        decode_json(check_status(response, "create room")?, "create room").await
    }

    async fn get_room(&self, room_id: RoomId) -> Result<Room> {
        let path = format!("/games/rooms/{room_id}");
        let response = self
            .send_authorized("get room", |api| Ok(api.request(Method::GET, &path)))
            .await?;
        decode_json(check_status(response, "get room")?, "get room").await
    }

    async fn join_room(&self, room_id: RoomId, password: Option<&str>) -> Result<()> {
        let path = format!("/games/rooms/{room_id}");
        let body = JoinRoomRequest {
            password: password.map(str::to_string),
        };
        let response = self
            .send_authorized("join room", |api| {
                Ok(api.request(Method::PATCH, &path).json(&body))
            })
            .await?;
        check_status(response, "join room")?;
        Ok(())
    }

    async fn start_game(&self, room_id: RoomId) -> Result<()> {
        let path = format!("/games/{room_id}");
        let response = self
            .send_authorized("start game", |api| Ok(api.request(Method::PATCH, &path)))
            .await?;
        check_status(response, "start game")?;
        Ok(())
    }
}

// ── Score stream ────────────────────────────────────────────────────

/// Body of an open score stream.
pub struct HttpChunkSource {
    body: BoxStream<'static, reqwest::Result<Vec<u8>>>,
}

impl HttpChunkSource {
    /// Wrap the body of a successful streaming response.
    pub fn from_response(response: Response) -> Self {
        Self {
            body: response
                .bytes_stream()
                .map(|chunk| chunk.map(|bytes| bytes.to_vec()))
                .boxed(),
        }
    }
}

impl fmt::Debug for HttpChunkSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpChunkSource").finish_non_exhaustive()
    }
}

#[async_trait]
impl ChunkSource for HttpChunkSource {
    async fn next_chunk(&mut self) -> Option<Result<Vec<u8>>> {
        self.body
            .next()
            .await
            .map(|chunk| chunk.map_err(|e| OceanSaverError::Transport(e.to_string())))
    }
}

#[async_trait]
impl StreamOpener for ApiClient {
    async fn open(&self, endpoint: &StreamEndpoint) -> std::result::Result<Box<dyn ChunkSource>, OpenError> {
        // No request timeout: the stream stays open for the whole battle.
        let url = format!("{}{}", self.base_url, endpoint.path());
        let response = self
            .send_authorized("open stream", |api| {
                Ok(api
                    .http
                    .get(&url)
                    .header(header::ACCEPT, "text/event-stream"))
            })
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(OpenError::Rejected {
                status: status.as_u16(),
            });
        }
        Ok(Box::new(HttpChunkSource::from_response(response)))
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
    use crate::auth::StaticTokenProvider;

    fn client(base_url: &str) -> ApiClient {
        ApiClient::new(
            &ClientConfig::new(base_url),
            Arc::new(StaticTokenProvider::new("tok")),
        )
        .unwrap()
    }

    #[test]
    fn api_client_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ApiClient>();
    }

    #[test]
    fn base_url_is_normalized() {
        assert_eq!(client("http://api.test/").base_url(), "http://api.test");
    }

    #[test]
    fn photo_form_rejects_bad_mime() {
        let photo = TrashPhoto {
            file_name: "x".into(),
            mime_type: "not a mime".into(),
            bytes: vec![1, 2, 3],
        };
        assert!(matches!(
            photo.to_form("1,2"),
            Err(OceanSaverError::Config(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_host_is_transport_error() {
        let err = client("http://127.0.0.1:1").get_room(1).await.unwrap_err();
        assert!(matches!(err, OceanSaverError::Transport(_)));
    }

    #[tokio::test]
    async fn unreachable_stream_open_fails_without_status() {
        let err = client("http://127.0.0.1:1")
            .open(&StreamEndpoint::game_scores(1))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, OpenError::Failed(_)));
    }
}
