#![cfg(feature = "transport-http")]
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! `ApiClient` tests against a minimal in-process HTTP/1.1 server.
//!
//! The server records every request and answers through a per-test
//! responder. Each connection serves one request and closes.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use ocean_saver_client::location::{Location, LocationPolicy, NoLocation};
use ocean_saver_client::protocol::{
    ExperienceId, SignupRequest, StoreReceipt, StoreRegistrationRequest, TrashReceipt,
};
use ocean_saver_client::{
    ApiClient, ClientConfig, Credentials, EventStreamClient, OceanSaverError, OpenError,
    RefreshingTokenProvider, RoomService, StaticTokenProvider, StreamEndpoint, StreamOpener,
    SubscriptionEnd, TokenProvider, TrashPhoto,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

// ════════════════════════════════════════════════════════════════════
// Test server
// ════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
struct Recorded {
    method: String,
    path: String,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Recorded {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    fn body_json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("request body is JSON")
    }
}

enum Reply {
    Full { status: u16, body: String },
    Chunked { chunks: Vec<&'static str> },
}

fn json_reply(status: u16, body: serde_json::Value) -> Reply {
    Reply::Full {
        status,
        body: body.to_string(),
    }
}

fn empty_reply(status: u16) -> Reply {
    Reply::Full {
        status,
        body: String::new(),
    }
}

type Responder = Arc<dyn Fn(&Recorded) -> Reply + Send + Sync>;

struct TestServer {
    base_url: String,
    requests: Arc<StdMutex<Vec<Recorded>>>,
    task: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn start(responder: impl Fn(&Recorded) -> Reply + Send + Sync + 'static) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(StdMutex::new(Vec::new()));
        let responder: Responder = Arc::new(responder);

        let log = Arc::clone(&requests);
        let task = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let log = Arc::clone(&log);
                let responder = Arc::clone(&responder);
                tokio::spawn(async move {
                    serve(stream, log, responder).await;
                });
            }
        });

        Self {
            base_url,
            requests,
            task,
        }
    }

    fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    fn config(&self) -> ClientConfig {
        ClientConfig::new(&self.base_url).with_request_timeout(Duration::from_secs(5))
    }

    fn client(&self, tokens: Arc<dyn TokenProvider>) -> ApiClient {
        ApiClient::new(&self.config(), tokens).unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve(mut stream: TcpStream, log: Arc<StdMutex<Vec<Recorded>>>, responder: Responder) {
    let Some(request) = read_request(&mut stream).await else {
        return;
    };
    let reply = responder(&request);
    log.lock().unwrap().push(request);

    match reply {
        Reply::Full { status, body } => {
            let content_type = if body.is_empty() { "text/plain" } else { "application/json" };
            let head = format!(
                "HTTP/1.1 {status} {}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                reason(status),
                body.len()
            );
            let _ = stream.write_all(head.as_bytes()).await;
            let _ = stream.write_all(body.as_bytes()).await;
        }
        Reply::Chunked { chunks } => {
            let head = "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n";
            let _ = stream.write_all(head.as_bytes()).await;
            for chunk in chunks {
                let framed = format!("{:x}\r\n{chunk}\r\n", chunk.len());
                let _ = stream.write_all(framed.as_bytes()).await;
                let _ = stream.flush().await;
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            let _ = stream.write_all(b"0\r\n\r\n").await;
        }
    }
    let _ = stream.shutdown().await;
}

async fn read_request(stream: &mut TcpStream) -> Option<Recorded> {
    let mut buf = Vec::new();
    let mut scratch = [0u8; 4096];
    let head_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
        let n = stream.read(&mut scratch).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&scratch[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split(' ');
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(n, v)| (n.trim().to_string(), v.trim().to_string()))
        .collect();
    let content_length = headers
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = buf[head_end + 4..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut scratch).await.ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&scratch[..n]);
    }

    Some(Recorded {
        method,
        path,
        headers,
        body,
    })
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        409 => "Conflict",
        _ => "Status",
    }
}

fn room_body(room_id: u64) -> serde_json::Value {
    serde_json::json!({
        "roomId": room_id,
        "title": "Gwangalli",
        "isPrivate": false,
        "hostName": "alice",
        "teams": [
            {"teamName": "A", "maxMembers": 2, "users": ["alice"]},
            {"teamName": "B", "maxMembers": 2, "users": []}
        ]
    })
}

/// Hands out `"stale"` until refreshed, then `"fresh"`.
struct RotatingTokens {
    refreshes: AtomicUsize,
}

impl RotatingTokens {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            refreshes: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl TokenProvider for RotatingTokens {
    async fn access_token(&self) -> Option<String> {
        if self.refreshes.load(Ordering::SeqCst) == 0 {
            Some("stale".into())
        } else {
            Some("fresh".into())
        }
    }

    async fn refresh(&self) -> Result<String, OceanSaverError> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        Ok("fresh".into())
    }
}

// ════════════════════════════════════════════════════════════════════
// Rooms
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn get_room_sends_bearer_token() {
    let server = TestServer::start(|_| json_reply(200, room_body(42))).await;
    let api = server.client(Arc::new(StaticTokenProvider::new("tok-1")));

    let room = api.get_room(42).await.unwrap();
    assert_eq!(room.room_id, 42);
    assert!(room.is_host("alice"));

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "GET");
    assert_eq!(requests[0].path, "/games/rooms/42");
    assert_eq!(requests[0].header("authorization"), Some("Bearer tok-1"));
}

#[tokio::test]
async fn anonymous_requests_have_no_authorization_header() {
    let server = TestServer::start(|_| json_reply(200, serde_json::json!([room_body(1)]))).await;
    let api = server.client(Arc::new(StaticTokenProvider::anonymous()));

    let rooms = api.list_rooms().await.unwrap();
    assert_eq!(rooms.len(), 1);
    assert_eq!(server.requests()[0].header("authorization"), None);
}

#[tokio::test]
async fn unauthorized_triggers_one_refresh_and_retry() {
    let server = TestServer::start(|req| {
        if req.header("authorization") == Some("Bearer fresh") {
            json_reply(200, room_body(7))
        } else {
            empty_reply(401)
        }
    })
    .await;
    let tokens = RotatingTokens::new();
    let api = server.client(tokens.clone());

    let room = api.get_room(7).await.unwrap();
    assert_eq!(room.room_id, 7);
    assert_eq!(tokens.refreshes.load(Ordering::SeqCst), 1);

    let auth: Vec<_> = server
        .requests()
        .iter()
        .map(|r| r.header("authorization").map(str::to_string))
        .collect();
    assert_eq!(
        auth,
        vec![Some("Bearer stale".to_string()), Some("Bearer fresh".to_string())]
    );
}

#[tokio::test]
async fn second_unauthorized_gives_up() {
    let server = TestServer::start(|_| empty_reply(401)).await;
    let tokens = RotatingTokens::new();
    let api = server.client(tokens.clone());

    let err = api.get_room(7).await.unwrap_err();
    assert!(matches!(err, OceanSaverError::Unauthorized));
    assert_eq!(err.status(), Some(401));
    assert_eq!(tokens.refreshes.load(Ordering::SeqCst), 1);
    assert_eq!(server.requests().len(), 2);
}

#[tokio::test]
async fn failed_refresh_does_not_retry() {
    let server = TestServer::start(|_| empty_reply(401)).await;
    let api = server.client(Arc::new(StaticTokenProvider::new("tok")));

    let err = api.list_rooms().await.unwrap_err();
    assert!(matches!(err, OceanSaverError::Unauthorized));
    assert_eq!(server.requests().len(), 1);
}

#[tokio::test]
async fn start_game_accepts_no_content() {
    let server = TestServer::start(|_| empty_reply(204)).await;
    let api = server.client(Arc::new(StaticTokenProvider::new("tok")));

    api.start_game(42).await.unwrap();
    let requests = server.requests();
    assert_eq!(requests[0].method, "PATCH");
    assert_eq!(requests[0].path, "/games/42");
}

#[tokio::test]
async fn start_game_refusal_is_http_error() {
    let server = TestServer::start(|_| empty_reply(403)).await;
    let api = server.client(Arc::new(StaticTokenProvider::new("tok")));

    let err = api.start_game(42).await.unwrap_err();
    assert!(matches!(err, OceanSaverError::Http { status: 403, .. }));
}

#[tokio::test]
async fn join_room_sends_password_body() {
    let server = TestServer::start(|_| json_reply(200, serde_json::json!({"ok": true}))).await;
    let api = server.client(Arc::new(StaticTokenProvider::new("tok")));

    api.join_room(9, None).await.unwrap();
    api.join_room(9, Some("1234")).await.unwrap();

    let requests = server.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests.iter().all(|r| r.method == "PATCH" && r.path == "/games/rooms/9"));
    assert_eq!(requests[0].body_json(), serde_json::json!({"password": null}));
    assert_eq!(requests[1].body_json(), serde_json::json!({"password": "1234"}));
}

#[tokio::test]
async fn create_room_posts_request_body() {
    let server = TestServer::start(|_| json_reply(201, room_body(11))).await;
    let api = server.client(Arc::new(StaticTokenProvider::new("tok")));

    let room = api
        .create_room(&ocean_saver_client::protocol::CreateRoomRequest::private("night", "pw"))
        .await
        .unwrap();
    assert_eq!(room.room_id, 11);

    let request = &server.requests()[0];
    assert_eq!(request.method, "POST");
    assert_eq!(request.path, "/games/rooms");
    assert_eq!(
        request.body_json(),
        serde_json::json!({"title": "night", "isPrivate": true, "password": "pw"})
    );
}

// ════════════════════════════════════════════════════════════════════
// Trash submissions
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn submit_trash_uploads_photo_with_fallback_location() {
    let server = TestServer::start(|_| empty_reply(201)).await;
    let api = server.client(Arc::new(StaticTokenProvider::new("tok")));
    let photo = TrashPhoto::jpeg("bottle.jpg", vec![0xFF, 0xD8, 0xFF, 0xE0]);

    let receipt = api
        .submit_trash_at(
            &photo,
            &NoLocation,
            LocationPolicy::ForcedFallback(Location::DEMO_FALLBACK),
        )
        .await
        .unwrap();
    assert_eq!(receipt, TrashReceipt::default());

    let request = &server.requests()[0];
    assert_eq!(request.method, "POST");
    assert_eq!(request.path, "/trashes");
    assert!(request
        .header("content-type")
        .unwrap()
        .starts_with("multipart/form-data"));
    let body = String::from_utf8_lossy(&request.body);
    assert!(body.contains("name=\"imageData\""));
    assert!(body.contains("filename=\"bottle.jpg\""));
    assert!(body.contains("name=\"location\""));
    assert!(body.contains("35.1587,129.1603"));
}

#[tokio::test]
async fn submit_trash_without_location_is_refused_before_sending() {
    let server = TestServer::start(|_| empty_reply(201)).await;
    let api = server.client(Arc::new(StaticTokenProvider::new("tok")));
    let photo = TrashPhoto::jpeg("bottle.jpg", vec![1]);

    let err = api
        .submit_trash_at(&photo, &NoLocation, LocationPolicy::BestEffort)
        .await
        .unwrap_err();
    assert!(matches!(err, OceanSaverError::LocationUnavailable(_)));
    assert!(server.requests().is_empty());
}

#[tokio::test]
async fn recycle_returns_receipt_and_lists_trashes() {
    let server = TestServer::start(|req| match (req.method.as_str(), req.path.as_str()) {
        ("PATCH", "/trashes/3") => json_reply(200, serde_json::json!({"trashId": 3})),
        ("GET", "/trashes") => json_reply(
            200,
            serde_json::json!([{
                "trashId": 3,
                "imageURL": "https://cdn/1.jpg",
                "location": "35.1587,129.1603",
                "createdAt": "2024-06-01T10:00:00Z",
                "secondImageURL": "https://cdn/2.jpg",
                "secondLocation": "35.1587,129.1603",
                "certified": "pending"
            }]),
        ),
        _ => empty_reply(404),
    })
    .await;
    let api = server.client(Arc::new(StaticTokenProvider::new("tok")));

    let receipt = api
        .submit_recycle(3, &TrashPhoto::jpeg("bin.jpg", vec![1, 2]), "35.1587,129.1603")
        .await
        .unwrap();
    assert_eq!(receipt.trash_id, Some(3));

    let trashes = api.list_trashes().await.unwrap();
    assert_eq!(trashes.len(), 1);
    assert!(trashes[0].second_image_url.is_some());
}

// ════════════════════════════════════════════════════════════════════
// Account, rankings and coupons
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn current_user_supplies_the_host_identity() {
    let server = TestServer::start(|req| match req.path.as_str() {
        "/users" => json_reply(
            200,
            serde_json::json!({"nickname": "alice", "email": "alice@ocean.test", "totalPoint": 1200}),
        ),
        "/games/rooms/42" => json_reply(200, room_body(42)),
        _ => empty_reply(404),
    })
    .await;
    let api = server.client(Arc::new(StaticTokenProvider::new("tok")));

    let user = api.current_user().await.unwrap();
    assert_eq!(user.nickname, "alice");
    assert_eq!(user.total_point, 1200);

    let room = api.get_room(42).await.unwrap();
    assert!(room.is_host(&user.nickname));

    let request = &server.requests()[0];
    assert_eq!((request.method.as_str(), request.path.as_str()), ("GET", "/users"));
    assert_eq!(request.header("authorization"), Some("Bearer tok"));
}

#[tokio::test]
async fn signup_is_sent_without_credentials() {
    let server = TestServer::start(|_| empty_reply(201)).await;
    let api = server.client(Arc::new(StaticTokenProvider::new("tok")));

    api.signup(&SignupRequest {
        email: "diver@ocean.test".into(),
        nickname: "diver".into(),
        password: "pw".into(),
    })
    .await
    .unwrap();

    let request = &server.requests()[0];
    assert_eq!((request.method.as_str(), request.path.as_str()), ("POST", "/users"));
    assert_eq!(request.header("authorization"), None);
    assert_eq!(
        request.body_json(),
        serde_json::json!({"email": "diver@ocean.test", "nickname": "diver", "password": "pw"})
    );
}

#[tokio::test]
async fn signup_conflict_is_http_error() {
    let server = TestServer::start(|_| empty_reply(409)).await;
    let api = server.client(Arc::new(StaticTokenProvider::anonymous()));

    let err = api
        .signup(&SignupRequest {
            email: "taken@ocean.test".into(),
            nickname: "taken".into(),
            password: "pw".into(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(409));
}

#[tokio::test]
async fn rankings_and_coupons() {
    let server = TestServer::start(|req| match req.path.as_str() {
        "/users/rank/10" => json_reply(
            200,
            serde_json::json!([
                {"nickname": "alice", "totalScore": 900, "rank": 1},
                {"nickname": "bob", "totalScore": 450}
            ]),
        ),
        "/users/coupon" => json_reply(
            200,
            serde_json::json!([{
                "id": 3,
                "experienceName": "Free coffee",
                "businessName": "Ocean Cafe",
                "validUntil": "2026-12-31",
                "isUsed": false
            }]),
        ),
        _ => empty_reply(404),
    })
    .await;
    let api = server.client(Arc::new(StaticTokenProvider::new("tok")));

    let rankings = api.rankings(10).await.unwrap();
    assert_eq!(rankings.len(), 2);
    assert_eq!(rankings[0].rank, Some(1));
    assert_eq!(rankings[1].total_score, 450);

    let coupons = api.my_coupons().await.unwrap();
    assert_eq!(coupons[0].business_name, "Ocean Cafe");
    assert!(!coupons[0].is_used);
}

// ════════════════════════════════════════════════════════════════════
// Store experiences and recycling guide
// ════════════════════════════════════════════════════════════════════

fn experience_body(id: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "businessName": "Ocean Cafe",
        "ownerName": "Lee",
        "location": "Busan",
        "description": "Sea view",
        "price": 3000,
        "experienceName": "Free americano"
    })
}

#[tokio::test]
async fn experiences_accept_numeric_and_text_ids() {
    let server = TestServer::start(|req| match req.path.as_str() {
        "/experiences" => json_reply(
            200,
            serde_json::json!([
                experience_body(serde_json::json!(1)),
                experience_body(serde_json::json!("surf-2"))
            ]),
        ),
        "/experiences/surf-2" => json_reply(200, experience_body(serde_json::json!("surf-2"))),
        _ => empty_reply(404),
    })
    .await;
    let api = server.client(Arc::new(StaticTokenProvider::new("tok")));

    let offers = api.list_experiences().await.unwrap();
    assert_eq!(offers[0].id, ExperienceId::Number(1));
    assert_eq!(offers[1].id, ExperienceId::Text("surf-2".into()));
    assert!(offers[0].image_url.is_none());

    let offer = api.get_experience(&offers[1].id).await.unwrap();
    assert_eq!(offer.price, 3000);

    let err = api.get_experience(&ExperienceId::from(99)).await.unwrap_err();
    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn store_registration_and_coupon() {
    let server = TestServer::start(|req| match (req.method.as_str(), req.path.as_str()) {
        ("POST", "/experiences") => empty_reply(201),
        ("POST", "/experiences/5/coupons") => empty_reply(201),
        _ => empty_reply(404),
    })
    .await;
    let api = server.client(Arc::new(StaticTokenProvider::new("tok")));

    let receipt = api
        .register_store(&StoreRegistrationRequest {
            business_name: "Ocean Cafe".into(),
            owner_name: "Lee".into(),
            business_registration_number: "123-45-67890".into(),
            location: "Busan".into(),
            description: "Sea view".into(),
        })
        .await
        .unwrap();
    assert_eq!(receipt, StoreReceipt::default());

    api.register_coupon(&ExperienceId::from(5), "10% off")
        .await
        .unwrap();

    let requests = server.requests();
    assert_eq!(requests[0].body_json()["businessRegistrationNumber"], "123-45-67890");
    assert_eq!(requests[1].body_json(), serde_json::json!({"name": "10% off"}));
}

#[tokio::test]
async fn recycle_guide_and_approval() {
    let server = TestServer::start(|req| match (req.method.as_str(), req.path.as_str()) {
        ("POST", "/recycle/guide") => json_reply(
            200,
            serde_json::json!({
                "trashType": "PET bottle",
                "category": "plastic",
                "howToSeparate": "Remove the label",
                "whereToDispose": "Plastic bin",
                "additionalTips": "Crush it"
            }),
        ),
        ("PATCH", "/trashes/8/approval") => empty_reply(204),
        _ => empty_reply(404),
    })
    .await;
    let api = server.client(Arc::new(StaticTokenProvider::new("admin")));

    let guide = api.recycle_guide("bottle", "Haeundae").await.unwrap();
    assert_eq!(guide.category, "plastic");
    api.approve_trash(8).await.unwrap();

    let requests = server.requests();
    assert_eq!(
        requests[0].body_json(),
        serde_json::json!({"trashName": "bottle", "location": "Haeundae"})
    );
    assert_eq!(requests[1].path, "/trashes/8/approval");
}

// ════════════════════════════════════════════════════════════════════
// Score stream
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn score_stream_over_chunked_http() {
    let server = TestServer::start(|_| Reply::Chunked {
        chunks: vec![
            "data: {\"teams\":[{\"name\":\"A\",",
            "\"score\":7}]}\n",
            "\ndata: {\"teams\":[{\"name\":\"B\",\"score\":2}]}\n\n",
        ],
    })
    .await;
    let api = Arc::new(server.client(Arc::new(StaticTokenProvider::new("tok"))));

    let seen = Arc::new(StdMutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let mut handle = EventStreamClient::new(api)
        .subscribe(StreamEndpoint::game_scores(42), move |v| sink.lock().unwrap().push(v));

    let end = tokio::time::timeout(Duration::from_secs(5), handle.finished())
        .await
        .unwrap();
    assert_eq!(end, SubscriptionEnd::Completed);
    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            serde_json::json!({"teams": [{"name": "A", "score": 7}]}),
            serde_json::json!({"teams": [{"name": "B", "score": 2}]}),
        ]
    );

    let request = &server.requests()[0];
    assert_eq!(request.path, "/games/42/subscribe");
    assert_eq!(request.header("accept"), Some("text/event-stream"));
    assert_eq!(request.header("authorization"), Some("Bearer tok"));
}

#[tokio::test]
async fn rejected_stream_open_reports_status() {
    let server = TestServer::start(|_| empty_reply(403)).await;
    let api = server.client(Arc::new(StaticTokenProvider::new("tok")));

    let err = api.open(&StreamEndpoint::game_scores(42)).await.err().unwrap();
    assert!(matches!(err, OpenError::Rejected { status: 403 }));
}

// ════════════════════════════════════════════════════════════════════
// Auth endpoints
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn login_then_refresh_keeps_refresh_token() {
    let server = TestServer::start(|req| match req.path.as_str() {
        "/auth" => json_reply(200, serde_json::json!({"accessToken": "a1", "refreshToken": "r1"})),
        "/auth/refresh" => json_reply(200, serde_json::json!({"accessToken": "a2"})),
        _ => empty_reply(404),
    })
    .await;
    let provider = RefreshingTokenProvider::new(reqwest::Client::new(), &server.base_url);

    let credentials = provider.login("diver@ocean.test", "pw").await.unwrap();
    assert_eq!(credentials, Credentials::new("a1", "r1"));
    assert_eq!(provider.access_token().await.as_deref(), Some("a1"));

    assert_eq!(provider.refresh().await.unwrap(), "a2");
    assert_eq!(provider.credentials().await, Some(Credentials::new("a2", "r1")));

    let requests = server.requests();
    assert_eq!(
        requests[0].body_json(),
        serde_json::json!({"email": "diver@ocean.test", "password": "pw"})
    );
    assert_eq!(requests[1].body_json(), serde_json::json!({"refreshToken": "r1"}));
}

#[tokio::test]
async fn failed_refresh_signs_out() {
    let server = TestServer::start(|_| empty_reply(401)).await;
    let provider = RefreshingTokenProvider::new(reqwest::Client::new(), &server.base_url)
        .with_credentials(Credentials::new("old", "expired"));

    assert!(matches!(provider.refresh().await, Err(OceanSaverError::Unauthorized)));
    assert!(provider.credentials().await.is_none());
    assert!(provider.access_token().await.is_none());
}

#[tokio::test]
async fn concurrent_refreshes_spend_the_refresh_token_once() {
    // The server rotates refresh tokens: `r1` is valid exactly once.
    let spent = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&spent);
    let server = TestServer::start(move |req| {
        if req.path == "/auth/refresh"
            && req.body_json() == serde_json::json!({"refreshToken": "r1"})
            && counter.fetch_add(1, Ordering::SeqCst) == 0
        {
            json_reply(200, serde_json::json!({"accessToken": "a2", "refreshToken": "r2"}))
        } else {
            empty_reply(401)
        }
    })
    .await;
    let provider = RefreshingTokenProvider::new(reqwest::Client::new(), &server.base_url)
        .with_credentials(Credentials::new("a1", "r1"));

    let (first, second) = tokio::join!(provider.refresh(), provider.refresh());
    assert_eq!(first.unwrap(), "a2");
    assert_eq!(second.unwrap(), "a2");
    assert_eq!(spent.load(Ordering::SeqCst), 1);
    assert_eq!(provider.credentials().await, Some(Credentials::new("a2", "r2")));
    assert_eq!(server.requests().len(), 1);
}
