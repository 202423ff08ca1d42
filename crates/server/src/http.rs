use std::io::{self, Cursor, Write};
use std::sync::Arc;

use focusguard_core::attention::domain::attention_status::AttentionStatus;
use focusguard_core::attention::domain::status_cell::StatusCell;
use focusguard_core::pipeline::frame_broadcaster::FrameBroadcaster;
use serde::Serialize;
use tiny_http::{Header, Method, Request, Response, Server, StatusCode};

use crate::mjpeg::{relay, stream_head};

pub const HEALTH_MESSAGE: &str = "Attention Tracker Server Running";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Status,
    VideoFeed,
    Health,
    Preflight,
    NotFound,
}

/// Maps a request line to a route. Query strings are ignored.
pub fn route(method: &Method, url: &str) -> Route {
    let path = url.split('?').next().unwrap_or(url);
    match (method, path) {
        (Method::Options, _) => Route::Preflight,
        (Method::Get | Method::Head, "/status") => Route::Status,
        (Method::Get | Method::Head, "/video_feed") => Route::VideoFeed,
        (Method::Get | Method::Head, "/health") => Route::Health,
        _ => Route::NotFound,
    }
}

/// Cross-origin allow-list. Only listed origins are echoed back.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    allowed: Vec<String>,
}

impl CorsPolicy {
    pub fn new(allowed: Vec<String>) -> Self {
        let allowed = allowed
            .into_iter()
            .map(|o| o.trim_end_matches('/').to_string())
            .collect();
        Self { allowed }
    }

    pub fn allows(&self, origin: &str) -> bool {
        let origin = origin.trim_end_matches('/');
        self.allowed.iter().any(|o| o == "*" || o == origin)
    }

    /// Value for `Access-Control-Allow-Origin`, if the request may read the response.
    pub fn allow_origin(&self, origin: Option<&str>) -> Option<String> {
        origin.filter(|o| self.allows(o)).map(str::to_string)
    }

    pub fn origins(&self) -> &[String] {
        &self.allowed
    }
}

/// Everything a request handler may touch. None of it is owned by the handler.
pub struct AppState {
    pub status: StatusCell,
    pub broadcaster: Arc<FrameBroadcaster>,
    pub cors: CorsPolicy,
}

#[derive(Serialize)]
struct StatusBody {
    status: AttentionStatus,
}

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
    message: &'static str,
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
}

pub fn status_json(status: AttentionStatus) -> String {
    serde_json::to_string(&StatusBody { status }).unwrap_or_default()
}

pub fn health_json() -> String {
    serde_json::to_string(&HealthBody {
        status: "ok",
        message: HEALTH_MESSAGE,
    })
    .unwrap_or_default()
}

fn not_found_json() -> String {
    serde_json::to_string(&ErrorBody { error: "not found" }).unwrap_or_default()
}

fn header(name: &str, value: &str) -> Option<Header> {
    let parsed = Header::from_bytes(name.as_bytes(), value.as_bytes()).ok();
    if parsed.is_none() {
        log::warn!("Dropping malformed header {name}");
    }
    parsed
}

fn cors_headers(allow_origin: Option<&str>) -> Vec<Header> {
    match allow_origin {
        Some(origin) => [
            header("Access-Control-Allow-Origin", origin),
            header("Vary", "Origin"),
        ]
        .into_iter()
        .flatten()
        .collect(),
        None => Vec::new(),
    }
}

fn json_response(
    code: u16,
    body: String,
    allow_origin: Option<&str>,
) -> Response<Cursor<Vec<u8>>> {
    let mut response = Response::from_string(body).with_status_code(StatusCode(code));
    for h in header("Content-Type", "application/json")
        .into_iter()
        .chain(cors_headers(allow_origin))
    {
        response.add_header(h);
    }
    response
}

fn request_origin(request: &Request) -> Option<String> {
    request
        .headers()
        .iter()
        .find(|h| h.field.equiv("Origin"))
        .map(|h| h.value.as_str().to_string())
}

/// Serves requests until the listener is unblocked, one thread per request.
pub fn serve(server: Arc<Server>, state: Arc<AppState>) {
    for request in server.incoming_requests() {
        let state = state.clone();
        let spawned = std::thread::Builder::new()
            .name("http-request".into())
            .spawn(move || handle(request, &state));
        if let Err(e) = spawned {
            log::error!("Failed to spawn request handler: {e}");
        }
    }
}

fn handle(request: Request, state: &AppState) {
    let origin = request_origin(&request);
    let allow_origin = state.cors.allow_origin(origin.as_deref());
    let allow_origin = allow_origin.as_deref();
    let route = route(request.method(), request.url());
    log::debug!("{} {} -> {route:?}", request.method(), request.url());

    let result = match route {
        Route::Status => request.respond(json_response(
            200,
            status_json(state.status.load()),
            allow_origin,
        )),
        Route::Health => request.respond(json_response(200, health_json(), allow_origin)),
        Route::NotFound => request.respond(json_response(404, not_found_json(), allow_origin)),
        Route::Preflight => {
            let mut response = Response::empty(StatusCode(204));
            if allow_origin.is_some() {
                for h in cors_headers(allow_origin).into_iter().chain(
                    [
                        header("Access-Control-Allow-Methods", "GET, HEAD, OPTIONS"),
                        header("Access-Control-Allow-Headers", "Content-Type"),
                    ]
                    .into_iter()
                    .flatten(),
                ) {
                    response.add_header(h);
                }
            }
            request.respond(response)
        }
        Route::VideoFeed => stream_video(request, state, allow_origin),
    };

    if let Err(e) = result {
        log::debug!("Failed to write response: {e}");
    }
}

/// Takes over the connection and relays frames until the feed closes or
/// the client goes away.
fn stream_video(
    request: Request,
    state: &AppState,
    allow_origin: Option<&str>,
) -> io::Result<()> {
    let head_only = *request.method() == Method::Head;
    let mut writer = request.into_writer();
    writer.write_all(stream_head(allow_origin).as_bytes())?;
    writer.flush()?;
    if head_only {
        return Ok(());
    }

    let frames = state.broadcaster.subscribe();
    log::info!("Video stream client connected");
    let outcome = relay(frames, &mut *writer);
    match &outcome {
        Ok(parts) => log::info!("Video stream ended after {parts} frames"),
        Err(e) => log::info!("Video stream client disconnected: {e}"),
    }
    outcome.map(|_| ())
}
