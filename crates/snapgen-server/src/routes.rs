//! HTTP routes
//!
//! - `POST /payload` - GitHub push webhook
//! - `GET /`, `POST /` - liveness / echo
//! - everything else - static files from the public directory, including
//!   the snapshot tree

use crate::state::AppState;
use serde::Deserialize;
use serde_json::value::RawValue;
use snapgen_core::{PayloadError, PushEvent};
use std::convert::Infallible;
use std::path::PathBuf;
use warp::http::StatusCode;
use warp::hyper::body::Bytes;
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

/// GitHub caps webhook payloads at 25 MB
const MAX_PAYLOAD_BYTES: u64 = 25 * 1024 * 1024;

/// All routes of the server
pub fn routes(
    state: AppState,
    public_dir: impl Into<PathBuf>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let hello = warp::path::end()
        .and(warp::get())
        .map(|| "Hello World!");

    let echo = warp::path::end()
        .and(warp::post())
        .map(|| "Got a POST request");

    let payload = warp::path!("payload")
        .and(warp::post())
        .and(warp::header::optional::<String>("x-github-event"))
        .and(warp::body::content_length_limit(MAX_PAYLOAD_BYTES))
        .and(warp::body::bytes())
        .and(with_state(state))
        .map(handle_payload);

    let files = warp::fs::dir(public_dir.into());

    payload
        .or(hello)
        .or(echo)
        .or(files)
        .with(warp::trace::request())
}

fn with_state(state: AppState) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

fn handle_payload(event_kind: Option<String>, body: Bytes, state: AppState) -> Response {
    if event_kind.as_deref() == Some("ping") {
        tracing::info!("received webhook ping");
        return "pong".into_response();
    }

    match PushEvent::from_slice(&body) {
        Ok(event) => {
            let ack = acknowledgement(&event, &body);
            tracing::info!(
                repository = %event.repo(),
                commits = event.commits.len(),
                "push received"
            );
            state.dispatch(event);
            ack.into_response()
        }
        Err(e) => bad_request(&e),
    }
}

#[derive(Deserialize)]
struct RawCommits<'a> {
    #[serde(borrow)]
    commits: &'a RawValue,
}

/// Body of the immediate reply to a push
///
/// Echoes the `commits` array exactly as received in `body`. Sent before any
/// snapshot work, so it says nothing about the outcome.
#[must_use]
pub fn acknowledgement(event: &PushEvent, body: &[u8]) -> String {
    let commits = match serde_json::from_slice::<RawCommits<'_>>(body) {
        Ok(raw) => raw.commits.get().to_string(),
        Err(_) => serde_json::to_string(&event.commits).unwrap_or_default(),
    };
    format!("Repository: {}\nCommits: {commits}", event.repo())
}

fn bad_request(error: &PayloadError) -> Response {
    tracing::warn!(error = %error, "rejected push payload");
    warp::reply::with_status(error.to_string(), StatusCode::BAD_REQUEST).into_response()
}
