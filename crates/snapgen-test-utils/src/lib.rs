//! Testing utilities for the snapgen workspace
//!
//! In-process stand-ins for the services snapgen calls, served by `warp` on
//! an ephemeral localhost port, plus payload fixtures.

#![allow(missing_docs)]

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::collections::HashMap;
use std::net::{SocketAddr, TcpListener};
use std::sync::{Arc, Mutex};
use warp::http::StatusCode;
use warp::Filter;

/// Base64-encode a config file the way the contents API does (60 columns)
pub fn encode_config(json: &str) -> String {
    let encoded = STANDARD.encode(json);
    encoded
        .as_bytes()
        .chunks(60)
        .map(|line| format!("{}\n", String::from_utf8_lossy(line)))
        .collect()
}

/// URL on a localhost port nothing listens on
pub fn unreachable_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);
    format!("http://127.0.0.1:{port}/unreachable/")
}

/// Push payload JSON for `repo` with the given commit ids
pub fn push_payload(repo: &str, commit_ids: &[&str]) -> String {
    let commits: Vec<_> = commit_ids
        .iter()
        .map(|id| {
            serde_json::json!({
                "id": id,
                "message": format!("Update spec ({id})"),
                "timestamp": "2018-03-01T12:00:00Z",
                "url": format!("https://github.com/{repo}/commit/{id}"),
            })
        })
        .collect();

    serde_json::json!({
        "ref": "refs/heads/main",
        "repository": { "full_name": repo },
        "commits": commits,
    })
    .to_string()
}

#[derive(Debug, Clone)]
enum ContentsEntry {
    Content(String),
    Raw(StatusCode, String),
}

/// Fake GitHub contents API
#[derive(Debug, Default)]
pub struct FakeGitHub {
    entries: HashMap<String, ContentsEntry>,
}

impl FakeGitHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `content` (already base64) as the config of `repo`
    pub fn with_content(mut self, repo: &str, content: String) -> Self {
        self.entries
            .insert(repo.to_string(), ContentsEntry::Content(content));
        self
    }

    /// Serve `json` as the config of `repo`
    pub fn with_config(self, repo: &str, json: &str) -> Self {
        self.with_content(repo, encode_config(json))
    }

    /// Answer requests for `repo` with `502 Bad Gateway` and `body`
    pub fn with_raw_body(self, repo: &str, body: &str) -> Self {
        self.with_response(repo, 502, body)
    }

    /// Answer requests for `repo` with `status` and `body` verbatim
    pub fn with_response(mut self, repo: &str, status: u16, body: &str) -> Self {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        self.entries
            .insert(repo.to_string(), ContentsEntry::Raw(status, body.to_string()));
        self
    }

    pub fn spawn(self) -> FakeGitHubHandle {
        let entries = Arc::new(self.entries);
        let user_agents = Arc::new(Mutex::new(Vec::new()));
        let requests = Arc::new(Mutex::new(Vec::new()));

        let seen_agents = Arc::clone(&user_agents);
        let seen_requests = Arc::clone(&requests);
        let route = warp::path!("repos" / String / String / "contents" / String)
            .and(warp::get())
            .and(warp::header::optional::<String>("user-agent"))
            .map(move |owner: String, name: String, file: String, agent: Option<String>| {
                let repo = format!("{owner}/{name}");
                seen_requests
                    .lock()
                    .unwrap()
                    .push(format!("{repo}/contents/{file}"));
                if let Some(agent) = agent {
                    seen_agents.lock().unwrap().push(agent);
                }

                let (status, body) = match entries.get(&repo) {
                    Some(ContentsEntry::Content(content)) => (
                        StatusCode::OK,
                        serde_json::json!({
                            "name": file,
                            "encoding": "base64",
                            "content": content,
                        })
                        .to_string(),
                    ),
                    Some(ContentsEntry::Raw(status, body)) => (*status, body.clone()),
                    None => (
                        StatusCode::NOT_FOUND,
                        serde_json::json!({ "message": "Not Found" }).to_string(),
                    ),
                };
                warp::reply::with_status(body, status)
            });

        let (addr, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);

        FakeGitHubHandle {
            addr,
            user_agents,
            requests,
        }
    }
}

/// Running fake GitHub
#[derive(Debug, Clone)]
pub struct FakeGitHubHandle {
    addr: SocketAddr,
    user_agents: Arc<Mutex<Vec<String>>>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl FakeGitHubHandle {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// `User-Agent` headers received, in order
    pub fn user_agents(&self) -> Vec<String> {
        self.user_agents.lock().unwrap().clone()
    }

    /// `{repo}/contents/{file}` of every request, in order
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

/// Fake Bikeshed API and spec-generator
#[derive(Debug)]
pub struct FakeRenderer {
    status: u16,
}

impl Default for FakeRenderer {
    fn default() -> Self {
        Self { status: 200 }
    }
}

impl FakeRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every request with `status`
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn spawn(self) -> FakeRendererHandle {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::OK);
        let requests = Arc::new(Mutex::new(Vec::new()));

        let seen = Arc::clone(&requests);
        let route = warp::path::param::<String>()
            .and(warp::get())
            .and(warp::query::raw())
            .map(move |renderer: String, query: String| {
                seen.lock().unwrap().push(format!("/{renderer}/?{query}"));
                let body = format!(
                    "<!DOCTYPE html><html><head><title>{renderer}</title></head>\
                     <body>rendered by {renderer}: {query}</body></html>"
                );
                warp::reply::with_status(warp::reply::html(body), status)
            });

        let (addr, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);

        FakeRendererHandle { addr, requests }
    }
}

/// Running fake renderer
#[derive(Debug, Clone)]
pub struct FakeRendererHandle {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<String>>>,
}

impl FakeRendererHandle {
    pub fn bikeshed_endpoint(&self) -> String {
        format!("http://{}/bikeshed/", self.addr)
    }

    pub fn respec_endpoint(&self) -> String {
        format!("http://{}/spec-generator/", self.addr)
    }

    /// Path and query of every request, in order
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}
