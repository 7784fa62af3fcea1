//! Webhook to snapshot, against fake GitHub and renderer services.

use futures::future::join_all;
use pretty_assertions::assert_eq;
use snapgen_core::{SnapgenConfig, SnapshotIndex, SnapshotPipeline};
use snapgen_server::{routes, AppState, EventReport, EventStatus};
use snapgen_test_utils::{
    push_payload, unreachable_url, FakeGitHub, FakeGitHubHandle, FakeRenderer, FakeRendererHandle,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::broadcast;

const BIKESHED_CONFIG: &str = r#"{ "type": "bikeshed", "src_file": "Overview.bs" }"#;
const RESPEC_CONFIG: &str = r#"{ "type": "respec", "src_file": "index.html" }"#;

struct Harness {
    dir: TempDir,
    state: AppState,
    github: FakeGitHubHandle,
    renderer: FakeRendererHandle,
}

impl Harness {
    fn new(github: FakeGitHub) -> Self {
        Self::with_config(github, |_| {})
    }

    fn with_config(github: FakeGitHub, adjust: impl FnOnce(&mut SnapgenConfig)) -> Self {
        let github = github.spawn();
        let renderer = FakeRenderer::new().spawn();
        let dir = tempfile::tempdir().unwrap();

        let mut config = SnapgenConfig::new().with_public_dir(dir.path());
        config.endpoints.github_api = github.base_url();
        config.endpoints.bikeshed = renderer.bikeshed_endpoint();
        config.endpoints.respec = renderer.respec_endpoint();
        adjust(&mut config);

        let state = AppState::new(SnapshotPipeline::from_config(&config).unwrap());
        Self {
            dir,
            state,
            github,
            renderer,
        }
    }

    fn public(&self) -> &Path {
        self.dir.path()
    }

    fn repo_dir(&self, repo: &str) -> PathBuf {
        self.public().join("snapshot").join(repo)
    }

    async fn push(&self, repo: &str, commits: &[&str]) -> u16 {
        let res = warp::test::request()
            .method("POST")
            .path("/payload")
            .header("x-github-event", "push")
            .body(push_payload(repo, commits))
            .reply(&routes(self.state.clone(), self.public().to_path_buf()))
            .await;
        res.status().as_u16()
    }

    fn index(&self, repo: &str) -> SnapshotIndex {
        let raw = std::fs::read(self.repo_dir(repo).join("snapshots.json")).unwrap();
        serde_json::from_slice(&raw).unwrap()
    }
}

async fn next_report(reports: &mut broadcast::Receiver<EventReport>) -> EventReport {
    tokio::time::timeout(Duration::from_secs(10), reports.recv())
        .await
        .expect("pipeline report within 10s")
        .expect("report channel open")
}

#[tokio::test]
async fn bikeshed_push_is_rendered_and_indexed() {
    let h = Harness::new(FakeGitHub::new().with_config("w3c/csswg-test", BIKESHED_CONFIG));
    let mut reports = h.state.subscribe();

    assert_eq!(h.push("w3c/csswg-test", &["abc123", "def456"]).await, 200);
    let report = next_report(&mut reports).await;

    let snapshot = h.repo_dir("w3c/csswg-test").join("abc123.html");
    assert!(
        matches!(report.status, EventStatus::Snapshotted { ref path, index_len: 1, .. } if *path == snapshot),
        "{report:?}"
    );
    assert_eq!(report.commit.as_deref(), Some("abc123"));

    assert_eq!(
        h.renderer.requests(),
        vec![
            "/bikeshed/?url=https%3A%2F%2Fraw.githubusercontent.com%2Fw3c%2Fcsswg-test%2Fabc123%2FOverview.bs"
                .to_string()
        ]
    );
    assert_eq!(
        h.github.requests(),
        vec!["w3c/csswg-test/contents/.pr-preview.json".to_string()]
    );
    assert_eq!(h.github.user_agents(), vec!["W3C Commit Snapshot Generator".to_string()]);

    let html = std::fs::read_to_string(&snapshot).unwrap();
    assert!(html.contains("rendered by bikeshed"));
    assert!(!h.repo_dir("w3c/csswg-test").join("def456.html").exists());

    let index = h.index("w3c/csswg-test");
    assert_eq!(index.len(), 1);
    assert_eq!(index.snapshots[0].id, "abc123");
    assert_eq!(index.snapshots[0].message, "Update spec (abc123)");
    assert_eq!(
        index.snapshots[0].url,
        "https://github.com/w3c/csswg-test/commit/abc123"
    );

    let served = warp::test::request()
        .method("GET")
        .path("/snapshot/w3c/csswg-test/snapshots.json")
        .reply(&routes(h.state.clone(), h.public().to_path_buf()))
        .await;
    assert_eq!(served.status(), 200);
    let served: SnapshotIndex = serde_json::from_slice(served.body()).unwrap();
    assert_eq!(served, index);
}

#[tokio::test]
async fn respec_push_renders_mirrored_source() {
    let h = Harness::new(FakeGitHub::new().with_config("w3c/payment-request", RESPEC_CONFIG));
    let mut reports = h.state.subscribe();

    assert_eq!(h.push("w3c/payment-request", &["f00d"]).await, 200);
    let report = next_report(&mut reports).await;
    assert!(!report.is_failure(), "{report:?}");

    assert_eq!(
        h.renderer.requests(),
        vec![
            "/spec-generator/?type=respec&url=https%3A%2F%2Frawgit.com%2Fw3c%2Fpayment-request%2Ff00d%2Findex.html"
                .to_string()
        ]
    );
    assert!(h.repo_dir("w3c/payment-request").join("f00d.html").exists());
}

#[tokio::test]
async fn repository_without_config_is_left_alone() {
    let h = Harness::new(FakeGitHub::new());
    let mut reports = h.state.subscribe();

    assert_eq!(h.push("w3c/no-preview", &["abc"]).await, 200);
    let report = next_report(&mut reports).await;

    assert!(matches!(report.status, EventStatus::Skipped { .. }), "{report:?}");
    assert!(h.renderer.requests().is_empty());
    assert!(!h.repo_dir("w3c/no-preview").exists());
}

#[tokio::test]
async fn github_error_status_fails_at_config() {
    let h = Harness::new(
        FakeGitHub::new().with_response("w3c/spec", 403, r#"{"message":"API rate limit exceeded"}"#),
    );
    let mut reports = h.state.subscribe();

    assert_eq!(h.push("w3c/spec", &["abc"]).await, 200);
    let report = next_report(&mut reports).await;

    match &report.status {
        EventStatus::Failed { stage, error } => {
            assert_eq!(stage, "config");
            assert!(error.contains("API rate limit exceeded"), "{error}");
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(h.renderer.requests().is_empty());
    assert!(!h.repo_dir("w3c/spec").exists());
}

#[tokio::test]
async fn unknown_type_renders_nothing() {
    let h = Harness::new(
        FakeGitHub::new().with_config("whatwg/html", r#"{ "type": "wattsi", "src_file": "source" }"#),
    );
    let mut reports = h.state.subscribe();

    assert_eq!(h.push("whatwg/html", &["abc"]).await, 200);
    let report = next_report(&mut reports).await;

    match &report.status {
        EventStatus::Failed { stage, error } => {
            assert_eq!(stage, "doc_type");
            assert!(error.contains("wattsi"));
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(h.renderer.requests().is_empty());
    assert!(!h.repo_dir("whatwg/html").exists());
}

#[tokio::test]
async fn unreachable_renderer_leaves_no_file_and_no_record() {
    let h = Harness::with_config(
        FakeGitHub::new().with_config("w3c/spec", BIKESHED_CONFIG),
        |config| config.endpoints.bikeshed = unreachable_url(),
    );
    let mut reports = h.state.subscribe();

    assert_eq!(h.push("w3c/spec", &["abc"]).await, 200);
    let report = next_report(&mut reports).await;

    assert!(
        matches!(report.status, EventStatus::Failed { ref stage, .. } if stage == "render"),
        "{report:?}"
    );
    assert!(!h.repo_dir("w3c/spec").join("abc.html").exists());
    assert!(!h.repo_dir("w3c/spec").join("snapshots.json").exists());
}

#[tokio::test]
async fn empty_push_is_acknowledged_and_skipped() {
    let h = Harness::new(FakeGitHub::new().with_config("w3c/spec", BIKESHED_CONFIG));
    let mut reports = h.state.subscribe();

    assert_eq!(h.push("w3c/spec", &[]).await, 200);
    let report = next_report(&mut reports).await;

    assert_eq!(report.commit, None);
    assert!(matches!(report.status, EventStatus::Skipped { .. }));
    assert!(h.github.requests().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_pushes_to_one_repository_are_all_indexed() {
    let h = Harness::new(FakeGitHub::new().with_config("w3c/spec", BIKESHED_CONFIG));
    let mut reports = h.state.subscribe();

    let commits: Vec<String> = (0..8).map(|i| format!("c0ffee{i}")).collect();
    let harness = &h;
    let pushes = commits
        .iter()
        .map(|id| async move { harness.push("w3c/spec", &[id.as_str()]).await });
    for status in join_all(pushes).await {
        assert_eq!(status, 200);
    }

    for _ in 0..commits.len() {
        let report = next_report(&mut reports).await;
        assert!(!report.is_failure(), "{report:?}");
    }

    let index = h.index("w3c/spec");
    assert_eq!(index.len(), commits.len());
    for id in &commits {
        assert!(index.snapshots.iter().any(|r| &r.id == id), "missing {id}");
        assert!(h.repo_dir("w3c/spec").join(format!("{id}.html")).exists());
    }
}
