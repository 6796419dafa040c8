//! Integration tests for the harvester
//!
//! These tests use wiremock to stand in for the site's API and test full
//! traversal runs end-to-end against an on-disk database.

use graph_harvest::api::{ApiClient, Endpoints};
use graph_harvest::config::{load_config, Config};
use graph_harvest::crawler::{HaltReason, HarvestPlan, Orchestrator, TopicStatsScraper};
use graph_harvest::notify::{LogNotifier, Notifier};
use graph_harvest::storage::{
    CheckpointStore, FrontierStore, SqliteStorage, TopicStatsStore, RESTART_FROM_ROOT,
};
use graph_harvest::{CrawlMode, Harvester};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PACING: Duration = Duration::from_millis(10);
const TEST_AGENT: &str = "graph-harvest-tests/1.0";

/// Writes a config pointing at `base_url` and a database inside `dir`
fn create_test_config(dir: &TempDir, mode: &str, root: &str, base_url: &str) -> Config {
    let db_path = dir.path().join("harvest.db");
    let content = format!(
        r#"
[harvest]
mode = "{}"
root = "{}"

[session]
cookie = "\"z_c0=token; d_c0=device\""
user-agent = "{}"

[api]
base-url = "{}"

[output]
database-path = "{}"
"#,
        mode,
        root,
        TEST_AGENT,
        base_url,
        db_path.display()
    );

    let config_path = dir.path().join("harvest.toml");
    std::fs::write(&config_path, content).expect("Failed to write config");
    load_config(&config_path).expect("Failed to load config")
}

fn member_page(next: &str, is_end: bool, tokens: &[&str]) -> String {
    let data: Vec<serde_json::Value> = tokens
        .iter()
        .map(|t| serde_json::json!({"id": t, "url_token": t, "name": t.to_uppercase()}))
        .collect();
    serde_json::json!({
        "paging": {"is_end": is_end, "is_start": false, "next": next, "previous": "", "totals": 0},
        "data": data,
    })
    .to_string()
}

fn topic_page(next: &str, is_end: bool, ids: &[&str]) -> String {
    let data: Vec<serde_json::Value> = ids
        .iter()
        .map(|id| serde_json::json!({"id": id, "name": format!("topic {}", id)}))
        .collect();
    serde_json::json!({"paging": {"is_end": is_end, "next": next}, "data": data}).to_string()
}

fn json(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "application/json")
}

/// Every URL nothing else matched is an empty terminal page
async fn mount_empty_fallback(server: &MockServer) {
    Mock::given(method("GET"))
        .respond_with(json(member_page("", true, &[])))
        .mount(server)
        .await;
}

fn open_storage(config: &Config, mode: CrawlMode) -> Arc<SqliteStorage> {
    Arc::new(
        SqliteStorage::new(Path::new(&config.output.database_path), mode)
            .expect("Failed to open storage"),
    )
}

fn orchestrator(config: &Config, storage: &Arc<SqliteStorage>) -> Orchestrator {
    let mut plan = HarvestPlan::from_config(config).expect("Failed to build plan");
    plan.pacing = PACING;

    let source = Arc::new(ApiClient::from_config(config).expect("Failed to build client"));
    let notifier: Arc<dyn Notifier> = Arc::new(LogNotifier);
    Orchestrator::new(plan, source, storage.clone(), storage.clone(), notifier)
}

fn tokens(storage: &SqliteStorage) -> Vec<String> {
    let mut tokens = Vec::new();
    while let Ok(record) = storage.get_at(tokens.len() as u64) {
        tokens.push(record.token);
    }
    tokens
}

#[tokio::test]
async fn test_social_graph_harvest_end_to_end() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir, "social-graph", "root", &base_url);

    // First followee page of the root, only answered with the session presented
    Mock::given(method("GET"))
        .and(path("/api/v4/members/root/followees"))
        .and(query_param("offset", "0"))
        .and(query_param("limit", "20"))
        .and(header("cookie", "z_c0=token; d_c0=device"))
        .and(header("user-agent", TEST_AGENT))
        .respond_with(json(member_page(
            &format!("{}/page2", base_url),
            false,
            &["a", "b"],
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page2"))
        .respond_with(json(member_page("", false, &[])))
        .expect(1)
        .mount(&mock_server)
        .await;

    mount_empty_fallback(&mock_server).await;

    let storage = open_storage(&config, CrawlMode::HarvestSocialGraph);
    let summary = orchestrator(&config, &storage)
        .run(graph_harvest::crawler::Lifecycle::new())
        .await
        .unwrap();

    assert_eq!(summary.halt, HaltReason::Exhausted);
    assert_eq!(summary.visited, 3);
    assert_eq!(tokens(&storage), vec!["root", "a", "b"]);
    assert_eq!(storage.get_at(1).unwrap().name.as_deref(), Some("A"));

    // Exhaustion sends the next run back to the root's seed URLs
    let checkpoint = storage.latest().unwrap().checkpoint;
    assert_eq!(checkpoint.reference_row_id, RESTART_FROM_ROOT);
    let endpoints = Endpoints::new(&base_url).unwrap();
    assert_eq!(
        checkpoint.cursors,
        endpoints.seed_urls(CrawlMode::HarvestSocialGraph.edge_kinds(), "root")
    );
}

#[tokio::test]
async fn test_resume_across_runs() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir, "social-graph", "root", &base_url);
    let second_page = format!("{}/root-followees-2", base_url);

    // Slow enough that the stop request lands while it is in flight
    Mock::given(method("GET"))
        .and(path("/api/v4/members/root/followees"))
        .respond_with(
            json(member_page(&second_page, false, &["a"])).set_delay(Duration::from_millis(500)),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/root-followees-2"))
        .respond_with(json(member_page("", true, &["b"])))
        .expect(1)
        .mount(&mock_server)
        .await;

    mount_empty_fallback(&mock_server).await;

    // First run: stopped while the first page is in flight
    let storage = open_storage(&config, CrawlMode::HarvestSocialGraph);
    let first = orchestrator(&config, &storage);
    let harvester = Harvester::start(|lifecycle| first.run(lifecycle), None);
    tokio::time::sleep(Duration::from_millis(100)).await;
    harvester.request_stop();
    let summary = harvester.shutdown().await.unwrap();
    drop(storage);

    assert_eq!(summary.halt, HaltReason::Stopped);
    assert_eq!(summary.visited, 1);

    // The in-flight page was still recorded
    let storage = open_storage(&config, CrawlMode::HarvestSocialGraph);
    assert_eq!(tokens(&storage), vec!["root", "a"]);
    let checkpoint = storage.latest().unwrap().checkpoint;
    assert_eq!(checkpoint.reference_row_id, storage.get_at(0).unwrap().row_id);
    assert_eq!(checkpoint.cursors[0], second_page);

    // Second run: picks up at the dangling cursor and finishes
    let summary = orchestrator(&config, &storage)
        .run(graph_harvest::crawler::Lifecycle::new())
        .await
        .unwrap();

    assert_eq!(summary.halt, HaltReason::Exhausted);
    assert_eq!(tokens(&storage), vec!["root", "a", "b"]);
}

#[tokio::test]
async fn test_malformed_pages_skip_identifier() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir, "social-graph", "root", &base_url);

    Mock::given(method("GET"))
        .and(path("/api/v4/members/root/followees"))
        .respond_with(json(member_page("", true, &["expired", "fine"])))
        .mount(&mock_server)
        .await;

    // A login page instead of JSON, every time
    Mock::given(method("GET"))
        .and(path("/api/v4/members/expired/followees"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("<!DOCTYPE html><html>sign in</html>", "text/html"),
        )
        .expect(5)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v4/members/fine/followers"))
        .respond_with(json(member_page("", true, &["c"])))
        .mount(&mock_server)
        .await;

    mount_empty_fallback(&mock_server).await;

    let storage = open_storage(&config, CrawlMode::HarvestSocialGraph);
    let summary = orchestrator(&config, &storage)
        .run(graph_harvest::crawler::Lifecycle::new())
        .await
        .unwrap();

    assert_eq!(summary.halt, HaltReason::Exhausted);
    assert_eq!(tokens(&storage), vec!["root", "expired", "fine", "c"]);
}

#[tokio::test]
async fn test_topic_tree_harvest_and_stats_pass() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir, "topic-tree", "19776749", &base_url);

    Mock::given(method("GET"))
        .and(path("/api/v3/topics/19776749/children"))
        .and(query_param("limit", "10"))
        .respond_with(json(topic_page("", true, &["100", "200"])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v3/topics/100/children"))
        .respond_with(json(topic_page("", true, &["300"])))
        .mount(&mock_server)
        .await;

    for (id, followers, questions) in [("19776749", 5000, 40), ("100", 12, 3)] {
        Mock::given(method("GET"))
            .and(path(format!("/topic/{}/hot", id)))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                format!(
                    r#"<html><body><div class="NumberBoard">
                        <strong class="NumberBoard-itemValue" title="{}">x</strong>
                        <strong class="NumberBoard-itemValue" title="{}">y</strong>
                    </div></body></html>"#,
                    followers, questions
                ),
                "text/html",
            ))
            .mount(&mock_server)
            .await;
    }

    mount_empty_fallback(&mock_server).await;

    let storage = open_storage(&config, CrawlMode::HarvestTopicTree);
    let summary = orchestrator(&config, &storage)
        .run(graph_harvest::crawler::Lifecycle::new())
        .await
        .unwrap();

    assert_eq!(summary.halt, HaltReason::Exhausted);
    assert_eq!(tokens(&storage), vec!["19776749", "100", "200", "300"]);

    let scraper = TopicStatsScraper::new(
        storage.clone(),
        storage.clone(),
        Arc::new(ApiClient::from_config(&config).unwrap()),
        Endpoints::new(&base_url).unwrap(),
        PACING,
    );
    let stats_summary = scraper
        .run(graph_harvest::crawler::Lifecycle::new())
        .await
        .unwrap();

    assert_eq!(stats_summary.visited, 4);
    assert_eq!(storage.count_topic_stats().unwrap(), 4);

    let root = storage.get_at(0).unwrap();
    let root_stats = storage.get_topic_stats(root.row_id).unwrap();
    assert_eq!(root_stats.follower_count, Some(5000));
    assert_eq!(root_stats.question_count, Some(40));

    // Topics without a number board get a row with no counters
    let leaf = storage.get_at(3).unwrap();
    assert_eq!(storage.get_topic_stats(leaf.row_id).unwrap().follower_count, None);
}

#[tokio::test]
async fn test_forbidden_status_aborts_edge_without_retry() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir, "social-graph", "root", &base_url);

    Mock::given(method("GET"))
        .and(path("/api/v4/members/root/followees"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v4/members/root/followers"))
        .respond_with(json(member_page("", true, &["a"])))
        .mount(&mock_server)
        .await;

    mount_empty_fallback(&mock_server).await;

    let storage = open_storage(&config, CrawlMode::HarvestSocialGraph);
    let summary = orchestrator(&config, &storage)
        .run(graph_harvest::crawler::Lifecycle::new())
        .await
        .unwrap();

    assert_eq!(summary.halt, HaltReason::Exhausted);
    assert_eq!(tokens(&storage), vec!["root", "a"]);
}
