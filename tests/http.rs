//! End-to-end tests against a mock site.
//!
//! These use wiremock to serve listing and post pages and run the real
//! reqwest client through the harvest pipeline.

use std::sync::Arc;
use std::time::Duration;

use harvester::error::AppError;
use harvester::models::Config;
use harvester::pipeline::{HarvestOptions, ModeRequest, RunMode, run_harvest};
use harvester::services::{PageParser, RetryPolicy, RetryingFetcher, WhutParser};
use harvester::storage::{Artifact, LocalStorage, SnapshotStorage};
use harvester::utils::http::{FetchClient, HttpFetchClient};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(base_url: &str) -> Config {
    let mut config = Config::default();
    config.site.base_url = base_url.to_string();
    config.site.categories = vec!["news".to_string()];
    config.crawler.max_attempts = 2;
    config.crawler.retry_delay_secs = 0;
    config
}

fn fetcher(config: &Config) -> RetryingFetcher {
    let client = HttpFetchClient::from_config(&config.crawler).expect("client");
    RetryingFetcher::from_config(Arc::new(client), &config.crawler)
}

fn parser() -> Arc<dyn PageParser> {
    Arc::new(WhutParser::new().expect("parser"))
}

fn listing(page_count: usize, posts: &[u32]) -> String {
    let items: String = posts
        .iter()
        .map(|n| format!(r#"<li><span><a href="{n}.shtml">Post {n}</a></span></li>"#))
        .collect();
    format!(
        r#"<html><head><script>var countPage = {page_count};</script></head>
        <body><ul class="normal_list2">{items}</ul></body></html>"#
    )
}

fn post(n: u32) -> String {
    format!(
        "<html><head><title>欢迎访问武汉理工大学综合信息系统</title></head><body>\
         <div class=\"art_tit\"><h2>Post {n}</h2></div>\
         <div class=\"art_info\">发布：office\u{a0}\u{a0}时间：2024-01-0{n}\u{a0}</div>\
         <div class=\"art_text\"><p>body {n}</p></div>\
         </body></html>"
    )
}

async fn mount_page(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

async fn mount_posts(server: &MockServer, posts: &[u32]) {
    for &n in posts {
        mount_page(server, &format!("/news/{n}.shtml"), post(n)).await;
    }
}

fn titles(snapshot: &harvester::models::ListSnapshot) -> Vec<&str> {
    snapshot
        .get("news")
        .iter()
        .map(|p| p.title.as_str())
        .collect()
}

#[tokio::test]
async fn test_client_fetches_body() {
    let server = MockServer::start().await;
    mount_page(&server, "/hello", "hi".to_string()).await;

    let client = HttpFetchClient::from_config(&Config::default().crawler).unwrap();
    let body = client
        .get(&format!("{}/hello", server.uri()), Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(body, b"hi");
}

#[tokio::test]
async fn test_error_status_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    mount_page(&server, "/flaky", "ok".to_string()).await;

    let client = HttpFetchClient::from_config(&Config::default().crawler).unwrap();
    let fetcher = RetryingFetcher::new(
        Arc::new(client),
        RetryPolicy::new(3, Duration::ZERO),
        Duration::from_secs(5),
    );

    let body = fetcher
        .fetch_text(&format!("{}/flaky", server.uri()))
        .await
        .unwrap();
    assert_eq!(body, "ok");
}

#[tokio::test]
async fn test_exhausted_retries_report_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let config = test_config(&server.uri());
    let result = fetcher(&config)
        .fetch_text(&format!("{}/down", server.uri()))
        .await;
    assert!(matches!(result, Err(AppError::Transport { attempts: 2, .. })));
}

#[tokio::test]
async fn test_full_then_incremental_harvest() {
    let server = MockServer::start().await;
    let config = test_config(&server.uri());
    let tmp = TempDir::new().unwrap();
    let storage = LocalStorage::new(tmp.path());

    mount_page(&server, "/news", listing(2, &[2, 1])).await;
    mount_page(&server, "/news/index_1.shtml", listing(2, &[0])).await;
    mount_posts(&server, &[2, 1, 0]).await;

    let report = run_harvest(
        &config,
        &storage,
        fetcher(&config),
        parser(),
        HarvestOptions::default(),
    )
    .await
    .unwrap();
    assert_eq!(report.mode, RunMode::Full);
    assert_eq!(report.list_total, 3);
    assert_eq!(report.content_total, 3);

    // Two new posts appear at the top of the listing.
    server.reset().await;
    mount_page(&server, "/news", listing(2, &[4, 3, 2])).await;
    mount_page(&server, "/news/index_1.shtml", listing(2, &[1, 0])).await;
    mount_posts(&server, &[4, 3]).await;

    let report = run_harvest(
        &config,
        &storage,
        fetcher(&config),
        parser(),
        HarvestOptions {
            mode: ModeRequest::Update,
            force_refetch: false,
        },
    )
    .await
    .unwrap();
    assert_eq!(report.mode, RunMode::Incremental);
    assert_eq!(report.details_fetched, 2);

    let lists = storage.load_lists(Artifact::PostList).await.unwrap().unwrap();
    assert_eq!(
        titles(&lists),
        vec!["Post 4", "Post 3", "Post 2", "Post 1", "Post 0"]
    );
    let diff = storage
        .load_lists(Artifact::PostListDiff)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(titles(&diff), vec!["Post 4", "Post 3"]);

    let contents = storage
        .load_contents(Artifact::PostContent)
        .await
        .unwrap()
        .unwrap();
    let dates: Vec<_> = contents
        .get("news")
        .iter()
        .map(|d| d.date.as_str())
        .collect();
    assert_eq!(
        dates,
        vec!["2024-01-04", "2024-01-03", "2024-01-02", "2024-01-01", "2024-01-00"]
    );

    // The boundary sits on page 0, so page 1 was never requested.
    let requests = server.received_requests().await.unwrap();
    assert!(
        requests
            .iter()
            .all(|r| r.url.path() != "/news/index_1.shtml")
    );
}
