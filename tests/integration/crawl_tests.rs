//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end.

use linkwatch::config::{
    Config, CrawlerConfig, OutputConfig, RetryConfig, SiteEntry, SnapshotConfig, UserAgentConfig,
};
use linkwatch::crawl_site;
use linkwatch::status::{BrokenReason, ExclusionReason, LinkStatus};
use linkwatch::{LinkwatchError, RecordStatus, VisitResult};
use std::collections::HashSet;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration crawling `seed`
fn create_test_config(seed: &str) -> Config {
    Config {
        crawler: CrawlerConfig {
            max_concurrent_requests: 5,
            max_requests_per_host: 5,
            minimum_request_interval: 0,
            request_timeout: 300,
            max_redirects: 10,
            max_path_length: 255,
            max_urls: None,
            deadline: None,
        },
        retry: RetryConfig {
            max_attempts: 3,
            initial_backoff: 10, // Very short for testing
            backoff_multiplier: 2,
            max_backoff: 1000,
            jitter: false,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        snapshot: SnapshotConfig {
            database_path: "./unused.db".to_string(),
            retention_days: 60,
        },
        output: OutputConfig::default(),
        sites: vec![SiteEntry {
            region: "AU".to_string(),
            seed: seed.to_string(),
            domains: vec![],
            exclude: vec![],
        }],
    }
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/html")
}

fn find<'a>(results: &'a [VisitResult], suffix: &str) -> &'a VisitResult {
    results
        .iter()
        .find(|r| r.url.ends_with(suffix))
        .unwrap_or_else(|| panic!("no result for {}", suffix))
}

#[tokio::test]
async fn test_broken_retried_and_ok_links() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<html><body>
               <a href="/missing">Missing</a>
               <a href="/flaky">Flaky</a>
               <a href="/fine">Fine</a>
               </body></html>"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    // Times out twice, then answers
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(html("<p>slow</p>").set_delay(Duration::from_secs(2)))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(html("<p>fast</p>"))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/fine"))
        .respond_with(html("<p>fine</p>"))
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(&format!("{}/", server.uri()));
    let outcome = crawl_site(&config, &config.sites[0]).await.unwrap();

    assert_eq!(outcome.results.len(), 4);
    assert!(!outcome.is_partial());

    let missing = find(&outcome.results, "/missing");
    assert_eq!(missing.status, LinkStatus::Broken(BrokenReason::Http(404)));
    assert_eq!(missing.attempts, 1);

    let flaky = find(&outcome.results, "/flaky");
    assert_eq!(flaky.status, LinkStatus::Ok);
    assert_eq!(flaky.attempts, 3);

    let fine = find(&outcome.results, "/fine");
    assert_eq!(fine.status, LinkStatus::Ok);
    assert_eq!(fine.attempts, 1);

    let broken = outcome.broken_records();
    assert_eq!(broken.len(), 1);
    assert_eq!(broken[0].region, "AU");
    assert_eq!(broken[0].status, RecordStatus::Http(404));
    assert!(broken[0].visible);
    assert!(broken[0].path.ends_with("/missing"));
}

#[tokio::test]
async fn test_no_duplicate_visits() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<a href="/a">A</a>
               <a href="/a#top">A again</a>
               <a href="/a?utm_source=news">A tracked</a>
               <a href="/b">B</a>
               <a href="https://elsewhere.invalid/page">Elsewhere</a>"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(html(
            r#"<a href="/">Home</a><a href="/b#x">B</a><a href="/b">B</a>"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(html(r#"<a href="/a">A</a><a href="/">Home</a>"#))
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(&format!("{}/", server.uri()));
    let outcome = crawl_site(&config, &config.sites[0]).await.unwrap();

    let unique: HashSet<&str> = outcome.results.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(unique.len(), outcome.results.len());
    assert_eq!(outcome.results.len(), 4);

    let b = find(&outcome.results, "/b");
    assert_eq!(b.referring_pages.len(), 2);

    let external = find(&outcome.results, "elsewhere.invalid/page");
    assert_eq!(
        external.status,
        LinkStatus::Excluded(ExclusionReason::External)
    );
    assert!(!external.is_internal);
    assert_eq!(external.attempts, 0);
    assert!(outcome.broken_records().is_empty());
}

#[tokio::test]
async fn test_max_urls_bounds_the_crawl() {
    let server = MockServer::start().await;

    let links: String = (0..10)
        .map(|i| format!(r#"<a href="/page{}">Page {}</a>"#, i, i))
        .collect();
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(&links))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(html(r#"<a href="/deeper">Deeper</a>"#))
        .mount(&server)
        .await;

    let mut config = create_test_config(&format!("{}/", server.uri()));
    config.crawler.max_urls = Some(5);
    let outcome = crawl_site(&config, &config.sites[0]).await.unwrap();

    assert!(outcome.results.len() <= 5);
    assert!(!outcome.results.is_empty());
    assert!(outcome.truncated);
    assert!(outcome.is_partial());
    assert!(outcome
        .results
        .iter()
        .all(|r| r.status == LinkStatus::Ok));
}

#[tokio::test]
async fn test_unresolvable_seed_is_fatal() {
    let config = create_test_config("http://nonexistent.invalid/");
    let err = crawl_site(&config, &config.sites[0]).await.unwrap_err();

    assert!(matches!(err, LinkwatchError::SeedUnreachable { .. }));
    assert!(err.is_configuration());
}

#[tokio::test]
async fn test_all_broken_is_still_a_report() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(r#"<a href="/x">X</a><a href="/y">Y</a>"#))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let config = create_test_config(&format!("{}/", server.uri()));
    let outcome = crawl_site(&config, &config.sites[0]).await.unwrap();

    let broken = outcome.broken_records();
    assert_eq!(broken.len(), 2);
    assert!(broken.iter().all(|r| r.status == RecordStatus::Http(500)));
}
