use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use level_crawler::*;

/// In-memory link graph: url -> outgoing links.
#[derive(Default)]
struct GraphDownloader {
    pages: HashMap<String, Vec<String>>,
    failing: HashSet<String>,
    broken_documents: HashSet<String>,
    hanging: HashSet<String>,
    panicking: HashSet<String>,
    panicking_documents: HashSet<String>,
    delay: Duration,
    tracker: Arc<HostTracker>,
}

#[derive(Default)]
struct HostTracker {
    state: Mutex<HashMap<String, (usize, usize)>>,
    fetched: Mutex<Vec<String>>,
}

impl HostTracker {
    fn enter(&self, url: &str) {
        let host = url::Url::parse(url).unwrap().host_str().unwrap().to_string();
        let mut state = self.state.lock().unwrap();
        let (current, max) = state.entry(host).or_default();
        *current += 1;
        *max = (*max).max(*current);
        self.fetched.lock().unwrap().push(url.to_string());
    }

    fn leave(&self, url: &str) {
        let host = url::Url::parse(url).unwrap().host_str().unwrap().to_string();
        let mut state = self.state.lock().unwrap();
        state.get_mut(&host).unwrap().0 -= 1;
    }

    fn max_in_flight(&self, host: &str) -> usize {
        self.state.lock().unwrap().get(host).map_or(0, |s| s.1)
    }

    fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

impl GraphDownloader {
    fn new(edges: &[(&str, &[&str])]) -> Self {
        let pages = edges
            .iter()
            .map(|(url, links)| {
                (
                    url.to_string(),
                    links.iter().map(|l| l.to_string()).collect(),
                )
            })
            .collect();
        Self {
            pages,
            ..Self::default()
        }
    }

    fn failing(mut self, url: &str) -> Self {
        self.failing.insert(url.to_string());
        self
    }

    fn broken_document(mut self, url: &str) -> Self {
        self.broken_documents.insert(url.to_string());
        self
    }

    fn hanging(mut self, url: &str) -> Self {
        self.hanging.insert(url.to_string());
        self
    }

    fn panicking(mut self, url: &str) -> Self {
        self.panicking.insert(url.to_string());
        self
    }

    fn panicking_document(mut self, url: &str) -> Self {
        self.panicking_documents.insert(url.to_string());
        self
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

struct GraphDocument {
    links: Result<Vec<String>, ExtractError>,
    panics: bool,
}

#[async_trait]
impl Document for GraphDocument {
    async fn extract_links(&self) -> Result<Vec<String>, ExtractError> {
        if self.panics {
            panic!("document exploded");
        }
        self.links.clone()
    }
}

#[async_trait]
impl Downloader for GraphDownloader {
    async fn download(&self, url: &str) -> Result<Box<dyn Document>, FetchError> {
        if self.hanging.contains(url) {
            std::future::pending::<()>().await;
        }

        self.tracker.enter(url);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.tracker.leave(url);

        if self.panicking.contains(url) {
            panic!("downloader exploded on {}", url);
        }
        if self.failing.contains(url) {
            return Err(FetchError::Status(500));
        }
        let links = if self.broken_documents.contains(url) {
            Err(ExtractError::Parse("unterminated tag".to_string()))
        } else {
            Ok(self.pages.get(url).cloned().unwrap_or_default())
        };
        Ok(Box::new(GraphDocument {
            links,
            panics: self.panicking_documents.contains(url),
        }))
    }
}

fn crawler(downloader: GraphDownloader, config: CrawlerConfig) -> Crawler {
    Crawler::new(Arc::new(downloader), config).unwrap()
}

fn downloaded_set(result: &CrawlResult) -> HashSet<String> {
    result.downloaded.iter().cloned().collect()
}

#[tokio::test]
async fn test_depth_zero_does_nothing() {
    let crawler = crawler(
        GraphDownloader::new(&[("http://a.com/", &["http://b.com/"])]),
        CrawlerConfig::default(),
    );
    let result = crawler.crawl("http://a.com/", 0).await.unwrap();
    assert!(result.downloaded.is_empty());
    assert!(result.errors.is_empty());
}

#[tokio::test]
async fn test_depth_bounds_the_traversal() {
    let graph = || {
        GraphDownloader::new(&[
            ("http://x.com/a", &["http://x.com/b", "http://x.com/c"]),
            ("http://x.com/b", &["http://x.com/d"]),
            ("http://x.com/c", &[]),
            ("http://x.com/d", &[]),
        ])
    };

    let shallow = crawler(graph(), CrawlerConfig::new(4, 2, 2));
    let result = shallow.crawl("http://x.com/a", 2).await.unwrap();
    let downloaded = downloaded_set(&result);
    assert_eq!(
        downloaded,
        HashSet::from([
            "http://x.com/a".to_string(),
            "http://x.com/b".to_string(),
            "http://x.com/c".to_string(),
        ])
    );
    assert!(!downloaded.contains("http://x.com/d"));

    let deep = crawler(graph(), CrawlerConfig::new(4, 2, 2));
    let result = deep.crawl("http://x.com/a", 3).await.unwrap();
    assert!(downloaded_set(&result).contains("http://x.com/d"));
}

#[tokio::test]
async fn test_seed_only_at_depth_one() {
    let crawler = crawler(
        GraphDownloader::new(&[("http://x.com/", &["http://x.com/next"])]),
        CrawlerConfig::default(),
    );
    let result = crawler.crawl("http://x.com/", 1).await.unwrap();
    assert_eq!(result.downloaded, vec!["http://x.com/"]);
}

#[tokio::test]
async fn test_cycles_are_visited_once() {
    let downloader = GraphDownloader::new(&[
        ("http://x.com/a", &["http://x.com/b", "http://x.com/a"]),
        ("http://x.com/b", &["http://x.com/a", "http://x.com/b"]),
    ]);
    let tracker = Arc::clone(&downloader.tracker);
    let crawler = crawler(downloader, CrawlerConfig::new(2, 2, 1));

    let result = crawler.crawl("http://x.com/a", 5).await.unwrap();
    assert_eq!(result.downloaded.len(), 2);

    let fetched = tracker.fetched();
    assert_eq!(fetched.len(), 2);
    assert_eq!(fetched.iter().collect::<HashSet<_>>().len(), 2);
}

#[tokio::test]
async fn test_excluded_urls_are_dropped_silently() {
    let crawler = crawler(
        GraphDownloader::new(&[
            ("http://x/", &["http://x/ads/page", "http://x/real"]),
            ("http://x/ads/page", &["http://x/hidden"]),
        ]),
        CrawlerConfig::default(),
    );

    let result = crawler
        .crawl_excluding("http://x/", 3, &["ads"])
        .await
        .unwrap();

    let downloaded = downloaded_set(&result);
    assert!(downloaded.contains("http://x/real"));
    assert!(!downloaded.contains("http://x/ads/page"));
    assert!(!downloaded.contains("http://x/hidden"));
    assert!(!result.errors.contains_key("http://x/ads/page"));
    assert!(result.is_clean());
}

#[tokio::test]
async fn test_restricted_crawl_drops_foreign_hosts() {
    let downloader = GraphDownloader::new(&[
        ("http://x.com/", &["http://y.com/page", "http://x.com/about"]),
        ("http://y.com/page", &["http://x.com/secret"]),
    ]);
    let tracker = Arc::clone(&downloader.tracker);
    let crawler = crawler(downloader, CrawlerConfig::default());

    let result = crawler
        .crawl_restricted("http://x.com/", 3, &["x.com"])
        .await
        .unwrap();

    let downloaded = downloaded_set(&result);
    assert_eq!(
        downloaded,
        HashSet::from(["http://x.com/".to_string(), "http://x.com/about".to_string()])
    );
    assert!(result.errors.is_empty());
    assert!(!tracker.fetched().contains(&"http://y.com/page".to_string()));
}

#[tokio::test]
async fn test_fetch_failure_is_recorded_and_siblings_continue() {
    let crawler = crawler(
        GraphDownloader::new(&[
            ("http://x.com/", &["http://x.com/e", "http://x.com/ok"]),
            ("http://x.com/e", &["http://x.com/never"]),
            ("http://x.com/ok", &["http://x.com/deeper"]),
        ])
        .failing("http://x.com/e"),
        CrawlerConfig::new(2, 2, 2),
    );

    let result = crawler.crawl("http://x.com/", 3).await.unwrap();
    let downloaded = downloaded_set(&result);

    assert_eq!(
        result.errors.get("http://x.com/e"),
        Some(&CrawlError::Fetch {
            source: FetchError::Status(500)
        })
    );
    assert!(!downloaded.contains("http://x.com/e"));
    assert!(downloaded.contains("http://x.com/ok"));
    assert!(downloaded.contains("http://x.com/deeper"));
    assert!(!downloaded.contains("http://x.com/never"));
}

#[tokio::test]
async fn test_extraction_failure_is_recorded_against_origin() {
    let crawler = crawler(
        GraphDownloader::new(&[("http://x.com/", &["http://x.com/lost"])])
            .broken_document("http://x.com/"),
        CrawlerConfig::default(),
    );

    let result = crawler.crawl("http://x.com/", 2).await.unwrap();

    // Fetched fine, extraction failed: the URL is in both collections.
    assert_eq!(result.downloaded, vec!["http://x.com/"]);
    assert!(matches!(
        result.errors.get("http://x.com/"),
        Some(CrawlError::Extract { .. })
    ));
}

#[tokio::test]
async fn test_malformed_url_is_recorded() {
    let crawler = crawler(
        GraphDownloader::new(&[("http://x.com/", &["not a url", "http://x.com/fine"])]),
        CrawlerConfig::default(),
    );

    let result = crawler.crawl("http://x.com/", 2).await.unwrap();
    assert!(matches!(
        result.errors.get("not a url"),
        Some(CrawlError::MalformedUrl { .. })
    ));
    assert!(downloaded_set(&result).contains("http://x.com/fine"));
}

#[tokio::test]
async fn test_each_url_recorded_at_most_once() {
    let crawler = crawler(
        GraphDownloader::new(&[
            ("http://a.com/", &["http://b.com/", "http://c.com/", "http://a.com/"]),
            ("http://b.com/", &["http://c.com/", "http://d.com/"]),
            ("http://c.com/", &["http://b.com/", "http://d.com/"]),
            ("http://d.com/", &["http://a.com/"]),
        ])
        .failing("http://d.com/"),
        CrawlerConfig::new(4, 4, 1),
    );

    let result = crawler.crawl("http://a.com/", 4).await.unwrap();
    let downloaded = downloaded_set(&result);
    assert_eq!(downloaded.len(), result.downloaded.len());
    for url in result.errors.keys() {
        assert!(!downloaded.contains(url));
    }
    assert_eq!(downloaded.len() + result.errors.len(), 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_per_host_limit_is_respected() {
    let mut links: Vec<String> = Vec::new();
    for i in 0..20 {
        links.push(format!("http://a.com/{}", i));
        links.push(format!("http://b.com/{}", i));
    }
    let link_refs: Vec<&str> = links.iter().map(String::as_str).collect();
    let downloader = GraphDownloader::new(&[("http://seed.com/", link_refs.as_slice())])
        .with_delay(Duration::from_millis(10));
    let tracker = Arc::clone(&downloader.tracker);
    let crawler = crawler(downloader, CrawlerConfig::new(8, 2, 2));

    let result = crawler.crawl("http://seed.com/", 2).await.unwrap();

    assert_eq!(result.downloaded.len(), 41);
    assert!(tracker.max_in_flight("a.com") <= 2);
    assert!(tracker.max_in_flight("b.com") <= 2);
    assert!(tracker.max_in_flight("a.com") >= 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_same_traversal_twice_is_stable() {
    let graph = || {
        GraphDownloader::new(&[
            ("http://a.com/", &["http://a.com/1", "http://b.com/1", "http://b.com/2"]),
            ("http://a.com/1", &["http://b.com/3", "http://a.com/"]),
            ("http://b.com/1", &["http://a.com/2"]),
            ("http://b.com/2", &["http://broken.com/"]),
        ])
        .failing("http://broken.com/")
    };
    let crawler = crawler(graph(), CrawlerConfig::new(4, 2, 1));

    let first = crawler.crawl("http://a.com/", 3).await.unwrap();
    let second = crawler.crawl("http://a.com/", 3).await.unwrap();

    assert_eq!(downloaded_set(&first), downloaded_set(&second));
    assert_eq!(
        first.errors.keys().collect::<HashSet<_>>(),
        second.errors.keys().collect::<HashSet<_>>()
    );
    assert!(first.errors.contains_key("http://broken.com/"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_crawls_do_not_interfere() {
    let crawler = Arc::new(crawler(
        GraphDownloader::new(&[
            ("http://a.com/", &["http://a.com/1"]),
            ("http://b.com/", &["http://b.com/1"]),
        ]),
        CrawlerConfig::new(2, 2, 1),
    ));

    let (left, right) = tokio::join!(
        crawler.crawl("http://a.com/", 2),
        crawler.crawl("http://b.com/", 2)
    );

    assert_eq!(
        downloaded_set(&left.unwrap()),
        HashSet::from(["http://a.com/".to_string(), "http://a.com/1".to_string()])
    );
    assert_eq!(
        downloaded_set(&right.unwrap()),
        HashSet::from(["http://b.com/".to_string(), "http://b.com/1".to_string()])
    );
}

#[tokio::test]
async fn test_cancellation_returns_partial_result() {
    let crawler = crawler(
        GraphDownloader::new(&[("http://x.com/", &["http://x.com/slow"])])
            .hanging("http://x.com/slow"),
        CrawlerConfig::new(2, 1, 2),
    );

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            cancel.cancel();
        }
    });

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        crawler.crawl_with(CrawlRequest::new("http://x.com/", 3), cancel),
    )
    .await
    .expect("interrupted crawl must not hang")
    .unwrap();

    assert_eq!(result.downloaded, vec!["http://x.com/"]);
    assert!(result.errors.is_empty());

    // The crawler stays usable after an interrupted crawl
    assert!(!crawler.is_closed());
}

#[tokio::test]
async fn test_close_interrupts_running_crawl() {
    let crawler = Arc::new(crawler(
        GraphDownloader::new(&[("http://x.com/", &[])]).hanging("http://x.com/"),
        CrawlerConfig::default(),
    ));

    let running = tokio::spawn({
        let crawler = Arc::clone(&crawler);
        async move { crawler.crawl("http://x.com/", 2).await }
    });
    tokio::time::sleep(Duration::from_millis(20)).await;
    crawler.close();

    let result = tokio::time::timeout(Duration::from_secs(5), running)
        .await
        .expect("close must release the waiting crawl")
        .unwrap()
        .unwrap();
    assert!(result.downloaded.is_empty());
}

#[tokio::test]
async fn test_crawl_after_close_fails_fast() {
    let crawler = crawler(GraphDownloader::default(), CrawlerConfig::default());
    crawler.close();
    crawler.close();

    assert!(crawler.is_closed());
    assert_eq!(
        crawler.crawl("http://x.com/", 1).await.unwrap_err(),
        CrawlerError::Closed
    );
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let result = Crawler::new(
        Arc::new(GraphDownloader::default()),
        CrawlerConfig::new(1, 1, 0),
    );
    assert!(matches!(result, Err(ConfigError::InvalidPerHost(0))));
}

#[tokio::test]
async fn test_panicking_download_frees_its_host_slot() {
    // Run several times so the panicking URL is sometimes scheduled before
    // its same-host sibling and sometimes after it.
    for _ in 0..20 {
        let crawler = crawler(
            GraphDownloader::new(&[
                ("http://s.com/", &["http://x.com/boom", "http://x.com/ok"]),
                ("http://x.com/ok", &[]),
            ])
            .panicking("http://x.com/boom"),
            CrawlerConfig::new(1, 1, 1),
        );

        let result = tokio::time::timeout(
            Duration::from_secs(2),
            crawler.crawl("http://s.com/", 2),
        )
        .await
        .expect("crawl must settle after a downloader panic")
        .unwrap();

        let downloaded = downloaded_set(&result);
        assert!(downloaded.contains("http://x.com/ok"));
        assert!(!downloaded.contains("http://x.com/boom"));
        assert!(matches!(
            result.errors.get("http://x.com/boom"),
            Some(CrawlError::Fetch {
                source: FetchError::Other(_)
            })
        ));
    }
}

#[tokio::test]
async fn test_panicking_extraction_is_recorded_and_crawl_continues() {
    for _ in 0..20 {
        let crawler = crawler(
            GraphDownloader::new(&[
                ("http://s.com/", &["http://x.com/bad", "http://x.com/ok"]),
                ("http://x.com/bad", &["http://x.com/never"]),
                ("http://x.com/ok", &["http://x.com/deeper"]),
            ])
            .panicking_document("http://x.com/bad"),
            CrawlerConfig::new(1, 1, 1),
        );

        let result = tokio::time::timeout(
            Duration::from_secs(2),
            crawler.crawl("http://s.com/", 3),
        )
        .await
        .expect("crawl must settle after an extraction panic")
        .unwrap();

        let downloaded = downloaded_set(&result);
        assert!(downloaded.contains("http://x.com/ok"));
        assert!(downloaded.contains("http://x.com/deeper"));
        assert!(downloaded.contains("http://x.com/bad"));
        assert!(!downloaded.contains("http://x.com/never"));
        assert!(matches!(
            result.errors.get("http://x.com/bad"),
            Some(CrawlError::Extract {
                source: ExtractError::Other(_)
            })
        ));
    }
}
