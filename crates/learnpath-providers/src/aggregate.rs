//! Resource lookup across several sources.
//!
//! Every source is asked at once. Candidates whose URL does not answer a HEAD
//! request are dropped, duplicates are collapsed by URL, and the first
//! survivor in source order wins.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, instrument, warn};

use learnpath_core::model::{LearningResource, ResourceType};
use learnpath_core::traits::ResourceLookup;

const URL_CHECK_TIMEOUT_SECS: u64 = 10;

/// Fans a lookup out to several [`ResourceLookup`]s.
pub struct AggregateLookup {
    sources: Vec<Box<dyn ResourceLookup>>,
    client: reqwest::Client,
    verify_urls: bool,
}

impl AggregateLookup {
    pub fn new(sources: Vec<Box<dyn ResourceLookup>>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(URL_CHECK_TIMEOUT_SECS))
            .build()
            .expect("failed to build HTTP client");

        Self {
            sources,
            client,
            verify_urls: true,
        }
    }

    /// Skip the HEAD check and trust every URL a source returns.
    pub fn without_url_check(mut self) -> Self {
        self.verify_urls = false;
        self
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Every live, distinct candidate for `topic`, in source order.
    ///
    /// A failing source contributes nothing; it never fails the whole lookup.
    pub async fn candidates(
        &self,
        topic: &str,
        resource_type: ResourceType,
    ) -> Vec<LearningResource> {
        let results = join_all(
            self.sources
                .iter()
                .map(|source| source.find(topic, resource_type)),
        )
        .await;

        let mut found = Vec::new();
        for (source, result) in self.sources.iter().zip(results) {
            match result {
                Ok(Some(resource)) => found.push(resource),
                Ok(None) => debug!("{}: nothing for '{topic}'", source.name()),
                Err(e) => warn!("{}: lookup for '{topic}' failed: {e:#}", source.name()),
            }
        }

        let found = if self.verify_urls {
            self.reachable(found).await
        } else {
            found
        };
        dedupe_by_url(found)
    }

    async fn reachable(&self, resources: Vec<LearningResource>) -> Vec<LearningResource> {
        let checks = join_all(resources.iter().map(|r| self.url_is_live(&r.url))).await;
        resources
            .into_iter()
            .zip(checks)
            .filter_map(|(resource, live)| live.then_some(resource))
            .collect()
    }

    async fn url_is_live(&self, url: &str) -> bool {
        match self.client.head(url).send().await {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                debug!("dropping {url}: HEAD returned {}", response.status());
                false
            }
            Err(e) => {
                debug!("dropping {url}: {e}");
                false
            }
        }
    }
}

/// Keep the first resource for each URL. Trailing slashes and case in the
/// scheme and host do not make a URL distinct.
fn dedupe_by_url(resources: Vec<LearningResource>) -> Vec<LearningResource> {
    let mut seen = HashSet::new();
    resources
        .into_iter()
        .filter(|r| seen.insert(url_identity(&r.url)))
        .collect()
}

fn url_identity(url: &str) -> String {
    match reqwest::Url::parse(url) {
        Ok(parsed) => parsed.as_str().trim_end_matches('/').to_string(),
        Err(_) => url.trim().trim_end_matches('/').to_string(),
    }
}

#[async_trait]
impl ResourceLookup for AggregateLookup {
    fn name(&self) -> &str {
        "aggregate"
    }

    #[instrument(skip(self))]
    async fn find(
        &self,
        topic: &str,
        resource_type: ResourceType,
    ) -> anyhow::Result<Option<LearningResource>> {
        Ok(self
            .candidates(topic, resource_type)
            .await
            .into_iter()
            .next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Returns one resource per topic at `<base><path>`, or fails.
    struct StaticSource {
        name: &'static str,
        base: String,
        path: &'static str,
        fail: bool,
    }

    impl StaticSource {
        fn boxed(name: &'static str, base: &str, path: &'static str) -> Box<dyn ResourceLookup> {
            Box::new(Self {
                name,
                base: base.to_string(),
                path,
                fail: false,
            })
        }
    }

    #[async_trait]
    impl ResourceLookup for StaticSource {
        fn name(&self) -> &str {
            self.name
        }

        async fn find(
            &self,
            topic: &str,
            resource_type: ResourceType,
        ) -> anyhow::Result<Option<LearningResource>> {
            if self.fail {
                anyhow::bail!("{} is down", self.name);
            }
            Ok(Some(LearningResource {
                resource_type,
                title: format!("{topic} from {}", self.name),
                url: format!("{}{}", self.base, self.path),
                duration: None,
                difficulty: None,
                category: Some(topic.to_string()),
                description: None,
            }))
        }
    }

    async fn head_ok(server: &MockServer, at: &str) {
        Mock::given(method("HEAD"))
            .and(path(at))
            .respond_with(ResponseTemplate::new(200))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn dead_links_are_dropped() {
        let server = MockServer::start().await;
        head_ok(&server, "/live").await;
        Mock::given(method("HEAD"))
            .and(path("/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let lookup = AggregateLookup::new(vec![
            StaticSource::boxed("first", &server.uri(), "/gone"),
            StaticSource::boxed("second", &server.uri(), "/live"),
        ]);

        let found = lookup
            .find("traits", ResourceType::Course)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.title, "traits from second");
    }

    #[tokio::test]
    async fn duplicate_urls_collapse_to_the_first_source() {
        let server = MockServer::start().await;
        head_ok(&server, "/same").await;

        let lookup = AggregateLookup::new(vec![
            StaticSource::boxed("first", &server.uri(), "/same"),
            StaticSource::boxed("second", &server.uri(), "/same/"),
        ]);

        let candidates = lookup.candidates("async", ResourceType::Video).await;
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].title, "async from first");
    }

    #[tokio::test]
    async fn failing_source_does_not_fail_the_lookup() {
        let server = MockServer::start().await;
        head_ok(&server, "/ok").await;

        let broken = Box::new(StaticSource {
            name: "broken",
            base: server.uri(),
            path: "/ok",
            fail: true,
        });
        let lookup = AggregateLookup::new(vec![
            broken,
            StaticSource::boxed("working", &server.uri(), "/ok"),
        ]);

        let found = lookup.find("macros", ResourceType::Video).await.unwrap();
        assert_eq!(found.unwrap().title, "macros from working");
    }

    #[tokio::test]
    async fn nothing_live_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let lookup = AggregateLookup::new(vec![StaticSource::boxed(
            "only",
            &server.uri(),
            "/broken",
        )]);
        assert!(lookup
            .find("closures", ResourceType::Video)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn url_check_can_be_skipped() {
        // No server at all: any HEAD request would fail.
        let lookup = AggregateLookup::new(vec![
            StaticSource::boxed("a", "http://127.0.0.1:9", "/x"),
            StaticSource::boxed("b", "http://127.0.0.1:9", "/x"),
        ])
        .without_url_check();

        assert_eq!(lookup.source_names(), vec!["a", "b"]);
        let candidates = lookup.candidates("iterators", ResourceType::Video).await;
        assert_eq!(candidates.len(), 1);
    }

    #[test]
    fn url_identity_ignores_trailing_slash_and_host_case() {
        assert_eq!(
            url_identity("https://Example.com/course/"),
            url_identity("https://example.com/course")
        );
        assert_ne!(
            url_identity("https://example.com/a"),
            url_identity("https://example.com/b")
        );
    }
}
