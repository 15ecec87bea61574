use std::collections::BTreeMap;
use std::time::Duration;

use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, warn};

use crate::sources::{Feed, RecordSource};

#[derive(Debug)]
pub enum SourceOutcome {
    Loaded(Vec<Value>),
    Failed { reason: String },
}

#[derive(Debug, Default)]
pub struct Collected {
    records: BTreeMap<Feed, Vec<Value>>,
    failures: BTreeMap<Feed, String>,
}

impl Collected {
    pub fn insert(&mut self, feed: Feed, outcome: SourceOutcome) {
        match outcome {
            SourceOutcome::Loaded(records) => {
                self.failures.remove(&feed);
                self.records.insert(feed, records);
            }
            SourceOutcome::Failed { reason } => {
                self.records.insert(feed, Vec::new());
                self.failures.insert(feed, reason);
            }
        }
    }

    pub fn records(&self, feed: Feed) -> &[Value] {
        self.records.get(&feed).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn failure(&self, feed: Feed) -> Option<&str> {
        self.failures.get(&feed).map(String::as_str)
    }

    pub fn degraded_sources(&self) -> Vec<String> {
        self.failures.keys().map(|feed| feed.to_string()).collect()
    }

    /// True when something was requested and every request failed.
    pub fn all_failed(&self) -> bool {
        !self.records.is_empty() && self.failures.len() == self.records.len()
    }
}

/// Fetches every feed concurrently; a failed or timed-out feed comes back empty.
pub async fn collect(source: &dyn RecordSource, feeds: &[Feed], timeout: Duration) -> Collected {
    let fetches = feeds.iter().map(|&feed| async move {
        let outcome = match tokio::time::timeout(timeout, source.fetch(feed)).await {
            Ok(Ok(records)) => SourceOutcome::Loaded(records),
            Ok(Err(err)) => SourceOutcome::Failed {
                reason: err.to_string(),
            },
            Err(_) => SourceOutcome::Failed {
                reason: format!("timed out after {} ms", timeout.as_millis()),
            },
        };
        (feed, outcome)
    });

    let mut collected = Collected::default();
    for (feed, outcome) in join_all(fetches).await {
        match &outcome {
            SourceOutcome::Loaded(records) => {
                debug!(feed = %feed, records = records.len(), "feed loaded");
            }
            SourceOutcome::Failed { reason } => {
                warn!(feed = %feed, %reason, "feed unavailable, continuing without it");
            }
        }
        collected.insert(feed, outcome);
    }
    collected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::testing::StaticSource;
    use serde_json::json;

    #[tokio::test]
    async fn failed_feeds_degrade_to_empty_lists() {
        let source = StaticSource::default()
            .with(Feed::Payments, vec![json!({ "id": 1 }), json!({ "id": 2 })])
            .failing(Feed::Classes);

        let collected = collect(
            &source,
            &[Feed::Payments, Feed::Classes, Feed::Students],
            Duration::from_secs(1),
        )
        .await;

        assert_eq!(collected.records(Feed::Payments).len(), 2);
        assert!(collected.records(Feed::Classes).is_empty());
        assert!(collected.records(Feed::Students).is_empty());
        assert!(collected.failure(Feed::Classes).is_some());
        assert_eq!(collected.degraded_sources(), vec!["classes".to_string()]);
        assert!(!collected.all_failed());
    }

    #[tokio::test]
    async fn slow_feeds_time_out_without_blocking_others() {
        let source = StaticSource::default()
            .with(Feed::Students, vec![json!({ "id": "s1" })])
            .with(Feed::Teachers, vec![json!({ "id": "t1" })])
            .delayed(Feed::Teachers, Duration::from_millis(500));

        let feeds = [Feed::Teachers, Feed::Students];
        let collected = collect(&source, &feeds, Duration::from_millis(50)).await;

        assert_eq!(collected.records(Feed::Students).len(), 1);
        assert!(collected.records(Feed::Teachers).is_empty());
        assert!(collected.failure(Feed::Teachers).unwrap().starts_with("timed out"));
    }

    #[tokio::test]
    async fn merge_order_is_independent_of_completion_order() {
        let source = StaticSource::default()
            .with(Feed::Payments, vec![json!({ "id": "p" })])
            .with(Feed::Exams, vec![json!({ "id": "e" })])
            .delayed(Feed::Payments, Duration::from_millis(30))
            .failing(Feed::Recordings)
            .failing(Feed::Materials)
            .delayed(Feed::Materials, Duration::from_millis(20));

        let feeds = [Feed::Recordings, Feed::Exams, Feed::Materials, Feed::Payments];
        let collected = collect(&source, &feeds, Duration::from_secs(1)).await;

        assert_eq!(
            collected.degraded_sources(),
            vec!["materials".to_string(), "recordings".to_string()]
        );
        assert_eq!(collected.records(Feed::Payments), &[json!({ "id": "p" })]);
    }

    #[tokio::test]
    async fn everything_failing_is_reported() {
        let source = StaticSource::default().failing(Feed::Payments).failing(Feed::Classes);
        let feeds = [Feed::Payments, Feed::Classes];
        let collected = collect(&source, &feeds, Duration::from_secs(1)).await;
        assert!(collected.all_failed());

        let nothing = collect(&source, &[], Duration::from_secs(1)).await;
        assert!(!nothing.all_failed());
    }
}
