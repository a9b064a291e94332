//! In-process fan-out of per-test events. Each test id gets a bounded
//! broadcast channel; publishing never waits and never fails, and slow
//! subscribers lose the oldest events.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use time::OffsetDateTime;
use tokio::sync::{broadcast, RwLock};

use crate::core::time::format_offset;

const TOPIC_PREFIX: &str = "/topic/test/";
const TOPIC_SUFFIX: &str = "/events";
const ACTIVITY_PREFIX: &str = "/app/test/";
const ACTIVITY_SUFFIX: &str = "/activity";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub(crate) enum TestEvent {
    Joined {
        student_id: String,
        timestamp: String,
    },
    Submitted {
        student_id: String,
        attempt_id: String,
        timestamp: String,
    },
    Activity {
        user_id: String,
        payload: serde_json::Value,
        timestamp: String,
    },
}

impl TestEvent {
    pub(crate) fn joined(student_id: &str) -> Self {
        Self::Joined { student_id: student_id.to_string(), timestamp: now() }
    }

    pub(crate) fn submitted(student_id: &str, attempt_id: &str) -> Self {
        Self::Submitted {
            student_id: student_id.to_string(),
            attempt_id: attempt_id.to_string(),
            timestamp: now(),
        }
    }

    /// Anonymous senders are reported as `"unknown"`.
    pub(crate) fn activity(user_id: Option<&str>, payload: serde_json::Value) -> Self {
        Self::Activity {
            user_id: user_id.unwrap_or("unknown").to_string(),
            payload,
            timestamp: now(),
        }
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Self::Joined { .. } => "JOINED",
            Self::Submitted { .. } => "SUBMITTED",
            Self::Activity { .. } => "ACTIVITY",
        }
    }
}

#[derive(Clone)]
pub(crate) struct EventHub {
    capacity: usize,
    topics: Arc<RwLock<HashMap<String, broadcast::Sender<TestEvent>>>>,
}

impl EventHub {
    pub(crate) fn new(capacity: usize) -> Self {
        Self { capacity: capacity.max(1), topics: Arc::new(RwLock::new(HashMap::new())) }
    }

    pub(crate) async fn subscribe(&self, test_id: &str) -> broadcast::Receiver<TestEvent> {
        if let Some(sender) = self.topics.read().await.get(test_id) {
            return sender.subscribe();
        }

        let mut topics = self.topics.write().await;
        topics
            .entry(test_id.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Returns how many subscribers the event reached.
    pub(crate) async fn publish(&self, test_id: &str, event: TestEvent) -> usize {
        let delivered = match self.topics.read().await.get(test_id) {
            Some(sender) => sender.send(event.clone()).unwrap_or(0),
            None => 0,
        };

        metrics::counter!("realtime_events_total", "type" => event.kind()).increment(1);
        tracing::debug!(test_id, event = event.kind(), delivered, "Published test event");
        delivered
    }

    /// Drops the channel for `test_id` once nobody listens to it.
    pub(crate) async fn prune(&self, test_id: &str) {
        let mut topics = self.topics.write().await;
        if topics.get(test_id).is_some_and(|sender| sender.receiver_count() == 0) {
            topics.remove(test_id);
        }
    }

    #[cfg(test)]
    async fn topic_count(&self) -> usize {
        self.topics.read().await.len()
    }
}

pub(crate) fn topic_for(test_id: &str) -> String {
    format!("{TOPIC_PREFIX}{test_id}{TOPIC_SUFFIX}")
}

/// Extracts the test id from `/topic/test/{id}/events`.
pub(crate) fn parse_topic(destination: &str) -> Option<&str> {
    segment_between(destination, TOPIC_PREFIX, TOPIC_SUFFIX)
}

/// Extracts the test id from `/app/test/{id}/activity`.
pub(crate) fn parse_activity_destination(destination: &str) -> Option<&str> {
    segment_between(destination, ACTIVITY_PREFIX, ACTIVITY_SUFFIX)
}

fn segment_between<'a>(value: &'a str, prefix: &str, suffix: &str) -> Option<&'a str> {
    let id = value.strip_prefix(prefix)?.strip_suffix(suffix)?;
    (!id.is_empty() && !id.contains('/')).then_some(id)
}

fn now() -> String {
    format_offset(OffsetDateTime::now_utc())
}
