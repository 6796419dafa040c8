//! In-memory collaborators for crawler tests

use crate::api::PageSource;
use crate::notify::{Notification, Notifier};
use crate::storage::{FrontierStore, IdentifierRecord, NewIdentifier, StorageError, StorageResult};
use crate::HarvestError;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Body served for URLs nothing was scripted for
pub const EMPTY_PAGE: &str = r#"{"paging": {"is_end": true, "next": ""}, "data": []}"#;

/// One scripted response
#[derive(Debug, Clone)]
pub enum Scripted {
    Body(String),
    TransportFailure,
}

impl Scripted {
    pub fn body(body: impl Into<String>) -> Self {
        Self::Body(body.into())
    }
}

type Hook = Box<dyn Fn(&str) + Send + Sync>;

/// A `PageSource` serving queued responses per URL
///
/// The last response queued for a URL is repeated once the queue drains.
#[derive(Default)]
pub struct ScriptedSource {
    responses: Mutex<HashMap<String, VecDeque<Scripted>>>,
    calls: Mutex<Vec<String>>,
    hook: Mutex<Option<Hook>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, url: &str, response: Scripted) {
        self.responses
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(response);
    }

    /// Runs `hook` with the URL on every request, before responding
    pub fn on_get(&self, hook: impl Fn(&str) + Send + Sync + 'static) {
        *self.hook.lock().unwrap() = Some(Box::new(hook));
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == url).count()
    }
}

#[async_trait]
impl PageSource for ScriptedSource {
    async fn get(&self, url: &str) -> Result<String, HarvestError> {
        self.calls.lock().unwrap().push(url.to_string());
        if let Some(hook) = self.hook.lock().unwrap().as_ref() {
            hook(url);
        }

        let response = {
            let mut responses = self.responses.lock().unwrap();
            match responses.get_mut(url) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };

        match response {
            Some(Scripted::Body(body)) => Ok(body),
            Some(Scripted::TransportFailure) => Err(HarvestError::Timeout {
                url: url.to_string(),
            }),
            None => Ok(EMPTY_PAGE.to_string()),
        }
    }
}

/// A member listing page naming `tokens`
pub fn member_page(next: &str, is_end: bool, tokens: &[&str]) -> String {
    let data: Vec<serde_json::Value> = tokens
        .iter()
        .map(|token| serde_json::json!({"id": format!("id-{}", token), "url_token": token, "name": ""}))
        .collect();
    serde_json::json!({
        "paging": {"is_end": is_end, "is_start": false, "next": next, "previous": "", "totals": tokens.len()},
        "data": data,
    })
    .to_string()
}

/// A topic children page naming `ids`
pub fn topic_page(next: &str, is_end: bool, ids: &[&str]) -> String {
    let data: Vec<serde_json::Value> = ids
        .iter()
        .map(|id| serde_json::json!({"id": id, "name": format!("topic {}", id), "type": "topic"}))
        .collect();
    serde_json::json!({
        "paging": {"is_end": is_end, "next": next},
        "data": data,
    })
    .to_string()
}

/// A `Notifier` that keeps every notification
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier whose every delivery fails after being recorded
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn report_now(&self, notification: &Notification) -> Result<(), HarvestError> {
        self.sent.lock().unwrap().push(notification.clone());
        if self.fail {
            return Err(HarvestError::Notify("recording notifier set to fail".to_string()));
        }
        Ok(())
    }
}

/// A `FrontierStore` over a real one that fails on demand
pub struct FlakyFrontier {
    inner: Arc<dyn FrontierStore>,
    poisoned_token: Mutex<Option<String>>,
    read_failures: AtomicUsize,
    get_at_calls: AtomicUsize,
}

impl FlakyFrontier {
    pub fn new(inner: Arc<dyn FrontierStore>) -> Self {
        Self {
            inner,
            poisoned_token: Mutex::new(None),
            read_failures: AtomicUsize::new(0),
            get_at_calls: AtomicUsize::new(0),
        }
    }

    /// Every insert batch naming `token` fails
    pub fn fail_inserts_of(&self, token: &str) {
        *self.poisoned_token.lock().unwrap() = Some(token.to_string());
    }

    /// The next `count` calls to `get_at` fail
    pub fn fail_reads(&self, count: usize) {
        self.read_failures.store(count, Ordering::SeqCst);
    }

    pub fn get_at_calls(&self) -> usize {
        self.get_at_calls.load(Ordering::SeqCst)
    }
}

impl FrontierStore for FlakyFrontier {
    fn insert_if_absent(&self, identifiers: &[NewIdentifier]) -> StorageResult<usize> {
        if let Some(token) = self.poisoned_token.lock().unwrap().as_deref() {
            if identifiers.iter().any(|i| i.token == token) {
                return Err(StorageError::Database(format!("cannot insert '{}'", token)));
            }
        }
        self.inner.insert_if_absent(identifiers)
    }

    fn get_at(&self, offset: u64) -> StorageResult<IdentifierRecord> {
        self.get_at_calls.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .read_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failing {
            return Err(StorageError::Database("database is locked".to_string()));
        }
        self.inner.get_at(offset)
    }

    fn offset_of(&self, row_id: i64) -> StorageResult<u64> {
        self.inner.offset_of(row_id)
    }

    fn count(&self) -> StorageResult<u64> {
        self.inner.count()
    }
}
