//! In-memory fakes shared by unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::ai::{ChatBackend, ChatMessage, InferenceError};
use crate::chain::{FetchError, FetchResult, WalletDataSource, WalletSummary};
use crate::pipeline::{ProgressEvent, ProgressReporter};

/// Summary with `transactions` hashes and `assets` units.
pub fn sample_summary(transactions: usize, assets: usize) -> WalletSummary {
    let hashes = (0..transactions).map(|i| format!("{:064x}", i + 1));
    if assets == 0 {
        return WalletSummary::without_assets(hashes);
    }
    let units = (0..assets).map(|i| format!("asset{:02}", i));
    WalletSummary::new(hashes, units, assets)
}

/// Returns a fixed result per address. Unknown addresses fail upstream.
#[derive(Default)]
pub struct ScriptedSource {
    results: HashMap<String, FetchResult>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, address: &str, result: FetchResult) -> Self {
        self.results.insert(address.to_string(), result);
        self
    }
}

#[async_trait]
impl WalletDataSource for ScriptedSource {
    async fn fetch(&self, address: &str) -> FetchResult {
        self.results
            .get(address)
            .cloned()
            .unwrap_or_else(|| Err(FetchError::Upstream(format!("no script for {}", address))))
    }
}

/// Replies in order; records every conversation it receives.
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<Result<String, InferenceError>>>,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedBackend {
    pub fn new(replies: Vec<Result<String, InferenceError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, InferenceError> {
        self.requests.lock().unwrap().push(messages.to_vec());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(InferenceError::EmptyResponse))
    }
}

/// Panics on the first call.
pub struct PanickingBackend;

#[async_trait]
impl ChatBackend for PanickingBackend {
    async fn complete(&self, _messages: &[ChatMessage]) -> Result<String, InferenceError> {
        panic!("backend exploded")
    }
}

/// Holds every call until released, then answers from `inner`.
pub struct GatedBackend {
    entered: Notify,
    gate: Notify,
    inner: ScriptedBackend,
}

impl GatedBackend {
    pub fn new(replies: Vec<Result<String, InferenceError>>) -> Self {
        Self {
            entered: Notify::new(),
            gate: Notify::new(),
            inner: ScriptedBackend::new(replies),
        }
    }

    /// Resolves once a call is waiting at the gate.
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    /// Lets one waiting call through.
    pub fn release(&self) {
        self.gate.notify_one();
    }
}

#[async_trait]
impl ChatBackend for GatedBackend {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, InferenceError> {
        self.entered.notify_one();
        self.gate.notified().await;
        self.inner.complete(messages).await
    }
}

#[derive(Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingProgress {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ProgressReporter for RecordingProgress {
    fn report(&self, event: ProgressEvent) {
        self.events.lock().unwrap().push(event);
    }
}
