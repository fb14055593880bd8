//! Scripted graph client for unit tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::traversal::{GraphClient, Traversal};

enum Scripted {
    Rows(Vec<Value>),
    Fail(String),
}

/// Answers traversals from a fixed script; unscripted traversals return no rows.
pub(crate) struct ScriptedClient {
    script: Vec<(Traversal, Scripted)>,
    delay: Option<Duration>,
    calls: Mutex<Vec<Traversal>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self {
            script: Vec::new(),
            delay: None,
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn respond(mut self, traversal: Traversal, rows: Vec<Value>) -> Self {
        self.script.push((traversal, Scripted::Rows(rows)));
        self
    }

    pub fn fail(mut self, traversal: Traversal, message: &str) -> Self {
        self.script
            .push((traversal, Scripted::Fail(message.to_string())));
        self
    }

    /// Sleep this long inside every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_for(&self, traversal: &Traversal) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|t| *t == traversal)
            .count()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GraphClient for ScriptedClient {
    async fn execute(&self, traversal: &Traversal) -> Result<Vec<Value>> {
        self.calls.lock().unwrap().push(traversal.clone());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.script.iter().find(|(t, _)| t == traversal) {
            Some((_, Scripted::Rows(rows))) => Ok(rows.clone()),
            Some((_, Scripted::Fail(message))) => Err(Error::connectivity(message.clone())),
            None => Ok(Vec::new()),
        }
    }
}
