//! Scripted in-memory [`Page`] for exercising flows without a browser.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::app::{Result, RednoteError};
use crate::browser::{narrowed_deadline, Page};
use crate::config::TimeoutConfig;

#[derive(Default)]
struct FakeState {
    elements: HashSet<String>,
    texts: HashMap<String, Vec<String>>,
    eval_rules: Vec<(String, Value)>,
    failing: HashSet<String>,
    calls: Vec<String>,
    evaluated: Vec<String>,
}

/// Page whose DOM is a set of selectors and whose scripts answer from a
/// table of substring rules. Unmatched scripts evaluate to `true`.
#[derive(Clone)]
pub struct FakePage {
    state: Arc<Mutex<FakeState>>,
    timeouts: TimeoutConfig,
    deadline: Option<Instant>,
    cancel: CancellationToken,
}

impl FakePage {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState::default())),
            timeouts: TimeoutConfig::default(),
            deadline: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn add_element(&self, selector: &str) {
        self.state.lock().unwrap().elements.insert(selector.to_string());
    }

    pub fn set_texts(&self, selector: &str, texts: &[&str]) {
        let mut state = self.state.lock().unwrap();
        state.elements.insert(selector.to_string());
        state
            .texts
            .insert(selector.to_string(), texts.iter().map(|t| t.to_string()).collect());
    }

    /// Scripts containing `pattern` evaluate to `value`. Later rules win.
    pub fn on_eval(&self, pattern: &str, value: Value) {
        self.state
            .lock()
            .unwrap()
            .eval_rules
            .push((pattern.to_string(), value));
    }

    /// Queries and interactions on `selector` fail.
    pub fn fail_on(&self, selector: &str) {
        self.state.lock().unwrap().failing.insert(selector.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn evaluated(&self, pattern: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .evaluated
            .iter()
            .any(|script| script.contains(pattern))
    }

    pub fn navigations(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| c.strip_prefix("navigate ").map(String::from))
            .collect()
    }

    fn check(&self, what: &str) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(RednoteError::Cancelled);
        }
        if self.deadline.is_some_and(|d| Instant::now() > d) {
            return Err(RednoteError::Timeout(what.to_string()));
        }
        Ok(())
    }

    fn record(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }

    fn interact(&self, selector: &str, call: String) -> Result<()> {
        self.check(selector)?;
        let state = self.state.lock().unwrap();
        if !state.elements.contains(selector) {
            return Err(RednoteError::ElementNotFound(selector.to_string()));
        }
        if state.failing.contains(selector) {
            return Err(RednoteError::Interaction(format!("{} is detached", selector)));
        }
        drop(state);
        self.record(call);
        Ok(())
    }
}

#[async_trait]
impl Page for FakePage {
    fn with_timeout(&self, timeout: Duration) -> Self {
        Self {
            deadline: narrowed_deadline(self.deadline, timeout),
            ..self.clone()
        }
    }

    fn without_timeout(&self) -> Self {
        Self {
            deadline: None,
            ..self.clone()
        }
    }

    fn with_cancellation(&self, cancel: CancellationToken) -> Self {
        Self {
            cancel,
            ..self.clone()
        }
    }

    fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    fn timeouts(&self) -> &TimeoutConfig {
        &self.timeouts
    }

    async fn navigate(&self, url: &str) -> Result<()> {
        self.check(url)?;
        self.record(format!("navigate {}", url));
        Ok(())
    }

    async fn evaluate(&self, expression: &str) -> Result<Value> {
        self.check("script evaluation")?;
        let mut state = self.state.lock().unwrap();
        state.evaluated.push(expression.to_string());
        let value = state
            .eval_rules
            .iter()
            .rev()
            .find(|(pattern, _)| expression.contains(pattern.as_str()))
            .map(|(_, value)| value.clone())
            .unwrap_or(Value::Bool(true));
        Ok(value)
    }

    async fn has(&self, selector: &str) -> Result<bool> {
        self.check(selector)?;
        let state = self.state.lock().unwrap();
        if state.failing.contains(selector) {
            return Err(RednoteError::Interaction(format!("query for {} failed", selector)));
        }
        Ok(state.elements.contains(selector))
    }

    async fn is_visible(&self, selector: &str) -> Result<bool> {
        self.has(selector).await
    }

    async fn texts(&self, selector: &str) -> Result<Vec<String>> {
        self.check(selector)?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .texts
            .get(selector)
            .cloned()
            .unwrap_or_default())
    }

    async fn click(&self, selector: &str, index: usize) -> Result<()> {
        self.interact(selector, format!("click {}#{}", selector, index))
    }

    async fn type_text(&self, selector: &str, text: &str) -> Result<()> {
        self.interact(selector, format!("type {} {}", selector, text))
    }

    async fn press_key(&self, selector: &str, key: &str) -> Result<()> {
        self.interact(selector, format!("press {} {}", selector, key))
    }

    async fn set_files(&self, selector: &str, paths: &[PathBuf]) -> Result<()> {
        self.interact(selector, format!("files {} {}", selector, paths.len()))
    }
}

impl Default for FakePage {
    fn default() -> Self {
        Self::new()
    }
}
