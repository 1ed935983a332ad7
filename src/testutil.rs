//! Scripted stand-ins for the oracle and the browser session.

use anyhow::{Result, anyhow};
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use crate::oracle::Oracle;
use crate::session::WebSession;
use crate::types::{ChatMessage, Perception};

/// Oracle that replays a scripted list of replies, then a fallback if one is
/// set, then errors. Records every conversation it is sent.
pub struct FakeOracle {
    replies: Mutex<VecDeque<String>>,
    fallback: Option<String>,
    calls: Mutex<Vec<Vec<ChatMessage>>>,
}

impl FakeOracle {
    pub fn new(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|s| s.to_string()).collect()),
            fallback: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Oracle that answers every call with the same reply, forever.
    pub fn cycling(reply: &str) -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            fallback: Some(reply.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Oracle for FakeOracle {
    async fn chat(&self, messages: &[ChatMessage], _timeout: Option<Duration>) -> Result<String> {
        self.calls.lock().unwrap().push(messages.to_vec());
        if let Some(reply) = self.replies.lock().unwrap().pop_front() {
            return Ok(reply);
        }
        self.fallback
            .clone()
            .ok_or_else(|| anyhow!("fake oracle is out of scripted replies"))
    }
}

/// Browser session that records actions instead of performing them.
pub struct FakeSession {
    url: Mutex<String>,
    /// Where a click on a given locator "navigates" to.
    click_targets: Mutex<HashMap<String, String>>,
    attributes: Mutex<HashMap<(String, String), String>>,
    pub actions: Mutex<Vec<String>>,
    pub fail_capture: bool,
    pub fail_clicks: bool,
    captures: Mutex<usize>,
}

impl FakeSession {
    pub fn new() -> Self {
        Self {
            url: Mutex::new("about:blank".to_string()),
            click_targets: Mutex::new(HashMap::new()),
            attributes: Mutex::new(HashMap::new()),
            actions: Mutex::new(Vec::new()),
            fail_capture: false,
            fail_clicks: false,
            captures: Mutex::new(0),
        }
    }

    pub fn failing_capture() -> Self {
        Self {
            fail_capture: true,
            ..Self::new()
        }
    }

    pub fn failing_clicks() -> Self {
        Self {
            fail_clicks: true,
            ..Self::new()
        }
    }

    pub fn set_click_target(&self, locator: &str, url: &str) {
        self.click_targets
            .lock()
            .unwrap()
            .insert(locator.to_string(), url.to_string());
    }

    pub fn set_attribute(&self, locator: &str, name: &str, value: &str) {
        self.attributes
            .lock()
            .unwrap()
            .insert((locator.to_string(), name.to_string()), value.to_string());
    }

    pub fn capture_count(&self) -> usize {
        *self.captures.lock().unwrap()
    }

    pub fn recorded(&self) -> Vec<String> {
        self.actions.lock().unwrap().clone()
    }

    fn record(&self, action: String) {
        self.actions.lock().unwrap().push(action);
    }
}

impl WebSession for FakeSession {
    fn navigate(&self, url: &str) -> Result<()> {
        self.record(format!("navigate:{url}"));
        *self.url.lock().unwrap() = url.to_string();
        Ok(())
    }

    fn current_url(&self) -> String {
        self.url.lock().unwrap().clone()
    }

    fn capture(&self) -> Result<Perception> {
        if self.fail_capture {
            return Err(anyhow!("screenshot failed"));
        }
        *self.captures.lock().unwrap() += 1;
        Ok(Perception::new("ZmFrZQ=="))
    }

    fn read_attribute(&self, locator: &str, name: &str) -> Result<Option<String>> {
        Ok(self
            .attributes
            .lock()
            .unwrap()
            .get(&(locator.to_string(), name.to_string()))
            .cloned())
    }

    fn type_text(&self, locator: &str, text: &str, _wait: Duration) -> Result<()> {
        self.record(format!("type:{locator}:{text}"));
        Ok(())
    }

    fn click(&self, locator: &str, _wait: Duration) -> Result<()> {
        if self.fail_clicks {
            self.record(format!("click-failed:{locator}"));
            return Err(anyhow!("element never became clickable"));
        }
        self.record(format!("click:{locator}"));
        if let Some(target) = self.click_targets.lock().unwrap().get(locator) {
            *self.url.lock().unwrap() = target.clone();
        }
        Ok(())
    }

    fn upload_file(&self, locator: &str, path: &Path, _wait: Duration) -> Result<()> {
        self.record(format!("upload:{locator}:{}", path.display()));
        Ok(())
    }

    fn settle(&self, _pause: Duration) {}
}
