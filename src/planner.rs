use serde_json::Value;
use tracing::warn;

use crate::oracle::Oracle;
use crate::types::{ActionPlan, ChatMessage, ORACLE_TIMEOUT, Perception};

/// System prompt for the core "what do I do next on this form" query.
pub const APPLY_SYSTEM_PROMPT: &str = "You are a web automation assistant with vision \
capabilities. Analyze the provided screenshot of a job application page and determine the next \
action to proceed with the application. Identify: 1) Input fields to fill (e.g., name, email, \
phone) with their XPaths and the type (e.g., 'text', 'checkbox'), 2) File upload fields for \
resume or cover letter with their XPaths, 3) The next button to click (e.g., 'Apply', 'Next', \
'Submit') with its XPath. Return a JSON object with keys 'inputs', 'file_inputs', and 'button', \
where 'inputs' and 'file_inputs' are lists of dictionaries with 'xpath' and 'type', and 'button' \
is a dictionary with 'xpath' and 'text'. If no actions are found or the application is complete, \
return: {'inputs': [], 'file_inputs': [], 'button': null, 'complete': true/false}.";

pub const APPLY_TASK: &str = "Determine the next action for this job application";

pub const DESCRIBE_SYSTEM_PROMPT: &str = "You are a job application assistant with vision \
capabilities. Analyze the provided screenshot of a job posting page and extract the job \
description text. Return the text as a string. If no description is found, return: 'No \
description found.'";

pub const DESCRIBE_TASK: &str = "Extract the job description from this screenshot";

/// Turns perceptions into plans by way of the oracle. Holds no state of its
/// own; every call is a fresh question about a fresh screenshot.
pub struct Planner<'a, O> {
    oracle: &'a O,
}

impl<'a, O: Oracle> Planner<'a, O> {
    pub fn new(oracle: &'a O) -> Self {
        Self { oracle }
    }

    /// Ask for the next action on the page. Every failure mode -- timeout,
    /// reply without JSON, schema mismatch -- comes back as `None`; the
    /// caller decides what a missing plan means.
    pub async fn plan(
        &self,
        shot: &Perception,
        system: &str,
        task: &str,
    ) -> Option<ActionPlan> {
        let reply = self.ask(shot, system, task).await?;
        parse_action_plan(&reply)
    }

    /// Ask for a free-text transcription (job descriptions and the like).
    /// An empty reply is reported as `None`.
    pub async fn describe(&self, shot: &Perception, system: &str, task: &str) -> Option<String> {
        self.ask(shot, system, task)
            .await
            .filter(|text| !text.trim().is_empty())
    }

    /// Ask a question whose answer should contain a JSON object, and return
    /// that object parsed but otherwise unvalidated.
    pub async fn ask_json(&self, shot: &Perception, system: &str, task: &str) -> Option<Value> {
        let reply = self.ask(shot, system, task).await?;
        let Some(span) = extract_json(&reply) else {
            warn!(reply, "no JSON object found in oracle reply");
            return None;
        };
        match serde_json::from_str(span) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(error = %e, span, "oracle JSON did not parse");
                None
            }
        }
    }

    async fn ask(&self, shot: &Perception, system: &str, task: &str) -> Option<String> {
        let messages = [
            ChatMessage::system(system),
            ChatMessage::user(format!("{task}: {}", shot.as_data_uri())),
        ];
        match self.oracle.chat(&messages, Some(ORACLE_TIMEOUT)).await {
            Ok(reply) => Some(reply),
            Err(e) => {
                warn!(error = format!("{e:#}"), "oracle call failed");
                None
            }
        }
    }
}

/// Find the first balanced `{...}` span in `text`.
///
/// Contract: returns exactly the first substring that opens with `{` and
/// closes with its matching `}` (brace-counting, string-literal aware), or
/// `None` when no balanced span exists. Total over all inputs; never panics.
pub fn extract_json(text: &str) -> Option<&str> {
    let mut search_from = 0;
    while let Some(offset) = text[search_from..].find('{') {
        let start = search_from + offset;
        if let Some(end) = balanced_end(&text[start..]) {
            return Some(&text[start..start + end]);
        }
        search_from = start + 1;
    }
    None
}

/// Byte length of the balanced span starting at the leading `{` of `text`,
/// or `None` if the braces never balance.
fn balanced_end(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + c.len_utf8());
                }
            }
            _ => {}
        }
    }
    None
}

/// Parse one oracle reply into an `ActionPlan`. The reply only has to
/// *contain* a JSON object; the object must carry the `inputs`,
/// `file_inputs` and `button` keys (`complete` defaults to false, matching
/// the loose contract the prompts establish). Anything else is "no plan".
pub fn parse_action_plan(reply: &str) -> Option<ActionPlan> {
    let Some(span) = extract_json(reply) else {
        warn!(reply, "no JSON object found in action reply");
        return None;
    };
    let value: Value = match serde_json::from_str(span) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, span, "action JSON did not parse");
            return None;
        }
    };
    for key in ["inputs", "file_inputs", "button"] {
        if value.get(key).is_none() {
            warn!(key, span, "action plan is missing a required key");
            return None;
        }
    }
    match serde_json::from_value(value) {
        Ok(plan) => Some(plan),
        Err(e) => {
            warn!(error = %e, span, "action plan did not match the expected shape");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FieldKind;

    #[test]
    fn extract_json_returns_exact_span() {
        let text = r#"Sure! Here is the plan: {"a": 1} hope that helps."#;
        assert_eq!(extract_json(text), Some(r#"{"a": 1}"#));
    }

    #[test]
    fn extract_json_handles_nesting() {
        let text = r#"{"outer": {"inner": [1, 2, {}]}} trailing"#;
        assert_eq!(extract_json(text), Some(r#"{"outer": {"inner": [1, 2, {}]}}"#));
    }

    #[test]
    fn extract_json_ignores_braces_inside_strings() {
        let text = r#"{"msg": "left { and right } stay put"}"#;
        assert_eq!(extract_json(text), Some(text));
    }

    #[test]
    fn extract_json_skips_an_unclosed_leading_brace() {
        let text = r#"{ broken... but later {"ok": true}"#;
        assert_eq!(extract_json(text), Some(r#"{"ok": true}"#));
    }

    #[test]
    fn extract_json_is_total_on_json_free_text() {
        assert_eq!(extract_json("no json here"), None);
        assert_eq!(extract_json(""), None);
        assert_eq!(extract_json("{{{"), None);
    }

    #[test]
    fn extract_json_is_idempotent() {
        let text = r#"noise {"a": {"b": 2}} noise"#;
        let once = extract_json(text).unwrap();
        assert_eq!(extract_json(once), Some(once));
    }

    #[test]
    fn parse_plan_from_chatty_reply() {
        let reply = r#"Here's what to do next:
```json
{"inputs": [{"xpath": "//input[@name='email']", "type": "text"}],
 "file_inputs": [{"xpath": "//input[@id='resume']", "type": "file"}],
 "button": {"xpath": "//button[@type='submit']", "text": "Submit"},
 "complete": false}
```"#;
        let plan = parse_action_plan(reply).unwrap();
        assert_eq!(plan.inputs.len(), 1);
        assert_eq!(plan.inputs[0].kind, FieldKind::Text);
        assert_eq!(plan.file_inputs.len(), 1);
        assert_eq!(plan.button().unwrap().label.as_deref(), Some("Submit"));
        assert!(!plan.complete);
    }

    #[test]
    fn parse_plan_missing_required_key_is_no_plan() {
        let reply = r#"{"inputs": [], "file_inputs": []}"#;
        assert!(parse_action_plan(reply).is_none());
    }

    #[test]
    fn parse_plan_null_button_is_present() {
        let reply = r#"{"inputs": [], "file_inputs": [], "button": null, "complete": true}"#;
        let plan = parse_action_plan(reply).unwrap();
        assert!(plan.button().is_none());
        assert!(plan.complete);
    }

    #[test]
    fn parse_plan_complete_defaults_to_false() {
        let reply = r#"{"inputs": [], "file_inputs": [], "button": {"xpath": "//b"}}"#;
        let plan = parse_action_plan(reply).unwrap();
        assert!(!plan.complete);
    }

    #[test]
    fn parse_plan_garbage_is_no_plan() {
        assert!(parse_action_plan("I could not read the page, sorry.").is_none());
        assert!(parse_action_plan("{not json at all}").is_none());
    }
}
