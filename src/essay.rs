use std::io::Write;
use tracing::{info, warn};

use crate::oracle::Oracle;
use crate::profile::Profile;
use crate::types::ChatMessage;

/// Questions touching these topics are never sent to the oracle.
const SENSITIVE_KEYWORDS: [&str; 5] =
    ["ssn", "social security", "password", "credit card", "bank account"];

/// Recorded answer when the human declines to provide one.
pub const SKIPPED: &str = "Skipped by user";

pub fn is_sensitive(question: &str) -> bool {
    let lower = question.to_lowercase();
    SENSITIVE_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Answers free-response application questions. Sensitive questions (and any
/// question the oracle fails on) are put to the human instead; an empty human
/// reply becomes the explicit `SKIPPED` value rather than blocking the run.
pub struct EssayAnswerer<'a, O> {
    oracle: &'a O,
    profile: &'a Profile,
    human: Box<dyn Fn(&str) -> String + Send + Sync + 'a>,
}

impl<'a, O: Oracle> EssayAnswerer<'a, O> {
    pub fn new(oracle: &'a O, profile: &'a Profile) -> Self {
        Self {
            oracle,
            profile,
            human: Box::new(prompt_stdin),
        }
    }

    /// Same answerer, but with an injected human-input source (for tests and
    /// non-interactive harnesses).
    pub fn with_human_input(
        oracle: &'a O,
        profile: &'a Profile,
        human: impl Fn(&str) -> String + Send + Sync + 'a,
    ) -> Self {
        Self {
            oracle,
            profile,
            human: Box::new(human),
        }
    }

    pub async fn answer(&self, question: &str) -> String {
        if is_sensitive(question) {
            info!(question, "sensitive question detected, asking the human");
            return self.ask_human(question);
        }

        let messages = [
            ChatMessage::system(format!(
                "You are a job application assistant answering essay questions based on this \
                 profile: {}",
                self.profile.prompt_context()
            )),
            ChatMessage::user(format!("Answer this question: {question}")),
        ];
        match self.oracle.chat(&messages, None).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!(question, error = format!("{e:#}"), "oracle could not answer, asking the human");
                self.ask_human(question)
            }
        }
    }

    fn ask_human(&self, question: &str) -> String {
        let reply = (self.human)(question);
        if reply.trim().is_empty() {
            SKIPPED.to_string()
        } else {
            reply
        }
    }
}

fn prompt_stdin(question: &str) -> String {
    println!("{question}");
    print!("Please provide an answer (or press Enter to skip): ");
    let _ = std::io::stdout().flush();
    let mut line = String::new();
    if std::io::stdin().read_line(&mut line).is_err() {
        return String::new();
    }
    line.trim().to_string()
}
