use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Maximum perceive-plan-act iterations per application attempt.
pub const MAX_STEPS: usize = 10;

/// Response timeout for oracle calls that gate the action loop.
pub const ORACLE_TIMEOUT: Duration = Duration::from_secs(30);

/// How long to wait for a claimed element before giving up on it.
pub const ELEMENT_WAIT: Duration = Duration::from_secs(10);

/// Pause after a full page navigation.
pub const SETTLE_NAV: Duration = Duration::from_secs(5);

/// Pause after an in-page action (click, back-navigation).
pub const SETTLE_ACTION: Duration = Duration::from_secs(2);

pub const COVER_LETTER_FILE: &str = "cover_letter.txt";
pub const DESCRIPTION_LOG_FILE: &str = "debug_job_desc.txt";
pub const NO_DESCRIPTION: &str = "No description found.";

/// Listing site a posting was discovered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobSource {
    Indeed,
    Glassdoor,
    X,
}

impl std::fmt::Display for JobSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobSource::Indeed => write!(f, "Indeed"),
            JobSource::Glassdoor => write!(f, "Glassdoor"),
            JobSource::X => write!(f, "X"),
        }
    }
}

/// A discovered job listing. Two postings are the same posting when they
/// point at the same link, whatever title the oracle transcribed for them.
#[derive(Debug, Clone)]
pub struct JobPosting {
    pub title: String,
    pub link: String,
    pub source: JobSource,
}

impl PartialEq for JobPosting {
    fn eq(&self, other: &Self) -> bool {
        self.link == other.link
    }
}

impl Eq for JobPosting {}

/// Base64-encoded PNG snapshot of the current page. Captured fresh for every
/// oracle query and never carried across steps.
#[derive(Debug, Clone)]
pub struct Perception(String);

impl Perception {
    pub fn new(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    pub fn as_data_uri(&self) -> String {
        format!("data:image/png;base64,{}", self.0)
    }
}

/// One step's worth of instructions, parsed out of a single oracle reply.
/// Never merged with a previous plan.
#[derive(Debug, Clone, Deserialize)]
pub struct ActionPlan {
    #[serde(default)]
    pub inputs: Vec<InputField>,
    #[serde(default)]
    pub file_inputs: Vec<FileField>,
    pub button: Option<ButtonAction>,
    #[serde(default)]
    pub complete: bool,
}

impl ActionPlan {
    /// The button to activate this step, if the plan names a usable one.
    /// A button with an empty locator counts as no button at all.
    pub fn button(&self) -> Option<&ButtonAction> {
        self.button.as_ref().filter(|b| !b.locator.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    #[default]
    Text,
    Checkbox,
    Radio,
    /// Anything else the oracle invents; filled like a text field.
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InputField {
    #[serde(rename = "xpath", default)]
    pub locator: String,
    #[serde(rename = "type", default)]
    pub kind: FieldKind,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileField {
    #[serde(rename = "xpath", default)]
    pub locator: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilePurpose {
    Resume,
    CoverLetter,
    Unknown,
}

impl FileField {
    /// What the upload slot is for, inferred from the locator text alone.
    pub fn purpose(&self) -> FilePurpose {
        let lower = self.locator.to_lowercase();
        if lower.contains("resume") {
            FilePurpose::Resume
        } else if lower.contains("cover") {
            FilePurpose::CoverLetter
        } else {
            FilePurpose::Unknown
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ButtonAction {
    #[serde(rename = "xpath", default)]
    pub locator: String,
    #[serde(rename = "text")]
    pub label: Option<String>,
}

/// Advisory outcome of the post-submission confirmation check.
#[derive(Debug, Clone, Deserialize)]
pub struct VerificationResult {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

/// A message in a conversation sent to the oracle.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}
