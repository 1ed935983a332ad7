use std::io::Write;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::oracle::Oracle;
use crate::planner::{DESCRIBE_SYSTEM_PROMPT, DESCRIBE_TASK, Planner};
use crate::profile::Profile;
use crate::session::WebSession;
use crate::types::{
    ChatMessage, DESCRIPTION_LOG_FILE, JobPosting, NO_DESCRIPTION, SETTLE_ACTION,
};

/// Loose relevance heuristic over the oracle's free-form answer. Negated
/// phrasings are checked first so "this does not match" reads as a no;
/// beyond that, any "yes" or "match" counts. Deliberately not a strict
/// yes/no contract.
pub fn is_match(answer: &str) -> bool {
    let lower = answer.to_lowercase();
    for negative in ["not match", "no match", "doesn't match", "not a match"] {
        if lower.contains(negative) {
            return false;
        }
    }
    lower.contains("yes") || lower.contains("match")
}

/// Decides whether a discovered posting is worth applying to: transcribe the
/// visible description, log it, and ask the oracle for a match judgment
/// against the profile.
pub struct FilterEngine<'a, S, O> {
    session: &'a S,
    oracle: &'a O,
    profile: &'a Profile,
    log_path: PathBuf,
}

impl<'a, S: WebSession, O: Oracle> FilterEngine<'a, S, O> {
    pub fn new(session: &'a S, oracle: &'a O, profile: &'a Profile) -> Self {
        Self {
            session,
            oracle,
            profile,
            log_path: PathBuf::from(DESCRIPTION_LOG_FILE),
        }
    }

    pub fn with_log_path(mut self, path: PathBuf) -> Self {
        self.log_path = path;
        self
    }

    pub async fn matches(&self, posting: &JobPosting) -> bool {
        info!(link = posting.link, source = %posting.source, "filtering posting");
        if let Err(e) = self.session.navigate(&posting.link) {
            warn!(error = format!("{e:#}"), "could not open posting");
            return false;
        }
        self.session.settle(SETTLE_ACTION);

        let Ok(shot) = self.session.capture() else {
            warn!("no screenshot available for filtering");
            return false;
        };

        let description = Planner::new(self.oracle)
            .describe(&shot, DESCRIBE_SYSTEM_PROMPT, DESCRIBE_TASK)
            .await
            .unwrap_or_else(|| NO_DESCRIPTION.to_string());
        self.log_description(&posting.link, &description);

        let messages = [
            ChatMessage::system("You are a job application assistant."),
            ChatMessage::user(format!(
                "Given this profile: {}, does this job description match my skills and \
                 experience? Job description: {description}",
                self.profile.prompt_context()
            )),
        ];
        match self.oracle.chat(&messages, None).await {
            Ok(answer) => {
                let decision = is_match(&answer);
                info!(decision, "filter decision");
                decision
            }
            Err(e) => {
                warn!(error = format!("{e:#}"), "match judgment failed");
                false
            }
        }
    }

    /// Append-only debug trail of what the oracle transcribed per posting.
    fn log_description(&self, link: &str, description: &str) {
        let result = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .and_then(|mut f| writeln!(f, "Link: {link}\nDescription: {description}\n"));
        if let Err(e) = result {
            warn!(error = %e, path = %self.log_path.display(), "could not log description");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{FakeOracle, FakeSession};
    use crate::types::JobSource;

    fn profile() -> Profile {
        Profile {
            name: "Issac Vinson".into(),
            email: "issac@example.com".into(),
            phone: "555-0100".into(),
            resume: PathBuf::from("/tmp/resume.pdf"),
        }
    }

    fn posting() -> JobPosting {
        JobPosting {
            title: "Rust Engineer".into(),
            link: "https://example.com/job/1".into(),
            source: JobSource::Indeed,
        }
    }

    fn temp_log(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("job-applier-{name}-{}.txt", std::process::id()))
    }

    #[test]
    fn match_heuristic() {
        assert!(is_match("Yes, this role fits your background."));
        assert!(is_match("This looks like a strong match for the profile."));
        assert!(!is_match("This does not match."));
        assert!(!is_match("No, the required experience differs."));
        assert!(!is_match("Unlikely to be a good fit."));
    }

    #[tokio::test]
    async fn matching_posting_is_accepted_and_logged() {
        let session = FakeSession::new();
        let oracle = FakeOracle::new(&[
            "The posting asks for a senior Rust developer.",
            "Yes, this matches the profile well.",
        ]);
        let profile = profile();
        let log = temp_log("accept");
        let filter = FilterEngine::new(&session, &oracle, &profile).with_log_path(log.clone());

        assert!(filter.matches(&posting()).await);
        let logged = std::fs::read_to_string(&log).unwrap();
        assert!(logged.contains("https://example.com/job/1"));
        assert!(logged.contains("senior Rust developer"));
        let _ = std::fs::remove_file(&log);
    }

    #[tokio::test]
    async fn negative_judgment_is_rejected() {
        let session = FakeSession::new();
        let oracle = FakeOracle::new(&["Some description.", "This does not match."]);
        let profile = profile();
        let filter = FilterEngine::new(&session, &oracle, &profile)
            .with_log_path(temp_log("reject"));

        assert!(!filter.matches(&posting()).await);
    }

    #[tokio::test]
    async fn missing_description_falls_back_to_placeholder() {
        let session = FakeSession::new();
        let oracle = FakeOracle::new(&["", "yes"]);
        let profile = profile();
        let log = temp_log("placeholder");
        let filter = FilterEngine::new(&session, &oracle, &profile).with_log_path(log.clone());

        assert!(filter.matches(&posting()).await);
        let logged = std::fs::read_to_string(&log).unwrap();
        assert!(logged.contains(NO_DESCRIPTION));
        let _ = std::fs::remove_file(&log);
    }

    #[tokio::test]
    async fn capture_failure_rejects_the_posting() {
        let session = FakeSession::failing_capture();
        let oracle = FakeOracle::new(&[]);
        let profile = profile();
        let filter = FilterEngine::new(&session, &oracle, &profile)
            .with_log_path(temp_log("capture"));

        assert!(!filter.matches(&posting()).await);
        assert_eq!(oracle.call_count(), 0);
    }
}
