use tracing::warn;

use crate::oracle::Oracle;
use crate::planner::{Planner, extract_json};
use crate::session::WebSession;
use crate::types::VerificationResult;

const VERIFY_SYSTEM_PROMPT: &str = "You are a web automation assistant with vision capabilities. \
Analyze the provided screenshot of a job application page and determine if the application has \
been successfully submitted. Look for phrases like 'Application submitted', 'Thank you', or \
'applied'. Return a JSON object with a key 'success' (boolean) and 'message' (string) describing \
the confirmation.";

const VERIFY_TASK: &str = "Check if the application is successfully submitted";

/// Post-completion confirmation check. Purely advisory: a negative or
/// unparsable answer is logged, never acted on.
pub struct VerificationChecker<'a, S, O> {
    session: &'a S,
    oracle: &'a O,
}

impl<'a, S: WebSession, O: Oracle> VerificationChecker<'a, S, O> {
    pub fn new(session: &'a S, oracle: &'a O) -> Self {
        Self { session, oracle }
    }

    /// Capture the final page and ask whether it shows a submission
    /// confirmation. `None` when the capture or the reply is unusable.
    pub async fn check(&self) -> Option<VerificationResult> {
        let shot = match self.session.capture() {
            Ok(shot) => shot,
            Err(e) => {
                warn!(error = format!("{e:#}"), "no screenshot available for verification");
                return None;
            }
        };
        let reply = Planner::new(self.oracle)
            .describe(&shot, VERIFY_SYSTEM_PROMPT, VERIFY_TASK)
            .await?;
        parse_verification(&reply)
    }
}

pub fn parse_verification(reply: &str) -> Option<VerificationResult> {
    let Some(span) = extract_json(reply) else {
        warn!(reply, "no JSON object found in verification reply");
        return None;
    };
    match serde_json::from_str(span) {
        Ok(result) => Some(result),
        Err(e) => {
            warn!(error = %e, span, "verification JSON did not parse");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{FakeOracle, FakeSession};

    #[test]
    fn parses_confirmation_out_of_chatty_reply() {
        let reply = r#"Looks good! {"success": true, "message": "Application submitted"} done."#;
        let result = parse_verification(reply).unwrap();
        assert!(result.success);
        assert_eq!(result.message, "Application submitted");
    }

    #[test]
    fn missing_fields_default_rather_than_fail() {
        let result = parse_verification(r#"{"message": "still on the form page"}"#).unwrap();
        assert!(!result.success);
    }

    #[test]
    fn json_free_reply_is_inconclusive() {
        assert!(parse_verification("I think it went through?").is_none());
    }

    #[tokio::test]
    async fn check_captures_and_parses() {
        let session = FakeSession::new();
        let oracle =
            FakeOracle::new(&[r#"{"success": false, "message": "no confirmation visible"}"#]);
        let checker = VerificationChecker::new(&session, &oracle);

        let result = checker.check().await.unwrap();
        assert!(!result.success);
        assert_eq!(session.capture_count(), 1);
    }

    #[tokio::test]
    async fn check_survives_capture_failure() {
        let session = FakeSession::failing_capture();
        let oracle = FakeOracle::new(&[]);
        let checker = VerificationChecker::new(&session, &oracle);

        assert!(checker.check().await.is_none());
        assert_eq!(oracle.call_count(), 0);
    }
}
