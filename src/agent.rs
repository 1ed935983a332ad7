use std::path::PathBuf;
use tracing::{info, warn};

use crate::actuator::Actuator;
use crate::essay::EssayAnswerer;
use crate::oracle::Oracle;
use crate::planner::{
    APPLY_SYSTEM_PROMPT, APPLY_TASK, DESCRIBE_SYSTEM_PROMPT, DESCRIBE_TASK, Planner,
};
use crate::profile::Profile;
use crate::session::WebSession;
use crate::types::{
    ActionPlan, COVER_LETTER_FILE, ChatMessage, JobPosting, MAX_STEPS, NO_DESCRIPTION, SETTLE_NAV,
};
use crate::verify::VerificationChecker;

/// Why an application attempt ended without completing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailReason {
    /// Screenshot capture failed; the page can no longer be perceived.
    NoPerception,
    /// The oracle produced nothing that parses as a plan.
    NoPlan,
    /// The plan had work to do but named no button: a stall, not a retry.
    NoButton,
    /// The button never took a click, even after the in-step retry.
    ButtonUnresponsive,
    /// The loop ran out of steps before the oracle declared completion.
    StepBudgetExhausted,
}

impl std::fmt::Display for FailReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FailReason::NoPerception => "no-perception",
            FailReason::NoPlan => "no-plan",
            FailReason::NoButton => "no-button",
            FailReason::ButtonUnresponsive => "button-unresponsive",
            FailReason::StepBudgetExhausted => "step-budget-exhausted",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    Running(usize),
    Completed,
    Failed(FailReason),
}

/// What actually happened while executing one plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The plan declared the application complete; nothing was executed.
    Complete,
    /// Fields ran and the button took the click.
    Advanced,
    /// The plan named no usable button.
    NoButton,
    /// The button refused the click after its retry.
    ButtonFailed,
}

/// The per-step transition of the application state machine, pure in
/// (current step, step outcome).
pub fn transition(step: usize, max_steps: usize, outcome: StepOutcome) -> AgentState {
    match outcome {
        StepOutcome::Complete => AgentState::Completed,
        StepOutcome::NoButton => AgentState::Failed(FailReason::NoButton),
        StepOutcome::ButtonFailed => AgentState::Failed(FailReason::ButtonUnresponsive),
        StepOutcome::Advanced => {
            if step + 1 >= max_steps {
                AgentState::Failed(FailReason::StepBudgetExhausted)
            } else {
                AgentState::Running(step + 1)
            }
        }
    }
}

/// Drives one job application from its landing page to completion or failure
/// through a bounded perceive-plan-act loop. Holds only borrowed, read-only
/// state; each `apply` call starts from zero.
pub struct ApplicationAgent<'a, S, O> {
    session: &'a S,
    oracle: &'a O,
    profile: &'a Profile,
    max_steps: usize,
    cover_letter: PathBuf,
}

impl<'a, S: WebSession, O: Oracle> ApplicationAgent<'a, S, O> {
    pub fn new(session: &'a S, oracle: &'a O, profile: &'a Profile) -> Self {
        Self {
            session,
            oracle,
            profile,
            max_steps: MAX_STEPS,
            cover_letter: PathBuf::from(COVER_LETTER_FILE),
        }
    }

    pub fn with_limits(mut self, max_steps: usize, cover_letter: PathBuf) -> Self {
        self.max_steps = max_steps;
        self.cover_letter = cover_letter;
        self
    }

    /// Apply to one posting. Navigates to the posting, prepares the cover
    /// letter, runs the action loop, and (on completion only) asks for an
    /// advisory submission check. Always returns a terminal state.
    pub async fn apply(&self, posting: &JobPosting) -> AgentState {
        info!(link = posting.link, title = posting.title, "applying");
        if let Err(e) = self.session.navigate(&posting.link) {
            warn!(error = format!("{e:#}"), "could not open posting, trying anyway");
        }
        self.session.settle(SETTLE_NAV);

        let description = self.describe_posting().await;
        self.write_cover_letter(&description).await;

        let state = self.run_loop().await;

        match state {
            AgentState::Completed => {
                info!("application loop completed, verifying");
                let checker = VerificationChecker::new(self.session, self.oracle);
                match checker.check().await {
                    Some(v) if v.success => info!(message = v.message, "submission confirmed"),
                    Some(v) => warn!(message = v.message, "no submission confirmation found"),
                    None => warn!("verification was inconclusive"),
                }
            }
            AgentState::Failed(reason) => warn!(%reason, "application failed"),
            AgentState::Running(_) => unreachable!("loop only returns terminal states"),
        }
        state
    }

    /// The bounded perceive-plan-act loop: capture, plan, execute,
    /// transition, until a terminal state.
    pub async fn run_loop(&self) -> AgentState {
        let planner = Planner::new(self.oracle);
        let essay = EssayAnswerer::new(self.oracle, self.profile);
        let actuator = Actuator::new(self.session, self.profile, essay, self.cover_letter.clone());

        let mut state = AgentState::Running(0);
        while let AgentState::Running(step) = state {
            info!(step = step + 1, max = self.max_steps, "application step");

            let shot = match self.session.capture() {
                Ok(shot) => shot,
                Err(e) => {
                    warn!(error = format!("{e:#}"), "perception capture failed");
                    state = AgentState::Failed(FailReason::NoPerception);
                    break;
                }
            };

            let Some(plan) = planner.plan(&shot, APPLY_SYSTEM_PROMPT, APPLY_TASK).await else {
                state = AgentState::Failed(FailReason::NoPlan);
                break;
            };

            let outcome = self.execute(&actuator, &plan).await;
            state = transition(step, self.max_steps, outcome);
        }
        state
    }

    /// Execute one plan: a `complete` plan short-circuits everything, then
    /// inputs and uploads run best-effort, then the single button decides
    /// whether the step advanced.
    async fn execute(&self, actuator: &Actuator<'a, S, O>, plan: &ActionPlan) -> StepOutcome {
        if plan.complete {
            return StepOutcome::Complete;
        }
        for field in &plan.inputs {
            actuator.fill(field).await;
        }
        for file in &plan.file_inputs {
            actuator.upload(file);
        }
        match plan.button() {
            None => StepOutcome::NoButton,
            Some(button) => {
                if actuator.activate(button) {
                    StepOutcome::Advanced
                } else {
                    StepOutcome::ButtonFailed
                }
            }
        }
    }

    /// Transcribe whatever description the landing page shows, falling back
    /// to the placeholder the prompts promise.
    async fn describe_posting(&self) -> String {
        let Ok(shot) = self.session.capture() else {
            return NO_DESCRIPTION.to_string();
        };
        Planner::new(self.oracle)
            .describe(&shot, DESCRIBE_SYSTEM_PROMPT, DESCRIBE_TASK)
            .await
            .unwrap_or_else(|| NO_DESCRIPTION.to_string())
    }

    /// Generate the cover letter once, before the loop, so the actuator has
    /// an artifact to attach for the rest of the attempt.
    async fn write_cover_letter(&self, description: &str) {
        let messages = [
            ChatMessage::system("You are a job application assistant."),
            ChatMessage::user(format!(
                "Using this profile: {}, write a cover letter for this job description: \
                 {description}",
                self.profile.prompt_context()
            )),
        ];
        match self.oracle.chat(&messages, None).await {
            Ok(letter) => {
                if let Err(e) = std::fs::write(&self.cover_letter, letter) {
                    warn!(error = %e, path = %self.cover_letter.display(), "could not write cover letter");
                }
            }
            Err(e) => {
                warn!(error = format!("{e:#}"), "cover letter generation failed, continuing without one");
            }
        }
    }
}
