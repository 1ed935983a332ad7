use std::path::PathBuf;
use tracing::{debug, warn};

use crate::essay::EssayAnswerer;
use crate::oracle::Oracle;
use crate::profile::Profile;
use crate::session::WebSession;
use crate::types::{
    ButtonAction, ELEMENT_WAIT, FieldKind, FilePurpose, FileField, InputField, SETTLE_ACTION,
};

/// Button clicks get one retry with a fixed backoff, nothing more.
const ACTIVATE_ATTEMPTS: usize = 2;

/// Executes one plan's worth of actions against the live page. Field values
/// are routed by locator text: known profile fields are auto-filled, anything
/// else is treated as a free-response question. Every operation is
/// best-effort; a missing element fails the operation, never the session.
pub struct Actuator<'a, S, O> {
    session: &'a S,
    profile: &'a Profile,
    essay: EssayAnswerer<'a, O>,
    cover_letter: PathBuf,
}

impl<'a, S: WebSession, O: Oracle> Actuator<'a, S, O> {
    pub fn new(
        session: &'a S,
        profile: &'a Profile,
        essay: EssayAnswerer<'a, O>,
        cover_letter: PathBuf,
    ) -> Self {
        Self {
            session,
            profile,
            essay,
            cover_letter,
        }
    }

    /// Fill one input field. Returns whether the fill landed.
    pub async fn fill(&self, field: &InputField) -> bool {
        if field.locator.is_empty() {
            warn!("input field without a locator, skipping");
            return false;
        }
        match field.kind {
            FieldKind::Checkbox | FieldKind::Radio => {
                match self.session.click(&field.locator, ELEMENT_WAIT) {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(locator = field.locator, error = format!("{e:#}"), "could not toggle field");
                        false
                    }
                }
            }
            FieldKind::Text | FieldKind::Other => {
                let value = self.value_for(&field.locator).await;
                match self.session.type_text(&field.locator, &value, ELEMENT_WAIT) {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(locator = field.locator, error = format!("{e:#}"), "could not fill field");
                        false
                    }
                }
            }
        }
    }

    /// Route a text field to a profile value, or hand it to the essay
    /// answerer as a free-response question.
    async fn value_for(&self, locator: &str) -> String {
        let lower = locator.to_lowercase();
        if lower.contains("first_name") {
            self.profile.first_name().to_string()
        } else if lower.contains("last_name") {
            self.profile.last_name().to_string()
        } else if lower.contains("email") {
            self.profile.email.clone()
        } else if lower.contains("phone") {
            self.profile.phone.clone()
        } else {
            self.essay.answer(&format!("Fill this field: {locator}")).await
        }
    }

    /// Attach the right artifact to one file input. Slots whose purpose
    /// cannot be inferred are skipped.
    pub fn upload(&self, field: &FileField) -> bool {
        if field.locator.is_empty() {
            warn!("file field without a locator, skipping");
            return false;
        }
        let path = match field.purpose() {
            FilePurpose::Resume => self.profile.resume.clone(),
            FilePurpose::CoverLetter => self.cover_letter.clone(),
            FilePurpose::Unknown => {
                debug!(locator = field.locator, "file field purpose unknown, skipping");
                return false;
            }
        };
        match self.session.upload_file(&field.locator, &path, ELEMENT_WAIT) {
            Ok(()) => true,
            Err(e) => {
                warn!(locator = field.locator, error = format!("{e:#}"), "could not upload file");
                false
            }
        }
    }

    /// Click the step's button: two attempts with a fixed backoff, then give
    /// up and report failure for the step.
    pub fn activate(&self, button: &ButtonAction) -> bool {
        let label = button.label.as_deref().unwrap_or("unknown");
        for attempt in 1..=ACTIVATE_ATTEMPTS {
            match self.session.click(&button.locator, ELEMENT_WAIT) {
                Ok(()) => {
                    debug!(locator = button.locator, label, "clicked button");
                    self.session.settle(SETTLE_ACTION);
                    return true;
                }
                Err(e) => {
                    warn!(
                        locator = button.locator,
                        label,
                        attempt,
                        error = format!("{e:#}"),
                        "button click failed"
                    );
                    if attempt < ACTIVATE_ATTEMPTS {
                        self.session.settle(SETTLE_ACTION);
                    }
                }
            }
        }
        false
    }
}
