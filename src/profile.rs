use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Candidate identity, loaded once before the pipeline runs and read-only
/// from then on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub resume: PathBuf,
}

impl Profile {
    pub fn load(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("open profile {}", path.display()))?;
        let profile = serde_json::from_reader(std::io::BufReader::new(file))
            .with_context(|| format!("parse profile {}", path.display()))?;
        Ok(profile)
    }

    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or("")
    }

    pub fn last_name(&self) -> &str {
        self.name.split_whitespace().last().unwrap_or("")
    }

    /// The profile as it is shown to the oracle inside prompts.
    pub fn prompt_context(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| self.name.clone())
    }
}

/// Fetch the resume artifact so file uploads have a local path to hand the
/// browser. Non-2xx responses are hard errors; there is no point starting a
/// run without a resume.
pub async fn download_resume(url: &str, dest: &Path) -> Result<()> {
    info!(url, dest = %dest.display(), "downloading resume");
    let response = reqwest::get(url)
        .await
        .with_context(|| format!("download resume from {url}"))?;
    let status = response.status();
    if !status.is_success() {
        return Err(anyhow!("failed to download resume from {url}: status {status}"));
    }
    let bytes = response.bytes().await?;
    std::fs::write(dest, &bytes).with_context(|| format!("write resume to {}", dest.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(name: &str) -> Profile {
        Profile {
            name: name.into(),
            email: "a@b.c".into(),
            phone: "555-0100".into(),
            resume: PathBuf::from("resume.pdf"),
        }
    }

    #[test]
    fn name_splitting() {
        let p = profile("Ada King Lovelace");
        assert_eq!(p.first_name(), "Ada");
        assert_eq!(p.last_name(), "Lovelace");
    }

    #[test]
    fn single_word_name() {
        let p = profile("Cher");
        assert_eq!(p.first_name(), "Cher");
        assert_eq!(p.last_name(), "Cher");
    }

    #[test]
    fn empty_name_does_not_panic() {
        let p = profile("");
        assert_eq!(p.first_name(), "");
        assert_eq!(p.last_name(), "");
    }
}
