use anyhow::{Context, Result, anyhow};
use clap::Parser;
use dotenvy::dotenv;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use job_applier::agent::{AgentState, ApplicationAgent};
use job_applier::discovery::JobDiscoveryService;
use job_applier::filter::FilterEngine;
use job_applier::oracle::GrokClient;
use job_applier::profile::{Profile, download_resume};
use job_applier::session::{BrowserSession, WebSession};
use job_applier::types::{JobSource, SETTLE_ACTION, SETTLE_NAV};

#[derive(Parser, Debug)]
#[command(name = "job-applier")]
#[command(about = "Vision-guided job discovery, filtering, and application agent")]
struct Args {
    /// Search keywords.
    #[arg(long, default_value = "software developer")]
    query: String,

    /// Search location.
    #[arg(long, default_value = "remote")]
    location: String,

    /// Apply to at most this many matched postings.
    #[arg(long, default_value_t = 3)]
    max_applications: usize,

    /// Filter at most this many discovered postings.
    #[arg(long, default_value_t = 10)]
    max_postings: usize,

    /// Run Chrome with a visible window.
    #[arg(long)]
    headful: bool,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args = Args::parse();
    init_logging(args.log_level.as_deref())?;

    let oracle = GrokClient::from_env()?;
    let profile = load_profile().await?;

    info!("launching browser");
    let headless = !args.headful;
    let session = tokio::task::spawn_blocking(move || BrowserSession::launch(headless))
        .await
        .map_err(|e| anyhow!("browser launch panicked: {e}"))??;

    // Discovery across every listing site, one sequential pass.
    let discovery = JobDiscoveryService::new(&session, &oracle);
    let mut postings = Vec::new();
    for source in [JobSource::Indeed, JobSource::Glassdoor, JobSource::X] {
        postings.extend(discovery.discover(&args.query, &args.location, source).await);
    }
    info!(count = postings.len(), "postings discovered");
    postings.truncate(args.max_postings);

    // Filtering against the profile.
    let filter = FilterEngine::new(&session, &oracle, &profile);
    let mut matched = Vec::new();
    for posting in &postings {
        if filter.matches(posting).await {
            info!(title = posting.title, source = %posting.source, "posting matches");
            matched.push(posting);
        } else {
            info!(title = posting.title, source = %posting.source, "posting does not match");
        }
        session.settle(SETTLE_ACTION);
    }
    info!(matched = matched.len(), "filtering finished");

    // Applications, capped, each one its own bounded loop. A failed attempt
    // is reported and the run moves on.
    let agent = ApplicationAgent::new(&session, &oracle, &profile);
    for posting in matched.iter().take(args.max_applications) {
        match agent.apply(posting).await {
            AgentState::Completed => info!(link = posting.link, "application completed"),
            AgentState::Failed(reason) => {
                warn!(link = posting.link, %reason, "application failed")
            }
            AgentState::Running(_) => unreachable!("apply only returns terminal states"),
        }
        session.settle(SETTLE_NAV);
    }

    Ok(())
}

fn init_logging(level: Option<&str>) -> Result<()> {
    let filter = match level {
        Some(level) => EnvFilter::try_new(level).context("parse --log-level")?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
    Ok(())
}

/// Load the candidate profile and make sure a local resume artifact exists.
/// When RESUME_URL is set the resume is fetched fresh and the profile's path
/// is overridden, matching the original workflow of keeping the resume in
/// remote storage.
async fn load_profile() -> Result<Profile> {
    let path =
        PathBuf::from(std::env::var("PROFILE_PATH").unwrap_or_else(|_| "profile.json".to_string()));
    let mut profile = Profile::load(&path)?;

    if let Ok(url) = std::env::var("RESUME_URL") {
        let dest = PathBuf::from("resume.pdf");
        download_resume(&url, &dest).await?;
        profile.resume = dest;
    } else if profile.resume.as_os_str().is_empty() {
        return Err(anyhow!(
            "profile has no resume path and RESUME_URL is not set"
        ));
    }
    Ok(profile)
}
