use tracing::{info, warn};

use crate::oracle::Oracle;
use crate::planner::Planner;
use crate::session::WebSession;
use crate::types::{ELEMENT_WAIT, JobPosting, JobSource, SETTLE_ACTION, SETTLE_NAV};

const DISCOVERY_SYSTEM_PROMPT: &str = "You are a web automation assistant with vision \
capabilities. Analyze the provided screenshot of a job search page and identify job listings. \
For each job, provide: 1) The job title, 2) The clickable element (XPath) to access the job \
details or application page. Return a JSON object with a key 'jobs' containing a list of \
dictionaries, each with 'title' and 'xpath'. If no jobs are found, return: {'jobs': []}.";

const DISCOVERY_SYSTEM_PROMPT_X: &str = "You are a web automation assistant with vision \
capabilities. Analyze the provided screenshot of an X search page and identify job postings. \
For each job, provide: 1) The job title (or first 50 characters of the post), 2) The clickable \
element (XPath) to access the job link. Return a JSON object with a key 'jobs' containing a \
list of dictionaries, each with 'title' and 'xpath'. If no jobs are found, return: {'jobs': []}.";

const DISCOVERY_TASK: &str = "Analyze this screenshot to identify job listings";

/// Search-results URL for one listing site. Queries are encoded the way each
/// site expects them, remote-only filters included.
pub fn search_url(source: JobSource, query: &str, location: &str) -> String {
    match source {
        JobSource::Indeed => format!(
            "https://www.indeed.com/jobs?q={}&l={}&remotejob=032b3046-06a3-4876-8dfd-474eb5e7ed11",
            plus_encode(query),
            plus_encode(location)
        ),
        JobSource::Glassdoor => format!(
            "https://www.glassdoor.com/Job/{}-jobs-SRCH_KO0,30.htm?remoteWorkType=1",
            plus_encode(query)
        ),
        JobSource::X => format!(
            "https://x.com/search?q={}&src=typed_query",
            percent_encode(&format!("{query} {location} job -filter:replies"))
        ),
    }
}

fn plus_encode(text: &str) -> String {
    text.replace(" OR ", "+").replace(' ', "+")
}

fn percent_encode(text: &str) -> String {
    text.replace(' ', "%20")
}

/// Turns a search-results page into postings by asking the oracle what it
/// sees. Over-inclusive by design: a posting that cannot be resolved keeps
/// the search URL as its link, and downstream filtering absorbs the noise.
pub struct JobDiscoveryService<'a, S, O> {
    session: &'a S,
    oracle: &'a O,
}

impl<'a, S: WebSession, O: Oracle> JobDiscoveryService<'a, S, O> {
    pub fn new(session: &'a S, oracle: &'a O) -> Self {
        Self { session, oracle }
    }

    pub async fn discover(
        &self,
        query: &str,
        location: &str,
        source: JobSource,
    ) -> Vec<JobPosting> {
        let url = search_url(source, query, location);
        info!(%source, url, "scraping search results");

        if let Err(e) = self.session.navigate(&url) {
            warn!(error = format!("{e:#}"), "could not open search page");
            return Vec::new();
        }
        self.session.settle(SETTLE_NAV);

        let Ok(shot) = self.session.capture() else {
            warn!(%source, "no screenshot available");
            return Vec::new();
        };

        let system = match source {
            JobSource::X => DISCOVERY_SYSTEM_PROMPT_X,
            _ => DISCOVERY_SYSTEM_PROMPT,
        };
        let Some(value) = Planner::new(self.oracle)
            .ask_json(&shot, system, DISCOVERY_TASK)
            .await
        else {
            return Vec::new();
        };
        let Some(jobs) = value.get("jobs").and_then(|j| j.as_array()) else {
            warn!(%source, "oracle reply has no 'jobs' list");
            return Vec::new();
        };

        let mut postings = Vec::new();
        for (i, job) in jobs.iter().enumerate() {
            let title = job
                .get("title")
                .and_then(|t| t.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| format!("Untitled {i}"));
            let Some(locator) = job.get("xpath").and_then(|x| x.as_str()).filter(|x| !x.is_empty())
            else {
                warn!(%source, index = i, "candidate without a locator, dropping");
                continue;
            };
            let link = self.resolve_link(&url, locator);
            info!(%source, title, link, "discovered posting");
            postings.push(JobPosting {
                title,
                link,
                source,
            });
        }
        info!(%source, count = postings.len(), "discovery finished");
        postings
    }

    /// Follow one claimed listing element to its posting URL, then come back
    /// to the results page. Any failure falls back to the search URL itself.
    fn resolve_link(&self, search_url: &str, locator: &str) -> String {
        let href = self
            .session
            .read_attribute(locator, "href")
            .ok()
            .flatten();

        let link = match self.session.click(locator, ELEMENT_WAIT) {
            Ok(()) => {
                self.session.settle(SETTLE_ACTION);
                let landed = self.session.current_url();
                if landed.is_empty() || landed == search_url {
                    href.unwrap_or_else(|| search_url.to_string())
                } else {
                    landed
                }
            }
            Err(e) => {
                warn!(locator, error = format!("{e:#}"), "could not follow listing");
                href.unwrap_or_else(|| search_url.to_string())
            }
        };

        // Best-effort return to the results page for the next candidate.
        if let Err(e) = self.session.navigate(search_url) {
            warn!(error = format!("{e:#}"), "could not return to search page");
        }
        self.session.settle(SETTLE_ACTION);
        link
    }
}
