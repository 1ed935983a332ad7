use anyhow::{Context, Result, anyhow};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::types::Perception;

/// The live page, reduced to the capabilities the pipeline actually needs.
/// Locators are XPath expressions claimed by the oracle; every method that
/// takes one treats "element not found" as an ordinary error the caller
/// absorbs, not a session failure.
pub trait WebSession {
    fn navigate(&self, url: &str) -> Result<()>;

    fn current_url(&self) -> String;

    /// Capture the page as an encoded screenshot. Failure here is the one
    /// session-level fault that ends an application attempt.
    fn capture(&self) -> Result<Perception>;

    /// Read an attribute off the first element matching `locator`.
    fn read_attribute(&self, locator: &str, name: &str) -> Result<Option<String>>;

    /// Wait (bounded) for the element, then type into it.
    fn type_text(&self, locator: &str, text: &str, wait: Duration) -> Result<()>;

    /// Wait (bounded) for the element, then click it.
    fn click(&self, locator: &str, wait: Duration) -> Result<()>;

    /// Wait (bounded) for the file input, then attach `path` to it.
    fn upload_file(&self, locator: &str, path: &Path, wait: Duration) -> Result<()>;

    /// Fixed pause to let the page settle after navigation or a click.
    fn settle(&self, pause: Duration);
}

/// Persistent Chrome session. Launched once, shared by discovery, filtering,
/// and every application attempt in the run.
pub struct BrowserSession {
    _browser: Browser,
    tab: Arc<Tab>,
}

impl BrowserSession {
    pub fn launch(headless: bool) -> Result<Self> {
        let options = LaunchOptions {
            headless,
            sandbox: false,
            args: vec![
                std::ffi::OsStr::new("--disable-dev-shm-usage"),
                std::ffi::OsStr::new("--no-first-run"),
                std::ffi::OsStr::new("--no-default-browser-check"),
            ],
            window_size: Some((1280, 1024)),
            // Oracle calls can keep the browser idle for a while.
            idle_browser_timeout: Duration::from_secs(300),
            ..Default::default()
        };

        let browser =
            Browser::new(options).map_err(|e| anyhow!("browser launch failed: {e}"))?;
        let tab = browser.new_tab()?;
        tab.navigate_to("about:blank")?;

        Ok(Self {
            _browser: browser,
            tab,
        })
    }
}

impl WebSession for BrowserSession {
    fn navigate(&self, url: &str) -> Result<()> {
        self.tab
            .navigate_to(url)
            .with_context(|| format!("navigate to {url}"))?;
        self.tab.wait_until_navigated()?;
        Ok(())
    }

    fn current_url(&self) -> String {
        self.tab.get_url()
    }

    fn capture(&self) -> Result<Perception> {
        let png = self
            .tab
            .capture_screenshot(CaptureScreenshotFormatOption::Png, None, None, true)
            .context("capture screenshot")?;
        Ok(Perception::new(BASE64.encode(png)))
    }

    fn read_attribute(&self, locator: &str, name: &str) -> Result<Option<String>> {
        let element = self.tab.find_element_by_xpath(locator)?;
        let result = element.call_js_fn(
            "function(name) { return this.getAttribute(name); }",
            vec![serde_json::Value::String(name.to_string())],
            false,
        )?;
        Ok(result.value.and_then(|v| v.as_str().map(String::from)))
    }

    fn type_text(&self, locator: &str, text: &str, wait: Duration) -> Result<()> {
        let element = self.tab.wait_for_xpath_with_custom_timeout(locator, wait)?;
        element.click()?;
        element.type_into(text)?;
        Ok(())
    }

    fn click(&self, locator: &str, wait: Duration) -> Result<()> {
        let element = self.tab.wait_for_xpath_with_custom_timeout(locator, wait)?;
        element.click()?;
        Ok(())
    }

    fn upload_file(&self, locator: &str, path: &Path, wait: Duration) -> Result<()> {
        let element = self.tab.wait_for_xpath_with_custom_timeout(locator, wait)?;
        let path = path.to_string_lossy();
        element.set_input_files(&[path.as_ref()])?;
        Ok(())
    }

    fn settle(&self, pause: Duration) {
        std::thread::sleep(pause);
    }
}
