use std::ffi::OsStr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use headless_chrome::protocol::cdp::types::Event;
use headless_chrome::protocol::cdp::Page;
use headless_chrome::types::PrintToPdfOptions;
use headless_chrome::{Browser, LaunchOptions, Tab};

use super::engine::{BrowserEngine, BrowserInstance, BrowserPage};
use crate::core::{BrowserConfig, PdfOptions, RenderError};

/// Flags Chrome needs to survive inside containers: no /dev/shm backed
/// rendering and no OS sandbox.
pub const LAUNCH_ARGS: [&str; 2] = ["--disable-dev-shm-usage", "--no-sandbox"];

const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(50);

const DATA_URL_PREFIX: &str = "data:text/html;charset=utf-8;base64,";

/// Chromium refuses to navigate to URLs longer than this (`url::kMaxURLChars`).
pub const MAX_URL_CHARS: usize = 2 * 1024 * 1024;

/// Largest markup whose data URL still fits in [`MAX_URL_CHARS`].
pub const MAX_MARKUP_BYTES: usize = (MAX_URL_CHARS - DATA_URL_PREFIX.len()) / 4 * 3;

pub fn data_url(markup: &str) -> String {
    format!("{}{}", DATA_URL_PREFIX, BASE64.encode(markup))
}

/// Chrome pads an empty header/footer slot with the page title and date.
const BLANK_SLOT: &str = "<span></span>";

/// Launches one headless Chrome per render session.
pub struct ChromeEngine {
    chrome_path: Option<PathBuf>,
    idle_browser_timeout: Duration,
}

impl ChromeEngine {
    pub fn new(config: &BrowserConfig) -> Self {
        ChromeEngine {
            chrome_path: config.chrome_path.as_ref().map(PathBuf::from),
            idle_browser_timeout: config.session_timeout,
        }
    }

    fn launch_options(&self) -> Result<LaunchOptions<'static>, RenderError> {
        LaunchOptions::default_builder()
            .headless(true)
            .sandbox(false)
            .path(self.chrome_path.clone())
            .args(LAUNCH_ARGS.iter().map(OsStr::new).collect())
            .idle_browser_timeout(self.idle_browser_timeout)
            .build()
            .map_err(|e| RenderError::Launch(e.to_string()))
    }
}

impl BrowserEngine for ChromeEngine {
    fn launch(&self) -> Result<Box<dyn BrowserInstance>, RenderError> {
        let browser = Browser::new(self.launch_options()?)
            .map_err(|e| RenderError::Launch(format!("{:#}", e)))?;

        Ok(Box::new(ChromeInstance {
            browser: Some(browser),
        }))
    }

    fn max_markup_bytes(&self) -> Option<usize> {
        Some(MAX_MARKUP_BYTES)
    }
}

struct ChromeInstance {
    browser: Option<Browser>,
}

impl BrowserInstance for ChromeInstance {
    fn new_page(&mut self) -> Result<Box<dyn BrowserPage>, RenderError> {
        let browser = self
            .browser
            .as_ref()
            .ok_or_else(|| RenderError::Launch("browser already closed".to_string()))?;

        let tab = browser
            .new_tab()
            .map_err(|e| RenderError::Navigation(format!("cannot open page: {:#}", e)))?;

        Ok(Box::new(ChromePage { tab }))
    }

    fn close(&mut self) {
        // Dropping the last handle kills the child process.
        if let Some(browser) = self.browser.take() {
            drop(browser);
        }
    }
}

struct ChromePage {
    tab: Arc<Tab>,
}

fn navigation_error(err: anyhow::Error) -> RenderError {
    RenderError::Navigation(format!("{:#}", err))
}

impl BrowserPage for ChromePage {
    fn load(&mut self, markup: &str, timeout: Duration) -> Result<(), RenderError> {
        let deadline = Instant::now() + timeout;
        let idle = Arc::new(AtomicBool::new(false));

        let main_frame = self.tab.get_target_id().clone();
        let flag = idle.clone();
        let listener = self
            .tab
            .add_event_listener(Arc::new(move |event: &Event| {
                if let Event::PageLifecycleEvent(lifecycle) = event {
                    if lifecycle.params.frame_id != main_frame {
                        return;
                    }
                    match lifecycle.params.name.as_str() {
                        "init" => flag.store(false, Ordering::SeqCst),
                        "networkIdle" => flag.store(true, Ordering::SeqCst),
                        _ => {}
                    }
                }
            }))
            .map_err(navigation_error)?;

        self.tab
            .call_method(Page::SetLifecycleEventsEnabled { enabled: true })
            .map_err(navigation_error)?;
        self.tab.set_default_timeout(timeout);

        let url = data_url(markup);
        self.tab
            .navigate_to(&url)
            .and_then(|tab| tab.wait_until_navigated())
            .map_err(navigation_error)?;

        let outcome = loop {
            if idle.load(Ordering::SeqCst) {
                break Ok(());
            }
            if Instant::now() >= deadline {
                break Err(RenderError::Navigation(format!(
                    "network did not become idle within {} ms",
                    timeout.as_millis()
                )));
            }
            std::thread::sleep(IDLE_POLL_INTERVAL);
        };

        let _ = self.tab.remove_event_listener(&listener);
        outcome
    }

    fn print(&mut self, options: &PdfOptions, timeout: Duration) -> Result<Vec<u8>, RenderError> {
        self.tab.set_default_timeout(timeout);
        self.tab
            .print_to_pdf(Some(print_options(options)))
            .map_err(|e| RenderError::Print(format!("{:#}", e)))
    }
}

pub fn print_options(options: &PdfOptions) -> PrintToPdfOptions {
    let (paper_width, paper_height) = options.format.dimensions();
    let slot = |template: &Option<String>| {
        options
            .display_header_footer
            .then(|| template.clone().unwrap_or_else(|| BLANK_SLOT.to_string()))
    };

    PrintToPdfOptions {
        landscape: Some(options.landscape),
        display_header_footer: Some(options.display_header_footer),
        print_background: Some(options.print_background),
        scale: Some(options.scale),
        paper_width: Some(paper_width),
        paper_height: Some(paper_height),
        margin_top: Some(options.margin.top),
        margin_bottom: Some(options.margin.bottom),
        margin_left: Some(options.margin.left),
        margin_right: Some(options.margin.right),
        header_template: slot(&options.header_template),
        footer_template: slot(&options.footer_template),
        prefer_css_page_size: Some(false),
        ..Default::default()
    }
}
