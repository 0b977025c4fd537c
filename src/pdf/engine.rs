use std::time::Duration;

use crate::core::{PdfOptions, RenderError};

/// Starts isolated headless-browser processes.
pub trait BrowserEngine: Send + Sync {
    fn launch(&self) -> Result<Box<dyn BrowserInstance>, RenderError>;

    /// Largest markup, in bytes, the engine can load. `None` means no limit.
    fn max_markup_bytes(&self) -> Option<usize> {
        None
    }
}

/// One running browser process.
pub trait BrowserInstance: Send {
    fn new_page(&mut self) -> Result<Box<dyn BrowserPage>, RenderError>;

    /// Terminates the process. Must be safe to call on an instance whose
    /// earlier operations failed.
    fn close(&mut self);
}

/// A page inside a running browser.
pub trait BrowserPage: Send {
    /// Loads `markup` as the document and blocks until the network has been
    /// idle, or fails once `timeout` elapses.
    fn load(&mut self, markup: &str, timeout: Duration) -> Result<(), RenderError>;

    fn print(&mut self, options: &PdfOptions, timeout: Duration) -> Result<Vec<u8>, RenderError>;
}
