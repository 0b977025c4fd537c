pub mod chrome;
pub mod engine;
pub mod session;

pub use chrome::ChromeEngine;
pub use engine::{BrowserEngine, BrowserInstance, BrowserPage};
pub use session::{render_pdf, RenderSession};
