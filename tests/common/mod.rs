#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use template_pdf_renderer::core::{AppConfig, PdfOptions, RenderError};
use template_pdf_renderer::pdf::{BrowserEngine, BrowserInstance, BrowserPage};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Fault {
    None,
    Launch,
    Load,
    Print,
}

#[derive(Default)]
pub struct Recorder {
    pub launches: usize,
    pub closes: usize,
    pub markup: Vec<String>,
    pub options: Vec<PdfOptions>,
}

/// Browser stand-in that prints the loaded markup wrapped in a PDF envelope.
#[derive(Clone)]
pub struct FakeEngine {
    fault: Fault,
    pub recorder: Arc<Mutex<Recorder>>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::failing(Fault::None)
    }

    pub fn failing(fault: Fault) -> Self {
        FakeEngine {
            fault,
            recorder: Arc::new(Mutex::new(Recorder::default())),
        }
    }

    pub fn launches(&self) -> usize {
        self.recorder.lock().unwrap().launches
    }

    pub fn closes(&self) -> usize {
        self.recorder.lock().unwrap().closes
    }

    pub fn last_markup(&self) -> Option<String> {
        self.recorder.lock().unwrap().markup.last().cloned()
    }

    pub fn last_options(&self) -> Option<PdfOptions> {
        self.recorder.lock().unwrap().options.last().cloned()
    }
}

struct FakeInstance {
    fault: Fault,
    recorder: Arc<Mutex<Recorder>>,
}

struct FakePage {
    fault: Fault,
    recorder: Arc<Mutex<Recorder>>,
    markup: String,
}

impl BrowserEngine for FakeEngine {
    fn launch(&self) -> Result<Box<dyn BrowserInstance>, RenderError> {
        if self.fault == Fault::Launch {
            return Err(RenderError::Launch("chrome binary not found".into()));
        }
        self.recorder.lock().unwrap().launches += 1;
        Ok(Box::new(FakeInstance {
            fault: self.fault,
            recorder: self.recorder.clone(),
        }))
    }
}

impl BrowserInstance for FakeInstance {
    fn new_page(&mut self) -> Result<Box<dyn BrowserPage>, RenderError> {
        Ok(Box::new(FakePage {
            fault: self.fault,
            recorder: self.recorder.clone(),
            markup: String::new(),
        }))
    }

    fn close(&mut self) {
        self.recorder.lock().unwrap().closes += 1;
    }
}

impl BrowserPage for FakePage {
    fn load(&mut self, markup: &str, _timeout: Duration) -> Result<(), RenderError> {
        self.recorder.lock().unwrap().markup.push(markup.to_string());
        if self.fault == Fault::Load {
            return Err(RenderError::Navigation("network did not become idle within 10 ms".into()));
        }
        self.markup = markup.to_string();
        Ok(())
    }

    fn print(&mut self, options: &PdfOptions, _timeout: Duration) -> Result<Vec<u8>, RenderError> {
        self.recorder.lock().unwrap().options.push(options.clone());
        if self.fault == Fault::Print {
            return Err(RenderError::Print("Printing failed".into()));
        }
        Ok(format!("%PDF-1.7\n{}\n%%EOF", self.markup).into_bytes())
    }
}

pub const BUCKET: &str = "pdf-pw-templates";

pub const SINGLE_ACCOUNT: &str = r#"<html>
<body>
  <h1>{{ name }}</h1>
  <div id="chart"></div>
  <script>
    const items = {{ items_json }};
    document.getElementById("chart").textContent = items.map(i => i.label).join(",");
  </script>
</body>
</html>"#;

pub fn test_config() -> AppConfig {
    AppConfig::default()
}
