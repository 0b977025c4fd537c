use thiserror::Error;

/// Failures while reading a template out of object storage.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("template '{key}' not found in bucket '{bucket}'")]
    NotFound { bucket: String, key: String },

    #[error("storage access failed for '{key}': {message}")]
    Access { key: String, message: String },

    #[error("template key must not be empty")]
    EmptyKey,
}

/// Failures while interpolating request data into a template.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template syntax error: {0}")]
    Syntax(String),

    #[error("template render error: {0}")]
    Render(String),
}

impl From<minijinja::Error> for TemplateError {
    fn from(err: minijinja::Error) -> Self {
        // minijinja's Display omits the source location detail unless asked for it
        let message = match err.line() {
            Some(line) => format!("{} (line {})", err, line),
            None => err.to_string(),
        };

        match err.kind() {
            minijinja::ErrorKind::SyntaxError => TemplateError::Syntax(message),
            _ => TemplateError::Render(message),
        }
    }
}

/// Failures inside a headless-browser render session.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("browser launch failed: {0}")]
    Launch(String),

    #[error("page load failed: {0}")]
    Navigation(String),

    #[error("pdf print failed: {0}")]
    Print(String),

    #[error("render session exceeded {0} ms")]
    Timeout(u64),

    #[error("render task aborted: {0}")]
    Aborted(String),
}

/// Any failure of the fetch → bind → render pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

impl PipelineError {
    /// Short stage label used for metrics and logs.
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::BadRequest(_) => "request",
            PipelineError::Storage(_) => "fetch",
            PipelineError::Template(_) => "bind",
            PipelineError::Render(_) => "render",
        }
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
