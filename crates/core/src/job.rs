// Render jobs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::RenderError;
use crate::options::RenderOptions;

/// One request to render markup into a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderJob {
    pub id: Uuid,
    pub content: String,
    pub options: RenderOptions,
    /// Suggested download name for the document
    pub filename: Option<String>,
}

impl RenderJob {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            content: content.into(),
            options: RenderOptions::default(),
            filename: None,
        }
    }

    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Reject jobs that can never render
    pub fn validate(&self) -> Result<(), RenderError> {
        if self.content.trim().is_empty() {
            return Err(RenderError::validation("content is empty"));
        }
        self.options.validate()?;
        Ok(())
    }

    /// Filename safe to place inside a quoted `Content-Disposition` value.
    ///
    /// Quotes, backslashes, path separators and control characters are
    /// dropped. Returns `None` when nothing usable is left.
    pub fn attachment_name(&self) -> Option<String> {
        let name: String = self
            .filename
            .as_deref()?
            .chars()
            .filter(|c| !c.is_control() && !matches!(c, '"' | '\\' | '/'))
            .collect();
        let name = name.trim();

        if name.is_empty() || name == "." || name == ".." {
            None
        } else {
            Some(name.to_string())
        }
    }
}
