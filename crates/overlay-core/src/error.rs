use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Stage of the render pass that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStage {
    /// Drawing boxes into a page's content stream
    Draw,
    /// Serializing the modified document
    Serialize,
    /// Writing bytes to the temporary output file
    Write,
    /// Moving the finished temporary file to its destination
    Persist,
}

impl fmt::Display for RenderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RenderStage::Draw => "draw",
            RenderStage::Serialize => "serialize",
            RenderStage::Write => "write",
            RenderStage::Persist => "persist",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum OverlayError {
    #[error("Failed to read source document {}: {source}", path.display())]
    SourceRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse PDF: {0}")]
    ParseError(String),

    #[error("Geometry extraction failed for page {page}: {message}")]
    GeometryExtraction { page: usize, message: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Render failed during {stage} stage: {message}")]
    RenderFailure { stage: RenderStage, message: String },
}

impl OverlayError {
    pub fn render(stage: RenderStage, message: impl Into<String>) -> Self {
        OverlayError::RenderFailure {
            stage,
            message: message.into(),
        }
    }

    pub fn geometry(page: usize, message: impl Into<String>) -> Self {
        OverlayError::GeometryExtraction {
            page,
            message: message.into(),
        }
    }

    /// Recoverable errors degrade a single page instead of failing the run
    pub fn is_recoverable(&self) -> bool {
        matches!(self, OverlayError::GeometryExtraction { .. })
    }
}
