//! Error types shared by the constellation subsystems.

use thiserror::Error;

/// Failures of the accelerated rendering path. Every variant is recoverable
/// by switching to the vector fallback.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("no accelerated rendering context is available")]
    NoContext,

    #[error("shader version {0} lacks in/out interface support")]
    UnsupportedShaderVersion(String),

    #[error("failed to compile {stage} shader: {log}")]
    ShaderCompile { stage: &'static str, log: String },

    #[error("failed to link shader program: {0}")]
    ProgramLink(String),

    #[error("failed to create GPU resource: {0}")]
    Resource(String),

    #[error("GL error 0x{0:04X}")]
    Gl(u32),

    #[error("graphics context lost")]
    ContextLost,
}

/// Main error type for the constellation viewer.
#[derive(Error, Debug)]
pub enum ConstellationError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Layout worker error: {0}")]
    Worker(String),

    #[error("GPU signature pattern error: {0}")]
    Pattern(#[from] regex::Error),
}

pub type Result<T> = std::result::Result<T, ConstellationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ConstellationError::Config("bad background".to_string());
        assert_eq!(err.to_string(), "Configuration error: bad background");
    }

    #[test]
    fn test_render_error_display() {
        assert_eq!(RenderError::Gl(0x0505).to_string(), "GL error 0x0505");
    }

    #[test]
    fn test_pattern_error_wraps() {
        let err: ConstellationError = regex::Regex::new("(").unwrap_err().into();
        assert!(err.to_string().starts_with("GPU signature pattern error:"));
    }
}
