//! Error types shared by the composer, the passes and the backends.

use super::Id;
use thiserror::Error;

/// Errors raised while building a pass.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PassError {
    /// A shader definition the pass relies on is not registered.
    #[error("{pass} relies on shader `{shader}`, which is not registered")]
    MissingDependency {
        /// Name of the pass being constructed.
        pass: &'static str,
        /// Name of the missing shader definition.
        shader: String,
    },
}

/// Errors surfaced by a [`Renderer`](super::Renderer) while drawing.
///
/// The composer never catches these: a failing pass aborts the frame and the
/// error is handed back to the caller of `render`.
#[derive(Error, Debug)]
pub enum RenderError {
    /// A draw referenced a render target the backend does not know.
    #[error("unknown render target {0}")]
    UnknownRenderTarget(Id),

    /// A pass asked to draw to the screen but no frame is in flight.
    #[error("no screen target is bound for this frame")]
    NoScreenTarget,

    /// Shader compilation or pipeline creation failed.
    #[error("failed to compile shader `{name}`: {message}")]
    ShaderCompilation {
        /// Material name.
        name: String,
        /// Backend diagnostic.
        message: String,
    },

    /// Failed to acquire the next surface texture.
    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),

    /// Any other backend failure.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Errors raised by a composer configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The TOML document could not be parsed.
    #[error("invalid composer config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is outside of its valid range.
    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue {
        /// Offending field.
        field: &'static str,
        /// Human readable reason.
        reason: String,
    },
}

/// Errors from operations that build passes and draw in the same call.
#[derive(Error, Debug)]
pub enum ComposerError {
    /// A pass could not be built.
    #[error(transparent)]
    Pass(#[from] PassError),

    /// The backend failed.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// The configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_dependency_message() {
        let err = PassError::MissingDependency {
            pass: "FilmPass",
            shader: "film".into(),
        };
        assert_eq!(
            err.to_string(),
            "FilmPass relies on shader `film`, which is not registered"
        );
    }

    #[test]
    fn test_composer_error_is_transparent() {
        let err: ComposerError = RenderError::NoScreenTarget.into();
        assert_eq!(err.to_string(), "no screen target is bound for this frame");
    }
}
