use thiserror::Error;

/// Failures surfaced by the effects core.
///
/// Pointer glitches are deliberately absent: malformed pointer samples are
/// clamped by the input tracker and only counted.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FxError {
    /// A GPU buffer, texture or pipeline could not be created.
    #[error("resource allocation failed for {what}: {reason}")]
    ResourceAllocation { what: String, reason: String },

    /// The device went away; the host has to remount.
    #[error("GPU context lost")]
    ContextLost,

    /// Unknown effect variant or an out-of-range configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("uniform `{name}` is not declared by program `{program}`")]
    UnknownUniform { program: String, name: String },

    #[error("uniform `{name}` expects {expected}, got {found}")]
    UniformTypeMismatch {
        name: String,
        expected: &'static str,
        found: &'static str,
    },

    /// WGSL source and declared uniform schema disagree.
    #[error("shader `{program}` failed validation: {reason}")]
    ShaderValidation { program: String, reason: String },
}

impl FxError {
    pub fn allocation(what: impl Into<String>, reason: impl Into<String>) -> Self {
        FxError::ResourceAllocation {
            what: what.into(),
            reason: reason.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        FxError::InvalidConfiguration(msg.into())
    }
}

pub type FxResult<T> = Result<T, FxError>;
