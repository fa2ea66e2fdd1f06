//! Error handling for the minipy compiler
//!
//! The code-generation core consumes a tree that semantic analysis has
//! already validated, so almost everything that can go wrong here is a
//! compiler bug rather than a user error. The variants below cover the
//! conditions that are reported as errors; invariant violations that can
//! only come from a buggy emitter panic instead.

use thiserror::Error;

/// Main compiler error type for the code-generation phase.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompilerError {
    #[error("Missing runtime routine: {name}")]
    MissingRuntime { name: String },

    #[error("Code generation error: {message}")]
    Codegen { message: String },

    #[error("Internal compiler error: {message}")]
    Internal { message: String },
}

impl CompilerError {
    /// Create a codegen error
    pub fn codegen(message: impl Into<String>) -> Self {
        CompilerError::Codegen {
            message: message.into(),
        }
    }

    /// Create an error for a runtime library routine that has no source
    pub fn missing_runtime(name: impl Into<String>) -> Self {
        CompilerError::MissingRuntime { name: name.into() }
    }
}

/// Convert from String (for simple error cases)
impl From<String> for CompilerError {
    fn from(message: String) -> Self {
        CompilerError::Internal { message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CompilerError::missing_runtime("heap.init");
        assert_eq!(err.to_string(), "Missing runtime routine: heap.init");

        let err = CompilerError::codegen("bad operand");
        assert_eq!(err.to_string(), "Code generation error: bad operand");
    }

    #[test]
    fn test_from_string() {
        let err: CompilerError = "oops".to_string().into();
        assert_eq!(
            err,
            CompilerError::Internal {
                message: "oops".to_string()
            }
        );
    }
}
