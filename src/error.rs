use serde::{Deserialize, Serialize};
use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// DIAGNOSTIC CODES
// ═══════════════════════════════════════════════════════════════════════════════

pub const W_MOUNT_ROOT: &str = "W-MOUNT-ROOT";
pub const W_MOUNT_NOT_FOUND: &str = "W-MOUNT-NOT-FOUND";
pub const W_TEMPLATE_MISSING: &str = "W-TEMPLATE-MISSING";
pub const E_TEMPLATE_INVALID: &str = "E-TEMPLATE-INVALID";
pub const W_RENDER_MISSING: &str = "W-RENDER-MISSING";

pub const E_COMPILE_MULTIPLE_ROOTS: &str = "E-COMPILE-MULTIPLE-ROOTS";
pub const E_COMPILE_INVALID_ROOT: &str = "E-COMPILE-INVALID-ROOT";
pub const E_COMPILE_EXPRESSION: &str = "E-COMPILE-EXPRESSION";

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILE ERROR
// ═══════════════════════════════════════════════════════════════════════════════

/// Error reported by a template compiler. Propagated to the mount caller as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[error("{code}: {message}")]
pub struct CompileError {
    pub code: String,
    pub message: String,
    /// Byte range into the template source. Only present when source ranges were requested.
    pub range: Option<(usize, usize)>,
}

impl CompileError {
    pub fn new(code: &str, message: &str) -> Self {
        CompileError {
            code: code.to_string(),
            message: message.to_string(),
            range: None,
        }
    }

    pub fn with_range(mut self, start: usize, end: usize) -> Self {
        self.range = Some((start, end));
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// MOUNT ERROR
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MountError {
    /// `template` is neither markup, a node handle, nor absent.
    #[error("invalid template option: {0}")]
    InvalidTemplate(String),
    #[error(transparent)]
    Compile(#[from] CompileError),
}

impl MountError {
    pub fn code(&self) -> &str {
        match self {
            MountError::InvalidTemplate(_) => E_TEMPLATE_INVALID,
            MountError::Compile(e) => &e.code,
        }
    }
}
