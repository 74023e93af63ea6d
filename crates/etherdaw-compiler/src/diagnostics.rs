//! Warning collection.

use tracing::warn;

use crate::error::{CompileWarning, WarningCode};

/// Collects recoverable problems and mirrors each one to the log.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    warnings: Vec<CompileWarning>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, warning: CompileWarning) {
        warn!(code = %warning.code, path = warning.path.as_deref().unwrap_or(""), "{}", warning.message);
        self.warnings.push(warning);
    }

    pub fn warn(&mut self, code: WarningCode, message: impl Into<String>, path: impl Into<String>) {
        self.push(CompileWarning::with_path(code, message, path));
    }

    /// Appends already-logged warnings.
    pub fn extend(&mut self, other: Diagnostics) {
        self.warnings.extend(other.warnings);
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn warnings(&self) -> &[CompileWarning] {
        &self.warnings
    }

    pub fn into_warnings(self) -> Vec<CompileWarning> {
        self.warnings
    }
}
