//! Non-fatal usage errors found while rewriting

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub class_name: String,
    pub method_name: String,
    pub message: String,
}

impl Diagnostic {
    pub fn new(class_name: impl Into<String>, method_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self { class_name: class_name.into(), method_name: method_name.into(), message: message.into() }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}: {}", self.class_name, self.method_name, self.message)
    }
}

/// Receives usage errors; processing continues after each report
pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic);
}

/// Collects diagnostics and mirrors each one to the error log
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.entries.iter()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}

impl DiagnosticSink for Diagnostics {
    fn report(&mut self, diagnostic: Diagnostic) {
        log::error!("{}", diagnostic);
        self.entries.push(diagnostic);
    }
}
