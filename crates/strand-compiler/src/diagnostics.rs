//! Diagnostic reporting: the sink interface the compiler reports through, plus the error type
//! returned when lowering aborts.

use std::fmt;

use strand_ir::SourceLocation;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Debug,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Debug => "debug",
            Severity::Warning => "warning",
            Severity::Error => "error",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub location: SourceLocation,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.location, self.severity, self.message)
    }
}

/// Receives every diagnostic the compiler produces.
pub trait DiagnosticSink {
    fn report(&mut self, severity: Severity, message: &str, location: SourceLocation);
}

/// A sink that keeps everything it is given.
#[derive(Clone, Debug, Default)]
pub struct DiagnosticBag {
    pub diagnostics: Vec<Diagnostic>,
}

impl DiagnosticBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.with_severity(Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.with_severity(Severity::Warning)
    }

    pub fn with_severity(&self, severity: Severity) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(move |d| d.severity == severity)
    }
}

impl DiagnosticSink for DiagnosticBag {
    fn report(&mut self, severity: Severity, message: &str, location: SourceLocation) {
        self.diagnostics.push(Diagnostic {
            severity,
            message: message.to_string(),
            location,
        });
    }
}

/// Forwards diagnostics to `tracing` under the `strand::compile` target.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&mut self, severity: Severity, message: &str, location: SourceLocation) {
        let location = location.to_string();
        match severity {
            Severity::Debug => tracing::debug!(target: "strand::compile", %location, "{message}"),
            Severity::Warning => tracing::warn!(target: "strand::compile", %location, "{message}"),
            Severity::Error => tracing::error!(target: "strand::compile", %location, "{message}"),
        }
    }
}

/// A fatal compile error. Lowering of the compilation unit stops at the first one.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{location}: {message}")]
pub struct CompileError {
    pub message: String,
    pub location: SourceLocation,
}

impl CompileError {
    pub fn new(message: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            message: message.into(),
            location,
        }
    }
}

pub type CompileResult<T> = Result<T, CompileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bag_filters_by_severity() {
        let mut bag = DiagnosticBag::new();
        bag.report(Severity::Warning, "aliasing", SourceLocation::new(3, 1));
        bag.report(Severity::Error, "unknown name `x`", SourceLocation::new(4, 9));
        bag.report(Severity::Debug, "dump", SourceLocation::default());

        assert_eq!(bag.errors().count(), 1);
        assert_eq!(bag.warnings().count(), 1);
        assert_eq!(
            bag.errors().next().map(ToString::to_string).as_deref(),
            Some("4:9: error: unknown name `x`")
        );
    }

    #[test]
    fn compile_error_displays_location_first() {
        let err = CompileError::new("`break` outside of a loop", SourceLocation::new(7, 3));
        assert_eq!(err.to_string(), "7:3: `break` outside of a loop");
    }
}
