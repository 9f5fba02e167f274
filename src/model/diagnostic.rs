// Tue Jan 13 2026 - Alex

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub component: String,
    pub module: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(severity: Severity, component: &str, message: impl Into<String>) -> Self {
        Self {
            severity,
            component: component.to_string(),
            module: None,
            message: message.into(),
        }
    }

    pub fn info(component: &str, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, component, message)
    }

    pub fn warning(component: &str, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, component, message)
    }

    pub fn error(component: &str, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, component, message)
    }

    pub fn for_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.module {
            Some(module) => write!(f, "[{}] {} ({}): {}", self.severity, self.component, module, self.message),
            None => write!(f, "[{}] {}: {}", self.severity, self.component, self.message),
        }
    }
}
