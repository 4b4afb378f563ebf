//
// types.rs
//
// Value types shared across the dependency tracking pipeline
//

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Severity of a resolver report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportSeverity {
    Error,
    Warning,
    Info,
}

/// A message produced while resolving a file's dependencies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResolveReport {
    pub severity: ReportSeverity,
    pub message: String,
    /// 0-based line the report points at, when the resolver knows one.
    pub line: Option<u32>,
}

impl ResolveReport {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: ReportSeverity::Error,
            message: message.into(),
            line: None,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: ReportSeverity::Warning,
            message: message.into(),
            line: None,
        }
    }

    pub fn at_line(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }
}

/// Resolved dependencies for one script file.
///
/// Immutable value semantics: comparisons are whole-set equality, and cache
/// updates are full replacements rather than partial merges. Roots are kept
/// sorted so equal sets compare equal regardless of resolution order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DependencySet {
    /// Dependency roots (directories or archives) a build/index system must
    /// be told about.
    pub roots: BTreeSet<PathBuf>,
    /// Implicit imports injected into the script's scope.
    pub imports: Vec<String>,
}

impl DependencySet {
    pub fn new(roots: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            roots: roots.into_iter().collect(),
            imports: Vec::new(),
        }
    }

    pub fn with_imports(mut self, imports: impl IntoIterator<Item = String>) -> Self {
        self.imports = imports.into_iter().collect();
        self
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty() && self.imports.is_empty()
    }
}

/// What a resolver hands back for one file: possibly-absent dependencies
/// plus whatever reports were produced along the way.
///
/// Resolution failure is expressed as `dependencies: None` with error
/// reports. Downstream code never sees a raw resolver error.
#[derive(Debug, Clone, Default)]
pub struct ResolveOutcome {
    pub dependencies: Option<DependencySet>,
    pub reports: Vec<ResolveReport>,
}

impl ResolveOutcome {
    pub fn resolved(dependencies: DependencySet) -> Self {
        Self {
            dependencies: Some(dependencies),
            reports: Vec::new(),
        }
    }

    pub fn failed(report: ResolveReport) -> Self {
        Self {
            dependencies: None,
            reports: vec![report],
        }
    }

    pub fn with_reports(mut self, reports: Vec<ResolveReport>) -> Self {
        self.reports = reports;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependency_set_equality_ignores_root_order() {
        let a = DependencySet::new(vec![PathBuf::from("/lib/a"), PathBuf::from("/lib/b")]);
        let b = DependencySet::new(vec![PathBuf::from("/lib/b"), PathBuf::from("/lib/a")]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_dependency_set_import_order_matters() {
        let a = DependencySet::default().with_imports(vec!["x".to_string(), "y".to_string()]);
        let b = DependencySet::default().with_imports(vec!["y".to_string(), "x".to_string()]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_failed_outcome_has_no_dependencies() {
        let outcome = ResolveOutcome::failed(ResolveReport::error("resolver crashed"));
        assert!(outcome.dependencies.is_none());
        assert_eq!(outcome.reports.len(), 1);
        assert_eq!(outcome.reports[0].severity, ReportSeverity::Error);
    }

    #[test]
    fn test_dependency_set_roundtrips_through_json() {
        let deps = DependencySet::new(vec![PathBuf::from("/lib/a")])
            .with_imports(vec!["pkg.util".to_string()]);
        let json = serde_json::to_string(&deps).unwrap();
        let back: DependencySet = serde_json::from_str(&json).unwrap();
        assert_eq!(deps, back);
    }
}
