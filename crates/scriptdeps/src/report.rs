//
// report.rs
//
// Resolver report sink
//

use url::Url;

use crate::types::{ReportSeverity, ResolveReport};

/// Receives resolver reports for a file.
///
/// Invoked only when a file's reports actually changed since the last
/// attachment. An empty slice means previously attached reports should be
/// cleared.
pub trait ReportSink: Send + Sync {
    fn attach(&self, uri: &Url, reports: &[ResolveReport]);
}

/// Sink that forwards reports to the log.
#[derive(Debug, Default)]
pub struct LogReportSink;

impl ReportSink for LogReportSink {
    fn attach(&self, uri: &Url, reports: &[ResolveReport]) {
        if reports.is_empty() {
            log::debug!("resolver reports cleared for {}", uri);
            return;
        }
        for report in reports {
            let line = report
                .line
                .map(|l| format!(":{}", l + 1))
                .unwrap_or_default();
            match report.severity {
                ReportSeverity::Error => log::error!("{}{}: {}", uri, line, report.message),
                ReportSeverity::Warning => log::warn!("{}{}: {}", uri, line, report.message),
                ReportSeverity::Info => log::info!("{}{}: {}", uri, line, report.message),
            }
        }
    }
}
