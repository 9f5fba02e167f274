// Tue Jan 13 2026 - Alex

use crate::output::DiscoveryReport;

pub fn render(report: &DiscoveryReport<'_>) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(report)
}
