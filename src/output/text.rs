// Tue Jan 13 2026 - Alex

use crate::model::{RecordSource, Severity};
use crate::output::DiscoveryReport;
use crate::plugin::PluginStatus;
use crate::utils::{format_duration, pluralize};
use colored::Colorize;
use itertools::Itertools;
use std::fmt::Write;

pub fn render(report: &DiscoveryReport<'_>) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = write_report(&mut out, report);
    out
}

fn write_report(out: &mut String, report: &DiscoveryReport<'_>) -> std::fmt::Result {
    let result = report.result;

    writeln!(out, "{}", "Service Discovery".cyan().bold())?;
    writeln!(out, "{}", "=".repeat(50).cyan())?;

    let status = if result.success {
        "[+] Discovery complete".green()
    } else {
        "[!] Discovery incomplete".red()
    };
    writeln!(out, "{} in {}", status, format_duration(result.duration))?;
    if let Some(error) = &result.error {
        writeln!(out, "    {}", error.red())?;
    }

    writeln!(
        out,
        "  Modules: {} cached, {} scanned, {} failed, {} skipped",
        result.cache_hits.to_string().green(),
        result.freshly_scanned,
        result.failed_modules.to_string().red(),
        result.skipped_modules
    )?;
    writeln!(
        out,
        "  Records: {} registered, {} duplicates merged, {} filtered out",
        result.records.len().to_string().green(),
        result.statistics.duplicates_removed,
        result.filtered_out
    )?;

    if let Some(incremental) = &report.incremental {
        writeln!(
            out,
            "  Incremental: {} changed ({:.1}%), {} unchanged",
            pluralize(incremental.changed_modules.len(), "module", "modules"),
            incremental.change_ratio * 100.0,
            incremental.unchanged_modules
        )?;
    }

    if let Some(preload) = report.preload {
        writeln!(
            out,
            "  Preload: {} warmed, {} already cached, {} failed",
            preload.warmed, preload.already_cached, preload.failed
        )?;
    }

    writeln!(out)?;

    if !result.records.is_empty() {
        writeln!(out, "{}", "Registrations".yellow().bold())?;
        let width = result
            .records
            .iter()
            .map(|r| r.target.len())
            .max()
            .unwrap_or(0)
            .min(60);

        for record in &result.records {
            let source = match &record.source {
                RecordSource::Explicit => "explicit".to_string(),
                RecordSource::Convention => "convention".to_string(),
                RecordSource::Plugin(name) => format!("plugin:{}", name),
            };
            writeln!(
                out,
                "  {:>4}  {:<width$}  <- {}  [{}, {}]",
                record.order,
                record.target,
                record.implementation.green(),
                record.lifetime,
                source.dimmed(),
                width = width
            )?;
        }

        let by_lifetime = result
            .records
            .iter()
            .counts_by(|r| r.lifetime.to_string())
            .into_iter()
            .sorted()
            .map(|(lifetime, count)| format!("{} {}", count, lifetime))
            .join(", ");
        writeln!(out, "  ({})", by_lifetime)?;
        writeln!(out)?;
    }

    if let Some(plugins) = &result.plugin_result {
        if !plugins.per_plugin.is_empty() {
            writeln!(out, "{}", "Plugins".yellow().bold())?;
            for plugin in &plugins.per_plugin {
                let status = match plugin.status {
                    PluginStatus::Done => "done".green(),
                    PluginStatus::Degraded => "degraded".yellow(),
                    PluginStatus::Failed => "failed".red(),
                    PluginStatus::Skipped => "skipped".dimmed(),
                };
                writeln!(
                    out,
                    "  {} (priority {}): {}, {} in {}",
                    plugin.name,
                    plugin.priority,
                    status,
                    pluralize(plugin.records.len(), "record", "records"),
                    format_duration(plugin.duration)
                )?;
            }
            writeln!(out)?;
        }
    }

    let notable = result
        .diagnostics
        .iter()
        .filter(|d| d.severity >= Severity::Warning)
        .collect::<Vec<_>>();
    if !notable.is_empty() {
        writeln!(out, "{}", "Diagnostics".yellow().bold())?;
        for diagnostic in notable {
            let line = diagnostic.to_string();
            let line = match diagnostic.severity {
                Severity::Error => line.red(),
                _ => line.yellow(),
            };
            writeln!(out, "  {}", line)?;
        }
        writeln!(out)?;
    }

    if let Some(cache) = &report.cache {
        writeln!(out, "{}", "Cache".yellow().bold())?;
        writeln!(
            out,
            "  {} entries, {} records, ~{} KiB, hit rate {:.1}% ({} of {}), {} evicted, {} validation errors",
            cache.entry_count,
            cache.total_cached_records,
            cache.estimated_bytes / 1024,
            cache.hit_rate() * 100.0,
            cache.hits,
            cache.requests,
            cache.evictions,
            cache.validation_errors
        )?;
        writeln!(out)?;
    }

    if let Some(metrics) = &report.metrics {
        writeln!(out, "{}", "Metrics".yellow().bold())?;
        for (module, stats) in metrics.modules.iter().sorted_by(|a, b| {
            b.1.average_duration_ms
                .partial_cmp(&a.1.average_duration_ms)
                .unwrap_or(std::cmp::Ordering::Equal)
        }) {
            writeln!(
                out,
                "  {:<40} {:>3} scans  avg {:>8.2}ms  success {:>5.1}%",
                module,
                stats.scans,
                stats.average_duration_ms,
                stats.success_rate * 100.0
            )?;
        }
        for (operation, stats) in &metrics.cache_operations {
            writeln!(
                out,
                "  cache.{:<34} {:>3} ops    avg {:>8.2}ms  hit {:>5.1}%",
                operation,
                stats.count,
                stats.average_duration_ms,
                stats.hit_rate * 100.0
            )?;
        }
        if !metrics.errors.is_empty() {
            let errors = metrics.errors.iter().map(|(kind, n)| format!("{}={}", kind, n)).join(", ");
            writeln!(out, "  errors: {}", errors.red())?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheStats;
    use crate::model::{Diagnostic, Lifetime, RegistrationRecord};
    use crate::orchestration::DiscoveryResult;

    #[test]
    fn test_text_lists_records_and_problems() {
        colored::control::set_override(false);

        let result = DiscoveryResult {
            records: vec![
                RegistrationRecord::new("IWidget", "Widget").with_lifetime(Lifetime::Singleton),
                RegistrationRecord::new("IClock", "SystemClock").with_order(3),
            ],
            diagnostics: vec![
                Diagnostic::info("scanner", "quiet detail"),
                Diagnostic::warning("plugins", "IWidget is registered by plugins a, b"),
            ],
            success: true,
            ..DiscoveryResult::default()
        };
        let cache = CacheStats {
            requests: 4,
            hits: 3,
            ..CacheStats::default()
        };

        let text = render(&DiscoveryReport::new(&result).with_cache_stats(Some(cache)));

        assert!(text.contains("Discovery complete"));
        assert!(text.contains("IWidget"));
        assert!(text.contains("SystemClock"));
        assert!(text.contains("1 singleton, 1 transient"));
        assert!(text.contains("registered by plugins a, b"));
        assert!(!text.contains("quiet detail"));
        assert!(text.contains("hit rate 75.0%"));
    }
}
