//! Provision a throwaway sandbox and report whether it became ready.

use anyhow::{bail, Result};
use colored::Colorize;

use crate::sandbox::SandboxKind;
use crate::selection::{HealthReport, SelectionService};

/// Format a health report as a displayable string
pub fn format_report(kind: SandboxKind, report: &HealthReport) -> String {
    let verdict = if report.is_healthy {
        format!("{} {} sandbox is healthy", "✓".green(), kind)
    } else {
        format!("{} {} sandbox is unhealthy", "✗".red(), kind)
    };

    let mut out = format!(
        "\n{verdict}\n  Time:       {}\n",
        format!("{:.0}ms", report.response_time_ms).cyan()
    );
    if let Some(message) = &report.error_message {
        out.push_str(&format!("  Error:      {}\n", message.red()));
    }
    out
}

pub async fn run(selection: &SelectionService, kind: Option<SandboxKind>) -> Result<()> {
    let kind = kind.unwrap_or_else(|| selection.default_kind());
    let report = selection.check_health(Some(kind)).await;

    print!("{}", format_report(kind, &report));
    if !report.is_healthy {
        bail!("{kind} sandbox health check failed");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_healthy_report() {
        colored::control::set_override(false);
        let out = format_report(
            SandboxKind::Aio,
            &HealthReport {
                is_healthy: true,
                response_time_ms: 1532.4,
                error_message: None,
            },
        );
        assert!(out.contains("aio sandbox is healthy"));
        assert!(out.contains("1532ms"));
        assert!(!out.contains("Error"));
    }

    #[test]
    fn test_format_unhealthy_report() {
        colored::control::set_override(false);
        let out = format_report(
            SandboxKind::Legacy,
            &HealthReport {
                is_healthy: false,
                response_time_ms: 60000.0,
                error_message: Some("Docker is not available: refused".to_string()),
            },
        );
        assert!(out.contains("legacy sandbox is unhealthy"));
        assert!(out.contains("Error:      Docker is not available: refused"));
    }
}
