//! Print the variant comparison.
//!
//! Formatting is pure; nothing here touches Docker.

use anyhow::Result;
use colored::Colorize;
use serde_json::Value;
use std::fmt::Write;

use crate::sandbox::SandboxKind;
use crate::selection::SelectionService;
use crate::server::schema::variant_comparison;

fn list(value: &Value) -> Vec<&str> {
    value
        .as_array()
        .map(|items| items.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

/// Format the comparison document for a terminal
pub fn format_comparison(comparison: &Value) -> String {
    let mut out = String::new();

    for kind in SandboxKind::ALL {
        let entry = &comparison[kind.as_str()];
        let _ = writeln!(
            &mut out,
            "\n{} {}",
            entry["name"].as_str().unwrap_or(kind.as_str()).yellow().bold(),
            format!("({kind})").dimmed()
        );
        let _ = writeln!(&mut out, "  {}", entry["description"].as_str().unwrap_or_default());

        for (heading, key, marker) in [
            ("Features", "features", "•".cyan()),
            ("Advantages", "advantages", "+".green()),
            ("Limitations", "limitations", "-".red()),
        ] {
            let _ = writeln!(&mut out, "  {heading}:");
            for item in list(&entry[key]) {
                let _ = writeln!(&mut out, "    {marker} {item}");
            }
        }
    }

    let default = comparison["current_default"].as_str().unwrap_or("unknown");
    let available = comparison["aio_available"].as_bool().unwrap_or(false);
    let _ = writeln!(&mut out, "\n  Default:    {}", default.cyan());
    let _ = writeln!(
        &mut out,
        "  AIO:        {}",
        if available {
            "available".green()
        } else {
            "disabled".red()
        }
    );
    out
}

pub fn run(selection: &SelectionService, json: bool) -> Result<()> {
    let comparison = variant_comparison(selection.default_kind(), selection.is_aio_enabled());

    if json {
        println!("{}", serde_json::to_string_pretty(&comparison)?);
    } else {
        print!("{}", format_comparison(&comparison));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_comparison_lists_both_variants() {
        colored::control::set_override(false);
        let out = format_comparison(&variant_comparison(SandboxKind::Legacy, false));
        assert!(out.contains("Legacy Docker Sandbox (legacy)"));
        assert!(out.contains("AIO Sandbox (aio)"));
        assert!(out.contains("Built-in Jupyter notebook"));
        assert!(out.contains("Default:    legacy"));
        assert!(out.contains("AIO:        disabled"));
    }
}
