use std::path::Path;

use {
    anyhow::Result,
    relay_config::{RelayConfig, Severity, ValidationResult},
};

/// ANSI color codes.
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

pub fn check(config: &RelayConfig, explicit: Option<&Path>) -> Result<()> {
    let result = relay_config::validate(config);
    report(&result, explicit);

    if result.has_errors() {
        std::process::exit(1);
    }
    Ok(())
}

/// Print diagnostics to stderr.
pub fn report(result: &ValidationResult, explicit: Option<&Path>) {
    match explicit.map(Path::to_path_buf).or_else(relay_config::find_config_file) {
        Some(path) => eprintln!("Checking {}\n", path.display()),
        None => eprintln!("No config file found; checking defaults.\n"),
    }

    for d in &result.diagnostics {
        let color = match d.severity {
            Severity::Error => RED,
            Severity::Warning => YELLOW,
        };
        eprintln!("  {BOLD}{color}{}{RESET} {}: {}", d.severity, d.path, d.message);
    }

    let errors = result.count(Severity::Error);
    let warnings = result.count(Severity::Warning);

    if !result.diagnostics.is_empty() {
        eprintln!();
    }

    if errors == 0 && warnings == 0 {
        eprintln!("No issues found.");
    } else {
        eprintln!("{errors} error(s), {warnings} warning(s)");
    }
}
