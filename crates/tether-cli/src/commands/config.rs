//! `tether config show` -- the effective configuration and its sources.

use std::process::ExitCode;

use tether_types::config_loader::flatten_config;
use tether_types::EffectiveConfig;

/// Print every setting with the layer it came from. Secrets are masked.
pub fn show(effective: &EffectiveConfig) -> anyhow::Result<ExitCode> {
    let entries = flatten_config(&effective.config)?;
    let width = entries.iter().map(|(k, _)| k.len()).max().unwrap_or(0);

    if effective.source_files.is_empty() {
        println!("Config files: none");
    } else {
        println!("Config files:");
        for file in &effective.source_files {
            println!("  {}", file.display());
        }
    }
    println!();
    for (key, value) in entries {
        println!(
            "{key:<width$}  {value:<24}  ({})",
            effective.source_of(&key)
        );
    }
    Ok(ExitCode::SUCCESS)
}
