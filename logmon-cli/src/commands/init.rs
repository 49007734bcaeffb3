//! `logmon init` command - writes a default logmon.yml

use std::fs;
use std::path::{Path, PathBuf};

use logmon_core::config::{CONFIG_FILE_NAMES, MonitorConfig};

const HEADER: &str = "\
# logmon configuration
#
# Every source subscribes to <channel_prefix><id>. `key` is the hotkey
# that filters the view to that source.
";

/// Run the init command
pub fn run_init(yes: bool) -> Result<(), String> {
    let cwd =
        std::env::current_dir().map_err(|e| format!("Failed to get current directory: {}", e))?;

    let output_path = write_default_config(&cwd, yes)?;

    println!("Created: {}\n", output_path.display());
    println!("Next steps:");
    println!("  1. Review the sources and redis_url in logmon.yml");
    println!("  2. Run `logmon doctor` to check the connection");
    println!("  3. Run `logmon` to start the viewer");

    Ok(())
}

fn write_default_config(dir: &Path, yes: bool) -> Result<PathBuf, String> {
    for name in &CONFIG_FILE_NAMES {
        let path = dir.join(name);
        if path.exists() {
            if !yes {
                return Err(format!(
                    "Config file {} already exists. Use --yes to overwrite.",
                    path.display()
                ));
            }
            println!("Overwriting existing config: {}", path.display());
        }
    }

    let yaml = MonitorConfig::default()
        .to_yaml()
        .map_err(|e| format!("Failed to generate config: {}", e))?;

    let output_path = dir.join(CONFIG_FILE_NAMES[0]);
    fs::write(&output_path, format!("{}\n{}", HEADER, yaml))
        .map_err(|e| format!("Failed to write config: {}", e))?;
    Ok(output_path)
}
