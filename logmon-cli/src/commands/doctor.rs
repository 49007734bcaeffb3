use std::path::PathBuf;
use std::time::Duration;

use logmon_core::bus::Bus;
use logmon_core::config::{ConfigError, MonitorConfig};

use crate::bus::RedisBus;
use crate::export::CLIPBOARD_TOOLS;

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(8);

#[derive(Debug)]
pub struct Check {
    pub name: String,
    pub passed: bool,
    pub message: String,
    pub hint: Option<String>,
}

impl Check {
    fn ok(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: true,
            message: message.into(),
            hint: None,
        }
    }

    fn fail(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: false,
            message: message.into(),
            hint: None,
        }
    }

    fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Check config, Redis reachability and clipboard support
pub async fn run_doctor(
    loaded: Result<(Option<PathBuf>, MonitorConfig), ConfigError>,
) -> Result<(), String> {
    println!("logmon doctor\n");

    let mut checks: Vec<Check> = Vec::new();

    let config = match loaded {
        Ok((path, config)) => {
            let origin = path
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "built-in defaults".to_string());
            checks.push(Check::ok(
                "config",
                format!("{} ({} sources)", origin, config.sources.len()),
            ));
            Some(config)
        }
        Err(e) => {
            checks.push(
                Check::fail("config", e.to_string())
                    .with_hint("Run `logmon init --yes` to write a fresh logmon.yml"),
            );
            None
        }
    };

    if let Some(config) = &config {
        checks.extend(check_redis(config).await);
    }
    checks.push(check_clipboard());

    for check in &checks {
        print_check(check);
    }
    println!();

    let failed: Vec<_> = checks.iter().filter(|c| !c.passed).collect();
    if failed.is_empty() {
        println!("All checks passed!");
        Ok(())
    } else {
        Err(format!("{} check(s) failed", failed.len()))
    }
}

async fn check_redis(config: &MonitorConfig) -> Vec<Check> {
    let mut checks = Vec::new();

    let mut bus = match RedisBus::open(&config.redis_url) {
        Ok(bus) => {
            checks.push(Check::ok("redis url", config.redis_url.clone()));
            bus
        }
        Err(e) => {
            checks.push(
                Check::fail("redis url", e.to_string())
                    .with_hint("Expected redis://[:password@]host[:port][/db]"),
            );
            return checks;
        }
    };

    match bus.resolve_endpoint().await {
        Ok(addr) => checks.push(Check::ok("endpoint", addr)),
        Err(e) => {
            checks.push(Check::fail("endpoint", e.to_string()));
            return checks;
        }
    }

    let channels = config.channels();
    let check = match tokio::time::timeout(HANDSHAKE_TIMEOUT, bus.subscribe(&channels)).await {
        Ok(Ok(_stream)) => Check::ok("subscribe", channels.join(", ")),
        Ok(Err(e)) => {
            Check::fail("subscribe", e.to_string()).with_hint("Is redis-server running?")
        }
        Err(_) => Check::fail(
            "subscribe",
            format!("no answer within {}s", HANDSHAKE_TIMEOUT.as_secs()),
        ),
    };
    checks.push(check);
    checks
}

fn check_clipboard() -> Check {
    let path = std::env::var_os("PATH").unwrap_or_default();
    let dirs: Vec<PathBuf> = std::env::split_paths(&path).collect();

    let tools: Vec<&'static str> = CLIPBOARD_TOOLS.iter().map(|(tool, _)| *tool).collect();

    match find_tool(&dirs, &tools) {
        Some(tool) => Check::ok("clipboard", tool),
        None => Check::fail("clipboard", "no clipboard tool found")
            .with_hint("Install wl-clipboard, xclip or xsel to use the copy key"),
    }
}

fn find_tool(dirs: &[PathBuf], tools: &[&'static str]) -> Option<&'static str> {
    tools.iter().copied().find(|tool| {
        dirs.iter().any(|dir| {
            dir.join(tool).is_file() || dir.join(format!("{}.exe", tool)).is_file()
        })
    })
}

fn print_check(check: &Check) {
    let icon = if check.passed { "✓" } else { "✗" };
    let color = if check.passed { "\x1b[32m" } else { "\x1b[31m" };
    let reset = "\x1b[0m";

    println!(
        "  {}{}{} {}: {}",
        color, icon, reset, check.name, check.message
    );

    if let Some(hint) = &check.hint {
        println!("    └─ {}", hint);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_tool_respects_order() {
        let dir = std::env::temp_dir().join(format!("logmon-doctor-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("xsel"), "").unwrap();
        std::fs::write(dir.join("xclip"), "").unwrap();

        let tools = ["pbcopy", "wl-copy", "xclip", "xsel"];
        let found = find_tool(std::slice::from_ref(&dir), &tools);
        assert_eq!(found, Some("xclip"));
        assert_eq!(find_tool(&[], &tools), None);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_bad_config_fails() {
        let err = ConfigError::NoSources;
        assert!(run_doctor(Err(err)).await.is_err());
    }
}
