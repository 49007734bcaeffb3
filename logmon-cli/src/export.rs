//! Clipboard export of the visible log lines.

use std::io;
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Tried in order; the first one that runs successfully wins
pub const CLIPBOARD_TOOLS: &[(&str, &[&str])] = &[
    ("pbcopy", &[]),
    ("wl-copy", &[]),
    ("xclip", &["-selection", "clipboard"]),
    ("xsel", &["--clipboard", "--input"]),
    ("clip", &[]),
];

/// Copy in the background and report the result as a status notice
pub fn spawn_copy(lines: Vec<String>, notices: mpsc::UnboundedSender<String>) {
    if lines.is_empty() {
        let _ = notices.send("Nothing to copy".to_string());
        return;
    }

    tokio::spawn(async move {
        let text = lines.join("\n");
        let notice = match copy_to_clipboard(&text).await {
            Ok(tool) => {
                info!(lines = lines.len(), tool, "copied to clipboard");
                format!("Copied {} lines", lines.len())
            }
            Err(e) => format!("Copy failed: {}", e),
        };
        let _ = notices.send(notice);
    });
}

pub async fn copy_to_clipboard(text: &str) -> io::Result<&'static str> {
    for (tool, args) in CLIPBOARD_TOOLS {
        match pipe_into(tool, args, text).await {
            Ok(()) => return Ok(tool),
            Err(e) => debug!(tool, error = %e, "clipboard tool unavailable"),
        }
    }
    Err(io::Error::new(
        io::ErrorKind::NotFound,
        "no clipboard tool found (pbcopy, wl-copy, xclip, xsel, clip)",
    ))
}

async fn pipe_into(program: &str, args: &[&str], text: &str) -> io::Result<()> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(text.as_bytes()).await?;
    }

    let status = child.wait().await?;
    if status.success() {
        Ok(())
    } else {
        Err(io::Error::other(format!("{} exited with {}", program, status)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_tool_is_not_found() {
        let err = pipe_into("logmon-no-such-clipboard-tool", &[], "x")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_pipe_into_reports_exit_status() {
        assert!(pipe_into("cat", &[], "hello\n").await.is_ok());
        assert!(pipe_into("false", &[], "").await.is_err());
    }

    #[tokio::test]
    async fn test_empty_export_reports_immediately() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        spawn_copy(Vec::new(), tx);
        assert_eq!(rx.recv().await.as_deref(), Some("Nothing to copy"));
    }
}
