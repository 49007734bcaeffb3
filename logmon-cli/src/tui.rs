use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::{
    event::{self, Event as CEvent, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tokio::sync::mpsc;
use tracing::info;

use logmon_core::buffer::BoundedBuffer;
use logmon_core::controller::{Controller, Outcome};
use logmon_core::model::LogSource;
use logmon_core::subscriber::SubscriberHandle;

use crate::export;
use crate::ui::{keys, render};

const NOTICE_TTL: Duration = Duration::from_secs(3);

/// Transient message shown on the status line
struct Notice {
    text: String,
    shown_at: Instant,
}

impl Notice {
    fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            shown_at: Instant::now(),
        }
    }

    fn expired(&self) -> bool {
        self.shown_at.elapsed() >= NOTICE_TTL
    }
}

// --- Terminal setup/teardown ---
fn setup_terminal() -> io::Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend)
}

fn restore_terminal(mut terminal: Terminal<CrosstermBackend<io::Stdout>>) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Run the viewer until the user quits, then stop the subscriber
pub async fn run(
    buffer: Arc<BoundedBuffer>,
    sources: Vec<LogSource>,
    subscriber: SubscriberHandle,
    refresh_rate: Duration,
) -> io::Result<()> {
    let mut terminal = setup_terminal()?;
    let controller = Controller::new(buffer, sources);

    let result = tui_loop(&mut terminal, controller, &subscriber, refresh_rate).await;
    teardown(result, || restore_terminal(terminal), subscriber).await
}

/// Restore the terminal, then stop the subscriber whether or not the restore
/// worked. A loop error is reported ahead of a restore error.
async fn teardown(
    result: io::Result<()>,
    restore: impl FnOnce() -> io::Result<()>,
    subscriber: SubscriberHandle,
) -> io::Result<()> {
    let restored = restore();
    subscriber.shutdown().await;
    result.and(restored)
}

async fn tui_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    mut controller: Controller,
    subscriber: &SubscriberHandle,
    refresh_rate: Duration,
) -> io::Result<()> {
    let (notice_tx, mut notice_rx) = mpsc::unbounded_channel::<String>();
    let mut notice: Option<Notice> = None;

    loop {
        while let Ok(text) = notice_rx.try_recv() {
            notice = Some(Notice::new(text));
        }
        if notice.as_ref().is_some_and(Notice::expired) {
            notice = None;
        }

        let size = terminal.size()?;
        let records = controller.refresh(render::body_height(size.height));
        let tallies = controller.buffer().tallies();
        let screen = render::Screen {
            connection: subscriber.status().get(),
            attempts: subscriber.status().attempts(),
            view: controller.view(),
            records: &records,
            sources: controller.sources(),
            tallies: &tallies,
            notice: notice.as_ref().map(|n| n.text.as_str()),
        };
        terminal.draw(|f| render::draw(f, &screen))?;

        // Input; the poll timeout doubles as the redraw interval
        if !event::poll(refresh_rate)? {
            continue;
        }
        let CEvent::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        let Some(action) = keys::map_key(key, controller.sources()) else {
            continue;
        };

        match controller.apply(action) {
            Outcome::Continue => {}
            Outcome::Export(lines) => export::spawn_copy(lines, notice_tx.clone()),
            Outcome::Reconnect => {
                subscriber.reconnect();
                notice = Some(Notice::new("Reconnecting..."));
            }
            Outcome::Quit => {
                info!("quit requested");
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logmon_core::model::{ConnectionState, SourceColor};
    use logmon_core::subscriber::{Subscriber, SubscriberSettings};

    use crate::bus::DemoBus;

    fn demo_subscriber() -> SubscriberHandle {
        let buffer = Arc::new(BoundedBuffer::new(10));
        let sources = vec![LogSource::new("backend", SourceColor::Cyan)];
        Subscriber::new(DemoBus::new("logs:"), &sources, buffer, SubscriberSettings::default())
            .spawn()
    }

    #[tokio::test]
    async fn test_teardown_stops_subscriber_when_restore_fails() {
        let subscriber = demo_subscriber();
        let status = subscriber.status().clone();

        let result = teardown(
            Ok(()),
            || Err(io::Error::other("restore failed")),
            subscriber,
        )
        .await;

        assert_eq!(result.unwrap_err().to_string(), "restore failed");
        assert_eq!(status.get(), ConnectionState::Stopped);
    }

    #[tokio::test]
    async fn test_teardown_reports_loop_error_first() {
        let subscriber = demo_subscriber();
        let result = teardown(
            Err(io::Error::other("draw failed")),
            || Err(io::Error::other("restore failed")),
            subscriber,
        )
        .await;

        assert_eq!(result.unwrap_err().to_string(), "draw failed");
    }
}
