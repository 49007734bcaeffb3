use std::sync::Arc;

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use logmon_core::buffer::SourceTally;
use logmon_core::model::{ConnectionState, LogRecord, LogSource, SourceId};
use logmon_core::present::{format_record, stats_line, status_line};
use logmon_core::view::ViewEngine;

use super::keys;
use super::theme::styles;

const HEADER_HEIGHT: u16 = 2;
const FOOTER_HEIGHT: u16 = 1;
const BODY_BORDERS: u16 = 2;

/// Everything one frame shows
pub struct Screen<'a> {
    pub connection: ConnectionState,
    /// Connection attempts so far, shown while retrying
    pub attempts: u64,
    pub view: &'a ViewEngine,
    pub records: &'a [Arc<LogRecord>],
    pub sources: &'a [LogSource],
    pub tallies: &'a [(SourceId, SourceTally)],
    pub notice: Option<&'a str>,
}

/// Log lines that fit in a terminal of the given height
pub fn body_height(terminal_height: u16) -> usize {
    terminal_height.saturating_sub(HEADER_HEIGHT + FOOTER_HEIGHT + BODY_BORDERS) as usize
}

pub fn draw(f: &mut Frame, screen: &Screen) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(HEADER_HEIGHT),
            Constraint::Min(BODY_BORDERS),
            Constraint::Length(FOOTER_HEIGHT),
        ])
        .split(f.area());

    // --- Header: status and per-source counts ---
    let frozen = screen.view.is_paused() || !screen.view.is_following();
    let mut status = vec![
        Span::styled(" logmon ", styles::title()),
        Span::styled(
            status_line(screen.connection, screen.attempts, screen.view),
            styles::status(screen.connection, frozen),
        ),
    ];
    if let Some(notice) = screen.notice {
        status.push(Span::styled(format!(" | {}", notice), styles::accent()));
    }
    let header = vec![
        Line::from(status),
        Line::from(Span::styled(
            format!(" {}", stats_line(screen.tallies)),
            styles::text_dim(),
        )),
    ];
    f.render_widget(Paragraph::new(header), chunks[0]);

    // --- Body: the visible window ---
    let lines: Vec<Line> = screen
        .records
        .iter()
        .map(|record| {
            let display = format_record(record, screen.sources);
            Line::from(
                display
                    .segments
                    .into_iter()
                    .map(|seg| Span::styled(seg.text, styles::tone(seg.tone)))
                    .collect::<Vec<_>>(),
            )
        })
        .collect();

    let title = format!(
        " {} of {} lines ",
        screen.records.len(),
        screen.view.matching_len()
    );
    let body = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(styles::border_subtle())
            .title(Span::styled(title, styles::text_muted())),
    );
    f.render_widget(body, chunks[1]);

    // --- Footer: key hints ---
    let mut hints = Vec::new();
    for (key, desc) in keys::hints(screen.sources) {
        hints.push(Span::styled(format!(" {}", key), styles::key_hint()));
        hints.push(Span::styled(format!(" {} ", desc), styles::text_muted()));
    }
    f.render_widget(Paragraph::new(Line::from(hints)), chunks[2]);
}
