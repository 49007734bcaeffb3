//! Key bindings: crossterm key events to controller actions.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use logmon_core::controller::Action;
use logmon_core::model::{LogLevel, LogSource};

/// Translate a key press. Letters are matched case-insensitively except `G`;
/// source hotkeys are checked after the built-in keys.
pub fn map_key(key: KeyEvent, sources: &[LogSource]) -> Option<Action> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') => Some(Action::Quit),
            _ => None,
        };
    }

    let code = match key.code {
        // `G` keeps its own meaning; every other letter is case-insensitive
        KeyCode::Char('G') => return Some(Action::JumpToEnd),
        KeyCode::Char(c) => KeyCode::Char(c.to_ascii_lowercase()),
        other => other,
    };

    let action = match code {
        KeyCode::Up => Action::ScrollUp,
        KeyCode::Down => Action::ScrollDown,
        KeyCode::PageUp => Action::PageUp,
        KeyCode::PageDown => Action::PageDown,
        KeyCode::End => Action::JumpToEnd,
        KeyCode::Home | KeyCode::Char('g') => Action::JumpToStart,
        KeyCode::Tab => Action::CycleSource,
        KeyCode::Esc | KeyCode::Char('q') => Action::Quit,
        KeyCode::Char('p') => Action::TogglePause,
        KeyCode::Char('c') => Action::Clear,
        KeyCode::Char('a') | KeyCode::Char('0') => Action::ClearFilters,
        KeyCode::Char('l') | KeyCode::Char('y') => Action::Export,
        KeyCode::Char('x') => Action::Reconnect,
        KeyCode::Char(c @ '1'..='5') => {
            let idx = c as usize - '1' as usize;
            Action::FilterLevel(LogLevel::KNOWN[idx])
        }
        KeyCode::Char(c) => {
            let source = sources
                .iter()
                .find(|s| s.key.map(|k| k.to_ascii_lowercase()) == Some(c))?;
            Action::FilterSource(source.id.clone())
        }
        _ => return None,
    };
    Some(action)
}

/// Footer hints as (key, description) pairs
pub fn hints(sources: &[LogSource]) -> Vec<(String, String)> {
    let mut hints = vec![
        ("↑↓".to_string(), "scroll".to_string()),
        ("End".to_string(), "latest".to_string()),
        ("p".to_string(), "pause".to_string()),
        ("c".to_string(), "clear".to_string()),
        ("1-5".to_string(), "level".to_string()),
    ];
    for source in sources {
        if let Some(key) = source.key {
            hints.push((key.to_string(), source.id.clone()));
        }
    }
    hints.extend([
        ("a".to_string(), "all".to_string()),
        ("l".to_string(), "copy".to_string()),
        ("x".to_string(), "reconnect".to_string()),
        ("q".to_string(), "quit".to_string()),
    ]);
    hints
}
