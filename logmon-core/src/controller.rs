use std::sync::Arc;

use crate::buffer::BoundedBuffer;
use crate::log_filter::Filter;
use crate::model::{LogLevel, LogRecord, LogSource, SourceId};
use crate::view::ViewEngine;

/// A discrete user intent, produced by the key mapping
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    ScrollUp,
    ScrollDown,
    PageUp,
    PageDown,
    JumpToEnd,
    JumpToStart,
    TogglePause,
    Clear,
    FilterLevel(LogLevel),
    FilterSource(SourceId),
    /// Step through the configured sources, then back to no filter
    CycleSource,
    ClearFilters,
    Export,
    Reconnect,
    Quit,
}

/// What the caller has to do after a transition
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    /// Hand these plain-text lines to the export sink
    Export(Vec<String>),
    /// Ask the subscriber to drop its connection and resubscribe
    Reconnect,
    Quit,
}

/// Interactive state machine driving the view.
///
/// `apply` never blocks: the only side effect outside the view is
/// `BoundedBuffer::clear`, and export/reconnect are returned to the caller.
pub struct Controller {
    buffer: Arc<BoundedBuffer>,
    sources: Vec<LogSource>,
    view: ViewEngine,
}

impl Controller {
    pub fn new(buffer: Arc<BoundedBuffer>, sources: Vec<LogSource>) -> Self {
        Self {
            buffer,
            sources,
            view: ViewEngine::new(),
        }
    }

    pub fn view(&self) -> &ViewEngine {
        &self.view
    }

    pub fn buffer(&self) -> &BoundedBuffer {
        &self.buffer
    }

    pub fn sources(&self) -> &[LogSource] {
        &self.sources
    }

    /// Per-frame refresh: adopt the viewport height and pull new records
    pub fn refresh(&mut self, viewport: usize) -> Vec<Arc<LogRecord>> {
        self.view.set_viewport(viewport);
        self.view.sync(&self.buffer);
        self.view.visible()
    }

    pub fn apply(&mut self, action: Action) -> Outcome {
        match action {
            Action::ScrollUp => self.view.scroll_up(1),
            Action::ScrollDown => self.view.scroll_down(1),
            Action::PageUp => self.view.page_up(),
            Action::PageDown => self.view.page_down(),
            Action::JumpToEnd => self.view.jump_to_end(),
            Action::JumpToStart => self.view.jump_to_start(),
            Action::TogglePause => self.view.toggle_pause(&self.buffer),
            Action::Clear => {
                self.buffer.clear();
                self.view.reset(&self.buffer);
            }
            Action::FilterLevel(level) => self.view.set_filter(Filter::Level(level)),
            Action::FilterSource(id) => self.view.set_filter(Filter::Source(id)),
            Action::CycleSource => {
                let next = self.next_source_filter();
                self.view.set_filter(next);
            }
            Action::ClearFilters => self.view.set_filter(Filter::All),
            Action::Export => {
                self.view.sync(&self.buffer);
                let lines = self.view.visible().iter().map(|r| r.plain_text()).collect();
                return Outcome::Export(lines);
            }
            Action::Reconnect => return Outcome::Reconnect,
            Action::Quit => return Outcome::Quit,
        }
        self.view.sync(&self.buffer);
        Outcome::Continue
    }

    fn next_source_filter(&self) -> Filter {
        let current = self
            .view
            .filter()
            .source()
            .and_then(|id| self.sources.iter().position(|s| s.id == id));

        let next = match current {
            Some(i) => self.sources.get(i + 1),
            None => self.sources.first(),
        };

        match next {
            Some(source) => Filter::Source(source.id.clone()),
            None => Filter::All,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SourceColor;

    fn controller() -> Controller {
        let buffer = Arc::new(BoundedBuffer::new(100));
        let sources = vec![
            LogSource::new("backend", SourceColor::Cyan).with_key('b'),
            LogSource::new("batch", SourceColor::Yellow).with_key('w'),
        ];
        Controller::new(buffer, sources)
    }

    #[test]
    fn test_level_and_source_are_exclusive() {
        let mut ctl = controller();

        ctl.apply(Action::FilterLevel(LogLevel::Error));
        assert_eq!(ctl.view().filter(), &Filter::Level(LogLevel::Error));

        ctl.apply(Action::FilterSource("backend".into()));
        assert_eq!(ctl.view().filter(), &Filter::Source("backend".into()));
        assert_eq!(ctl.view().filter().level(), None);

        ctl.apply(Action::FilterLevel(LogLevel::Error));
        assert_eq!(ctl.view().filter().source(), None);

        ctl.apply(Action::ClearFilters);
        assert_eq!(ctl.view().filter(), &Filter::All);
    }

    #[test]
    fn test_cycle_source() {
        let mut ctl = controller();
        ctl.apply(Action::CycleSource);
        assert_eq!(ctl.view().filter(), &Filter::Source("backend".into()));
        ctl.apply(Action::CycleSource);
        assert_eq!(ctl.view().filter(), &Filter::Source("batch".into()));
        ctl.apply(Action::CycleSource);
        assert_eq!(ctl.view().filter(), &Filter::All);
    }

    #[test]
    fn test_clear_empties_buffer_and_view() {
        let mut ctl = controller();
        ctl.buffer().append(LogRecord::new("backend", LogLevel::Info, "a"));
        assert_eq!(ctl.refresh(10).len(), 1);

        assert_eq!(ctl.apply(Action::Clear), Outcome::Continue);
        assert!(ctl.buffer().is_empty());
        assert!(ctl.refresh(10).is_empty());
    }

    #[test]
    fn test_export_returns_visible_lines() {
        let mut ctl = controller();
        ctl.buffer().append(LogRecord::new("backend", LogLevel::Info, "hello"));
        ctl.buffer().append(LogRecord::new("batch", LogLevel::Error, "boom"));
        ctl.apply(Action::FilterLevel(LogLevel::Error));

        match ctl.apply(Action::Export) {
            Outcome::Export(lines) => assert_eq!(lines, vec!["[batch] ERROR boom"]),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_pause_keeps_ingesting() {
        let mut ctl = controller();
        ctl.buffer().append(LogRecord::new("backend", LogLevel::Info, "a"));
        ctl.refresh(10);

        ctl.apply(Action::TogglePause);
        assert!(ctl.view().is_paused());
        ctl.buffer().append(LogRecord::new("backend", LogLevel::Info, "b"));
        assert_eq!(ctl.refresh(10).len(), 1);
        assert_eq!(ctl.buffer().len(), 2);

        ctl.apply(Action::TogglePause);
        assert_eq!(ctl.refresh(10).len(), 2);
    }

    #[test]
    fn test_quit_and_reconnect_outcomes() {
        let mut ctl = controller();
        assert_eq!(ctl.apply(Action::Reconnect), Outcome::Reconnect);
        assert_eq!(ctl.apply(Action::Quit), Outcome::Quit);
    }

    #[test]
    fn test_scroll_moves_one_line() {
        let buffer = Arc::new(BoundedBuffer::new(100));
        for i in 0..40 {
            buffer.append(LogRecord::new("backend", LogLevel::Info, format!("m{}", i)));
        }
        let mut ctl = Controller::new(buffer, vec![]);
        ctl.refresh(10);
        ctl.apply(Action::ScrollUp);
        assert_eq!(ctl.view().cursor().offset, 1);
        ctl.apply(Action::PageUp);
        assert_eq!(ctl.view().cursor().offset, 10);
        ctl.apply(Action::ScrollDown);
        assert_eq!(ctl.view().cursor().offset, 9);
        ctl.apply(Action::JumpToEnd);
        assert!(ctl.view().is_following());
    }
}
