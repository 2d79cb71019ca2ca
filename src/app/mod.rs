use std::io::Stdout;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use crate::calendar::DayRecord;
use crate::config::AppConfig;
use crate::persistence::{PersistenceAdapter, PersistenceEvent};
use crate::scheduler::{Clock, MonotonicClock};
use crate::storage::StorageHandle;
use crate::ui;

mod modal;
pub mod state;

pub use modal::ModalState;
pub use state::{CalendarState, ExpansionStats};

const WHEEL_ROWS: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Quit,
    ScrollDays(i32),
    ScrollPages(i32),
    OpenEntry,
    ModalNext,
    ModalPrevious,
    CloseModal,
}

pub struct App {
    pub config: Arc<AppConfig>,
    pub storage: StorageHandle,
    state: CalendarState,
    clock: Rc<MonotonicClock>,
    should_quit: bool,
    tick_rate: Duration,
}

impl App {
    pub fn new(config: Arc<AppConfig>, storage: StorageHandle) -> Result<Self> {
        let entries = storage
            .fetch_entries()
            .context("loading journal entries for initial state")?;
        let persistence = PersistenceAdapter::new(Box::new(storage.clone()), &config.persistence);
        let clock = Rc::new(MonotonicClock::new());
        let state = CalendarState::new(
            config.calendar.clone(),
            persistence,
            config.persistence.restore_delay(),
            entries,
            clock.clone(),
            DayRecord::today(),
        );
        let tick_rate = config.tick_rate();
        Ok(Self {
            config,
            storage,
            state,
            clock,
            should_quit: false,
            tick_rate,
        })
    }

    pub fn run(&mut self) -> Result<()> {
        let mut terminal = setup_terminal()?;
        let result = self.event_loop(&mut terminal);
        self.shutdown();
        restore_terminal(&mut terminal)?;
        result
    }

    pub fn state(&self) -> &CalendarState {
        &self.state
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let mut last_tick = Instant::now();
        loop {
            let size = terminal.size().context("reading terminal size")?;
            let body = ui::calendar_area(size);
            self.state.on_layout(
                f64::from(body.height),
                f64::from(self.config.calendar.day_height),
            );
            // deferred corrections land before the frame is painted
            self.run_due_work();

            terminal
                .draw(|frame| ui::draw_app(frame, &self.state, self.config.calendar.day_height))
                .context("rendering frame")?;

            if self.should_quit {
                break;
            }

            let timeout = self.poll_timeout(last_tick.elapsed());
            if event::poll(timeout).context("polling for terminal events")? {
                match event::read().context("reading terminal event")? {
                    Event::Key(key) => self.handle_key(key),
                    Event::Mouse(mouse) => self.handle_mouse(mouse),
                    Event::Resize(_, _) => {
                        // picked up by the next on_layout
                    }
                    _ => {}
                }
            }

            if last_tick.elapsed() >= self.tick_rate {
                self.on_tick();
                last_tick = Instant::now();
            }
        }
        Ok(())
    }

    fn poll_timeout(&self, since_tick: Duration) -> Duration {
        let tick = self
            .tick_rate
            .checked_sub(since_tick)
            .unwrap_or(Duration::ZERO);
        match self.state.next_wakeup() {
            Some(due) => tick.min(due.saturating_sub(self.clock.now())),
            None => tick,
        }
    }

    fn run_due_work(&mut self) {
        if let Some(event) = self.state.tick() {
            log_persistence_event(&event);
        }
    }

    /// Housekeeping paced by `tick_rate` rather than by every frame.
    fn on_tick(&mut self) {
        self.state.set_today(DayRecord::today());
    }

    fn shutdown(&mut self) {
        if let Some(event) = self.state.shutdown() {
            log_persistence_event(&event);
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if let Some(action) = action_for(key, self.state.is_modal_open()) {
            self.handle_action(action);
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        if self.state.is_modal_open() {
            return;
        }
        match mouse.kind {
            MouseEventKind::ScrollDown => self.state.scroll_by(WHEEL_ROWS),
            MouseEventKind::ScrollUp => self.state.scroll_by(-WHEEL_ROWS),
            _ => {}
        }
    }

    fn handle_action(&mut self, action: Action) {
        match action {
            Action::Quit => self.should_quit = true,
            Action::ScrollDays(days) => {
                self.state.set_status_message(None::<String>);
                self.state.scroll_rows(days);
            }
            Action::ScrollPages(pages) => self.state.scroll_pages(pages),
            Action::OpenEntry => {
                if self.state.open_focused_entry() {
                    tracing::debug!(focus = ?self.state.focus(), "opened entry detail");
                }
            }
            Action::ModalNext => {
                self.state.modal_step(1);
            }
            Action::ModalPrevious => {
                self.state.modal_step(-1);
            }
            Action::CloseModal => self.state.close_modal(),
        }
    }
}

fn action_for(key: KeyEvent, modal_open: bool) -> Option<Action> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('c') if ctrl => return Some(Action::Quit),
        KeyCode::Char('q') => return Some(Action::Quit),
        _ => {}
    }
    if modal_open {
        return match key.code {
            KeyCode::Esc => Some(Action::CloseModal),
            KeyCode::Char('l') | KeyCode::Right => Some(Action::ModalNext),
            KeyCode::Char('h') | KeyCode::Left => Some(Action::ModalPrevious),
            _ => None,
        };
    }
    match key.code {
        KeyCode::Char('d') if ctrl => Some(Action::ScrollPages(1)),
        KeyCode::Char('u') if ctrl => Some(Action::ScrollPages(-1)),
        KeyCode::Char('j') | KeyCode::Down => Some(Action::ScrollDays(1)),
        KeyCode::Char('k') | KeyCode::Up => Some(Action::ScrollDays(-1)),
        KeyCode::PageDown => Some(Action::ScrollPages(1)),
        KeyCode::PageUp => Some(Action::ScrollPages(-1)),
        KeyCode::Enter => Some(Action::OpenEntry),
        _ => None,
    }
}

fn log_persistence_event(event: &PersistenceEvent) {
    match event {
        PersistenceEvent::Saved { record, timestamp } => {
            tracing::trace!(?record, %timestamp, "view state saved");
        }
        PersistenceEvent::Error { message } => {
            tracing::error!(%message, "view state save failed");
        }
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("enabling raw mode")?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .context("switching to alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("creating terminal backend")?;
    terminal.hide_cursor().context("hiding cursor")?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    terminal.show_cursor().ok();
    disable_raw_mode().context("disabling raw mode")?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )
    .context("restoring screen state")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(ch: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(ch), KeyModifiers::CONTROL)
    }

    #[test]
    fn calendar_keys_scroll_and_open() {
        assert_eq!(action_for(press(KeyCode::Char('j')), false), Some(Action::ScrollDays(1)));
        assert_eq!(action_for(press(KeyCode::Up), false), Some(Action::ScrollDays(-1)));
        assert_eq!(action_for(press(KeyCode::PageDown), false), Some(Action::ScrollPages(1)));
        assert_eq!(action_for(ctrl('u'), false), Some(Action::ScrollPages(-1)));
        assert_eq!(action_for(press(KeyCode::Enter), false), Some(Action::OpenEntry));
        assert_eq!(action_for(press(KeyCode::Char('l')), false), None);
    }

    #[test]
    fn modal_captures_navigation_keys() {
        assert_eq!(action_for(press(KeyCode::Right), true), Some(Action::ModalNext));
        assert_eq!(action_for(press(KeyCode::Char('h')), true), Some(Action::ModalPrevious));
        assert_eq!(action_for(press(KeyCode::Esc), true), Some(Action::CloseModal));
        assert_eq!(action_for(press(KeyCode::Char('j')), true), None);
    }

    #[test]
    fn quit_works_everywhere() {
        assert_eq!(action_for(press(KeyCode::Char('q')), true), Some(Action::Quit));
        assert_eq!(action_for(ctrl('c'), false), Some(Action::Quit));
    }
}
