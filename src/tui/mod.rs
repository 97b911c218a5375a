pub mod app;
pub mod ui;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing::info;

use crate::access::DirectoryAccessGateway;
use crate::models::MonitorEvent;
use crate::monitor::Monitor;

use app::{App, View};

/// Owns the monitor state; scan workers only talk to it through the channel.
struct Session<'a> {
    app: App,
    monitor: Monitor,
    gateway: &'a dyn DirectoryAccessGateway,
    tx: mpsc::Sender<MonitorEvent>,
}

impl Session<'_> {
    fn request_access(&mut self, requested: Option<&Path>) {
        if let Some((handle, token)) = self.app.state.grant(self.gateway, requested) {
            info!(generation = token.generation(), "starting scan");
            self.app.reset_for_scan();
            // Superseded workers notice through their token; nothing to join.
            let _ = self.monitor.spawn_scan(handle, token, self.tx.clone());
        } else {
            self.app.view = View::Main;
        }
    }
}

pub fn run(
    initial: Option<PathBuf>,
    monitor: Monitor,
    gateway: &dyn DirectoryAccessGateway,
    media_enabled: bool,
) -> Result<()> {
    let (tx, rx) = mpsc::channel::<MonitorEvent>();
    let mut session = Session {
        app: App::new(media_enabled),
        monitor,
        gateway,
        tx,
    };

    if let Some(path) = initial {
        session.request_access(Some(&path));
    }

    // Setup terminal
    enable_raw_mode()?;
    io::stdout().execute(EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)?;

    let result = run_loop(&mut terminal, &mut session, rx);

    // Restore terminal
    disable_raw_mode()?;
    io::stdout().execute(LeaveAlternateScreen)?;

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    session: &mut Session,
    rx: mpsc::Receiver<MonitorEvent>,
) -> Result<()> {
    loop {
        terminal.draw(|frame| ui::render(frame, &mut session.app))?;

        // Drain scan events; stale generations are dropped by the state.
        while let Ok(event) = rx.try_recv() {
            session.app.state.apply(event);
        }
        session.app.clamp_song_offset();

        // Poll for key events
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match session.app.view {
                    View::Main => match key.code {
                        KeyCode::Char('q') => {
                            session.app.should_quit = true;
                        }
                        KeyCode::Char('o') => {
                            session.app.open_prompt();
                        }
                        KeyCode::Char('a') => {
                            session.app.view = View::About;
                        }
                        KeyCode::Char('j') | KeyCode::Down => {
                            session.app.select_next();
                        }
                        KeyCode::Char('k') | KeyCode::Up => {
                            session.app.select_prev();
                        }
                        KeyCode::Char('l') | KeyCode::Right => {
                            session.app.scroll_songs_right();
                        }
                        KeyCode::Char('h') | KeyCode::Left => {
                            session.app.scroll_songs_left();
                        }
                        _ => {}
                    },
                    View::About => match key.code {
                        KeyCode::Esc | KeyCode::Char('q') => {
                            session.app.view = View::Main;
                        }
                        _ => {}
                    },
                    View::Prompt => match key.code {
                        KeyCode::Esc => {
                            session.request_access(None);
                        }
                        KeyCode::Enter => {
                            let requested = session.app.requested_path();
                            session.request_access(requested.as_deref());
                        }
                        KeyCode::Backspace => {
                            session.app.input.pop();
                        }
                        KeyCode::Char(c) => {
                            session.app.input.push(c);
                        }
                        _ => {}
                    },
                }
            }
        }

        if session.app.should_quit {
            break;
        }
    }

    Ok(())
}
