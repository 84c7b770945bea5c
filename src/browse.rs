// src/browse.rs

use std::{io, sync::Arc};
use crossterm::{
    event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use tokio::sync::mpsc;
//
use crate::{
    app::App,
    navigator::{Fetch, Navigator, Outcome},
    tui::{self, Chrome},
};

const HELP: &str = "open /all | /dashboard/<id> | /public/dashboard/<id> · sort <column> (again to reverse) · \
search [term] · sms <id> texts the TAM · refresh · quit";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Open(String),
    Sort(String),
    Search(String),
    Sms(String),
    Refresh,
    Help,
    Quit,
    Blank,
    Unknown(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        match (word, rest) {
            ("", _) => Command::Blank,
            ("open" | "go", path) if !path.is_empty() => Command::Open(path.to_string()),
            ("sort", key) if !key.is_empty() => Command::Sort(key.to_string()),
            ("search" | "find", term) => Command::Search(term.to_string()),
            ("sms", id) if !id.is_empty() => Command::Sms(id.to_string()),
            ("refresh" | "reload", _) => Command::Refresh,
            ("help" | "?", _) => Command::Help,
            ("quit" | "exit" | "q", _) => Command::Quit,
            _ => Command::Unknown(line.to_string()),
        }
    }
}

/// Command line under the page plus the latest alert.
#[derive(Debug, Default)]
pub struct Prompt {
    input: String,
    status: Option<String>,
}

impl Prompt {
    /// Edits the line; Enter hands back the parsed command.
    pub fn on_key(&mut self, key: KeyEvent) -> Option<Command> {
        if key.kind != KeyEventKind::Press {
            return None;
        }

        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Command::Quit),
            KeyCode::Char(c) => {
                self.input.push(c);
                None
            }
            KeyCode::Backspace => {
                self.input.pop();
                None
            }
            KeyCode::Esc if self.input.is_empty() => Some(Command::Quit),
            KeyCode::Esc => {
                self.input.clear();
                None
            }
            KeyCode::Enter => {
                self.status = None;
                Some(Command::parse(&std::mem::take(&mut self.input)))
            }
            _ => None,
        }
    }

    pub fn alert(&mut self, message: impl Into<String>) {
        self.status = Some(message.into());
    }

    fn chrome(&self, nav: &Navigator) -> Chrome<'_> {
        Chrome {
            location: nav.route().to_string(),
            sort: nav.sort_summary(),
            input: &self.input,
            status: self.status.as_deref(),
        }
    }
}

fn spawn_fetch(app: &Arc<App>, fetch: Option<Fetch>, tx: &mpsc::UnboundedSender<Outcome>) {
    let Some(fetch) = fetch else { return };
    let app = app.clone();
    let tx = tx.clone();

    tokio::spawn(async move {
        let outcome = fetch.run(&app.gateway).await;
        // receiver gone means the browser closed
        let _ = tx.send(outcome);
    });
}

fn spawn_sms(app: &Arc<App>, nav: &Navigator, id: &str, alerts: &mpsc::UnboundedSender<String>) {
    let Some(customer) = nav.customers().and_then(|list| list.iter().find(|c| c.id == id)).cloned() else {
        let _ = alerts.send(format!("No loaded customer with id {:?}. Open /all first.", id));
        return;
    };

    let app = app.clone();
    let alerts = alerts.clone();
    let _ = alerts.send(format!("Sending report link for {}...", id));
    tokio::spawn(async move {
        let message = match app.send_report(&customer).await {
            Ok(message) => message,
            Err(e) => format!("SMS not sent: {}", e),
        };
        let _ = alerts.send(message);
    });
}

/// Interactive dashboard in the alternate screen. Fetches and SMS requests
/// run in the background; the page is redrawn after every event.
pub async fn run(app: Arc<App>, start: &str) -> Result<(), Box<dyn std::error::Error>> {
    enable_raw_mode()?;
    execute!(io::stdout(), EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;

    let result = event_loop(&app, &mut terminal, start).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

async fn event_loop<B: Backend>(
    app: &Arc<App>,
    terminal: &mut Terminal<B>,
    start: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let (fetch_tx, mut fetch_rx) = mpsc::unbounded_channel::<Outcome>();
    let (alert_tx, mut alert_rx) = mpsc::unbounded_channel::<String>();
    let mut events = EventStream::new();

    let mut nav = app.navigator();
    let mut prompt = Prompt::default();
    spawn_fetch(app, nav.navigate(start), &fetch_tx);

    loop {
        terminal.draw(|frame| tui::draw(frame, &nav.screen(), &prompt.chrome(&nav)))?;

        tokio::select! {
            event = events.next() => {
                let Some(event) = event else { break };
                let command = match event? {
                    Event::Key(key) => prompt.on_key(key),
                    _ => None,
                };

                match command {
                    Some(Command::Open(path)) => spawn_fetch(app, nav.navigate(&path), &fetch_tx),
                    Some(Command::Refresh) => {
                        let path = nav.route().to_string();
                        spawn_fetch(app, nav.navigate(&path), &fetch_tx);
                    }
                    Some(Command::Sort(key)) => {
                        if let Err(e) = nav.toggle_sort(&key) {
                            prompt.alert(e.to_string());
                        }
                    }
                    Some(Command::Search(term)) => nav.search(&term),
                    Some(Command::Sms(id)) => spawn_sms(app, &nav, &id, &alert_tx),
                    Some(Command::Help) => prompt.alert(HELP),
                    Some(Command::Unknown(input)) => prompt.alert(format!("unknown command {:?}; type help", input)),
                    Some(Command::Quit) => break,
                    Some(Command::Blank) | None => {}
                }
            }
            Some(outcome) = fetch_rx.recv() => {
                nav.apply(outcome);
            }
            Some(alert) = alert_rx.recv() => prompt.alert(alert),
        }
    }

    Ok(())
}
