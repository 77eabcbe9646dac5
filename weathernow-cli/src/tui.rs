use std::{
    io::{self, Stdout},
    sync::Arc,
    thread,
    time::Duration,
};

use anyhow::Context;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Wrap},
};
use tokio::sync::mpsc;
use weathernow_core::{
    Config, Geolocator, RequestState, Session, SessionHandle, SessionSettings, View,
    WeatherRecord, WeatherSource, location::geolocator_from_config,
    provider::source_from_config,
};

use crate::card;

const PLACEHOLDER: &str = "Search city (e.g. London)";

type Term = Terminal<CrosstermBackend<Stdout>>;

/// What a key press asks the session to do.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Action {
    Edited,
    Clear,
    UseLocation,
    Quit,
    Ignore,
}

pub async fn run(config: Config) -> anyhow::Result<()> {
    let source: Arc<dyn WeatherSource> = Arc::from(source_from_config(&config)?);
    let locator: Arc<dyn Geolocator> = Arc::from(geolocator_from_config(&config)?);
    let session = Session::spawn(source, locator, SessionSettings::from_config(&config));
    tracing::info!("interactive session started");

    let mut terminal = enter().context("Failed to set up the terminal")?;
    let result = event_loop(&mut terminal, &session, &config).await;
    leave(&mut terminal).context("Failed to restore the terminal")?;

    session.shutdown().await;
    result
}

fn enter() -> io::Result<Term> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    Terminal::new(CrosstermBackend::new(stdout))
}

fn leave(terminal: &mut Term) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()
}

/// Forward key presses and resizes from a blocking reader thread.
///
/// The thread notices the receiver is gone within one poll interval.
fn spawn_input_reader(tx: mpsc::Sender<Event>) {
    thread::spawn(move || {
        while !tx.is_closed() {
            match event::poll(Duration::from_millis(100)) {
                Ok(false) => {}
                Ok(true) => match event::read() {
                    Ok(ev @ Event::Key(KeyEvent {
                        kind: KeyEventKind::Press,
                        ..
                    }))
                    | Ok(ev @ Event::Resize(..)) => {
                        if tx.blocking_send(ev).is_err() {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(err) => {
                        tracing::error!(error = %err, "terminal read failed");
                        break;
                    }
                },
                Err(err) => {
                    tracing::error!(error = %err, "terminal poll failed");
                    break;
                }
            }
        }
    });
}

async fn event_loop(
    terminal: &mut Term,
    session: &SessionHandle,
    config: &Config,
) -> anyhow::Result<()> {
    let (tx, mut events) = mpsc::channel(32);
    spawn_input_reader(tx);

    let mut views = session.subscribe();
    let mut view = session.view();
    let mut query = String::new();

    loop {
        terminal.draw(|frame| draw(frame, &view, &query, config))?;

        tokio::select! {
            changed = views.changed() => {
                if changed.is_err() {
                    break;
                }
                view = views.borrow_and_update().clone();
            }
            event = events.recv() => match event {
                Some(Event::Key(key)) => match apply_key(&mut query, key) {
                    Action::Edited => session.input(query.clone()).await?,
                    Action::Clear => session.clear().await?,
                    Action::UseLocation => session.use_location().await?,
                    Action::Quit => break,
                    Action::Ignore => {}
                },
                // Resize: redraw on the next turn.
                Some(_) => {}
                None => break,
            },
        }
    }

    Ok(())
}

fn apply_key(query: &mut String, key: KeyEvent) -> Action {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('c') | KeyCode::Char('q') if ctrl => Action::Quit,
        KeyCode::Char('l') if ctrl => Action::UseLocation,
        KeyCode::Esc => {
            query.clear();
            Action::Clear
        }
        KeyCode::Backspace => match query.pop() {
            Some(_) => Action::Edited,
            None => Action::Ignore,
        },
        KeyCode::Char(c) if !ctrl => {
            query.push(c);
            Action::Edited
        }
        _ => Action::Ignore,
    }
}

fn panel(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::Cyan))
        .title(Span::styled(title, Style::default().fg(Color::Yellow)))
        .title_alignment(Alignment::Left)
}

fn draw(frame: &mut Frame, view: &View, query: &str, config: &Config) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Length(3),
            Constraint::Min(6),
            Constraint::Length(1),
        ])
        .split(frame.area());

    let header = Paragraph::new(vec![
        Line::from(Span::styled(
            " Weather Now",
            Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(" Real-time weather at your fingertips"),
    ])
    .block(panel(""));
    frame.render_widget(header, chunks[0]);

    draw_search(frame, chunks[1], query);
    draw_state(frame, chunks[2], view, &config.endpoints.icon_url);

    let footer = Paragraph::new(format!(
        " Data updates every {} seconds · Esc clear · Ctrl-L use my location · Ctrl-C quit",
        config.timing.refresh_period().as_secs()
    ))
    .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(footer, chunks[3]);
}

fn draw_search(frame: &mut Frame, area: Rect, query: &str) {
    let text = if query.is_empty() {
        Span::styled(PLACEHOLDER, Style::default().fg(Color::DarkGray))
    } else {
        Span::raw(query)
    };
    frame.render_widget(Paragraph::new(Line::from(text)).block(panel(" Search ")), area);

    let width = query.chars().count() as u16;
    let x = (area.x + 1 + width).min(area.right().saturating_sub(2));
    frame.set_cursor_position((x, area.y + 1));
}

fn draw_state(frame: &mut Frame, area: Rect, view: &View, icon_base: &str) {
    let (title, lines) = match view.state() {
        RequestState::Loading => {
            let mut lines = vec![Line::from(Span::styled(
                " Loading weather data…",
                Style::default().fg(Color::Blue),
            ))];
            // A location failure can land while a fetch is still in flight.
            lines.extend(view.error.as_deref().map(error_line));
            (" Loading ", lines)
        }
        RequestState::Error(message) => (" Error ", vec![error_line(&message)]),
        RequestState::Success(record) => (" Current Conditions ", card_lines(&record, icon_base)),
        RequestState::Idle => (
            " Weather ",
            vec![Line::from(vec![
                Span::raw(" Try searching a city or press "),
                Span::styled("Ctrl-L", Style::default().fg(Color::Blue)),
                Span::raw(" to use your location."),
            ])],
        ),
    };

    let body = Paragraph::new(lines)
        .block(panel(title))
        .wrap(Wrap { trim: false });
    frame.render_widget(body, area);
}

fn error_line(message: &str) -> Line<'static> {
    Line::from(Span::styled(
        format!(" ⚠ {message}"),
        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
    ))
}

fn card_lines(record: &WeatherRecord, icon_base: &str) -> Vec<Line<'static>> {
    let value = Style::default().fg(Color::Green);

    let mut lines = vec![
        Line::from(""),
        Line::from(vec![
            Span::raw(" "),
            Span::styled(
                card::temp(record.temp),
                Style::default()
                    .fg(Color::Blue)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
            Span::styled(card::conditions(record), value),
        ]),
        Line::from(""),
    ];
    lines.extend(card::rows(record, icon_base).into_iter().map(|(label, text)| {
        Line::from(vec![
            Span::raw(format!(" {label:<12}")),
            Span::styled(text, value),
        ])
    }));
    lines
}
