use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Wrap};
use ratatui::Frame;

use super::app::{App, View};
use crate::monitor::{FileStatus, Phase};

const ACCENT: Color = Color::Magenta;
const DIM: Color = Color::DarkGray;
const COMPLETE_COLOR: Color = Color::Green;
const ERROR_COLOR: Color = Color::Red;
const PROGRESS_COLOR: Color = Color::Yellow;

const SONG_CARD_WIDTH: u16 = 36;
const SONG_ROW_HEIGHT: u16 = 6;

/// One row per emotion plus borders, clamped to what a terminal can address.
fn emotion_panel_height(count: usize) -> u16 {
    u16::try_from(count.max(1))
        .unwrap_or(u16::MAX)
        .saturating_add(2)
}

pub fn render(frame: &mut Frame, app: &mut App) {
    let error_height = if app.state.error().is_some() { 3 } else { 0 };
    let emotion_height = emotion_panel_height(app.state.emotions().len());
    let songs_height = if app.songs_visible() { SONG_ROW_HEIGHT } else { 0 };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),                // Header
            Constraint::Length(error_height),     // Error banner
            Constraint::Min(4),                   // File table
            Constraint::Length(emotion_height),   // Emotions
            Constraint::Length(songs_height),     // Songs
            Constraint::Length(1),                // Footer
        ])
        .split(frame.area());

    render_header(frame, app, chunks[0]);
    if app.state.error().is_some() {
        render_error(frame, app, chunks[1]);
    }
    render_file_table(frame, app, chunks[2]);
    render_emotions(frame, app, chunks[3]);
    if app.songs_visible() {
        render_songs(frame, app, chunks[4]);
    }
    render_footer(frame, app, chunks[5]);

    // Overlays
    match app.view {
        View::Prompt => render_prompt_overlay(frame, app),
        View::About => render_about_overlay(frame),
        View::Main => {}
    }
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let dir_text = app
        .state
        .directory()
        .map(|d| d.path().display().to_string())
        .unwrap_or_else(|| "none selected".to_string());
    let (phase_text, phase_color) = match app.state.phase() {
        Phase::Idle => ("idle", DIM),
        Phase::Scanning => ("scanning", PROGRESS_COLOR),
        Phase::Settled => ("done", COMPLETE_COLOR),
    };

    let text = vec![Line::from(vec![
        Span::styled("Directory: ", Style::default().fg(DIM)),
        Span::styled(dir_text, Style::default().fg(Color::White).add_modifier(Modifier::BOLD)),
        Span::raw("  "),
        Span::styled("Status: ", Style::default().fg(DIM)),
        Span::styled(phase_text, Style::default().fg(phase_color)),
    ])];

    let block = Block::default()
        .title(Span::styled(
            " ECG Emotion Monitor ",
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(ACCENT));

    frame.render_widget(Paragraph::new(text).block(block), area);
}

fn render_error(frame: &mut Frame, app: &App, area: Rect) {
    let message = app.state.error().unwrap_or_default();
    let paragraph = Paragraph::new(message)
        .style(Style::default().fg(ERROR_COLOR))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(ERROR_COLOR)),
        );
    frame.render_widget(paragraph, area);
}

fn render_file_table(frame: &mut Frame, app: &mut App, area: Rect) {
    // 2 for borders, 1 for header
    let inner_height = area.height.saturating_sub(3) as usize;
    app.visible_rows = inner_height;

    let total = app.state.files().len();
    let title = format!(
        " Files {}/{} ",
        app.state.processed_count(),
        total
    );

    let header = Row::new(vec![
        Cell::from("#").style(Style::default().fg(DIM)),
        Cell::from("File").style(Style::default().fg(DIM)),
        Cell::from("Status").style(Style::default().fg(DIM)),
        Cell::from("").style(Style::default().fg(DIM)),
    ])
    .height(1);

    // Only render the visible slice of files
    let end = (app.scroll_offset + inner_height).min(total);
    let start = app.scroll_offset.min(end);
    let visible_slice = &app.state.files()[start..end];

    let rows: Vec<Row> = visible_slice
        .iter()
        .enumerate()
        .map(|(vi, (file, status))| {
            let actual_index = start + vi;
            let style = if actual_index == app.selected {
                Style::default().bg(Color::DarkGray)
            } else {
                Style::default()
            };
            let (label, mark, color) = match status {
                FileStatus::Pending => ("pending".to_string(), "\u{00b7}", DIM),
                FileStatus::Uploading => ("uploading".to_string(), "\u{27f3}", PROGRESS_COLOR),
                FileStatus::Done => ("done".to_string(), "\u{2713}", COMPLETE_COLOR),
                FileStatus::Failed(msg) => (msg.clone(), "\u{2717}", ERROR_COLOR),
            };
            Row::new(vec![
                Cell::from(format!("{}", actual_index + 1)),
                Cell::from(file.filename()),
                Cell::from(label).style(Style::default().fg(color)),
                Cell::from(mark).style(Style::default().fg(color)),
            ])
            .style(style)
        })
        .collect();

    let widths = [
        Constraint::Length(4),
        Constraint::Min(20),
        Constraint::Percentage(50),
        Constraint::Length(2),
    ];

    let block = Block::default()
        .title(Span::styled(title, Style::default().fg(DIM)))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(ACCENT));

    let table = Table::new(rows, widths).header(header).block(block);
    frame.render_widget(table, area);
}

fn render_emotions(frame: &mut Frame, app: &App, area: Rect) {
    let lines: Vec<Line> = if app.state.emotions().is_empty() {
        vec![Line::from(Span::styled(
            "No emotions detected yet.",
            Style::default().fg(DIM).add_modifier(Modifier::ITALIC),
        ))]
    } else {
        app.state
            .emotions()
            .iter()
            .map(|e| {
                Line::from(Span::styled(
                    e.as_str(),
                    Style::default().fg(COMPLETE_COLOR).add_modifier(Modifier::BOLD),
                ))
            })
            .collect()
    };

    let block = Block::default()
        .title(" Detected Emotions ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(ACCENT));
    frame.render_widget(
        Paragraph::new(lines).alignment(Alignment::Center).block(block),
        area,
    );
}

/// Horizontal row of media preview cards, one per recommended URL.
fn render_songs(frame: &mut Frame, app: &App, area: Rect) {
    let outer = Block::default()
        .title(" Recommended Songs ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(ACCENT));
    let inner = outer.inner(area);
    frame.render_widget(outer, area);

    let capacity = (inner.width / SONG_CARD_WIDTH).max(1) as usize;
    let songs = app.state.songs();
    let end = (app.song_offset + capacity).min(songs.len());
    let start = app.song_offset.min(end);

    let cards = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(vec![Constraint::Length(SONG_CARD_WIDTH); capacity])
        .split(inner);

    for (slot, (index, url)) in songs[start..end].iter().enumerate().map(|(i, u)| (start + i, u)).enumerate() {
        let card = Block::default()
            .title(format!(" {}/{} ", index + 1, songs.len()))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(DIM));
        let paragraph = Paragraph::new(url.as_str())
            .wrap(Wrap { trim: true })
            .block(card);
        frame.render_widget(paragraph, cards[slot]);
    }
}

fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
    let keys = match app.view {
        View::Main if app.songs_visible() => "[o]pen directory  [h/l] songs  [a]bout  [q]uit",
        View::Main => "[o]pen directory  [a]bout  [q]uit",
        View::Prompt => "[Enter] grant  [Esc] deny",
        View::About => "[Esc] close",
    };
    let footer = Paragraph::new(keys)
        .style(Style::default().fg(DIM))
        .alignment(Alignment::Center);
    frame.render_widget(footer, area);
}

fn render_prompt_overlay(frame: &mut Frame, app: &App) {
    let area = centered_rect(60, 8, frame.area());
    frame.render_widget(Clear, area);

    let text = vec![
        Line::from(Span::styled(
            "Select ECG Directory",
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("> ", Style::default().fg(DIM)),
            Span::styled(app.input.as_str(), Style::default().fg(Color::White)),
            Span::styled("\u{2588}", Style::default().fg(ACCENT)),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "[Enter] grant access  [Esc] deny",
            Style::default().fg(DIM),
        )),
    ];

    let block = Block::default()
        .title(" Directory Access ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(ACCENT));

    frame.render_widget(Paragraph::new(text).block(block), area);
}

fn render_about_overlay(frame: &mut Frame) {
    let area = centered_rect(48, 10, frame.area());
    frame.render_widget(Clear, area);

    let text = vec![
        Line::from(Span::styled(
            "ECG Emotion Monitor",
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(format!("Version {}", env!("CARGO_PKG_VERSION"))),
        Line::from(""),
        Line::from("Uploads ECG recordings (CSV) to an"),
        Line::from("inference server and shows detected emotions."),
        Line::from(""),
        Line::from(Span::styled("[Esc] close", Style::default().fg(DIM))),
    ];

    let block = Block::default()
        .title(" About ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(ACCENT));

    let paragraph = Paragraph::new(text)
        .alignment(Alignment::Center)
        .block(block);
    frame.render_widget(paragraph, area);
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    Rect::new(x, y, width.min(area.width), height.min(area.height))
}
