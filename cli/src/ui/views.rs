use super::app::App;
use crate::chat::format::to_persian_digits;
use crate::chat::{Sender, Turn};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthStr;

const TOGGLE_LABEL: &str = " 💬 پشتیبانی زیما  [Enter] ";
const DEFAULT_LOADING: &str = "⏳ در حال دریافت اطلاعات...";
const MAX_MENU_HEIGHT: u16 = 10;

pub fn draw(f: &mut Frame, app: &mut App) {
    if app.conversation.open {
        draw_panel(f, app);
    } else {
        let area = f.area();
        draw_toggle(f, area);
    }
}

/// Floating badge in the bottom-right corner.
fn draw_toggle(f: &mut Frame, area: Rect) {
    let width = (TOGGLE_LABEL.width() as u16 + 2).min(area.width);
    let height = 3.min(area.height);
    let badge = Rect {
        x: area.x + area.width.saturating_sub(width + 1),
        y: area.y + area.height.saturating_sub(height + 1),
        width,
        height,
    };

    let hint = Paragraph::new(Line::from(Span::styled(
        " q:Quit ",
        Style::default().fg(Color::DarkGray),
    )));
    f.render_widget(hint, Rect { height: 1, ..area });

    let toggle = Paragraph::new(Line::from(Span::styled(
        TOGGLE_LABEL,
        Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
    )))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Magenta)),
    );
    f.render_widget(Clear, badge);
    f.render_widget(toggle, badge);
}

fn draw_panel(f: &mut Frame, app: &mut App) {
    let menu_height = match app.menu_entries().len() as u16 {
        0 => 0,
        n => (n + 2).min(MAX_MENU_HEIGHT),
    };
    let loading_height = u16::from(app.conversation.pending.is_some());

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),              // Header
            Constraint::Min(3),                 // Transcript
            Constraint::Length(menu_height),    // Inline menu
            Constraint::Length(loading_height), // Loading line
            Constraint::Length(3),              // Input
            Constraint::Length(1),              // Keys
        ])
        .split(f.area());

    draw_header(f, app, chunks[0]);
    draw_transcript(f, app, chunks[1]);
    if menu_height > 0 {
        draw_menu(f, app, chunks[2]);
    }
    if loading_height > 0 {
        draw_loading(f, app, chunks[3]);
    }
    draw_input(f, app, chunks[4]);
    draw_keys(f, chunks[5]);
}

fn draw_header(f: &mut Frame, app: &App, area: Rect) {
    let session = match app.conversation.session_id() {
        Some(id) => format!(" گفتگو {} ", id),
        None => " در حال اتصال... ".to_string(),
    };
    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            "زیما",
            Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled("پشتیبانی آنلاین", Style::default().fg(Color::White)),
    ]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Magenta))
            .title(session),
    );
    f.render_widget(header, area);
}

fn turn_lines(turn: &Turn) -> Vec<Line<'static>> {
    let (name, color, alignment) = match turn.sender {
        Sender::Bot => ("زی", Color::Cyan, Alignment::Left),
        Sender::User => ("شما", Color::Yellow, Alignment::Right),
    };
    let time = to_persian_digits(&turn.at.format("%H:%M").to_string());

    let mut lines = vec![Line::from(vec![
        Span::styled(name, Style::default().fg(color).add_modifier(Modifier::BOLD)),
        Span::raw(" "),
        Span::styled(time, Style::default().fg(Color::DarkGray)),
    ])
    .alignment(alignment)];
    lines.extend(turn.text.lines().map(|l| {
        Line::from(Span::styled(l.to_string(), Style::default().fg(Color::White)))
            .alignment(alignment)
    }));
    lines.push(Line::default());
    lines
}

fn draw_transcript(f: &mut Frame, app: &mut App, area: Rect) {
    let lines: Vec<Line> = app.conversation.transcript.iter().flat_map(turn_lines).collect();

    let inner_width = area.width.saturating_sub(2);
    let inner_height = area.height.saturating_sub(2);
    let transcript = Paragraph::new(lines).wrap(Wrap { trim: false });
    // Counted before the block is attached so borders are not included.
    let rows = u16::try_from(transcript.line_count(inner_width)).unwrap_or(u16::MAX);
    let bottom = rows.saturating_sub(inner_height);
    app.scroll = app.scroll.min(bottom);

    let title = if app.scroll > 0 {
        " گفتگو (PgDn) "
    } else {
        " گفتگو "
    };
    let transcript = transcript
        .block(Block::default().borders(Borders::ALL).title(title))
        .scroll((bottom - app.scroll, 0));
    f.render_widget(transcript, area);
}

fn draw_menu(f: &mut Frame, app: &mut App, area: Rect) {
    let items: Vec<ListItem> = app
        .menu_entries()
        .into_iter()
        .map(|(label, _)| ListItem::new(Line::from(Span::raw(label))))
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow))
                .title(" منو "),
        )
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▶ ");

    f.render_stateful_widget(list, area, &mut app.menu_state);
}

fn draw_loading(f: &mut Frame, app: &App, area: Rect) {
    let text = app
        .conversation
        .pending
        .as_ref()
        .and_then(|p| p.notice.as_deref())
        .and_then(|notice| notice.lines().next())
        .map(|first| format!("⏳ {}", first))
        .unwrap_or_else(|| DEFAULT_LOADING.to_string());
    let loading = Paragraph::new(Line::from(Span::styled(
        text,
        Style::default().fg(Color::Yellow),
    )));
    f.render_widget(loading, area);
}

fn draw_input(f: &mut Frame, app: &App, area: Rect) {
    let placeholder = app.input.is_empty();
    let content = if placeholder {
        Span::styled("پیام خود را بنویسید...", Style::default().fg(Color::DarkGray))
    } else {
        Span::styled(app.input.as_str(), Style::default().fg(Color::White))
    };
    let input = Paragraph::new(Line::from(content)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(" ارسال "),
    );
    f.render_widget(input, area);

    let typed = if placeholder {
        0
    } else {
        u16::try_from(app.input.width()).unwrap_or(u16::MAX)
    };
    let x = area
        .x
        .saturating_add(1)
        .saturating_add(typed)
        .min(area.right().saturating_sub(2));
    f.set_cursor_position((x, area.y + 1));
}

fn draw_keys(f: &mut Frame, area: Rect) {
    let help = Paragraph::new(Line::from(Span::styled(
        " Enter:Send/Pick  ↑/↓:Menu  PgUp/PgDn:Scroll  Esc:Close  Ctrl+C:Quit ",
        Style::default().fg(Color::Cyan),
    )));
    f.render_widget(help, area);
}
