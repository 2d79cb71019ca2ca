use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;
use time::{macros::format_description, OffsetDateTime};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::app::CalendarState;
use crate::calendar::{month_abbreviation, DayRecord};
use crate::entries::JournalEntry;
use crate::persistence::PersistenceStatus;

const HEADER_HEIGHT: u16 = 3;
const STATUS_HEIGHT: u16 = 2;

fn split_screen(area: Rect) -> [Rect; 3] {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(HEADER_HEIGHT),
            Constraint::Min(1),
            Constraint::Length(STATUS_HEIGHT),
        ])
        .split(area);
    [chunks[0], chunks[1], chunks[2]]
}

/// Region the day rows are painted into; its height is the scroll viewport.
pub fn calendar_area(area: Rect) -> Rect {
    split_screen(area)[1]
}

pub fn draw_app(frame: &mut Frame, state: &CalendarState, day_height: u16) {
    let [header, body, status] = split_screen(frame.size());

    let title = Line::from(vec![
        Span::styled(
            state.visible_month().to_string(),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
    ]);
    let header_widget = Paragraph::new(title)
        .block(Block::default().borders(Borders::ALL).title("daybook"));
    frame.render_widget(header_widget, header);

    let lines = build_day_lines(state, body, day_height);
    frame.render_widget(Paragraph::new(lines), body);

    frame.render_widget(Paragraph::new(build_status_line(state)), status);

    if state.is_modal_open() {
        render_entry_modal(frame, state);
    }
}

fn build_day_lines(state: &CalendarState, body: Rect, day_height: u16) -> Vec<Line<'static>> {
    let height = body.height as usize;
    let width = body.width as usize;
    let mut lines = vec![Line::from(""); height];
    let viewport = state.viewport();
    let window = state.window();
    let today = state.today();

    let rows = viewport.rendered_rows(window.len());
    for (index, day) in window.range(rows.start, rows.end) {
        let Some(span) = viewport.span_of(index) else {
            continue;
        };
        let top = span.top.floor() as i64;
        let entries = state.entries_for(&day);
        let focused = state.focus() == Some(day);
        let rendered = render_day(&day, &entries, focused, day == today, width);
        for (offset, line) in rendered.into_iter().take(day_height as usize).enumerate() {
            let y = top + offset as i64;
            if y >= 0 && (y as usize) < height {
                lines[y as usize] = line;
            }
        }
    }
    lines
}

fn render_day(
    day: &DayRecord,
    entries: &[&JournalEntry],
    focused: bool,
    is_today: bool,
    width: usize,
) -> Vec<Line<'static>> {
    let weekday = day
        .to_date()
        .map(|date| date.weekday().to_string().chars().take(3).collect::<String>())
        .unwrap_or_default();
    let mut label_style = if day.is_first_of_month() {
        Style::default().add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    if is_today {
        label_style = label_style.fg(Color::Yellow);
    }
    if focused {
        label_style = label_style.add_modifier(Modifier::REVERSED);
    }
    let label = format!(
        "{:>2} {} {:<3} ",
        day.day(),
        month_abbreviation(day.month()),
        weekday
    );
    let label_width = label.width();

    let mut first = vec![Span::styled(label, label_style)];
    let mut second = vec![Span::raw(" ".repeat(label_width))];
    match entries.split_first() {
        Some((entry, rest)) => {
            let more = if rest.is_empty() {
                String::new()
            } else {
                format!(" +{} more", rest.len())
            };
            let rating = format!("★{:.1} ", entry.rating);
            let room = width.saturating_sub(label_width + rating.width() + more.width());
            first.push(Span::styled(rating, Style::default().fg(Color::Yellow)));
            first.push(Span::raw(truncate_to_width(&entry.description, room)));
            first.push(Span::styled(more, Style::default().fg(Color::Magenta)));
            if !entry.categories.is_empty() {
                let tags = entry.categories.join(", ");
                second.push(Span::styled(
                    truncate_to_width(&tags, width.saturating_sub(label_width)),
                    Style::default().fg(Color::DarkGray),
                ));
            }
        }
        None => {
            if day.is_first_of_month() {
                second.push(Span::styled(
                    "─".repeat(width.saturating_sub(label_width)),
                    Style::default().fg(Color::DarkGray),
                ));
            }
        }
    }
    vec![Line::from(first), Line::from(second)]
}

fn build_status_line(state: &CalendarState) -> Text<'static> {
    let window = state.window();
    let range = match (window.first(), window.last()) {
        (Some(first), Some(last)) => format!("{first} .. {last}"),
        _ => "empty".to_string(),
    };
    let expansions = state.expansions();

    let mut spans = vec![
        Span::raw(format!("Days: {} ", window.len())),
        Span::styled(range, Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(format!(
            " | Loaded: +{} head, +{} tail",
            expansions.head, expansions.tail
        )),
        Span::raw(" | State: "),
    ];
    spans.push(match state.persistence_status() {
        PersistenceStatus::Disabled => {
            Span::styled("off", Style::default().fg(Color::DarkGray))
        }
        PersistenceStatus::Idle {
            last_saved_at: Some(at),
        } => Span::styled(
            format!("saved {}", format_time_short(at)),
            Style::default().fg(Color::Green),
        ),
        PersistenceStatus::Idle { last_saved_at: None } => {
            Span::styled("idle", Style::default().fg(Color::Gray))
        }
        PersistenceStatus::Pending { .. } => Span::styled(
            "pending",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::ITALIC),
        ),
        PersistenceStatus::Error { message, .. } => Span::styled(
            format!("error: {message}"),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ),
    });

    if let Some(message) = state.status_message() {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(
            message.to_string(),
            Style::default().fg(Color::Cyan),
        ));
    }

    let keys = if state.is_modal_open() {
        "h/l previous/next entry • Esc close • q quit"
    } else {
        "j/k day • PgUp/PgDn page • Ctrl-u/d page • Enter open entries • q quit"
    };
    let keys_line = Line::from(vec![
        Span::styled(
            "Keys: ",
            Style::default()
                .fg(Color::Gray)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(keys, Style::default().fg(Color::DarkGray)),
    ]);

    Text::from(vec![Line::from(spans), keys_line])
}

fn render_entry_modal(frame: &mut Frame, state: &CalendarState) {
    let Some((modal, entry)) = state.modal_entry() else {
        return;
    };
    let area = centered_rect(70, 60, frame.size());
    frame.render_widget(Clear, area);

    let title = format!(" Entry {}/{} · {} ", modal.active() + 1, modal.len(), entry.date);
    let mut lines = vec![Line::from(vec![
        Span::styled("Rating: ", Style::default().add_modifier(Modifier::BOLD)),
        Span::styled(
            format!("{:.1} / 5.0", entry.rating),
            Style::default().fg(Color::Yellow),
        ),
    ])];
    if !entry.categories.is_empty() {
        lines.push(Line::from(vec![
            Span::styled("Tags: ", Style::default().add_modifier(Modifier::BOLD)),
            Span::styled(
                entry.categories.join(", "),
                Style::default().fg(Color::Magenta),
            ),
        ]));
    }
    if !entry.img_url.is_empty() {
        lines.push(Line::from(vec![
            Span::styled("Image: ", Style::default().add_modifier(Modifier::BOLD)),
            Span::styled(entry.img_url.clone(), Style::default().fg(Color::Blue)),
        ]));
    }
    lines.push(Line::from(""));
    lines.extend(entry.description.lines().map(|line| Line::from(line.to_string())));

    let widget = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .border_style(Style::default().fg(Color::Cyan)),
        );
    frame.render_widget(widget, area);
}

fn format_time_short(dt: OffsetDateTime) -> String {
    dt.format(&format_description!("[hour]:[minute]:[second]"))
        .unwrap_or_else(|_| dt.unix_timestamp().to_string())
}

/// Cuts `text` to at most `max` display columns, marking the cut with `…`.
fn truncate_to_width(text: &str, max: usize) -> String {
    if text.width() <= max {
        return text.to_string();
    }
    if max == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w + 1 > max {
            break;
        }
        used += w;
        out.push(ch);
    }
    out.push('…');
    out
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Percentage((100 - percent_y) / 2),
                Constraint::Percentage(percent_y),
                Constraint::Percentage((100 - percent_y) / 2),
            ]
            .as_ref(),
        )
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Percentage((100 - percent_x) / 2),
                Constraint::Percentage(percent_x),
                Constraint::Percentage((100 - percent_x) / 2),
            ]
            .as_ref(),
        )
        .split(vertical[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calendar_area_excludes_header_and_status() {
        let area = calendar_area(Rect::new(0, 0, 80, 24));
        assert_eq!(area, Rect::new(0, 3, 80, 19));
    }

    #[test]
    fn truncation_respects_display_width() {
        assert_eq!(truncate_to_width("short", 10), "short");
        assert_eq!(truncate_to_width("a long description", 7), "a long…");
        assert_eq!(truncate_to_width("日本語テキスト", 5), "日本…");
        assert_eq!(truncate_to_width("anything", 0), "");
    }

    #[test]
    fn day_with_entries_shows_overflow_count() {
        let day = DayRecord::new(1, 5, 2024).expect("valid test date");
        let entry = JournalEntry {
            date: "01/06/2024".to_string(),
            img_url: String::new(),
            rating: 4.0,
            categories: vec!["walk".to_string()],
            description: "Morning walk".to_string(),
        };
        let lines = render_day(&day, &[&entry, &entry], false, false, 60);
        let first: String = lines[0].spans.iter().map(|s| s.content.as_ref()).collect();
        assert!(first.starts_with(" 1 Jun Sat"));
        assert!(first.contains("Morning walk"));
        assert!(first.ends_with("+1 more"));
        let second: String = lines[1].spans.iter().map(|s| s.content.as_ref()).collect();
        assert!(second.ends_with("walk"));
    }
}
