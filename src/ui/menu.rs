//! Library menu view
//!
//! Title bar with breadcrumb, the current level's list, and a status line
//! with key hints.

use ratatui::{
    prelude::*,
    widgets::{Block, BorderType, Borders, List, ListItem, Paragraph},
};

use crate::app::App;
use crate::ui::Theme;

/// Draw the whole menu and report the list height back to the app
pub fn render(frame: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(frame.area());

    frame.render_widget(Block::default().style(Theme::text()), frame.area());
    render_title(frame, chunks[0], app);

    // Borders take two rows
    app.set_viewport(chunks[1].height.saturating_sub(2) as usize);
    render_list(frame, chunks[1], app);
    render_status(frame, chunks[2], app);
}

fn render_title(frame: &mut Frame, area: Rect, app: &App) {
    let mut spans = vec![Span::styled(" theatre ", Theme::title())];
    for (i, crumb) in app.level.breadcrumb().into_iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled(" › ", Theme::dimmed()));
        }
        spans.push(Span::styled(crumb, Theme::breadcrumb()));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_list(frame: &mut Frame, area: Rect, app: &App) {
    let title = if app.items.is_empty() {
        format!(" {} ", app.level.title())
    } else {
        format!(
            " {} ({}/{}) ",
            app.level.title(),
            app.list.selected + 1,
            app.items.len()
        )
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Theme::border())
        .title(Span::styled(title, Theme::title()));

    if app.items.is_empty() {
        let empty = Paragraph::new("<empty>")
            .style(Theme::dimmed())
            .alignment(Alignment::Center)
            .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let visible = area.height.saturating_sub(2) as usize;
    let rows: Vec<ListItem> = app
        .items
        .iter()
        .enumerate()
        .skip(app.list.offset)
        .take(visible)
        .map(|(i, item)| {
            let selected = i == app.list.selected;
            let marker = if selected { "▸ " } else { "  " };
            let style = if selected {
                Theme::list_item_selected()
            } else {
                Theme::list_item()
            };
            ListItem::new(Line::from(vec![
                Span::styled(marker, Theme::keybind()),
                Span::styled(item.label(), style),
            ]))
        })
        .collect();

    frame.render_widget(List::new(rows).block(block), area);
}

fn render_status(frame: &mut Frame, area: Rect, app: &App) {
    let mut spans = Vec::new();
    for (key, desc) in [
        ("↑↓", "move"),
        ("↵", "open"),
        ("←", "back"),
        ("u", "rescan"),
        ("q", "quit"),
    ] {
        spans.push(Span::styled(format!(" {} ", key), Theme::keybind()));
        spans.push(Span::styled(desc, Theme::dimmed()));
    }

    if let Some(ref status) = app.status {
        let style = if status.starts_with("error") {
            Theme::error()
        } else {
            Theme::status()
        };
        spans.push(Span::raw("  "));
        spans.push(Span::styled(format!(" {} ", status), style));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
