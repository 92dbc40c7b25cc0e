use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};

use matchking::{model::ScaffoldingLevel, stats::GameLog};

use crate::App;

/// Pure presenter for one session log row
pub fn present_row(log: &GameLog) -> Row<'static> {
    let help_color = match log.most_used_scaffold {
        ScaffoldingLevel::None => Color::Green,
        ScaffoldingLevel::Visual => Color::Cyan,
        ScaffoldingLevel::Audio => Color::Yellow,
        ScaffoldingLevel::Guide => Color::Magenta,
    };

    let mistakes_style = if log.mistakes == 0 {
        Style::default().fg(Color::Green)
    } else if log.mistakes < 3 {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::Red)
    };

    Row::new(vec![
        Cell::from(log.timestamp.format("%Y-%m-%d %H:%M").to_string()),
        Cell::from(log.student_name.clone().unwrap_or_else(|| "—".to_string())),
        Cell::from(log.collection_name.clone()),
        Cell::from(format!("{}/{}", log.completed_items, log.total_items))
            .style(Style::default().add_modifier(Modifier::BOLD)),
        Cell::from(log.mistakes.to_string()).style(mistakes_style),
        Cell::from(format!("{:.1}", log.average_time_per_item)),
        Cell::from(log.most_used_scaffold.label()).style(Style::default().fg(help_color)),
    ])
}

/// Render the session log screen
pub fn render_log_board(app: &mut App, f: &mut Frame) {
    let area = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Min(0),    // Table
            Constraint::Length(2), // Instructions
        ])
        .split(area);

    let title = Paragraph::new(format!(
        "Session Logs ({} most recent)",
        app.log_board.logs.len()
    ))
    .block(Block::default().borders(Borders::ALL).title("Logs"))
    .style(
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    )
    .alignment(Alignment::Center);
    f.render_widget(title, chunks[0]);

    if let Some(err) = &app.log_board.error {
        let msg = Paragraph::new(format!("Could not read logs: {err}"))
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::Red));
        f.render_widget(msg, chunks[1]);
    } else if app.log_board.logs.is_empty() {
        let no_data = Paragraph::new("No sessions recorded yet.")
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::Gray));
        f.render_widget(no_data, chunks[1]);
    } else {
        let table_height = chunks[1].height.saturating_sub(3) as usize; // borders + header
        let max_scroll = app.log_board.logs.len().saturating_sub(table_height);
        if app.log_board.scroll_offset > max_scroll {
            app.log_board.scroll_offset = max_scroll;
        }

        let header = Row::new(vec![
            Cell::from("Date"),
            Cell::from("Student"),
            Cell::from("Collection"),
            Cell::from("Done"),
            Cell::from("Mistakes"),
            Cell::from("Avg (s)"),
            Cell::from("Help"),
        ])
        .style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

        let rows: Vec<Row> = app
            .log_board
            .logs
            .iter()
            .skip(app.log_board.scroll_offset)
            .take(table_height)
            .map(present_row)
            .collect();

        let widths = [
            Constraint::Length(16), // Date
            Constraint::Length(10), // Student
            Constraint::Min(12),    // Collection
            Constraint::Length(6),  // Done
            Constraint::Length(9),  // Mistakes
            Constraint::Length(8),  // Avg
            Constraint::Length(15), // Help
        ];

        let table = Table::new(rows, widths)
            .header(header)
            .block(Block::default().borders(Borders::ALL).title("Sessions"))
            .column_spacing(1);
        f.render_widget(table, chunks[1]);
    }

    let instructions = Paragraph::new("(↑/↓) scroll  (PgUp/PgDn) page  (Home) top  (b) back  (r) restart  (q) quit")
        .alignment(Alignment::Center)
        .wrap(ratatui::widgets::Wrap { trim: true });
    f.render_widget(instructions, chunks[2]);
}
