pub mod log_board;
pub mod screen;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use matchking::{
    celebration::RewardBurst,
    controls::{page_count, tile_label, Controls},
    view::{FeedbackKind, GameView, ItemView},
};

use crate::App;

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 1;
const ITEM_CARD_HEIGHT: u16 = 5;
/// `a:` label, a wide glyph and spacing
const TILE_CELL_WIDTH: u16 = 7;

pub fn draw(app: &mut App, f: &mut Frame) {
    screen::current_screen(&app.state).render(app, f);
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let view = self.game.view();
        if view.is_complete {
            render_completion(&view, area, buf);
        } else {
            render_game(self, &view, area, buf);
        }
        if view.show_reward {
            render_reward(&self.burst, &view, area, buf);
        }
    }
}

fn render_game(app: &App, view: &GameView, area: Rect, buf: &mut Buffer) {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let dim = Style::default().add_modifier(Modifier::DIM);

    let cards = view.items.len() as u16;
    let width = area.width.saturating_sub(2 * HORIZONTAL_MARGIN).max(1);
    let page_width = app.controls.page_range(view).len() as u16 * TILE_CELL_WIDTH;
    // Top border, wrapped tiles, guide line.
    let tile_rows = page_width.div_ceil(width).max(1) + 2;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(1),                       // header
            Constraint::Length(1),                       // padding
            Constraint::Length(cards * ITEM_CARD_HEIGHT), // item cards
            Constraint::Length(1),                       // padding
            Constraint::Length(tile_rows),               // tiles
            Constraint::Length(1),                       // feedback
            Constraint::Length(1),                       // caption
            Constraint::Length(1),                       // warning
            Constraint::Min(0),
            Constraint::Length(1), // legend
        ])
        .split(area);

    let header = Line::from(vec![
        Span::styled(view.collection_name.clone(), bold.fg(Color::Cyan)),
        Span::raw("   "),
        Span::styled(view.progress_label(), dim),
        Span::raw("   "),
        Span::styled(
            format!("★ {} / {}", view.stars % view.required_stars, view.required_stars),
            Style::default().fg(Color::Yellow),
        ),
    ]);
    Paragraph::new(header).render(chunks[0], buf);

    let card_areas = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![Constraint::Length(ITEM_CARD_HEIGHT); view.items.len()])
        .split(chunks[2]);
    for (i, (item, card)) in view.items.iter().zip(card_areas.iter()).enumerate() {
        let target = app.controls.target_item() == Some(item.id.as_str());
        render_item_card(i, item, view.multi_mode, target, *card, buf);
    }

    render_tiles(app, view, chunks[4], buf);

    if let Some(feedback) = &view.feedback {
        let color = match feedback.kind {
            FeedbackKind::Success => Color::Green,
            FeedbackKind::Error => Color::Red,
        };
        Paragraph::new(Span::styled(feedback.message.clone(), bold.fg(color)))
            .alignment(Alignment::Center)
            .render(chunks[5], buf);
    }

    if let Some(caption) = app.game.speech().caption() {
        Paragraph::new(Span::styled(
            format!("🔊 {caption}"),
            Style::default().add_modifier(Modifier::ITALIC),
        ))
        .alignment(Alignment::Center)
        .render(chunks[6], buf);
    }

    if let Some(warning) = &view.persistence_warning {
        Paragraph::new(Span::styled(warning.clone(), Style::default().fg(Color::Red)))
            .alignment(Alignment::Center)
            .render(chunks[7], buf);
    }

    let mut legend = String::new();
    if let Some(n) = app.controls.pending_number() {
        legend.push_str(&format!("[{n}…]  "));
    }
    legend.push_str("(a-z) pick tile  (1-9) slot  (enter) card  (space) drop  (.) name");
    if page_count(view) > 1 {
        legend.push_str("  (tab) more tiles");
    }
    if view.hint_available {
        legend.push_str("  (?) hint");
    }
    legend.push_str("  (ctrl-r) restart  (esc) quit");
    Paragraph::new(Span::styled(legend, Style::default().add_modifier(Modifier::ITALIC)))
        .wrap(Wrap { trim: true })
        .render(chunks[9], buf);
}

fn render_item_card(index: usize, item: &ItemView, multi: bool, targeted: bool, area: Rect, buf: &mut Buffer) {
    let border = if item.completed {
        Style::default().fg(Color::Green)
    } else if targeted {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else if item.is_focus {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().add_modifier(Modifier::DIM)
    };
    let title = if multi {
        format!(" {} · {} ", index + 1, item.hint)
    } else {
        format!(" {} ", item.hint)
    };
    let block = Block::default().borders(Borders::ALL).border_style(border).title(title);
    let inner = block.inner(area);
    block.render(area, buf);

    let slot_spans: Vec<Span> = item
        .slots
        .iter()
        .enumerate()
        .flat_map(|(i, slot)| {
            let text = slot.map_or_else(|| "＿".to_string(), |c| c.to_string());
            let style = if item.flash_slot == Some(i) {
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::REVERSED | Modifier::SLOW_BLINK)
            } else if slot.is_some() {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            [Span::raw("["), Span::styled(text, style), Span::raw("] ")]
        })
        .collect();
    let numbers: String = (1..=item.slots.len()).map(|n| format!(" {n}   ")).collect();

    let mut lines = vec![Line::from(slot_spans)];
    lines.push(Line::from(Span::styled(
        numbers,
        Style::default().add_modifier(Modifier::DIM),
    )));
    if item.completed {
        lines.push(Line::from(Span::styled(
            format!("✔ {}", item.name),
            Style::default().fg(Color::Green),
        )));
    }
    Paragraph::new(lines).render(inner, buf);
}

fn render_tiles(app: &App, view: &GameView, area: Rect, buf: &mut Buffer) {
    let pages = page_count(view);
    let page = app.controls.page(view);
    let title = if pages > 1 {
        format!(" tiles {}/{} ", page + 1, pages)
    } else {
        " tiles ".to_string()
    };
    let block = Block::default().borders(Borders::TOP).title(title);
    let inner = block.inner(area);
    block.render(area, buf);

    if view.impulse_locked {
        Paragraph::new(Span::styled(
            "請先看圖片…",
            Style::default().add_modifier(Modifier::DIM | Modifier::ITALIC),
        ))
        .alignment(Alignment::Center)
        .render(inner, buf);
        return;
    }

    let selected = app.controls.selected_tile();
    let range = app.controls.page_range(view);
    let mut spans = Vec::new();
    for (i, tile) in view.tiles[range.clone()].iter().enumerate() {
        let Some(label) = tile_label(i) else {
            break;
        };
        let mut style = Style::default().add_modifier(Modifier::BOLD);
        if tile.guided {
            style = style.fg(Color::Green).add_modifier(Modifier::UNDERLINED);
        }
        if selected == Some(tile.tile.id.as_str()) {
            style = style.add_modifier(Modifier::REVERSED);
        }
        spans.push(Span::styled(format!("{label}:"), Style::default().add_modifier(Modifier::DIM)));
        spans.push(Span::styled(tile.tile.ch.to_string(), style));
        spans.push(Span::raw("   "));
    }
    let mut guide_line = None;
    if let Some(guide) = &view.guide {
        if let Some(pos) = view.tiles.iter().position(|t| t.tile.id == guide.tile_id) {
            let mut text = format!("→ 把「{}」放到第 {} 格", view.tiles[pos].tile.ch, guide.slot_index + 1);
            if !range.contains(&pos) {
                text.push_str(&format!("（在第 {} 頁，按 tab）", Controls::page_of(pos) + 1));
            }
            guide_line = Some(Line::from(Span::styled(
                text,
                Style::default().fg(Color::Green).add_modifier(Modifier::ITALIC),
            )));
        }
    }
    let mut lines = vec![Line::from(spans)];
    lines.extend(guide_line);
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .render(inner, buf);
}

fn render_completion(view: &GameView, area: Rect, buf: &mut Buffer) {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(1), // banner
            Constraint::Length(1),
            Constraint::Length(1), // summary
            Constraint::Length(1), // stars
            Constraint::Length(1), // warning
            Constraint::Min(1),
            Constraint::Length(1), // legend
        ])
        .split(area);

    Paragraph::new(Span::styled("🎉 太棒了，全部完成了！", bold.fg(Color::Green)))
        .alignment(Alignment::Center)
        .render(chunks[1], buf);

    if let Some(log) = &view.summary {
        Paragraph::new(Span::styled(
            format!(
                "{}/{} items   {} mistakes   {:.1}s per item   help: {}",
                log.completed_items,
                log.total_items,
                log.mistakes,
                log.average_time_per_item,
                log.most_used_scaffold.label()
            ),
            bold,
        ))
        .alignment(Alignment::Center)
        .render(chunks[3], buf);
    }

    Paragraph::new(Span::styled(
        format!("★ {}", view.stars),
        Style::default().fg(Color::Yellow),
    ))
    .alignment(Alignment::Center)
    .render(chunks[4], buf);

    if let Some(warning) = &view.persistence_warning {
        Paragraph::new(Span::styled(warning.clone(), Style::default().fg(Color::Red)))
            .alignment(Alignment::Center)
            .render(chunks[5], buf);
    }

    Paragraph::new(Span::styled(
        "(r)estart / (l)ogs / (q)uit",
        Style::default().add_modifier(Modifier::ITALIC),
    ))
    .render(chunks[7], buf);
}

/// Modal over whatever is on screen, with the star burst behind it.
fn render_reward(burst: &RewardBurst, view: &GameView, area: Rect, buf: &mut Buffer) {
    render_sparks(burst, area, buf);

    let title = "⭐ 獲得獎勵！";
    let width = (title.width() as u16 + 16).min(area.width);
    let height = 5.min(area.height);
    let modal = Rect::new(
        area.x + area.width.saturating_sub(width) / 2,
        area.y + area.height.saturating_sub(height) / 2 + 3,
        width,
        height,
    )
    .intersection(area);

    Clear.render(modal, buf);
    let lines = vec![
        Line::from(Span::styled(
            title,
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )),
        Line::from(format!("★ × {}", view.stars)),
        Line::from(Span::styled(
            "(enter) 繼續",
            Style::default().add_modifier(Modifier::ITALIC),
        )),
    ];
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL))
        .render(modal, buf);
}

fn render_sparks(burst: &RewardBurst, area: Rect, buf: &mut Buffer) {
    let colors = [
        Color::Yellow,
        Color::Magenta,
        Color::Cyan,
        Color::Green,
        Color::LightRed,
        Color::LightYellow,
    ];

    for spark in &burst.sparks {
        if spark.x < 0.0 || spark.y < 0.0 {
            continue;
        }
        let (x, y) = (spark.x as u16, spark.y as u16);
        if x >= area.width || y >= area.height {
            continue;
        }
        let color = colors[spark.color_index % colors.len()];
        let fade = 1.0 - (spark.age / spark.max_age);
        let style = if spark.anchored || fade > 0.6 {
            Style::default().fg(color).add_modifier(Modifier::BOLD)
        } else if fade > 0.25 {
            Style::default().fg(color)
        } else {
            Style::default().fg(color).add_modifier(Modifier::DIM)
        };
        if let Some(cell) = buf.cell_mut((area.x + x, area.y + y)) {
            cell.set_symbol(&spark.symbol.to_string());
            cell.set_style(style);
        }
    }
}
