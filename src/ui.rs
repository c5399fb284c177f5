//! Layout and drawing: title, options, gameboard, HUD, fragments,
//! clear flash and the screen wipe.

use crate::app::{OptionsRow, OptionsState, Screen, TitleChoice, TitleState, Transition};
use crate::audio::AudioState;
use crate::board::GameBoard;
use crate::grid::{
    to_board_col, to_state_col, NUM_ACROSS, NUM_DOWN, PLAY_AREA_END, PLAY_AREA_START,
};
use crate::theme::Theme;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Widget};
use ratatui::Frame;
use std::collections::HashSet;
use std::time::Instant;
use tachyonfx::{
    fx, ref_count, CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation,
};

/// Each grid cell is two characters wide so blocks render roughly square.
const CELL_W: u16 = 2;
/// Duration of the clear flash fade.
const CLEAR_FADE_MS: u32 = 400;

/// Board render size in terminal cells (border included).
fn board_pixel_size() -> (u16, u16) {
    (NUM_ACROSS as u16 * CELL_W + 2, NUM_DOWN as u16 + 2)
}

/// Centered outer rect for the board.
fn board_outer_rect(area: Rect) -> Rect {
    let (w, h) = board_pixel_size();
    Rect {
        x: area.x + area.width.saturating_sub(w) / 2,
        y: area.y + area.height.saturating_sub(h) / 2,
        width: w.min(area.width),
        height: h.min(area.height),
    }
}

/// Inner rect (grid only, no border); matches draw_board layout.
fn board_inner_rect(area: Rect) -> Rect {
    let outer = board_outer_rect(area);
    Rect {
        x: outer.x + 1,
        y: outer.y + 1,
        width: outer.width.saturating_sub(2),
        height: outer.height.saturating_sub(2),
    }
}

/// Draw current screen, with the wipe curtain on top while a transition is
/// running. When a clear is flashing and animation is enabled, creates and
/// processes the TachyonFX fade via `clear_effect` / `clear_effect_time`.
#[allow(clippy::too_many_arguments)]
pub fn draw(
    frame: &mut Frame,
    screen: Screen,
    board: &GameBoard,
    theme: &Theme,
    audio: &AudioState,
    title: &TitleState,
    options: &OptionsState,
    transition: Option<&Transition>,
    clear_effect: &mut Option<Effect>,
    clear_effect_time: &mut Option<Instant>,
    now: Instant,
    no_animation: bool,
) {
    let area = frame.area();
    match screen {
        Screen::Title => draw_title(frame, theme, title, area),
        Screen::Options => draw_options(frame, theme, audio, options, area),
        Screen::Playing => {
            draw_board(frame, board, theme, audio, area);
            draw_fragments(frame, board, theme, area);
            if board.clear_pausing() && !board.recent_cleared().is_empty() && !no_animation {
                apply_clear_effect(frame, board, theme, area, clear_effect, clear_effect_time, now);
            }
        }
    }
    if let Some(t) = transition {
        draw_wipe(frame, theme, t, area);
    }
}

fn draw_title(frame: &mut Frame, theme: &Theme, title: &TitleState, area: Rect) {
    // Background: drifting gems in unit space mapped to the full area.
    let buf = frame.buffer_mut();
    for gem in &title.gems {
        let x = area.x + ((gem.x * area.width.saturating_sub(1) as f64) as u16).min(area.width.saturating_sub(1));
        let y = area.y + ((gem.y * area.height.saturating_sub(1) as f64) as u16).min(area.height.saturating_sub(1));
        let color = theme.block_color(gem.kind, (200, 200, 200));
        buf[(x, y)]
            .set_symbol("◆")
            .set_style(Style::default().fg(color));
    }

    let popup_w = 36u16;
    let popup_h = 13u16;
    let popup = Rect {
        x: area.x + area.width.saturating_sub(popup_w) / 2,
        y: area.y + area.height.saturating_sub(popup_h) / 2,
        width: popup_w.min(area.width),
        height: popup_h.min(area.height),
    };

    let highlight = Style::default().fg(Color::Black).bg(theme.title).bold();
    let normal = Style::default().fg(theme.main_fg);
    let entry = |label: &str, selected: bool| {
        Line::from(Span::styled(
            format!(" {label} "),
            if selected { highlight } else { normal },
        ))
    };

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(" ◆ Gemfall ◆ ", Style::default().fg(theme.title).bold())),
        Line::from(""),
        Line::from(""),
        entry("START", title.choice == TitleChoice::Start),
        Line::from(""),
        entry("OPTIONS", title.choice == TitleChoice::Options),
        Line::from(""),
        entry("QUIT", title.choice == TitleChoice::Quit),
        Line::from(""),
        Line::from(Span::styled(
            " ↕ select   ENTER confirm   Q quit ",
            Style::default().fg(theme.inactive_fg),
        )),
    ];

    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
    );
    p.render(popup, frame.buffer_mut());
}

fn draw_options(
    frame: &mut Frame,
    theme: &Theme,
    audio: &AudioState,
    options: &OptionsState,
    area: Rect,
) {
    let popup_w = 40u16;
    let popup_h = 12u16;
    let popup = Rect {
        x: area.x + area.width.saturating_sub(popup_w) / 2,
        y: area.y + area.height.saturating_sub(popup_h) / 2,
        width: popup_w.min(area.width),
        height: popup_h.min(area.height),
    };

    let highlight = Style::default().fg(Color::Black).bg(theme.title).bold();
    let normal = Style::default().fg(theme.main_fg);
    let row = |label: String, selected: bool| {
        Line::from(Span::styled(
            format!(" {label} "),
            if selected { highlight } else { normal },
        ))
    };

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(" Options ", Style::default().fg(theme.title).bold())),
        Line::from(""),
        row(
            format!("Tune        ◂ {} ▸", audio.current_tune + 1),
            options.row == OptionsRow::Tune,
        ),
        row(
            format!("Music vol   ◂ {:3} ▸", audio.music_volume),
            options.row == OptionsRow::MusicVolume,
        ),
        row(
            format!("Sound vol   ◂ {:3} ▸", audio.sound_volume),
            options.row == OptionsRow::SoundVolume,
        ),
        Line::from(""),
        row("Back".to_string(), options.row == OptionsRow::Back),
        Line::from(""),
        Line::from(Span::styled(
            " ↕ select   ↔ change   ESC back ",
            Style::default().fg(theme.inactive_fg),
        )),
    ];

    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
    );
    p.render(popup, frame.buffer_mut());
}

/// Whether a board column index belongs to the playable window.
fn is_play_column(board_col: usize) -> bool {
    (PLAY_AREA_START + 1..=PLAY_AREA_END).contains(&board_col)
}

fn draw_board(frame: &mut Frame, board: &GameBoard, theme: &Theme, audio: &AudioState, area: Rect) {
    let outer = board_outer_rect(area);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(" Gemfall ", Style::default().fg(theme.title)));
    let inner = block.inner(outer);
    block.render(outer, frame.buffer_mut());

    let buf = frame.buffer_mut();
    for row in 0..NUM_DOWN {
        let ry = inner.y + row as u16;
        if ry >= inner.y + inner.height {
            break;
        }
        for board_col in 0..NUM_ACROSS {
            let rx = inner.x + board_col as u16 * CELL_W;
            if rx + CELL_W > inner.x + inner.width {
                break;
            }
            let (symbol, style) = if is_play_column(board_col) {
                let col = to_state_col(board_col as i32) as usize;
                if board.grid.visible(row, col) {
                    let kind = board.grid.kind(row, col);
                    let c = theme.block_color(kind, board.multi_rgb());
                    ("◆ ", Style::default().fg(c).bg(theme.bg))
                } else {
                    ("  ", Style::default().bg(theme.bg))
                }
            } else {
                // Decor columns frame the playable window.
                ("░░", Style::default().fg(theme.gray).bg(theme.bg))
            };
            buf.set_string(rx, ry, symbol, style);
        }
    }

    draw_hud(frame, board, theme, audio, inner);
}

/// HUD over the decor columns: score and level left, preview and de-gray
/// right.
fn draw_hud(frame: &mut Frame, board: &GameBoard, theme: &Theme, audio: &AudioState, inner: Rect) {
    let label = Style::default().fg(theme.title).bg(theme.bg);
    let value = Style::default().fg(theme.main_fg).bg(theme.bg);
    let buf = frame.buffer_mut();

    let left_x = inner.x + 1;
    buf.set_string(left_x, inner.y + 1, "Score", label);
    buf.set_string(left_x, inner.y + 2, format!("{:>7}", board.score()), value);
    buf.set_string(left_x, inner.y + 4, "Level", label);
    buf.set_string(left_x, inner.y + 5, format!("{:>7}", board.level()), value);
    if let Some(cue) = audio.last_cue {
        buf.set_string(left_x, inner.y + 7, cue, Style::default().fg(theme.inactive_fg).bg(theme.bg));
    }

    let right_x = inner.x + (PLAY_AREA_END as u16 + 1) * CELL_W + 1;
    buf.set_string(right_x, inner.y + 1, "Next", label);
    let preview_color = theme.block_color(board.preview_kind(), board.multi_rgb());
    buf.set_string(
        right_x,
        inner.y + 2,
        "◆",
        Style::default().fg(preview_color).bg(theme.bg),
    );
    buf.set_string(right_x, inner.y + 4, "De-gray", label);
    buf.set_string(
        right_x,
        inner.y + 5,
        format!("{:>3}", board.de_gray().max(0)),
        value,
    );
}

/// Explosion debris, drawn in fractional play-area coordinates.
fn draw_fragments(frame: &mut Frame, board: &GameBoard, theme: &Theme, area: Rect) {
    let inner = board_inner_rect(area);
    let play_x = inner.x + (PLAY_AREA_START as u16 + 1) * CELL_W;
    let buf = frame.buffer_mut();
    for f in board.fragments() {
        let rx = play_x + (f.x * CELL_W as f32) as u16;
        let ry = inner.y.saturating_add(f.y.max(0.0) as u16);
        if rx < inner.x + inner.width && ry < inner.y + inner.height {
            let symbol = if f.fade() > 0.5 { "•" } else { "·" };
            let c = theme.block_color(f.kind, board.multi_rgb());
            buf[(rx, ry)]
                .set_symbol(symbol)
                .set_style(Style::default().fg(c));
        }
    }
}

/// Buffer positions of the cells cleared by the latest commit.
fn cleared_buffer_positions(inner: Rect, board: &GameBoard) -> HashSet<(u16, u16)> {
    let mut set = HashSet::new();
    for p in board.recent_cleared() {
        // Skip the border column, matching the draw_board layout.
        let board_col = to_board_col(p.col) + 1;
        let x0 = inner.x + board_col as u16 * CELL_W;
        let y = inner.y + p.row as u16;
        for x in x0..(x0 + CELL_W).min(inner.x + inner.width) {
            if y < inner.y + inner.height {
                set.insert((x, y));
            }
        }
    }
    set
}

/// Create or update the clear-flash fade and process it.
fn apply_clear_effect(
    frame: &mut Frame,
    board: &GameBoard,
    theme: &Theme,
    area: Rect,
    clear_effect: &mut Option<Effect>,
    clear_effect_time: &mut Option<Instant>,
    now: Instant,
) {
    let inner = board_inner_rect(area);
    let delta = clear_effect_time
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let delta_ms = delta.as_millis().min(u32::MAX as u128) as u32;
    let tfx_delta = TfxDuration::from_millis(delta_ms);
    *clear_effect_time = Some(now);

    if clear_effect.is_none() {
        let cleared = cleared_buffer_positions(inner, board);
        let filter = CellFilter::PositionFn(ref_count(move |pos: ratatui::layout::Position| {
            cleared.contains(&(pos.x, pos.y))
        }));
        let bg = theme.bg;
        let effect = fx::fade_to(bg, bg, (CLEAR_FADE_MS, Interpolation::Linear))
            .with_filter(filter)
            .with_area(inner);
        *clear_effect = Some(effect);
    }

    if let Some(effect) = clear_effect {
        frame.render_effect(effect, inner, tfx_delta);
    }
}

/// Solid curtain over the top `cover_fraction` of the frame.
fn draw_wipe(frame: &mut Frame, theme: &Theme, transition: &Transition, area: Rect) {
    let covered = (transition.cover_fraction() * area.height as f64).round() as u16;
    let buf = frame.buffer_mut();
    for y in area.y..(area.y + covered.min(area.height)) {
        for x in area.x..area.x + area.width {
            buf[(x, y)]
                .set_symbol(" ")
                .set_style(Style::default().bg(theme.div_line));
        }
    }
}
