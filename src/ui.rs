//! UI rendering helpers for the terminal user interface.
//!
//! This module contains functions to render the TUI using `ratatui`: the
//! now-playing status, the three spectrum projections, the particle canvas,
//! the playlist, and the intake/alert popups.

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    symbols::Marker,
    text::Line,
    widgets::{
        Bar, BarChart, BarGroup, Block, Borders, Clear, Gauge, List, ListItem, ListState, Padding,
        Paragraph, Sparkline, Wrap,
        canvas::{Canvas, Circle},
    },
};
use std::{collections::BTreeMap, sync::LazyLock, time::Duration};

use crate::app::{App, PromptKind};
use crate::config::{ControlsSettings, TimeField, UiSettings, VisualizerSettings};
use crate::library::{Track, format_duration};
use crate::visualizer::{BAND_LABELS, VisualSnapshot};

static CONTROLS_MAP: LazyLock<BTreeMap<String, String>> = LazyLock::new(|| {
    let mut map: BTreeMap<String, String> = BTreeMap::new();
    map.insert("j/k".to_string(), "up/down".to_string());
    map.insert("gg/G".to_string(), "top/bottom".to_string());
    map.insert("enter".to_string(), "play selected".to_string());
    map.insert("space/p".to_string(), "play/pause".to_string());
    map.insert("h/l".to_string(), "prev/next".to_string());
    // H/L is filled dynamically from config.
    map.insert("0-9".to_string(), "seek 0-90%".to_string());
    map.insert("+/-".to_string(), "volume".to_string());
    map.insert("m".to_string(), "microphone".to_string());
    map.insert("o".to_string(), "add file".to_string());
    map.insert("u".to_string(), "add url".to_string());
    map.insert("f".to_string(), "like".to_string());
    map.insert("s".to_string(), "shuffle".to_string());
    map.insert("r".to_string(), "repeat".to_string());
    map.insert("q".to_string(), "quit".to_string());
    map
});

/// Render the controls help text, incorporating scrub seconds.
fn controls_text(scrub_seconds: u64) -> String {
    // Keep the rendered order stable and human-friendly.
    let order = [
        "space/p", "h/l", "H/L", "0-9", "+/-", "j/k", "enter", "gg/G", "m", "o", "u", "f", "s",
        "r", "q",
    ];
    order
        .iter()
        .filter_map(|k| {
            if *k == "H/L" {
                Some(format!("[H/L] scrub -/+{}s", scrub_seconds))
            } else {
                CONTROLS_MAP.get(*k).map(|v| format!("[{}] {}", k, v))
            }
        })
        .collect::<Vec<String>>()
        .join(" | ")
}

/// Build the now-playing time text (elapsed/total/remaining) per `UiSettings`.
fn now_playing_time_text(
    elapsed: Duration,
    total: Option<Duration>,
    ui: &UiSettings,
) -> Option<String> {
    if ui.now_playing_time_fields.is_empty() {
        return None;
    }

    let mut parts: Vec<String> = Vec::new();
    for f in &ui.now_playing_time_fields {
        match f {
            TimeField::Elapsed => parts.push(format_duration(elapsed)),
            TimeField::Total => {
                if let Some(t) = total {
                    parts.push(format_duration(t));
                }
            }
            TimeField::Remaining => {
                if let Some(t) = total {
                    let rem = t.saturating_sub(elapsed);
                    parts.push(format!("-{}", format_duration(rem)));
                }
            }
        }
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(&ui.now_playing_time_separator))
    }
}

/// Compute a centered rectangle with given size constrained to `r`.
fn centered_rect_sized(mut width: u16, mut height: u16, r: Rect) -> Rect {
    // Keep the popup smaller and avoid covering the entire UI.
    width = width.min(r.width.saturating_sub(2)).max(10);
    height = height.min(r.height.saturating_sub(2)).max(3);

    let x = r.x + (r.width.saturating_sub(width) / 2);
    let y = r.y + (r.height.saturating_sub(height) / 2);
    Rect {
        x,
        y,
        width,
        height,
    }
}

fn on_off(flag: bool) -> &'static str {
    if flag { "ON" } else { "OFF" }
}

fn padded_block(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .title(title)
        .padding(Padding {
            left: 1,
            right: 0,
            top: 0,
            bottom: 0,
        })
}

/// First status line: source, song, time, play state, volume, like.
fn now_playing_line(app: &App, ui: &UiSettings) -> String {
    let info = &app.playback;
    let mut parts: Vec<String> = Vec::new();

    parts.push(if info.using_microphone {
        "Source: Microphone".to_string()
    } else {
        "Source: Audio".to_string()
    });

    match app.current_track() {
        Some(track) if !info.using_microphone => {
            let song = format!("{} - {}", track.title, track.artist);
            match now_playing_time_text(info.elapsed, info.total, ui) {
                Some(time) => parts.push(format!("Song: {} [{}]", song, time)),
                None => parts.push(format!("Song: {}", song)),
            }
        }
        Some(_) => {}
        None => parts.push("No track".to_string()),
    }

    parts.push(if info.playing { "Playing" } else { "Paused" }.to_string());
    parts.push(format!("Vol: {}%", info.volume));
    if app.liked {
        parts.push("♥ Liked".to_string());
    }
    parts.join(" • ")
}

/// Second status line: the cosmetic toggles and where the library came from.
fn modes_line(app: &App) -> String {
    let mut parts = vec![
        format!("Shuffle: {}", on_off(app.shuffle)),
        format!("Repeat: {}", on_off(app.repeat)),
        if app.follow_playback {
            "Cursor: Follow".to_string()
        } else {
            "Cursor: Free-roam".to_string()
        },
    ];
    if let Some(dir) = &app.current_dir {
        parts.push(format!("Dir: {}", dir));
    }
    parts.join(" • ")
}

fn to_levels(values: &[f32]) -> Vec<u64> {
    values
        .iter()
        .map(|v| v.clamp(0.0, 100.0).round() as u64)
        .collect()
}

fn draw_status(frame: &mut Frame, app: &App, ui: &UiSettings, area: Rect) {
    let block = padded_block(" now playing ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(inner);

    let mut lines = vec![
        Line::from(now_playing_line(app, ui)),
        Line::from(modes_line(app)),
    ];
    if let Some(status) = &app.status {
        lines.push(Line::from(status.as_str()).fg(Color::Yellow));
    }
    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), rows[0]);

    let ratio = (app.playback.progress as f64 / 100.0).clamp(0.0, 1.0);
    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(Color::Cyan))
        .ratio(ratio)
        .label(format!("{:.0}%", app.playback.progress));
    frame.render_widget(gauge, rows[1]);
}

fn draw_bars(frame: &mut Frame, visual: &VisualSnapshot, area: Rect) {
    let levels = to_levels(&visual.bars);
    let count = levels.len().max(1) as u16;
    let inner_width = area.width.saturating_sub(2);
    let bar_width = (inner_width / count).saturating_sub(1).max(1);

    let bars: Vec<Bar> = levels
        .iter()
        .map(|&v| {
            Bar::default()
                .value(v)
                .text_value(String::new())
                .style(Style::default().fg(Color::Magenta))
        })
        .collect();

    let chart = BarChart::default()
        .block(Block::default().borders(Borders::ALL).title(" spectrum "))
        .data(BarGroup::default().bars(&bars))
        .bar_width(bar_width)
        .bar_gap(1)
        .max(100);
    frame.render_widget(chart, area);
}

fn draw_waveform(frame: &mut Frame, visual: &VisualSnapshot, area: Rect) {
    let levels = to_levels(&visual.waveform);
    let sparkline = Sparkline::default()
        .block(Block::default().borders(Borders::ALL).title(" waveform "))
        .data(&levels)
        .max(100)
        .style(Style::default().fg(Color::Cyan));
    frame.render_widget(sparkline, area);
}

fn draw_bands(frame: &mut Frame, visual: &VisualSnapshot, area: Rect) {
    let levels = to_levels(&visual.bands);
    let bars: Vec<Bar> = levels
        .iter()
        .zip(BAND_LABELS)
        .map(|(&v, label)| {
            Bar::default()
                .value(v)
                .label(Line::from(label))
                .style(Style::default().fg(Color::LightBlue))
        })
        .collect();

    let inner_width = area.width.saturating_sub(2);
    let bar_width = (inner_width / BAND_LABELS.len() as u16)
        .saturating_sub(1)
        .max(1);
    let chart = BarChart::default()
        .block(Block::default().borders(Borders::ALL).title(" bands "))
        .data(BarGroup::default().bars(&bars))
        .bar_width(bar_width)
        .bar_gap(1)
        .max(100);
    frame.render_widget(chart, area);
}

fn draw_particles(frame: &mut Frame, visual: &VisualSnapshot, area: Rect) {
    let canvas = Canvas::default()
        .block(Block::default().borders(Borders::ALL).title(" particles "))
        .marker(Marker::Braille)
        .x_bounds([0.0, 100.0])
        .y_bounds([0.0, 100.0])
        .paint(|ctx| {
            for p in &visual.particles {
                let shade = (p.opacity.clamp(0.0, 1.0) * 255.0) as u8;
                ctx.draw(&Circle {
                    x: p.x as f64,
                    y: p.y as f64,
                    radius: p.size as f64 * 0.5,
                    color: Color::Rgb(shade, shade / 2, shade),
                });
            }
        });
    frame.render_widget(canvas, area);
}

fn draw_playlist(frame: &mut Frame, app: &App, tracks: &[Track], area: Rect) {
    // Center the selected item when possible by creating a visible window.
    // Only build ListItems for the visible window.
    let total = tracks.len();
    let list_height = area.height.saturating_sub(2) as usize;
    let sel_pos = app.selected.min(total.saturating_sub(1));
    let (start, end, selected_pos_in_visible) = if total <= list_height || list_height == 0 {
        (0, total, sel_pos)
    } else {
        let half = list_height / 2;
        let mut start = sel_pos.saturating_sub(half);
        if start + list_height > total {
            start = total - list_height;
        }
        (start, start + list_height, sel_pos - start)
    };

    let playing_index = app.playback.index;
    let visible_items: Vec<ListItem> = tracks[start..end]
        .iter()
        .enumerate()
        .map(|(offset, track)| {
            let marker = if playing_index == Some(start + offset) {
                "♪ "
            } else {
                "  "
            };
            let text = format!(
                "{}{} - {} ({})",
                marker,
                track.title,
                track.artist,
                track.duration_label()
            );
            let crate::library::AccentColor(r, g, b) = track.color;
            ListItem::new(text).style(Style::default().fg(Color::Rgb(r, g, b)))
        })
        .collect();

    let title = if total == 0 {
        " playlist (empty: [o] add file, [u] add url) ".to_string()
    } else {
        format!(" playlist ({}) ", total)
    };
    let list = List::new(visible_items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("> ");
    let mut state = ListState::default();
    if total > 0 {
        state.select(Some(selected_pos_in_visible));
    }
    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_prompt(frame: &mut Frame, app: &App, area: Rect) {
    let Some(prompt) = &app.prompt else {
        return;
    };
    let title = match prompt.kind {
        PromptKind::File => " add local file (enter adds, esc cancels) ",
        PromptKind::Url => " add stream url (enter adds, esc cancels) ",
    };
    let popup_area = centered_rect_sized(72, 3, area);
    frame.render_widget(Clear, popup_area);
    let input = Paragraph::new(format!("{}▏", prompt.buffer)).block(padded_block(title));
    frame.render_widget(input, popup_area);
}

fn draw_alert(frame: &mut Frame, app: &App, area: Rect) {
    let Some(message) = &app.alert else {
        return;
    };
    let popup_area = centered_rect_sized(60, 5, area);
    frame.render_widget(Clear, popup_area);
    let alert = Paragraph::new(message.as_str())
        .alignment(Alignment::Center)
        .fg(Color::Red)
        .block(padded_block(" alert (esc closes) "))
        .wrap(Wrap { trim: true });
    frame.render_widget(alert, popup_area);
}

/// Render the entire UI into the provided `frame` using `app` state and settings.
pub fn draw(
    frame: &mut Frame,
    app: &App,
    tracks: &[Track],
    ui_settings: &UiSettings,
    controls_settings: &ControlsSettings,
    visualizer_settings: &VisualizerSettings,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(6),
            Constraint::Percentage(50),
            Constraint::Min(4),
            Constraint::Length(4),
        ])
        .split(frame.area());

    // Header
    let header = Paragraph::new(ui_settings.header_text.as_str())
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" soundwave ")
                .title_alignment(Alignment::Center),
        );
    frame.render_widget(header, chunks[0]);

    draw_status(frame, app, ui_settings, chunks[1]);

    // Visualizer: spectrum over waveform on the left, bands over particles on the right.
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(chunks[2]);
    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(columns[0]);

    let visual = app.visual.as_ref();
    draw_bars(frame, visual, left[0]);
    draw_waveform(frame, visual, left[1]);

    if visualizer_settings.show_particles {
        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(columns[1]);
        draw_bands(frame, visual, right[0]);
        draw_particles(frame, visual, right[1]);
    } else {
        draw_bands(frame, visual, columns[1]);
    }

    draw_playlist(frame, app, tracks, chunks[3]);

    let footer = Paragraph::new(controls_text(controls_settings.scrub_seconds))
        .block(padded_block(" controls "))
        .wrap(Wrap { trim: true });
    frame.render_widget(footer, chunks[4]);

    draw_prompt(frame, app, frame.area());
    draw_alert(frame, app, frame.area());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::library::{Playlist, TrackSource};
    use ratatui::{Terminal, backend::TestBackend};

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        buffer
            .content()
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|c| c.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn render(app: &App) -> String {
        let settings = Settings::default();
        let mut terminal = Terminal::new(TestBackend::new(140, 48)).unwrap();
        let tracks = app.tracks();
        terminal
            .draw(|f| {
                draw(
                    f,
                    app,
                    &tracks,
                    &settings.ui,
                    &settings.controls,
                    &settings.visualizer,
                )
            })
            .unwrap();
        screen_text(&terminal)
    }

    #[test]
    fn time_text_follows_configured_fields() {
        let mut ui = UiSettings::default();
        let elapsed = Duration::from_secs(65);
        let total = Some(Duration::from_secs(180));
        assert_eq!(
            now_playing_time_text(elapsed, total, &ui).as_deref(),
            Some("1:05 / 3:00")
        );

        ui.now_playing_time_fields = vec![TimeField::Remaining];
        assert_eq!(
            now_playing_time_text(elapsed, total, &ui).as_deref(),
            Some("-1:55")
        );

        ui.now_playing_time_fields = vec![TimeField::Total];
        assert_eq!(now_playing_time_text(elapsed, None, &ui), None);
    }

    #[test]
    fn controls_text_mentions_scrub_seconds() {
        let text = controls_text(7);
        assert!(text.contains("[H/L] scrub -/+7s"));
        assert!(text.contains("[m] microphone"));
    }

    #[test]
    fn renders_playlist_and_microphone_badge() {
        let track = Track::new(
            "Night Drive".into(),
            "Local File".into(),
            TrackSource::File("/music/night.mp3".into()),
        );
        let mut app = App::new(Playlist::new(vec![track]).into_handle());
        app.playback.index = Some(0);

        let screen = render(&app);
        assert!(screen.contains("Night Drive - Local File (0:00)"));
        assert!(screen.contains("Source: Audio"));
        assert!(screen.contains("Bass"));

        app.playback.using_microphone = true;
        app.show_alert("microphone unavailable");
        let screen = render(&app);
        assert!(screen.contains("Source: Microphone"));
        assert!(screen.contains("microphone unavailable"));
    }
}
