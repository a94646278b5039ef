pub mod charting;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span, Text},
    widgets::{Axis, Block, Chart, Clear, Dataset, Gauge, GraphType, Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthChar;

use crate::{
    clock::Clock,
    monitor::Monitor,
    policy::{FatigueLevel, LevelBands},
    scoring::Jitter,
    session::SessionState,
    util::format_clock,
};

const SIDEBAR_WIDTH: u16 = 32;
const MIN_WIDTH: u16 = SIDEBAR_WIDTH + 30;
const MIN_HEIGHT: u16 = 20;
const TOAST_WIDTH: u16 = 44;
const BREAK_COLOR: Color = Color::Rgb(255, 165, 0);

/// Everything drawn on the monitor screen
pub struct MonitorScreen<'a, C: Clock, J: Jitter> {
    pub monitor: &'a Monitor<C, J>,
    pub typed: &'a str,
    pub bands: LevelBands,
}

fn level_color(level: FatigueLevel) -> Color {
    match level {
        FatigueLevel::Low => Color::Green,
        FatigueLevel::Medium => Color::Yellow,
        FatigueLevel::High => Color::Red,
    }
}

/// Longest suffix of `text` that fits in `max_width` terminal columns
pub fn tail_fitting(text: &str, max_width: usize) -> &str {
    let mut width = 0;
    let mut start = text.len();
    for (idx, c) in text.char_indices().rev() {
        width += c.width().unwrap_or(0);
        if width > max_width {
            break;
        }
        start = idx;
    }
    &text[start..]
}

impl<C: Clock, J: Jitter> Widget for MonitorScreen<'_, C, J> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
            Paragraph::new("Terminal too small")
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true })
                .render(area, buf);
            return;
        }

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(20)])
            .split(area);

        self.render_sidebar(columns[0], buf);
        self.render_main(columns[1], buf);
        self.render_toasts(area, buf);
    }
}

impl<C: Clock, J: Jitter> MonitorScreen<'_, C, J> {
    fn render_sidebar(&self, area: Rect, buf: &mut Buffer) {
        let session = self.monitor.session();
        let bold = Style::default().add_modifier(Modifier::BOLD);
        let dim = Style::default().add_modifier(Modifier::DIM);

        let control_height = if session.is_on_break() { 7 } else { 5 };
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(control_height), Constraint::Min(6)])
            .split(area);

        let toggle_hint = match session.state() {
            SessionState::Idle => "ctrl+s start",
            SessionState::Monitoring | SessionState::OnBreak => "ctrl+s pause",
        };
        let mut control = vec![
            Line::from(vec![
                Span::styled(toggle_hint, bold),
                Span::raw("  "),
                Span::styled("ctrl+r reset", dim),
            ]),
            Line::from(vec![
                Span::styled("ctrl+b break", dim),
                Span::raw("  "),
                Span::styled("esc quit", dim),
            ]),
        ];
        if session.is_on_break() {
            let break_style = Style::default().fg(BREAK_COLOR).add_modifier(Modifier::BOLD);
            control.push(Line::from(""));
            control.push(Line::from(Span::styled("Break Time", break_style)).centered());
            control.push(
                Line::from(Span::styled(
                    format!("{}s", session.break_secs_remaining()),
                    break_style,
                ))
                .centered(),
            );
        }
        Paragraph::new(control)
            .block(Block::bordered().title(" Session Control "))
            .render(rows[0], buf);

        let status = if session.is_on_break() {
            Span::styled("On Break", Style::default().fg(BREAK_COLOR))
        } else {
            let level = self.bands.classify(session.fatigue_score());
            Span::styled(level.to_string(), Style::default().fg(level_color(level)))
        };
        let stat = |label: &'static str, value: String| {
            Line::from(vec![
                Span::styled(format!("{label:<13}"), dim),
                Span::styled(value, bold),
            ])
        };
        let mut stats = vec![
            stat("Session Time", format_clock(session.elapsed_secs())),
            stat("Keystrokes", session.total_keystrokes().to_string()),
            stat("WPM", session.current_wpm().to_string()),
            Line::from(vec![Span::styled(format!("{:<13}", "Status"), dim), status]),
            stat("Breaks", session.break_count().to_string()),
        ];
        if self.monitor.recorder().active_session().is_some() {
            stats.push(Line::from(Span::styled("recording", dim)));
        }
        Paragraph::new(stats)
            .block(Block::bordered().title(" Session Stats "))
            .render(rows[1], buf);
    }

    fn render_main(&self, area: Rect, buf: &mut Buffer) {
        let session = self.monitor.session();
        let score = session.fatigue_score();
        let level = self.bands.classify(score);
        let over_threshold = session.policy().should_break(score);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(if over_threshold { 1 } else { 0 }),
                Constraint::Min(6),
                Constraint::Length(7),
            ])
            .split(area);

        Gauge::default()
            .block(Block::bordered().title(" Fatigue Score "))
            .gauge_style(Style::default().fg(level_color(level)))
            .percent(u16::from(score.min(100)))
            .label(format!("{score}/100"))
            .render(rows[0], buf);

        if over_threshold {
            Paragraph::new(Span::styled(
                "High Fatigue Detected! Consider taking a break.",
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ))
            .alignment(Alignment::Center)
            .render(rows[1], buf);
        }

        self.render_chart(rows[2], buf);
        self.render_typing_area(rows[3], buf);
    }

    fn render_chart(&self, area: Rect, buf: &mut Buffer) {
        let points: Vec<(f64, f64)> = self
            .monitor
            .history()
            .iter()
            .map(|&p| p.into())
            .collect();
        let bounds = charting::x_bounds(self.monitor.history());

        let datasets = vec![Dataset::default()
            .marker(Marker::Braille)
            .style(Style::default().fg(Color::Magenta))
            .graph_type(GraphType::Line)
            .data(&points)];

        Chart::new(datasets)
            .block(Block::bordered().title(" Score History "))
            .x_axis(
                Axis::default()
                    .bounds(bounds)
                    .labels(charting::x_labels(bounds))
                    .style(Style::default().add_modifier(Modifier::DIM)),
            )
            .y_axis(
                Axis::default()
                    .bounds([0.0, 100.0])
                    .labels(vec!["0".to_string(), "50".to_string(), "100".to_string()])
                    .style(Style::default().add_modifier(Modifier::DIM)),
            )
            .render(area, buf);
    }

    fn render_typing_area(&self, area: Rect, buf: &mut Buffer) {
        let session = self.monitor.session();
        let hint = match session.state() {
            SessionState::OnBreak => "Typing disabled during break time",
            SessionState::Idle => "Press ctrl+s to begin monitoring",
            SessionState::Monitoring => "Your typing patterns are being analyzed",
        };

        let inner_width = area.width.saturating_sub(2) as usize;
        let inner_height = area.height.saturating_sub(3) as usize;
        let shown = tail_fitting(self.typed, inner_width * inner_height);

        let text_style = if session.is_monitoring() {
            Style::default()
        } else {
            Style::default().add_modifier(Modifier::DIM)
        };
        let mut text = Text::from(Span::styled(shown.to_string(), text_style));
        text.push_line(Line::from(""));
        text.push_line(Line::from(Span::styled(
            hint,
            Style::default().add_modifier(Modifier::ITALIC | Modifier::DIM),
        )));

        Paragraph::new(text)
            .block(Block::bordered().title(" Typing Area "))
            .wrap(Wrap { trim: false })
            .render(area, buf);
    }

    fn render_toasts(&self, area: Rect, buf: &mut Buffer) {
        let mut y = area.y;
        for toast in self.monitor.toasts().visible() {
            let width = TOAST_WIDTH.min(area.width);
            let height = 4u16;
            if y + height > area.y + area.height {
                break;
            }
            let rect = Rect::new(area.x + area.width - width, y, width, height);
            Clear.render(rect, buf);
            Paragraph::new(toast.message.as_str())
                .block(
                    Block::bordered()
                        .title(format!(" {} ", toast.title))
                        .border_style(Style::default().fg(Color::Cyan)),
                )
                .wrap(Wrap { trim: true })
                .render(rect, buf);
            y += height;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::StaticIdentity;
    use crate::clock::ManualClock;
    use crate::policy::BreakPolicy;
    use crate::recorder::SessionRecorder;
    use crate::scoring::NoJitter;
    use crate::session::FatigueSession;
    use ratatui::{backend::TestBackend, Terminal};
    use std::sync::mpsc;
    use std::time::Duration;

    fn monitor() -> Monitor<ManualClock, NoJitter> {
        let clock = ManualClock::new(0);
        let session = FatigueSession::new(clock, NoJitter, BreakPolicy::default());
        let recorder = SessionRecorder::offline(Box::new(StaticIdentity::new(None)));
        let (tx, _rx) = mpsc::channel();
        Monitor::new(session, recorder, tx, Duration::from_secs(3_600))
    }

    fn draw(monitor: &Monitor<ManualClock, NoJitter>, typed: &str) -> String {
        let backend = TestBackend::new(100, 30);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal
            .draw(|f| {
                f.render_widget(
                    MonitorScreen {
                        monitor,
                        typed,
                        bands: LevelBands::default(),
                    },
                    f.area(),
                )
            })
            .unwrap();
        let buffer = terminal.backend().buffer();
        buffer.content.iter().map(|c| c.symbol()).collect()
    }

    #[test]
    fn idle_screen_shows_controls() {
        let content = draw(&monitor(), "");
        assert!(content.contains("Session Control"));
        assert!(content.contains("ctrl+s start"));
        assert!(content.contains("0/100"));
        assert!(content.contains("begin monitoring"));
    }

    #[test]
    fn break_screen_shows_countdown() {
        let mut monitor = monitor();
        monitor.start();
        monitor.take_break();
        let content = draw(&monitor, "hello");
        assert!(content.contains("Break Time"));
        assert!(content.contains("20s"));
        assert!(content.contains("On Break"));
        assert!(content.contains("Typing disabled"));
    }

    #[test]
    fn tiny_terminal_gets_a_notice() {
        let mut monitor = monitor();
        monitor.start();
        let backend = TestBackend::new(10, 4);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal
            .draw(|f| {
                f.render_widget(
                    MonitorScreen {
                        monitor: &monitor,
                        typed: "abc",
                        bands: LevelBands::default(),
                    },
                    f.area(),
                )
            })
            .unwrap();
        let content: String = terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|c| c.symbol())
            .collect();
        assert!(content.contains("small"));
    }

    #[test]
    fn tail_fitting_respects_width() {
        assert_eq!(tail_fitting("hello world", 5), "world");
        assert_eq!(tail_fitting("hi", 10), "hi");
        assert_eq!(tail_fitting("abc", 0), "");
        // wide characters take two columns
        assert_eq!(tail_fitting("a日本", 4), "日本");
        assert_eq!(tail_fitting("a日本", 3), "本");
    }
}
