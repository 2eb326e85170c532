use tui::buffer::Buffer;
use tui::layout::{Alignment, Rect};
use tui::style::{Color, Modifier, Style};
use tui::text::{Span, Spans};
use tui::widgets::{Block, Borders, Paragraph, Widget};

use crate::view::model::session::Session;

/// Transport state, feature toggles, and the key legend.
pub struct TransportWidget<'a> {
    session: &'a Session,
}

impl<'a> TransportWidget<'a> {
    pub fn new(session: &'a Session) -> Self {
        Self { session }
    }

    fn toggle_span(label: &str, enabled: bool) -> Span<'_> {
        let text = format!("{} {}", label, if enabled { "ON" } else { "OFF" });
        let style = if enabled {
            Style::default().fg(Color::Blue)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        Span::styled(text, style)
    }
}

impl<'a> Widget for TransportWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let state = if self.session.running {
            Span::styled(
                "RUNNING",
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD),
            )
        } else {
            Span::styled("STOPPED", Style::default().fg(Color::Red))
        };
        let toggles = Spans::from(vec![
            Self::toggle_span("Sound", self.session.sound_enabled),
            Span::raw("   "),
            Self::toggle_span("Haptics", self.session.haptics_enabled),
        ]);
        let legend = Spans::from(Span::styled(
            "space start/stop   +/- tempo   s sound   h haptics   q quit",
            Style::default().fg(Color::DarkGray),
        ));
        Paragraph::new(vec![Spans::from(state), toggles, legend])
            .alignment(Alignment::Center)
            .block(Block::default().title("Transport").borders(Borders::ALL))
            .render(area, buf);
    }
}
