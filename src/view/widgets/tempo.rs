use tui::buffer::Buffer;
use tui::layout::{Alignment, Rect};
use tui::style::{Color, Modifier, Style};
use tui::text::{Span, Spans};
use tui::widgets::{Block, Borders, Paragraph, Widget};

use crate::view::model::session::Session;

/// The tempo readout with its increment/decrement affordances. The +/-
/// markers grey out at the 30/240 bounds, mirroring the pre-guards the
/// key handling applies.
pub struct TempoWidget<'a> {
    session: &'a Session,
}

impl<'a> TempoWidget<'a> {
    pub fn new(session: &'a Session) -> Self {
        Self { session }
    }

    fn bound_style(enabled: bool) -> Style {
        if enabled {
            Style::default().fg(Color::Blue)
        } else {
            Style::default().fg(Color::DarkGray)
        }
    }
}

impl<'a> Widget for TempoWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let line = Spans::from(vec![
            Span::styled("− ", Self::bound_style(self.session.can_decrement())),
            Span::styled(
                format!("{} BPM", self.session.bpm),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::styled(" +", Self::bound_style(self.session.can_increment())),
        ]);
        Paragraph::new(line)
            .alignment(Alignment::Center)
            .block(Block::default().title("Tempo").borders(Borders::ALL))
            .render(area, buf);
    }
}
