use std::time::Instant;

use tui::buffer::Buffer;
use tui::layout::{Alignment, Rect};
use tui::style::{Color, Modifier, Style};
use tui::text::{Span, Spans};
use tui::widgets::{Block, Borders, Paragraph, Widget};

use crate::view::model::session::Session;

/// The beat-flash dot and counter. Lit briefly after every tick while
/// running, dark otherwise.
pub struct BeatWidget<'a> {
    session: &'a Session,
    now: Instant,
}

impl<'a> BeatWidget<'a> {
    pub fn new(session: &'a Session, now: Instant) -> Self {
        Self { session, now }
    }
}

impl<'a> Widget for BeatWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let dot = if self.session.flash_active(self.now) {
            Span::styled(
                "●",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )
        } else {
            Span::styled("○", Style::default().fg(Color::DarkGray))
        };
        let line = Spans::from(vec![
            dot,
            Span::raw(format!("  beat {}", self.session.beat)),
        ]);
        Paragraph::new(line)
            .alignment(Alignment::Center)
            .block(Block::default().title("Beat").borders(Borders::ALL))
            .render(area, buf);
    }
}
