use std::io;
use std::time::Instant;

use crossterm::event::{self, DisableMouseCapture, EnableMouseCapture, KeyCode};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use log::warn;
use tokio::sync::mpsc::{channel, Receiver, Sender};
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, Interval};
use tui::backend::{Backend, CrosstermBackend};
use tui::layout::{Constraint, Direction, Layout};
use tui::{Frame, Terminal};

use crate::core::metronome::{self, Metronome};
use crate::view::model::session::Session;
use crate::view::widgets::beat::BeatWidget;
use crate::view::widgets::tempo::TempoWidget;
use crate::view::widgets::transport::TransportWidget;

/// Key presses translated into UI intents.
#[derive(Clone, Debug)]
pub enum Event {
    ToggleTransport,
    IncrementTempo,
    DecrementTempo,
    ToggleSound,
    ToggleHaptics,
    Quit,
    Unknown,
}

pub struct App {
    session: Session,
}

impl Default for App {
    fn default() -> Self {
        Self {
            session: Session::default(),
        }
    }
}

impl App {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn run(mut self) -> io::Result<()> {
        // init terminal
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        // create all message passing channels
        let (key_events_out, mut key_events_in) = channel::<Event>(10);
        let (metro_messages_out, metro_messages_in) = channel::<metronome::Message>(10);
        let (metro_events_out, mut metro_events_in) = channel::<metronome::Event>(64);
        // spawn the input task and the metronome
        let _kb_join_handle = App::spawn_key_handler(key_events_out);
        let metro_handle = Metronome::spawn(metro_messages_in, metro_events_out);
        // redraw cadence for the flash animation, independent of the beat
        let mut frames = interval(Duration::from_millis(33));
        // execute main UI loop
        loop {
            // draw to terminal
            terminal.draw(|f| self.layout(f))?;
            // get events async, update state
            let quit = self
                .update(
                    &mut key_events_in,
                    &metro_messages_out,
                    &mut metro_events_in,
                    &mut frames,
                )
                .await;
            if quit {
                break;
            }
        }
        // orderly teardown: the dispatcher drops its timer and closes the
        // audio service before we restore the terminal
        let _ = metro_messages_out.send(metronome::Message::Close).await;
        let _ = metro_handle.await;
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;
        Ok(())
    }

    fn spawn_key_handler(app: Sender<Event>) -> JoinHandle<()> {
        // crossterm's event::read blocks, so keep it off the async workers
        tokio::task::spawn_blocking(move || loop {
            let read = match event::read() {
                Ok(read) => read,
                Err(_) => break,
            };
            if let crossterm::event::Event::Key(key) = read {
                let ev = match key.code {
                    KeyCode::Char(' ') => Event::ToggleTransport,
                    KeyCode::Char('+') | KeyCode::Char('k') | KeyCode::Up => Event::IncrementTempo,
                    KeyCode::Char('-') | KeyCode::Char('j') | KeyCode::Down => Event::DecrementTempo,
                    KeyCode::Char('s') => Event::ToggleSound,
                    KeyCode::Char('h') => Event::ToggleHaptics,
                    KeyCode::Char('q') => Event::Quit,
                    _ => Event::Unknown,
                };
                let quitting = matches!(ev, Event::Quit);
                if app.blocking_send(ev).is_err() || quitting {
                    break;
                }
            }
        })
    }

    /// Updates the app's model from whichever source fires first. Returns
    /// true when the user asked to quit.
    async fn update(
        &mut self,
        key_events_in: &mut Receiver<Event>,
        metro_messages_out: &Sender<metronome::Message>,
        metro_events_in: &mut Receiver<metronome::Event>,
        frames: &mut Interval,
    ) -> bool {
        tokio::select! {
            Some(ev) = key_events_in.recv() => {
                self.handle_key_event(ev, metro_messages_out).await
            }
            Some(ev) = metro_events_in.recv() => {
                self.handle_metronome_event(ev);
                false
            }
            _ = frames.tick() => false,
        }
    }

    async fn handle_key_event(
        &mut self,
        ev: Event,
        metro_messages_out: &Sender<metronome::Message>,
    ) -> bool {
        use metronome::Message;
        let msg = match ev {
            Event::ToggleTransport => Some(if self.session.running {
                Message::Stop
            } else {
                Message::Start
            }),
            Event::IncrementTempo if self.session.can_increment() => {
                Some(Message::SetTempo(i64::from(self.session.bpm) + 1))
            }
            Event::DecrementTempo if self.session.can_decrement() => {
                Some(Message::SetTempo(i64::from(self.session.bpm) - 1))
            }
            Event::ToggleSound => Some(Message::SetSound(!self.session.sound_enabled)),
            Event::ToggleHaptics => Some(Message::SetHaptics(!self.session.haptics_enabled)),
            Event::Quit => return true,
            // at-bound tempo nudges and unmapped keys are ignored
            Event::IncrementTempo | Event::DecrementTempo | Event::Unknown => None,
        };
        if let Some(msg) = msg {
            if let Err(err) = metro_messages_out.send(msg).await {
                warn!("metronome channel closed: {}", err);
            }
        }
        false
    }

    fn handle_metronome_event(&mut self, ev: metronome::Event) {
        match ev {
            metronome::Event::Tick(beat) => self.session.apply_tick(beat, Instant::now()),
            metronome::Event::State(snapshot) => self.session.apply_state(snapshot),
        }
    }

    /// define how the app should look like
    fn layout<B: Backend>(&mut self, f: &mut Frame<B>) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints(
                [
                    Constraint::Length(3),
                    Constraint::Length(3),
                    Constraint::Min(5),
                ]
                .as_ref(),
            )
            .split(f.size());
        f.render_widget(TempoWidget::new(&self.session), chunks[0]);
        f.render_widget(BeatWidget::new(&self.session, Instant::now()), chunks[1]);
        f.render_widget(TransportWidget::new(&self.session), chunks[2]);
    }
}
