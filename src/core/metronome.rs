use log::debug;
use tokio::sync::mpsc::{channel, Receiver, Sender};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant, Interval};

use crate::core::audio::{self, AudioService};
use crate::core::haptics;

//------------------------------------------------------------------//
//                            METRONOME                             //
//------------------------------------------------------------------//

pub const MIN_BPM: u16 = 30;
pub const MAX_BPM: u16 = 240;
pub const DEFAULT_BPM: u16 = 60;

#[derive(Debug)]
pub enum Message {
    // Start the beat; no-op when already running
    Start,
    // Stop the beat and cancel the pending tick; the beat counter keeps its value
    Stop,
    // Change the tempo; out-of-range values are clamped to [MIN_BPM, MAX_BPM]
    SetTempo(i64),
    // Flip the haptics toggle; takes effect on the next tick
    SetHaptics(bool),
    // Flip the sound toggle; also drives the audio asset lifecycle
    SetSound(bool),
    // Tear the metronome down, releasing the timer and the audio service
    Close,
}

/// The dispatcher's published state, sent after every handled control message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Snapshot {
    pub bpm: u16,
    pub running: bool,
    pub beat: u64,
    pub haptics_enabled: bool,
    pub sound_enabled: bool,
}

#[derive(Clone, Copy, Debug)]
pub enum Event {
    /// One beat fired; carries the new beat counter value
    Tick(u64),
    /// Control state changed
    State(Snapshot),
}

/// Clamps an arbitrary requested tempo into the supported range.
pub fn clamp_bpm(n: i64) -> u16 {
    n.clamp(i64::from(MIN_BPM), i64::from(MAX_BPM)) as u16
}

/// Beat period for a tempo: 60000 / bpm milliseconds.
pub fn period(bpm: u16) -> Duration {
    Duration::from_secs_f64(60.0 / f64::from(bpm))
}

pub struct Metronome {
    bpm: u16,
    running: bool,
    beat: u64,
    haptics_enabled: bool,
    sound_enabled: bool,
}

impl Metronome {
    //------------------------------------------------------------------//
    //                          Public Methods                          //
    //------------------------------------------------------------------//

    /// Spawns the dispatcher task together with its audio service.
    /// Control messages go in through `message_in`; ticks and state
    /// snapshots come out through `event_out`.
    pub fn spawn(message_in: Receiver<Message>, event_out: Sender<Event>) -> JoinHandle<()> {
        let (audio_out, audio_in) = channel::<audio::Message>(16);
        let audio_handle = AudioService::spawn(audio_in);
        tokio::spawn(async move {
            let mut metronome = Metronome::new(DEFAULT_BPM);
            // sound is on by default, so fetch the asset up front
            if metronome.sound_enabled {
                let _ = audio_out.send(audio::Message::Load).await;
            }
            metronome
                .event_loop(message_in, event_out, audio_out.clone())
                .await;
            // teardown: the timer is already gone, now release the audio side
            let _ = audio_out.send(audio::Message::Close).await;
            let _ = audio_handle.await;
        })
    }

    fn new(bpm: u16) -> Self {
        Self {
            bpm,
            running: false,
            beat: 0,
            haptics_enabled: true,
            sound_enabled: true,
        }
    }

    async fn event_loop(
        &mut self,
        mut message_in: Receiver<Message>,
        event_out: Sender<Event>,
        audio_out: Sender<audio::Message>,
    ) {
        // The single timer handle. `None` while stopped; replaced wholesale
        // whenever the period changes, so two tick streams can never overlap.
        let mut timer: Option<Interval> = None;
        loop {
            let msg = match timer.as_mut() {
                Some(interval) => {
                    tokio::select! {
                        _ = interval.tick() => {
                            self.dispatch_tick(&event_out, &audio_out).await;
                            continue;
                        }
                        msg = message_in.recv() => msg,
                    }
                }
                None => message_in.recv().await,
            };
            let msg = match msg {
                Some(msg) => msg,
                // all senders gone, treat it like a close
                None => break,
            };
            if self.handle(msg, &mut timer, &audio_out).await {
                break;
            }
            let _ = event_out.send(Event::State(self.snapshot())).await;
        }
    }

    /// Applies one control message. Returns true when the loop should exit.
    async fn handle(
        &mut self,
        msg: Message,
        timer: &mut Option<Interval>,
        audio_out: &Sender<audio::Message>,
    ) -> bool {
        match msg {
            Message::Start => {
                if self.start() {
                    self.install_timer(timer);
                }
            }
            Message::Stop => {
                if self.stop() {
                    *timer = None;
                }
            }
            Message::SetTempo(n) => {
                // restart semantics: the in-flight period is discarded and a
                // full fresh period begins at the new tempo
                if self.set_tempo(n) {
                    self.install_timer(timer);
                }
            }
            Message::SetHaptics(enabled) => self.haptics_enabled = enabled,
            Message::SetSound(enabled) => {
                self.sound_enabled = enabled;
                let msg = if enabled {
                    audio::Message::Load
                } else {
                    audio::Message::Unload
                };
                let _ = audio_out.send(msg).await;
            }
            Message::Close => {
                *timer = None;
                return true;
            }
        }
        false
    }

    async fn dispatch_tick(&mut self, event_out: &Sender<Event>, audio_out: &Sender<audio::Message>) {
        let beat = self.on_tick();
        let _ = event_out.send(Event::Tick(beat)).await;
        if self.haptics_enabled {
            haptics::beat_pulse();
        }
        if self.sound_enabled {
            // fire-and-forget: never wait on the audio service, and a full
            // queue just costs this beat its click
            if let Err(err) = audio_out.try_send(audio::Message::Play) {
                debug!("dropping tick playback: {}", err);
            }
        }
    }

    fn install_timer(&self, timer: &mut Option<Interval>) {
        // cancel the old handle before creating its replacement
        timer.take();
        let period = period(self.bpm);
        // first tick fires one full period from now
        *timer = Some(interval_at(Instant::now() + period, period));
    }

    //------------------------------------------------------------------//
    //                           Transitions                            //
    //------------------------------------------------------------------//

    /// Returns true when the metronome actually transitioned to running.
    fn start(&mut self) -> bool {
        if self.running {
            return false;
        }
        self.running = true;
        true
    }

    /// Returns true when the metronome actually transitioned to stopped.
    fn stop(&mut self) -> bool {
        if !self.running {
            return false;
        }
        self.running = false;
        true
    }

    /// Returns true when the timer has to be replaced (tempo changed while
    /// running). A request that clamps back to the current value is a no-op.
    fn set_tempo(&mut self, n: i64) -> bool {
        let bpm = clamp_bpm(n);
        if bpm == self.bpm {
            return false;
        }
        self.bpm = bpm;
        self.running
    }

    fn on_tick(&mut self) -> u64 {
        self.beat += 1;
        self.beat
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            bpm: self.bpm,
            running: self.running,
            beat: self.beat,
            haptics_enabled: self.haptics_enabled,
            sound_enabled: self.sound_enabled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[test]
    fn tempo_requests_are_clamped() {
        assert_eq!(clamp_bpm(120), 120);
        assert_eq!(clamp_bpm(30), 30);
        assert_eq!(clamp_bpm(240), 240);
        assert_eq!(clamp_bpm(300), 240);
        assert_eq!(clamp_bpm(10), 30);
        assert_eq!(clamp_bpm(i64::MIN), 30);
        assert_eq!(clamp_bpm(i64::MAX), 240);
    }

    #[test]
    fn period_is_60000_over_bpm_ms() {
        assert_eq!(period(60), Duration::from_millis(1000));
        assert_eq!(period(120), Duration::from_millis(500));
        assert_eq!(period(240), Duration::from_millis(250));
    }

    #[test]
    fn start_is_idempotent() {
        let mut m = Metronome::new(DEFAULT_BPM);
        assert!(m.start());
        assert!(!m.start());
        assert!(m.snapshot().running);
    }

    #[test]
    fn stop_is_idempotent_and_freezes_the_beat_counter() {
        let mut m = Metronome::new(DEFAULT_BPM);
        assert!(!m.stop());
        m.start();
        m.on_tick();
        m.on_tick();
        m.on_tick();
        assert!(m.stop());
        assert!(!m.stop());
        let snapshot = m.snapshot();
        assert!(!snapshot.running);
        assert_eq!(snapshot.beat, 3);
    }

    #[test]
    fn set_tempo_only_restarts_the_timer_when_it_changes_something() {
        let mut m = Metronome::new(DEFAULT_BPM);
        // stopped: never restarts
        assert!(!m.set_tempo(120));
        assert_eq!(m.snapshot().bpm, 120);
        m.start();
        assert!(m.set_tempo(180));
        // clamps back to the current value: no-op
        m.set_tempo(240);
        assert!(!m.set_tempo(300));
        assert_eq!(m.snapshot().bpm, 240);
        m.set_tempo(30);
        assert!(!m.set_tempo(10));
        assert_eq!(m.snapshot().bpm, 30);
    }

    async fn next_tick(events: &mut Receiver<Event>) -> u64 {
        loop {
            match events.recv().await.expect("metronome closed early") {
                Event::Tick(beat) => return beat,
                Event::State(_) => {}
            }
        }
    }

    async fn next_state(events: &mut Receiver<Event>) -> Snapshot {
        loop {
            match events.recv().await.expect("metronome closed early") {
                Event::State(snapshot) => return snapshot,
                Event::Tick(_) => {}
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_arrive_once_per_period() {
        let (messages_out, messages_in) = channel(10);
        let (events_out, mut events_in) = channel(64);
        let handle = Metronome::spawn(messages_in, events_out);

        messages_out.send(Message::Start).await.unwrap();
        assert!(next_state(&mut events_in).await.running);

        let started = Instant::now();
        for expected in 1..=5u64 {
            assert_eq!(next_tick(&mut events_in).await, expected);
        }
        // default tempo is 60 BPM: five beats take exactly five seconds on
        // the paused clock
        assert_eq!(started.elapsed(), Duration::from_secs(5));

        messages_out.send(Message::Close).await.unwrap();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_start_does_not_double_the_tick_stream() {
        let (messages_out, messages_in) = channel(10);
        let (events_out, mut events_in) = channel(64);
        let handle = Metronome::spawn(messages_in, events_out);

        messages_out.send(Message::Start).await.unwrap();
        messages_out.send(Message::Start).await.unwrap();
        next_state(&mut events_in).await;
        next_state(&mut events_in).await;

        let started = Instant::now();
        assert_eq!(next_tick(&mut events_in).await, 1);
        assert_eq!(started.elapsed(), Duration::from_secs(1));
        assert_eq!(next_tick(&mut events_in).await, 2);
        assert_eq!(started.elapsed(), Duration::from_secs(2));

        messages_out.send(Message::Close).await.unwrap();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn retempo_while_running_replaces_the_timer_without_a_double_tick() {
        let (messages_out, messages_in) = channel(10);
        let (events_out, mut events_in) = channel(64);
        let handle = Metronome::spawn(messages_in, events_out);

        messages_out.send(Message::Start).await.unwrap();
        next_state(&mut events_in).await;
        assert_eq!(next_tick(&mut events_in).await, 1);

        let retuned = Instant::now();
        messages_out.send(Message::SetTempo(120)).await.unwrap();
        let snapshot = next_state(&mut events_in).await;
        assert_eq!(snapshot.bpm, 120);

        // a single fresh 500 ms period, not a leftover of the old 1000 ms one
        assert_eq!(next_tick(&mut events_in).await, 2);
        assert_eq!(retuned.elapsed(), Duration::from_millis(500));
        assert_eq!(next_tick(&mut events_in).await, 3);
        assert_eq!(retuned.elapsed(), Duration::from_millis(1000));

        messages_out.send(Message::Close).await.unwrap();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_the_pending_tick_and_restart_resumes_the_counter() {
        let (messages_out, messages_in) = channel(10);
        let (events_out, mut events_in) = channel(64);
        let handle = Metronome::spawn(messages_in, events_out);

        messages_out.send(Message::Start).await.unwrap();
        next_state(&mut events_in).await;
        assert_eq!(next_tick(&mut events_in).await, 1);

        messages_out.send(Message::Stop).await.unwrap();
        let snapshot = next_state(&mut events_in).await;
        assert!(!snapshot.running);
        assert_eq!(snapshot.beat, 1);

        // well past where the cancelled tick would have fired
        sleep(Duration::from_secs(3)).await;
        assert!(events_in.try_recv().is_err());

        messages_out.send(Message::Start).await.unwrap();
        next_state(&mut events_in).await;
        assert_eq!(next_tick(&mut events_in).await, 2);

        messages_out.send(Message::Close).await.unwrap();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn toggles_do_not_disturb_the_cadence() {
        let (messages_out, messages_in) = channel(10);
        let (events_out, mut events_in) = channel(64);
        let handle = Metronome::spawn(messages_in, events_out);

        messages_out.send(Message::Start).await.unwrap();
        next_state(&mut events_in).await;

        let started = Instant::now();
        assert_eq!(next_tick(&mut events_in).await, 1);

        messages_out.send(Message::SetSound(false)).await.unwrap();
        messages_out.send(Message::SetHaptics(false)).await.unwrap();
        let snapshot = next_state(&mut events_in).await;
        assert!(!snapshot.sound_enabled);
        let snapshot = next_state(&mut events_in).await;
        assert!(!snapshot.haptics_enabled);

        assert_eq!(next_tick(&mut events_in).await, 2);
        assert_eq!(started.elapsed(), Duration::from_secs(2));

        messages_out.send(Message::Close).await.unwrap();
        handle.await.unwrap();
    }
}
