use std::time::{Duration, Instant};

use crate::core::metronome::{Snapshot, DEFAULT_BPM, MAX_BPM, MIN_BPM};

//------------------------------------------------------------------//
//                             Session                              //
//------------------------------------------------------------------//

/// How long the beat dot stays lit after a tick.
pub const FLASH_WINDOW: Duration = Duration::from_millis(150);

/// The view's mirror of the dispatcher's published state, plus the
/// timestamp that drives the beat-flash animation.
#[derive(Debug)]
pub struct Session {
    pub bpm: u16,
    pub running: bool,
    pub beat: u64,
    pub haptics_enabled: bool,
    pub sound_enabled: bool,
    last_beat_at: Option<Instant>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            bpm: DEFAULT_BPM,
            running: false,
            beat: 0,
            haptics_enabled: true,
            sound_enabled: true,
            last_beat_at: None,
        }
    }
}

impl Session {
    /// Takes over a state snapshot published by the dispatcher.
    pub fn apply_state(&mut self, snapshot: Snapshot) {
        self.bpm = snapshot.bpm;
        self.running = snapshot.running;
        self.beat = snapshot.beat;
        self.haptics_enabled = snapshot.haptics_enabled;
        self.sound_enabled = snapshot.sound_enabled;
        if !self.running {
            // stopped metronomes show a dark dot immediately
            self.last_beat_at = None;
        }
    }

    /// Records a tick for the flash animation and the beat readout.
    pub fn apply_tick(&mut self, beat: u64, at: Instant) {
        self.beat = beat;
        self.last_beat_at = Some(at);
    }

    /// Whether the beat dot is lit at `now`.
    pub fn flash_active(&self, now: Instant) -> bool {
        self.running
            && self
                .last_beat_at
                .map_or(false, |at| now.duration_since(at) < FLASH_WINDOW)
    }

    // The +/- controls disable themselves at the bounds; the dispatcher
    // clamps regardless, these just keep the UI honest.

    pub fn can_increment(&self) -> bool {
        self.bpm < MAX_BPM
    }

    pub fn can_decrement(&self) -> bool {
        self.bpm > MIN_BPM
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(bpm: u16, running: bool) -> Snapshot {
        Snapshot {
            bpm,
            running,
            beat: 0,
            haptics_enabled: true,
            sound_enabled: true,
        }
    }

    #[test]
    fn increment_and_decrement_guards_track_the_bounds() {
        let mut session = Session::default();
        assert!(session.can_increment());
        assert!(session.can_decrement());

        session.apply_state(snapshot(MAX_BPM, false));
        assert!(!session.can_increment());
        assert!(session.can_decrement());

        session.apply_state(snapshot(MIN_BPM, false));
        assert!(session.can_increment());
        assert!(!session.can_decrement());
    }

    #[test]
    fn flash_decays_after_the_window() {
        let mut session = Session::default();
        session.apply_state(snapshot(60, true));

        let at = Instant::now();
        session.apply_tick(1, at);
        assert!(session.flash_active(at));
        assert!(session.flash_active(at + Duration::from_millis(100)));
        assert!(!session.flash_active(at + Duration::from_millis(200)));
    }

    #[test]
    fn stopping_clears_the_flash() {
        let mut session = Session::default();
        session.apply_state(snapshot(60, true));

        let at = Instant::now();
        session.apply_tick(3, at);
        assert!(session.flash_active(at));

        let mut stopped = snapshot(60, false);
        stopped.beat = 3;
        session.apply_state(stopped);
        assert!(!session.flash_active(at));
        assert_eq!(session.beat, 3);
    }
}
