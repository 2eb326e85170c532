//! Best-effort haptic feedback: one light pulse per beat.
//!
//! Only the mobile targets carry a vibrator, and reaching it goes through
//! the platform embedder rather than anything this crate links against.
//! The call surface is the same everywhere so the dispatcher can fire
//! unconditionally; where no pulse can be produced the call is a no-op.

use std::sync::Once;

use log::debug;

static DROPPED_NOTE: Once = Once::new();

/// Fires a single light vibration pulse. Never blocks and never fails:
/// missing hardware and platform errors are swallowed, with a one-time
/// debug note so a silent device can still be diagnosed.
pub fn beat_pulse() {
    if let Err(reason) = platform::pulse() {
        DROPPED_NOTE.call_once(|| debug!("haptic pulses dropped: {}", reason));
    }
}

#[cfg(any(target_os = "android", target_os = "ios"))]
mod platform {
    // A light impact pulse would go through the platform vibrator service;
    // those bindings live in the mobile embedder, not here.
    pub fn pulse() -> Result<(), &'static str> {
        Err("vibrator bindings are not linked into this build")
    }
}

#[cfg(not(any(target_os = "android", target_os = "ios")))]
mod platform {
    pub fn pulse() -> Result<(), &'static str> {
        Err("no haptic hardware on this platform")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn beat_pulse_is_always_safe_to_call() {
        // unsupported platforms swallow the pulse without panicking,
        // however often it fires
        for _ in 0..10 {
            beat_pulse();
        }
    }
}
