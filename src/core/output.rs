use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("invalid playback spec for the tick sound")]
    InvalidSpec,
    #[error("audio playback is not supported on this platform")]
    Unsupported,
    #[error("{0}")]
    Backend(String),
}

pub use backend::TickOutput;

#[cfg(target_os = "linux")]
mod backend {
    use libpulse_binding as pulse;
    use libpulse_simple_binding as psimple;
    use log::warn;
    use symphonia::core::audio::{Channels, SignalSpec};

    use super::OutputError;

    /// A PulseAudio playback stream opened for the tick sound's spec.
    pub struct TickOutput {
        pa: psimple::Simple,
    }

    impl TickOutput {
        pub fn open(spec: SignalSpec) -> Result<Self, OutputError> {
            let pa_spec = pulse::sample::Spec {
                format: pulse::sample::Format::FLOAT32NE,
                channels: spec.channels.count() as u8,
                rate: spec.rate,
            };
            if !pa_spec.is_valid() {
                return Err(OutputError::InvalidSpec);
            }

            let pa_ch_map = map_channels_to_pa_channelmap(spec.channels);
            let pa = psimple::Simple::new(
                None,                               // Use default server
                "beat",                             // Application name
                pulse::stream::Direction::Playback, // Playback stream
                None,                               // Default playback device
                "Metronome tick",                   // Description of the stream
                &pa_spec,                           // Signal specification
                pa_ch_map.as_ref(),                 // Channel map
                None,                               // Custom buffering attributes
            )
            .map_err(|err| OutputError::Backend(format!("{err}")))?;
            Ok(Self { pa })
        }

        /// Drops whatever is still buffered and writes the click from its
        /// start, so rapid consecutive plays each produce an audible tick.
        pub fn replay(&self, bytes: &[u8]) -> Result<(), OutputError> {
            self.pa
                .flush()
                .map_err(|err| OutputError::Backend(format!("{err}")))?;
            self.pa
                .write(bytes)
                .map_err(|err| OutputError::Backend(format!("{err}")))
        }
    }

    /// Maps the tick sound's Symphonia `Channels` to a PulseAudio channel map.
    fn map_channels_to_pa_channelmap(channels: Channels) -> Option<pulse::channelmap::Map> {
        let mut map: pulse::channelmap::Map = Default::default();
        map.init();
        map.set_len(channels.count() as u8);

        let is_mono = channels.count() == 1;

        for (i, channel) in channels.iter().enumerate() {
            map.get_mut()[i] = match channel {
                Channels::FRONT_LEFT if is_mono => pulse::channelmap::Position::Mono,
                Channels::FRONT_LEFT => pulse::channelmap::Position::FrontLeft,
                Channels::FRONT_RIGHT => pulse::channelmap::Position::FrontRight,
                Channels::FRONT_CENTRE => pulse::channelmap::Position::FrontCenter,
                Channels::LFE1 => pulse::channelmap::Position::Lfe,
                _ => {
                    // tick assets are mono or stereo; anything else falls back
                    // to PulseAudio's default mapping
                    warn!("failed to map channel {:?} to output", channel);
                    return None;
                }
            }
        }

        Some(map)
    }
}

#[cfg(not(target_os = "linux"))]
mod backend {
    use symphonia::core::audio::SignalSpec;

    use super::OutputError;

    /// Placeholder backend: platforms without PulseAudio run silently and
    /// the audio service stays unloaded.
    pub struct TickOutput;

    impl TickOutput {
        pub fn open(_spec: SignalSpec) -> Result<Self, OutputError> {
            Err(OutputError::Unsupported)
        }

        pub fn replay(&self, _bytes: &[u8]) -> Result<(), OutputError> {
            Ok(())
        }
    }
}
