pub mod audio;
pub mod haptics;
pub mod metronome;
pub mod output;
