pub mod beat;
pub mod tempo;
pub mod transport;
