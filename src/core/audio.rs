use std::path::{Path, PathBuf};

use log::warn;
use symphonia::core::audio::{RawSampleBuffer, SignalSpec};
use symphonia::core::codecs::{Decoder, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use thiserror::Error;
use tokio::sync::mpsc::Receiver;
use tokio::task::JoinHandle;

use crate::core::output::{OutputError, TickOutput};

//------------------------------------------------------------------//
//                          AUDIO SERVICE                           //
//------------------------------------------------------------------//

#[derive(Debug)]
pub enum Message {
    // Fetch and decode the tick asset; no-op when already loaded
    Load,
    // Replay the tick from its start position
    Play,
    // Release the decoded asset and the output stream
    Unload,
    // Unload and exit the service task
    Close,
}

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("no tick sound asset found (tried {0:?})")]
    AssetMissing(Vec<PathBuf>),
    #[error("failed to read tick sound: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to decode tick sound: {0}")]
    Decode(#[from] SymphoniaError),
    #[error("audio output error: {0}")]
    Output(#[from] OutputError),
}

#[derive(Copy, Clone, PartialEq)]
enum ServiceState {
    Unloaded,
    Loading,
    Loaded,
}

/// The decoded tick asset: interleaved f32 frames ready to hand to the
/// output stream, plus the spec the stream was opened with.
struct ClickSound {
    bytes: Vec<u8>,
}

/// Owns the tick sound and the stream it plays on. Every failure is
/// reported through the log and recovered locally; the metronome keeps
/// beating silently when audio is unavailable.
pub struct AudioService {
    state: ServiceState,
    sources: Vec<PathBuf>,
    sound: Option<ClickSound>,
    output: Option<TickOutput>,
}

impl AudioService {
    //------------------------------------------------------------------//
    //                          Public Methods                          //
    //------------------------------------------------------------------//

    /// Spawns the service task. Messages are handled strictly in order,
    /// which is what makes `Load` safe against re-entry: a second `Load`
    /// (or a lazy one triggered by `Play`) queues behind the first.
    pub fn spawn(mut message_in: Receiver<Message>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut service = AudioService::new();
            while let Some(msg) = message_in.recv().await {
                match msg {
                    Message::Load => service.load(),
                    Message::Play => service.play(),
                    Message::Unload => service.unload(),
                    Message::Close => {
                        service.unload();
                        break;
                    }
                }
            }
        })
    }

    pub fn new() -> Self {
        Self::with_sources(vec![
            PathBuf::from("assets/tick.mp3"),
            PathBuf::from("assets/tick.wav"),
        ])
    }

    /// Builds a service that looks for its asset at the given paths, first
    /// hit wins. Lets tests run against a missing or fake asset.
    pub fn with_sources(sources: Vec<PathBuf>) -> Self {
        Self {
            state: ServiceState::Unloaded,
            sources,
            sound: None,
            output: None,
        }
    }

    /// Locates, decodes, and prepares the tick asset. A failure leaves the
    /// service unloaded and the metronome silent; it is logged, not raised.
    pub fn load(&mut self) {
        if self.state != ServiceState::Unloaded {
            return;
        }
        self.state = ServiceState::Loading;
        match self.try_load() {
            Ok(()) => self.state = ServiceState::Loaded,
            Err(err) => {
                warn!("failed to load tick sound: {}", err);
                self.sound = None;
                self.output = None;
                self.state = ServiceState::Unloaded;
            }
        }
    }

    /// Replays the tick from its start. Lazily loads when needed; every
    /// failure is logged and the next play attempts again independently.
    pub fn play(&mut self) {
        if self.state == ServiceState::Unloaded {
            self.load();
        }
        if !self.is_loaded() {
            return;
        }
        let (Some(sound), Some(output)) = (&self.sound, &self.output) else {
            return;
        };
        if let Err(err) = output.replay(&sound.bytes) {
            warn!("failed to play tick sound: {}", err);
        }
    }

    /// Drops the decoded asset and closes the output stream. Idempotent.
    pub fn unload(&mut self) {
        self.sound = None;
        self.output = None;
        self.state = ServiceState::Unloaded;
    }

    pub fn is_loaded(&self) -> bool {
        self.state == ServiceState::Loaded
    }

    //------------------------------------------------------------------//
    //                             Loading                              //
    //------------------------------------------------------------------//

    fn try_load(&mut self) -> Result<(), AudioError> {
        let path = self.locate_asset()?;
        let (bytes, spec) = decode_asset(&path)?;
        let output = TickOutput::open(spec)?;
        self.sound = Some(ClickSound { bytes });
        self.output = Some(output);
        Ok(())
    }

    fn locate_asset(&self) -> Result<PathBuf, AudioError> {
        self.sources
            .iter()
            .find(|path| path.is_file())
            .cloned()
            .ok_or_else(|| AudioError::AssetMissing(self.sources.clone()))
    }
}

/// Decodes the whole asset into one interleaved f32 buffer. Tick sounds are
/// a few tens of milliseconds, so buffering them completely is what lets
/// `play` restart from the top with a single write.
fn decode_asset(path: &Path) -> Result<(Vec<u8>, SignalSpec), AudioError> {
    let src = std::fs::File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(src), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut format = probed.format;
    let mut decoder = get_decoder(&format)?;

    let mut bytes = Vec::new();
    let mut spec = None;
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(err))
                if err.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(err) => return Err(err.into()),
        };
        match decoder.decode(&packet) {
            Ok(decoded) => {
                let decoded_spec = *decoded.spec();
                let duration = decoded.capacity() as u64;
                let mut sample_buf = RawSampleBuffer::<f32>::new(duration, decoded_spec);
                sample_buf.copy_interleaved_ref(decoded);
                bytes.extend_from_slice(sample_buf.as_bytes());
                spec.get_or_insert(decoded_spec);
            }
            Err(SymphoniaError::DecodeError(err)) => {
                // not fatal, skip the packet and keep going
                warn!("decode error in tick sound: {}", err);
            }
            Err(err) => return Err(err.into()),
        }
    }

    let spec = spec.ok_or(AudioError::Decode(SymphoniaError::DecodeError(
        "tick sound contained no audio",
    )))?;
    Ok((bytes, spec))
}

fn get_decoder(format: &Box<dyn FormatReader>) -> Result<Box<dyn Decoder>, AudioError> {
    let track = format.default_track().ok_or(AudioError::Decode(
        SymphoniaError::Unsupported("no default track in tick sound"),
    ))?;
    let dec_opts = DecoderOptions {
        verify: true,
        ..Default::default()
    };
    let decoder = symphonia::default::get_codecs().make(&track.codec_params, &dec_opts)?;
    Ok(decoder)
}
