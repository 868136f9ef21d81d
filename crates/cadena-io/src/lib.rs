//! File I/O for cadena chains.
//!
//! This crate bridges WAV files and the routing core:
//!
//! - **WAV access**: [`read_wav`] and [`write_wav`] move mono sample
//!   buffers in and out of files, [`read_wav_info`] peeks at headers.
//! - **Media loading**: [`open_media`] turns a WAV file into a
//!   [`cadena_core::MediaHandle`] ready to feed a chain.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use cadena_core::ChainManager;
//! use cadena_io::{open_media, read_wav_info};
//!
//! let info = read_wav_info("talk.wav")?;
//! let media = open_media("talk.wav")?;
//! let mut chain = ChainManager::new(media, info.sample_rate as f32);
//! chain.set_enabled(true)?;
//! ```

mod media;
mod wav;

pub use media::open_media;
pub use wav::{WavFormat, WavInfo, WavSpec, read_wav, read_wav_info, write_wav};

/// Error types for file and media loading operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// WAV file read/write error.
    #[error("WAV file error: {0}")]
    Wav(#[from] hound::Error),

    /// The file decoded to zero samples, so it cannot feed a chain.
    #[error("media is empty: {0}")]
    EmptyMedia(String),

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type for I/O operations.
pub type Result<T> = std::result::Result<T, Error>;
