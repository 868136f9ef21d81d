//! Turning files into live media handles.

use std::path::Path;

use cadena_core::{BufferStream, MediaHandle};

use crate::{Error, Result, read_wav};

/// Opens a WAV file as a playable media element.
///
/// The file is decoded to mono up front and wrapped in a
/// [`BufferStream`], so the returned handle behaves like an element
/// that is already playing: it produces samples when pulled and runs
/// dry at the end.
///
/// # Errors
///
/// [`Error::Wav`] if the file cannot be decoded, [`Error::EmptyMedia`]
/// if it decodes to zero samples.
pub fn open_media<P: AsRef<Path>>(path: P) -> Result<MediaHandle> {
    let (samples, spec) = read_wav(&path)?;
    if samples.is_empty() {
        return Err(Error::EmptyMedia(path.as_ref().display().to_string()));
    }
    Ok(MediaHandle::new(BufferStream::new(
        samples,
        spec.sample_rate as f32,
    )))
}
