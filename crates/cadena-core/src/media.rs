//! Media sources that feed a processing chain.
//!
//! A [`MediaHandle`] stands for an element that produces audio on its
//! own schedule. The routing layer never starts or stops it; the handle
//! is assumed playable before it is attached, and it keeps producing
//! whether or not anything taps it. Tapping is exclusive: one handle
//! feeds at most one chain at a time.

use alloc::{boxed::Box, rc::Rc, vec::Vec};
use core::cell::RefCell;

/// Anything that can be pulled for mono samples.
pub trait MediaStream {
    /// Fills `out` from the front, returning how many samples were
    /// written. A return shorter than `out` means the stream ran dry;
    /// callers treat the rest as silence.
    fn pull(&mut self, out: &mut [f32]) -> usize;

    /// Native sample rate of the stream in Hz.
    fn sample_rate(&self) -> f32;
}

struct Inner {
    stream: Option<Box<dyn MediaStream>>,
    claimed: bool,
}

/// Shared handle to one media element.
///
/// Clones refer to the same element, so a claim taken through one clone
/// is visible through all of them.
#[derive(Clone)]
pub struct MediaHandle {
    inner: Rc<RefCell<Inner>>,
}

impl MediaHandle {
    /// Wraps a live stream.
    #[must_use]
    pub fn new(stream: impl MediaStream + 'static) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                stream: Some(Box::new(stream)),
                claimed: false,
            })),
        }
    }

    /// Creates a handle with no stream behind it.
    ///
    /// Useful for exercising the not-yet-available path; attach a real
    /// stream later with [`attach_stream`](Self::attach_stream).
    #[must_use]
    pub fn detached() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                stream: None,
                claimed: false,
            })),
        }
    }

    /// Installs (or replaces) the stream behind this handle.
    pub fn attach_stream(&self, stream: impl MediaStream + 'static) {
        self.inner.borrow_mut().stream = Some(Box::new(stream));
    }

    /// Drops the stream. The handle stays valid but reads as silent
    /// and reports not live.
    pub fn close(&self) {
        self.inner.borrow_mut().stream = None;
    }

    /// True while a stream is attached.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.inner.borrow().stream.is_some()
    }

    /// Sample rate of the attached stream, if any.
    #[must_use]
    pub fn sample_rate(&self) -> Option<f32> {
        self.inner.borrow().stream.as_ref().map(|s| s.sample_rate())
    }

    /// True while some chain has claimed this element.
    #[must_use]
    pub fn is_claimed(&self) -> bool {
        self.inner.borrow().claimed
    }

    /// Pulls samples into `out`, zero-filling past the end of a dry
    /// stream. Returns the number of samples the stream produced.
    pub fn pull(&self, out: &mut [f32]) -> usize {
        let mut inner = self.inner.borrow_mut();
        let written = match inner.stream.as_mut() {
            Some(stream) => stream.pull(out).min(out.len()),
            None => 0,
        };
        for sample in &mut out[written..] {
            *sample = 0.0;
        }
        written
    }

    /// Takes the exclusive tap on this element. Returns false if some
    /// chain already holds it.
    pub(crate) fn claim(&self) -> bool {
        let mut inner = self.inner.borrow_mut();
        if inner.claimed {
            return false;
        }
        inner.claimed = true;
        true
    }

    /// Releases the exclusive tap.
    pub(crate) fn release(&self) {
        self.inner.borrow_mut().claimed = false;
    }
}

impl core::fmt::Debug for MediaHandle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("MediaHandle")
            .field("live", &inner.stream.is_some())
            .field("claimed", &inner.claimed)
            .finish()
    }
}

/// Plays back a buffer of samples once, then runs dry.
pub struct BufferStream {
    samples: Vec<f32>,
    position: usize,
    sample_rate: f32,
}

impl BufferStream {
    /// Wraps `samples` recorded at `sample_rate`.
    #[must_use]
    pub fn new(samples: Vec<f32>, sample_rate: f32) -> Self {
        Self {
            samples,
            position: 0,
            sample_rate,
        }
    }
}

impl MediaStream for BufferStream {
    fn pull(&mut self, out: &mut [f32]) -> usize {
        let remaining = &self.samples[self.position..];
        let count = remaining.len().min(out.len());
        out[..count].copy_from_slice(&remaining[..count]);
        self.position += count;
        count
    }

    fn sample_rate(&self) -> f32 {
        self.sample_rate
    }
}

/// Endless sine tone, handy for tests and offline demos.
pub struct ToneStream {
    phase: f32,
    freq_hz: f32,
    amplitude: f32,
    sample_rate: f32,
}

impl ToneStream {
    /// Creates a tone at `freq_hz` with peak `amplitude`.
    #[must_use]
    pub fn new(freq_hz: f32, amplitude: f32, sample_rate: f32) -> Self {
        Self {
            phase: 0.0,
            freq_hz,
            amplitude,
            sample_rate,
        }
    }
}

impl MediaStream for ToneStream {
    fn pull(&mut self, out: &mut [f32]) -> usize {
        let step = self.freq_hz / self.sample_rate;
        for sample in out.iter_mut() {
            *sample = self.amplitude * libm::sinf(core::f32::consts::TAU * self.phase);
            self.phase += step;
            if self.phase >= 1.0 {
                self.phase -= 1.0;
            }
        }
        out.len()
    }

    fn sample_rate(&self) -> f32 {
        self.sample_rate
    }
}
