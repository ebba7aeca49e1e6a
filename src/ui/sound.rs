/// Sound engine: procedural cues and narration playback via rodio.
///
/// Cues are generated as in-memory WAV buffers at init time:
///   - select: short triangle blip (C3, 0.1 s)
///   - dissolve: white-noise burst, at most one per 50 ms
///   - ambient: brown-noise bed, looped until shutdown
///
/// `NarrationBackend` plays narration files through the same output and
/// implements the engine's `AudioBackend`.
///
/// Compile without the "sound" feature to disable audio entirely: the stub
/// SoundEngine does nothing and narration reports `Unavailable`, which the
/// narrator treats as "no narration".

#[cfg(feature = "sound")]
mod inner {
    use std::cell::{Cell, RefCell};
    use std::io::Cursor;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
    use tracing::{debug, warn};

    use crate::sim::narration::{AudioBackend, AudioError};

    const SAMPLE_RATE: u32 = 22050;
    const DISSOLVE_THROTTLE: Duration = Duration::from_millis(50);
    const CUE_VOLUME: f32 = 0.6;
    const AMBIENT_VOLUME: f32 = 0.25;
    const NARRATION_VOLUME: f32 = 1.0;

    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        sfx_select: Arc<Vec<u8>>,
        sfx_dissolve: Arc<Vec<u8>>,
        ambient_loop: Arc<Vec<u8>>,
        ambient: RefCell<Option<Sink>>,
        last_dissolve: Cell<Option<Instant>>,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(pair) => pair,
                Err(e) => {
                    warn!(error = %e, "no audio output, running silent");
                    return None;
                }
            };

            Some(SoundEngine {
                _stream: stream,
                handle,
                sfx_select: Arc::new(make_wav(&gen_triangle(130.81, 0.1, 0.4))),
                sfx_dissolve: Arc::new(make_wav(&gen_noise_burst(0.35))),
                ambient_loop: Arc::new(make_wav(&gen_brown_noise(4.0))),
                ambient: RefCell::new(None),
                last_dissolve: Cell::new(None),
            })
        }

        fn play(&self, buf: &Arc<Vec<u8>>) {
            if let Ok(sink) = Sink::try_new(&self.handle) {
                let cursor = Cursor::new(buf.as_ref().clone());
                if let Ok(src) = Decoder::new(cursor) {
                    sink.set_volume(CUE_VOLUME);
                    sink.append(src);
                    sink.detach(); // fire-and-forget
                }
            }
        }

        pub fn play_select(&self) {
            self.play(&self.sfx_select);
        }

        pub fn play_dissolve(&self) {
            let now = Instant::now();
            if self.last_dissolve.get().is_some_and(|t| now.duration_since(t) < DISSOLVE_THROTTLE) {
                return;
            }
            self.last_dissolve.set(Some(now));
            self.play(&self.sfx_dissolve);
        }

        pub fn start_ambient(&self) {
            let mut slot = self.ambient.borrow_mut();
            if slot.is_some() {
                return;
            }
            let Ok(sink) = Sink::try_new(&self.handle) else { return };
            match Decoder::new_looped(Cursor::new(self.ambient_loop.as_ref().clone())) {
                Ok(src) => {
                    sink.set_volume(AMBIENT_VOLUME);
                    sink.append(src);
                    *slot = Some(sink);
                    debug!("ambient bed started");
                }
                Err(e) => warn!(error = %e, "ambient bed failed to decode"),
            }
        }

        pub fn stop_ambient(&self) {
            if let Some(sink) = self.ambient.borrow_mut().take() {
                sink.stop();
            }
        }

        /// Narration backend sharing this engine's output.
        pub fn narration_backend(&self, root: PathBuf) -> NarrationBackend {
            NarrationBackend { handle: Some(self.handle.clone()), root }
        }
    }

    pub struct NarrationBackend {
        handle: Option<OutputStreamHandle>,
        root: PathBuf,
    }

    pub struct NarrationClip {
        bytes: Arc<Vec<u8>>,
        sink: Option<Sink>,
    }

    impl NarrationBackend {
        /// Backend with no audio output; every load fails `Unavailable`.
        pub fn unavailable(root: PathBuf) -> Self {
            NarrationBackend { handle: None, root }
        }
    }

    impl AudioBackend for NarrationBackend {
        type Clip = NarrationClip;

        fn load(&mut self, reference: &str) -> Result<NarrationClip, AudioError> {
            if self.handle.is_none() {
                return Err(AudioError::Unavailable);
            }
            let path = self.root.join(reference);
            let bytes = std::fs::read(&path).map_err(|source| AudioError::Io {
                reference: reference.to_string(),
                source,
            })?;
            let bytes = Arc::new(bytes);
            // decode once up front so a corrupt file fails at load, not start
            Decoder::new(Cursor::new(bytes.as_ref().clone())).map_err(|e| AudioError::Decode {
                reference: reference.to_string(),
                reason: e.to_string(),
            })?;
            Ok(NarrationClip { bytes, sink: None })
        }

        fn start(&mut self, clip: &mut NarrationClip) -> Result<(), AudioError> {
            let handle = self.handle.as_ref().ok_or(AudioError::Unavailable)?;
            if clip.sink.is_some() {
                return Ok(());
            }
            let sink = Sink::try_new(handle).map_err(|e| AudioError::Playback(e.to_string()))?;
            let src = Decoder::new(Cursor::new(clip.bytes.as_ref().clone()))
                .map_err(|e| AudioError::Playback(e.to_string()))?;
            sink.set_volume(NARRATION_VOLUME);
            sink.append(src);
            clip.sink = Some(sink);
            Ok(())
        }

        fn is_finished(&self, clip: &NarrationClip) -> bool {
            clip.sink.as_ref().is_some_and(|s| s.empty())
        }

        fn stop(&mut self, clip: NarrationClip) {
            if let Some(sink) = clip.sink {
                sink.stop();
            }
        }
    }

    // ════════════════════════════════════════════════════════════
    //  Waveform generators: mono Vec<f32> samples
    // ════════════════════════════════════════════════════════════

    /// Triangle blip with a linear fade out.
    pub(super) fn gen_triangle(freq: f32, duration: f32, volume: f32) -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * duration) as usize;
        (0..n)
            .map(|i| {
                let phase = (i as f32 * freq / SAMPLE_RATE as f32).fract();
                let tri = 1.0 - 4.0 * (phase - 0.5).abs();
                let env = 1.0 - (i as f32 / n as f32);
                tri * env * volume
            })
            .collect()
    }

    /// Simple LCG noise in [-1, 1].
    fn lcg(state: &mut u32) -> f32 {
        *state = state.wrapping_mul(1103515245).wrapping_add(12345);
        (*state as f32 / u32::MAX as f32) * 2.0 - 1.0
    }

    /// Dissolve: white-noise burst with a soft decay.
    pub(super) fn gen_noise_burst(duration: f32) -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * duration) as usize;
        let mut rng: u32 = 12345;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                let attack = (t * 20.0).min(1.0);
                let env = attack * (1.0 - t).powf(1.5);
                lcg(&mut rng) * env * 0.2
            })
            .collect()
    }

    /// Ambient: leaky-integrated (brown) noise, ends near zero to loop cleanly.
    pub(super) fn gen_brown_noise(duration: f32) -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * duration) as usize;
        let edge = (SAMPLE_RATE as f32 * 0.05) as usize;
        let mut rng: u32 = 777;
        let mut last = 0.0_f32;
        (0..n)
            .map(|i| {
                last = (last + 0.02 * lcg(&mut rng)) / 1.02;
                let fade = (i.min(n - 1 - i) as f32 / edge as f32).min(1.0);
                last * 2.0 * fade
            })
            .collect()
    }

    // ════════════════════════════════════════════════════════════
    //  WAV encoder: f32 samples into an in-memory WAV
    // ════════════════════════════════════════════════════════════

    pub(super) fn make_wav(samples: &[f32]) -> Vec<u8> {
        let num_channels: u16 = 1;
        let bits_per_sample: u16 = 16;
        let byte_rate = SAMPLE_RATE * (num_channels as u32) * (bits_per_sample as u32) / 8;
        let block_align = num_channels * bits_per_sample / 8;
        let data_size = samples.len() as u32 * 2; // 16-bit = 2 bytes per sample
        let file_size = 36 + data_size;

        let mut buf = Vec::with_capacity(44 + data_size as usize);

        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&file_size.to_le_bytes());
        buf.extend_from_slice(b"WAVE");

        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&16u32.to_le_bytes()); // chunk size
        buf.extend_from_slice(&1u16.to_le_bytes());  // PCM format
        buf.extend_from_slice(&num_channels.to_le_bytes());
        buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        buf.extend_from_slice(&byte_rate.to_le_bytes());
        buf.extend_from_slice(&block_align.to_le_bytes());
        buf.extend_from_slice(&bits_per_sample.to_le_bytes());

        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_size.to_le_bytes());

        for &s in samples {
            let val = (s.clamp(-1.0, 1.0) * 32767.0) as i16;
            buf.extend_from_slice(&val.to_le_bytes());
        }

        buf
    }
}

// ════════════════════════════════════════════════════════════
//  Public API: no-ops when the sound feature is off
// ════════════════════════════════════════════════════════════

#[cfg(feature = "sound")]
pub use inner::{NarrationBackend, SoundEngine};

#[cfg(not(feature = "sound"))]
mod stub {
    use std::path::PathBuf;

    use crate::sim::narration::{AudioBackend, AudioError};

    pub struct SoundEngine;

    impl SoundEngine {
        pub fn new() -> Option<Self> { Some(SoundEngine) }
        pub fn play_select(&self) {}
        pub fn play_dissolve(&self) {}
        pub fn start_ambient(&self) {}
        pub fn stop_ambient(&self) {}
        pub fn narration_backend(&self, root: PathBuf) -> NarrationBackend {
            NarrationBackend::unavailable(root)
        }
    }

    pub struct NarrationBackend;

    impl NarrationBackend {
        pub fn unavailable(_root: PathBuf) -> Self { NarrationBackend }
    }

    impl AudioBackend for NarrationBackend {
        type Clip = ();

        fn load(&mut self, _reference: &str) -> Result<(), AudioError> {
            Err(AudioError::Unavailable)
        }
        fn start(&mut self, _clip: &mut ()) -> Result<(), AudioError> {
            Err(AudioError::Unavailable)
        }
        fn is_finished(&self, _clip: &()) -> bool { true }
        fn stop(&mut self, _clip: ()) {}
    }
}

#[cfg(not(feature = "sound"))]
pub use stub::{NarrationBackend, SoundEngine};
