//! Audio playback and the shared analysis tap.
//!
//! The output callback pulls frames from the active source (decoded WAV or
//! the built-in procedural composition), hard-clips them, and pushes mono
//! samples into a shared tap that the frequency analyzer drains on the UI
//! thread.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use glicol::Engine;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Audio block size in samples, matches the synthesis engine setup
pub const BLOCK_SIZE: usize = 128;

/// Upper bound on buffered tap samples; older samples are discarded if the
/// analyzer stalls
const TAP_CAPACITY: usize = 1 << 16;

/// Procedural composition played when no audio file is supplied
const TONE_COMPOSITION: &str = r#"
~gate: speed 1.2 >> seq 48 _48 _~n 60
~n: choose 52 55 55 67 0 0
~amp: ~gate >> envperc 0.002 0.12
~pit: ~gate >> mul 220.0
~voice: saw ~pit >> mul ~amp >> lpf ~cut 3.0 >> mul 0.12
~cut: sin 0.15 >> mul 900 >> add 1200
o: ~voice >> plate 0.08
"#;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("no audio output device found")]
    NoDevice,

    #[error("failed to get audio output config: {0}")]
    DeviceConfig(String),

    #[error("failed to build audio stream: {0}")]
    Stream(String),

    #[error("failed to start audio stream: {0}")]
    Playback(String),

    #[error("failed to decode WAV file: {0}")]
    Wav(#[from] hound::Error),

    #[error("audio file {0} contains no samples")]
    EmptyFile(PathBuf),

    #[error("synthesis engine failed: {0}")]
    Synth(String),

    #[error("invalid analyzer config: {0}")]
    InvalidAnalyzerConfig(String),
}

/// What to play
#[derive(Debug, Clone)]
pub enum AudioSource {
    /// User-supplied WAV file, looped
    File(PathBuf),

    /// Built-in procedural composition
    Tone,
}

/// Stereo frames decoded from a WAV file plus the file's sample rate
struct DecodedAudio {
    frames: Vec<[f32; 2]>,
    sample_rate: u32,
}

/// Frame producer driven by the output callback
enum SampleFeed {
    File {
        decoded: DecodedAudio,
        /// Playback cursor in file frames (fractional for resampling)
        cursor: f64,
        /// File frames advanced per output frame
        step: f64,
    },
    Tone {
        engine: Box<Engine<BLOCK_SIZE>>,
        block: [[f32; BLOCK_SIZE]; 2],
        block_pos: usize,
    },
}

impl SampleFeed {
    /// Produce the next stereo frame, looping the file source
    fn next_frame(&mut self) -> [f32; 2] {
        match self {
            SampleFeed::File {
                decoded,
                cursor,
                step,
            } => {
                let count = decoded.frames.len();
                let base = cursor.floor() as usize % count;
                let next = (base + 1) % count;
                let frac = (*cursor - cursor.floor()) as f32;

                let a = decoded.frames[base];
                let b = decoded.frames[next];
                let frame = [
                    a[0] + (b[0] - a[0]) * frac,
                    a[1] + (b[1] - a[1]) * frac,
                ];

                *cursor += *step;
                if *cursor >= count as f64 {
                    *cursor -= count as f64;
                }
                frame
            }
            SampleFeed::Tone {
                engine,
                block,
                block_pos,
            } => {
                if *block_pos >= BLOCK_SIZE {
                    let (buffers, _) = engine.next_block(vec![]);
                    for i in 0..BLOCK_SIZE {
                        block[0][i] = buffers[0][i];
                        block[1][i] = buffers[1][i];
                    }
                    *block_pos = 0;
                }
                let frame = [block[0][*block_pos], block[1][*block_pos]];
                *block_pos += 1;
                frame
            }
        }
    }
}

/// Audio system owning the output stream and the analysis tap
pub struct AudioSystem {
    /// Shared mono samples for frequency analysis
    tap: Arc<Mutex<Vec<f32>>>,

    /// Output device sample rate
    sample_rate: u32,

    /// Output stream (kept alive; dropping it stops playback)
    _stream: cpal::Stream,
}

impl AudioSystem {
    /// Create and start the audio system for the given source
    pub fn new(source: AudioSource) -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;

        let config = device
            .default_output_config()
            .map_err(|e| AudioError::DeviceConfig(e.to_string()))?;
        let sample_rate = config.sample_rate().0;
        let channels = (config.channels() as usize).max(1);

        tracing::info!(
            device = %device.name().unwrap_or_else(|_| "unknown".to_string()),
            sample_rate,
            channels,
            "audio output ready"
        );

        let mut feed = match &source {
            AudioSource::File(path) => {
                let decoded = decode_wav(path)?;
                let step = decoded.sample_rate as f64 / sample_rate as f64;
                tracing::info!(
                    path = %path.display(),
                    file_rate = decoded.sample_rate,
                    frames = decoded.frames.len(),
                    "playing audio file"
                );
                SampleFeed::File {
                    decoded,
                    cursor: 0.0,
                    step,
                }
            }
            AudioSource::Tone => {
                let mut engine = Box::new(Engine::<BLOCK_SIZE>::new());
                engine.set_sr(sample_rate as usize);
                engine.update_with_code(TONE_COMPOSITION);
                engine
                    .update()
                    .map_err(|e| AudioError::Synth(format!("{:?}", e)))?;
                tracing::info!("no audio file supplied, playing built-in composition");
                SampleFeed::Tone {
                    engine,
                    block: [[0.0; BLOCK_SIZE]; 2],
                    block_pos: BLOCK_SIZE,
                }
            }
        };

        let tap = Arc::new(Mutex::new(Vec::<f32>::new()));
        let tap_writer = Arc::clone(&tap);

        let stream = device
            .build_output_stream(
                &config.into(),
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let mut tap = match tap_writer.lock() {
                        Ok(guard) => guard,
                        Err(poisoned) => poisoned.into_inner(),
                    };

                    for out_frame in data.chunks_mut(channels) {
                        let [left, right] = feed.next_frame();
                        let left = left.clamp(-1.0, 1.0);
                        let right = right.clamp(-1.0, 1.0);

                        out_frame[0] = left;
                        if channels > 1 {
                            out_frame[1] = right;
                            for extra in out_frame.iter_mut().skip(2) {
                                *extra = 0.0;
                            }
                        }

                        // Mono tap for analysis
                        tap.push((left + right) * 0.5);
                    }

                    // Bound tap growth if the analyzer stalls
                    let len = tap.len();
                    if len > TAP_CAPACITY {
                        tap.drain(..len - TAP_CAPACITY);
                    }
                },
                |err| tracing::warn!("audio stream error: {}", err),
                None,
            )
            .map_err(|e| AudioError::Stream(e.to_string()))?;

        stream
            .play()
            .map_err(|e| AudioError::Playback(e.to_string()))?;

        Ok(Self {
            tap,
            sample_rate,
            _stream: stream,
        })
    }

    /// The shared sample tap the analyzer connects to
    pub fn tap(&self) -> Arc<Mutex<Vec<f32>>> {
        Arc::clone(&self.tap)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

/// Decode a WAV file into stereo f32 frames
fn decode_wav(path: &Path) -> Result<DecodedAudio, AudioError> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<Vec<_>, _>>()?,
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<Result<Vec<_>, _>>()?
        }
    };

    let frames: Vec<[f32; 2]> = interleaved
        .chunks_exact(channels)
        .map(|frame| match channels {
            1 => [frame[0], frame[0]],
            _ => [frame[0], frame[1]],
        })
        .collect();

    if frames.is_empty() {
        return Err(AudioError::EmptyFile(path.to_path_buf()));
    }

    Ok(DecodedAudio {
        frames,
        sample_rate: spec.sample_rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_test_wav(name: &str, channels: u16, samples: &[i16]) -> PathBuf {
        let path = std::env::temp_dir().join(name);
        let spec = hound::WavSpec {
            channels,
            sample_rate: 22050,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for &sample in samples {
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();
        path
    }

    #[test]
    fn test_decode_mono_wav_duplicates_channel() {
        let path = write_test_wav("wavescene_test_mono.wav", 1, &[0, 16384, -16384, 32767]);
        let decoded = decode_wav(&path).unwrap();

        assert_eq!(decoded.sample_rate, 22050);
        assert_eq!(decoded.frames.len(), 4);
        assert_eq!(decoded.frames[1][0], decoded.frames[1][1]);
        assert!((decoded.frames[1][0] - 0.5).abs() < 1e-3);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_decode_stereo_wav_keeps_channels() {
        let path = write_test_wav("wavescene_test_stereo.wav", 2, &[100, -100, 200, -200]);
        let decoded = decode_wav(&path).unwrap();

        assert_eq!(decoded.frames.len(), 2);
        assert!(decoded.frames[0][0] > 0.0);
        assert!(decoded.frames[0][1] < 0.0);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_decode_missing_file_errors() {
        assert!(matches!(
            decode_wav(Path::new("/nonexistent/file.wav")),
            Err(AudioError::Wav(_))
        ));
    }

    #[test]
    fn test_file_feed_loops_and_interpolates() {
        let decoded = DecodedAudio {
            frames: vec![[0.0, 0.0], [1.0, 1.0]],
            sample_rate: 22050,
        };
        let mut feed = SampleFeed::File {
            decoded,
            cursor: 0.0,
            step: 0.5,
        };

        assert_eq!(feed.next_frame(), [0.0, 0.0]);
        assert_eq!(feed.next_frame(), [0.5, 0.5]); // halfway between frames
        assert_eq!(feed.next_frame(), [1.0, 1.0]);
        // Wraps around: interpolating back toward frame 0
        assert_eq!(feed.next_frame(), [0.5, 0.5]);
        assert_eq!(feed.next_frame(), [0.0, 0.0]);
    }

    #[test]
    fn test_tone_feed_produces_blocks() {
        let mut engine = Box::new(Engine::<BLOCK_SIZE>::new());
        engine.set_sr(44100);
        engine.update_with_code(TONE_COMPOSITION);
        engine.update().unwrap();

        let mut feed = SampleFeed::Tone {
            engine,
            block: [[0.0; BLOCK_SIZE]; 2],
            block_pos: BLOCK_SIZE,
        };
        for _ in 0..BLOCK_SIZE * 3 {
            let [left, right] = feed.next_frame();
            assert!(left.is_finite());
            assert!(right.is_finite());
        }
    }
}
