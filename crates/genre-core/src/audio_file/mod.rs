//! Audio loading for analysis
//!
//! Decodes an uploaded clip (WAV, MP3 or anything else Symphonia can probe),
//! keeps only the leading `max_duration_secs`, downmixes to mono and
//! optionally resamples to the analysis rate.
//!
//! Truncation happens on the native-rate frames before resampling, so audio
//! past the cut never reaches the feature extractor.

mod error;
mod resample;

pub use error::AudioError;
pub use resample::resample_mono;

use std::fs::File;
use std::io::Cursor;
use std::path::Path;

use serde::{Deserialize, Serialize};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::types::{DEFAULT_SAMPLE_RATE, MAX_DURATION_SECS};
use error::Result;

/// Mono audio ready for feature extraction
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// Mono samples in [-1, 1]
    pub samples: Vec<f32>,
    /// Rate the samples are expressed at (after optional resampling)
    pub sample_rate: u32,
    /// Channel count of the source before downmixing
    pub source_channels: usize,
}

impl DecodedAudio {
    /// Duration in seconds
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// How much audio to decode and at which rate to deliver it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoadOptions {
    /// Decode at most this many seconds from the start (None = whole clip)
    pub max_duration_secs: Option<f64>,
    /// Resample to this rate (None = keep the decoder's native rate)
    pub target_sample_rate: Option<u32>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            max_duration_secs: Some(MAX_DURATION_SECS),
            target_sample_rate: Some(DEFAULT_SAMPLE_RATE),
        }
    }
}

/// Load an in-memory upload
///
/// `extension` is a format hint such as `"wav"` or `"mp3"`; probing still
/// works without it for most containers.
pub fn load_bytes(bytes: Vec<u8>, extension: Option<&str>, options: &LoadOptions) -> Result<DecodedAudio> {
    if bytes.is_empty() {
        return Err(AudioError::Empty);
    }

    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext.trim_start_matches('.'));
    }

    load_source(Box::new(Cursor::new(bytes)), hint, options)
}

/// Load an audio file from disk
pub fn load_file(path: &Path, options: &LoadOptions) -> Result<DecodedAudio> {
    let file = File::open(path).map_err(|e| AudioError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    load_source(Box::new(file), hint, options)
}

fn load_source(source: Box<dyn MediaSource>, hint: Hint, options: &LoadOptions) -> Result<DecodedAudio> {
    let (interleaved, native_rate, channels) = decode_source(source, hint, options.max_duration_secs)?;

    let mono = downmix_to_mono(&interleaved, channels);
    if mono.is_empty() {
        return Err(AudioError::Empty);
    }

    let (samples, sample_rate) = match options.target_sample_rate {
        Some(target) if target != native_rate => {
            log::debug!("load_source: resampling {} Hz -> {} Hz", native_rate, target);
            (resample_mono(&mono, native_rate, target)?, target)
        }
        _ => (mono, native_rate),
    };

    let audio = DecodedAudio {
        samples,
        sample_rate,
        source_channels: channels,
    };

    log::debug!(
        "load_source: {:.2}s of audio at {} Hz ({} source channels)",
        audio.duration_secs(),
        audio.sample_rate,
        audio.source_channels
    );

    Ok(audio)
}

/// Decode the first audio track to interleaved f32 samples
///
/// Stops once `max_duration_secs` worth of frames has been collected.
/// Returns (interleaved samples, native sample rate, channel count).
fn decode_source(
    source: Box<dyn MediaSource>,
    hint: Hint,
    max_duration_secs: Option<f64>,
) -> Result<(Vec<f32>, u32, usize)> {
    let mss = MediaSourceStream::new(source, Default::default());

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| AudioError::UnsupportedFormat(e.to_string()))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(AudioError::NoAudioTrack)?;

    let track_id = track.id;
    let sample_rate = track.codec_params.sample_rate.ok_or(AudioError::UnknownSampleRate)?;
    if sample_rate == 0 {
        return Err(AudioError::UnknownSampleRate);
    }

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| AudioError::UnsupportedFormat(e.to_string()))?;

    let max_frames = max_duration_secs.map(|secs| (secs.max(0.0) * sample_rate as f64).round() as usize);

    let mut samples: Vec<f32> = Vec::new();
    let mut channels: usize = 0;
    // Sample buffer plus its capacity in frames
    let mut sample_buf: Option<(SampleBuffer<f32>, u64)> = None;

    loop {
        if let Some(limit) = max_frames {
            if channels > 0 && samples.len() / channels >= limit {
                break;
            }
        }

        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(e) => {
                end_of_stream(e, samples.len())?;
                break;
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                log::warn!("decode_source: skipping undecodable packet: {}", e);
                continue;
            }
            Err(e) => return Err(AudioError::Decode(e.to_string())),
        };

        let spec = *decoded.spec();
        let frames = decoded.capacity() as u64;

        let needs_new_buffer = match &sample_buf {
            Some((_, capacity)) => *capacity < frames,
            None => true,
        };
        if needs_new_buffer {
            sample_buf = Some((SampleBuffer::new(frames, spec), frames));
        }
        channels = spec.channels.count();

        if let Some((ref mut buf, _)) = sample_buf {
            buf.copy_interleaved_ref(decoded);
            samples.extend_from_slice(buf.samples());
        }
    }

    if channels == 0 || samples.is_empty() {
        return Err(AudioError::Empty);
    }

    if let Some(limit) = max_frames {
        samples.truncate(limit * channels);
    }

    Ok((samples, sample_rate, channels))
}

/// Classify a packet read error: `Ok` ends decoding, `Err` fails the load
///
/// End of input and reset requests end the stream normally. Any other read
/// error fails the load unless audio was already collected, in which case
/// the clip is analyzed up to the damaged packet.
fn end_of_stream(err: SymphoniaError, collected_samples: usize) -> Result<()> {
    match err {
        SymphoniaError::IoError(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(()),
        SymphoniaError::ResetRequired => {
            log::debug!("decode_source: stream reset required, stopping");
            Ok(())
        }
        e if collected_samples == 0 => Err(AudioError::Decode(e.to_string())),
        e => {
            log::warn!(
                "decode_source: error reading packet after {} samples, analyzing what was decoded: {}",
                collected_samples,
                e
            );
            Ok(())
        }
    }
}

/// Average interleaved channels into one
pub fn downmix_to_mono(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }

    let scale = 1.0 / channels as f32;
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() * scale)
        .collect()
}


#[cfg(test)]
mod tests {
    use super::test_audio::{sine, wav_bytes};
    use super::*;

    fn native() -> LoadOptions {
        LoadOptions {
            max_duration_secs: Some(30.0),
            target_sample_rate: None,
        }
    }

    #[test]
    fn test_load_wav_mono() {
        let bytes = wav_bytes(&sine(440.0, 22050, 1.0), 22050, 1);
        let audio = load_bytes(bytes, Some("wav"), &native()).unwrap();
        assert_eq!(audio.sample_rate, 22050);
        assert_eq!(audio.source_channels, 1);
        assert_eq!(audio.len(), 22050);
        assert!((audio.duration_secs() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_long_clip_truncated_to_max_duration() {
        let sr = 8000;
        let bytes = wav_bytes(&sine(220.0, sr, 35.0), sr, 1);
        let audio = load_bytes(bytes, Some("wav"), &native()).unwrap();
        assert_eq!(audio.len(), 30 * sr as usize, "Only the first 30 s should be decoded");
    }

    #[test]
    fn test_short_clip_not_padded() {
        let sr = 8000;
        let bytes = wav_bytes(&sine(220.0, sr, 0.25), sr, 1);
        let audio = load_bytes(bytes, Some("wav"), &native()).unwrap();
        assert_eq!(audio.len(), 2000);
    }

    #[test]
    fn test_stereo_is_downmixed() {
        // Left = +0.5, right = -0.5 -> mono silence
        let frames = 4000;
        let interleaved: Vec<f32> = (0..frames).flat_map(|_| [0.5f32, -0.5f32]).collect();
        let bytes = wav_bytes(&interleaved, 8000, 2);
        let audio = load_bytes(bytes, Some("wav"), &native()).unwrap();
        assert_eq!(audio.source_channels, 2);
        assert_eq!(audio.len(), frames);
        assert!(audio.samples.iter().all(|s| s.abs() < 1e-3));
    }

    #[test]
    fn test_resamples_to_target_rate() {
        let bytes = wav_bytes(&sine(440.0, 44100, 1.0), 44100, 1);
        let options = LoadOptions {
            max_duration_secs: Some(30.0),
            target_sample_rate: Some(22050),
        };
        let audio = load_bytes(bytes, Some("wav"), &options).unwrap();
        assert_eq!(audio.sample_rate, 22050);
        assert_eq!(audio.len(), 22050);
    }

    #[test]
    fn test_garbage_is_unsupported() {
        let bytes = b"definitely not an audio file, just some text".to_vec();
        let err = load_bytes(bytes, Some("mp3"), &native()).unwrap_err();
        assert!(
            matches!(err, AudioError::UnsupportedFormat(_) | AudioError::Empty),
            "Unexpected error: {:?}",
            err
        );
    }

    #[test]
    fn test_empty_upload_fails() {
        assert!(matches!(load_bytes(Vec::new(), Some("wav"), &native()), Err(AudioError::Empty)));
    }

    #[test]
    fn test_missing_file_fails() {
        let err = load_file(Path::new("/nonexistent/clip.wav"), &native()).unwrap_err();
        assert!(matches!(err, AudioError::Read { .. }));
    }

    #[test]
    fn test_load_file_matches_load_bytes() {
        let bytes = wav_bytes(&sine(330.0, 16000, 0.5), 16000, 1);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.wav");
        std::fs::write(&path, &bytes).unwrap();

        let from_file = load_file(&path, &native()).unwrap();
        let from_bytes = load_bytes(bytes, Some("wav"), &native()).unwrap();
        assert_eq!(from_file.samples, from_bytes.samples);
    }

    #[test]
    fn test_downmix_mono_passthrough() {
        let samples = vec![0.1, 0.2, 0.3];
        assert_eq!(downmix_to_mono(&samples, 1), samples);
    }

    #[test]
    fn test_downmix_averages_channels() {
        let interleaved = vec![1.0, 0.0, 0.5, 0.5];
        assert_eq!(downmix_to_mono(&interleaved, 2), vec![0.5, 0.5]);
    }

    #[test]
    fn test_end_of_input_stops_cleanly() {
        let eof = SymphoniaError::IoError(std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "end of stream"));
        assert!(end_of_stream(eof, 0).is_ok());
        assert!(end_of_stream(SymphoniaError::ResetRequired, 1024).is_ok());
    }

    #[test]
    fn test_read_error_before_any_audio_fails() {
        let err = end_of_stream(SymphoniaError::DecodeError("corrupt frame header"), 0);
        assert!(matches!(err, Err(AudioError::Decode(ref msg)) if msg.contains("corrupt frame header")));

        let io = SymphoniaError::IoError(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"));
        assert!(matches!(end_of_stream(io, 0), Err(AudioError::Decode(_))));
    }

    #[test]
    fn test_read_error_after_audio_keeps_decoded_part() {
        let err = SymphoniaError::DecodeError("corrupt frame header");
        assert!(end_of_stream(err, 4096).is_ok());
    }
}
