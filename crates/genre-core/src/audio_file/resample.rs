//! Sample rate conversion with rubato

use rubato::{FftFixedIn, Resampler};

use super::error::Result;

/// Frames fed to the resampler per processing block
const CHUNK_SIZE: usize = 1024;

/// Resample a mono signal from `from_rate` to `to_rate`
///
/// The output has exactly `ceil(len * to_rate / from_rate)` samples, with the
/// resampler's group delay removed so the signal stays time-aligned.
pub fn resample_mono(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let mut resampler = FftFixedIn::<f32>::new(from_rate as usize, to_rate as usize, CHUNK_SIZE, 2, 1)?;

    let expected = (samples.len() as u64 * to_rate as u64).div_ceil(from_rate as u64) as usize;
    let delay = resampler.output_delay();
    let mut output = Vec::with_capacity(expected + delay + CHUNK_SIZE);

    let mut pos = 0;
    while pos + resampler.input_frames_next() <= samples.len() {
        let n = resampler.input_frames_next();
        let block_in: [&[f32]; 1] = [&samples[pos..pos + n]];
        let block = resampler.process(&block_in[..], None)?;
        output.extend_from_slice(&block[0]);
        pos += n;
    }

    if pos < samples.len() {
        let tail: [&[f32]; 1] = [&samples[pos..]];
        let block = resampler.process_partial(Some(&tail[..]), None)?;
        output.extend_from_slice(&block[0]);
    }

    // Flush the delay line
    while output.len() < expected + delay {
        let block = resampler.process_partial::<&[f32]>(None, None)?;
        if block[0].is_empty() {
            break;
        }
        output.extend_from_slice(&block[0]);
    }

    output.drain(..delay.min(output.len()));
    output.resize(expected, 0.0);

    Ok(output)
}
