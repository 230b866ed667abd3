//! The degradation effect chain
//!
//! Four deliberately lo-fi effects applied in a fixed order over one block:
//! gain with hard clipping, a down/up resampling round trip that smears out
//! high frequencies, bit-depth quantization, and additive static. Every
//! function here is a pure transformation of `(block, params, rng state)` —
//! no retained state between blocks — so the chain is safe to run from the
//! audio callback with a parameter snapshot taken at block start.
//!
//! All effects preserve block length; the resampling round trip guarantees
//! it regardless of the intermediate length.

use rand::Rng;

use super::gate::mean_abs;
use super::params::EffectParams;

/// Minimum mean absolute amplitude before static is added. Below this the
/// block is treated as silence and left alone even when the effect is
/// enabled, so the noise floor stays quiet between words.
pub const STATIC_SIGNAL_FLOOR: f32 = 0.01;

/// Run the enabled effects over one block, in the fixed chain order.
pub fn process_block(
    samples: &mut [f32],
    params: &EffectParams,
    source_rate: u32,
    rng: &mut impl Rng,
) {
    if params.gain_enabled {
        gain_clip(samples, params.gain);
    }
    if params.downsample_enabled {
        rate_crush(samples, params.downsample_rate, source_rate);
    }
    if params.bit_depth_enabled {
        bit_crush(samples, params.bit_depth);
    }
    if params.static_enabled && mean_abs(samples) > STATIC_SIGNAL_FLOOR {
        add_static(samples, params.static_intensity, rng);
    }
}

/// Multiply by `gain` and hard-clip to [-1, 1]. Simulates an overdriven mic.
pub fn gain_clip(samples: &mut [f32], gain: f32) {
    for s in samples.iter_mut() {
        *s = (*s * gain).clamp(-1.0, 1.0);
    }
}

/// Resample the block down to `target_rate` and back up to the original
/// length, throwing away everything above the target's Nyquist-ish band.
///
/// No-op when `target_rate >= source_rate`. The output length always equals
/// the input length, whatever intermediate length the ratio produces.
pub fn rate_crush(samples: &mut [f32], target_rate: u32, source_rate: u32) {
    let n = samples.len();
    if n == 0 || source_rate == 0 || target_rate >= source_rate {
        return;
    }

    let reduced = ((n as u64 * target_rate as u64) / source_rate as u64).max(1) as usize;
    let down = resample_linear(samples, reduced);
    let up = resample_linear(&down, n);
    samples.copy_from_slice(&up);
}

/// Quantize to `2^bit_depth` uniform levels.
///
/// Samples are mapped to [0, 1], floored onto the level grid and mapped
/// back. The top boundary (exactly 1.0) lands on the highest level instead
/// of overflowing past it. `bit_depth` is expected pre-clamped to >= 1 by
/// the parameter store, so `levels` is never zero.
pub fn bit_crush(samples: &mut [f32], bit_depth: u32) {
    let levels = (1u64 << bit_depth.clamp(1, 32)) as f32;
    for s in samples.iter_mut() {
        let norm = (*s + 1.0) * 0.5;
        let quantized = (norm * levels).floor().min(levels - 1.0);
        *s = (quantized / levels) * 2.0 - 1.0;
    }
}

/// Add independent uniform noise in [-intensity, intensity] per sample and
/// clip the result. Zero intensity leaves the block bit-identical.
pub fn add_static(samples: &mut [f32], intensity: f32, rng: &mut impl Rng) {
    if intensity <= 0.0 {
        return;
    }
    for s in samples.iter_mut() {
        *s = (*s + rng.gen_range(-intensity..=intensity)).clamp(-1.0, 1.0);
    }
}

/// Linear-interpolation resample of `input` to exactly `out_len` samples,
/// endpoints included (matches the display-side interpolation too).
pub(crate) fn resample_linear(input: &[f32], out_len: usize) -> Vec<f32> {
    if input.is_empty() {
        return vec![0.0; out_len];
    }
    if input.len() == out_len {
        return input.to_vec();
    }
    if out_len == 1 || input.len() == 1 {
        return vec![input[0]; out_len];
    }

    let step = (input.len() - 1) as f32 / (out_len - 1) as f32;
    let mut out = Vec::with_capacity(out_len);
    for i in 0..out_len {
        let pos = i as f32 * step;
        let idx = (pos as usize).min(input.len() - 1);
        let frac = pos - idx as f32;
        let a = input[idx];
        let b = input[(idx + 1).min(input.len() - 1)];
        out.push(a + (b - a) * frac);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn rng() -> SmallRng {
        SmallRng::seed_from_u64(0x7ea5)
    }

    fn sine_block(n: usize) -> Vec<f32> {
        (0..n)
            .map(|i| (i as f32 * 0.11).sin() * 0.8)
            .collect()
    }

    #[test]
    fn chain_preserves_length_for_all_enable_combinations() {
        let source = sine_block(473);
        for mask in 0u8..16 {
            let params = EffectParams {
                gain_enabled: mask & 1 != 0,
                downsample_enabled: mask & 2 != 0,
                bit_depth_enabled: mask & 4 != 0,
                static_enabled: mask & 8 != 0,
                ..EffectParams::default()
            };
            let mut block = source.clone();
            process_block(&mut block, &params, 44100, &mut rng());
            assert_eq!(block.len(), source.len(), "mask {:#06b}", mask);
        }
    }

    #[test]
    fn gain_clip_stays_in_range() {
        let mut block = sine_block(512);
        gain_clip(&mut block, 1000.0);
        assert!(block.iter().all(|s| (-1.0..=1.0).contains(s)));
    }

    #[test]
    fn gain_drives_quiet_input_to_full_scale() {
        // 100 samples at 0.1 with gain 200 clip to exactly 1.0
        let mut block = vec![0.1f32; 100];
        let params = EffectParams {
            gain: 200.0,
            gain_enabled: true,
            ..EffectParams::default()
        };
        process_block(&mut block, &params, 44100, &mut rng());
        assert!(block.iter().all(|&s| s == 1.0));
    }

    #[test]
    fn rate_crush_round_trip_preserves_length() {
        for n in [1usize, 4, 100, 441, 512, 1024] {
            for target in [1u32, 2000, 8000, 22050, 44099] {
                let mut block = sine_block(n);
                rate_crush(&mut block, target, 44100);
                assert_eq!(block.len(), n, "n={n} target={target}");
            }
        }
    }

    #[test]
    fn rate_crush_at_source_rate_is_identity() {
        let source = sine_block(256);
        let mut block = source.clone();
        rate_crush(&mut block, 44100, 44100);
        assert_eq!(block, source);
    }

    #[test]
    fn rate_crush_above_source_rate_is_identity() {
        let source = sine_block(256);
        let mut block = source.clone();
        rate_crush(&mut block, 48000, 44100);
        assert_eq!(block, source);
    }

    #[test]
    fn rate_crush_smears_the_signal() {
        let source: Vec<f32> = (0..512).map(|i| if i % 2 == 0 { 0.5 } else { -0.5 }).collect();
        let mut block = source.clone();
        rate_crush(&mut block, 4000, 44100);
        // the Nyquist-rate square wave cannot survive an 11x rate reduction
        assert_ne!(block, source);
        assert!(block.iter().all(|s| s.abs() <= 0.5 + 1e-6));
    }

    #[test]
    fn bit_crush_level_count_and_range() {
        for depth in [1u32, 2, 4, 8] {
            let mut block = sine_block(2048);
            bit_crush(&mut block, depth);

            let mut distinct: Vec<u32> = block.iter().map(|s| s.to_bits()).collect();
            distinct.sort_unstable();
            distinct.dedup();
            assert!(
                distinct.len() <= 1usize << depth,
                "depth {depth}: {} distinct values",
                distinct.len()
            );
            assert!(block.iter().all(|s| (-1.0..=1.0).contains(s)));
        }
    }

    #[test]
    fn one_bit_crush_matches_expected_boundaries() {
        // Normalized [0.5, 0.75, 0.25, 1.0], floored onto 2 levels and
        // denormalized; 1.0 maps to the top level instead of overflowing.
        let mut block = vec![0.0f32, 0.5, -0.5, 1.0];
        let params = EffectParams {
            bit_depth: 1,
            bit_depth_enabled: true,
            ..EffectParams::default()
        };
        process_block(&mut block, &params, 44100, &mut rng());
        assert_eq!(block, vec![0.0, 0.0, -1.0, 0.0]);
    }

    #[test]
    fn zero_intensity_static_is_bit_identical() {
        let source = sine_block(512);
        let mut block = source.clone();
        add_static(&mut block, 0.0, &mut rng());
        assert_eq!(block, source);
    }

    #[test]
    fn static_is_skipped_on_silence() {
        let mut block = vec![0.0f32; 512];
        let params = EffectParams {
            static_intensity: 1.0,
            static_enabled: true,
            ..EffectParams::default()
        };
        process_block(&mut block, &params, 44100, &mut rng());
        assert!(block.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn static_is_added_on_signal_and_stays_in_range() {
        let source = vec![0.2f32; 512];
        let mut block = source.clone();
        let params = EffectParams {
            static_intensity: 0.3,
            static_enabled: true,
            ..EffectParams::default()
        };
        process_block(&mut block, &params, 44100, &mut rng());
        assert_ne!(block, source);
        assert!(block.iter().all(|s| (-1.0..=1.0).contains(s)));
        assert!(block.iter().zip(&source).all(|(a, b)| (a - b).abs() <= 0.3 + 1e-6));
    }

    #[test]
    fn resample_linear_hits_requested_length() {
        let block = sine_block(441);
        for out_len in [1usize, 80, 100, 441, 1000] {
            assert_eq!(resample_linear(&block, out_len).len(), out_len);
        }
    }

    #[test]
    fn resample_linear_keeps_endpoints() {
        let block = vec![0.0f32, 0.25, 0.5, 0.75, 1.0];
        let out = resample_linear(&block, 9);
        assert_eq!(out[0], 0.0);
        assert!((out[8] - 1.0).abs() < 1e-6);
        // constant signals resample to themselves
        let flat = resample_linear(&vec![0.5f32; 7], 100);
        assert!(flat.iter().all(|&s| (s - 0.5).abs() < 1e-6));
    }
}
