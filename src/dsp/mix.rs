//! Signal mixing, scaling and stereo panning primitives.

use std::f32::consts::{FRAC_PI_4, SQRT_2};

/*
Mixing and Panning
==================

Mixing is addition. Every bus in the mixer is a set of accumulators that
voices and effects ADD into, which is why the order of sends never matters:
addition commutes.

  sum           a[i] += b[i]. Can exceed ±1.0 when many sources pile up;
                the master stage is where the level gets managed.

  crossfade     a·(1 - balance) + b·balance. Weights sum to 1.0, so two
                full-scale inputs never exceed full scale.

  scale         a[i] *= gain.


Constant-Power Pan
------------------

A mono voice becomes stereo through a pair of gains. The pan position
p ∈ [-1, 1] maps to an angle θ = p·π/4 and

    right = (√2/2)·(cos θ + sin θ)
    left  = (√2/2)·(cos θ - sin θ)

    p = -1   θ = -π/4   left = 1.0,   right = 0.0
    p =  0   θ =  0     left = 0.707, right = 0.707
    p = +1   θ = +π/4   left = 0.0,   right = 1.0

left² + right² = 1 for every p, so a sound keeps the same loudness as it
moves across the field (a linear pan would dip by 3 dB in the centre).
*/

/// Mix two signals using linear crossfade.
///
/// output = (A × (1-balance)) + (B × balance)
#[inline]
pub fn mix(a: &[f32], b: &[f32], balance: f32, out: &mut [f32]) {
    debug_assert_eq!(a.len(), b.len());
    debug_assert_eq!(a.len(), out.len());

    let balance = balance.clamp(0.0, 1.0);
    let weight_a = 1.0 - balance;
    let weight_b = balance;

    for ((&sa, &sb), o) in a.iter().zip(b.iter()).zip(out.iter_mut()) {
        *o = (sa * weight_a) + (sb * weight_b);
    }
}

/// Add signal B into signal A in-place.
#[inline]
pub fn sum_in_place(a: &mut [f32], b: &[f32]) {
    debug_assert_eq!(a.len(), b.len());

    for (sa, &sb) in a.iter_mut().zip(b.iter()) {
        *sa += sb;
    }
}

/// Add `b × gain` into `a` in-place.
#[inline]
pub fn sum_scaled_in_place(a: &mut [f32], b: &[f32], gain: f32) {
    debug_assert!(a.len() >= b.len());

    for (sa, &sb) in a.iter_mut().zip(b.iter()) {
        *sa += sb * gain;
    }
}

#[inline]
pub fn scale_in_place(a: &mut [f32], gain: f32) {
    for sample in a.iter_mut() {
        *sample *= gain;
    }
}

/// Left and right gains for pan position `pan` in [-1, 1].
#[inline]
pub fn constant_power_pan(pan: f32) -> (f32, f32) {
    let theta = pan.clamp(-1.0, 1.0) * FRAC_PI_4;
    let half_root = SQRT_2 / 2.0;
    let left = half_root * (theta.cos() - theta.sin());
    let right = half_root * (theta.cos() + theta.sin());
    (left, right)
}
