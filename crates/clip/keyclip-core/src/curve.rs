//! Cubic Hermite evaluation of exported keys, as the host player does it.

use serde::{Deserialize, Serialize};

/// One key of one channel in a binary clip.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ClipKey {
    pub time: f32,
    pub value: f32,
    pub in_tangent: f32,
    pub out_tangent: f32,
}

/// Sample a channel at `time`. Keys must be sorted by time. Outside the key
/// range the nearest end value is held.
pub fn sample_keys(keys: &[ClipKey], time: f32) -> Option<f32> {
    let first = keys.first()?;
    let last = keys.last()?;
    if time <= first.time {
        return Some(first.value);
    }
    if time >= last.time {
        return Some(last.value);
    }

    let seg = keys.windows(2).find(|w| time >= w[0].time && time <= w[1].time)?;
    let (k0, k1) = (&seg[0], &seg[1]);
    let dt = k1.time - k0.time;
    if dt <= 0.0 {
        return Some(k1.value);
    }
    let s = (time - k0.time) / dt;
    Some(hermite(s, k0.value, k0.out_tangent * dt, k1.value, k1.in_tangent * dt))
}

#[inline]
fn hermite(s: f32, p0: f32, m0: f32, p1: f32, m1: f32) -> f32 {
    let s2 = s * s;
    let s3 = s2 * s;
    (2.0 * s3 - 3.0 * s2 + 1.0) * p0
        + (s3 - 2.0 * s2 + s) * m0
        + (-2.0 * s3 + 3.0 * s2) * p1
        + (s3 - s2) * m1
}

/// Unit segment from 0 to 1 shaped by normalized tangents; drives the
/// tangent preview curve.
#[inline]
pub fn normalized_curve(s: f32, out_tangent: f32, in_tangent: f32) -> f32 {
    hermite(s, 0.0, out_tangent, 1.0, in_tangent)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn k(time: f32, value: f32, tin: f32, tout: f32) -> ClipKey {
        ClipKey {
            time,
            value,
            in_tangent: tin,
            out_tangent: tout,
        }
    }

    #[test]
    fn holds_ends_and_hits_keys() {
        let keys = [k(0.0, 1.0, 0.0, 0.0), k(1.0, 3.0, 0.0, 0.0)];
        assert_eq!(sample_keys(&keys, -1.0), Some(1.0));
        assert_eq!(sample_keys(&keys, 2.0), Some(3.0));
        assert_eq!(sample_keys(&keys, 0.0), Some(1.0));
        assert_eq!(sample_keys(&[], 0.0), None);
    }

    #[test]
    fn secant_tangents_give_linear_segment() {
        let keys = [k(0.0, 0.0, 2.0, 2.0), k(0.5, 1.0, 2.0, 2.0)];
        for i in 0..=10 {
            let t = i as f32 * 0.05;
            let v = sample_keys(&keys, t).expect("in range");
            assert!((v - 2.0 * t).abs() < 1e-5, "t={t} v={v}");
        }
    }

    #[test]
    fn flat_tangents_ease() {
        let keys = [k(0.0, 0.0, 0.0, 0.0), k(1.0, 1.0, 0.0, 0.0)];
        let v = sample_keys(&keys, 0.25).expect("in range");
        assert!((v - 0.15625).abs() < 1e-6);
        assert!((normalized_curve(0.5, 1.0, 1.0) - 0.5).abs() < 1e-6);
    }
}
