//! Hermite tangent channels and the authoring presets that seed them.
//!
//! A tangent is stored twice: `normalized_value` is the authored ratio against
//! the adjacent segment's secant slope (this is what gets persisted), and
//! `value` is the absolute slope handed to the player. `value` is derived and
//! must be recomputed whenever a neighbouring keyframe changes.

use serde::{Deserialize, Serialize};

/// Authoring presets for newly created tangent channels.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TangentType {
    EaseInOut,
    EaseIn,
    EaseOut,
    Linear,
    #[default]
    Smooth,
}

/// Normalized in/out pair applied to every channel of a fresh transform.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TangentPair {
    pub in_tangent: f32,
    pub out_tangent: f32,
    pub is_smooth: bool,
}

impl TangentPair {
    pub fn preset(kind: TangentType) -> Self {
        match kind {
            TangentType::EaseInOut => Self {
                in_tangent: 0.0,
                out_tangent: 0.0,
                is_smooth: false,
            },
            TangentType::EaseIn => Self {
                in_tangent: 0.0,
                out_tangent: 1.0,
                is_smooth: false,
            },
            TangentType::EaseOut => Self {
                in_tangent: 1.0,
                out_tangent: 0.0,
                is_smooth: false,
            },
            TangentType::Linear => Self {
                in_tangent: 1.0,
                out_tangent: 1.0,
                is_smooth: false,
            },
            TangentType::Smooth => Self {
                in_tangent: 0.0,
                out_tangent: 0.0,
                is_smooth: true,
            },
        }
    }

    pub(crate) fn in_channel(&self) -> TangentChannel {
        TangentChannel::new(self.in_tangent, self.is_smooth)
    }

    pub(crate) fn out_channel(&self) -> TangentChannel {
        TangentChannel::new(self.out_tangent, self.is_smooth)
    }
}

/// Range applied to auto-derived (smooth) normalized tangents.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TangentClamp {
    pub min: f32,
    pub max: f32,
}

impl Default for TangentClamp {
    fn default() -> Self {
        Self { min: 0.0, max: 1.0 }
    }
}

impl TangentClamp {
    /// Clamp `v` into `[min, max]`. A reversed range collapses onto `min`.
    #[inline]
    pub fn clamp(&self, v: f32) -> f32 {
        if self.max < self.min {
            return self.min;
        }
        v.clamp(self.min, self.max)
    }
}

/// One scalar channel's Hermite slope.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct TangentChannel {
    value: f32,
    pub normalized_value: f32,
    pub is_smooth: bool,
}

impl TangentChannel {
    pub fn new(normalized_value: f32, is_smooth: bool) -> Self {
        Self {
            value: 0.0,
            normalized_value,
            is_smooth,
        }
    }

    /// Absolute slope, valid after the last `update_value`.
    #[inline]
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Re-derive the absolute slope from the local secant.
    #[inline]
    pub fn update_value(&mut self, secant: f32) {
        self.value = self.normalized_value * secant;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_match_easing_shapes() {
        let ease_in = TangentPair::preset(TangentType::EaseIn);
        assert_eq!(ease_in.in_tangent, 0.0);
        assert_eq!(ease_in.out_tangent, 1.0);
        assert!(!ease_in.is_smooth);

        let smooth = TangentPair::preset(TangentType::Smooth);
        assert!(smooth.is_smooth);
        assert_eq!(TangentPair::preset(TangentType::Linear).in_tangent, 1.0);
    }

    #[test]
    fn update_value_scales_secant() {
        let mut ch = TangentChannel::new(0.5, false);
        ch.update_value(4.0);
        assert_eq!(ch.value(), 2.0);
        ch.normalized_value = 0.0;
        ch.update_value(4.0);
        assert_eq!(ch.value(), 0.0);
    }

    #[test]
    fn clamp_respects_range() {
        let c = TangentClamp { min: -0.5, max: 2.0 };
        assert_eq!(c.clamp(3.0), 2.0);
        assert_eq!(c.clamp(-1.0), -0.5);
        assert_eq!(c.clamp(1.25), 1.25);
        let reversed = TangentClamp { min: 1.0, max: 0.0 };
        assert_eq!(reversed.clamp(0.5), 1.0);
    }
}
