//! One bone's pose at one keyframe, together with its Hermite tangents.
//!
//! Channels are laid out as `[qx, qy, qz, qw]` for every bone, followed by
//! `[px, py, pz]` for the root. Tangent arrays always match that length.

use crate::bones::{BoneInfo, BoneRole, BoneTable};
use crate::math::{dot4, negate4, IDENTITY};
use crate::tangent::{TangentChannel, TangentClamp, TangentPair};

#[derive(Clone, Debug)]
pub struct BoneTransform {
    pub bone_path: String,
    pub role: BoneRole,
    /// Local rotation quaternion `[x, y, z, w]`.
    pub rotation: [f32; 4],
    /// Local position; only the root carries one.
    pub position: Option<[f32; 3]>,
    in_tangents: Vec<TangentChannel>,
    out_tangents: Vec<TangentChannel>,
}

impl BoneTransform {
    /// Fresh transform at identity with `pair` applied to every channel.
    pub fn new(info: &BoneInfo, pair: TangentPair) -> Self {
        Self::with_role(info.path.clone(), info.role, pair)
    }

    pub fn with_role(bone_path: impl Into<String>, role: BoneRole, pair: TangentPair) -> Self {
        let n = role.channel_count();
        Self {
            bone_path: bone_path.into(),
            role,
            rotation: IDENTITY,
            position: (role == BoneRole::Root).then_some([0.0; 3]),
            in_tangents: vec![pair.in_channel(); n],
            out_tangents: vec![pair.out_channel(); n],
        }
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.role == BoneRole::Root
    }

    #[inline]
    pub fn channel_count(&self) -> usize {
        self.in_tangents.len()
    }

    /// Scalar value of channel `i`. Out-of-range channels read as zero.
    #[inline]
    pub fn channel(&self, i: usize) -> f32 {
        match i {
            0..=3 => self.rotation[i],
            4..=6 => self.position.map(|p| p[i - 4]).unwrap_or(0.0),
            _ => 0.0,
        }
    }

    pub fn values(&self) -> Vec<f32> {
        (0..self.channel_count()).map(|i| self.channel(i)).collect()
    }

    /// Overwrite channels from `values`; extra entries are ignored and
    /// missing ones keep their current value.
    pub fn set_values(&mut self, values: &[f32]) {
        for (i, &v) in values.iter().enumerate().take(self.channel_count()) {
            match i {
                0..=3 => self.rotation[i] = v,
                _ => {
                    if let Some(p) = self.position.as_mut() {
                        p[i - 4] = v;
                    }
                }
            }
        }
    }

    pub fn in_tangents(&self) -> &[TangentChannel] {
        &self.in_tangents
    }

    pub fn out_tangents(&self) -> &[TangentChannel] {
        &self.out_tangents
    }

    pub fn in_tangents_mut(&mut self) -> &mut [TangentChannel] {
        &mut self.in_tangents
    }

    pub fn out_tangents_mut(&mut self) -> &mut [TangentChannel] {
        &mut self.out_tangents
    }

    /// Copy pose and tangents from another transform, keeping this path.
    pub fn copy_from(&mut self, other: &BoneTransform) {
        self.rotation = other.rotation;
        if self.position.is_some() {
            self.position = other.position.or(self.position);
        }
        for (dst, src) in self.in_tangents.iter_mut().zip(&other.in_tangents) {
            *dst = *src;
        }
        for (dst, src) in self.out_tangents.iter_mut().zip(&other.out_tangents) {
            *dst = *src;
        }
    }

    /// Flip to the double-cover sign closest to `prev`.
    pub fn fix_rotation(&mut self, prev: &BoneTransform) {
        if dot4(prev.rotation, self.rotation) < 0.0 {
            self.rotation = negate4(self.rotation);
        }
    }

    /// Recompute both tangent arrays from neighbouring keys.
    ///
    /// `t0 < t1 < t2` must hold; otherwise nothing changes.
    pub fn update_tangent(
        &mut self,
        prev: &BoneTransform,
        next: &BoneTransform,
        t0: f32,
        t1: f32,
        t2: f32,
        clamp: &TangentClamp,
    ) {
        let dt0 = t1 - t0;
        let dt1 = t2 - t1;
        if dt0 <= 0.0 || dt1 <= 0.0 {
            log::error!(
                "invalid frame timing for '{}': {t0} / {t1} / {t2}",
                self.bone_path
            );
            return;
        }
        let dt = dt0 + dt1;

        for i in 0..self.channel_count() {
            let x0 = prev.channel(i);
            let x1 = self.channel(i);
            let x2 = next.channel(i);
            let v0 = (x1 - x0) / dt0;
            let v1 = (x2 - x1) / dt1;

            let in_t = &mut self.in_tangents[i];
            let out_t = &mut self.out_tangents[i];

            if in_t.is_smooth || out_t.is_smooth {
                let tan = (x2 - x0) / dt;
                if in_t.is_smooth {
                    if v0 != 0.0 {
                        in_t.normalized_value = clamp.clamp(tan / v0);
                    } else {
                        log::debug!("'{}' ch{i}: flat in-secant, keeping tangent", self.bone_path);
                    }
                }
                if out_t.is_smooth {
                    if v1 != 0.0 {
                        out_t.normalized_value = clamp.clamp(tan / v1);
                    } else {
                        log::debug!("'{}' ch{i}: flat out-secant, keeping tangent", self.bone_path);
                    }
                }
            }

            in_t.update_value(v0);
            out_t.update_value(v1);
        }
    }

    /// In-tangent only; used for the synthesized loop-closing key.
    pub fn update_in_tangent(&mut self, prev: &BoneTransform, t0: f32, t1: f32) {
        let dt0 = t1 - t0;
        if dt0 <= 0.0 {
            log::error!("invalid frame timing for '{}': {t0} / {t1}", self.bone_path);
            return;
        }
        for i in 0..self.channel_count() {
            let v0 = (self.channel(i) - prev.channel(i)) / dt0;
            self.in_tangents[i].update_value(v0);
        }
    }

    /// Return to the rest pose listed in `table`. Unknown bones go to identity.
    pub fn reset(&mut self, table: &BoneTable) {
        match table.rest_transform(&self.bone_path) {
            Some(rest) => {
                self.rotation = rest.rotation;
                if self.position.is_some() {
                    self.position = rest.position.or(Some([0.0; 3]));
                }
            }
            None => {
                self.rotation = IDENTITY;
                if let Some(p) = self.position.as_mut() {
                    *p = [0.0; 3];
                }
            }
        }
    }

    pub fn in_smooth_bits(&self) -> u32 {
        smooth_bits(&self.in_tangents)
    }

    pub fn out_smooth_bits(&self) -> u32 {
        smooth_bits(&self.out_tangents)
    }

    pub fn set_in_smooth_bits(&mut self, bits: u32) {
        apply_smooth_bits(&mut self.in_tangents, bits);
    }

    pub fn set_out_smooth_bits(&mut self, bits: u32) {
        apply_smooth_bits(&mut self.out_tangents, bits);
    }

    /// Normalized in-tangents, or `None` when every channel is smooth or zero.
    pub fn normalized_in_tangents(&self) -> Option<Vec<f32>> {
        normalized(&self.in_tangents)
    }

    pub fn normalized_out_tangents(&self) -> Option<Vec<f32>> {
        normalized(&self.out_tangents)
    }

    /// Restore persisted in-tangents; missing entries become zero.
    pub fn set_normalized_in_tangents(&mut self, values: &[f32]) {
        apply_normalized(&mut self.in_tangents, values);
    }

    pub fn set_normalized_out_tangents(&mut self, values: &[f32]) {
        apply_normalized(&mut self.out_tangents, values);
    }
}

fn smooth_bits(channels: &[TangentChannel]) -> u32 {
    channels
        .iter()
        .enumerate()
        .filter(|(_, c)| c.is_smooth)
        .fold(0, |acc, (i, _)| acc | (1 << i))
}

fn apply_smooth_bits(channels: &mut [TangentChannel], bits: u32) {
    for (i, c) in channels.iter_mut().enumerate() {
        c.is_smooth = bits & (1 << i) != 0;
    }
}

fn normalized(channels: &[TangentChannel]) -> Option<Vec<f32>> {
    channels
        .iter()
        .any(|c| !c.is_smooth && c.normalized_value != 0.0)
        .then(|| channels.iter().map(|c| c.normalized_value).collect())
}

fn apply_normalized(channels: &mut [TangentChannel], values: &[f32]) {
    for (i, c) in channels.iter_mut().enumerate() {
        c.normalized_value = values.get(i).copied().unwrap_or(0.0);
    }
}

impl PartialEq for BoneTransform {
    fn eq(&self, other: &Self) -> bool {
        if self.bone_path != other.bone_path || self.rotation != other.rotation {
            return false;
        }
        if self.is_root() && self.position != other.position {
            return false;
        }
        let same = |a: &[TangentChannel], b: &[TangentChannel]| {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.value() == y.value())
        };
        same(&self.in_tangents, &other.in_tangents) && same(&self.out_tangents, &other.out_tangents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tangent::TangentType;

    fn bone(rot: [f32; 4], pair: TangentPair) -> BoneTransform {
        let mut t = BoneTransform::with_role("Bip01/Bip01 Spine", BoneRole::Regular, pair);
        t.rotation = rot;
        t
    }

    #[test]
    fn root_has_seven_channels() {
        let t = BoneTransform::with_role("Bip01", BoneRole::Root, TangentPair::default());
        assert_eq!(t.channel_count(), 7);
        assert_eq!(t.position, Some([0.0; 3]));
        let n = BoneTransform::with_role("x", BoneRole::Regular, TangentPair::default());
        assert_eq!(n.channel_count(), 4);
        assert_eq!(n.position, None);
    }

    #[test]
    fn set_values_fills_position_for_root() {
        let mut t = BoneTransform::with_role("Bip01", BoneRole::Root, TangentPair::default());
        t.set_values(&[0.0, 0.0, 0.0, 1.0, 1.0, 2.0, 3.0]);
        assert_eq!(t.position, Some([1.0, 2.0, 3.0]));
        assert_eq!(t.values(), vec![0.0, 0.0, 0.0, 1.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn fix_rotation_negates_on_negative_dot() {
        let prev = bone([0.0, 0.0, 0.0, 1.0], TangentPair::default());
        let mut cur = bone([0.0, 0.1, 0.0, -0.99], TangentPair::default());
        cur.fix_rotation(&prev);
        assert_eq!(cur.rotation, [-0.0, -0.1, -0.0, 0.99]);
        assert!(dot4(prev.rotation, cur.rotation) >= 0.0);
    }

    #[test]
    fn smooth_tangent_guard_keeps_prior_value() {
        let pair = TangentPair::preset(TangentType::Smooth);
        let prev = bone([0.0, 0.0, 0.0, 1.0], pair);
        let next = bone([0.0, 0.5, 0.0, 1.0], pair);
        let mut cur = bone([0.0, 0.0, 0.0, 1.0], pair);
        cur.in_tangents_mut()[1].normalized_value = 0.25;
        cur.update_tangent(&prev, &next, 0.0, 1.0, 2.0, &TangentClamp::default());
        let in_y = cur.in_tangents()[1];
        assert_eq!(in_y.normalized_value, 0.25);
        assert_eq!(in_y.value(), 0.0);
        let out_y = cur.out_tangents()[1];
        assert!(out_y.normalized_value.is_finite());
        assert!((out_y.normalized_value - 0.5).abs() < 1e-6);
        assert!((out_y.value() - 0.25).abs() < 1e-6);
    }

    #[test]
    fn bad_timing_leaves_tangents_untouched() {
        let pair = TangentPair::preset(TangentType::Linear);
        let prev = bone([0.0, 0.0, 0.0, 1.0], pair);
        let mut cur = bone([0.0, 1.0, 0.0, 1.0], pair);
        let before = cur.clone();
        cur.update_tangent(&prev, &prev, 1.0, 1.0, 2.0, &TangentClamp::default());
        assert_eq!(cur, before);
    }

    #[test]
    fn equality_ignores_normalized_values() {
        let a = bone(IDENTITY, TangentPair::preset(TangentType::Linear));
        let mut b = a.clone();
        b.in_tangents_mut()[0].normalized_value = 0.3;
        assert_eq!(a, b);
        b.in_tangents_mut()[0].update_value(1.0);
        assert_ne!(a, b);
    }

    #[test]
    fn smooth_bits_round_trip() {
        let mut t = bone(IDENTITY, TangentPair::default());
        t.set_in_smooth_bits(0b1010);
        assert_eq!(t.in_smooth_bits(), 0b1010);
        assert!(t.in_tangents()[1].is_smooth);
        assert!(!t.in_tangents()[0].is_smooth);
    }

    #[test]
    fn normalized_tangents_omitted_when_implicit() {
        let smooth = bone(IDENTITY, TangentPair::preset(TangentType::Smooth));
        assert!(smooth.normalized_in_tangents().is_none());
        let linear = bone(IDENTITY, TangentPair::preset(TangentType::Linear));
        assert_eq!(linear.normalized_out_tangents(), Some(vec![1.0; 4]));
    }
}
