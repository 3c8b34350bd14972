//! Ordered keyframes plus the clip-wide settings that drive tangent and
//! loop handling.
//!
//! Frame indices are `u32`. Neighbour queries take `i64` so that the loop
//! wrap can probe `-1` and `max_frame_index + 1` and report effective indices
//! that fall outside the clip.

use crate::config::Config;
use crate::error::ValidationError;
use crate::keyframe::KeyFrame;
use crate::tangent::TangentClamp;
use crate::transform::BoneTransform;

/// A bone found by a neighbour query.
#[derive(Clone, Copy, Debug)]
pub struct Neighbor<'a> {
    pub transform: &'a BoneTransform,
    /// Index of the keyframe that actually holds `transform`.
    pub frame_index: u32,
    /// Index to use for time arithmetic; differs from `frame_index` when the
    /// lookup wrapped around the loop or fell back to a clamp.
    pub effective_index: i64,
}

impl Neighbor<'_> {
    #[inline]
    pub fn is_wrapped(&self) -> bool {
        self.effective_index != i64::from(self.frame_index)
    }
}

#[derive(Clone, Debug)]
pub struct Timeline {
    frames: Vec<KeyFrame>,
    frame_rate: f32,
    frame_duration: f32,
    max_frame_index: u32,
    pub is_looping: bool,
    pub tangent_clamp: TangentClamp,
    pub clip_name: String,
    /// Emit keys for the left physics bone and set the matching clip flag.
    pub use_physics_left: bool,
    pub use_physics_right: bool,
    dummy_last_frame: KeyFrame,
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

impl Timeline {
    pub fn new(config: &Config) -> Self {
        let frame_rate = config.default_frame_rate.max(1.0);
        let max_frame_index = config.default_max_frame_index.max(1);
        Self {
            frames: Vec::new(),
            frame_rate,
            frame_duration: 1.0 / frame_rate,
            max_frame_index,
            is_looping: config.default_looping,
            tangent_clamp: config.tangent_clamp,
            clip_name: String::new(),
            use_physics_left: false,
            use_physics_right: false,
            dummy_last_frame: KeyFrame::new(max_frame_index),
        }
    }

    // ---- settings ----

    #[inline]
    pub fn frame_rate(&self) -> f32 {
        self.frame_rate
    }

    /// Set frames per second; values below 1 are raised to 1.
    pub fn set_frame_rate(&mut self, value: f32) {
        self.frame_rate = value.max(1.0);
        self.frame_duration = 1.0 / self.frame_rate;
    }

    #[inline]
    pub fn frame_duration(&self) -> f32 {
        self.frame_duration
    }

    #[inline]
    pub fn max_frame_index(&self) -> u32 {
        self.max_frame_index
    }

    /// Set the clip length; never below the last keyed frame or 1.
    pub fn set_max_frame_index(&mut self, value: u32) {
        self.max_frame_index = value.max(self.last_frame_index()).max(1);
    }

    /// Time of `index` in seconds. Accepts the out-of-range effective indices
    /// produced by the loop wrap.
    ///
    /// Divides by the frame rate rather than multiplying by
    /// [`Timeline::frame_duration`]; the player compares key times bit for bit.
    #[inline]
    pub fn frame_time_seconds(&self, index: i64) -> f32 {
        index as f32 / self.frame_rate
    }

    // ---- frames ----

    pub fn frames(&self) -> &[KeyFrame] {
        &self.frames
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn first_frame(&self) -> Option<&KeyFrame> {
        self.frames.first()
    }

    /// Index of the last keyframe, or 0 when empty.
    pub fn last_frame_index(&self) -> u32 {
        self.frames.last().map_or(0, |f| f.frame_index)
    }

    pub fn get_frame(&self, index: u32) -> Option<&KeyFrame> {
        self.frames
            .binary_search_by_key(&index, |f| f.frame_index)
            .ok()
            .map(|i| &self.frames[i])
    }

    pub fn get_frame_mut(&mut self, index: u32) -> Option<&mut KeyFrame> {
        match self.frames.binary_search_by_key(&index, |f| f.frame_index) {
            Ok(i) => Some(&mut self.frames[i]),
            Err(_) => None,
        }
    }

    pub fn get_or_create_frame(&mut self, index: u32) -> &mut KeyFrame {
        let i = match self.frames.binary_search_by_key(&index, |f| f.frame_index) {
            Ok(i) => i,
            Err(i) => {
                self.frames.insert(i, KeyFrame::new(index));
                i
            }
        };
        &mut self.frames[i]
    }

    /// Last keyframe at or before `frame`.
    pub fn active_frame(&self, frame: f32) -> Option<&KeyFrame> {
        self.frames
            .iter()
            .rev()
            .find(|f| f.frame_index as f32 <= frame)
    }

    /// Insert or replace a bone at `index`, growing the clip if needed.
    pub fn put_bone(&mut self, index: u32, transform: BoneTransform) {
        self.get_or_create_frame(index).put(transform);
        if index > self.max_frame_index {
            self.max_frame_index = index;
        }
    }

    pub fn put_bones<I>(&mut self, index: u32, transforms: I)
    where
        I: IntoIterator<Item = BoneTransform>,
    {
        for t in transforms {
            self.put_bone(index, t);
        }
    }

    /// Remove one bone; the frame goes with it once empty.
    pub fn remove_bone(&mut self, index: u32, path: &str) -> Option<BoneTransform> {
        let i = self
            .frames
            .binary_search_by_key(&index, |f| f.frame_index)
            .ok()?;
        let removed = self.frames[i].remove(path);
        if self.frames[i].is_empty() {
            self.frames.remove(i);
        }
        removed
    }

    pub fn remove_frame(&mut self, index: u32) -> Option<KeyFrame> {
        let i = self
            .frames
            .binary_search_by_key(&index, |f| f.frame_index)
            .ok()?;
        Some(self.frames.remove(i))
    }

    /// Drop keyframes that hold no bones.
    pub fn clean_frames(&mut self) {
        self.frames.retain(|f| !f.is_empty());
    }

    /// Every bone path keyed anywhere, sorted and de-duplicated.
    pub fn bone_paths(&self) -> Vec<String> {
        let mut out: Vec<String> = self
            .frames
            .iter()
            .flat_map(|f| f.iter().map(|t| t.bone_path.clone()))
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    /// The synthesized key set at `max_frame_index`, as of the last
    /// [`Timeline::update_dummy_last_frame`].
    pub fn dummy_last_frame(&self) -> &KeyFrame {
        &self.dummy_last_frame
    }

    // ---- neighbour queries ----

    /// Nearest keyframe strictly before `frame_index` that holds `path`.
    ///
    /// With `loop_search`, a miss wraps: a looping clip re-queries before
    /// `max` (when `frame_index == 0`) or `max + 1` and shifts the result by
    /// `-max`; a non-looping clip falls back to the bone's first key at
    /// effective index `-1`.
    pub fn get_prev_bone(
        &self,
        frame_index: i64,
        path: &str,
        loop_search: bool,
    ) -> Option<Neighbor<'_>> {
        let found = self
            .frames
            .iter()
            .take_while(|f| i64::from(f.frame_index) < frame_index)
            .filter_map(|f| f.get(path).map(|t| (f.frame_index, t)))
            .last();
        if let Some((idx, transform)) = found {
            return Some(Neighbor {
                transform,
                frame_index: idx,
                effective_index: i64::from(idx),
            });
        }
        if !loop_search {
            return None;
        }

        let max = i64::from(self.max_frame_index);
        if self.is_looping {
            let probe = if frame_index == 0 { max } else { max + 1 };
            self.get_prev_bone(probe, path, false).map(|n| Neighbor {
                effective_index: n.effective_index - max,
                ..n
            })
        } else {
            self.get_next_bone(-1, path, false).map(|n| Neighbor {
                effective_index: -1,
                ..n
            })
        }
    }

    /// Nearest keyframe strictly after `frame_index` that holds `path`.
    ///
    /// The loop wrap re-queries after `0` (when `frame_index == max`) or `-1`
    /// and shifts by `+max`; a non-looping clip falls back to the bone's last
    /// key at effective index `max + 1`.
    pub fn get_next_bone(
        &self,
        frame_index: i64,
        path: &str,
        loop_search: bool,
    ) -> Option<Neighbor<'_>> {
        let found = self
            .frames
            .iter()
            .filter(|f| i64::from(f.frame_index) > frame_index)
            .find_map(|f| f.get(path).map(|t| (f.frame_index, t)));
        if let Some((idx, transform)) = found {
            return Some(Neighbor {
                transform,
                frame_index: idx,
                effective_index: i64::from(idx),
            });
        }
        if !loop_search {
            return None;
        }

        let max = i64::from(self.max_frame_index);
        if self.is_looping {
            let probe = if frame_index == max { 0 } else { -1 };
            self.get_next_bone(probe, path, false).map(|n| Neighbor {
                effective_index: n.effective_index + max,
                ..n
            })
        } else {
            self.get_prev_bone(max + 1, path, false).map(|n| Neighbor {
                effective_index: max + 1,
                ..n
            })
        }
    }

    // ---- passes ----

    /// Align every key's quaternion sign with the bone's previous key.
    /// Runs in ascending order and skips frame 0.
    pub fn fix_rotation_pass(&mut self) {
        for fi in 0..self.frames.len() {
            if self.frames[fi].frame_index == 0 {
                continue;
            }
            let (before, rest) = self.frames.split_at_mut(fi);
            for t in rest[0].iter_mut() {
                if let Some(prev) = before.iter().rev().find_map(|f| f.get(&t.bone_path)) {
                    t.fix_rotation(prev);
                }
            }
        }
    }

    /// Recompute tangents for every key from its loop-aware neighbours.
    pub fn update_tangent(&mut self) {
        let clamp = self.tangent_clamp;
        for fi in 0..self.frames.len() {
            let frame_index = self.frames[fi].frame_index;
            let t1 = self.frame_time_seconds(i64::from(frame_index));
            let paths: Vec<String> = self.frames[fi].iter().map(|t| t.bone_path.clone()).collect();
            for path in paths {
                let Some(cur) = self.frames[fi].get(&path) else {
                    continue;
                };
                let (prev, prev_index) = self.tangent_prev(frame_index, cur);
                let (next, next_index) = self.tangent_next(frame_index, cur);
                let t0 = self.frame_time_seconds(prev_index);
                let t2 = self.frame_time_seconds(next_index);
                if let Some(cur) = self.frames[fi].get_mut(&path) {
                    cur.update_tangent(&prev, &next, t0, t1, t2, &clamp);
                }
            }
        }
    }

    fn tangent_prev(&self, frame_index: u32, cur: &BoneTransform) -> (BoneTransform, i64) {
        match self.get_prev_bone(i64::from(frame_index), &cur.bone_path, true) {
            Some(n) => {
                let mut t = n.transform.clone();
                if n.is_wrapped() {
                    t.fix_rotation(cur);
                }
                (t, n.effective_index)
            }
            None => (cur.clone(), i64::from(frame_index) - 1),
        }
    }

    fn tangent_next(&self, frame_index: u32, cur: &BoneTransform) -> (BoneTransform, i64) {
        match self.get_next_bone(i64::from(frame_index), &cur.bone_path, true) {
            Some(n) => {
                let mut t = n.transform.clone();
                if n.is_wrapped() {
                    t.fix_rotation(cur);
                }
                (t, n.effective_index)
            }
            None => (cur.clone(), i64::from(frame_index) + 1),
        }
    }

    /// Rebuild the synthesized key set at `max_frame_index`.
    ///
    /// Every bone keyed at frame 0 but not at `max_frame_index` gets a key
    /// there: frame 0's transform when looping, the last real key otherwise.
    /// It is sign-aligned with the bone's previous key and only its
    /// in-tangent is computed.
    pub fn update_dummy_last_frame(&mut self) {
        let max = self.max_frame_index;
        let mut dummy = KeyFrame::new(max);
        let t_max = self.frame_time_seconds(i64::from(max));

        if let Some(first) = self.frames.first().filter(|f| f.frame_index == 0) {
            let at_max = self.get_frame(max);
            for src in first.iter() {
                let path = src.bone_path.as_str();
                if at_max.is_some_and(|f| f.contains(path)) {
                    continue;
                }
                let Some(prev) = self.get_prev_bone(i64::from(max), path, false) else {
                    continue;
                };
                let mut t = if self.is_looping {
                    src.clone()
                } else {
                    prev.transform.clone()
                };
                t.fix_rotation(prev.transform);
                let t_prev = self.frame_time_seconds(i64::from(prev.frame_index));
                t.update_in_tangent(prev.transform, t_prev, t_max);
                dummy.put(t);
            }
        }

        self.dummy_last_frame = dummy;
    }

    /// Continuity, tangent and loop-closing passes, in that order.
    pub fn prepare_export(&mut self) {
        self.fix_rotation_pass();
        self.update_tangent();
        self.update_dummy_last_frame();
    }

    /// Export preconditions, checked in a fixed order.
    pub fn validate_for_export(&self, actor_bound: bool) -> Result<(), ValidationError> {
        if !actor_bound {
            return Err(ValidationError::NoBoundActor);
        }
        if self.clip_name.is_empty() {
            return Err(ValidationError::EmptyClipName);
        }
        match self.frames.first() {
            Some(f) if f.frame_index == 0 => Ok(()),
            _ => Err(ValidationError::MissingFirstFrame),
        }
    }
}
