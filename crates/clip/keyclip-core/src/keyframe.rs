//! A keyframe: bone transforms at one frame index.

use hashbrown::HashMap;

use crate::bones::BoneRole;
use crate::transform::BoneTransform;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct KeyFrame {
    pub frame_index: u32,
    bones: HashMap<String, BoneTransform>,
}

impl KeyFrame {
    pub fn new(frame_index: u32) -> Self {
        Self {
            frame_index,
            bones: HashMap::new(),
        }
    }

    pub fn get(&self, path: &str) -> Option<&BoneTransform> {
        self.bones.get(path)
    }

    pub fn get_mut(&mut self, path: &str) -> Option<&mut BoneTransform> {
        self.bones.get_mut(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.bones.contains_key(path)
    }

    /// Insert or replace the transform stored under its own bone path.
    pub fn put(&mut self, transform: BoneTransform) -> Option<BoneTransform> {
        self.bones.insert(transform.bone_path.clone(), transform)
    }

    pub fn remove(&mut self, path: &str) -> Option<BoneTransform> {
        self.bones.remove(path)
    }

    pub fn clear(&mut self) {
        self.bones.clear();
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BoneTransform> {
        self.bones.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut BoneTransform> {
        self.bones.values_mut()
    }

    /// Bone paths in sorted order.
    pub fn paths(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self.bones.keys().map(String::as_str).collect();
        out.sort_unstable();
        out
    }

    /// Transforms in `self` that are missing from or differ from `baseline`,
    /// sorted by path.
    ///
    /// The head is never reported. Physics bones are reported only when the
    /// matching include flag is set.
    pub fn diff(
        &self,
        baseline: &KeyFrame,
        include_physics_left: bool,
        include_physics_right: bool,
    ) -> Vec<BoneTransform> {
        let mut out: Vec<BoneTransform> = self
            .bones
            .iter()
            .filter(|(_, t)| match t.role {
                BoneRole::Head => false,
                BoneRole::PhysicsLeft => include_physics_left,
                BoneRole::PhysicsRight => include_physics_right,
                _ => true,
            })
            .filter(|(path, t)| baseline.get(path.as_str()) != Some(*t))
            .map(|(_, t)| t.clone())
            .collect();
        out.sort_by(|a, b| a.bone_path.cmp(&b.bone_path));
        out
    }

    /// True when the frame carries an entry for every tracked bone.
    pub fn is_complete(&self, tracked_count: usize) -> bool {
        self.bones.len() == tracked_count
    }

    /// Offset the root position. Returns false when the frame has no root.
    pub fn add_root_position(&mut self, delta: [f32; 3]) -> bool {
        let Some(root) = self.bones.values_mut().find(|t| t.is_root()) else {
            return false;
        };
        let p = root.position.get_or_insert([0.0; 3]);
        for (v, d) in p.iter_mut().zip(delta) {
            *v += d;
        }
        true
    }
}
