//! Engine: owns the config, the bone table and the timeline, and exposes the
//! authoring operations a host drives from its per-frame callback.
//!
//! Methods:
//! - bind_actor / unbind_actor, capture_frame, capture_diff, remove_bones,
//!   mirror_frame, reset_frame
//! - export_clip, import_pose_clip, apply_frame
//! - save_project, load_project

use std::fmt;

use crate::bones::BoneTable;
use crate::codec::{encode_clip, encode_pose, import_pose};
use crate::config::Config;
use crate::error::{ClipError, MalformedClipError, ProjectError, ValidationError};
use crate::keyframe::KeyFrame;
use crate::mirror::mirror_keyframe;
use crate::project::{load_project, save_project};
use crate::provider::{PoseSink, SkeletonProvider};
use crate::timeline::Timeline;
use crate::transform::BoneTransform;

pub struct ClipEngine {
    cfg: Config,
    bones: BoneTable,
    timeline: Timeline,
    actor: Option<Box<dyn SkeletonProvider>>,
}

impl fmt::Debug for ClipEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClipEngine")
            .field("cfg", &self.cfg)
            .field("bones", &self.bones.len())
            .field("timeline", &self.timeline)
            .field("actor_bound", &self.actor.is_some())
            .finish()
    }
}

impl ClipEngine {
    /// Engine over the standard skeleton.
    pub fn new(cfg: Config) -> Self {
        Self::with_bones(cfg, BoneTable::standard())
    }

    pub fn with_bones(cfg: Config, bones: BoneTable) -> Self {
        Self {
            timeline: Timeline::new(&cfg),
            cfg,
            bones,
            actor: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    pub fn bones(&self) -> &BoneTable {
        &self.bones
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn timeline_mut(&mut self) -> &mut Timeline {
        &mut self.timeline
    }

    pub fn bind_actor(&mut self, actor: Box<dyn SkeletonProvider>) {
        self.actor = Some(actor);
    }

    pub fn unbind_actor(&mut self) -> Option<Box<dyn SkeletonProvider>> {
        self.actor.take()
    }

    pub fn is_actor_bound(&self) -> bool {
        self.actor.is_some()
    }

    /// Snapshot the bound actor's tracked bones as a keyframe. Bones the
    /// actor does not report are left out.
    pub fn current_frame(&self, index: u32) -> Result<KeyFrame, ValidationError> {
        let actor = self.actor.as_ref().ok_or(ValidationError::NoBoundActor)?;
        let pose = actor.current_pose();
        let pair = self.cfg.default_tangent_pair();
        let mut frame = KeyFrame::new(index);
        for info in self.bones.tracked() {
            let Some(local) = pose.get(&info.path) else {
                continue;
            };
            let mut t = match self.timeline.get_frame(index).and_then(|f| f.get(&info.path)) {
                Some(existing) => existing.clone(),
                None => BoneTransform::new(info, pair),
            };
            t.rotation = local.rotation;
            if t.is_root() {
                t.position = Some(local.position);
            }
            frame.put(t);
        }
        Ok(frame)
    }

    /// Key every tracked bone of the bound actor at `index`. Existing keys
    /// keep their tangent settings. Returns the number of bones written.
    pub fn capture_frame(&mut self, index: u32) -> Result<usize, ValidationError> {
        let frame = self.current_frame(index)?;
        let n = frame.len();
        self.timeline.put_bones(index, frame.iter().cloned());
        Ok(n)
    }

    /// Key only the bones that differ from `baseline`. Head and physics
    /// bones follow [`KeyFrame::diff`] with the timeline's physics flags.
    pub fn capture_diff(&mut self, index: u32, baseline: &KeyFrame) -> Result<usize, ValidationError> {
        let frame = self.current_frame(index)?;
        let diff = frame.diff(
            baseline,
            self.timeline.use_physics_left,
            self.timeline.use_physics_right,
        );
        let n = diff.len();
        self.timeline.put_bones(index, diff);
        Ok(n)
    }

    /// Remove `paths` from the keyframe at `index`. Returns how many existed.
    pub fn remove_bones<'a, I>(&mut self, index: u32, paths: I) -> usize
    where
        I: IntoIterator<Item = &'a str>,
    {
        paths
            .into_iter()
            .filter(|p| self.timeline.remove_bone(index, p).is_some())
            .count()
    }

    /// Replace the keyframe at `dst` with the mirror image of `src`.
    /// Returns false when `src` has no keyframe.
    pub fn mirror_frame(&mut self, src: u32, dst: u32) -> bool {
        let Some(source) = self.timeline.get_frame(src) else {
            return false;
        };
        let mirrored = mirror_keyframe(source, &self.bones);
        self.timeline.remove_frame(dst);
        self.timeline.put_bones(dst, mirrored.iter().cloned());
        true
    }

    /// Return every bone keyed at `index` to its rest pose.
    pub fn reset_frame(&mut self, index: u32) -> usize {
        let Some(frame) = self.timeline.get_frame_mut(index) else {
            return 0;
        };
        for t in frame.iter_mut() {
            t.reset(&self.bones);
        }
        frame.len()
    }

    /// Validate, recompute and encode the whole timeline.
    pub fn export_clip(&mut self) -> Result<Vec<u8>, ClipError> {
        self.timeline.validate_for_export(self.is_actor_bound())?;
        self.timeline.prepare_export();
        encode_clip(&self.timeline, &self.bones, self.is_actor_bound())
    }

    /// Key a pose read from a binary clip at `index`. Nothing changes unless
    /// the whole clip parses.
    pub fn import_pose_clip(&mut self, bytes: &[u8], index: u32) -> Result<usize, MalformedClipError> {
        let pose = import_pose(bytes, &self.bones, index, self.cfg.default_tangent_pair())
            .map_err(|e| {
                log::warn!("pose import failed: {e}");
                e
            })?;
        let n = pose.frame.len();
        self.timeline.put_bones(index, pose.frame.iter().cloned());
        self.timeline.use_physics_left = pose.use_physics_left;
        self.timeline.use_physics_right = pose.use_physics_right;
        Ok(n)
    }

    /// Encode the keyframe at `index` as a static pose and hand it to `sink`.
    pub fn apply_frame(&self, index: u32, sink: &mut dyn PoseSink) -> bool {
        let Some(frame) = self.timeline.get_frame(index) else {
            return false;
        };
        let bytes = encode_pose(
            frame,
            &self.bones,
            self.timeline.use_physics_left,
            self.timeline.use_physics_right,
        );
        sink.apply_pose(&bytes);
        true
    }

    pub fn save_project(&self) -> Result<String, ProjectError> {
        save_project(&self.timeline)
    }

    /// Replace the timeline with a parsed project. On error the current
    /// timeline is kept.
    pub fn load_project(&mut self, json: &str) -> Result<(), ProjectError> {
        self.timeline = load_project(json, &self.bones, &self.cfg)?;
        Ok(())
    }
}
