//! JSON project file: the editable form of a [`Timeline`].
//!
//! Only normalized tangents and smooth masks are stored. Absolute tangents
//! are recomputed from neighbours on load.

use serde::{Deserialize, Serialize};

use crate::bones::BoneTable;
use crate::config::Config;
use crate::error::ProjectError;
use crate::tangent::TangentClamp;
use crate::timeline::Timeline;
use crate::transform::BoneTransform;

pub const PROJECT_VERSION: u32 = 1;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectFile {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub clip_name: String,
    pub frame_rate: f32,
    pub max_frame_index: u32,
    #[serde(default = "default_true")]
    pub is_looping: bool,
    #[serde(default)]
    pub use_physics_left: bool,
    #[serde(default)]
    pub use_physics_right: bool,
    /// Absent means the host config's clamp applies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tangent_clamp: Option<TangentClamp>,
    #[serde(default)]
    pub frames: Vec<ProjectFrame>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectFrame {
    pub frame: u32,
    pub bones: Vec<ProjectBone>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectBone {
    pub path: String,
    /// `[qx, qy, qz, qw]`, plus `[px, py, pz]` for the root.
    pub values: Vec<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_tangents: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out_tangents: Option<Vec<f32>>,
    #[serde(default)]
    pub in_smooth_bits: u32,
    #[serde(default)]
    pub out_smooth_bits: u32,
}

fn default_version() -> u32 {
    PROJECT_VERSION
}

fn default_true() -> bool {
    true
}

impl ProjectBone {
    fn from_transform(t: &BoneTransform) -> Self {
        Self {
            path: t.bone_path.clone(),
            values: t.values(),
            in_tangents: t.normalized_in_tangents(),
            out_tangents: t.normalized_out_tangents(),
            in_smooth_bits: t.in_smooth_bits(),
            out_smooth_bits: t.out_smooth_bits(),
        }
    }
}

impl ProjectFile {
    pub fn from_timeline(timeline: &Timeline) -> Self {
        let frames = timeline
            .frames()
            .iter()
            .map(|f| {
                let mut bones: Vec<ProjectBone> = f.iter().map(ProjectBone::from_transform).collect();
                bones.sort_by(|a, b| a.path.cmp(&b.path));
                ProjectFrame {
                    frame: f.frame_index,
                    bones,
                }
            })
            .collect();
        Self {
            version: PROJECT_VERSION,
            clip_name: timeline.clip_name.clone(),
            frame_rate: timeline.frame_rate(),
            max_frame_index: timeline.max_frame_index(),
            is_looping: timeline.is_looping,
            use_physics_left: timeline.use_physics_left,
            use_physics_right: timeline.use_physics_right,
            tangent_clamp: Some(timeline.tangent_clamp),
            frames,
        }
    }

    /// Rebuild a timeline. Every bone must be known to `table` and carry the
    /// right number of values. Tangents are recomputed before returning.
    pub fn into_timeline(self, table: &BoneTable, config: &Config) -> Result<Timeline, ProjectError> {
        if self.frame_rate.is_nan() || self.frame_rate <= 0.0 {
            return Err(ProjectError::InvalidFrameRate(self.frame_rate));
        }

        let mut timeline = Timeline::new(config);
        timeline.clip_name = self.clip_name;
        timeline.set_frame_rate(self.frame_rate);
        timeline.is_looping = self.is_looping;
        timeline.use_physics_left = self.use_physics_left;
        timeline.use_physics_right = self.use_physics_right;
        if let Some(clamp) = self.tangent_clamp {
            timeline.tangent_clamp = clamp;
        }

        let pair = config.default_tangent_pair();
        for frame in self.frames {
            for bone in frame.bones {
                let info = table.by_path(&bone.path).ok_or_else(|| ProjectError::UnknownBone {
                    path: bone.path.clone(),
                    frame: frame.frame,
                })?;
                let expected = info.channel_count();
                if bone.values.len() != expected {
                    return Err(ProjectError::ValueCount {
                        path: bone.path,
                        frame: frame.frame,
                        found: bone.values.len(),
                        expected,
                    });
                }

                let mut t = BoneTransform::new(info, pair);
                t.set_values(&bone.values);
                t.set_in_smooth_bits(bone.in_smooth_bits);
                t.set_out_smooth_bits(bone.out_smooth_bits);
                t.set_normalized_in_tangents(bone.in_tangents.as_deref().unwrap_or(&[]));
                t.set_normalized_out_tangents(bone.out_tangents.as_deref().unwrap_or(&[]));
                timeline.put_bone(frame.frame, t);
            }
        }
        timeline.clean_frames();
        timeline.set_max_frame_index(self.max_frame_index);
        timeline.prepare_export();
        Ok(timeline)
    }
}

pub fn save_project(timeline: &Timeline) -> Result<String, ProjectError> {
    serde_json::to_string_pretty(&ProjectFile::from_timeline(timeline)).map_err(ProjectError::Serialize)
}

pub fn load_project(json: &str, table: &BoneTable, config: &Config) -> Result<Timeline, ProjectError> {
    let file: ProjectFile = serde_json::from_str(json).map_err(ProjectError::Parse)?;
    file.into_timeline(table, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_bone() {
        let json = r#"{
            "frame_rate": 30.0,
            "max_frame_index": 10,
            "frames": [ { "frame": 0, "bones": [ { "path": "Nope", "values": [0,0,0,1] } ] } ]
        }"#;
        let err = load_project(json, &BoneTable::standard(), &Config::default()).expect_err("unknown");
        assert!(matches!(err, ProjectError::UnknownBone { frame: 0, .. }));
    }

    #[test]
    fn rejects_wrong_value_count() {
        let json = r#"{
            "frame_rate": 30.0,
            "max_frame_index": 10,
            "frames": [ { "frame": 0, "bones": [ { "path": "Bip01", "values": [0,0,0,1] } ] } ]
        }"#;
        let err = load_project(json, &BoneTable::standard(), &Config::default()).expect_err("count");
        assert!(matches!(err, ProjectError::ValueCount { expected: 7, found: 4, .. }));
    }

    #[test]
    fn rejects_non_positive_frame_rate() {
        let json = r#"{ "frame_rate": 0.0, "max_frame_index": 10 }"#;
        let err = load_project(json, &BoneTable::standard(), &Config::default()).expect_err("rate");
        assert!(matches!(err, ProjectError::InvalidFrameRate(_)));
    }

    #[test]
    fn smooth_tangents_are_not_written() {
        let table = BoneTable::standard();
        let config = Config::default();
        let json = r#"{
            "clip_name": "idle",
            "frame_rate": 30.0,
            "max_frame_index": 10,
            "frames": [ { "frame": 0, "bones": [ { "path": "Bip01", "values": [0,0,0,1,0,0.9,0],
                "in_smooth_bits": 127, "out_smooth_bits": 127 } ] } ]
        }"#;
        let tl = load_project(json, &table, &config).expect("loads");
        let out = save_project(&tl).expect("saves");
        assert!(!out.contains("in_tangents"));
        assert!(out.contains("\"in_smooth_bits\": 127"));
    }
}
