//! keyclip core (host-agnostic)
//!
//! Keyframe clip authoring for a humanoid skeleton: per-bone transforms with
//! Hermite tangents, a loop-aware timeline, left/right mirroring, a JSON
//! project format, and the binary clip codec read by the host player.

pub mod bones;
pub mod codec;
pub mod config;
pub mod curve;
pub mod engine;
pub mod error;
pub mod keyframe;
pub mod math;
pub mod mirror;
pub mod project;
pub mod provider;
pub mod tangent;
pub mod timeline;
pub mod transform;

// Re-exports for host integrations
pub use bones::{BoneInfo, BoneRole, BoneTable, BoneType, RestPose};
pub use codec::{
    decode_clip, encode_clip, encode_pose, import_pose, ClipBone, ClipChannel, ClipData,
    ImportedPose, CLIP_MAGIC, CLIP_VERSION,
};
pub use config::Config;
pub use curve::{sample_keys, ClipKey};
pub use engine::ClipEngine;
pub use error::{BoneTableError, ClipError, MalformedClipError, ProjectError, ValidationError};
pub use keyframe::KeyFrame;
pub use mirror::mirror_keyframe;
pub use project::{load_project, save_project, ProjectFile};
pub use provider::{LocalTransform, PoseSink, SkeletonProvider};
pub use tangent::{TangentChannel, TangentClamp, TangentPair, TangentType};
pub use timeline::{Neighbor, Timeline};
pub use transform::BoneTransform;
