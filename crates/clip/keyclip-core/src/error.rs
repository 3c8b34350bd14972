//! Error types for clip authoring, encoding and decoding.

use thiserror::Error;

/// Preconditions checked before a clip is exported. Nothing is written when
/// any of these fire.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("a keyframe at frame 0 is required")]
    MissingFirstFrame,
    #[error("clip name is empty")]
    EmptyClipName,
    #[error("no target actor is bound")]
    NoBoundActor,
}

/// Structural problems found while reading a binary clip.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MalformedClipError {
    #[error("bad clip header: expected \"{expected}\", found \"{found}\"")]
    BadMagic {
        expected: &'static str,
        found: String,
    },
    #[error("unsupported clip version {0}")]
    UnsupportedVersion(i32),
    #[error("unexpected end of clip at byte {offset} (needed {needed} more)")]
    UnexpectedEof { offset: usize, needed: usize },
    #[error("invalid string at byte {offset}: {reason}")]
    InvalidString { offset: usize, reason: String },
    #[error("invalid channel tag {tag} for bone '{path}'")]
    InvalidChannel { path: String, tag: u8 },
    #[error("negative key count {count} for bone '{path}'")]
    NegativeKeyCount { path: String, count: i32 },
    #[error("unexpected tag {tag} at byte {offset}, expected a bone or end marker")]
    InvalidBoneTag { offset: usize, tag: u8 },
}

/// Umbrella error for codec entry points.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ClipError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Malformed(#[from] MalformedClipError),
    /// The loop-closing keys were built for another clip length; run
    /// `Timeline::prepare_export` first.
    #[error("closing keys are for frame {built}, clip ends at {max}")]
    StaleClosingKeys { built: u32, max: u32 },
}

/// Failures while reading or writing the JSON project file.
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("project json parse error: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("serialize project: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("unknown bone '{path}' in frame {frame}")]
    UnknownBone { path: String, frame: u32 },
    #[error("bone '{path}' in frame {frame} has {found} values, expected {expected}")]
    ValueCount {
        path: String,
        frame: u32,
        found: usize,
        expected: usize,
    },
    #[error("frame rate must be positive, got {0}")]
    InvalidFrameRate(f32),
}

/// Inconsistencies in a bone taxonomy table, reported when the table is built.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BoneTableError {
    #[error("duplicate bone path '{0}'")]
    DuplicatePath(String),
    #[error("duplicate bone name '{0}'")]
    DuplicateName(String),
    #[error("duplicate bone type {0:?}")]
    DuplicateType(crate::bones::BoneType),
    #[error("mirror partner of {from:?} is {to:?}, which does not map back")]
    AsymmetricMirror {
        from: crate::bones::BoneType,
        to: crate::bones::BoneType,
    },
    #[error("mirror partner {0:?} is missing from the table")]
    MissingMirror(crate::bones::BoneType),
    #[error("expected exactly one root bone, found {0}")]
    RootCount(usize),
}
