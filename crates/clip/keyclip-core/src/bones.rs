//! Bone identity service: bone path <-> engine name <-> type <-> mirror
//! partner <-> rest rotation, built once from static data and validated.
//!
//! Paths are the stable keys used everywhere else in the crate. Engine names
//! are the last path segment and are only used for display and lookup.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::error::BoneTableError;
use crate::math::quat_from_euler_deg;

/// Closed set of skeleton joints, in canonical export order.
///
/// Finger and toe variants are contiguous per side; the mirror table relies
/// on that layout.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BoneType {
    Root,
    GroundAnchor,
    Pelvis,
    ThighL,
    CalfL,
    FootL,
    Toe0BaseL,
    Toe0TipL,
    Toe1BaseL,
    Toe1TipL,
    Toe2BaseL,
    Toe2TipL,
    ThighR,
    CalfR,
    FootR,
    Toe0BaseR,
    Toe0TipR,
    Toe1BaseR,
    Toe1TipR,
    Toe2BaseR,
    Toe2TipR,
    Spine0,
    Spine1,
    Spine2,
    Spine3,
    Neck,
    Head,
    ClavicleL,
    UpperArmL,
    ForearmL,
    HandL,
    Finger0BaseL,
    Finger0MidL,
    Finger0TipL,
    Finger1BaseL,
    Finger1MidL,
    Finger1TipL,
    Finger2BaseL,
    Finger2MidL,
    Finger2TipL,
    Finger3BaseL,
    Finger3MidL,
    Finger3TipL,
    Finger4BaseL,
    Finger4MidL,
    Finger4TipL,
    ClavicleR,
    UpperArmR,
    ForearmR,
    HandR,
    Finger0BaseR,
    Finger0MidR,
    Finger0TipR,
    Finger1BaseR,
    Finger1MidR,
    Finger1TipR,
    Finger2BaseR,
    Finger2MidR,
    Finger2TipR,
    Finger3BaseR,
    Finger3MidR,
    Finger3TipR,
    Finger4BaseR,
    Finger4MidR,
    Finger4TipR,
    BreastL,
    BreastR,
}

/// Special handling a bone receives from the curve engine.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoneRole {
    /// Hierarchy root; the only bone that carries a position.
    Root,
    /// Driven by physics, never keyed by diffs.
    Head,
    /// Physics-override bones, keyed only when the matching flag is set.
    PhysicsLeft,
    PhysicsRight,
    Regular,
}

impl BoneRole {
    /// Scalar channels per key: quaternion, plus position for the root.
    #[inline]
    pub fn channel_count(self) -> usize {
        match self {
            BoneRole::Root => 7,
            _ => 4,
        }
    }
}

/// One row of the taxonomy table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoneInfo {
    pub bone_type: BoneType,
    pub name: String,
    pub path: String,
    pub mirror: Option<BoneType>,
    /// Rest rotation as Euler degrees `[x, y, z]`.
    pub rest_euler: [f32; 3],
    pub role: BoneRole,
    /// Whether the bone is written to clips.
    pub tracked: bool,
}

impl BoneInfo {
    #[inline]
    pub fn channel_count(&self) -> usize {
        self.role.channel_count()
    }
}

/// Rest rotation and position of one bone.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RestPose {
    pub rotation: [f32; 4],
    pub position: Option<[f32; 3]>,
}

/// Rest position of the root bone.
pub const ROOT_REST_POSITION: [f32; 3] = [0.0, 0.9, 0.0];

struct BoneRow {
    bone_type: BoneType,
    name: &'static str,
    parent: Option<BoneType>,
    rest_euler: [f32; 3],
    tracked: bool,
}

const fn row(
    bone_type: BoneType,
    name: &'static str,
    parent: Option<BoneType>,
    rest_euler: [f32; 3],
) -> BoneRow {
    BoneRow {
        bone_type,
        name,
        parent,
        rest_euler,
        tracked: true,
    }
}

const Z: [f32; 3] = [0.0, 0.0, 0.0];

use BoneType::*;

static STANDARD_BONES: &[BoneRow] = &[
    row(Root, "Bip01", None, [270.0, 180.0, 270.0]),
    BoneRow {
        bone_type: GroundAnchor,
        name: "Bip01 Footsteps",
        parent: Some(Root),
        rest_euler: Z,
        tracked: false,
    },
    row(Pelvis, "Bip01 Pelvis", Some(Root), [270.0, 90.0, 0.0]),
    row(ThighL, "Bip01 L Thigh", Some(Pelvis), [0.0, 180.0, 0.0]),
    row(CalfL, "Bip01 L Calf", Some(ThighL), Z),
    row(FootL, "Bip01 L Foot", Some(CalfL), Z),
    row(Toe0BaseL, "Bip01 L Toe0", Some(FootL), Z),
    row(Toe0TipL, "Bip01 L Toe01", Some(Toe0BaseL), Z),
    row(Toe1BaseL, "Bip01 L Toe1", Some(FootL), Z),
    row(Toe1TipL, "Bip01 L Toe11", Some(Toe1BaseL), Z),
    row(Toe2BaseL, "Bip01 L Toe2", Some(FootL), Z),
    row(Toe2TipL, "Bip01 L Toe21", Some(Toe2BaseL), Z),
    row(ThighR, "Bip01 R Thigh", Some(Pelvis), [0.0, 180.0, 0.0]),
    row(CalfR, "Bip01 R Calf", Some(ThighR), Z),
    row(FootR, "Bip01 R Foot", Some(CalfR), Z),
    row(Toe0BaseR, "Bip01 R Toe0", Some(FootR), Z),
    row(Toe0TipR, "Bip01 R Toe01", Some(Toe0BaseR), Z),
    row(Toe1BaseR, "Bip01 R Toe1", Some(FootR), Z),
    row(Toe1TipR, "Bip01 R Toe11", Some(Toe1BaseR), Z),
    row(Toe2BaseR, "Bip01 R Toe2", Some(FootR), Z),
    row(Toe2TipR, "Bip01 R Toe21", Some(Toe2BaseR), Z),
    row(Spine0, "Bip01 Spine", Some(Root), [270.0, 90.0, 0.0]),
    row(Spine1, "Bip01 Spine0a", Some(Spine0), Z),
    row(Spine2, "Bip01 Spine1", Some(Spine1), Z),
    row(Spine3, "Bip01 Spine1a", Some(Spine2), Z),
    row(Neck, "Bip01 Neck", Some(Spine3), Z),
    row(Head, "Bip01 Head", Some(Neck), Z),
    row(ClavicleL, "Bip01 L Clavicle", Some(Neck), [0.0, 270.0, 180.0]),
    row(UpperArmL, "Bip01 L UpperArm", Some(ClavicleL), [90.0, 300.0, 0.0]),
    row(ForearmL, "Bip01 L Forearm", Some(UpperArmL), Z),
    row(HandL, "Bip01 L Hand", Some(ForearmL), [180.0, 0.0, 0.0]),
    row(Finger0BaseL, "Bip01 L Finger0", Some(HandL), Z),
    row(Finger0MidL, "Bip01 L Finger01", Some(Finger0BaseL), Z),
    row(Finger0TipL, "Bip01 L Finger02", Some(Finger0MidL), Z),
    row(Finger1BaseL, "Bip01 L Finger1", Some(HandL), Z),
    row(Finger1MidL, "Bip01 L Finger11", Some(Finger1BaseL), Z),
    row(Finger1TipL, "Bip01 L Finger12", Some(Finger1MidL), Z),
    row(Finger2BaseL, "Bip01 L Finger2", Some(HandL), Z),
    row(Finger2MidL, "Bip01 L Finger21", Some(Finger2BaseL), Z),
    row(Finger2TipL, "Bip01 L Finger22", Some(Finger2MidL), Z),
    row(Finger3BaseL, "Bip01 L Finger3", Some(HandL), Z),
    row(Finger3MidL, "Bip01 L Finger31", Some(Finger3BaseL), Z),
    row(Finger3TipL, "Bip01 L Finger32", Some(Finger3MidL), Z),
    row(Finger4BaseL, "Bip01 L Finger4", Some(HandL), Z),
    row(Finger4MidL, "Bip01 L Finger41", Some(Finger4BaseL), Z),
    row(Finger4TipL, "Bip01 L Finger42", Some(Finger4MidL), Z),
    row(ClavicleR, "Bip01 R Clavicle", Some(Neck), [0.0, 90.0, 180.0]),
    row(UpperArmR, "Bip01 R UpperArm", Some(ClavicleR), [-90.0, 60.0, 0.0]),
    row(ForearmR, "Bip01 R Forearm", Some(UpperArmR), Z),
    row(HandR, "Bip01 R Hand", Some(ForearmR), [180.0, 0.0, 0.0]),
    row(Finger0BaseR, "Bip01 R Finger0", Some(HandR), Z),
    row(Finger0MidR, "Bip01 R Finger01", Some(Finger0BaseR), Z),
    row(Finger0TipR, "Bip01 R Finger02", Some(Finger0MidR), Z),
    row(Finger1BaseR, "Bip01 R Finger1", Some(HandR), Z),
    row(Finger1MidR, "Bip01 R Finger11", Some(Finger1BaseR), Z),
    row(Finger1TipR, "Bip01 R Finger12", Some(Finger1MidR), Z),
    row(Finger2BaseR, "Bip01 R Finger2", Some(HandR), Z),
    row(Finger2MidR, "Bip01 R Finger21", Some(Finger2BaseR), Z),
    row(Finger2TipR, "Bip01 R Finger22", Some(Finger2MidR), Z),
    row(Finger3BaseR, "Bip01 R Finger3", Some(HandR), Z),
    row(Finger3MidR, "Bip01 R Finger31", Some(Finger3BaseR), Z),
    row(Finger3TipR, "Bip01 R Finger32", Some(Finger3MidR), Z),
    row(Finger4BaseR, "Bip01 R Finger4", Some(HandR), Z),
    row(Finger4MidR, "Bip01 R Finger41", Some(Finger4BaseR), Z),
    row(Finger4TipR, "Bip01 R Finger42", Some(Finger4MidR), Z),
    row(BreastL, "Mune_L", Some(Spine3), Z),
    row(BreastR, "Mune_R", Some(Spine3), Z),
];

/// Explicit limb pairs; fingers and toes are paired by range below.
const LIMB_PAIRS: &[(BoneType, BoneType)] = &[
    (ClavicleR, ClavicleL),
    (UpperArmR, UpperArmL),
    (ForearmR, ForearmL),
    (ThighR, ThighL),
    (CalfR, CalfL),
    (HandR, HandL),
    (FootR, FootL),
];

/// `(left_first, left_last, right_first)` for contiguous per-side ranges.
const SIDE_RANGES: &[(BoneType, BoneType, BoneType)] = &[
    (Finger0BaseL, Finger4TipL, Finger0BaseR),
    (Toe0BaseL, Toe2TipL, Toe0BaseR),
];

impl BoneType {
    pub const ALL: [BoneType; 67] = [
        Root, GroundAnchor, Pelvis, ThighL, CalfL, FootL, Toe0BaseL, Toe0TipL, Toe1BaseL,
        Toe1TipL, Toe2BaseL, Toe2TipL, ThighR, CalfR, FootR, Toe0BaseR, Toe0TipR, Toe1BaseR,
        Toe1TipR, Toe2BaseR, Toe2TipR, Spine0, Spine1, Spine2, Spine3, Neck, Head, ClavicleL,
        UpperArmL, ForearmL, HandL, Finger0BaseL, Finger0MidL, Finger0TipL, Finger1BaseL,
        Finger1MidL, Finger1TipL, Finger2BaseL, Finger2MidL, Finger2TipL, Finger3BaseL,
        Finger3MidL, Finger3TipL, Finger4BaseL, Finger4MidL, Finger4TipL, ClavicleR, UpperArmR,
        ForearmR, HandR, Finger0BaseR, Finger0MidR, Finger0TipR, Finger1BaseR, Finger1MidR,
        Finger1TipR, Finger2BaseR, Finger2MidR, Finger2TipR, Finger3BaseR, Finger3MidR,
        Finger3TipR, Finger4BaseR, Finger4MidR, Finger4TipR, BreastL, BreastR,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Left/right counterpart, or `None` for centre-line bones.
    pub fn mirror_partner(self) -> Option<BoneType> {
        for &(a, b) in LIMB_PAIRS {
            if self == a {
                return Some(b);
            }
            if self == b {
                return Some(a);
            }
        }
        let i = self.index();
        for &(left_first, left_last, right_first) in SIDE_RANGES {
            let len = left_last.index() - left_first.index();
            let (lf, rf) = (left_first.index(), right_first.index());
            if (lf..=lf + len).contains(&i) {
                return Some(Self::ALL[rf + (i - lf)]);
            }
            if (rf..=rf + len).contains(&i) {
                return Some(Self::ALL[lf + (i - rf)]);
            }
        }
        None
    }

    /// Bones the mirror copies unchanged.
    pub fn is_mirror_exempt(self) -> bool {
        matches!(self, GroundAnchor | Pelvis | Head | BreastL | BreastR)
    }

    pub fn role(self) -> BoneRole {
        match self {
            Root => BoneRole::Root,
            Head => BoneRole::Head,
            BreastL => BoneRole::PhysicsLeft,
            BreastR => BoneRole::PhysicsRight,
            _ => BoneRole::Regular,
        }
    }
}

/// Last segment of a hierarchical bone path.
#[inline]
pub fn name_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(i) => &path[i + 1..],
        None => path,
    }
}

/// Validated lookup table over [`BoneInfo`] rows.
#[derive(Clone, Debug)]
pub struct BoneTable {
    entries: Vec<BoneInfo>,
    by_path: HashMap<String, usize>,
    by_name: HashMap<String, usize>,
    by_type: HashMap<BoneType, usize>,
}

impl BoneTable {
    /// Build and validate a table from arbitrary rows.
    pub fn new(entries: Vec<BoneInfo>) -> Result<Self, BoneTableError> {
        let mut by_path = HashMap::with_capacity(entries.len());
        let mut by_name = HashMap::with_capacity(entries.len());
        let mut by_type = HashMap::with_capacity(entries.len());
        for (i, e) in entries.iter().enumerate() {
            if by_path.insert(e.path.clone(), i).is_some() {
                return Err(BoneTableError::DuplicatePath(e.path.clone()));
            }
            if by_name.insert(e.name.clone(), i).is_some() {
                return Err(BoneTableError::DuplicateName(e.name.clone()));
            }
            if by_type.insert(e.bone_type, i).is_some() {
                return Err(BoneTableError::DuplicateType(e.bone_type));
            }
        }

        let roots = entries.iter().filter(|e| e.role == BoneRole::Root).count();
        if roots != 1 {
            return Err(BoneTableError::RootCount(roots));
        }

        for e in &entries {
            if let Some(partner) = e.mirror {
                let back = by_type
                    .get(&partner)
                    .map(|&j| entries[j].mirror)
                    .ok_or(BoneTableError::MissingMirror(partner))?;
                if back != Some(e.bone_type) {
                    return Err(BoneTableError::AsymmetricMirror {
                        from: e.bone_type,
                        to: partner,
                    });
                }
            }
        }

        Ok(Self {
            entries,
            by_path,
            by_name,
            by_type,
        })
    }

    /// The standard humanoid skeleton.
    pub fn standard() -> Self {
        let entries = standard_entries();
        let by_path = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.path.clone(), i))
            .collect();
        let by_name = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.name.clone(), i))
            .collect();
        let by_type = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.bone_type, i))
            .collect();
        Self {
            entries,
            by_path,
            by_name,
            by_type,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BoneInfo> {
        self.entries.iter()
    }

    /// Bones written to clips, in canonical order.
    pub fn tracked(&self) -> impl Iterator<Item = &BoneInfo> {
        self.entries.iter().filter(|e| e.tracked)
    }

    pub fn tracked_count(&self) -> usize {
        self.tracked().count()
    }

    pub fn by_path(&self, path: &str) -> Option<&BoneInfo> {
        self.by_path.get(path).map(|&i| &self.entries[i])
    }

    pub fn by_name(&self, name: &str) -> Option<&BoneInfo> {
        self.by_name.get(name).map(|&i| &self.entries[i])
    }

    pub fn by_type(&self, bone_type: BoneType) -> Option<&BoneInfo> {
        self.by_type.get(&bone_type).map(|&i| &self.entries[i])
    }

    /// Path for a bone type; empty for types the table does not carry.
    pub fn path_of(&self, bone_type: BoneType) -> &str {
        self.by_type(bone_type).map(|e| e.path.as_str()).unwrap_or("")
    }

    /// Resolve an engine name to its path, passing unknown names through.
    pub fn path_for_name<'a>(&'a self, name: &'a str) -> &'a str {
        self.by_name(name).map(|e| e.path.as_str()).unwrap_or(name)
    }

    /// Counterpart row for a path, following the mirror column.
    pub fn mirror_of(&self, path: &str) -> Option<&BoneInfo> {
        let info = self.by_path(path)?;
        info.mirror.and_then(|t| self.by_type(t))
    }

    /// Default pose for a bone: rest rotation, plus the rest position for the root.
    pub fn rest_transform(&self, path: &str) -> Option<RestPose> {
        let info = self.by_path(path)?;
        Some(RestPose {
            rotation: quat_from_euler_deg(info.rest_euler),
            position: (info.role == BoneRole::Root).then_some(ROOT_REST_POSITION),
        })
    }

    /// Channel count for a path; unknown bones use the rotation-only layout.
    pub fn channel_count(&self, path: &str) -> usize {
        self.by_path(path)
            .map(BoneInfo::channel_count)
            .unwrap_or_else(|| BoneRole::Regular.channel_count())
    }
}

/// Rows for the standard skeleton, with paths derived from the parent chain.
pub fn standard_entries() -> Vec<BoneInfo> {
    let mut paths: HashMap<BoneType, String> = HashMap::with_capacity(STANDARD_BONES.len());
    let mut out = Vec::with_capacity(STANDARD_BONES.len());
    for s in STANDARD_BONES {
        let path = match s.parent.and_then(|p| paths.get(&p)) {
            Some(parent) => format!("{parent}/{}", s.name),
            None => s.name.to_string(),
        };
        paths.insert(s.bone_type, path.clone());
        out.push(BoneInfo {
            bone_type: s.bone_type,
            name: s.name.to_string(),
            path,
            mirror: s.bone_type.mirror_partner(),
            rest_euler: s.rest_euler,
            role: s.bone_type.role(),
            tracked: s.tracked,
        });
    }
    out
}
