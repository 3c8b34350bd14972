//! Left/right reflection of a keyframe.

use crate::bones::{BoneTable, BoneType};
use crate::keyframe::KeyFrame;
use crate::math::{euler_deg_from_quat, quat_from_euler_deg};
use crate::transform::BoneTransform;

/// Reflect Euler angles for a bone that lands on `target`.
///
/// The root and the first spine segment are authored about 180/270 degree
/// offsets, so they reflect about those instead of zero.
pub fn mirror_euler(target: BoneType, e: [f32; 3]) -> [f32; 3] {
    match target {
        BoneType::Root => [e[0], 180.0 - (e[1] - 180.0), 270.0 - (e[2] - 270.0)],
        BoneType::Spine0 => [270.0 - (e[0] - 270.0), e[1], e[2]],
        _ => [-e[0], -e[1], e[2]],
    }
}

/// Mirror every bone of `frame` onto its counterpart. The input is untouched.
///
/// Exempt bones are copied as-is. Centre-line bones map onto themselves.
/// Tangents travel with the pose.
pub fn mirror_keyframe(frame: &KeyFrame, table: &BoneTable) -> KeyFrame {
    let mut out = KeyFrame::new(frame.frame_index);
    for src in frame.iter() {
        let Some(info) = table.by_path(&src.bone_path) else {
            log::warn!("mirror: unknown bone '{}', copied unchanged", src.bone_path);
            out.put(src.clone());
            continue;
        };
        if info.bone_type.is_mirror_exempt() {
            out.put(src.clone());
            continue;
        }

        let target_type = info.mirror.unwrap_or(info.bone_type);
        let Some(target) = table.by_type(target_type) else {
            log::warn!("mirror: no counterpart {target_type:?} for '{}'", src.bone_path);
            out.put(src.clone());
            continue;
        };

        let euler = euler_deg_from_quat(src.rotation);
        let flipped = mirror_euler(target_type, euler);
        log::debug!("mirror {:?} -> {target_type:?}: {euler:?} -> {flipped:?}", info.bone_type);

        let mut t: BoneTransform = src.clone();
        t.bone_path = target.path.clone();
        t.role = target.role;
        t.rotation = quat_from_euler_deg(flipped);
        if target_type == BoneType::Root {
            if let Some(p) = t.position.as_mut() {
                p[0] = -p[0];
            }
        }
        out.put(t);
    }
    out
}
