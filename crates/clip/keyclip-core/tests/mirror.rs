use keyclip_core::{
    bones::{BoneTable, BoneType},
    keyframe::KeyFrame,
    math::{euler_deg_from_quat, quat_from_euler_deg, same_rotation},
    mirror::mirror_keyframe,
    tangent::TangentPair,
    transform::BoneTransform,
};

fn key(table: &BoneTable, ty: BoneType, euler: [f32; 3]) -> BoneTransform {
    let info = table.by_type(ty).expect("bone in table");
    let mut t = BoneTransform::new(info, TangentPair::default());
    t.rotation = quat_from_euler_deg(euler);
    t
}

fn sample_frame(table: &BoneTable) -> KeyFrame {
    let mut f = KeyFrame::new(5);
    let mut root = key(table, BoneType::Root, [250.0, 170.0, 280.0]);
    root.position = Some([0.3, 0.9, -0.2]);
    f.put(root);
    f.put(key(table, BoneType::Spine0, [262.0, 85.0, 4.0]));
    f.put(key(table, BoneType::Spine2, [5.0, -12.0, 3.0]));
    f.put(key(table, BoneType::Pelvis, [271.0, 92.0, 1.0]));
    f.put(key(table, BoneType::Head, [10.0, 20.0, 30.0]));
    f.put(key(table, BoneType::HandL, [15.0, 25.0, -35.0]));
    f.put(key(table, BoneType::HandR, [-40.0, 10.0, 60.0]));
    f.put(key(table, BoneType::ClavicleL, [3.0, 268.0, 182.0]));
    f.put(key(table, BoneType::Finger2MidR, [0.0, 0.0, 45.0]));
    f.put(key(table, BoneType::Toe1BaseL, [12.0, -6.0, 8.0]));
    f.put(key(table, BoneType::BreastL, [7.0, 8.0, 9.0]));
    f
}

#[test]
fn mirror_twice_is_identity() {
    let table = BoneTable::standard();
    let original = sample_frame(&table);
    let once = mirror_keyframe(&original, &table);
    let twice = mirror_keyframe(&once, &table);

    assert_eq!(twice.len(), original.len());
    assert_eq!(twice.frame_index, original.frame_index);
    for t in original.iter() {
        let back = twice.get(&t.bone_path).expect("bone survives");
        assert!(
            same_rotation(back.rotation, t.rotation, 1e-4),
            "{}: {:?} vs {:?}",
            t.bone_path,
            back.rotation,
            t.rotation
        );
        if let (Some(a), Some(b)) = (back.position, t.position) {
            for i in 0..3 {
                assert!((a[i] - b[i]).abs() < 1e-6);
            }
        }
    }
}

#[test]
fn paired_bones_swap_sides() {
    let table = BoneTable::standard();
    let mut f = KeyFrame::new(0);
    f.put(key(&table, BoneType::HandL, [15.0, 25.0, -35.0]));
    let m = mirror_keyframe(&f, &table);

    assert!(m.get(table.path_of(BoneType::HandL)).is_none());
    let right = m.get(table.path_of(BoneType::HandR)).expect("moved to right");
    let expected = quat_from_euler_deg([-15.0, -25.0, -35.0]);
    assert!(same_rotation(right.rotation, expected, 1e-4));
    // input untouched
    assert!(f.contains(table.path_of(BoneType::HandL)));
}

#[test]
fn root_reflects_about_offsets_and_negates_x() {
    let table = BoneTable::standard();
    let mut f = KeyFrame::new(0);
    let mut root = key(&table, BoneType::Root, [250.0, 170.0, 280.0]);
    root.position = Some([0.3, 0.9, -0.2]);
    f.put(root);
    let m = mirror_keyframe(&f, &table);
    let r = m.get("Bip01").expect("root");
    assert_eq!(r.position, Some([-0.3, 0.9, -0.2]));
    let expected = quat_from_euler_deg([250.0, 190.0, 260.0]);
    assert!(same_rotation(r.rotation, expected, 1e-4));
}

#[test]
fn exempt_bones_copied_unchanged() {
    let table = BoneTable::standard();
    let frame = sample_frame(&table);
    let m = mirror_keyframe(&frame, &table);
    for ty in [BoneType::Pelvis, BoneType::Head, BoneType::BreastL] {
        let path = table.path_of(ty);
        assert_eq!(m.get(path), frame.get(path), "{ty:?}");
    }
}

#[test]
fn centre_line_bone_negates_x_and_y() {
    let table = BoneTable::standard();
    let mut f = KeyFrame::new(0);
    f.put(key(&table, BoneType::Spine2, [5.0, -12.0, 3.0]));
    let m = mirror_keyframe(&f, &table);
    let t = m.get(table.path_of(BoneType::Spine2)).expect("spine");
    let e = euler_deg_from_quat(t.rotation);
    assert!((e[0] + 5.0).abs() < 1e-3 && (e[1] - 12.0).abs() < 1e-3 && (e[2] - 3.0).abs() < 1e-3);
}
