use hashbrown::HashMap;
use keyclip_core::{
    bones::BoneType,
    codec::decode_clip,
    config::Config,
    engine::ClipEngine,
    error::{ClipError, ProjectError, ValidationError},
    math::{dot4, quat_from_axis_deg, IDENTITY},
    project::ProjectFile,
    provider::{LocalTransform, PoseSink, SkeletonProvider},
    tangent::TangentType,
};

fn approx(a: f32, b: f32, eps: f32) {
    assert!((a - b).abs() <= eps, "left={a} right={b} eps={eps}");
}

struct StaticActor {
    pose: HashMap<String, LocalTransform>,
}

impl SkeletonProvider for StaticActor {
    fn current_pose(&self) -> HashMap<String, LocalTransform> {
        self.pose.clone()
    }
}

#[derive(Default)]
struct RecordingSink {
    clips: Vec<Vec<u8>>,
}

impl PoseSink for RecordingSink {
    fn apply_pose(&mut self, clip: &[u8]) {
        self.clips.push(clip.to_vec());
    }
}

fn actor(engine: &ClipEngine, neck_deg: f32) -> StaticActor {
    let mut pose = HashMap::new();
    for info in engine.bones().tracked() {
        pose.insert(info.path.clone(), LocalTransform::default());
    }
    pose.insert(
        "Bip01".to_string(),
        LocalTransform {
            rotation: IDENTITY,
            position: [0.0, 0.9, 0.0],
        },
    );
    pose.insert(
        engine.bones().path_of(BoneType::Neck).to_string(),
        LocalTransform {
            rotation: quat_from_axis_deg([1.0, 0.0, 0.0], neck_deg),
            position: [0.0; 3],
        },
    );
    StaticActor { pose }
}

#[test]
fn capture_requires_bound_actor() {
    let mut engine = ClipEngine::new(Config::default());
    assert_eq!(engine.capture_frame(0), Err(ValidationError::NoBoundActor));
    engine.timeline_mut().clip_name = "idle".into();
    assert_eq!(
        engine.export_clip(),
        Err(ClipError::Validation(ValidationError::NoBoundActor))
    );
}

#[test]
fn capture_then_export() {
    let mut engine = ClipEngine::new(Config::default());
    let a = actor(&engine, 0.0);
    engine.bind_actor(Box::new(a));
    let tracked = engine.bones().tracked_count();
    assert_eq!(engine.capture_frame(0), Ok(tracked));
    assert!(engine
        .timeline()
        .get_frame(0)
        .is_some_and(|f| f.is_complete(tracked)));

    engine.timeline_mut().clip_name = "idle".into();
    let bytes = engine.export_clip().expect("exports");
    let clip = decode_clip(&bytes).expect("decodes");
    assert_eq!(clip.bones.len(), tracked);
    approx(
        clip.bone("Bip01").expect("root").channels[5].keys[0].value,
        0.9,
        1e-6,
    );
}

#[test]
fn capture_diff_keys_only_changes() {
    let mut engine = ClipEngine::new(Config::default());
    let base = actor(&engine, 0.0);
    engine.bind_actor(Box::new(base));
    engine.capture_frame(0).expect("captures");
    let baseline = engine.timeline().get_frame(0).cloned().expect("frame 0");

    let moved = actor(&engine, 25.0);
    engine.bind_actor(Box::new(moved));
    assert_eq!(engine.capture_diff(10, &baseline), Ok(1));
    let f = engine.timeline().get_frame(10).expect("frame 10");
    assert_eq!(f.paths(), vec![engine.bones().path_of(BoneType::Neck)]);
}

#[test]
fn mirror_reset_and_remove() {
    let mut engine = ClipEngine::new(Config::default());
    let mut a = actor(&engine, 0.0);
    let hand_l = engine.bones().path_of(BoneType::HandL).to_string();
    let hand_r = engine.bones().path_of(BoneType::HandR).to_string();
    a.pose.insert(
        hand_l.clone(),
        LocalTransform {
            rotation: quat_from_axis_deg([0.0, 1.0, 0.0], 30.0),
            position: [0.0; 3],
        },
    );
    engine.bind_actor(Box::new(a));
    engine.capture_frame(0).expect("captures");

    assert!(engine.mirror_frame(0, 12));
    assert!(!engine.mirror_frame(99, 12));
    let src_l = engine.timeline().get_frame(0).and_then(|f| f.get(&hand_l)).map(|t| t.rotation);
    let dst_r = engine.timeline().get_frame(12).and_then(|f| f.get(&hand_r)).map(|t| t.rotation);
    let expected = quat_from_axis_deg([0.0, 1.0, 0.0], -30.0);
    assert!(dot4(dst_r.expect("mirrored"), expected).abs() > 0.9999);
    assert!(src_l.is_some());

    let n = engine.reset_frame(12);
    assert_eq!(n, engine.timeline().get_frame(12).map_or(0, |f| f.len()));
    let hand_rest = engine.bones().rest_transform(&hand_r).expect("rest").rotation;
    assert_eq!(
        engine.timeline().get_frame(12).and_then(|f| f.get(&hand_r)).map(|t| t.rotation),
        Some(hand_rest)
    );

    assert_eq!(engine.remove_bones(12, [hand_r.as_str(), "not/a/bone"]), 1);
    assert!(!engine.timeline().get_frame(12).expect("frame").contains(&hand_r));
}

#[test]
fn apply_frame_sends_pose_clip() {
    let mut engine = ClipEngine::new(Config::default());
    let a = actor(&engine, 10.0);
    engine.bind_actor(Box::new(a));
    engine.capture_frame(3).expect("captures");
    let mut sink = RecordingSink::default();
    assert!(engine.apply_frame(3, &mut sink));
    assert!(!engine.apply_frame(4, &mut sink));
    assert_eq!(sink.clips.len(), 1);
    let clip = decode_clip(&sink.clips[0]).expect("pose clip decodes");
    assert!(clip.bones.iter().all(|b| b.channels[0].keys.len() == 2));
}

#[test]
fn failed_import_leaves_timeline_unchanged() {
    let mut engine = ClipEngine::new(Config::default());
    let a = actor(&engine, 0.0);
    engine.bind_actor(Box::new(a));
    engine.capture_frame(0).expect("captures");
    let before = ProjectFile::from_timeline(engine.timeline());

    let mut bytes = {
        let mut sink = RecordingSink::default();
        engine.apply_frame(0, &mut sink);
        sink.clips.remove(0)
    };
    bytes.truncate(bytes.len() / 2);
    assert!(engine.import_pose_clip(&bytes, 5).is_err());
    assert_eq!(ProjectFile::from_timeline(engine.timeline()), before);

    assert!(engine.import_pose_clip(b"garbage", 5).is_err());
    assert!(engine.timeline().get_frame(5).is_none());
}

#[test]
fn import_pose_clip_round_trips_a_frame() {
    let mut engine = ClipEngine::new(Config::default());
    let a = actor(&engine, 40.0);
    engine.bind_actor(Box::new(a));
    engine.capture_frame(0).expect("captures");
    let mut sink = RecordingSink::default();
    engine.apply_frame(0, &mut sink);

    let n = engine.import_pose_clip(&sink.clips[0], 8).expect("imports");
    assert_eq!(n, engine.bones().tracked_count() - 2);
    let neck = engine.bones().path_of(BoneType::Neck);
    assert_eq!(
        engine.timeline().get_frame(8).and_then(|f| f.get(neck)).map(|t| t.rotation),
        engine.timeline().get_frame(0).and_then(|f| f.get(neck)).map(|t| t.rotation)
    );
}

#[test]
fn project_round_trip_through_engine() {
    let cfg = Config {
        default_tangent: TangentType::Linear,
        ..Config::default()
    };
    let mut engine = ClipEngine::new(cfg);
    let a = actor(&engine, 12.0);
    engine.bind_actor(Box::new(a));
    engine.capture_frame(0).expect("captures");
    engine.capture_frame(20).expect("captures");
    engine.timeline_mut().clip_name = "saved".into();
    engine.timeline_mut().prepare_export();

    let json = engine.save_project().expect("saves");
    let mut other = ClipEngine::new(engine.config().clone());
    other.load_project(&json).expect("loads");
    assert_eq!(
        ProjectFile::from_timeline(other.timeline()),
        ProjectFile::from_timeline(engine.timeline())
    );

    let err = other.load_project("{ not json").expect_err("bad json");
    assert!(matches!(err, ProjectError::Parse(_)));
    assert_eq!(other.timeline().clip_name, "saved");
}
