//! Binary clip codec.
//!
//! Layout (little-endian, .NET `BinaryWriter` conventions):
//!
//! ```text
//! string  "CM3D2_ANIM"
//! i32     version
//! repeat: u8 0x01, string bone_path,
//!         repeat per channel: u8 (100 + channel), i32 key_count,
//!                             key_count x (f32 time, f32 value, f32 in, f32 out)
//! u8      0x00
//! u8, u8  physics flags (version >= 1001 only)
//! ```
//!
//! Strings are a 7-bit varint byte length followed by UTF-8.

use crate::bones::{name_of, BoneRole, BoneTable};
use crate::curve::ClipKey;
use crate::error::{ClipError, MalformedClipError, ValidationError};
use crate::keyframe::KeyFrame;
use crate::tangent::TangentPair;
use crate::timeline::Timeline;
use crate::transform::BoneTransform;

pub const CLIP_MAGIC: &str = "CM3D2_ANIM";
pub const CLIP_VERSION: i32 = 1001;
/// Oldest version accepted on import; it has no physics flag bytes.
pub const CLIP_MIN_VERSION: i32 = 1000;

const BONE_TAG: u8 = 1;
const END_TAG: u8 = 0;
const CHANNEL_TAG_BASE: u8 = 100;
const MAX_CHANNELS: u8 = 7;

// ---- primitive I/O ----

#[derive(Debug, Default)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(n: usize) -> Self {
        Self {
            buf: Vec::with_capacity(n),
        }
    }

    #[inline]
    pub fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    #[inline]
    pub fn write_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    #[inline]
    pub fn write_f32(&mut self, v: f32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Length-prefixed UTF-8 string.
    pub fn write_string(&mut self, s: &str) {
        let mut len = s.len();
        while len >= 0x80 {
            self.buf.push((len as u8 & 0x7f) | 0x80);
            len >>= 7;
        }
        self.buf.push(len as u8);
        self.buf.extend_from_slice(s.as_bytes());
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

#[derive(Debug)]
pub struct ByteReader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.offset)
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], MalformedClipError> {
        if self.remaining() < n {
            return Err(MalformedClipError::UnexpectedEof {
                offset: self.offset,
                needed: n - self.remaining(),
            });
        }
        let out = &self.bytes[self.offset..self.offset + n];
        self.offset += n;
        Ok(out)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], MalformedClipError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn peek_u8(&self) -> Option<u8> {
        self.bytes.get(self.offset).copied()
    }

    pub fn read_u8(&mut self) -> Result<u8, MalformedClipError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_i32(&mut self) -> Result<i32, MalformedClipError> {
        Ok(i32::from_le_bytes(self.take_array()?))
    }

    pub fn read_f32(&mut self) -> Result<f32, MalformedClipError> {
        Ok(f32::from_le_bytes(self.take_array()?))
    }

    pub fn read_string(&mut self) -> Result<String, MalformedClipError> {
        let start = self.offset;
        let mut len: usize = 0;
        let mut shift = 0u32;
        loop {
            let b = self.read_u8()?;
            len |= usize::from(b & 0x7f) << shift;
            if b & 0x80 == 0 {
                break;
            }
            shift += 7;
            if shift >= 35 {
                return Err(MalformedClipError::InvalidString {
                    offset: start,
                    reason: "length prefix too long".into(),
                });
            }
        }
        let raw = self.take(len)?;
        String::from_utf8(raw.to_vec()).map_err(|e| MalformedClipError::InvalidString {
            offset: start,
            reason: e.to_string(),
        })
    }
}

// ---- decoded clip ----

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClipChannel {
    /// Channel index within the bone (`tag - 100`).
    pub index: u8,
    pub keys: Vec<ClipKey>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClipBone {
    pub path: String,
    pub channels: Vec<ClipChannel>,
}

impl ClipBone {
    pub fn channel(&self, index: u8) -> Option<&ClipChannel> {
        self.channels.iter().find(|c| c.index == index)
    }
}

/// Full contents of a binary clip.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClipData {
    pub version: i32,
    pub bones: Vec<ClipBone>,
    /// `None` for versions without the trailing flag bytes.
    pub use_physics_left: Option<bool>,
    pub use_physics_right: Option<bool>,
}

impl ClipData {
    pub fn bone(&self, path: &str) -> Option<&ClipBone> {
        self.bones.iter().find(|b| b.path == path)
    }
}

/// A single pose recovered from a clip.
#[derive(Clone, Debug, PartialEq)]
pub struct ImportedPose {
    pub frame: KeyFrame,
    pub use_physics_left: bool,
    pub use_physics_right: bool,
}

// ---- encode ----

fn write_header(w: &mut ByteWriter) {
    w.write_string(CLIP_MAGIC);
    w.write_i32(CLIP_VERSION);
}

fn write_trailer(w: &mut ByteWriter, physics_left: bool, physics_right: bool) {
    w.write_u8(END_TAG);
    w.write_u8(u8::from(physics_left));
    w.write_u8(u8::from(physics_right));
}

fn write_bone<'a, I>(w: &mut ByteWriter, path: &str, channel_count: usize, keys: I)
where
    I: Iterator<Item = (f32, &'a BoneTransform)> + Clone,
{
    w.write_u8(BONE_TAG);
    w.write_string(path);
    let count = keys.clone().count() as i32;
    for ch in 0..channel_count {
        w.write_u8(CHANNEL_TAG_BASE + ch as u8);
        w.write_i32(count);
        for (time, t) in keys.clone() {
            w.write_f32(time);
            w.write_f32(t.channel(ch));
            w.write_f32(t.in_tangents().get(ch).map_or(0.0, |c| c.value()));
            w.write_f32(t.out_tangents().get(ch).map_or(0.0, |c| c.value()));
        }
    }
}

/// Encode a prepared timeline.
///
/// Call [`Timeline::prepare_export`] first; this only serializes. Closing
/// keys built for a different `max_frame_index` are rejected, but edits to
/// keyframes since the last prepare are not detected. Bones are written in
/// the table's canonical order and only when frame 0 keys them.
pub fn encode_clip(
    timeline: &Timeline,
    table: &BoneTable,
    actor_bound: bool,
) -> Result<Vec<u8>, ClipError> {
    timeline.validate_for_export(actor_bound)?;
    let first = timeline
        .first_frame()
        .ok_or(ValidationError::MissingFirstFrame)?;

    let max = timeline.max_frame_index();
    let t_max = timeline.frame_time_seconds(i64::from(max));
    let dummy = timeline.dummy_last_frame();
    if dummy.frame_index != max {
        return Err(ClipError::StaleClosingKeys {
            built: dummy.frame_index,
            max,
        });
    }

    let mut w = ByteWriter::with_capacity(4096);
    write_header(&mut w);

    for info in table.tracked() {
        let path = info.path.as_str();
        let Some(first_bone) = first.get(path) else {
            log::debug!("'{path}' not keyed at frame 0, skipped");
            continue;
        };

        let mut keys: Vec<(f32, &BoneTransform)> = timeline
            .frames()
            .iter()
            .filter_map(|f| {
                f.get(path)
                    .map(|t| (timeline.frame_time_seconds(i64::from(f.frame_index)), t))
            })
            .collect();
        let has_last_key = timeline
            .frames()
            .iter()
            .rev()
            .find(|f| f.contains(path))
            .is_some_and(|f| f.frame_index == max);
        if !has_last_key {
            if let Some(t) = dummy.get(path) {
                keys.push((t_max, t));
            }
        }

        write_bone(&mut w, path, first_bone.channel_count(), keys.iter().copied());
    }

    write_trailer(&mut w, timeline.use_physics_left, timeline.use_physics_right);
    Ok(w.into_bytes())
}

/// Encode one frame as a static clip (two identical keys at t = 0 and t = 1,
/// zero tangents), for driving a live skeleton.
pub fn encode_pose(
    frame: &KeyFrame,
    table: &BoneTable,
    physics_left: bool,
    physics_right: bool,
) -> Vec<u8> {
    let mut w = ByteWriter::with_capacity(2048);
    write_header(&mut w);
    for info in table.tracked() {
        let Some(t) = frame.get(&info.path) else {
            log::debug!("'{}' missing from pose, skipped", info.path);
            continue;
        };
        w.write_u8(BONE_TAG);
        w.write_string(&info.path);
        for ch in 0..t.channel_count() {
            w.write_u8(CHANNEL_TAG_BASE + ch as u8);
            w.write_i32(2);
            for time in [0.0f32, 1.0] {
                w.write_f32(time);
                w.write_f32(t.channel(ch));
                w.write_f32(0.0);
                w.write_f32(0.0);
            }
        }
    }
    write_trailer(&mut w, physics_left, physics_right);
    w.into_bytes()
}

// ---- decode ----

/// Decode every bone and key of a clip.
pub fn decode_clip(bytes: &[u8]) -> Result<ClipData, MalformedClipError> {
    let mut r = ByteReader::new(bytes);
    let magic = r.read_string()?;
    if magic != CLIP_MAGIC {
        return Err(MalformedClipError::BadMagic {
            expected: CLIP_MAGIC,
            found: magic,
        });
    }
    let version = r.read_i32()?;
    if !(CLIP_MIN_VERSION..=CLIP_VERSION).contains(&version) {
        return Err(MalformedClipError::UnsupportedVersion(version));
    }

    let mut bones = Vec::new();
    loop {
        let offset = r.offset();
        match r.read_u8()? {
            END_TAG => break,
            BONE_TAG => {}
            tag => return Err(MalformedClipError::InvalidBoneTag { offset, tag }),
        }
        let path = r.read_string()?;
        let mut channels = Vec::new();
        while let Some(tag) = r.peek_u8().filter(|&b| b >= CHANNEL_TAG_BASE) {
            r.read_u8()?;
            let index = tag - CHANNEL_TAG_BASE;
            if index >= MAX_CHANNELS {
                return Err(MalformedClipError::InvalidChannel { path, tag });
            }
            let count = r.read_i32()?;
            if count < 0 {
                return Err(MalformedClipError::NegativeKeyCount { path, count });
            }
            let mut keys = Vec::with_capacity((count as usize).min(r.remaining() / 16));
            for _ in 0..count {
                keys.push(ClipKey {
                    time: r.read_f32()?,
                    value: r.read_f32()?,
                    in_tangent: r.read_f32()?,
                    out_tangent: r.read_f32()?,
                });
            }
            channels.push(ClipChannel { index, keys });
        }
        bones.push(ClipBone { path, channels });
    }

    let (use_physics_left, use_physics_right) = if version >= 1001 {
        (Some(r.read_u8()? != 0), Some(r.read_u8()? != 0))
    } else {
        (None, None)
    };

    Ok(ClipData {
        version,
        bones,
        use_physics_left,
        use_physics_right,
    })
}

/// Read a clip as a single pose: the first key of every channel.
///
/// Bones the table does not know are skipped. A physics bone whose flag is
/// present and false is dropped. The whole clip is parsed before any frame is
/// built, so a malformed clip yields no partial result.
pub fn import_pose(
    bytes: &[u8],
    table: &BoneTable,
    frame_index: u32,
    pair: TangentPair,
) -> Result<ImportedPose, MalformedClipError> {
    let clip = decode_clip(bytes)?;
    let physics_left = clip.use_physics_left.unwrap_or(true);
    let physics_right = clip.use_physics_right.unwrap_or(true);

    let mut frame = KeyFrame::new(frame_index);
    for bone in &clip.bones {
        let Some(info) = table
            .by_path(&bone.path)
            .or_else(|| table.by_name(name_of(&bone.path)))
        else {
            log::warn!("unknown bone '{}' in clip, skipped", bone.path);
            continue;
        };
        match info.role {
            BoneRole::PhysicsLeft if !physics_left => continue,
            BoneRole::PhysicsRight if !physics_right => continue,
            _ => {}
        }

        let mut t = BoneTransform::new(info, pair);
        let mut values = t.values();
        for ch in &bone.channels {
            if let (Some(slot), Some(k)) = (values.get_mut(usize::from(ch.index)), ch.keys.first()) {
                *slot = k.value;
            }
        }
        t.set_values(&values);
        frame.put(t);
    }

    Ok(ImportedPose {
        frame,
        use_physics_left: clip.use_physics_left.unwrap_or(false),
        use_physics_right: clip.use_physics_right.unwrap_or(false),
    })
}
