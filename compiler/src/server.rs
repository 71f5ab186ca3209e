// server.rs — Engine command builders
//
// Constructs the command messages the audio engine understands: loading
// compiled definitions, spawning and controlling graph instances, and
// managing sample buffers. Every builder returns a plain message; callers
// wrap them in envelopes from `osc.rs` and own the transport.

use rosc::{OscError, OscMessage, OscType};

use crate::id::{BufferId, NodeId};
use crate::osc::{encode_message, message};

/// The engine's default group, present from boot.
pub const DEFAULT_GROUP: NodeId = NodeId(1);

/// Where a freshly spawned node lands relative to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddAction {
    GroupHead,
    GroupTail,
    Before,
    After,
    Replace,
}

impl AddAction {
    pub fn code(self) -> i32 {
        match self {
            AddAction::GroupHead => 0,
            AddAction::GroupTail => 1,
            AddAction::Before => 2,
            AddAction::After => 3,
            AddAction::Replace => 4,
        }
    }
}

// ── Definition commands ─────────────────────────────────────────────────

/// Load a compiled container. The trailing zero stands in for a
/// completion message.
pub fn d_recv(container: Vec<u8>) -> OscMessage {
    message("/d_recv", vec![OscType::Blob(container), OscType::Int(0)])
}

/// Load a compiled container, then have the engine execute `completion`.
pub fn d_recv_then(container: Vec<u8>, completion: OscMessage) -> Result<OscMessage, OscError> {
    let completion = encode_message(completion)?;
    Ok(message(
        "/d_recv",
        vec![OscType::Blob(container), OscType::Blob(completion)],
    ))
}

/// Drop a loaded definition by name.
pub fn d_free(name: &str) -> OscMessage {
    message("/d_free", vec![OscType::String(name.to_string())])
}

// ── Node commands ───────────────────────────────────────────────────────

/// A graph instance to spawn or steer on the engine. Holds the control
/// values to send along; values keep first-set order so repeated message
/// construction is reproducible.
#[derive(Debug, Clone)]
pub struct Synth {
    id: NodeId,
    defname: String,
    controls: Vec<(String, f32)>,
}

impl Synth {
    pub fn new(defname: impl Into<String>, id: NodeId) -> Synth {
        Synth {
            id,
            defname: defname.into(),
            controls: Vec::new(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Stage a control value. Setting a name again replaces its value in
    /// place.
    pub fn set(&mut self, name: &str, value: f32) -> &mut Synth {
        match self.controls.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = value,
            None => self.controls.push((name.to_string(), value)),
        }
        self
    }

    /// Spawn this instance with its staged controls.
    pub fn s_new(&self, action: AddAction, target: NodeId) -> OscMessage {
        let mut args = vec![
            OscType::String(self.defname.clone()),
            OscType::Int(self.id.0),
            OscType::Int(action.code()),
            OscType::Int(target.0),
        ];
        args.extend(self.control_args(None));
        message("/s_new", args)
    }

    /// Push every staged control to the running instance.
    pub fn n_set(&self) -> OscMessage {
        let mut args = vec![OscType::Int(self.id.0)];
        args.extend(self.control_args(None));
        message("/n_set", args)
    }

    /// Push only the named controls.
    pub fn n_set_only(&self, names: &[&str]) -> OscMessage {
        let mut args = vec![OscType::Int(self.id.0)];
        args.extend(self.control_args(Some(names)));
        message("/n_set", args)
    }

    pub fn n_free(&self) -> OscMessage {
        message("/n_free", vec![OscType::Int(self.id.0)])
    }

    fn control_args(&self, filter: Option<&[&str]>) -> Vec<OscType> {
        let mut args = Vec::new();
        for (name, value) in &self.controls {
            if let Some(names) = filter {
                if !names.contains(&name.as_str()) {
                    continue;
                }
            }
            args.push(OscType::String(name.clone()));
            args.push(OscType::Float(*value));
        }
        args
    }
}

// ── Buffer commands ─────────────────────────────────────────────────────

/// Allocate an empty buffer of `frames` × `channels` samples.
pub fn b_alloc(buffer: BufferId, frames: i32, channels: i32) -> OscMessage {
    message(
        "/b_alloc",
        vec![
            OscType::Int(buffer.0 as i32),
            OscType::Int(frames),
            OscType::Int(channels),
        ],
    )
}

/// Allocate a buffer sized to a sound file and read the whole file in.
pub fn b_alloc_read(buffer: BufferId, path: &str) -> OscMessage {
    message(
        "/b_allocRead",
        vec![
            OscType::Int(buffer.0 as i32),
            OscType::String(path.to_string()),
            OscType::Int(0),
            OscType::Int(0),
        ],
    )
}

/// Read `frames` samples (-1 for the rest of the file) starting at
/// `file_start` into the beginning of an allocated buffer.
pub fn b_read(buffer: BufferId, path: &str, file_start: i32, frames: i32) -> OscMessage {
    message(
        "/b_read",
        vec![
            OscType::Int(buffer.0 as i32),
            OscType::String(path.to_string()),
            OscType::Int(file_start),
            OscType::Int(frames),
            OscType::Int(0),
            OscType::Int(0),
        ],
    )
}

/// Write `frames` samples (-1 for the whole buffer) to a sound file.
/// `header` names the file format ("wav", "aiff"), `sample` the sample
/// format ("int16", "float").
pub fn b_write(buffer: BufferId, path: &str, header: &str, sample: &str, frames: i32) -> OscMessage {
    message(
        "/b_write",
        vec![
            OscType::Int(buffer.0 as i32),
            OscType::String(path.to_string()),
            OscType::String(header.to_string()),
            OscType::String(sample.to_string()),
            OscType::Int(frames),
            OscType::Int(0),
            OscType::Int(0),
        ],
    )
}

pub fn b_free(buffer: BufferId) -> OscMessage {
    message("/b_free", vec![OscType::Int(buffer.0 as i32)])
}

// ── Housekeeping ────────────────────────────────────────────────────────

pub fn status() -> OscMessage {
    message("/status", vec![])
}

/// Subscribe to or unsubscribe from engine notifications.
pub fn notify(on: bool) -> OscMessage {
    message("/notify", vec![OscType::Int(on as i32)])
}

pub fn quit() -> OscMessage {
    message("/quit", vec![])
}
