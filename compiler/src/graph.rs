// graph.rs — Synth definition graphs: spec arena, interning, registration
//
// A `SynthDef` owns every unit spec constructed for it (an arena indexed by
// `UGenId`) plus the three tables the binary container serializes: the
// constant pool, the parameter list, and the committed node table.
// Registration walks a spec's inputs depth-first so dependencies always
// commit at smaller indices, interns constant inputs into the pool, and
// deduplicates structurally equal specs onto one committed index.
//
// Preconditions: spec inputs name handles from the same definition.
// Postconditions: after `add` succeeds, every reachable spec has a committed
//   index and every constant input has a pool slot.
// Failure modes: cyclic references, dangling handles, out-of-range output
//   slots, and tables outgrowing their u16 wire width.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::{debug, trace};

use crate::error::GraphError;

/// Wire marker in an input record's first field distinguishing a constant
/// pool reference from a node reference.
pub const CONSTANT_INPUT: u16 = 0xFFFF;

/// Calculation rate of a unit. The derived ordering (scalar < control <
/// audio) is the promotion order used when inferring operator rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Rate {
    Scalar,
    Control,
    Audio,
}

impl Rate {
    pub fn code(self) -> u8 {
        match self {
            Rate::Scalar => 0,
            Rate::Control => 1,
            Rate::Audio => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<Rate> {
        match code {
            0 => Some(Rate::Scalar),
            1 => Some(Rate::Control),
            2 => Some(Rate::Audio),
            _ => None,
        }
    }
}

impl std::fmt::Display for Rate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Rate::Scalar => "scalar",
            Rate::Control => "control",
            Rate::Audio => "audio",
        };
        f.write_str(label)
    }
}

/// Arena handle for a unit spec within one `SynthDef`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UGenId(pub u32);

/// One input slot of a unit spec.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Input {
    /// Numeric leaf, interned into the constant pool at registration.
    Constant(f32),
    /// Output slot `output` of the spec `id` names.
    Node { id: UGenId, output: u16 },
}

impl Input {
    pub fn node(id: UGenId, output: u16) -> Input {
        Input::Node { id, output }
    }
}

/// A unit generator description awaiting registration.
#[derive(Debug, Clone)]
pub struct UGenSpec {
    pub name: String,
    pub rate: Rate,
    pub special_index: u16,
    pub inputs: Vec<Input>,
    pub outputs: Vec<Rate>,
}

impl UGenSpec {
    /// New spec with no inputs and a single output at `rate`.
    pub fn new(name: impl Into<String>, rate: Rate) -> UGenSpec {
        UGenSpec {
            name: name.into(),
            rate,
            special_index: 0,
            inputs: Vec::new(),
            outputs: vec![rate],
        }
    }

    pub fn with_special_index(mut self, special_index: u16) -> UGenSpec {
        self.special_index = special_index;
        self
    }

    pub fn with_input(mut self, input: Input) -> UGenSpec {
        self.inputs.push(input);
        self
    }

    pub fn with_outputs(mut self, outputs: Vec<Rate>) -> UGenSpec {
        self.outputs = outputs;
        self
    }
}

/// A value flowing through graph construction: a numeric constant, one
/// output of a constructed spec, or a multichannel bundle of values.
///
/// Bundles hold scalar values only; nesting a bundle where a single input
/// is required is rejected during construction.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    Const(f32),
    Node { id: UGenId, output: u16 },
    Bundle(Vec<Signal>),
}

impl Signal {
    /// Output 0 of `id`.
    pub fn node(id: UGenId) -> Signal {
        Signal::Node { id, output: 0 }
    }

    pub fn output(id: UGenId, output: u16) -> Signal {
        Signal::Node { id, output }
    }

    pub fn bundle<I>(items: I) -> Signal
    where
        I: IntoIterator<Item = Signal>,
    {
        Signal::Bundle(items.into_iter().collect())
    }
}

impl From<f32> for Signal {
    fn from(value: f32) -> Signal {
        Signal::Const(value)
    }
}

impl From<f64> for Signal {
    fn from(value: f64) -> Signal {
        Signal::Const(value as f32)
    }
}

impl From<i32> for Signal {
    fn from(value: i32) -> Signal {
        Signal::Const(value as f32)
    }
}

/// Named control slot with its default value.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub default: f32,
}

/// Structural identity of a committed node: type name, rate, operator
/// selector, and inputs in canonical wire form. Constants appear as their
/// pool index, references as (committed node index, output slot), so two
/// specs compare equal exactly when they would encode identically.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct NodeKey {
    name: String,
    rate: Rate,
    special_index: u16,
    inputs: Vec<(u16, u16)>,
}

/// One synth definition under construction.
#[derive(Debug, Clone)]
pub struct SynthDef {
    name: String,
    consts: Vec<f32>,
    const_index: HashMap<u32, u16>,
    params: Vec<Parameter>,
    specs: Vec<UGenSpec>,
    control: Option<UGenId>,
    committed: Vec<UGenId>,
    committed_index: HashMap<UGenId, u16>,
    dedup: HashMap<NodeKey, u16>,
    pending: HashSet<UGenId>,
}

impl SynthDef {
    /// New definition with the given control parameters, in declaration
    /// order. A nonempty parameter list materializes the control bank spec
    /// (one control-rate output per parameter); it commits only once a
    /// registered node references it.
    pub fn new(name: impl Into<String>, params: &[(&str, f32)]) -> Result<SynthDef, GraphError> {
        let name = name.into();
        check_name_width("definition name", &name)?;
        if params.len() > u16::MAX as usize {
            return Err(GraphError::InvalidArgument {
                reason: format!("{} parameters exceed the u16 parameter table", params.len()),
            });
        }

        let mut seen = HashSet::new();
        let mut parameters = Vec::with_capacity(params.len());
        for &(pname, default) in params {
            check_name_width("parameter name", pname)?;
            if !seen.insert(pname) {
                return Err(GraphError::InvalidArgument {
                    reason: format!("duplicate parameter name '{}'", pname),
                });
            }
            parameters.push(Parameter {
                name: pname.to_string(),
                default,
            });
        }

        let mut def = SynthDef {
            name,
            consts: Vec::new(),
            const_index: HashMap::new(),
            params: parameters,
            specs: Vec::new(),
            control: None,
            committed: Vec::new(),
            committed_index: HashMap::new(),
            dedup: HashMap::new(),
            pending: HashSet::new(),
        };

        if !def.params.is_empty() {
            let bank = UGenSpec::new("Control", Rate::Control)
                .with_outputs(vec![Rate::Control; def.params.len()]);
            def.control = Some(def.add_ugen(bank));
        }

        Ok(def)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Constant pool in insertion order.
    pub fn constants(&self) -> &[f32] {
        &self.consts
    }

    /// Control parameters in declaration order.
    pub fn parameters(&self) -> &[Parameter] {
        &self.params
    }

    /// Number of committed nodes.
    pub fn node_count(&self) -> usize {
        self.committed.len()
    }

    // ── Control bank access ─────────────────────────────────────────────

    /// The named control's output, or None for an undeclared name.
    pub fn control(&self, name: &str) -> Option<Signal> {
        let bank = self.control?;
        let slot = self.params.iter().position(|p| p.name == name)?;
        Some(Signal::output(bank, slot as u16))
    }

    /// All control outputs in declaration order: a single output for a
    /// one-parameter definition, a bundle otherwise, None without
    /// parameters.
    pub fn controls(&self) -> Option<Signal> {
        let bank = self.control?;
        if self.params.len() == 1 {
            return Some(Signal::node(bank));
        }
        Some(Signal::bundle(
            (0..self.params.len()).map(|slot| Signal::output(bank, slot as u16)),
        ))
    }

    // ── Spec arena ──────────────────────────────────────────────────────

    /// Place a spec in the arena and return its handle. No interning or
    /// validation happens until the spec is registered.
    pub fn add_ugen(&mut self, spec: UGenSpec) -> UGenId {
        let id = UGenId(self.specs.len() as u32);
        self.specs.push(spec);
        id
    }

    pub fn spec(&self, id: UGenId) -> Option<&UGenSpec> {
        self.specs.get(id.0 as usize)
    }

    /// Rate carried by a graph value: scalar for constants, the referenced
    /// output's declared rate for node values, the maximum element rate for
    /// bundles. None for dangling handles, out-of-range slots, and empty
    /// bundles.
    pub fn rate_of(&self, value: &Signal) -> Option<Rate> {
        match value {
            Signal::Const(_) => Some(Rate::Scalar),
            Signal::Node { id, output } => self.spec(*id)?.outputs.get(*output as usize).copied(),
            Signal::Bundle(items) => {
                let mut max: Option<Rate> = None;
                for item in items {
                    let rate = self.rate_of(item)?;
                    max = Some(max.map_or(rate, |m| m.max(rate)));
                }
                max
            }
        }
    }

    // ── Registration ────────────────────────────────────────────────────

    /// Attach a graph root, registering every spec it reaches. Bundle roots
    /// register each element in order. A bare constant is not a root: it
    /// would encode nothing.
    pub fn add(&mut self, root: &Signal) -> Result<(), GraphError> {
        match root {
            Signal::Node { id, .. } => {
                self.register(*id)?;
                Ok(())
            }
            Signal::Bundle(items) => {
                if items.is_empty() {
                    return Err(GraphError::InvalidArgument {
                        reason: "empty bundle cannot be a graph root".to_string(),
                    });
                }
                for item in items {
                    self.add(item)?;
                }
                Ok(())
            }
            Signal::Const(_) => Err(GraphError::InvalidArgument {
                reason: "a bare constant cannot be a graph root".to_string(),
            }),
        }
    }

    /// Commit `id` and everything it references, returning its node index.
    ///
    /// Re-registering a committed spec returns the existing index.
    /// Re-entering a spec that is still being walked is a cycle.
    pub fn register(&mut self, id: UGenId) -> Result<u16, GraphError> {
        if let Some(&index) = self.committed_index.get(&id) {
            return Ok(index);
        }
        let spec = self.spec(id).ok_or_else(|| dangling(id))?;
        if self.pending.contains(&id) {
            return Err(GraphError::CyclicGraph {
                unit: spec.name.clone(),
            });
        }
        let name = spec.name.clone();
        let inputs = spec.inputs.clone();

        self.pending.insert(id);
        let walked = self.walk_inputs(&inputs);
        self.pending.remove(&id);
        walked?;

        let key = self.node_key(id)?;
        if let Some(&index) = self.dedup.get(&key) {
            debug!(unit = %name, index, "deduplicated structurally equal node");
            self.committed_index.insert(id, index);
            return Ok(index);
        }

        // Index 0xFFFF is reserved for the constant marker, so the table
        // tops out one short of the u16 range.
        if self.committed.len() >= u16::MAX as usize {
            return Err(GraphError::InvalidArgument {
                reason: "node table full (65535 node limit)".to_string(),
            });
        }
        let index = self.committed.len() as u16;
        self.committed.push(id);
        self.committed_index.insert(id, index);
        self.dedup.insert(key, index);
        trace!(unit = %name, index, "committed node");
        Ok(index)
    }

    fn walk_inputs(&mut self, inputs: &[Input]) -> Result<(), GraphError> {
        for input in inputs {
            match *input {
                Input::Constant(value) => {
                    self.intern_constant(value)?;
                }
                Input::Node { id, output } => {
                    self.register(id)?;
                    let spec = self.spec(id).ok_or_else(|| dangling(id))?;
                    if (output as usize) >= spec.outputs.len() {
                        return Err(GraphError::InvalidArgument {
                            reason: format!(
                                "output slot {} out of range for {} ({} outputs)",
                                output,
                                spec.name,
                                spec.outputs.len()
                            ),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    fn intern_constant(&mut self, value: f32) -> Result<u16, GraphError> {
        let bits = value.to_bits();
        if let Some(&index) = self.const_index.get(&bits) {
            return Ok(index);
        }
        if self.consts.len() >= u16::MAX as usize {
            return Err(GraphError::InvalidArgument {
                reason: "constant pool full (65535 constant limit)".to_string(),
            });
        }
        let index = self.consts.len() as u16;
        self.consts.push(value);
        self.const_index.insert(bits, index);
        Ok(index)
    }

    fn node_key(&self, id: UGenId) -> Result<NodeKey, GraphError> {
        let spec = self.spec(id).ok_or_else(|| dangling(id))?;
        let mut inputs = Vec::with_capacity(spec.inputs.len());
        for input in &spec.inputs {
            inputs.push(self.wire_input(input)?);
        }
        Ok(NodeKey {
            name: spec.name.clone(),
            rate: spec.rate,
            special_index: spec.special_index,
            inputs,
        })
    }

    // ── Wire lookups ────────────────────────────────────────────────────

    /// Canonical wire form of one input: (0xFFFF, pool index) for a
    /// constant, (node index, output slot) for a reference.
    pub(crate) fn wire_input(&self, input: &Input) -> Result<(u16, u16), GraphError> {
        match *input {
            Input::Constant(value) => Ok((CONSTANT_INPUT, self.constant_lookup(value)?)),
            Input::Node { id, output } => Ok((self.node_lookup(id)?, output)),
        }
    }

    pub(crate) fn committed_nodes(&self) -> &[UGenId] {
        &self.committed
    }

    fn constant_lookup(&self, value: f32) -> Result<u16, GraphError> {
        self.const_index
            .get(&value.to_bits())
            .copied()
            .ok_or_else(|| GraphError::UnknownConstantOrNode {
                detail: format!("constant {} is not in the pool", value),
            })
    }

    fn node_lookup(&self, id: UGenId) -> Result<u16, GraphError> {
        self.committed_index
            .get(&id)
            .copied()
            .ok_or_else(|| GraphError::UnknownConstantOrNode {
                detail: format!("spec {} is not committed", id.0),
            })
    }
}

fn dangling(id: UGenId) -> GraphError {
    GraphError::UnknownConstantOrNode {
        detail: format!("no spec for handle {}", id.0),
    }
}

fn check_name_width(what: &str, name: &str) -> Result<(), GraphError> {
    if name.len() > u8::MAX as usize {
        return Err(GraphError::InvalidArgument {
            reason: format!("{} '{}' exceeds 255 bytes", what, name),
        });
    }
    Ok(())
}
