// catalog.rs — Built-in unit catalog
//
// Static descriptions of the stock units plus the operator units, all
// reaching the graph through the signature walk in `unit.rs`. The two
// exceptions to the generic path are the control bank (materialized by
// `SynthDef::new`) and the bus writer `Out`, which is variadic: its channel
// inputs flatten into one node rather than expanding per channel, matching
// the records the engine expects on the wire.

use crate::error::GraphError;
use crate::graph::{Input, Rate, Signal, SynthDef, UGenSpec};
use crate::unit::{ArgSpec, UnitDef};

pub const SIN_OSC: UnitDef = UnitDef {
    name: "SinOsc",
    special_index: 0,
    signature: &[
        ArgSpec::with_default("freq", 440.0),
        ArgSpec::with_default("phase", 0.0),
    ],
    outputs: 1,
};

pub const IMPULSE: UnitDef = UnitDef {
    name: "Impulse",
    special_index: 0,
    signature: &[
        ArgSpec::with_default("freq", 440.0),
        ArgSpec::with_default("phase", 0.0),
    ],
    outputs: 1,
};

pub const DECAY2: UnitDef = UnitDef {
    name: "Decay2",
    special_index: 0,
    signature: &[
        ArgSpec::required("in"),
        ArgSpec::with_default("attack", 0.01),
        ArgSpec::with_default("decay", 1.0),
    ],
    outputs: 1,
};

// Line and XLine differ only in curve; both run the same signature.
const LINE_SIGNATURE: &[ArgSpec] = &[
    ArgSpec::with_default("start", 0.0),
    ArgSpec::with_default("end", 1.0),
    ArgSpec::with_default("dur", 1.0),
    ArgSpec::with_default("doneAction", 0.0),
];

pub const LINE: UnitDef = UnitDef {
    name: "Line",
    special_index: 0,
    signature: LINE_SIGNATURE,
    outputs: 1,
};

pub const XLINE: UnitDef = UnitDef {
    name: "XLine",
    special_index: 0,
    signature: LINE_SIGNATURE,
    outputs: 1,
};

pub const WHITE_NOISE: UnitDef = UnitDef {
    name: "WhiteNoise",
    special_index: 0,
    signature: &[],
    outputs: 1,
};

/// Units constructible through the generic signature walk.
pub const BUILTINS: &[UnitDef] = &[SIN_OSC, IMPULSE, DECAY2, LINE, XLINE, WHITE_NOISE];

// ── Operator units ──────────────────────────────────────────────────────

const BINARY_SIGNATURE: &[ArgSpec] = &[ArgSpec::required("a"), ArgSpec::required("b")];
const UNARY_SIGNATURE: &[ArgSpec] = &[ArgSpec::required("a")];

/// Binary operator selectors, by wire special index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Plus = 0,
    Minus = 1,
    Times = 2,
    Divide = 3,
    Mod = 4,
    Min = 5,
    Max = 6,
    Log = 25,
    Log2 = 26,
    Log10 = 27,
}

impl BinOp {
    pub fn code(self) -> u16 {
        self as u16
    }
}

/// Unary operator selectors, by wire special index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg = 0,
}

impl UnOp {
    pub fn code(self) -> u16 {
        self as u16
    }
}

/// Apply a binary operator. The result rate is the maximum operand rate.
pub fn binary_op(
    def: &mut SynthDef,
    op: BinOp,
    a: Signal,
    b: Signal,
) -> Result<Signal, GraphError> {
    let rate = operand_rate(def, &[&a, &b])?;
    let unit = UnitDef {
        name: "BinaryOpUGen",
        special_index: op.code(),
        signature: BINARY_SIGNATURE,
        outputs: 1,
    };
    unit.at(def, rate, &[a, b])
}

/// Apply a unary operator. The result keeps the operand rate.
pub fn unary_op(def: &mut SynthDef, op: UnOp, a: Signal) -> Result<Signal, GraphError> {
    let rate = operand_rate(def, &[&a])?;
    let unit = UnitDef {
        name: "UnaryOpUGen",
        special_index: op.code(),
        signature: UNARY_SIGNATURE,
        outputs: 1,
    };
    unit.at(def, rate, &[a])
}

pub fn add(def: &mut SynthDef, a: Signal, b: Signal) -> Result<Signal, GraphError> {
    binary_op(def, BinOp::Plus, a, b)
}

pub fn multiply(def: &mut SynthDef, a: Signal, b: Signal) -> Result<Signal, GraphError> {
    binary_op(def, BinOp::Times, a, b)
}

pub fn negate(def: &mut SynthDef, a: Signal) -> Result<Signal, GraphError> {
    unary_op(def, UnOp::Neg, a)
}

fn operand_rate(def: &SynthDef, operands: &[&Signal]) -> Result<Rate, GraphError> {
    let mut rate = Rate::Scalar;
    for operand in operands {
        let r = def
            .rate_of(operand)
            .ok_or_else(|| GraphError::InvalidArgument {
                reason: "operand rate is undefined (dangling reference or empty bundle)"
                    .to_string(),
            })?;
        rate = rate.max(r);
    }
    Ok(rate)
}

// ── Bus writer ──────────────────────────────────────────────────────────

/// Audio-rate bus writer: one zero-output node whose inputs are the bus
/// followed by every channel in order.
pub fn out_ar(def: &mut SynthDef, bus: Signal, channels: Signal) -> Result<Signal, GraphError> {
    out_at(def, Rate::Audio, bus, channels)
}

/// Control-rate bus writer.
pub fn out_kr(def: &mut SynthDef, bus: Signal, channels: Signal) -> Result<Signal, GraphError> {
    out_at(def, Rate::Control, bus, channels)
}

fn out_at(
    def: &mut SynthDef,
    rate: Rate,
    bus: Signal,
    channels: Signal,
) -> Result<Signal, GraphError> {
    let mut spec = UGenSpec::new("Out", rate).with_outputs(Vec::new());
    spec.inputs.push(scalar_input("Out", "bus", &bus)?);
    match channels {
        Signal::Bundle(items) => {
            if items.is_empty() {
                return Err(GraphError::InvalidArgument {
                    reason: "Out requires at least one channel".to_string(),
                });
            }
            for item in &items {
                spec.inputs.push(scalar_input("Out", "channels", item)?);
            }
        }
        other => spec.inputs.push(scalar_input("Out", "channels", &other)?),
    }
    Ok(Signal::node(def.add_ugen(spec)))
}

fn scalar_input(unit: &str, param: &str, value: &Signal) -> Result<Input, GraphError> {
    match value {
        Signal::Const(v) => Ok(Input::Constant(*v)),
        Signal::Node { id, output } => Ok(Input::Node {
            id: *id,
            output: *output,
        }),
        Signal::Bundle(_) => Err(GraphError::InvalidArgument {
            reason: format!(
                "bundle nested in parameter '{}' of {} where a single input is required",
                param, unit
            ),
        }),
    }
}
