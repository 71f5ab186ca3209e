// encode.rs — Binary container writer ("SCgf", version 1)
//
// Serializes frozen definitions into the engine's synth definition file
// format: big-endian throughout, pascal strings (u8 length, no
// terminator), u16 table counts, f32 payloads, one trailing u16 variant
// count. The writer only reads committed tables and never mutates the
// definition, so identical definitions always produce identical bytes.
//
// Preconditions: every definition's graph roots are attached (reachable
//   specs committed, constants interned).
// Failure modes: names wider than a pascal string, tables wider than u16,
//   and lookup misses, which can only mean a broken upstream invariant.

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::GraphError;
use crate::graph::{SynthDef, UGenId};

pub const MAGIC: [u8; 4] = *b"SCgf";
pub const VERSION: u32 = 1;

/// Encode a container holding `defs` in order.
pub fn encode(defs: &[SynthDef]) -> Result<Vec<u8>, GraphError> {
    let count = table_len("definition table", defs.len())?;
    let mut out = Vec::with_capacity(256 * defs.len().max(1));
    out.extend_from_slice(&MAGIC);
    write_u32(&mut out, VERSION);
    write_u16(&mut out, count);
    for def in defs {
        encode_def(def, &mut out)?;
    }
    // no variant records
    write_u16(&mut out, 0);
    debug!(bytes = out.len(), defs = defs.len(), "encoded container");
    Ok(out)
}

/// Encode a container holding a single definition.
pub fn encode_one(def: &SynthDef) -> Result<Vec<u8>, GraphError> {
    encode(std::slice::from_ref(def))
}

/// SHA-256 of an encoded container, as lowercase hex.
pub fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    bytes_to_hex(&hasher.finalize())
}

fn encode_def(def: &SynthDef, out: &mut Vec<u8>) -> Result<(), GraphError> {
    write_str(out, def.name())?;

    let consts = def.constants();
    write_u16(out, table_len("constant pool", consts.len())?);
    for &value in consts {
        write_f32(out, value);
    }

    let params = def.parameters();
    let param_count = table_len("parameter table", params.len())?;
    write_u16(out, param_count);
    for param in params {
        write_f32(out, param.default);
    }
    write_u16(out, param_count);
    for (slot, param) in params.iter().enumerate() {
        write_str(out, &param.name)?;
        write_u16(out, slot as u16);
    }

    let nodes = def.committed_nodes();
    write_u16(out, table_len("node table", nodes.len())?);
    for &id in nodes {
        encode_node(def, id, out)?;
    }
    Ok(())
}

fn encode_node(def: &SynthDef, id: UGenId, out: &mut Vec<u8>) -> Result<(), GraphError> {
    let spec = def
        .spec(id)
        .ok_or_else(|| GraphError::UnknownConstantOrNode {
            detail: format!("committed handle {} has no spec", id.0),
        })?;
    write_str(out, &spec.name)?;
    out.push(spec.rate.code());
    write_u16(out, table_len("input list", spec.inputs.len())?);
    write_u16(out, table_len("output list", spec.outputs.len())?);
    write_u16(out, spec.special_index);
    for input in &spec.inputs {
        let (source, slot) = def.wire_input(input)?;
        write_u16(out, source);
        write_u16(out, slot);
    }
    for &rate in &spec.outputs {
        out.push(rate.code());
    }
    Ok(())
}

// ── Primitive writers ───────────────────────────────────────────────────

fn write_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_be_bytes());
}

fn write_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_be_bytes());
}

fn write_f32(out: &mut Vec<u8>, value: f32) {
    out.extend_from_slice(&value.to_be_bytes());
}

fn write_str(out: &mut Vec<u8>, s: &str) -> Result<(), GraphError> {
    if s.len() > u8::MAX as usize {
        return Err(GraphError::InvalidArgument {
            reason: format!("name '{}' exceeds 255 bytes", s),
        });
    }
    out.push(s.len() as u8);
    out.extend_from_slice(s.as_bytes());
    Ok(())
}

fn table_len(what: &str, len: usize) -> Result<u16, GraphError> {
    u16::try_from(len).map_err(|_| GraphError::InvalidArgument {
        reason: format!("{} exceeds {} entries", what, u16::MAX),
    })
}

fn bytes_to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
