// decode.rs — Binary container reader
//
// Strict inverse of `encode.rs`: parses a container into plain decoded
// tables for inspection, JSON emission, and round-trip checking. Rejects
// anything the writer cannot produce: wrong magic, other versions,
// truncation, undefined rate codes, non-UTF-8 names, nonzero variant
// counts, trailing bytes.

use std::fmt;

use serde::Serialize;

use crate::encode::{MAGIC, VERSION};
use crate::graph::{Rate, CONSTANT_INPUT};

/// Errors produced while reading a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    Truncated { reading: &'static str, offset: usize },
    BadMagic { found: [u8; 4] },
    UnsupportedVersion { found: u32 },
    BadRate { found: u8, offset: usize },
    BadName { offset: usize },
    VariantRecords { count: u16 },
    TrailingBytes { count: usize },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Truncated { reading, offset } => {
                write!(f, "container truncated reading {} at offset {}", reading, offset)
            }
            DecodeError::BadMagic { found } => {
                write!(f, "bad magic {:02x?}, expected \"SCgf\"", found)
            }
            DecodeError::UnsupportedVersion { found } => {
                write!(f, "unsupported container version {}", found)
            }
            DecodeError::BadRate { found, offset } => {
                write!(f, "undefined rate code {} at offset {}", found, offset)
            }
            DecodeError::BadName { offset } => {
                write!(f, "name at offset {} is not UTF-8", offset)
            }
            DecodeError::VariantRecords { count } => {
                write!(f, "{} variant records present, none supported", count)
            }
            DecodeError::TrailingBytes { count } => {
                write!(f, "{} trailing bytes after the variant count", count)
            }
        }
    }
}

impl std::error::Error for DecodeError {}

// ── Decoded model ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedFile {
    pub version: u32,
    pub defs: Vec<DecodedDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedDef {
    pub name: String,
    pub constants: Vec<f32>,
    pub parameter_defaults: Vec<f32>,
    pub parameter_names: Vec<NamedSlot>,
    pub nodes: Vec<DecodedNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedSlot {
    pub name: String,
    pub slot: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedNode {
    pub name: String,
    pub rate: Rate,
    pub special_index: u16,
    pub inputs: Vec<DecodedInput>,
    pub outputs: Vec<Rate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum DecodedInput {
    Constant { index: u16 },
    Node { index: u16, output: u16 },
}

/// Parse a complete container.
pub fn decode(data: &[u8]) -> Result<DecodedFile, DecodeError> {
    let mut r = Reader { data, pos: 0 };
    let magic = r.bytes(4, "magic")?;
    if magic != MAGIC {
        let mut found = [0u8; 4];
        found.copy_from_slice(magic);
        return Err(DecodeError::BadMagic { found });
    }
    let version = r.u32("version")?;
    if version != VERSION {
        return Err(DecodeError::UnsupportedVersion { found: version });
    }
    let count = r.u16("definition count")?;
    let mut defs = Vec::with_capacity(count as usize);
    for _ in 0..count {
        defs.push(decode_def(&mut r)?);
    }
    let variants = r.u16("variant count")?;
    if variants != 0 {
        return Err(DecodeError::VariantRecords { count: variants });
    }
    if r.pos != data.len() {
        return Err(DecodeError::TrailingBytes {
            count: data.len() - r.pos,
        });
    }
    Ok(DecodedFile { version, defs })
}

fn decode_def(r: &mut Reader<'_>) -> Result<DecodedDef, DecodeError> {
    let name = r.str("definition name")?;

    let const_count = r.u16("constant count")?;
    let mut constants = Vec::with_capacity(const_count as usize);
    for _ in 0..const_count {
        constants.push(r.f32("constant")?);
    }

    let param_count = r.u16("parameter count")?;
    let mut parameter_defaults = Vec::with_capacity(param_count as usize);
    for _ in 0..param_count {
        parameter_defaults.push(r.f32("parameter default")?);
    }

    let name_count = r.u16("parameter name count")?;
    let mut parameter_names = Vec::with_capacity(name_count as usize);
    for _ in 0..name_count {
        let pname = r.str("parameter name")?;
        let slot = r.u16("parameter slot")?;
        parameter_names.push(NamedSlot { name: pname, slot });
    }

    let node_count = r.u16("node count")?;
    let mut nodes = Vec::with_capacity(node_count as usize);
    for _ in 0..node_count {
        nodes.push(decode_node(r)?);
    }

    Ok(DecodedDef {
        name,
        constants,
        parameter_defaults,
        parameter_names,
        nodes,
    })
}

fn decode_node(r: &mut Reader<'_>) -> Result<DecodedNode, DecodeError> {
    let name = r.str("node name")?;
    let rate = r.rate("node rate")?;
    let input_count = r.u16("input count")?;
    let output_count = r.u16("output count")?;
    let special_index = r.u16("special index")?;

    let mut inputs = Vec::with_capacity(input_count as usize);
    for _ in 0..input_count {
        let source = r.u16("input source")?;
        let slot = r.u16("input slot")?;
        inputs.push(if source == CONSTANT_INPUT {
            DecodedInput::Constant { index: slot }
        } else {
            DecodedInput::Node {
                index: source,
                output: slot,
            }
        });
    }

    let mut outputs = Vec::with_capacity(output_count as usize);
    for _ in 0..output_count {
        outputs.push(r.rate("output rate")?);
    }

    Ok(DecodedNode {
        name,
        rate,
        special_index,
        inputs,
        outputs,
    })
}

// ── Primitive reader ────────────────────────────────────────────────────

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn bytes(&mut self, n: usize, reading: &'static str) -> Result<&'a [u8], DecodeError> {
        let end = self.pos.checked_add(n).filter(|&e| e <= self.data.len());
        match end {
            Some(end) => {
                let slice = &self.data[self.pos..end];
                self.pos = end;
                Ok(slice)
            }
            None => Err(DecodeError::Truncated {
                reading,
                offset: self.pos,
            }),
        }
    }

    fn u8(&mut self, reading: &'static str) -> Result<u8, DecodeError> {
        Ok(self.bytes(1, reading)?[0])
    }

    fn u16(&mut self, reading: &'static str) -> Result<u16, DecodeError> {
        let b = self.bytes(2, reading)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self, reading: &'static str) -> Result<u32, DecodeError> {
        let b = self.bytes(4, reading)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn f32(&mut self, reading: &'static str) -> Result<f32, DecodeError> {
        let b = self.bytes(4, reading)?;
        Ok(f32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn str(&mut self, reading: &'static str) -> Result<String, DecodeError> {
        let offset = self.pos;
        let len = self.u8(reading)? as usize;
        let bytes = self.bytes(len, reading)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| DecodeError::BadName { offset })
    }

    fn rate(&mut self, reading: &'static str) -> Result<Rate, DecodeError> {
        let offset = self.pos;
        let code = self.u8(reading)?;
        Rate::from_code(code).ok_or(DecodeError::BadRate {
            found: code,
            offset,
        })
    }
}

// ── Human-readable dump ─────────────────────────────────────────────────

impl fmt::Display for DecodedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "container v{}, {} definition{}",
            self.version,
            self.defs.len(),
            if self.defs.len() == 1 { "" } else { "s" }
        )?;
        for def in &self.defs {
            writeln!(f)?;
            write!(f, "{}", def)?;
        }
        Ok(())
    }
}

impl fmt::Display for DecodedDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "synthdef \"{}\"", self.name)?;

        write!(f, "  constants: [")?;
        for (i, value) in self.constants.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", value)?;
        }
        writeln!(f, "]")?;

        write!(f, "  params: [")?;
        for (i, named) in self.parameter_names.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match self.parameter_defaults.get(named.slot as usize) {
                Some(default) => write!(f, "{}={} @{}", named.name, default, named.slot)?,
                None => write!(f, "{}=? @{}", named.name, named.slot)?,
            }
        }
        writeln!(f, "]")?;

        writeln!(f, "  nodes:")?;
        for (i, node) in self.nodes.iter().enumerate() {
            write!(
                f,
                "    [{}] {} {} special={} in=[",
                i, node.name, node.rate, node.special_index
            )?;
            for (j, input) in node.inputs.iter().enumerate() {
                if j > 0 {
                    write!(f, " ")?;
                }
                match input {
                    DecodedInput::Constant { index } => write!(f, "c{}", index)?,
                    DecodedInput::Node { index, output } => write!(f, "n{}.{}", index, output)?,
                }
            }
            write!(f, "] out=[")?;
            for (j, rate) in node.outputs.iter().enumerate() {
                if j > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{}", rate)?;
            }
            writeln!(f, "]")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::{encode, encode_one};
    use crate::graph::{Input, Rate, SynthDef, UGenSpec};

    fn tone() -> SynthDef {
        let mut def = SynthDef::new("tone", &[("freq", 440.0)]).unwrap();
        let osc = def.add_ugen(
            UGenSpec::new("SinOsc", Rate::Audio)
                .with_input(Input::Constant(440.0))
                .with_input(Input::Constant(0.0)),
        );
        def.register(osc).unwrap();
        def
    }

    #[test]
    fn round_trip_reproduces_every_table() {
        let def = tone();
        let decoded = decode(&encode_one(&def).unwrap()).unwrap();
        assert_eq!(decoded.version, 1);
        assert_eq!(decoded.defs.len(), 1);

        let d = &decoded.defs[0];
        assert_eq!(d.name, "tone");
        assert_eq!(d.constants, vec![440.0, 0.0]);
        assert_eq!(d.parameter_defaults, vec![440.0]);
        assert_eq!(d.parameter_names.len(), 1);
        assert_eq!(d.parameter_names[0].name, "freq");
        assert_eq!(d.parameter_names[0].slot, 0);

        assert_eq!(d.nodes.len(), 1);
        let node = &d.nodes[0];
        assert_eq!(node.name, "SinOsc");
        assert_eq!(node.rate, Rate::Audio);
        assert_eq!(node.special_index, 0);
        assert_eq!(
            node.inputs,
            vec![
                DecodedInput::Constant { index: 0 },
                DecodedInput::Constant { index: 1 }
            ]
        );
        assert_eq!(node.outputs, vec![Rate::Audio]);
    }

    #[test]
    fn bad_magic_rejected() {
        let mut bytes = encode(&[]).unwrap();
        bytes[3] = b'x';
        let err = decode(&bytes).unwrap_err();
        assert!(matches!(err, DecodeError::BadMagic { .. }));
    }

    #[test]
    fn unsupported_version_rejected() {
        let mut bytes = encode(&[]).unwrap();
        bytes[7] = 2;
        assert_eq!(
            decode(&bytes).unwrap_err(),
            DecodeError::UnsupportedVersion { found: 2 }
        );
    }

    #[test]
    fn truncation_names_what_was_read() {
        let bytes = encode_one(&tone()).unwrap();
        let err = decode(&bytes[..bytes.len() - 3]).unwrap_err();
        assert!(matches!(err, DecodeError::Truncated { .. }));
    }

    #[test]
    fn trailing_bytes_rejected() {
        let mut bytes = encode(&[]).unwrap();
        bytes.push(0);
        assert_eq!(
            decode(&bytes).unwrap_err(),
            DecodeError::TrailingBytes { count: 1 }
        );
    }

    #[test]
    fn variant_records_rejected() {
        let mut bytes = encode(&[]).unwrap();
        let len = bytes.len();
        bytes[len - 1] = 1;
        assert_eq!(
            decode(&bytes).unwrap_err(),
            DecodeError::VariantRecords { count: 1 }
        );
    }

    #[test]
    fn undefined_rate_code_rejected() {
        let mut bytes = encode_one(&tone()).unwrap();
        // rate byte sits right after the node name "SinOsc"
        let needle = b"\x06SinOsc";
        let at = bytes
            .windows(needle.len())
            .position(|w| w == needle)
            .unwrap()
            + needle.len();
        bytes[at] = 9;
        let err = decode(&bytes).unwrap_err();
        assert!(matches!(err, DecodeError::BadRate { found: 9, .. }));
    }

    #[test]
    fn non_utf8_name_rejected() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"SCgf");
        bytes.extend_from_slice(&1u32.to_be_bytes());
        bytes.extend_from_slice(&1u16.to_be_bytes());
        bytes.push(1);
        bytes.push(0xFF);
        let err = decode(&bytes).unwrap_err();
        assert!(matches!(err, DecodeError::BadName { .. }));
    }

    #[test]
    fn dump_shows_tables_and_wire_references() {
        let mut def = tone();
        let freq = def.control("freq").unwrap();
        let crate::graph::Signal::Node { id: bank, .. } = freq else {
            panic!("expected control output");
        };
        let patched = def.add_ugen(
            UGenSpec::new("SinOsc", Rate::Audio)
                .with_input(Input::node(bank, 0))
                .with_input(Input::Constant(0.0)),
        );
        def.register(patched).unwrap();

        let decoded = decode(&encode_one(&def).unwrap()).unwrap();
        let text = decoded.to_string();
        assert!(text.contains("synthdef \"tone\""), "{}", text);
        assert!(text.contains("freq=440 @0"), "{}", text);
        assert!(text.contains("Control"), "{}", text);
        assert!(text.contains("n1.0"), "{}", text);
        assert!(text.contains("c1"), "{}", text);
    }
}
