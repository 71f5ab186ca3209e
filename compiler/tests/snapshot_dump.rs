// Snapshot tests: lock the dump and DOT text for small fixed definitions.
//
// Uses the library API (build → encode → decode) and snapshots the exact
// inspection output. Snapshots are managed by `insta` and stored under
// `compiler/tests/snapshots/`.
//
// Run `cargo insta review` after intentional output changes to update baselines.

use sdc::catalog::{multiply, out_ar, SIN_OSC, WHITE_NOISE};
use sdc::decode::{decode, DecodedFile};
use sdc::dot::emit_dot;
use sdc::encode::{encode, encode_one};
use sdc::graph::{Signal, SynthDef};

/// One oscillator scaled and routed to bus 0: freq control, shared 0.0
/// constant for phase and bus, operator node for the scale.
fn ping_def() -> SynthDef {
    let mut def = SynthDef::new("ping", &[("freq", 440.0)]).unwrap();
    let freq = def.controls().unwrap();
    let osc = SIN_OSC.ar(&mut def, &[freq]).unwrap();
    let scaled = multiply(&mut def, osc, Signal::Const(0.1)).unwrap();
    let root = out_ar(&mut def, Signal::Const(0.0), scaled).unwrap();
    def.add(&root).unwrap();
    def
}

fn click_def() -> SynthDef {
    let mut def = SynthDef::new("click", &[]).unwrap();
    let noise = WHITE_NOISE.ar(&mut def, &[]).unwrap();
    let root = out_ar(&mut def, Signal::Const(0.0), noise).unwrap();
    def.add(&root).unwrap();
    def
}

fn decoded_ping() -> DecodedFile {
    decode(&encode_one(&ping_def()).unwrap()).unwrap()
}

#[test]
fn snapshot_dump_ping() {
    insta::assert_snapshot!("dump_ping", decoded_ping().to_string());
}

#[test]
fn snapshot_dump_ping_and_click() {
    let bytes = encode(&[ping_def(), click_def()]).unwrap();
    let decoded = decode(&bytes).unwrap();
    insta::assert_snapshot!("dump_ping_and_click", decoded.to_string());
}

#[test]
fn snapshot_dot_ping() {
    insta::assert_snapshot!("dot_ping", emit_dot(&decoded_ping()));
}
