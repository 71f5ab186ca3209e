// sdc — SynthDef Compiler
//
// Library root. Graph construction, binary encoding, and the engine
// messaging helpers live in the modules below.

pub mod catalog;
pub mod decode;
pub mod dot;
pub mod encode;
pub mod error;
pub mod graph;
pub mod id;
pub mod osc;
pub mod server;
pub mod unit;
