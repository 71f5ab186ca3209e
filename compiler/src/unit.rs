// unit.rs — Unit signatures and the construction contract
//
// Every unit reaches the graph through one path: expand bundle arguments
// into rows (longest bundle wins, shorter bundles cycle, scalars
// broadcast), then walk the unit's parameter signature once per row,
// coercing supplied values and filling declared defaults, and place one
// spec per row in the definition's arena. A single row returns its node
// value directly; several rows return a bundle so the result feeds further
// construction unchanged.
//
// Preconditions: none (pure construction; references are validated when
//   the graph is registered).
// Postconditions: every constructed spec has exactly one input per
//   signature slot, in signature order.
// Failure modes: empty bundles, bundles nested where a single input is
//   required, more arguments than signature slots, omitted arguments
//   without defaults.

use crate::error::GraphError;
use crate::graph::{Input, Rate, Signal, SynthDef, UGenSpec};

/// One named slot in a unit's parameter signature.
#[derive(Debug, Clone, Copy)]
pub struct ArgSpec {
    pub name: &'static str,
    pub default: Option<f32>,
}

impl ArgSpec {
    pub const fn required(name: &'static str) -> ArgSpec {
        ArgSpec {
            name,
            default: None,
        }
    }

    pub const fn with_default(name: &'static str, default: f32) -> ArgSpec {
        ArgSpec {
            name,
            default: Some(default),
        }
    }
}

/// Static description of a unit type: wire name, operator selector,
/// parameter signature, output arity. The calculation rate is chosen per
/// construction call, and every output carries that rate.
#[derive(Debug, Clone, Copy)]
pub struct UnitDef {
    pub name: &'static str,
    pub special_index: u16,
    pub signature: &'static [ArgSpec],
    pub outputs: u16,
}

impl UnitDef {
    /// Construct at audio rate.
    pub fn ar(&self, def: &mut SynthDef, args: &[Signal]) -> Result<Signal, GraphError> {
        self.at(def, Rate::Audio, args)
    }

    /// Construct at control rate.
    pub fn kr(&self, def: &mut SynthDef, args: &[Signal]) -> Result<Signal, GraphError> {
        self.at(def, Rate::Control, args)
    }

    /// Construct at `rate`: expand `args`, then build one spec per row.
    pub fn at(&self, def: &mut SynthDef, rate: Rate, args: &[Signal]) -> Result<Signal, GraphError> {
        if args.len() > self.signature.len() {
            return Err(GraphError::InvalidArgument {
                reason: format!(
                    "{} takes at most {} arguments, got {}",
                    self.name,
                    self.signature.len(),
                    args.len()
                ),
            });
        }
        let rows = expand(args)?;
        let mut built = Vec::with_capacity(rows.len());
        for row in &rows {
            built.push(self.construct_row(def, rate, row)?);
        }
        if built.len() == 1 {
            return Ok(built.remove(0));
        }
        Ok(Signal::Bundle(built))
    }

    fn construct_row(
        &self,
        def: &mut SynthDef,
        rate: Rate,
        row: &[Signal],
    ) -> Result<Signal, GraphError> {
        let mut spec = UGenSpec::new(self.name, rate)
            .with_special_index(self.special_index)
            .with_outputs(vec![rate; self.outputs as usize]);
        for (slot, argspec) in self.signature.iter().enumerate() {
            let input = match row.get(slot) {
                Some(value) => coerce(self.name, argspec, value)?,
                None => match argspec.default {
                    Some(default) => Input::Constant(default),
                    None => {
                        return Err(GraphError::MissingDefault {
                            unit: self.name.to_string(),
                            param: argspec.name.to_string(),
                        })
                    }
                },
            };
            spec.inputs.push(input);
        }
        Ok(Signal::node(def.add_ugen(spec)))
    }
}

// ── Multichannel expansion ──────────────────────────────────────────────

/// Fan `args` out into rows: the row count is the longest bundle's length
/// (one row when no argument is a bundle, including for zero arguments).
/// Row i takes element `i mod len` from each bundle argument; scalar
/// arguments broadcast unchanged into every row.
pub fn expand(args: &[Signal]) -> Result<Vec<Vec<Signal>>, GraphError> {
    let mut rows = 1;
    for arg in args {
        if let Signal::Bundle(items) = arg {
            if items.is_empty() {
                return Err(GraphError::InvalidArgument {
                    reason: "empty bundle argument".to_string(),
                });
            }
            rows = rows.max(items.len());
        }
    }

    let mut out = Vec::with_capacity(rows);
    for i in 0..rows {
        let mut row = Vec::with_capacity(args.len());
        for arg in args {
            row.push(match arg {
                Signal::Bundle(items) => items[i % items.len()].clone(),
                other => other.clone(),
            });
        }
        out.push(row);
    }
    Ok(out)
}

fn coerce(unit: &str, argspec: &ArgSpec, value: &Signal) -> Result<Input, GraphError> {
    match value {
        Signal::Const(v) => Ok(Input::Constant(*v)),
        Signal::Node { id, output } => Ok(Input::Node {
            id: *id,
            output: *output,
        }),
        Signal::Bundle(_) => Err(GraphError::InvalidArgument {
            reason: format!(
                "bundle nested in parameter '{}' of {} where a single input is required",
                argspec.name, unit
            ),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OSC: UnitDef = UnitDef {
        name: "SinOsc",
        special_index: 0,
        signature: &[
            ArgSpec::with_default("freq", 440.0),
            ArgSpec::with_default("phase", 0.0),
        ],
        outputs: 1,
    };

    const ENV: UnitDef = UnitDef {
        name: "Decay2",
        special_index: 0,
        signature: &[
            ArgSpec::required("in"),
            ArgSpec::with_default("attack", 0.01),
            ArgSpec::with_default("decay", 1.0),
        ],
        outputs: 1,
    };

    fn def() -> SynthDef {
        SynthDef::new("t", &[]).unwrap()
    }

    fn inputs_of(def: &SynthDef, value: &Signal) -> Vec<Input> {
        let Signal::Node { id, .. } = value else {
            panic!("expected a node value, got {:?}", value);
        };
        def.spec(*id).unwrap().inputs.clone()
    }

    // ── Expansion ───────────────────────────────────────────────────────

    #[test]
    fn no_arguments_is_one_empty_row() {
        let rows = expand(&[]).unwrap();
        assert_eq!(rows, vec![Vec::<Signal>::new()]);
    }

    #[test]
    fn scalars_broadcast_to_every_row() {
        let rows = expand(&[
            Signal::bundle([Signal::Const(1.0), Signal::Const(2.0), Signal::Const(3.0)]),
            Signal::Const(7.0),
        ])
        .unwrap();
        assert_eq!(rows.len(), 3);
        for (i, row) in rows.iter().enumerate() {
            assert_eq!(row[0], Signal::Const(1.0 + i as f32));
            assert_eq!(row[1], Signal::Const(7.0));
        }
    }

    #[test]
    fn short_bundles_cycle_modulo_length() {
        let rows = expand(&[
            Signal::bundle([Signal::Const(1.0), Signal::Const(2.0)]),
            Signal::bundle([Signal::Const(5.0), Signal::Const(6.0), Signal::Const(7.0)]),
        ])
        .unwrap();
        assert_eq!(
            rows,
            vec![
                vec![Signal::Const(1.0), Signal::Const(5.0)],
                vec![Signal::Const(2.0), Signal::Const(6.0)],
                vec![Signal::Const(1.0), Signal::Const(7.0)],
            ]
        );
    }

    #[test]
    fn empty_bundle_argument_rejected() {
        let err = expand(&[Signal::Bundle(Vec::new())]).unwrap_err();
        assert!(matches!(err, GraphError::InvalidArgument { .. }));
    }

    // ── Signature walk ──────────────────────────────────────────────────

    #[test]
    fn defaults_fill_omitted_arguments() {
        let mut d = def();
        let built = OSC.ar(&mut d, &[]).unwrap();
        assert_eq!(
            inputs_of(&d, &built),
            vec![Input::Constant(440.0), Input::Constant(0.0)]
        );
    }

    #[test]
    fn supplied_values_override_defaults_in_order() {
        let mut d = def();
        let built = OSC.ar(&mut d, &[Signal::Const(220.0)]).unwrap();
        assert_eq!(
            inputs_of(&d, &built),
            vec![Input::Constant(220.0), Input::Constant(0.0)]
        );
    }

    #[test]
    fn missing_required_argument_reports_unit_and_param() {
        let mut d = def();
        let err = ENV.ar(&mut d, &[]).unwrap_err();
        assert_eq!(
            err,
            GraphError::MissingDefault {
                unit: "Decay2".to_string(),
                param: "in".to_string()
            }
        );
    }

    #[test]
    fn excess_arguments_rejected() {
        let mut d = def();
        let args = [
            Signal::Const(440.0),
            Signal::Const(0.0),
            Signal::Const(1.0),
        ];
        let err = OSC.ar(&mut d, &args).unwrap_err();
        assert!(matches!(err, GraphError::InvalidArgument { .. }));
    }

    #[test]
    fn node_arguments_become_references() {
        let mut d = def();
        let source = OSC.ar(&mut d, &[]).unwrap();
        let built = ENV.ar(&mut d, &[source.clone()]).unwrap();
        let Signal::Node { id: source_id, .. } = source else {
            panic!("expected node");
        };
        assert_eq!(
            inputs_of(&d, &built)[0],
            Input::Node {
                id: source_id,
                output: 0
            }
        );
    }

    #[test]
    fn nested_bundle_element_rejected() {
        let mut d = def();
        let nested = Signal::bundle([Signal::bundle([Signal::Const(1.0)])]);
        let err = OSC.ar(&mut d, &[nested]).unwrap_err();
        assert!(matches!(err, GraphError::InvalidArgument { .. }));
    }

    // ── Multichannel construction ───────────────────────────────────────

    #[test]
    fn bundle_argument_builds_one_node_per_row() {
        let mut d = def();
        let built = OSC
            .ar(
                &mut d,
                &[Signal::bundle([Signal::Const(440.0), Signal::Const(660.0)])],
            )
            .unwrap();
        let Signal::Bundle(items) = built else {
            panic!("expected bundle result");
        };
        assert_eq!(items.len(), 2);
        assert_eq!(
            inputs_of(&d, &items[0]),
            vec![Input::Constant(440.0), Input::Constant(0.0)]
        );
        assert_eq!(
            inputs_of(&d, &items[1]),
            vec![Input::Constant(660.0), Input::Constant(0.0)]
        );
    }

    #[test]
    fn multichannel_result_feeds_further_construction() {
        let mut d = def();
        let pair = OSC
            .ar(
                &mut d,
                &[Signal::bundle([Signal::Const(440.0), Signal::Const(660.0)])],
            )
            .unwrap();
        let enveloped = ENV.ar(&mut d, &[pair]).unwrap();
        let Signal::Bundle(items) = enveloped else {
            panic!("expected bundle result");
        };
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn rate_flows_into_spec_and_outputs() {
        let mut d = def();
        let audio = OSC.ar(&mut d, &[]).unwrap();
        let control = OSC.kr(&mut d, &[]).unwrap();
        let Signal::Node { id: a, .. } = audio else {
            panic!("expected node");
        };
        let Signal::Node { id: k, .. } = control else {
            panic!("expected node");
        };
        assert_eq!(d.spec(a).unwrap().rate, Rate::Audio);
        assert_eq!(d.spec(a).unwrap().outputs, vec![Rate::Audio]);
        assert_eq!(d.spec(k).unwrap().rate, Rate::Control);
    }
}
