// osc.rs — Message envelopes for the engine's datagram protocol
//
// Thin layer over `rosc`: builds messages and timestamped bundles and
// renders them to datagram payloads. Compiled definitions travel inside
// these envelopes as opaque blobs; see `server.rs` for the command set.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rosc::{OscBundle, OscError, OscMessage, OscPacket, OscTime, OscType};

/// Offset between the protocol's 1900 epoch and the Unix epoch.
const SECONDS_1900_TO_1970: u64 = 2_208_988_800;

/// Message for `address` with the given arguments.
pub fn message(address: &str, args: Vec<OscType>) -> OscMessage {
    OscMessage {
        addr: address.to_string(),
        args,
    }
}

/// Bundle executing as soon as it arrives.
pub fn bundle(messages: Vec<OscMessage>) -> OscBundle {
    bundle_with_tag(immediately(), messages)
}

/// Bundle executing at the given wall-clock time.
pub fn bundle_at(when: SystemTime, messages: Vec<OscMessage>) -> OscBundle {
    bundle_with_tag(time_tag(when), messages)
}

/// Bundle executing `delay` after now.
pub fn bundle_after(delay: Duration, messages: Vec<OscMessage>) -> OscBundle {
    bundle_at(SystemTime::now() + delay, messages)
}

fn bundle_with_tag(timetag: OscTime, messages: Vec<OscMessage>) -> OscBundle {
    OscBundle {
        timetag,
        content: messages.into_iter().map(OscPacket::Message).collect(),
    }
}

/// The reserved "execute immediately" tag.
pub fn immediately() -> OscTime {
    OscTime {
        seconds: 0,
        fractional: 1,
    }
}

/// Wall-clock time as a wire time tag: whole seconds since 1900 plus a
/// 32-bit binary fraction. Times before the Unix epoch clamp to the
/// immediate tag.
pub fn time_tag(when: SystemTime) -> OscTime {
    match when.duration_since(UNIX_EPOCH) {
        Ok(since) => {
            let seconds = since.as_secs().saturating_add(SECONDS_1900_TO_1970);
            let fractional = ((since.subsec_nanos() as u64) << 32) / 1_000_000_000;
            OscTime {
                seconds: seconds as u32,
                fractional: fractional as u32,
            }
        }
        Err(_) => immediately(),
    }
}

/// Datagram payload for a single message.
pub fn encode_message(message: OscMessage) -> Result<Vec<u8>, OscError> {
    rosc::encoder::encode(&OscPacket::Message(message))
}

/// Datagram payload for a bundle.
pub fn encode_bundle(bundle: OscBundle) -> Result<Vec<u8>, OscError> {
    rosc::encoder::encode(&OscPacket::Bundle(bundle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn immediate_tag_is_the_reserved_value() {
        let tag = immediately();
        assert_eq!(tag.seconds, 0);
        assert_eq!(tag.fractional, 1);
    }

    #[test]
    fn time_tags_count_seconds_from_1900() {
        let tag = time_tag(UNIX_EPOCH + Duration::from_secs(10));
        assert_eq!(tag.seconds, 2_208_988_810);
        assert_eq!(tag.fractional, 0);
    }

    #[test]
    fn subsecond_part_becomes_a_binary_fraction() {
        let tag = time_tag(UNIX_EPOCH + Duration::from_millis(1500));
        assert_eq!(tag.seconds, 2_208_988_801);
        assert_eq!(tag.fractional, 1 << 31);
    }

    #[test]
    fn pre_epoch_times_clamp_to_immediate() {
        let tag = time_tag(UNIX_EPOCH - Duration::from_secs(5));
        assert_eq!(tag.seconds, 0);
        assert_eq!(tag.fractional, 1);
    }

    #[test]
    fn bundles_keep_message_order() {
        let b = bundle(vec![
            message("/first", vec![]),
            message("/second", vec![OscType::Int(1)]),
        ]);
        assert_eq!(b.timetag.seconds, 0);
        assert_eq!(b.content.len(), 2);
        let OscPacket::Message(first) = &b.content[0] else {
            panic!("expected a message");
        };
        assert_eq!(first.addr, "/first");
    }

    #[test]
    fn encoded_messages_decode_back() {
        let bytes = encode_message(message("/status", vec![])).unwrap();
        let (rest, packet) = rosc::decoder::decode_udp(&bytes).unwrap();
        assert!(rest.is_empty());
        let OscPacket::Message(msg) = packet else {
            panic!("expected a message");
        };
        assert_eq!(msg.addr, "/status");
        assert!(msg.args.is_empty());
    }

    #[test]
    fn encoded_bundles_carry_their_tag() {
        let when = UNIX_EPOCH + Duration::from_secs(100);
        let bytes = encode_bundle(bundle_at(when, vec![message("/g_new", vec![])])).unwrap();
        let (_, packet) = rosc::decoder::decode_udp(&bytes).unwrap();
        let OscPacket::Bundle(decoded) = packet else {
            panic!("expected a bundle");
        };
        assert_eq!(decoded.timetag.seconds, 2_208_988_900);
        assert_eq!(decoded.content.len(), 1);
    }
}
