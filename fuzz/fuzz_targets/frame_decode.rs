//! Fuzz target for `ServerMessage::decode`
//!
//! Feeds arbitrary text to the frame decoder to find:
//! - Panics on malformed JSON or unexpected array shapes
//! - Timestamp values that overflow during conversion
//! - Accepted frames whose re-encoding panics
//!
//! The decoder should NEVER panic. Invalid input returns an error.

#![no_main]

use libfuzzer_sys::fuzz_target;
use murmur_proto::ServerMessage;

fuzz_target!(|text: &str| {
    if let Ok(message) = ServerMessage::decode(text) {
        // Unknown events refuse to encode; everything else must
        if let Ok(encoded) = message.encode() {
            let again = ServerMessage::decode(&encoded);
            assert!(again.is_ok(), "re-encoded frame rejected: {encoded}");
        }
    }
});
