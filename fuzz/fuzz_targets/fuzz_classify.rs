//! Fuzz target: `RoleTags::classify`
//!
//! Feeds arbitrary datagram payloads to both roles' classifiers and checks
//! that only the four literal messages are ever recognised, that a node
//! never sees its own tags as peer traffic, and that the two roles agree
//! on who sent a recognised message.
//!
//! cargo fuzz run fuzz_classify

#![no_main]

use crosstrigger::protocol::{Inbound, Message, Role, RoleTags};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let a = RoleTags::for_role(Role::A).classify(data);
    let b = RoleTags::for_role(Role::B).classify(data);

    match Message::parse(data) {
        None => {
            assert_eq!(a, Inbound::Unknown);
            assert_eq!(b, Inbound::Unknown);
        }
        Some(msg) => {
            assert_eq!(msg.as_bytes(), data, "parse must be exact");
            // Exactly one side treats it as its own echo.
            let echoes = [a, b]
                .iter()
                .filter(|i| matches!(i, Inbound::SelfEcho(_)))
                .count();
            assert_eq!(echoes, 1);
        }
    }
});
