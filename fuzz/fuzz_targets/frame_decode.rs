//! Inbound frame parsing must never panic, and every parsed frame must
//! classify on both channels.

#![no_main]

use libfuzzer_sys::fuzz_target;
use tether_core::{AdminClassifier, ChatClassifier, Classifier, EventKind};
use tether_proto::InboundFrame;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(frame) = InboundFrame::parse(text) else {
        return;
    };

    let chat = ChatClassifier.classify(frame.kind());
    let admin = AdminClassifier.classify(frame.kind());
    if chat != EventKind::Unknown {
        assert_eq!(chat, admin);
    }

    let _ = frame.text();
    let _ = frame.confidence();
    let _ = frame.is_typing();

    // Re-encoding may grow past the size limit; only compare what parses.
    if let Ok(reparsed) = InboundFrame::parse(&frame.to_value().to_string()) {
        assert_eq!(reparsed.kind(), frame.kind());
    }
});
