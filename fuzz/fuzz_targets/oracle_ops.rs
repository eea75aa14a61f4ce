//! Fuzz harness driving the oracle with arbitrary operation sequences.
//!
//! Each input byte pair is decoded into one operation on a small pool of
//! request ids and principals. The oracle must never panic, and every
//! successful finalization must correspond to exactly one delivery.

#![no_main]
use std::sync::Arc;

use libfuzzer_sys::fuzz_target;
use sevora_core::{
    AggregationSettings, Category, Oracle, OracleError, Principal, RecordingSink, RequestId,
    Thresholds, classify, median,
};

const PRINCIPALS: [&str; 5] = ["ops", "a", "b", "c", ""];

fn principal(byte: u8) -> Principal {
    Principal::new(PRINCIPALS[usize::from(byte) % PRINCIPALS.len()])
}

fuzz_target!(|data: &[u8]| {
    // Pure functions first: the median and classifier on raw values.
    let values: Vec<u16> = data
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect();
    match median(&values) {
        Ok(m) => {
            assert!(values.iter().any(|v| *v <= m));
            assert!(values.iter().any(|v| *v >= m));
            let t = Thresholds::new(20, 100).unwrap();
            let c = classify(m, t);
            assert_eq!(c == Category::Small, m < 20);
        },
        Err(e) => assert_eq!(e, OracleError::NoValues),
    }

    let sink = Arc::new(RecordingSink::new());
    let settings = AggregationSettings::new(2, Thresholds::new(20, 100).unwrap()).unwrap();
    let oracle = Oracle::new(Principal::new("ops"), settings, sink.clone()).unwrap();
    let mut finalized = 0usize;

    for pair in data.chunks_exact(2) {
        let (op, arg) = (pair[0], pair[1]);
        let id = RequestId::new(u64::from(arg % 4));
        let who = principal(arg >> 2);
        match op % 8 {
            0 => oracle.open(id, "subject"),
            1 | 2 => {
                let _ = oracle.submit(id, &who, u16::from(arg) * 3);
            },
            3 => {
                if oracle.finalize(id).is_ok() {
                    finalized += 1;
                }
            },
            4 => oracle.cancel(id),
            5 => {
                let _ = oracle.set_source(&who, principal(arg), arg % 2 == 0);
            },
            6 => {
                let _ = oracle.set_quorum(&who, u32::from(arg % 4));
            },
            _ => {
                let _ = oracle.set_thresholds(&who, u16::from(arg), u16::from(op));
            },
        }
        assert!(!oracle.admin().is_null());
        let t = oracle.settings().thresholds();
        assert!(t.medium() < t.large());
    }

    assert_eq!(sink.delivered().len(), finalized);
});
