#![no_main]

use libfuzzer_sys::fuzz_target;
use ocean_saver_client::protocol::ScoreUpdate;
use ocean_saver_client::Scoreboard;
use serde_json::{json, Value};

fuzz_target!(|data: &[u8]| {
    let Ok(payload) = serde_json::from_slice::<Value>(data) else {
        return;
    };
    if let Some(update) = ScoreUpdate::from_payload(&payload) {
        let mut scores = Scoreboard::default();
        scores.apply(&update);
    }

    // Whatever the fuzzed entry looks like, a well-formed sibling still lands.
    let mixed = json!({ "teams": [payload, { "name": "A", "score": 7 }] });
    let update = ScoreUpdate::from_payload(&mixed).unwrap_or_default();
    let mut scores = Scoreboard::default();
    scores.apply(&update);
    assert_eq!(scores.a, 7);
});
