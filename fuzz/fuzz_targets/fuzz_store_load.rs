#![no_main]
use libfuzzer_sys::fuzz_target;

use launchgate_engine::state::data::StoreData;

fuzz_target!(|data: &[u8]| {
    if let Ok(store) = serde_json::from_slice::<StoreData>(data) {
        let _ = serde_json::to_string(&store);
        for gate in &store.gates {
            let _ = store.votes_where(|v| v.gate_id == gate.id);
        }
    }
});
