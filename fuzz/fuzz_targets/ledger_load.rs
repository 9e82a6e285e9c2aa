#![no_main]

use std::fs;

use davpub::ledger::Ledger;
use libfuzzer_sys::fuzz_target;
use tempfile::tempdir;

fuzz_target!(|data: &[u8]| {
    let td = match tempdir() {
        Ok(v) => v,
        Err(_) => return,
    };

    let path = td.path().join("published-artifacts.json");
    if fs::write(&path, data).is_ok()
        && let Ok(ledger) = Ledger::load(&path)
    {
        assert!(ledger.diff(&ledger).is_empty());
    }
});
