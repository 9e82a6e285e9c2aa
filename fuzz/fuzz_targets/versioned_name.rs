#![no_main]

use davpub::publisher::versioned_file_name;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: (&str, &str)| {
    let (name, version) = data;
    let out = versioned_file_name(name, "immutant", version);

    if name.starts_with("immutant-") {
        assert!(out.starts_with("immutant-"));
        assert_eq!(out.len(), name.len() + version.len() + 1);
    } else {
        assert_eq!(out, name);
    }
});
