#![no_main]
use libfuzzer_sys::fuzz_target;
use promptgate::detect::EncodingDecoder;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let decoder = EncodingDecoder::new();
        // Should never panic, and must be deterministic on any UTF-8 input
        let a = decoder.decode(s);
        let b = decoder.decode(s);
        assert_eq!(a.decoded, b.decoded, "non-deterministic decode");
        assert_eq!(a.transformations, b.transformations);
        assert_eq!(a.was_encoded, !a.transformations.is_empty());
    }
});
