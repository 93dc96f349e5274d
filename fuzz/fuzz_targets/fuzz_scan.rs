#![no_main]
use libfuzzer_sys::fuzz_target;
use promptgate::pipeline::DetectionPipeline;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(pipeline) = DetectionPipeline::with_defaults() {
            // Should never panic; the score must stay in range on any input
            let result = pipeline.scan(s, None);
            assert!((0.0..=1.0).contains(&result.risk_score));
            for det in &result.detections {
                assert!(det.start <= det.end);
            }
        }
    }
});
