#![no_main]

use adlift::dataset::CampaignTable;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes must load or fail with an error, never panic
    if let Ok(table) = CampaignTable::from_reader(data) {
        for record in table.records() {
            assert!(record.clicks <= record.impressions);
            if let Some(ctr) = record.ctr() {
                assert!((0.0..=1.0).contains(&ctr));
            }
        }
    }
});
