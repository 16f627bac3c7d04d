#![no_main]
use libfuzzer_sys::fuzz_target;

use mcp_uae_realty::domain::search_filter::PartialSearchFilter;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let partial = PartialSearchFilter::from_model_output(text);
        let _ = partial.into_filter();
    }
});
