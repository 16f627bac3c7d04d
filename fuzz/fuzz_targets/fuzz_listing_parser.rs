#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(html) = std::str::from_utf8(data) {
        if let Ok(listings) = mcp_uae_realty::adapters::scraper::listing_parser::parse_listings(
            html,
            "https://www.bayut.com",
            "bayut",
            50,
        ) {
            assert!(listings.len() <= 50);
        }
    }
});
