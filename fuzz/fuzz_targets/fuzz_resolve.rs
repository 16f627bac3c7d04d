#![no_main]
use libfuzzer_sys::fuzz_target;

use mcp_uae_realty::domain::grammar::SiteGrammar;
use mcp_uae_realty::domain::render::decode_url;
use mcp_uae_realty::domain::resolver::{render_filter, resolve};

fuzz_target!(|data: &[u8]| {
    if let Ok(query) = std::str::from_utf8(data) {
        for grammar in SiteGrammar::builtin() {
            let url = resolve(query, &grammar);
            assert!(url.starts_with(grammar.base()));
            if let Some(filter) = decode_url(&url, &grammar) {
                assert_eq!(render_filter(&filter, &grammar), url);
            }
        }
    }
});
