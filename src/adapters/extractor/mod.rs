pub mod http_extractor;
