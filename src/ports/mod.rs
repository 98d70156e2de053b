pub mod discogs;
pub mod google;
pub mod query_translator;
