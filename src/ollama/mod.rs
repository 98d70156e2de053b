pub mod release_query;
