pub mod admin;
pub mod auth;
pub mod discogs;
pub mod groups;
pub mod images;
pub mod lookups;
pub mod music_releases;
pub mod now_playing;
pub mod profile;
pub mod query;
pub mod system;
