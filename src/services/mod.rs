pub mod auth;
pub mod discogs;
pub mod images;
pub mod kollection;
pub mod list;
pub mod lookup;
pub mod music_release;
pub mod now_playing;
pub mod query;
pub mod release_group;
pub mod user_profile;
