pub mod application_user;
pub mod artist;
pub mod country;
pub mod format;
pub mod genre;
pub mod kollection;
pub mod kollection_item;
pub mod label;
pub mod list;
pub mod list_release;
pub mod music_release;
pub mod now_playing;
pub mod packaging;
pub mod store;
pub mod user_invitation;
pub mod user_profile;
