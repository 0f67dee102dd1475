pub mod auth;
pub mod comments;
pub mod likes;
pub mod notifications;
pub mod playlists;
pub mod subscriptions;
pub mod upload;
pub mod users;
pub mod video;
