pub mod email;
pub mod media;
pub mod multipart_parsing;
pub mod notifications;
pub mod users;
pub mod votes;
