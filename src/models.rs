use std::time::SystemTime;

use serde::Serialize;

use crate::schema::comment_likes;
use crate::schema::comments;
use crate::schema::notifications;
use crate::schema::subscriptions;
use crate::schema::users;
use crate::schema::video_likes;
use crate::schema::videos;
use crate::schema::watch_history;

#[derive(Queryable, Clone)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub fullname: Option<String>,
    pub password: Option<String>,
    pub avatar: Option<String>,
    pub cover_image: Option<String>,
    pub about: String,
    pub email_verified: bool,
    pub email_verification_token: Option<String>,
    pub email_verification_expires: Option<SystemTime>,
    pub password_reset_token: Option<String>,
    pub google_id: Option<String>,
    pub subscribers_count: i32,
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
}

impl User {
    // "fullname" when present, username otherwise
    pub fn display_name(&self) -> &str {
        match &self.fullname {
            Some(v) if !v.is_empty() => v,
            _ => &self.username,
        }
    }
}

#[derive(Insertable)]
#[table_name = "users"]
pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub fullname: Option<&'a str>,
    pub password: Option<&'a str>,
    pub avatar: Option<&'a str>,
    pub google_id: Option<&'a str>,
    pub email_verified: bool,
    pub email_verification_token: Option<&'a str>,
    pub email_verification_expires: Option<SystemTime>,
}

#[derive(Queryable)]
pub struct Video {
    pub id: i32,
    pub owner_id: i32,
    pub title: String,
    pub description: String,
    pub video_file: String,
    pub thumbnail: String,
    pub views: i32,
    pub duration: i32,
    pub published: bool,
    pub tags: Vec<String>,
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
}

#[derive(Insertable)]
#[table_name = "videos"]
pub struct NewVideo<'a> {
    pub owner_id: i32,
    pub title: &'a str,
    pub description: &'a str,
    pub video_file: &'a str,
    pub thumbnail: &'a str,
    pub duration: i32,
    pub published: bool,
    pub tags: Vec<String>,
}

#[derive(Queryable)]
pub struct Comment {
    pub id: i32,
    pub video_id: i32,
    pub owner_id: i32,
    pub content: String,
    pub parent_id: Option<i32>,
    pub likes_count: i32,
    pub dislikes_count: i32,
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
}

#[derive(Insertable)]
#[table_name = "comments"]
pub struct NewComment<'a> {
    pub video_id: i32,
    pub owner_id: i32,
    pub content: &'a str,
    pub parent_id: Option<i32>,
}

#[derive(Queryable)]
pub struct VideoLike {
    pub id: i32,
    pub video_id: i32,
    pub owner_id: i32,
    pub like_type: String,
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
}

#[derive(Insertable)]
#[table_name = "video_likes"]
pub struct NewVideoLike<'a> {
    pub video_id: i32,
    pub owner_id: i32,
    pub like_type: &'a str,
}

#[derive(Queryable)]
pub struct CommentLike {
    pub id: i32,
    pub comment_id: i32,
    pub owner_id: i32,
    pub like_type: String,
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
}

#[derive(Insertable)]
#[table_name = "comment_likes"]
pub struct NewCommentLike<'a> {
    pub comment_id: i32,
    pub owner_id: i32,
    pub like_type: &'a str,
}

#[derive(Queryable)]
pub struct Subscription {
    pub id: i32,
    pub subscriber_id: i32,
    pub channel_id: i32,
    pub notifications_enabled: bool,
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
}

#[derive(Insertable)]
#[table_name = "subscriptions"]
pub struct NewSubscription {
    pub subscriber_id: i32,
    pub channel_id: i32,
    pub notifications_enabled: bool,
}

#[derive(Queryable, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: i32,
    pub user_id: i32,
    pub message: String,
    pub is_read: bool,
    pub kind: Option<String>,
    pub link: Option<String>,
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
}

#[derive(Insertable)]
#[table_name = "notifications"]
pub struct NewNotification<'a> {
    pub user_id: i32,
    pub message: &'a str,
    pub kind: Option<&'a str>,
    pub link: Option<&'a str>,
}

#[derive(Queryable)]
pub struct WatchHistoryEntry {
    pub id: i32,
    pub user_id: i32,
    pub video_id: i32,
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
}

#[derive(Insertable)]
#[table_name = "watch_history"]
pub struct NewWatchHistoryEntry {
    pub user_id: i32,
    pub video_id: i32,
}

#[derive(Queryable)]
pub struct Playlist {
    pub id: i32,
    pub owner_id: i32,
    pub name: String,
    pub description: String,
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
}

// Response shapes. The API speaks camelCase to match what the frontend
// expects; the row structs above stay snake_case.

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerSummary {
    pub id: i32,
    pub username: String,
    pub fullname: Option<String>,
    pub avatar: Option<String>,
}

impl OwnerSummary {
    pub fn from_user(user: &User) -> OwnerSummary {
        OwnerSummary {
            id: user.id,
            username: user.username.clone(),
            fullname: user.fullname.clone(),
            avatar: user.avatar.clone(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: i32,
    pub username: String,
    pub fullname: Option<String>,
    pub avatar: Option<String>,
    pub cover_image: Option<String>,
    pub about: String,
    pub subscribers_count: i32,
    pub created_at: SystemTime,
}

impl PublicUser {
    pub fn from_user(user: &User) -> PublicUser {
        PublicUser {
            id: user.id,
            username: user.username.clone(),
            fullname: user.fullname.clone(),
            avatar: user.avatar.clone(),
            cover_image: user.cover_image.clone(),
            about: user.about.clone(),
            subscribers_count: user.subscribers_count,
            created_at: user.created_at,
        }
    }
}

// The caller's own account, password and token columns stripped.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateUser {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub fullname: Option<String>,
    pub avatar: Option<String>,
    pub cover_image: Option<String>,
    pub about: String,
    pub email_verified: bool,
    pub subscribers_count: i32,
    pub created_at: SystemTime,
}

impl PrivateUser {
    pub fn from_user(user: &User) -> PrivateUser {
        PrivateUser {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            fullname: user.fullname.clone(),
            avatar: user.avatar.clone(),
            cover_image: user.cover_image.clone(),
            about: user.about.clone(),
            email_verified: user.email_verified,
            subscribers_count: user.subscribers_count,
            created_at: user.created_at,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoView {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub video_file: String,
    pub thumbnail: String,
    pub views: i32,
    pub duration: i32,
    pub published: bool,
    pub tags: Vec<String>,
    pub created_at: SystemTime,
    pub owner: OwnerSummary,
}

impl VideoView {
    pub fn new(video: &Video, owner: &User) -> VideoView {
        VideoView {
            id: video.id,
            title: video.title.clone(),
            description: video.description.clone(),
            video_file: video.video_file.clone(),
            thumbnail: video.thumbnail.clone(),
            views: video.views,
            duration: video.duration,
            published: video.published,
            tags: video.tags.clone(),
            created_at: video.created_at,
            owner: OwnerSummary::from_user(owner),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoDetail {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub video_file: String,
    pub thumbnail: String,
    pub views: i32,
    pub duration: i32,
    pub published: bool,
    pub tags: Vec<String>,
    pub created_at: SystemTime,
    pub owner: OwnerSummary,
    pub owner_subscribers_count: i32,
    pub likes_count: i64,
    pub dislikes_count: i64,
    pub liked: bool,
    pub disliked: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoPage {
    pub videos: Vec<VideoView>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: i32,
    pub video_id: i32,
    pub parent_id: Option<i32>,
    pub content: String,
    pub likes_count: i32,
    pub dislikes_count: i32,
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
    pub owner: OwnerSummary,
    pub liked: bool,
    pub disliked: bool,
    pub replies: Vec<CommentView>,
}
