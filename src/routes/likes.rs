use actix_web::{get, post, web, HttpResponse};
use diesel::prelude::*;
use serde::Deserialize;
use serde_json::json;

use crate::claims::user::UserClaim;
use crate::errors::ApiError;
use crate::establish_connection;
use crate::helpers::votes::{toggle_video_vote, Polarity};
use crate::models::{User, Video, VideoLike, VideoView};
use crate::schema::{users, video_likes, videos};

#[derive(Deserialize)]
pub struct VideoParams {
    video_id: i32,
}

#[post("/toggle-video-like/{video_id}")]
pub async fn toggle_video_like(
    params: web::Path<VideoParams>,
    user: UserClaim,
) -> Result<HttpResponse, ApiError> {
    let db = establish_connection()?;
    let active = toggle_video_vote(&db, params.video_id, user.id, Polarity::Like)?;
    Ok(HttpResponse::Ok().json(json!({ "liked": active })))
}

#[post("/toggle-video-dislike/{video_id}")]
pub async fn toggle_video_dislike(
    params: web::Path<VideoParams>,
    user: UserClaim,
) -> Result<HttpResponse, ApiError> {
    let db = establish_connection()?;
    let active = toggle_video_vote(&db, params.video_id, user.id, Polarity::Dislike)?;
    Ok(HttpResponse::Ok().json(json!({ "disliked": active })))
}

fn voted_videos(user_id: i32, polarity: Polarity) -> Result<Vec<VideoView>, ApiError> {
    let db = establish_connection()?;

    let rows: Vec<(VideoLike, (Video, User))> = video_likes::table
        .inner_join(videos::table.inner_join(users::table))
        .filter(
            video_likes::owner_id
                .eq(user_id)
                .and(video_likes::like_type.eq(polarity.as_str())),
        )
        .order(video_likes::created_at.desc())
        .load(&db)?;

    Ok(rows
        .iter()
        .map(|(_, (video, owner))| VideoView::new(video, owner))
        .collect())
}

#[get("/liked-videos")]
pub async fn liked_videos(user: UserClaim) -> Result<HttpResponse, ApiError> {
    let videos = voted_videos(user.id, Polarity::Like)?;
    Ok(HttpResponse::Ok().json(json!({ "likedVideos": videos })))
}

#[get("/disliked-videos")]
pub async fn disliked_videos(user: UserClaim) -> Result<HttpResponse, ApiError> {
    let videos = voted_videos(user.id, Polarity::Dislike)?;
    Ok(HttpResponse::Ok().json(json!({ "dislikedVideos": videos })))
}
