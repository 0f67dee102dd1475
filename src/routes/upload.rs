use actix_multipart::Multipart;
use actix_web::{post, web, HttpResponse};
use serde::Deserialize;
use validator::Validate;

use crate::claims::user::UserClaim;
use crate::errors::ApiError;
use crate::establish_connection;
use crate::helpers::multipart_parsing::parse_multipart;
use crate::helpers::notifications::fan_out_video_upload;
use crate::helpers::users::get_user_by_id;
use crate::models::{NewVideo, Video, VideoView};
use crate::schema::videos;
use diesel::prelude::*;

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UploadVideoData {
    #[validate(length(min = 1, max = 255))]
    title: String,
    description: Option<String>,
    tags: Option<Vec<String>>,
    published: Option<bool>,
    duration: Option<i32>,
}

#[post("/upload")]
pub async fn upload_video(
    payload: Multipart,
    user: UserClaim,
    state: web::Data<crate::AppState>,
) -> Result<HttpResponse, ApiError> {
    let media = state.media.as_ref().ok_or_else(|| {
        ApiError::BadRequest("Media storage is not configured on this server".to_string())
    })?;

    let parsed = parse_multipart::<UploadVideoData>(payload).await?;
    let data = parsed
        .data
        .ok_or_else(|| ApiError::BadRequest("Missing video metadata".to_string()))?;
    data.validate()?;

    // Parts are matched by content type, not field name, so clients can
    // send both files under one field
    let video_part = parsed
        .files
        .values()
        .find(|f| f.mime.starts_with("video/"))
        .ok_or_else(|| ApiError::BadRequest("Video file is required".to_string()))?;
    let thumbnail_part = parsed.files.values().find(|f| f.mime.starts_with("image/"));

    let video_key = media.store("videos", &video_part.ext, &video_part.bytes).await?;
    let thumbnail_key = match thumbnail_part {
        Some(part) => media.store("thumbnails", &part.ext, &part.bytes).await?,
        None => String::new(),
    };

    let db = establish_connection()?;
    let owner = get_user_by_id(&db, user.id)?;

    let video: Video = diesel::insert_into(videos::table)
        .values(NewVideo {
            owner_id: owner.id,
            title: &data.title,
            description: data.description.as_deref().unwrap_or(""),
            video_file: &video_key,
            thumbnail: &thumbnail_key,
            duration: data.duration.unwrap_or(0),
            published: data.published.unwrap_or(true),
            tags: data.tags.clone().unwrap_or_default(),
        })
        .get_result(&db)?;

    if video.published {
        fan_out_video_upload(&db, &owner, &video);
    }

    Ok(HttpResponse::Created().json(VideoView::new(&video, &owner)))
}
