use actix_web::{delete, get, patch, web, HttpResponse};
use diesel::prelude::*;
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::claims::user::UserClaim;
use crate::errors::ApiError;
use crate::establish_connection;
use crate::helpers::votes::Polarity;
use crate::models::{User, Video, VideoDetail, VideoLike, VideoPage, VideoView};
use crate::schema::{
    comment_likes, comments, playlist_videos, subscriptions, users, video_likes, videos,
    watch_history,
};

#[derive(Deserialize)]
pub struct PageQuery {
    page: Option<i64>,
    limit: Option<i64>,
}

fn page_and_limit(page: Option<i64>, limit: Option<i64>) -> (i64, i64) {
    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(20).max(1).min(100);
    (page, limit)
}

#[get("")]
pub async fn list_videos(query: web::Query<PageQuery>) -> Result<HttpResponse, ApiError> {
    let db = establish_connection()?;
    let (page, limit) = page_and_limit(query.page, query.limit);

    let rows: Vec<(Video, User)> = videos::table
        .inner_join(users::table)
        .filter(videos::published.eq(true))
        .order(videos::created_at.desc())
        .offset((page - 1) * limit)
        .limit(limit)
        .load(&db)?;

    let total: i64 = videos::table
        .filter(videos::published.eq(true))
        .count()
        .get_result(&db)?;

    Ok(HttpResponse::Ok().json(VideoPage {
        videos: rows.iter().map(|(v, u)| VideoView::new(v, u)).collect(),
        total,
        page,
        limit,
    }))
}

#[derive(Deserialize)]
pub struct SearchQuery {
    q: Option<String>,
    page: Option<i64>,
    limit: Option<i64>,
}

#[get("/search")]
pub async fn search_videos(query: web::Query<SearchQuery>) -> Result<HttpResponse, ApiError> {
    let db = establish_connection()?;
    let (page, limit) = page_and_limit(query.page, query.limit);
    let pattern = format!("%{}%", query.q.as_deref().unwrap_or(""));

    let rows: Vec<(Video, User)> = videos::table
        .inner_join(users::table)
        .filter(
            videos::published.eq(true).and(
                videos::title
                    .like(&pattern)
                    .or(videos::description.like(&pattern)),
            ),
        )
        .order(videos::created_at.desc())
        .offset((page - 1) * limit)
        .limit(limit)
        .load(&db)?;

    let total: i64 = videos::table
        .filter(
            videos::published.eq(true).and(
                videos::title
                    .like(&pattern)
                    .or(videos::description.like(&pattern)),
            ),
        )
        .count()
        .get_result(&db)?;

    Ok(HttpResponse::Ok().json(VideoPage {
        videos: rows.iter().map(|(v, u)| VideoView::new(v, u)).collect(),
        total,
        page,
        limit,
    }))
}

#[get("/subscribed")]
pub async fn subscribed_videos(
    query: web::Query<PageQuery>,
    user: UserClaim,
) -> Result<HttpResponse, ApiError> {
    let db = establish_connection()?;
    let (page, limit) = page_and_limit(query.page, query.limit);

    let channel_ids: Vec<i32> = subscriptions::table
        .filter(subscriptions::subscriber_id.eq(user.id))
        .select(subscriptions::channel_id)
        .load(&db)?;

    if channel_ids.is_empty() {
        return Ok(HttpResponse::Ok().json(VideoPage {
            videos: Vec::new(),
            total: 0,
            page,
            limit,
        }));
    }

    let rows: Vec<(Video, User)> = videos::table
        .inner_join(users::table)
        .filter(
            videos::published
                .eq(true)
                .and(videos::owner_id.eq_any(&channel_ids)),
        )
        .order(videos::created_at.desc())
        .offset((page - 1) * limit)
        .limit(limit)
        .load(&db)?;

    let total: i64 = videos::table
        .filter(
            videos::published
                .eq(true)
                .and(videos::owner_id.eq_any(&channel_ids)),
        )
        .count()
        .get_result(&db)?;

    Ok(HttpResponse::Ok().json(VideoPage {
        videos: rows.iter().map(|(v, u)| VideoView::new(v, u)).collect(),
        total,
        page,
        limit,
    }))
}

#[derive(Deserialize)]
pub struct RelatedQuery {
    limit: Option<i64>,
}

#[derive(Deserialize)]
pub struct VideoParams {
    video_id: i32,
}

#[get("/related/{video_id}")]
pub async fn related_videos(
    params: web::Path<VideoParams>,
    query: web::Query<RelatedQuery>,
) -> Result<HttpResponse, ApiError> {
    let db = establish_connection()?;
    let limit = query.limit.unwrap_or(10).max(1).min(50);

    let video: Video = videos::table
        .find(params.video_id)
        .first(&db)
        .optional()?
        .ok_or_else(|| ApiError::NotFound("Video not found".to_string()))?;

    let first_word = video
        .title
        .split_whitespace()
        .next()
        .unwrap_or("")
        .to_string();
    let title_pattern = format!("%{}%", first_word);

    let mut candidates = videos::table.inner_join(users::table).into_boxed();
    candidates = candidates.filter(
        videos::published
            .eq(true)
            .and(videos::id.ne(video.id))
            .and(videos::owner_id.ne(video.owner_id)),
    );

    // Same tags or same leading title word, loudest first
    if video.tags.is_empty() {
        candidates = candidates.filter(videos::title.like(title_pattern));
    } else {
        candidates = candidates.filter(
            diesel::dsl::sql::<diesel::sql_types::Bool>("tags && ")
                .bind::<diesel::sql_types::Array<diesel::sql_types::Text>, _>(video.tags.clone())
                .or(videos::title.like(title_pattern)),
        );
    }

    let rows: Vec<(Video, User)> = candidates
        .order(videos::views.desc())
        .limit(limit)
        .load(&db)?;

    let views: Vec<VideoView> = rows.iter().map(|(v, u)| VideoView::new(v, u)).collect();
    Ok(HttpResponse::Ok().json(views))
}

#[get("/{video_id}")]
pub async fn get_video(
    params: web::Path<VideoParams>,
    viewer: Option<UserClaim>,
) -> Result<HttpResponse, ApiError> {
    let db = establish_connection()?;

    let (video, owner): (Video, User) = videos::table
        .inner_join(users::table)
        .filter(videos::id.eq(params.video_id))
        .first(&db)
        .optional()?
        .ok_or_else(|| ApiError::NotFound("Video not found".to_string()))?;

    let likes_count: i64 = video_likes::table
        .filter(
            video_likes::video_id
                .eq(video.id)
                .and(video_likes::like_type.eq("like")),
        )
        .count()
        .get_result(&db)?;

    let dislikes_count: i64 = video_likes::table
        .filter(
            video_likes::video_id
                .eq(video.id)
                .and(video_likes::like_type.eq("dislike")),
        )
        .count()
        .get_result(&db)?;

    let viewer_vote = match &viewer {
        Some(viewer) => {
            let row: Option<VideoLike> = video_likes::table
                .filter(
                    video_likes::video_id
                        .eq(video.id)
                        .and(video_likes::owner_id.eq(viewer.id)),
                )
                .first(&db)
                .optional()?;
            row.and_then(|r| Polarity::from_db(&r.like_type))
        }
        None => None,
    };

    Ok(HttpResponse::Ok().json(VideoDetail {
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
        owner: crate::models::OwnerSummary::from_user(&owner),
        owner_subscribers_count: owner.subscribers_count,
        likes_count,
        dislikes_count,
        liked: viewer_vote == Some(Polarity::Like),
        disliked: viewer_vote == Some(Polarity::Dislike),
    }))
}

#[patch("/increment-views/{video_id}")]
pub async fn increment_views(params: web::Path<VideoParams>) -> Result<HttpResponse, ApiError> {
    let db = establish_connection()?;

    let affected = diesel::update(videos::table.find(params.video_id))
        .set(videos::views.eq(videos::views + 1))
        .execute(&db)?;

    if affected == 0 {
        return Err(ApiError::NotFound("Video not found".to_string()));
    }

    let views: i32 = videos::table
        .find(params.video_id)
        .select(videos::views)
        .first(&db)?;

    Ok(HttpResponse::Ok().json(json!({ "views": views })))
}

#[derive(Deserialize, Validate)]
pub struct UpdateVideoInfo {
    #[validate(length(min = 1, max = 255))]
    title: Option<String>,
    description: Option<String>,
}

#[patch("/{video_id}")]
pub async fn update_video(
    params: web::Path<VideoParams>,
    data: web::Json<UpdateVideoInfo>,
    user: UserClaim,
) -> Result<HttpResponse, ApiError> {
    data.validate()?;

    let db = establish_connection()?;

    let video: Video = videos::table
        .find(params.video_id)
        .first(&db)
        .optional()?
        .ok_or_else(|| ApiError::NotFound("Video not found".to_string()))?;

    if video.owner_id != user.id {
        return Err(ApiError::Forbidden(
            "You can only edit your own videos".to_string(),
        ));
    }

    if let Some(title) = &data.title {
        diesel::update(videos::table.find(video.id))
            .set((videos::title.eq(title), videos::updated_at.eq(diesel::dsl::now)))
            .execute(&db)?;
    }

    if let Some(description) = &data.description {
        diesel::update(videos::table.find(video.id))
            .set((
                videos::description.eq(description),
                videos::updated_at.eq(diesel::dsl::now),
            ))
            .execute(&db)?;
    }

    let (video, owner): (Video, User) = videos::table
        .inner_join(users::table)
        .filter(videos::id.eq(video.id))
        .first(&db)?;

    Ok(HttpResponse::Ok().json(VideoView::new(&video, &owner)))
}

#[delete("/{video_id}")]
pub async fn delete_video(
    params: web::Path<VideoParams>,
    user: UserClaim,
) -> Result<HttpResponse, ApiError> {
    let db = establish_connection()?;

    let video: Video = videos::table
        .find(params.video_id)
        .first(&db)
        .optional()?
        .ok_or_else(|| ApiError::NotFound("Video not found".to_string()))?;

    if video.owner_id != user.id {
        return Err(ApiError::Forbidden(
            "You can only delete your own videos".to_string(),
        ));
    }

    db.transaction::<(), ApiError, _>(|| {
        let comment_ids: Vec<i32> = comments::table
            .filter(comments::video_id.eq(video.id))
            .select(comments::id)
            .load(&db)?;

        diesel::delete(comment_likes::table.filter(comment_likes::comment_id.eq_any(&comment_ids)))
            .execute(&db)?;
        diesel::delete(comments::table.filter(comments::id.eq_any(&comment_ids))).execute(&db)?;
        diesel::delete(video_likes::table.filter(video_likes::video_id.eq(video.id)))
            .execute(&db)?;
        diesel::delete(watch_history::table.filter(watch_history::video_id.eq(video.id)))
            .execute(&db)?;
        diesel::delete(playlist_videos::table.filter(playlist_videos::video_id.eq(video.id)))
            .execute(&db)?;
        diesel::delete(videos::table.find(video.id)).execute(&db)?;
        Ok(())
    })?;

    Ok(HttpResponse::Ok().json(json!({ "message": "Video deleted successfully" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_defaults_and_clamps() {
        assert_eq!(page_and_limit(None, None), (1, 20));
        assert_eq!(page_and_limit(Some(0), Some(0)), (1, 1));
        assert_eq!(page_and_limit(Some(-3), Some(10_000)), (1, 100));
        assert_eq!(page_and_limit(Some(4), Some(25)), (4, 25));
    }
}
