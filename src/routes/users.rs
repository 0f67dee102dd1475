use std::time::{Duration, SystemTime};

use actix_multipart::Multipart;
use actix_web::{delete, get, patch, post, web, HttpResponse};
use bcrypt::{hash, verify};
use diesel::prelude::*;
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

use crate::claims::user::UserClaim;
use crate::errors::ApiError;
use crate::establish_connection;
use crate::helpers::email::{send_or_log, verification_email_html, verification_link};
use crate::helpers::multipart_parsing::parse_multipart;
use crate::helpers::users::{find_user_by_email, find_user_by_username, get_user_by_id};
use crate::models::{NewWatchHistoryEntry, PrivateUser, PublicUser, User, Video, VideoView};
use crate::schema::{
    comment_likes, comments, notifications, playlist_videos, playlists, subscriptions, users,
    video_likes, videos, watch_history,
};
use crate::AppState;

#[get("/current-user")]
pub async fn current_user(user: UserClaim) -> Result<HttpResponse, ApiError> {
    let db = establish_connection()?;
    let user = get_user_by_id(&db, user.id)?;
    Ok(HttpResponse::Ok().json(PrivateUser::from_user(&user)))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfileView {
    #[serde(flatten)]
    user: PublicUser,
    videos_count: i64,
    is_subscribed: bool,
}

#[derive(Deserialize)]
pub struct ProfileParams {
    username: String,
}

#[get("/c/{username}")]
pub async fn get_profile(
    params: web::Path<ProfileParams>,
    viewer: Option<UserClaim>,
) -> Result<HttpResponse, ApiError> {
    let db = establish_connection()?;

    let user = find_user_by_username(&db, &params.username)?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let videos_count: i64 = videos::table
        .filter(videos::owner_id.eq(user.id).and(videos::published.eq(true)))
        .count()
        .get_result(&db)?;

    let is_subscribed = match &viewer {
        Some(viewer) => diesel::select(diesel::dsl::exists(
            subscriptions::table.filter(
                subscriptions::subscriber_id
                    .eq(viewer.id)
                    .and(subscriptions::channel_id.eq(user.id)),
            ),
        ))
        .get_result(&db)?,
        None => false,
    };

    Ok(HttpResponse::Ok().json(ProfileView {
        user: PublicUser::from_user(&user),
        videos_count,
        is_subscribed,
    }))
}

#[get("/c/{username}/videos")]
pub async fn get_user_videos(params: web::Path<ProfileParams>) -> Result<HttpResponse, ApiError> {
    let db = establish_connection()?;

    let user = find_user_by_username(&db, &params.username)?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let rows: Vec<Video> = videos::table
        .filter(videos::owner_id.eq(user.id).and(videos::published.eq(true)))
        .order(videos::created_at.desc())
        .load(&db)?;

    let views: Vec<VideoView> = rows.iter().map(|v| VideoView::new(v, &user)).collect();
    Ok(HttpResponse::Ok().json(views))
}

#[derive(Deserialize, Validate)]
pub struct UpdateAccountInfo {
    #[validate(length(max = 255))]
    fullname: Option<String>,
    about: Option<String>,
    #[validate(email)]
    email: Option<String>,
}

#[patch("/update-account")]
pub async fn update_account(
    data: web::Json<UpdateAccountInfo>,
    user: UserClaim,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    data.validate()?;

    let db = establish_connection()?;
    let current = get_user_by_id(&db, user.id)?;

    if let Some(fullname) = &data.fullname {
        diesel::update(users::table.find(current.id))
            .set(users::fullname.eq(fullname))
            .execute(&db)?;
    }

    if let Some(about) = &data.about {
        diesel::update(users::table.find(current.id))
            .set(users::about.eq(about))
            .execute(&db)?;
    }

    if let Some(email) = &data.email {
        let email = email.to_lowercase();
        if email != current.email {
            if find_user_by_email(&db, &email)?.is_some() {
                return Err(ApiError::Conflict("Email already in use".to_string()));
            }

            // A changed address has to be verified again
            let token: String = thread_rng()
                .sample_iter(&Alphanumeric)
                .take(40)
                .map(char::from)
                .collect();
            let expires = SystemTime::now() + Duration::from_secs(24 * 3600);

            diesel::update(users::table.find(current.id))
                .set((
                    users::email.eq(&email),
                    users::email_verified.eq(false),
                    users::email_verification_token.eq(Some(&token)),
                    users::email_verification_expires.eq(Some(expires)),
                ))
                .execute(&db)?;

            let link = verification_link(&state.config.app_url, current.id, &token);
            send_or_log(
                &state.mailer,
                &email,
                "Verify your email",
                verification_email_html(&link),
                &link,
            );
        }
    }

    let updated = get_user_by_id(&db, current.id)?;
    Ok(HttpResponse::Ok().json(PrivateUser::from_user(&updated)))
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordInfo {
    old_password: String,
    #[validate(length(min = 8))]
    new_password: String,
}

#[post("/change-password")]
pub async fn change_password(
    data: web::Json<ChangePasswordInfo>,
    user: UserClaim,
) -> Result<HttpResponse, ApiError> {
    data.validate()?;

    let db = establish_connection()?;
    let current = get_user_by_id(&db, user.id)?;

    let stored = current
        .password
        .as_ref()
        .ok_or_else(|| ApiError::BadRequest("Account has no password set".to_string()))?;

    let valid = verify(&data.old_password, stored).unwrap_or(false);
    if !valid {
        return Err(ApiError::BadRequest("Invalid old password".to_string()));
    }

    let hashed = hash(&data.new_password, 10)?;
    diesel::update(users::table.find(current.id))
        .set(users::password.eq(Some(hashed)))
        .execute(&db)?;

    Ok(HttpResponse::Ok().json(json!({ "message": "Password changed successfully" })))
}

async fn store_user_image(
    payload: Multipart,
    state: &AppState,
    field: &str,
    folder: &str,
) -> Result<String, ApiError> {
    let media = state.media.as_ref().ok_or_else(|| {
        ApiError::BadRequest("Media storage is not configured on this server".to_string())
    })?;

    let parsed = parse_multipart::<serde_json::Value>(payload).await?;
    let file = parsed
        .files
        .get(field)
        .ok_or_else(|| ApiError::BadRequest(format!("No {} file found", field)))?;

    if !file.mime.starts_with("image/") {
        return Err(ApiError::BadRequest("Expected an image file".to_string()));
    }

    media.store(folder, &file.ext, &file.bytes).await
}

#[patch("/avatar")]
pub async fn update_avatar(
    payload: Multipart,
    user: UserClaim,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let key = store_user_image(payload, &state, "avatar", "avatars").await?;

    let db = establish_connection()?;
    diesel::update(users::table.find(user.id))
        .set(users::avatar.eq(Some(&key)))
        .execute(&db)?;

    let updated = get_user_by_id(&db, user.id)?;
    Ok(HttpResponse::Ok().json(PrivateUser::from_user(&updated)))
}

#[patch("/cover-image")]
pub async fn update_cover_image(
    payload: Multipart,
    user: UserClaim,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let key = store_user_image(payload, &state, "coverImage", "covers").await?;

    let db = establish_connection()?;
    diesel::update(users::table.find(user.id))
        .set(users::cover_image.eq(Some(&key)))
        .execute(&db)?;

    let updated = get_user_by_id(&db, user.id)?;
    Ok(HttpResponse::Ok().json(PrivateUser::from_user(&updated)))
}

#[get("/watch-history")]
pub async fn get_watch_history(user: UserClaim) -> Result<HttpResponse, ApiError> {
    let db = establish_connection()?;

    let rows: Vec<(crate::models::WatchHistoryEntry, (Video, User))> = watch_history::table
        .inner_join(videos::table.inner_join(users::table))
        .filter(watch_history::user_id.eq(user.id))
        .order(watch_history::updated_at.desc())
        .limit(50)
        .load(&db)?;

    let views: Vec<VideoView> = rows
        .iter()
        .map(|(_, (video, owner))| VideoView::new(video, owner))
        .collect();

    Ok(HttpResponse::Ok().json(views))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchHistoryInfo {
    video_id: i32,
}

#[post("/update-watch-history")]
pub async fn update_watch_history(
    data: web::Json<WatchHistoryInfo>,
    user: UserClaim,
) -> Result<HttpResponse, ApiError> {
    let db = establish_connection()?;

    videos::table
        .find(data.video_id)
        .select(videos::id)
        .first::<i32>(&db)
        .optional()?
        .ok_or_else(|| ApiError::NotFound("Video not found".to_string()))?;

    diesel::insert_into(watch_history::table)
        .values(NewWatchHistoryEntry {
            user_id: user.id,
            video_id: data.video_id,
        })
        .on_conflict(diesel::pg::upsert::on_constraint("watch_history_user_video_key"))
        .do_update()
        .set(watch_history::updated_at.eq(diesel::dsl::now))
        .execute(&db)?;

    Ok(HttpResponse::Ok().json(json!({ "message": "Watch history updated" })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteWatchHistoryInfo {
    video_id: Option<i32>,
}

#[delete("/watch-history")]
pub async fn delete_watch_history(
    data: Option<web::Json<DeleteWatchHistoryInfo>>,
    user: UserClaim,
) -> Result<HttpResponse, ApiError> {
    let db = establish_connection()?;

    let target = data.and_then(|d| d.into_inner().video_id);
    match target {
        Some(video_id) => {
            diesel::delete(
                watch_history::table.filter(
                    watch_history::user_id
                        .eq(user.id)
                        .and(watch_history::video_id.eq(video_id)),
                ),
            )
            .execute(&db)?;
        }
        None => {
            diesel::delete(watch_history::table.filter(watch_history::user_id.eq(user.id)))
                .execute(&db)?;
        }
    }

    Ok(HttpResponse::Ok().json(json!({ "message": "Watch history deleted" })))
}

#[delete("/delete-account")]
pub async fn delete_account(user: UserClaim) -> Result<HttpResponse, ApiError> {
    let db = establish_connection()?;

    db.transaction::<(), ApiError, _>(|| {
        // Videos this user owns, with everything hanging off them
        let owned_video_ids: Vec<i32> = videos::table
            .filter(videos::owner_id.eq(user.id))
            .select(videos::id)
            .load(&db)?;

        let video_comment_ids: Vec<i32> = comments::table
            .filter(comments::video_id.eq_any(&owned_video_ids))
            .select(comments::id)
            .load(&db)?;

        diesel::delete(
            comment_likes::table.filter(comment_likes::comment_id.eq_any(&video_comment_ids)),
        )
        .execute(&db)?;
        diesel::delete(comments::table.filter(comments::id.eq_any(&video_comment_ids)))
            .execute(&db)?;
        diesel::delete(video_likes::table.filter(video_likes::video_id.eq_any(&owned_video_ids)))
            .execute(&db)?;
        diesel::delete(
            watch_history::table.filter(watch_history::video_id.eq_any(&owned_video_ids)),
        )
        .execute(&db)?;
        diesel::delete(
            playlist_videos::table.filter(playlist_videos::video_id.eq_any(&owned_video_ids)),
        )
        .execute(&db)?;
        diesel::delete(videos::table.filter(videos::id.eq_any(&owned_video_ids))).execute(&db)?;

        // Comments the user wrote on other videos, and replies to them
        let authored_ids: Vec<i32> = comments::table
            .filter(comments::owner_id.eq(user.id))
            .select(comments::id)
            .load(&db)?;
        let reply_ids: Vec<i32> = comments::table
            .filter(comments::parent_id.eq_any(&authored_ids))
            .select(comments::id)
            .load(&db)?;

        diesel::delete(comment_likes::table.filter(comment_likes::comment_id.eq_any(&reply_ids)))
            .execute(&db)?;
        diesel::delete(comment_likes::table.filter(comment_likes::comment_id.eq_any(&authored_ids)))
            .execute(&db)?;
        diesel::delete(comments::table.filter(comments::id.eq_any(&reply_ids))).execute(&db)?;
        diesel::delete(comments::table.filter(comments::id.eq_any(&authored_ids))).execute(&db)?;

        // Votes the user cast elsewhere; comment counters follow the rows
        let voted: Vec<(i32, String)> = comment_likes::table
            .filter(comment_likes::owner_id.eq(user.id))
            .select((comment_likes::comment_id, comment_likes::like_type))
            .load(&db)?;
        for (target_comment_id, like_type) in &voted {
            if like_type.as_str() == "like" {
                diesel::update(comments::table.find(target_comment_id))
                    .set(comments::likes_count.eq(diesel::dsl::sql::<
                        diesel::sql_types::Integer,
                    >("GREATEST(likes_count - 1, 0)")))
                    .execute(&db)?;
            } else {
                diesel::update(comments::table.find(target_comment_id))
                    .set(comments::dislikes_count.eq(diesel::dsl::sql::<
                        diesel::sql_types::Integer,
                    >("GREATEST(dislikes_count - 1, 0)")))
                    .execute(&db)?;
            }
        }
        diesel::delete(comment_likes::table.filter(comment_likes::owner_id.eq(user.id)))
            .execute(&db)?;
        diesel::delete(video_likes::table.filter(video_likes::owner_id.eq(user.id)))
            .execute(&db)?;

        // Channels the user followed lose one subscriber each
        let followed: Vec<i32> = subscriptions::table
            .filter(subscriptions::subscriber_id.eq(user.id))
            .select(subscriptions::channel_id)
            .load(&db)?;
        for channel_id in &followed {
            diesel::update(users::table.find(channel_id))
                .set(users::subscribers_count.eq(diesel::dsl::sql::<
                    diesel::sql_types::Integer,
                >("GREATEST(subscribers_count - 1, 0)")))
                .execute(&db)?;
        }
        diesel::delete(
            subscriptions::table.filter(
                subscriptions::subscriber_id
                    .eq(user.id)
                    .or(subscriptions::channel_id.eq(user.id)),
            ),
        )
        .execute(&db)?;

        diesel::delete(watch_history::table.filter(watch_history::user_id.eq(user.id)))
            .execute(&db)?;
        diesel::delete(notifications::table.filter(notifications::user_id.eq(user.id)))
            .execute(&db)?;

        let playlist_ids: Vec<i32> = playlists::table
            .filter(playlists::owner_id.eq(user.id))
            .select(playlists::id)
            .load(&db)?;
        diesel::delete(
            playlist_videos::table.filter(playlist_videos::playlist_id.eq_any(&playlist_ids)),
        )
        .execute(&db)?;
        diesel::delete(playlists::table.filter(playlists::id.eq_any(&playlist_ids)))
            .execute(&db)?;

        diesel::delete(users::table.find(user.id)).execute(&db)?;
        Ok(())
    })?;

    Ok(HttpResponse::Ok().json(json!({ "message": "Account deleted successfully" })))
}

#[derive(Deserialize)]
pub struct VerifyEmailParams {
    user_id: i32,
    token: String,
}

#[get("/verify/{user_id}/{token}")]
pub async fn verify_email(params: web::Path<VerifyEmailParams>) -> Result<HttpResponse, ApiError> {
    let db = establish_connection()?;

    let user = get_user_by_id(&db, params.user_id)?;

    let invalid = || ApiError::BadRequest("Invalid or expired token".to_string());

    let stored = user.email_verification_token.as_ref().ok_or_else(invalid)?;
    if stored != &params.token {
        return Err(invalid());
    }

    let expires = user.email_verification_expires.ok_or_else(invalid)?;
    if expires < SystemTime::now() {
        return Err(invalid());
    }

    diesel::update(users::table.find(user.id))
        .set((
            users::email_verified.eq(true),
            users::email_verification_token.eq(None::<String>),
            users::email_verification_expires.eq(None::<SystemTime>),
        ))
        .execute(&db)?;

    Ok(HttpResponse::Ok().json(json!({ "message": "Email verified successfully" })))
}
