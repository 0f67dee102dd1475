use std::collections::HashMap;
use std::time::SystemTime;

use actix_web::{get, web, HttpResponse};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::errors::ApiError;
use crate::establish_connection;
use crate::helpers::users::find_user_by_username;
use crate::models::Playlist;
use crate::schema::{playlist_videos, playlists};

#[derive(Deserialize)]
pub struct PlaylistParams {
    username: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistView {
    id: i32,
    name: String,
    description: String,
    video_ids: Vec<i32>,
    created_at: SystemTime,
}

#[get("/{username}")]
pub async fn get_user_playlists(
    params: web::Path<PlaylistParams>,
) -> Result<HttpResponse, ApiError> {
    let db = establish_connection()?;

    let user = find_user_by_username(&db, &params.username)?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let rows: Vec<Playlist> = playlists::table
        .filter(playlists::owner_id.eq(user.id))
        .order(playlists::created_at.desc())
        .load(&db)?;

    let playlist_ids: Vec<i32> = rows.iter().map(|p| p.id).collect();
    let links: Vec<(i32, i32)> = playlist_videos::table
        .filter(playlist_videos::playlist_id.eq_any(&playlist_ids))
        .select((playlist_videos::playlist_id, playlist_videos::video_id))
        .load(&db)?;

    let mut videos_by_playlist: HashMap<i32, Vec<i32>> = HashMap::new();
    for (playlist_id, video_id) in links {
        videos_by_playlist.entry(playlist_id).or_default().push(video_id);
    }

    let views: Vec<PlaylistView> = rows
        .iter()
        .map(|p| PlaylistView {
            id: p.id,
            name: p.name.clone(),
            description: p.description.clone(),
            video_ids: videos_by_playlist.remove(&p.id).unwrap_or_default(),
            created_at: p.created_at,
        })
        .collect();

    Ok(HttpResponse::Ok().json(json!({ "data": views })))
}
