use actix_web::{get, put, HttpResponse};
use diesel::prelude::*;
use serde_json::json;

use crate::claims::user::UserClaim;
use crate::errors::ApiError;
use crate::establish_connection;
use crate::models::Notification;
use crate::schema::notifications;

#[get("")]
pub async fn list_notifications(user: UserClaim) -> Result<HttpResponse, ApiError> {
    let db = establish_connection()?;

    // Rows accumulate; the cap lives here on the read path
    let rows: Vec<Notification> = notifications::table
        .filter(notifications::user_id.eq(user.id))
        .order(notifications::created_at.desc())
        .limit(50)
        .load(&db)?;

    Ok(HttpResponse::Ok().json(json!({ "data": rows })))
}

#[put("/mark-read")]
pub async fn mark_read(user: UserClaim) -> Result<HttpResponse, ApiError> {
    let db = establish_connection()?;

    diesel::update(
        notifications::table.filter(
            notifications::user_id
                .eq(user.id)
                .and(notifications::is_read.eq(false)),
        ),
    )
    .set(notifications::is_read.eq(true))
    .execute(&db)?;

    Ok(HttpResponse::Ok().json(json!({ "message": "Notifications marked as read" })))
}
