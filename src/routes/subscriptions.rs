use actix_web::{get, post, web, HttpResponse};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::claims::user::UserClaim;
use crate::errors::ApiError;
use crate::establish_connection;
use crate::models::{NewSubscription, OwnerSummary, PublicUser, Subscription, User};
use crate::schema::{subscriptions, users};

#[derive(Deserialize)]
pub struct ChannelParams {
    channel_id: i32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SubscriptionToggle {
    subscribed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    notifications_enabled: Option<bool>,
}

#[post("/toggle/{channel_id}")]
pub async fn toggle_subscription(
    params: web::Path<ChannelParams>,
    user: UserClaim,
) -> Result<HttpResponse, ApiError> {
    if params.channel_id == user.id {
        return Err(ApiError::BadRequest(
            "Cannot subscribe to yourself".to_string(),
        ));
    }

    let db = establish_connection()?;

    let result = db.transaction::<SubscriptionToggle, ApiError, _>(|| {
        users::table
            .find(params.channel_id)
            .select(users::id)
            .first::<i32>(&db)
            .optional()?
            .ok_or_else(|| ApiError::NotFound("Channel not found".to_string()))?;

        let existing: Option<Subscription> = subscriptions::table
            .filter(
                subscriptions::subscriber_id
                    .eq(user.id)
                    .and(subscriptions::channel_id.eq(params.channel_id)),
            )
            .first(&db)
            .optional()?;

        match existing {
            Some(subscription) => {
                diesel::delete(subscriptions::table.find(subscription.id)).execute(&db)?;
                diesel::update(users::table.find(params.channel_id))
                    .set(users::subscribers_count.eq(diesel::dsl::sql::<
                        diesel::sql_types::Integer,
                    >("GREATEST(subscribers_count - 1, 0)")))
                    .execute(&db)?;

                Ok(SubscriptionToggle {
                    subscribed: false,
                    notifications_enabled: None,
                })
            }
            None => {
                diesel::insert_into(subscriptions::table)
                    .values(NewSubscription {
                        subscriber_id: user.id,
                        channel_id: params.channel_id,
                        notifications_enabled: true,
                    })
                    .execute(&db)?;
                diesel::update(users::table.find(params.channel_id))
                    .set(users::subscribers_count.eq(users::subscribers_count + 1))
                    .execute(&db)?;

                Ok(SubscriptionToggle {
                    subscribed: true,
                    notifications_enabled: Some(true),
                })
            }
        }
    })?;

    Ok(HttpResponse::Ok().json(result))
}

#[post("/toggle-notifications/{channel_id}")]
pub async fn toggle_notifications(
    params: web::Path<ChannelParams>,
    user: UserClaim,
) -> Result<HttpResponse, ApiError> {
    let db = establish_connection()?;

    let enabled = db.transaction::<bool, ApiError, _>(|| {
        let subscription: Subscription = subscriptions::table
            .filter(
                subscriptions::subscriber_id
                    .eq(user.id)
                    .and(subscriptions::channel_id.eq(params.channel_id)),
            )
            .first(&db)
            .optional()?
            .ok_or_else(|| ApiError::NotFound("Not subscribed to this channel".to_string()))?;

        let enabled = !subscription.notifications_enabled;
        diesel::update(subscriptions::table.find(subscription.id))
            .set((
                subscriptions::notifications_enabled.eq(enabled),
                subscriptions::updated_at.eq(diesel::dsl::now),
            ))
            .execute(&db)?;

        Ok(enabled)
    })?;

    Ok(HttpResponse::Ok().json(json!({ "notificationsEnabled": enabled })))
}

#[get("/subscribed")]
pub async fn subscribed_channels(user: UserClaim) -> Result<HttpResponse, ApiError> {
    let db = establish_connection()?;

    let rows: Vec<(Subscription, User)> = subscriptions::table
        .inner_join(users::table.on(users::id.eq(subscriptions::channel_id)))
        .filter(subscriptions::subscriber_id.eq(user.id))
        .order(subscriptions::created_at.desc())
        .load(&db)?;

    let channels: Vec<PublicUser> = rows
        .iter()
        .map(|(_, channel)| PublicUser::from_user(channel))
        .collect();

    Ok(HttpResponse::Ok().json(json!({ "data": channels })))
}

#[get("/subscribers/{channel_id}")]
pub async fn channel_subscribers(
    params: web::Path<ChannelParams>,
) -> Result<HttpResponse, ApiError> {
    let db = establish_connection()?;

    let rows: Vec<(Subscription, User)> = subscriptions::table
        .inner_join(users::table.on(users::id.eq(subscriptions::subscriber_id)))
        .filter(subscriptions::channel_id.eq(params.channel_id))
        .order(subscriptions::created_at.desc())
        .load(&db)?;

    let subscribers: Vec<OwnerSummary> = rows
        .iter()
        .map(|(_, subscriber)| OwnerSummary::from_user(subscriber))
        .collect();

    Ok(HttpResponse::Ok().json(json!({ "data": subscribers })))
}
