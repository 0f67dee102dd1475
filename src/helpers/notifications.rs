use diesel::prelude::*;
use diesel::PgConnection;

use crate::models::{NewNotification, User, Video};
use crate::schema::{notifications, subscriptions};

pub fn video_upload_message(display_name: &str, title: &str) -> String {
    format!("{} uploaded a new video: {}", display_name, title)
}

pub fn video_link(video_id: i32) -> String {
    format!("/video/{}", video_id)
}

/// Write one notification per subscriber that opted in. Best effort and
/// fire-and-forget: a failed insert is logged and skipped, and nothing
/// here can fail the upload that triggered it. There is no retry or
/// outbox; a notification lost to a transient error stays lost.
pub fn fan_out_video_upload(db: &PgConnection, uploader: &User, video: &Video) {
    let subscriber_ids: Vec<i32> = match subscriptions::table
        .filter(
            subscriptions::channel_id
                .eq(uploader.id)
                .and(subscriptions::notifications_enabled.eq(true)),
        )
        .select(subscriptions::subscriber_id)
        .load(db)
    {
        Ok(v) => v,
        Err(e) => {
            log::error!(
                "couldn't load subscribers of channel {} for fan-out: {}",
                uploader.id,
                e
            );
            return;
        }
    };

    let message = video_upload_message(uploader.display_name(), &video.title);
    let link = video_link(video.id);

    let mut delivered = 0;
    for subscriber_id in &subscriber_ids {
        let result = diesel::insert_into(notifications::table)
            .values(NewNotification {
                user_id: *subscriber_id,
                message: &message,
                kind: Some("video_upload"),
                link: Some(&link),
            })
            .execute(db);

        match result {
            Ok(_) => delivered += 1,
            Err(e) => log::warn!(
                "couldn't notify user {} about video {}: {}",
                subscriber_id,
                video.id,
                e
            ),
        }
    }

    log::info!(
        "video {}: notified {}/{} subscriber(s)",
        video.id,
        delivered,
        subscriber_ids.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;

    fn user(fullname: Option<&str>) -> User {
        User {
            id: 1,
            username: "grace".to_string(),
            email: "grace@example.com".to_string(),
            fullname: fullname.map(|v| v.to_string()),
            password: None,
            avatar: None,
            cover_image: None,
            about: String::new(),
            email_verified: true,
            email_verification_token: None,
            email_verification_expires: None,
            password_reset_token: None,
            google_id: None,
            subscribers_count: 0,
            created_at: SystemTime::now(),
            updated_at: SystemTime::now(),
        }
    }

    #[test]
    fn message_uses_fullname_when_present() {
        let u = user(Some("Grace Hopper"));
        assert_eq!(
            video_upload_message(u.display_name(), "Ep1"),
            "Grace Hopper uploaded a new video: Ep1"
        );
    }

    #[test]
    fn message_falls_back_to_username() {
        let u = user(None);
        assert_eq!(
            video_upload_message(u.display_name(), "Ep1"),
            "grace uploaded a new video: Ep1"
        );

        let u = user(Some(""));
        assert_eq!(u.display_name(), "grace");
    }

    #[test]
    fn link_points_at_the_video() {
        assert_eq!(video_link(42), "/video/42");
    }
}
