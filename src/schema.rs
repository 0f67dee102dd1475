table! {
    comment_likes (id) {
        id -> Int4,
        comment_id -> Int4,
        owner_id -> Int4,
        like_type -> Varchar,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

table! {
    comments (id) {
        id -> Int4,
        video_id -> Int4,
        owner_id -> Int4,
        content -> Text,
        parent_id -> Nullable<Int4>,
        likes_count -> Int4,
        dislikes_count -> Int4,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

table! {
    notifications (id) {
        id -> Int4,
        user_id -> Int4,
        message -> Text,
        is_read -> Bool,
        kind -> Nullable<Varchar>,
        link -> Nullable<Varchar>,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

table! {
    playlist_videos (id) {
        id -> Int4,
        playlist_id -> Int4,
        video_id -> Int4,
    }
}

table! {
    playlists (id) {
        id -> Int4,
        owner_id -> Int4,
        name -> Varchar,
        description -> Text,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

table! {
    subscriptions (id) {
        id -> Int4,
        subscriber_id -> Int4,
        channel_id -> Int4,
        notifications_enabled -> Bool,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

table! {
    users (id) {
        id -> Int4,
        username -> Varchar,
        email -> Varchar,
        fullname -> Nullable<Varchar>,
        password -> Nullable<Varchar>,
        avatar -> Nullable<Varchar>,
        cover_image -> Nullable<Varchar>,
        about -> Text,
        email_verified -> Bool,
        email_verification_token -> Nullable<Varchar>,
        email_verification_expires -> Nullable<Timestamp>,
        password_reset_token -> Nullable<Varchar>,
        google_id -> Nullable<Varchar>,
        subscribers_count -> Int4,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

table! {
    video_likes (id) {
        id -> Int4,
        video_id -> Int4,
        owner_id -> Int4,
        like_type -> Varchar,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

table! {
    videos (id) {
        id -> Int4,
        owner_id -> Int4,
        title -> Varchar,
        description -> Text,
        video_file -> Varchar,
        thumbnail -> Varchar,
        views -> Int4,
        duration -> Int4,
        published -> Bool,
        tags -> Array<Text>,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

table! {
    watch_history (id) {
        id -> Int4,
        user_id -> Int4,
        video_id -> Int4,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

joinable!(comments -> videos (video_id));
joinable!(comments -> users (owner_id));
joinable!(comment_likes -> comments (comment_id));
joinable!(comment_likes -> users (owner_id));
joinable!(notifications -> users (user_id));
joinable!(playlists -> users (owner_id));
joinable!(playlist_videos -> playlists (playlist_id));
joinable!(playlist_videos -> videos (video_id));
joinable!(video_likes -> videos (video_id));
joinable!(video_likes -> users (owner_id));
joinable!(videos -> users (owner_id));
joinable!(watch_history -> users (user_id));
joinable!(watch_history -> videos (video_id));

allow_tables_to_appear_in_same_query!(
    comment_likes,
    comments,
    notifications,
    playlist_videos,
    playlists,
    subscriptions,
    users,
    video_likes,
    videos,
    watch_history,
);
