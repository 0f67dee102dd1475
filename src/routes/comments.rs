use std::collections::HashMap;

use actix_web::{delete, get, post, put, web, HttpResponse};
use diesel::prelude::*;
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::claims::user::UserClaim;
use crate::errors::ApiError;
use crate::establish_connection;
use crate::helpers::votes::{toggle_comment_vote, Polarity};
use crate::models::{Comment, CommentView, NewComment, OwnerSummary, User};
use crate::schema::{comment_likes, comments, users, videos};

fn comment_view(
    comment: &Comment,
    owner: &User,
    vote: Option<Polarity>,
    replies: Vec<CommentView>,
) -> CommentView {
    CommentView {
        id: comment.id,
        video_id: comment.video_id,
        parent_id: comment.parent_id,
        content: comment.content.clone(),
        likes_count: comment.likes_count,
        dislikes_count: comment.dislikes_count,
        created_at: comment.created_at,
        updated_at: comment.updated_at,
        owner: OwnerSummary::from_user(owner),
        liked: vote == Some(Polarity::Like),
        disliked: vote == Some(Polarity::Dislike),
        replies,
    }
}

#[derive(Deserialize)]
pub struct CommentParams {
    comment_id: i32,
}

#[post("/toggle-comment-like/{comment_id}")]
pub async fn toggle_comment_like(
    params: web::Path<CommentParams>,
    user: UserClaim,
) -> Result<HttpResponse, ApiError> {
    let db = establish_connection()?;
    let outcome = toggle_comment_vote(&db, params.comment_id, user.id, Polarity::Like)?;

    Ok(HttpResponse::Ok().json(json!({
        "liked": outcome.active,
        "likesCount": outcome.likes_count,
        "dislikesCount": outcome.dislikes_count,
    })))
}

#[post("/toggle-comment-dislike/{comment_id}")]
pub async fn toggle_comment_dislike(
    params: web::Path<CommentParams>,
    user: UserClaim,
) -> Result<HttpResponse, ApiError> {
    let db = establish_connection()?;
    let outcome = toggle_comment_vote(&db, params.comment_id, user.id, Polarity::Dislike)?;

    Ok(HttpResponse::Ok().json(json!({
        "disliked": outcome.active,
        "likesCount": outcome.likes_count,
        "dislikesCount": outcome.dislikes_count,
    })))
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentInfo {
    #[validate(length(min = 1, max = 1000))]
    content: String,
    parent_id: Option<i32>,
}

#[derive(Deserialize)]
pub struct VideoParams {
    video_id: i32,
}

#[post("/video/{video_id}")]
pub async fn create_comment(
    params: web::Path<VideoParams>,
    data: web::Json<CreateCommentInfo>,
    user: UserClaim,
) -> Result<HttpResponse, ApiError> {
    data.validate()?;

    let db = establish_connection()?;

    videos::table
        .find(params.video_id)
        .select(videos::id)
        .first::<i32>(&db)
        .optional()?
        .ok_or_else(|| ApiError::NotFound("Video not found".to_string()))?;

    if let Some(parent_id) = data.parent_id {
        let parent: Comment = comments::table
            .find(parent_id)
            .first(&db)
            .optional()?
            .ok_or_else(|| ApiError::NotFound("Parent comment not found".to_string()))?;

        if parent.video_id != params.video_id {
            return Err(ApiError::BadRequest(
                "Parent comment belongs to a different video".to_string(),
            ));
        }

        // Replies stay one level deep
        if parent.parent_id.is_some() {
            return Err(ApiError::BadRequest(
                "Replies to replies are not supported".to_string(),
            ));
        }
    }

    let comment: Comment = diesel::insert_into(comments::table)
        .values(NewComment {
            video_id: params.video_id,
            owner_id: user.id,
            content: &data.content,
            parent_id: data.parent_id,
        })
        .get_result(&db)?;

    let owner: User = users::table.find(user.id).first(&db)?;

    Ok(HttpResponse::Created().json(json!({
        "data": comment_view(&comment, &owner, None, Vec::new())
    })))
}

#[get("/{video_id}")]
pub async fn get_comments(
    params: web::Path<VideoParams>,
    viewer: Option<UserClaim>,
) -> Result<HttpResponse, ApiError> {
    let db = establish_connection()?;

    let top_level: Vec<(Comment, User)> = comments::table
        .inner_join(users::table)
        .filter(
            comments::video_id
                .eq(params.video_id)
                .and(comments::parent_id.is_null()),
        )
        .order(comments::created_at.desc())
        .load(&db)?;

    let replies: Vec<(Comment, User)> = comments::table
        .inner_join(users::table)
        .filter(
            comments::video_id
                .eq(params.video_id)
                .and(comments::parent_id.is_not_null()),
        )
        .order(comments::created_at.asc())
        .load(&db)?;

    // The viewer's own votes, for every comment on the page
    let mut votes: HashMap<i32, Polarity> = HashMap::new();
    if let Some(viewer) = &viewer {
        let all_ids: Vec<i32> = top_level
            .iter()
            .map(|(c, _)| c.id)
            .chain(replies.iter().map(|(c, _)| c.id))
            .collect();

        let rows: Vec<(i32, String)> = comment_likes::table
            .filter(
                comment_likes::owner_id
                    .eq(viewer.id)
                    .and(comment_likes::comment_id.eq_any(&all_ids)),
            )
            .select((comment_likes::comment_id, comment_likes::like_type))
            .load(&db)?;

        for (comment_id, like_type) in rows {
            if let Some(polarity) = Polarity::from_db(&like_type) {
                votes.insert(comment_id, polarity);
            }
        }
    }

    let mut replies_by_parent: HashMap<i32, Vec<CommentView>> = HashMap::new();
    for (comment, owner) in &replies {
        if let Some(parent_id) = comment.parent_id {
            replies_by_parent.entry(parent_id).or_default().push(
                comment_view(comment, owner, votes.get(&comment.id).copied(), Vec::new()),
            );
        }
    }

    let result: Vec<CommentView> = top_level
        .iter()
        .map(|(comment, owner)| {
            comment_view(
                comment,
                owner,
                votes.get(&comment.id).copied(),
                replies_by_parent.remove(&comment.id).unwrap_or_default(),
            )
        })
        .collect();

    Ok(HttpResponse::Ok().json(json!({ "data": { "comments": result } })))
}

#[derive(Deserialize, Validate)]
pub struct UpdateCommentInfo {
    #[validate(length(min = 1, max = 1000))]
    content: String,
}

#[put("/{comment_id}")]
pub async fn update_comment(
    params: web::Path<CommentParams>,
    data: web::Json<UpdateCommentInfo>,
    user: UserClaim,
) -> Result<HttpResponse, ApiError> {
    data.validate()?;

    let db = establish_connection()?;

    let comment: Comment = comments::table
        .find(params.comment_id)
        .first(&db)
        .optional()?
        .ok_or_else(|| ApiError::NotFound("Comment not found".to_string()))?;

    if comment.owner_id != user.id {
        return Err(ApiError::Forbidden(
            "You can only edit your own comments".to_string(),
        ));
    }

    let updated: Comment = diesel::update(comments::table.find(comment.id))
        .set((
            comments::content.eq(&data.content),
            comments::updated_at.eq(diesel::dsl::now),
        ))
        .get_result(&db)?;

    let owner: User = users::table.find(user.id).first(&db)?;
    Ok(HttpResponse::Ok().json(comment_view(&updated, &owner, None, Vec::new())))
}

#[delete("/{comment_id}")]
pub async fn delete_comment(
    params: web::Path<CommentParams>,
    user: UserClaim,
) -> Result<HttpResponse, ApiError> {
    let db = establish_connection()?;

    let comment: Comment = comments::table
        .find(params.comment_id)
        .first(&db)
        .optional()?
        .ok_or_else(|| ApiError::NotFound("Comment not found".to_string()))?;

    if comment.owner_id != user.id {
        return Err(ApiError::Forbidden(
            "You can only delete your own comments".to_string(),
        ));
    }

    // Replies and votes go with the comment
    db.transaction::<(), ApiError, _>(|| {
        let reply_ids: Vec<i32> = comments::table
            .filter(comments::parent_id.eq(comment.id))
            .select(comments::id)
            .load(&db)?;

        diesel::delete(comment_likes::table.filter(comment_likes::comment_id.eq_any(&reply_ids)))
            .execute(&db)?;
        diesel::delete(
            comment_likes::table.filter(comment_likes::comment_id.eq(comment.id)),
        )
        .execute(&db)?;
        diesel::delete(comments::table.filter(comments::id.eq_any(&reply_ids))).execute(&db)?;
        diesel::delete(comments::table.find(comment.id)).execute(&db)?;
        Ok(())
    })?;

    Ok(HttpResponse::Ok().json(json!({ "message": "Comment deleted successfully" })))
}
