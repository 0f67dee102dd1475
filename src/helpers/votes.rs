use diesel::prelude::*;
use diesel::PgConnection;

use crate::errors::ApiError;
use crate::models::{Comment, CommentLike, NewCommentLike, NewVideoLike, VideoLike};
use crate::schema::{comment_likes, comments, video_likes, videos};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Polarity {
    Like,
    Dislike,
}

impl Polarity {
    pub fn as_str(self) -> &'static str {
        match self {
            Polarity::Like => "like",
            Polarity::Dislike => "dislike",
        }
    }

    pub fn opposite(self) -> Polarity {
        match self {
            Polarity::Like => Polarity::Dislike,
            Polarity::Dislike => Polarity::Like,
        }
    }

    pub fn from_db(value: &str) -> Option<Polarity> {
        match value {
            "like" => Some(Polarity::Like),
            "dislike" => Some(Polarity::Dislike),
            _ => None,
        }
    }
}

/// What a tap does given the voter's current vote on the target.
/// These are the only reachable transitions: a vote row either disappears
/// (un-vote), swaps polarity, or appears for the first time.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum VoteAction {
    Remove,
    Replace,
    Insert,
}

pub fn transition(existing: Option<Polarity>, tap: Polarity) -> VoteAction {
    match existing {
        Some(current) if current == tap => VoteAction::Remove,
        Some(_) => VoteAction::Replace,
        None => VoteAction::Insert,
    }
}

pub struct CommentVoteOutcome {
    pub active: bool,
    pub likes_count: i32,
    pub dislikes_count: i32,
}

/// Toggle the caller's vote on a video. Returns whether the vote is active
/// after the call. Video counts are aggregated at read time, so there are
/// no counters to maintain here; the transaction still serializes the
/// check-then-write against racing taps from the same user.
pub fn toggle_video_vote(
    db: &PgConnection,
    target_video_id: i32,
    voter_id: i32,
    tap: Polarity,
) -> Result<bool, ApiError> {
    db.transaction::<bool, ApiError, _>(|| {
        videos::table
            .find(target_video_id)
            .select(videos::id)
            .first::<i32>(db)
            .optional()?
            .ok_or_else(|| ApiError::NotFound("Video not found".to_string()))?;

        let existing: Option<VideoLike> = video_likes::table
            .filter(
                video_likes::video_id
                    .eq(target_video_id)
                    .and(video_likes::owner_id.eq(voter_id)),
            )
            .first(db)
            .optional()?;

        let current = existing
            .as_ref()
            .map(|row| Polarity::from_db(&row.like_type).unwrap_or_else(|| tap.opposite()));

        match (transition(current, tap), existing) {
            (VoteAction::Remove, Some(row)) => {
                diesel::delete(video_likes::table.find(row.id)).execute(db)?;
                Ok(false)
            }
            (VoteAction::Replace, Some(row)) => {
                diesel::delete(video_likes::table.find(row.id)).execute(db)?;
                diesel::insert_into(video_likes::table)
                    .values(NewVideoLike {
                        video_id: target_video_id,
                        owner_id: voter_id,
                        like_type: tap.as_str(),
                    })
                    .execute(db)?;
                Ok(true)
            }
            _ => {
                diesel::insert_into(video_likes::table)
                    .values(NewVideoLike {
                        video_id: target_video_id,
                        owner_id: voter_id,
                        like_type: tap.as_str(),
                    })
                    .execute(db)?;
                Ok(true)
            }
        }
    })
}

/// Toggle the caller's vote on a comment, keeping the comment's
/// denormalized counters in step with the vote rows inside one
/// transaction. Returns the resulting state and counters.
pub fn toggle_comment_vote(
    db: &PgConnection,
    target_comment_id: i32,
    voter_id: i32,
    tap: Polarity,
) -> Result<CommentVoteOutcome, ApiError> {
    db.transaction::<CommentVoteOutcome, ApiError, _>(|| {
        let comment: Comment = comments::table
            .find(target_comment_id)
            .first(db)
            .optional()?
            .ok_or_else(|| ApiError::NotFound("Comment not found".to_string()))?;

        let existing: Option<CommentLike> = comment_likes::table
            .filter(
                comment_likes::comment_id
                    .eq(comment.id)
                    .and(comment_likes::owner_id.eq(voter_id)),
            )
            .first(db)
            .optional()?;

        let current = existing
            .as_ref()
            .map(|row| Polarity::from_db(&row.like_type).unwrap_or_else(|| tap.opposite()));

        let active = match (transition(current, tap), existing) {
            (VoteAction::Remove, Some(row)) => {
                diesel::delete(comment_likes::table.find(row.id)).execute(db)?;
                decrement_comment_counter(db, comment.id, tap)?;
                false
            }
            (VoteAction::Replace, Some(row)) => {
                diesel::delete(comment_likes::table.find(row.id)).execute(db)?;
                decrement_comment_counter(db, comment.id, tap.opposite())?;
                insert_comment_vote(db, comment.id, voter_id, tap)?;
                increment_comment_counter(db, comment.id, tap)?;
                true
            }
            _ => {
                insert_comment_vote(db, comment.id, voter_id, tap)?;
                increment_comment_counter(db, comment.id, tap)?;
                true
            }
        };

        let (likes, dislikes) = comments::table
            .find(comment.id)
            .select((comments::likes_count, comments::dislikes_count))
            .first::<(i32, i32)>(db)?;

        Ok(CommentVoteOutcome {
            active,
            likes_count: likes,
            dislikes_count: dislikes,
        })
    })
}

fn insert_comment_vote(
    db: &PgConnection,
    target_comment_id: i32,
    voter_id: i32,
    polarity: Polarity,
) -> QueryResult<usize> {
    diesel::insert_into(comment_likes::table)
        .values(NewCommentLike {
            comment_id: target_comment_id,
            owner_id: voter_id,
            like_type: polarity.as_str(),
        })
        .execute(db)
}

fn increment_comment_counter(
    db: &PgConnection,
    target_comment_id: i32,
    polarity: Polarity,
) -> QueryResult<usize> {
    match polarity {
        Polarity::Like => diesel::update(comments::table.find(target_comment_id))
            .set(comments::likes_count.eq(comments::likes_count + 1))
            .execute(db),
        Polarity::Dislike => diesel::update(comments::table.find(target_comment_id))
            .set(comments::dislikes_count.eq(comments::dislikes_count + 1))
            .execute(db),
    }
}

// Clamped at zero in SQL so a stray double-decrement can't drive a
// counter negative.
fn decrement_comment_counter(
    db: &PgConnection,
    target_comment_id: i32,
    polarity: Polarity,
) -> QueryResult<usize> {
    match polarity {
        Polarity::Like => diesel::update(comments::table.find(target_comment_id))
            .set(comments::likes_count.eq(diesel::dsl::sql::<diesel::sql_types::Integer>(
                "GREATEST(likes_count - 1, 0)",
            )))
            .execute(db),
        Polarity::Dislike => diesel::update(comments::table.find(target_comment_id))
            .set(comments::dislikes_count.eq(diesel::dsl::sql::<diesel::sql_types::Integer>(
                "GREATEST(dislikes_count - 1, 0)",
            )))
            .execute(db),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Fold taps through the transition table the way the toggles apply
    // them, tracking (state, active-after-tap).
    fn run(taps: &[Polarity]) -> (Option<Polarity>, bool) {
        let mut state: Option<Polarity> = None;
        let mut active = false;
        for &tap in taps {
            match transition(state, tap) {
                VoteAction::Remove => {
                    state = None;
                    active = false;
                }
                VoteAction::Replace | VoteAction::Insert => {
                    state = Some(tap);
                    active = true;
                }
            }
        }
        (state, active)
    }

    #[test]
    fn all_six_transitions() {
        use Polarity::*;
        assert_eq!(transition(None, Like), VoteAction::Insert);
        assert_eq!(transition(None, Dislike), VoteAction::Insert);
        assert_eq!(transition(Some(Like), Like), VoteAction::Remove);
        assert_eq!(transition(Some(Dislike), Dislike), VoteAction::Remove);
        assert_eq!(transition(Some(Like), Dislike), VoteAction::Replace);
        assert_eq!(transition(Some(Dislike), Like), VoteAction::Replace);
    }

    #[test]
    fn double_tap_is_idempotent() {
        use Polarity::*;
        assert_eq!(run(&[Like, Like]), (None, false));
        assert_eq!(run(&[Dislike, Dislike]), (None, false));
    }

    #[test]
    fn switching_polarity_replaces_the_vote() {
        use Polarity::*;
        assert_eq!(run(&[Like, Dislike]), (Some(Dislike), true));
        assert_eq!(run(&[Dislike, Like, Like]), (None, false));
    }

    #[test]
    fn any_tap_sequence_lands_in_a_legal_state() {
        use Polarity::*;
        let taps = [Like, Like, Dislike, Like, Dislike, Dislike, Like];
        for len in 0..=taps.len() {
            let (state, active) = run(&taps[..len]);
            assert_eq!(active, state.is_some());
        }
    }

    #[test]
    fn polarity_round_trips_through_the_db_encoding() {
        assert_eq!(Polarity::from_db("like"), Some(Polarity::Like));
        assert_eq!(Polarity::from_db("dislike"), Some(Polarity::Dislike));
        assert_eq!(Polarity::from_db("upvote"), None);
        assert_eq!(Polarity::Like.opposite(), Polarity::Dislike);
    }
}
