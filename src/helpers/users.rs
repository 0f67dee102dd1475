use diesel::prelude::*;
use diesel::PgConnection;

use crate::errors::ApiError;
use crate::models::User;
use crate::schema::users;

pub fn get_user_by_id(db: &PgConnection, target_user_id: i32) -> Result<User, ApiError> {
    users::table
        .find(target_user_id)
        .first(db)
        .optional()?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
}

pub fn find_user_by_email(db: &PgConnection, email: &str) -> Result<Option<User>, ApiError> {
    let result = users::table
        .filter(users::email.eq(email.to_lowercase()))
        .first(db)
        .optional()?;
    Ok(result)
}

pub fn find_user_by_username(db: &PgConnection, username: &str) -> Result<Option<User>, ApiError> {
    let result = users::table
        .filter(users::username.eq(username.to_lowercase()))
        .first(db)
        .optional()?;
    Ok(result)
}
