use std::collections::HashMap;
use std::time::{Duration, SystemTime};

use actix_web::http::header::LOCATION;
use actix_web::{get, post, web, HttpResponse};
use bcrypt::{hash, verify};
use diesel::prelude::*;
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

use crate::claims::user::issue_token_pair;
use crate::config::GoogleConfig;
use crate::errors::ApiError;
use crate::establish_connection;
use crate::helpers::email::{
    password_reset_email_html, password_reset_link, send_or_log, verification_email_html,
    verification_link,
};
use crate::helpers::users::find_user_by_email;
use crate::models::{NewUser, User};
use crate::schema::users;
use crate::AppState;

const VERIFICATION_TOKEN_HOURS: u64 = 24;

fn random_token() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(40)
        .map(char::from)
        .collect()
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthUser {
    id: i32,
    username: String,
    email: String,
    fullname: Option<String>,
    avatar: Option<String>,
}

impl AuthUser {
    fn from_user(user: &User) -> AuthUser {
        AuthUser {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            fullname: user.fullname.clone(),
            avatar: user.avatar.clone(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthResponse {
    user: AuthUser,
    access_token: String,
    refresh_token: String,
}

fn auth_response(user: &User, state: &AppState) -> Result<AuthResponse, ApiError> {
    let (access_token, refresh_token) = issue_token_pair(user, &state.config)?;
    Ok(AuthResponse {
        user: AuthUser::from_user(user),
        access_token,
        refresh_token,
    })
}

#[derive(Deserialize, Validate)]
pub struct RegisterInfo {
    #[validate(length(min = 3, max = 100))]
    username: String,
    #[validate(email)]
    email: String,
    #[validate(length(min = 8))]
    password: String,
    fullname: Option<String>,
}

#[post("/register")]
pub async fn register(
    data: web::Json<RegisterInfo>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    data.validate()?;

    let db = establish_connection()?;
    let username = data.username.to_lowercase();
    let email = data.email.to_lowercase();

    let taken = users::table
        .filter(users::username.eq(&username).or(users::email.eq(&email)))
        .select(users::id)
        .first::<i32>(&db)
        .optional()?;
    if taken.is_some() {
        return Err(ApiError::Conflict("User already exists".to_string()));
    }

    let hashed_password = hash(&data.password, 10)?;
    let token = random_token();
    let expires = SystemTime::now() + Duration::from_secs(VERIFICATION_TOKEN_HOURS * 3600);

    let user: User = diesel::insert_into(users::table)
        .values(NewUser {
            username: &username,
            email: &email,
            fullname: data.fullname.as_deref(),
            password: Some(&hashed_password),
            avatar: None,
            google_id: None,
            email_verified: false,
            email_verification_token: Some(&token),
            email_verification_expires: Some(expires),
        })
        .get_result(&db)?;

    let link = verification_link(&state.config.app_url, user.id, &token);
    send_or_log(
        &state.mailer,
        &user.email,
        "Verify your email",
        verification_email_html(&link),
        &link,
    );

    Ok(HttpResponse::Created().json(auth_response(&user, &state)?))
}

#[derive(Deserialize, Validate)]
pub struct LoginInfo {
    #[validate(email)]
    email: String,
    password: String,
}

#[post("/login")]
pub async fn login(
    data: web::Json<LoginInfo>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let db = establish_connection()?;

    let user = find_user_by_email(&db, &data.email)?
        .ok_or_else(|| ApiError::Unauthorized("Invalid credentials".to_string()))?;

    // Accounts created through OAuth have no password to check
    let stored = user
        .password
        .as_ref()
        .ok_or_else(|| ApiError::Unauthorized("Invalid credentials".to_string()))?;

    let valid = verify(&data.password, stored).unwrap_or(false);
    if !valid {
        return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
    }

    if !user.email_verified {
        return Err(ApiError::Unauthorized(
            "Email not verified. Please check your inbox.".to_string(),
        ));
    }

    Ok(HttpResponse::Ok().json(auth_response(&user, &state)?))
}

fn redirect(url: String) -> HttpResponse {
    HttpResponse::Found().header(LOCATION, url).finish()
}

#[get("/google")]
pub async fn google_auth(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    match &state.config.google {
        Some(google) => Ok(redirect(format!(
            "https://accounts.google.com/o/oauth2/v2/auth?client_id={}&redirect_uri={}&response_type=code&scope=openid%20email%20profile",
            google.client_id, google.callback_url
        ))),
        None => Ok(redirect(format!(
            "{}/login?error=google_oauth_not_configured",
            state.config.frontend_url
        ))),
    }
}

#[derive(Deserialize)]
pub struct GoogleCallbackQuery {
    code: Option<String>,
}

#[get("/google/callback")]
pub async fn google_callback(
    query: web::Query<GoogleCallbackQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let frontend = state.config.frontend_url.clone();

    let google = match &state.config.google {
        Some(g) => g.clone(),
        None => {
            return Ok(redirect(format!(
                "{}/login?error=google_oauth_not_configured",
                frontend
            )))
        }
    };

    let code = match &query.code {
        Some(c) => c.clone(),
        None => return Ok(redirect(format!("{}/login?error=google_login_failed", frontend))),
    };

    match google_login(&state, &google, &code).await {
        Ok((access, refresh)) => Ok(redirect(format!(
            "{}/auth/callback?token={}&refreshToken={}",
            frontend, access, refresh
        ))),
        Err(e) => {
            log::warn!("google login failed: {}", e);
            Ok(redirect(format!("{}/login?error=google_login_failed", frontend)))
        }
    }
}

#[derive(Deserialize)]
struct GoogleTokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct GoogleProfile {
    id: String,
    email: String,
    name: Option<String>,
    picture: Option<String>,
}

async fn google_login(
    state: &AppState,
    google: &GoogleConfig,
    code: &str,
) -> Result<(String, String), ApiError> {
    let client = reqwest::blocking::Client::new();

    let mut params = HashMap::new();
    params.insert("code", code);
    params.insert("client_id", google.client_id.as_str());
    params.insert("client_secret", google.client_secret.as_str());
    params.insert("redirect_uri", google.callback_url.as_str());
    params.insert("grant_type", "authorization_code");

    let token: GoogleTokenResponse = client
        .post("https://oauth2.googleapis.com/token")
        .form(&params)
        .send()
        .map_err(|e| ApiError::Internal(format!("google token exchange failed: {}", e)))?
        .json()
        .map_err(|e| ApiError::Internal(format!("google token response unreadable: {}", e)))?;

    let profile: GoogleProfile = client
        .get("https://www.googleapis.com/oauth2/v2/userinfo")
        .bearer_auth(&token.access_token)
        .send()
        .map_err(|e| ApiError::Internal(format!("google profile fetch failed: {}", e)))?
        .json()
        .map_err(|e| ApiError::Internal(format!("google profile unreadable: {}", e)))?;

    let db = establish_connection()?;
    let user = find_or_link_google_user(&db, &profile)?;
    issue_token_pair(&user, &state.config)
}

fn find_or_link_google_user(
    db: &diesel::PgConnection,
    profile: &GoogleProfile,
) -> Result<User, ApiError> {
    let by_google_id: Option<User> = users::table
        .filter(users::google_id.eq(&profile.id))
        .first(db)
        .optional()?;
    if let Some(user) = by_google_id {
        return Ok(user);
    }

    // Same email, registered with a password: link the Google identity
    if let Some(user) = find_user_by_email(db, &profile.email)? {
        let avatar = user.avatar.clone().or_else(|| profile.picture.clone());
        let linked: User = diesel::update(users::table.find(user.id))
            .set((users::google_id.eq(&profile.id), users::avatar.eq(avatar)))
            .get_result(db)?;
        return Ok(linked);
    }

    let base = profile
        .email
        .split('@')
        .next()
        .unwrap_or("user")
        .to_lowercase();
    let username = format!("{}{}", base, thread_rng().gen_range(0..1000));

    let user: User = diesel::insert_into(users::table)
        .values(NewUser {
            username: &username,
            email: &profile.email.to_lowercase(),
            fullname: profile.name.as_deref(),
            password: None,
            avatar: profile.picture.as_deref(),
            google_id: Some(&profile.id),
            // The provider vouches for the address
            email_verified: true,
            email_verification_token: None,
            email_verification_expires: None,
        })
        .get_result(db)?;

    Ok(user)
}

#[derive(Deserialize, Validate)]
pub struct ForgotPasswordInfo {
    #[validate(email)]
    email: String,
}

#[post("/forgot-password")]
pub async fn forgot_password(
    data: web::Json<ForgotPasswordInfo>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    data.validate()?;

    let db = establish_connection()?;

    // Same answer whether or not the account exists
    let done = HttpResponse::Ok().json(json!({
        "message": "If that account exists, a reset link has been sent"
    }));

    let user = match find_user_by_email(&db, &data.email)? {
        Some(v) => v,
        None => return Ok(done),
    };

    let token = random_token();
    let token_hash = hash(&token, 10)?;

    diesel::update(users::table.find(user.id))
        .set(users::password_reset_token.eq(&token_hash))
        .execute(&db)?;

    let link = password_reset_link(&state.config.frontend_url, &user.email, &token);
    send_or_log(
        &state.mailer,
        &user.email,
        "Reset your password",
        password_reset_email_html(&link),
        &link,
    );

    Ok(done)
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordInfo {
    #[validate(email)]
    email: String,
    token: String,
    #[validate(length(min = 8))]
    new_password: String,
}

#[post("/reset-password")]
pub async fn reset_password(data: web::Json<ResetPasswordInfo>) -> Result<HttpResponse, ApiError> {
    data.validate()?;

    let db = establish_connection()?;

    let invalid = || ApiError::BadRequest("Invalid or expired token".to_string());

    let user = find_user_by_email(&db, &data.email)?.ok_or_else(invalid)?;
    let stored = user.password_reset_token.as_ref().ok_or_else(invalid)?;

    let valid = verify(&data.token, stored).unwrap_or(false);
    if !valid {
        return Err(invalid());
    }

    let hashed_password = hash(&data.new_password, 10)?;

    diesel::update(users::table.find(user.id))
        .set((
            users::password.eq(Some(hashed_password)),
            users::password_reset_token.eq(None::<String>),
        ))
        .execute(&db)?;

    Ok(HttpResponse::Ok().json(json!({ "message": "Password reset successfully" })))
}

#[derive(Deserialize, Validate)]
pub struct ResendVerificationInfo {
    #[validate(email)]
    email: String,
}

#[post("/resend-verification")]
pub async fn resend_verification(
    data: web::Json<ResendVerificationInfo>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    data.validate()?;

    let db = establish_connection()?;

    let done = HttpResponse::Ok().json(json!({ "message": "Verification email sent" }));

    let user = match find_user_by_email(&db, &data.email)? {
        Some(v) if !v.email_verified => v,
        _ => return Ok(done),
    };

    let token = random_token();
    let expires = SystemTime::now() + Duration::from_secs(VERIFICATION_TOKEN_HOURS * 3600);

    diesel::update(users::table.find(user.id))
        .set((
            users::email_verification_token.eq(Some(&token)),
            users::email_verification_expires.eq(Some(expires)),
        ))
        .execute(&db)?;

    let link = verification_link(&state.config.app_url, user.id, &token);
    send_or_log(
        &state.mailer,
        &user.email,
        "Verify your email",
        verification_email_html(&link),
        &link,
    );

    Ok(done)
}
