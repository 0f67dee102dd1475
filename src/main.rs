#[macro_use]
extern crate diesel;
extern crate dotenv;

use actix_cors::Cors;
use actix_web::http::header;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use diesel::pg::PgConnection;
use diesel::prelude::*;

use crate::config::Config;
use crate::errors::ApiError;
use crate::helpers::email::Mailer;
use crate::helpers::media::MediaStore;
use crate::middleware::auth::CheckLogin;

mod claims;
mod config;
mod errors;
mod helpers;
mod middleware;
mod models;
mod routes;
mod schema;

pub fn establish_connection() -> Result<PgConnection, ApiError> {
    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| ApiError::Internal("DATABASE_URL must be set".to_string()))?;
    PgConnection::establish(&database_url)
        .map_err(|e| ApiError::Internal(format!("Error connecting to the database: {}", e)))
}

pub struct AppState {
    pub config: Config,
    pub mailer: Option<Mailer>,
    pub media: Option<MediaStore>,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = match Config::from_env() {
        Ok(v) => v,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };

    let mailer = config.smtp.as_ref().map(Mailer::from_config);
    if mailer.is_none() {
        log::warn!("SMTP not configured; verification and reset links will only be logged");
    }

    let media = match &config.media {
        Some(media_config) => match MediaStore::from_config(media_config) {
            Ok(v) => Some(v),
            Err(e) => {
                log::error!("media storage disabled: {}", e);
                None
            }
        },
        None => {
            log::warn!("media storage not configured; uploads are disabled");
            None
        }
    };

    let bind_addr = format!("0.0.0.0:{}", config.port);
    let state = web::Data::new(AppState {
        config,
        mailer,
        media,
    });

    log::info!("listening on {}", bind_addr);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&state.config.frontend_url)
            .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
            .allowed_headers(vec![header::CONTENT_TYPE, header::AUTHORIZATION])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .app_data(state.clone())
            .service(
                web::scope("/auth")
                    .service(routes::auth::register)
                    .service(routes::auth::login)
                    .service(routes::auth::google_auth)
                    .service(routes::auth::google_callback)
                    .service(routes::auth::forgot_password)
                    .service(routes::auth::reset_password)
                    .service(routes::auth::resend_verification),
            )
            .service(
                web::scope("/users")
                    .service(routes::users::current_user)
                    .service(routes::users::update_account)
                    .service(routes::users::change_password)
                    .service(routes::users::update_avatar)
                    .service(routes::users::update_cover_image)
                    .service(routes::users::get_watch_history)
                    .service(routes::users::update_watch_history)
                    .service(routes::users::delete_watch_history)
                    .service(routes::users::delete_account)
                    .service(routes::users::verify_email)
                    .service(routes::users::get_user_videos)
                    .service(routes::users::get_profile),
            )
            .service(
                web::scope("/videos")
                    .service(routes::upload::upload_video)
                    .service(routes::video::search_videos)
                    .service(routes::video::subscribed_videos)
                    .service(routes::video::related_videos)
                    .service(routes::video::increment_views)
                    .service(routes::video::list_videos)
                    .service(routes::video::get_video)
                    .service(routes::video::update_video)
                    .service(routes::video::delete_video),
            )
            .service(
                web::scope("/comments")
                    .service(routes::comments::toggle_comment_like)
                    .service(routes::comments::toggle_comment_dislike)
                    .service(routes::comments::create_comment)
                    .service(routes::comments::update_comment)
                    .service(routes::comments::delete_comment)
                    .service(routes::comments::get_comments),
            )
            .service(
                web::scope("/likes")
                    .wrap(CheckLogin)
                    .service(routes::likes::toggle_video_like)
                    .service(routes::likes::toggle_video_dislike)
                    .service(routes::likes::liked_videos)
                    .service(routes::likes::disliked_videos),
            )
            .service(
                web::scope("/subscription")
                    .service(routes::subscriptions::toggle_subscription)
                    .service(routes::subscriptions::toggle_notifications)
                    .service(routes::subscriptions::subscribed_channels)
                    .service(routes::subscriptions::channel_subscribers),
            )
            .service(
                web::scope("/notifications")
                    .wrap(CheckLogin)
                    .service(routes::notifications::list_notifications)
                    .service(routes::notifications::mark_read),
            )
            .service(web::scope("/playlist").service(routes::playlists::get_user_playlists))
    })
    .bind(bind_addr)?
    .run()
    .await
}
