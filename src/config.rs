use std::env;

use crate::errors::ApiError;

/// Everything the server reads from the environment, resolved once at
/// startup. `DATABASE_URL` is the only hard requirement; unset optional
/// sections disable the matching capability instead of failing boot.
#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_refresh_secret: String,
    pub access_token_days: u64,
    pub refresh_token_days: u64,
    pub frontend_url: String,
    pub app_url: String,
    pub google: Option<GoogleConfig>,
    pub smtp: Option<SmtpConfig>,
    pub media: Option<MediaConfig>,
}

#[derive(Clone)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub callback_url: String,
}

#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

#[derive(Clone)]
pub struct MediaConfig {
    pub bucket: String,
    pub region: String,
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
}

impl Config {
    pub fn from_env() -> Result<Config, ApiError> {
        Config::from_vars(|key| env::var(key).ok())
    }

    pub fn from_vars<F>(get: F) -> Result<Config, ApiError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = get("DATABASE_URL")
            .ok_or_else(|| ApiError::Internal("DATABASE_URL must be set".to_string()))?;

        let port = get("PORT")
            .and_then(|v| v.parse().ok())
            .unwrap_or(5000);

        let jwt_secret = get("JWT_SECRET").unwrap_or_else(|| {
            log::warn!("JWT_SECRET not set, falling back to the development default");
            "default-secret".to_string()
        });
        let jwt_refresh_secret = get("JWT_REFRESH_SECRET").unwrap_or_else(|| {
            log::warn!("JWT_REFRESH_SECRET not set, falling back to the development default");
            "default-refresh-secret".to_string()
        });

        let access_token_days = get("JWT_EXPIRES_DAYS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(7);
        let refresh_token_days = get("JWT_REFRESH_EXPIRES_DAYS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(30);

        let frontend_url = get("FRONTEND_URL").unwrap_or_else(|| "http://localhost:5173".to_string());
        let app_url = get("APP_URL").unwrap_or_else(|| format!("http://localhost:{}", port));

        let google = match (
            get("GOOGLE_CLIENT_ID"),
            get("GOOGLE_CLIENT_SECRET"),
            get("GOOGLE_CALLBACK_URL"),
        ) {
            (Some(client_id), Some(client_secret), Some(callback_url)) => Some(GoogleConfig {
                client_id,
                client_secret,
                callback_url,
            }),
            _ => None,
        };

        let smtp = match (get("SMTP_HOST"), get("SMTP_USERNAME"), get("SMTP_PASSWORD")) {
            (Some(host), Some(username), Some(password)) => Some(SmtpConfig {
                host,
                port: get("SMTP_PORT").and_then(|v| v.parse().ok()).unwrap_or(587),
                username,
                password,
                from: get("SMTP_FROM").unwrap_or_else(|| "noreply@tube.local".to_string()),
            }),
            _ => None,
        };

        let media = match (
            get("S3_BUCKET"),
            get("S3_ENDPOINT"),
            get("S3_KEY"),
            get("S3_SECRET"),
        ) {
            (Some(bucket), Some(endpoint), Some(access_key), Some(secret_key)) => {
                Some(MediaConfig {
                    bucket,
                    region: get("S3_REGION").unwrap_or_else(|| "us-east-1".to_string()),
                    endpoint,
                    access_key,
                    secret_key,
                })
            }
            _ => None,
        };

        Ok(Config {
            database_url,
            port,
            jwt_secret,
            jwt_refresh_secret,
            access_token_days,
            refresh_token_days,
            frontend_url,
            app_url,
            google,
            smtp,
            media,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn database_url_is_required() {
        let empty = vars(&[]);
        assert!(Config::from_vars(|k| empty.get(k).cloned()).is_err());
    }

    #[test]
    fn optional_sections_degrade_to_none() {
        let minimal = vars(&[("DATABASE_URL", "postgres://localhost/tube")]);
        let config = Config::from_vars(|k| minimal.get(k).cloned()).unwrap();

        assert_eq!(config.port, 5000);
        assert_eq!(config.frontend_url, "http://localhost:5173");
        assert_eq!(config.app_url, "http://localhost:5000");
        assert!(config.google.is_none());
        assert!(config.smtp.is_none());
        assert!(config.media.is_none());
    }

    #[test]
    fn smtp_section_needs_all_credentials() {
        let partial = vars(&[
            ("DATABASE_URL", "postgres://localhost/tube"),
            ("SMTP_HOST", "smtp.example.com"),
            ("SMTP_USERNAME", "mailer"),
        ]);
        let config = Config::from_vars(|k| partial.get(k).cloned()).unwrap();
        assert!(config.smtp.is_none());

        let full = vars(&[
            ("DATABASE_URL", "postgres://localhost/tube"),
            ("SMTP_HOST", "smtp.example.com"),
            ("SMTP_USERNAME", "mailer"),
            ("SMTP_PASSWORD", "hunter2"),
        ]);
        let config = Config::from_vars(|k| full.get(k).cloned()).unwrap();
        let smtp = config.smtp.unwrap();
        assert_eq!(smtp.port, 587);
        assert_eq!(smtp.from, "noreply@tube.local");
    }
}
