use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

use crate::config::SmtpConfig;
use crate::errors::ApiError;

/// Outbound SMTP capability. Constructed once at startup when the SMTP
/// section of the config is present; absent otherwise, in which case
/// callers go through `send_or_log` and the action link lands in the
/// server log instead of an inbox.
pub struct Mailer {
    transport: SmtpTransport,
    from: String,
}

impl Mailer {
    pub fn from_config(config: &SmtpConfig) -> Mailer {
        let credentials = Credentials::new(config.username.clone(), config.password.clone());
        let transport = SmtpTransport::builder_dangerous(&config.host)
            .port(config.port)
            .credentials(credentials)
            .build();

        Mailer {
            transport,
            from: config.from.clone(),
        }
    }

    pub fn send(&self, to: &str, subject: &str, html: String) -> Result<(), ApiError> {
        let message = Message::builder()
            .from(self
                .from
                .parse()
                .map_err(|e| ApiError::Internal(format!("bad sender address: {}", e)))?)
            .to(to
                .parse()
                .map_err(|e| ApiError::Internal(format!("bad recipient address: {}", e)))?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html)
            .map_err(|e| ApiError::Internal(format!("couldn't build email: {}", e)))?;

        self.transport
            .send(&message)
            .map(|_| ())
            .map_err(|e| ApiError::Internal(format!("couldn't send email: {}", e)))
    }
}

/// Email delivery must never fail the request that triggered it. No
/// transport, or a failed send, degrades to logging the link.
pub fn send_or_log(mailer: &Option<Mailer>, to: &str, subject: &str, html: String, link: &str) {
    match mailer {
        Some(m) => {
            if let Err(e) = m.send(to, subject, html) {
                log::error!("email to {} failed: {}", to, e);
                log::info!("{} link for {}: {}", subject, to, link);
            }
        }
        None => {
            log::warn!("email transport not configured, skipping mail to {}", to);
            log::info!("{} link for {}: {}", subject, to, link);
        }
    }
}

pub fn verification_link(app_url: &str, user_id: i32, token: &str) -> String {
    format!("{}/users/verify/{}/{}", app_url, user_id, token)
}

pub fn password_reset_link(frontend_url: &str, email: &str, token: &str) -> String {
    format!("{}/reset-password?email={}&token={}", frontend_url, email, token)
}

pub fn verification_email_html(link: &str) -> String {
    format!(
        "<h2>Please verify your email</h2>\
         <p>Click the link below to verify your email address:</p>\
         <a href=\"{0}\">{0}</a>",
        link
    )
}

pub fn password_reset_email_html(link: &str) -> String {
    format!(
        "<h2>Password reset</h2>\
         <p>Click the link below to choose a new password. If you didn't \
         request this, you can ignore this email.</p>\
         <a href=\"{0}\">{0}</a>",
        link
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verification_link_matches_the_verify_route() {
        assert_eq!(
            verification_link("http://localhost:5000", 3, "tok"),
            "http://localhost:5000/users/verify/3/tok"
        );
    }

    #[test]
    fn reset_link_points_at_the_frontend() {
        let link = password_reset_link("https://tube.example", "a@b.c", "tok");
        assert_eq!(link, "https://tube.example/reset-password?email=a@b.c&token=tok");
    }

    #[test]
    fn emails_embed_the_link() {
        assert!(verification_email_html("http://x/verify").contains("http://x/verify"));
        assert!(password_reset_email_html("http://x/reset").contains("http://x/reset"));
    }
}
