use tokio::task::JoinHandle;

use super::sendmail::send_email;
use crate::config::MailConfig;

fn confirmation_body(username: &str, confirmation_code: &str) -> String {
    format!(
        "Hello, {username}!\n\n\
         Your confirmation code is:\n\n    {confirmation_code}\n\n\
         Exchange it for an access token at POST /api/v1/auth/token with your username.\n\
         The code stops working once used or when your profile changes.\n"
    )
}

/// Deliver a confirmation code without blocking the caller.
///
/// SMTP runs on the blocking pool. Failures are logged and never reach the
/// signup response; the user can sign up again to get a fresh code.
pub fn send_confirmation_email(
    config: MailConfig,
    to_email: String,
    username: String,
    confirmation_code: String,
) -> JoinHandle<()> {
    tokio::task::spawn_blocking(move || {
        let subject = "Your confirmation code";
        let body = confirmation_body(&username, &confirmation_code);

        if let Err(e) = send_email(&config, &to_email, subject, &body) {
            tracing::error!(to = %to_email, "Failed to send confirmation email: {}", e);
        }
    })
}
