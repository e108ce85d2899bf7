use lettre::{
    Message, SmtpTransport, Transport,
    message::{SinglePart, header},
    transport::smtp::authentication::Credentials,
};

use crate::config::MailConfig;

pub type MailError = Box<dyn std::error::Error + Send + Sync>;

/// Send a plain-text email over SMTP (blocking)
///
/// Without `SMTP_SERVER` configured the message is written to the log
/// instead, which is what local development relies on to read codes.
///
/// # Parameters
/// - `config`: sender address and SMTP settings
/// - `to_email`: Recipient's email address
/// - `subject`: Email subject line
/// - `body`: Message text
pub fn send_email(
    config: &MailConfig,
    to_email: &str,
    subject: &str,
    body: &str,
) -> Result<(), MailError> {
    let Some(smtp_server) = config.smtp_server.as_deref() else {
        tracing::info!(to = %to_email, subject = %subject, "SMTP not configured, email body:\n{}", body);
        return Ok(());
    };

    let email = Message::builder()
        .from(config.from_email.parse()?)
        .to(to_email.parse()?)
        .subject(subject)
        .singlepart(
            SinglePart::builder()
                .header(header::ContentType::TEXT_PLAIN)
                .body(body.to_string()),
        )?;

    // STARTTLS: starts unencrypted, upgrades to TLS
    let mut builder = SmtpTransport::starttls_relay(smtp_server)?.port(config.smtp_port);
    if let (Some(username), Some(password)) = (&config.smtp_username, &config.smtp_password) {
        builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
    }
    let mailer = builder.build();

    mailer.send(&email)?;
    tracing::info!(to = %to_email, subject = %subject, "Email sent");

    Ok(())
}
