//! Email service for transactional notifications.
//!
//! Uses SMTP via lettre. Bodies are plain text; the platform's mail is
//! notification-grade (OTPs, purchase receipts, moderation notices), not
//! marketing.

use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::header::ContentType,
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::EmailConfig;

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),
}

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay parameters are invalid.
    pub fn new(config: &EmailConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
        })
    }

    /// Welcome email after registration.
    ///
    /// # Errors
    ///
    /// Returns error if the message fails to build or send.
    pub async fn send_welcome(&self, to: &str, name: &str) -> Result<(), EmailError> {
        self.send(to, "Welcome to Tunila", &welcome_body(name)).await
    }

    /// Account verification OTP.
    ///
    /// # Errors
    ///
    /// Returns error if the message fails to build or send.
    pub async fn send_verify_otp(&self, to: &str, otp: &str) -> Result<(), EmailError> {
        self.send(to, "Your Tunila verification code", &verify_otp_body(otp))
            .await
    }

    /// Password reset OTP.
    ///
    /// # Errors
    ///
    /// Returns error if the message fails to build or send.
    pub async fn send_reset_otp(&self, to: &str, otp: &str) -> Result<(), EmailError> {
        self.send(to, "Your Tunila password reset code", &reset_otp_body(otp))
            .await
    }

    /// Account deactivation notice.
    ///
    /// # Errors
    ///
    /// Returns error if the message fails to build or send.
    pub async fn send_deactivation_notice(&self, to: &str, name: &str) -> Result<(), EmailError> {
        self.send(
            to,
            "Your Tunila account has been deactivated",
            &deactivation_body(name),
        )
        .await
    }

    /// Account reactivation notice.
    ///
    /// # Errors
    ///
    /// Returns error if the message fails to build or send.
    pub async fn send_reactivation_notice(&self, to: &str, name: &str) -> Result<(), EmailError> {
        self.send(
            to,
            "Your Tunila account is active again",
            &reactivation_body(name),
        )
        .await
    }

    /// Purchase confirmation to the buyer.
    ///
    /// # Errors
    ///
    /// Returns error if the message fails to build or send.
    pub async fn send_purchase_confirmation(
        &self,
        to: &str,
        buyer_name: &str,
        item_name: &str,
        quantity: i32,
        amount_paisa: i64,
    ) -> Result<(), EmailError> {
        self.send(
            to,
            "Your Tunila order is confirmed",
            &purchase_body(buyer_name, item_name, quantity, amount_paisa),
        )
        .await
    }

    /// Sale notice to the artist.
    ///
    /// # Errors
    ///
    /// Returns error if the message fails to build or send.
    pub async fn send_sale_notice(
        &self,
        to: &str,
        artist_name: &str,
        item_name: &str,
        quantity: i32,
    ) -> Result<(), EmailError> {
        self.send(
            to,
            "You made a sale on Tunila",
            &sale_body(artist_name, item_name, quantity),
        )
        .await
    }

    /// Admin reply to a support message.
    ///
    /// # Errors
    ///
    /// Returns error if the message fails to build or send.
    pub async fn send_contact_reply(
        &self,
        to: &str,
        name: &str,
        subject: &str,
        original_message: &str,
        reply: &str,
    ) -> Result<(), EmailError> {
        self.send(
            to,
            &format!("Re: {subject}"),
            &contact_reply_body(name, original_message, reply),
        )
        .await
    }

    /// Build and send a plain-text message.
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())?;

        self.mailer.send(email).await?;
        Ok(())
    }
}

// =============================================================================
// Bodies
// =============================================================================

fn welcome_body(name: &str) -> String {
    format!(
        "Hi {name},\n\n\
         Welcome to Tunila. Your account is ready - upload a song, build a\n\
         playlist, or browse the merch store.\n\n\
         The Tunila team"
    )
}

fn verify_otp_body(otp: &str) -> String {
    format!(
        "Your Tunila verification code is: {otp}\n\n\
         The code is valid for 24 hours. If you didn't request it, you can\n\
         ignore this email."
    )
}

fn reset_otp_body(otp: &str) -> String {
    format!(
        "Your Tunila password reset code is: {otp}\n\n\
         The code is valid for 15 minutes. If you didn't request a reset,\n\
         your password is unchanged and you can ignore this email."
    )
}

fn deactivation_body(name: &str) -> String {
    format!(
        "Hi {name},\n\n\
         Your Tunila account has been deactivated by a moderator. If you\n\
         believe this is a mistake, reply to this email or use the contact\n\
         form on the site.\n\n\
         The Tunila team"
    )
}

fn reactivation_body(name: &str) -> String {
    format!(
        "Hi {name},\n\n\
         Your Tunila account is active again - you can log in as usual.\n\n\
         The Tunila team"
    )
}

fn purchase_body(buyer_name: &str, item_name: &str, quantity: i32, amount_paisa: i64) -> String {
    let rupees = amount_paisa / 100;
    let paisa = amount_paisa % 100;
    format!(
        "Hi {buyer_name},\n\n\
         Your payment went through. Order summary:\n\n\
         {quantity} x {item_name}\n\
         Total paid: Rs {rupees}.{paisa:02}\n\n\
         The artist has been notified and will be in touch about delivery.\n\n\
         The Tunila team"
    )
}

fn sale_body(artist_name: &str, item_name: &str, quantity: i32) -> String {
    format!(
        "Hi {artist_name},\n\n\
         Good news - someone just bought {quantity} x {item_name} from your\n\
         store. Check your dashboard for the buyer's details.\n\n\
         The Tunila team"
    )
}

fn contact_reply_body(name: &str, original_message: &str, reply: &str) -> String {
    format!(
        "Hi {name},\n\n\
         {reply}\n\n\
         ---\n\
         Your original message:\n\
         {original_message}\n\n\
         The Tunila team"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_otp_body_contains_code() {
        let body = verify_otp_body("042137");
        assert!(body.contains("042137"));
        assert!(body.contains("24 hours"));
    }

    #[test]
    fn test_reset_otp_body_contains_code_and_ttl() {
        let body = reset_otp_body("991200");
        assert!(body.contains("991200"));
        assert!(body.contains("15 minutes"));
    }

    #[test]
    fn test_purchase_body_formats_paisa() {
        let body = purchase_body("Asha", "Tour Hoodie", 2, 450_050);
        assert!(body.contains("2 x Tour Hoodie"));
        assert!(body.contains("Rs 4500.50"));
    }

    #[test]
    fn test_purchase_body_pads_small_paisa() {
        let body = purchase_body("Asha", "Sticker", 1, 10_005);
        assert!(body.contains("Rs 100.05"));
    }

    #[test]
    fn test_contact_reply_quotes_original() {
        let body = contact_reply_body("Ram", "My upload failed", "Fixed now, try again.");
        assert!(body.contains("Fixed now, try again."));
        assert!(body.contains("My upload failed"));
    }
}
