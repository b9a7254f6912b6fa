//! Email Service
//!
//! Dispatches recovery codes through the SMTP gateway. The transport sits
//! behind the [`RecoveryMailer`] trait so the issuance service never
//! depends on a concrete gateway and tests can record dispatches instead
//! of sending them.

use async_trait::async_trait;
use chrono::Datelike;
use lettre::{
    message::{header, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use log::{error, info};
use tera::{Context, Tera};

use crate::config::EmailConfig;
use crate::utils::error::{AppError, AppResult};

/// Outbound gateway for recovery messages.
///
/// Dispatch acceptance is not final delivery; the gateway owns the rest
/// of the transport.
#[async_trait]
pub trait RecoveryMailer: Send + Sync + 'static {
    /// Send a recovery code to `to_email`. The code value must appear
    /// only in the message body, never in logs or return values.
    async fn send_recovery_code(
        &self,
        to_email: &str,
        display_name: &str,
        code: &str,
        expires_in_minutes: i64,
    ) -> AppResult<()>;
}

/// SMTP-backed implementation of [`RecoveryMailer`]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    templates: Tera,
    config: EmailConfig,
}

impl SmtpMailer {
    /// Create a new mailer from gateway configuration
    pub fn new(config: EmailConfig) -> AppResult<Self> {
        let creds = Credentials::new(config.smtp_username.clone(), config.smtp_password.clone());

        let transport = if config.smtp_use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
                .map_err(|e| {
                    AppError::Configuration(format!("Failed to configure SMTP relay: {}", e))
                })?
                .port(config.smtp_port)
                .credentials(creds)
                .build()
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
                .port(config.smtp_port)
                .credentials(creds)
                .build()
        };

        let mut templates = Tera::default();
        Self::add_embedded_templates(&mut templates)?;

        Ok(Self {
            transport,
            templates,
            config,
        })
    }

    /// Add embedded email templates
    fn add_embedded_templates(tera: &mut Tera) -> AppResult<()> {
        let recovery_html = r#"
<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Your Password Recovery Code</title>
    <style>
        body { font-family: Arial, sans-serif; line-height: 1.6; color: #333; max-width: 600px; margin: 0 auto; padding: 20px; }
        .header { text-align: center; background: #f8f9fa; padding: 20px; border-radius: 8px 8px 0 0; }
        .content { background: white; padding: 30px; border: 1px solid #dee2e6; }
        .code { font-size: 32px; font-weight: bold; color: #007bff; letter-spacing: 4px; text-align: center; margin: 20px 0; padding: 15px; background: #f8f9fa; border-radius: 4px; }
        .warning { background: #fff3cd; border: 1px solid #ffeaa7; padding: 15px; border-radius: 5px; margin: 20px 0; }
        .footer { background: #f8f9fa; padding: 20px; border-radius: 0 0 8px 8px; text-align: center; font-size: 12px; color: #666; }
    </style>
</head>
<body>
    <div class="header">
        <h1>Password Recovery</h1>
    </div>
    <div class="content">
        <p>Hello {{ display_name }},</p>

        <p>We received a request to reset the password for your account. Enter the code below to continue:</p>

        <div class="code">{{ recovery_code }}</div>

        <p>This code will expire in <strong>{{ expires_in_minutes }} minutes</strong>.</p>

        <div class="warning">
            <strong>Security Note:</strong> Never share this code with anyone. If you didn't request a password reset, you can safely ignore this email &mdash; your password will not change.
        </div>

        <p>Best regards,<br>The {{ app_name }} Team</p>
    </div>
    <div class="footer">
        <p>This email was sent from {{ app_name }}. If you have any questions, please contact our support team.</p>
        <p>© {{ current_year }} {{ app_name }}. All rights reserved.</p>
    </div>
</body>
</html>
        "#;

        let recovery_text = r#"
Password Recovery

Hello {{ display_name }},

We received a request to reset the password for your account. Enter the code below to continue:

Recovery Code: {{ recovery_code }}

This code will expire in {{ expires_in_minutes }} minutes.

SECURITY NOTE: Never share this code with anyone. If you didn't request a password reset, you can safely ignore this email - your password will not change.

Best regards,
The {{ app_name }} Team

---
This email was sent from {{ app_name }}. If you have any questions, please contact our support team.
© {{ current_year }} {{ app_name }}. All rights reserved.
        "#;

        tera.add_raw_template("recovery_email.html", recovery_html)
            .map_err(|e| AppError::Configuration(format!("Failed to add HTML template: {}", e)))?;

        tera.add_raw_template("recovery_email.txt", recovery_text)
            .map_err(|e| AppError::Configuration(format!("Failed to add text template: {}", e)))?;

        Ok(())
    }
}

#[async_trait]
impl RecoveryMailer for SmtpMailer {
    async fn send_recovery_code(
        &self,
        to_email: &str,
        display_name: &str,
        code: &str,
        expires_in_minutes: i64,
    ) -> AppResult<()> {
        info!("Sending recovery email to: {}", to_email);

        let mut context = Context::new();
        context.insert("display_name", display_name);
        context.insert("recovery_code", code);
        context.insert("expires_in_minutes", &expires_in_minutes);
        context.insert("app_name", &self.config.from_name);
        context.insert("current_year", &chrono::Utc::now().year());

        let html_body = self
            .templates
            .render("recovery_email.html", &context)
            .map_err(|e| AppError::Internal(format!("Failed to render HTML template: {}", e)))?;

        let text_body = self
            .templates
            .render("recovery_email.txt", &context)
            .map_err(|e| AppError::Internal(format!("Failed to render text template: {}", e)))?;

        let message = Message::builder()
            .from(
                format!("{} <{}>", self.config.from_name, self.config.from_email)
                    .parse()
                    .map_err(|e| AppError::Configuration(format!("Invalid from address: {}", e)))?,
            )
            .to(to_email
                .parse()
                .map_err(|e| AppError::Validation(format!("Invalid recipient email: {}", e)))?)
            .subject("Your Password Recovery Code")
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_PLAIN)
                            .body(text_body),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_HTML)
                            .body(html_body),
                    ),
            )
            .map_err(|e| AppError::Internal(format!("Failed to build email message: {}", e)))?;

        match self.transport.send(message).await {
            Ok(_) => {
                info!("Recovery email dispatched to: {}", to_email);
                Ok(())
            }
            Err(e) => {
                error!("Failed to send recovery email to {}: {}", to_email, e);
                Err(AppError::Gateway(format!("Failed to send email: {}", e)))
            }
        }
    }
}

/// Test support: a recording mailer that never touches the network.
/// Lives outside `#[cfg(test)]` so integration tests can use it too.
pub mod testing {
    use std::sync::{Mutex, PoisonError};

    use async_trait::async_trait;

    use super::RecoveryMailer;
    use crate::utils::error::{AppError, AppResult};

    /// How the mock responds to dispatch requests
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum MockMode {
        /// Accept every dispatch
        Accept,
        /// Fail every dispatch with a gateway error
        Fail,
    }

    /// One recorded dispatch
    #[derive(Debug, Clone)]
    pub struct SentMail {
        pub to_email: String,
        pub display_name: String,
        pub code: String,
        pub expires_in_minutes: i64,
    }

    /// In-memory [`RecoveryMailer`] that records what would have been sent
    pub struct MockMailer {
        mode: MockMode,
        sent: Mutex<Vec<SentMail>>,
    }

    impl MockMailer {
        pub fn new(mode: MockMode) -> Self {
            Self {
                mode,
                sent: Mutex::new(Vec::new()),
            }
        }

        /// Everything dispatched so far, oldest first
        pub fn sent(&self) -> Vec<SentMail> {
            self.sent
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }

        /// The code carried by the most recent dispatch
        pub fn last_code(&self) -> Option<String> {
            self.sent().last().map(|mail| mail.code.clone())
        }
    }

    #[async_trait]
    impl RecoveryMailer for MockMailer {
        async fn send_recovery_code(
            &self,
            to_email: &str,
            display_name: &str,
            code: &str,
            expires_in_minutes: i64,
        ) -> AppResult<()> {
            if self.mode == MockMode::Fail {
                return Err(AppError::Gateway("smtp transport unavailable".to_string()));
            }

            self.sent
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(SentMail {
                    to_email: to_email.to_string(),
                    display_name: display_name.to_string(),
                    code: code.to_string(),
                    expires_in_minutes,
                });
            Ok(())
        }
    }
}
