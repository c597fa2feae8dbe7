use crate::config::EmailConfig;
use anyhow::{Context, Result, anyhow};
use lettre::message::{Mailbox, header::ContentType};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::str::FromStr;

pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    config: EmailConfig,
}

impl EmailService {
    /// Creates a new EmailService instance
    pub fn new(config: EmailConfig) -> Result<Self> {
        let creds = Credentials::new(config.smtp_username.clone(), config.smtp_password.clone());

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
            .context("Invalid SMTP host")?
            .port(config.smtp_port)
            .credentials(creds)
            .build();

        Ok(Self { mailer, config })
    }

    /// Sends the mailbox-ownership verification email for a freshly issued
    /// token.
    pub async fn send_verification_email(
        &self,
        recipient_email: &str,
        recipient_name: &str,
        verification_token: &str,
    ) -> Result<()> {
        let subject = "Verify your email address".to_string();
        let verify_url = format!(
            "{}/auth/verify-email?token={}",
            self.config.base_url, verification_token
        );

        let html_content = self.build_verification_html(recipient_name, &verify_url);
        let text_content = self.build_verification_text(recipient_name, &verify_url);

        self.send_email(recipient_email, &subject, &html_content, &text_content)
            .await
    }

    /// Sends a generic email
    pub async fn send_email(
        &self,
        to_email: &str,
        subject: &str,
        html_content: &str,
        text_content: &str,
    ) -> Result<()> {
        let from_mailbox = Mailbox::from_str(&format!(
            "{} <{}>",
            self.config.from_name, self.config.from_email
        ))
        .map_err(|e| anyhow!("Invalid from email: {e}"))?;

        let to_mailbox =
            Mailbox::from_str(to_email).map_err(|e| anyhow!("Invalid recipient email: {e}"))?;

        let email = Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(subject)
            .multipart(
                lettre::message::MultiPart::alternative()
                    .singlepart(
                        lettre::message::SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_content.to_string()),
                    )
                    .singlepart(
                        lettre::message::SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_content.to_string()),
                    ),
            )
            .context("Failed to build email")?;

        self.mailer
            .send(email)
            .await
            .context("Failed to send email")?;

        Ok(())
    }

    fn build_verification_html(&self, recipient_name: &str, verify_url: &str) -> String {
        format!(
            r#"
            <!DOCTYPE html>
            <html>
            <head>
                <meta charset="UTF-8">
                <title>Verify your email address</title>
            </head>
            <body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
                <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
                    <h2 style="color: #2c3e50;">Almost there!</h2>

                    <p>Hi {},</p>

                    <p>Click the button below to confirm this email address belongs to you:</p>

                    <div style="text-align: center; margin: 30px 0;">
                        <a href="{}"
                           style="background-color: #3498db; color: white; padding: 12px 30px;
                                  text-decoration: none; border-radius: 5px; display: inline-block;">
                            Verify Email
                        </a>
                    </div>

                    <p>Or copy and paste this link into your browser:</p>
                    <p style="word-break: break-all; color: #7f8c8d;">{}</p>

                    <hr style="border: none; border-top: 1px solid #ecf0f1; margin: 30px 0;">

                    <p style="font-size: 12px; color: #7f8c8d;">
                        This link expires in 24 hours. If you didn't create an account,
                        you can safely ignore this email.
                    </p>
                </div>
            </body>
            </html>
            "#,
            recipient_name, verify_url, verify_url
        )
    }

    fn build_verification_text(&self, recipient_name: &str, verify_url: &str) -> String {
        format!(
            r#"Almost there!

Hi {},

Open the link below to confirm this email address belongs to you:
{}

This link expires in 24 hours. If you didn't create an account, you can safely ignore this email.
            "#,
            recipient_name, verify_url
        )
    }
}
