use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::Arc;

use crate::config::Config;

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_otp(&self, to: &str, otp: &str, valid_minutes: i64) -> Result<()>;
}

pub type DynMailer = Arc<dyn Mailer>;

pub fn otp_subject() -> &'static str {
    "Your AutoGenesis Verification Code"
}

pub fn otp_body(otp: &str, valid_minutes: i64) -> String {
    format!(
        "Hello,

Thank you for signing up for AutoGenesis.
Your One-Time Password (OTP) is: {otp}
This code will expire in {valid_minutes} minutes.
If you did not request this, please ignore this email.

Best,
The AutoGenesis Team
"
    )
}

/// SMTPS delivery (implicit TLS, e.g. smtp.gmail.com:465).
pub struct SmtpMailer {
    sender: String,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(host: &str, port: u16, sender: String, password: String) -> Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(host)
            .with_context(|| format!("invalid SMTP relay {host}"))?
            .port(port)
            .credentials(Credentials::new(sender.clone(), password))
            .build();
        Ok(Self { sender, transport })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_otp(&self, to: &str, otp: &str, valid_minutes: i64) -> Result<()> {
        let msg = Message::builder()
            .from(self.sender.parse::<Mailbox>().map_err(|e| anyhow!("bad sender address: {e}"))?)
            .to(to.parse::<Mailbox>().map_err(|e| anyhow!("bad recipient address: {e}"))?)
            .subject(otp_subject())
            .header(ContentType::TEXT_PLAIN)
            .body(otp_body(otp, valid_minutes))?;
        self.transport.send(msg).await.context("SMTP send failed")?;
        tracing::info!(%to, "verification email sent");
        Ok(())
    }
}

/// Used when no SMTP credentials are configured: the code goes to the log.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_otp(&self, to: &str, otp: &str, valid_minutes: i64) -> Result<()> {
        tracing::warn!(%to, %otp, valid_minutes, "email credentials not configured; OTP logged instead of sent");
        Ok(())
    }
}

/// Keeps every OTP it is asked to send.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryMailer {
    sent: parking_lot::Mutex<Vec<(String, String)>>,
    fail: bool,
}

#[cfg(test)]
impl MemoryMailer {
    pub fn failing() -> Self {
        Self { sent: parking_lot::Mutex::new(Vec::new()), fail: true }
    }

    pub fn last_otp_for(&self, to: &str) -> Option<String> {
        self.sent.lock().iter().rev().find(|(addr, _)| addr == to).map(|(_, otp)| otp.clone())
    }
}

#[cfg(test)]
#[async_trait]
impl Mailer for MemoryMailer {
    async fn send_otp(&self, to: &str, otp: &str, _valid_minutes: i64) -> Result<()> {
        if self.fail {
            return Err(anyhow!("mail transport unavailable"));
        }
        self.sent.lock().push((to.to_string(), otp.to_string()));
        Ok(())
    }
}

pub fn make_mailer(cfg: &Config) -> Result<DynMailer> {
    match (&cfg.email_sender, &cfg.email_password) {
        (Some(sender), Some(password)) => Ok(Arc::new(SmtpMailer::new(
            &cfg.smtp_host,
            cfg.smtp_port,
            sender.clone(),
            password.clone(),
        )?)),
        _ => {
            tracing::warn!("EMAIL_SENDER/EMAIL_PASSWORD not set; verification codes will only be logged");
            Ok(Arc::new(LogMailer))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_mentions_code_and_expiry() {
        let body = otp_body("482913", 10);
        assert!(body.contains("482913"));
        assert!(body.contains("10 minutes"));
    }

    #[tokio::test]
    async fn memory_mailer_records_latest_code() {
        let m = MemoryMailer::default();
        m.send_otp("a@example.com", "111111", 10).await.unwrap();
        m.send_otp("a@example.com", "222222", 10).await.unwrap();
        assert_eq!(m.last_otp_for("a@example.com").as_deref(), Some("222222"));
        assert!(MemoryMailer::failing().send_otp("a@example.com", "1", 10).await.is_err());
    }
}
