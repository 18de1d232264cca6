use anyhow::Context;
use axum::async_trait;
use serde::Serialize;

/// Outbound transactional mail seam. Faked out in tests.
#[async_trait]
pub trait EmailClient: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> anyhow::Result<()>;
}

/// Postmark-style HTTP API transport.
#[derive(Clone)]
pub struct HttpEmailClient {
    http: reqwest::Client,
    base_url: String,
    api_token: String,
    sender: String,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html_body: &'a str,
}

impl HttpEmailClient {
    pub fn new(base_url: &str, api_token: &str, sender: &str) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("build email http client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token: api_token.to_string(),
            sender: sender.to_string(),
        })
    }
}

#[async_trait]
impl EmailClient for HttpEmailClient {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> anyhow::Result<()> {
        let url = format!("{}/email", self.base_url);
        let payload = SendEmailRequest {
            from: &self.sender,
            to,
            subject,
            html_body,
        };
        let res = self
            .http
            .post(&url)
            .header("X-Postmark-Server-Token", self.api_token.as_str())
            .json(&payload)
            .send()
            .await
            .context("send email request")?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            anyhow::bail!("email api returned {}: {}", status, body);
        }
        tracing::info!(to = %to, subject = %subject, "email sent");
        Ok(())
    }
}

/// Body of the registration verification email.
pub fn verification_email(fname: &str, verification_link: &str) -> (String, String) {
    let subject = "Verify Your Email Address".to_string();
    let body = format!(
        "<p>Hi {},</p>\
         <p>Thank you for registering for FormFixer. Please verify your email address by clicking the link below:</p>\
         <a href=\"{link}\">{link}</a>\
         <p>This link will expire in 1 hour.</p>",
        fname,
        link = verification_link,
    );
    (subject, body)
}

/// Body of the password reset email carrying the 6-digit code.
pub fn reset_email(fname: &str, code: &str) -> (String, String) {
    let subject = "Your FormFixer Password Reset Code".to_string();
    let body = format!(
        "<p>Hi {},</p>\
         <p>Your password reset code is:</p>\
         <h2>{}</h2>\
         <p>Enter it in the app together with your new password. The code expires in 15 minutes.</p>\
         <p>If you did not request a reset you can ignore this email.</p>",
        fname, code,
    );
    (subject, body)
}
