use std::sync::OnceLock;

use regex::Regex;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ContentError, Result};

struct Endpoints;
impl Endpoints {
    const SEND_EMAIL: &'static str = "api/v1.0/email/send";
}

const REQUIRED: &str = "This field is required";

fn phone_pattern() -> &'static Regex {
    static PHONE: OnceLock<Regex> = OnceLock::new();
    PHONE.get_or_init(|| {
        Regex::new(
            r"^(?:(?:(\+?972|\(\+?972\)|\+?\(972\))(?:\s|\.|-)?([1-9]\d?))|(0[23489]{1})|(0[57]{1}[0-9]))(?:\s|\.|-)?([^0\D]{1}\d{2}(?:\s|\.|-)?\d{4})$",
        )
        .expect("phone pattern compiles")
    })
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ContactForm {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub message: String,
}

/// Per-field validation messages; `None` means the field is fine.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ContactErrors {
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    pub message: Option<String>,
}

impl ContactErrors {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none() && self.phone_number.is_none() && self.message.is_none()
    }
}

fn check_length(value: &str, label: &str, min: usize, max: usize) -> Option<String> {
    let len = value.chars().count();
    if value.trim().is_empty() {
        Some(REQUIRED.to_string())
    } else if len < min {
        Some(format!("{label} must be at least {min} characters"))
    } else if len > max {
        Some(format!("{label} can be at most {max} characters"))
    } else {
        None
    }
}

impl ContactForm {
    pub fn validate(&self) -> ContactErrors {
        let phone_number = check_length(&self.phone_number, "Phone number", 9, 16).or_else(|| {
            (!phone_pattern().is_match(&self.phone_number))
                .then(|| "Invalid phone number".to_string())
        });

        ContactErrors {
            full_name: check_length(&self.full_name, "Full name", 5, 50),
            phone_number,
            message: check_length(&self.message, "Message", 5, 2000),
        }
    }
}

#[derive(Clone, Debug)]
pub struct EmailJsCredentials {
    pub service_id: String,
    pub template_id: String,
    pub public_key: String,
}

#[derive(Serialize)]
struct TemplateParams<'a> {
    from_name: &'a str,
    from_phone_number: &'a str,
    to_name: &'a str,
    message: &'a str,
}

#[derive(Serialize)]
struct SendRequest<'a> {
    service_id: &'a str,
    template_id: &'a str,
    user_id: &'a str,
    template_params: TemplateParams<'a>,
}

/// Delivers contact messages through the EmailJS REST API.
///
/// Without credentials the message is only logged.
#[derive(Clone, Debug)]
pub struct EmailClient {
    client: reqwest::Client,
    api_url: Url,
    credentials: Option<EmailJsCredentials>,
    recipient_name: String,
}

impl EmailClient {
    pub fn new(
        api_url: Url,
        credentials: Option<EmailJsCredentials>,
        recipient_name: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
            credentials,
            recipient_name: recipient_name.into(),
        }
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    pub async fn send(&self, form: &ContactForm) -> Result<()> {
        let Some(cred) = &self.credentials else {
            warn!("EmailJS is not configured, message from {} not sent", form.full_name);
            info!("Contact message from {} ({}): {}", form.full_name, form.phone_number, form.message);
            return Ok(());
        };

        let url = self
            .api_url
            .join(Endpoints::SEND_EMAIL)
            .map_err(|e| ContentError::email(format!("bad EmailJS url: {e}")))?;
        let body = SendRequest {
            service_id: &cred.service_id,
            template_id: &cred.template_id,
            user_id: &cred.public_key,
            template_params: TemplateParams {
                from_name: &form.full_name,
                from_phone_number: &form.phone_number,
                to_name: &self.recipient_name,
                message: &form.message,
            },
        };

        info!("Sending contact message from {} to {}", form.full_name, url);
        let res = self.client.post(url).json(&body).send().await?;
        let status = res.status();
        if !status.is_success() {
            let detail = res.text().await.unwrap_or_default();
            return Err(ContentError::email(format!("EmailJS answered {status}: {detail}")));
        }
        Ok(())
    }
}
