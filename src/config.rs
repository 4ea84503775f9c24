use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use reqwest::Url;

use crate::contact::EmailJsCredentials;

pub const WORKBOOK_ASSET: &str = "assets/files/ourDeals.xlsx";

#[derive(Clone, Debug, Parser)]
#[command(name = "top-tiulim", about = "Travel deals site backed by a published workbook")]
pub struct Config {
    /// Address to listen on
    #[arg(long, env = "TOP_TIULIM_LISTEN", default_value = "0.0.0.0:3000")]
    pub listen: SocketAddr,

    /// Workbook URL; defaults to the copy served from the public directory
    #[arg(long, env = "TOP_TIULIM_SPREADSHEET_URL")]
    pub spreadsheet_url: Option<Url>,

    /// Directory served under /assets
    #[arg(long, env = "TOP_TIULIM_PUBLIC_DIR", default_value = "public/assets")]
    pub public_dir: PathBuf,

    /// Warm the content cache in the background at startup
    #[arg(long)]
    pub preload: bool,

    #[arg(long, env = "EMAILJS_API_URL", default_value = "https://api.emailjs.com/")]
    pub emailjs_api_url: Url,

    #[arg(long, env = "EMAILJS_SERVICE_ID")]
    pub emailjs_service_id: Option<String>,

    #[arg(long, env = "EMAILJS_TEMPLATE_ID")]
    pub emailjs_template_id: Option<String>,

    #[arg(long, env = "EMAILJS_PUBLIC_KEY")]
    pub emailjs_public_key: Option<String>,

    /// Name shown as the addressee in contact emails
    #[arg(long, env = "TOP_TIULIM_CONTACT_RECIPIENT", default_value = "Naama")]
    pub contact_recipient: String,
}

impl Config {
    /// The configured workbook URL, or this server's own published copy.
    pub fn workbook_url(&self) -> anyhow::Result<Url> {
        if let Some(url) = &self.spreadsheet_url {
            return Ok(url.clone());
        }
        let ip = if self.listen.ip().is_unspecified() {
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        } else {
            self.listen.ip()
        };
        let origin = SocketAddr::new(ip, self.listen.port());
        Url::parse(&format!("http://{origin}/{WORKBOOK_ASSET}"))
            .with_context(|| format!("Build workbook url for {origin}"))
    }

    /// EmailJS credentials when all three parts are set.
    pub fn emailjs_credentials(&self) -> Option<EmailJsCredentials> {
        match (
            self.emailjs_service_id.clone(),
            self.emailjs_template_id.clone(),
            self.emailjs_public_key.clone(),
        ) {
            (Some(service_id), Some(template_id), Some(public_key)) => Some(EmailJsCredentials {
                service_id,
                template_id,
                public_key,
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Built by hand: `parse_from` would also pick up TOP_TIULIM_* and
    // EMAILJS_* from the test environment.
    fn config(listen: &str) -> Config {
        Config {
            listen: listen.parse().unwrap(),
            spreadsheet_url: None,
            public_dir: PathBuf::from("public/assets"),
            preload: false,
            emailjs_api_url: Url::parse("https://api.emailjs.com/").unwrap(),
            emailjs_service_id: None,
            emailjs_template_id: None,
            emailjs_public_key: None,
            contact_recipient: "Naama".to_string(),
        }
    }

    #[test]
    fn unspecified_listen_address_points_at_localhost() {
        assert_eq!(
            config("0.0.0.0:3000").workbook_url().unwrap().as_str(),
            "http://127.0.0.1:3000/assets/files/ourDeals.xlsx"
        );
        assert_eq!(
            config("192.168.1.20:8080").workbook_url().unwrap().as_str(),
            "http://192.168.1.20:8080/assets/files/ourDeals.xlsx"
        );
    }

    #[test]
    fn explicit_spreadsheet_url_wins() {
        let config = Config {
            spreadsheet_url: Some(Url::parse("https://cdn.example.com/deals.xlsx").unwrap()),
            ..config("127.0.0.1:8080")
        };
        assert_eq!(
            config.workbook_url().unwrap().as_str(),
            "https://cdn.example.com/deals.xlsx"
        );
    }

    #[test]
    fn emailjs_needs_all_three_settings() {
        let partial = Config {
            emailjs_service_id: Some("service".to_string()),
            emailjs_template_id: Some("template".to_string()),
            ..config("127.0.0.1:3000")
        };
        assert!(partial.emailjs_credentials().is_none());

        let full = Config {
            emailjs_public_key: Some("key".to_string()),
            ..partial
        };
        let credentials = full.emailjs_credentials().unwrap();
        assert_eq!(credentials.service_id, "service");
        assert_eq!(credentials.public_key, "key");
    }

    #[test]
    fn command_line_flags_parse() {
        let config = Config::try_parse_from([
            "top-tiulim",
            "--listen",
            "127.0.0.1:8080",
            "--spreadsheet-url",
            "https://cdn.example.com/deals.xlsx",
            "--preload",
        ])
        .unwrap();
        assert_eq!(config.listen.port(), 8080);
        assert!(config.preload);
        assert_eq!(
            config.spreadsheet_url.unwrap().as_str(),
            "https://cdn.example.com/deals.xlsx"
        );
    }
}
