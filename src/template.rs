use askama::Template;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use reqwest::Url;

use crate::contact::{ContactErrors, ContactForm};
use crate::media;
use crate::models::{Deal, GalleryItem, Itinerary, MediaLink, Recommendation};

pub const SITE_NAME: &str = "Top Tiulim";
pub const PHONE_NUMBER: &str = "0506233228";
pub const WHATSAPP_NUMBER: &str = "972506233228";

pub fn page_title(page: &str) -> String {
    format!("{SITE_NAME} | {page}")
}

/// Chat link to the office number with `message` prefilled.
pub fn whatsapp_url(message: &str) -> String {
    let base = format!("https://wa.me/{WHATSAPP_NUMBER}");
    match Url::parse_with_params(&base, &[("text", message)]) {
        Ok(url) => url.into(),
        Err(_) => base,
    }
}

// A wrapper for turning askama templates into responses that can be handled by server
pub struct HtmlTemplate<T>(pub T);

impl<T> IntoResponse for HtmlTemplate<T>
where
    T: Template,
{
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(html) => Html(html).into_response(),
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to render template. Error: {}", err),
            )
                .into_response(),
        }
    }
}

/// What a deal card needs, precomputed so the template stays dumb.
#[derive(Clone, Debug)]
pub struct DealCard {
    pub id: Option<i64>,
    pub title: String,
    pub destination: String,
    pub country: String,
    pub date: String,
    pub price: String,
    pub cover: Option<String>,
    pub last_spots: bool,
}

impl From<&Deal> for DealCard {
    fn from(deal: &Deal) -> Self {
        Self {
            id: deal.id,
            title: deal.title.clone(),
            destination: deal.destination.clone(),
            country: deal.country.clone(),
            date: deal.date.clone(),
            price: deal.price.label(),
            cover: media::first_image(deal).map(str::to_string),
            last_spots: deal.last_spots,
        }
    }
}

#[derive(Clone, Debug)]
pub struct CountryOption {
    pub name: String,
    pub selected: bool,
}

impl CountryOption {
    pub fn list(countries: Vec<String>, selected: &[String]) -> Vec<Self> {
        countries
            .into_iter()
            .map(|name| {
                let selected = selected.contains(&name);
                Self { name, selected }
            })
            .collect()
    }
}

#[derive(Template)]
#[template(path = "deals.html")]
pub struct DealsTemplate {
    pub title: String,
    pub loaded: bool,
    pub countries: Vec<CountryOption>,
    pub deals: Vec<DealCard>,
}

#[derive(Template)]
#[template(path = "deals_list.html")]
pub struct DealsListTemplate {
    pub loaded: bool,
    pub deals: Vec<DealCard>,
}

#[derive(Template)]
#[template(path = "deal.html")]
pub struct DealTemplate {
    pub title: String,
    pub deal: Deal,
    pub price: String,
    pub images: Vec<MediaLink>,
    pub videos: Vec<MediaLink>,
    pub itinerary: Option<Itinerary>,
    pub phone_number: String,
    pub whatsapp_url: String,
}

impl DealTemplate {
    pub fn new(deal: Deal, itinerary: Option<Itinerary>) -> Self {
        let images = media::image_links(&deal.media_links);
        let videos = deal
            .media_links
            .iter()
            .filter(|link| link.is_video())
            .cloned()
            .collect();
        let whatsapp_url = whatsapp_url(&format!(
            "Hi! I'd like details about the trip to {}.",
            deal.destination
        ));
        Self {
            title: page_title(&deal.destination),
            price: deal.price.label(),
            deal,
            images,
            videos,
            itinerary,
            phone_number: PHONE_NUMBER.to_string(),
            whatsapp_url,
        }
    }
}

#[derive(Template)]
#[template(path = "gallery.html")]
pub struct GalleryTemplate {
    pub title: String,
    pub items: Vec<GalleryItem>,
}

#[derive(Template)]
#[template(path = "about.html")]
pub struct AboutTemplate {
    pub title: String,
    pub recommendations: Vec<Recommendation>,
}

#[derive(Template)]
#[template(path = "contact.html")]
pub struct ContactTemplate {
    pub title: String,
    pub form: ContactForm,
    pub errors: ContactErrors,
    pub send_failed: bool,
}

impl ContactTemplate {
    pub fn empty() -> Self {
        Self {
            title: page_title("Contact us"),
            form: ContactForm::default(),
            errors: ContactErrors::default(),
            send_failed: false,
        }
    }
}

#[derive(Template)]
#[template(path = "not_found.html")]
pub struct NotFoundTemplate {
    pub title: String,
}

impl Default for NotFoundTemplate {
    fn default() -> Self {
        Self {
            title: page_title("Page not found"),
        }
    }
}
