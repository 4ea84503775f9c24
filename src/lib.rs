pub mod cache;
pub mod config;
pub mod contact;
pub mod content;
pub mod error;
pub mod media;
pub mod models;
pub mod normalize;
pub mod spreadsheet;
pub mod template;
pub mod workbook;

use axum::{
    extract::{Path, Request, State},
    http::{HeaderMap, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Form,
};
use std::path::PathBuf;
use tower_http::services::ServeDir;
use tracing::{info, warn};

use contact::{ContactForm, EmailClient};
use content::{countries, filter_by_countries, ContentService};
use template::*;

#[derive(Clone)]
pub struct AppState {
    pub content: ContentService,
    pub email: EmailClient,
    pub public_dir: PathBuf,
}

const DEALS_PATH: &str = "/hot-deals";
const NOT_FOUND_PATH: &str = "/page-not-found";

pub fn create_app(state: AppState) -> axum::Router {
    axum::Router::new()
        .route("/", get(index))
        .route("/Top-Tiulim", get(index))
        .route("/hot-deals", get(hot_deals))
        .route("/hot-deals/filter", post(filter_deals))
        .route("/hot-deals/:deal_id", get(deal_details))
        .route("/gallery", get(gallery))
        .route("/about-us", get(about_us))
        .route("/contact-us", get(contact_page).post(send_contact))
        .route("/page-not-found", get(page_not_found))
        .nest_service("/assets", ServeDir::new(&state.public_dir))
        .fallback(page_not_found)
        .layer(middleware::from_fn_with_state(state.clone(), forget_country_filter))
        .with_state(state)
}

/// Pages outside the deals section; navigating to one drops the
/// destination filter.
const OTHER_PAGES: [&str; 4] = ["/gallery", "/about-us", "/contact-us", NOT_FOUND_PATH];

/// Browsers mark subresource fetches (favicons, images, htmx calls) with a
/// non-`document` `Sec-Fetch-Dest`. Clients that send none count as
/// navigations.
fn is_navigation(headers: &HeaderMap) -> bool {
    headers
        .get("sec-fetch-dest")
        .map_or(true, |dest| dest.as_bytes() == b"document")
}

async fn forget_country_filter(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if request.method() == Method::GET
        && OTHER_PAGES.contains(&request.uri().path())
        && is_navigation(request.headers())
    {
        state.content.cache().clear_selected_countries();
    }
    next.run(request).await
}

fn is_htmx(headers: &HeaderMap) -> bool {
    headers.contains_key("HX-Request")
}

// Need to use HX-Redirect to force redirect when using HTMX
fn redirect(headers: &HeaderMap, to: &str) -> Response {
    if is_htmx(headers) {
        let mut out = HeaderMap::new();
        if let Ok(value) = to.parse() {
            out.insert("HX-Redirect", value);
        }
        (StatusCode::OK, out).into_response()
    } else {
        Redirect::to(to).into_response()
    }
}

async fn index() -> Redirect {
    Redirect::to(DEALS_PATH)
}

/// The deals page for the current filter; a failed fetch renders the
/// loading notice.
async fn deals_page(state: &AppState) -> DealsTemplate {
    let selected = state.content.cache().selected_countries();
    match state.content.fetch_deals().await {
        Ok(deals) => {
            let countries = CountryOption::list(countries(&deals), &selected);
            let deals = filter_by_countries(deals, &selected);
            info!("Showing {} deals, filter {:?}", deals.len(), selected);
            DealsTemplate {
                title: page_title("Hot deals"),
                loaded: true,
                countries,
                deals: deals.iter().map(DealCard::from).collect(),
            }
        }
        Err(err) => {
            warn!("Failed to get deals: {}", err);
            DealsTemplate {
                title: page_title("Loading..."),
                loaded: false,
                countries: Vec::new(),
                deals: Vec::new(),
            }
        }
    }
}

async fn hot_deals(State(state): State<AppState>) -> impl IntoResponse {
    HtmlTemplate(deals_page(&state).await)
}

/// Replaces the destination filter. htmx gets the list fragment back,
/// a plain form post gets the whole page.
///
/// Takes raw pairs because checkbox groups repeat the `countries` key.
async fn filter_deals(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Response {
    let selected: Vec<String> = pairs
        .into_iter()
        .filter(|(key, value)| key == "countries" && !value.trim().is_empty())
        .map(|(_, value)| value)
        .collect();
    state.content.cache().set_selected_countries(selected);
    info!(
        "Destination filter set to {:?}",
        state.content.cache().selected_countries()
    );

    let page = deals_page(&state).await;
    if is_htmx(&headers) {
        HtmlTemplate(DealsListTemplate {
            loaded: page.loaded,
            deals: page.deals,
        })
        .into_response()
    } else {
        HtmlTemplate(page).into_response()
    }
}

async fn deal_details(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(deal_id): Path<String>,
) -> Response {
    let Ok(id) = deal_id.parse::<i64>() else {
        warn!("Deal id {:?} is not a number", deal_id);
        return redirect(&headers, NOT_FOUND_PATH);
    };

    let deal = match state.content.fetch_deal(id).await {
        Ok(Some(deal)) => deal,
        Ok(None) => {
            warn!("Deal {} not found", id);
            return redirect(&headers, NOT_FOUND_PATH);
        }
        Err(err) => {
            warn!("Failed to get deals: {}", err);
            return redirect(&headers, NOT_FOUND_PATH);
        }
    };

    let itinerary = match deal.itinerary_sheet_id.as_deref() {
        Some(sheet_id) => match state.content.fetch_itinerary(sheet_id).await {
            Ok(itinerary) => Some(itinerary),
            Err(err) => {
                warn!("Failed to get itinerary {} for deal {}: {}", sheet_id, id, err);
                None
            }
        },
        None => None,
    };

    HtmlTemplate(DealTemplate::new(deal, itinerary)).into_response()
}

async fn gallery(State(state): State<AppState>) -> impl IntoResponse {
    let items = state
        .content
        .fetch_gallery_items()
        .await
        .unwrap_or_else(|err| {
            warn!("Failed to get gallery items: {}", err);
            Vec::new()
        });
    HtmlTemplate(GalleryTemplate {
        title: page_title("Gallery"),
        items,
    })
}

async fn about_us(State(state): State<AppState>) -> impl IntoResponse {
    let recommendations = state
        .content
        .fetch_recommendations()
        .await
        .unwrap_or_else(|err| {
            warn!("Failed to get recommendations: {}", err);
            Vec::new()
        });
    HtmlTemplate(AboutTemplate {
        title: page_title("About us"),
        recommendations,
    })
}

async fn contact_page() -> impl IntoResponse {
    HtmlTemplate(ContactTemplate::empty())
}

async fn send_contact(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<ContactForm>,
) -> Response {
    let errors = form.validate();
    if !errors.is_empty() {
        info!("Contact form rejected: {:?}", errors);
        let template = ContactTemplate {
            title: page_title("Contact us"),
            form,
            errors,
            send_failed: false,
        };
        return (StatusCode::UNPROCESSABLE_ENTITY, HtmlTemplate(template)).into_response();
    }

    match state.email.send(&form).await {
        Ok(()) => {
            info!("Contact message from {} sent", form.full_name);
            redirect(&headers, DEALS_PATH)
        }
        Err(err) => {
            warn!("Failed to send contact message: {}", err);
            let template = ContactTemplate {
                title: page_title("Contact us"),
                form,
                errors,
                send_failed: true,
            };
            (StatusCode::BAD_GATEWAY, HtmlTemplate(template)).into_response()
        }
    }
}

async fn page_not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, HtmlTemplate(NotFoundTemplate::default()))
}
