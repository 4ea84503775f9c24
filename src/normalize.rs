//! Turns raw sheet rows into the typed site model.

use serde::de::{DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{ContentError, Result};
use crate::models::{
    Deal, GalleryItem, Itinerary, ItineraryDay, ItinerarySection, MediaLink, Price,
    Recommendation,
};
use crate::workbook::RowRecord;

pub const DEALS_SHEET: &str = "Deals";
pub const GALLERY_SHEET: &str = "Gallery";
pub const RECOMMENDATIONS_SHEET: &str = "Recommendations";

/// A list column that arrives either JSON-encoded in a text cell or
/// already decoded.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Embedded<T> {
    Decoded(Vec<T>),
    Encoded(String),
}

impl<T> Default for Embedded<T> {
    fn default() -> Self {
        Embedded::Decoded(Vec::new())
    }
}

impl<T: DeserializeOwned> Embedded<T> {
    pub fn decode(self) -> serde_json::Result<Vec<T>> {
        match self {
            Embedded::Decoded(items) => Ok(items),
            Embedded::Encoded(json) => serde_json::from_str(&json),
        }
    }
}

/// Spreadsheet cells are loosely typed: a sheet id typed as `7` is still
/// the text `"7"`.
#[derive(Deserialize)]
#[serde(untagged)]
enum Cell {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Other(Value),
}

impl Cell {
    fn into_text(self) -> String {
        match self {
            Cell::Bool(b) => b.to_string(),
            Cell::Int(n) => n.to_string(),
            Cell::Float(n) => n.to_string(),
            Cell::Text(text) => text,
            Cell::Other(Value::Null) => String::new(),
            Cell::Other(value) => value.to_string(),
        }
    }
}

fn text<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    Ok(Cell::deserialize(deserializer)?.into_text())
}

/// Empty cells count as absent.
fn optional_text<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<String>, D::Error> {
    Ok(Option::<Cell>::deserialize(deserializer)?
        .map(Cell::into_text)
        .filter(|text| !text.is_empty()))
}

/// Numbers stay amounts, numeric text is read as an amount, and anything
/// else is kept as the text the sheet shows.
fn price<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Price, D::Error> {
    Ok(match Option::<Cell>::deserialize(deserializer)? {
        Some(Cell::Int(n)) => Price::Amount(n as f64),
        Some(Cell::Float(n)) => Price::Amount(n),
        Some(Cell::Text(text)) => match text.trim().parse::<f64>() {
            Ok(amount) if amount.is_finite() => Price::Amount(amount),
            _ => Price::Text(text),
        },
        Some(other) => Price::Text(other.into_text()),
        None => Price::default(),
    })
}

fn whole(value: f64) -> Option<i64> {
    (value.is_finite() && value.fract() == 0.0).then_some(value as i64)
}

/// Whole numbers only; anything else leaves the deal without an id.
fn deal_id<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<i64>, D::Error> {
    Ok(match Option::<Cell>::deserialize(deserializer)? {
        Some(Cell::Int(n)) => Some(n),
        Some(Cell::Float(n)) => whole(n),
        Some(Cell::Text(text)) => text.trim().parse::<f64>().ok().and_then(whole),
        _ => None,
    })
}

fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<bool, D::Error> {
    Ok(match Option::<Cell>::deserialize(deserializer)? {
        Some(Cell::Bool(b)) => b,
        Some(Cell::Int(n)) => n != 0,
        Some(Cell::Float(n)) => n != 0.0,
        Some(Cell::Text(text)) => matches!(text.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
        Some(Cell::Other(_)) | None => false,
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DealRow {
    #[serde(default, deserialize_with = "deal_id")]
    id: Option<i64>,
    #[serde(default, deserialize_with = "text")]
    country: String,
    #[serde(default, deserialize_with = "text")]
    destination: String,
    #[serde(default, deserialize_with = "text")]
    title: String,
    #[serde(default, deserialize_with = "text")]
    description: String,
    #[serde(default, deserialize_with = "text")]
    date: String,
    #[serde(default, deserialize_with = "price")]
    price: Price,
    #[serde(default)]
    media_links: Embedded<MediaLink>,
    #[serde(default, deserialize_with = "optional_text")]
    itinerary_sheet_id: Option<String>,
    #[serde(default, deserialize_with = "flag")]
    last_spots: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItineraryRow {
    #[serde(default, deserialize_with = "text")]
    day_summary: String,
    #[serde(default, deserialize_with = "optional_text")]
    section_title: Option<String>,
    #[serde(default, deserialize_with = "optional_text")]
    section_text: Option<String>,
    #[serde(default, deserialize_with = "optional_text")]
    section_image: Option<String>,
}

#[derive(Deserialize)]
struct GalleryRow {
    #[serde(default, deserialize_with = "text")]
    name: String,
    #[serde(default)]
    images: Embedded<String>,
}

#[derive(Deserialize)]
struct RecommendationRow {
    #[serde(default, deserialize_with = "text")]
    name: String,
    #[serde(default, deserialize_with = "text")]
    recommendation: String,
}

/// Row numbers in errors are spreadsheet row numbers: the header is row 1.
fn sheet_row(index: usize) -> usize {
    index + 2
}

fn parse_rows<T: DeserializeOwned>(sheet: &str, rows: Vec<RowRecord>) -> Result<Vec<T>> {
    rows.into_iter()
        .enumerate()
        .map(|(i, row)| {
            serde_json::from_value(Value::Object(row))
                .map_err(|e| ContentError::malformed(sheet, sheet_row(i), e))
        })
        .collect()
}

/// One deal per row, in row order, with `mediaLinks` decoded.
pub fn normalize_deals(rows: Vec<RowRecord>) -> Result<Vec<Deal>> {
    parse_rows::<DealRow>(DEALS_SHEET, rows)?
        .into_iter()
        .enumerate()
        .map(|(i, row)| -> Result<Deal> {
            let media_links = row
                .media_links
                .decode()
                .map_err(|e| ContentError::malformed(DEALS_SHEET, sheet_row(i), e))?;
            Ok(Deal {
                id: row.id,
                country: row.country,
                destination: row.destination,
                title: row.title,
                description: row.description,
                date: row.date,
                price: row.price,
                media_links,
                itinerary_sheet_id: row.itinerary_sheet_id,
                last_spots: row.last_spots,
            })
        })
        .collect()
}

/// Groups consecutive rows sharing a `daySummary` into one day.
///
/// Only adjacency counts: a summary that reappears after a different one
/// opens a second day with the same label.
pub fn build_itinerary(rows: Vec<RowRecord>, sheet_id: &str) -> Result<Itinerary> {
    let days = parse_rows::<ItineraryRow>(sheet_id, rows)?.into_iter().fold(
        Vec::<ItineraryDay>::new(),
        |mut days, row| {
            let section = ItinerarySection {
                title: row.section_title,
                text: row.section_text,
                image: row.section_image,
            };
            match days.last_mut() {
                Some(day) if day.summary == row.day_summary => day.sections.push(section),
                _ => days.push(ItineraryDay {
                    summary: row.day_summary,
                    sections: vec![section],
                }),
            }
            days
        },
    );

    Ok(Itinerary {
        itinerary_sheet_id: sheet_id.to_string(),
        days,
    })
}

pub fn normalize_gallery_items(rows: Vec<RowRecord>) -> Result<Vec<GalleryItem>> {
    parse_rows::<GalleryRow>(GALLERY_SHEET, rows)?
        .into_iter()
        .enumerate()
        .map(|(i, row)| -> Result<GalleryItem> {
            let images = row
                .images
                .decode()
                .map_err(|e| ContentError::malformed(GALLERY_SHEET, sheet_row(i), e))?;
            Ok(GalleryItem {
                name: row.name,
                images,
            })
        })
        .collect()
}

pub fn normalize_recommendations(rows: Vec<RowRecord>) -> Result<Vec<Recommendation>> {
    Ok(parse_rows::<RecommendationRow>(RECOMMENDATIONS_SHEET, rows)?
        .into_iter()
        .map(|row| Recommendation {
            name: row.name,
            recommendation: row.recommendation,
        })
        .collect())
}
