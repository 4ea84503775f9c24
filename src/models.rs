use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MediaLink {
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub url: String,
}

impl MediaLink {
    pub fn is_image(&self) -> bool {
        self.kind == MediaKind::Image
    }

    pub fn is_video(&self) -> bool {
        self.kind == MediaKind::Video
    }
}

/// A price cell as the sheet holds it: an amount, or free text such as
/// `"4,990"` that is shown verbatim.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Price {
    Amount(f64),
    Text(String),
}

impl Default for Price {
    fn default() -> Self {
        Price::Text(String::new())
    }
}

impl Price {
    /// Amounts without a trailing `.0` when whole; text as written.
    pub fn label(&self) -> String {
        match self {
            Price::Amount(amount) if amount.fract() == 0.0 => format!("{}", *amount as i64),
            Price::Amount(amount) => format!("{amount:.2}"),
            Price::Text(text) => text.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Deal {
    /// `None` when the id cell is not a whole number; such a deal is listed
    /// but has no details page.
    pub id: Option<i64>,
    pub country: String,
    pub destination: String,
    pub title: String,
    pub description: String,
    pub date: String,
    pub price: Price,
    pub media_links: Vec<MediaLink>,
    pub itinerary_sheet_id: Option<String>,
    pub last_spots: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ItinerarySection {
    pub title: Option<String>,
    pub text: Option<String>,
    pub image: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ItineraryDay {
    pub summary: String,
    pub sections: Vec<ItinerarySection>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Itinerary {
    pub itinerary_sheet_id: String,
    pub days: Vec<ItineraryDay>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GalleryItem {
    pub name: String,
    pub images: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Recommendation {
    pub name: String,
    pub recommendation: String,
}
