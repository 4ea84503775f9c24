use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::models::{Deal, GalleryItem, Itinerary, Recommendation};

#[derive(Debug, Default)]
struct Collections {
    deals: Vec<Deal>,
    itineraries: Vec<Itinerary>,
    recommendations: Vec<Recommendation>,
    gallery_items: Vec<GalleryItem>,
    selected_countries: Vec<String>,
}

/// Shared in-memory store for everything fetched from the workbook.
///
/// Cloning hands out another handle to the same store. Writes replace a
/// whole collection or append one itinerary, so readers only ever see a
/// complete collection.
#[derive(Clone, Debug, Default)]
pub struct ContentCache {
    inner: Arc<RwLock<Collections>>,
}

impl ContentCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Collections> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Collections> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn deals(&self) -> Vec<Deal> {
        self.read().deals.clone()
    }

    pub fn set_deals(&self, deals: Vec<Deal>) {
        self.write().deals = deals;
    }

    pub fn itinerary(&self, sheet_id: &str) -> Option<Itinerary> {
        self.read()
            .itineraries
            .iter()
            .find(|itinerary| itinerary.itinerary_sheet_id == sheet_id)
            .cloned()
    }

    pub fn itineraries(&self) -> Vec<Itinerary> {
        self.read().itineraries.clone()
    }

    /// Returns false when an itinerary for the same sheet is already stored.
    pub fn append_itinerary(&self, itinerary: Itinerary) -> bool {
        let mut collections = self.write();
        if collections
            .itineraries
            .iter()
            .any(|stored| stored.itinerary_sheet_id == itinerary.itinerary_sheet_id)
        {
            return false;
        }
        collections.itineraries.push(itinerary);
        true
    }

    pub fn recommendations(&self) -> Vec<Recommendation> {
        self.read().recommendations.clone()
    }

    pub fn set_recommendations(&self, recommendations: Vec<Recommendation>) {
        self.write().recommendations = recommendations;
    }

    pub fn gallery_items(&self) -> Vec<GalleryItem> {
        self.read().gallery_items.clone()
    }

    pub fn set_gallery_items(&self, gallery_items: Vec<GalleryItem>) {
        self.write().gallery_items = gallery_items;
    }

    pub fn selected_countries(&self) -> Vec<String> {
        self.read().selected_countries.clone()
    }

    pub fn add_selected_country(&self, country: impl Into<String>) {
        let country = country.into();
        let mut collections = self.write();
        if !collections.selected_countries.contains(&country) {
            collections.selected_countries.push(country);
        }
    }

    pub fn set_selected_countries(&self, countries: Vec<String>) {
        let mut deduped: Vec<String> = Vec::with_capacity(countries.len());
        for country in countries {
            if !deduped.contains(&country) {
                deduped.push(country);
            }
        }
        self.write().selected_countries = deduped;
    }

    pub fn clear_selected_countries(&self) {
        self.write().selected_countries.clear();
    }
}
