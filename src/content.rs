//! Check-then-fetch orchestration on top of the cache.
//!
//! Each fetch consults the cache first; on a miss it reads the sheet,
//! normalizes it and stores the result. Concurrent first fetches are not
//! coalesced: each one downloads and the last write wins.

use std::sync::Arc;

use tracing::{info, warn};

use crate::cache::ContentCache;
use crate::error::Result;
use crate::media::count_images_in_deals;
use crate::models::{Deal, GalleryItem, Itinerary, Recommendation};
use crate::normalize::{
    build_itinerary, normalize_deals, normalize_gallery_items, normalize_recommendations,
    DEALS_SHEET, GALLERY_SHEET, RECOMMENDATIONS_SHEET,
};
use crate::spreadsheet::SheetSource;

/// What a `preload` managed to warm.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Preloaded {
    pub collections: usize,
    /// Image links across the loaded deals and gallery items.
    pub images: usize,
}

#[derive(Clone)]
pub struct ContentService {
    source: Arc<dyn SheetSource>,
    cache: ContentCache,
}

impl ContentService {
    pub fn new(source: Arc<dyn SheetSource>, cache: ContentCache) -> Self {
        Self { source, cache }
    }

    pub fn cache(&self) -> &ContentCache {
        &self.cache
    }

    pub async fn fetch_deals(&self) -> Result<Vec<Deal>> {
        let deals = self.cache.deals();
        if !deals.is_empty() {
            return Ok(deals);
        }

        info!("Deals not cached, reading sheet {}", DEALS_SHEET);
        let deals = normalize_deals(self.source.fetch_sheet(DEALS_SHEET).await?)?;
        info!("Got {} deals", deals.len());
        self.cache.set_deals(deals.clone());
        Ok(deals)
    }

    pub async fn fetch_deal(&self, id: i64) -> Result<Option<Deal>> {
        Ok(self
            .fetch_deals()
            .await?
            .into_iter()
            .find(|deal| deal.id == Some(id)))
    }

    pub async fn fetch_itinerary(&self, sheet_id: &str) -> Result<Itinerary> {
        if let Some(itinerary) = self.cache.itinerary(sheet_id) {
            return Ok(itinerary);
        }

        info!("Itinerary {} not cached, reading its sheet", sheet_id);
        let itinerary = build_itinerary(self.source.fetch_sheet(sheet_id).await?, sheet_id)?;
        info!("Itinerary {} has {} days", sheet_id, itinerary.days.len());
        self.cache.append_itinerary(itinerary.clone());
        Ok(itinerary)
    }

    pub async fn fetch_recommendations(&self) -> Result<Vec<Recommendation>> {
        let recommendations = self.cache.recommendations();
        if !recommendations.is_empty() {
            return Ok(recommendations);
        }

        info!("Recommendations not cached, reading sheet {}", RECOMMENDATIONS_SHEET);
        let recommendations =
            normalize_recommendations(self.source.fetch_sheet(RECOMMENDATIONS_SHEET).await?)?;
        self.cache.set_recommendations(recommendations.clone());
        Ok(recommendations)
    }

    pub async fn fetch_gallery_items(&self) -> Result<Vec<GalleryItem>> {
        let items = self.cache.gallery_items();
        if !items.is_empty() {
            return Ok(items);
        }

        info!("Gallery not cached, reading sheet {}", GALLERY_SHEET);
        let items = normalize_gallery_items(self.source.fetch_sheet(GALLERY_SHEET).await?)?;
        self.cache.set_gallery_items(items.clone());
        Ok(items)
    }

    /// Warms the deals, gallery and recommendations collections together.
    ///
    /// Waits for all three with no timeout.
    pub async fn preload(&self) -> Preloaded {
        let (deals, gallery, recommendations) = futures::join!(
            self.fetch_deals(),
            self.fetch_gallery_items(),
            self.fetch_recommendations(),
        );

        let mut loaded = Preloaded::default();
        match deals {
            Ok(deals) => {
                let images = count_images_in_deals(&deals);
                info!("Preloaded {} deals with {} images", deals.len(), images);
                loaded.collections += 1;
                loaded.images += images;
            }
            Err(err) => warn!("Failed to preload deals: {}", err),
        }
        match gallery {
            Ok(items) => {
                let images: usize = items.iter().map(|item| item.images.len()).sum();
                info!("Preloaded {} gallery items with {} images", items.len(), images);
                loaded.collections += 1;
                loaded.images += images;
            }
            Err(err) => warn!("Failed to preload gallery: {}", err),
        }
        match recommendations {
            Ok(recommendations) => {
                info!("Preloaded {} recommendations", recommendations.len());
                loaded.collections += 1;
            }
            Err(err) => warn!("Failed to preload recommendations: {}", err),
        }
        loaded
    }
}

/// Distinct countries in order of first appearance.
pub fn countries(deals: &[Deal]) -> Vec<String> {
    let mut countries: Vec<String> = Vec::new();
    for deal in deals {
        if !countries.contains(&deal.country) {
            countries.push(deal.country.clone());
        }
    }
    countries
}

/// Deals in the selected countries, or every deal when nothing is selected.
pub fn filter_by_countries(deals: Vec<Deal>, selected: &[String]) -> Vec<Deal> {
    if selected.is_empty() {
        return deals;
    }
    deals
        .into_iter()
        .filter(|deal| selected.contains(&deal.country))
        .collect()
}
