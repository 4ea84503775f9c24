use crate::models::{Deal, MediaLink};

pub fn image_links(media: &[MediaLink]) -> Vec<MediaLink> {
    media.iter().filter(|link| link.is_image()).cloned().collect()
}

pub fn count_images_in_deals(deals: &[Deal]) -> usize {
    deals
        .iter()
        .map(|deal| deal.media_links.iter().filter(|link| link.is_image()).count())
        .sum()
}

/// Cover image for a deal card: its first image link.
pub fn first_image(deal: &Deal) -> Option<&str> {
    deal.media_links
        .iter()
        .find(|link| link.is_image())
        .map(|link| link.url.as_str())
}
