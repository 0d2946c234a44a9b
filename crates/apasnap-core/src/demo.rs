use rand::Rng;

use crate::media::{MediaItem, MediaType};

const DEMO_IMAGES: &[&str] = &[
    "https://picsum.photos/id/10/800/600",
    "https://picsum.photos/id/11/800/1200",
    "https://picsum.photos/id/12/1200/800",
    "https://picsum.photos/id/13/800/800",
    "https://picsum.photos/id/14/800/600",
    "https://picsum.photos/id/15/600/900",
    "https://picsum.photos/id/16/900/600",
    "https://picsum.photos/id/17/800/800",
    "https://picsum.photos/id/18/1200/900",
    "https://picsum.photos/id/19/800/1200",
];

const DEMO_DATE: &str = "2023-10-27 14:30";

/// Fixed sample collection for trying the gallery without a server.
pub fn demo_items() -> Vec<MediaItem> {
    let mut rng = rand::thread_rng();
    DEMO_IMAGES
        .iter()
        .enumerate()
        .map(|(i, url)| {
            let size_kb: u32 = rng.gen_range(100..600);
            MediaItem::new(format!("demo-{i}"), format!("demo_photo_{}.jpg", i + 1), *url, MediaType::Image)
                .with_size(format!("{size_kb}K"))
                .with_date(DEMO_DATE)
        })
        .collect()
}
