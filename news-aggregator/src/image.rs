use crate::types::FullArticle;
use once_cell::sync::Lazy;
use regex::Regex;

/// Stored when neither the extractor nor the page markup offers an image.
pub const PLACEHOLDER_IMAGE_URL: &str =
    "https://via.placeholder.com/1200x600/006400/ffffff?text=HABARI+ZA+SIASA+KENYA";

/// Shorter top images are usually tracking pixels or relative stubs.
const MIN_TOP_IMAGE_LEN: usize = 30;

static IMG_SRC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<img\b[^>]*?\ssrc\s*=\s*["'](https?://[^"'\s>]+?\.(?:jpe?g|png|gif|webp))["']"#)
        .expect("static regex is valid")
});

/// Pick the lead image for an article.
///
/// Order: the extractor's top image when it looks real, then the first
/// `<img>` in the markup with a known raster extension, then
/// [`PLACEHOLDER_IMAGE_URL`]. Never returns an empty string.
pub fn select_image(article: &FullArticle) -> String {
    if let Some(top) = article.top_image.as_deref() {
        if is_usable_top_image(top) {
            return top.to_string();
        }
    }

    first_markup_image(&article.html).unwrap_or_else(|| PLACEHOLDER_IMAGE_URL.to_string())
}

fn is_usable_top_image(url: &str) -> bool {
    url.chars().count() > MIN_TOP_IMAGE_LEN && !url.to_lowercase().contains("placeholder")
}

/// First image tag source in document order with a jpg/jpeg/png/gif/webp URL.
pub fn first_markup_image(html: &str) -> Option<String> {
    IMG_SRC
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
