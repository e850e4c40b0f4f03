use crate::traits::ArticleExtractor;
use crate::types::{AggregatorError, FullArticle, Result};
use crate::Fetcher;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use std::sync::Arc;
use tracing::{debug, instrument};
use url::Url;

static OG_TITLE: Lazy<Selector> = Lazy::new(|| selector(r#"meta[property="og:title"]"#));
static H1: Lazy<Selector> = Lazy::new(|| selector("h1"));
static TITLE: Lazy<Selector> = Lazy::new(|| selector("title"));
static OG_IMAGE: Lazy<Selector> = Lazy::new(|| selector(r#"meta[property="og:image"]"#));
static TWITTER_IMAGE: Lazy<Selector> = Lazy::new(|| selector(r#"meta[name="twitter:image"]"#));
static IMAGE_SRC: Lazy<Selector> = Lazy::new(|| selector(r#"link[rel="image_src"]"#));
static ARTICLE: Lazy<Selector> = Lazy::new(|| selector("article"));
static PARAGRAPH: Lazy<Selector> = Lazy::new(|| selector("p"));

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector is valid")
}

/// Downloads an article page and pulls out its title, body and lead image.
pub struct HttpArticleExtractor {
    fetcher: Arc<Fetcher>,
}

impl HttpArticleExtractor {
    pub fn new(fetcher: Arc<Fetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl ArticleExtractor for HttpArticleExtractor {
    #[instrument(level = "debug", skip(self))]
    async fn extract(&self, link: &str) -> Result<FullArticle> {
        let html = self.fetcher.fetch_page(link).await?;
        let article = extract_from_html(link, html)?;
        debug!(
            words = article.body_text.split_whitespace().count(),
            has_image = article.top_image.is_some(),
            "Extracted article"
        );
        Ok(article)
    }
}

/// Parse an already downloaded page.
pub fn extract_from_html(page_url: &str, html: String) -> Result<FullArticle> {
    let document = Html::parse_document(&html);

    let body_text = extract_body(&document);
    if body_text.is_empty() {
        return Err(AggregatorError::Extraction(format!("no article text found at {}", page_url)));
    }

    let title = meta_content(&document, &OG_TITLE)
        .or_else(|| first_text(&document, &H1))
        .or_else(|| first_text(&document, &TITLE));

    let top_image = meta_content(&document, &OG_IMAGE)
        .or_else(|| meta_content(&document, &TWITTER_IMAGE))
        .or_else(|| {
            document
                .select(&IMAGE_SRC)
                .find_map(|el| el.value().attr("href"))
                .map(|href| href.trim().to_string())
                .filter(|href| !href.is_empty())
        })
        .map(|src| resolve(page_url, &src));

    Ok(FullArticle {
        title,
        body_text,
        html,
        top_image,
    })
}

fn extract_body(document: &Html) -> String {
    if let Some(article) = document.select(&ARTICLE).next() {
        let text = join_paragraphs(article.select(&PARAGRAPH));
        if !text.is_empty() {
            return text;
        }
    }
    join_paragraphs(document.select(&PARAGRAPH))
}

fn join_paragraphs<'a>(paragraphs: impl Iterator<Item = ElementRef<'a>>) -> String {
    paragraphs
        .map(element_text)
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .map(element_text)
        .find(|text| !text.is_empty())
}

fn meta_content(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .filter_map(|el| el.value().attr("content"))
        .map(str::trim)
        .find(|content| !content.is_empty())
        .map(str::to_string)
}

fn resolve(page_url: &str, src: &str) -> String {
    match Url::parse(page_url).and_then(|base| base.join(src)) {
        Ok(url) => url.to_string(),
        Err(_) => src.to_string(),
    }
}
