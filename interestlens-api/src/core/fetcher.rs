use async_trait::async_trait;
use interestlens_core::{ArticleContent, ArticleExtractor, CoreError, Result};
use once_cell::sync::Lazy;
use regex::Regex;

static TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("valid regex"));
static META: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<meta\s+[^>]*?(?:name|property)\s*=\s*["']([^"']+)["'][^>]*?content\s*=\s*["']([^"']*)["'][^>]*>"#)
        .expect("valid regex")
});
static SKIPPED_BLOCKS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(script|style|noscript|nav|header|footer|aside)[^>]*>.*?</(script|style|noscript|nav|header|footer|aside)>")
        .expect("valid regex")
});
static ARTICLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<article[^>]*>(.*?)</article>").expect("valid regex"));
static PARAGRAPH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<p[^>]*>(.*?)</p>").expect("valid regex"));
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]+>").expect("valid regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Minimum body length for a readable-article extraction to count as a success
const MIN_ARTICLE_CHARS: usize = 200;

/// How much of the page is kept as body text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMode {
    /// Paragraphs inside `<article>` (or the whole page when absent); fails on thin pages
    Readable,
    /// Every visible text node
    FullPage,
}

/// Plain HTTP article fetcher with regex-based HTML extraction
#[derive(Clone)]
pub struct HttpArticleFetcher {
    client: reqwest::Client,
    mode: ExtractionMode,
}

impl HttpArticleFetcher {
    pub fn new(client: reqwest::Client, mode: ExtractionMode) -> Self {
        Self { client, mode }
    }

    async fn download(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| CoreError::collaborator(self.name(), e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CoreError::collaborator(
                self.name(),
                format!("{url} returned {status}"),
            ));
        }

        response
            .text()
            .await
            .map_err(|e| CoreError::collaborator(self.name(), e.to_string()))
    }
}

#[async_trait]
impl ArticleExtractor for HttpArticleFetcher {
    fn name(&self) -> &str {
        match self.mode {
            ExtractionMode::Readable => "readable-fetcher",
            ExtractionMode::FullPage => "full-page-fetcher",
        }
    }

    async fn extract(&self, url: &str) -> Result<ArticleContent> {
        let html = self.download(url).await?;
        parse_article(url, &html, self.mode)
            .ok_or_else(|| CoreError::collaborator(self.name(), "no readable content"))
    }
}

/// Extracts title, byline metadata and body text from an HTML document
pub fn parse_article(url: &str, html: &str, mode: ExtractionMode) -> Option<ArticleContent> {
    let meta = |names: &[&str]| -> Option<String> {
        META.captures_iter(html)
            .find(|c| names.iter().any(|n| c[1].eq_ignore_ascii_case(n)))
            .map(|c| clean_text(&c[2]))
            .filter(|v| !v.is_empty())
    };

    let title = meta(&["og:title"])
        .or_else(|| TITLE.captures(html).map(|c| clean_text(&c[1])))
        .unwrap_or_default();

    let cleaned = SKIPPED_BLOCKS.replace_all(html, " ");
    let full_text = match mode {
        ExtractionMode::Readable => {
            let scope = ARTICLE
                .captures(&cleaned)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str())
                .unwrap_or(cleaned.as_ref());
            let body = PARAGRAPH
                .captures_iter(scope)
                .map(|c| clean_text(&c[1]))
                .filter(|p| !p.is_empty())
                .collect::<Vec<_>>()
                .join("\n\n");
            if body.chars().count() < MIN_ARTICLE_CHARS {
                return None;
            }
            body
        },
        ExtractionMode::FullPage => clean_text(&cleaned),
    };

    if title.is_empty() && full_text.is_empty() {
        return None;
    }

    let mut article = ArticleContent::new(url, title, full_text);
    article.author = meta(&["author", "article:author"]);
    article.publication_date = meta(&["article:published_time", "date", "pubdate"]);
    article.source_name = meta(&["og:site_name", "application-name"]);
    Some(article)
}

fn clean_text(fragment: &str) -> String {
    let stripped = TAG.replace_all(fragment, " ");
    let decoded = decode_entities(&stripped);
    WHITESPACE.replace_all(decoded.trim(), " ").into_owned()
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
