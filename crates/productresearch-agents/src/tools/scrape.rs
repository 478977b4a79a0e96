use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use productresearch_core::ScrapeConfig;
use regex::Regex;
use reqwest::Client;

use super::{snippet, FetchedPage, PageFetcher};

static TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<title\b[^>]*>(.*?)</title\s*>").expect("invalid title regex"));

/// Wrap width for rendered text; wide enough that paragraphs stay on one line.
const RENDER_WIDTH: usize = 400;

fn render(html: &str) -> String {
    html2text::from_read(html.as_bytes(), RENDER_WIDTH)
}

fn collapse(line: &str) -> String {
    line.split(|c: char| c.is_whitespace() || c == '\u{a0}')
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Reduce an HTML document to readable text. Scripts, styles and comments
/// are dropped, entities are decoded, whitespace is collapsed per line and
/// empty lines are discarded.
pub fn html_to_text(html: &str) -> String {
    render(html)
        .lines()
        .map(collapse)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn extract_title(html: &str) -> Option<String> {
    TITLE
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| collapse(&render(m.as_str())))
        .filter(|title| !title.is_empty())
}

fn truncate_chars(text: String, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text,
    }
}

/// Fetches pages over HTTP and reduces them to text.
#[derive(Clone)]
pub struct HttpScraper {
    http: Client,
    max_chars: usize,
}

impl HttpScraper {
    pub fn new(config: &ScrapeConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .context("failed to build scraper http client")?;
        Ok(Self {
            http,
            max_chars: config.max_chars_per_page,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpScraper {
    async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .with_context(|| format!("failed to fetch {url}"))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .with_context(|| format!("failed to read body of {url}"))?;
        if !status.is_success() {
            bail!("{url} returned {status}: {}", snippet(&body, 120));
        }

        let text = truncate_chars(html_to_text(&body), self.max_chars);
        tracing::debug!(target: "tools.scrape", url = %url, chars = text.chars().count(), "page reduced");

        Ok(FetchedPage {
            url: url.to_string(),
            title: extract_title(&body),
            text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PAGE: &str = r#"<!doctype html>
<html><head><title> Acme Phone &amp; Case </title>
<style>body { color: red; }</style>
<script type="text/javascript">var tracking = "do not keep";</script>
</head>
<body>
<!-- navigation -->
<h1>Acme Phone</h1>
<p>Battery: 5000&nbsp;mAh</p><p>Price: &lt;$999&gt;</p>
<ul><li>6.7" display</li><li>USB-C</li></ul>
</body></html>"#;

    #[test]
    fn html_reduction_drops_scripts_styles_and_tags() {
        let text = html_to_text(PAGE);
        assert!(!text.contains("tracking"));
        assert!(!text.contains("color: red"));
        assert!(!text.contains("navigation"));
        assert!(text.contains("Acme Phone"));
        assert!(text.contains("Battery: 5000 mAh"));
        assert!(text.contains("Price: <$999>"));
        assert!(text.contains("6.7\" display"));
        assert!(text.lines().all(|line| !line.trim().is_empty()));
    }

    #[test]
    fn numeric_and_named_entities_are_decoded() {
        let text = html_to_text("<p>It&#8217;s &#36;999 &mdash; caf&eacute; &#x27;pro&#x27;</p>");
        assert_eq!(text, "It\u{2019}s $999 \u{2014} caf\u{e9} 'pro'");
    }

    #[test]
    fn script_body_is_dropped_even_with_closing_tag_literals() {
        let text = html_to_text(
            "<script>var s = \"</style>\"; track();</script><style>p { x: 1 }</style><p>Specs</p>",
        );
        assert_eq!(text, "Specs");
    }

    #[test]
    fn title_is_decoded() {
        assert_eq!(extract_title(PAGE).as_deref(), Some("Acme Phone & Case"));
        assert_eq!(extract_title("<p>no title</p>"), None);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo wörld".to_string(), 4), "héll");
        assert_eq!(truncate_chars("short".to_string(), 10), "short");
    }

    #[tokio::test]
    async fn fetch_reduces_and_truncates() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/phone"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_string(PAGE),
            )
            .mount(&server)
            .await;

        let scraper = HttpScraper::new(&ScrapeConfig {
            max_chars_per_page: 10,
            ..ScrapeConfig::default()
        })?;
        let page = scraper.fetch(&format!("{}/phone", server.uri())).await?;

        assert_eq!(page.title.as_deref(), Some("Acme Phone & Case"));
        assert_eq!(page.text.chars().count(), 10);
        Ok(())
    }

    #[tokio::test]
    async fn error_status_fails_fetch() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gone"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not here"))
            .mount(&server)
            .await;

        let scraper = HttpScraper::new(&ScrapeConfig::default())?;
        let err = scraper
            .fetch(&format!("{}/gone", server.uri()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("404"));
        Ok(())
    }
}
