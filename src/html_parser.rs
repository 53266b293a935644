use select::document::Document;
use select::predicate::Name;
use tracing::debug;
use url::Url;

/// A terminal asset referenced by a page.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceLink {
    pub url: Url,
    pub resource_type: ResourceType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
    Script,
    Stylesheet,
    Image,
}

/// A reference that could not be resolved to a URL.
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidReference {
    pub raw: String,
    pub error: url::ParseError,
}

/// Outbound references of one page, in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageContent {
    pub links: Vec<Url>,
    pub resources: Vec<ResourceLink>,
    /// Malformed `href`/`src` values, reported by the caller.
    pub invalid: Vec<InvalidReference>,
}

impl PageContent {
    pub fn resource_urls(&self) -> impl Iterator<Item = &Url> {
        self.resources.iter().map(|r| &r.url)
    }
}

/// Extracts anchors, scripts, stylesheets and images from `html`, resolved
/// against `page_url` (or the document's `<base href>` when present).
pub fn extract_page_content(html: &str, page_url: &Url) -> PageContent {
    HtmlParser::new(page_url.clone()).extract(html)
}

#[derive(Clone, Debug)]
pub struct HtmlParser {
    base_url: Url,
}

impl HtmlParser {
    pub fn new(base_url: Url) -> Self {
        Self { base_url }
    }

    pub fn extract(&self, html_content: &str) -> PageContent {
        let document = Document::from(html_content);
        let mut content = PageContent::default();

        let base_href = document
            .find(Name("base"))
            .filter_map(|base| base.attr("href"))
            .next();
        let parser = match base_href.and_then(|href| self.resolve_or_record(href, &mut content.invalid)) {
            Some(base_url) => HtmlParser::new(base_url),
            None => self.clone(),
        };

        for script in document.find(Name("script")) {
            if let Some(src) = script.attr("src") {
                parser.push_resource(&mut content, src, ResourceType::Script);
            }
        }

        for link in document.find(Name("link")) {
            let is_stylesheet = link
                .attr("rel")
                .map(|rel| {
                    rel.split_ascii_whitespace()
                        .any(|r| r.eq_ignore_ascii_case("stylesheet"))
                })
                .unwrap_or(false);
            if !is_stylesheet {
                continue;
            }
            if let Some(href) = link.attr("href") {
                parser.push_resource(&mut content, href, ResourceType::Stylesheet);
            }
        }

        for img in document.find(Name("img")) {
            if let Some(src) = img.attr("src") {
                parser.push_resource(&mut content, src, ResourceType::Image);
            }
        }

        for href in document.find(Name("a")).filter_map(|a| a.attr("href")) {
            if let Some(url) = parser.resolve_or_record(href, &mut content.invalid) {
                content.links.push(url);
            }
        }

        content
    }

    fn push_resource(&self, content: &mut PageContent, raw: &str, resource_type: ResourceType) {
        if let Some(url) = self.resolve_or_record(raw, &mut content.invalid) {
            content.resources.push(ResourceLink { url, resource_type });
        }
    }

    fn resolve_or_record(&self, raw: &str, invalid: &mut Vec<InvalidReference>) -> Option<Url> {
        match self.resolve(raw) {
            Ok(url) => url,
            Err(error) => {
                invalid.push(InvalidReference {
                    raw: raw.trim().to_string(),
                    error,
                });
                None
            }
        }
    }

    /// Resolves a reference to an absolute http(s) URL. Empty, unparseable and
    /// non-web references (`mailto:`, `javascript:`, `data:`) yield `None`.
    pub fn resolve_url(&self, raw: &str) -> Option<Url> {
        self.resolve(raw).ok().flatten()
    }

    /// Like [`HtmlParser::resolve_url`], but keeps the parse error.
    pub fn resolve(&self, raw: &str) -> Result<Option<Url>, url::ParseError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(None);
        }

        let url = self.base_url.join(raw)?;
        if matches!(url.scheme(), "http" | "https") {
            Ok(Some(url))
        } else {
            debug!("Skipping non-web reference {}", url);
            Ok(None)
        }
    }
}
