//! Corpus builder: scrapes the catalog page for course links, then each
//! course detail page for its description.
//!
//! Pages are fetched sequentially with no retries. A failure fetching
//! the catalog page is fatal for the run; a course page that answers
//! with an error status or lacks a description block degrades to a
//! sentinel string.

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info};
use url::Url;

use crate::errors::{Result, ScoutError};
use crate::types::RawCourse;

/// Sentinel stored when a course page has no description block.
pub const NO_DESCRIPTION: &str = "No description found";

/// Course links on the catalog page point at the course search.
const COURSE_LINK_MARKER: &str = "/search/?";

#[derive(Debug, Clone, PartialEq)]
struct CourseLink {
    number: String,
    title: String,
    href: String,
}

pub struct CatalogScraper {
    http: reqwest::Client,
}

impl CatalogScraper {
    pub fn new() -> Self {
        CatalogScraper {
            http: reqwest::Client::new(),
        }
    }

    /// Scrape the full corpus starting from the catalog page.
    pub async fn scrape(&self, catalog_url: &str) -> Result<Vec<RawCourse>> {
        let base = Url::parse(catalog_url)
            .map_err(|e| ScoutError::Parse(format!("invalid catalog url {catalog_url}: {e}")))?;

        let page = self
            .http
            .get(catalog_url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        let links = extract_course_links(&page)?;
        info!(count = links.len(), "found course links on catalog page");

        let mut courses = Vec::with_capacity(links.len());
        for link in links {
            let course_url = base
                .join(&link.href)
                .map_err(|e| ScoutError::Parse(format!("invalid course href {}: {e}", link.href)))?;

            // Error-status course pages are not fatal: their body simply has
            // no description block, so the course degrades to the sentinel.
            let course_page = self
                .http
                .get(course_url.clone())
                .send()
                .await?
                .text()
                .await?;
            let description = extract_description(&course_page);
            debug!(url = %course_url, number = %link.number, "scraped course page");

            courses.push(RawCourse {
                text: format!("{}. {}", link.number, link.title),
                url: course_url.to_string(),
                description,
            });
        }

        Ok(courses)
    }
}

impl Default for CatalogScraper {
    fn default() -> Self {
        Self::new()
    }
}

/// Pull course number/title/href triples out of the catalog page. The
/// number is the anchor text; the title sits in the next table cell.
fn extract_course_links(html: &str) -> Result<Vec<CourseLink>> {
    let document = Html::parse_document(html);
    let anchor_selector = Selector::parse("a[href]")
        .map_err(|e| ScoutError::Parse(format!("bad selector: {e}")))?;

    let mut links = Vec::new();
    for anchor in document.select(&anchor_selector) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        if !href.contains(COURSE_LINK_MARKER) {
            continue;
        }

        let number = collect_text(&anchor);
        let title = enclosing_cell(&anchor)
            .and_then(next_cell)
            .map(|td| collect_text(&td))
            .unwrap_or_default();

        links.push(CourseLink {
            number,
            title,
            href: href.to_string(),
        });
    }

    Ok(links)
}

/// Text of the first `div.courseblock`, or the sentinel when absent.
fn extract_description(html: &str) -> String {
    let document = Html::parse_document(html);
    let selector = match Selector::parse("div.courseblock") {
        Ok(s) => s,
        Err(_) => return NO_DESCRIPTION.to_string(),
    };
    document
        .select(&selector)
        .next()
        .map(|block| collect_text(&block))
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| NO_DESCRIPTION.to_string())
}

fn collect_text(element: &ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Nearest `<td>` ancestor of an element.
fn enclosing_cell<'a>(element: &ElementRef<'a>) -> Option<ElementRef<'a>> {
    let mut node = element.parent()?;
    loop {
        if let Some(el) = ElementRef::wrap(node) {
            if el.value().name() == "td" {
                return Some(el);
            }
        }
        node = node.parent()?;
    }
}

/// Next sibling `<td>` of a table cell.
fn next_cell(cell: ElementRef<'_>) -> Option<ElementRef<'_>> {
    let mut sibling = cell.next_sibling();
    while let Some(node) = sibling {
        if let Some(el) = ElementRef::wrap(node) {
            if el.value().name() == "td" {
                return Some(el);
            }
        }
        sibling = node.next_sibling();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG_FIXTURE: &str = r#"
        <html><body><table>
          <tr>
            <td class="codecol"><a href="/search/?P=DS%205110">DS 5110</a></td>
            <td>Introduction to Data Management and Processing. (4 Hours)</td>
          </tr>
          <tr>
            <td class="codecol"><a href="/search/?P=DS%205220">DS 5220</a></td>
            <td>Supervised Machine Learning. (4 Hours)</td>
          </tr>
          <tr>
            <td><a href="/other/page">Not a course</a></td>
          </tr>
        </table></body></html>
    "#;

    #[test]
    fn test_extract_course_links() {
        let links = extract_course_links(CATALOG_FIXTURE).unwrap();
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].number, "DS 5110");
        assert_eq!(
            links[0].title,
            "Introduction to Data Management and Processing. (4 Hours)"
        );
        assert_eq!(links[0].href, "/search/?P=DS%205110");
        assert_eq!(links[1].number, "DS 5220");
    }

    #[test]
    fn test_link_without_sibling_cell_gets_empty_title() {
        let html = r#"<table><tr><td><a href="/search/?P=X">X 1</a></td></tr></table>"#;
        let links = extract_course_links(html).unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].title, "");
    }

    #[test]
    fn test_extract_description() {
        let html = r#"
            <html><body>
              <div class="courseblock">DS 5110. Intro. (4 Hours)
                Covers ingestion, storage, and processing of data.</div>
            </body></html>
        "#;
        let description = extract_description(html);
        assert!(description.contains("ingestion, storage, and processing"));
    }

    #[test]
    fn test_missing_description_block_degrades_to_sentinel() {
        assert_eq!(
            extract_description("<html><body><p>nothing here</p></body></html>"),
            NO_DESCRIPTION
        );
    }

    /// Serves a two-course catalog where one course page answers 404.
    async fn spawn_stub_catalog() -> String {
        use axum::http::StatusCode;
        use axum::response::Html;
        use axum::routing::get;
        use axum::Router;

        let catalog = r#"
            <html><body><table>
              <tr>
                <td class="codecol"><a href="/search/?P=DS%205110">DS 5110</a></td>
                <td>Data Management. (4 Hours)</td>
              </tr>
              <tr>
                <td class="codecol"><a href="/search/?P=DS%209999">DS 9999</a></td>
                <td>Retired Course. (4 Hours)</td>
              </tr>
            </table></body></html>
        "#;

        let app = Router::new()
            .route("/catalog", get(move || async move { Html(catalog) }))
            .route(
                "/search/",
                get(|query: axum::extract::RawQuery| async move {
                    if query.0.as_deref() == Some("P=DS%205110") {
                        (
                            StatusCode::OK,
                            Html(r#"<div class="courseblock">Covers data pipelines.</div>"#),
                        )
                    } else {
                        (StatusCode::NOT_FOUND, Html("<html><body>Not found</body></html>"))
                    }
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/catalog")
    }

    #[tokio::test]
    async fn test_error_status_course_page_degrades_to_sentinel() {
        let catalog_url = spawn_stub_catalog().await;
        let courses = CatalogScraper::new().scrape(&catalog_url).await.unwrap();

        // The 404 course page does not abort the run; it keeps its row
        // with the sentinel description while the healthy course parses
        assert_eq!(courses.len(), 2);
        assert_eq!(courses[0].text, "DS 5110. Data Management. (4 Hours)");
        assert!(courses[0].description.contains("data pipelines"));
        assert_eq!(courses[1].text, "DS 9999. Retired Course. (4 Hours)");
        assert_eq!(courses[1].description, NO_DESCRIPTION);
    }
}
