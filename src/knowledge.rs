//! Encyclopedia summaries from Wikipedia.
//!
//! Lookups never fail loudly: any network error, missing page or
//! disambiguation page becomes `None` and the caller falls back to a web search.

use crate::Result;
use serde::Deserialize;
use std::time::Duration;

/// Provider of short topic summaries.
pub trait KnowledgeSource {
    fn summarize(&self, topic: &str, sentences: usize) -> Option<String>;
}

#[derive(Deserialize)]
struct PageSummary {
    #[serde(rename = "type", default)]
    page_type: String,
    #[serde(default)]
    extract: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    query: SearchQuery,
}

#[derive(Deserialize)]
struct SearchQuery {
    search: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct SearchHit {
    title: String,
}

pub struct Wikipedia {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl Wikipedia {
    /// `base_url` is the wiki root, e.g. `https://en.wikipedia.org`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("vox-assistant/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetches the lead extract of a page, `None` for missing or disambiguation pages.
    fn page_extract(&self, title: &str) -> Result<Option<String>> {
        let url = format!(
            "{}/api/rest_v1/page/summary/{}",
            self.base_url,
            urlencoding::encode(&title.replace(' ', "_"))
        );
        let resp = self.client.get(&url).send()?;
        if !resp.status().is_success() {
            tracing::debug!(status = %resp.status(), %title, "no summary page");
            return Ok(None);
        }

        let summary: PageSummary = resp.json()?;
        if summary.page_type == "disambiguation" || summary.extract.trim().is_empty() {
            tracing::debug!(%title, page_type = %summary.page_type, "summary unusable");
            return Ok(None);
        }
        Ok(Some(summary.extract))
    }

    /// Resolves free text to the best matching page title.
    fn search_title(&self, topic: &str) -> Result<Option<String>> {
        let url = format!("{}/w/api.php", self.base_url);
        let resp = self
            .client
            .get(&url)
            .query(&[
                ("action", "query"),
                ("list", "search"),
                ("srsearch", topic),
                ("srlimit", "1"),
                ("format", "json"),
            ])
            .send()?
            .error_for_status()?;
        let found: SearchResponse = resp.json()?;
        Ok(found.query.search.into_iter().next().map(|hit| hit.title))
    }

    fn lookup(&self, topic: &str) -> Result<Option<String>> {
        if let Some(extract) = self.page_extract(topic)? {
            return Ok(Some(extract));
        }
        match self.search_title(topic)? {
            Some(title) if !title.eq_ignore_ascii_case(topic) => self.page_extract(&title),
            _ => Ok(None),
        }
    }
}

impl KnowledgeSource for Wikipedia {
    fn summarize(&self, topic: &str, sentences: usize) -> Option<String> {
        let topic = topic.trim();
        if topic.is_empty() {
            return None;
        }
        match self.lookup(topic) {
            Ok(Some(extract)) => Some(first_sentences(&extract, sentences)),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, %topic, "knowledge lookup failed");
                None
            }
        }
    }
}

/// Keeps the first `count` sentences of `text`.
pub fn first_sentences(text: &str, count: usize) -> String {
    let text = text.trim();
    let mut seen = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((idx, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?') {
            let at_boundary = chars.peek().map_or(true, |(_, next)| next.is_whitespace());
            if at_boundary {
                seen += 1;
                if seen >= count {
                    return text[..idx + c.len_utf8()].to_string();
                }
            }
        }
    }
    text.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_sentences_truncates() {
        let text = "One. Two! Three? Four.";
        assert_eq!(first_sentences(text, 2), "One. Two!");
        assert_eq!(first_sentences(text, 10), text);
    }

    #[test]
    fn decimal_points_are_not_sentence_ends() {
        let text = "It is 330.0 metres tall. It opened in 1889.";
        assert_eq!(first_sentences(text, 1), "It is 330.0 metres tall.");
    }

    #[test]
    fn summary_is_fetched_and_trimmed() {
        let mut server = mockito::Server::new();
        let _m = server
            .mock("GET", "/api/rest_v1/page/summary/the_eiffel_tower")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"type":"standard","extract":"The Eiffel Tower is a tower. It is in Paris. It is iron."}"#,
            )
            .create();

        let wiki = Wikipedia::new(&server.url(), Duration::from_secs(2)).unwrap();
        assert_eq!(
            wiki.summarize("the eiffel tower", 2).as_deref(),
            Some("The Eiffel Tower is a tower. It is in Paris.")
        );
    }

    #[test]
    fn missing_page_falls_back_to_search() {
        let mut server = mockito::Server::new();
        let _missing = server
            .mock("GET", "/api/rest_v1/page/summary/rustlang")
            .with_status(404)
            .create();
        let _search = server
            .mock("GET", "/w/api.php")
            .match_query(mockito::Matcher::UrlEncoded(
                "srsearch".into(),
                "rustlang".into(),
            ))
            .with_status(200)
            .with_body(r#"{"query":{"search":[{"title":"Rust (programming language)"}]}}"#)
            .create();
        let _found = server
            .mock(
                "GET",
                mockito::Matcher::Regex(r"^/api/rest_v1/page/summary/Rust_".to_string()),
            )
            .with_status(200)
            .with_body(r#"{"type":"standard","extract":"Rust is a language."}"#)
            .create();

        let wiki = Wikipedia::new(&server.url(), Duration::from_secs(2)).unwrap();
        assert_eq!(
            wiki.summarize("rustlang", 2).as_deref(),
            Some("Rust is a language.")
        );
    }

    #[test]
    fn disambiguation_is_a_miss() {
        let mut server = mockito::Server::new();
        let _m = server
            .mock("GET", "/api/rest_v1/page/summary/mercury")
            .with_status(200)
            .with_body(r#"{"type":"disambiguation","extract":"Mercury may refer to:"}"#)
            .create();
        let _search = server
            .mock("GET", "/w/api.php")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"query":{"search":[{"title":"Mercury"}]}}"#)
            .create();

        let wiki = Wikipedia::new(&server.url(), Duration::from_secs(2)).unwrap();
        assert_eq!(wiki.summarize("mercury", 2), None);
    }

    #[test]
    fn server_error_is_a_miss() {
        let mut server = mockito::Server::new();
        let _m = server
            .mock("GET", mockito::Matcher::Any)
            .with_status(500)
            .create();

        let wiki = Wikipedia::new(&server.url(), Duration::from_secs(2)).unwrap();
        assert_eq!(wiki.summarize("anything", 2), None);
    }

    #[test]
    fn unreachable_host_is_a_miss() {
        let wiki = Wikipedia::new("http://127.0.0.1:9", Duration::from_millis(200)).unwrap();
        assert_eq!(wiki.summarize("anything", 2), None);
    }
}
