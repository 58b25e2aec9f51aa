use std::sync::OnceLock;

use regex::Regex;
use scraper::node::Element;
use scraper::{Html, Node};

use crate::similarity::{jaccard_multiset, Multiset};

fn word_splitter() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9_]+").unwrap())
}

/// Four-channel multiset summary of one fetched page: `word`, `tag`, `link`,
/// `img`. Built once from a response body and never mutated afterwards.
#[derive(Debug, Clone, Default)]
pub struct HtmlResult {
    pub word: Multiset,
    pub tag: Multiset,
    pub link: Multiset,
    pub img: Multiset,
}

fn is_hidden_by_style(el: &Element) -> bool {
    el.attr("style")
        .map(|s| {
            let normalized: String = s
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect::<String>()
                .to_ascii_lowercase();
            normalized.contains("display:none") || normalized.contains("visibility:hidden")
        })
        .unwrap_or(false)
}

fn is_removed_element(el: &Element) -> bool {
    matches!(el.name(), "style" | "script" | "head" | "title") || is_hidden_by_style(el)
}

impl HtmlResult {
    /// Parses a raw HTTP response body (decoded lossily as UTF-8) into a
    /// fingerprint. Never panics or errors — malformed HTML just yields a
    /// sparser tree, and a tree with no matching structure yields empty
    /// multisets.
    pub fn from_bytes(body: &[u8]) -> Self {
        let text = String::from_utf8_lossy(body);
        Self::from_html_str(&text)
    }

    pub fn from_html_str(text: &str) -> Self {
        let document = Html::parse_document(text);

        let mut word = Multiset::new();
        let mut tag = Multiset::new();
        let mut link = Multiset::new();
        let mut img = Multiset::new();

        for node in document.tree.nodes() {
            let self_removed = match node.value() {
                Node::Element(el) => is_removed_element(el),
                _ => false,
            };
            if self_removed {
                continue;
            }

            let ancestor_excluded = node.ancestors().any(|anc| match anc.value() {
                Node::Element(el) => is_removed_element(el),
                _ => false,
            });
            if ancestor_excluded {
                continue;
            }

            match node.value() {
                Node::Element(el) => match el.name() {
                    "a" => {
                        if let Some(href) = el.attr("href") {
                            *link.entry(href.to_string()).or_insert(0) += 1;
                        }
                    }
                    "img" => {
                        if let Some(src) = el.attr("src") {
                            *img.entry(src.to_string()).or_insert(0) += 1;
                        }
                    }
                    _ => {}
                },
                Node::Text(raw_text) => {
                    let raw: &str = raw_text;
                    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
                    if collapsed.is_empty() {
                        continue;
                    }
                    *tag.entry(collapsed.clone()).or_insert(0) += 1;
                    for token in word_splitter().split(&collapsed.to_ascii_lowercase()) {
                        if !token.is_empty() {
                            *word.entry(token.to_string()).or_insert(0) += 1;
                        }
                    }
                }
                _ => {}
            }
        }

        HtmlResult { word, tag, link, img }
    }

    /// Combined similarity against another fingerprint: arithmetic mean of
    /// the four per-channel Jaccard scores.
    pub fn similarity(&self, other: &HtmlResult) -> f64 {
        let channels = [
            jaccard_multiset(&self.word, &other.word),
            jaccard_multiset(&self.tag, &other.tag),
            jaccard_multiset(&self.link, &other.link),
            jaccard_multiset(&self.img, &other.img),
        ];
        channels.iter().sum::<f64>() / channels.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_words_tags_links_images() {
        let html = r#"
            <html><body>
                <p>Hello World</p>
                <a href="/a">link a</a>
                <img src="/img.png">
            </body></html>
        "#;
        let fp = HtmlResult::from_html_str(html);
        assert!(fp.word.contains_key("hello"));
        assert!(fp.word.contains_key("world"));
        assert!(fp.tag.contains_key("Hello World"));
        assert!(fp.link.contains_key("/a"));
        assert!(fp.img.contains_key("/img.png"));
    }

    #[test]
    fn excludes_style_script_head_title_and_hidden() {
        let baseline = HtmlResult::from_html_str("<html><body><p>Same Content</p></body></html>");
        let noisy = HtmlResult::from_html_str(
            r#"
            <html>
              <head><title>Ignored Title</title></head>
              <body>
                <style>.x{color:red}</style>
                <script>alert('ignored')</script>
                <div style="display:none">hidden text <a href="/hidden">h</a></div>
                <div style="visibility: hidden;">also hidden</div>
                <p>Same Content</p>
              </body>
            </html>
            "#,
        );
        assert_eq!(baseline.word, noisy.word);
        assert_eq!(baseline.tag, noisy.tag);
        assert_eq!(baseline.link, noisy.link);
        assert_eq!(baseline.img, noisy.img);
    }

    #[test]
    fn malformed_html_yields_empty_sets_not_panic() {
        let fp = HtmlResult::from_html_str("<div><span>unterminated");
        assert!(!fp.word.is_empty());
    }

    #[test]
    fn reflexive_similarity_is_one() {
        let fp = HtmlResult::from_html_str("<html><body><p>abc def</p></body></html>");
        assert_eq!(fp.similarity(&fp), 1.0);
    }
}
