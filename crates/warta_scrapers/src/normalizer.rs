//! Selector-fallback text extraction for article pages.
//!
//! A [`ContentNormalizer`] holds an ordered list of [`ExtractionRule`]s. The
//! rules are tried one after another against the same document and the first
//! one that yields non-empty text wins. Sources use this to cope with layout
//! changes: the current body container is listed first, older or alternative
//! containers after it.

use scraper::{ElementRef, Html, Selector};
use warta_core::{Error, Result};

/// Drops a paragraph block when it contains `marker` whose text includes
/// `contains` (e.g. a bold "Baca juga:" cross-link).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exclusion {
    pub marker: String,
    pub contains: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionRule {
    pub locator: String,
    pub blocks: Option<String>,
    pub exclude: Option<Exclusion>,
}

impl ExtractionRule {
    /// Use the whole text of every element matching `locator`.
    pub fn text(locator: &str) -> Self {
        Self {
            locator: locator.to_string(),
            blocks: None,
            exclude: None,
        }
    }

    /// Use the text of `blocks` elements found inside `locator`, one per line.
    pub fn blocks(locator: &str, blocks: &str) -> Self {
        Self {
            locator: locator.to_string(),
            blocks: Some(blocks.to_string()),
            exclude: None,
        }
    }

    pub fn excluding(mut self, marker: &str, contains: &str) -> Self {
        self.exclude = Some(Exclusion {
            marker: marker.to_string(),
            contains: contains.to_string(),
        });
        self
    }
}

#[derive(Debug, Clone)]
struct CompiledRule {
    locator: Selector,
    blocks: Option<Selector>,
    exclude: Option<(Selector, String)>,
}

impl CompiledRule {
    fn compile(rule: &ExtractionRule) -> Result<Self> {
        let exclude = match &rule.exclude {
            Some(exclusion) => {
                if rule.blocks.is_none() {
                    return Err(Error::Config(format!(
                        "rule '{}' excludes blocks but defines no block selector",
                        rule.locator
                    )));
                }
                Some((parse_selector(&exclusion.marker)?, exclusion.contains.clone()))
            }
            None => None,
        };

        Ok(Self {
            locator: parse_selector(&rule.locator)?,
            blocks: rule.blocks.as_deref().map(parse_selector).transpose()?,
            exclude,
        })
    }

    fn apply(&self, document: &Html) -> String {
        let mut parts = Vec::new();

        for container in document.select(&self.locator) {
            match &self.blocks {
                Some(blocks) => {
                    for block in container.select(blocks) {
                        if self.is_excluded(block) {
                            continue;
                        }
                        let text = collapse_whitespace(&element_text(block));
                        if !text.is_empty() {
                            parts.push(text);
                        }
                    }
                }
                None => {
                    let text = clean_lines(&element_text(container));
                    if !text.is_empty() {
                        parts.push(text);
                    }
                }
            }
        }

        parts.join("\n")
    }

    fn is_excluded(&self, block: ElementRef<'_>) -> bool {
        match &self.exclude {
            Some((marker, contains)) => block
                .select(marker)
                .any(|m| element_text(m).contains(contains.as_str())),
            None => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ContentNormalizer {
    rules: Vec<CompiledRule>,
}

impl ContentNormalizer {
    pub fn new(rules: &[ExtractionRule]) -> Result<Self> {
        let rules = rules
            .iter()
            .map(CompiledRule::compile)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    /// Returns the text of the first rule that matches anything, or an empty
    /// string when every rule comes up empty.
    pub fn normalize(&self, html: &str) -> String {
        let document = Html::parse_document(html);
        self.normalize_document(&document)
    }

    pub fn normalize_document(&self, document: &Html) -> String {
        self.rules
            .iter()
            .map(|rule| rule.apply(document))
            .find(|text| !text.is_empty())
            .unwrap_or_default()
    }
}

pub(crate) fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| Error::Config(format!("Invalid selector '{}': {}", selector, e)))
}

/// Text of an element without the contents of script and style tags.
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    let mut text = String::new();
    for node in element.descendants() {
        if let Some(fragment) = node.value().as_text() {
            let hidden = node
                .parent()
                .and_then(|parent| parent.value().as_element())
                .map(|parent| matches!(parent.name(), "script" | "style" | "noscript"))
                .unwrap_or(false);
            if !hidden {
                text.push_str(fragment);
            }
        }
    }
    text
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn clean_lines(text: &str) -> String {
    text.lines()
        .map(collapse_whitespace)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_non_empty_rule_wins() {
        let html = r#"
            <div class="detail__body-text">   </div>
            <div class="detail__body">
                Secondary body text
            </div>
        "#;
        let normalizer = ContentNormalizer::new(&[
            ExtractionRule::text("div.detail__body-text"),
            ExtractionRule::text("div.detail__body"),
        ])
        .unwrap();

        assert_eq!(normalizer.normalize(html), "Secondary body text");
    }

    #[test]
    fn test_primary_rule_preferred() {
        let html = r#"
            <div class="primary">Primary</div>
            <div class="secondary">Secondary</div>
        "#;
        let normalizer = ContentNormalizer::new(&[
            ExtractionRule::text(".primary"),
            ExtractionRule::text(".secondary"),
        ])
        .unwrap();

        assert_eq!(normalizer.normalize(html), "Primary");
    }

    #[test]
    fn test_blocks_with_exclusion() {
        let html = r#"
            <div class="read__content">
                <p>First   paragraph.</p>
                <p><strong>Baca juga: Another story</strong></p>
                <p>Second paragraph.</p>
                <p><strong>Baca juga : One more</strong> link</p>
                <p>   </p>
                <p><strong>Important</strong> third paragraph.</p>
            </div>
        "#;
        let normalizer = ContentNormalizer::new(&[
            ExtractionRule::blocks("div.read__content", "p").excluding("strong", "Baca juga"),
        ])
        .unwrap();

        assert_eq!(
            normalizer.normalize(html),
            "First paragraph.\nSecond paragraph.\nImportant third paragraph."
        );
    }

    #[test]
    fn test_all_rules_empty() {
        let html = "<div class='other'>Nothing to see</div>";
        let normalizer = ContentNormalizer::new(&[
            ExtractionRule::text(".missing"),
            ExtractionRule::blocks(".also-missing", "p"),
        ])
        .unwrap();

        assert_eq!(normalizer.normalize(html), "");
    }

    #[test]
    fn test_script_text_ignored() {
        let html = r#"
            <div class="body">
                Visible line
                <script>var hidden = 1;</script>
                <style>.x { color: red; }</style>
                Another line
            </div>
        "#;
        let normalizer = ContentNormalizer::new(&[ExtractionRule::text(".body")]).unwrap();

        assert_eq!(normalizer.normalize(html), "Visible line\nAnother line");
    }

    #[test]
    fn test_invalid_selector() {
        assert!(matches!(
            ContentNormalizer::new(&[ExtractionRule::text("div[")]),
            Err(Error::Config(_))
        ));
        assert!(ContentNormalizer::new(&[ExtractionRule::text("div").excluding("strong", "x")]).is_err());
    }
}
