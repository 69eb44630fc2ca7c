//! Static DOM view over a parsed HTML document
//!
//! Locators are resolved against the document as loaded; no scripts run, so a
//! locator that does not match now will never match for this navigation.

use crate::fetcher::{ClassMatch, Element, FetchError, Locator};
use scraper::{ElementRef, Html, Selector};

/// A parsed page plus the elements resolved on it so far
pub struct StaticPage {
    document: Html,
    generation: u64,
    resolved: Vec<String>,
}

impl StaticPage {
    /// Parses a document for the given navigation generation
    pub fn parse(html: &str, generation: u64) -> Self {
        Self {
            document: Html::parse_document(html),
            generation,
            resolved: Vec::new(),
        }
    }

    /// Returns the trimmed `<title>` text, or an empty string when there is none
    pub fn title(&self) -> String {
        let Ok(title_selector) = Selector::parse("title") else {
            return String::new();
        };

        self.document
            .select(&title_selector)
            .next()
            .map(|element| element.text().collect::<String>().trim().to_string())
            .unwrap_or_default()
    }

    /// Resolves a locator to an element handle
    ///
    /// The element's rendered text is captured at resolution time.
    pub fn resolve(&mut self, locator: &Locator) -> Option<Element> {
        let text = find_text(&self.document, locator)?;
        self.resolved.push(text);
        Some(Element {
            generation: self.generation,
            index: self.resolved.len() - 1,
        })
    }

    /// Returns the rendered text of a previously resolved element
    pub fn text_of(&self, element: &Element) -> Result<String, FetchError> {
        if element.generation != self.generation {
            return Err(FetchError::StaleElement);
        }

        self.resolved
            .get(element.index)
            .cloned()
            .ok_or(FetchError::StaleElement)
    }
}

/// Finds the rendered text of the first element matching the locator
fn find_text(document: &Html, locator: &Locator) -> Option<String> {
    match locator {
        Locator::Class { class, matching } => document
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .find(|element| class_matches(element, class, *matching))
            .map(rendered_text),

        Locator::LabeledValue {
            label_class,
            matching,
            label_text,
            value_class,
        } => {
            let divs = Selector::parse("div").ok()?;
            document
                .select(&divs)
                .filter(|label| class_matches(label, label_class, *matching))
                .filter(|label| own_text(label).contains(label_text.as_str()))
                .find_map(|label| following_value(label, value_class.as_deref(), *matching))
                .map(rendered_text)
        }

        Locator::AnyOf(locators) => locators
            .iter()
            .find_map(|locator| find_text(document, locator)),
    }
}

/// Returns the first following sibling `div` of a label, optionally restricted by class
fn following_value<'a>(
    label: ElementRef<'a>,
    value_class: Option<&str>,
    matching: ClassMatch,
) -> Option<ElementRef<'a>> {
    label
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .filter(|sibling| sibling.value().name() == "div")
        .find(|sibling| match value_class {
            Some(class) => class_matches(sibling, class, matching),
            None => true,
        })
}

fn class_matches(element: &ElementRef, class: &str, matching: ClassMatch) -> bool {
    element
        .value()
        .attr("class")
        .is_some_and(|attr| matching.matches(attr, class))
}

/// Text of the element's direct text children only
fn own_text(element: &ElementRef) -> String {
    element
        .children()
        .filter_map(|node| node.value().as_text())
        .map(|text| &**text)
        .collect()
}

/// Joins the element's non-empty text nodes with line breaks, like a rendered block
fn rendered_text(element: ElementRef) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
