//! Layout detection
//!
//! Catalog pages come in a fixed set of structural variants. Each variant carries its
//! locator strategy as data; detection tries the variants one after another in
//! priority order and the first one whose media-type element resolves wins.

use crate::config::Config;
use crate::fetcher::{ClassMatch, FetchError, Locator, PageSession};
use crate::state::FailureKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Label of the field that declares the media type
pub const MEDIA_TYPE_LABEL: &str = "Media type";

/// Known structural variants of a media page, in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutVariant {
    /// Card-style layout with `showcase-label` / `showcase-value` cells
    Showcase,
    /// Older definition-list layout with `field-name` / `field-value` cells
    Traditional,
}

impl LayoutVariant {
    /// All variants in the order detection tries them
    pub const PRIORITY: [LayoutVariant; 2] = [LayoutVariant::Showcase, LayoutVariant::Traditional];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Showcase => "showcase",
            Self::Traditional => "traditional",
        }
    }

    pub fn strategy(&self) -> LocatorStrategy {
        match self {
            Self::Showcase => LocatorStrategy {
                label_class: "showcase-label",
                value_class: "showcase-value",
                matching: ClassMatch::Contains,
            },
            Self::Traditional => LocatorStrategy {
                label_class: "field-name",
                value_class: "field-value",
                matching: ClassMatch::Exact,
            },
        }
    }
}

impl fmt::Display for LayoutVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a layout variant locates labels and values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocatorStrategy {
    pub label_class: &'static str,
    pub value_class: &'static str,
    pub matching: ClassMatch,
}

impl LocatorStrategy {
    /// Any label element of this variant
    pub fn label_locator(&self) -> Locator {
        Locator::Class {
            class: self.label_class.to_string(),
            matching: self.matching,
        }
    }

    /// The value cell next to the media-type label
    pub fn media_type_locator(&self) -> Locator {
        Locator::LabeledValue {
            label_class: self.label_class.to_string(),
            matching: self.matching,
            label_text: MEDIA_TYPE_LABEL.to_string(),
            value_class: Some(self.value_class.to_string()),
        }
    }

    /// The element right after the label containing `field`
    pub fn field_locator(&self, field: &str) -> Locator {
        Locator::LabeledValue {
            label_class: self.label_class.to_string(),
            matching: self.matching,
            label_text: field.to_string(),
            value_class: None,
        }
    }
}

/// Timeouts and markers used while detecting and extracting one page
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionSettings {
    pub title_marker: String,
    pub title_timeout: Duration,
    pub content_timeout: Duration,
    pub layout_timeout: Duration,
    pub field_timeout: Duration,
    pub extraction_timeout: Duration,
}

impl DetectionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            title_marker: config.site.title_marker.clone(),
            title_timeout: config.detection.title_timeout(),
            content_timeout: config.detection.content_timeout(),
            layout_timeout: config.detection.layout_timeout(),
            field_timeout: config.detection.field_timeout(),
            extraction_timeout: config.detection.extraction_timeout(),
        }
    }
}

/// Result of a successful detection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub layout: LayoutVariant,
    pub media_type: String,
}

/// Why detection (or the attempt around it) failed
#[derive(Debug, Error)]
pub enum DetectError {
    #[error("Not a valid media page (title: {title:?})")]
    WrongPageKind { title: String },

    #[error("Page title did not load within {0:?}")]
    TitleTimeout(Duration),

    #[error("Content not found quickly enough")]
    ContentMissing,

    #[error("Could not determine page layout or media type")]
    LayoutUnknown,

    #[error("Record deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),

    #[error("Page session error: {0}")]
    Fetch(#[from] FetchError),
}

impl DetectError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::WrongPageKind { .. } => FailureKind::WrongPageKind,
            Self::TitleTimeout(_) => FailureKind::TitleTimeout,
            Self::ContentMissing => FailureKind::ContentMissing,
            Self::LayoutUnknown => FailureKind::LayoutUnknown,
            Self::DeadlineExceeded(_) => FailureKind::DeadlineExceeded,
            Self::Fetch(FetchError::InvalidUrl { .. }) => FailureKind::InvalidUrl,
            Self::Fetch(_) => FailureKind::SessionFailure,
        }
    }

    /// Returns true if the session that produced this error must be recreated
    pub fn is_session_failure(&self) -> bool {
        matches!(self, Self::Fetch(e) if e.is_session_failure())
    }

    /// Returns true if retrying the same URL cannot change the outcome
    pub fn is_categorical(&self) -> bool {
        self.kind().is_categorical()
    }
}

/// Detects the layout variant and declared media type of the loaded page
///
/// # Steps
///
/// 1. The title must contain the configured marker, else the page is the wrong kind
///    and no variant is tried
/// 2. Some label element of any variant must appear within the content timeout
/// 3. Each variant in priority order gets the layout timeout to resolve its
///    media-type element; the first hit wins
pub async fn detect_layout<S>(
    session: &mut S,
    settings: &DetectionSettings,
) -> Result<Detection, DetectError>
where
    S: PageSession + ?Sized,
{
    let title = match tokio::time::timeout(settings.title_timeout, session.title()).await {
        Ok(title) => title?,
        Err(_) => return Err(DetectError::TitleTimeout(settings.title_timeout)),
    };

    if !title.contains(settings.title_marker.as_str()) {
        return Err(DetectError::WrongPageKind { title });
    }

    let any_label = Locator::AnyOf(
        LayoutVariant::PRIORITY
            .iter()
            .map(|variant| variant.strategy().label_locator())
            .collect(),
    );
    if session
        .query(&any_label, settings.content_timeout)
        .await?
        .is_none()
    {
        return Err(DetectError::ContentMissing);
    }

    for variant in LayoutVariant::PRIORITY {
        let locator = variant.strategy().media_type_locator();
        let Some(element) = session.query(&locator, settings.layout_timeout).await? else {
            tracing::debug!("Media type not found with {} layout", variant);
            continue;
        };

        let media_type = session.read_text(&element).await?.trim().to_string();
        if media_type.is_empty() {
            return Err(DetectError::LayoutUnknown);
        }

        tracing::info!("Detected layout: {}, media type: {}", variant, media_type);
        return Ok(Detection {
            layout: variant,
            media_type,
        });
    }

    Err(DetectError::LayoutUnknown)
}
