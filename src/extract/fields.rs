//! Field extraction for a detected layout

use crate::extract::layout::{DetectionSettings, LocatorStrategy};
use crate::extract::schema::{normalize_field_name, Section};
use crate::fetcher::{FetchError, PageSession};
use std::collections::BTreeMap;
use tokio::time::Instant;

/// Field values pulled from one page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldExtraction {
    /// Normalized field name to first-line value; `None` when the field was not found
    pub values: BTreeMap<String, Option<String>>,

    /// True when the shared deadline expired before every field was tried
    pub truncated: bool,

    /// True when a field read failed because the session itself broke
    pub session_lost: bool,
}

/// Extracts every field of the plan from the loaded page
///
/// Each field waits at most `field_timeout`, capped by what is left of the shared
/// `extraction_timeout`. A field that cannot be read is recorded as `None`. Once the
/// shared deadline passes the remaining fields are left out of the map entirely.
///
/// # Arguments
///
/// * `session` - Session holding the page layout detection ran against
/// * `strategy` - Locator strategy of the detected layout
/// * `sections` - Section plan from the field catalog
/// * `settings` - Field and extraction timeouts
pub async fn extract_fields<S>(
    session: &mut S,
    strategy: &LocatorStrategy,
    sections: &[Section],
    settings: &DetectionSettings,
) -> FieldExtraction
where
    S: PageSession + ?Sized,
{
    let deadline = Instant::now() + settings.extraction_timeout;
    let mut extraction = FieldExtraction::default();

    'sections: for section in sections {
        tracing::debug!("Extracting section {}", section.name);

        for field in section.fields {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                tracing::warn!(
                    "Field extraction timed out after {} fields",
                    extraction.values.len()
                );
                extraction.truncated = true;
                break 'sections;
            }

            let key = normalize_field_name(field);
            let wait = settings.field_timeout.min(remaining);
            let value = match read_field(session, strategy, field, wait).await {
                Ok(value) => value,
                Err(e) if e.is_session_failure() => {
                    if !extraction.session_lost {
                        tracing::warn!("Session failed while reading field '{}': {}", field, e);
                    }
                    extraction.session_lost = true;
                    None
                }
                Err(e) => {
                    tracing::debug!("Could not read field '{}': {}", field, e);
                    None
                }
            };
            extraction.values.insert(key, value);
        }
    }

    extraction
}

async fn read_field<S>(
    session: &mut S,
    strategy: &LocatorStrategy,
    field: &str,
    wait: std::time::Duration,
) -> Result<Option<String>, FetchError>
where
    S: PageSession + ?Sized,
{
    let Some(element) = session.query(&strategy.field_locator(field), wait).await? else {
        return Ok(None);
    };

    let text = session.read_text(&element).await?;
    Ok(Some(first_line(&text)))
}

/// Keeps the first line of a value, trimmed
fn first_line(text: &str) -> String {
    text.trim().lines().next().unwrap_or_default().trim().to_string()
}
