use serde::{Deserialize, Serialize};

/// Prefix put in front of the title of a record whose detail page could not be fetched.
pub const FAILURE_MARKER: &str = "[FAILED] ";

/// A link to one detail page, as found on a listing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemReference {
    pub title: String,
    pub url: String,
}

impl ItemReference {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
        }
    }
}

/// Structured fields extracted from one detail page.
///
/// Failed records keep the same shape as successful ones: `m3u8` is empty,
/// `image` is null and `error` carries the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailRecord {
    pub title: String,
    pub url: String,
    pub image: Option<String>,
    #[serde(rename = "m3u8")]
    pub stream_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DetailRecord {
    pub fn failed(reference: &ItemReference, reason: impl Into<String>) -> Self {
        Self {
            title: format!("{FAILURE_MARKER}{}", reference.title),
            url: reference.url.clone(),
            image: None,
            stream_url: String::new(),
            error: Some(reason.into()),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Result of processing one item during the detail phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailOutcome {
    Extracted(DetailRecord),
    Failed {
        reference: ItemReference,
        reason: String,
    },
}

impl DetailOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, DetailOutcome::Failed { .. })
    }

    pub fn url(&self) -> &str {
        match self {
            DetailOutcome::Extracted(record) => &record.url,
            DetailOutcome::Failed { reference, .. } => &reference.url,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            DetailOutcome::Extracted(record) => &record.title,
            DetailOutcome::Failed { reference, .. } => &reference.title,
        }
    }

    pub fn into_record(self) -> DetailRecord {
        match self {
            DetailOutcome::Extracted(record) => record,
            DetailOutcome::Failed { reference, reason } => DetailRecord::failed(&reference, reason),
        }
    }
}

/// A payload tagged with its position in the canonical ordering.
///
/// [`WorkUnit::sequence`] numbers one batch `0..len`. Units from separate
/// batches may share an index, so consumers order by position in their input,
/// not by `index`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkUnit<T> {
    index: usize,
    payload: T,
}

impl<T> WorkUnit<T> {
    pub fn sequence<I>(payloads: I) -> Vec<WorkUnit<T>>
    where
        I: IntoIterator<Item = T>,
    {
        payloads
            .into_iter()
            .enumerate()
            .map(|(index, payload)| WorkUnit { index, payload })
            .collect()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn payload(&self) -> &T {
        &self.payload
    }

    pub fn into_payload(self) -> T {
        self.payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_record_keeps_full_shape() {
        let reference = ItemReference::new("Clip", "https://example.com/detail/id/7.html");
        let record = DetailOutcome::Failed {
            reference,
            reason: "timeout".into(),
        }
        .into_record();

        assert_eq!(record.title, "[FAILED] Clip");
        assert_eq!(record.stream_url, "");
        assert_eq!(record.image, None);
        assert_eq!(record.error.as_deref(), Some("timeout"));
    }

    #[test]
    fn sequence_numbers_units_from_zero() {
        let units = WorkUnit::sequence(["a", "b", "c"]);
        let indices: Vec<_> = units.iter().map(WorkUnit::index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(*units[2].payload(), "c");
    }
}
