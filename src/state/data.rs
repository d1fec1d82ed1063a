//! Shared data structures for the application state
//!
//! These structs represent the data model that flows between
//! input acquisition, the upload layer and the UI layer.
use iced::widget::image::Handle;
use serde::Deserialize;

/// A single image accepted for identification
///
/// Lives only for the duration of the session; the id is handed out
/// by the app when the batch is accepted.
#[derive(Debug, Clone)]
pub struct ImageItem {
    /// Generation-time id, unique within the session
    pub id: u64,
    /// Filename as sent to the server (e.g. "beaker.jpg")
    pub filename: String,
    /// Encoded image bytes, sent as-is
    pub bytes: Vec<u8>,
    /// MIME type of `bytes` (e.g. "image/jpeg")
    pub mime: String,
}

impl ImageItem {
    pub fn new(id: u64, filename: impl Into<String>, bytes: Vec<u8>, mime: impl Into<String>) -> Self {
        Self {
            id,
            filename: filename.into(),
            bytes,
            mime: mime.into(),
        }
    }

    /// Size of the encoded image in bytes
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Image handle for the card thumbnail
    pub fn preview(&self) -> Handle {
        Handle::from_bytes(self.bytes.clone())
    }
}

/// An image that has been read or captured but not yet given an id
#[derive(Debug, Clone, PartialEq)]
pub struct PendingImage {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub mime: String,
}

impl PendingImage {
    pub fn into_item(self, id: u64) -> ImageItem {
        ImageItem::new(id, self.filename, self.bytes, self.mime)
    }
}

/// One entry of the server's `results` array
///
/// Matched to the submitted images by position. `index` and `filename`
/// are echoed by the server and only used for logging.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct IdentifyResult {
    #[serde(default)]
    pub index: Option<usize>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Lifecycle of a card
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardStatus {
    /// Waiting for the batch response
    Pending,
    /// The server recognised the equipment
    Identified { name: String, description: String },
    /// The server (or the batch mapping) reported an error for this image
    Failed { error: String },
}

impl CardStatus {
    /// Interpret a server result the way the cards display it.
    ///
    /// A non-empty `error` wins; otherwise empty names fall back to
    /// "Unknown" and empty descriptions to "—".
    pub fn from_result(result: &IdentifyResult) -> Self {
        if let Some(error) = result.error.as_deref().filter(|e| !e.is_empty()) {
            return CardStatus::Failed {
                error: error.to_string(),
            };
        }

        let name = result
            .name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or("Unknown");
        let description = result
            .description
            .as_deref()
            .filter(|d| !d.is_empty())
            .unwrap_or("—");

        CardStatus::Identified {
            name: name.to_string(),
            description: description.to_string(),
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, CardStatus::Pending)
    }
}
