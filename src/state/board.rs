use iced::widget::image::Handle;
use tracing::{debug, warn};

use super::data::{CardStatus, IdentifyResult, ImageItem};

/// Badges show at most this many characters of the filename
const BADGE_MAX_CHARS: usize = 22;

/// Message for cards whose batch response was shorter than the batch
pub const MISSING_RESULT: &str = "No result returned for this image.";

/// One card on the board
#[derive(Debug, Clone)]
pub struct Card {
    pub id: u64,
    pub thumbnail: Handle,
    /// Truncated filename shown over the thumbnail
    pub badge: String,
    /// Image size, e.g. "245 KB"
    pub size_label: String,
    pub status: CardStatus,
}

impl Card {
    pub fn placeholder(item: &ImageItem) -> Self {
        Self {
            id: item.id,
            thumbnail: item.preview(),
            badge: badge_text(&item.filename),
            size_label: size_label(item.size()),
            status: CardStatus::Pending,
        }
    }

    /// Card heading for the current status
    pub fn title(&self) -> &str {
        match &self.status {
            CardStatus::Pending => "Detecting…",
            CardStatus::Identified { name, .. } => name,
            CardStatus::Failed { .. } => "Error",
        }
    }

    /// Card body text for the current status
    pub fn body(&self) -> &str {
        match &self.status {
            CardStatus::Pending => "Waiting for model response...",
            CardStatus::Identified { description, .. } => description,
            CardStatus::Failed { error } => error,
        }
    }
}

/// The card board. Newest cards come first.
///
/// Cards are never reconciled against anything else: a card is added
/// once when its image is accepted and patched once when its batch
/// resolves.
#[derive(Debug, Default)]
pub struct Board {
    cards: Vec<Card>,
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepend a "Detecting…" card for an accepted image
    pub fn add_placeholder(&mut self, item: &ImageItem) {
        self.cards.insert(0, Card::placeholder(item));
    }

    /// Patch the card with `id`. Returns false if no such card exists.
    pub fn resolve(&mut self, id: u64, status: CardStatus) -> bool {
        match self.cards.iter_mut().find(|card| card.id == id) {
            Some(card) => {
                card.status = status;
                true
            }
            None => {
                debug!(id, "no card to patch");
                false
            }
        }
    }

    /// Apply a batch response to the cards of that batch.
    ///
    /// `ids` are in submission order and `results` are matched to them by
    /// position. Cards left without a result are marked failed; surplus
    /// results are dropped. Returns the number of cards patched.
    pub fn apply_batch(&mut self, ids: &[u64], results: &[IdentifyResult]) -> usize {
        if results.len() > ids.len() {
            warn!(
                submitted = ids.len(),
                returned = results.len(),
                "server returned more results than images, ignoring the surplus"
            );
        }

        let mut patched = 0;
        for (position, &id) in ids.iter().enumerate() {
            let status = match results.get(position) {
                Some(result) => {
                    if let (Some(index), Some(filename)) = (result.index, result.filename.as_deref()) {
                        debug!(id, index, filename, "matched result");
                    }
                    CardStatus::from_result(result)
                }
                None => CardStatus::Failed {
                    error: MISSING_RESULT.to_string(),
                },
            };
            if self.resolve(id, status) {
                patched += 1;
            }
        }
        patched
    }

    pub fn get(&self, id: u64) -> Option<&Card> {
        self.cards.iter().find(|card| card.id == id)
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.cards.iter().filter(|card| card.status.is_pending()).count()
    }
}

/// Filename truncated for the thumbnail badge, "image" when empty
pub fn badge_text(filename: &str) -> String {
    if filename.is_empty() {
        return "image".to_string();
    }
    filename.chars().take(BADGE_MAX_CHARS).collect()
}

/// Size in whole kilobytes, rounded to nearest
pub fn size_label(bytes: u64) -> String {
    let kb = (bytes as f64 / 1024.0).round() as u64;
    format!("{} KB", kb)
}
