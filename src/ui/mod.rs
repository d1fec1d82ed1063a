/// View builders
///
/// - Result cards (card.rs)
/// - Toast overlay (toast.rs)
/// - Drop zone and camera panel (panels.rs)
/// - Shared container styles (style.rs)

pub mod card;
pub mod panels;
pub mod style;
pub mod toast;
