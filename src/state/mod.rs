/// State management module
///
/// This module holds everything the UI renders from:
/// - Transient image items and server results (data.rs)
/// - The card board, one card per submitted image (board.rs)
/// - Auto-dismissing notifications (toast.rs)

pub mod board;
pub mod data;
pub mod toast;
