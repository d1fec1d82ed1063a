use iced::widget::{column, container, image, row, stack, text};
use iced::{ContentFit, Element, Length};
use iced_aw::Wrap;

use super::style::{self, Tone};
use crate::state::board::{Board, Card};
use crate::Message;

const CARD_WIDTH: f32 = 260.0;
const THUMB_HEIGHT: f32 = 170.0;

/// One result card: thumbnail with filename badge, title, body, size tag
pub fn card(card: &Card) -> Element<'_, Message> {
    let tone = Tone::from(&card.status);

    let thumb = stack![
        image(card.thumbnail.clone())
            .width(Length::Fill)
            .height(Length::Fixed(THUMB_HEIGHT))
            .content_fit(ContentFit::Cover),
        container(container(text(&card.badge).size(12)).padding([2, 6]).style(style::badge)).padding(8),
    ];

    let meta = column![text(card.title()).size(18), text(card.body()).size(14)].spacing(6);

    let actions = row![container(text(&card.size_label).size(12))
        .padding([2, 8])
        .style(style::tag)];

    container(column![thumb, meta, actions].spacing(10))
        .padding(12)
        .width(Length::Fixed(CARD_WIDTH))
        .style(move |theme| style::card(theme, tone))
        .into()
}

/// All cards, newest first, wrapped into rows
pub fn grid(board: &Board) -> Element<'_, Message> {
    if board.is_empty() {
        return container(text("No images analyzed yet.").size(14))
            .width(Length::Fill)
            .center_x(Length::Fill)
            .padding(20)
            .into();
    }

    let cards: Vec<Element<'_, Message>> = board.cards().iter().map(card).collect();

    Wrap::with_elements(cards)
        .spacing(16.0)
        .line_spacing(16.0)
        .into()
}
