use iced::alignment::{Horizontal, Vertical};
use iced::widget::{container, text, Column};
use iced::{Element, Length};

use super::style;
use crate::state::toast::Toasts;
use crate::Message;

/// Toast stack anchored to the bottom-right corner
pub fn overlay(toasts: &Toasts) -> Element<'_, Message> {
    let items = toasts.iter().map(|toast| {
        let kind = toast.kind;
        let fading = toast.fading;
        container(text(&toast.message).size(14))
            .padding([10, 14])
            .max_width(360.0)
            .style(move |theme| style::toast(theme, kind, fading))
            .into()
    });

    container(Column::with_children(items).spacing(8))
        .width(Length::Fill)
        .height(Length::Fill)
        .padding(20)
        .align_x(Horizontal::Right)
        .align_y(Vertical::Bottom)
        .into()
}
