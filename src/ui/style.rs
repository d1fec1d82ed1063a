use iced::widget::container;
use iced::{Background, Border, Color, Shadow, Theme, Vector};

use crate::state::data::CardStatus;
use crate::state::toast::ToastKind;

/// Accent used for a card's border
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Neutral,
    Ok,
    Err,
}

impl From<&CardStatus> for Tone {
    fn from(status: &CardStatus) -> Self {
        match status {
            CardStatus::Pending => Tone::Neutral,
            CardStatus::Identified { .. } => Tone::Ok,
            CardStatus::Failed { .. } => Tone::Err,
        }
    }
}

fn accent(theme: &Theme, tone: Tone) -> Color {
    let palette = theme.extended_palette();
    match tone {
        Tone::Neutral => palette.background.strong.color,
        Tone::Ok => palette.success.base.color,
        Tone::Err => palette.danger.base.color,
    }
}

pub fn card(theme: &Theme, tone: Tone) -> container::Style {
    let palette = theme.extended_palette();
    container::Style {
        background: Some(Background::Color(palette.background.weak.color)),
        border: Border {
            color: accent(theme, tone),
            width: if tone == Tone::Neutral { 1.0 } else { 2.0 },
            radius: 12.0.into(),
        },
        shadow: Shadow {
            color: Color::from_rgba(0.0, 0.0, 0.0, 0.25),
            offset: Vector::new(0.0, 4.0),
            blur_radius: 12.0,
        },
        ..container::Style::default()
    }
}

/// Filename badge drawn over the thumbnail
pub fn badge(_theme: &Theme) -> container::Style {
    container::Style {
        background: Some(Background::Color(Color::from_rgba(0.0, 0.0, 0.0, 0.6))),
        text_color: Some(Color::WHITE),
        border: Border {
            radius: 6.0.into(),
            ..Border::default()
        },
        ..container::Style::default()
    }
}

/// Small pill, used for the size tag
pub fn tag(theme: &Theme) -> container::Style {
    let palette = theme.extended_palette();
    container::Style {
        background: Some(Background::Color(palette.primary.weak.color)),
        text_color: Some(palette.primary.weak.text),
        border: Border {
            radius: 10.0.into(),
            ..Border::default()
        },
        ..container::Style::default()
    }
}

pub fn drop_zone(theme: &Theme, hovered: bool) -> container::Style {
    let palette = theme.extended_palette();
    let (background, border) = if hovered {
        (palette.primary.weak.color, palette.primary.strong.color)
    } else {
        (palette.background.weak.color, palette.background.strong.color)
    };
    container::Style {
        background: Some(Background::Color(background)),
        border: Border {
            color: border,
            width: 2.0,
            radius: 16.0.into(),
        },
        ..container::Style::default()
    }
}

pub fn panel(theme: &Theme) -> container::Style {
    card(theme, Tone::Neutral)
}

pub fn toast(theme: &Theme, kind: ToastKind, fading: bool) -> container::Style {
    let palette = theme.extended_palette();
    let pair = match kind {
        ToastKind::Ok => palette.success.base,
        ToastKind::Err => palette.danger.base,
    };
    let alpha = if fading { 0.35 } else { 1.0 };
    container::Style {
        background: Some(Background::Color(Color {
            a: alpha,
            ..pair.color
        })),
        text_color: Some(Color { a: alpha, ..pair.text }),
        border: Border {
            radius: 8.0.into(),
            ..Border::default()
        },
        ..container::Style::default()
    }
}
