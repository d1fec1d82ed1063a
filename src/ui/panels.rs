use iced::widget::{button, column, container, horizontal_space, image, row, text};
use iced::{Alignment, ContentFit, Element, Length};

use super::style;
use crate::input::camera::CameraSession;
use crate::Message;

pub fn header(light: bool) -> Element<'static, Message> {
    let toggle = if light { "Dark theme" } else { "Light theme" };
    row![
        text("Lab Lens").size(32),
        horizontal_space(),
        button(toggle).on_press(Message::ToggleTheme).padding(8),
    ]
    .align_y(Alignment::Center)
    .into()
}

/// Drop target with the picker and camera buttons
pub fn drop_zone(hovered: bool, camera_busy: bool) -> Element<'static, Message> {
    let prompt = if hovered {
        "Release to analyze"
    } else {
        "Drop lab equipment photos here"
    };

    let open_camera = button("Open camera").padding(10);
    let open_camera = if camera_busy {
        open_camera
    } else {
        open_camera.on_press(Message::OpenCamera)
    };

    let content = column![
        text(prompt).size(20),
        row![
            button("Browse files").on_press(Message::BrowseFiles).padding(10),
            open_camera,
        ]
        .spacing(12),
    ]
    .spacing(16)
    .align_x(Alignment::Center);

    container(content)
        .width(Length::Fill)
        .padding(32)
        .center_x(Length::Fill)
        .style(move |theme| style::drop_zone(theme, hovered))
        .into()
}

/// Live preview with capture and close buttons; None when the camera is closed
pub fn camera(session: &CameraSession) -> Option<Element<'_, Message>> {
    if !session.is_active() {
        return None;
    }

    let preview: Element<'_, Message> = match session.preview() {
        Some(handle) => image(handle.clone())
            .width(Length::Fill)
            .height(Length::Fixed(320.0))
            .content_fit(ContentFit::Contain)
            .into(),
        None => container(text("Starting camera…").size(14))
            .width(Length::Fill)
            .height(Length::Fixed(320.0))
            .center_x(Length::Fill)
            .center_y(Length::Fixed(320.0))
            .into(),
    };

    let controls = row![
        button("Capture").on_press(Message::Capture).padding(10),
        button("Close camera").on_press(Message::CloseCamera).padding(10),
    ]
    .spacing(12);

    Some(
        container(column![preview, controls].spacing(12).align_x(Alignment::Center))
            .width(Length::Fill)
            .padding(16)
            .style(style::panel)
            .into(),
    )
}
