use iced::widget::{column, container, scrollable, stack, Column};
use iced::{event, time, window, Element, Event, Length, Subscription, Task, Theme};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;
mod error;
mod input;
mod state;
mod ui;
mod upload;

use config::Config;
use error::AppError;
use input::camera::{self, CameraHandle, CameraSession, Frame};
use input::files;
use state::board::Board;
use state::data::{IdentifyResult, PendingImage};
use state::toast::{ToastKind, Toasts};
use upload::Identifier;

/// Main application state
struct LabLens {
    config: Config,
    identifier: Identifier,
    /// One card per submitted image, newest first
    board: Board,
    toasts: Toasts,
    camera: CameraSession,
    /// An open request is on its way; the button is disabled meanwhile
    camera_opening: bool,
    /// Next generation-time image id
    next_image_id: u64,
    /// Files are being dragged over the window
    drag_hover: bool,
    /// Paths dropped since the last settle
    dropped: Vec<PathBuf>,
    drop_generation: u64,
    light_theme: bool,
}

/// Application messages (events)
#[derive(Debug, Clone)]
pub enum Message {
    ToggleTheme,
    /// User clicked "Browse files"
    BrowseFiles,
    FilesHovered,
    FilesHoverLeft,
    /// The window delivers one dropped path per event
    FileDropped(PathBuf),
    /// No more paths arrived for the drop with this generation
    DropSettled(u64),
    /// Files of a batch have been read from disk
    BatchLoaded(Vec<Result<PendingImage, AppError>>),
    /// The server answered (or failed) for the cards with these ids
    BatchFinished {
        ids: Vec<u64>,
        outcome: Result<Vec<IdentifyResult>, AppError>,
    },
    OpenCamera,
    CameraOpened(Result<CameraHandle, AppError>),
    FrameTick,
    FrameGrabbed(u64, Result<Frame, AppError>),
    Capture,
    CloseCamera,
    ToastFade(u64),
    ToastExpired(u64),
}

impl LabLens {
    fn new(config: Config) -> (Self, Task<Message>) {
        let app = Self::with_config(config);
        info!("🔬 Lab Lens ready, posting to {}", app.identifier.endpoint());
        (app, Task::none())
    }

    fn with_config(config: Config) -> Self {
        let identifier = Identifier::new(config.endpoint.clone());
        Self {
            config,
            identifier,
            board: Board::new(),
            toasts: Toasts::new(),
            camera: CameraSession::new(),
            camera_opening: false,
            next_image_id: 1,
            drag_hover: false,
            dropped: Vec::new(),
            drop_generation: 0,
            light_theme: false,
        }
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::ToggleTheme => {
                self.light_theme = !self.light_theme;
                Task::none()
            }
            Message::BrowseFiles => match files::pick_images() {
                Some(paths) => load(paths),
                None => Task::none(),
            },
            Message::FilesHovered => {
                self.drag_hover = true;
                Task::none()
            }
            Message::FilesHoverLeft => {
                self.drag_hover = false;
                Task::none()
            }
            Message::FileDropped(path) => {
                self.drag_hover = false;
                self.dropped.push(path);
                self.drop_generation += 1;
                let generation = self.drop_generation;
                after(self.config.drop_settle, Message::DropSettled(generation))
            }
            Message::DropSettled(generation) => {
                if generation != self.drop_generation {
                    return Task::none();
                }
                let paths = std::mem::take(&mut self.dropped);
                match files::accept_drop(&paths) {
                    Ok(images) => load(images),
                    Err(e) => self.fail(e),
                }
            }
            Message::BatchLoaded(loaded) => {
                let mut tasks = Vec::new();
                let mut batch = Vec::new();
                for entry in loaded {
                    match entry {
                        Ok(image) => batch.push(image),
                        Err(e) => tasks.push(self.fail(e)),
                    }
                }
                tasks.push(self.submit(batch));
                Task::batch(tasks)
            }
            Message::BatchFinished { ids, outcome } => match outcome {
                Ok(results) => {
                    let patched = self.board.apply_batch(&ids, &results);
                    info!(
                        "📊 Batch done: {} cards patched from {} results ({} of {} cards still pending)",
                        patched,
                        results.len(),
                        self.board.pending_count(),
                        self.board.len()
                    );
                    self.notify(
                        ToastKind::Ok,
                        format!("Analyzed {} image(s).", results.len()),
                    )
                }
                Err(e) => self.fail(e),
            },
            Message::OpenCamera => {
                if self.camera_opening {
                    return Task::none();
                }
                // The device node stays busy until the held stream is released
                if self.camera.close() {
                    info!("📷 Released the open camera before reopening");
                }
                self.camera_opening = true;
                Task::perform(
                    camera::open_camera(self.config.camera_device.clone()),
                    Message::CameraOpened,
                )
            }
            Message::CameraOpened(result) => {
                self.camera_opening = false;
                match result {
                    Ok(handle) => {
                        self.camera.attach(handle);
                        Task::none()
                    }
                    Err(e) => self.fail(e),
                }
            }
            Message::FrameTick => match self.camera.begin_grab() {
                Some((generation, handle)) => {
                    Task::perform(camera::grab_frame(handle), move |frame| {
                        Message::FrameGrabbed(generation, frame)
                    })
                }
                None => Task::none(),
            },
            Message::FrameGrabbed(generation, frame) => {
                match self.camera.finish_grab(generation, frame) {
                    Ok(()) => Task::none(),
                    Err(e) => {
                        // A device that stops delivering frames is released
                        self.camera.close();
                        self.fail(e)
                    }
                }
            }
            Message::Capture => {
                let now = chrono::Utc::now().timestamp_millis();
                match self.camera.capture(self.config.capture_quality, now) {
                    Ok(image) => self.submit(vec![image]),
                    Err(e) => self.fail(e),
                }
            }
            Message::CloseCamera => {
                self.camera.close();
                Task::none()
            }
            Message::ToastFade(id) => {
                if self.toasts.fade(id) {
                    after(self.config.toast_fade, Message::ToastExpired(id))
                } else {
                    Task::none()
                }
            }
            Message::ToastExpired(id) => {
                self.toasts.remove(id);
                Task::none()
            }
        }
    }

    /// Give every image an id and a placeholder card, then upload the batch
    fn submit(&mut self, batch: Vec<PendingImage>) -> Task<Message> {
        if batch.is_empty() {
            return Task::none();
        }

        let mut items = Vec::with_capacity(batch.len());
        for pending in batch {
            let item = pending.into_item(self.next_image_id);
            self.next_image_id += 1;
            self.board.add_placeholder(&item);
            items.push(item);
        }
        let ids: Vec<u64> = items.iter().map(|item| item.id).collect();

        info!("📤 Submitting {} image(s)", items.len());

        let identifier = self.identifier.clone();
        Task::perform(
            async move {
                let outcome = identifier.identify(items).await;
                (ids, outcome)
            },
            |(ids, outcome)| Message::BatchFinished { ids, outcome },
        )
    }

    /// Show a toast and schedule its fade
    fn notify(&mut self, kind: ToastKind, message: impl Into<String>) -> Task<Message> {
        let id = self.toasts.push(kind, message);
        debug!(id, shown = self.toasts.len(), "toast added");
        after(self.config.toast_timeout, Message::ToastFade(id))
    }

    fn fail(&mut self, err: AppError) -> Task<Message> {
        match &err {
            AppError::CameraAccess(detail) | AppError::Camera(detail) => {
                error!(detail = %detail, "❌ {}", err)
            }
            AppError::NoImages | AppError::FrameNotReady | AppError::CameraInactive => {
                warn!("⚠️  {}", err)
            }
            _ => error!("❌ {}", err),
        }
        self.notify(ToastKind::Err, err.to_string())
    }

    /// Build the user interface
    fn view(&self) -> Element<'_, Message> {
        let mut content: Column<Message> = column![
            ui::panels::header(self.light_theme),
            ui::panels::drop_zone(self.drag_hover, self.camera_opening),
        ]
        .spacing(20)
        .padding(30);

        if let Some(camera) = ui::panels::camera(&self.camera) {
            content = content.push(camera);
        }
        content = content.push(ui::card::grid(&self.board));

        let page = scrollable(container(content).width(Length::Fill)).height(Length::Fill);

        stack![page, ui::toast::overlay(&self.toasts)].into()
    }

    fn subscription(&self) -> Subscription<Message> {
        let drops = event::listen_with(|event, _status, _window| match event {
            Event::Window(window::Event::FileHovered(_)) => Some(Message::FilesHovered),
            Event::Window(window::Event::FilesHoveredLeft) => Some(Message::FilesHoverLeft),
            Event::Window(window::Event::FileDropped(path)) => Some(Message::FileDropped(path)),
            _ => None,
        });

        if self.camera.is_active() {
            Subscription::batch([
                drops,
                time::every(self.config.frame_interval).map(|_| Message::FrameTick),
            ])
        } else {
            drops
        }
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        if self.light_theme {
            Theme::Light
        } else {
            Theme::Dark
        }
    }
}

/// Deliver `message` once `delay` has passed
fn after(delay: Duration, message: Message) -> Task<Message> {
    Task::perform(
        async move {
            tokio::time::sleep(delay).await;
            message
        },
        |message| message,
    )
}

/// Read the files of a batch in the background
fn load(paths: Vec<PathBuf>) -> Task<Message> {
    Task::perform(files::load_batch(paths), Message::BatchLoaded)
}

fn main() -> iced::Result {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env();

    iced::application("Lab Lens", LabLens::update, LabLens::view)
        .subscription(LabLens::subscription)
        .theme(LabLens::theme)
        .window_size((1100.0, 800.0))
        .centered()
        .run_with(move || LabLens::new(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::camera::tests::{solid_frame, MockCamera};
    use crate::state::data::CardStatus;
    use std::sync::atomic::Ordering;

    fn app() -> LabLens {
        LabLens::with_config(Config::default())
    }

    fn pending(name: &str) -> PendingImage {
        PendingImage {
            filename: name.to_string(),
            bytes: vec![0xFF, 0xD8, 0xFF, 0xD9],
            mime: "image/jpeg".to_string(),
        }
    }

    fn submitted_ids(app: &LabLens) -> Vec<u64> {
        let mut ids: Vec<u64> = app.board.cards().iter().map(|c| c.id).collect();
        ids.sort_unstable();
        ids
    }

    #[test]
    fn test_dropping_non_image_makes_no_card() {
        let dir = tempfile::tempdir().unwrap();
        let notes = dir.path().join("notes.txt");
        std::fs::write(&notes, b"centrifuge at 4000 rpm").unwrap();

        let mut app = app();
        let _ = app.update(Message::FilesHovered);
        assert!(app.drag_hover);
        let _ = app.update(Message::FileDropped(notes));
        assert!(!app.drag_hover);
        let _ = app.update(Message::DropSettled(app.drop_generation));

        assert!(app.board.is_empty());
        assert_eq!(app.toasts.len(), 1);
        assert_eq!(app.toasts.error_count(), 1);
        assert_eq!(app.toasts.iter().next().unwrap().message, "No images detected.");
    }

    #[test]
    fn test_stale_drop_settle_is_ignored() {
        let mut app = app();
        let _ = app.update(Message::FileDropped(PathBuf::from("/tmp/a.txt")));
        let stale = app.drop_generation;
        let _ = app.update(Message::FileDropped(PathBuf::from("/tmp/b.txt")));

        let _ = app.update(Message::DropSettled(stale));
        assert_eq!(app.dropped.len(), 2);
        assert!(app.toasts.is_empty());
    }

    #[test]
    fn test_batch_of_n_makes_n_cards_resolved_in_order() {
        let mut app = app();
        let _ = app.update(Message::BatchLoaded(vec![
            Ok(pending("a.jpg")),
            Ok(pending("b.jpg")),
            Ok(pending("c.jpg")),
        ]));

        assert_eq!(app.board.len(), 3);
        assert_eq!(app.board.pending_count(), 3);

        let ids = submitted_ids(&app);
        let results = vec![
            IdentifyResult {
                name: Some("Beaker".to_string()),
                description: Some("Holds liquids.".to_string()),
                ..Default::default()
            },
            IdentifyResult {
                error: Some("Empty file.".to_string()),
                ..Default::default()
            },
            IdentifyResult {
                name: Some("Microscope".to_string()),
                ..Default::default()
            },
        ];
        let _ = app.update(Message::BatchFinished {
            ids: ids.clone(),
            outcome: Ok(results),
        });

        assert_eq!(app.board.len(), 3);
        assert_eq!(app.board.get(ids[0]).unwrap().title(), "Beaker");
        assert!(matches!(app.board.get(ids[1]).unwrap().status, CardStatus::Failed { .. }));
        assert_eq!(app.board.get(ids[2]).unwrap().title(), "Microscope");
        assert_eq!(app.board.get(ids[2]).unwrap().body(), "—");
        assert_eq!(app.toasts.iter().next().unwrap().message, "Analyzed 3 image(s).");
        assert_eq!(app.toasts.error_count(), 0);
    }

    #[test]
    fn test_unreadable_file_is_left_out_of_batch() {
        let mut app = app();
        let _ = app.update(Message::BatchLoaded(vec![
            Ok(pending("a.jpg")),
            Err(AppError::FileRead {
                path: "/gone.jpg".to_string(),
                reason: "not found".to_string(),
            }),
        ]));

        assert_eq!(app.board.len(), 1);
        assert_eq!(app.toasts.error_count(), 1);
    }

    #[test]
    fn test_malformed_response_leaves_cards_untouched() {
        let mut app = app();
        let _ = app.update(Message::BatchLoaded(vec![Ok(pending("a.jpg")), Ok(pending("b.jpg"))]));
        let ids = submitted_ids(&app);

        let _ = app.update(Message::BatchFinished {
            ids,
            outcome: Err(AppError::MalformedResponse),
        });

        assert_eq!(app.board.pending_count(), 2);
        assert_eq!(app.toasts.len(), 1);
        assert_eq!(
            app.toasts.iter().next().unwrap().message,
            "Malformed server response."
        );
    }

    #[test]
    fn test_capture_before_dimensions_known() {
        let mut app = app();
        let (camera, _) = MockCamera::new(vec![]);
        app.camera.attach(CameraHandle::new(Box::new(camera)));

        let _ = app.update(Message::Capture);

        assert!(app.board.is_empty());
        assert_eq!(app.toasts.error_count(), 1);
        assert_eq!(
            app.toasts.iter().next().unwrap().message,
            "Could not capture frame — try again."
        );
    }

    #[test]
    fn test_capture_adds_one_card() {
        let mut app = app();
        let (camera, _) = MockCamera::new(vec![]);
        let generation = app.camera.attach(CameraHandle::new(Box::new(camera)));
        let _ = app.camera.begin_grab();
        let _ = app.update(Message::FrameGrabbed(generation, Ok(solid_frame(32, 24))));

        let _ = app.update(Message::Capture);

        assert_eq!(app.board.len(), 1);
        assert!(app.board.cards()[0].badge.starts_with("camera_"));
        assert!(app.camera.is_active());
    }

    #[test]
    fn test_close_camera_stops_tracks() {
        let mut app = app();
        let (camera, stops) = MockCamera::new(vec![]);
        let generation = app.camera.attach(CameraHandle::new(Box::new(camera)));
        let _ = app.camera.begin_grab();
        let _ = app.update(Message::FrameGrabbed(generation, Ok(solid_frame(8, 8))));
        assert!(app.camera.preview().is_some());

        let _ = app.update(Message::CloseCamera);

        assert_eq!(stops.load(Ordering::SeqCst), 1);
        assert!(!app.camera.is_active());
        assert!(app.camera.preview().is_none());
    }

    #[test]
    fn test_camera_denied_shows_message() {
        let mut app = app();
        let _ = app.update(Message::OpenCamera);
        assert!(app.camera_opening);

        let _ = app.update(Message::CameraOpened(Err(AppError::CameraAccess(
            "Permission denied".to_string(),
        ))));

        assert!(!app.camera_opening);
        assert!(!app.camera.is_active());
        assert_eq!(
            app.toasts.iter().next().unwrap().message,
            "Could not access camera. Check permissions or try a different device."
        );
    }

    #[test]
    fn test_reopen_releases_held_camera_first() {
        let mut app = app();
        let (camera, stops) = MockCamera::new(vec![]);
        let generation = app.camera.attach(CameraHandle::new(Box::new(camera)));
        let _ = app.camera.begin_grab();
        let _ = app.update(Message::FrameGrabbed(generation, Ok(solid_frame(8, 8))));

        let _ = app.update(Message::OpenCamera);

        assert_eq!(stops.load(Ordering::SeqCst), 1);
        assert!(!app.camera.is_active());
        assert!(app.camera.preview().is_none());
        assert!(app.camera_opening);
    }

    #[test]
    fn test_toast_fades_then_expires() {
        let mut app = app();
        let _ = app.update(Message::Capture);
        let id = app.toasts.iter().next().unwrap().id;

        let _ = app.update(Message::ToastFade(id));
        assert!(app.toasts.iter().next().unwrap().fading);

        let _ = app.update(Message::ToastExpired(id));
        assert!(app.toasts.is_empty());
    }

    #[test]
    fn test_theme_toggle() {
        let mut app = app();
        assert_eq!(app.theme(), Theme::Dark);
        let _ = app.update(Message::ToggleTheme);
        assert_eq!(app.theme(), Theme::Light);
    }
}
