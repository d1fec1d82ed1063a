/// Image acquisition
///
/// This module handles:
/// - Dropped and picked files (files.rs)
/// - Live camera preview and frame capture (camera.rs)
/// - The Video4Linux2 camera backend (v4l2.rs, Linux only)

pub mod camera;
pub mod files;

#[cfg(target_os = "linux")]
pub mod v4l2;
