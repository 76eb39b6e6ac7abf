// ABOUTME: Native pointer, keyboard and screen capture providers
// ABOUTME: Backed by enigo and xcap when built with the `desktop` feature

use std::sync::Arc;

use super::{DesktopControl, ScreenCapture};
#[cfg(not(feature = "desktop"))]
use super::Unavailable;

#[cfg(feature = "desktop")]
pub use native::{EnigoDesktop, XcapScreen};

pub fn native_control() -> Arc<dyn DesktopControl> {
    #[cfg(feature = "desktop")]
    {
        Arc::new(EnigoDesktop)
    }
    #[cfg(not(feature = "desktop"))]
    {
        Arc::new(Unavailable::new(
            "built without the `desktop` feature; rebuild with --features desktop",
        ))
    }
}

pub fn native_screen() -> Arc<dyn ScreenCapture> {
    #[cfg(feature = "desktop")]
    {
        Arc::new(XcapScreen)
    }
    #[cfg(not(feature = "desktop"))]
    {
        Arc::new(Unavailable::new(
            "built without the `desktop` feature; rebuild with --features desktop",
        ))
    }
}

#[cfg(feature = "desktop")]
mod native {
    use async_trait::async_trait;
    use enigo::{Button, Coordinate, Direction, Enigo, Keyboard, Mouse, Settings};
    use image::RgbaImage;
    use tracing::debug;

    use crate::capabilities::{DesktopControl, ScreenCapture};
    use crate::engine::error::{ExecutionError, Result};

    /// Pointer and keyboard control through enigo.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct EnigoDesktop;

    fn connect() -> Result<Enigo> {
        Enigo::new(&Settings::default()).map_err(|e| ExecutionError::CapabilityUnavailable {
            capability: "pointer control",
            reason: e.to_string(),
        })
    }

    #[async_trait]
    impl DesktopControl for EnigoDesktop {
        async fn click(&self, position: Option<(i32, i32)>) -> Result<()> {
            tokio::task::block_in_place(|| {
                let mut enigo = connect()?;
                if let Some((x, y)) = position {
                    debug!("Moving pointer to ({}, {})", x, y);
                    enigo
                        .move_mouse(x, y, Coordinate::Abs)
                        .map_err(|e| ExecutionError::capability_failed("pointer control", e))?;
                }
                enigo
                    .button(Button::Left, Direction::Click)
                    .map_err(|e| ExecutionError::capability_failed("pointer control", e))
            })
        }

        async fn type_text(&self, text: &str) -> Result<()> {
            tokio::task::block_in_place(|| {
                let mut enigo = connect()?;
                enigo
                    .text(text)
                    .map_err(|e| ExecutionError::capability_failed("keyboard control", e))
            })
        }

        async fn cursor_position(&self) -> Result<(i32, i32)> {
            tokio::task::block_in_place(|| {
                let enigo = connect()?;
                enigo
                    .location()
                    .map_err(|e| ExecutionError::capability_failed("pointer control", e))
            })
        }
    }

    /// Primary monitor capture through xcap.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct XcapScreen;

    #[async_trait]
    impl ScreenCapture for XcapScreen {
        async fn capture(&self) -> Result<RgbaImage> {
            tokio::task::block_in_place(|| {
                let monitors = xcap::Monitor::all()
                    .map_err(|e| ExecutionError::capability_failed("screen capture", e))?;
                let monitor = monitors.into_iter().next().ok_or_else(|| {
                    ExecutionError::CapabilityUnavailable {
                        capability: "screen capture",
                        reason: "no monitors found".to_string(),
                    }
                })?;
                let frame = monitor
                    .capture_image()
                    .map_err(|e| ExecutionError::capability_failed("screen capture", e))?;

                let (width, height) = (frame.width(), frame.height());
                RgbaImage::from_raw(width, height, frame.into_raw()).ok_or_else(|| {
                    ExecutionError::capability_failed(
                        "screen capture",
                        "captured frame has an unexpected buffer size",
                    )
                })
            })
        }
    }
}
