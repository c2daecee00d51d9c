use base64::Engine as _;
use image::imageops::FilterType;

use crate::errors::{DeskhandError, DeskhandResult};
use crate::perception::scaling::Resolution;
use crate::perception::types::ScreenshotMeta;

pub struct ScreenshotResult {
    pub image_bytes: Vec<u8>,
    pub image_base64: String,
    pub meta: ScreenshotMeta,
}

/// Capture the primary monitor, resize to `target` and encode as PNG.
///
/// The resize keeps the transport payload bounded and puts the image in
/// the same coordinate space the model issues actions in.
pub async fn capture_primary(target: Resolution) -> DeskhandResult<ScreenshotResult> {
    tokio::task::spawn_blocking(move || capture_primary_blocking(target))
        .await
        .map_err(|e| DeskhandError::Capture(format!("capture task panicked: {e}")))?
}

fn capture_primary_blocking(target: Resolution) -> DeskhandResult<ScreenshotResult> {
    let monitor = primary_monitor()?;
    let physical_width = monitor.width();
    let physical_height = monitor.height();

    let frame = monitor
        .capture_image()
        .map_err(|e| DeskhandError::Capture(format!("capture failed: {e}")))?;

    let resized = image::imageops::resize(&frame, target.width, target.height, FilterType::Lanczos3);

    let mut png = Vec::new();
    image::DynamicImage::ImageRgba8(resized)
        .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
        .map_err(|e| DeskhandError::Capture(format!("PNG encode: {e}")))?;

    let image_base64 = base64::engine::general_purpose::STANDARD.encode(&png);

    tracing::debug!(
        phys = %format!("{physical_width}x{physical_height}"),
        encoded = %target,
        bytes = png.len(),
        "screenshot captured"
    );

    Ok(ScreenshotResult {
        image_bytes: png,
        image_base64,
        meta: ScreenshotMeta {
            physical_width,
            physical_height,
            encoded_width: target.width,
            encoded_height: target.height,
        },
    })
}

/// Physical resolution of the primary monitor.
pub fn primary_resolution() -> DeskhandResult<Resolution> {
    let monitor = primary_monitor()?;
    Ok(Resolution::new(monitor.width(), monitor.height()))
}

fn primary_monitor() -> DeskhandResult<xcap::Monitor> {
    let monitors = xcap::Monitor::all()
        .map_err(|e| DeskhandError::Capture(format!("monitor enumeration: {e}")))?;
    monitors
        .into_iter()
        .find(|m| m.is_primary())
        .ok_or_else(|| DeskhandError::Capture("no primary monitor found".into()))
}
