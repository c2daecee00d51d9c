use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenshotMeta {
    pub physical_width: u32,
    pub physical_height: u32,
    /// Dimensions the image was resized to before encoding.
    pub encoded_width: u32,
    pub encoded_height: u32,
}
