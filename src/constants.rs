//! Application constants and configuration

pub const APP_NAME: &str = "Chat Canvas";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8080/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "local-model";
pub const ENDPOINT_ENV: &str = "CHAT_CANVAS_ENDPOINT";
pub const MODEL_ENV: &str = "CHAT_CANVAS_MODEL";

/// Viewport zoom limits
pub const MIN_ZOOM: f32 = 0.1;
pub const MAX_ZOOM: f32 = 5.0;
pub const ZOOM_STEP: f32 = 0.25;

/// Node geometry, in world units
pub const NODE_DEFAULT_WIDTH: f32 = 320.0;
pub const NODE_MIN_WIDTH: f32 = 160.0;
pub const NODE_MIN_HEIGHT: f32 = 72.0;
pub const NODE_HEADER_HEIGHT: f32 = 26.0;
pub const NODE_PADDING: f32 = 10.0;
pub const NODE_FONT_SIZE: f32 = 14.0;
pub const NODE_GAP_X: f32 = 40.0;
pub const NODE_GAP_Y: f32 = 60.0;
pub const RESIZE_HANDLE: f32 = 14.0;

/// Minimum interval between repaint requests from a streaming task
pub const STREAM_REPAINT_MS: u64 = 50;
