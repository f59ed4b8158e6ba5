//! Utility functions

use crate::constants::APP_NAME;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

// No stroke, square viewBox — for window/taskbar icons
pub const ICON_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 64 64"><rect x="2" y="2" width="60" height="60" rx="12" fill="#18181b"/><path d="M22 18v12M22 30l-8 14M22 30l10 14M32 44l10-10" stroke="#3f3f46" stroke-width="3" fill="none" stroke-linecap="round"/><rect x="12" y="8" width="20" height="12" rx="3" fill="#ffffff"/><rect x="6" y="40" width="16" height="10" rx="3" fill="#2dd4bf"/><rect x="26" y="40" width="16" height="10" rx="3" fill="#2dd4bf"/><rect x="38" y="28" width="20" height="12" rx="3" fill="#ffffff"/></svg>"##;

/// Rasterize the icon SVG to a square RGBA image (for window/taskbar icons).
pub fn rasterize_icon(size: u32) -> Option<(Vec<u8>, u32, u32)> {
    let tree = resvg::usvg::Tree::from_str(ICON_SVG, &resvg::usvg::Options::default()).ok()?;
    let scale = size as f32 / tree.size().width();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size, size)?;
    resvg::render(
        &tree,
        resvg::usvg::Transform::from_scale(scale, scale),
        &mut pixmap.as_mut(),
    );
    Some((premul_to_straight(&pixmap), size, size))
}

fn premul_to_straight(pixmap: &resvg::tiny_skia::Pixmap) -> Vec<u8> {
    pixmap
        .pixels()
        .iter()
        .flat_map(|p| {
            let a = p.alpha();
            if a == 0 {
                [0, 0, 0, 0]
            } else {
                let r = (p.red() as u16 * 255 / a as u16) as u8;
                let g = (p.green() as u16 * 255 / a as u16) as u8;
                let b = (p.blue() as u16 * 255 / a as u16) as u8;
                [r, g, b, a]
            }
        })
        .collect()
}

/// Get the app data directory path (settings, logs)
pub fn get_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// A panicked streaming task must not take the UI down with it
pub fn lock_ignore_poison<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Single-line preview of node text for labels and logs
pub fn preview_text(text: &str, max_chars: usize) -> String {
    let line = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if line.chars().count() > max_chars {
        let cut: String = line.chars().take(max_chars.saturating_sub(1)).collect();
        format!("{}…", cut.trim_end())
    } else {
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_collapses_whitespace_and_truncates() {
        assert_eq!(preview_text("hello\n  world", 40), "hello world");
        assert_eq!(preview_text("abcdefghij", 5), "abcd…");
        assert_eq!(preview_text("", 5), "");
    }

    #[test]
    fn icon_rasterizes() {
        let (rgba, w, h) = rasterize_icon(32).unwrap();
        assert_eq!((w, h), (32, 32));
        assert_eq!(rgba.len(), 32 * 32 * 4);
    }
}
