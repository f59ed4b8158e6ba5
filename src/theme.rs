//! Colors, sizes and widget styling for Chat Canvas

use crate::types::Author;
use egui::Color32;

// =============================================================================
// COLORS - Chrome
// =============================================================================
pub const BG_BASE: Color32 = Color32::from_rgb(0x09, 0x09, 0x0b); // zinc-950
pub const BG_ELEVATED: Color32 = Color32::from_rgb(0x18, 0x18, 0x1b); // zinc-900
pub const BG_INPUT: Color32 = Color32::from_rgb(0x14, 0x14, 0x18);
pub const BG_SURFACE: Color32 = Color32::from_rgb(0x27, 0x27, 0x2a); // zinc-800
pub const ACCENT: Color32 = Color32::from_rgb(0x2d, 0xd4, 0xbf); // teal-400
pub const DANGER: Color32 = Color32::from_rgb(0xdc, 0x26, 0x26); // red-600

pub const TEXT_PRIMARY: Color32 = Color32::WHITE;
pub const TEXT_SECONDARY: Color32 = Color32::from_rgb(0xe4, 0xe4, 0xe7); // zinc-200
pub const TEXT_MUTED: Color32 = Color32::from_rgb(0xa1, 0xa1, 0xaa); // zinc-400
pub const TEXT_DIM: Color32 = Color32::from_rgb(0x71, 0x71, 0x7a); // zinc-500

pub const BORDER_SUBTLE: Color32 = Color32::from_rgb(0x27, 0x27, 0x2a); // zinc-800
pub const BORDER_DEFAULT: Color32 = Color32::from_rgb(0x3f, 0x3f, 0x46); // zinc-700

// =============================================================================
// COLORS - Canvas
// =============================================================================
pub const CANVAS_BG: Color32 = Color32::from_rgb(0x0c, 0x0c, 0x0f);
pub const GRID_DOT: Color32 = Color32::from_rgb(0x27, 0x27, 0x2a);
pub const EDGE: Color32 = Color32::from_rgb(0x52, 0x52, 0x5b); // zinc-600
pub const EDGE_ACTIVE: Color32 = ACCENT; // path to the selection
pub const NODE_FILL: Color32 = Color32::from_rgb(0x18, 0x18, 0x1b);
pub const NODE_SELECTED: Color32 = ACCENT;

/// (header tint, label color) for a node's author badge
pub fn author_colors(author: Author) -> (Color32, Color32) {
    let accent = match author {
        Author::User => Color32::from_rgb(0x38, 0xbd, 0xf8), // sky-400
        Author::Assistant => ACCENT,
        Author::System => TEXT_MUTED,
    };
    let tint = Color32::from_rgba_unmultiplied(accent.r(), accent.g(), accent.b(), 26);
    (tint, accent)
}

// =============================================================================
// SIZES
// =============================================================================
pub const FONT_HEADING: f32 = 16.0;
pub const FONT_BODY: f32 = 14.0;
pub const FONT_SECTION: f32 = 12.0;
pub const FONT_SMALL: f32 = 11.0;
pub const FONT_CAPTION: f32 = 10.0;
const FONT_MENU: f32 = 13.0;

pub const SETTINGS_PANEL_WIDTH: f32 = 290.0;
pub const MENU_WIDTH: f32 = 190.0;
pub const BUTTON_HEIGHT: f32 = 28.0;

pub const RADIUS_DEFAULT: f32 = 4.0;
pub const RADIUS_LARGE: f32 = 8.0;

pub const STROKE_DEFAULT: f32 = 1.0;
pub const STROKE_MEDIUM: f32 = 1.5;
pub const STROKE_THICK: f32 = 2.0;

pub const SPACING_XS: f32 = 2.0;
pub const SPACING_MD: f32 = 8.0;
pub const SPACING_LG: f32 = 12.0;

// =============================================================================
// GLOBAL VISUALS
// =============================================================================
pub fn apply_visuals(ctx: &egui::Context) {
    let mut visuals = egui::Visuals::dark();
    visuals.panel_fill = BG_BASE;
    visuals.window_fill = BG_ELEVATED;
    visuals.extreme_bg_color = BG_INPUT;
    visuals.faint_bg_color = BG_ELEVATED;
    visuals.hyperlink_color = ACCENT;
    visuals.selection.bg_fill = Color32::from_rgb(0x3a, 0x3a, 0x3f);
    visuals.selection.stroke = egui::Stroke::new(STROKE_DEFAULT, ACCENT);
    visuals.window_stroke = egui::Stroke::new(STROKE_DEFAULT, BORDER_DEFAULT);
    visuals.window_corner_radius = egui::CornerRadius::same(RADIUS_LARGE as u8);
    visuals.menu_corner_radius = egui::CornerRadius::same(RADIUS_LARGE as u8);
    visuals.interact_cursor = Some(egui::CursorIcon::PointingHand);
    visuals.slider_trailing_fill = true;

    let w = &mut visuals.widgets;
    for state in [&mut w.noninteractive, &mut w.inactive, &mut w.hovered, &mut w.active, &mut w.open] {
        state.corner_radius = RADIUS_DEFAULT.into();
    }
    w.noninteractive.bg_stroke = egui::Stroke::new(STROKE_DEFAULT, BORDER_SUBTLE);
    w.noninteractive.fg_stroke = egui::Stroke::new(STROKE_DEFAULT, TEXT_SECONDARY);
    w.inactive.weak_bg_fill = BG_ELEVATED;
    w.inactive.bg_fill = BG_SURFACE;
    w.inactive.fg_stroke = egui::Stroke::new(STROKE_DEFAULT, TEXT_SECONDARY);
    w.hovered.weak_bg_fill = BG_SURFACE;
    w.hovered.bg_stroke = egui::Stroke::new(STROKE_DEFAULT, BORDER_DEFAULT);
    w.active.bg_fill = ACCENT;
    ctx.set_visuals(visuals);

    ctx.style_mut(|style| {
        style.interaction.selectable_labels = false;
        style.spacing.item_spacing = egui::vec2(8.0, 6.0);
        style.spacing.button_padding = egui::vec2(12.0, 6.0);
        style.spacing.scroll.bar_width = 6.0;
        style.spacing.scroll.floating = false;
    });
}

// =============================================================================
// WIDGETS
// =============================================================================

/// Primary action (Send)
pub fn button_accent(text: impl Into<String>) -> egui::Button<'static> {
    egui::Button::new(egui::RichText::new(text.into()).color(BG_BASE))
        .fill(ACCENT)
        .corner_radius(RADIUS_DEFAULT)
}

/// Destructive action (Stop)
pub fn button_danger(text: impl Into<String>) -> egui::Button<'static> {
    egui::Button::new(egui::RichText::new(text.into()).color(TEXT_PRIMARY))
        .fill(DANGER)
        .corner_radius(RADIUS_DEFAULT)
}

/// Full-width context menu row. Returns true if clicked.
pub fn menu_item(ui: &mut egui::Ui, icon: &str, label: &str) -> bool {
    let text = egui::RichText::new(format!("{}  {}", icon, label))
        .size(FONT_MENU)
        .color(TEXT_SECONDARY);
    ui.add(
        egui::Button::new(text)
            .frame(false)
            .min_size(egui::vec2(ui.available_width(), 24.0)),
    )
    .clicked()
}

/// Bordered group in the settings panel
pub fn section_frame() -> egui::Frame {
    egui::Frame::new()
        .fill(BG_INPUT)
        .stroke(egui::Stroke::new(STROKE_DEFAULT, BORDER_SUBTLE))
        .corner_radius(RADIUS_DEFAULT)
        .inner_margin(egui::Margin::same(12))
}

/// Blend toward white by `amount` (0..1)
fn lighten(c: Color32, amount: f32) -> Color32 {
    let up = |v: u8| (v as f32 + (255.0 - v as f32) * amount) as u8;
    Color32::from_rgb(up(c.r()), up(c.g()), up(c.b()))
}

/// Square toolbar button showing a single icon glyph
pub fn icon_button(ui: &mut egui::Ui, icon: &str, tooltip: &str, enabled: bool) -> egui::Response {
    let sense = if enabled { egui::Sense::click() } else { egui::Sense::hover() };
    let (rect, response) = ui.allocate_exact_size(egui::vec2(BUTTON_HEIGHT, BUTTON_HEIGHT), sense);

    let (fill, rect) = if !enabled {
        (BG_ELEVATED, rect)
    } else if response.is_pointer_button_down_on() {
        (lighten(BG_ELEVATED, 0.06), rect.shrink(1.5))
    } else if response.hovered() {
        (lighten(BG_ELEVATED, 0.12), rect)
    } else {
        (BG_ELEVATED, rect)
    };
    ui.painter().rect_filled(rect, RADIUS_DEFAULT, fill);
    ui.painter().text(
        rect.center(),
        egui::Align2::CENTER_CENTER,
        icon,
        egui::FontId::proportional(FONT_BODY),
        if enabled { TEXT_PRIMARY } else { TEXT_DIM },
    );
    if enabled && response.hovered() {
        ui.ctx().set_cursor_icon(egui::CursorIcon::PointingHand);
    }
    response.on_hover_text(tooltip)
}
