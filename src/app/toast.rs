//! Toast notification in the bottom-right corner of the canvas

use super::App;
use crate::theme;
use eframe::egui;

impl App {
    /// 3s visible then fade, paused on hover
    pub(crate) fn render_toast(&mut self, ctx: &egui::Context) {
        let (Some(msg), Some(panel_rect)) = (self.toast_message.clone(), self.canvas_rect) else {
            return;
        };
        let visible_duration = 3.0;
        let fade_duration = 0.5;
        let total_duration = visible_duration + fade_duration;
        let margin = 12.0;

        let toast_pos = egui::pos2(panel_rect.right() - margin, panel_rect.bottom() - margin);

        let response = egui::Area::new(egui::Id::new("toast"))
            .fixed_pos(toast_pos)
            .pivot(egui::Align2::RIGHT_BOTTOM)
            .show(ctx, |ui| {
                let elapsed = self.toast_start.map(|t| t.elapsed().as_secs_f32()).unwrap_or(0.0);
                let alpha = if elapsed > visible_duration {
                    ((total_duration - elapsed) / fade_duration).clamp(0.0, 1.0)
                } else {
                    1.0
                };

                egui::Frame::new()
                    .fill(egui::Color32::from_rgba_unmultiplied(0x1a, 0x1a, 0x1e, (230.0 * alpha) as u8))
                    .stroke(egui::Stroke::new(1.0, egui::Color32::from_rgba_unmultiplied(
                        theme::ACCENT.r(), theme::ACCENT.g(), theme::ACCENT.b(), (100.0 * alpha) as u8
                    )))
                    .corner_radius(6.0)
                    .inner_margin(egui::Margin::symmetric(16, 10))
                    .show(ui, |ui| {
                        ui.label(egui::RichText::new(msg).color(
                            egui::Color32::from_rgba_unmultiplied(255, 255, 255, (255.0 * alpha) as u8)
                        ));
                    });
            });

        if response.response.hovered() {
            self.toast_start = Some(std::time::Instant::now());
        }

        let elapsed = self.toast_start.map(|t| t.elapsed().as_secs_f32()).unwrap_or(0.0);
        if elapsed >= total_duration {
            self.toast_message = None;
            self.toast_start = None;
        } else {
            ctx.request_repaint();
        }
    }
}
