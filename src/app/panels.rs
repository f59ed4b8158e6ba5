//! Toolbar, composer and settings panels around the canvas

use super::App;
use crate::constants::*;
use crate::theme;
use crate::utils::preview_text;
use eframe::egui;
use tracing::info;

pub(super) const NEW_CONVERSATION_ICON: &str = egui_phosphor::regular::FILE_PLUS;
const ZOOM_IN_ICON: &str = egui_phosphor::regular::PLUS;
const ZOOM_OUT_ICON: &str = egui_phosphor::regular::MINUS;

impl App {
    // ========================================================================
    // TOOLBAR
    // ========================================================================

    pub(crate) fn render_toolbar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("toolbar")
            .frame(
                egui::Frame::new()
                    .fill(theme::BG_ELEVATED)
                    .inner_margin(egui::Margin::symmetric(12, 6))
                    .stroke(egui::Stroke::new(theme::STROKE_DEFAULT, theme::BORDER_SUBTLE)),
            )
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label(
                        egui::RichText::new(format!(
                            "{}  {}",
                            egui_phosphor::regular::TREE_STRUCTURE,
                            APP_NAME
                        ))
                        .size(theme::FONT_HEADING)
                        .color(theme::ACCENT),
                    );
                    ui.add_space(theme::SPACING_MD);
                    ui.separator();

                    if theme::icon_button(
                        ui,
                        NEW_CONVERSATION_ICON,
                        "New conversation",
                        !self.graph.is_empty(),
                    )
                    .clicked()
                    {
                        self.new_conversation();
                    }

                    ui.separator();
                    let canvas = self.canvas_rect;

                    if theme::icon_button(ui, ZOOM_OUT_ICON, "Zoom out", true)
                        .clicked()
                    {
                        if let Some(canvas) = canvas {
                            self.viewport.step_zoom(canvas, -1.0);
                        }
                    }

                    // Zoom percentage (fixed width to prevent layout shift)
                    let (pct_rect, _) = ui.allocate_exact_size(
                        egui::vec2(44.0, theme::BUTTON_HEIGHT),
                        egui::Sense::hover(),
                    );
                    ui.painter().text(
                        pct_rect.center(),
                        egui::Align2::CENTER_CENTER,
                        format!("{:.0}%", self.viewport.zoom * 100.0),
                        egui::FontId::proportional(theme::FONT_SECTION),
                        theme::TEXT_SECONDARY,
                    );

                    if theme::icon_button(ui, ZOOM_IN_ICON, "Zoom in", true)
                        .clicked()
                    {
                        if let Some(canvas) = canvas {
                            self.viewport.step_zoom(canvas, 1.0);
                        }
                    }
                    if theme::icon_button(
                        ui,
                        egui_phosphor::regular::CORNERS_IN,
                        "Fit to window (F)",
                        true,
                    )
                    .clicked()
                    {
                        self.fit_requested = true;
                    }
                    if theme::icon_button(ui, "1:1", "Actual size (Ctrl+0)", true).clicked() {
                        self.viewport.reset();
                    }

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        let gear = theme::icon_button(
                            ui,
                            egui_phosphor::regular::GEAR,
                            "Settings",
                            true,
                        );
                        if gear.clicked() {
                            self.toggle_settings();
                        }

                        let active = self.active_streams();
                        let status = if active > 0 {
                            egui::RichText::new(format!(
                                "{} generating",
                                active
                            ))
                            .color(theme::ACCENT)
                        } else {
                            egui::RichText::new(format!(
                                "{} nodes • {}",
                                self.graph.len(),
                                self.settings.model
                            ))
                            .color(theme::TEXT_DIM)
                        };
                        ui.label(status.size(theme::FONT_SECTION));
                    });
                });
            });
    }

    fn toggle_settings(&mut self) {
        self.show_settings = !self.show_settings;
        if !self.show_settings {
            self.settings = self.settings.clone().sanitized();
            self.save_settings();
            info!("Settings saved");
        }
    }

    // ========================================================================
    // COMPOSER
    // ========================================================================

    pub(crate) fn render_composer(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("composer")
            .frame(
                egui::Frame::new()
                    .fill(theme::BG_ELEVATED)
                    .inner_margin(egui::Margin::same(12))
                    .stroke(egui::Stroke::new(theme::STROKE_DEFAULT, theme::BORDER_SUBTLE)),
            )
            .show(ctx, |ui| {
                let target = match self.selected.and_then(|id| self.graph.get(id)) {
                    Some(node) => format!(
                        "{}  Replying to {} {}: {}",
                        egui_phosphor::regular::ARROW_BEND_DOWN_RIGHT,
                        node.author.label(),
                        node.id,
                        preview_text(&node.text, 60)
                    ),
                    None => format!(
                        "{}  New conversation",
                        egui_phosphor::regular::CHAT_TEXT
                    ),
                };
                ui.label(
                    egui::RichText::new(target)
                        .size(theme::FONT_SECTION)
                        .color(theme::TEXT_MUTED),
                );

                let composer_id = egui::Id::new("composer");
                // Consume Ctrl+Enter before the text edit turns it into a newline
                let had_focus = ui.memory(|m| m.has_focus(composer_id));
                let send_shortcut = had_focus
                    && ui.input_mut(|i| i.consume_key(egui::Modifiers::COMMAND, egui::Key::Enter));

                let mut send_clicked = false;
                ui.horizontal(|ui| {
                    let buttons_width = 110.0;
                    let edit = egui::TextEdit::multiline(&mut self.composer)
                        .id(composer_id)
                        .hint_text("Message… (Ctrl+Enter to send)")
                        .desired_rows(3)
                        .desired_width(ui.available_width() - buttons_width)
                        .background_color(theme::BG_INPUT);
                    let resp = ui.add(edit);
                    if self.focus_composer {
                        resp.request_focus();
                        self.focus_composer = false;
                    }

                    ui.vertical(|ui| {
                        let can_send = !self.composer.trim().is_empty();
                        let send = ui.add_enabled(
                            can_send,
                            theme::button_accent(format!(
                                "{}  Send",
                                egui_phosphor::regular::PAPER_PLANE_RIGHT
                            ))
                            .min_size(egui::vec2(buttons_width - 12.0, theme::BUTTON_HEIGHT)),
                        );
                        send_clicked = send.clicked();

                        if self.active_streams() > 0 {
                            let stop = ui.add(
                                theme::button_danger(format!(
                                    "{}  Stop",
                                    egui_phosphor::regular::STOP
                                ))
                                .min_size(egui::vec2(buttons_width - 12.0, theme::BUTTON_HEIGHT)),
                            );
                            if stop.clicked() {
                                self.stop_all();
                            }
                        }
                    });
                });

                if send_shortcut || send_clicked {
                    self.send_message(ctx);
                    self.focus_composer = true;
                }
            });
    }

    // ========================================================================
    // SETTINGS PANEL
    // ========================================================================

    pub(crate) fn render_settings_panel(&mut self, ctx: &egui::Context) {
        let mut close = false;
        egui::SidePanel::right("settings_panel")
            .exact_width(theme::SETTINGS_PANEL_WIDTH)
            .resizable(false)
            .frame(
                egui::Frame::new()
                    .fill(theme::BG_BASE)
                    .inner_margin(egui::Margin::same(16))
                    .stroke(egui::Stroke::new(theme::STROKE_DEFAULT, theme::BORDER_SUBTLE)),
            )
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label(
                        egui::RichText::new(format!("{}  Settings", egui_phosphor::regular::GEAR))
                            .size(theme::FONT_HEADING)
                            .color(theme::TEXT_PRIMARY),
                    );
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if theme::icon_button(ui, egui_phosphor::regular::X, "Close", true).clicked() {
                            close = true;
                        }
                    });
                });
                ui.add_space(theme::SPACING_MD);

                egui::ScrollArea::vertical().show(ui, |ui| {
                    theme::section_frame().show(ui, |ui| {
                        ui.set_width(ui.available_width());
                        section_label(ui, "SERVER");
                        ui.label("Endpoint");
                        ui.add(
                            egui::TextEdit::singleline(&mut self.settings.endpoint)
                                .desired_width(f32::INFINITY)
                                .hint_text(DEFAULT_ENDPOINT),
                        );
                        ui.label("Model");
                        ui.add(
                            egui::TextEdit::singleline(&mut self.settings.model)
                                .desired_width(f32::INFINITY),
                        );
                        ui.label("Temperature");
                        ui.add(egui::Slider::new(&mut self.settings.temperature, 0.0..=2.0).step_by(0.05));

                        let mut limit = self.settings.max_tokens.is_some();
                        if ui.checkbox(&mut limit, "Limit reply length").changed() {
                            self.settings.max_tokens = limit.then_some(1024);
                        }
                        if let Some(max) = self.settings.max_tokens.as_mut() {
                            ui.add(egui::DragValue::new(max).range(16..=32768).suffix(" tokens"));
                        }
                    });

                    ui.add_space(theme::SPACING_MD);
                    theme::section_frame().show(ui, |ui| {
                        ui.set_width(ui.available_width());
                        section_label(ui, "SYSTEM PROMPT");
                        ui.add(
                            egui::TextEdit::multiline(&mut self.settings.system_prompt)
                                .desired_rows(5)
                                .desired_width(f32::INFINITY),
                        );
                    });

                    ui.add_space(theme::SPACING_MD);
                    theme::section_frame().show(ui, |ui| {
                        ui.set_width(ui.available_width());
                        section_label(ui, "CANVAS");
                        ui.label("New node width");
                        ui.add(egui::Slider::new(
                            &mut self.settings.node_width,
                            NODE_MIN_WIDTH..=800.0,
                        ));
                        ui.checkbox(&mut self.settings.show_grid, "Show grid");
                    });

                    ui.add_space(theme::SPACING_LG);
                    ui.label(
                        egui::RichText::new(format!("v{}", APP_VERSION))
                            .size(theme::FONT_CAPTION)
                            .color(theme::TEXT_DIM),
                    );
                });
            });

        if close {
            self.toggle_settings();
        }
    }
}

fn section_label(ui: &mut egui::Ui, text: &str) {
    ui.label(
        egui::RichText::new(text)
            .size(theme::FONT_SECTION)
            .color(theme::TEXT_DIM),
    );
    ui.add_space(theme::SPACING_XS);
}
