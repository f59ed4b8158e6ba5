//! Canvas rendering and pointer/keyboard handling

use super::context_menu::{CanvasAction, NodeAction};
use super::App;
use crate::constants::*;
use crate::graph::Node;
use crate::interaction::{drag_kind, grip_size, Interaction};
use crate::theme;
use crate::types::*;
use crate::viewport::Viewport;
use eframe::egui;
use std::collections::HashSet;

const GRID_SPACING: f32 = 32.0;

/// Text shown in a node body
fn display_text(node: &Node) -> &str {
    if node.text.is_empty() && node.streaming {
        "Thinking…"
    } else {
        &node.text
    }
}

impl App {
    pub(crate) fn render_canvas(&mut self, ui: &mut egui::Ui) {
        let (rect, response) =
            ui.allocate_exact_size(ui.available_size(), egui::Sense::click_and_drag());
        self.canvas_rect = Some(rect);

        if self.fit_requested {
            self.fit_requested = false;
            self.fit_view();
        }

        self.handle_canvas_input(ui, rect, &response);
        self.fit_node_heights(ui);

        let painter = ui.painter_at(rect);
        painter.rect_filled(rect, 0.0, theme::CANVAS_BG);
        if self.settings.show_grid {
            self.paint_grid(&painter, rect);
        }
        self.paint_edges(&painter, rect);
        self.paint_nodes(ui, &painter, rect);

        if self.graph.is_empty() {
            painter.text(
                rect.center(),
                egui::Align2::CENTER_CENTER,
                format!(
                    "{}  Type a message below to start a conversation",
                    egui_phosphor::regular::CHAT_TEXT
                ),
                egui::FontId::proportional(theme::FONT_BODY),
                theme::TEXT_DIM,
            );
        }

        // Right-click menu: node actions if a node was hit, canvas actions otherwise
        let mut node_action = NodeAction::default();
        let mut canvas_action = CanvasAction::default();
        response.context_menu(|ui| match self.context_node {
            Some(id) if self.graph.contains(id) => node_action = self.node_context_menu(ui, id),
            _ => canvas_action = self.canvas_context_menu(ui),
        });
        let ctx = ui.ctx().clone();
        self.apply_node_action(&ctx, node_action);
        self.apply_canvas_action(canvas_action);
    }

    fn handle_canvas_input(&mut self, ui: &egui::Ui, rect: egui::Rect, response: &egui::Response) {
        let pointer = response.interact_pointer_pos();
        let to_world = |vp: &Viewport, p: egui::Pos2| vp.screen_to_world(rect, p);

        // Drag: pan, move node, or resize node
        let drag_button = [egui::PointerButton::Primary, egui::PointerButton::Middle]
            .into_iter()
            .find(|b| response.drag_started_by(*b));
        if let Some(button) = drag_button {
            let origin = ui.input(|i| i.pointer.press_origin()).or(pointer);
            let space_held =
                ui.input(|i| i.key_down(egui::Key::Space)) && !ui.ctx().wants_keyboard_input();
            if let (Some(origin), Some(force_pan)) = (origin, drag_kind(button, space_held)) {
                if let Some(id) =
                    self.interaction
                        .begin(&mut self.graph, &self.viewport, rect, origin, force_pan)
                {
                    self.selected = Some(id);
                }
            }
        }
        if response.dragged() {
            if let Some(pos) = pointer {
                self.interaction.update(
                    &mut self.graph,
                    &mut self.viewport,
                    rect,
                    pos,
                    response.drag_delta(),
                );
            }
        }
        if response.drag_stopped() {
            self.interaction.end();
        }

        // Clicks: select, double-click to focus the composer
        if response.clicked() {
            let hit = pointer.and_then(|p| self.graph.hit_test(to_world(&self.viewport, p)));
            self.select(hit);
        }
        if response.double_clicked() {
            self.focus_composer = true;
        }
        if response.secondary_clicked() {
            self.context_node =
                pointer.and_then(|p| self.graph.hit_test(to_world(&self.viewport, p)));
            if self.context_node.is_some() {
                self.select(self.context_node);
            }
        }

        // Wheel / pinch zoom around the cursor
        if let Some(hover) = response.hover_pos() {
            let (zoom_delta, scroll) = ui.input(|i| (i.zoom_delta(), i.raw_scroll_delta));
            if zoom_delta != 1.0 {
                self.viewport.zoom_around(rect, hover, zoom_delta);
            } else if scroll.y != 0.0 {
                let zoom_factor = 1.0 + scroll.y * 0.001;
                self.viewport.zoom_around(rect, hover, zoom_factor);
            }
            if scroll.x != 0.0 {
                self.viewport.pan(egui::vec2(scroll.x, 0.0));
            }

            let world = to_world(&self.viewport, hover);
            let handle = grip_size(self.viewport.zoom);
            let cursor = match self.interaction {
                Interaction::Panning
                | Interaction::MovingNode { .. } => {
                    Some(egui::CursorIcon::Grabbing)
                }
                Interaction::Resizing { .. } => {
                    Some(egui::CursorIcon::ResizeNwSe)
                }
                Interaction::Idle => {
                    if self.graph.hit_resize_handle(world, handle).is_some() {
                        Some(egui::CursorIcon::ResizeNwSe)
                    } else if self.graph.hit_test(world).is_some() {
                        Some(egui::CursorIcon::Grab)
                    } else {
                        None
                    }
                }
            };
            if let Some(cursor) = cursor {
                ui.ctx().set_cursor_icon(cursor);
            }
        }
    }

    /// Grow nodes so their text fits; measurement is memoized
    fn fit_node_heights(&mut self, ui: &egui::Ui) {
        for node in self.graph.iter_mut() {
            let wrap = (node.size.x - NODE_PADDING * 2.0).max(1.0);
            let measured = self.text_cache.measure(
                display_text(node),
                wrap,
                NODE_FONT_SIZE,
                |text, width, size| {
                    ui.fonts(|f| {
                        f.layout(
                            text.to_owned(),
                            egui::FontId::proportional(size),
                            theme::TEXT_SECONDARY,
                            width,
                        )
                        .size()
                    })
                },
            );
            let needed = NODE_HEADER_HEIGHT + measured.y + NODE_PADDING * 2.0;
            node.size.y = node.size.y.max(needed).max(NODE_MIN_HEIGHT);
        }
    }

    fn paint_grid(&self, painter: &egui::Painter, rect: egui::Rect) {
        let step = GRID_SPACING * self.viewport.zoom;
        if step < 8.0 {
            return;
        }
        let visible = self.viewport.visible_world(rect);
        let mut x = (visible.min.x / GRID_SPACING).floor() * GRID_SPACING;
        while x <= visible.max.x {
            let mut y = (visible.min.y / GRID_SPACING).floor() * GRID_SPACING;
            while y <= visible.max.y {
                let p = self.viewport.world_to_screen(rect, egui::pos2(x, y));
                painter.circle_filled(p, 1.0, theme::GRID_DOT);
                y += GRID_SPACING;
            }
            x += GRID_SPACING;
        }
    }

    fn paint_edges(&self, painter: &egui::Painter, rect: egui::Rect) {
        // Highlight the transcript that the next reply would be sent with
        let active: HashSet<NodeId> = self
            .selected
            .and_then(|id| self.graph.ancestry(id).ok())
            .map(|path| path.iter().map(|n| n.id).collect())
            .unwrap_or_default();
        let zoom = self.viewport.zoom;

        for (parent, child) in self.graph.edges() {
            let (Some(p), Some(c)) = (self.graph.get(parent), self.graph.get(child)) else {
                continue;
            };
            let from = self.viewport.world_to_screen(rect, p.rect().center_bottom());
            let to = self.viewport.world_to_screen(rect, c.rect().center_top());
            let bend = ((to.y - from.y).abs() * 0.5).max(30.0 * zoom);
            let points = [
                from,
                from + egui::vec2(0.0, bend),
                to - egui::vec2(0.0, bend),
                to,
            ];
            let on_path = active.contains(&parent) && active.contains(&child);
            let (width, color) = if on_path {
                (theme::STROKE_THICK, theme::EDGE_ACTIVE)
            } else {
                (theme::STROKE_MEDIUM, theme::EDGE)
            };
            painter.add(egui::epaint::CubicBezierShape::from_points_stroke(
                points,
                false,
                egui::Color32::TRANSPARENT,
                egui::Stroke::new(width * zoom.clamp(0.5, 2.0), color),
            ));
        }
    }

    fn paint_nodes(&self, ui: &egui::Ui, painter: &egui::Painter, rect: egui::Rect) {
        let zoom = self.viewport.zoom;
        let time = ui.input(|i| i.time);

        for node in self.graph.iter() {
            let screen = self.viewport.world_rect_to_screen(rect, node.rect());
            if !rect.intersects(screen) {
                continue;
            }
            let (badge_bg, accent) = theme::author_colors(node.author);
            let is_selected = self.selected == Some(node.id);
            let radius = (theme::RADIUS_LARGE * zoom).min(255.0);

            painter.rect_filled(screen, radius, theme::NODE_FILL);

            // Header strip
            let header = egui::Rect::from_min_size(
                screen.min,
                egui::vec2(screen.width(), NODE_HEADER_HEIGHT * zoom),
            );
            let r = radius as u8;
            painter.rect_filled(
                header,
                egui::CornerRadius { nw: r, ne: r, sw: 0, se: 0 },
                badge_bg,
            );

            let small = theme::FONT_SMALL * zoom;
            if small >= 5.0 {
                let pad = NODE_PADDING * zoom;
                painter.text(
                    egui::pos2(header.left() + pad, header.center().y),
                    egui::Align2::LEFT_CENTER,
                    node.author.label(),
                    egui::FontId::proportional(small),
                    accent,
                );
                painter.text(
                    egui::pos2(header.right() - pad, header.center().y),
                    egui::Align2::RIGHT_CENTER,
                    format!("{}  {}", node.id, node.created_at.format("%H:%M")),
                    egui::FontId::proportional(small),
                    theme::TEXT_DIM,
                );
            }

            if node.streaming {
                // Pulsing dot while tokens arrive
                let pulse = ((time * 4.0).sin() * 0.5 + 0.5) as f32;
                let alpha = (80.0 + 175.0 * pulse) as u8;
                let dot = egui::pos2(header.center().x, header.center().y);
                painter.circle_filled(
                    dot,
                    3.0 * zoom.clamp(0.5, 2.0),
                    egui::Color32::from_rgba_unmultiplied(accent.r(), accent.g(), accent.b(), alpha),
                );
            }

            // Body text
            let font_size = NODE_FONT_SIZE * zoom;
            if font_size >= 4.0 {
                let body = egui::Rect::from_min_max(
                    egui::pos2(screen.min.x, header.max.y),
                    screen.max,
                )
                .shrink(NODE_PADDING * zoom);
                let color = if node.text.is_empty() {
                    theme::TEXT_DIM
                } else if node.author == Author::User {
                    theme::TEXT_PRIMARY
                } else {
                    theme::TEXT_SECONDARY
                };
                let galley = ui.fonts(|f| {
                    f.layout(
                        display_text(node).to_owned(),
                        egui::FontId::proportional(font_size),
                        color,
                        body.width().max(1.0),
                    )
                });
                painter
                    .with_clip_rect(body.intersect(rect))
                    .galley(body.min, galley, color);
            }

            // Outline and resize grip
            let (stroke_w, stroke_c) = if is_selected {
                (theme::STROKE_THICK, theme::NODE_SELECTED)
            } else {
                (theme::STROKE_DEFAULT, theme::BORDER_DEFAULT)
            };
            painter.rect_stroke(
                screen,
                radius,
                egui::Stroke::new(stroke_w, stroke_c),
                egui::StrokeKind::Inside,
            );
            if is_selected {
                let grip = node.resize_handle(grip_size(zoom));
                let grip = self.viewport.world_rect_to_screen(rect, grip);
                for i in 1..=3 {
                    let d = grip.width() * i as f32 / 4.0;
                    painter.line_segment(
                        [
                            egui::pos2(grip.right() - d, grip.bottom() - 2.0),
                            egui::pos2(grip.right() - 2.0, grip.bottom() - d),
                        ],
                        egui::Stroke::new(1.0, theme::TEXT_DIM),
                    );
                }
            }
        }
    }

    /// Global shortcuts; ignored while a text field has focus
    pub(crate) fn handle_shortcuts(&mut self, ctx: &egui::Context) {
        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            self.stop_all();
            if !ctx.wants_keyboard_input() {
                self.selected = None;
            }
        }
        if ctx.wants_keyboard_input() {
            return;
        }
        let (delete, reset, fit) = ctx.input(|i| {
            (
                i.key_pressed(egui::Key::Delete),
                i.modifiers.command && i.key_pressed(egui::Key::Num0),
                !i.modifiers.any() && i.key_pressed(egui::Key::F),
            )
        });
        if delete {
            if let Some(id) = self.selected {
                self.delete_branch(id);
            }
        }
        if reset {
            self.viewport.reset();
        }
        if fit {
            self.fit_requested = true;
        }
    }
}
