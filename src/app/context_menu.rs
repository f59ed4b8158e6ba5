//! Right-click menus for nodes and for empty canvas

use super::panels::NEW_CONVERSATION_ICON;
use super::App;
use crate::theme;
use crate::types::*;
use eframe::egui;
use tracing::debug;

#[derive(Default)]
pub(crate) struct NodeAction {
    pub reply_to: Option<NodeId>,
    pub regenerate: Option<NodeId>,
    pub copy: Option<NodeId>,
    pub stop: Option<NodeId>,
    pub delete: Option<NodeId>,
}

#[derive(Default)]
pub(crate) struct CanvasAction {
    pub fit: bool,
    pub reset_zoom: bool,
    pub new_conversation: bool,
}

impl App {
    pub(crate) fn node_context_menu(&mut self, ui: &mut egui::Ui, id: NodeId) -> NodeAction {
        let mut action = NodeAction::default();
        let Some(node) = self.graph.get(id) else {
            return action;
        };
        let is_assistant = node.author == Author::Assistant;
        let has_parent = node.parent.is_some();
        let streaming = self.cancel_tokens.contains_key(&id);
        let child_count = self.graph.children(id).len();

        ui.spacing_mut().item_spacing.y = 2.0;
        let delete_label = if child_count > 0 { "Delete branch" } else { "Delete" };
        ui.set_min_width(theme::MENU_WIDTH);

        if theme::menu_item(ui, egui_phosphor::regular::CHAT_TEXT, "Reply here") {
            action.reply_to = Some(id);
            ui.close_menu();
        }
        if is_assistant && has_parent && !streaming
            && theme::menu_item(ui, egui_phosphor::regular::ARROW_CLOCKWISE, "Regenerate")
        {
            action.regenerate = Some(id);
            ui.close_menu();
        }
        if streaming && theme::menu_item(ui, egui_phosphor::regular::STOP, "Stop generating") {
            action.stop = Some(id);
            ui.close_menu();
        }
        if theme::menu_item(ui, egui_phosphor::regular::COPY, "Copy text") {
            action.copy = Some(id);
            ui.close_menu();
        }
        ui.separator();
        if theme::menu_item(ui, egui_phosphor::regular::TRASH, delete_label) {
            action.delete = Some(id);
            ui.close_menu();
        }

        action
    }

    pub(crate) fn canvas_context_menu(&mut self, ui: &mut egui::Ui) -> CanvasAction {
        let mut action = CanvasAction::default();
        ui.spacing_mut().item_spacing.y = 2.0;
        ui.set_min_width(theme::MENU_WIDTH);

        if theme::menu_item(ui, egui_phosphor::regular::CORNERS_IN, "Fit to Window") {
            action.fit = true;
            ui.close_menu();
        }
        if theme::menu_item(ui, egui_phosphor::regular::FRAME_CORNERS, "Actual Size") {
            action.reset_zoom = true;
            ui.close_menu();
        }
        if !self.graph.is_empty() {
            ui.separator();
            if theme::menu_item(ui, NEW_CONVERSATION_ICON, "New Conversation") {
                action.new_conversation = true;
                ui.close_menu();
            }
        }
        action
    }

    pub(crate) fn apply_node_action(&mut self, ctx: &egui::Context, action: NodeAction) {
        if let Some(id) = action.reply_to {
            self.select(Some(id));
            self.focus_composer = true;
        }
        if let Some(id) = action.regenerate {
            self.regenerate(ctx, id);
        }
        if let Some(id) = action.stop {
            self.stop_stream(id);
        }
        if let Some(id) = action.copy {
            if let Some(node) = self.graph.get(id) {
                ctx.copy_text(node.text.clone());
                debug!(node = %id, chars = node.text.len(), "Copied node text");
                self.show_toast("Copied to clipboard");
            }
        }
        if let Some(id) = action.delete {
            self.delete_branch(id);
        }
    }

    pub(crate) fn apply_canvas_action(&mut self, action: CanvasAction) {
        if action.fit {
            self.fit_requested = true;
        }
        if action.reset_zoom {
            self.viewport.reset();
        }
        if action.new_conversation {
            self.new_conversation();
        }
    }
}
