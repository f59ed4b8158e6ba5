//! App module - contains the main application state and logic

mod canvas;
mod context_menu;
mod panels;
mod streaming;
mod toast;

use crate::graph::ChatGraph;
use crate::interaction::Interaction;
use crate::settings::Settings;
use crate::text_measure::TextMeasureCache;
use crate::theme;
use crate::types::*;
use crate::viewport::Viewport;
use eframe::egui;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::info;

// ============================================================================
// APP STATE
// ============================================================================

pub struct App {
    // Conversation
    pub(crate) graph: ChatGraph,
    pub(crate) selected: Option<NodeId>,
    pub(crate) context_node: Option<NodeId>,
    // Canvas view
    pub(crate) viewport: Viewport,
    pub(crate) interaction: Interaction,
    pub(crate) canvas_rect: Option<egui::Rect>,
    pub(crate) fit_requested: bool,
    pub(crate) text_cache: TextMeasureCache,
    // Composer
    pub(crate) composer: String,
    pub(crate) focus_composer: bool,
    // Streaming
    pub(crate) stream_state: Arc<Mutex<StreamState>>,
    pub(crate) cancel_tokens: HashMap<NodeId, CancellationToken>,
    pub(crate) runtime: tokio::runtime::Runtime,
    pub(crate) client: reqwest::Client,
    // Settings
    pub(crate) settings: Settings,
    pub(crate) show_settings: bool,
    pub(crate) data_dir: PathBuf,
    pub(crate) window_pos: Option<egui::Pos2>,
    pub(crate) window_size: Option<egui::Vec2>,
    pub(crate) needs_center: bool,
    // Toast notification
    pub(crate) toast_message: Option<String>,
    pub(crate) toast_start: Option<Instant>,
}

// ============================================================================
// APP INITIALIZATION & HELPERS
// ============================================================================

impl App {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        settings: Settings,
        data_dir: PathBuf,
        runtime: tokio::runtime::Runtime,
    ) -> Self {
        // Force dark theme
        cc.egui_ctx.set_theme(egui::Theme::Dark);

        // Add Phosphor icons font
        let mut fonts = egui::FontDefinitions::default();
        egui_phosphor::add_to_fonts(&mut fonts, egui_phosphor::Variant::Regular);
        cc.egui_ctx.set_fonts(fonts);

        // Apply theme from theme.rs
        theme::apply_visuals(&cc.egui_ctx);

        info!(endpoint = %settings.endpoint, model = %settings.model, "Canvas ready");

        Self {
            graph: ChatGraph::new(),
            selected: None,
            context_node: None,
            viewport: Viewport::default(),
            interaction: Interaction::default(),
            canvas_rect: None,
            fit_requested: false,
            text_cache: TextMeasureCache::new(),
            composer: String::new(),
            focus_composer: true,
            stream_state: Arc::new(Mutex::new(StreamState::default())),
            cancel_tokens: HashMap::new(),
            runtime,
            client: reqwest::Client::new(),
            settings,
            show_settings: false,
            data_dir,
            window_pos: None,
            window_size: None,
            needs_center: false,
            toast_message: None,
            toast_start: None,
        }
    }

    pub fn save_settings(&mut self) {
        self.settings.window_x = self.window_pos.map(|p| p.x);
        self.settings.window_y = self.window_pos.map(|p| p.y);
        self.settings.window_w = self.window_size.map(|s| s.x);
        self.settings.window_h = self.window_size.map(|s| s.y);
        self.settings.save(&self.data_dir);
    }

    pub(crate) fn show_toast(&mut self, msg: impl Into<String>) {
        self.toast_message = Some(msg.into());
        self.toast_start = Some(Instant::now());
    }

    /// Select a node and bring it to front
    pub(crate) fn select(&mut self, id: Option<NodeId>) {
        self.selected = id.filter(|id| self.graph.contains(*id));
        if let Some(id) = self.selected {
            self.graph.bring_to_front(id);
        }
    }

    /// Drop everything on the canvas and start over
    pub fn new_conversation(&mut self) {
        self.stop_all();
        let count = self.graph.len();
        self.graph.clear();
        self.selected = None;
        self.context_node = None;
        self.interaction.end();
        self.viewport.reset();
        self.text_cache.clear();
        self.focus_composer = true;
        info!(removed = count, "New conversation");
    }

    /// Remove a node and its whole branch, cancelling any stream inside it
    pub fn delete_branch(&mut self, id: NodeId) {
        let parent = self.graph.get(id).and_then(|n| n.parent);
        let removed = self.graph.remove_subtree(id);
        if removed.is_empty() {
            return;
        }
        for node in &removed {
            if let Some(token) = self.cancel_tokens.remove(node) {
                token.cancel();
            }
        }
        if self.selected.is_some_and(|s| removed.contains(&s)) {
            self.selected = parent;
        }
        if self.interaction.node().is_some_and(|n| removed.contains(&n)) {
            self.interaction.end();
        }
        info!(node = %id, removed = removed.len(), "Deleted branch");
        let noun = if removed.len() == 1 { "node" } else { "nodes" };
        self.show_toast(format!("Deleted {} {}", removed.len(), noun));
    }

    pub fn fit_view(&mut self) {
        if let (Some(canvas), Some(bounds)) = (self.canvas_rect, self.graph.bounds()) {
            self.viewport.fit(canvas, bounds, 40.0);
        } else {
            self.viewport.reset();
        }
    }

    /// Pan so `id` is visible, keeping the current zoom
    pub(crate) fn reveal(&mut self, id: NodeId) {
        let (Some(canvas), Some(node)) = (self.canvas_rect, self.graph.get(id)) else {
            return;
        };
        let rect = node.rect();
        if !self.viewport.visible_world(canvas).contains_rect(rect) {
            self.viewport.center_on(canvas, rect.center());
        }
    }
}
