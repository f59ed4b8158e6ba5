//! Streaming replies into assistant nodes

use super::App;
use crate::graph::ChatGraph;
use crate::llm::{build_messages, run_completion, CompletionRequest};
use crate::types::*;
use crate::utils::{lock_ignore_poison, preview_text};
use eframe::egui;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Write a failure into the node text, after whatever already streamed
pub(crate) fn append_error(text: &mut String, message: &str) {
    if !text.trim().is_empty() {
        text.push_str("\n\n");
    }
    text.push_str("Error: ");
    text.push_str(message);
}

/// Move pending text from the shared state into the nodes.
/// Returns the nodes whose stream ended this frame.
pub(crate) fn apply_stream_updates(graph: &mut ChatGraph, state: &mut StreamState) -> Vec<NodeId> {
    let mut finished = Vec::new();
    for (id, progress) in state.streams.iter_mut() {
        let Some(node) = graph.get_mut(*id) else {
            // Branch was deleted while streaming
            finished.push(*id);
            continue;
        };
        if !progress.pending.is_empty() {
            node.text.push_str(&progress.pending);
            progress.pending.clear();
        }
        if progress.status.is_terminal() {
            node.streaming = false;
            match &progress.status {
                StreamStatus::Failed(message) => append_error(&mut node.text, message),
                StreamStatus::Cancelled if node.text.is_empty() => node.text.push_str("(stopped)"),
                _ => {}
            }
            finished.push(*id);
        }
    }
    for id in &finished {
        state.streams.remove(id);
    }
    finished
}

impl App {
    /// Send the composer text as a reply to the selected node (or a new root)
    pub fn send_message(&mut self, ctx: &egui::Context) {
        let text = self.composer.trim().to_string();
        if text.is_empty() {
            return;
        }

        let parent = self.selected.filter(|id| self.graph.contains(*id));
        let pos = parent
            .and_then(|p| self.graph.child_position(p))
            .unwrap_or_else(|| self.graph.next_root_position());

        let user = match self.graph.add_node(Author::User, text, parent, pos) {
            Ok(id) => id,
            Err(e) => {
                warn!(error = %e, "Could not add message");
                return;
            }
        };
        if let Some(node) = self.graph.get_mut(user) {
            node.size.x = self.settings.node_width;
        }
        debug!(node = %user, parent = ?parent, "User message added");

        self.composer.clear();
        if self.start_reply(ctx, user).is_none() {
            self.select(Some(user));
        }
    }

    /// Stream a fresh answer as a new sibling of an assistant node
    pub fn regenerate(&mut self, ctx: &egui::Context, id: NodeId) {
        let Some(parent) = self.graph.get(id).and_then(|n| n.parent) else {
            return;
        };
        info!(node = %id, parent = %parent, "Regenerating reply");
        self.start_reply(ctx, parent);
    }

    fn start_reply(&mut self, ctx: &egui::Context, parent: NodeId) -> Option<NodeId> {
        let pos = self.graph.child_position(parent)?;
        let id = match self.graph.add_node(Author::Assistant, "", Some(parent), pos) {
            Ok(id) => id,
            Err(e) => {
                warn!(error = %e, "Could not add reply node");
                return None;
            }
        };
        if let Some(node) = self.graph.get_mut(id) {
            node.streaming = true;
            node.size.x = self.settings.node_width;
        }
        self.select(Some(id));
        self.spawn_completion(ctx, id);
        self.reveal(id);
        Some(id)
    }

    fn spawn_completion(&mut self, ctx: &egui::Context, id: NodeId) {
        let messages = match self.graph.ancestry(id) {
            Ok(path) => build_messages(&self.settings.system_prompt, &path),
            Err(e) => {
                warn!(error = %e, "Could not build transcript");
                return;
            }
        };
        if let Some(last) = messages.last() {
            debug!(node = %id, last = %preview_text(&last.content, 60), "Transcript built");
        }

        let request = CompletionRequest {
            model: self.settings.model.clone(),
            messages,
            stream: true,
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };

        let token = CancellationToken::new();
        self.cancel_tokens.insert(id, token.clone());
        lock_ignore_poison(&self.stream_state)
            .streams
            .insert(id, StreamProgress::default());

        self.runtime.spawn(run_completion(
            id,
            self.settings.endpoint.clone(),
            request,
            self.stream_state.clone(),
            self.client.clone(),
            ctx.clone(),
            token,
        ));
    }

    /// Apply streamed text to nodes; called once per frame
    pub fn poll_streams(&mut self) {
        let finished = {
            let mut state = lock_ignore_poison(&self.stream_state);
            apply_stream_updates(&mut self.graph, &mut state)
        };
        for id in finished {
            self.cancel_tokens.remove(&id);
        }
    }

    pub fn stop_stream(&mut self, id: NodeId) {
        if let Some(token) = self.cancel_tokens.get(&id) {
            info!(node = %id, "Stopping stream");
            token.cancel();
        }
    }

    pub fn stop_all(&mut self) {
        if !self.cancel_tokens.is_empty() {
            info!(count = self.cancel_tokens.len(), "Stopping all streams");
        }
        for token in self.cancel_tokens.values() {
            token.cancel();
        }
    }

    pub fn active_streams(&self) -> usize {
        self.cancel_tokens.len()
    }
}
