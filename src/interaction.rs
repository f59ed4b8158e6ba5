//! Pointer state machine for the canvas: pan, move node, resize node

use crate::constants::{NODE_MIN_HEIGHT, NODE_MIN_WIDTH, RESIZE_HANDLE};
use crate::graph::ChatGraph;
use crate::types::NodeId;
use crate::viewport::Viewport;
use egui::{PointerButton, Pos2, Rect, Vec2};

/// World-space size of the resize grip. Zoomed in it keeps `RESIZE_HANDLE` screen
/// points; zoomed out it keeps its world size and shrinks with the node.
pub fn grip_size(zoom: f32) -> f32 {
    RESIZE_HANDLE / zoom.max(1.0)
}

/// Whether a drag with `button` moves things on the canvas, and if so whether it
/// must pan. Right-button drags are left to the context menu.
pub fn drag_kind(button: PointerButton, space_held: bool) -> Option<bool> {
    match button {
        PointerButton::Primary => Some(space_held),
        PointerButton::Middle => Some(true),
        _ => None,
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Interaction {
    #[default]
    Idle,
    Panning,
    MovingNode { id: NodeId, grab: Vec2 },
    Resizing { id: NodeId },
}

impl Interaction {
    /// Start a drag at `pointer` (screen space). Returns the node that was pressed, if any.
    pub fn begin(
        &mut self,
        graph: &mut ChatGraph,
        viewport: &Viewport,
        canvas: Rect,
        pointer: Pos2,
        force_pan: bool,
    ) -> Option<NodeId> {
        if force_pan {
            *self = Interaction::Panning;
            return None;
        }

        let world = viewport.screen_to_world(canvas, pointer);
        let handle = grip_size(viewport.zoom);

        if let Some(id) = graph.hit_resize_handle(world, handle) {
            graph.bring_to_front(id);
            *self = Interaction::Resizing { id };
            return Some(id);
        }

        match graph.hit_test(world) {
            Some(id) => {
                graph.bring_to_front(id);
                let grab = graph.get(id).map(|n| world - n.pos).unwrap_or_default();
                *self = Interaction::MovingNode { id, grab };
                Some(id)
            }
            None => {
                *self = Interaction::Panning;
                None
            }
        }
    }

    /// Continue the drag; `screen_delta` is the pointer movement since last frame.
    pub fn update(
        &mut self,
        graph: &mut ChatGraph,
        viewport: &mut Viewport,
        canvas: Rect,
        pointer: Pos2,
        screen_delta: Vec2,
    ) {
        match *self {
            Interaction::Idle => {}
            Interaction::Panning => viewport.pan(screen_delta),
            Interaction::MovingNode { id, grab } => {
                let world = viewport.screen_to_world(canvas, pointer);
                match graph.get_mut(id) {
                    Some(node) => node.pos = world - grab,
                    None => *self = Interaction::Idle,
                }
            }
            Interaction::Resizing { id } => {
                let world = viewport.screen_to_world(canvas, pointer);
                match graph.get_mut(id) {
                    Some(node) => {
                        node.size.x = (world.x - node.pos.x).max(NODE_MIN_WIDTH);
                        node.size.y = (world.y - node.pos.y).max(NODE_MIN_HEIGHT);
                    }
                    None => *self = Interaction::Idle,
                }
            }
        }
    }

    pub fn end(&mut self) {
        *self = Interaction::Idle;
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Interaction::Idle)
    }

    pub fn node(&self) -> Option<NodeId> {
        match *self {
            Interaction::MovingNode { id, .. } | Interaction::Resizing { id } => Some(id),
            _ => None,
        }
    }
}
