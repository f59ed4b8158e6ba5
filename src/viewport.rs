//! World <-> screen transforms for the pannable, zoomable canvas
//!
//! `screen = canvas.min + offset + world * zoom`

use crate::constants::{MAX_ZOOM, MIN_ZOOM, ZOOM_STEP};
use egui::{Pos2, Rect, Vec2};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub offset: Vec2,
    pub zoom: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            offset: Vec2::ZERO,
            zoom: 1.0,
        }
    }
}

impl Viewport {
    pub fn world_to_screen(&self, canvas: Rect, world: Pos2) -> Pos2 {
        canvas.min + self.offset + world.to_vec2() * self.zoom
    }

    pub fn screen_to_world(&self, canvas: Rect, screen: Pos2) -> Pos2 {
        ((screen - canvas.min - self.offset) / self.zoom).to_pos2()
    }

    pub fn world_rect_to_screen(&self, canvas: Rect, world: Rect) -> Rect {
        Rect::from_min_max(
            self.world_to_screen(canvas, world.min),
            self.world_to_screen(canvas, world.max),
        )
    }

    /// Visible area in world space
    pub fn visible_world(&self, canvas: Rect) -> Rect {
        Rect::from_min_max(
            self.screen_to_world(canvas, canvas.min),
            self.screen_to_world(canvas, canvas.max),
        )
    }

    pub fn pan(&mut self, screen_delta: Vec2) {
        self.offset += screen_delta;
    }

    /// Scale by `factor` keeping the world point under `cursor` fixed
    pub fn zoom_around(&mut self, canvas: Rect, cursor: Pos2, factor: f32) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        let anchor = self.screen_to_world(canvas, cursor);
        self.zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        // Re-solve offset so that anchor maps back onto cursor
        self.offset = cursor - canvas.min - anchor.to_vec2() * self.zoom;
    }

    /// Toolbar zoom: step by `steps * ZOOM_STEP` around the canvas centre
    pub fn step_zoom(&mut self, canvas: Rect, steps: f32) {
        let target = (self.zoom + steps * ZOOM_STEP).clamp(MIN_ZOOM, MAX_ZOOM);
        self.zoom_around(canvas, canvas.center(), target / self.zoom);
    }

    /// Centre `world` bounds in the canvas, never magnifying past 1:1
    pub fn fit(&mut self, canvas: Rect, world: Rect, margin: f32) {
        let avail = (canvas.size() - Vec2::splat(margin * 2.0)).max(Vec2::splat(1.0));
        let size = world.size().max(Vec2::splat(1.0));
        self.zoom = (avail.x / size.x)
            .min(avail.y / size.y)
            .clamp(MIN_ZOOM, 1.0);
        self.center_on(canvas, world.center());
    }

    pub fn center_on(&mut self, canvas: Rect, world: Pos2) {
        self.offset = canvas.size() / 2.0 - world.to_vec2() * self.zoom;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canvas() -> Rect {
        Rect::from_min_size(Pos2::new(10.0, 40.0), Vec2::new(800.0, 600.0))
    }

    fn close(a: Pos2, b: Pos2) -> bool {
        (a - b).length() < 1e-3
    }

    #[test]
    fn round_trip_is_identity() {
        let vp = Viewport {
            offset: Vec2::new(-35.0, 120.0),
            zoom: 2.5,
        };
        let world = Pos2::new(123.0, -45.5);
        let back = vp.screen_to_world(canvas(), vp.world_to_screen(canvas(), world));
        assert!(close(world, back));
    }

    #[test]
    fn zoom_keeps_cursor_anchor() {
        let mut vp = Viewport::default();
        let cursor = Pos2::new(300.0, 200.0);
        let before = vp.screen_to_world(canvas(), cursor);
        vp.zoom_around(canvas(), cursor, 1.7);
        assert!((vp.zoom - 1.7).abs() < 1e-6);
        assert!(close(vp.world_to_screen(canvas(), before), cursor));
    }

    #[test]
    fn zoom_is_clamped() {
        let mut vp = Viewport::default();
        vp.zoom_around(canvas(), canvas().center(), 100.0);
        assert_eq!(vp.zoom, MAX_ZOOM);
        vp.zoom_around(canvas(), canvas().center(), 0.0001);
        assert_eq!(vp.zoom, MIN_ZOOM);
        vp.zoom_around(canvas(), canvas().center(), f32::NAN);
        assert_eq!(vp.zoom, MIN_ZOOM);
    }

    #[test]
    fn step_zoom_moves_by_quarter() {
        let mut vp = Viewport::default();
        vp.step_zoom(canvas(), 1.0);
        assert!((vp.zoom - 1.25).abs() < 1e-6);
        vp.step_zoom(canvas(), -2.0);
        assert!((vp.zoom - 0.75).abs() < 1e-6);
    }

    #[test]
    fn fit_shows_whole_bounds() {
        let mut vp = Viewport::default();
        let world = Rect::from_min_size(Pos2::new(-1000.0, 0.0), Vec2::new(3000.0, 1000.0));
        vp.fit(canvas(), world, 20.0);
        let shown = vp.world_rect_to_screen(canvas(), world);
        assert!(canvas().expand(0.5).contains_rect(shown));
        assert!(close(shown.center(), canvas().center()));
    }

    #[test]
    fn fit_does_not_magnify_small_graphs() {
        let mut vp = Viewport::default();
        let world = Rect::from_min_size(Pos2::ZERO, Vec2::new(50.0, 50.0));
        vp.fit(canvas(), world, 20.0);
        assert_eq!(vp.zoom, 1.0);
    }
}
