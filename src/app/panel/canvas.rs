use std::collections::HashMap;
use std::sync::Arc;

use egui::epaint::CubicBezierShape;
use egui::{
    pos2, vec2, Align2, Color32, Context, CursorIcon, FontId, Galley, Painter, PointerButton, Pos2,
    Rect, RichText, Rounding, Sense, Stroke, Vec2,
};

use super::super::{MindMap, MindMapApp, NodeId, NodeShape, NodeStyle, Palette, VisibleMap};

const MIN_ZOOM: f32 = 0.25;
const MAX_ZOOM: f32 = 3.0;
const FIT_MARGIN: f32 = 40.0;

// ── Camera ────────────────────────────────────────────────────────────────────

/// Pan/zoom of the diagram. World coordinates are the layout grid; screen
/// coordinates are `origin + pan + world * zoom`.
#[derive(Debug, Clone)]
pub struct CanvasView {
    pub pan: Vec2,
    pub zoom: f32,
    fit_pending: bool,
    /// Node the open context menu belongs to.
    context_node: Option<NodeId>,
}

impl Default for CanvasView {
    fn default() -> Self {
        CanvasView {
            pan: vec2(FIT_MARGIN, FIT_MARGIN),
            zoom: 1.0,
            fit_pending: true,
            context_node: None,
        }
    }
}

impl CanvasView {
    pub fn world_to_screen(&self, origin: Pos2, world: Pos2) -> Pos2 {
        origin + self.pan + world.to_vec2() * self.zoom
    }

    pub fn screen_to_world(&self, origin: Pos2, screen: Pos2) -> Pos2 {
        ((screen - origin - self.pan) / self.zoom).to_pos2()
    }

    /// Scale by `factor`, keeping the world point under `anchor` fixed.
    pub fn zoom_around(&mut self, origin: Pos2, anchor: Pos2, factor: f32) {
        let world = self.screen_to_world(origin, anchor);
        self.zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        self.pan = anchor - origin - world.to_vec2() * self.zoom;
    }

    /// Centre `bounds` (world) in a viewport of `size` (screen).
    pub fn fit(&mut self, bounds: Rect, size: Vec2) {
        let avail = (size - Vec2::splat(FIT_MARGIN * 2.0)).max(Vec2::splat(1.0));
        let extent = bounds.size().max(Vec2::splat(1.0));
        self.zoom = (avail.x / extent.x).min(avail.y / extent.y).clamp(MIN_ZOOM, 1.0);
        self.pan = (size - bounds.size() * self.zoom) / 2.0 - bounds.min.to_vec2() * self.zoom;
    }

    pub fn request_fit(&mut self) {
        self.fit_pending = true;
    }

    pub fn reset_zoom(&mut self) {
        self.zoom = 1.0;
        self.pan = vec2(FIT_MARGIN, FIT_MARGIN);
    }

    fn take_fit(&mut self) -> bool {
        std::mem::take(&mut self.fit_pending)
    }

    pub fn context_node(&self) -> Option<NodeId> {
        self.context_node
    }

    pub fn open_context(&mut self, id: Option<NodeId>) {
        self.context_node = id;
    }

    /// Follow the context-menu node into a reparsed map by key; cleared when
    /// the node no longer exists.
    pub fn remap_context(&mut self, old: &MindMap, new: &MindMap) {
        self.context_node = self
            .context_node
            .and_then(|id| old.node(id))
            .and_then(|n| new.find_by_key(&n.key));
    }
}

/// Shorten `label` to `max` characters, ending in an ellipsis.
pub fn truncate_label(label: &str, max: usize) -> String {
    if max == 0 || label.chars().count() <= max {
        return label.to_owned();
    }
    let mut out: String = label.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

struct NodeBox {
    id: NodeId,
    rect: Rect,
    galley: Arc<Galley>,
    text_color: Color32,
    truncated: bool,
}

impl MindMapApp {
    // ── Panel: diagram ────────────────────────────────────────────────────────

    pub(in crate::app) fn draw_canvas_panel(&mut self, ctx: &Context) {
        let visible = self.state.visible(&self.map, &self.settings.layout);

        // Deferred actions, applied once the painter is done with `self`
        let mut toggle: Option<NodeId> = None;
        let mut select: Option<Option<NodeId>> = None;
        let mut restyle: Option<(NodeId, NodeStyle)> = None;
        let mut reset_style: Option<NodeId> = None;
        let mut hovered: Option<NodeId> = None;

        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| {
                let (response, painter) =
                    ui.allocate_painter(ui.available_size(), Sense::click_and_drag());
                let origin = response.rect.min;
                painter.rect_filled(response.rect, 0.0, ui.visuals().extreme_bg_color);

                if self.map.is_empty() {
                    painter.text(
                        response.rect.center(),
                        Align2::CENTER_CENTER,
                        "Type an outline on the left",
                        FontId::proportional(16.0),
                        ui.visuals().weak_text_color(),
                    );
                    return;
                }

                // ── Pan / zoom ────────────────────────────────────────────────
                if response.dragged_by(PointerButton::Primary) {
                    self.view.pan += response.drag_delta();
                }
                if let Some(pointer) = response.hover_pos() {
                    let (scroll, pinch) = ui.input(|i| (i.smooth_scroll_delta.y, i.zoom_delta()));
                    let factor = if pinch != 1.0 { pinch } else { (scroll * 0.002).exp() };
                    if factor != 1.0 {
                        self.view.zoom_around(origin, pointer, factor);
                    }
                }

                let mut boxes = self.node_boxes(&painter, &visible, origin);
                if self.view.take_fit() {
                    let bounds = boxes
                        .iter()
                        .map(|b| Rect::from_min_max(
                            self.view.screen_to_world(origin, b.rect.min),
                            self.view.screen_to_world(origin, b.rect.max),
                        ))
                        .reduce(|a, b| a.union(b));
                    if let Some(bounds) = bounds {
                        self.view.fit(bounds, response.rect.size());
                        boxes = self.node_boxes(&painter, &visible, origin);
                    }
                }

                // ── Hit testing ───────────────────────────────────────────────
                hovered = response
                    .hover_pos()
                    .and_then(|p| boxes.iter().rev().find(|b| b.rect.contains(p)))
                    .map(|b| b.id);
                if hovered.is_some() {
                    ui.ctx().set_cursor_icon(CursorIcon::PointingHand);
                }
                if response.clicked() {
                    select = Some(hovered);
                    toggle = hovered;
                }
                if response.secondary_clicked() {
                    self.view.open_context(hovered);
                }

                self.paint_map(&painter, &visible, &boxes, ui.visuals().selection.stroke.color);

                // ── Context menu ──────────────────────────────────────────────
                let menu_node = self.view.context_node().filter(|&id| self.map.node(id).is_some());
                let truncated_label = hovered
                    .and_then(|id| boxes.iter().find(|b| b.id == id && b.truncated))
                    .and_then(|b| self.map.node(b.id))
                    .map(|n| n.label.clone());
                let response = match truncated_label {
                    Some(label) => response.on_hover_text(label),
                    None => response,
                };
                if let Some(id) = menu_node {
                    let mut style = self.state.style(&self.map, id);
                    let collapsed = self.state.is_collapsed(&self.map, id);
                    let has_children = self.map.node(id).is_some_and(|n| n.has_children());
                    let label = self.map.node(id).map(|n| n.label.clone()).unwrap_or_default();
                    response.context_menu(|ui| {
                        ui.label(RichText::new(truncate_label(&label, 32)).strong());
                        ui.separator();
                        if has_children {
                            let text = if collapsed { "Expand" } else { "Collapse" };
                            if ui.button(text).clicked() {
                                toggle = Some(id);
                                ui.close_menu();
                            }
                            ui.separator();
                        }
                        let before = style;
                        ui.horizontal_wrapped(|ui| {
                            for rgb in Palette::BRANCHES {
                                let swatch = egui::Button::new("  ").fill(Palette::to_color(rgb));
                                if ui.add(swatch).clicked() {
                                    style.color = Some(rgb);
                                }
                            }
                        });
                        ui.horizontal(|ui| {
                            ui.label("Custom:");
                            let mut rgb = style.color.unwrap_or(Palette::ROOT);
                            if egui::color_picker::color_edit_button_srgb(ui, &mut rgb).changed() {
                                style.color = Some(rgb);
                            }
                        });
                        ui.horizontal(|ui| {
                            for shape in NodeShape::all() {
                                ui.radio_value(&mut style.shape, *shape, shape.label());
                            }
                        });
                        ui.checkbox(&mut style.bold, "Bold");
                        if style != before {
                            restyle = Some((id, style));
                        }
                        ui.separator();
                        if ui.button("Reset style").clicked() {
                            reset_style = Some(id);
                            ui.close_menu();
                        }
                    });
                }
            });

        // ── Apply deferred actions ────────────────────────────────────────────
        let hovered = hovered.filter(|_| self.settings.view.hover_highlight);
        if hovered != self.state.hovered() {
            self.state.set_hovered(hovered);
            ctx.request_repaint();
        }
        if let Some(sel) = select {
            self.state.set_selected(sel);
        }
        if let Some(id) = toggle {
            self.toggle_node(id);
        }
        if let Some((id, style)) = restyle {
            self.state.set_style(&self.map, id, style);
        }
        if let Some(id) = reset_style {
            self.state.clear_style(&self.map, id);
        }
    }

    fn node_boxes(&self, painter: &Painter, visible: &VisibleMap, origin: Pos2) -> Vec<NodeBox> {
        let zoom = self.view.zoom;
        let base = self.settings.view.font_size * zoom;
        let pad = vec2(10.0, 6.0) * zoom;
        visible
            .nodes
            .iter()
            .filter_map(|vn| {
                let node = self.map.node(vn.id)?;
                let text = truncate_label(&node.label, self.settings.view.max_label_chars);
                let truncated = text != node.label;
                let size = if node.level == 0 { base * 1.2 } else { base };
                let text_color = Palette::text_on(vn.style.fill);
                let galley =
                    painter.layout_no_wrap(text, FontId::proportional(size.max(1.0)), text_color);
                let anchor = self.view.world_to_screen(origin, pos2(vn.x, vn.y));
                let box_size = galley.size() + pad * 2.0;
                let rect = Rect::from_min_size(pos2(anchor.x, anchor.y - box_size.y / 2.0), box_size);
                Some(NodeBox { id: vn.id, rect, galley, text_color, truncated })
            })
            .collect()
    }

    fn paint_map(&self, painter: &Painter, visible: &VisibleMap, boxes: &[NodeBox], accent: Color32) {
        let zoom = self.view.zoom;
        let dimming = visible.any_highlighted();
        let rects: HashMap<NodeId, Rect> = boxes.iter().map(|b| (b.id, b.rect)).collect();

        // Edges first so nodes sit on top
        for edge in &visible.edges {
            let (Some(src), Some(dst)) = (rects.get(&edge.source), rects.get(&edge.target)) else {
                continue;
            };
            let mut color = visible.get(edge.target).map(|n| n.style.fill).unwrap_or(Color32::GRAY);
            if dimming && !edge.highlighted {
                color = color.gamma_multiply(0.25);
            }
            let width = (if edge.highlighted { 3.0 } else { 2.0 }) * zoom;
            let from = src.right_center();
            let to = dst.left_center();
            let dx = (to.x - from.x) * 0.5;
            let curve = CubicBezierShape::from_points_stroke(
                [from, from + vec2(dx, 0.0), to - vec2(dx, 0.0), to],
                false,
                Color32::TRANSPARENT,
                Stroke::new(width, color),
            );
            painter.add(curve);
        }

        for b in boxes {
            let Some(vn) = visible.get(b.id) else { continue };
            let mut fill = vn.style.fill;
            let mut text_color = b.text_color;
            if dimming && !vn.highlighted {
                fill = fill.gamma_multiply(0.35);
                text_color = text_color.gamma_multiply(0.5);
            }
            let stroke = if vn.selected {
                Stroke::new(2.5, accent)
            } else if vn.highlighted {
                Stroke::new(1.5, b.text_color)
            } else {
                Stroke::NONE
            };
            let radius = vn.style.shape.corner_radius(b.rect.height());
            painter.rect(b.rect, Rounding::same(radius), fill, stroke);

            let text_pos = b.rect.center() - b.galley.size() / 2.0;
            painter.galley(text_pos, b.galley.clone(), text_color);
            if vn.style.bold {
                // no bold face in the default fonts: overdraw with a small offset
                painter.galley(text_pos + vec2(0.6 * zoom, 0.0), b.galley.clone(), text_color);
            }

            if vn.collapsed {
                let r = 9.0 * zoom;
                let center = b.rect.right_center() + vec2(r + 4.0 * zoom, 0.0);
                painter.circle(center, r, fill, Stroke::new(1.0, text_color));
                painter.text(
                    center,
                    Align2::CENTER_CENTER,
                    format!("+{}", vn.hidden_descendants),
                    FontId::proportional((8.0 * zoom).max(1.0)),
                    text_color,
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{parse_outline, LayoutSettings};

    #[test]
    fn test_world_screen_roundtrip() {
        let view = CanvasView { pan: vec2(30.0, -12.0), zoom: 1.5, ..Default::default() };
        let origin = pos2(100.0, 50.0);
        let world = pos2(220.0, 56.0);
        let screen = view.world_to_screen(origin, world);
        assert_eq!(screen, pos2(100.0 + 30.0 + 330.0, 50.0 - 12.0 + 84.0));
        let back = view.screen_to_world(origin, screen);
        assert!((back - world).length() < 1e-3);
    }

    #[test]
    fn test_zoom_keeps_anchor_fixed() {
        let mut view = CanvasView::default();
        let origin = pos2(0.0, 0.0);
        let anchor = pos2(300.0, 200.0);
        let before = view.screen_to_world(origin, anchor);
        view.zoom_around(origin, anchor, 2.0);
        assert_eq!(view.zoom, 2.0);
        let after = view.screen_to_world(origin, anchor);
        assert!((after - before).length() < 1e-3);
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut view = CanvasView::default();
        view.zoom_around(Pos2::ZERO, Pos2::ZERO, 100.0);
        assert_eq!(view.zoom, MAX_ZOOM);
        view.zoom_around(Pos2::ZERO, Pos2::ZERO, 0.0001);
        assert_eq!(view.zoom, MIN_ZOOM);
    }

    #[test]
    fn test_fit_centres_bounds() {
        let mut view = CanvasView::default();
        let bounds = Rect::from_min_size(pos2(0.0, 0.0), vec2(200.0, 100.0));
        let size = vec2(600.0, 400.0);
        view.fit(bounds, size);
        // small content is not blown up past 1:1
        assert_eq!(view.zoom, 1.0);
        let centre = view.world_to_screen(Pos2::ZERO, bounds.center());
        assert!((centre - (size / 2.0).to_pos2()).length() < 1e-3);
    }

    #[test]
    fn test_fit_shrinks_large_bounds() {
        let mut view = CanvasView::default();
        let bounds = Rect::from_min_size(pos2(-100.0, 0.0), vec2(2000.0, 500.0));
        view.fit(bounds, vec2(1080.0, 800.0));
        assert!((view.zoom - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_take_fit_once() {
        let mut view = CanvasView::default();
        assert!(view.take_fit());
        assert!(!view.take_fit());
        view.request_fit();
        assert!(view.take_fit());
    }

    #[test]
    fn test_truncate_label() {
        assert_eq!(truncate_label("short", 10), "short");
        assert_eq!(truncate_label("exactly10!", 10), "exactly10!");
        assert_eq!(truncate_label("much longer label", 5), "much…");
        assert_eq!(truncate_label("unbounded", 0), "unbounded");
        assert_eq!(truncate_label("中文标签很长", 3), "中文…");
    }

    #[test]
    fn test_context_node_follows_reparse() {
        let layout = LayoutSettings::default();
        let old = parse_outline("R\n  A\n  B", &layout);
        let mut view = CanvasView::default();
        view.open_context(Some(NodeId(2)));

        let inserted = parse_outline("R\n  New\n  A\n  B", &layout);
        view.remap_context(&old, &inserted);
        assert_eq!(view.context_node(), Some(NodeId(3)));

        let removed = parse_outline("R\n  New\n  A", &layout);
        view.remap_context(&inserted, &removed);
        assert_eq!(view.context_node(), None);
    }
}
