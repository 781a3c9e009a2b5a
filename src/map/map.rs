use egui::epaint::{Color32, Mesh, Pos2, Rect, Shape, Stroke};
use egui::{Response, Sense, Ui, Vec2, Widget};
use geo::TriangulateEarcut;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::geo_bounds::{Coordinate, GeoBounds};
use super::region::{Region, RegionCollection};

// Country-wide default view over Colombia.
const DEFAULT_CENTER_LAT: f64 = 4.5;
const DEFAULT_CENTER_LNG: f64 = -74.0;
const DEFAULT_ZOOM: f32 = 5.0;

#[derive(Clone, Serialize, Deserialize)]
pub struct MapState {
    center: Coordinate,
    zoom: f32,
    dragging: bool,
    drag_start: Option<Pos2>,
}

impl Default for MapState {
    fn default() -> Self {
        Self {
            center: Coordinate::new(DEFAULT_CENTER_LAT, DEFAULT_CENTER_LNG),
            zoom: DEFAULT_ZOOM,
            dragging: false,
            drag_start: None,
        }
    }
}

impl MapState {
    pub fn load(ctx: &egui::Context, id: egui::Id) -> Self {
        ctx.data_mut(|d| d.get_persisted::<Self>(id).unwrap_or_default())
    }

    pub fn store(self, ctx: &egui::Context, id: egui::Id) {
        ctx.data_mut(|d| d.insert_persisted(id, self));
    }

    /// A view centered on `bounds`, zoomed so they fit in `viewport_px`.
    pub fn fitted(bounds: &GeoBounds, viewport_px: f64) -> Self {
        Self {
            center: bounds.center(),
            zoom: bounds.zoom_to_fit(viewport_px),
            ..Self::default()
        }
    }

    pub fn center(&self) -> &Coordinate {
        &self.center
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }
}

/// One-shot instruction for the next frame's view.
#[derive(Debug, Clone)]
pub enum ViewRequest {
    /// Fit the view to these bounds.
    Fit(GeoBounds),
    /// Back to the country-wide default.
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionStyle {
    pub fill: Color32,
    pub stroke: Stroke,
}

/// Selected regions get the accent fill, everything else stays neutral;
/// the border is the same for both so membership only changes the fill.
pub fn style_for(selected: bool) -> RegionStyle {
    let fill = if selected {
        Color32::from_rgba_unmultiplied(255, 0, 0, 153)
    } else {
        Color32::from_rgba_unmultiplied(211, 211, 211, 153)
    };
    RegionStyle {
        fill,
        stroke: Stroke::new(1.0, Color32::BLACK),
    }
}

pub struct Map<'a> {
    id: egui::Id,
    collection: &'a RegionCollection,
    selection: &'a BTreeSet<String>,
    view_request: Option<ViewRequest>,
    viewport_size: Option<Vec2>,
}

impl<'a> Map<'a> {
    pub fn new(
        id_source: impl std::hash::Hash,
        collection: &'a RegionCollection,
        selection: &'a BTreeSet<String>,
    ) -> Self {
        Self {
            id: egui::Id::new(id_source),
            collection,
            selection,
            view_request: None,
            viewport_size: None,
        }
    }

    pub fn view_request(mut self, request: Option<ViewRequest>) -> Self {
        self.view_request = request;
        self
    }

    pub fn viewport_size(mut self, size: Vec2) -> Self {
        self.viewport_size = Some(size);
        self
    }
}

impl Widget for Map<'_> {
    fn ui(self, ui: &mut Ui) -> Response {
        let size = self
            .viewport_size
            .unwrap_or_else(|| ui.available_size_before_wrap());
        let (rect, response) = ui.allocate_exact_size(size, Sense::click_and_drag());
        let viewport_px = f64::from(rect.width().max(rect.height()));

        let mut state = match self.view_request {
            Some(ViewRequest::Fit(bounds)) => MapState::fitted(&bounds, viewport_px),
            Some(ViewRequest::Reset) => MapState::default(),
            None => MapState::load(ui.ctx(), self.id),
        };

        ui.painter().rect(
            rect,
            0.0,
            Color32::from_rgb(170, 211, 223),
            Stroke::new(1.0, Color32::from_gray(60)),
        );

        let map_painter = ui.painter().with_clip_rect(rect);

        // Handle drag panning
        if response.dragged() {
            if !state.dragging {
                state.drag_start = response.hover_pos();
                state.dragging = true;
            }
            if let (Some(current), Some(start)) = (response.hover_pos(), state.drag_start) {
                let delta = current - start;
                let zoom_factor = 2.0f32.powi(state.zoom.floor() as i32);
                let degrees_per_pixel = f64::from(360.0 / (zoom_factor * 512.0));
                state.center = state.center.offset_by(
                    f64::from(delta.y) * degrees_per_pixel,
                    -f64::from(delta.x) * degrees_per_pixel,
                );
                state.drag_start = Some(current);
            }
        } else if state.dragging {
            state.dragging = false;
            state.drag_start = None;
        }

        // Handle zoom for pinch / touch
        let mut zoomed = false;
        let zoom_delta = ui.input(|i| i.zoom_delta()) - 1.0;
        if zoom_delta.abs() > f32::EPSILON {
            let step = zoom_delta.signum() * zoom_delta.abs().min(1.0);
            state.zoom = (state.zoom + step).clamp(0.0, 20.0);
            zoomed = true;
        }

        // Handle zoom for scroll, normalized with tanh
        let scroll = ui.input(|i| i.smooth_scroll_delta).y;
        if scroll.abs() > f32::EPSILON && !zoomed {
            let step = (scroll / 10.0).tanh();
            state.zoom = (state.zoom + step).clamp(0.0, 20.0);
        }

        let viewport = GeoBounds::from_center(state.center(), state.zoom, viewport_px);

        for region in self.collection.regions() {
            if !viewport.intersects(&region.bounds) {
                continue;
            }
            let style = style_for(self.selection.contains(&region.name));
            draw_region(&map_painter, &viewport, rect, region, style);
        }

        // Hover label, skipped mid-drag
        if !state.dragging {
            if let Some(pos) = response.hover_pos() {
                if rect.contains(pos) {
                    let coordinate = viewport.unproject(pos, rect);
                    if let Some(region) = self
                        .collection
                        .region_at(coordinate.longitude(), coordinate.latitude())
                    {
                        egui::show_tooltip_at_pointer(
                            ui.ctx(),
                            ui.layer_id(),
                            self.id.with("hover"),
                            |ui| {
                                ui.label(region.name.as_str());
                            },
                        );
                    }
                }
            }
        }

        // Store updated state
        state.store(ui.ctx(), self.id);

        response
    }
}

fn draw_region(
    painter: &egui::Painter,
    viewport: &GeoBounds,
    rect: Rect,
    region: &Region,
    style: RegionStyle,
) {
    for polygon in &region.boundary.0 {
        // egui only fills convex paths correctly, so triangulate the fill
        let triangulation = polygon.earcut_triangles_raw();
        let mut mesh = Mesh::default();
        for vertex in triangulation.vertices.chunks_exact(2) {
            let pos = viewport.project(vertex[0], vertex[1], rect);
            mesh.colored_vertex(pos, style.fill);
        }
        for triangle in triangulation.triangle_indices.chunks_exact(3) {
            mesh.add_triangle(triangle[0] as u32, triangle[1] as u32, triangle[2] as u32);
        }
        painter.add(Shape::mesh(mesh));

        stroke_ring(painter, viewport, rect, polygon.exterior(), style.stroke);
        for interior in polygon.interiors() {
            stroke_ring(painter, viewport, rect, interior, style.stroke);
        }
    }
}

fn stroke_ring(
    painter: &egui::Painter,
    viewport: &GeoBounds,
    rect: Rect,
    ring: &geo_types::LineString<f64>,
    stroke: Stroke,
) {
    let points: Vec<Pos2> = ring
        .coords()
        .map(|c| viewport.project(c.x, c.y, rect))
        .collect();
    if points.len() >= 2 {
        painter.add(Shape::closed_line(points, stroke));
    }
}
