//! Tactical map projection.
//!
//! Converts world-frame object positions and the vehicle pose into
//! canvas-space draw operations under a pan/zoom/rotate viewport. Two
//! projection modes exist on purpose and must not be merged: the
//! heading-locked view rotates the world so the vehicle's nose points
//! up, the north-up view keeps the world fixed and moves the vehicle
//! marker instead.

use crate::protocol::{MapSnapshot, ObjectCategory};

pub const ZOOM_MIN: f64 = 0.5;
pub const ZOOM_MAX: f64 = 5.0;
pub const GRID_SPACING: f64 = 50.0;
pub const GRID_RANGE: f64 = 400.0;
const BASE_SCALE_MARGIN: f64 = 0.9;
const VEHICLE_ARROW_SIZE: f64 = 24.0;
const LABEL_SIZE_THRESHOLD: f64 = 5.0;

const BACKGROUND_COLOR: &str = "#1a1a1a";
const VEHICLE_COLOR: &str = "#ef4444";

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub fn new(x: f64, y: f64) -> Self {
        ScreenPoint { x, y }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CanvasSize {
    pub width: f64,
    pub height: f64,
}

impl CanvasSize {
    pub fn new(width: f64, height: f64) -> Self {
        CanvasSize { width, height }
    }

    fn center(&self) -> ScreenPoint {
        ScreenPoint::new(self.width / 2.0, self.height / 2.0)
    }
}

/// Vehicle pose in the world frame. Yaw is radians; heading follows the
/// telemetry convention (degrees, 90 = north on the map).
#[derive(Debug, Clone, Copy, Default)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    pub yaw: f64,
}

impl Pose {
    pub fn heading_degrees(&self) -> f64 {
        self.yaw.to_degrees()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapMode {
    /// Viewport rotates with the vehicle heading; "up" means forward.
    HeadingLocked,
    /// World stays fixed with north up; the vehicle marker moves.
    NorthUp,
}

/// Pan/zoom state, mutated only by pointer and wheel input. Pan is in
/// raw screen pixels with no scale correction: perceived drag speed
/// changes with zoom, and that is the intended behavior.
#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    zoom: f64,
    pan: ScreenPoint,
    dragging: bool,
    drag_start: ScreenPoint,
}

impl Default for Viewport {
    fn default() -> Self {
        Viewport {
            zoom: 1.0,
            pan: ScreenPoint::default(),
            dragging: false,
            drag_start: ScreenPoint::default(),
        }
    }
}

impl Viewport {
    pub fn new() -> Self {
        Viewport::default()
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn pan(&self) -> ScreenPoint {
        self.pan
    }

    /// One wheel event: a fixed multiplicative step, clamped.
    pub fn wheel(&mut self, delta_y: f64) {
        let step = if delta_y > 0.0 { 0.9 } else { 1.1 };
        self.zoom = (self.zoom * step).clamp(ZOOM_MIN, ZOOM_MAX);
    }

    pub fn begin_drag(&mut self, x: f64, y: f64) {
        self.dragging = true;
        self.drag_start = ScreenPoint::new(x - self.pan.x, y - self.pan.y);
    }

    pub fn drag_move(&mut self, x: f64, y: f64) {
        if self.dragging {
            self.pan = ScreenPoint::new(x - self.drag_start.x, y - self.drag_start.y);
        }
    }

    pub fn end_drag(&mut self) {
        self.dragging = false;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegendEntry {
    pub color: &'static str,
    pub label: &'static str,
}

pub const LEGEND: [LegendEntry; 6] = [
    LegendEntry { color: VEHICLE_COLOR, label: "Drone" },
    LegendEntry { color: "#3b82f6", label: "Windmill" },
    LegendEntry { color: "#f97316", label: "Building" },
    LegendEntry { color: "#22c55e", label: "Tree" },
    LegendEntry { color: "#eab308", label: "Vehicle" },
    LegendEntry { color: "#6b7280", label: "Road" },
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerStyle {
    pub color: &'static str,
    pub size: f64,
}

/// Fixed color/size table keyed by object category.
pub fn marker_style(category: ObjectCategory) -> MarkerStyle {
    match category {
        ObjectCategory::Windmill => MarkerStyle { color: "#3b82f6", size: 8.0 },
        ObjectCategory::Building => MarkerStyle { color: "#f97316", size: 10.0 },
        ObjectCategory::Tree => MarkerStyle { color: "#22c55e", size: 3.0 },
        ObjectCategory::Vehicle => MarkerStyle { color: "#eab308", size: 6.0 },
        ObjectCategory::Road => MarkerStyle { color: "#6b7280", size: 2.0 },
        _ => MarkerStyle { color: "#888888", size: 4.0 },
    }
}

/// Backend-agnostic drawing instruction, already in canvas space. The
/// presentation layer replays these in order.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Clear {
        color: &'static str,
    },
    GridLine {
        from: ScreenPoint,
        to: ScreenPoint,
    },
    Marker {
        at: ScreenPoint,
        radius: f64,
        color: &'static str,
        label: Option<String>,
    },
    /// Vehicle arrow glyph; rotation 0 points screen-up.
    VehicleArrow {
        at: ScreenPoint,
        rotation_degrees: f64,
        size: f64,
        color: &'static str,
    },
    Text {
        at: ScreenPoint,
        text: String,
    },
    /// Compass rose; the "N" leg points along `rotation_degrees`.
    CompassRose {
        at: ScreenPoint,
        rotation_degrees: f64,
    },
    Legend {
        at: ScreenPoint,
        entries: &'static [LegendEntry],
    },
    /// No snapshot yet: degrade to a "waiting" placeholder.
    Placeholder {
        text: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapPlan {
    pub ops: Vec<DrawOp>,
}

impl MapPlan {
    fn no_data() -> Self {
        MapPlan {
            ops: vec![DrawOp::Placeholder {
                text: "Waiting for map data...",
            }],
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self.ops.as_slice(), [DrawOp::Placeholder { .. }])
    }
}

/// Produce the full draw plan for one frame. A missing snapshot yields
/// the placeholder plan rather than an error.
pub fn render_plan(
    snapshot: Option<&MapSnapshot>,
    pose: &Pose,
    viewport: &Viewport,
    canvas: CanvasSize,
    mode: MapMode,
) -> MapPlan {
    let snapshot = match snapshot {
        Some(snapshot) => snapshot,
        None => return MapPlan::no_data(),
    };

    let world_width = snapshot.bounds.width();
    let world_height = snapshot.bounds.height();
    if world_width <= 0.0 || world_height <= 0.0 {
        return MapPlan::no_data();
    }

    let base_scale =
        (canvas.width / world_width).min(canvas.height / world_height) * BASE_SCALE_MARGIN;
    let scale = base_scale * viewport.zoom;
    let heading = pose.heading_degrees();
    let center = canvas.center();

    let mut ops = Vec::with_capacity(snapshot.objects.len() + 64);
    ops.push(DrawOp::Clear {
        color: BACKGROUND_COLOR,
    });

    // Project a world point into canvas space for the active mode.
    let project: Box<dyn Fn(f64, f64) -> ScreenPoint> = match mode {
        MapMode::HeadingLocked => {
            // Canvas transform: translate(center), rotate(heading-90),
            // translate(pan), then draw drone-relative points with the
            // world Y axis flipped (screen Y grows downward).
            let rotation = (heading - 90.0).to_radians();
            let (sin, cos) = rotation.sin_cos();
            let pan = viewport.pan;
            let (drone_x, drone_y) = (pose.x, pose.y);
            Box::new(move |x: f64, y: f64| {
                let local_x = (x - drone_x) * scale + pan.x;
                let local_y = -(y - drone_y) * scale + pan.y;
                ScreenPoint::new(
                    center.x + local_x * cos - local_y * sin,
                    center.y + local_x * sin + local_y * cos,
                )
            })
        }
        MapMode::NorthUp => {
            let pan = viewport.pan;
            Box::new(move |x: f64, y: f64| {
                ScreenPoint::new(center.x + pan.x + x * scale, center.y + pan.y - y * scale)
            })
        }
    };

    // Grid on fixed 50-unit spacing over a 400-unit radius around the
    // vehicle, recomputed every frame; nothing is cached.
    let steps = (GRID_RANGE / GRID_SPACING) as i64;
    for step in -steps..=steps {
        let offset = step as f64 * GRID_SPACING;
        ops.push(DrawOp::GridLine {
            from: project(pose.x + offset, pose.y - GRID_RANGE),
            to: project(pose.x + offset, pose.y + GRID_RANGE),
        });
        ops.push(DrawOp::GridLine {
            from: project(pose.x - GRID_RANGE, pose.y + offset),
            to: project(pose.x + GRID_RANGE, pose.y + offset),
        });
    }

    for object in &snapshot.objects {
        let style = marker_style(object.category);
        let label = if style.size > LABEL_SIZE_THRESHOLD {
            Some(object.kind.clone())
        } else {
            None
        };
        ops.push(DrawOp::Marker {
            at: project(object.position.x, object.position.y),
            radius: style.size,
            color: style.color,
            label,
        });
    }

    match mode {
        MapMode::HeadingLocked => {
            // The vehicle marker represents "self": fixed at the canvas
            // center pointing up, drawn outside the rotated transform.
            ops.push(DrawOp::VehicleArrow {
                at: center,
                rotation_degrees: 0.0,
                size: VEHICLE_ARROW_SIZE,
                color: VEHICLE_COLOR,
            });
            ops.push(DrawOp::Text {
                at: ScreenPoint::new(center.x + 15.0, center.y - 15.0),
                text: format!("({:.1}, {:.1})", pose.x, pose.y),
            });
            // Counter-rotate the compass so N keeps pointing to true
            // north while the map itself turns.
            ops.push(DrawOp::CompassRose {
                at: ScreenPoint::new(canvas.width - 40.0, 40.0),
                rotation_degrees: heading - 90.0,
            });
        }
        MapMode::NorthUp => {
            let at = project(pose.x, pose.y);
            ops.push(DrawOp::VehicleArrow {
                at,
                rotation_degrees: 90.0 - heading,
                size: VEHICLE_ARROW_SIZE,
                color: VEHICLE_COLOR,
            });
            ops.push(DrawOp::Text {
                at: ScreenPoint::new(at.x + 15.0, at.y - 15.0),
                text: format!("({:.1}, {:.1})", pose.x, pose.y),
            });
            ops.push(DrawOp::CompassRose {
                at: ScreenPoint::new(canvas.width - 40.0, 40.0),
                rotation_degrees: 0.0,
            });
        }
    }

    ops.push(DrawOp::Legend {
        at: ScreenPoint::new(10.0, 10.0),
        entries: &LEGEND,
    });

    MapPlan { ops }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{MapBounds, MapObject, WorldPoint};
    use std::f64::consts::{FRAC_PI_2, PI};

    const EPS: f64 = 1e-9;

    fn snapshot_with(objects: Vec<MapObject>) -> MapSnapshot {
        MapSnapshot {
            bounds: MapBounds {
                min_x: -200.0,
                max_x: 200.0,
                min_y: -200.0,
                max_y: 200.0,
            },
            objects,
        }
    }

    fn object(category: ObjectCategory, x: f64, y: f64) -> MapObject {
        MapObject {
            category,
            kind: "Test".into(),
            name: None,
            position: WorldPoint { x, y, z: 0.0 },
        }
    }

    fn canvas() -> CanvasSize {
        CanvasSize::new(400.0, 400.0)
    }

    fn markers(plan: &MapPlan) -> Vec<&DrawOp> {
        plan.ops
            .iter()
            .filter(|op| matches!(op, DrawOp::Marker { .. }))
            .collect()
    }

    #[test]
    fn missing_snapshot_degrades_to_placeholder() {
        let plan = render_plan(
            None,
            &Pose::default(),
            &Viewport::new(),
            canvas(),
            MapMode::HeadingLocked,
        );
        assert!(plan.is_placeholder());
    }

    #[test]
    fn vehicle_position_projects_to_canvas_center() {
        let snapshot = snapshot_with(vec![object(ObjectCategory::Tree, 37.5, -12.0)]);
        let pose = Pose {
            x: 37.5,
            y: -12.0,
            yaw: 1.234,
        };
        let plan = render_plan(
            Some(&snapshot),
            &pose,
            &Viewport::new(),
            canvas(),
            MapMode::HeadingLocked,
        );
        match markers(&plan)[0] {
            DrawOp::Marker { at, .. } => {
                assert!((at.x - 200.0).abs() < EPS);
                assert!((at.y - 200.0).abs() < EPS);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn object_ahead_projects_above_center_when_heading_north() {
        // Vehicle at (10,10) heading 90 deg (north); object 10 units
        // ahead in world Y. base scale = min(400/400, 400/400) * 0.9.
        let snapshot = snapshot_with(vec![object(ObjectCategory::Windmill, 10.0, 20.0)]);
        let pose = Pose {
            x: 10.0,
            y: 10.0,
            yaw: FRAC_PI_2,
        };
        let plan = render_plan(
            Some(&snapshot),
            &pose,
            &Viewport::new(),
            canvas(),
            MapMode::HeadingLocked,
        );
        match markers(&plan)[0] {
            DrawOp::Marker { at, label, .. } => {
                assert!((at.x - 200.0).abs() < EPS);
                assert!((at.y - (200.0 - 10.0 * 0.9)).abs() < EPS);
                // Windmill markers are large enough to be labelled.
                assert_eq!(label.as_deref(), Some("Test"));
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn heading_rotation_turns_world_around_vehicle() {
        // Facing west (heading 180): an object due north appears to the
        // vehicle's right, i.e. right of the canvas center.
        let snapshot = snapshot_with(vec![object(ObjectCategory::Tree, 0.0, 10.0)]);
        let pose = Pose {
            x: 0.0,
            y: 0.0,
            yaw: PI,
        };
        let plan = render_plan(
            Some(&snapshot),
            &pose,
            &Viewport::new(),
            canvas(),
            MapMode::HeadingLocked,
        );
        match markers(&plan)[0] {
            DrawOp::Marker { at, .. } => {
                assert!((at.x - (200.0 + 9.0)).abs() < 1e-6);
                assert!((at.y - 200.0).abs() < 1e-6);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn pan_is_applied_inside_the_rotated_frame() {
        let snapshot = snapshot_with(vec![object(ObjectCategory::Tree, 0.0, 0.0)]);
        let pose = Pose {
            x: 0.0,
            y: 0.0,
            yaw: PI,
        };
        let mut viewport = Viewport::new();
        viewport.begin_drag(0.0, 0.0);
        viewport.drag_move(10.0, 0.0);
        viewport.end_drag();

        let plan = render_plan(
            Some(&snapshot),
            &pose,
            &viewport,
            canvas(),
            MapMode::HeadingLocked,
        );
        // Heading 180 rotates the frame by 90 deg, so a +x pan shows up
        // as +y on screen.
        match markers(&plan)[0] {
            DrawOp::Marker { at, .. } => {
                assert!((at.x - 200.0).abs() < 1e-6);
                assert!((at.y - 210.0).abs() < 1e-6);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn north_up_mode_moves_the_vehicle_marker_instead() {
        let snapshot = snapshot_with(vec![]);
        let pose = Pose {
            x: 10.0,
            y: 10.0,
            yaw: FRAC_PI_2,
        };
        let plan = render_plan(
            Some(&snapshot),
            &pose,
            &Viewport::new(),
            canvas(),
            MapMode::NorthUp,
        );
        let arrow = plan
            .ops
            .iter()
            .find(|op| matches!(op, DrawOp::VehicleArrow { .. }))
            .unwrap();
        match arrow {
            DrawOp::VehicleArrow {
                at,
                rotation_degrees,
                ..
            } => {
                assert!((at.x - (200.0 + 9.0)).abs() < EPS);
                assert!((at.y - (200.0 - 9.0)).abs() < EPS);
                // Heading north means the arrow needs no rotation.
                assert!((rotation_degrees - 0.0).abs() < EPS);
            }
            _ => unreachable!(),
        }
        let compass = plan
            .ops
            .iter()
            .find(|op| matches!(op, DrawOp::CompassRose { .. }))
            .unwrap();
        assert_eq!(
            compass,
            &DrawOp::CompassRose {
                at: ScreenPoint::new(360.0, 40.0),
                rotation_degrees: 0.0,
            }
        );
    }

    #[test]
    fn grid_spans_the_fixed_radius_on_fixed_spacing() {
        let snapshot = snapshot_with(vec![]);
        let plan = render_plan(
            Some(&snapshot),
            &Pose::default(),
            &Viewport::new(),
            canvas(),
            MapMode::HeadingLocked,
        );
        let grid_lines = plan
            .ops
            .iter()
            .filter(|op| matches!(op, DrawOp::GridLine { .. }))
            .count();
        // 17 offsets from -400 to 400 in 50-unit steps, two lines each.
        assert_eq!(grid_lines, 34);
    }

    #[test]
    fn zoom_stays_clamped_for_any_wheel_sequence() {
        let mut viewport = Viewport::new();
        for _ in 0..100 {
            viewport.wheel(-1.0);
            assert!(viewport.zoom() <= ZOOM_MAX);
        }
        assert_eq!(viewport.zoom(), ZOOM_MAX);
        for _ in 0..200 {
            viewport.wheel(1.0);
            assert!(viewport.zoom() >= ZOOM_MIN);
        }
        assert_eq!(viewport.zoom(), ZOOM_MIN);
    }

    #[test]
    fn drag_pans_by_raw_pixel_delta_regardless_of_zoom() {
        let mut viewport = Viewport::new();
        for _ in 0..20 {
            viewport.wheel(-1.0); // zoom in hard
        }
        viewport.begin_drag(100.0, 100.0);
        viewport.drag_move(130.0, 80.0);
        viewport.end_drag();
        assert_eq!(viewport.pan(), ScreenPoint::new(30.0, -20.0));

        // Further motion after the drag ended changes nothing.
        viewport.drag_move(500.0, 500.0);
        assert_eq!(viewport.pan(), ScreenPoint::new(30.0, -20.0));
    }

    #[test]
    fn marker_table_matches_category_styling() {
        assert_eq!(marker_style(ObjectCategory::Building).size, 10.0);
        assert_eq!(marker_style(ObjectCategory::Road).color, "#6b7280");
        assert_eq!(
            marker_style(ObjectCategory::Other),
            marker_style(ObjectCategory::Container)
        );
    }
}
