//! Presentation region resolution and segment clipping
//!
//! A presenter is only permitted to draw inside its [`PresentationRegion`]:
//! either a bounded area supplied by the application as a [`RegionHandle`],
//! or the full viewport when no handle is given. The region is resolved once
//! at presenter construction and handed out as an immutable snapshot, so the
//! application turn and the compositor tick can both read it without a lock.
//!
//! Clipping uses parametric (Liang-Barsky style) segment intersection:
//! a trail segment that leaves the region is shortened to the boundary, and
//! a segment entirely outside produces nothing. Out-of-bounds input never
//! faults the rendering pass.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A point in region-local coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal coordinate
    pub x: f64,
    /// Vertical coordinate
    pub y: f64,
}

impl Point {
    /// Create a point
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned rectangle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// X coordinate of the left edge
    pub x: f64,
    /// Y coordinate of the top edge
    pub y: f64,
    /// Width (non-negative)
    pub width: f64,
    /// Height (non-negative)
    pub height: f64,
}

impl Rect {
    /// Create a new rectangle
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Area of this rectangle
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Check whether a point lies inside (edges inclusive)
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.x + self.width && p.y >= self.y && p.y <= self.y + self.height
    }

    /// Bounding box of both rectangles
    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = (self.x + self.width).max(other.x + other.width);
        let bottom = (self.y + self.height).max(other.y + other.height);
        Rect::new(x, y, right - x, bottom - y)
    }

    /// Clip the segment `a -> b` to this rectangle
    ///
    /// Liang-Barsky parametric clip. Returns the clipped endpoints, or
    /// `None` when the segment lies entirely outside. A degenerate segment
    /// (a == b) inside the rectangle clips to itself.
    pub fn clip_segment(&self, a: Point, b: Point) -> Option<(Point, Point)> {
        let dx = b.x - a.x;
        let dy = b.y - a.y;
        let mut t0 = 0.0_f64;
        let mut t1 = 1.0_f64;

        let edges = [
            (-dx, a.x - self.x),
            (dx, self.x + self.width - a.x),
            (-dy, a.y - self.y),
            (dy, self.y + self.height - a.y),
        ];

        for (p, q) in edges {
            if p == 0.0 {
                // Parallel to this edge: outside if beyond it
                if q < 0.0 {
                    return None;
                }
            } else {
                let t = q / p;
                if p < 0.0 {
                    if t > t1 {
                        return None;
                    }
                    if t > t0 {
                        t0 = t;
                    }
                } else {
                    if t < t0 {
                        return None;
                    }
                    if t < t1 {
                        t1 = t;
                    }
                }
            }
        }

        Some((
            Point::new(a.x + t0 * dx, a.y + t0 * dy),
            Point::new(a.x + t1 * dx, a.y + t1 * dy),
        ))
    }
}

/// Geometric shape bounding a presentation region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RegionBounds {
    /// Axis-aligned rectangle
    Rect(Rect),
    /// Closed polygon (vertices in order, implicitly closed)
    ///
    /// Convex polygons clip exactly. Non-convex input degrades to the
    /// polygon's bounding rectangle.
    Polygon(Vec<Point>),
}

impl RegionBounds {
    /// Area enclosed by these bounds
    ///
    /// Polygon area via the shoelace formula (absolute value, so winding
    /// does not matter).
    pub fn area(&self) -> f64 {
        match self {
            RegionBounds::Rect(r) => r.area(),
            RegionBounds::Polygon(pts) => {
                if pts.len() < 3 {
                    return 0.0;
                }
                let mut twice = 0.0;
                for i in 0..pts.len() {
                    let j = (i + 1) % pts.len();
                    twice += pts[i].x * pts[j].y - pts[j].x * pts[i].y;
                }
                twice.abs() / 2.0
            }
        }
    }

    /// Smallest rectangle enclosing these bounds
    pub fn bounding_rect(&self) -> Rect {
        match self {
            RegionBounds::Rect(r) => *r,
            RegionBounds::Polygon(pts) => {
                if pts.is_empty() {
                    return Rect::new(0.0, 0.0, 0.0, 0.0);
                }
                let mut min_x = f64::MAX;
                let mut min_y = f64::MAX;
                let mut max_x = f64::MIN;
                let mut max_y = f64::MIN;
                for p in pts {
                    min_x = min_x.min(p.x);
                    min_y = min_y.min(p.y);
                    max_x = max_x.max(p.x);
                    max_y = max_y.max(p.y);
                }
                Rect::new(min_x, min_y, max_x - min_x, max_y - min_y)
            }
        }
    }

    /// Check whether a point lies within the bounds
    pub fn contains(&self, p: Point) -> bool {
        match self {
            RegionBounds::Rect(r) => r.contains(p),
            RegionBounds::Polygon(pts) => polygon_contains(pts, p),
        }
    }

    /// Clip the segment `a -> b` to these bounds
    pub fn clip_segment(&self, a: Point, b: Point) -> Option<(Point, Point)> {
        match self {
            RegionBounds::Rect(r) => r.clip_segment(a, b),
            RegionBounds::Polygon(pts) => {
                if pts.len() < 3 {
                    return None;
                }
                if is_convex(pts) {
                    clip_segment_convex(pts, a, b)
                } else {
                    self.bounding_rect().clip_segment(a, b)
                }
            }
        }
    }
}

/// Coordinate space a region's bounds are expressed in
///
/// Shared with the input pipeline: raw samples and trusted events arrive in
/// the same space, so no transformation happens inside the presenter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoordinateSpace {
    /// Full-viewport coordinates (no handle supplied)
    Viewport,
    /// Coordinates local to an application-provided region
    RegionLocal,
}

/// Opaque region handle supplied by the application
///
/// Identity is stable for the handle's lifetime: two requests carrying the
/// same handle target the same presenter slot.
#[derive(Debug, Clone)]
pub struct RegionHandle {
    id: Uuid,
    bounds: RegionBounds,
}

impl RegionHandle {
    /// Create a handle around arbitrary bounds
    pub fn new(bounds: RegionBounds) -> Self {
        Self {
            id: Uuid::new_v4(),
            bounds,
        }
    }

    /// Convenience constructor for rectangular regions
    pub fn rect(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(RegionBounds::Rect(Rect::new(x, y, width, height)))
    }

    /// Stable handle identity
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The bounds this handle describes
    pub fn bounds(&self) -> &RegionBounds {
        &self.bounds
    }
}

/// Resolved clipping bounds for a presenter
///
/// Immutable snapshot: the presenter and the compositor tick both hold
/// read-only references, so no lock guards the common path. Replacing the
/// presentation area installs a freshly resolved snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct PresentationRegion {
    /// Handle the region was resolved from, if any
    pub source: Option<Uuid>,
    /// Clipping bounds
    pub bounds: RegionBounds,
    /// Coordinate space of the bounds
    pub space: CoordinateSpace,
}

impl PresentationRegion {
    /// Resolve a region from an optional handle
    ///
    /// With a handle, delegated rendering is clipped to the handle's bounds
    /// in region-local coordinates. Without one, the full viewport is used.
    pub fn resolve(handle: Option<&RegionHandle>, viewport: Rect) -> Self {
        match handle {
            Some(h) => Self {
                source: Some(h.id()),
                bounds: h.bounds().clone(),
                space: CoordinateSpace::RegionLocal,
            },
            None => Self {
                source: None,
                bounds: RegionBounds::Rect(viewport),
                space: CoordinateSpace::Viewport,
            },
        }
    }

    /// Clip a segment to this region's bounds
    pub fn clip_segment(&self, a: Point, b: Point) -> Option<(Point, Point)> {
        self.bounds.clip_segment(a, b)
    }

    /// Check whether a point lies within this region
    pub fn contains(&self, p: Point) -> bool {
        self.bounds.contains(p)
    }

    /// Area of the region
    pub fn area(&self) -> f64 {
        self.bounds.area()
    }
}

/// Check polygon convexity (collinear runs allowed)
fn is_convex(pts: &[Point]) -> bool {
    let n = pts.len();
    if n < 4 {
        return n == 3;
    }
    let mut sign = 0.0_f64;
    for i in 0..n {
        let a = pts[i];
        let b = pts[(i + 1) % n];
        let c = pts[(i + 2) % n];
        let cross = (b.x - a.x) * (c.y - b.y) - (b.y - a.y) * (c.x - b.x);
        if cross != 0.0 {
            if sign != 0.0 && (cross > 0.0) != (sign > 0.0) {
                return false;
            }
            sign = cross;
        }
    }
    true
}

/// Ray-casting point-in-polygon test
fn polygon_contains(pts: &[Point], p: Point) -> bool {
    let n = pts.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (pi, pj) = (pts[i], pts[j]);
        if ((pi.y > p.y) != (pj.y > p.y))
            && (p.x < (pj.x - pi.x) * (p.y - pi.y) / (pj.y - pi.y) + pi.x)
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Cyrus-Beck clip of segment `a -> b` against a convex polygon
fn clip_segment_convex(pts: &[Point], a: Point, b: Point) -> Option<(Point, Point)> {
    // Orientation decides which side is the interior
    let mut twice = 0.0;
    for i in 0..pts.len() {
        let j = (i + 1) % pts.len();
        twice += pts[i].x * pts[j].y - pts[j].x * pts[i].y;
    }
    let ccw = twice > 0.0;

    let d = Point::new(b.x - a.x, b.y - a.y);
    let mut t0 = 0.0_f64;
    let mut t1 = 1.0_f64;

    for i in 0..pts.len() {
        let v1 = pts[i];
        let v2 = pts[(i + 1) % pts.len()];
        let ex = v2.x - v1.x;
        let ey = v2.y - v1.y;
        // Inward edge normal
        let (nx, ny) = if ccw { (-ey, ex) } else { (ey, -ex) };

        let fa = nx * (a.x - v1.x) + ny * (a.y - v1.y);
        let fd = nx * d.x + ny * d.y;

        if fd == 0.0 {
            if fa < 0.0 {
                return None;
            }
            continue;
        }
        let t = -fa / fd;
        if fd < 0.0 {
            // Exiting the half-plane
            if t < t0 {
                return None;
            }
            if t < t1 {
                t1 = t;
            }
        } else {
            // Entering the half-plane
            if t > t1 {
                return None;
            }
            if t > t0 {
                t0 = t;
            }
        }
    }

    Some((
        Point::new(a.x + t0 * d.x, a.y + t0 * d.y),
        Point::new(a.x + t1 * d.x, a.y + t1 * d.y),
    ))
}
