//! Boundary geometry oracles.
//!
//! The discretizer only needs four questions answered about the boundary:
//! its bounding box, one point known to lie inside, how often a segment
//! crosses the surface, and where a ray first hits it.

/// Point or vector in physical space.
pub type Point = [f64; 3];

/// Ray parameters closer to the origin than this do not count as hits.
const RAY_EPS: f64 = 1e-12;

/// Closed surface bounding the simulation volume.
pub trait BoundaryGeometry {
    fn min_coords(&self) -> Point;
    fn max_coords(&self) -> Point;

    /// A point strictly inside the volume, if one is known.
    fn inside_point(&self) -> Option<Point>;

    /// Number of boundary crossings on the segment `reference -> test`.
    /// With `reference` inside, an even count means `test` is inside.
    fn fast_is_inside(&self, reference: Point, test: Point) -> usize;

    /// First boundary point hit by the ray `origin + t * dir`, `t > 0`.
    fn intersect_ray_boundary(&self, origin: Point, dir: Point) -> Option<Point>;

    /// False while the geometry is still being set up.
    fn is_ready(&self) -> bool {
        true
    }
}

#[inline]
fn sub(a: Point, b: Point) -> Point {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

#[inline]
fn dot(a: Point, b: Point) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

#[inline]
fn along(origin: Point, dir: Point, t: f64) -> Point {
    [origin[0] + t * dir[0], origin[1] + t * dir[1], origin[2] + t * dir[2]]
}

fn crossings_in_unit_interval(ts: &[f64]) -> usize {
    ts.iter().filter(|&&t| t > 0.0 && t < 1.0).count()
}

/// Axis-aligned box `[min, max]`.
#[derive(Clone, Debug, PartialEq)]
pub struct BoxBoundary {
    min: Point,
    max: Point,
}

impl BoxBoundary {
    pub fn new(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    /// Parameter interval of the line `origin + t * dir` inside the box.
    fn slab(&self, origin: Point, dir: Point) -> Option<(f64, f64)> {
        let mut t0 = f64::NEG_INFINITY;
        let mut t1 = f64::INFINITY;
        for d in 0..3 {
            if dir[d] == 0.0 {
                if origin[d] < self.min[d] || origin[d] > self.max[d] {
                    return None;
                }
                continue;
            }
            let a = (self.min[d] - origin[d]) / dir[d];
            let b = (self.max[d] - origin[d]) / dir[d];
            t0 = t0.max(a.min(b));
            t1 = t1.min(a.max(b));
        }
        (t0 <= t1).then_some((t0, t1))
    }
}

impl BoundaryGeometry for BoxBoundary {
    fn min_coords(&self) -> Point {
        self.min
    }

    fn max_coords(&self) -> Point {
        self.max
    }

    fn inside_point(&self) -> Option<Point> {
        self.is_ready().then(|| {
            [
                0.5 * (self.min[0] + self.max[0]),
                0.5 * (self.min[1] + self.max[1]),
                0.5 * (self.min[2] + self.max[2]),
            ]
        })
    }

    fn fast_is_inside(&self, reference: Point, test: Point) -> usize {
        match self.slab(reference, sub(test, reference)) {
            Some((t0, t1)) => crossings_in_unit_interval(&[t0, t1]),
            None => 0,
        }
    }

    fn intersect_ray_boundary(&self, origin: Point, dir: Point) -> Option<Point> {
        let (t0, t1) = self.slab(origin, dir)?;
        let t = if t0 > RAY_EPS { t0 } else { t1 };
        (t > RAY_EPS && t.is_finite()).then(|| along(origin, dir, t))
    }

    fn is_ready(&self) -> bool {
        (0..3).all(|d| self.min[d] < self.max[d])
    }
}

/// Sphere of `radius` around `center`.
#[derive(Clone, Debug, PartialEq)]
pub struct SphereBoundary {
    center: Point,
    radius: f64,
}

impl SphereBoundary {
    pub fn new(center: Point, radius: f64) -> Self {
        Self { center, radius }
    }

    /// Real roots of `|origin + t * dir - center|^2 = radius^2`, ascending.
    fn roots(&self, origin: Point, dir: Point) -> Option<(f64, f64)> {
        let f = sub(origin, self.center);
        let a = dot(dir, dir);
        if a == 0.0 {
            return None;
        }
        let b = 2.0 * dot(f, dir);
        let c = dot(f, f) - self.radius * self.radius;
        let disc = b * b - 4.0 * a * c;
        if disc <= 0.0 {
            return None;
        }
        let s = disc.sqrt();
        Some(((-b - s) / (2.0 * a), (-b + s) / (2.0 * a)))
    }
}

impl BoundaryGeometry for SphereBoundary {
    fn min_coords(&self) -> Point {
        self.center.map(|c| c - self.radius)
    }

    fn max_coords(&self) -> Point {
        self.center.map(|c| c + self.radius)
    }

    fn inside_point(&self) -> Option<Point> {
        self.is_ready().then_some(self.center)
    }

    fn fast_is_inside(&self, reference: Point, test: Point) -> usize {
        match self.roots(reference, sub(test, reference)) {
            Some((t0, t1)) => crossings_in_unit_interval(&[t0, t1]),
            None => 0,
        }
    }

    fn intersect_ray_boundary(&self, origin: Point, dir: Point) -> Option<Point> {
        let (t0, t1) = self.roots(origin, dir)?;
        let t = if t0 > RAY_EPS { t0 } else { t1 };
        (t > RAY_EPS).then(|| along(origin, dir, t))
    }

    fn is_ready(&self) -> bool {
        self.radius > 0.0
    }
}
