//! Discretization of an irregular domain on a regular Cartesian grid.
//!
//! [`ArbitraryDomain::compute`] classifies every grid cell of the local
//! slab (plus one ghost plane towards each neighbouring rank) as inside or
//! outside the boundary geometry, records the distance from each inside
//! cell to the boundary on every side whose neighbour is missing, and
//! numbers the inside cells globally. The numbering runs z-plane by
//! z-plane, `y` then `x` within a plane, and is offset by a rank-ordered
//! prefix sum so that consecutive ranks get consecutive index ranges.
//!
//! DOF numbering assumes each rank owns complete x/y planes (a z-slab
//! decomposition); other local ranges are rejected.

use std::collections::BTreeMap;

use hashbrown::HashMap;
use itertools::iproduct;

use crate::algs::collective::exclusive_scan_sum;
use crate::algs::communicator::Communicator;
use crate::config::DiscretizerConfig;
use crate::debug_invariants::{DebugInvariants, ensure};
use crate::domain_error::DomainError;
use crate::index::{AxisRange, GuardCellSizes, IndexRange};
use crate::solver::boundary::{BoundaryGeometry, Point};
use crate::solver::stencil::{Direction, Interpolation, Stencil};

/// Integer cell coordinates `(x, y, z)`.
pub type Coord = [i64; 3];

pub struct ArbitraryDomain<G: BoundaryGeometry> {
    geometry: G,
    nr: [usize; 3],
    hr: [f64; 3],
    range_min: Point,
    range_max: Point,
    inside_ref: Point,
    interpolation: Interpolation,
    local: Option<IndexRange<3>>,
    inside: HashMap<Coord, bool>,
    /// Signed distance to the boundary, one map per [`Direction`].
    intersections: [HashMap<Coord, f64>; 6],
    dof_by_coord: HashMap<Coord, i64>,
    coord_by_dof: BTreeMap<i64, Coord>,
    num_xy: Vec<usize>,
    num_ghost_left: usize,
    total_dofs: i64,
}

fn validate_grid(nr: [usize; 3], hr: [f64; 3]) -> Result<(), DomainError> {
    if let Some(d) = (0..3).find(|&d| nr[d] == 0) {
        return Err(DomainError::InvalidGrid(format!("no grid points along axis {d}")));
    }
    if let Some(d) = (0..3).find(|&d| !(hr[d].is_finite() && hr[d] > 0.0)) {
        return Err(DomainError::InvalidGrid(format!(
            "spacing {} along axis {d} is not positive",
            hr[d]
        )));
    }
    Ok(())
}

fn bounds(r: AxisRange) -> (i64, i64) {
    (r.first(), r.last())
}

impl<G: BoundaryGeometry> ArbitraryDomain<G> {
    /// Grid of `nr` cells of size `hr` spanning the geometry's bounding box.
    ///
    /// Fails if the geometry is not ready or knows no inside point.
    pub fn new(
        geometry: G,
        nr: [usize; 3],
        hr: [f64; 3],
        interpolation: Interpolation,
    ) -> Result<Self, DomainError> {
        validate_grid(nr, hr)?;
        if !geometry.is_ready() {
            return Err(DomainError::GeometryNotReady);
        }
        let inside_ref = geometry.inside_point().ok_or(DomainError::NoInsidePoint)?;
        Ok(Self {
            range_min: geometry.min_coords(),
            range_max: geometry.max_coords(),
            geometry,
            nr,
            hr,
            inside_ref,
            interpolation,
            local: None,
            inside: HashMap::new(),
            intersections: Default::default(),
            dof_by_coord: HashMap::new(),
            coord_by_dof: BTreeMap::new(),
            num_xy: Vec::new(),
            num_ghost_left: 0,
            total_dofs: 0,
        })
    }

    pub fn with_config(
        geometry: G,
        nr: [usize; 3],
        hr: [f64; 3],
        cfg: &DiscretizerConfig,
    ) -> Result<Self, DomainError> {
        let domain = Self::new(geometry, nr, hr, cfg.interpolation)?;
        Ok(match cfg.range {
            Some((min, max)) => domain.with_range(min, max),
            None => domain,
        })
    }

    /// Place the grid on `[min, max]` instead of the bounding box.
    pub fn with_range(mut self, min: Point, max: Point) -> Self {
        self.range_min = min;
        self.range_max = max;
        self
    }

    pub fn geometry(&self) -> &G {
        &self.geometry
    }

    pub fn interpolation(&self) -> Interpolation {
        self.interpolation
    }

    pub fn grid_size(&self) -> [usize; 3] {
        self.nr
    }

    pub fn spacing(&self) -> [f64; 3] {
        self.hr
    }

    pub fn range(&self) -> (Point, Point) {
        (self.range_min, self.range_max)
    }

    /// Local range of the last `compute`.
    pub fn local_range(&self) -> Option<IndexRange<3>> {
        self.local
    }

    pub fn cell_center(&self, c: Coord) -> Point {
        [0usize, 1, 2].map(|d| self.range_min[d] + (c[d] as f64 + 0.5) * self.hr[d])
    }

    fn in_grid(&self, c: Coord) -> bool {
        (0..3).all(|d| c[d] >= 0 && (c[d] as usize) < self.nr[d])
    }

    fn classify(&self, c: Coord) -> bool {
        self.in_grid(c)
            && self
                .geometry
                .fast_is_inside(self.inside_ref, self.cell_center(c))
                % 2
                == 0
    }

    /// True if the neighbour of `c` in `dir` is off the grid or outside the
    /// geometry. Cells beyond the classified region are tested directly.
    fn neighbor_missing(&self, c: Coord, dir: Direction) -> bool {
        let n = dir.neighbor(c);
        if !self.in_grid(n) {
            return true;
        }
        match self.inside.get(&n) {
            Some(&inside) => !inside,
            None => !self.classify(n),
        }
    }

    /// Classify, intersect and number the cells of `local` with spacing `hr`.
    ///
    /// Collective: every rank must call this with its own slab.
    pub fn compute<C: Communicator>(
        &mut self,
        comm: &C,
        hr: [f64; 3],
        local: IndexRange<3>,
    ) -> Result<(), DomainError> {
        validate_grid(self.nr, hr)?;
        let full = IndexRange::from_lengths(self.nr);
        if local.axis(0) != full.axis(0) || local.axis(1) != full.axis(1) {
            return Err(DomainError::NonSlabDecomposition {
                x: bounds(local.axis(0)),
                y: bounds(local.axis(1)),
            });
        }
        if local.axis(2).is_empty() || !full.axis(2).contains_range(&local.axis(2)) {
            return Err(DomainError::InvalidGrid(format!(
                "local z range {} outside {} planes",
                local.axis(2),
                self.nr[2]
            )));
        }
        self.hr = hr;

        let mut left = [0; 3];
        let mut right = [0; 3];
        for d in 0..3 {
            left[d] = usize::from(local.axis(d).first() != 0);
            right[d] = usize::from(local.axis(d).last() != self.nr[d] as i64 - 1);
        }
        let ghosted = local.grow(&GuardCellSizes::new(left, right));
        let cells: Vec<Coord> = iproduct!(
            ghosted.axis(2).iter(),
            ghosted.axis(1).iter(),
            ghosted.axis(0).iter()
        )
        .map(|(z, y, x)| [x, y, z])
        .collect();

        log::info!("* Starting the boundary intersection tests...");
        self.inside.clear();
        self.intersections.iter_mut().for_each(|m| m.clear());
        for &c in &cells {
            let inside = self.classify(c);
            self.inside.insert(c, inside);
        }
        let mut hits = Vec::new();
        for &c in cells.iter().filter(|&&c| self.is_inside(c)) {
            let p = self.cell_center(c);
            for dir in Direction::ALL {
                if !self.neighbor_missing(c, dir) {
                    continue;
                }
                match self.geometry.intersect_ray_boundary(p, dir.unit()) {
                    Some(hit) => hits.push((dir, c, hit[dir.axis()] - p[dir.axis()])),
                    None => log::debug!("no boundary found along {dir:?} from cell {c:?}"),
                }
            }
        }
        for (dir, c, d) in hits {
            self.intersections[dir.slot()].insert(c, d);
        }

        log::info!("* Finding number of ghost nodes to the left...");
        let z0 = local.axis(2).first();
        self.num_ghost_left = if z0 != 0 { self.count_plane(z0 - 1) } else { 0 };

        log::info!("* Finding number of xy points in each plane along z...");
        self.num_xy = local.axis(2).iter().map(|z| self.count_plane(z)).collect();
        let num_total: usize = self.num_xy.iter().sum();

        let scan = exclusive_scan_sum(comm, num_total as i64);
        self.total_dofs = scan.total;

        log::info!("* Building up index and coordinate map...");
        self.dof_by_coord.clear();
        self.coord_by_dof.clear();
        let mut index = scan.offset - self.num_ghost_left as i64;
        for (z, y, x) in iproduct!(
            ghosted.axis(2).iter(),
            0..self.nr[1] as i64,
            0..self.nr[0] as i64
        ) {
            let c = [x, y, z];
            if self.is_inside(c) {
                self.dof_by_coord.insert(c, index);
                self.coord_by_dof.insert(index, c);
                index += 1;
            }
        }
        self.local = Some(local);
        log::info!(
            "* Done: {num_total} local unknowns starting at {}, {} in total",
            scan.offset,
            scan.total
        );
        self.debug_assert_invariants();
        Ok(())
    }

    fn count_plane(&self, z: i64) -> usize {
        iproduct!(0..self.nr[0] as i64, 0..self.nr[1] as i64)
            .filter(|&(x, y)| self.is_inside([x, y, z]))
            .count()
    }

    /// Classification of a computed cell; unknown cells are outside.
    pub fn is_inside(&self, c: Coord) -> bool {
        self.inside.get(&c).copied().unwrap_or(false)
    }

    /// Signed distance from the centre of `c` to the boundary in `dir`.
    pub fn intersection(&self, c: Coord, dir: Direction) -> Option<f64> {
        self.intersections[dir.slot()].get(&c).copied()
    }

    pub fn dof_index(&self, c: Coord) -> Option<i64> {
        self.dof_by_coord.get(&c).copied()
    }

    pub fn coord_of(&self, dof: i64) -> Option<Coord> {
        self.coord_by_dof.get(&dof).copied()
    }

    /// Locally known `(dof, cell)` pairs in index order, ghosts included.
    pub fn dofs(&self) -> impl Iterator<Item = (i64, Coord)> + '_ {
        self.coord_by_dof.iter().map(|(&i, &c)| (i, c))
    }

    /// Inside cells in plane `z` of the local slab.
    pub fn num_xy(&self, z: i64) -> Option<usize> {
        let first = self.local?.axis(2).first();
        usize::try_from(z - first)
            .ok()
            .and_then(|i| self.num_xy.get(i).copied())
    }

    /// Inside cells in the ghost plane below the local slab.
    pub fn num_ghost_nodes_left(&self) -> usize {
        self.num_ghost_left
    }

    /// Inside cells on all ranks.
    pub fn total_dofs(&self) -> i64 {
        self.total_dofs
    }

    /// Uniform stencil; arms towards missing neighbours are zeroed.
    pub fn constant_interpolation(&self, c: Coord) -> Stencil {
        let mut s = Stencil::default();
        for dir in Direction::ALL {
            let h = self.hr[dir.axis()];
            s.center += 1.0 / (h * h);
            if !self.neighbor_missing(c, dir) {
                s.set(dir, -1.0 / (h * h));
            }
        }
        s
    }

    /// Stencil with the arm towards a missing neighbour shortened to the
    /// recorded boundary distance.
    pub fn linear_interpolation(&self, c: Coord) -> Stencil {
        let mut s = Stencil::default();
        for dir in Direction::ALL {
            let dw = self.hr[dir.axis()];
            if self.neighbor_missing(c, dir) {
                let dr = match self.intersection(c, dir) {
                    Some(d) => d.abs(),
                    None => {
                        log::debug!("cell {c:?} has no boundary distance along {dir:?}");
                        dw
                    }
                };
                s.center += 1.0 / (dr * dw);
            } else {
                s.center += 1.0 / (dw * dw);
                s.set(dir, -1.0 / (dw * dw));
            }
        }
        if s.center <= 0.0 || s.center.is_nan() {
            log::warn!("non-positive stencil center {} at cell {c:?}", s.center);
        }
        s
    }

    /// Stencil for `c` using the configured interpolation.
    pub fn stencil(&self, c: Coord) -> Stencil {
        match self.interpolation {
            Interpolation::Constant => self.constant_interpolation(c),
            Interpolation::Linear => self.linear_interpolation(c),
        }
    }

    /// Matrix row of cell `c` as `(column, coefficient)` pairs sorted by
    /// column. Zero coefficients and neighbours without a DOF are dropped.
    pub fn assemble_row(&self, c: Coord) -> Option<Vec<(i64, f64)>> {
        let row = self.dof_index(c)?;
        let s = self.stencil(c);
        let mut entries = vec![(row, s.center)];
        for dir in Direction::ALL {
            let v = s.get(dir);
            if v == 0.0 {
                continue;
            }
            if let Some(col) = self.dof_index(dir.neighbor(c)) {
                entries.push((col, v));
            }
        }
        entries.sort_by_key(|&(col, _)| col);
        Some(entries)
    }
}

impl<G: BoundaryGeometry> DebugInvariants for ArbitraryDomain<G> {
    fn validate_invariants(&self) -> Result<(), DomainError> {
        for dir in Direction::ALL {
            for c in self.intersections[dir.slot()].keys() {
                ensure(self.is_inside(*c), || {
                    format!("outside cell {c:?} has a boundary distance along {dir:?}")
                })?;
                ensure(self.neighbor_missing(*c, dir), || {
                    format!("cell {c:?} has a neighbour along {dir:?} and a boundary distance")
                })?;
            }
        }
        ensure(self.dof_by_coord.len() == self.coord_by_dof.len(), || {
            "DOF maps differ in size".to_string()
        })?;
        for (c, i) in &self.dof_by_coord {
            ensure(self.coord_by_dof.get(i) == Some(c), || {
                format!("DOF {i} does not map back to {c:?}")
            })?;
        }
        Ok(())
    }
}
