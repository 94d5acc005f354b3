mod util;
use util::*;

use opal_domain::algs::communicator::NoComm;
use opal_domain::index::{AxisTag, IndexRange};
use opal_domain::layout::FieldLayout;
use opal_domain::solver::{ArbitraryDomain, BoxBoundary, Coord, Interpolation, SphereBoundary};
use serial_test::serial;

const H: f64 = 0.1;
const NR: [usize; 3] = [6, 6, 9];

/// Box geometry that leaves the outer cell shell of the grid outside.
fn shell_geometry() -> BoxBoundary {
    BoxBoundary::new([H, H, H], [5.0 * H, 5.0 * H, 8.0 * H])
}

fn shell_domain() -> ArbitraryDomain<BoxBoundary> {
    ArbitraryDomain::new(shell_geometry(), NR, [H; 3], Interpolation::Linear)
        .unwrap()
        .with_range([0.0; 3], [6.0 * H, 6.0 * H, 9.0 * H])
}

struct RankDofs {
    local: IndexRange<3>,
    known: Vec<(i64, Coord)>,
    total: i64,
    ghost_left: usize,
}

fn z_slab_dofs(ranks: usize) -> Vec<RankDofs> {
    let comms = rayon_world(ranks);
    run_ranks(&comms, |c| {
        let tags = [AxisTag::Serial, AxisTag::Serial, AxisTag::Parallel];
        let layout = FieldLayout::initialize(c, IndexRange::from_lengths(NR), Some(tags), None).unwrap();
        let local = layout.local_domain().unwrap();
        let mut dom = shell_domain();
        dom.compute(c, [H; 3], local).unwrap();
        RankDofs {
            local,
            known: dom.dofs().collect(),
            total: dom.total_dofs(),
            ghost_left: dom.num_ghost_nodes_left(),
        }
    })
}

#[test]
#[serial]
fn distributed_numbering_matches_serial() {
    let mut serial_dom = shell_domain();
    serial_dom
        .compute(&NoComm, [H; 3], IndexRange::from_lengths(NR))
        .unwrap();
    assert_eq!(serial_dom.total_dofs(), 7 * 16);

    let ranks = z_slab_dofs(3);
    let mut owned = Vec::new();
    for r in &ranks {
        assert_eq!(r.total, 7 * 16);
        for &(dof, c) in &r.known {
            assert_eq!(serial_dom.dof_index(c), Some(dof), "cell {c:?}");
            if r.local.contains_point(c) {
                owned.push(dof);
            }
        }
    }
    let all: Vec<i64> = (0..7 * 16).collect();
    assert_permutation(&owned, &all);
}

#[test]
#[serial]
fn ghost_planes_carry_neighbour_counts() {
    let ranks = z_slab_dofs(3);
    assert_eq!(ranks[0].ghost_left, 0);
    for r in &ranks[1..] {
        // every interior plane holds a 4x4 block of inside cells
        assert_eq!(r.ghost_left, 16);
        let z0 = r.local.axis(2).first();
        assert!(r.known.iter().any(|&(_, c)| c[2] == z0 - 1));
    }
}

#[test]
fn sphere_rows_are_diagonally_dominant() {
    let h = 0.125;
    let geo = SphereBoundary::new([0.5; 3], 0.45);
    let mut dom = ArbitraryDomain::new(geo, [8; 3], [h; 3], Interpolation::Linear)
        .unwrap()
        .with_range([0.0; 3], [1.0; 3]);
    dom.compute(&NoComm, [h; 3], IndexRange::from_lengths([8; 3]))
        .unwrap();
    let cells: Vec<Coord> = dom.dofs().map(|(_, c)| c).collect();
    assert!(!cells.is_empty());
    for c in cells {
        let row = dom.assemble_row(c).unwrap();
        let diag = row
            .iter()
            .find(|&&(col, _)| Some(col) == dom.dof_index(c))
            .map(|&(_, v)| v)
            .unwrap();
        let off: f64 = row
            .iter()
            .filter(|&&(col, _)| Some(col) != dom.dof_index(c))
            .map(|&(_, v)| v.abs())
            .sum();
        assert!(diag >= off - 1e-9, "cell {c:?}: {diag} < {off}");
    }
}
