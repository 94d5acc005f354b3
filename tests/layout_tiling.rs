mod util;
use util::*;

use opal_domain::algs::communicator::NoComm;
use opal_domain::debug_invariants::DebugInvariants;
use opal_domain::index::{AxisTag, IndexRange};
use opal_domain::layout::partition::parallel_elements;
use opal_domain::layout::{FieldLayout, owning_rank, split_domain};
use proptest::prelude::*;

fn tags_strategy() -> impl Strategy<Value = [AxisTag; 3]> {
    prop::array::uniform3(prop::bool::ANY)
        .prop_filter("at least one parallel axis", |p| p.iter().any(|&b| b))
        .prop_map(|p| p.map(|b| if b { AxisTag::Parallel } else { AxisTag::Serial }))
}

proptest! {
    #[test]
    fn bisection_tiles_the_domain(
        lengths in prop::array::uniform3(1usize..12),
        tags in tags_strategy(),
        vnodes in 1usize..70,
    ) {
        let domain = IndexRange::from_lengths(lengths);
        let p = split_domain(&domain, &tags, vnodes).unwrap();
        let expected = vnodes.min(parallel_elements(&domain, &tags));
        prop_assert_eq!(p.domains.len(), expected);
        assert_tiles(&domain, &p.domains);
        for d in &p.domains {
            for (axis, tag) in tags.iter().enumerate() {
                if !tag.is_parallel() {
                    prop_assert_eq!(d.axis(axis), domain.axis(axis));
                }
            }
        }
        prop_assert_eq!(p.vnodes_per_direction.is_some(), expected.is_power_of_two());
    }

    #[test]
    fn splitting_is_deterministic(
        lengths in prop::array::uniform3(1usize..16),
        vnodes in 1usize..40,
    ) {
        let domain = IndexRange::from_lengths(lengths);
        let tags = [AxisTag::Parallel; 3];
        let a = split_domain(&domain, &tags, vnodes).unwrap();
        let b = split_domain(&domain, &tags, vnodes).unwrap();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn owning_rank_is_monotonic(nprocs in 1usize..17, vnodes in 1usize..200) {
        let ranks: Vec<_> = (0..vnodes).map(|v| owning_rank(v, nprocs, vnodes)).collect();
        prop_assert!(ranks.windows(2).all(|w| w[0] <= w[1]));
        prop_assert!(ranks.iter().all(|&r| r < nprocs));
        prop_assert_eq!(ranks[0], 0);
    }

    #[test]
    fn min_width_is_the_smallest_extent(
        lengths in prop::array::uniform2(1usize..20),
        vnodes in 1usize..30,
    ) {
        let domain = IndexRange::from_lengths(lengths);
        let layout = FieldLayout::initialize(&NoComm, domain, None, Some(vnodes)).unwrap();
        prop_assert!(layout.validate_invariants().is_ok());
        for axis in 0..2 {
            let min = layout
                .local_vnodes()
                .map(|v| v.domain().axis(axis).length())
                .fold(lengths[axis], usize::min);
            prop_assert_eq!(layout.min_width(axis).unwrap(), min);
        }
    }
}

#[test]
fn three_vnodes_on_eight_by_eight() {
    let domain = IndexRange::from_lengths([8, 8]);
    let layout = FieldLayout::initialize(&NoComm, domain, None, Some(3)).unwrap();
    let parts: Vec<_> = layout.local_vnodes().map(|v| *v.domain()).collect();
    assert_eq!(parts.len(), 3);
    assert_tiles(&domain, &parts);
}

#[test]
fn four_vnodes_on_eight_by_eight() {
    let domain = IndexRange::from_lengths([8, 8]);
    let layout = FieldLayout::initialize(&NoComm, domain, None, Some(4)).unwrap();
    let parts: Vec<_> = layout.local_vnodes().map(|v| *v.domain()).collect();
    assert!(parts.iter().all(|d| d.size() == 16));
    assert_tiles(&domain, &parts);
}

#[test]
fn all_serial_axes_fail() {
    let domain = IndexRange::from_lengths([8, 8]);
    let err = FieldLayout::initialize(&NoComm, domain, Some([AxisTag::Serial; 2]), None).unwrap_err();
    assert_eq!(
        err.to_string(),
        "at least one dimension of a FieldLayout must be PARALLEL"
    );
}
