//! Recursive bisection of an index space into vnode domains.
//!
//! Two paths, chosen by the (clamped) vnode count:
//!
//! - **power of two**: every round halves all current domains along the
//!   next parallel axis, cycling round-robin over the parallel axes. Domain
//!   `i` of round `k` becomes domains `2i` and `2i+1` of round `k+1`.
//! - **otherwise**: a bisection tree over the slot range `[0, vnodes)` is
//!   visited in heap order (node `v = 1 .. 2*vnodes-1`). The domain held in
//!   slot `lo` of node `[lo, hi)` is split along its longest parallel axis
//!   at ratio `(mid-lo)/(hi-lo)`; the right part moves to slot `mid`.
//!
//! Both paths are pure local computation and give the same tiling on every
//! rank.

use crate::domain_error::DomainError;
use crate::index::axis_tag::parallel_count;
use crate::index::{AxisTag, IndexRange};

/// A bisection-tree node `[lo, hi)` split at `mid`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SplitRange {
    pub lo: usize,
    pub mid: usize,
    pub hi: usize,
}

impl SplitRange {
    /// Fraction of the parent domain that stays in slot `lo`.
    pub fn ratio(&self) -> f64 {
        (self.mid - self.lo) as f64 / (self.hi - self.lo) as f64
    }
}

/// Output of [`split_domain`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Partition<const D: usize> {
    /// Vnode domains, indexed by global vnode ID.
    pub domains: Vec<IndexRange<D>>,
    /// Vnodes along each axis; only known for power-of-two counts.
    pub vnodes_per_direction: Option<[usize; D]>,
}

#[inline]
pub fn is_power_of_two(n: usize) -> bool {
    n.is_power_of_two()
}

/// Locate the slot range that tree node `v` (heap numbering, root = 1)
/// covers in a bisection of `[0, vnodes)`.
///
/// The bits of `v` below its leading one, most significant first, give the
/// path from the root: `1` descends into the upper half, `0` into the lower.
/// Returns `None` if the node covers a single slot and so splits nothing.
pub fn locate_split_range(vnodes: usize, v: usize) -> Option<SplitRange> {
    if v == 0 || vnodes == 0 {
        return None;
    }
    let depth = usize::BITS - 1 - v.leading_zeros();
    let (mut lo, mut hi) = (0, vnodes);
    for bit in (0..depth).rev() {
        let mid = lo + (hi - lo) / 2;
        if (v >> bit) & 1 == 1 {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    let mid = lo + (hi - lo) / 2;
    (mid > lo).then_some(SplitRange { lo, mid, hi })
}

/// Rank owning vnode `v`: `floor(v * nprocs / vnodes)`.
#[inline]
pub fn owning_rank(v: usize, nprocs: usize, vnodes: usize) -> usize {
    if vnodes == 0 {
        return 0;
    }
    ((v as u128 * nprocs as u128) / vnodes as u128) as usize
}

/// Product of the lengths of the parallel axes.
pub fn parallel_elements<const D: usize>(domain: &IndexRange<D>, tags: &[AxisTag; D]) -> usize {
    domain
        .lengths()
        .iter()
        .zip(tags)
        .filter(|(_, t)| t.is_parallel())
        .map(|(&l, _)| l)
        .product()
}

/// Split `domain` into `vnodes` domains honouring `tags`.
///
/// `vnodes` is clamped to `[1, parallel elements]`.
pub fn split_domain<const D: usize>(
    domain: &IndexRange<D>,
    tags: &[AxisTag; D],
    vnodes: usize,
) -> Result<Partition<D>, DomainError> {
    if parallel_count(tags) == 0 {
        return Err(DomainError::NoParallelAxis);
    }
    let available = parallel_elements(domain, tags);
    let mut count = vnodes.max(1);
    if available < count {
        log::debug!("reducing vnodes from {count} to {available} parallel elements");
        count = available.max(1);
    }

    if is_power_of_two(count) {
        Ok(split_power_of_two(domain, tags, count))
    } else {
        split_bisection(domain, tags, count).map(|domains| Partition {
            domains,
            vnodes_per_direction: None,
        })
    }
}

fn split_power_of_two<const D: usize>(
    domain: &IndexRange<D>,
    tags: &[AxisTag; D],
    vnodes: usize,
) -> Partition<D> {
    let mut domains = vec![*domain];
    let mut per_dir = [1usize; D];
    let mut axes = (0..D).filter(|&d| tags[d].is_parallel()).cycle();
    while domains.len() < vnodes {
        // at least one parallel axis exists, so the cycle never ends
        let Some(d) = axes.next() else { break };
        domains = domains
            .iter()
            .flat_map(|dom| {
                let (l, r) = dom.split_half(d);
                [l, r]
            })
            .collect();
        per_dir[d] *= 2;
    }
    Partition {
        domains,
        vnodes_per_direction: Some(per_dir),
    }
}

/// Parallel axis with the largest extent; the first maximum wins.
fn longest_parallel_axis<const D: usize>(dom: &IndexRange<D>, tags: &[AxisTag; D]) -> Option<usize> {
    let mut best = None;
    let mut lmax = 0;
    for (d, &len) in dom.lengths().iter().enumerate() {
        if tags[d].is_parallel() && len > lmax {
            lmax = len;
            best = Some(d);
        }
    }
    best
}

fn split_bisection<const D: usize>(
    domain: &IndexRange<D>,
    tags: &[AxisTag; D],
    vnodes: usize,
) -> Result<Vec<IndexRange<D>>, DomainError> {
    let mut domains = vec![*domain; vnodes];
    let mut produced = 1;
    for v in 1..2 * vnodes {
        let Some(node) = locate_split_range(vnodes, v) else {
            continue;
        };
        let parent = domains[node.lo];
        // an exhausted domain has no extent left; its split yields an empty side
        let axis = longest_parallel_axis(&parent, tags)
            .or_else(|| (0..D).find(|&d| tags[d].is_parallel()))
            .ok_or(DomainError::NoParallelAxis)?;
        let (l, r) = parent.split_ratio(axis, node.ratio());
        log::debug!(
            "bisection node {v}: slots [{}, {}) split at {} along axis {axis}",
            node.lo,
            node.hi,
            node.mid
        );
        domains[node.lo] = l;
        domains[node.mid] = r;
        produced += 1;
    }
    if produced != vnodes {
        return Err(DomainError::SplitCountMismatch {
            expected: vnodes,
            produced,
        });
    }
    Ok(domains)
}
