#![allow(dead_code)]
use opal_domain::{algs::communicator::RayonComm, index::IndexRange};

/// `n` in-process ranks.
pub fn rayon_world(n: usize) -> Vec<RayonComm> {
    RayonComm::world(n)
}

/// Two-rank Rayon comms (ranks 0 and 1).
pub fn rayons() -> (RayonComm, RayonComm) {
    (RayonComm::new(0, 2), RayonComm::new(1, 2))
}

/// Run `f` once per rank on its own thread; results in rank order.
pub fn run_ranks<T, F>(comms: &[RayonComm], f: F) -> Vec<T>
where
    T: Send,
    F: Fn(&RayonComm) -> T + Sync,
{
    let f = &f;
    std::thread::scope(|s| {
        let handles: Vec<_> = comms.iter().map(|c| s.spawn(move || f(c))).collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("rank thread panicked"))
            .collect()
    })
}

/// Assert `parts` tile `domain`: contained, pairwise disjoint, same point count.
pub fn assert_tiles<const D: usize>(domain: &IndexRange<D>, parts: &[IndexRange<D>]) {
    let covered: usize = parts.iter().map(IndexRange::size).sum();
    assert_eq!(covered, domain.size(), "parts={parts:?}");
    for (i, a) in parts.iter().enumerate() {
        assert!(domain.contains(a), "{a} leaves {domain}");
        for b in &parts[i + 1..] {
            assert!(!a.touches(b), "{a} overlaps {b}");
        }
    }
}

/// Assert vec is a permutation of another vec (order-agnostic).
pub fn assert_permutation<T: Ord + Copy + std::fmt::Debug>(got: &[T], want: &[T]) {
    let mut a = got.to_vec();
    a.sort_unstable();
    let mut b = want.to_vec();
    b.sort_unstable();
    assert_eq!(a, b, "not a permutation\n got={:?}\nwant={:?}", got, want);
}
