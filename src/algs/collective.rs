//! Rank-ordered reductions built on [`Communicator::allgather`].

use crate::algs::communicator::Communicator;
use crate::algs::wire::{WireI64, cast_slice, cast_slice_mut};

/// Result of a rank-ordered prefix sum.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ScanResult {
    /// Sum of the contributions of ranks `0..rank`.
    pub offset: i64,
    /// Sum over all ranks.
    pub total: i64,
}

/// Exclusive prefix sum of one integer per rank.
///
/// Rank `r` receives the sum of the values of ranks `0..r` together with the
/// global total. This is a collective call.
pub fn exclusive_scan_sum<C: Communicator>(comm: &C, value: i64) -> ScanResult {
    let n_ranks = comm.size().max(1);
    let mine = [WireI64::new(value)];
    let mut all = vec![WireI64::new(0); n_ranks];
    comm.allgather(cast_slice(&mine), cast_slice_mut(&mut all));

    let my_rank = comm.rank();
    let offset = all.iter().take(my_rank).map(WireI64::get).sum();
    let total = all.iter().map(WireI64::get).sum();
    ScanResult { offset, total }
}

/// Sum of one integer per rank, known on every rank afterwards.
pub fn allreduce_sum<C: Communicator>(comm: &C, value: i64) -> i64 {
    exclusive_scan_sum(comm, value).total
}
