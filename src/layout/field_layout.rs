//! `FieldLayout`: ownership of a global index domain by vnodes and ranks.
//!
//! A layout keeps two kinds of tables on every rank:
//!
//! - the **local** table, the vnodes this rank owns, keyed by a
//!   process-unique key;
//! - one **remote** [`DomainMap`] per guard-cell width, holding every vnode
//!   owned by another rank. The table for zero guard cells always exists;
//!   others are built on demand by [`FieldLayout::check_in`].
//!
//! The tiling itself is computed identically on every rank by
//! [`split_domain`]; only the membership of the local and remote tables
//! differs. Layouts built from an externally supplied vnode list exchange
//! those lists with all other ranks and are therefore collective calls.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::algs::communicator::{Communicator, ExchangeTags, REPARTITION_BCAST_TAG};
use crate::algs::exchange::{broadcast_others, gather_from_others};
use crate::config::LayoutConfig;
use crate::debug_invariants::{DebugInvariants, ensure};
use crate::domain_error::DomainError;
use crate::index::axis_tag::parallel_count;
use crate::index::{AxisTag, GuardCellSizes, IndexRange};
use crate::layout::domain_map::DomainMap;
use crate::layout::partition::{owning_rank, split_domain};
use crate::layout::user::{SharedUser, UserId, UserList};
use crate::layout::vnode::{Vnode, VnodeRef, decode_vnodes, encode_vnodes, next_local_key};

pub struct FieldLayout<const D: usize> {
    domain: IndexRange<D>,
    tags: [AxisTag; D],
    my_rank: usize,
    nprocs: usize,
    local: BTreeMap<u64, VnodeRef<D>>,
    remotes: BTreeMap<GuardCellSizes<D>, DomainMap<D>>,
    min_width: [usize; D],
    vnodes_per_direction: Option<[usize; D]>,
    users: UserList<D>,
}

impl<const D: usize> FieldLayout<D> {
    fn empty(domain: IndexRange<D>, tags: [AxisTag; D], my_rank: usize, nprocs: usize) -> Self {
        let mut remotes = BTreeMap::new();
        remotes.insert(GuardCellSizes::zero(), DomainMap::new(domain));
        Self {
            domain,
            tags,
            my_rank,
            nprocs: nprocs.max(1),
            local: BTreeMap::new(),
            remotes,
            min_width: domain.lengths(),
            vnodes_per_direction: None,
            users: UserList::new(),
        }
    }

    /// Partition `domain` into `vnodes` vnodes (one per rank by default),
    /// splitting only the axes tagged parallel (all by default).
    ///
    /// Fails with [`DomainError::NoParallelAxis`] if every axis is serial.
    /// A vnode count above the number of parallel elements is reduced to it.
    pub fn initialize<C: Communicator>(
        comm: &C,
        domain: IndexRange<D>,
        tags: Option<[AxisTag; D]>,
        vnodes: Option<usize>,
    ) -> Result<Self, DomainError> {
        let tags = tags.unwrap_or([AxisTag::Parallel; D]);
        if parallel_count(&tags) == 0 {
            return Err(DomainError::NoParallelAxis);
        }
        let nprocs = comm.size().max(1);
        let requested = match vnodes {
            Some(n) if n > 0 => n,
            _ => nprocs,
        };
        let partition = split_domain(&domain, &tags, requested)?;
        let count = partition.domains.len();

        let mut layout = Self::empty(domain, tags, comm.rank(), nprocs);
        layout.vnodes_per_direction = partition.vnodes_per_direction;
        for (v, dom) in partition.domains.into_iter().enumerate() {
            let p = owning_rank(v, nprocs, count);
            let vnode = Arc::new(Vnode::new(dom, p, v as i64));
            if p == layout.my_rank {
                layout.local.insert(next_local_key(), vnode);
            } else {
                layout.insert_remote(vnode);
            }
        }
        layout.calc_widths();
        log::info!(
            "rank {}: layout of {} with {} vnodes ({} local)",
            layout.my_rank,
            layout.domain,
            count,
            layout.local.len()
        );
        layout.debug_assert_invariants();
        Ok(layout)
    }

    /// [`FieldLayout::initialize`] driven by a [`LayoutConfig`].
    pub fn with_config<C: Communicator>(
        comm: &C,
        domain: IndexRange<D>,
        cfg: &LayoutConfig,
    ) -> Result<Self, DomainError> {
        let tags = cfg.tags::<D>()?;
        Self::initialize(comm, domain, Some(tags), cfg.vnodes)
    }

    /// Build a layout whose local vnodes are exactly `vnodes`, re-owned by
    /// this rank with their global IDs kept. The lists of all ranks are
    /// exchanged to fill the remote table, so every rank must call this.
    pub fn from_vnodes<C: Communicator>(
        comm: &C,
        domain: IndexRange<D>,
        vnodes: &[Vnode<D>],
    ) -> Result<Self, DomainError> {
        let me = comm.rank();
        let mut layout = Self::empty(domain, [AxisTag::Parallel; D], me, comm.size());
        for v in vnodes {
            layout.local.insert(next_local_key(), Arc::new(v.with_node(me)));
        }

        let payload = encode_vnodes(layout.local.values().map(|v| v.as_ref()));
        let tags = ExchangeTags::from_base(REPARTITION_BCAST_TAG);
        let pending = broadcast_others(comm, tags, &payload);
        for (peer, bytes) in gather_from_others(comm, pending)? {
            for v in decode_vnodes::<D>(&bytes)? {
                if v.domain().is_empty() {
                    log::warn!("rank {me}: zero-size vnode {} received from rank {peer}", v.domain());
                }
                layout.insert_remote(Arc::new(v.with_node(peer)));
            }
        }
        layout.calc_widths();
        layout.debug_assert_invariants();
        Ok(layout)
    }

    /// [`FieldLayout::from_vnodes`] for bare domains; the vnodes get no
    /// global IDs.
    pub fn from_domains<C: Communicator>(
        comm: &C,
        domain: IndexRange<D>,
        domains: &[IndexRange<D>],
    ) -> Result<Self, DomainError> {
        let vnodes: Vec<_> = domains
            .iter()
            .map(|d| Vnode::unnumbered(*d, comm.rank()))
            .collect();
        Self::from_vnodes(comm, domain, &vnodes)
    }

    /// Replace the tiling by `vnodes` (this rank's new local share).
    ///
    /// A temporary layout is built collectively, every checked-in user is
    /// handed it through [`FieldLayoutUser::repartition`](crate::layout::FieldLayoutUser::repartition),
    /// and only then are the tables swapped in. Guard-cell tables that
    /// existed before are rebuilt for the new tiling.
    pub fn repartition<C: Communicator>(
        &mut self,
        comm: &C,
        vnodes: &[Vnode<D>],
    ) -> Result<(), DomainError> {
        let mut temp = Self::from_vnodes(comm, self.domain, vnodes)?;
        temp.tags = self.tags;
        temp.vnodes_per_direction = self.vnodes_per_direction;
        for gc in self.remotes.keys().filter(|gc| !gc.is_zero()) {
            temp.new_gc_layout(*gc);
        }

        self.users.notify_repartition(&temp);

        self.local = std::mem::take(&mut temp.local);
        self.remotes = std::mem::take(&mut temp.remotes);
        self.calc_widths();
        log::info!(
            "rank {}: repartitioned into {} vnodes ({} local)",
            self.my_rank,
            self.num_vnodes(),
            self.local.len()
        );
        Ok(())
    }

    /// [`FieldLayout::repartition`] for bare domains.
    pub fn repartition_domains<C: Communicator>(
        &mut self,
        comm: &C,
        domains: &[IndexRange<D>],
    ) -> Result<(), DomainError> {
        let vnodes: Vec<_> = domains
            .iter()
            .map(|d| Vnode::unnumbered(*d, self.my_rank))
            .collect();
        self.repartition(comm, &vnodes)
    }

    /// Register `user`; makes sure a remote table for `gc` exists.
    pub fn check_in(&mut self, user: SharedUser<D>, gc: GuardCellSizes<D>) -> UserId {
        if !self.remotes.contains_key(&gc) {
            self.new_gc_layout(gc);
        }
        self.users.add(user, gc)
    }

    pub fn check_out(&mut self, id: UserId) -> Result<SharedUser<D>, DomainError> {
        self.users.remove(id)
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    /// Vnodes along `axis`, known for power-of-two partitions only.
    pub fn vnodes_per_direction(&self, axis: usize) -> Result<usize, DomainError> {
        if axis >= D {
            return Err(DomainError::AxisOutOfRange { axis, dim: D });
        }
        self.vnodes_per_direction
            .map(|v| v[axis])
            .ok_or(DomainError::VnodesPerDirectionUnavailable)
    }

    /// Smallest vnode extent along `axis`.
    pub fn min_width(&self, axis: usize) -> Result<usize, DomainError> {
        self.min_width
            .get(axis)
            .copied()
            .ok_or(DomainError::AxisOutOfRange { axis, dim: D })
    }

    pub fn min_widths(&self) -> [usize; D] {
        self.min_width
    }

    /// Domain of a local vnode owned by this rank; the last one wins.
    pub fn local_domain(&self) -> Option<IndexRange<D>> {
        self.local
            .values()
            .rev()
            .find(|v| v.node() == self.my_rank)
            .map(|v| *v.domain())
    }

    /// Remote vnodes whose domain grown by `gc` intersects `region`.
    /// Empty if no user ever checked in with `gc`.
    pub fn touch_remote(&self, region: &IndexRange<D>, gc: &GuardCellSizes<D>) -> Vec<VnodeRef<D>> {
        self.remotes
            .get(gc)
            .map(|m| m.touch(region).into_iter().map(|e| e.vnode.clone()).collect())
            .unwrap_or_default()
    }

    pub fn domain(&self) -> &IndexRange<D> {
        &self.domain
    }

    pub fn axis_tags(&self) -> &[AxisTag; D] {
        &self.tags
    }

    pub fn rank(&self) -> usize {
        self.my_rank
    }

    pub fn nprocs(&self) -> usize {
        self.nprocs
    }

    pub fn local_vnodes(&self) -> impl Iterator<Item = &VnodeRef<D>> {
        self.local.values()
    }

    /// Remote table for `gc`, if one has been built.
    pub fn remote_vnodes(&self, gc: &GuardCellSizes<D>) -> Option<&DomainMap<D>> {
        self.remotes.get(gc)
    }

    /// Guard-cell widths that have a remote table.
    pub fn guard_cell_keys(&self) -> impl Iterator<Item = &GuardCellSizes<D>> {
        self.remotes.keys()
    }

    pub fn num_local_vnodes(&self) -> usize {
        self.local.len()
    }

    pub fn num_remote_vnodes(&self) -> usize {
        self.base_remotes().map_or(0, DomainMap::len)
    }

    pub fn num_vnodes(&self) -> usize {
        self.num_local_vnodes() + self.num_remote_vnodes()
    }

    fn base_remotes(&self) -> Option<&DomainMap<D>> {
        self.remotes.get(&GuardCellSizes::zero())
    }

    fn insert_remote(&mut self, vnode: VnodeRef<D>) {
        let domain = self.domain;
        let base = *vnode.domain();
        let no_split = vnode.is_degenerate();
        self.remotes
            .entry(GuardCellSizes::zero())
            .or_insert_with(|| DomainMap::new(domain))
            .insert(base, base, vnode, no_split);
    }

    fn new_gc_layout(&mut self, gc: GuardCellSizes<D>) {
        let mut guarded = DomainMap::new(self.domain.grow(&gc));
        if let Some(base) = self.base_remotes() {
            for e in base.entries() {
                guarded.insert(e.base, e.base.grow(&gc), e.vnode.clone(), e.no_split);
            }
        }
        log::debug!(
            "rank {}: remote table for guard cells {gc} with {} vnodes",
            self.my_rank,
            guarded.len()
        );
        self.remotes.insert(gc, guarded);
    }

    fn calc_widths(&mut self) {
        let mut widths = self.domain.lengths();
        let remote = self.base_remotes().into_iter().flat_map(|m| m.entries()).map(|e| e.base);
        for dom in self.local.values().map(|v| *v.domain()).chain(remote) {
            for (w, len) in widths.iter_mut().zip(dom.lengths()) {
                *w = (*w).min(len);
            }
        }
        self.min_width = widths;
    }
}

impl<const D: usize> DebugInvariants for FieldLayout<D> {
    fn validate_invariants(&self) -> Result<(), DomainError> {
        let remote: Vec<_> = self
            .base_remotes()
            .map(|m| m.entries().into_iter().map(|e| e.vnode.clone()).collect())
            .unwrap_or_default();
        for v in self.local.values() {
            ensure(v.node() == self.my_rank, || {
                format!("local vnode {} owned by rank {}", v.domain(), v.node())
            })?;
        }
        for v in &remote {
            ensure(v.node() != self.my_rank, || {
                format!("remote vnode {} owned by this rank {}", v.domain(), self.my_rank)
            })?;
        }

        let all: Vec<IndexRange<D>> = self
            .local
            .values()
            .chain(remote.iter())
            .map(|v| *v.domain())
            .collect();
        let covered: usize = all.iter().map(IndexRange::size).sum();
        ensure(covered == self.domain.size(), || {
            format!("vnodes cover {covered} points of a {}-point domain", self.domain.size())
        })?;
        for (i, a) in all.iter().enumerate() {
            ensure(self.domain.contains(a), || format!("vnode {a} leaves {}", self.domain))?;
            for b in &all[i + 1..] {
                ensure(!a.touches(b), || format!("vnodes {a} and {b} overlap"))?;
            }
        }

        for d in 0..D {
            let min = all
                .iter()
                .map(|r| r.axis(d).length())
                .fold(self.domain.axis(d).length(), usize::min);
            ensure(self.min_width[d] == min, || {
                format!("min width {} along axis {d}, expected {min}", self.min_width[d])
            })?;
        }
        Ok(())
    }
}

impl<const D: usize> fmt::Display for FieldLayout<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Domain = {}", self.domain)?;
        writeln!(f, "FieldLayoutUsers = {}", self.users.len())?;
        if let Some(per_dir) = &self.vnodes_per_direction {
            write!(f, "vnodesPerDirection =")?;
            for n in per_dir {
                write!(f, " {n}")?;
            }
            writeln!(f)?;
        }
        writeln!(f, "Total number of vnodes = {}", self.num_vnodes())?;
        writeln!(f, "Local Vnodes = {}", self.local.len())?;
        for (i, v) in self.local.values().enumerate() {
            writeln!(f, " vnode {i}: {v}")?;
        }
        let remote = self.base_remotes().map(DomainMap::entries).unwrap_or_default();
        writeln!(f, "Remote Vnodes = {}", remote.len())?;
        for (i, e) in remote.iter().enumerate() {
            writeln!(f, " vnode {i} : {}", e.vnode)?;
        }
        Ok(())
    }
}

impl<const D: usize> fmt::Debug for FieldLayout<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldLayout")
            .field("domain", &self.domain)
            .field("rank", &self.my_rank)
            .field("local", &self.local.len())
            .field("remote", &self.num_remote_vnodes())
            .field("users", &self.users)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::communicator::NoComm;
    use crate::index::AxisRange;
    use crate::layout::user::FieldLayoutUser;
    use parking_lot::Mutex;

    fn square(n: usize) -> IndexRange<2> {
        IndexRange::from_lengths([n, n])
    }

    #[test]
    fn three_vnodes_tile_the_square() {
        let layout = FieldLayout::initialize(&NoComm, square(8), None, Some(3)).unwrap();
        assert_eq!(layout.num_local_vnodes(), 3);
        assert_eq!(layout.num_remote_vnodes(), 0);
        let area: usize = layout.local_vnodes().map(|v| v.domain().size()).sum();
        assert_eq!(area, 64);
        assert!(layout.validate_invariants().is_ok());
        assert!(matches!(
            layout.vnodes_per_direction(0),
            Err(DomainError::VnodesPerDirectionUnavailable)
        ));
        assert_eq!(layout.min_widths(), [3, 4]);
    }

    #[test]
    fn four_vnodes_are_quadrants() {
        let layout = FieldLayout::initialize(&NoComm, square(8), None, Some(4)).unwrap();
        assert!(layout.local_vnodes().all(|v| v.domain().size() == 16));
        assert_eq!(layout.vnodes_per_direction(0).unwrap(), 2);
        assert_eq!(layout.vnodes_per_direction(1).unwrap(), 2);
        assert!(matches!(
            layout.vnodes_per_direction(2),
            Err(DomainError::AxisOutOfRange { axis: 2, dim: 2 })
        ));
    }

    #[test]
    fn all_serial_layout_fails() {
        let tags = [AxisTag::Serial; 2];
        assert!(matches!(
            FieldLayout::initialize(&NoComm, square(8), Some(tags), None),
            Err(DomainError::NoParallelAxis)
        ));
    }

    #[test]
    fn config_drives_initialize() {
        let cfg = LayoutConfig {
            axis_tags: Some(vec![AxisTag::Serial, AxisTag::Parallel]),
            vnodes: Some(2),
        };
        let layout = FieldLayout::with_config(&NoComm, square(6), &cfg).unwrap();
        assert_eq!(layout.num_vnodes(), 2);
        assert_eq!(layout.min_widths(), [6, 3]);
    }

    #[test]
    fn local_domain_is_last_local_vnode() {
        let layout = FieldLayout::initialize(&NoComm, square(8), None, Some(2)).unwrap();
        let last = layout.local_vnodes().last().map(|v| *v.domain());
        assert_eq!(layout.local_domain(), last);
        assert_eq!(
            layout.local_domain(),
            Some(IndexRange::new([AxisRange::new(4, 7), AxisRange::new(0, 7)]))
        );
    }

    #[test]
    fn from_domains_keeps_rectangles() {
        let parts = [
            IndexRange::new([AxisRange::new(0, 0), AxisRange::new(0, 3)]),
            IndexRange::new([AxisRange::new(1, 3), AxisRange::new(0, 3)]),
        ];
        let layout = FieldLayout::from_domains(&NoComm, square(4), &parts).unwrap();
        assert_eq!(layout.num_local_vnodes(), 2);
        assert!(layout.local_vnodes().all(|v| v.vnode() == -1));
        assert_eq!(layout.min_width(0).unwrap(), 1);
    }

    struct Recorder {
        seen: Vec<usize>,
    }

    impl FieldLayoutUser<2> for Recorder {
        fn repartition(&mut self, new_layout: &FieldLayout<2>) {
            self.seen.push(new_layout.num_vnodes());
        }
    }

    #[test]
    fn repartition_notifies_users_before_swapping() {
        let mut layout = FieldLayout::initialize(&NoComm, square(8), None, Some(4)).unwrap();
        let rec = Arc::new(Mutex::new(Recorder { seen: Vec::new() }));
        let id = layout.check_in(rec.clone(), GuardCellSizes::uniform(1));
        assert!(layout.remote_vnodes(&GuardCellSizes::uniform(1)).is_some());

        let halves = [
            IndexRange::new([AxisRange::new(0, 7), AxisRange::new(0, 3)]),
            IndexRange::new([AxisRange::new(0, 7), AxisRange::new(4, 7)]),
        ];
        layout.repartition_domains(&NoComm, &halves).unwrap();
        assert_eq!(rec.lock().seen, vec![2]);
        assert_eq!(layout.num_vnodes(), 2);
        assert_eq!(layout.min_widths(), [8, 4]);
        assert_eq!(layout.vnodes_per_direction(0).unwrap(), 2);
        assert!(layout.remote_vnodes(&GuardCellSizes::uniform(1)).is_some());

        layout.check_out(id).unwrap();
        assert_eq!(layout.user_count(), 0);
        assert!(matches!(layout.check_out(id), Err(DomainError::UnknownUser(_))));
    }

    #[test]
    fn display_lists_vnodes() {
        let layout = FieldLayout::initialize(&NoComm, square(4), None, Some(2)).unwrap();
        let text = layout.to_string();
        assert!(text.starts_with("Domain = {[0:3:1],[0:3:1]}"));
        assert!(text.contains("vnodesPerDirection = 2 1"));
        assert!(text.contains("Local Vnodes = 2"));
        assert!(text.contains("Remote Vnodes = 0"));
    }
}
