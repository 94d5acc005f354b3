//! `DomainMap`: remote vnodes indexed by the region they cover.
//!
//! The map is a lazily built bisection tree over its root region. Each
//! node splits its region in half along the longest axis; an entry is
//! stored at the deepest node whose region still contains its (guarded)
//! domain. `touch` only descends into nodes whose region intersects the
//! query, so neighbour lookups during halo exchange stay cheap.
//!
//! Entries inserted with `no_split` (degenerate domains of at most one
//! point) are kept at the root and never pushed into the tree, because
//! bisecting around them is not meaningful.

use crate::index::IndexRange;
use crate::layout::vnode::VnodeRef;

/// Stop subdividing nodes whose region has fewer points than this.
const MIN_NODE_SIZE: usize = 4;

/// One stored vnode.
#[derive(Clone, Debug)]
pub struct DomainEntry<const D: usize> {
    /// Domain without guard cells.
    pub base: IndexRange<D>,
    /// Domain with the map's guard cells added; what `touch` tests against.
    pub guarded: IndexRange<D>,
    pub vnode: VnodeRef<D>,
    pub no_split: bool,
}

#[derive(Clone, Debug)]
struct Node<const D: usize> {
    region: IndexRange<D>,
    entries: Vec<DomainEntry<D>>,
    children: Option<Box<[Node<D>; 2]>>,
}

impl<const D: usize> Node<D> {
    fn new(region: IndexRange<D>) -> Self {
        Self {
            region,
            entries: Vec::new(),
            children: None,
        }
    }

    fn split_axis(&self) -> Option<usize> {
        if self.region.size() < MIN_NODE_SIZE {
            return None;
        }
        let lengths = self.region.lengths();
        let mut best = None;
        let mut lmax = 1;
        for (d, &len) in lengths.iter().enumerate() {
            if len > lmax {
                lmax = len;
                best = Some(d);
            }
        }
        best
    }

    fn insert(&mut self, entry: DomainEntry<D>) {
        if let Some(axis) = self.split_axis() {
            let children = self.children.get_or_insert_with(|| {
                let (l, r) = self.region.split_half(axis);
                Box::new([Node::new(l), Node::new(r)])
            });
            for child in children.iter_mut() {
                if child.region.contains(&entry.guarded) && !entry.guarded.is_empty() {
                    child.insert(entry);
                    return;
                }
            }
        }
        self.entries.push(entry);
    }

    fn touch<'a>(&'a self, query: &IndexRange<D>, out: &mut Vec<&'a DomainEntry<D>>) {
        out.extend(self.entries.iter().filter(|e| e.guarded.touches(query)));
        if let Some(children) = &self.children {
            for child in children.iter() {
                if child.region.touches(query) {
                    child.touch(query, out);
                }
            }
        }
    }

    fn collect<'a>(&'a self, out: &mut Vec<&'a DomainEntry<D>>) {
        out.extend(self.entries.iter());
        if let Some(children) = &self.children {
            for child in children.iter() {
                child.collect(out);
            }
        }
    }
}

/// Bisection-tree map of remote vnodes for one guard-cell width.
#[derive(Clone, Debug)]
pub struct DomainMap<const D: usize> {
    root: Node<D>,
    len: usize,
}

impl<const D: usize> DomainMap<D> {
    /// Empty map over `region`. Entries outside the region are still
    /// accepted; they stay at the root.
    pub fn new(region: IndexRange<D>) -> Self {
        Self {
            root: Node::new(region),
            len: 0,
        }
    }

    pub fn region(&self) -> &IndexRange<D> {
        &self.root.region
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Store `vnode` under its `base` domain and `guarded` extent.
    pub fn insert(
        &mut self,
        base: IndexRange<D>,
        guarded: IndexRange<D>,
        vnode: VnodeRef<D>,
        no_split: bool,
    ) {
        let entry = DomainEntry {
            base,
            guarded,
            vnode,
            no_split,
        };
        if no_split {
            self.root.entries.push(entry);
        } else {
            self.root.insert(entry);
        }
        self.len += 1;
    }

    /// Entries whose guarded domain intersects `query`.
    pub fn touch(&self, query: &IndexRange<D>) -> Vec<&DomainEntry<D>> {
        let mut out = Vec::new();
        self.root.touch(query, &mut out);
        out
    }

    /// All entries, ordered by base domain.
    pub fn entries(&self) -> Vec<&DomainEntry<D>> {
        let mut out = Vec::with_capacity(self.len);
        self.root.collect(&mut out);
        out.sort_by(|a, b| a.base.cmp(&b.base).then(a.vnode.vnode().cmp(&b.vnode.vnode())));
        out
    }

    /// Look up the vnode stored under exactly `base`.
    pub fn get(&self, base: &IndexRange<D>) -> Option<&VnodeRef<D>> {
        self.root_entries_for(base)
            .into_iter()
            .find(|e| e.base == *base)
            .map(|e| &e.vnode)
    }

    /// Entries that were inserted with the `no_split` flag.
    pub fn no_split_entries(&self) -> impl Iterator<Item = &DomainEntry<D>> {
        self.root.entries.iter().filter(|e| e.no_split)
    }

    fn root_entries_for(&self, base: &IndexRange<D>) -> Vec<&DomainEntry<D>> {
        if base.is_empty() {
            let mut all = Vec::new();
            self.root.collect(&mut all);
            return all;
        }
        self.touch(base)
    }
}
