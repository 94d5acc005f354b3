//! Vnodes: one rectangular block of the index space and the rank that owns it.
//!
//! A vnode is immutable once built and shared by reference count between
//! the local table, every guard-cell remote table and any user that keeps
//! a handle ([`VnodeRef`]). It is dropped with the last table entry.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering::Relaxed};

use crate::algs::wire::{
    WIRE_VERSION, WireAxisRange, WireCount, WireHdr, WireVnode, records_from_bytes,
};
use crate::domain_error::DomainError;
use crate::index::{AxisRange, IndexRange};

/// Global vnode ID used when none was assigned.
pub const NO_VNODE_ID: i64 = -1;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Vnode<const D: usize> {
    domain: IndexRange<D>,
    node: usize,
    vnode: i64,
}

/// Shared handle to a vnode.
pub type VnodeRef<const D: usize> = Arc<Vnode<D>>;

impl<const D: usize> Vnode<D> {
    pub fn new(domain: IndexRange<D>, node: usize, vnode: i64) -> Self {
        Self {
            domain,
            node,
            vnode,
        }
    }

    /// Vnode without a global ID.
    pub fn unnumbered(domain: IndexRange<D>, node: usize) -> Self {
        Self::new(domain, node, NO_VNODE_ID)
    }

    #[inline]
    pub fn domain(&self) -> &IndexRange<D> {
        &self.domain
    }

    /// Owning rank.
    #[inline]
    pub fn node(&self) -> usize {
        self.node
    }

    /// Global vnode ID, or [`NO_VNODE_ID`].
    #[inline]
    pub fn vnode(&self) -> i64 {
        self.vnode
    }

    /// Same domain and ID, different owner.
    pub fn with_node(&self, node: usize) -> Self {
        Self::new(self.domain, node, self.vnode)
    }

    /// Domains of at most one point are never subdivided by a domain map.
    pub fn is_degenerate(&self) -> bool {
        self.domain.size() <= 1
    }
}

impl<const D: usize> fmt::Display for Vnode<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Node = {} ; vnode_m = {} ; Domain = {}",
            self.node, self.vnode, self.domain
        )
    }
}

static NEXT_LOCAL_KEY: AtomicU64 = AtomicU64::new(1);

/// Process-unique key for a local vnode table entry.
pub fn next_local_key() -> u64 {
    NEXT_LOCAL_KEY.fetch_add(1, Relaxed)
}

/// Encode a vnode list as `[hdr][count]([vnode][axis; D])*`.
pub fn encode_vnodes<'a, const D: usize>(
    vnodes: impl ExactSizeIterator<Item = &'a Vnode<D>>,
) -> Vec<u8> {
    let n = vnodes.len();
    let record = std::mem::size_of::<WireVnode>() + D * std::mem::size_of::<WireAxisRange>();
    let mut out = Vec::with_capacity(
        std::mem::size_of::<WireHdr>() + std::mem::size_of::<WireCount>() + n * record,
    );
    out.extend_from_slice(bytemuck::bytes_of(&WireHdr::new(WireHdr::KIND_VNODES, D)));
    out.extend_from_slice(bytemuck::bytes_of(&WireCount::new(n)));
    for v in vnodes {
        out.extend_from_slice(bytemuck::bytes_of(&WireVnode::new(v.node, v.vnode)));
        for a in v.domain.axes() {
            out.extend_from_slice(bytemuck::bytes_of(&WireAxisRange::new(a.first(), a.last())));
        }
    }
    out
}

/// Decode a buffer produced by [`encode_vnodes`].
pub fn decode_vnodes<const D: usize>(raw: &[u8]) -> Result<Vec<Vnode<D>>, DomainError> {
    let hdr_len = std::mem::size_of::<WireHdr>();
    let cnt_len = std::mem::size_of::<WireCount>();
    if raw.len() < hdr_len + cnt_len {
        return Err(DomainError::WireDecode(format!(
            "vnode message of {} bytes is shorter than its header",
            raw.len()
        )));
    }
    let hdr = records_from_bytes::<WireHdr>(&raw[..hdr_len])?[0];
    if hdr.version() != WIRE_VERSION {
        return Err(DomainError::WireDecode(format!(
            "wire version {} does not match {WIRE_VERSION}",
            hdr.version()
        )));
    }
    if hdr.kind() != WireHdr::KIND_VNODES || hdr.dim() != D {
        return Err(DomainError::WireDecode(format!(
            "expected a {D}-dimensional vnode list, got kind {} dim {}",
            hdr.kind(),
            hdr.dim()
        )));
    }
    let count = records_from_bytes::<WireCount>(&raw[hdr_len..hdr_len + cnt_len])?[0];
    let n = count.get();

    let vn_len = std::mem::size_of::<WireVnode>();
    let ax_len = std::mem::size_of::<WireAxisRange>();
    let record = vn_len + D * ax_len;
    let body = &raw[hdr_len + cnt_len..];
    if body.len() != n * record {
        return Err(DomainError::WireDecode(format!(
            "expected {} bytes for {n} vnodes, got {}",
            n * record,
            body.len()
        )));
    }

    let mut out = Vec::with_capacity(n);
    for chunk in body.chunks_exact(record) {
        let head = records_from_bytes::<WireVnode>(&chunk[..vn_len])?[0];
        let axes: Vec<WireAxisRange> = records_from_bytes(&chunk[vn_len..])?;
        let mut ranges = [AxisRange::empty_at(0); D];
        for (r, w) in ranges.iter_mut().zip(&axes) {
            *r = AxisRange::new(w.first(), w.last());
        }
        out.push(Vnode::new(IndexRange::new(ranges), head.owner(), head.id()));
    }
    Ok(out)
}
