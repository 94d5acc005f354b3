//! Fixed, versioned, little-endian wire types for layout messages.
//!
//! All multi-byte integers in these structs are **little-endian** on the
//! wire. They are stored pre-LE with `.to_le()` and decoded with
//! `.from_le()`, so a message can be cast straight to bytes with
//! `bytemuck`.

use bytemuck::{Pod, Zeroable};
use static_assertions::{assert_eq_align, assert_eq_size};

use crate::domain_error::DomainError;

/// Bump when the layout or semantics change in incompatible ways.
pub const WIRE_VERSION: u16 = 1;

pub fn cast_slice<T: Pod>(v: &[T]) -> &[u8] {
    bytemuck::cast_slice(v)
}

pub fn cast_slice_mut<T: Pod>(v: &mut [T]) -> &mut [u8] {
    bytemuck::cast_slice_mut(v)
}

/// Decode a byte buffer into owned records. Rejects lengths that are not
/// a whole number of records.
pub fn records_from_bytes<T: Pod>(raw: &[u8]) -> Result<Vec<T>, DomainError> {
    let size = std::mem::size_of::<T>();
    if size == 0 || raw.len() % size != 0 {
        return Err(DomainError::WireDecode(format!(
            "{} bytes is not a multiple of the {size}-byte record size",
            raw.len()
        )));
    }
    let mut out = vec![T::zeroed(); raw.len() / size];
    cast_slice_mut(&mut out).copy_from_slice(raw);
    Ok(out)
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct WireHdr {
    pub version_le: u16,
    pub kind_le: u16,
    pub dim_le: u32,
}

impl WireHdr {
    pub const KIND_VNODES: u16 = 1;

    pub fn new(kind: u16, dim: usize) -> Self {
        Self {
            version_le: WIRE_VERSION.to_le(),
            kind_le: kind.to_le(),
            dim_le: (dim as u32).to_le(),
        }
    }
    pub fn version(&self) -> u16 {
        u16::from_le(self.version_le)
    }
    pub fn kind(&self) -> u16 {
        u16::from_le(self.kind_le)
    }
    pub fn dim(&self) -> usize {
        u32::from_le(self.dim_le) as usize
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct WireCount {
    pub n_le: u32, // count of following records
}

impl WireCount {
    pub fn new(n: usize) -> Self {
        Self {
            n_le: (n as u32).to_le(),
        }
    }
    pub fn get(&self) -> usize {
        u32::from_le(self.n_le) as usize
    }
}

/// One axis of an index range.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct WireAxisRange {
    pub first_le: i64,
    pub last_le: i64,
}

impl WireAxisRange {
    pub fn new(first: i64, last: i64) -> Self {
        Self {
            first_le: first.to_le(),
            last_le: last.to_le(),
        }
    }
    pub fn first(&self) -> i64 {
        i64::from_le(self.first_le)
    }
    pub fn last(&self) -> i64 {
        i64::from_le(self.last_le)
    }
}

/// Vnode header, followed on the wire by `dim` [`WireAxisRange`] records.
/// NOTE: `owner_le` is u32 (never usize) on the wire.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct WireVnode {
    pub id_le: i64,
    pub owner_le: u32,
    pub _pad: u32,
}

impl WireVnode {
    pub fn new(owner: usize, id: i64) -> Self {
        Self {
            id_le: id.to_le(),
            owner_le: (owner as u32).to_le(),
            _pad: 0,
        }
    }
    pub fn owner(&self) -> usize {
        u32::from_le(self.owner_le) as usize
    }
    pub fn id(&self) -> i64 {
        i64::from_le(self.id_le)
    }
}

/// A single signed quantity, used by the prefix-sum collective.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct WireI64(pub i64);

impl WireI64 {
    pub fn new(v: i64) -> Self {
        Self(v.to_le())
    }
    pub fn get(&self) -> i64 {
        i64::from_le(self.0)
    }
}

assert_eq_size!(WireHdr, [u8; 8]);
assert_eq_size!(WireCount, [u8; 4]);
assert_eq_size!(WireAxisRange, [u8; 16]);
assert_eq_size!(WireVnode, [u8; 16]);
assert_eq_align!(WireVnode, u64);
assert_eq_size!(WireI64, [u8; 8]);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vnode_header_decodes_fields() {
        let v = [WireVnode::new(3, -1), WireVnode::new(0, 42)];
        let back: Vec<WireVnode> = records_from_bytes(cast_slice(&v)).unwrap();
        assert_eq!((back[0].owner(), back[0].id()), (3, -1));
        assert_eq!((back[1].owner(), back[1].id()), (0, 42));
    }

    #[test]
    fn ragged_buffer_is_rejected() {
        let err = records_from_bytes::<WireAxisRange>(&[0u8; 17]).unwrap_err();
        assert!(matches!(err, DomainError::WireDecode(_)));
    }

    #[test]
    fn version_guard() {
        let hdr = WireHdr::new(WireHdr::KIND_VNODES, 3);
        assert_eq!(hdr.version(), WIRE_VERSION);
        assert_eq!(hdr.dim(), 3);
    }
}
