//! Thin façade over intra-process (threads) or inter-process (MPI) message passing.
//!
//! Messages are *contiguous byte slices*. Sends and receives return
//! waitable handles; callers must `wait()` every handle they post before
//! trusting or releasing a buffer. On top of point-to-point traffic a
//! communicator offers the two collectives the layout layer needs:
//! `barrier` and `allgather` of an equal-sized byte block per rank.

use std::collections::VecDeque;

use bytes::Bytes;
use dashmap::DashMap;
use once_cell::sync::Lazy;

/// Typed message tag. Wraps the raw `u16` every backend puts on the wire.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommTag(u16);

impl CommTag {
    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Tag `offset` slots after this one (wrapping).
    pub const fn offset(self, offset: u16) -> Self {
        Self(self.0.wrapping_add(offset))
    }
}

/// The two tags a two-phase exchange uses: one for the element count,
/// one for the payload.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ExchangeTags {
    pub sizes: CommTag,
    pub data: CommTag,
}

impl ExchangeTags {
    pub const fn from_base(base: CommTag) -> Self {
        Self {
            sizes: base,
            data: base.offset(1),
        }
    }
}

/// Tag used when broadcasting vnode lists during layout construction.
pub const REPARTITION_BCAST_TAG: CommTag = CommTag::new(0x5A00);
/// Tag used by the rank-ordered prefix sum.
pub const SCAN_TAG: CommTag = CommTag::new(0x5B00);

/// Non-blocking communication interface.
pub trait Communicator: Send + Sync + 'static {
    /// Handle returned by `isend`.
    type SendHandle: Wait;
    /// Handle returned by `irecv`.
    type RecvHandle: Wait;

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Self::SendHandle;
    /// Post a receive of at most `buf.len()` bytes from `peer`.
    fn irecv(&self, peer: usize, tag: u16, buf: &mut [u8]) -> Self::RecvHandle;

    /// Rank of the calling process.
    fn rank(&self) -> usize;
    /// Number of participating processes.
    fn size(&self) -> usize;

    /// Block until every rank has reached the barrier.
    fn barrier(&self);

    /// Gather `send` from every rank into `recv`, ordered by rank.
    /// `recv.len()` must be `size() * send.len()`.
    fn allgather(&self, send: &[u8], recv: &mut [u8]);

    /// True for the serial no-op backend.
    fn is_no_comm(&self) -> bool {
        false
    }
}

/// Anything that can be waited on.
pub trait Wait {
    /// Wait for completion and return the received data (if any).
    fn wait(self) -> Option<Vec<u8>>;
}

impl Wait for () {
    fn wait(self) -> Option<Vec<u8>> {
        None
    }
}

/// Compile-time no-op comm for pure serial use: one rank, no peers.
#[derive(Clone, Debug, Default)]
pub struct NoComm;

impl Communicator for NoComm {
    type SendHandle = ();
    type RecvHandle = ();

    fn isend(&self, _peer: usize, _tag: u16, _buf: &[u8]) {}
    fn irecv(&self, _peer: usize, _tag: u16, _buf: &mut [u8]) {}

    fn rank(&self) -> usize {
        0
    }
    fn size(&self) -> usize {
        1
    }
    fn barrier(&self) {}

    fn allgather(&self, send: &[u8], recv: &mut [u8]) {
        let n = send.len().min(recv.len());
        recv[..n].copy_from_slice(&send[..n]);
    }

    fn is_no_comm(&self) -> bool {
        true
    }
}

// --- RayonComm: several ranks as threads of one process ---
type Key = (usize, usize, u16); // (src, dst, tag)

static MAILBOX: Lazy<DashMap<Key, VecDeque<Bytes>>> = Lazy::new(DashMap::new);

const BARRIER_TAG: u16 = 0xFFF0;
const ALLGATHER_TAG: u16 = 0xFFF1;

fn post(key: Key, data: Bytes) {
    MAILBOX.entry(key).or_default().push_back(data);
}

fn take(key: &Key) -> Option<Bytes> {
    let mut slot = MAILBOX.get_mut(key)?;
    slot.pop_front()
}

/// Receive handle of [`RayonComm`]: spins on the mailbox until the message
/// for its `(src, dst, tag)` key shows up.
pub struct LocalHandle {
    key: Key,
    max_len: usize,
}

impl Wait for LocalHandle {
    fn wait(self) -> Option<Vec<u8>> {
        loop {
            if let Some(bytes) = take(&self.key) {
                let n = bytes.len().min(self.max_len);
                return Some(bytes[..n].to_vec());
            }
            std::thread::yield_now();
        }
    }
}

/// In-process communicator: rank `r` of `size` threads sharing a global
/// mailbox. Messages with the same `(src, dst, tag)` are delivered in order.
#[derive(Clone, Debug)]
pub struct RayonComm {
    rank: usize,
    size: usize,
}

impl RayonComm {
    pub fn new(rank: usize, size: usize) -> Self {
        Self { rank, size }
    }

    /// One communicator per rank of a `size`-rank world.
    pub fn world(size: usize) -> Vec<RayonComm> {
        (0..size).map(|r| RayonComm::new(r, size)).collect()
    }
}

impl Communicator for RayonComm {
    type SendHandle = ();
    type RecvHandle = LocalHandle;

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) {
        post((self.rank, peer, tag), Bytes::copy_from_slice(buf));
    }

    fn irecv(&self, peer: usize, tag: u16, buf: &mut [u8]) -> LocalHandle {
        LocalHandle {
            key: (peer, self.rank, tag),
            max_len: buf.len(),
        }
    }

    fn rank(&self) -> usize {
        self.rank
    }
    fn size(&self) -> usize {
        self.size
    }

    fn barrier(&self) {
        for peer in (0..self.size).filter(|&p| p != self.rank) {
            self.isend(peer, BARRIER_TAG, &[]);
        }
        for peer in (0..self.size).filter(|&p| p != self.rank) {
            let _ = self.irecv(peer, BARRIER_TAG, &mut []).wait();
        }
    }

    fn allgather(&self, send: &[u8], recv: &mut [u8]) {
        let block = send.len();
        for peer in (0..self.size).filter(|&p| p != self.rank) {
            self.isend(peer, ALLGATHER_TAG, send);
        }
        recv[self.rank * block..(self.rank + 1) * block].copy_from_slice(send);
        for peer in (0..self.size).filter(|&p| p != self.rank) {
            let mut scratch = vec![0u8; block];
            if let Some(data) = self.irecv(peer, ALLGATHER_TAG, &mut scratch).wait() {
                let n = data.len().min(block);
                recv[peer * block..peer * block + n].copy_from_slice(&data[..n]);
            }
        }
    }
}

// --- MPI backend (feature = "mpi-support") ---
#[cfg(feature = "mpi-support")]
mod mpi_backend {
    use std::sync::Arc;

    use super::{Communicator, Wait};
    use mpi::request::{Request, StaticScope};
    use mpi::topology::SimpleCommunicator;
    use mpi::traits::*;

    pub struct MpiComm {
        pub world: Arc<SimpleCommunicator>,
        pub rank: usize,
        _universe: mpi::environment::Universe,
    }

    impl MpiComm {
        /// Initialize MPI. Returns `None` if MPI was already initialized.
        pub fn new() -> Option<Self> {
            let universe = mpi::initialize()?;
            let world = Arc::new(universe.world());
            let rank = world.rank() as usize;
            Some(Self {
                world,
                rank,
                _universe: universe,
            })
        }
    }

    // SAFETY: the world communicator is only used from the owning thread in
    // SPMD fashion; the trait bound is needed for generic signatures.
    unsafe impl Send for MpiComm {}
    unsafe impl Sync for MpiComm {}

    /// Send handle owning the leaked send buffer until completion.
    pub struct MpiSendHandle {
        req: Request<'static, [u8], StaticScope>,
        buf: *mut [u8],
    }

    impl Wait for MpiSendHandle {
        fn wait(self) -> Option<Vec<u8>> {
            self.req.wait();
            // SAFETY: `buf` came from `Box::leak` in `isend` and the request
            // that borrowed it has completed.
            unsafe { drop(Box::from_raw(self.buf)) };
            None
        }
    }

    /// Receive handle: the blocking receive happens in `wait`, on the
    /// communicator the handle was posted on.
    pub struct MpiRecvHandle {
        pub(super) world: Arc<SimpleCommunicator>,
        peer: i32,
        tag: i32,
        max_len: usize,
    }

    impl Wait for MpiRecvHandle {
        fn wait(self) -> Option<Vec<u8>> {
            let (mut data, _status) = self
                .world
                .process_at_rank(self.peer)
                .receive_vec_with_tag::<u8>(self.tag);
            data.truncate(self.max_len);
            Some(data)
        }
    }

    impl Communicator for MpiComm {
        type SendHandle = MpiSendHandle;
        type RecvHandle = MpiRecvHandle;

        fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> MpiSendHandle {
            let owned: &'static mut [u8] = Box::leak(buf.to_vec().into_boxed_slice());
            let ptr: *mut [u8] = owned;
            // SAFETY: `ptr` stays valid until the handle frees it after `wait`.
            let shared: &'static [u8] = unsafe { &*ptr };
            let req = self
                .world
                .process_at_rank(peer as i32)
                .immediate_send_with_tag(StaticScope, shared, tag as i32);
            MpiSendHandle { req, buf: ptr }
        }

        fn irecv(&self, peer: usize, tag: u16, buf: &mut [u8]) -> MpiRecvHandle {
            MpiRecvHandle {
                world: Arc::clone(&self.world),
                peer: peer as i32,
                tag: tag as i32,
                max_len: buf.len(),
            }
        }

        fn rank(&self) -> usize {
            self.rank
        }
        fn size(&self) -> usize {
            self.world.size() as usize
        }

        fn barrier(&self) {
            self.world.barrier();
        }

        fn allgather(&self, send: &[u8], recv: &mut [u8]) {
            self.world.all_gather_into(send, recv);
        }
    }
}

#[cfg(feature = "mpi-support")]
pub use mpi_backend::MpiComm;


#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn no_comm_is_single_rank() {
        let comm = NoComm;
        assert!(comm.is_no_comm());
        assert_eq!((comm.rank(), comm.size()), (0, 1));
        let mut out = [0u8; 4];
        comm.allgather(&[1, 2, 3, 4], &mut out);
        assert_eq!(out, [1, 2, 3, 4]);
        assert!(comm.irecv(0, 1, &mut out).wait().is_none());
    }

    #[test]
    #[serial]
    fn rayon_roundtrip_preserves_order_per_tag() {
        let comms = RayonComm::world(2);
        comms[0].isend(1, 7, &[1, 2]);
        comms[0].isend(1, 7, &[3, 4]);
        let mut buf = [0u8; 2];
        let first = comms[1].irecv(0, 7, &mut buf).wait().expect("first message");
        let second = comms[1].irecv(0, 7, &mut buf).wait().expect("second message");
        assert_eq!(first, vec![1, 2]);
        assert_eq!(second, vec![3, 4]);
    }

    #[test]
    #[serial]
    fn rayon_allgather_orders_by_rank() {
        let comms = RayonComm::world(3);
        let results: Vec<Vec<u8>> = std::thread::scope(|s| {
            let handles: Vec<_> = comms
                .iter()
                .map(|c| {
                    s.spawn(move || {
                        let mut recv = vec![0u8; 3];
                        c.allgather(&[c.rank() as u8 * 10], &mut recv);
                        c.barrier();
                        recv
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        for r in results {
            assert_eq!(r, vec![0, 10, 20]);
        }
    }
}
