mod util;
use util::*;

use bytemuck::{Pod, Zeroable, cast_slice};
use opal_domain::algs::communicator::{
    CommTag, Communicator, ExchangeTags, NoComm, REPARTITION_BCAST_TAG, Wait,
};
use opal_domain::algs::{broadcast_others, exclusive_scan_sum, gather_from_others};
use opal_domain::layout::Vnode;
use opal_domain::layout::vnode::{decode_vnodes, encode_vnodes};
use opal_domain::index::IndexRange;
use serial_test::serial;

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable, Debug, PartialEq, Eq)]
struct WireU64 {
    x: u64,
}

#[test]
fn no_comm_is_nop() {
    let comm = NoComm;
    assert!(comm.is_no_comm());
    let mut buf = [0u8; 8];
    let h = comm.irecv(0, 123, &mut buf);
    assert!(h.wait().is_none());
    let s = comm.isend(0, 123, &[]);
    assert!(s.wait().is_none());
    assert_eq!(exclusive_scan_sum(&comm, 9).offset, 0);
}

#[test]
#[serial]
fn rayon_comm_roundtrip_and_tag_isolation() {
    let (c0, c1) = rayons();

    const TAG_A: u16 = 0xA100;
    const TAG_B: u16 = 0xB200;

    let mut buf_a = [0u8; core::mem::size_of::<WireU64>()];
    let mut buf_b = [0u8; core::mem::size_of::<WireU64>()];
    let rxa = c1.irecv(0, TAG_A, &mut buf_a);
    let rxb = c1.irecv(0, TAG_B, &mut buf_b);

    let wa = [WireU64 {
        x: 0xDEAD_BEEF_F00D_F00D,
    }];
    let wb = [WireU64 {
        x: 0x0123_4567_89AB_CDEF,
    }];
    c0.isend(1, TAG_B, cast_slice(&wb));
    c0.isend(1, TAG_A, cast_slice(&wa));

    let ra = rxa.wait().expect("rxa");
    let rb = rxb.wait().expect("rxb");
    assert_eq!(&ra[..], cast_slice(&wa));
    assert_eq!(&rb[..], cast_slice(&wb));
}

#[test]
#[serial]
fn vnode_lists_cross_ranks() {
    let comms = rayon_world(4);
    let tags = ExchangeTags::from_base(REPARTITION_BCAST_TAG.offset(0x40));
    let got = run_ranks(&comms, |c| {
        let r = c.rank();
        let mine: Vec<_> = (0..r)
            .map(|i| Vnode::new(IndexRange::from_lengths([i + 1, 2]), r, (10 * r + i) as i64))
            .collect();
        let payload = encode_vnodes(mine.iter());
        let pending = broadcast_others(c, tags, &payload);
        let mut ids = Vec::new();
        for (peer, bytes) in gather_from_others(c, pending).unwrap() {
            for v in decode_vnodes::<2>(&bytes).unwrap() {
                assert_eq!(v.node(), peer);
                ids.push(v.vnode());
            }
        }
        ids
    });
    assert_permutation(&got[0], &[10, 20, 21, 30, 31, 32]);
    assert_permutation(&got[3], &[10, 20, 21]);
}

#[test]
#[serial]
fn barrier_releases_every_rank() {
    let comms = rayon_world(3);
    let tag = CommTag::new(0x7700);
    let got = run_ranks(&comms, |c| {
        c.barrier();
        let next = (c.rank() + 1) % c.size();
        let prev = (c.rank() + c.size() - 1) % c.size();
        c.isend(next, tag.as_u16(), &[c.rank() as u8]);
        let mut buf = [0u8; 1];
        c.irecv(prev, tag.as_u16(), &mut buf).wait().unwrap()[0]
    });
    assert_eq!(got, vec![2, 0, 1]);
}

#[cfg(feature = "mpi-support")]
#[test]
fn mpi_comm_smoke_if_available() {
    use opal_domain::algs::communicator::MpiComm;
    let world = MpiComm::new().expect("MPI initialization failed");
    let me = world.rank();
    let n = world.size();
    const TAG: u16 = 0xCAFE;
    let to = (me + 1) % n;
    let from = (me + n - 1) % n;
    let tx = [42u8, me as u8, 0, 0];
    let mut rx = [0u8; 4];
    let r = world.irecv(from, TAG, &mut rx);
    let s = world.isend(to, TAG, &tx);
    let got = r.wait().expect("mpi rx");
    assert_eq!(got, tx);
    let _ = s.wait();

    let scan = exclusive_scan_sum(&world, 1);
    assert_eq!(scan.offset, me as i64);
    assert_eq!(scan.total, n as i64);
}
