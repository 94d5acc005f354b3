//! All-to-all broadcast of one variable-length message per rank.
//!
//! Every rank sends the same payload to every other rank and receives one
//! payload from each of them. The exchange runs in two phases on the tags
//! of an [`ExchangeTags`]: first the byte count, then the bytes. Arrival
//! order does not matter; results come back sorted by source rank. Every
//! posted handle is drained before returning, even if an error occurs.

use crate::algs::communicator::{Communicator, ExchangeTags, Wait};
use crate::algs::wire::{WireCount, cast_slice, cast_slice_mut};
use crate::domain_error::DomainError;

/// Sends posted by [`broadcast_others`] that are still in flight.
pub struct Broadcast<C: Communicator> {
    sends: Vec<C::SendHandle>,
    recipients: usize,
    tags: ExchangeTags,
    payload_len: usize,
}

impl<C: Communicator> Broadcast<C> {
    /// Number of ranks the payload was sent to.
    pub fn recipient_count(&self) -> usize {
        self.recipients
    }

    /// Length of the local payload that was broadcast.
    pub fn payload_len(&self) -> usize {
        self.payload_len
    }
}

/// Post `payload` to every rank except the caller.
pub fn broadcast_others<C: Communicator>(
    comm: &C,
    tags: ExchangeTags,
    payload: &[u8],
) -> Broadcast<C> {
    let me = comm.rank();
    let count = WireCount::new(payload.len());
    let mut sends = Vec::with_capacity(2 * comm.size());
    let mut recipients = 0;
    for peer in (0..comm.size()).filter(|&p| p != me) {
        sends.push(comm.isend(
            peer,
            tags.sizes.as_u16(),
            cast_slice(std::slice::from_ref(&count)),
        ));
        sends.push(comm.isend(peer, tags.data.as_u16(), payload));
        recipients += 1;
    }
    Broadcast {
        sends,
        recipients,
        tags,
        payload_len: payload.len(),
    }
}

/// Receive one broadcast payload from every other rank and complete the
/// local sends. Returns `(source rank, payload)` pairs sorted by rank.
pub fn gather_from_others<C: Communicator>(
    comm: &C,
    pending: Broadcast<C>,
) -> Result<Vec<(usize, Vec<u8>)>, DomainError> {
    let me = comm.rank();
    let tags = pending.tags;
    let mut received = Vec::with_capacity(pending.recipients);
    let mut maybe_err = None;

    for peer in (0..comm.size()).filter(|&p| p != me) {
        if maybe_err.is_some() {
            break;
        }
        match receive_one(comm, tags, peer) {
            Ok(bytes) => received.push((peer, bytes)),
            Err(e) => maybe_err = Some(e),
        }
    }

    // always drain all send handles before returning
    for send in pending.sends {
        let _ = send.wait();
    }

    match maybe_err {
        Some(err) => Err(err),
        None => Ok(received),
    }
}

fn receive_one<C: Communicator>(
    comm: &C,
    tags: ExchangeTags,
    peer: usize,
) -> Result<Vec<u8>, DomainError> {
    let mut cnt = WireCount::new(0);
    let h = comm.irecv(
        peer,
        tags.sizes.as_u16(),
        cast_slice_mut(std::slice::from_mut(&mut cnt)),
    );
    let raw = h.wait().ok_or_else(|| DomainError::CommError {
        neighbor: peer,
        source: format!("failed to receive size from rank {peer}").into(),
    })?;
    if raw.len() != std::mem::size_of::<WireCount>() {
        return Err(DomainError::BufferSizeMismatch {
            neighbor: peer,
            expected: std::mem::size_of::<WireCount>(),
            got: raw.len(),
        });
    }
    cast_slice_mut(std::slice::from_mut(&mut cnt)).copy_from_slice(&raw);

    let expected = cnt.get();
    let mut buffer = vec![0u8; expected];
    let h = comm.irecv(peer, tags.data.as_u16(), &mut buffer);
    let raw = h.wait().ok_or_else(|| DomainError::CommError {
        neighbor: peer,
        source: "No data received (wait returned None)".into(),
    })?;
    if raw.len() != expected {
        return Err(DomainError::BufferSizeMismatch {
            neighbor: peer,
            expected,
            got: raw.len(),
        });
    }
    Ok(raw)
}
