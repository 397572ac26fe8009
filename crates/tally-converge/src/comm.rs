//! Rank collectives used for distributed convergence agreement.
//!
//! Every rank runs its own convergence test. The global decision is the
//! logical AND of the local ones: a sum-reduce to rank 0, a comparison
//! against the rank count, and a broadcast of the result. This is the only
//! synchronization point in the engine and it has no timeout.

use crossbeam_channel::{Receiver, Sender};
use tally_core::CommError;

/// Minimal collective interface over a fixed group of ranks.
///
/// Rank 0 is the root. Every rank must call the same collectives in the
/// same order.
pub trait Communicator {
    /// This process's rank in `0..size()`.
    fn rank(&self) -> usize;

    /// Number of ranks in the group.
    fn size(&self) -> usize;

    /// Sum `value` over all ranks. The result is only meaningful on the
    /// root; other ranks get their own value back.
    fn reduce_sum_to_root(&self, value: u64) -> Result<u64, CommError>;

    /// Distribute the root's `value` to every rank. Non-root arguments are
    /// ignored.
    fn broadcast_from_root(&self, value: bool) -> Result<bool, CommError>;

    /// Whether this rank is the root.
    fn is_root(&self) -> bool {
        self.rank() == 0
    }
}

/// `true` on every rank iff `local` is `true` on every rank.
pub fn agree_all(comm: &dyn Communicator, local: bool) -> Result<bool, CommError> {
    let votes = comm.reduce_sum_to_root(u64::from(local))?;
    let unanimous = comm.is_root() && votes == comm.size() as u64;
    comm.broadcast_from_root(unanimous)
}

/// A group of one.
#[derive(Clone, Copy, Debug, Default)]
pub struct SingleProcess;

impl Communicator for SingleProcess {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn reduce_sum_to_root(&self, value: u64) -> Result<u64, CommError> {
        Ok(value)
    }

    fn broadcast_from_root(&self, value: bool) -> Result<bool, CommError> {
        Ok(value)
    }
}

#[derive(Debug)]
enum Links {
    Root {
        from_peers: Vec<Receiver<u64>>,
        to_peers: Vec<Sender<bool>>,
    },
    Peer {
        to_root: Sender<u64>,
        from_root: Receiver<bool>,
    },
}

/// In-process communicator: each rank lives on its own thread and the
/// collectives run over crossbeam channels.
///
/// Every non-root rank has a dedicated channel to the root in each
/// direction, so back-to-back collectives cannot interleave.
///
/// ```
/// use tally_converge::{agree_all, ChannelComm};
///
/// let handles: Vec<_> = ChannelComm::group(3)
///     .into_iter()
///     .map(|comm| std::thread::spawn(move || agree_all(&comm, true).unwrap()))
///     .collect();
/// for h in handles {
///     assert!(h.join().unwrap());
/// }
/// ```
#[derive(Debug)]
pub struct ChannelComm {
    rank: usize,
    size: usize,
    links: Links,
}

impl ChannelComm {
    /// Create `n` connected communicators, index `i` holding rank `i`.
    ///
    /// `n == 0` yields an empty group.
    pub fn group(n: usize) -> Vec<ChannelComm> {
        if n == 0 {
            return Vec::new();
        }
        let mut from_peers = Vec::with_capacity(n - 1);
        let mut to_peers = Vec::with_capacity(n - 1);
        let mut peers = Vec::with_capacity(n - 1);
        for rank in 1..n {
            let (up_tx, up_rx) = crossbeam_channel::unbounded();
            let (down_tx, down_rx) = crossbeam_channel::unbounded();
            from_peers.push(up_rx);
            to_peers.push(down_tx);
            peers.push(ChannelComm {
                rank,
                size: n,
                links: Links::Peer {
                    to_root: up_tx,
                    from_root: down_rx,
                },
            });
        }
        let mut group = Vec::with_capacity(n);
        group.push(ChannelComm {
            rank: 0,
            size: n,
            links: Links::Root {
                from_peers,
                to_peers,
            },
        });
        group.extend(peers);
        group
    }
}

impl Communicator for ChannelComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn reduce_sum_to_root(&self, value: u64) -> Result<u64, CommError> {
        match &self.links {
            Links::Root { from_peers, .. } => {
                let mut sum = value;
                for (i, rx) in from_peers.iter().enumerate() {
                    sum += rx.recv().map_err(|_| CommError::Disconnected { peer: i + 1 })?;
                }
                Ok(sum)
            }
            Links::Peer { to_root, .. } => {
                to_root
                    .send(value)
                    .map_err(|_| CommError::Disconnected { peer: 0 })?;
                Ok(value)
            }
        }
    }

    fn broadcast_from_root(&self, value: bool) -> Result<bool, CommError> {
        match &self.links {
            Links::Root { to_peers, .. } => {
                for (i, tx) in to_peers.iter().enumerate() {
                    tx.send(value)
                        .map_err(|_| CommError::Disconnected { peer: i + 1 })?;
                }
                Ok(value)
            }
            Links::Peer { from_root, .. } => from_root
                .recv()
                .map_err(|_| CommError::Disconnected { peer: 0 }),
        }
    }
}
