//! N-to-n fabric over dedicated per-pair channels.
//!
//! Each ordered node pair gets its own bounded channel, so delivery between
//! any two nodes is reliable and FIFO with zero cross-pair contention, at
//! the cost of O(N^2) channels.
//!
//! Send and receive are initiated without blocking and polled to completion
//! separately, mirroring an `isend`/`irecv`/`test` style interface: a send
//! that finds the channel full parks the message in its [`SendHandle`] and
//! completes on a later [`Port::test_send`]; a receive completes on the
//! [`Port::test_recv`] that finds a message waiting.

use crate::chan::{LinkBackend, LinkReceiver, LinkSender, StdLink, TryRecvError, TrySendError};
use crate::{RecvError, SendError, WaitPolicy};

/// Fabric construction parameters.
#[derive(Clone, Copy, Debug)]
pub struct FabricConfig {
    /// Per-pair channel capacity (in-flight messages).
    pub capacity: usize,
    /// Relaxation policy for the blocking send/recv variants.
    pub wait: WaitPolicy,
}

impl Default for FabricConfig {
    fn default() -> Self {
        Self {
            capacity: 64,
            wait: WaitPolicy::Spin,
        }
    }
}

/// Both halves of the dedicated channel pair to a single peer (internal).
struct Link<T: Send, B: LinkBackend> {
    tx: B::Sender<T>,
    rx: B::Receiver<T>,
}

/// An in-flight non-blocking send.
///
/// Holds the message while the target channel is full; completed once the
/// message has been handed to the channel.
#[derive(Debug)]
pub struct SendHandle<T> {
    to: usize,
    pending: Option<T>,
}

impl<T> SendHandle<T> {
    /// Target peer of this send.
    pub fn to(&self) -> usize {
        self.to
    }

    /// True once the message has been handed to the channel.
    pub fn is_complete(&self) -> bool {
        self.pending.is_none()
    }
}

/// An in-flight non-blocking receive, expecting a message from one peer.
#[derive(Debug)]
pub struct RecvHandle {
    from: usize,
    complete: bool,
}

impl RecvHandle {
    /// Peer this receive expects a message from.
    pub fn from(&self) -> usize {
        self.from
    }

    /// True once a message has been returned through this handle.
    pub fn is_complete(&self) -> bool {
        self.complete
    }
}

/// One node's endpoint in the fabric.
pub struct Port<T: Send, B: LinkBackend = StdLink> {
    id: usize,
    num_nodes: usize,
    wait: WaitPolicy,
    links: Vec<Option<Link<T, B>>>,
}

impl<T: Send, B: LinkBackend> Port<T, B> {
    /// Returns this node's ID.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Returns the total node count, including this node.
    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    /// Returns the number of peers (excluding self).
    pub fn num_peers(&self) -> usize {
        self.num_nodes - 1
    }

    fn link_mut(&mut self, peer: usize) -> Option<&mut Link<T, B>> {
        self.links.get_mut(peer).and_then(|l| l.as_mut())
    }

    /// Initiate a non-blocking send of `msg` to `to`.
    ///
    /// Never blocks: if the channel is full the message is parked in the
    /// returned handle and handed over by a later [`Port::test_send`].
    pub fn isend(&mut self, to: usize, msg: T) -> Result<SendHandle<T>, SendError<T>> {
        let link = match self.link_mut(to) {
            Some(l) => l,
            None => return Err(SendError::InvalidPeer(msg)),
        };
        match link.tx.try_send(msg) {
            Ok(()) => Ok(SendHandle { to, pending: None }),
            Err(TrySendError::Full(v)) => Ok(SendHandle {
                to,
                pending: Some(v),
            }),
            Err(TrySendError::Disconnected(v)) => Err(SendError::Disconnected(v)),
        }
    }

    /// Poll a send for completion. Returns `true` once the message has been
    /// handed to the channel.
    pub fn test_send(&mut self, handle: &mut SendHandle<T>) -> Result<bool, SendError<T>> {
        let msg = match handle.pending.take() {
            Some(m) => m,
            None => return Ok(true),
        };
        let link = match self.link_mut(handle.to) {
            Some(l) => l,
            None => return Err(SendError::InvalidPeer(msg)),
        };
        match link.tx.try_send(msg) {
            Ok(()) => Ok(true),
            Err(TrySendError::Full(v)) => {
                handle.pending = Some(v);
                Ok(false)
            }
            Err(TrySendError::Disconnected(v)) => Err(SendError::Disconnected(v)),
        }
    }

    /// Initiate a non-blocking receive expecting a message from `from`.
    pub fn irecv(&mut self, from: usize) -> Result<RecvHandle, RecvError> {
        if self.link_mut(from).is_none() {
            return Err(RecvError::InvalidPeer);
        }
        Ok(RecvHandle {
            from,
            complete: false,
        })
    }

    /// Poll a receive for completion. Returns the message once one has
    /// arrived from the handle's peer; `None` while still in flight.
    pub fn test_recv(&mut self, handle: &mut RecvHandle) -> Result<Option<T>, RecvError> {
        if handle.complete {
            return Ok(None);
        }
        let link = match self.link_mut(handle.from) {
            Some(l) => l,
            None => return Err(RecvError::InvalidPeer),
        };
        match link.rx.try_recv() {
            Ok(msg) => {
                handle.complete = true;
                Ok(Some(msg))
            }
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(RecvError::Disconnected),
        }
    }

    /// Send `msg` to `to`, busy-waiting while the channel is full.
    pub fn send(&mut self, to: usize, msg: T) -> Result<(), SendError<T>> {
        let mut handle = self.isend(to, msg)?;
        let wait = self.wait;
        while !self.test_send(&mut handle)? {
            wait.relax();
        }
        Ok(())
    }

    /// Take a waiting message from `from` without blocking.
    pub fn try_recv(&mut self, from: usize) -> Result<T, RecvError> {
        let link = match self.link_mut(from) {
            Some(l) => l,
            None => return Err(RecvError::InvalidPeer),
        };
        match link.rx.try_recv() {
            Ok(msg) => Ok(msg),
            Err(TryRecvError::Empty) => Err(RecvError::Empty),
            Err(TryRecvError::Disconnected) => Err(RecvError::Disconnected),
        }
    }

    /// Receive a message from `from`, busy-waiting until one arrives.
    pub fn recv(&mut self, from: usize) -> Result<T, RecvError> {
        loop {
            match self.try_recv(from) {
                Ok(msg) => return Ok(msg),
                Err(RecvError::Empty) => self.wait.relax(),
                Err(e) => return Err(e),
            }
        }
    }
}

/// Create a fabric of `n` ports using the default `StdLink` backend.
///
/// # Panics
/// Panics if `n` is 0 or `config.capacity` is 0.
pub fn create_fabric<T: Send>(n: usize, config: &FabricConfig) -> Vec<Port<T>> {
    create_fabric_with::<T, StdLink>(n, config)
}

/// Create a fabric of `n` ports using a custom channel backend.
///
/// # Panics
/// Panics if `n` is 0 or `config.capacity` is 0.
pub fn create_fabric_with<T: Send, B: LinkBackend>(
    n: usize,
    config: &FabricConfig,
) -> Vec<Port<T, B>> {
    assert!(n > 0, "must have at least one node");
    assert!(config.capacity > 0, "capacity must be greater than 0");

    // For nodes i and j (i < j), two channels: i -> j and j -> i.
    let mut slots: Vec<Vec<Option<Link<T, B>>>> =
        (0..n).map(|_| (0..n).map(|_| None).collect()).collect();

    for i in 0..n {
        for j in (i + 1)..n {
            let (tx_i_j, rx_i_j) = B::channel(config.capacity);
            let (tx_j_i, rx_j_i) = B::channel(config.capacity);

            slots[i][j] = Some(Link {
                tx: tx_i_j,
                rx: rx_j_i,
            });
            slots[j][i] = Some(Link {
                tx: tx_j_i,
                rx: rx_i_j,
            });
        }
    }

    slots
        .into_iter()
        .enumerate()
        .map(|(id, links)| Port {
            id,
            num_nodes: n,
            wait: config.wait,
            links,
        })
        .collect()
}
