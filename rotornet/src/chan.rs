//! Channel backend abstraction.
//!
//! The fabric is generic over the bounded channel implementation:
//! - `StdLink`: default, uses `std::sync::mpsc::sync_channel`
//! - `CrossbeamLink` (feature `crossbeam`): uses `crossbeam-channel`

/// Error returned by a backend's non-blocking send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrySendError<T> {
    /// The channel is at capacity.
    Full(T),
    /// The receiver has disconnected.
    Disconnected(T),
}

/// Error returned by a backend's non-blocking receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TryRecvError {
    /// The channel is empty.
    Empty,
    /// The sender has disconnected and the channel is drained.
    Disconnected,
}

/// Sending half of a bounded backend channel.
pub trait LinkSender<T: Send>: Send {
    fn try_send(&self, msg: T) -> Result<(), TrySendError<T>>;
}

/// Receiving half of a bounded backend channel.
pub trait LinkReceiver<T: Send>: Send {
    fn try_recv(&mut self) -> Result<T, TryRecvError>;
}

/// A bounded, ordered channel implementation usable as a fabric link.
pub trait LinkBackend {
    type Sender<T: Send>: LinkSender<T>;
    type Receiver<T: Send>: LinkReceiver<T>;

    /// Create a channel holding at most `capacity` in-flight messages.
    fn channel<T: Send>(capacity: usize) -> (Self::Sender<T>, Self::Receiver<T>);
}

/// Default backend over `std::sync::mpsc::sync_channel`.
pub struct StdLink;

pub struct StdSender<T>(std::sync::mpsc::SyncSender<T>);
pub struct StdReceiver<T>(std::sync::mpsc::Receiver<T>);

impl LinkBackend for StdLink {
    type Sender<T: Send> = StdSender<T>;
    type Receiver<T: Send> = StdReceiver<T>;

    fn channel<T: Send>(capacity: usize) -> (Self::Sender<T>, Self::Receiver<T>) {
        let (tx, rx) = std::sync::mpsc::sync_channel(capacity);
        (StdSender(tx), StdReceiver(rx))
    }
}

impl<T: Send> LinkSender<T> for StdSender<T> {
    fn try_send(&self, msg: T) -> Result<(), TrySendError<T>> {
        use std::sync::mpsc::TrySendError as E;
        self.0.try_send(msg).map_err(|e| match e {
            E::Full(v) => TrySendError::Full(v),
            E::Disconnected(v) => TrySendError::Disconnected(v),
        })
    }
}

impl<T: Send> LinkReceiver<T> for StdReceiver<T> {
    fn try_recv(&mut self) -> Result<T, TryRecvError> {
        use std::sync::mpsc::TryRecvError as E;
        self.0.try_recv().map_err(|e| match e {
            E::Empty => TryRecvError::Empty,
            E::Disconnected => TryRecvError::Disconnected,
        })
    }
}

/// Backend over `crossbeam-channel` bounded channels.
#[cfg(feature = "crossbeam")]
pub struct CrossbeamLink;

#[cfg(feature = "crossbeam")]
pub struct CrossbeamSender<T>(crossbeam_channel::Sender<T>);
#[cfg(feature = "crossbeam")]
pub struct CrossbeamReceiver<T>(crossbeam_channel::Receiver<T>);

#[cfg(feature = "crossbeam")]
impl LinkBackend for CrossbeamLink {
    type Sender<T: Send> = CrossbeamSender<T>;
    type Receiver<T: Send> = CrossbeamReceiver<T>;

    fn channel<T: Send>(capacity: usize) -> (Self::Sender<T>, Self::Receiver<T>) {
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        (CrossbeamSender(tx), CrossbeamReceiver(rx))
    }
}

#[cfg(feature = "crossbeam")]
impl<T: Send> LinkSender<T> for CrossbeamSender<T> {
    fn try_send(&self, msg: T) -> Result<(), TrySendError<T>> {
        use crossbeam_channel::TrySendError as E;
        self.0.try_send(msg).map_err(|e| match e {
            E::Full(v) => TrySendError::Full(v),
            E::Disconnected(v) => TrySendError::Disconnected(v),
        })
    }
}

#[cfg(feature = "crossbeam")]
impl<T: Send> LinkReceiver<T> for CrossbeamReceiver<T> {
    fn try_recv(&mut self) -> Result<T, TryRecvError> {
        use crossbeam_channel::TryRecvError as E;
        self.0.try_recv().map_err(|e| match e {
            E::Empty => TryRecvError::Empty,
            E::Disconnected => TryRecvError::Disconnected,
        })
    }
}
