//! The transport seam between paired ranks.

use tandem_core::{ChannelError, StepIndex};

/// One payload on a channel, stamped with the step it was produced on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    /// Step the producer sampled on.
    pub step: StepIndex,
    /// Encoded payload.
    pub payload: Vec<u8>,
}

/// Moves frames from producer halves to consumer halves.
///
/// Frames on one channel are delivered in the order they were sent.
/// Implementations must be shareable between the threads that emulate
/// ranks, hence `Send + Sync`.
pub trait Transport: Send + Sync {
    /// Queue `payload` on `channel`. Does not wait for the consumer.
    ///
    /// # Errors
    ///
    /// [`ChannelError::Disconnected`] if the transport has been closed.
    fn send(&self, channel: &str, step: StepIndex, payload: Vec<u8>) -> Result<(), ChannelError>;

    /// Block until the next frame on `channel` arrives.
    ///
    /// # Errors
    ///
    /// [`ChannelError::Disconnected`] if no producer can ever send again,
    /// [`ChannelError::Timeout`] if the transport has a receive timeout
    /// and it elapsed.
    fn receive(&self, channel: &str) -> Result<Frame, ChannelError>;
}

/// A transport with no peer.
///
/// Used by compute ranks in a run without postprocess ranks: sends are
/// discarded and receives report a disconnected channel.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullTransport;

impl Transport for NullTransport {
    fn send(&self, _channel: &str, _step: StepIndex, _payload: Vec<u8>) -> Result<(), ChannelError> {
        Ok(())
    }

    fn receive(&self, channel: &str) -> Result<Frame, ChannelError> {
        Err(ChannelError::Disconnected {
            channel: channel.to_string(),
        })
    }
}
