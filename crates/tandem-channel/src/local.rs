//! In-process transport for ranks emulated as threads.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use indexmap::IndexMap;
use tandem_core::{ChannelError, StepIndex};

use crate::transport::{Frame, Transport};

type Endpoint = (Sender<Frame>, Receiver<Frame>);

/// Unbounded crossbeam channels keyed by name, created by whichever end
/// touches a name first.
///
/// One `LocalTransport` connects one compute rank to its postprocess
/// peer; share it between the two threads through an `Arc`.
#[derive(Debug, Default)]
pub struct LocalTransport {
    channels: Mutex<IndexMap<String, Endpoint>>,
    recv_timeout: Option<Duration>,
    closed: AtomicBool,
}

impl LocalTransport {
    /// A transport whose receives block until a frame arrives.
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport whose receives give up after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            recv_timeout: Some(timeout),
            ..Self::default()
        }
    }

    /// Channel names seen so far, in creation order.
    pub fn channel_names(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    /// Number of frames waiting on `channel`.
    pub fn pending(&self, channel: &str) -> usize {
        self.lock().get(channel).map_or(0, |(_, rx)| rx.len())
    }

    /// Drop every channel. Blocked receivers wake with
    /// [`ChannelError::Disconnected`] once queued frames are drained, and
    /// later sends fail.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        let dropped = std::mem::take(&mut *self.lock());
        tracing::debug!(channels = dropped.len(), "local transport closed");
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, IndexMap<String, Endpoint>> {
        // A panic while holding the lock cannot leave the map half-updated.
        self.channels
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn with_endpoint<R>(
        &self,
        channel: &str,
        f: impl FnOnce(&Endpoint) -> R,
    ) -> Result<R, ChannelError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ChannelError::Disconnected {
                channel: channel.to_string(),
            });
        }
        let mut map = self.lock();
        let endpoint = map
            .entry(channel.to_string())
            .or_insert_with(crossbeam_channel::unbounded);
        Ok(f(endpoint))
    }
}

impl Transport for LocalTransport {
    fn send(&self, channel: &str, step: StepIndex, payload: Vec<u8>) -> Result<(), ChannelError> {
        let tx = self.with_endpoint(channel, |(tx, _)| tx.clone())?;
        let bytes = payload.len();
        tx.send(Frame { step, payload })
            .map_err(|_| ChannelError::Disconnected {
                channel: channel.to_string(),
            })?;
        tracing::trace!(channel, step = step.0, bytes, "frame sent");
        Ok(())
    }

    fn receive(&self, channel: &str) -> Result<Frame, ChannelError> {
        let rx = self.with_endpoint(channel, |(_, rx)| rx.clone())?;
        let frame = match self.recv_timeout {
            Some(timeout) => rx.recv_timeout(timeout).map_err(|e| match e {
                RecvTimeoutError::Timeout => ChannelError::Timeout {
                    channel: channel.to_string(),
                },
                RecvTimeoutError::Disconnected => ChannelError::Disconnected {
                    channel: channel.to_string(),
                },
            })?,
            None => rx.recv().map_err(|_| ChannelError::Disconnected {
                channel: channel.to_string(),
            })?,
        };
        tracing::trace!(
            channel,
            step = frame.step.0,
            bytes = frame.payload.len(),
            "frame received"
        );
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn frames_arrive_in_send_order() {
        let t = LocalTransport::new();
        for s in 0..3u64 {
            t.send("stats", StepIndex(s), vec![s as u8]).unwrap();
        }
        assert_eq!(t.pending("stats"), 3);
        for s in 0..3u64 {
            let f = t.receive("stats").unwrap();
            assert_eq!(f.step, StepIndex(s));
            assert_eq!(f.payload, vec![s as u8]);
        }
    }

    #[test]
    fn channels_are_independent() {
        let t = LocalTransport::new();
        t.send("a", StepIndex(0), vec![1]).unwrap();
        t.send("b", StepIndex(0), vec![2]).unwrap();
        assert_eq!(t.receive("b").unwrap().payload, vec![2]);
        assert_eq!(t.receive("a").unwrap().payload, vec![1]);
        assert_eq!(t.channel_names(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn receiver_may_arrive_first() {
        let t = Arc::new(LocalTransport::new());
        let rx_side = Arc::clone(&t);
        let handle = thread::spawn(move || rx_side.receive("mesh"));
        t.send("mesh", StepIndex(4), vec![9, 9]).unwrap();
        let frame = handle.join().unwrap().unwrap();
        assert_eq!(frame.step, StepIndex(4));
    }

    #[test]
    fn timeout_reported_as_channel_error() {
        let t = LocalTransport::with_timeout(Duration::from_millis(10));
        assert_eq!(
            t.receive("quiet"),
            Err(ChannelError::Timeout {
                channel: "quiet".into()
            })
        );
    }

    #[test]
    fn close_disconnects_both_ends() {
        let t = LocalTransport::new();
        t.close();
        assert!(matches!(
            t.send("x", StepIndex(0), vec![]),
            Err(ChannelError::Disconnected { .. })
        ));
        assert!(matches!(
            t.receive("x"),
            Err(ChannelError::Disconnected { .. })
        ));
    }

    #[test]
    fn close_wakes_blocked_receiver() {
        let t = Arc::new(LocalTransport::new());
        let rx_side = Arc::clone(&t);
        let handle = thread::spawn(move || rx_side.receive("late"));
        thread::sleep(Duration::from_millis(20));
        t.close();
        assert!(matches!(
            handle.join().unwrap(),
            Err(ChannelError::Disconnected { .. })
        ));
    }
}
