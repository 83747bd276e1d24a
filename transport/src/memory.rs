//! In-process transport over two lock-protected frame lanes.
//!
//! The reference medium: both endpoints live in one process, each
//! direction is a `Mutex<VecDeque>` of encoded frames with a `Condvar`
//! for blocking receives. Frames cross the codec on both sides, so a
//! malformed frame surfaces here exactly as it would on a real wire.

use crate::{EnvelopeSender, Transport, TransportError};
use envelope::{codec, Envelope};
use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

struct LaneState {
    frames: VecDeque<Vec<u8>>,
    open: bool,
}

struct Lane {
    state: Mutex<LaneState>,
    arrived: Condvar,
}

impl Lane {
    fn new() -> Self {
        Self {
            state: Mutex::new(LaneState {
                frames: VecDeque::new(),
                open: true,
            }),
            arrived: Condvar::new(),
        }
    }

    // A poisoned lane still holds a coherent queue; keep delivering.
    fn lock(&self) -> MutexGuard<'_, LaneState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn push(&self, frame: Vec<u8>) -> Result<(), TransportError> {
        let mut state = self.lock();
        if !state.open {
            return Err(TransportError::Disconnected);
        }
        state.frames.push_back(frame);
        self.arrived.notify_all();
        Ok(())
    }

    fn pop(&self, wait: Option<Duration>) -> Result<Option<Vec<u8>>, TransportError> {
        let deadline = wait.map(|d| Instant::now() + d);
        let mut state = self.lock();
        loop {
            if let Some(frame) = state.frames.pop_front() {
                return Ok(Some(frame));
            }
            if !state.open {
                return Err(TransportError::Disconnected);
            }
            let Some(deadline) = deadline else {
                return Ok(None);
            };
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            state = match self.arrived.wait_timeout(state, deadline - now) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
    }

    fn close(&self) {
        let mut state = self.lock();
        state.open = false;
        self.arrived.notify_all();
    }

    fn is_open(&self) -> bool {
        self.lock().open
    }
}

struct Shared {
    lanes: [Lane; 2],
}

impl Shared {
    fn close_both(&self) {
        self.lanes[0].close();
        self.lanes[1].close();
    }
}

/// One endpoint of an in-process duplex pair.
///
/// Dropping an endpoint disconnects the pair: the peer drains whatever
/// already arrived, then observes [`TransportError::Disconnected`].
pub struct MemoryTransport {
    shared: Arc<Shared>,
    inbound: usize,
}

impl MemoryTransport {
    /// Creates a connected pair of endpoints.
    pub fn pair() -> (MemoryTransport, MemoryTransport) {
        let shared = Arc::new(Shared {
            lanes: [Lane::new(), Lane::new()],
        });
        let first = MemoryTransport {
            shared: Arc::clone(&shared),
            inbound: 0,
        };
        let second = MemoryTransport { shared, inbound: 1 };
        (first, second)
    }

    /// Tears down the connection from this side.
    pub fn disconnect(&self) {
        self.shared.close_both();
    }

    /// Pushes raw bytes toward the peer, bypassing the codec.
    ///
    /// Wire-level escape hatch for fault injection: the peer's next
    /// `receive` decodes whatever is given here.
    pub fn send_raw_frame(&self, frame: Vec<u8>) -> Result<(), TransportError> {
        self.shared.lanes[1 - self.inbound].push(frame)
    }
}

impl Transport for MemoryTransport {
    type Sender = MemorySender;

    fn send(&mut self, envelope: Envelope) -> Result<(), TransportError> {
        let frame = codec::encode(&envelope).map_err(|err| TransportError::Encode(err.reason))?;
        self.shared.lanes[1 - self.inbound].push(frame)
    }

    fn receive(&mut self, wait: Option<Duration>) -> Result<Option<Envelope>, TransportError> {
        match self.shared.lanes[self.inbound].pop(wait)? {
            Some(frame) => Ok(Some(codec::decode(&frame)?)),
            None => Ok(None),
        }
    }

    fn sender(&self) -> MemorySender {
        MemorySender {
            shared: Arc::clone(&self.shared),
            outbound: 1 - self.inbound,
        }
    }

    fn is_connected(&self) -> bool {
        self.shared.lanes[0].is_open() && self.shared.lanes[1].is_open()
    }
}

impl Drop for MemoryTransport {
    fn drop(&mut self) {
        self.shared.close_both();
    }
}

/// Reply handle for a [`MemoryTransport`] endpoint.
#[derive(Clone)]
pub struct MemorySender {
    shared: Arc<Shared>,
    outbound: usize,
}

impl EnvelopeSender for MemorySender {
    fn send_envelope(&self, envelope: Envelope) -> Result<(), TransportError> {
        let frame = codec::encode(&envelope).map_err(|err| TransportError::Encode(err.reason))?;
        self.shared.lanes[self.outbound].push(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use envelope::{channel, Value};
    use std::thread;

    fn ping(n: i64) -> Envelope {
        Envelope::new(channel::GENERIC_ASYNC, vec![Value::Int(n)])
    }

    #[test]
    fn test_delivery_preserves_send_order() {
        let (mut client, mut host) = MemoryTransport::pair();
        client.send(ping(1)).unwrap();
        client.send(ping(2)).unwrap();
        client.send(ping(3)).unwrap();

        for expected in 1..=3 {
            let envelope = host.receive(None).unwrap().unwrap();
            assert_eq!(envelope.arguments, vec![Value::Int(expected)]);
        }
        assert_eq!(host.receive(None).unwrap(), None);
    }

    #[test]
    fn test_directions_are_independent() {
        let (mut client, mut host) = MemoryTransport::pair();
        client.send(ping(1)).unwrap();
        host.send(ping(2)).unwrap();

        assert_eq!(
            host.receive(None).unwrap().unwrap().arguments,
            vec![Value::Int(1)]
        );
        assert_eq!(
            client.receive(None).unwrap().unwrap().arguments,
            vec![Value::Int(2)]
        );
    }

    #[test]
    fn test_poll_on_empty_queue_returns_none() {
        let (mut client, _host) = MemoryTransport::pair();
        assert_eq!(client.receive(None).unwrap(), None);
    }

    #[test]
    fn test_timed_receive_expires() {
        let (mut client, _host) = MemoryTransport::pair();
        let result = client.receive(Some(Duration::from_millis(10))).unwrap();
        assert_eq!(result, None);
    }

    #[test]
    fn test_blocked_receive_wakes_on_send() {
        let (mut client, mut host) = MemoryTransport::pair();
        let waiter = thread::spawn(move || host.receive(Some(Duration::from_secs(5))));
        thread::sleep(Duration::from_millis(20));
        client.send(ping(9)).unwrap();

        let received = waiter.join().unwrap().unwrap().unwrap();
        assert_eq!(received.arguments, vec![Value::Int(9)]);
    }

    #[test]
    fn test_disconnect_wakes_blocked_receiver() {
        let (client, mut host) = MemoryTransport::pair();
        let waiter = thread::spawn(move || host.receive(Some(Duration::from_secs(5))));
        thread::sleep(Duration::from_millis(20));
        drop(client);

        assert_eq!(waiter.join().unwrap(), Err(TransportError::Disconnected));
    }

    #[test]
    fn test_queued_frames_drain_after_disconnect() {
        let (mut client, mut host) = MemoryTransport::pair();
        client.send(ping(1)).unwrap();
        drop(client);

        assert_eq!(
            host.receive(None).unwrap().unwrap().arguments,
            vec![Value::Int(1)]
        );
        assert_eq!(host.receive(None), Err(TransportError::Disconnected));
    }

    #[test]
    fn test_explicit_disconnect_closes_both_directions() {
        let (mut client, mut host) = MemoryTransport::pair();
        client.disconnect();

        assert!(!client.is_connected());
        assert_eq!(host.receive(None), Err(TransportError::Disconnected));
        assert_eq!(client.receive(None), Err(TransportError::Disconnected));
        assert_eq!(host.send(ping(1)), Err(TransportError::Disconnected));
    }

    #[test]
    fn test_send_after_disconnect_fails() {
        let (mut client, host) = MemoryTransport::pair();
        drop(host);
        assert_eq!(client.send(ping(1)), Err(TransportError::Disconnected));
    }

    #[test]
    fn test_malformed_frame_does_not_poison_the_lane() {
        let (mut client, mut host) = MemoryTransport::pair();
        client.send_raw_frame(b"garbage".to_vec()).unwrap();
        client.send(ping(7)).unwrap();

        assert!(matches!(
            host.receive(None),
            Err(TransportError::Malformed(_))
        ));
        assert_eq!(
            host.receive(None).unwrap().unwrap().arguments,
            vec![Value::Int(7)]
        );
    }

    #[test]
    fn test_sender_handle_reaches_the_peer() {
        let (mut client, host) = MemoryTransport::pair();
        let handle = host.sender();
        handle.send_envelope(ping(4)).unwrap();

        assert_eq!(
            client.receive(None).unwrap().unwrap().arguments,
            vec![Value::Int(4)]
        );
        assert!(client.is_connected());
        drop(host);
        assert!(!client.is_connected());
    }
}
