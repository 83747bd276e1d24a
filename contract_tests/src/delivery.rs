//! Delivery contract tests: ordering, routing, one-shot semantics.

#[cfg(test)]
mod tests {
    use crate::test_helpers::*;
    use bridge::{Bridge, NoLocalOps};
    use envelope::{channel, Value};
    use std::sync::{Arc, Mutex};
    use transport::{MemoryTransport, Transport};

    #[test]
    fn test_sends_arrive_in_call_order() {
        let (client, mut host) = MemoryTransport::pair();
        let mut sending = Bridge::new(client, NoLocalOps);

        sending.send(vec![text("a")]).unwrap();
        sending.send(vec![text("b")]).unwrap();
        sending.send(vec![text("c")]).unwrap();

        let mut observed = Vec::new();
        while let Some(envelope) = host.receive(None).unwrap() {
            observed.push(envelope.arguments[0].clone());
        }
        assert_eq!(observed, vec![text("a"), text("b"), text("c")]);
    }

    #[test]
    fn test_interleaved_send_kinds_keep_fifo_order() {
        let (client, mut host) = MemoryTransport::pair();
        let mut sending = Bridge::new(client, NoLocalOps);

        sending.send(vec![Value::Int(1)]).unwrap();
        sending.send_to_host(vec![Value::Int(2)]).unwrap();
        sending.send(vec![Value::Int(3)]).unwrap();

        let mut observed = Vec::new();
        while let Some(envelope) = host.receive(None).unwrap() {
            observed.push((envelope.channel, envelope.arguments[0].clone()));
        }
        assert_eq!(
            observed,
            vec![
                (channel::GENERIC_ASYNC.to_string(), Value::Int(1)),
                (channel::HOST_DIRECTED.to_string(), Value::Int(2)),
                (channel::GENERIC_ASYNC.to_string(), Value::Int(3)),
            ]
        );
    }

    #[test]
    fn test_host_directed_routes_to_a_distinct_handler_set() {
        let (client, mut host) = MemoryTransport::pair();
        let mut receiving = Bridge::new(client, NoLocalOps);

        let log = Arc::new(Mutex::new(Vec::new()));
        {
            let log = Arc::clone(&log);
            receiving.on(channel::GENERIC_ASYNC, move |_ctx, _args| {
                log.lock().unwrap().push("generic");
            });
        }
        {
            let log = Arc::clone(&log);
            receiving.on(channel::HOST_DIRECTED, move |_ctx, _args| {
                log.lock().unwrap().push("host");
            });
        }

        host.send(host_event(vec![])).unwrap();
        host.send(async_event(vec![])).unwrap();
        host.send(host_event(vec![])).unwrap();

        let report = receiving.pump();
        assert_eq!(report.delivered, 3);
        assert_eq!(*log.lock().unwrap(), vec!["host", "generic", "host"]);
    }

    #[test]
    fn test_one_shot_with_three_queued_envelopes_fires_once() {
        let (client, mut host) = MemoryTransport::pair();
        let mut receiving = Bridge::new(client, NoLocalOps);

        let once_count = Arc::new(Mutex::new(0));
        let persistent_count = Arc::new(Mutex::new(0));
        {
            let once_count = Arc::clone(&once_count);
            receiving.once(channel::GENERIC_ASYNC, move |_ctx, _args| {
                *once_count.lock().unwrap() += 1;
            });
        }
        {
            let persistent_count = Arc::clone(&persistent_count);
            receiving.on(channel::GENERIC_ASYNC, move |_ctx, _args| {
                *persistent_count.lock().unwrap() += 1;
            });
        }

        // All three are already queued before any dispatch happens.
        for _ in 0..3 {
            host.send(async_event(vec![])).unwrap();
        }
        receiving.pump();

        assert_eq!(*once_count.lock().unwrap(), 1);
        assert_eq!(*persistent_count.lock().unwrap(), 3);
        assert_eq!(receiving.listener_count(channel::GENERIC_ASYNC), 1);
    }

    #[test]
    fn test_unhandled_application_channel_is_dropped_silently() {
        let (client, mut host) = MemoryTransport::pair();
        let mut receiving = Bridge::new(client, NoLocalOps);

        host.send(envelope::Envelope::new("future-extension", vec![]))
            .unwrap();

        let report = receiving.pump();
        assert!(report.is_clean());
        assert_eq!(report.delivered, 0);
    }
}
