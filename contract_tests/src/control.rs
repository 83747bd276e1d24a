//! Control stream contract tests: the allow-listed local operation
//! surface exposed to the host.

#[cfg(test)]
mod tests {
    use crate::test_helpers::*;
    use bridge::{Bridge, DeliveryFault, OpTable};
    use envelope::{channel, Envelope, Value};
    use std::sync::{Arc, Mutex};
    use transport::{MemoryTransport, Transport};

    fn invoke(op: &str, mut args: Vec<Value>) -> Envelope {
        let mut payload = vec![text(op)];
        payload.append(&mut args);
        Envelope::new(channel::control(channel::INVOKE_LOCAL_METHOD), payload)
    }

    #[test]
    fn test_allow_listed_op_runs_with_its_arguments() {
        let (client, mut host) = MemoryTransport::pair();
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut ops = OpTable::new();
        {
            let calls = Arc::clone(&calls);
            ops.register(
                "set-zoom-factor",
                Box::new(move |args| {
                    calls.lock().unwrap().push(args.to_vec());
                    Ok(())
                }),
            );
        }
        let mut receiving = Bridge::new(client, ops);

        host.send(invoke("set-zoom-factor", vec![Value::Float(2.0)]))
            .unwrap();
        let report = receiving.pump();

        assert!(report.is_clean());
        assert_eq!(*calls.lock().unwrap(), vec![vec![Value::Float(2.0)]]);
    }

    #[test]
    fn test_op_absent_from_allow_list_is_rejected_without_side_effects() {
        let (client, mut host) = MemoryTransport::pair();
        let mut receiving = Bridge::new(client, OpTable::new());
        let listeners_before = receiving.listener_count(&channel::control(
            channel::INVOKE_LOCAL_METHOD,
        ));

        host.send(invoke("delete-everything", vec![])).unwrap();
        let report = receiving.pump();

        assert_eq!(
            report.faults,
            vec![DeliveryFault::UnknownControlOp {
                op: "delete-everything".to_string()
            }]
        );
        // Dispatcher state is untouched: the control listener survives
        // and keeps serving.
        assert_eq!(
            receiving.listener_count(&channel::control(channel::INVOKE_LOCAL_METHOD)),
            listeners_before
        );
        assert!(receiving.is_connected());
    }

    #[test]
    fn test_rejected_op_does_not_tear_down_the_connection() {
        let (client, mut host) = MemoryTransport::pair();
        let ran = Arc::new(Mutex::new(false));
        let mut ops = OpTable::new();
        {
            let ran = Arc::clone(&ran);
            ops.register(
                "reload",
                Box::new(move |_args| {
                    *ran.lock().unwrap() = true;
                    Ok(())
                }),
            );
        }
        let mut receiving = Bridge::new(client, ops);

        host.send(invoke("not-a-thing", vec![])).unwrap();
        host.send(invoke("reload", vec![])).unwrap();
        let report = receiving.pump();

        assert_eq!(report.faults.len(), 1);
        assert!(*ran.lock().unwrap());
    }

    #[test]
    fn test_control_payload_without_op_name_is_reported() {
        let (client, mut host) = MemoryTransport::pair();
        let mut receiving = Bridge::new(client, OpTable::new());

        host.send(Envelope::new(
            channel::control(channel::INVOKE_LOCAL_METHOD),
            vec![Value::Int(9)],
        ))
        .unwrap();
        let report = receiving.pump();

        assert_eq!(report.faults.len(), 1);
        assert!(matches!(
            report.faults[0],
            DeliveryFault::BadControlPayload { .. }
        ));
    }
}
