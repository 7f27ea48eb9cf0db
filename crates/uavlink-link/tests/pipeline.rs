//! End-to-end pipeline tests: scripted bytes in, subscriber deliveries
//! and wire writes out.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use uavlink_core::{DispatchMode, Error, LinkEvent};
use uavlink_link::{
    CallbackSubscriber, CommandMessage, DeviceBuilder, Device, TelemetryMessage,
};
use uavlink_test_harness::{ScriptHandle, ScriptedTransport};
use uavlink_wire::{Attitude, GlobalPositionInt, Heartbeat, Message, MessageKind};

fn frame_bytes(message: Message, seq: u8) -> Vec<u8> {
    message.pack(seq, 1, 1).encode()
}

async fn scripted_device(name: &str, mode: DispatchMode) -> (Device, ScriptHandle) {
    let (transport, handle) = ScriptedTransport::pair();
    let device = DeviceBuilder::new(name)
        .dispatch_mode(mode)
        .build_with_transport(Box::new(transport))
        .await
        .unwrap();
    (device, handle)
}

fn recording_subscriber(
    name: &str,
) -> (Arc<CallbackSubscriber>, Arc<Mutex<Vec<MessageKind>>>) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let log2 = Arc::clone(&log);
    let sub = Arc::new(CallbackSubscriber::new(name, move |msg: &TelemetryMessage| {
        log2.lock().unwrap().push(msg.kind());
    }));
    (sub, log)
}

async fn wait_for_len(log: &Mutex<Vec<MessageKind>>, expected: usize) {
    for _ in 0..400 {
        if log.lock().unwrap().len() >= expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!(
        "expected {expected} deliveries, saw {:?}",
        log.lock().unwrap()
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn interleaved_noise_yields_exactly_the_valid_frames() {
    let (device, handle) = scripted_device("pipe-noise", DispatchMode::Sync).await;
    let (sub, log) = recording_subscriber("rec");
    device.register(sub).unwrap();

    // One valid heartbeat, three bytes of line noise, one valid
    // position frame, all in a single chunk.
    let mut stream = frame_bytes(Message::Heartbeat(Heartbeat::default()), 0);
    stream.extend_from_slice(&[0x13, 0x37, 0x42]);
    stream.extend_from_slice(&frame_bytes(
        Message::GlobalPositionInt(GlobalPositionInt {
            time_boot_ms: 1_000,
            lat: 507_123_456,
            lon: 59_876_543,
            alt: 12_000,
            ..Default::default()
        }),
        1,
    ));
    handle.feed(&stream);

    wait_for_len(&log, 2).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(
        *log.lock().unwrap(),
        vec![MessageKind::Heartbeat, MessageKind::GlobalPositionInt]
    );
    device.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn corrupt_frame_is_dropped_without_stalling_the_stream() {
    let (device, handle) = scripted_device("pipe-corrupt", DispatchMode::Sync).await;
    let (sub, log) = recording_subscriber("rec");
    device.register(sub).unwrap();

    let mut bad = frame_bytes(Message::Heartbeat(Heartbeat::default()), 0);
    let crc_pos = bad.len() - 1;
    bad[crc_pos] ^= 0xFF;
    handle.feed(&bad);
    handle.feed(&frame_bytes(Message::Attitude(Attitude::default()), 1));

    wait_for_len(&log, 1).await;
    assert_eq!(*log.lock().unwrap(), vec![MessageKind::Attitude]);
    device.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn split_frame_across_chunks_decodes_once_complete() {
    let (device, handle) = scripted_device("pipe-split", DispatchMode::Sync).await;
    let (sub, log) = recording_subscriber("rec");
    device.register(sub).unwrap();

    let bytes = frame_bytes(Message::Attitude(Attitude::default()), 7);
    let (head, tail) = bytes.split_at(5);
    handle.feed(head);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(log.lock().unwrap().is_empty());
    handle.feed(tail);

    wait_for_len(&log, 1).await;
    assert_eq!(*log.lock().unwrap(), vec![MessageKind::Attitude]);
    device.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn unknown_kind_is_delivered_verbatim() {
    let (device, handle) = scripted_device("pipe-unknown", DispatchMode::Sync).await;
    let payloads = Arc::new(Mutex::new(Vec::new()));
    let payloads2 = Arc::clone(&payloads);
    device
        .register(Arc::new(CallbackSubscriber::new("raw", move |msg| {
            if let Message::Unknown { msg_id, payload } = msg.message() {
                payloads2.lock().unwrap().push((*msg_id, payload.clone()));
            }
        })))
        .unwrap();

    handle.feed(&frame_bytes(
        Message::Unknown {
            msg_id: 200,
            payload: vec![0xAA, 0xBB, 0xCC],
        },
        0,
    ));

    for _ in 0..400 {
        if !payloads.lock().unwrap().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(
        *payloads.lock().unwrap(),
        vec![(200u8, vec![0xAA, 0xBB, 0xCC])]
    );
    device.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn async_mode_fans_out_to_all_subscribers() {
    let (device, handle) = scripted_device("pipe-async", DispatchMode::Async).await;
    let hits = Arc::new(AtomicUsize::new(0));
    for name in ["a", "b", "c"] {
        let hits = Arc::clone(&hits);
        device
            .register(Arc::new(CallbackSubscriber::new(name, move |_| {
                hits.fetch_add(1, Ordering::SeqCst);
            })))
            .unwrap();
    }

    handle.feed(&frame_bytes(Message::Heartbeat(Heartbeat::default()), 0));

    for _ in 0..400 {
        if hits.load(Ordering::SeqCst) == 3 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(hits.load(Ordering::SeqCst), 3);
    device.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn send_writes_a_framed_command_with_local_ids() {
    let (device, handle) = scripted_device("pipe-send", DispatchMode::Sync).await;

    let heartbeat = Heartbeat {
        custom_mode: 3,
        mav_type: 6,
        autopilot: 8,
        base_mode: 81,
        system_status: 4,
        mavlink_version: 3,
    };
    device
        .send(CommandMessage::new(Message::Heartbeat(heartbeat)))
        .await
        .unwrap();

    let sent = handle.sent_frames();
    assert_eq!(sent.len(), 1);
    let expected = Message::Heartbeat(heartbeat).pack(0, 255, 190).encode();
    assert_eq!(sent[0], expected);
    device.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn sequence_numbers_increment_per_write() {
    let (device, handle) = scripted_device("pipe-seq", DispatchMode::Sync).await;

    for _ in 0..3 {
        device
            .send(CommandMessage::new(Message::Heartbeat(Heartbeat::default())))
            .await
            .unwrap();
    }

    let sent = handle.sent_frames();
    assert_eq!(sent.len(), 3);
    // seq is byte 2 of the frame header.
    assert_eq!(sent[0][2], 0);
    assert_eq!(sent[1][2], 1);
    assert_eq!(sent[2][2], 2);
    device.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn session_sends_through_the_shared_link() {
    let (device, handle) = scripted_device("pipe-session", DispatchMode::Sync).await;
    let session = device.session("ops");
    assert_eq!(session.device_name(), "pipe-session");

    session
        .send(CommandMessage::new(Message::Attitude(Attitude::default())))
        .await
        .unwrap();
    assert_eq!(handle.sent_frames().len(), 1);

    device.close().await.unwrap();
    let result = session
        .send(CommandMessage::new(Message::Attitude(Attitude::default())))
        .await;
    assert!(matches!(result, Err(Error::BusClosed)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn send_fails_when_transport_is_gone() {
    let (device, handle) = scripted_device("pipe-deadport", DispatchMode::Sync).await;
    handle.disconnect();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let result = device
        .send(CommandMessage::new(Message::Heartbeat(Heartbeat::default())))
        .await;
    assert!(result.is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn close_refuses_further_operations() {
    let (device, _handle) = scripted_device("pipe-close", DispatchMode::Sync).await;
    device.close().await.unwrap();

    let (sub, _) = recording_subscriber("late");
    assert!(matches!(device.register(sub), Err(Error::BusClosed)));
    assert!(matches!(
        device
            .send(CommandMessage::new(Message::Heartbeat(Heartbeat::default())))
            .await,
        Err(Error::BusClosed)
    ));
    assert!(matches!(device.close().await, Err(Error::NotConnected)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn device_name_is_reusable_after_close() {
    let (device, _handle) = scripted_device("pipe-reuse", DispatchMode::Sync).await;
    device.close().await.unwrap();

    let (transport, _handle2) = ScriptedTransport::pair();
    let second = DeviceBuilder::new("pipe-reuse")
        .build_with_transport(Box::new(transport))
        .await
        .unwrap();
    second.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn duplicate_device_name_is_rejected() {
    let (device, _handle) = scripted_device("pipe-dup", DispatchMode::Sync).await;

    let (transport, _handle2) = ScriptedTransport::pair();
    let result = DeviceBuilder::new("pipe-dup")
        .build_with_transport(Box::new(transport))
        .await;
    assert!(matches!(result, Err(Error::Connection(_))));
    device.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn cts_transition_is_broadcast() {
    let (device, handle) = scripted_device("pipe-cts", DispatchMode::Sync).await;
    let mut events = device.subscribe_events();

    // Let the link observe the idle baseline before flipping the line.
    tokio::time::sleep(Duration::from_millis(250)).await;
    handle.set_cts(true);

    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        let event = tokio::time::timeout_at(deadline, events.recv())
            .await
            .expect("no CTS event before deadline")
            .expect("event channel closed");
        if event == (LinkEvent::CtsChanged { on: true }) {
            break;
        }
    }
    device.close().await.unwrap();
}
