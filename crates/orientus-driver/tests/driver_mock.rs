//! 通过模拟串口驱动完整的 `Orientus` 句柄（IO 线程 + 命令通道）

use orientus_driver::protocol::*;
use orientus_driver::serial::{MockSerialAdapter, MockSerialHandle, SerialError};
use orientus_driver::*;
use std::time::{Duration, Instant};

const WAIT: Duration = Duration::from_secs(2);

fn frame(id: u8, payload: Vec<u8>) -> Vec<u8> {
    RawFrame::new(id, payload).unwrap().to_bytes()
}

fn diagnostics_frames(device_id: u32) -> Vec<u8> {
    let mut bytes = frame(ID_STATUS, vec![0x00, 0x00, 0x01, 0x00]);
    bytes.extend(frame(ID_RUNNING_TIME, [3u32, 0].iter().flat_map(|v| v.to_le_bytes()).collect()));
    bytes.extend(frame(
        ID_DEVICE_INFORMATION,
        [1000u32, device_id, 1000, 1, 2, 3]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect(),
    ));
    bytes
}

fn start(builder: OrientusBuilder) -> (Orientus, MockSerialHandle) {
    let (adapter, handle) = MockSerialAdapter::new();
    let orientus = builder.build_with_adapter(adapter).unwrap();
    (orientus, handle)
}

fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + WAIT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    false
}

#[test]
fn startup_configuration_is_written_in_order() {
    let (orientus, handle) = start(OrientusBuilder::new().port("mock"));

    let expected: Vec<Vec<u8>> = startup_requests(default_packet_periods())
        .iter()
        .map(|r| r.to_frame().unwrap().to_bytes())
        .collect();

    let mut written = Vec::new();
    while written.len() < expected.len() {
        match handle.wait_written(WAIT) {
            Some(bytes) => written.push(bytes),
            None => break,
        }
    }
    assert_eq!(written, expected);
    assert_eq!(orientus.metrics().commands_sent, 3);
    orientus.shutdown().unwrap();
}

#[test]
fn no_configuration_when_disabled() {
    let (orientus, handle) = start(OrientusBuilder::new().configure_on_start(false));
    orientus.zero().unwrap();

    let written = handle.wait_written(WAIT).unwrap();
    let expected = OutboundRequest::Reset(ResetKind::HotStart)
        .to_frame()
        .unwrap()
        .to_bytes();
    assert_eq!(written, expected);
    assert!(handle.wait_written(Duration::from_millis(20)).is_none());
    orientus.shutdown().unwrap();
}

#[test]
fn records_flow_to_channel_sink() {
    let (sink, rx) = ChannelSink::bounded(16);
    let (orientus, handle) = start(
        OrientusBuilder::new()
            .frame_id("base_imu")
            .configure_on_start(false)
            .sink(sink),
    );

    let payload: Vec<u8> = [0.0f32, 0.0, 9.81, 0.1, 0.2, 0.3, 100.0, 200.0, 300.0, 25.0, 0.0, 0.0]
        .iter()
        .flat_map(|v| v.to_le_bytes())
        .collect();
    // 拆成两次写入，跨读取边界
    let bytes = frame(ID_RAW_SENSORS, payload);
    handle.push_bytes(&bytes[..10]);
    handle.push_bytes(&bytes[10..]);

    let outputs: Vec<ImuOutput> = (0..3).map(|_| rx.recv_timeout(WAIT).unwrap()).collect();
    match &outputs[0] {
        ImuOutput::RawImu(imu) => {
            assert_eq!(imu.header.frame_id, "base_imu");
            assert_eq!(imu.linear_acceleration.z, f64::from(9.81f32));
        },
        other => panic!("expected raw imu, got {:?}", other),
    }
    assert!(matches!(outputs[1], ImuOutput::MagneticField(_)));
    assert!(matches!(outputs[2], ImuOutput::Temperature(_)));

    orientus.shutdown().unwrap();
}

#[test]
fn diagnostics_become_available() {
    let (orientus, handle) = start(OrientusBuilder::new().port("/dev/mock").configure_on_start(false));
    assert!(!orientus.query_diagnostics().is_available());

    handle.push_bytes(&diagnostics_frames(42));
    let record = orientus.wait_for_diagnostics(WAIT).unwrap();
    assert_eq!(record.device_information.device_id, 42);

    // 无新数据时重复查询结果一致
    assert_eq!(orientus.query_diagnostics(), orientus.query_diagnostics());

    let report = orientus.diagnostics_report();
    assert!(report.available);
    let device = report.subsystem("device").unwrap();
    assert_eq!(device.level, HealthLevel::Ok);
    assert!(device.values.contains(&("Device", "/dev/mock".to_string())));
    assert_eq!(report.subsystem("filter").unwrap().level, HealthLevel::Ok);

    orientus.shutdown().unwrap();
}

#[test]
fn rejection_is_reported() {
    let (orientus, handle) = start(OrientusBuilder::new().configure_on_start(false));
    handle.push_bytes(&frame(ID_ACKNOWLEDGE, vec![ID_PACKET_PERIODS, 0xCD, 0xAB, 5]));

    assert!(wait_until(|| orientus.last_rejection().is_some()));
    let rejected = orientus.last_rejection().unwrap();
    assert_eq!(rejected.packet_id, ID_PACKET_PERIODS);
    assert_eq!(rejected.packet_crc, 0xABCD);
    assert_eq!(rejected.result, AcknowledgeResult::NotReady);
    assert_eq!(orientus.metrics().commands_rejected, 1);

    // 拒绝不影响后续运行
    assert!(orientus.is_running());
    orientus.shutdown().unwrap();
}

#[test]
fn transport_failure_terminates_pipeline() {
    let (orientus, handle) = start(OrientusBuilder::new().configure_on_start(false));
    handle.push_bytes(&diagnostics_frames(1));
    handle.push_error(SerialError::Io(std::io::Error::from(
        std::io::ErrorKind::BrokenPipe,
    )));

    assert!(wait_until(|| !orientus.is_running()));
    // 终止前收到的诊断仍然可读
    assert!(orientus.query_diagnostics().is_available());

    let err = orientus.shutdown().unwrap_err();
    assert!(err.is_transport_failure(), "unexpected error: {}", err);
}

#[test]
fn recoverable_errors_do_not_stop_pipeline() {
    let (orientus, handle) = start(OrientusBuilder::new().configure_on_start(false));
    handle.push_error(SerialError::Timeout);
    handle.push_bytes(&[0x00, 0x01, 0x02]);
    handle.push_bytes(&frame(250, vec![0; 4]));

    assert!(wait_until(|| orientus.metrics().unknown_ids == 1));
    assert!(orientus.is_running());
    assert_eq!(orientus.metrics().bytes_discarded, 3);
    orientus.shutdown().unwrap();
}
