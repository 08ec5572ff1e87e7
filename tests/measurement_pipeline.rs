//! End-to-end pipeline tests: configure, capture, decode, assemble.
//!
//! These tests drive a full device session against a scripted transport,
//! covering the same flow a measurement script runs on hardware: transmit
//! the setup sequence, start a run, drain the stream, stop, and rebuild the
//! per-burst potential matrices.

use std::sync::Arc;

use num_complex::Complex32;
use sciospec_eit::{
    is_unmeasured, EitDevice, EitError, MeasurementFrame, MeasurementSetup, MockTransport,
};

const ACK: [u8; 4] = [0x18, 0x01, 0x83, 0x18];

/// Frame layout: tag, group, excitation(2), frequency row(2), timestamp(4),
/// 16 complex channels, tag.
fn raw_frame(group: u8, timestamp_ms: u32, base: f32) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(139);
    bytes.push(0xB4);
    bytes.push(group);
    bytes.extend_from_slice(&[group, 0x01]);
    bytes.extend_from_slice(&[0x00, 0x00]);
    bytes.extend_from_slice(&timestamp_ms.to_be_bytes());
    for ch in 0..16u32 {
        let v = base + ch as f32;
        bytes.extend_from_slice(&v.to_be_bytes());
        bytes.extend_from_slice(&(-v).to_be_bytes());
    }
    bytes.push(0xB4);
    bytes
}

fn setup(n_el: u16, burst_count: u16) -> MeasurementSetup {
    MeasurementSetup {
        burst_count,
        n_el,
        exc_freq: 10_000.0,
        framerate: 10.0,
        amplitude: 0.001,
        inj_skip: 0,
        gain: 1,
        adc_range: 5,
    }
}

#[tokio::test]
async fn sixteen_electrode_run_end_to_end() {
    let setup = setup(16, 3);

    // One frame per burst, all in channel group 1.
    let stream: Vec<u8> = (0..3u32)
        .flat_map(|b| raw_frame(1, b * 100, b as f32))
        .collect();

    let transport = Arc::new(MockTransport::with_responses([
        stream,
        Vec::new(),
        ACK.to_vec(),
    ]));
    let device = EitDevice::new(transport.clone(), 16).unwrap();

    let matrices = device.run_measurement(&setup).await.unwrap();
    assert_eq!(matrices.len(), 3);

    for (b, result) in matrices.iter().enumerate() {
        let m = result.as_ref().unwrap();
        assert_eq!(m.n_el(), 16);
        // Every frame sits in excitation round 0.
        for col in 0..16 {
            let expected = b as f32 + col as f32;
            assert_eq!(m[(0, col)], Complex32::new(expected, -expected));
        }
        // Rows 1.. stay at the unmeasured sentinel.
        for row in 1..16 {
            assert!(m.row(row).iter().copied().all(is_unmeasured));
        }
    }

    // Start then stop, half-duplex.
    let written = transport.written().await;
    assert_eq!(written, vec![vec![0xB4, 0x01, 0x01, 0xB4], vec![0xB4, 0x01, 0x00, 0xB4]]);
}

#[test]
fn interleaved_groups_advance_excitation_rounds() {
    // Two channel groups: the device interleaves [1, 2, 1, 2] per burst and
    // the assembler advances one excitation round per group-1 frame.
    let setup = setup(32, 2);

    let bursts: Vec<Vec<MeasurementFrame>> = (0..2u32)
        .map(|b| {
            let base = b as f32 * 1000.0;
            [
                raw_frame(1, b * 10, base),
                raw_frame(2, b * 10 + 1, base + 100.0),
                raw_frame(1, b * 10 + 2, base + 200.0),
                raw_frame(2, b * 10 + 3, base + 300.0),
            ]
            .iter()
            .map(|bytes| MeasurementFrame::decode(bytes, 2).unwrap())
            .collect()
        })
        .collect();

    let matrices = sciospec_eit::assemble(&setup, &bursts);
    assert_eq!(matrices.len(), 2);

    for (b, result) in matrices.iter().enumerate() {
        let m = result.as_ref().unwrap();
        let base = b as f32 * 1000.0;
        // Round 0: group 1 fills cols 0..16, group 2 fills cols 16..32.
        assert_eq!(m[(0, 0)], Complex32::new(base, -base));
        assert_eq!(m[(0, 16)], Complex32::new(base + 100.0, -(base + 100.0)));
        // Round 1.
        assert_eq!(m[(1, 0)], Complex32::new(base + 200.0, -(base + 200.0)));
        assert_eq!(m[(1, 31)], Complex32::new(base + 315.0, -(base + 315.0)));
        // Unwritten rounds keep the sentinel.
        assert!(m.row(2).iter().copied().all(is_unmeasured));
    }
}

#[tokio::test]
async fn corrupt_frame_is_tolerated_below_threshold() {
    let setup = setup(16, 16);

    let mut stream: Vec<u8> = (0..16u32).flat_map(|b| raw_frame(1, b, 0.0)).collect();
    // Break one end tag: 1 of 16 frames is 6.25%, under the 10% default.
    stream[3 * 139 - 1] = 0x00;

    let transport = Arc::new(MockTransport::with_responses([
        stream,
        Vec::new(),
        ACK.to_vec(),
    ]));
    let device = EitDevice::new(transport, 16).unwrap();

    let matrices = device.run_measurement(&setup).await.unwrap();
    assert_eq!(matrices.len(), 16);

    // The burst that lost its only frame fails its round-count invariant;
    // every sibling still reconstructs.
    assert!(matches!(
        matrices[2],
        Err(EitError::IncompleteBurst { burst: 2, .. })
    ));
    assert_eq!(matrices.iter().filter(|r| r.is_ok()).count(), 15);
}

#[tokio::test]
async fn full_session_configures_before_running() {
    let setup = setup(16, 1);
    let stream = raw_frame(1, 0, 42.0);

    // Acks for all 28 configuration exchanges, then the data stream, a
    // quiet poll, and the stop ack.
    let mut responses: Vec<Vec<u8>> = Vec::new();
    for _ in 0..28 {
        responses.push(ACK.to_vec());
        responses.push(Vec::new());
    }
    responses.push(stream);
    responses.push(Vec::new());
    responses.push(ACK.to_vec());

    let transport = Arc::new(MockTransport::with_responses(responses));
    let device = EitDevice::new(transport.clone(), 16).unwrap();

    device.set_measurement_setup(&setup).await.unwrap();
    let matrices = device.run_measurement(&setup).await.unwrap();

    let m = matrices[0].as_ref().unwrap();
    assert_eq!(m[(0, 0)], Complex32::new(42.0, -42.0));

    let written = transport.written().await;
    // 28 setup frames + start + stop.
    assert_eq!(written.len(), 30);
    assert_eq!(written[0], vec![0xB0, 0x01, 0x01, 0xB0]);
    assert_eq!(written[28], vec![0xB4, 0x01, 0x01, 0xB4]);
    assert_eq!(written[29], vec![0xB4, 0x01, 0x00, 0xB4]);
}
