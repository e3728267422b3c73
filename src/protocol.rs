//! Panel wire protocol: framed commands over a serial transport.
//!
//! Every command is a 3-byte header (two fixed synchronization bytes and a
//! command id), optionally followed by parameter bytes:
//!
//! ```text
//! ┌──────┬──────┬─────────┬──────────────────┐
//! │ 0x32 │ 0xAC │ Cmd(1)  │ Parameters...    │
//! └──────┴──────┴─────────┴──────────────────┘
//! ```
//!
//! Frames use a two-phase stage/flush update: each of the 9 wire rows is
//! staged with [`Command::StageCol`], then one [`Command::FlushCols`] swaps
//! all staged rows into the visible buffer atomically. A partially updated
//! frame is therefore never visible, even if staging dies halfway.

use thiserror::Error;

use crate::frame::{Frame, ROWS};

/// Fixed synchronization bytes opening every command.
pub const SYNC: [u8; 2] = [0x32, 0xAC];

/// Command ids understood by the panel firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    /// Set panel backlight/global intensity. One level byte.
    Brightness = 0x00,
    /// Enable/disable the device-side idle animation. One flag byte.
    Animate = 0x04,
    /// Stage one wire row: row index byte + 34 intensity bytes.
    StageCol = 0x07,
    /// Atomically present all staged rows. No parameters.
    FlushCols = 0x08,
    /// Power panel output on or off. One flag byte.
    DisplayOn = 0x14,
}

/// A serial write failed; the connection should be dropped and rediscovered.
#[derive(Debug, Error)]
#[error("panel transmit failed: {0}")]
pub struct TransmitError(#[from] pub std::io::Error);

/// Byte sink owned exclusively by one panel worker.
///
/// The real implementation wraps a serial port; tests substitute recording
/// or fault-injecting mocks.
pub trait Transport: Send {
    /// Write one complete command; partial writes are transport failures.
    fn send(&mut self, bytes: &[u8]) -> std::io::Result<()>;
}

/// Encoder reusing one buffer across commands.
struct CommandWriter {
    buf: Vec<u8>,
}

impl CommandWriter {
    fn new() -> Self {
        Self {
            buf: Vec::with_capacity(3 + 1 + crate::frame::COLS),
        }
    }

    fn encode(&mut self, command: Command, parameters: &[u8]) -> &[u8] {
        self.buf.clear();
        self.buf.extend_from_slice(&SYNC);
        self.buf.push(command as u8);
        self.buf.extend_from_slice(parameters);
        &self.buf
    }
}

/// Encode one command into a fresh byte vector.
#[must_use]
pub fn encode_command(command: Command, parameters: &[u8]) -> Vec<u8> {
    let mut writer = CommandWriter::new();
    writer.encode(command, parameters).to_vec()
}

/// Transmit a full frame with the stage/flush sequence.
///
/// Stages all 9 wire rows, then flushes. An error mid-stage aborts before
/// the flush, so the device never presents a torn frame.
///
/// # Errors
/// The first failing write is returned; nothing further is sent.
pub fn send_frame(transport: &mut dyn Transport, frame: &Frame) -> Result<(), TransmitError> {
    let mut writer = CommandWriter::new();
    let mut parameters = [0u8; 1 + crate::frame::COLS];
    for row in 0..ROWS {
        parameters[0] = row as u8;
        parameters[1..].copy_from_slice(frame.row(row));
        transport.send(writer.encode(Command::StageCol, &parameters))?;
    }
    transport.send(writer.encode(Command::FlushCols, &[]))?;
    Ok(())
}

/// Toggle the device-side idle animation.
///
/// # Errors
/// Propagates the transport failure.
pub fn send_animate(transport: &mut dyn Transport, on: bool) -> Result<(), TransmitError> {
    let mut writer = CommandWriter::new();
    transport.send(writer.encode(Command::Animate, &[u8::from(on)]))?;
    Ok(())
}

/// Set the device's global intensity.
///
/// # Errors
/// Propagates the transport failure.
pub fn send_brightness(transport: &mut dyn Transport, level: u8) -> Result<(), TransmitError> {
    let mut writer = CommandWriter::new();
    transport.send(writer.encode(Command::Brightness, &[level]))?;
    Ok(())
}

/// Power the panel output on or off.
///
/// # Errors
/// Propagates the transport failure.
pub fn send_display_on(transport: &mut dyn Transport, on: bool) -> Result<(), TransmitError> {
    let mut writer = CommandWriter::new();
    transport.send(writer.encode(Command::DisplayOn, &[u8::from(on)]))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::COLS;

    /// Records every command; optionally fails a chosen write.
    struct MockTransport {
        writes: Vec<Vec<u8>>,
        fail_at: Option<usize>,
    }

    impl MockTransport {
        fn new() -> Self {
            Self {
                writes: Vec::new(),
                fail_at: None,
            }
        }

        fn failing_at(index: usize) -> Self {
            Self {
                writes: Vec::new(),
                fail_at: Some(index),
            }
        }
    }

    impl Transport for MockTransport {
        fn send(&mut self, bytes: &[u8]) -> std::io::Result<()> {
            if self.fail_at == Some(self.writes.len()) {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "injected",
                ));
            }
            self.writes.push(bytes.to_vec());
            Ok(())
        }
    }

    #[test]
    fn command_header_layout() {
        let bytes = encode_command(Command::Brightness, &[42]);
        assert_eq!(bytes, vec![0x32, 0xAC, 0x00, 42]);
        let bytes = encode_command(Command::FlushCols, &[]);
        assert_eq!(bytes, vec![0x32, 0xAC, 0x08]);
    }

    #[test]
    fn frame_stages_nine_rows_then_flushes() {
        let mut frame = Frame::new();
        frame.set(3, 10, 99);
        let mut transport = MockTransport::new();
        send_frame(&mut transport, &frame).unwrap();

        assert_eq!(transport.writes.len(), ROWS + 1);
        let mut seen_rows = Vec::new();
        for write in &transport.writes[..ROWS] {
            assert_eq!(&write[..2], &SYNC);
            assert_eq!(write[2], Command::StageCol as u8);
            assert_eq!(write.len(), 3 + 1 + COLS);
            seen_rows.push(write[3]);
        }
        // Each row index exactly once, before any flush.
        let mut sorted = seen_rows.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..ROWS as u8).collect::<Vec<_>>());

        let flush = transport.writes.last().unwrap();
        assert_eq!(flush, &encode_command(Command::FlushCols, &[]));

        // The staged payload carries the painted pixel.
        let row3 = transport
            .writes
            .iter()
            .find(|w| w[2] == Command::StageCol as u8 && w[3] == 3)
            .unwrap();
        assert_eq!(row3[4 + 10], 99);
    }

    #[test]
    fn error_mid_stage_suppresses_flush() {
        let frame = Frame::new();
        let mut transport = MockTransport::failing_at(4);
        assert!(send_frame(&mut transport, &frame).is_err());
        assert_eq!(transport.writes.len(), 4);
        assert!(transport
            .writes
            .iter()
            .all(|w| w[2] == Command::StageCol as u8));
    }

    #[test]
    fn animate_and_display_flags() {
        let mut transport = MockTransport::new();
        send_animate(&mut transport, true).unwrap();
        send_animate(&mut transport, false).unwrap();
        send_display_on(&mut transport, false).unwrap();
        assert_eq!(transport.writes[0], vec![0x32, 0xAC, 0x04, 1]);
        assert_eq!(transport.writes[1], vec![0x32, 0xAC, 0x04, 0]);
        assert_eq!(transport.writes[2], vec![0x32, 0xAC, 0x14, 0]);
    }
}
