// Half-duplex register protocol for the wheel servos
//
// Dynamixel-1.0-style framing: [0xFF, 0xFF, id, len, instruction, params...,
// checksum]. Velocities are sign-magnitude i16 (bit 15 = direction).

use std::io::{Read, Write};
use std::time::Duration;

use serialport::SerialPort;
use tracing::trace;

pub const DEFAULT_BAUDRATE: u32 = 1_000_000;
pub const DEFAULT_TIMEOUT_MS: u64 = 100;

const HEADER: [u8; 2] = [0xFF, 0xFF];
const BROADCAST_ID: u8 = 0xFE;

#[repr(u8)]
#[derive(Debug, Clone, Copy)]
enum Instruction {
    Ping = 0x01,
    Read = 0x02,
    Write = 0x03,
}

/// The registers the runtime actually touches.
#[repr(u8)]
#[derive(Debug, Clone, Copy)]
pub enum Reg {
    OperatingMode = 33,   // 1 byte: 0=position, 1=velocity
    TorqueEnable = 40,    // 1 byte
    GoalVelocity = 46,    // 2 bytes, sign-magnitude
    PresentPosition = 56, // 2 bytes, read-only, 0..4095 single turn
}

/// Servo operating modes used here.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServoMode {
    Position = 0,
    Velocity = 1,
}

#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("servo {id}: malformed response ({reason})")]
    Malformed { id: u8, reason: String },

    #[error("servo {id}: checksum mismatch")]
    Checksum { id: u8 },

    #[error("servo {id}: fault status 0x{status:02X}")]
    Fault { id: u8, status: u8 },

    #[error("servo {id}: no response")]
    Timeout { id: u8 },
}

pub type Result<T> = std::result::Result<T, BusError>;

/// One shared serial bus; every wheel servo hangs off it.
pub struct ServoBus {
    port: Box<dyn SerialPort>,
}

impl ServoBus {
    pub fn open(port_name: &str) -> Result<Self> {
        Self::open_with_baudrate(port_name, DEFAULT_BAUDRATE)
    }

    pub fn open_with_baudrate(port_name: &str, baudrate: u32) -> Result<Self> {
        let port = serialport::new(port_name, baudrate)
            .timeout(Duration::from_millis(DEFAULT_TIMEOUT_MS))
            .open()?;
        Ok(Self { port })
    }

    /// Check whether a servo answers at all.
    pub fn ping(&mut self, id: u8) -> Result<bool> {
        self.send(id, Instruction::Ping, &[])?;
        match self.receive(id) {
            Ok(_) => Ok(true),
            Err(BusError::Timeout { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub fn write_u8(&mut self, id: u8, reg: Reg, value: u8) -> Result<()> {
        trace!(id, ?reg, value, "bus write u8");
        self.send(id, Instruction::Write, &[reg as u8, value])?;
        self.receive(id)?;
        Ok(())
    }

    pub fn write_u16(&mut self, id: u8, reg: Reg, value: u16) -> Result<()> {
        trace!(id, ?reg, value, "bus write u16");
        let [lo, hi] = value.to_le_bytes();
        self.send(id, Instruction::Write, &[reg as u8, lo, hi])?;
        self.receive(id)?;
        Ok(())
    }

    pub fn read_u16(&mut self, id: u8, reg: Reg) -> Result<u16> {
        self.send(id, Instruction::Read, &[reg as u8, 2])?;
        let params = self.receive(id)?;
        if params.len() < 2 {
            return Err(BusError::Malformed {
                id,
                reason: format!("expected 2 bytes, got {}", params.len()),
            });
        }
        Ok(u16::from_le_bytes([params[0], params[1]]))
    }

    /// Command a signed velocity (ticks/s equivalent raw units).
    pub fn set_velocity(&mut self, id: u8, velocity: i16) -> Result<()> {
        self.write_u16(id, Reg::GoalVelocity, encode_sign_magnitude(velocity))
    }

    /// Read the single-turn position, 0..4095.
    pub fn present_position(&mut self, id: u8) -> Result<u16> {
        self.read_u16(id, Reg::PresentPosition)
    }

    pub fn set_mode(&mut self, id: u8, mode: ServoMode) -> Result<()> {
        self.write_u8(id, Reg::OperatingMode, mode as u8)
    }

    pub fn set_torque(&mut self, id: u8, enabled: bool) -> Result<()> {
        self.write_u8(id, Reg::TorqueEnable, enabled as u8)
    }

    fn send(&mut self, id: u8, instruction: Instruction, params: &[u8]) -> Result<()> {
        let frame = frame(id, instruction, params);
        self.port.write_all(&frame)?;
        self.port.flush()?;
        Ok(())
    }

    /// Read one status frame, returning its parameter bytes.
    fn receive(&mut self, expected_id: u8) -> Result<Vec<u8>> {
        let mut header = [0u8; 2];
        self.port.read_exact(&mut header).map_err(|e| {
            if e.kind() == std::io::ErrorKind::TimedOut {
                BusError::Timeout { id: expected_id }
            } else {
                BusError::Io(e)
            }
        })?;
        if header != HEADER {
            return Err(BusError::Malformed {
                id: expected_id,
                reason: format!("bad header {:02X?}", header),
            });
        }

        let mut id_len = [0u8; 2];
        self.port.read_exact(&mut id_len)?;
        let (id, len) = (id_len[0], id_len[1] as usize);
        if len < 2 {
            return Err(BusError::Malformed {
                id: expected_id,
                reason: format!("length byte {len}"),
            });
        }
        if id != expected_id {
            return Err(BusError::Malformed {
                id: expected_id,
                reason: format!("answer from servo {id}"),
            });
        }

        // status byte + params + checksum
        let mut body = vec![0u8; len];
        self.port.read_exact(&mut body)?;

        let mut summed = vec![id, len as u8];
        summed.extend_from_slice(&body[..len - 1]);
        if checksum(&summed) != body[len - 1] {
            return Err(BusError::Checksum { id });
        }

        let status = body[0];
        if status != 0 {
            return Err(BusError::Fault { id, status });
        }
        Ok(body[1..len - 1].to_vec())
    }
}

/// Ones-complement sum over everything after the header.
fn checksum(data: &[u8]) -> u8 {
    let sum: u16 = data.iter().map(|&b| u16::from(b)).sum();
    (!sum & 0xFF) as u8
}

fn frame(id: u8, instruction: Instruction, params: &[u8]) -> Vec<u8> {
    debug_assert!(id <= BROADCAST_ID);
    let mut frame = Vec::with_capacity(6 + params.len());
    frame.extend_from_slice(&HEADER);
    frame.push(id);
    frame.push((params.len() + 2) as u8); // instruction + checksum
    frame.push(instruction as u8);
    frame.extend_from_slice(params);
    frame.push(checksum(&frame[2..]));
    frame
}

/// Bit 15 carries the direction, bits 0..14 the magnitude.
fn encode_sign_magnitude(value: i16) -> u16 {
    if value >= 0 {
        value as u16
    } else {
        0x8000 | value.unsigned_abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_sign_magnitude(raw: u16) -> i16 {
        let magnitude = (raw & 0x7FFF) as i16;
        if raw & 0x8000 != 0 { -magnitude } else { magnitude }
    }

    #[test]
    fn checksum_is_complement_of_sum() {
        // id=2, len=4, WRITE, reg=46, data lo/hi
        let data = [2u8, 4, 0x03, 46, 0x10, 0x00];
        // ~(2 + 4 + 3 + 46 + 16) = ~71 = 184
        assert_eq!(checksum(&data), 184);
    }

    #[test]
    fn frame_layout() {
        let frame = frame(3, Instruction::Read, &[Reg::PresentPosition as u8, 2]);
        assert_eq!(&frame[..2], &HEADER);
        assert_eq!(frame[2], 3);
        assert_eq!(frame[3], 4); // reg + count + instruction + checksum
        assert_eq!(frame[4], Instruction::Read as u8);
        assert_eq!(frame[5], 56);
        assert_eq!(frame.len(), 8);
        // checksum covers id..params
        assert_eq!(frame[7], checksum(&frame[2..7]));
    }

    #[test]
    fn sign_magnitude_round_trip() {
        for v in [0i16, 1, -1, 730, -730, 0x7FFF] {
            assert_eq!(decode_sign_magnitude(encode_sign_magnitude(v)), v);
        }
        assert_eq!(encode_sign_magnitude(-250), 0x8000 | 250);
    }
}
