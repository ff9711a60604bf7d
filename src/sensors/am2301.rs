//! AM2301 (DHT21/DHT22 family) single-wire humidity/temperature sensor.
//!
//! ## Protocol
//!
//! ```text
//!  host: ──┐  ≥1 ms  ┌─ 30 µs ─┐
//!          └─────────┘         │
//!  sensor:                     └─ 80 µs low ─┬─ 80 µs high ─┬─ 40 bits ─▶
//!  bit:   50 µs low, then high for ~27 µs (0) or ~70 µs (1)
//! ```
//!
//! The 40 bits are humidity (16), temperature (16, bit 15 = sign) and an
//! 8-bit checksum over the first four bytes.  Both values are in tenths.
//!
//! The driver is generic over `embedded-hal` 1.0 so it runs on an
//! `esp-idf-hal` open-drain `PinDriver` on the device and on a scripted
//! pin in tests.  [`decode_frame`] is pure.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

use crate::app::ports::{Measurement, SensorPort};
use crate::error::ReadError;

/// Host start pulse.
const START_LOW_US: u32 = 1_100;
const RESPONSE_TIMEOUT_US: u32 = 100;
const BIT_TIMEOUT_US: u32 = 100;
/// High-phase counts above this decode as a `1`.
const BIT_ONE_THRESHOLD_US: u32 = 40;

pub const HUMIDITY_RANGE: core::ops::RangeInclusive<f32> = 0.0..=100.0;
pub const TEMPERATURE_RANGE: core::ops::RangeInclusive<f32> = -40.0..=80.0;

/// Decode and validate one 5-byte frame.
pub fn decode_frame(frame: [u8; 5]) -> Result<Measurement, ReadError> {
    let sum = frame[..4].iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    if sum != frame[4] {
        return Err(ReadError::Checksum);
    }

    let humidity_raw = u16::from_be_bytes([frame[0], frame[1]]);
    let temp_raw = u16::from_be_bytes([frame[2] & 0x7F, frame[3]]);
    let negative = frame[2] & 0x80 != 0;

    let humidity = f32::from(humidity_raw) / 10.0;
    let magnitude = f32::from(temp_raw) / 10.0;
    let temperature = if negative { -magnitude } else { magnitude };

    if !HUMIDITY_RANGE.contains(&humidity) || !TEMPERATURE_RANGE.contains(&temperature) {
        return Err(ReadError::OutOfRange);
    }
    Ok(Measurement {
        humidity,
        temperature,
    })
}

pub struct Am2301<P, D> {
    pin: P,
    delay: D,
}

impl<P, D> Am2301<P, D>
where
    P: InputPin + OutputPin,
    D: DelayNs,
{
    /// `pin` must be open-drain with a pull-up.  The line is released to
    /// idle high here; a pin that refuses is [`ReadError::Bus`].
    pub fn new(mut pin: P, delay: D) -> Result<Self, ReadError> {
        pin.set_high().map_err(|_| ReadError::Bus)?;
        Ok(Self { pin, delay })
    }

    pub fn release(self) -> (P, D) {
        (self.pin, self.delay)
    }

    fn read_frame(&mut self) -> Result<[u8; 5], ReadError> {
        self.pin.set_low().map_err(|_| ReadError::Bus)?;
        self.delay.delay_us(START_LOW_US);
        self.pin.set_high().map_err(|_| ReadError::Bus)?;

        // Response: low 80 µs, high 80 µs, then the first bit's low phase.
        self.wait_for(false, RESPONSE_TIMEOUT_US)
            .map_err(|_| ReadError::NoResponse)?;
        self.wait_for(true, RESPONSE_TIMEOUT_US)
            .map_err(|_| ReadError::NoResponse)?;
        self.wait_for(false, RESPONSE_TIMEOUT_US)
            .map_err(|_| ReadError::NoResponse)?;

        let mut frame = [0u8; 5];
        for byte in frame.iter_mut() {
            for _ in 0..8 {
                self.wait_for(true, BIT_TIMEOUT_US)?;
                let high_us = self.wait_for(false, BIT_TIMEOUT_US)?;
                *byte = (*byte << 1) | u8::from(high_us > BIT_ONE_THRESHOLD_US);
            }
        }
        Ok(frame)
    }

    /// Busy-wait until the line reads `high`.  Returns the elapsed µs.
    fn wait_for(&mut self, high: bool, timeout_us: u32) -> Result<u32, ReadError> {
        let mut elapsed = 0;
        loop {
            if self.pin.is_high().map_err(|_| ReadError::Bus)? == high {
                return Ok(elapsed);
            }
            if elapsed >= timeout_us {
                return Err(ReadError::Timeout);
            }
            self.delay.delay_us(1);
            elapsed += 1;
        }
    }
}

impl<P, D> SensorPort for Am2301<P, D>
where
    P: InputPin + OutputPin,
    D: DelayNs,
{
    fn read(&mut self) -> Result<Measurement, ReadError> {
        let frame = self.read_frame()?;
        decode_frame(frame)
    }
}
