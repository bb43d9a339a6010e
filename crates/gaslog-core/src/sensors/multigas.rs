//! Driver for the DFRobot SEN0467 (Gravity H2S) multi-gas sensor over I2C.
//!
//! Every exchange is a 9-byte frame in both directions:
//!
//! | byte | request            | response             |
//! |------|--------------------|----------------------|
//! | 0    | `0xFF` head        | `0xFF` head          |
//! | 1    | `0x01` address     | command echo         |
//! | 2    | command            | data (high)          |
//! | 3..8 | arguments          | data                 |
//! | 8    | checksum           | checksum             |
//!
//! The checksum is the two's complement of the byte sum of bytes 1..=7.
//! Frames are written to and read from register `0x00`.

use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;
use log::{debug, error, info};

use super::{Sensor, SensorError, SensorReadings};
use crate::config::CHANNEL_COUNT;

/// Factory I2C address (A0 = A1 = 0)
pub const DEFAULT_I2C_ADDRESS: u8 = 0x74;

const SENSOR: &str = "SEN0467";

const FRAME_LEN: usize = 9;
const FRAME_HEAD: u8 = 0xFF;
const FRAME_ADDRESS: u8 = 0x01;
const DATA_REGISTER: u8 = 0x00;

const CMD_CHANGE_ACQUIRE_MODE: u8 = 0x78;
const CMD_GAS_CONCENTRATION: u8 = 0x86;
const CMD_TEMPERATURE_ADC: u8 = 0x87;

/// Time the sensor needs to prepare a response frame
const RESPONSE_DELAY_MS: u32 = 100;

// On-board NTC thermistor, read through a 10-bit ADC against 3.0 V
const ADC_FULL_SCALE: f32 = 1024.0;
const ADC_REFERENCE_V: f32 = 3.0;
const NTC_R25_OHMS: f32 = 10_000.0;
const NTC_BETA: f32 = 3380.13;
const KELVIN_OFFSET: f32 = 273.15;

/// Data reporting mode of the sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireMode {
    /// Sensor streams readings on its own
    Active = 0x03,
    /// Sensor only measures when asked
    Passive = 0x04,
}

/// Typed readings from the SEN0467 sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GasReadings {
    /// Raw (uncompensated) gas concentration
    pub concentration_ppm: f32,
    /// Sensor board temperature
    pub temperature_c: f32,
}

impl SensorReadings<CHANNEL_COUNT> for GasReadings {
    fn to_array(self) -> [f32; CHANNEL_COUNT] {
        [self.concentration_ppm, self.temperature_c]
    }
}

pub struct MultiGasSensor<I, D> {
    i2c: I,
    delay: D,
    address: u8,
}

impl<I: I2c, D: DelayNs> MultiGasSensor<I, D> {
    pub fn new(i2c: I, delay: D) -> Self {
        Self {
            i2c,
            delay,
            address: DEFAULT_I2C_ADDRESS,
        }
    }

    /// Use a non-default address (0x75..=0x77 depending on the A0/A1 switches).
    pub fn with_address(mut self, address: u8) -> Self {
        self.address = address;
        self
    }

    pub async fn set_acquire_mode(&mut self, mode: AcquireMode) -> Result<(), SensorError> {
        let response = self
            .exchange(CMD_CHANGE_ACQUIRE_MODE, [mode as u8, 0, 0, 0, 0], "change acquire mode")
            .await?;

        if response[2] != 1 {
            error!("{} rejected acquire mode {:?}", SENSOR, mode);
            return Err(SensorError::ReadFailed {
                sensor: SENSOR,
                operation: "change acquire mode",
                details: "mode change not acknowledged",
            });
        }

        Ok(())
    }

    /// Gas concentration without temperature compensation.
    pub async fn read_concentration(&mut self) -> Result<f32, SensorError> {
        let response = self
            .exchange(CMD_GAS_CONCENTRATION, [0; 5], "read gas concentration")
            .await?;
        Ok(decode_concentration(&response))
    }

    pub async fn read_temperature(&mut self) -> Result<f32, SensorError> {
        let response = self
            .exchange(CMD_TEMPERATURE_ADC, [0; 5], "read temperature")
            .await?;
        Ok(decode_temperature(&response))
    }

    /// Send one command frame and read back the response frame.
    async fn exchange(
        &mut self,
        command: u8,
        args: [u8; 5],
        operation: &'static str,
    ) -> Result<[u8; FRAME_LEN], SensorError> {
        let request = request_frame(command, args);

        let mut out = [0u8; FRAME_LEN + 1];
        out[0] = DATA_REGISTER;
        out[1..].copy_from_slice(&request);

        self.i2c.write(self.address, &out).await.map_err(|e| {
            error!("{} {} write failed: {:?}", SENSOR, operation, e);
            SensorError::ReadFailed {
                sensor: SENSOR,
                operation,
                details: "I2C write error",
            }
        })?;

        self.delay.delay_ms(RESPONSE_DELAY_MS).await;

        let mut response = [0u8; FRAME_LEN];
        self.i2c
            .write_read(self.address, &[DATA_REGISTER], &mut response)
            .await
            .map_err(|e| {
                error!("{} {} read failed: {:?}", SENSOR, operation, e);
                SensorError::ReadFailed {
                    sensor: SENSOR,
                    operation,
                    details: "I2C read error",
                }
            })?;

        if response[FRAME_LEN - 1] != checksum(&response) {
            debug!("{} bad frame: {:02x?}", SENSOR, response);
            return Err(SensorError::Checksum {
                sensor: SENSOR,
                operation,
            });
        }

        Ok(response)
    }
}

impl<I: I2c, D: DelayNs> Sensor<CHANNEL_COUNT> for MultiGasSensor<I, D> {
    type Readings = GasReadings;

    async fn connect(&mut self) -> Result<(), SensorError> {
        self.set_acquire_mode(AcquireMode::Passive)
            .await
            .map_err(|_| SensorError::NotConnected {
                sensor: SENSOR,
                details: "passive mode could not be set",
            })?;

        info!("{} connected at 0x{:02x} (passive mode)", SENSOR, self.address);
        Ok(())
    }

    async fn read(&mut self) -> Result<GasReadings, SensorError> {
        let concentration_ppm = self.read_concentration().await?;
        let temperature_c = self.read_temperature().await?;

        Ok(GasReadings {
            concentration_ppm,
            temperature_c,
        })
    }
}

fn checksum(frame: &[u8; FRAME_LEN]) -> u8 {
    let sum = frame[1..FRAME_LEN - 1]
        .iter()
        .fold(0u8, |acc, byte| acc.wrapping_add(*byte));
    (!sum).wrapping_add(1)
}

fn request_frame(command: u8, args: [u8; 5]) -> [u8; FRAME_LEN] {
    let mut frame = [0u8; FRAME_LEN];
    frame[0] = FRAME_HEAD;
    frame[1] = FRAME_ADDRESS;
    frame[2] = command;
    frame[3..8].copy_from_slice(&args);
    frame[8] = checksum(&frame);
    frame
}

/// Concentration is a big-endian count with a decimal-place byte at offset 5.
fn decode_concentration(response: &[u8; FRAME_LEN]) -> f32 {
    let raw = u16::from_be_bytes([response[2], response[3]]) as f32;
    match response[5] {
        1 => raw * 0.1,
        2 => raw * 0.01,
        _ => raw,
    }
}

/// Convert the thermistor ADC count with the NTC beta equation.
///
/// Counts at either rail cannot come from a connected thermistor and decode
/// to NaN.
fn decode_temperature(response: &[u8; FRAME_LEN]) -> f32 {
    let adc = u16::from_be_bytes([response[2], response[3]]) as f32;
    let volts = ADC_REFERENCE_V * adc / ADC_FULL_SCALE;
    if adc <= 0.0 || volts >= ADC_REFERENCE_V {
        return f32::NAN;
    }

    let r_thermistor = volts * NTC_R25_OHMS / (ADC_REFERENCE_V - volts);
    let inv_kelvin =
        1.0 / (KELVIN_OFFSET + 25.0) + libm::logf(r_thermistor / NTC_R25_OHMS) / NTC_BETA;
    1.0 / inv_kelvin - KELVIN_OFFSET
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeClock;
    use alloc::collections::VecDeque;
    use alloc::vec::Vec;
    use embassy_futures::block_on;
    use embedded_hal_async::i2c::{ErrorKind, ErrorType, NoAcknowledgeSource, Operation};

    #[derive(Default)]
    struct FakeBus {
        responses: VecDeque<[u8; FRAME_LEN]>,
        writes: Vec<Vec<u8>>,
        absent: bool,
    }

    impl FakeBus {
        fn respond(&mut self, command: u8, data: [u8; 6]) {
            let mut frame = [0u8; FRAME_LEN];
            frame[0] = FRAME_HEAD;
            frame[1] = command;
            frame[2..8].copy_from_slice(&data);
            frame[8] = checksum(&frame);
            self.responses.push_back(frame);
        }
    }

    impl ErrorType for FakeBus {
        type Error = ErrorKind;
    }

    impl I2c for FakeBus {
        async fn transaction(
            &mut self,
            _address: u8,
            operations: &mut [Operation<'_>],
        ) -> Result<(), Self::Error> {
            if self.absent {
                return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
            }
            for operation in operations {
                match operation {
                    Operation::Write(bytes) => self.writes.push(bytes.to_vec()),
                    Operation::Read(buffer) => {
                        let frame = self.responses.pop_front().ok_or(ErrorKind::Other)?;
                        buffer.copy_from_slice(&frame[..buffer.len()]);
                    }
                }
            }
            Ok(())
        }
    }

    fn sensor(bus: FakeBus) -> MultiGasSensor<FakeBus, FakeClock> {
        MultiGasSensor::new(bus, FakeClock::new())
    }

    #[test]
    fn request_frames_carry_a_valid_checksum() {
        let frame = request_frame(CMD_CHANGE_ACQUIRE_MODE, [0x04, 0, 0, 0, 0]);
        assert_eq!(frame[..3], [0xFF, 0x01, 0x78]);
        // 0x01 + 0x78 + 0x04 = 0x7D, two's complement = 0x83
        assert_eq!(frame[8], 0x83);
        assert_eq!(checksum(&frame), frame[8]);
    }

    #[test]
    fn connect_switches_to_passive_mode() {
        let mut bus = FakeBus::default();
        bus.respond(CMD_CHANGE_ACQUIRE_MODE, [1, 0, 0, 0, 0, 0]);
        let mut sensor = sensor(bus);

        assert_eq!(block_on(sensor.connect()), Ok(()));

        let request = &sensor.i2c.writes[0];
        assert_eq!(request[0], DATA_REGISTER);
        assert_eq!(request[1..4], [0xFF, 0x01, CMD_CHANGE_ACQUIRE_MODE]);
        assert_eq!(request[4], AcquireMode::Passive as u8);
    }

    #[test]
    fn connect_fails_when_nothing_answers() {
        let mut sensor = sensor(FakeBus {
            absent: true,
            ..FakeBus::default()
        });

        assert!(matches!(
            block_on(sensor.connect()),
            Err(SensorError::NotConnected { .. })
        ));
    }

    #[test]
    fn rejected_mode_change_is_an_error() {
        let mut bus = FakeBus::default();
        bus.respond(CMD_CHANGE_ACQUIRE_MODE, [0, 0, 0, 0, 0, 0]);
        let mut sensor = sensor(bus);

        assert!(block_on(sensor.set_acquire_mode(AcquireMode::Passive)).is_err());
    }

    #[test]
    fn concentration_honours_decimal_places() {
        let mut bus = FakeBus::default();
        // 1234 with two decimals
        bus.respond(CMD_GAS_CONCENTRATION, [0x04, 0xD2, 0x03, 0x02, 0, 0]);
        // 57 with one decimal
        bus.respond(CMD_GAS_CONCENTRATION, [0x00, 0x39, 0x03, 0x01, 0, 0]);
        // 9 with no decimals
        bus.respond(CMD_GAS_CONCENTRATION, [0x00, 0x09, 0x03, 0x00, 0, 0]);
        let mut sensor = sensor(bus);

        let first = block_on(sensor.read_concentration()).unwrap();
        let second = block_on(sensor.read_concentration()).unwrap();
        let third = block_on(sensor.read_concentration()).unwrap();

        assert!((first - 12.34).abs() < 1e-4);
        assert!((second - 5.7).abs() < 1e-4);
        assert_eq!(third, 9.0);
    }

    #[test]
    fn temperature_at_nominal_resistance_is_25c() {
        let mut bus = FakeBus::default();
        // 512 counts = 1.5 V = 10 kOhm
        bus.respond(CMD_TEMPERATURE_ADC, [0x02, 0x00, 0, 0, 0, 0]);
        let mut sensor = sensor(bus);

        let temperature = block_on(sensor.read_temperature()).unwrap();
        assert!((temperature - 25.0).abs() < 0.01, "{temperature}");
    }

    #[test]
    fn temperature_at_the_rails_is_nan() {
        let mut zero = [0u8; FRAME_LEN];
        zero[1] = CMD_TEMPERATURE_ADC;
        zero[8] = checksum(&zero);
        assert!(decode_temperature(&zero).is_nan());

        let mut full = [0u8; FRAME_LEN];
        full[2] = 0x04;
        full[8] = checksum(&full);
        assert!(decode_temperature(&full).is_nan());
    }

    #[test]
    fn corrupted_frame_is_reported() {
        let mut bus = FakeBus::default();
        bus.respond(CMD_GAS_CONCENTRATION, [0x00, 0x10, 0x03, 0x00, 0, 0]);
        bus.responses[0][3] ^= 0xFF;
        let mut sensor = sensor(bus);

        assert!(matches!(
            block_on(sensor.read_concentration()),
            Err(SensorError::Checksum { .. })
        ));
    }

    #[test]
    fn read_returns_both_channels_in_order() {
        let mut bus = FakeBus::default();
        bus.respond(CMD_GAS_CONCENTRATION, [0x00, 0x2A, 0x03, 0x00, 0, 0]);
        bus.respond(CMD_TEMPERATURE_ADC, [0x02, 0x00, 0, 0, 0, 0]);
        let mut sensor = sensor(bus);

        let values = block_on(sensor.read()).unwrap().to_array();
        assert_eq!(values[crate::config::H2S], 42.0);
        assert!((values[crate::config::TEMPERATURE] - 25.0).abs() < 0.01);
    }
}
