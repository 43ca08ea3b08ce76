//! Sensor-to-broker bridge.
//!
//! Readings from the SHTC3 and the ICM42688P are formatted into short text
//! payloads and handed to a [`Publisher`]. The MQTT client behind that trait
//! is supplied by the platform; its events come back through
//! [`SensorBridge::dispatch`].

use core::fmt::Write;

use embassy_time::{Duration, Ticker};
use embedded_hal::{delay::DelayNs, i2c::I2c, spi::SpiDevice};
use heapless::String;

use crate::utils::{
    config::BrokerConfig,
    controllers::{
        i2c::{Climate, Shtc3},
        spi::{Acceleration, Icm42688p},
    },
};

pub const TOPIC_TEMPERATURE: &str = "home/cke/sensors/temperature";
pub const TOPIC_HUMIDITY: &str = "home/cke/sensors/humidity";
pub const TOPIC_ACCELERATION: &str = "home/cke/sensors/acceleration";

/// Payload buffer; every message fits in 64 bytes.
pub type Payload = String<64>;

/// Something that can put a payload on a topic.
pub trait Publisher {
    type Error: core::fmt::Debug;

    fn publish(
        &mut self,
        topic: &str,
        payload: &str,
    ) -> Result<(), Self::Error>;
}

/// Events reported by the broker client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerEvent {
    Connected,
    Disconnected,
    Published { msg_id: u32 },
    Error,
}

#[derive(Debug)]
pub enum BridgeError<E: core::fmt::Debug> {
    Publish(E),
    /// The payload did not fit in [`Payload`].
    Format,
}

/// Two decimals, e.g. `21.37`.
pub fn scalar_payload(value: f32) -> Result<Payload, core::fmt::Error> {
    let mut p = Payload::new();
    write!(p, "{:.2}", value)?;
    Ok(p)
}

/// `{"x":0.012,"y":-0.003,"z":0.998}`
pub fn accel_payload(a: &Acceleration) -> Result<Payload, core::fmt::Error> {
    let mut p = Payload::new();
    write!(p, "{{\"x\":{:.3},\"y\":{:.3},\"z\":{:.3}}}", a.x, a.y, a.z)?;
    Ok(p)
}

pub struct SensorBridge<P> {
    publisher: P,
    connected: bool,
    acked: u32,
}

impl<P: Publisher> SensorBridge<P> {
    pub fn new(publisher: P) -> Self {
        Self {
            publisher,
            connected: false,
            acked: 0,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Messages the broker confirmed.
    pub fn acked(&self) -> u32 {
        self.acked
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    /// Handle one broker client event.
    pub fn dispatch(
        &mut self,
        event: BrokerEvent,
    ) {
        match event {
            BrokerEvent::Connected => {
                self.connected = true;
                tracing::info!("broker connected");
            }
            BrokerEvent::Disconnected => {
                self.connected = false;
                tracing::warn!("broker disconnected");
            }
            BrokerEvent::Published { msg_id } => {
                self.acked = self.acked.wrapping_add(1);
                tracing::info!(msg_id, "message published");
            }
            BrokerEvent::Error => tracing::error!("broker error"),
        }
    }

    pub fn publish_climate(
        &mut self,
        climate: &Climate,
    ) -> Result<(), BridgeError<P::Error>> {
        let temp = scalar_payload(climate.temperature).map_err(|_| BridgeError::Format)?;
        let hum = scalar_payload(climate.humidity).map_err(|_| BridgeError::Format)?;
        self.publisher
            .publish(TOPIC_TEMPERATURE, &temp)
            .map_err(BridgeError::Publish)?;
        self.publisher
            .publish(TOPIC_HUMIDITY, &hum)
            .map_err(BridgeError::Publish)?;
        tracing::info!(
            temperature = climate.temperature,
            humidity = climate.humidity,
            "climate published"
        );
        Ok(())
    }

    pub fn publish_accel(
        &mut self,
        accel: &Acceleration,
    ) -> Result<(), BridgeError<P::Error>> {
        let payload = accel_payload(accel).map_err(|_| BridgeError::Format)?;
        self.publisher
            .publish(TOPIC_ACCELERATION, &payload)
            .map_err(BridgeError::Publish)?;
        tracing::info!(x = accel.x, y = accel.y, z = accel.z, "acceleration published");
        Ok(())
    }

    /// Poll both sensors on a one-second ticker and publish each on its own
    /// period. Read and publish failures are logged and the loop carries on.
    pub async fn run<I2C, SPI, D>(
        &mut self,
        climate: &mut Shtc3<'_, I2C>,
        imu: &mut Icm42688p<SPI>,
        delay: &mut D,
        config: &BrokerConfig,
    ) -> !
    where
        I2C: I2c + 'static,
        SPI: SpiDevice,
        D: DelayNs,
    {
        let climate_every = config.climate_period_s.max(1);
        let motion_every = config.motion_period_s.max(1);
        let mut ticker = Ticker::every(Duration::from_secs(1));
        let mut second: u32 = 0;

        loop {
            if second % climate_every == 0 {
                match climate.read(delay) {
                    Ok(c) => {
                        if let Err(e) = self.publish_climate(&c) {
                            tracing::error!(?e, "climate publish failed");
                        }
                    }
                    Err(e) => tracing::error!(?e, "error reading SHTC3"),
                }
            }
            if second % motion_every == 0 {
                match imu.read_accel_g() {
                    Ok(a) => {
                        if let Err(e) = self.publish_accel(&a) {
                            tracing::error!(?e, "acceleration publish failed");
                        }
                    }
                    Err(e) => tracing::error!(?e, "error reading ICM42688P"),
                }
            }
            second = second.wrapping_add(1);
            ticker.next().await;
        }
    }
}
