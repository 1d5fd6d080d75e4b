//! Serial port access

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_serial::{DataBits, FlowControl, Parity, SerialStream, StopBits};

use crate::error::{ScaleError, ScaleResult};

/// A bidirectional byte link to a scale
pub trait SerialLink: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> SerialLink for T {}

/// Port name and line speed (always 8-N-1)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialSettings {
    pub port: String,
    pub baud_rate: u32,
}

/// Opens serial links
#[async_trait]
pub trait SerialOpener: Send + Sync {
    async fn open(&self, settings: &SerialSettings) -> ScaleResult<Box<dyn SerialLink>>;

    fn list_ports(&self) -> ScaleResult<Vec<String>>;
}

/// Real ports via `tokio-serial`
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSerialOpener;

#[async_trait]
impl SerialOpener for TokioSerialOpener {
    async fn open(&self, settings: &SerialSettings) -> ScaleResult<Box<dyn SerialLink>> {
        let builder = tokio_serial::new(&settings.port, settings.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None);

        let stream = SerialStream::open(&builder).map_err(|e| ScaleError::Open {
            port: settings.port.clone(),
            message: e.to_string(),
        })?;
        Ok(Box::new(stream))
    }

    fn list_ports(&self) -> ScaleResult<Vec<String>> {
        let ports = tokio_serial::available_ports()
            .map_err(|e| ScaleError::Device(e.to_string()))?;
        Ok(ports.into_iter().map(|p| p.port_name).collect())
    }
}
