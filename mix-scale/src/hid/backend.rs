//! HID device access
//!
//! The driver only sees [`HidBackend`] and [`HidReportReader`]. The real
//! backend wraps `hidapi` and is compiled with the `hid` feature; without it
//! every call reports [`ScaleError::BackendUnavailable`].

use std::sync::Arc;

use crate::error::{ScaleError, ScaleResult};

/// Enumerated HID device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HidDeviceInfo {
    pub path: String,
    pub vendor_id: u16,
    pub product_id: u16,
    pub usage_page: u16,
    pub usage: u16,
    pub product: Option<String>,
}

/// An open device handle
pub trait HidReportReader: Send {
    /// Blocking read of one input report. Returns `Ok(0)` on timeout.
    fn read_report(&mut self, buf: &mut [u8], timeout_ms: i32) -> ScaleResult<usize>;
}

/// Device enumeration and opening
pub trait HidBackend: Send + Sync {
    fn enumerate(&self) -> ScaleResult<Vec<HidDeviceInfo>>;

    fn open(&self, device: &HidDeviceInfo) -> ScaleResult<Box<dyn HidReportReader>>;
}

/// Backend used when no HID library can be loaded
#[derive(Debug, Clone)]
pub struct UnavailableBackend {
    reason: String,
}

impl UnavailableBackend {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl HidBackend for UnavailableBackend {
    fn enumerate(&self) -> ScaleResult<Vec<HidDeviceInfo>> {
        Err(ScaleError::BackendUnavailable(self.reason.clone()))
    }

    fn open(&self, _device: &HidDeviceInfo) -> ScaleResult<Box<dyn HidReportReader>> {
        Err(ScaleError::BackendUnavailable(self.reason.clone()))
    }
}

/// Platform backend, or [`UnavailableBackend`] if it cannot start
pub fn default_backend() -> Arc<dyn HidBackend> {
    #[cfg(feature = "hid")]
    {
        match hidapi_backend::HidApiBackend::new() {
            Ok(backend) => Arc::new(backend),
            Err(e) => {
                tracing::warn!(error = %e, "HID library failed to initialise");
                Arc::new(UnavailableBackend::new(e.to_string()))
            }
        }
    }
    #[cfg(not(feature = "hid"))]
    {
        Arc::new(UnavailableBackend::new(
            "built without the `hid` feature",
        ))
    }
}

#[cfg(feature = "hid")]
pub use hidapi_backend::HidApiBackend;

#[cfg(feature = "hid")]
mod hidapi_backend {
    use std::ffi::CString;

    use hidapi::{HidApi, HidDevice};
    use parking_lot::Mutex;

    use super::{HidBackend, HidDeviceInfo, HidReportReader};
    use crate::error::{ScaleError, ScaleResult};

    /// `hidapi` backed device access
    pub struct HidApiBackend {
        api: Mutex<HidApi>,
    }

    impl HidApiBackend {
        pub fn new() -> ScaleResult<Self> {
            let api = HidApi::new().map_err(|e| ScaleError::BackendUnavailable(e.to_string()))?;
            Ok(Self {
                api: Mutex::new(api),
            })
        }
    }

    impl HidBackend for HidApiBackend {
        fn enumerate(&self) -> ScaleResult<Vec<HidDeviceInfo>> {
            let mut api = self.api.lock();
            api.refresh_devices()
                .map_err(|e| ScaleError::Device(e.to_string()))?;
            Ok(api
                .device_list()
                .map(|d| HidDeviceInfo {
                    path: d.path().to_string_lossy().into_owned(),
                    vendor_id: d.vendor_id(),
                    product_id: d.product_id(),
                    usage_page: d.usage_page(),
                    usage: d.usage(),
                    product: d.product_string().map(str::to_string),
                })
                .collect())
        }

        fn open(&self, device: &HidDeviceInfo) -> ScaleResult<Box<dyn HidReportReader>> {
            let path = CString::new(device.path.clone())
                .map_err(|e| ScaleError::Device(format!("invalid device path: {e}")))?;
            let handle = self.api.lock().open_path(&path).map_err(|e| ScaleError::Open {
                port: device.path.clone(),
                message: e.to_string(),
            })?;
            Ok(Box::new(HidApiReader { device: handle }))
        }
    }

    struct HidApiReader {
        device: HidDevice,
    }

    impl HidReportReader for HidApiReader {
        fn read_report(&mut self, buf: &mut [u8], timeout_ms: i32) -> ScaleResult<usize> {
            self.device
                .read_timeout(buf, timeout_ms)
                .map_err(|e| ScaleError::Device(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_backend_reports_reason() {
        let backend = UnavailableBackend::new("no hidapi");
        match backend.enumerate() {
            Err(ScaleError::BackendUnavailable(reason)) => assert_eq!(reason, "no hidapi"),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
