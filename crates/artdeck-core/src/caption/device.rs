//! Compute device and numeric precision for the caption model.

use std::path::Path;

/// Where inference runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Gpu,
    Cpu,
}

/// Numeric precision of model weights and caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    /// fp16
    Half,
    /// fp32
    Full,
}

/// Device and precision chosen once before the captioning loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceSelection {
    pub device: Device,
    pub precision: Precision,
}

impl DeviceSelection {
    /// GPU with half precision when one is available and not forced off;
    /// otherwise CPU with full precision.
    pub fn select(force_cpu: bool, gpu_available: bool) -> Self {
        if gpu_available && !force_cpu {
            Self {
                device: Device::Gpu,
                precision: Precision::Half,
            }
        } else {
            Self {
                device: Device::Cpu,
                precision: Precision::Full,
            }
        }
    }

    /// Probe the machine and select.
    pub fn detect(force_cpu: bool) -> Self {
        let gpu = gpu_available();
        let selection = Self::select(force_cpu, gpu);
        tracing::info!(
            "Device: {:?} ({:?} precision){}",
            selection.device,
            selection.precision,
            if force_cpu && gpu { ", GPU present but forced off" } else { "" }
        );
        selection
    }

    pub fn is_gpu(&self) -> bool {
        self.device == Device::Gpu
    }
}

/// Best-effort GPU probe: NVIDIA device nodes on Linux, Metal on macOS.
pub fn gpu_available() -> bool {
    if cfg!(target_os = "macos") {
        return true;
    }
    ["/dev/nvidia0", "/proc/driver/nvidia/version", "/dev/dxg"]
        .iter()
        .any(|p| Path::new(p).exists())
}
