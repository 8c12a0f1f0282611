use std::env;
use std::sync::OnceLock;

use burn::backend::Autodiff;
use burn::backend::ndarray::{NdArray, NdArrayDevice};
#[cfg(target_os = "macos")]
use burn::backend::wgpu::{self, WgpuDevice, graphics::Metal};
#[cfg(not(target_os = "macos"))]
use burn::backend::wgpu::{self, WgpuDevice, graphics::Vulkan};
#[cfg(feature = "digits-cuda")]
use burn::backend::{Cuda, cuda::CudaDevice};
use burn::module::AutodiffModule;
use burn::tensor::backend::AutodiffBackend;
use tracing::{info, warn};

use super::DigitsError;
use super::data::{DigitImage, LabelledImages};
use super::train::{TrainOptions, TrainReport, predict, train};
use crate::config::DigitsBackend;

/// Environment override for the configured backend.
pub const BACKEND_ENV: &str = "COMPKIT_DIGITS_BACKEND";

type CpuBackend = Autodiff<NdArray>;
type WgpuBackend = Autodiff<wgpu::Wgpu>;
#[cfg(feature = "digits-cuda")]
type CudaBackend = Autodiff<Cuda>;

static WGPU_INIT: OnceLock<()> = OnceLock::new();

/// Backend from `COMPKIT_DIGITS_BACKEND` when set, otherwise `configured`.
pub fn resolve_backend(configured: DigitsBackend) -> DigitsBackend {
    let requested = env::var(BACKEND_ENV)
        .ok()
        .map(|value| value.trim().to_ascii_lowercase())
        .filter(|value| !value.is_empty());
    match requested.as_deref() {
        None => configured,
        Some(name) => DigitsBackend::parse(name).unwrap_or_else(|| {
            warn!("Unknown digits backend '{name}', using {configured:?}.");
            configured
        }),
    }
}

fn init_wgpu(device: &WgpuDevice) {
    WGPU_INIT.get_or_init(|| {
        #[cfg(target_os = "macos")]
        wgpu::init_setup::<Metal>(device, Default::default());
        #[cfg(not(target_os = "macos"))]
        wgpu::init_setup::<Vulkan>(device, Default::default());
    });
}

/// Train on the chosen backend, then label `test` with the final model.
pub(super) fn train_and_predict(
    backend: DigitsBackend,
    train_set: &LabelledImages,
    val_set: &LabelledImages,
    test: &[DigitImage],
    options: &TrainOptions,
) -> Result<(TrainReport, Vec<u8>), DigitsError> {
    info!("Training digit classifier on {backend:?}");
    match backend {
        DigitsBackend::Cpu => {
            run_on::<CpuBackend>(&NdArrayDevice::Cpu, train_set, val_set, test, options)
        }
        DigitsBackend::Wgpu => {
            let device = WgpuDevice::default();
            init_wgpu(&device);
            run_on::<WgpuBackend>(&device, train_set, val_set, test, options)
        }
        #[cfg(feature = "digits-cuda")]
        DigitsBackend::Cuda => {
            run_on::<CudaBackend>(&CudaDevice::default(), train_set, val_set, test, options)
        }
    }
}

fn run_on<B: AutodiffBackend>(
    device: &B::Device,
    train_set: &LabelledImages,
    val_set: &LabelledImages,
    test: &[DigitImage],
    options: &TrainOptions,
) -> Result<(TrainReport, Vec<u8>), DigitsError> {
    let (model, report) = train::<B>(device, train_set, val_set, options)?;
    let labels = predict(&model.valid(), test, options.batch_size, device);
    Ok((report, labels))
}
