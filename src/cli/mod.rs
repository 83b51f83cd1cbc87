use burn::backend::{ndarray::NdArrayDevice, Autodiff, NdArray};

/// Available pipelines
pub mod pipelines;

pub use pipelines::{Pipeline, PipelineError};

/// Backend used for evaluation and export
pub type Backend = NdArray;

/// Backend used for training
pub type TrainingBackend = Autodiff<NdArray>;

/// The device every command runs on
pub fn device() -> NdArrayDevice {
    NdArrayDevice::Cpu
}

/// Log at `info` unless `RUST_LOG` says otherwise
pub fn init_logging() {
    pretty_env_logger::formatted_builder()
        .filter_level(log::LevelFilter::Info)
        .parse_env("RUST_LOG")
        .init();
}
