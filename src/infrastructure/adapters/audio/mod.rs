//! Audio Adapters - 解码器与输出设备实现

mod null_output;
#[cfg(feature = "speaker")]
mod rodio_output;
mod symphonia_decoder;
mod wav;

pub use null_output::{NullOutput, NullOutputConfig};
#[cfg(feature = "speaker")]
pub use rodio_output::RodioOutput;
pub use symphonia_decoder::SymphoniaDecoder;
pub use wav::{encode_wav, silence_wav};
