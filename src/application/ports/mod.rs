//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod audio_output;
mod reader_events;
mod settings_store;
mod speech_synthesizer;

pub use audio_output::{
    AudioDecoderPort, AudioError, AudioOutputPort, ContextState, DecodedAudio, OutputContext,
    PlaybackNode,
};
pub use reader_events::{ReaderEvent, ReaderEventPort, TransportError};
pub use settings_store::{ReaderSettings, SettingsError, SettingsStorePort};
pub use speech_synthesizer::{
    SpeechSynthesizerPort, StreamEvent, StreamHandle, StreamSender, SynthesisError,
    SynthesisRequest, SynthesisSlot,
};
