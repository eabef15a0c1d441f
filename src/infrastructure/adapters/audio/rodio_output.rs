//! Rodio Output - 系统扬声器输出（feature = "speaker"）
//!
//! rodio 的 OutputStream 必须在创建它的线程上存活，
//! 因此每个上下文由一个专用线程持有输出流，节点通过 mixer 连接

use rodio::buffer::SamplesBuffer;
use rodio::mixer::Mixer;
use rodio::{OutputStreamBuilder, Sink};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use tokio::sync::oneshot;

use crate::application::ports::{
    AudioError, AudioOutputPort, ContextState, DecodedAudio, OutputContext, PlaybackNode,
};

/// 默认扬声器输出
#[derive(Debug, Default, Clone)]
pub struct RodioOutput;

impl RodioOutput {
    pub fn new() -> Self {
        Self
    }
}

impl AudioOutputPort for RodioOutput {
    fn name(&self) -> &'static str {
        "speaker"
    }

    fn open(&self) -> Result<Box<dyn OutputContext>, AudioError> {
        let (ready_tx, ready_rx) = mpsc::channel::<Result<Mixer, String>>();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        thread::Builder::new()
            .name("lector-audio".to_string())
            .spawn(move || match OutputStreamBuilder::open_default_stream() {
                Ok(mut stream) => {
                    stream.log_on_drop(false);
                    let _ = ready_tx.send(Ok(stream.mixer().clone()));
                    // 阻塞直到上下文关闭（或发送端被丢弃）
                    let _ = shutdown_rx.recv();
                    drop(stream);
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e.to_string()));
                }
            })
            .map_err(|e| AudioError::DeviceUnavailable(format!("audio thread: {}", e)))?;

        let mixer = ready_rx
            .recv()
            .map_err(|_| AudioError::DeviceUnavailable("audio thread exited".to_string()))?
            .map_err(AudioError::DeviceUnavailable)?;

        Ok(Box::new(RodioContext {
            mixer,
            shutdown: Mutex::new(Some(shutdown_tx)),
            closed: AtomicBool::new(false),
        }))
    }
}

struct RodioContext {
    mixer: Mixer,
    shutdown: Mutex<Option<mpsc::Sender<()>>>,
    closed: AtomicBool,
}

impl OutputContext for RodioContext {
    fn state(&self) -> ContextState {
        if self.closed.load(Ordering::SeqCst) {
            ContextState::Closed
        } else {
            ContextState::Running
        }
    }

    fn resume(&self) -> Result<(), AudioError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(AudioError::DeviceUnavailable("context closed".to_string()));
        }
        Ok(())
    }

    fn connect(&self, audio: DecodedAudio) -> Result<Box<dyn PlaybackNode>, AudioError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(AudioError::DeviceUnavailable("context closed".to_string()));
        }
        let sink = Sink::connect_new(&self.mixer);
        sink.pause();
        sink.append(SamplesBuffer::new(
            audio.channels,
            audio.sample_rate,
            audio.samples,
        ));
        Ok(Box::new(RodioNode {
            sink: Some(Arc::new(sink)),
            started: false,
            stopped: false,
        }))
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(tx) = self.shutdown.lock().unwrap_or_else(|p| p.into_inner()).take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for RodioContext {
    fn drop(&mut self) {
        self.close();
    }
}

struct RodioNode {
    sink: Option<Arc<Sink>>,
    started: bool,
    stopped: bool,
}

impl PlaybackNode for RodioNode {
    fn start(&mut self) -> Result<oneshot::Receiver<()>, AudioError> {
        if self.started {
            return Err(AudioError::Playback("node already started".to_string()));
        }
        let sink = self
            .sink
            .clone()
            .ok_or_else(|| AudioError::Playback("node disconnected".to_string()))?;
        self.started = true;

        let (tx, rx) = oneshot::channel();
        sink.play();
        thread::Builder::new()
            .name("lector-playback".to_string())
            .spawn(move || {
                sink.sleep_until_end();
                let _ = tx.send(());
            })
            .map_err(|e| AudioError::Playback(format!("playback thread: {}", e)))?;
        Ok(rx)
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        let sink = self.sink.as_ref().ok_or(AudioError::AlreadyStopped)?;
        if self.stopped || sink.empty() {
            return Err(AudioError::AlreadyStopped);
        }
        self.stopped = true;
        sink.stop();
        Ok(())
    }

    fn disconnect(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
    }
}
