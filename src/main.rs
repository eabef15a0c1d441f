//! Lector - 网页文章 TTS 朗读服务
//!
//! 单进程守护：控制器、阅读页传输和 HTTP/WebSocket 服务运行在同一个 tokio 运行时中

use std::sync::Arc;

use lector::application::playback::AudioPlaybackEngine;
use lector::application::ports::{AudioOutputPort, SpeechSynthesizerPort};
use lector::application::reading::{ControllerConfig, ReadingSessionController};
use lector::application::transport::SessionTransport;
use lector::config::{load_config, print_config, AppConfig, OutputDevice, TtsProvider};
use lector::infrastructure::adapters::audio::{NullOutput, SymphoniaDecoder};
use lector::infrastructure::adapters::tts::{
    FakeSpeechClient, HttpSpeechClient, HttpSpeechClientConfig,
};
use lector::infrastructure::events::EventPublisher;
use lector::infrastructure::http::{AppState, HttpServer, ServerConfig};
use lector::infrastructure::persistence::sled::{SledSettingsConfig, SledSettingsStore};

fn init_tracing(config: &AppConfig) {
    let log_filter = format!(
        "{},lector={},tower_http=debug",
        config.log.level, config.log.level
    );
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter));

    if config.log.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn build_synthesizer(config: &AppConfig) -> anyhow::Result<Arc<dyn SpeechSynthesizerPort>> {
    match config.tts.provider {
        TtsProvider::Http => {
            let tts_config = HttpSpeechClientConfig {
                base_url: config.tts.url.clone(),
                timeout_secs: config.tts.timeout_secs,
                output_format: config.tts.format.clone(),
            };
            let client = HttpSpeechClient::new(tts_config)
                .map_err(|e| anyhow::anyhow!("Failed to create TTS client: {}", e))?;
            Ok(Arc::new(client))
        }
        TtsProvider::Fake => {
            tracing::warn!("Using fake TTS provider, audio will be silence");
            Ok(Arc::new(FakeSpeechClient::default()))
        }
    }
}

fn build_output(config: &AppConfig) -> Arc<dyn AudioOutputPort> {
    match config.playback.output {
        OutputDevice::Null => Arc::new(NullOutput::default()),
        #[cfg(feature = "speaker")]
        OutputDevice::Speaker => {
            Arc::new(lector::infrastructure::adapters::audio::RodioOutput::new())
        }
        #[cfg(not(feature = "speaker"))]
        OutputDevice::Speaker => {
            tracing::warn!("Built without `speaker` feature, falling back to null output");
            Arc::new(NullOutput::default())
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = load_config().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    init_tracing(&config);
    tracing::info!("Lector - web article reader (v{})", env!("CARGO_PKG_VERSION"));
    print_config(&config);

    // 确保设置目录存在
    if let Some(parent) = std::path::Path::new(&config.settings.path).parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let synthesizer = build_synthesizer(&config)?;
    let output = build_output(&config);
    let engine = Arc::new(AudioPlaybackEngine::new(
        Arc::new(SymphoniaDecoder::new()),
        output,
    ));
    tracing::info!(output = engine.output_name(), "Audio playback engine ready");

    let settings = Arc::new(
        SledSettingsStore::new(&SledSettingsConfig {
            db_path: config.settings.path.clone(),
        })
        .map_err(|e| anyhow::anyhow!("Failed to open settings store: {}", e))?,
    );

    let event_publisher = Arc::new(EventPublisher::new());

    let controller = Arc::new(ReadingSessionController::new(
        synthesizer.clone(),
        engine,
        event_publisher.clone(),
        settings.clone(),
        ControllerConfig {
            pacing_delay: config.playback.pacing_delay(),
            segment: config.reader.segment_config(),
        },
    ));

    let transport = Arc::new(SessionTransport::new(
        controller.clone(),
        event_publisher.clone(),
        settings.clone(),
        config.reader.retry_policy(),
    ));

    let state = AppState::new(transport, event_publisher, settings, synthesizer);

    let server_config = ServerConfig::new(config.server.host.clone(), config.server.port);
    let server = HttpServer::new(server_config, state);

    tracing::info!("Server ready, reader socket at ws://{}/ws/reader", config.server.addr());

    server
        .run_with_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
            tracing::info!("Shutdown signal received");
        })
        .await?;

    controller.shutdown().await;
    tracing::info!("Lector stopped");
    Ok(())
}
