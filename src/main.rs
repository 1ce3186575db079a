//! SceneVoice - 游戏截图角色配音
//!
//! 启动时按配置组装唯一的提供方实例，之后按子命令运行：
//! - image: 单张截图
//! - listen: 交互模式（全局热键）
//! - clear-cache / voices: 维护命令

use anyhow::{anyhow, bail, Context};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use scenevoice::application::{
    AssignmentEngine, ClearCacheHandler, ClearProviderCache, OutputTarget, ProviderLocks,
    SpeakImage, SpeakImageHandler, SpeakOutcome, TtsProviderPort, VoicePoolStore,
};
use scenevoice::cli::{Cli, Commands};
use scenevoice::config::{load_config_from_path, print_config, AppConfig, LogConfig};
use scenevoice::domain::voice::{ProviderKind, VoiceFilter, VoiceId};
use scenevoice::infrastructure::adapters::{
    build_provider, CommandScreenCapture, FileStateStorage, GeminiImageAnalyzer,
    GeminiImageAnalyzerConfig, RodioAudioOutput,
};
use scenevoice::infrastructure::persistence::{JsonLedgerRepository, JsonVoicePoolRepository};
use scenevoice::infrastructure::worker::{
    parse_key, spawn_hotkey_source, CapturePipeline, HotkeyBindings, InteractiveListener,
    ListenerConfig,
};

fn init_tracing(log: &LogConfig) {
    let log_filter = format!("{},scenevoice={}", log.level, log.level);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter));

    if log.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// 会话内共享的服务
struct Services {
    provider: Arc<dyn TtsProviderPort>,
    pool_store: Arc<VoicePoolStore>,
    engine: Arc<AssignmentEngine>,
    clear_cache: ClearCacheHandler,
}

impl Services {
    async fn build(config: &AppConfig) -> anyhow::Result<Self> {
        let storage = Arc::new(
            FileStateStorage::new(&config.storage.data_dir)
                .await
                .context("Failed to open data directory")?,
        );
        let ledger_repo = Arc::new(JsonLedgerRepository::new(storage.clone()));
        let pool_repo = Arc::new(JsonVoicePoolRepository::new(storage));

        let provider = build_provider(config)?;
        let pool_store = Arc::new(VoicePoolStore::new(
            provider.clone(),
            pool_repo,
            VoiceFilter::new(config.voices.filter.iter()),
        ));
        let locks = Arc::new(ProviderLocks::new());
        let fallback_voice = VoiceId::new(config.fallback_voice_id())?;

        let engine = Arc::new(AssignmentEngine::new(
            pool_store.clone(),
            ledger_repo.clone(),
            locks.clone(),
            fallback_voice,
        ));
        let clear_cache = ClearCacheHandler::new(ledger_repo, pool_store.clone(), locks);

        Ok(Self {
            provider,
            pool_store,
            engine,
            clear_cache,
        })
    }

    fn kind(&self) -> ProviderKind {
        self.provider.kind()
    }

    async fn clear(&self) -> anyhow::Result<()> {
        let response = self
            .clear_cache
            .handle(ClearProviderCache {
                provider: self.kind(),
            })
            .await?;
        tracing::info!(
            provider = %self.kind(),
            ledger_removed = response.ledger_removed,
            pool_removed = response.pool_removed,
            "Cache cleared"
        );
        Ok(())
    }

    fn speaker(&self, config: &AppConfig) -> anyhow::Result<Arc<SpeakImageHandler>> {
        let api_key = config
            .analyzer_api_key()
            .ok_or_else(|| anyhow!("Analyzer API key is not set"))?;
        let analyzer = GeminiImageAnalyzer::new(GeminiImageAnalyzerConfig {
            model: config.analyzer.model.clone(),
            timeout_secs: config.analyzer.timeout_secs,
            max_image_height: config.analyzer.max_image_height,
            ..GeminiImageAnalyzerConfig::new(api_key)
        })?;

        Ok(Arc::new(SpeakImageHandler::new(
            Arc::new(analyzer),
            self.engine.clone(),
            self.provider.clone(),
            Arc::new(RodioAudioOutput::new()),
        )))
    }
}

/// Ctrl-C 取消令牌
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for ctrl-c");
            return;
        }
        tracing::info!("Received shutdown signal");
        token.cancel();
    });
    cancel
}

fn output_target(path: PathBuf) -> OutputTarget {
    if path.is_dir() {
        OutputTarget::Directory(path)
    } else {
        OutputTarget::File(path)
    }
}

async fn run_image(
    config: &AppConfig,
    services: &Services,
    path: &Path,
    output: Option<PathBuf>,
    play: bool,
) -> anyhow::Result<()> {
    let image = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read image {}", path.display()))?;
    tracing::info!(path = ?path, image_size = image.len(), "Image loaded");

    let speaker = services.speaker(config)?;
    let cancel = cancel_on_ctrl_c();
    let command = SpeakImage {
        image,
        context_hint: config.analyzer.game_hint.clone(),
        output: output.map(output_target),
        play,
    };

    match speaker.handle(command, &cancel).await {
        SpeakOutcome::Spoken {
            character,
            voice_id,
            saved_to,
            ..
        } => {
            println!("{} ({})", character, voice_id);
            if let Some(path) = saved_to {
                println!("Saved to {}", path.display());
            }
            Ok(())
        }
        SpeakOutcome::NoDialogue {
            character,
            voice_id,
        } => {
            println!("{} ({}): no dialogue found", character, voice_id);
            Ok(())
        }
        SpeakOutcome::Abandoned { stage, reason } => {
            bail!("Failed while {}: {}", stage, reason)
        }
        SpeakOutcome::Cancelled { .. } => {
            tracing::info!("Cancelled");
            Ok(())
        }
    }
}

async fn run_listen(config: &AppConfig, services: &Services) -> anyhow::Result<()> {
    let interactive = &config.interactive;
    let trigger = parse_key(&interactive.trigger_key)
        .ok_or_else(|| anyhow!("Unknown trigger key: {}", interactive.trigger_key))?;
    let exit = parse_key(&interactive.exit_key)
        .ok_or_else(|| anyhow!("Unknown exit key: {}", interactive.exit_key))?;

    let capture = Arc::new(CommandScreenCapture::new(&interactive.capture_command)?);
    let pipeline = Arc::new(CapturePipeline::new(
        capture,
        services.speaker(config)?,
        config.analyzer.game_hint.clone(),
        interactive.save_dir.clone(),
    ));

    let (events_tx, events_rx) = InteractiveListener::channel();
    spawn_hotkey_source(HotkeyBindings { trigger, exit }, events_tx)
        .context("Failed to start hotkey listener")?;

    println!(
        "Press {} to speak the current screen, {} to exit",
        interactive.trigger_key, interactive.exit_key
    );

    let listener = InteractiveListener::new(
        ListenerConfig::default(),
        pipeline,
        events_rx,
        cancel_on_ctrl_c(),
    );
    listener.run().await;
    Ok(())
}

async fn run_voices(services: &Services) -> anyhow::Result<()> {
    let pool = services.pool_store.load_pool(services.kind()).await?;
    println!(
        "{} voices ({}), fetched {}:",
        pool.len(),
        services.kind(),
        pool.fetched_at().format("%Y-%m-%d %H:%M:%S UTC")
    );
    for voice in pool.voices() {
        println!("  {:<32} {:<24} {}", voice.id().as_str(), voice.name(), voice.gender());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = load_config_from_path(cli.config.as_deref())
        .map_err(|e| anyhow!("Failed to load config: {}", e))?;

    init_tracing(&config.log);
    print_config(&config);

    let services = Services::build(&config).await?;

    if cli.command.clear_cache_first() {
        services.clear().await?;
    }

    match cli.command {
        Commands::Image {
            path,
            output,
            no_play,
            ..
        } => run_image(&config, &services, &path, output, !no_play).await?,
        Commands::Listen { .. } => run_listen(&config, &services).await?,
        Commands::ClearCache => {}
        Commands::Voices => run_voices(&services).await?,
    }

    Ok(())
}
