//! Interactive Listener - 交互模式事件循环
//!
//! 前端只做事件分发：每次触发作为独立任务运行，事件循环始终可以观察到关闭信号。
//! 同一时刻只允许一次运行，忙碌时的触发直接丢弃

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use super::CapturePipeline;
use crate::application::commands::handlers::{PipelineState, SpeakOutcome};

/// 事件队列容量
pub const EVENT_QUEUE_CAPACITY: usize = 16;

/// 监听器事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerEvent {
    Trigger,
    Shutdown,
}

/// 监听器配置
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// 关闭时等待在途运行结束的时间
    pub shutdown_grace: Duration,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

/// 运行统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerStats {
    pub triggers: usize,
    pub started: usize,
    pub dropped: usize,
    pub spoken: usize,
    pub failed: usize,
}

/// 交互模式监听器
pub struct InteractiveListener {
    config: ListenerConfig,
    pipeline: Arc<CapturePipeline>,
    events: mpsc::Receiver<ListenerEvent>,
    cancel: CancellationToken,
    busy: Arc<Semaphore>,
}

impl InteractiveListener {
    pub fn new(
        config: ListenerConfig,
        pipeline: Arc<CapturePipeline>,
        events: mpsc::Receiver<ListenerEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            pipeline,
            events,
            cancel,
            busy: Arc::new(Semaphore::new(1)),
        }
    }

    /// 创建事件通道
    pub fn channel() -> (mpsc::Sender<ListenerEvent>, mpsc::Receiver<ListenerEvent>) {
        mpsc::channel(EVENT_QUEUE_CAPACITY)
    }

    /// 运行事件循环，直到收到关闭事件、令牌被取消或所有发送端关闭
    pub async fn run(mut self) -> ListenerStats {
        tracing::info!("Interactive listener started");

        let mut stats = ListenerStats::default();
        let mut runs: JoinSet<SpeakOutcome> = JoinSet::new();

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    tracing::info!("Cancellation requested, stopping listener");
                    break;
                }
                event = self.events.recv() => match event {
                    Some(ListenerEvent::Trigger) => {
                        stats.triggers += 1;
                        self.on_trigger(&mut runs, &mut stats);
                    }
                    Some(ListenerEvent::Shutdown) => {
                        tracing::info!("Shutdown key pressed, stopping listener");
                        break;
                    }
                    None => {
                        tracing::info!("Event sources closed, stopping listener");
                        break;
                    }
                },
                Some(joined) = runs.join_next(), if !runs.is_empty() => {
                    record(joined, &mut stats);
                }
            }
        }

        self.shutdown(runs, &mut stats).await;

        tracing::info!(
            triggers = stats.triggers,
            started = stats.started,
            dropped = stats.dropped,
            spoken = stats.spoken,
            failed = stats.failed,
            "Interactive listener stopped"
        );
        stats
    }

    fn on_trigger(&self, runs: &mut JoinSet<SpeakOutcome>, stats: &mut ListenerStats) {
        let permit = match self.busy.clone().try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                stats.dropped += 1;
                tracing::info!("Trigger ignored, already processing");
                return;
            }
        };

        stats.started += 1;
        tracing::info!("Trigger received, starting capture");

        let pipeline = self.pipeline.clone();
        let cancel = self.cancel.clone();
        runs.spawn(async move {
            // permit 在运行结束时释放
            let _permit = permit;
            pipeline.run_once(&cancel).await
        });
    }

    async fn shutdown(&self, mut runs: JoinSet<SpeakOutcome>, stats: &mut ListenerStats) {
        self.cancel.cancel();
        self.pipeline.speaker().set_state(PipelineState::ShuttingDown);

        if runs.is_empty() {
            return;
        }

        tracing::info!(
            in_flight = runs.len(),
            grace_secs = self.config.shutdown_grace.as_secs_f32(),
            "Waiting for in-flight runs"
        );

        let drained = tokio::time::timeout(self.config.shutdown_grace, async {
            while let Some(joined) = runs.join_next().await {
                record(joined, stats);
            }
        })
        .await;

        if drained.is_err() {
            tracing::warn!(
                remaining = runs.len(),
                "In-flight runs did not finish in time, aborting"
            );
            runs.abort_all();
        }
    }
}

fn record(joined: Result<SpeakOutcome, tokio::task::JoinError>, stats: &mut ListenerStats) {
    match joined {
        Ok(SpeakOutcome::Spoken { .. }) | Ok(SpeakOutcome::NoDialogue { .. }) => {
            stats.spoken += 1;
        }
        Ok(SpeakOutcome::Abandoned { stage, reason }) => {
            stats.failed += 1;
            tracing::warn!(stage = %stage, reason = %reason, "Run abandoned");
        }
        Ok(SpeakOutcome::Cancelled { stage }) => {
            tracing::debug!(stage = %stage, "Run cancelled");
        }
        Err(e) => {
            stats.failed += 1;
            tracing::error!(error = %e, "Pipeline task panicked");
        }
    }
}
