use crate::models::RefreshReport;
use crate::refresher::RefreshJob;
use crate::schedule::Schedule;
use chrono::{DateTime, Utc};
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort, SpawnErr};
use serde::Serialize;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Owns the refresh timer and makes sure at most one refresh runs at a time
pub struct RefreshSupervisor;

/// State for the refresh supervisor
pub struct RefreshSupervisorState {
    job: Arc<dyn RefreshJob>,
    schedule: Schedule,
    run_on_start: bool,
    next_tick: Option<JoinHandle<()>>,
    /// Wall-clock time the pending tick was planned for
    next_target: Option<DateTime<Utc>>,
    stats: RefreshStats,
}

/// Messages the supervisor can handle
#[derive(Debug)]
pub enum RefreshSupervisorMessage {
    /// Scheduled trigger; re-arms the timer
    Tick,
    /// Out-of-band trigger; leaves the timer alone
    RefreshNow,
    /// A run finished, successfully or not
    RunFinished(std::result::Result<RefreshReport, String>),
    /// Get statistics about refresh runs
    GetStats(RpcReplyPort<RefreshStats>),
    /// Cancel the timer and stop
    Shutdown,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RefreshStats {
    pub runs_started: u64,
    pub runs_succeeded: u64,
    pub runs_failed: u64,
    pub overlaps_skipped: u64,
    pub running: bool,
    pub last_report: Option<RefreshReport>,
    pub last_error: Option<String>,
}

/// Arguments for starting the supervisor
pub struct RefreshSupervisorArgs {
    pub job: Arc<dyn RefreshJob>,
    pub schedule: Schedule,
    /// Fire once right after start, before the first scheduled tick
    pub run_on_start: bool,
}

impl RefreshSupervisor {
    pub async fn spawn_scheduled(
        args: RefreshSupervisorArgs,
    ) -> std::result::Result<ActorRef<RefreshSupervisorMessage>, SpawnErr> {
        let (actor_ref, _handle) = Actor::spawn(None, RefreshSupervisor, args).await?;
        info!("Refresh supervisor started");
        Ok(actor_ref)
    }

    fn start_run(myself: &ActorRef<RefreshSupervisorMessage>, state: &mut RefreshSupervisorState) {
        if state.stats.running {
            state.stats.overlaps_skipped += 1;
            warn!("Previous refresh still running, skipping this trigger");
            return;
        }

        state.stats.running = true;
        state.stats.runs_started += 1;
        info!(run = state.stats.runs_started, "Starting snapshot refresh");

        let job = state.job.clone();
        let myself = myself.clone();
        tokio::spawn(async move {
            // inner task so a panicking job still reports back
            let outcome = match tokio::spawn(async move { job.refresh().await }).await {
                Ok(result) => result.map_err(|e| e.to_string()),
                Err(e) => Err(format!("refresh task aborted: {}", e)),
            };
            if let Err(e) = myself.send_message(RefreshSupervisorMessage::RunFinished(outcome)) {
                debug!("Supervisor gone before run finished: {}", e);
            }
        });
    }

    fn arm_timer(myself: &ActorRef<RefreshSupervisorMessage>, state: &mut RefreshSupervisorState) {
        let now = Utc::now();
        let next = state.schedule.next_run_following(state.next_target, now);
        let delay = (next - now).to_std().unwrap_or_default();
        state.next_target = Some(next);
        info!(next_run = %next.to_rfc3339(), in_secs = delay.as_secs(), "Next refresh scheduled");

        if let Some(previous) = state.next_tick.take() {
            previous.abort();
        }

        let myself = myself.clone();
        state.next_tick = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = myself.send_message(RefreshSupervisorMessage::Tick);
        }));
    }
}

#[ractor::async_trait]
impl Actor for RefreshSupervisor {
    type Msg = RefreshSupervisorMessage;
    type State = RefreshSupervisorState;
    type Arguments = RefreshSupervisorArgs;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        info!(
            policy = ?args.schedule.policy(),
            period_secs = args.schedule.period().as_secs(),
            "Starting refresh supervisor"
        );

        Ok(RefreshSupervisorState {
            job: args.job,
            schedule: args.schedule,
            run_on_start: args.run_on_start,
            next_tick: None,
            next_target: None,
            stats: RefreshStats::default(),
        })
    }

    async fn post_start(
        &self,
        myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        if state.run_on_start {
            Self::start_run(&myself, state);
        }
        Self::arm_timer(&myself, state);
        Ok(())
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            RefreshSupervisorMessage::Tick => {
                Self::start_run(&myself, state);
                Self::arm_timer(&myself, state);
            }

            RefreshSupervisorMessage::RefreshNow => {
                Self::start_run(&myself, state);
            }

            RefreshSupervisorMessage::RunFinished(outcome) => {
                state.stats.running = false;
                match outcome {
                    Ok(report) => {
                        state.stats.runs_succeeded += 1;
                        info!(
                            repos = report.repo_count,
                            maintainers = report.maintainers_resolved,
                            elapsed_ms = report.elapsed_ms,
                            "Refresh succeeded"
                        );
                        state.stats.last_report = Some(report);
                    }
                    Err(e) => {
                        state.stats.runs_failed += 1;
                        error!("Refresh failed, keeping previous snapshot: {}", e);
                        state.stats.last_error = Some(e);
                    }
                }
            }

            RefreshSupervisorMessage::GetStats(reply) => {
                if !reply.is_closed() {
                    let _ = reply.send(state.stats.clone());
                }
            }

            RefreshSupervisorMessage::Shutdown => {
                info!("Shutting down refresh supervisor");
                if let Some(tick) = state.next_tick.take() {
                    tick.abort();
                }
                myself.stop(Some("Shutdown requested".to_string()));
            }
        }

        Ok(())
    }

    async fn post_stop(
        &self,
        _myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        if let Some(tick) = state.next_tick.take() {
            tick.abort();
        }
        info!(
            runs = state.stats.runs_started,
            succeeded = state.stats.runs_succeeded,
            failed = state.stats.runs_failed,
            "Refresh supervisor stopped"
        );
        Ok(())
    }
}
