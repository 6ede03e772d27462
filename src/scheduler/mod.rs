//! Single-threaded cooperative loop with a
//! 5-minute tick: re-reads TrackedPositions against live pool indices,
//! classifies in/out transitions, and ticks due DCA Schedules.

use async_trait::async_trait;

use crate::error::Result;
use crate::model::pool::Pool;
use crate::model::recipient::Recipient;
use crate::model::schedule::Schedule;
use crate::model::tracked_position::{TrackedPosition, Transition};
use crate::model::worker_state::WorkerState;
use crate::notify::{NotificationEvent, Notifier};
use crate::store::{StateStore, get_json, keys, set_json};

pub const TICK_INTERVAL_SECS: i64 = 300;

/// Enqueues a rebalance intent through the pipeline composer/the submission driver when drift crosses the
/// recipient's threshold. Kept as a port so the scheduler itself never
/// depends on the pipeline/submission wiring directly.
#[async_trait]
pub trait RebalanceExecutor: Send + Sync {
    async fn execute_rebalance(&self, tracked: &TrackedPosition) -> Result<()>;
}

/// Invokes the pipeline composer/the submission driver with an atomic-LP intent at the schedule's configured
/// amount.
#[async_trait]
pub trait DcaExecutor: Send + Sync {
    async fn execute_dca(&self, schedule: &Schedule) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct TickSummary {
    pub positions_checked: usize,
    pub transitions_in_to_out: usize,
    pub transitions_out_to_in: usize,
    pub rebalances_triggered: usize,
    pub schedules_ticked: usize,
    pub schedules_completed: usize,
    pub schedules_failed: usize,
}

pub struct Scheduler<'a> {
    notifier: &'a Notifier,
    rebalance: &'a dyn RebalanceExecutor,
    dca: &'a dyn DcaExecutor,
}

impl<'a> Scheduler<'a> {
    pub fn new(notifier: &'a Notifier, rebalance: &'a dyn RebalanceExecutor, dca: &'a dyn DcaExecutor) -> Self {
        Self { notifier, rebalance, dca }
    }

    /// One full tick: monitor all tracked positions, then tick all due
    /// DCA schedules, then persist WorkerState and a ring-buffer log
    /// entry.
    pub async fn tick(&self, store: &dyn StateStore, pool_lookup: &dyn Fn(&str) -> Option<Pool>, now_unix: i64) -> Result<TickSummary> {
        let mut summary = TickSummary::default();
        let mut had_error = false;

        if let Err(err) = self.monitor_positions(store, pool_lookup, now_unix, &mut summary).await {
            had_error = true;
            self.log(store, &format!("monitor tick error: {err}")).await;
        }

        if let Err(err) = self.tick_schedules(store, now_unix, &mut summary).await {
            had_error = true;
            self.log(store, &format!("dca tick error: {err}")).await;
        }

        let mut worker_state: WorkerState = get_json(store, &keys::worker_state())
            .await?
            .unwrap_or_else(|| WorkerState::start(now_unix));
        worker_state.record_tick(now_unix, had_error);
        set_json(store, &keys::worker_state(), &worker_state).await?;

        self.log(
            store,
            &format!(
                "tick: checked={} in_to_out={} out_to_in={} rebalances={} dca_ticked={}",
                summary.positions_checked,
                summary.transitions_in_to_out,
                summary.transitions_out_to_in,
                summary.rebalances_triggered,
                summary.schedules_ticked
            ),
        )
        .await;

        Ok(summary)
    }

    async fn monitor_positions(
        &self,
        store: &dyn StateStore,
        pool_lookup: &dyn Fn(&str) -> Option<Pool>,
        now_unix: i64,
        summary: &mut TickSummary,
    ) -> Result<()> {
        for wallet in store.smembers(&keys::tracked_wallets()).await? {
            let recipient: Option<Recipient> = get_json(store, &keys::recipient(&wallet)).await?;

            for position_id in store.smembers(&keys::tracked_set(&wallet)).await? {
                let record_key = keys::tracked_record(&wallet, &position_id);
                let Some(mut tracked): Option<TrackedPosition> = get_json(store, &record_key).await? else {
                    continue;
                };
                let Some(pool) = pool_lookup(&tracked.pool) else {
                    continue;
                };

                let transition = tracked.observe(now_unix, pool.current_index);
                summary.positions_checked += 1;

                match transition {
                    Transition::InToOut => {
                        summary.transitions_in_to_out += 1;
                        self.emit_out_of_range(store, &tracked, recipient.as_ref(), pool.current_index, summary)
                            .await;
                    }
                    Transition::OutToIn => {
                        summary.transitions_out_to_in += 1;
                        if recipient.as_ref().is_some_and(|r| r.preferences.alert_on_back_in_range) {
                            let event = NotificationEvent {
                                kind: "BACK_IN_RANGE".to_string(),
                                wallet: wallet.clone(),
                                position_id: tracked.position_id.clone(),
                                pool: tracked.pool.clone(),
                                drift: None,
                                suggested_action: None,
                                timestamp_unix: now_unix,
                            };
                            let _ = self.notifier.notify(store, &event).await;
                        }
                    }
                    Transition::StillIn | Transition::StillOut => {}
                }

                set_json(store, &record_key, &tracked).await?;
            }
        }
        Ok(())
    }

    async fn emit_out_of_range(
        &self,
        store: &dyn StateStore,
        tracked: &TrackedPosition,
        recipient: Option<&Recipient>,
        current_index: i32,
        summary: &mut TickSummary,
    ) {
        let drift = tracked.drift(current_index);

        let event = NotificationEvent {
            kind: "OUT_OF_RANGE".to_string(),
            wallet: tracked.wallet.clone(),
            position_id: tracked.position_id.clone(),
            pool: tracked.pool.clone(),
            drift: Some(drift),
            suggested_action: None,
            timestamp_unix: tracked.last_checked_unix,
        };
        let _ = self.notifier.notify(store, &event).await;

        if let Some(recipient) = recipient {
            if recipient.preferences.auto_rebalance && (drift as u32) > recipient.preferences.rebalance_drift_threshold
                && self.rebalance.execute_rebalance(tracked).await.is_ok()
            {
                summary.rebalances_triggered += 1;
            }
        }
    }

    async fn tick_schedules(&self, store: &dyn StateStore, now_unix: i64, summary: &mut TickSummary) -> Result<()> {
        for schedule_id in store.smembers(&keys::dca_active()).await? {
            let key = keys::dca_schedule(&schedule_id);
            let Some(mut schedule): Option<Schedule> = get_json(store, &key).await? else {
                continue;
            };
            if !schedule.is_due(now_unix) {
                continue;
            }

            summary.schedules_ticked += 1;
            let leaves_active_set = match self.dca.execute_dca(&schedule).await {
                Ok(()) => {
                    schedule.record_success(now_unix);
                    if schedule.status == crate::model::ScheduleStatus::Complete {
                        summary.schedules_completed += 1;
                        true
                    } else {
                        false
                    }
                }
                Err(err) => {
                    let code = err.code();
                    let repeated_sentinel = schedule.last_error.as_deref() == Some(code) && code == "INSUFFICIENT_FUNDS";
                    schedule.record_failure(now_unix, &err.to_string(), repeated_sentinel);
                    if schedule.status == crate::model::ScheduleStatus::Failed {
                        summary.schedules_failed += 1;
                        true
                    } else {
                        false
                    }
                }
            };

            // Write the record before updating set membership: a crash in
            // between leaves at most an unreachable entry, never a dangling
            // membership pointing at a stale record.
            set_json(store, &key, &schedule).await?;
            if leaves_active_set {
                store.srem(&keys::dca_active(), &schedule_id).await?;
            }
        }
        Ok(())
    }

    async fn log(&self, store: &dyn StateStore, message: &str) {
        let _ = store
            .list_push(&keys::worker_logs(), message, crate::store::WORKER_LOG_CAP)
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::VenueTag;
    use crate::store::memory::MemoryStore;

    struct NoopRebalance;
    #[async_trait]
    impl RebalanceExecutor for NoopRebalance {
        async fn execute_rebalance(&self, _tracked: &TrackedPosition) -> Result<()> {
            Ok(())
        }
    }

    struct NoopDca;
    #[async_trait]
    impl DcaExecutor for NoopDca {
        async fn execute_dca(&self, _schedule: &Schedule) -> Result<()> {
            Ok(())
        }
    }

    fn tracked() -> TrackedPosition {
        TrackedPosition {
            position_id: "pos-1".into(),
            wallet: "wallet-1".into(),
            pool: "pool-1".into(),
            venue: VenueTag::Dlmm,
            lower_index: 4950,
            upper_index: 5050,
            last_checked_unix: 0,
            last_in_range: true,
            out_of_range_since_unix: None,
        }
    }

    #[tokio::test]
    async fn tick_classifies_in_to_out_transition() {
        let store = MemoryStore::new();
        store.sadd(&keys::tracked_wallets(), "wallet-1").await.unwrap();
        store.sadd(&keys::tracked_set("wallet-1"), "pos-1").await.unwrap();
        set_json(&store, &keys::tracked_record("wallet-1", "pos-1"), &tracked())
            .await
            .unwrap();

        let pool = crate::model::pool::Pool {
            address: "pool-1".into(),
            venue: VenueTag::Dlmm,
            token_a: crate::model::pool::TokenSide { mint: "A".into(), symbol: "SOL".into(), decimals: 9 },
            token_b: crate::model::pool::TokenSide { mint: "B".into(), symbol: "USDC".into(), decimals: 6 },
            price: 100.0,
            granularity: crate::model::GranularityKind::BinStep(10),
            tvl_usd: 1_000_000.0,
            volume_24h_usd: 100_000.0,
            fee_bps: 30,
            risk_score: 3,
            current_index: 5060,
        };

        let notifier = Notifier::new(reqwest::Client::new());
        let rebalance = NoopRebalance;
        let dca = NoopDca;
        let scheduler = Scheduler::new(&notifier, &rebalance, &dca);

        let summary = scheduler
            .tick(&store, &|addr| if addr == "pool-1" { Some(pool.clone()) } else { None }, 1000)
            .await
            .unwrap();

        assert_eq!(summary.positions_checked, 1);
        assert_eq!(summary.transitions_in_to_out, 1);

        let updated: TrackedPosition = get_json(&store, &keys::tracked_record("wallet-1", "pos-1"))
            .await
            .unwrap()
            .unwrap();
        assert!(!updated.last_in_range);
        assert_eq!(updated.out_of_range_since_unix, Some(1000));
    }
}
