//! Interactive monitor session.
//!
//! A [`MonitorSession`] owns the [`MonitorState`] for one selected network and
//! at most one recurring timer. Manual checks and the immediate check on
//! `start` return their outcome directly; timer ticks report through the
//! [`TimerEvent`] channel handed out by [`MonitorSession::new`]. Events are
//! passed through [`MonitorSession::accept`] before use so that a tick which
//! finished just before a network or address change is not shown.
//!
//! # Architecture
//!
//! - **Shared state**: `Arc<Mutex<SessionState>>`, locked only around reads
//!   and writes, never across an RPC call
//! - **Epoch**: bumped whenever the network or address changes; results of
//!   queries started under an older epoch are discarded, and so are timer
//!   events sent under an older epoch but read after the change
//! - **In-flight flag**: a second query never starts while one is running

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tokio::sync::{Mutex, mpsc};

use crate::balance::{BalanceResult, query_balance};
use crate::error::MonitorError;
use crate::monitor::{MonitorState, Notification};
use crate::networks::NetworkDescriptor;
use crate::rpc::ChainRpc;
use crate::scheduler::{RecurringTask, Tick, start_recurring};

/// Polling interval used when none is configured.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);

/// A successful state update and the notification it produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update {
    pub result: BalanceResult,
    pub notification: Option<Notification>,
}

/// Outcome of a timer tick, delivered to the front end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorEvent {
    Updated(Update),
    /// A tick failed and monitoring was switched off.
    Stopped { reason: String },
}

/// A [`MonitorEvent`] tagged with the session epoch it was produced under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerEvent {
    epoch: u64,
    event: MonitorEvent,
}

struct SessionState {
    network: NetworkDescriptor,
    monitor: MonitorState,
    epoch: u64,
    in_flight: bool,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Manual,
    Timer,
}

enum Refresh {
    Applied(BalanceResult, Option<Notification>),
    Busy,
    Inactive,
    Stale,
}

/// Balance monitor for one address on one selected network.
pub struct MonitorSession {
    rpc: Arc<dyn ChainRpc>,
    shared: Arc<Mutex<SessionState>>,
    timer: Option<RecurringTask>,
    interval: Duration,
    events: mpsc::UnboundedSender<TimerEvent>,
}

impl MonitorSession {
    /// Creates an idle session on `network` with no address.
    pub fn new(
        rpc: Arc<dyn ChainRpc>,
        network: NetworkDescriptor,
        interval: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<TimerEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let shared = SessionState {
            network,
            monitor: MonitorState::default(),
            epoch: 0,
            in_flight: false,
        };
        let session = Self {
            rpc,
            shared: Arc::new(Mutex::new(shared)),
            timer: None,
            interval,
            events,
        };
        (session, receiver)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub async fn network(&self) -> NetworkDescriptor {
        self.shared.lock().await.network.clone()
    }

    /// Copy of the current monitor state.
    pub async fn snapshot(&self) -> MonitorState {
        self.shared.lock().await.monitor.clone()
    }

    pub async fn is_monitoring(&self) -> bool {
        self.shared.lock().await.monitor.active
    }

    /// Unwraps a timer event, or drops it when the network or address changed
    /// after it was sent.
    pub async fn accept(&self, event: TimerEvent) -> Option<MonitorEvent> {
        let epoch = self.shared.lock().await.epoch;
        if event.epoch != epoch {
            log::debug!("Dropping stale monitor event epoch={} current={}", event.epoch, epoch);
            return None;
        }
        Some(event.event)
    }

    /// Switches to another network. Monitoring stops and balances are cleared;
    /// the address and threshold are kept.
    pub async fn select_network(&mut self, network: NetworkDescriptor) {
        self.cancel_timer();
        let mut guard = self.shared.lock().await;
        log::info!("Network selected from={} to={}", guard.network.name, network.name);
        let address = std::mem::take(&mut guard.monitor.address);
        guard.monitor.reset(address);
        guard.network = network;
        guard.epoch += 1;
        guard.in_flight = false;
    }

    /// Changes the address (an empty string clears it). Any change stops
    /// monitoring and clears balances.
    pub async fn set_address(&mut self, address: &str) {
        let address = address.trim();
        {
            let guard = self.shared.lock().await;
            if guard.monitor.address == address {
                return;
            }
        }
        self.cancel_timer();
        let mut guard = self.shared.lock().await;
        log::info!("Address changed network={} address={}", guard.network.name, address);
        guard.monitor.reset(address);
        guard.epoch += 1;
        guard.in_flight = false;
    }

    /// Sets or clears the low-balance threshold. Applies from the next update.
    pub async fn set_threshold(&self, threshold: Option<Decimal>) {
        self.shared.lock().await.monitor.threshold = threshold;
    }

    /// Runs one manual balance check.
    pub async fn check(&self) -> Result<Update, MonitorError> {
        let epoch = self.prepare().await?;
        if self.is_monitoring().await {
            return Err(MonitorError::MonitoringActive);
        }
        self.refresh_now(epoch).await
    }

    /// Starts monitoring: checks once right away, then every interval.
    ///
    /// If the immediate check fails, monitoring does not start.
    pub async fn start(&mut self) -> Result<Update, MonitorError> {
        let epoch = self.prepare().await?;
        {
            let mut guard = self.shared.lock().await;
            if guard.monitor.active {
                return Err(MonitorError::AlreadyActive);
            }
            guard.monitor.active = true;
            log::info!(
                "Monitoring started network={} address={} interval_s={}",
                guard.network.name,
                guard.monitor.address,
                self.interval.as_secs()
            );
        }

        let update = match self.refresh_now(epoch).await {
            Ok(update) => update,
            Err(e) => {
                self.shared.lock().await.monitor.active = false;
                return Err(e);
            }
        };

        self.cancel_timer();
        let (rpc, shared, events) = (self.rpc.clone(), self.shared.clone(), self.events.clone());
        self.timer = Some(start_recurring(self.interval, move || {
            let (rpc, shared, events) = (rpc.clone(), shared.clone(), events.clone());
            async move { tick(rpc.as_ref(), &shared, &events, epoch).await }
        }));

        Ok(update)
    }

    /// Stops monitoring. A tick already running finishes, no new tick starts.
    pub async fn stop(&mut self) {
        self.cancel_timer();
        let mut guard = self.shared.lock().await;
        if guard.monitor.active {
            log::info!("Monitoring stopped network={}", guard.network.name);
        }
        guard.monitor.active = false;
    }

    /// Starts monitoring when idle, stops it when active. Returns the update
    /// of the immediate check when monitoring was started.
    pub async fn toggle(&mut self) -> Result<Option<Update>, MonitorError> {
        if self.is_monitoring().await {
            self.stop().await;
            Ok(None)
        } else {
            self.start().await.map(Some)
        }
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            if !timer.is_finished() {
                log::debug!("Cancelling monitor timer");
            }
            timer.cancel();
        }
    }

    async fn prepare(&self) -> Result<u64, MonitorError> {
        let guard = self.shared.lock().await;
        let address = &guard.monitor.address;
        if address.is_empty() {
            return Err(MonitorError::NoAddress);
        }
        let family = guard.network.family();
        if !family.is_valid_address(address) {
            return Err(MonitorError::InvalidAddress {
                network: family.to_string(),
            });
        }
        Ok(guard.epoch)
    }

    async fn refresh_now(&self, epoch: u64) -> Result<Update, MonitorError> {
        match refresh(self.rpc.as_ref(), &self.shared, epoch, Trigger::Manual).await {
            Refresh::Applied(result, notification) => match result.reason() {
                Some(reason) => Err(MonitorError::QueryFailed(reason.to_string())),
                None => Ok(Update {
                    result,
                    notification,
                }),
            },
            Refresh::Busy => Err(MonitorError::QueryInFlight),
            Refresh::Inactive | Refresh::Stale => Err(MonitorError::QueryFailed(
                "session changed while the balance was being fetched".to_string(),
            )),
        }
    }
}

async fn refresh(
    rpc: &dyn ChainRpc,
    shared: &Mutex<SessionState>,
    epoch: u64,
    trigger: Trigger,
) -> Refresh {
    let (address, network) = {
        let mut guard = shared.lock().await;
        if guard.epoch != epoch {
            return Refresh::Stale;
        }
        if trigger == Trigger::Timer && !guard.monitor.active {
            return Refresh::Inactive;
        }
        if guard.in_flight {
            return Refresh::Busy;
        }
        guard.in_flight = true;
        (guard.monitor.address.clone(), guard.network.clone())
    };

    let result = query_balance(rpc, &address, &network).await;

    let mut guard = shared.lock().await;
    if guard.epoch != epoch {
        log::debug!("Discarding stale result network={} address={}", network.name, address);
        return Refresh::Stale;
    }
    guard.in_flight = false;
    let notification = guard.monitor.apply(result.clone()).cloned();
    if !result.is_ok() && guard.monitor.active {
        log::warn!(
            "Monitoring stopped after failed query network={} address={}",
            network.name,
            address
        );
        guard.monitor.active = false;
    }
    Refresh::Applied(result, notification)
}

async fn tick(
    rpc: &dyn ChainRpc,
    shared: &Mutex<SessionState>,
    events: &mpsc::UnboundedSender<TimerEvent>,
    epoch: u64,
) -> Tick {
    match refresh(rpc, shared, epoch, Trigger::Timer).await {
        Refresh::Applied(result, notification) => {
            let (event, next) = match result.reason() {
                Some(reason) => (
                    MonitorEvent::Stopped {
                        reason: reason.to_string(),
                    },
                    Tick::Stop,
                ),
                None => (
                    MonitorEvent::Updated(Update {
                        result,
                        notification,
                    }),
                    Tick::Continue,
                ),
            };
            if events.send(TimerEvent { epoch, event }).is_err() {
                log::debug!("Monitor event receiver dropped");
                return Tick::Stop;
            }
            next
        }
        Refresh::Busy => {
            log::debug!("Skipping tick, previous query still running");
            Tick::Continue
        }
        Refresh::Inactive | Refresh::Stale => Tick::Stop,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balance::tests::{FakeRpc, SOLANA_ADDRESS, evm_network, solana_network};
    use rust_decimal_macros::dec;
    use tokio::time;

    struct Harness {
        rpc: Arc<FakeRpc>,
        session: MonitorSession,
        events: mpsc::UnboundedReceiver<TimerEvent>,
        mainnet: NetworkDescriptor,
        testnet: NetworkDescriptor,
    }

    impl Harness {
        /// Next pending event as the front end would see it.
        async fn next_event(&mut self) -> Option<MonitorEvent> {
            let event = self.events.try_recv().ok()?;
            self.session.accept(event).await
        }
    }

    async fn harness() -> Harness {
        let mainnet = solana_network("mainnet-beta", false);
        let testnet = solana_network("testnet", true);
        let rpc = Arc::new(
            FakeRpc::default()
                .with_solana(&mainnet.endpoint, 1_000_000_000)
                .with_solana(&testnet.endpoint, 2_000_000_000),
        );
        let (mut session, events) =
            MonitorSession::new(rpc.clone(), mainnet.clone(), DEFAULT_INTERVAL);
        session.set_address(SOLANA_ADDRESS).await;
        Harness {
            rpc,
            session,
            events,
            mainnet,
            testnet,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn start_then_stop_issues_exactly_one_query() {
        let mut h = harness().await;
        let update = h.session.start().await.unwrap();
        assert_eq!(update.result.amount(), Some(dec!(1)));
        assert!(h.session.is_monitoring().await);

        h.session.stop().await;
        time::sleep(Duration::from_secs(300)).await;

        assert_eq!(h.rpc.calls(), 1);
        assert!(!h.session.is_monitoring().await);
        assert!(h.events.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_repeat_every_interval_and_report_changes() {
        let mut h = harness().await;
        h.session.start().await.unwrap();

        time::sleep(Duration::from_secs(31)).await;
        assert_eq!(h.rpc.calls(), 2);
        let event = h.next_event().await.unwrap();
        assert_eq!(
            event,
            MonitorEvent::Updated(Update {
                result: h.session.snapshot().await.last.unwrap(),
                notification: None,
            })
        );

        h.rpc.set_lamports(&h.mainnet.endpoint, 1_500_000_000);
        time::sleep(Duration::from_secs(30)).await;
        assert_eq!(h.rpc.calls(), 3);
        match h.next_event().await.unwrap() {
            MonitorEvent::Updated(update) => assert_eq!(
                update.notification,
                Some(Notification::Info("Balance changed by +0.500000 SOL".into()))
            ),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn switching_network_cancels_timer_and_clears_balances() {
        let mut h = harness().await;
        h.session.start().await.unwrap();
        h.session.select_network(h.testnet.clone()).await;

        time::sleep(Duration::from_secs(120)).await;
        assert_eq!(h.rpc.calls(), 1);

        let state = h.session.snapshot().await;
        assert!(!state.active);
        assert!(state.last.is_none() && state.previous.is_none());
        assert_eq!(state.address, SOLANA_ADDRESS);

        // 2 SOL on testnet vs 1 SOL before the switch: nothing to diff against
        let update = h.session.check().await.unwrap();
        assert_eq!(update.result.amount(), Some(dec!(2)));
        assert!(update.notification.is_none());
        assert!(h.session.snapshot().await.previous.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_tick_stops_monitoring() {
        let mut h = harness().await;
        h.session.start().await.unwrap();
        h.rpc.fail_with(Some("HTTP request failed: connection refused"));

        time::sleep(Duration::from_secs(31)).await;
        assert_eq!(
            h.next_event().await.unwrap(),
            MonitorEvent::Stopped {
                reason: "HTTP request failed: connection refused".into()
            }
        );
        let state = h.session.snapshot().await;
        assert!(!state.active);
        assert_eq!(state.last.and_then(|r| r.amount()), Some(dec!(1)));

        time::sleep(Duration::from_secs(300)).await;
        assert_eq!(h.rpc.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_immediate_check_does_not_start_monitoring() {
        let mut h = harness().await;
        h.rpc.fail_with(Some("HTTP status 503 Service Unavailable"));

        let err = h.session.start().await.unwrap_err();
        assert_eq!(
            err,
            MonitorError::QueryFailed("HTTP status 503 Service Unavailable".into())
        );
        assert!(!h.session.is_monitoring().await);

        time::sleep(Duration::from_secs(300)).await;
        assert_eq!(h.rpc.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn manual_check_is_refused_while_monitoring() {
        let mut h = harness().await;
        h.session.start().await.unwrap();
        assert_eq!(h.session.check().await, Err(MonitorError::MonitoringActive));
        assert_eq!(h.session.start().await, Err(MonitorError::AlreadyActive));
        assert_eq!(h.rpc.calls(), 1);
    }

    #[tokio::test]
    async fn address_is_validated_before_any_query() {
        let mut h = harness().await;
        h.session.set_address("").await;
        assert_eq!(h.session.check().await, Err(MonitorError::NoAddress));

        h.session.set_address("0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045").await;
        assert_eq!(
            h.session.start().await,
            Err(MonitorError::InvalidAddress {
                network: "Solana".into()
            })
        );

        let (mut evm_session, _events) =
            MonitorSession::new(h.rpc.clone(), evm_network("Base", 8453, false), DEFAULT_INTERVAL);
        evm_session.set_address(SOLANA_ADDRESS).await;
        assert_eq!(
            evm_session.check().await,
            Err(MonitorError::InvalidAddress { network: "EVM".into() })
        );
        assert_eq!(h.rpc.calls(), 0);
    }

    #[tokio::test]
    async fn threshold_warning_on_manual_check() {
        let h = harness().await;
        h.session.set_threshold(Some(dec!(1.5))).await;
        let update = h.session.check().await.unwrap();
        assert_eq!(
            update.notification,
            Some(Notification::Warning(
                "Balance is below threshold of 1.5 SOL!".into()
            ))
        );
    }

    #[tokio::test]
    async fn repeated_checks_with_unchanged_balance_are_quiet() {
        let h = harness().await;
        assert!(h.session.check().await.unwrap().notification.is_none());
        assert!(h.session.check().await.unwrap().notification.is_none());
        assert_eq!(h.session.snapshot().await.previous.and_then(|r| r.amount()), Some(dec!(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn result_of_in_flight_tick_is_discarded_after_address_change() {
        let mut h = harness().await;
        h.session.start().await.unwrap();
        h.rpc.slow_down(Duration::from_secs(10));

        // tick fires at 30s and its query returns at 40s
        time::sleep(Duration::from_secs(35)).await;
        h.session.set_address("11111111111111111111111111111111").await;
        time::sleep(Duration::from_secs(60)).await;

        let state = h.session.snapshot().await;
        assert_eq!(state.address, "11111111111111111111111111111111");
        assert!(state.last.is_none());
        assert!(h.events.try_recv().is_err());
        assert_eq!(h.rpc.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn tick_event_is_dropped_after_network_switch() {
        let mut h = harness().await;
        h.session.start().await.unwrap();

        // the tick at 30s has sent its event before the switch is made
        time::sleep(Duration::from_secs(31)).await;
        assert_eq!(h.rpc.calls(), 2);
        h.session.select_network(h.testnet.clone()).await;

        let stale = h.events.try_recv().unwrap();
        assert!(h.session.accept(stale).await.is_none());
        assert!(h.next_event().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn failure_event_is_dropped_after_address_change() {
        let mut h = harness().await;
        h.session.start().await.unwrap();
        h.rpc.fail_with(Some("timed out"));

        time::sleep(Duration::from_secs(31)).await;
        h.session.set_address("11111111111111111111111111111111").await;
        assert!(h.next_event().await.is_none());
    }

    #[tokio::test]
    async fn dropping_the_session_releases_the_timer() {
        let mut h = harness().await;
        h.session.start().await.unwrap();
        drop(h.session);
        // the sender side lives in the session and its timer task only
        assert!(h.events.recv().await.is_none());
    }
}
