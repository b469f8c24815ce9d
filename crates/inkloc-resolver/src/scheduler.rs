//! Location scheduler - drives automatic re-resolution
//!
//! The [`LocationScheduler`] owns the timer and reacts to lifecycle events
//! delivered through a [`SchedulerHandle`]:
//!
//! ```text
//! SchedulerHandle ──→ mpsc::Receiver ──→ LocationScheduler ──→ LocationService::refresh()
//!                                              │
//!                      preference change ──────┤ (re-arm)
//!                      adaptive timer ─────────┘
//! ```
//!
//! ## Rules
//!
//! - The timer is re-armed only after a cycle settles, with the interval
//!   computed at that moment. When automatic updates are off no timer is
//!   armed at all.
//! - Visibility regained runs a cycle if one is due.
//! - Connectivity lost marks the network offline at once, even while a
//!   cycle is in flight; no cycle runs while offline. Connectivity regained
//!   runs a due cycle after a short settle delay.
//! - At most one resolution is in flight; the service drops overlapping
//!   triggers.

use std::future::Future;

use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::service::LocationService;
use crate::ResolveError;

const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Host lifecycle signals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    VisibilityChanged { visible: bool },
    ConnectivityChanged { online: bool },
}

/// Control handle for a running scheduler
#[derive(Clone)]
pub struct SchedulerHandle {
    service: LocationService,
    events: mpsc::Sender<LifecycleEvent>,
    deadline: watch::Receiver<Option<Instant>>,
}

impl SchedulerHandle {
    /// Delivers a lifecycle event; returns false if the scheduler has stopped
    ///
    /// Connectivity is applied to the service before the event is queued,
    /// so a cycle in flight cannot delay the offline short-circuit. A
    /// connectivity event that changes nothing is not forwarded.
    pub async fn send(&self, event: LifecycleEvent) -> bool {
        if let LifecycleEvent::ConnectivityChanged { online } = event {
            if !self.service.set_network_online(online) {
                return !self.events.is_closed();
            }
        }
        self.events.send(event).await.is_ok()
    }

    pub async fn visibility_changed(&self, visible: bool) -> bool {
        self.send(LifecycleEvent::VisibilityChanged { visible }).await
    }

    pub async fn connectivity_changed(&self, online: bool) -> bool {
        self.send(LifecycleEvent::ConnectivityChanged { online })
            .await
    }

    /// When the armed timer fires, `None` when no timer is armed
    pub fn next_deadline(&self) -> Option<Instant> {
        *self.deadline.borrow()
    }
}

/// Periodic and event-driven resolution loop
pub struct LocationScheduler {
    service: LocationService,
    events: mpsc::Receiver<LifecycleEvent>,
    deadline: watch::Sender<Option<Instant>>,
    visible: bool,
}

impl LocationScheduler {
    /// Creates a scheduler for `service` and the handle that controls it
    pub fn new(service: LocationService) -> (Self, SchedulerHandle) {
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (deadline_tx, deadline_rx) = watch::channel(None);

        let handle = SchedulerHandle {
            service: service.clone(),
            events: events_tx,
            deadline: deadline_rx,
        };
        let scheduler = Self {
            service,
            events: events_rx,
            deadline: deadline_tx,
            visible: true,
        };
        (scheduler, handle)
    }

    /// Main loop; returns when `cancel` fires
    ///
    /// A due cycle runs immediately on start. Dropping every handle stops
    /// event delivery but the timer keeps running.
    pub async fn run(mut self, cancel: CancellationToken) {
        info!("Location scheduler starting");

        let mut events_open = true;
        let mut settle_deadline: Option<Instant> = None;

        if !self.service.is_network_offline() && self.service.should_update() {
            self.run_cycle("startup").await;
        }
        let mut deadline = self.arm().await;

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    info!("Cancellation requested, scheduler shutting down");
                    break;
                }

                _ = sleep_until(deadline) => {
                    if self.service.is_network_offline() {
                        debug!("Timer fired while offline, skipping cycle");
                    } else if self.service.should_update() {
                        self.run_cycle("timer").await;
                    }
                    deadline = self.arm().await;
                }

                _ = sleep_until(settle_deadline) => {
                    settle_deadline = None;
                    if !self.service.is_network_offline() && self.service.should_update() {
                        self.run_cycle("connectivity").await;
                        deadline = self.arm().await;
                    }
                }

                _ = self.service.preferences_changed() => {
                    debug!("Preferences changed, re-arming timer");
                    deadline = self.arm().await;
                }

                event = self.events.recv(), if events_open => {
                    match event {
                        Some(LifecycleEvent::VisibilityChanged { visible }) => {
                            let regained = visible && !self.visible;
                            self.visible = visible;
                            debug!(visible, "Visibility changed");
                            if regained
                                && !self.service.is_network_offline()
                                && self.service.should_update()
                            {
                                self.run_cycle("visibility").await;
                                deadline = self.arm().await;
                            }
                        }
                        Some(LifecycleEvent::ConnectivityChanged { online }) => {
                            if online {
                                let settle = self.service.config().schedule.online_settle();
                                settle_deadline = Some(Instant::now() + settle);
                                debug!(settle_ms = settle.as_millis() as u64, "Back online, deferring cycle");
                            } else {
                                settle_deadline = None;
                            }
                        }
                        None => {
                            debug!("All scheduler handles dropped, ignoring lifecycle events");
                            events_open = false;
                        }
                    }
                }
            }
        }

        self.deadline.send_replace(None);
        info!("Location scheduler stopped");
    }

    async fn run_cycle(&self, trigger: &'static str) {
        debug!(trigger, "Running resolution cycle");
        match self.service.refresh().await {
            Ok(location) => debug!(trigger, source = %location.source, "Cycle settled"),
            Err(ResolveError::InProgress) => {}
            Err(err) => warn!(
                trigger,
                error = %err,
                consecutive_failures = self.service.error_state().consecutive_failures,
                "Cycle failed"
            ),
        }
    }

    /// Computes and publishes the next deadline
    async fn arm(&self) -> Option<Instant> {
        let deadline = match self.service.next_interval().await {
            Some(interval) => {
                debug!(interval_secs = interval.as_secs(), "Timer armed");
                Some(Instant::now() + interval)
            }
            None => {
                debug!("Automatic updates off, no timer armed");
                None
            }
        };
        self.deadline.send_replace(deadline);
        deadline
    }
}

/// Sleeps until `deadline`, or forever when there is none
fn sleep_until(deadline: Option<Instant>) -> impl Future<Output = ()> {
    async move {
        match deadline {
            Some(at) => tokio::time::sleep_until(at).await,
            None => std::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use inkloc_core::domain::{PreferenceChange, StrategyError, UpdateFrequency};

    use crate::test_support::{Harness, PositionBehavior};

    const MIN: u64 = 60;

    async fn start(h: &Harness) -> (LocationService, SchedulerHandle, CancellationToken) {
        let service = h.service().await;
        let (scheduler, handle) = LocationScheduler::new(service.clone());
        let cancel = CancellationToken::new();
        tokio::spawn(scheduler.run(cancel.clone()));
        settle().await;
        (service, handle, cancel)
    }

    /// Lets spawned tasks run without advancing time
    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolves_on_start_and_arms_base_interval() {
        let h = Harness::new().without_positioning();
        let (service, handle, cancel) = start(&h).await;

        assert_eq!(h.api.ip_calls(), 1);
        assert!(service.current_location().is_some());
        let deadline = handle.next_deadline().expect("timer armed");
        assert_eq!(deadline - Instant::now(), Duration::from_secs(10 * MIN));

        cancel.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_fires_periodically() {
        let h = Harness::new().without_positioning();
        let (_service, _handle, cancel) = start(&h).await;

        tokio::time::advance(Duration::from_secs(10 * MIN)).await;
        settle().await;
        assert_eq!(h.api.ip_calls(), 2);

        tokio::time::advance(Duration::from_secs(10 * MIN)).await;
        settle().await;
        assert_eq!(h.api.ip_calls(), 3);

        cancel.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_frequency_arms_no_timer() {
        let h = Harness::new().without_positioning();
        let service = h.service().await;
        service
            .set_user_preference(PreferenceChange::UpdateFrequency(UpdateFrequency::Disabled))
            .await;

        let (scheduler, handle) = LocationScheduler::new(service.clone());
        let cancel = CancellationToken::new();
        tokio::spawn(scheduler.run(cancel.clone()));
        settle().await;

        assert_eq!(handle.next_deadline(), None);
        tokio::time::advance(Duration::from_secs(24 * 60 * MIN)).await;
        settle().await;
        assert!(handle.visibility_changed(false).await);
        assert!(handle.visibility_changed(true).await);
        settle().await;
        assert_eq!(h.api.ip_calls(), 0);

        service.refresh().await.unwrap();
        assert_eq!(h.api.ip_calls(), 1);

        cancel.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_preference_change_rearms_timer() {
        let h = Harness::new().without_positioning();
        let (service, handle, cancel) = start(&h).await;
        assert!(handle.next_deadline().is_some());

        service
            .set_user_preference(PreferenceChange::UpdateFrequency(UpdateFrequency::Disabled))
            .await;
        settle().await;
        assert_eq!(handle.next_deadline(), None);

        service
            .set_user_preference(PreferenceChange::UpdateFrequency(UpdateFrequency::Reduced))
            .await;
        settle().await;
        let deadline = handle.next_deadline().expect("timer re-armed");
        assert_eq!(deadline - Instant::now(), Duration::from_secs(20 * MIN));

        cancel.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_visibility_regained_resolves_when_due() {
        let h = Harness::new().without_positioning();
        let (_service, handle, cancel) = start(&h).await;
        assert_eq!(h.api.ip_calls(), 1);

        // Not yet due: no extra cycle
        handle.visibility_changed(false).await;
        handle.visibility_changed(true).await;
        settle().await;
        assert_eq!(h.api.ip_calls(), 1);

        // Hidden through the timer; the timer cycle still runs
        handle.visibility_changed(false).await;
        tokio::time::advance(Duration::from_secs(10 * MIN)).await;
        settle().await;
        assert_eq!(h.api.ip_calls(), 2);

        cancel.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_offline_skips_cycles_and_online_defers_by_settle_delay() {
        let h = Harness::new().without_positioning();
        let (service, handle, cancel) = start(&h).await;
        assert_eq!(h.api.ip_calls(), 1);

        handle.connectivity_changed(false).await;
        settle().await;
        assert!(service.error_state().network_offline);

        tokio::time::advance(Duration::from_secs(30 * MIN)).await;
        settle().await;
        assert_eq!(h.api.ip_calls(), 1);

        handle.connectivity_changed(true).await;
        settle().await;
        assert!(!service.error_state().network_offline);
        assert_eq!(h.api.ip_calls(), 1);

        tokio::time::advance(Duration::from_millis(999)).await;
        settle().await;
        assert_eq!(h.api.ip_calls(), 1);

        tokio::time::advance(Duration::from_millis(1)).await;
        settle().await;
        assert_eq!(h.api.ip_calls(), 2);

        cancel.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_offline_applies_while_a_cycle_is_in_flight() {
        let h = Harness::new();
        h.positioning.set(PositionBehavior::Hang);
        let (service, handle, cancel) = start(&h).await;
        assert_eq!(h.positioning.calls(), 1);
        assert!(!service.is_network_offline());

        assert!(handle.connectivity_changed(false).await);
        assert!(service.is_network_offline());
        assert!(service.error_state().network_offline);

        // Positioning times out; the stalled cycle does not fall through to the network
        tokio::time::advance(Duration::from_secs(30)).await;
        settle().await;
        assert_eq!(h.api.ip_calls(), 0);
        assert!(h.api.reverse_requests().is_empty());

        // The queued event was still delivered; coming back online resolves after settling
        h.positioning.set(PositionBehavior::fix(39.2037, -76.8610, 35.0));
        assert!(handle.connectivity_changed(true).await);
        tokio::time::advance(Duration::from_secs(1)).await;
        settle().await;
        assert_eq!(h.positioning.calls(), 2);

        cancel.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_connectivity_event_is_not_forwarded() {
        let h = Harness::new().without_positioning();
        let (service, handle, cancel) = start(&h).await;
        assert_eq!(h.api.ip_calls(), 1);

        // Already online: no settle cycle is scheduled
        assert!(handle.connectivity_changed(true).await);
        tokio::time::advance(Duration::from_secs(5)).await;
        settle().await;
        assert_eq!(h.api.ip_calls(), 1);
        assert!(!service.is_network_offline());

        cancel.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_failures_double_the_interval() {
        let h = Harness::new().without_positioning();
        h.api.fail_ip(StrategyError::ServerError(500));
        let (service, handle, cancel) = start(&h).await;
        assert_eq!(service.error_state().consecutive_failures, 1);

        for expected in 2..=4 {
            tokio::time::advance(Duration::from_secs(10 * MIN)).await;
            settle().await;
            assert_eq!(service.error_state().consecutive_failures, expected);
        }

        let deadline = handle.next_deadline().expect("timer armed");
        assert_eq!(deadline - Instant::now(), Duration::from_secs(20 * MIN));

        cancel.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_stops_the_loop() {
        let h = Harness::new().without_positioning();
        let service = h.service().await;
        let (scheduler, handle) = LocationScheduler::new(service);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(scheduler.run(cancel.clone()));
        settle().await;

        cancel.cancel();
        task.await.unwrap();
        assert_eq!(handle.next_deadline(), None);
        assert!(!handle.visibility_changed(true).await);
    }
}
