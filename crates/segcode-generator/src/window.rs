//! The in-process segment window.
//!
//! Ids are served from the current segment with a single compare-and-swap
//! on its cursor.
//! Store round-trips happen only in two single-flight operations:
//!
//! * **prefetch** allocates the next segment in the background once the
//!   current one has `prefetch_threshold` ids or fewer left, and
//! * **switch** replaces an exhausted window, consuming the prefetched
//!   segment when there is one and allocating on demand otherwise.
//!
//! Both operations run on spawned tasks. Callers that find one in flight
//! subscribe to its outcome instead of starting another.

use crate::allocator::SegmentAllocator;
use crate::error::{GeneratorError, Result};
use crate::settings::{SegmentSettings, StartupPolicy};
use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use segcode_core::{Segment, SegmentStore};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, OnceCell};
use tracing::{debug, info, warn};

/// Published once by a single-flight task; `None` while it is running.
type Outcome = Option<Result<()>>;

/// A segment together with the cursor that hands out its ids.
#[derive(Debug)]
struct Window {
    segment: Segment,
    cursor: AtomicU64,
}

impl Window {
    fn new(segment: Segment) -> Self {
        Self {
            cursor: AtomicU64::new(segment.start()),
            segment,
        }
    }

    /// Claims the next id, or `None` once the segment is used up.
    ///
    /// The cursor stops at `end + 1` and never wraps.
    fn claim(&self) -> Option<u64> {
        let end = self.segment.end();
        self.cursor
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |cursor| {
                (cursor <= end).then(|| cursor + 1)
            })
            .ok()
    }

    fn is_exhausted(&self) -> bool {
        self.cursor.load(Ordering::Acquire) > self.segment.end()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlightKind {
    Switch,
    Prefetch,
}

impl FlightKind {
    fn name(self) -> &'static str {
        match self {
            FlightKind::Switch => "switch",
            FlightKind::Prefetch => "prefetch",
        }
    }
}

#[derive(Debug, Default)]
enum Flight {
    #[default]
    Idle,
    InFlight(watch::Receiver<Outcome>),
}

impl Flight {
    fn is_in_flight(&self) -> bool {
        matches!(self, Flight::InFlight(_))
    }

    fn subscribe(&self) -> Option<watch::Receiver<Outcome>> {
        match self {
            Flight::Idle => None,
            Flight::InFlight(rx) => Some(rx.clone()),
        }
    }
}

#[derive(Debug, Default)]
struct Flights {
    switch: Flight,
    prefetch: Flight,
}

impl Flights {
    fn slot(&mut self, kind: FlightKind) -> &mut Flight {
        match kind {
            FlightKind::Switch => &mut self.switch,
            FlightKind::Prefetch => &mut self.prefetch,
        }
    }
}

struct Shared<S> {
    allocator: SegmentAllocator<S>,
    settings: SegmentSettings,
    current: ArcSwapOption<Window>,
    next: ArcSwapOption<Segment>,
    flights: Mutex<Flights>,
    init: OnceCell<()>,
}

/// Owns the single in-flight marker of one operation.
///
/// Dropping the guard clears the marker and then publishes the outcome, so
/// waiters are released and the marker is reset even if the task panics or
/// is cancelled.
struct FlightGuard<S: SegmentStore> {
    shared: Arc<Shared<S>>,
    kind: FlightKind,
    tx: watch::Sender<Outcome>,
    outcome: Outcome,
}

impl<S: SegmentStore> FlightGuard<S> {
    fn complete(mut self, outcome: Result<()>) {
        self.outcome = Some(outcome);
    }
}

impl<S: SegmentStore> Drop for FlightGuard<S> {
    fn drop(&mut self) {
        *self.shared.flights.lock().slot(self.kind) = Flight::Idle;
        let outcome = self
            .outcome
            .take()
            .unwrap_or(Err(GeneratorError::Aborted(self.kind.name())));
        self.tx.send_replace(Some(outcome));
    }
}

async fn wait_for_flight(mut rx: watch::Receiver<Outcome>, kind: FlightKind) -> Result<()> {
    match rx.wait_for(Option::is_some).await {
        Ok(outcome) => outcome
            .clone()
            .unwrap_or(Err(GeneratorError::Aborted(kind.name()))),
        Err(_) => Err(GeneratorError::Aborted(kind.name())),
    }
}

/// Point-in-time view of a [`SegmentWindow`], for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowSnapshot {
    /// Segment ids are currently served from.
    pub current: Option<Segment>,
    /// Next id the current segment would hand out, `end + 1` once exhausted.
    pub cursor: Option<u64>,
    /// Segment waiting to become current.
    pub prefetched: Option<Segment>,
    pub switching: bool,
    pub prefetching: bool,
}

/// Serves monotonically increasing ids for one business key out of
/// store-allocated segments.
///
/// Cloning is cheap and every clone shares the same window.
pub struct SegmentWindow<S> {
    inner: Arc<Shared<S>>,
}

impl<S> Clone for SegmentWindow<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: SegmentStore> SegmentWindow<S> {
    pub fn new(store: Arc<S>, settings: SegmentSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            inner: Arc::new(Shared {
                allocator: SegmentAllocator::new(store),
                settings,
                current: ArcSwapOption::empty(),
                next: ArcSwapOption::empty(),
                flights: Mutex::new(Flights::default()),
                init: OnceCell::new(),
            }),
        })
    }

    pub fn settings(&self) -> &SegmentSettings {
        &self.inner.settings
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.init.initialized()
    }

    /// Creates the counter if needed and installs the first segment.
    ///
    /// Runs at most once successfully; concurrent callers wait for the
    /// same attempt, and a failed attempt may be retried.
    pub async fn ensure_initialized(&self) -> Result<()> {
        self.inner
            .init
            .get_or_try_init(|| self.inner.initialize())
            .await
            .map(|_| ())
    }

    /// Returns the next id for this business key.
    ///
    /// Fails only when initialization or a synchronous segment switch fails.
    pub async fn next_id(&self) -> Result<u64> {
        if !self.inner.init.initialized() {
            match self.inner.settings.startup {
                StartupPolicy::Block => self.ensure_initialized().await?,
                StartupPolicy::FailFast => return Err(GeneratorError::NotInitialized),
            }
        }

        loop {
            let Some(window) = self.inner.current.load_full() else {
                return Err(GeneratorError::NotInitialized);
            };

            if let Some(id) = window.claim() {
                let remaining = window.segment.remaining_after(id).unwrap_or(0);
                if remaining <= self.inner.settings.prefetch_threshold {
                    self.inner.trigger_prefetch();
                }
                return Ok(id);
            }

            self.inner.switch_from(&window).await?;
        }
    }

    pub fn snapshot(&self) -> WindowSnapshot {
        let current = self.inner.current.load_full();
        let flights = self.inner.flights.lock();
        WindowSnapshot {
            current: current.as_ref().map(|w| w.segment),
            cursor: current.as_ref().map(|w| w.cursor.load(Ordering::Acquire)),
            prefetched: self.inner.next.load_full().map(|segment| *segment),
            switching: flights.switch.is_in_flight(),
            prefetching: flights.prefetch.is_in_flight(),
        }
    }
}

impl<S: SegmentStore> Shared<S> {
    fn key(&self) -> &str {
        &self.settings.business_key
    }

    async fn initialize(&self) -> Result<()> {
        let settings = &self.settings;
        let row = self
            .allocator
            .ensure_counter(&settings.business_key, settings.initial_value, settings.step)
            .await?;
        let segment = self.allocator.allocate(&settings.business_key).await?;
        self.current.store(Some(Arc::new(Window::new(segment))));
        info!(
            key = %settings.business_key,
            current_max = row.current_max,
            start = segment.start(),
            end = segment.end(),
            "segment window initialized"
        );
        Ok(())
    }

    /// Starts a background allocation of the next segment unless one is
    /// already held, already running, or a switch is in progress.
    fn trigger_prefetch(self: &Arc<Self>) {
        if self.next.load().is_some() {
            return;
        }
        let mut flights = self.flights.lock();
        if self.next.load().is_some()
            || flights.prefetch.is_in_flight()
            || flights.switch.is_in_flight()
        {
            return;
        }
        let (tx, rx) = watch::channel(None);
        flights.prefetch = Flight::InFlight(rx);
        drop(flights);

        let guard = FlightGuard {
            shared: Arc::clone(self),
            kind: FlightKind::Prefetch,
            tx,
            outcome: None,
        };
        tokio::spawn(run_prefetch(guard));
    }

    /// Waits until `exhausted` has been replaced, starting the switch if
    /// nobody else has.
    async fn switch_from(self: &Arc<Self>, exhausted: &Arc<Window>) -> Result<()> {
        let rx = {
            let mut flights = self.flights.lock();
            if let Some(rx) = flights.switch.subscribe() {
                rx
            } else {
                let replaced = match &*self.current.load() {
                    Some(current) => !Arc::ptr_eq(current, exhausted),
                    None => true,
                };
                if replaced {
                    return Ok(());
                }
                let (tx, rx) = watch::channel(None);
                flights.switch = Flight::InFlight(rx.clone());
                drop(flights);

                let guard = FlightGuard {
                    shared: Arc::clone(self),
                    kind: FlightKind::Switch,
                    tx,
                    outcome: None,
                };
                tokio::spawn(run_switch(guard));
                rx
            }
        };
        wait_for_flight(rx, FlightKind::Switch).await
    }

    async fn switch_segment(&self) -> Result<()> {
        if let Some(current) = self.current.load_full() {
            if !current.is_exhausted() {
                debug!(key = %self.key(), "window already switched");
                return Ok(());
            }
        }

        let pending = self.flights.lock().prefetch.subscribe();
        if let Some(rx) = pending {
            debug!(key = %self.key(), "switch waiting for in-flight prefetch");
            if let Err(err) = wait_for_flight(rx, FlightKind::Prefetch).await {
                debug!(key = %self.key(), error = %err, "in-flight prefetch failed");
            }
        }

        let (segment, source) = match self.next.swap(None) {
            Some(prefetched) => (*prefetched, "prefetched"),
            None => (self.allocator.allocate(self.key()).await?, "on-demand"),
        };
        self.current.store(Some(Arc::new(Window::new(segment))));
        info!(
            key = %self.key(),
            start = segment.start(),
            end = segment.end(),
            source,
            "switched segment"
        );
        Ok(())
    }
}

async fn run_switch<S: SegmentStore>(guard: FlightGuard<S>) {
    let outcome = guard.shared.switch_segment().await;
    guard.complete(outcome);
}

async fn run_prefetch<S: SegmentStore>(guard: FlightGuard<S>) {
    let shared = &guard.shared;
    debug!(key = %shared.key(), "prefetching next segment");
    let outcome = match shared.allocator.allocate(shared.key()).await {
        Ok(segment) => {
            shared.next.store(Some(Arc::new(segment)));
            info!(
                key = %shared.key(),
                start = segment.start(),
                end = segment.end(),
                "prefetched next segment"
            );
            Ok(())
        }
        Err(err) => {
            warn!(
                key = %shared.key(),
                error = %err,
                "prefetch failed, next switch will allocate on demand"
            );
            Err(err.into())
        }
    };
    guard.complete(outcome);
}
