//! Scriptable in-memory engine for tests and benchmarks.
//!
//! # Why a mock engine?
//!
//! A real engine needs a reachable RDP server, which makes it impossible to
//! force a particular handshake failure, a malformed update, or an exact
//! sequence of tiles.  The mock replaces the wire with:
//!
//! - a **script** of [`ScriptStep`]s replayed by `next_batch`, one step per
//!   call;
//! - a **probe** that records every injected input event, every shutdown,
//!   and every connect attempt, so tests can assert what the engine saw and
//!   in which order;
//! - a **resource counter** standing in for sockets and buffers.  Every
//!   connect attempt acquires one resource; it is released when the attempt
//!   fails, when the engine shuts down, or when the engine is dropped.  A
//!   test that ends with `live_resources() == 0` has proven nothing leaked.
//!
//! # Usage in tests
//!
//! ```ignore
//! let script = vec![ScriptStep::Batch(tiles), ScriptStep::End];
//! let connector = MockConnector::new().with_script(script);
//! let probe = connector.probe();
//! let client = RdpClient::new(&ClientConfig::default(), Arc::new(connector))?;
//!
//! let handle = client.connect("10.0.0.5:3389", "alice", "pw", 1024, 768)?;
//! client.stream_output(handle, 1, &sink)?;
//! client.free(handle);
//!
//! assert_eq!(probe.live_resources(), 0);
//! ```
//!
//! Once the script runs out, `next_batch` never completes, like a server
//! with nothing new to draw.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use rdp_core::{
    BitmapTile, ConnectionParams, EngineConnector, EngineError, KeyboardEvent, PointerEvent,
    RdpEngine,
};

// ── Resource accounting ───────────────────────────────────────────────────────

/// Counts live simulated resources.  Cloning shares the count.
#[derive(Debug, Clone, Default)]
pub struct ResourceCounter {
    live: Arc<AtomicUsize>,
}

impl ResourceCounter {
    /// Creates a counter with nothing live.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks one resource live until the returned guard is dropped.
    pub fn acquire(&self) -> ResourceGuard {
        self.live.fetch_add(1, Ordering::SeqCst);
        ResourceGuard {
            live: Arc::clone(&self.live),
        }
    }

    /// Number of resources currently held.
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

/// Releases one resource on drop.
#[derive(Debug)]
pub struct ResourceGuard {
    live: Arc<AtomicUsize>,
}

impl Drop for ResourceGuard {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

// ── Probe ─────────────────────────────────────────────────────────────────────

/// One input event as observed by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectedInput {
    Pointer(PointerEvent),
    Keyboard(KeyboardEvent),
}

/// One step of a mock engine's display script.
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// `next_batch` returns these tiles.
    Batch(Vec<BitmapTile>),
    /// `next_batch` fails with this error.
    Fail(EngineError),
    /// `next_batch` reports that the server ended the session.
    End,
}

#[derive(Debug, Default)]
struct ProbeState {
    inputs: Mutex<Vec<InjectedInput>>,
    shutdowns: AtomicUsize,
    fetches: AtomicUsize,
    connect_attempts: AtomicUsize,
    resources: ResourceCounter,
}

/// Shared view of everything the mock engines created by one connector did.
#[derive(Debug, Clone, Default)]
pub struct MockEngineProbe {
    state: Arc<ProbeState>,
}

impl MockEngineProbe {
    /// Input events accepted so far, in the order the engine received them.
    pub fn inputs(&self) -> Vec<InjectedInput> {
        self.state
            .inputs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of engine shutdowns performed.
    pub fn shutdown_count(&self) -> usize {
        self.state.shutdowns.load(Ordering::SeqCst)
    }

    /// Number of `next_batch` calls, including ones that never completed.
    pub fn fetch_count(&self) -> usize {
        self.state.fetches.load(Ordering::SeqCst)
    }

    /// Number of times `connect` was called.
    pub fn connect_attempts(&self) -> usize {
        self.state.connect_attempts.load(Ordering::SeqCst)
    }

    /// Simulated transport resources still held.
    pub fn live_resources(&self) -> usize {
        self.state.resources.live()
    }

    fn record(&self, input: InjectedInput) {
        self.state
            .inputs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(input);
    }
}

// ── MockEngine ────────────────────────────────────────────────────────────────

/// A connected mock session.
pub struct MockEngine {
    script: VecDeque<ScriptStep>,
    width: u16,
    height: u16,
    probe: MockEngineProbe,
    transport: Option<ResourceGuard>,
    input_delay: Duration,
    shutdown_delay: Duration,
}

impl MockEngine {
    /// Creates an engine that never produces display updates, with its own
    /// probe.  Useful where only the session bookkeeping matters.
    pub fn idle(width: u16, height: u16) -> Self {
        let probe = MockEngineProbe::default();
        let transport = probe.state.resources.acquire();
        Self::with_parts(Vec::new(), width, height, probe, transport)
    }

    fn with_parts(
        script: Vec<ScriptStep>,
        width: u16,
        height: u16,
        probe: MockEngineProbe,
        transport: ResourceGuard,
    ) -> Self {
        Self {
            script: script.into(),
            width,
            height,
            probe,
            transport: Some(transport),
            input_delay: Duration::ZERO,
            shutdown_delay: Duration::ZERO,
        }
    }

    fn ensure_open(&self) -> Result<(), EngineError> {
        if self.transport.is_none() {
            return Err(EngineError::Closed);
        }
        Ok(())
    }

    async fn stall(delay: Duration) {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl RdpEngine for MockEngine {
    async fn next_batch(&mut self) -> Result<Option<Vec<BitmapTile>>, EngineError> {
        self.probe.state.fetches.fetch_add(1, Ordering::SeqCst);
        self.ensure_open()?;
        match self.script.pop_front() {
            Some(ScriptStep::Batch(tiles)) => Ok(Some(tiles)),
            Some(ScriptStep::Fail(e)) => Err(e),
            Some(ScriptStep::End) => Ok(None),
            None => std::future::pending().await,
        }
    }

    async fn write_pointer(&mut self, event: PointerEvent) -> Result<(), EngineError> {
        self.ensure_open()?;
        Self::stall(self.input_delay).await;
        if event.x >= self.width || event.y >= self.height {
            return Err(EngineError::Rejected(format!(
                "pointer ({}, {}) outside {}x{} desktop",
                event.x, event.y, self.width, self.height
            )));
        }
        self.probe.record(InjectedInput::Pointer(event));
        Ok(())
    }

    async fn write_keyboard(&mut self, event: KeyboardEvent) -> Result<(), EngineError> {
        self.ensure_open()?;
        Self::stall(self.input_delay).await;
        self.probe.record(InjectedInput::Keyboard(event));
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), EngineError> {
        // A shutdown abandoned mid-stall leaves the transport to `Drop`.
        Self::stall(self.shutdown_delay).await;
        let Some(transport) = self.transport.take() else {
            return Err(EngineError::Closed);
        };
        drop(transport);
        self.probe.state.shutdowns.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ── MockConnector ─────────────────────────────────────────────────────────────

/// Connector producing [`MockEngine`]s that share one probe.
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    script: Vec<ScriptStep>,
    failure: Option<EngineError>,
    handshake_delay: Duration,
    input_delay: Duration,
    shutdown_delay: Duration,
    probe: MockEngineProbe,
}

impl MockConnector {
    /// Creates a connector whose engines never produce display updates.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every engine replays `script` from the start.
    pub fn with_script(mut self, script: Vec<ScriptStep>) -> Self {
        self.script = script;
        self
    }

    /// Every connect attempt fails with `err` after the handshake delay.
    pub fn failing_with(mut self, err: EngineError) -> Self {
        self.failure = Some(err);
        self
    }

    /// Every connect attempt takes at least `delay`.
    pub fn with_handshake_delay(mut self, delay: Duration) -> Self {
        self.handshake_delay = delay;
        self
    }

    /// Every input write on the resulting engines stalls for `delay` before
    /// it is applied.
    pub fn with_input_delay(mut self, delay: Duration) -> Self {
        self.input_delay = delay;
        self
    }

    /// Every engine shutdown stalls for `delay` before releasing the
    /// transport.
    pub fn with_shutdown_delay(mut self, delay: Duration) -> Self {
        self.shutdown_delay = delay;
        self
    }

    /// Returns a handle onto the shared probe.
    pub fn probe(&self) -> MockEngineProbe {
        self.probe.clone()
    }
}

#[async_trait]
impl EngineConnector for MockConnector {
    async fn connect(&self, params: &ConnectionParams) -> Result<Box<dyn RdpEngine>, EngineError> {
        self.probe.state.connect_attempts.fetch_add(1, Ordering::SeqCst);

        // Held across the handshake so a timed-out or failed attempt is
        // visible as a leak if it is not released.
        let transport = self.probe.state.resources.acquire();
        if !self.handshake_delay.is_zero() {
            tokio::time::sleep(self.handshake_delay).await;
        }
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }

        let mut engine = MockEngine::with_parts(
            self.script.clone(),
            params.width(),
            params.height(),
            self.probe.clone(),
            transport,
        );
        engine.input_delay = self.input_delay;
        engine.shutdown_delay = self.shutdown_delay;
        Ok(Box::new(engine))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
