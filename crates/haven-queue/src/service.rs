// SPDX-FileCopyrightText: 2026 Haven Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The crisis queue service.
//!
//! One [`CrisisQueue`] instance is the single source of truth for all
//! crisis requests within its process context. Every mutation runs under
//! one async mutex, so events reach subscribers in exactly the order they
//! are applied to the map, whether they originate from direct calls,
//! expiry timers, or inbound replication.
//!
//! Failure policy: validation failures reject the calling operation and
//! emit nothing. Storage, broadcast, and remote failures are routed to the
//! registered error handlers and never roll back the in-memory mutation. A
//! crisis-support flow must keep working when its side channels do not.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use haven_config::HavenConfig;
use haven_core::{
    clamp_ttl, now_ms, CrisisLevel, CrisisRequest, CrisisStatus, HavenError,
    NullRemoteChannel, QueueEvent, RemoteChannel, RequestId, SnapshotStore,
};
use haven_storage::{NullSnapshotStore, SqliteSnapshotStore};
use haven_transport::{translate_remote_change, LocalBroadcast};

/// Error type subscriber callbacks and error handlers may return.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync>;

/// Subscriber callback invoked for every applied event.
///
/// Callbacks run synchronously inside the mutation and must not call back
/// into the queue's async API.
pub type SubscriberCallback =
    Box<dyn Fn(&QueueEvent) -> Result<(), CallbackError> + Send + Sync>;

/// Handler invoked for every non-fatal internal failure.
pub type ErrorHandler = Box<dyn Fn(&HavenError) -> Result<(), CallbackError> + Send + Sync>;

/// Optional inputs to [`CrisisQueue::create_request`].
#[derive(Debug, Clone, Default)]
pub struct CreateOptions {
    /// Content post that triggered the escalation.
    pub post_id: Option<String>,
    /// Requested time-to-live; clamped to the enforced minimum.
    pub ttl_ms: Option<i64>,
    /// Initial contextual metadata.
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Field updates for [`CrisisQueue::update_request`].
///
/// `metadata` is shallow-merged into the existing map, never wholesale
/// replaced. `expires_at` is deliberately not updatable: updates never
/// extend expiry.
#[derive(Debug, Clone, Default)]
pub struct RequestUpdate {
    pub status: Option<CrisisStatus>,
    pub volunteer_id: Option<String>,
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EventOrigin {
    /// Originated in this instance: persist, broadcast, push to the
    /// remote backend, and notify local subscribers.
    Local,
    /// Received from another context: persist and notify local
    /// subscribers, but never re-send (loop prevention).
    Remote,
}

struct QueueInner {
    default_ttl_ms: i64,
    store: Arc<dyn SnapshotStore>,
    local_broadcast: Option<LocalBroadcast>,
    remote: Arc<dyn RemoteChannel>,
    remote_live: AtomicBool,
    /// The request map. Sole owner of all request state; every mutation
    /// path locks it for the full persist-and-dispatch sequence.
    state: Mutex<HashMap<RequestId, CrisisRequest>>,
    /// One live expiry timer per non-terminal request id.
    timers: std::sync::Mutex<HashMap<RequestId, JoinHandle<()>>>,
    subscribers: std::sync::Mutex<HashMap<String, (u64, SubscriberCallback)>>,
    error_handlers: std::sync::Mutex<HashMap<u64, ErrorHandler>>,
    next_token: AtomicU64,
    shutdown: CancellationToken,
    destroyed: AtomicBool,
    self_weak: Weak<QueueInner>,
}

/// Builder for a [`CrisisQueue`].
///
/// The snapshot store defaults to SQLite when the config names a database
/// path and to the null store otherwise. A remote backend is injected via
/// [`with_remote`](Self::with_remote); without one the null channel is
/// used and the queue runs in local-broadcast-only mode.
pub struct CrisisQueueBuilder {
    config: HavenConfig,
    store: Option<Arc<dyn SnapshotStore>>,
    remote: Option<Arc<dyn RemoteChannel>>,
}

impl CrisisQueueBuilder {
    pub fn new(config: HavenConfig) -> Self {
        Self {
            config,
            store: None,
            remote: None,
        }
    }

    /// Use a specific snapshot store instead of the config-derived one.
    pub fn with_store(mut self, store: Arc<dyn SnapshotStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Plug in a remote replication backend.
    pub fn with_remote(mut self, remote: Arc<dyn RemoteChannel>) -> Self {
        self.remote = Some(remote);
        self
    }

    /// Construct the queue: load and normalize the persisted snapshot,
    /// re-arm expiry timers for loaded requests, attach the transports,
    /// and spawn the inbound listener tasks.
    ///
    /// Transport and storage trouble degrades capabilities instead of
    /// failing construction.
    pub async fn build(self) -> Result<CrisisQueue, HavenError> {
        let store: Arc<dyn SnapshotStore> = match self.store {
            Some(store) => store,
            None => match &self.config.storage.database_path {
                Some(path) => {
                    match SqliteSnapshotStore::open(path, &self.config.storage.snapshot_key)
                        .await
                    {
                        Ok(store) => Arc::new(store),
                        Err(e) => {
                            warn!(error = %e, "snapshot store failed to open, running without persistence");
                            Arc::new(NullSnapshotStore::new())
                        }
                    }
                }
                None => Arc::new(NullSnapshotStore::new()),
            },
        };

        let loaded = match store.load().await {
            Ok(requests) => requests,
            Err(e) => {
                warn!(error = %e, "snapshot load failed, starting empty");
                Vec::new()
            }
        };

        let local_broadcast = if self.config.broadcast.enabled {
            Some(LocalBroadcast::open(
                &self.config.broadcast.channel,
                self.config.broadcast.capacity,
            ))
        } else {
            None
        };

        if self.config.remote.is_configured() && self.remote.is_none() {
            warn!("remote backend configured but none linked, running local-broadcast-only");
        }
        let remote: Arc<dyn RemoteChannel> = self
            .remote
            .unwrap_or_else(|| Arc::new(NullRemoteChannel::new()));

        let mut remote_live = false;
        if remote.is_configured() {
            match remote.connect().await {
                Ok(()) => {
                    info!(remote = remote.name(), "remote channel connected");
                    remote_live = true;
                }
                Err(e) => {
                    warn!(error = %e, "remote connect failed, running local-broadcast-only");
                }
            }
        }

        let mut requests = HashMap::with_capacity(loaded.len());
        for request in loaded {
            requests.insert(request.id.clone(), request);
        }

        let inner = Arc::new_cyclic(|weak| QueueInner {
            default_ttl_ms: self.config.queue.default_ttl_ms,
            store,
            local_broadcast,
            remote,
            remote_live: AtomicBool::new(remote_live),
            state: Mutex::new(requests),
            timers: std::sync::Mutex::new(HashMap::new()),
            subscribers: std::sync::Mutex::new(HashMap::new()),
            error_handlers: std::sync::Mutex::new(HashMap::new()),
            next_token: AtomicU64::new(0),
            shutdown: CancellationToken::new(),
            destroyed: AtomicBool::new(false),
            self_weak: weak.clone(),
        });

        inner.rearm_loaded().await;
        inner.spawn_broadcast_listener();
        inner.spawn_remote_listener().await;

        info!(
            broadcast = inner.local_broadcast.is_some(),
            remote = inner.remote_live.load(Ordering::SeqCst),
            persistent = inner.store.is_available(),
            "crisis queue ready"
        );

        Ok(CrisisQueue { inner })
    }
}

/// Handle to a crisis queue instance. Cheap to clone; all clones share
/// the same underlying state.
#[derive(Clone)]
pub struct CrisisQueue {
    inner: Arc<QueueInner>,
}

impl CrisisQueue {
    /// Create a new crisis request in `pending` status.
    ///
    /// `student_id` must be non-empty. The TTL is clamped to the enforced
    /// minimum and fixes `expires_at` for the request's lifetime.
    pub async fn create_request(
        &self,
        student_id: &str,
        crisis_level: CrisisLevel,
        options: CreateOptions,
    ) -> Result<CrisisRequest, HavenError> {
        self.inner.ensure_active()?;
        if student_id.trim().is_empty() {
            return Err(HavenError::Validation("studentId is required".to_string()));
        }

        let timestamp = now_ms();
        let ttl = clamp_ttl(options.ttl_ms.unwrap_or(self.inner.default_ttl_ms));
        let request = CrisisRequest {
            id: RequestId::generate(),
            student_id: student_id.to_string(),
            crisis_level,
            status: CrisisStatus::Pending,
            timestamp,
            ttl,
            expires_at: timestamp + ttl,
            post_id: options.post_id,
            volunteer_id: None,
            metadata: options.metadata,
        };

        debug!(id = %request.id, level = %crisis_level, ttl, "crisis request created");
        Ok(self.inner.commit_upsert(request, EventOrigin::Local).await)
    }

    /// Apply field updates to an existing request.
    ///
    /// Fails with [`HavenError::NotFound`] if the id is unknown; no partial
    /// mutation occurs and no events are emitted on failure. A terminal
    /// status cancels the expiry timer; a non-terminal one re-arms it
    /// against the unchanged `expires_at`.
    pub async fn update_request(
        &self,
        id: &RequestId,
        updates: RequestUpdate,
    ) -> Result<CrisisRequest, HavenError> {
        self.inner.ensure_active()?;
        self.inner
            .apply_update(id, updates, false)
            .await?
            .ok_or_else(|| HavenError::NotFound(id.to_string()))
    }

    /// Remove a request entirely, cancelling its expiry timer.
    pub async fn delete_request(&self, id: &RequestId) -> Result<(), HavenError> {
        self.inner.ensure_active()?;
        let mut state = self.inner.state.lock().await;
        if state.remove(id).is_none() {
            return Err(HavenError::NotFound(id.to_string()));
        }
        self.inner.cancel_timer(id);
        let event = QueueEvent::Delete {
            request_id: id.clone(),
        };
        self.inner
            .persist_and_dispatch(&state, event, EventOrigin::Local)
            .await;
        debug!(id = %id, "crisis request deleted");
        Ok(())
    }

    /// Defensive copy of all current requests, ordered by ascending
    /// creation timestamp. Pure read.
    pub async fn snapshot(&self) -> Vec<CrisisRequest> {
        let state = self.inner.state.lock().await;
        let mut requests: Vec<CrisisRequest> = state.values().cloned().collect();
        requests.sort_by_key(|r| r.timestamp);
        requests
    }

    /// Number of requests currently in the map (any status).
    pub async fn len(&self) -> usize {
        self.inner.state.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Register a callback for every future upsert/delete event, local or
    /// replicated. A second subscription under the same id replaces the
    /// first. Returns a closure that removes exactly this registration.
    ///
    /// Callbacks run synchronously during the mutation and must not call
    /// back into the queue's async API.
    pub fn subscribe<F>(
        &self,
        subscriber_id: impl Into<String>,
        callback: F,
    ) -> impl FnOnce() + Send
    where
        F: Fn(&QueueEvent) -> Result<(), CallbackError> + Send + Sync + 'static,
    {
        let key = subscriber_id.into();
        let generation = self.inner.next_token.fetch_add(1, Ordering::SeqCst);
        self.inner
            .subscribers
            .lock()
            .expect("subscriber lock poisoned")
            .insert(key.clone(), (generation, Box::new(callback)));

        let weak = Arc::downgrade(&self.inner);
        move || {
            if let Some(inner) = weak.upgrade() {
                let mut subscribers =
                    inner.subscribers.lock().expect("subscriber lock poisoned");
                // Only remove if this registration was not overwritten since.
                if subscribers.get(&key).is_some_and(|(g, _)| *g == generation) {
                    subscribers.remove(&key);
                }
            }
        }
    }

    /// Register a handler for non-fatal internal failures. A failing
    /// handler never affects the others. Returns a removal closure.
    pub fn on_error<F>(&self, handler: F) -> impl FnOnce() + Send
    where
        F: Fn(&HavenError) -> Result<(), CallbackError> + Send + Sync + 'static,
    {
        let token = self.inner.next_token.fetch_add(1, Ordering::SeqCst);
        self.inner
            .error_handlers
            .lock()
            .expect("error handler lock poisoned")
            .insert(token, Box::new(handler));

        let weak = Arc::downgrade(&self.inner);
        move || {
            if let Some(inner) = weak.upgrade() {
                inner
                    .error_handlers
                    .lock()
                    .expect("error handler lock poisoned")
                    .remove(&token);
            }
        }
    }

    /// Whether the local broadcast transport attached successfully.
    pub fn is_broadcast_available(&self) -> bool {
        self.inner.local_broadcast.is_some()
    }

    /// Whether a remote replication backend is connected.
    pub fn is_remote_available(&self) -> bool {
        self.inner.remote_live.load(Ordering::SeqCst)
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.load(Ordering::SeqCst)
    }

    /// Idempotent teardown: cancels every expiry timer, stops the inbound
    /// listeners, closes the transports and store, and clears the
    /// registries and the request map. Mutations on a destroyed instance
    /// return [`HavenError::Destroyed`].
    pub async fn destroy(&self) {
        if self.inner.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.shutdown.cancel();

        let timers = std::mem::take(
            &mut *self.inner.timers.lock().expect("timer lock poisoned"),
        );
        for (_, handle) in timers {
            handle.abort();
        }

        if let Err(e) = self.inner.remote.close().await {
            warn!(error = %e, "remote close failed during destroy");
        }
        if let Err(e) = self.inner.store.close().await {
            warn!(error = %e, "store close failed during destroy");
        }

        self.inner
            .subscribers
            .lock()
            .expect("subscriber lock poisoned")
            .clear();
        self.inner
            .error_handlers
            .lock()
            .expect("error handler lock poisoned")
            .clear();
        self.inner.state.lock().await.clear();

        info!("crisis queue destroyed");
    }
}

impl QueueInner {
    fn ensure_active(&self) -> Result<(), HavenError> {
        if self.destroyed.load(Ordering::SeqCst) {
            Err(HavenError::Destroyed)
        } else {
            Ok(())
        }
    }

    /// Insert or replace a request, arming or cancelling its expiry timer,
    /// then persist and dispatch. Shared by creation and the remote-apply
    /// path.
    async fn commit_upsert(&self, mut request: CrisisRequest, origin: EventOrigin) -> CrisisRequest {
        let mut state = self.state.lock().await;
        request.ttl = clamp_ttl(request.ttl);
        self.arm_or_expire(&mut request);
        state.insert(request.id.clone(), request.clone());
        let event = QueueEvent::Upsert {
            request: request.clone(),
        };
        self.persist_and_dispatch(&state, event, origin).await;
        request
    }

    /// The shared update path.
    ///
    /// With `only_if_active`, a missing or already-terminal request is a
    /// silent no-op; that is how a fired timer avoids double-expiring a
    /// request that was resolved or deleted in the meantime.
    async fn apply_update(
        &self,
        id: &RequestId,
        updates: RequestUpdate,
        only_if_active: bool,
    ) -> Result<Option<CrisisRequest>, HavenError> {
        let mut state = self.state.lock().await;
        let Some(existing) = state.get(id) else {
            if only_if_active {
                return Ok(None);
            }
            return Err(HavenError::NotFound(id.to_string()));
        };
        if only_if_active && existing.status.is_terminal() {
            return Ok(None);
        }

        let mut updated = existing.clone();
        if let Some(status) = updates.status {
            updated.status = status;
        }
        if let Some(volunteer_id) = updates.volunteer_id {
            updated.volunteer_id = Some(volunteer_id);
        }
        if let Some(incoming) = updates.metadata {
            let merged = updated.metadata.get_or_insert_with(Default::default);
            for (key, value) in incoming {
                merged.insert(key, value);
            }
        }

        self.arm_or_expire(&mut updated);
        state.insert(id.clone(), updated.clone());
        let event = QueueEvent::Upsert {
            request: updated.clone(),
        };
        self.persist_and_dispatch(&state, event, EventOrigin::Local)
            .await;
        Ok(Some(updated))
    }

    /// Arm the expiry timer for a non-terminal request, or cancel it for a
    /// terminal one. A request already past due flips to `expired` right
    /// here instead of getting a zero-delay timer.
    fn arm_or_expire(&self, request: &mut CrisisRequest) {
        if request.status.is_terminal() {
            self.cancel_timer(&request.id);
            return;
        }
        let delay = request.expires_at - now_ms();
        if delay <= 0 {
            request.status = CrisisStatus::Expired;
            self.cancel_timer(&request.id);
        } else {
            self.schedule_timer(&request.id, delay);
        }
    }

    /// Schedule the one-shot expiry callback, replacing any live timer for
    /// this id so a request never has two.
    fn schedule_timer(&self, id: &RequestId, delay_ms: i64) {
        let weak = self.self_weak.clone();
        let timer_id = id.clone();
        let token = self.shutdown.clone();
        debug!(id = %id, delay_ms, "expiry timer armed");

        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(Duration::from_millis(delay_ms as u64)) => {
                    if let Some(inner) = weak.upgrade() {
                        inner.expire(timer_id).await;
                    }
                }
            }
        });

        let mut timers = self.timers.lock().expect("timer lock poisoned");
        if let Some(previous) = timers.insert(id.clone(), handle) {
            previous.abort();
        }
    }

    /// Unconditional, idempotent timer cancellation.
    fn cancel_timer(&self, id: &RequestId) {
        if let Some(handle) = self
            .timers
            .lock()
            .expect("timer lock poisoned")
            .remove(id)
        {
            handle.abort();
        }
    }

    /// Fired-timer path. Re-fetches the request by id (never trusts state
    /// captured at scheduling time) and expires it through the same
    /// update path explicit mutations use.
    async fn expire(&self, id: RequestId) {
        // Drop our own timer entry without aborting it: this runs inside
        // that very task, and the terminal-status cancellation below would
        // otherwise abort us mid-dispatch.
        self.timers
            .lock()
            .expect("timer lock poisoned")
            .remove(&id);
        if self.ensure_active().is_err() {
            return;
        }
        let expired = RequestUpdate {
            status: Some(CrisisStatus::Expired),
            ..RequestUpdate::default()
        };
        match self.apply_update(&id, expired, true).await {
            Ok(Some(_)) => info!(id = %id, "crisis request expired"),
            Ok(None) => debug!(id = %id, "expiry no-op, request gone or terminal"),
            Err(e) => warn!(id = %id, error = %e, "expiry failed"),
        }
    }

    /// Persist the full snapshot and fan the event out: to the local
    /// broadcast and remote backend for local origins, and to local
    /// subscribers always. Side-channel failures go to the error handlers;
    /// the in-memory mutation stands regardless.
    async fn persist_and_dispatch(
        &self,
        state: &HashMap<RequestId, CrisisRequest>,
        event: QueueEvent,
        origin: EventOrigin,
    ) {
        let mut snapshot: Vec<CrisisRequest> = state.values().cloned().collect();
        snapshot.sort_by_key(|r| r.timestamp);
        if let Err(e) = self.store.save(&snapshot).await {
            warn!(error = %e, "snapshot persist failed");
            self.dispatch_error(&e);
        }

        if origin == EventOrigin::Local {
            if let Some(broadcast) = &self.local_broadcast {
                broadcast.send(event.clone());
            }
        }

        self.notify_subscribers(&event);

        if origin == EventOrigin::Local && self.remote_live.load(Ordering::SeqCst) {
            if let Err(e) = self.remote.apply_mutation(&event).await {
                warn!(error = %e, "remote mutation push failed");
                self.dispatch_error(&e);
            }
        }
    }

    /// Deliver one event to every subscriber. A failing subscriber is
    /// reported through the error handlers and never blocks the others.
    fn notify_subscribers(&self, event: &QueueEvent) {
        let subscribers = self.subscribers.lock().expect("subscriber lock poisoned");
        for (subscriber_id, (_, callback)) in subscribers.iter() {
            if let Err(source) = callback(event) {
                let error = HavenError::Subscriber {
                    subscriber_id: subscriber_id.clone(),
                    source,
                };
                warn!(error = %error, "subscriber callback failed");
                self.dispatch_error(&error);
            }
        }
    }

    /// Deliver one normalized error to every handler. A failing handler is
    /// logged and never suppresses delivery to the others.
    fn dispatch_error(&self, error: &HavenError) {
        let handlers = self
            .error_handlers
            .lock()
            .expect("error handler lock poisoned");
        for (token, handler) in handlers.iter() {
            if let Err(e) = handler(error) {
                warn!(handler = token, error = %e, "error handler failed");
            }
        }
    }

    /// Apply an event received from another context. Surfaces to local
    /// subscribers and storage, but is never re-sent outbound.
    async fn apply_remote(&self, event: QueueEvent) {
        if self.ensure_active().is_err() {
            return;
        }
        match event {
            QueueEvent::Upsert { request } => {
                debug!(id = %request.id, "applying replicated upsert");
                self.commit_upsert(request, EventOrigin::Remote).await;
            }
            QueueEvent::Delete { request_id } => {
                let mut state = self.state.lock().await;
                if state.remove(&request_id).is_none() {
                    debug!(id = %request_id, "replicated delete for unknown request");
                    return;
                }
                self.cancel_timer(&request_id);
                let event = QueueEvent::Delete { request_id };
                self.persist_and_dispatch(&state, event, EventOrigin::Remote)
                    .await;
            }
        }
    }

    /// Re-arm expiry for every non-terminal request loaded from storage.
    /// Entries already past due expire immediately and are dispatched like
    /// any other expiry.
    async fn rearm_loaded(&self) {
        let mut events = Vec::new();
        let mut state = self.state.lock().await;
        for request in state.values_mut() {
            if request.status.is_terminal() {
                continue;
            }
            self.arm_or_expire(request);
            if request.status == CrisisStatus::Expired {
                info!(id = %request.id, "loaded request already past due, expired");
                events.push(QueueEvent::Upsert {
                    request: request.clone(),
                });
            }
        }
        for event in events {
            self.persist_and_dispatch(&state, event, EventOrigin::Local)
                .await;
        }
    }

    /// Forward envelopes from the local broadcast into the remote-apply
    /// path, dropping our own (loop prevention).
    fn spawn_broadcast_listener(self: &Arc<Self>) {
        let Some(local_broadcast) = &self.local_broadcast else {
            return;
        };
        let mut rx = local_broadcast.subscribe();
        let own_origin = local_broadcast.origin();
        let weak = Arc::downgrade(self);
        let token = self.shutdown.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    received = rx.recv() => match received {
                        Ok(envelope) => {
                            if envelope.origin == own_origin {
                                continue;
                            }
                            let Some(inner) = weak.upgrade() else { break };
                            inner.apply_remote(envelope.event).await;
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(skipped, "local broadcast lagged, events missed");
                            if let Some(inner) = weak.upgrade() {
                                inner.dispatch_error(&HavenError::Transport {
                                    message: format!(
                                        "local broadcast lagged by {skipped} events"
                                    ),
                                    source: None,
                                });
                            }
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
            debug!("broadcast listener stopped");
        });
    }

    /// Forward row changes from the remote backend into the remote-apply
    /// path. Subscribe failure degrades to local-broadcast-only mode.
    async fn spawn_remote_listener(self: &Arc<Self>) {
        if !self.remote_live.load(Ordering::SeqCst) {
            return;
        }
        let mut rx = match self.remote.subscribe_changes().await {
            Ok(rx) => rx,
            Err(e) => {
                warn!(error = %e, "remote subscribe failed, running local-broadcast-only");
                self.remote_live.store(false, Ordering::SeqCst);
                return;
            }
        };

        let weak = Arc::downgrade(self);
        let token = self.shutdown.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    change = rx.recv() => {
                        let Some(change) = change else {
                            info!("remote channel closed");
                            if let Some(inner) = weak.upgrade() {
                                inner.remote_live.store(false, Ordering::SeqCst);
                            }
                            break;
                        };
                        let Some(event) = translate_remote_change(&change) else {
                            continue;
                        };
                        let Some(inner) = weak.upgrade() else { break };
                        inner.apply_remote(event).await;
                    }
                }
            }
            debug!("remote listener stopped");
        });
    }
}
