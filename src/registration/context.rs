//! Per-hot-key registration context
//!
//! Each context owns one listener thread. The thread acquires the platform
//! resources, binds the combination, reports the outcome to the registering
//! caller through a rendezvous channel, then blocks on its message queue
//! until the owner posts an unregister request.

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError, SyncSender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use super::id::RegistrationId;
use super::state::{ContextState, StateCell};
use crate::error::{HotKeyError, HotKeyResult};
use crate::events::{HotKeyEvent, HotKeyHandler};
use crate::hotkey::HotKey;
use crate::platform::{Message, MessagePoster, Platform, PlatformError};

/// Failures collected while releasing a hot key's platform resources
///
/// Every release step is attempted even when an earlier one failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeardownReport {
    id: String,
    errors: Vec<PlatformError>,
}

impl TeardownReport {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            errors: Vec::new(),
        }
    }

    fn record(&mut self, result: Result<(), PlatformError>) {
        if let Err(e) = result {
            error!(id = %self.id, error = %e, "release step failed");
            self.errors.push(e);
        }
    }

    /// Id of the hot key that was torn down
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn errors(&self) -> &[PlatformError] {
        &self.errors
    }

    /// Whether every release step succeeded
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// What the listener reports back to the registering caller
type Outcome<P> = Result<<P as Platform>::Poster, PlatformError>;

/// One registered hot key and the listener thread serving it
pub struct RegistrationContext<P: Platform> {
    platform: Arc<P>,
    hot_key: HotKey,
    handler: HotKeyHandler,
    registration_id: i32,
    lease: Option<RegistrationId>,
    state: Arc<StateCell>,
    poster: Option<P::Poster>,
    worker: Option<JoinHandle<TeardownReport>>,
}

impl<P: Platform> RegistrationContext<P> {
    /// Create a context; no platform resources are touched until `register`
    pub fn new(
        platform: Arc<P>,
        hot_key: HotKey,
        handler: HotKeyHandler,
        registration_id: RegistrationId,
    ) -> Self {
        Self {
            platform,
            hot_key,
            handler,
            registration_id: registration_id.get(),
            lease: Some(registration_id),
            state: Arc::new(StateCell::default()),
            poster: None,
            worker: None,
        }
    }

    pub fn hot_key(&self) -> &HotKey {
        &self.hot_key
    }

    /// Process-unique id handed to the platform when binding
    pub fn registration_id(&self) -> i32 {
        self.registration_id
    }

    pub fn state(&self) -> ContextState {
        self.state.get()
    }

    /// Start the listener thread and block until it reports whether the
    /// combination could be bound, waiting at most `timeout`
    pub fn register(&mut self, timeout: Duration) -> HotKeyResult<()> {
        let id = self.hot_key.id().to_string();
        match self.state.get() {
            ContextState::Created => {}
            ContextState::Active => return Ok(()),
            state => return Err(HotKeyError::NotRegistrable { id, state }),
        }

        self.state.set(ContextState::Registering);

        let (ready_tx, ready_rx) = mpsc::sync_channel::<Outcome<P>>(0);
        let listener = Listener {
            platform: Arc::clone(&self.platform),
            hot_key: self.hot_key.clone(),
            handler: Arc::clone(&self.handler),
            registration_id: self.registration_id,
            _lease: self.lease.take(),
            state: Arc::clone(&self.state),
        };

        let state = Arc::clone(&self.state);
        let handle = thread::Builder::new()
            .name(format!("hotkey-listener {}", self.hot_key))
            .spawn(move || listener.run(ready_tx))
            .map_err(|e| {
                state.set(ContextState::Failed);
                HotKeyError::ThreadSpawn(e.to_string())
            })?;

        match ready_rx.recv_timeout(timeout) {
            Ok(Ok(poster)) => {
                self.poster = Some(poster);
                self.worker = Some(handle);
                info!(
                    id = %id,
                    shortcut = %self.hot_key,
                    registration_id = self.registration_id,
                    "registered hot key"
                );
                Ok(())
            }
            Ok(Err(e)) => {
                error!(id = %id, error = %e, "hot key could not be registered");
                // Partial resources were already released by the listener
                let _ = handle.join();
                Err(e.into())
            }
            Err(RecvTimeoutError::Timeout) => {
                // Dropping the receiver makes a late listener release its binding
                warn!(id = %id, ?timeout, "no registration outcome, giving up");
                Err(HotKeyError::WaitInterrupted {
                    id,
                    reason: format!("no outcome within {timeout:?}"),
                })
            }
            Err(RecvTimeoutError::Disconnected) => {
                let reason = match handle.join() {
                    Err(_) => "listener thread panicked",
                    Ok(_) => "listener thread exited without reporting",
                };
                self.state.set(ContextState::Failed);
                error!(id = %id, reason, "registration outcome unknown");
                Err(HotKeyError::WaitInterrupted {
                    id,
                    reason: reason.to_string(),
                })
            }
        }
    }

    /// Ask the listener to unbind and exit
    ///
    /// Returns the listener's join handle so the caller may wait for the
    /// teardown report. `None` if the context was not active or the request
    /// could not be posted.
    pub fn unregister(&mut self) -> Option<JoinHandle<TeardownReport>> {
        let poster = self.poster.take()?;
        let worker = self.worker.take();

        match poster.post_unregister() {
            Ok(()) => {
                debug!(id = %self.hot_key.id(), "unregister requested");
                worker
            }
            Err(e) => {
                error!(
                    id = %self.hot_key.id(),
                    error = %e,
                    "could not signal listener, hot key stays bound"
                );
                None
            }
        }
    }
}

impl<P: Platform> Drop for RegistrationContext<P> {
    fn drop(&mut self) {
        if self.poster.is_some() {
            let _ = self.unregister();
        }
    }
}

/// Platform resources held while the hot key is bound
struct Resources<P: Platform> {
    module: P::Module,
    surface: P::Surface,
}

/// Everything the listener thread needs, owned by that thread
struct Listener<P: Platform> {
    platform: Arc<P>,
    hot_key: HotKey,
    handler: HotKeyHandler,
    registration_id: i32,
    /// Released when the listener exits, after teardown
    _lease: Option<RegistrationId>,
    state: Arc<StateCell>,
}

impl<P: Platform> Listener<P> {
    fn run(self, ready_tx: SyncSender<Outcome<P>>) -> TeardownReport {
        let class_name = format!("HotKeyWindowClass{}", self.registration_id);

        let mut resources = match self.acquire(&class_name) {
            Ok(resources) => resources,
            Err((e, report)) => {
                self.state.set(ContextState::Failed);
                let _ = ready_tx.send(Err(e));
                return report;
            }
        };

        self.state.set(ContextState::Active);
        let poster = self.platform.poster(&resources.surface);
        if ready_tx.send(Ok(poster)).is_err() {
            warn!(id = %self.hot_key.id(), "registering caller went away, releasing binding");
            return self.teardown(resources, &class_name);
        }
        drop(ready_tx);

        self.message_loop(&mut resources.surface);
        self.teardown(resources, &class_name)
    }

    /// Acquire module, class, surface and binding; on failure release what
    /// was acquired in reverse order
    fn acquire(&self, class_name: &str) -> Result<Resources<P>, (PlatformError, TeardownReport)> {
        let mut report = TeardownReport::new(self.hot_key.id());

        let module = match self.platform.module_handle() {
            Ok(module) => module,
            Err(e) => return Err((e, report)),
        };

        if let Err(e) = self.platform.register_class(module, class_name) {
            return Err((e, report));
        }

        let title = format!("HotKey window: {} ({})", self.hot_key.id(), self.hot_key);
        let surface = match self.platform.create_surface(module, class_name, &title) {
            Ok(surface) => surface,
            Err(e) => {
                report.record(self.platform.unregister_class(module, class_name));
                return Err((e, report));
            }
        };

        if let Err(e) = self
            .platform
            .bind(&surface, self.registration_id, self.hot_key.shortcut())
        {
            report.record(self.platform.destroy_surface(surface));
            report.record(self.platform.unregister_class(module, class_name));
            return Err((e, report));
        }

        Ok(Resources { module, surface })
    }

    fn message_loop(&self, surface: &mut P::Surface) {
        loop {
            match self.platform.next_message(surface) {
                Message::HotKey { registration_id } if registration_id == self.registration_id => {
                    self.dispatch();
                }
                Message::HotKey { registration_id } => {
                    debug!(
                        id = %self.hot_key.id(),
                        registration_id,
                        "ignoring firing for another registration"
                    );
                }
                Message::Unregister => {
                    debug!(id = %self.hot_key.id(), "leaving message loop");
                    break;
                }
                Message::Closed => {
                    warn!(id = %self.hot_key.id(), "message queue closed");
                    break;
                }
                message @ Message::Other { .. } => {
                    self.platform.dispatch_default(surface, &message);
                }
            }
        }
    }

    /// Run the handler for one firing on this thread
    fn dispatch(&self) {
        let event = HotKeyEvent::new(self.hot_key.clone());
        debug!(id = %self.hot_key.id(), shortcut = %self.hot_key, "hot key detected");

        let handler = &self.handler;
        if panic::catch_unwind(AssertUnwindSafe(|| handler(&event))).is_err() {
            error!(id = %self.hot_key.id(), "hot key handler panicked");
        }
    }

    /// Unbind, destroy the surface and unregister the class
    fn teardown(&self, resources: Resources<P>, class_name: &str) -> TeardownReport {
        self.state.set(ContextState::Unregistering);
        let Resources { module, surface } = resources;

        let mut report = TeardownReport::new(self.hot_key.id());
        report.record(self.platform.unbind(&surface, self.registration_id));
        report.record(self.platform.destroy_surface(surface));
        report.record(self.platform.unregister_class(module, class_name));

        if report.is_clean() {
            info!(id = %self.hot_key.id(), shortcut = %self.hot_key, "hot key unregistered");
        } else {
            error!(
                id = %self.hot_key.id(),
                shortcut = %self.hot_key,
                failures = report.errors().len(),
                "hot key not successfully unregistered"
            );
        }

        self.state.set(ContextState::Closed);
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hotkey::{KeyCode, Modifiers, Shortcut};
    use crate::registration::id::is_leased;
    use crate::platform::simulated::SimulatedPlatform;
    use crate::platform::Stage;

    const TIMEOUT: Duration = Duration::from_secs(2);

    fn alt_a() -> Shortcut {
        Shortcut::new(Modifiers::ALT, KeyCode::from_char('A').unwrap())
    }

    fn recording_context(
        platform: &Arc<SimulatedPlatform>,
        id: &str,
    ) -> (RegistrationContext<SimulatedPlatform>, mpsc::Receiver<(String, String)>) {
        let (tx, rx) = mpsc::channel();
        let tx = std::sync::Mutex::new(tx);
        let handler: HotKeyHandler = Arc::new(move |event: &HotKeyEvent| {
            let thread_name = thread::current().name().unwrap_or_default().to_string();
            let _ = tx
                .lock()
                .unwrap()
                .send((event.hot_key().id().to_string(), thread_name));
        });
        let hot_key = HotKey::from_shortcut(id, alt_a());
        let registration_id = RegistrationId::lease().unwrap();
        let context = RegistrationContext::new(Arc::clone(platform), hot_key, handler, registration_id);
        (context, rx)
    }

    #[test]
    fn test_created_state() {
        let platform = Arc::new(SimulatedPlatform::new());
        let (context, _rx) = recording_context(&platform, "a");
        assert_eq!(context.state(), ContextState::Created);
        assert_eq!(platform.bound_count(), 0);
    }

    #[test]
    fn test_register_fire_unregister() {
        let platform = Arc::new(SimulatedPlatform::new());
        let (mut context, rx) = recording_context(&platform, "a");

        context.register(TIMEOUT).unwrap();
        assert_eq!(context.state(), ContextState::Active);
        assert!(platform.is_bound(alt_a()));

        assert!(platform.fire(alt_a()));
        let (id, thread_name) = rx.recv_timeout(TIMEOUT).unwrap();
        assert_eq!(id, "a");
        assert_eq!(thread_name, "hotkey-listener ALT+A");

        let report = context.unregister().unwrap().join().unwrap();
        assert!(report.is_clean());
        assert_eq!(context.state(), ContextState::Closed);
        assert_eq!(platform.bound_count(), 0);
        assert_eq!(platform.surface_count(), 0);
        assert_eq!(platform.class_count(), 0);
    }

    #[test]
    fn test_register_is_single_shot() {
        let platform = Arc::new(SimulatedPlatform::new());
        platform.fail_at(Stage::HotKeyBind, 5);
        let (mut context, _rx) = recording_context(&platform, "a");

        assert!(context.register(TIMEOUT).is_err());
        platform.clear_failure(Stage::HotKeyBind);
        assert!(matches!(
            context.register(TIMEOUT),
            Err(HotKeyError::NotRegistrable {
                state: ContextState::Failed,
                ..
            })
        ));
        assert_eq!(platform.bound_count(), 0);
    }

    #[test]
    fn test_bind_refused_releases_partial_resources() {
        let platform = Arc::new(SimulatedPlatform::new());
        platform.fail_at(Stage::HotKeyBind, PlatformError::HOTKEY_ALREADY_REGISTERED);
        let (mut context, _rx) = recording_context(&platform, "a");

        let err = context.register(TIMEOUT).unwrap_err();
        match err {
            HotKeyError::Platform(e) => assert!(e.is_already_registered()),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(context.state(), ContextState::Failed);
        assert_eq!(platform.surface_count(), 0);
        assert_eq!(platform.class_count(), 0);
        assert!(context.unregister().is_none());
    }

    #[test]
    fn test_window_create_failure_releases_class() {
        let platform = Arc::new(SimulatedPlatform::new());
        platform.fail_at(Stage::WindowCreate, 1400);
        let (mut context, _rx) = recording_context(&platform, "a");

        let err = context.register(TIMEOUT).unwrap_err();
        assert!(matches!(
            err,
            HotKeyError::Platform(PlatformError {
                stage: Stage::WindowCreate,
                code: 1400
            })
        ));
        assert_eq!(platform.class_count(), 0);
    }

    #[test]
    fn test_module_handle_failure() {
        let platform = Arc::new(SimulatedPlatform::new());
        platform.fail_at(Stage::ModuleHandle, 126);
        let (mut context, _rx) = recording_context(&platform, "a");

        let err = context.register(TIMEOUT).unwrap_err();
        assert!(matches!(
            err,
            HotKeyError::Platform(PlatformError {
                stage: Stage::ModuleHandle,
                ..
            })
        ));
        assert_eq!(context.state(), ContextState::Failed);
    }

    #[test]
    fn test_teardown_attempts_every_step() {
        let platform = Arc::new(SimulatedPlatform::new());
        let (mut context, _rx) = recording_context(&platform, "a");
        context.register(TIMEOUT).unwrap();

        platform.fail_at(Stage::HotKeyUnbind, 1419);
        let report = context.unregister().unwrap().join().unwrap();

        assert_eq!(
            report.errors(),
            &[PlatformError::new(Stage::HotKeyUnbind, 1419)]
        );
        assert_eq!(report.id(), "a");
        assert_eq!(platform.surface_count(), 0);
        assert_eq!(platform.class_count(), 0);
        assert_eq!(context.state(), ContextState::Closed);
    }

    #[test]
    fn test_panicking_handler_keeps_listener_alive() {
        let platform = Arc::new(SimulatedPlatform::new());
        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let (tx, rx) = mpsc::channel::<()>();
        let tx = std::sync::Mutex::new(tx);
        let counter = Arc::clone(&calls);
        let handler: HotKeyHandler = Arc::new(move |_event: &HotKeyEvent| {
            let n = counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            let _ = tx.lock().unwrap().send(());
            if n == 0 {
                panic!("first firing fails");
            }
        });
        let mut context =
            RegistrationContext::new(
            Arc::clone(&platform),
            HotKey::from_shortcut("p", alt_a()),
            handler,
            RegistrationId::lease().unwrap(),
        );
        context.register(TIMEOUT).unwrap();

        platform.fire(alt_a());
        rx.recv_timeout(TIMEOUT).unwrap();
        platform.fire(alt_a());
        rx.recv_timeout(TIMEOUT).unwrap();

        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 2);
        assert!(context.unregister().unwrap().join().unwrap().is_clean());
    }

    #[test]
    fn test_other_messages_are_passed_through() {
        let platform = Arc::new(SimulatedPlatform::new());
        let (mut context, rx) = recording_context(&platform, "a");
        context.register(TIMEOUT).unwrap();

        platform.broadcast(0x0219);
        platform.fire(alt_a());
        assert_eq!(rx.recv_timeout(TIMEOUT).unwrap().0, "a");
        assert_eq!(context.state(), ContextState::Active);

        context.unregister().unwrap().join().unwrap();
    }

    #[test]
    fn test_timeout_releases_late_binding() {
        let platform = Arc::new(SimulatedPlatform::new());
        platform.set_bind_delay(Duration::from_millis(200));
        let (mut context, _rx) = recording_context(&platform, "slow");

        let err = context.register(Duration::from_millis(20)).unwrap_err();
        assert!(matches!(err, HotKeyError::WaitInterrupted { .. }));

        let deadline = std::time::Instant::now() + TIMEOUT;
        while !context.state().is_terminal() && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(context.state(), ContextState::Closed);
        assert_eq!(platform.bound_count(), 0);
        assert_eq!(platform.surface_count(), 0);
    }

    #[test]
    fn test_registration_id_held_until_teardown() {
        let platform = Arc::new(SimulatedPlatform::new());
        let (mut context, _rx) = recording_context(&platform, "a");
        let registration_id = context.registration_id();
        assert!(is_leased(registration_id));

        context.register(TIMEOUT).unwrap();
        assert!(is_leased(registration_id));

        context.unregister().unwrap().join().unwrap();
        assert!(!is_leased(registration_id));
    }

    #[test]
    fn test_failed_registration_returns_id() {
        let platform = Arc::new(SimulatedPlatform::new());
        platform.fail_at(Stage::HotKeyBind, PlatformError::HOTKEY_ALREADY_REGISTERED);
        let (mut context, _rx) = recording_context(&platform, "a");
        let registration_id = context.registration_id();

        assert!(context.register(TIMEOUT).is_err());
        assert!(!is_leased(registration_id));
    }

    #[test]
    fn test_drop_unregisters() {
        let platform = Arc::new(SimulatedPlatform::new());
        let (mut context, _rx) = recording_context(&platform, "a");
        context.register(TIMEOUT).unwrap();
        let state = Arc::clone(&context.state);

        drop(context);

        let deadline = std::time::Instant::now() + TIMEOUT;
        while state.get() != ContextState::Closed && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(state.get(), ContextState::Closed);
        assert_eq!(platform.bound_count(), 0);
    }
}
