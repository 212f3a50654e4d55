//! In-process binding service
//!
//! Keeps a process-wide table of bound combinations, one queue per surface,
//! and lets callers press a combination with [`SimulatedPlatform::fire`].
//! Individual stages can be made to fail for exercising error paths.

use std::collections::{HashMap, HashSet};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use tracing::{debug, trace};

use super::{Message, MessagePoster, Platform, PlatformError, Stage};
use crate::hotkey::Shortcut;

/// Generic failure code used for injected stage failures without a specific code
pub const INJECTED_FAILURE: i32 = 5;

/// Simulated window/message subsystem
#[derive(Default)]
pub struct SimulatedPlatform {
    inner: Mutex<SimState>,
}

#[derive(Default)]
struct SimState {
    classes: HashSet<String>,
    surfaces: HashMap<u64, Sender<Message>>,
    bindings: HashMap<Shortcut, Binding>,
    failures: HashMap<Stage, i32>,
    bind_delay: Duration,
    next_surface: u64,
}

struct Binding {
    surface: u64,
    registration_id: i32,
    queue: Sender<Message>,
}

/// A surface's queue, owned by the listener thread
pub struct SimSurface {
    id: u64,
    queue: Sender<Message>,
    inbox: Receiver<Message>,
}

/// Posts into a simulated surface's queue from any thread
#[derive(Clone)]
pub struct SimPoster {
    queue: Sender<Message>,
}

impl MessagePoster for SimPoster {
    fn post_unregister(&self) -> Result<(), PlatformError> {
        self.queue
            .send(Message::Unregister)
            .map_err(|_| PlatformError::new(Stage::MessagePost, INJECTED_FAILURE))
    }
}

impl SimulatedPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every subsequent call for `stage` fail with `code`
    pub fn fail_at(&self, stage: Stage, code: i32) {
        self.lock().failures.insert(stage, code);
    }

    /// Stop failing calls for `stage`
    pub fn clear_failure(&self, stage: Stage) {
        self.lock().failures.remove(&stage);
    }

    /// Make binding take at least `delay`, as a slow platform would
    pub fn set_bind_delay(&self, delay: Duration) {
        self.lock().bind_delay = delay;
    }

    fn check(&self, state: &SimState, stage: Stage) -> Result<(), PlatformError> {
        match state.failures.get(&stage) {
            Some(&code) => Err(PlatformError::new(stage, code)),
            None => Ok(()),
        }
    }

    /// Press a combination; returns whether any surface had it bound
    pub fn fire(&self, shortcut: Shortcut) -> bool {
        let state = self.lock();
        let Some(binding) = state.bindings.get(&shortcut) else {
            trace!(%shortcut, "firing ignored, combination not bound");
            return false;
        };
        debug!(%shortcut, registration_id = binding.registration_id, "simulated firing");
        binding
            .queue
            .send(Message::HotKey {
                registration_id: binding.registration_id,
            })
            .is_ok()
    }

    /// Post an arbitrary message code to every live surface
    pub fn broadcast(&self, code: u32) {
        for queue in self.lock().surfaces.values() {
            let _ = queue.send(Message::Other { code });
        }
    }

    pub fn is_bound(&self, shortcut: Shortcut) -> bool {
        self.lock().bindings.contains_key(&shortcut)
    }

    pub fn bound_count(&self) -> usize {
        self.lock().bindings.len()
    }

    pub fn surface_count(&self) -> usize {
        self.lock().surfaces.len()
    }

    pub fn class_count(&self) -> usize {
        self.lock().classes.len()
    }
}

impl Platform for SimulatedPlatform {
    type Module = ();
    type Surface = SimSurface;
    type Poster = SimPoster;

    fn module_handle(&self) -> Result<(), PlatformError> {
        self.check(&self.lock(), Stage::ModuleHandle)
    }

    fn register_class(&self, _module: (), class_name: &str) -> Result<(), PlatformError> {
        let mut state = self.lock();
        self.check(&state, Stage::ClassRegister)?;
        if !state.classes.insert(class_name.to_string()) {
            return Err(PlatformError::new(
                Stage::ClassRegister,
                PlatformError::CLASS_ALREADY_EXISTS,
            ));
        }
        Ok(())
    }

    fn create_surface(
        &self,
        _module: (),
        class_name: &str,
        title: &str,
    ) -> Result<SimSurface, PlatformError> {
        let mut state = self.lock();
        self.check(&state, Stage::WindowCreate)?;
        state.next_surface += 1;
        let id = state.next_surface;
        let (queue, inbox) = mpsc::channel();
        state.surfaces.insert(id, queue.clone());
        trace!(id, class_name, title, "surface created");
        Ok(SimSurface { id, queue, inbox })
    }

    fn poster(&self, surface: &SimSurface) -> SimPoster {
        SimPoster {
            queue: surface.queue.clone(),
        }
    }

    fn bind(
        &self,
        surface: &SimSurface,
        registration_id: i32,
        shortcut: Shortcut,
    ) -> Result<(), PlatformError> {
        let delay = self.lock().bind_delay;
        if !delay.is_zero() {
            thread::sleep(delay);
        }

        let mut state = self.lock();
        self.check(&state, Stage::HotKeyBind)?;
        if state.bindings.contains_key(&shortcut) {
            return Err(PlatformError::new(
                Stage::HotKeyBind,
                PlatformError::HOTKEY_ALREADY_REGISTERED,
            ));
        }
        state.bindings.insert(
            shortcut,
            Binding {
                surface: surface.id,
                registration_id,
                queue: surface.queue.clone(),
            },
        );
        Ok(())
    }

    fn unbind(&self, surface: &SimSurface, registration_id: i32) -> Result<(), PlatformError> {
        let mut state = self.lock();
        self.check(&state, Stage::HotKeyUnbind)?;
        let before = state.bindings.len();
        state
            .bindings
            .retain(|_, b| !(b.surface == surface.id && b.registration_id == registration_id));
        if state.bindings.len() == before {
            return Err(PlatformError::new(
                Stage::HotKeyUnbind,
                PlatformError::HOTKEY_NOT_REGISTERED,
            ));
        }
        Ok(())
    }

    fn next_message(&self, surface: &mut SimSurface) -> Message {
        surface.inbox.recv().unwrap_or(Message::Closed)
    }

    fn dispatch_default(&self, surface: &SimSurface, message: &Message) {
        trace!(surface = surface.id, ?message, "default handling");
    }

    fn destroy_surface(&self, surface: SimSurface) -> Result<(), PlatformError> {
        let mut state = self.lock();
        self.check(&state, Stage::WindowDestroy)?;
        state.surfaces.remove(&surface.id);
        Ok(())
    }

    fn unregister_class(&self, _module: (), class_name: &str) -> Result<(), PlatformError> {
        let mut state = self.lock();
        self.check(&state, Stage::ClassUnregister)?;
        state.classes.remove(class_name);
        Ok(())
    }
}
