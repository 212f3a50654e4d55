//! Platform input-binding service
//!
//! The registration context drives the platform through this trait: acquire
//! a module handle, register a window class, create a message surface, bind
//! the combination, then block on the surface's message queue. Everything
//! except the [`MessagePoster`] stays on the listener thread that created it.

use std::fmt;

use thiserror::Error;

use crate::hotkey::Shortcut;

pub mod simulated;
#[cfg(target_os = "windows")]
pub mod windows;

/// Which platform call failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    ModuleHandle,
    ClassRegister,
    WindowCreate,
    HotKeyBind,
    HotKeyUnbind,
    WindowDestroy,
    ClassUnregister,
    MessagePost,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::ModuleHandle => "GetModuleHandle",
            Stage::ClassRegister => "RegisterClassEx",
            Stage::WindowCreate => "CreateWindowEx",
            Stage::HotKeyBind => "RegisterHotKey",
            Stage::HotKeyUnbind => "UnregisterHotKey",
            Stage::WindowDestroy => "DestroyWindow",
            Stage::ClassUnregister => "UnregisterClass",
            Stage::MessagePost => "PostMessage",
        };
        f.write_str(name)
    }
}

/// A failed platform call and the native error code it reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{stage} not successful (platform code {code})")]
pub struct PlatformError {
    pub stage: Stage,
    pub code: i32,
}

impl PlatformError {
    /// Native code for a combination already bound elsewhere
    pub const HOTKEY_ALREADY_REGISTERED: i32 = 1409;
    /// Native code for unbinding a combination that is not bound
    pub const HOTKEY_NOT_REGISTERED: i32 = 1419;
    /// Native code for a window class name that is already taken
    pub const CLASS_ALREADY_EXISTS: i32 = 1410;

    pub fn new(stage: Stage, code: i32) -> Self {
        Self { stage, code }
    }

    /// Whether binding failed because the combination is owned elsewhere
    pub fn is_already_registered(&self) -> bool {
        self.stage == Stage::HotKeyBind && self.code == Self::HOTKEY_ALREADY_REGISTERED
    }
}

/// Messages read from a surface's queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// A bound combination was pressed
    HotKey { registration_id: i32 },
    /// The owner asked the listener to unregister
    Unregister,
    /// Anything else; passed to default platform handling
    Other { code: u32 },
    /// The queue was shut down or could not be read
    Closed,
}

/// Thread-safe handle for posting into a surface's queue
pub trait MessagePoster: Clone + Send + Sync + 'static {
    fn post_unregister(&self) -> Result<(), PlatformError>;
}

/// The operating system's window/message subsystem, as seen by one listener
pub trait Platform: Send + Sync + 'static {
    /// Process/module handle needed for class registration
    type Module: Copy;
    /// Message-receiving surface; lives and dies on the listener thread
    type Surface;
    type Poster: MessagePoster;

    fn module_handle(&self) -> Result<Self::Module, PlatformError>;

    fn register_class(&self, module: Self::Module, class_name: &str) -> Result<(), PlatformError>;

    fn create_surface(
        &self,
        module: Self::Module,
        class_name: &str,
        title: &str,
    ) -> Result<Self::Surface, PlatformError>;

    fn poster(&self, surface: &Self::Surface) -> Self::Poster;

    fn bind(
        &self,
        surface: &Self::Surface,
        registration_id: i32,
        shortcut: Shortcut,
    ) -> Result<(), PlatformError>;

    fn unbind(&self, surface: &Self::Surface, registration_id: i32) -> Result<(), PlatformError>;

    /// Block until the next message arrives
    fn next_message(&self, surface: &mut Self::Surface) -> Message;

    /// Hand a message the listener does not handle to default processing
    fn dispatch_default(&self, surface: &Self::Surface, message: &Message);

    fn destroy_surface(&self, surface: Self::Surface) -> Result<(), PlatformError>;

    fn unregister_class(&self, module: Self::Module, class_name: &str) -> Result<(), PlatformError>;
}
