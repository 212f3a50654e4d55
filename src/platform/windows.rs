//! Win32 binding service
//!
//! Each listener registers its own window class, creates a message-only
//! window and binds the combination with `RegisterHotKey`. `WM_HOTKEY` and
//! the private unregister message are read with `GetMessageW` on the
//! listener thread; everything else goes through `DispatchMessageW`.

use std::ffi::c_void;
use std::mem::size_of;

use tracing::{error, trace};
use windows::core::{Error as WinError, HSTRING, PCWSTR};
use windows::Win32::Foundation::{GetLastError, HINSTANCE, HMODULE, HWND, LPARAM, LRESULT, WPARAM};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    RegisterHotKey, UnregisterHotKey, HOT_KEY_MODIFIERS, MOD_NOREPEAT,
};
use windows::Win32::UI::WindowsAndMessaging::{
    CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW, GetMessageW, PostMessageW,
    RegisterClassExW, TranslateMessage, UnregisterClassW, HWND_MESSAGE, MSG, WINDOW_EX_STYLE,
    WINDOW_STYLE, WM_HOTKEY, WM_USER, WNDCLASSEXW,
};

use super::{Message, MessagePoster, Platform, PlatformError, Stage};
use crate::hotkey::Shortcut;

/// Private message asking a listener to leave its loop
const MSG_UNREGISTER_HOTKEY: u32 = WM_USER + 42;

/// Native Win32 binding service
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowsPlatform;

impl WindowsPlatform {
    pub fn new() -> Self {
        Self
    }
}

/// Module handle stored as an address so it can be copied freely
#[derive(Debug, Clone, Copy)]
pub struct ModuleHandle(isize);

impl ModuleHandle {
    fn hinstance(self) -> HINSTANCE {
        HINSTANCE(self.0 as *mut c_void)
    }
}

/// A message-only window plus the last message read from it
pub struct WindowSurface {
    hwnd: HWND,
    last: MSG,
}

/// Posts into a listener window's queue from any thread
#[derive(Debug, Clone)]
pub struct WindowPoster(isize);

impl MessagePoster for WindowPoster {
    fn post_unregister(&self) -> Result<(), PlatformError> {
        let hwnd = HWND(self.0 as *mut c_void);
        unsafe { PostMessageW(Some(hwnd), MSG_UNREGISTER_HOTKEY, WPARAM(0), LPARAM(0)) }
            .map_err(|e| win_error(Stage::MessagePost, e))
    }
}

fn last_error(stage: Stage) -> PlatformError {
    let code = unsafe { GetLastError() };
    PlatformError::new(stage, code.0 as i32)
}

fn win_error(stage: Stage, err: WinError) -> PlatformError {
    // HRESULT_FROM_WIN32 keeps the Win32 code in the low word
    PlatformError::new(stage, err.code().0 & 0xFFFF)
}

extern "system" fn window_proc(hwnd: HWND, msg: u32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) }
}

impl Platform for WindowsPlatform {
    type Module = ModuleHandle;
    type Surface = WindowSurface;
    type Poster = WindowPoster;

    fn module_handle(&self) -> Result<ModuleHandle, PlatformError> {
        let module: HMODULE =
            unsafe { GetModuleHandleW(None) }.map_err(|e| win_error(Stage::ModuleHandle, e))?;
        Ok(ModuleHandle(module.0 as isize))
    }

    fn register_class(&self, module: ModuleHandle, class_name: &str) -> Result<(), PlatformError> {
        let class_name = HSTRING::from(class_name);
        let class = WNDCLASSEXW {
            cbSize: size_of::<WNDCLASSEXW>() as u32,
            lpfnWndProc: Some(window_proc),
            hInstance: module.hinstance(),
            lpszClassName: PCWSTR(class_name.as_ptr()),
            ..Default::default()
        };
        if unsafe { RegisterClassExW(&class) } == 0 {
            return Err(last_error(Stage::ClassRegister));
        }
        Ok(())
    }

    fn create_surface(
        &self,
        module: ModuleHandle,
        class_name: &str,
        title: &str,
    ) -> Result<WindowSurface, PlatformError> {
        let class_name = HSTRING::from(class_name);
        let title = HSTRING::from(title);
        let hwnd = unsafe {
            CreateWindowExW(
                WINDOW_EX_STYLE::default(),
                &class_name,
                &title,
                WINDOW_STYLE::default(),
                0,
                0,
                0,
                0,
                Some(HWND_MESSAGE),
                None,
                Some(module.hinstance()),
                None,
            )
        }
        .map_err(|e| win_error(Stage::WindowCreate, e))?;

        Ok(WindowSurface {
            hwnd,
            last: MSG::default(),
        })
    }

    fn poster(&self, surface: &WindowSurface) -> WindowPoster {
        WindowPoster(surface.hwnd.0 as isize)
    }

    fn bind(
        &self,
        surface: &WindowSurface,
        registration_id: i32,
        shortcut: Shortcut,
    ) -> Result<(), PlatformError> {
        // MOD_NOREPEAT: one WM_HOTKEY per press, no auto-repeat
        let modifiers = HOT_KEY_MODIFIERS(shortcut.modifiers.bits() | MOD_NOREPEAT.0);
        unsafe {
            RegisterHotKey(
                Some(surface.hwnd),
                registration_id,
                modifiers,
                shortcut.key_code.code(),
            )
        }
        .map_err(|e| win_error(Stage::HotKeyBind, e))
    }

    fn unbind(&self, surface: &WindowSurface, registration_id: i32) -> Result<(), PlatformError> {
        unsafe { UnregisterHotKey(Some(surface.hwnd), registration_id) }
            .map_err(|e| win_error(Stage::HotKeyUnbind, e))
    }

    fn next_message(&self, surface: &mut WindowSurface) -> Message {
        let result = unsafe { GetMessageW(&mut surface.last, Some(surface.hwnd), 0, 0) };
        match result.0 {
            0 => Message::Closed,
            -1 => {
                let code = unsafe { GetLastError() }.0;
                error!(code, "GetMessageW failed");
                Message::Closed
            }
            _ => match surface.last.message {
                WM_HOTKEY => Message::HotKey {
                    registration_id: surface.last.wParam.0 as i32,
                },
                MSG_UNREGISTER_HOTKEY => Message::Unregister,
                code => Message::Other { code },
            },
        }
    }

    fn dispatch_default(&self, surface: &WindowSurface, message: &Message) {
        trace!(?message, "dispatching to window procedure");
        unsafe {
            let _ = TranslateMessage(&surface.last);
            DispatchMessageW(&surface.last);
        }
    }

    fn destroy_surface(&self, surface: WindowSurface) -> Result<(), PlatformError> {
        unsafe { DestroyWindow(surface.hwnd) }.map_err(|e| win_error(Stage::WindowDestroy, e))
    }

    fn unregister_class(&self, module: ModuleHandle, class_name: &str) -> Result<(), PlatformError> {
        let class_name = HSTRING::from(class_name);
        unsafe { UnregisterClassW(&class_name, Some(module.hinstance())) }
            .map_err(|e| win_error(Stage::ClassUnregister, e))
    }
}
