use anyhow::{Context, Result};
use parking_lot::Mutex;
use std::io;
use std::os::fd::RawFd;
use std::panic;
use std::sync::OnceLock;

/// Settings captured before entering cbreak mode, restored exactly once
static SAVED: Mutex<Option<(RawFd, libc::termios)>> = parking_lot::const_mutex(None);
static PANIC_HOOK_INSTALLED: OnceLock<()> = OnceLock::new();

/// RAII guard holding a terminal (stdin in production) in cbreak mode
///
/// Keystrokes arrive one at a time without echo while signals stay enabled,
/// so Ctrl+C still interrupts the process. The original settings come back
/// on drop and from a panic hook, whichever runs first.
pub struct CbreakGuard {
    _private: (),
}

impl CbreakGuard {
    pub fn enable(fd: RawFd) -> Result<Self> {
        let original = get_attrs(fd).with_context(|| format!("fd {} is not a terminal", fd))?;

        let mut cbreak = original;
        cbreak.c_lflag &= !(libc::ICANON | libc::ECHO);
        cbreak.c_cc[libc::VMIN] = 1;
        cbreak.c_cc[libc::VTIME] = 0;

        install_panic_hook();
        *SAVED.lock() = Some((fd, original));

        if let Err(e) = set_attrs(fd, &cbreak) {
            SAVED.lock().take();
            return Err(e).context("Failed to switch terminal to cbreak mode");
        }

        tracing::debug!("Terminal switched to cbreak mode");
        Ok(Self { _private: () })
    }
}

impl Drop for CbreakGuard {
    fn drop(&mut self) {
        restore_terminal();
    }
}

pub fn restore_terminal() {
    if let Some((fd, original)) = SAVED.lock().take() {
        let _ = set_attrs(fd, &original);
    }
}

fn install_panic_hook() {
    PANIC_HOOK_INSTALLED.get_or_init(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            restore_terminal();
            previous(info);
        }));
    });
}

fn get_attrs(fd: RawFd) -> io::Result<libc::termios> {
    let mut attrs = std::mem::MaybeUninit::<libc::termios>::uninit();
    // SAFETY: tcgetattr fully initializes `attrs` when it returns 0.
    let rc = unsafe { libc::tcgetattr(fd, attrs.as_mut_ptr()) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(unsafe { attrs.assume_init() })
}

fn set_attrs(fd: RawFd, attrs: &libc::termios) -> io::Result<()> {
    // SAFETY: `attrs` points to a valid termios for the duration of the call.
    let rc = unsafe { libc::tcsetattr(fd, libc::TCSADRAIN, attrs) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}
