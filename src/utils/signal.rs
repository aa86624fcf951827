//! Signal handling for resumable interrupts.
//!
//! Ctrl+C during a prompt is a request to restart the current planning
//! loop, not to kill the process. The handler only sets a flag; prompt
//! call sites translate it into [`VolstrapError::Interrupted`] and the
//! planner clears it before retrying. A second signal restores the default
//! handler and re-raises, forcing immediate termination.
//!
//! Commands already in flight are never interrupted; the flag is checked
//! between external operations only.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);
static SIGNAL_COUNT: AtomicUsize = AtomicUsize::new(0);

extern "C" fn handle_signal(sig: libc::c_int) {
    let prev = SIGNAL_COUNT.fetch_add(1, Ordering::SeqCst);

    if prev == 0 {
        INTERRUPTED.store(true, Ordering::SeqCst);
        // write(2) is async-signal-safe; nothing else here is allowed to be.
        let msg = b"\ninterrupt received..\n";
        unsafe {
            libc::write(2, msg.as_ptr() as *const libc::c_void, msg.len());
        }
    } else {
        let msg = b"\nforced exit - the disk may be half provisioned\n";
        unsafe {
            libc::write(2, msg.as_ptr() as *const libc::c_void, msg.len());
            libc::signal(sig, libc::SIG_DFL);
            libc::raise(sig);
        }
    }
}

/// Install signal handlers for SIGINT and SIGTERM. Idempotent.
pub fn install_signal_handlers() {
    unsafe {
        libc::signal(
            libc::SIGINT,
            handle_signal as *const () as libc::sighandler_t,
        );
        libc::signal(
            libc::SIGTERM,
            handle_signal as *const () as libc::sighandler_t,
        );
    }
}

/// Returns `true` if an interrupt signal has been received.
pub fn is_interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

/// Acknowledge an interrupt so the planner can resume prompting.
pub fn clear_interrupted() {
    INTERRUPTED.store(false, Ordering::SeqCst);
    SIGNAL_COUNT.store(0, Ordering::SeqCst);
}
