//! Scheduling priority for the reaper thread

use std::io;

/// Nice value for the reaper: the lowest priority Linux offers.
pub(crate) const REAPER_NICE: libc::c_int = 19;

/// Lower the calling thread to [`REAPER_NICE`].
#[cfg(target_os = "linux")]
pub(crate) fn lower_current_thread() -> io::Result<()> {
    // SAFETY: gettid takes no arguments and cannot fail.
    let tid = unsafe { libc::syscall(libc::SYS_gettid) } as libc::id_t;
    // SAFETY: on Linux PRIO_PROCESS with a thread id adjusts only that thread.
    let rc = unsafe { libc::setpriority(libc::PRIO_PROCESS, tid, REAPER_NICE) };
    if rc == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
pub(crate) fn lower_current_thread() -> io::Result<()> {
    Ok(())
}
