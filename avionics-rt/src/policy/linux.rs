/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! [`SchedulerOps`] backed by the Linux scheduling syscalls.
//!
//! * `SCHED_FIFO`: `sched_setscheduler(0, …)`, which on Linux targets the
//!   calling *thread*, not the whole process.
//! * `SCHED_DEADLINE`: raw `sched_setattr` syscall; glibc has no wrapper.
//! * Affinity: `pthread_setaffinity_np` on `pthread_self()`.
//!
//! Other platforms get `ErrorKind::Unsupported` from every call rather than a
//! silent success that would make the measurements meaningless.

use std::io;

use super::{DeadlineAttr, SchedulerOps};

/// Real OS scheduler.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinuxScheduler;

#[cfg(target_os = "linux")]
mod sys {
    use std::io;

    use super::DeadlineAttr;

    /// `SCHED_DEADLINE` policy number (`include/uapi/linux/sched.h`).
    pub const SCHED_DEADLINE: u32 = 6;

    /// Number of CPUs addressable through `cpu_set_t`.
    pub const CPU_SET_CAPACITY: usize = std::mem::size_of::<libc::cpu_set_t>() * 8;

    /// `struct sched_attr` as consumed by `sched_setattr(2)` (SCHED_ATTR_SIZE_VER0).
    #[repr(C)]
    #[derive(Debug, Default)]
    struct SchedAttr {
        size: u32,
        sched_policy: u32,
        sched_flags: u64,
        sched_nice: i32,
        sched_priority: u32,
        sched_runtime: u64,
        sched_deadline: u64,
        sched_period: u64,
    }

    fn check(rc: libc::c_int) -> io::Result<()> {
        if rc < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    }

    pub fn set_scheduler(policy: libc::c_int, priority: libc::c_int) -> io::Result<()> {
        // SAFETY: an all-zero sched_param is valid.
        let mut param: libc::sched_param = unsafe { std::mem::zeroed() };
        param.sched_priority = priority;
        // SAFETY: `param` is a valid sched_param; pid 0 means the calling thread.
        check(unsafe { libc::sched_setscheduler(0, policy, &param) })
    }

    pub fn current_scheduler() -> io::Result<(libc::c_int, libc::c_int)> {
        // SAFETY: pid 0 means the calling thread.
        let policy = unsafe { libc::sched_getscheduler(0) };
        check(policy)?;
        // SAFETY: an all-zero sched_param is valid and writable; pid 0 means
        // the calling thread.
        let mut param: libc::sched_param = unsafe { std::mem::zeroed() };
        check(unsafe { libc::sched_getparam(0, &mut param) })?;
        Ok((policy, param.sched_priority))
    }

    pub fn set_deadline(attr: DeadlineAttr) -> io::Result<()> {
        let raw = SchedAttr {
            size: std::mem::size_of::<SchedAttr>() as u32,
            sched_policy: SCHED_DEADLINE,
            sched_runtime: attr.runtime_ns,
            sched_deadline: attr.deadline_ns,
            sched_period: attr.period_ns,
            ..Default::default()
        };
        // SAFETY: `raw` is a correctly sized, initialised sched_attr that
        // outlives the call; pid 0 targets the calling thread, flags = 0.
        let rc = unsafe {
            libc::syscall(
                libc::SYS_sched_setattr,
                0 as libc::pid_t,
                &raw as *const SchedAttr,
                0 as libc::c_uint,
            )
        };
        if rc < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    }

    pub fn pin_to_core(core: usize) -> io::Result<()> {
        if core >= CPU_SET_CAPACITY {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "core index {} exceeds CPU_SET_CAPACITY ({})",
                    core, CPU_SET_CAPACITY
                ),
            ));
        }

        // SAFETY:
        // - cpu_set_t is valid when zeroed
        // - core < CPU_SET_CAPACITY, so CPU_SET stays in bounds
        // - pthread_setaffinity_np returns the error code directly (not errno)
        unsafe {
            let mut set: libc::cpu_set_t = std::mem::zeroed();
            libc::CPU_ZERO(&mut set);
            libc::CPU_SET(core, &mut set);
            let rc = libc::pthread_setaffinity_np(
                libc::pthread_self(),
                std::mem::size_of::<libc::cpu_set_t>(),
                &set,
            );
            if rc != 0 {
                return Err(io::Error::from_raw_os_error(rc));
            }
        }
        Ok(())
    }
}

#[cfg(target_os = "linux")]
impl SchedulerOps for LinuxScheduler {
    fn probe_fixed_priority(&self, priority: i32) -> io::Result<()> {
        let (policy, old_priority) = sys::current_scheduler()?;
        sys::set_scheduler(libc::SCHED_FIFO, priority)?;
        // Dropping back to the original (normally SCHED_OTHER) class is
        // always permitted, so the probe leaves the main thread unchanged.
        sys::set_scheduler(policy, old_priority)
    }

    fn set_fixed_priority(&self, priority: i32) -> io::Result<()> {
        sys::set_scheduler(libc::SCHED_FIFO, priority)
    }

    fn set_deadline(&self, attr: DeadlineAttr) -> io::Result<()> {
        sys::set_deadline(attr)
    }

    fn pin_to_core(&self, core: u32) -> io::Result<()> {
        sys::pin_to_core(core as usize)
    }

    fn yield_now(&self) {
        // SAFETY: sched_yield has no preconditions.
        unsafe {
            libc::sched_yield();
        }
    }
}

#[cfg(not(target_os = "linux"))]
fn unsupported() -> io::Error {
    io::Error::new(
        io::ErrorKind::Unsupported,
        "real-time scheduling classes are only supported on Linux",
    )
}

#[cfg(not(target_os = "linux"))]
impl SchedulerOps for LinuxScheduler {
    fn probe_fixed_priority(&self, _priority: i32) -> io::Result<()> {
        Err(unsupported())
    }

    fn set_fixed_priority(&self, _priority: i32) -> io::Result<()> {
        Err(unsupported())
    }

    fn set_deadline(&self, _attr: DeadlineAttr) -> io::Result<()> {
        Err(unsupported())
    }

    fn pin_to_core(&self, _core: u32) -> io::Result<()> {
        Err(unsupported())
    }

    fn yield_now(&self) {
        std::thread::yield_now();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(all(test, target_os = "linux"))]
mod tests {
    use super::*;

    #[test]
    fn pin_rejects_out_of_range_core() {
        let err = LinuxScheduler.pin_to_core(u32::MAX).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn invalid_deadline_parameters_are_refused() {
        // runtime > deadline is rejected with EINVAL (or EPERM when
        // unprivileged) before any admission accounting happens, so this
        // never changes the test thread's class.
        let result = LinuxScheduler.set_deadline(DeadlineAttr {
            runtime_ns: 20_000_000,
            deadline_ns: 10_000_000,
            period_ns: 30_000_000,
        });
        assert!(result.is_err());
    }

    #[test]
    fn probe_leaves_calling_thread_policy_unchanged() {
        let before = sys::current_scheduler().unwrap();
        // May fail when unprivileged; either way the policy must be untouched.
        let _ = LinuxScheduler.probe_fixed_priority(1);
        assert_eq!(sys::current_scheduler().unwrap(), before);
    }
}
