/*
 * FreeRTOS Kernel <DEVELOPMENT BRANCH>
 * Copyright (C) 2021 Amazon.com, Inc. or its affiliates. All Rights Reserved.
 *
 * SPDX-License-Identifier: MIT
 *
 * Permission is hereby granted, free of charge, to any person obtaining a copy of
 * this software and associated documentation files (the "Software"), to deal in
 * the Software without restriction, including without limitation the rights to
 * use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of
 * the Software, and to permit persons to whom the Software is furnished to do so,
 * subject to the following conditions:
 *
 * The above copyright notice and this permission notice shall be included in all
 * copies or substantial portions of the Software.
 *
 * THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS
 * FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR
 * COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER
 * IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN
 * CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.
 *
 * https://www.FreeRTOS.org
 * https://github.com/FreeRTOS
 *
 * [AMENDMENT] This file is part of cmsis-freertos, the CMSIS-RTOS2 timer layer
 * and Event Recorder instrumentation over the FreeRTOS software timer service.
 */

//! CMSIS-RTOS2 API
//!
//! Kernel control, thread delays and software timers of the CMSIS-RTOS2
//! API, mapped onto [`Kernel`]; message queues, semaphores, mutexes and
//! event flags live in the submodules. Status codes follow `osStatus_t`:
//! `Ok` stands for `osOK`, every other outcome is an [`OsError`].
//!
//! Every call first checks for interrupt context (`IS_IRQ()`). Kernel
//! control and timers are thread-only; the object functions document what
//! they allow from interrupts.
//!
//! Timeouts are accepted but never waited on: an operation that cannot
//! complete at once fails with [`OsError::Timeout`] when the caller gave a
//! timeout and with [`OsError::Resource`] when it did not.

use alloc::sync::Arc;
use core::cell::Cell;

use critical_section::Mutex;

use crate::config::{KERNEL_ID, KERNEL_VERSION};
use crate::error::{Error, OsError, OsResult};
use crate::kernel::tasks::SchedulerState;
use crate::kernel::timers::{StaticTimer, TimerCallback};
use crate::kernel::Kernel;
use crate::port::Port;
use crate::types::{tick_word, TaskHandle, TickType, TimerHandle};

mod event_flags;
mod message_queue;
mod mutex;
mod semaphore;

pub use event_flags::{EventFlagsAttr, FlagsOptions, OsEventFlagsId, EVENT_FLAGS_INVALID_BITS};
pub use message_queue::{MessageQueueAttr, OsMessageQueueId};
pub use mutex::{MutexAttr, MutexAttrBits, OsMutexId};
pub use semaphore::{OsSemaphoreId, SemaphoreAttr};

// =============================================================================
// Types
// =============================================================================

/// `osKernelState_t`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelState {
    Inactive,
    Ready,
    Running,
    Locked,
    Suspended,
    Error,
}

/// `osVersion_t`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OsVersion {
    /// API version, `major * 10000000 + minor * 10000 + build`
    pub api: u32,
    /// Kernel version, same encoding
    pub kernel: u32,
}

/// `osTimerType_t`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerType {
    /// One-shot timer
    Once,
    /// Repeating timer
    Periodic,
}

/// `osTimerAttr_t`
///
/// A timer is placed in `cb_mem` when it is given together with a `cb_size`
/// large enough for a [`StaticTimer`]; without `cb_mem`, `cb_size` must be 0.
#[derive(Debug, Default)]
pub struct TimerAttr {
    pub name: Option<&'static str>,
    pub cb_mem: Option<&'static mut StaticTimer>,
    pub cb_size: usize,
}

/// `osTimerId_t`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OsTimerId(TimerHandle);

impl OsTimerId {
    /// Kernel timer handle behind the id.
    pub fn handle(self) -> TimerHandle {
        self.0
    }
}

/// `osThreadId_t`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OsThreadId(TaskHandle);

impl OsThreadId {
    /// Kernel task handle behind the id.
    pub fn handle(self) -> TaskHandle {
        self.0
    }
}

/// Where a new control block lives: `Some(Some(mem))` in caller memory,
/// `Some(None)` on the heap, `None` when the attributes are inconsistent.
///
/// Caller memory must be at least as large as the control block; without
/// it, `cb_size` must be 0.
fn control_block<T>(
    cb_mem: Option<&'static mut T>,
    cb_size: usize,
) -> Option<Option<&'static mut T>> {
    match cb_mem {
        Some(mem) if cb_size >= core::mem::size_of::<T>() => Some(Some(mem)),
        None if cb_size == 0 => Some(None),
        _ => None,
    }
}

fn timer_memory(
    attr: Option<TimerAttr>,
) -> Option<(Option<&'static str>, Option<&'static mut StaticTimer>)> {
    match attr {
        None => Some((None, None)),
        Some(attr) => control_block(attr.cb_mem, attr.cb_size).map(|mem| (attr.name, mem)),
    }
}

/// Status of an object operation that could not complete at once.
fn wait_error(error: Error, timeout: u32) -> OsError {
    match error {
        Error::InvalidHandle | Error::Parameter(_) => OsError::Parameter,
        _ if timeout != 0 => OsError::Timeout,
        _ => OsError::Resource,
    }
}

// =============================================================================
// Os2
// =============================================================================

/// CMSIS-RTOS2 front end of one kernel.
pub struct Os2<P: Port> {
    kernel: Kernel<P>,
    state: Mutex<Cell<KernelState>>,
}

impl<P: Port> Os2<P> {
    pub fn new(kernel: Kernel<P>) -> Self {
        Self {
            kernel,
            state: Mutex::new(Cell::new(KernelState::Inactive)),
        }
    }

    pub fn kernel(&self) -> &Kernel<P> {
        &self.kernel
    }

    fn state(&self) -> KernelState {
        critical_section::with(|cs| self.state.borrow(cs).get())
    }

    fn set_state(&self, state: KernelState) {
        critical_section::with(|cs| self.state.borrow(cs).set(state));
    }

    /// `IS_IRQ()`
    fn is_irq(&self) -> bool {
        self.kernel
            .port()
            .is_irq(self.state() == KernelState::Running)
    }

    // =========================================================================
    // Kernel control
    // =========================================================================

    /// `osKernelInitialize()`
    pub fn kernel_initialize(&self) -> OsResult<()> {
        if self.is_irq() {
            return Err(OsError::Isr);
        }
        if self.state() != KernelState::Inactive {
            return Err(OsError::Error);
        }
        self.kernel.trace().setup(false, &self.kernel.config().evr);
        self.set_state(KernelState::Ready);
        log::info!("kernel initialized: {KERNEL_ID}");
        Ok(())
    }

    /// `osKernelGetInfo()`
    ///
    /// Copies as much of the NUL-terminated kernel id as fits into `id_buf`.
    pub fn kernel_get_info(&self, id_buf: Option<&mut [u8]>) -> OsResult<OsVersion> {
        if self.is_irq() {
            return Err(OsError::Isr);
        }
        if let Some(buf) = id_buf {
            let id = KERNEL_ID.as_bytes();
            let len = buf.len().min(id.len() + 1);
            for (i, byte) in buf[..len].iter_mut().enumerate() {
                *byte = id.get(i).copied().unwrap_or(0);
            }
        }
        Ok(OsVersion {
            api: KERNEL_VERSION,
            kernel: KERNEL_VERSION,
        })
    }

    /// `osKernelGetState()`
    pub fn kernel_get_state(&self) -> KernelState {
        if self.is_irq() {
            return KernelState::Error;
        }
        match self.kernel.scheduler_state() {
            SchedulerState::Running => KernelState::Running,
            SchedulerState::Suspended => KernelState::Locked,
            SchedulerState::NotStarted => match self.state() {
                KernelState::Ready => KernelState::Ready,
                _ => KernelState::Inactive,
            },
        }
    }

    /// `osKernelStart()`
    pub fn kernel_start(&self) -> OsResult<()> {
        if self.is_irq() {
            return Err(OsError::Isr);
        }
        if self.state() != KernelState::Ready {
            return Err(OsError::Error);
        }
        self.set_state(KernelState::Running);
        self.kernel.start_scheduler().map_err(|e| {
            log::warn!("scheduler start failed: {e}");
            OsError::Error
        })
    }

    /// `osKernelLock()`: returns the previous lock state.
    pub fn kernel_lock(&self) -> OsResult<bool> {
        if self.is_irq() {
            return Err(OsError::Isr);
        }
        match self.kernel.scheduler_state() {
            SchedulerState::Suspended => Ok(true),
            SchedulerState::Running => {
                self.kernel.suspend_all();
                Ok(false)
            }
            SchedulerState::NotStarted => Err(OsError::Error),
        }
    }

    /// `osKernelUnlock()`: returns the previous lock state.
    pub fn kernel_unlock(&self) -> OsResult<bool> {
        if self.is_irq() {
            return Err(OsError::Isr);
        }
        match self.kernel.scheduler_state() {
            SchedulerState::Suspended => {
                if !self.kernel.resume_all()
                    && self.kernel.scheduler_state() == SchedulerState::Suspended
                {
                    return Err(OsError::Error);
                }
                Ok(true)
            }
            SchedulerState::Running => Ok(false),
            SchedulerState::NotStarted => Err(OsError::Error),
        }
    }

    /// `osKernelRestoreLock()`: returns the new lock state.
    pub fn kernel_restore_lock(&self, lock: bool) -> OsResult<bool> {
        if self.is_irq() {
            return Err(OsError::Isr);
        }
        match self.kernel.scheduler_state() {
            SchedulerState::NotStarted => Err(OsError::Error),
            _ if lock => {
                self.kernel.suspend_all();
                Ok(true)
            }
            _ => {
                if !self.kernel.resume_all()
                    && self.kernel.scheduler_state() != SchedulerState::Running
                {
                    return Err(OsError::Error);
                }
                Ok(false)
            }
        }
    }

    /// `osKernelGetTickCount()`; 0 in interrupt context.
    pub fn kernel_get_tick_count(&self) -> u64 {
        if self.is_irq() {
            return 0;
        }
        u64::from(self.kernel.tick_count())
    }

    /// `osKernelGetTickFreq()`; 0 in interrupt context.
    pub fn kernel_get_tick_freq(&self) -> u32 {
        if self.is_irq() {
            return 0;
        }
        self.kernel.config().tick_rate_hz
    }

    /// `osKernelGetSysTimerCount()`
    ///
    /// Tick count scaled to tick timer cycles plus the cycles elapsed in the
    /// current tick. A pending timer overflow counts as one more tick.
    pub fn kernel_get_sys_timer_count(&self) -> u32 {
        let port = self.kernel.port();
        critical_section::with(|_| {
            let mut ticks = tick_word(self.kernel.tick_count());
            let period = port.tick_timer_period();
            let mut value = period.wrapping_sub(port.tick_timer_value());
            if port.tick_timer_overflow() {
                value = period.wrapping_sub(port.tick_timer_value());
                ticks = ticks.wrapping_add(1);
            }
            value.wrapping_add(ticks.wrapping_mul(period.wrapping_add(1)))
        })
    }

    /// `osKernelGetSysTimerFreq()`
    pub fn kernel_get_sys_timer_freq(&self) -> u32 {
        self.kernel.config().cpu_clock_hz
    }

    // =========================================================================
    // Threads
    // =========================================================================

    /// `osThreadGetId()`: the running task, `None` in interrupt context.
    pub fn thread_get_id(&self) -> Option<OsThreadId> {
        if self.is_irq() {
            return None;
        }
        self.kernel.current_task().map(OsThreadId)
    }

    /// `osDelay()`: sleeps for `ticks` ticks; 0 returns at once.
    pub fn delay(&self, ticks: u32) -> OsResult<()> {
        if self.is_irq() {
            return Err(OsError::Isr);
        }
        if ticks == 0 {
            return Ok(());
        }
        let ticks = TickType::try_from(ticks).map_err(|_| OsError::Parameter)?;
        self.kernel.task_delay(ticks).map_err(|e| {
            log::warn!("osDelay failed: {e}");
            OsError::Error
        })
    }

    /// `osDelayUntil()`: sleeps until the tick count reaches `ticks` after
    /// now. A wake time already reached returns at once.
    pub fn delay_until(&self, ticks: u64) -> OsResult<()> {
        if self.is_irq() {
            return Err(OsError::Isr);
        }
        let increment = TickType::try_from(ticks).map_err(|_| OsError::Parameter)?;
        if increment == 0 {
            return Err(OsError::Parameter);
        }
        if self.kernel.scheduler_state() != SchedulerState::Running {
            return Err(OsError::Error);
        }
        let mut wake = self.kernel.tick_count();
        match self.kernel.task_delay_until(&mut wake, increment) {
            Ok(_) => Ok(()),
            Err(Error::Parameter(_)) => Err(OsError::Parameter),
            Err(_) => Err(OsError::Error),
        }
    }

    // =========================================================================
    // Timers
    // =========================================================================

    /// `osTimerNew()`
    ///
    /// The timer is created dormant with a period of one tick;
    /// [`Os2::timer_start`] sets the real period.
    pub fn timer_new<F>(
        &self,
        func: F,
        timer_type: TimerType,
        attr: Option<TimerAttr>,
    ) -> Option<OsTimerId>
    where
        F: Fn() + Send + Sync + 'static,
    {
        if self.is_irq() {
            return None;
        }
        let (name, buffer) = timer_memory(attr)?;
        let callback: TimerCallback = Arc::new(move |_| func());
        let auto_reload = timer_type == TimerType::Periodic;
        match self
            .kernel
            .timer_create_shared(name, 1, auto_reload, callback, buffer)
        {
            Ok(handle) => Some(OsTimerId(handle)),
            Err(e) => {
                log::warn!("osTimerNew failed: {e}");
                None
            }
        }
    }

    /// `osTimerGetName()`
    pub fn timer_get_name(&self, timer: OsTimerId) -> Option<&'static str> {
        if self.is_irq() {
            return None;
        }
        self.kernel.timer_get_name(timer.0).ok().flatten()
    }

    /// `osTimerStart()`: (re)starts the timer with a period of `ticks`.
    pub fn timer_start(&self, timer: OsTimerId, ticks: u32) -> OsResult<()> {
        if self.is_irq() {
            return Err(OsError::Isr);
        }
        let period = TickType::try_from(ticks).map_err(|_| OsError::Parameter)?;
        match self.kernel.timer_change_period(timer.0, period, 0) {
            Ok(()) => Ok(()),
            Err(Error::InvalidHandle | Error::Parameter(_)) => Err(OsError::Parameter),
            Err(_) => Err(OsError::Resource),
        }
    }

    /// `osTimerStop()`
    pub fn timer_stop(&self, timer: OsTimerId) -> OsResult<()> {
        if self.is_irq() {
            return Err(OsError::Isr);
        }
        match self.kernel.timer_is_active(timer.0) {
            Err(_) => Err(OsError::Parameter),
            Ok(false) => Err(OsError::Resource),
            Ok(true) => self
                .kernel
                .timer_stop(timer.0, 0)
                .map_err(|_| OsError::Error),
        }
    }

    /// `osTimerIsRunning()`
    pub fn timer_is_running(&self, timer: OsTimerId) -> bool {
        if self.is_irq() {
            return false;
        }
        self.kernel.timer_is_active(timer.0).unwrap_or(false)
    }

    /// `osTimerDelete()`
    pub fn timer_delete(&self, timer: OsTimerId) -> OsResult<()> {
        if self.is_irq() {
            return Err(OsError::Isr);
        }
        match self.kernel.timer_delete(timer.0, 0) {
            Ok(()) => Ok(()),
            Err(Error::InvalidHandle) => Err(OsError::Parameter),
            Err(_) => Err(OsError::Resource),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KernelConfig;
    use crate::error::status_code;
    use crate::port::{HostPort, IrqMaskModel};

    fn os() -> Os2<HostPort> {
        let kernel = Kernel::new(HostPort::cortex_m4(), KernelConfig::default()).unwrap();
        Os2::new(kernel)
    }

    #[test]
    fn initialize_only_once() {
        let os = os();
        assert_eq!(os.kernel_get_state(), KernelState::Inactive);
        assert_eq!(os.kernel_initialize(), Ok(()));
        assert_eq!(os.kernel_get_state(), KernelState::Ready);
        assert_eq!(os.kernel_initialize(), Err(OsError::Error));
    }

    #[test]
    fn start_requires_ready() {
        let os = os();
        assert_eq!(os.kernel_start(), Err(OsError::Error));
        os.kernel_initialize().unwrap();
        assert_eq!(os.kernel_start(), Ok(()));
        assert_eq!(os.kernel_get_state(), KernelState::Running);
        assert_eq!(os.kernel_start(), Err(OsError::Error));
    }

    #[test]
    fn info_truncates_the_id() {
        let os = os();
        let mut short = [0xAAu8; 8];
        let version = os.kernel_get_info(Some(&mut short)).unwrap();
        assert_eq!(version.kernel, KERNEL_VERSION);
        assert_eq!(&short, b"FreeRTOS");

        let mut long = [0xAAu8; 32];
        os.kernel_get_info(Some(&mut long)).unwrap();
        let n = KERNEL_ID.len();
        assert_eq!(&long[..n], KERNEL_ID.as_bytes());
        assert_eq!(long[n], 0);
        assert_eq!(long[n + 1], 0xAA);
    }

    #[test]
    fn info_reports_the_cmsis_kernel_id() {
        let os = os();
        let mut buf = [0xAAu8; 20];
        os.kernel_get_info(Some(&mut buf)).unwrap();
        assert_eq!(&buf[..16], b"FreeRTOS V9.0.0\0");
        assert_eq!(buf[16], 0xAA);
    }

    #[test]
    fn lock_nesting() {
        let os = os();
        assert_eq!(os.kernel_lock(), Err(OsError::Error));
        os.kernel_initialize().unwrap();
        os.kernel_start().unwrap();

        assert_eq!(os.kernel_lock(), Ok(false));
        assert_eq!(os.kernel_get_state(), KernelState::Locked);
        assert_eq!(os.kernel_lock(), Ok(true));
        assert_eq!(os.kernel_unlock(), Ok(true));
        assert_eq!(os.kernel_get_state(), KernelState::Running);
        assert_eq!(os.kernel_unlock(), Ok(false));
    }

    #[test]
    fn restore_lock_round_trip() {
        let os = os();
        os.kernel_initialize().unwrap();
        os.kernel_start().unwrap();
        let previous = os.kernel_lock().unwrap();
        assert_eq!(os.kernel_restore_lock(previous), Ok(false));
        assert_eq!(os.kernel_get_state(), KernelState::Running);
        assert_eq!(os.kernel_restore_lock(true), Ok(true));
        assert_eq!(os.kernel_get_state(), KernelState::Locked);
        assert_eq!(os.kernel_restore_lock(false), Ok(false));
    }

    #[test]
    fn isr_context_is_rejected() {
        let os = os();
        let _isr = os.kernel().port().enter_isr();
        assert_eq!(os.kernel_initialize(), Err(OsError::Isr));
        assert_eq!(os.kernel_get_state(), KernelState::Error);
        assert_eq!(os.kernel_get_tick_freq(), 0);
        assert!(os.timer_new(|| {}, TimerType::Once, None).is_none());
    }

    #[test]
    fn basepri_counts_only_once_running() {
        let os = os();
        os.kernel().port().set_basepri(0x20);
        assert_eq!(os.kernel_initialize(), Ok(()));
        assert_eq!(os.kernel_start(), Ok(()));
        assert_eq!(os.kernel_lock(), Err(OsError::Isr));
    }

    #[test]
    fn v7a_irq_mode() {
        let port = HostPort::new(IrqMaskModel::ArmV7A, 80_000_000, 1000);
        port.set_primask(1);
        let os = Os2::new(Kernel::new(port, KernelConfig::default()).unwrap());
        assert_eq!(os.kernel_initialize(), Ok(()));
        os.kernel().port().set_irq_mode(crate::port::ARM_MODE_IRQ);
        assert_eq!(os.kernel_get_state(), KernelState::Error);
    }

    #[test]
    fn sys_timer_count_includes_pending_overflow() {
        let os = os();
        let port = os.kernel().port();
        let period = port.tick_timer_period();
        port.set_tick_timer(period - 100, false);
        assert_eq!(os.kernel_get_sys_timer_count(), 100);
        port.set_tick_timer(period - 5, true);
        assert_eq!(os.kernel_get_sys_timer_count(), 5 + period + 1);
        assert_eq!(os.kernel_get_sys_timer_freq(), 80_000_000);
    }

    #[test]
    fn attr_memory_rules() {
        let os = os();
        let bad = TimerAttr {
            name: Some("bad"),
            cb_mem: None,
            cb_size: 4,
        };
        assert!(os.timer_new(|| {}, TimerType::Once, Some(bad)).is_none());
        let named = TimerAttr {
            name: Some("named"),
            ..TimerAttr::default()
        };
        let id = os.timer_new(|| {}, TimerType::Once, Some(named)).unwrap();
        assert_eq!(os.timer_get_name(id), Some("named"));
        assert_eq!(os.kernel().timer_get_period(id.handle()), Ok(1));
    }

    #[test]
    fn control_block_memory_rule() {
        let big: &'static mut u64 = Box::leak(Box::new(0));
        assert!(matches!(control_block(Some(big), 8), Some(Some(_))));
        let small: &'static mut u64 = Box::leak(Box::new(0));
        assert!(control_block(Some(small), 4).is_none());
        assert!(matches!(control_block::<u64>(None, 0), Some(None)));
        assert!(control_block::<u64>(None, 8).is_none());
    }

    #[test]
    fn failed_waits_report_timeout_only_with_a_timeout() {
        assert_eq!(wait_error(Error::QueueEmpty, 0), OsError::Resource);
        assert_eq!(wait_error(Error::QueueEmpty, 10), OsError::Timeout);
        assert_eq!(wait_error(Error::NotOwner, 0), OsError::Resource);
        assert_eq!(wait_error(Error::InvalidHandle, 10), OsError::Parameter);
    }

    #[test]
    fn stop_of_dormant_timer_is_a_resource_error() {
        let os = os();
        os.kernel_initialize().unwrap();
        os.kernel_start().unwrap();
        let id = os.timer_new(|| {}, TimerType::Periodic, None).unwrap();
        assert_eq!(status_code(&os.timer_stop(id)), -3);
        assert_eq!(os.timer_start(id, 0), Err(OsError::Parameter));
        assert_eq!(os.timer_start(id, 10), Ok(()));
        assert!(os.timer_is_running(id));
        assert_eq!(os.timer_stop(id), Ok(()));
        assert!(!os.timer_is_running(id));
        assert_eq!(os.timer_delete(id), Ok(()));
        assert_eq!(os.timer_delete(id), Err(OsError::Parameter));
        assert_eq!(os.timer_start(id, 10), Err(OsError::Parameter));
    }
}
