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

//! Kernel
//!
//! [`Kernel`] owns the scheduler state, the software timer service and the
//! queue and event group registries behind a single critical section, and
//! drives the timer daemon.
//!
//! ## Daemon execution
//!
//! The daemon runs inline on the calling thread whenever the kernel would
//! have switched to it: on scheduler start, on every tick, when the
//! scheduler resumes, and (with [`DaemonMode::Immediate`]) right after a
//! task-context command was queued. Timer callbacks and pended functions
//! run outside the critical section. While the daemon runs, its task is the
//! current task.

pub mod event_groups;
pub mod list;
pub mod queue;
pub mod registry;
pub mod tasks;
pub mod timers;

use alloc::sync::Arc;
use core::cell::RefCell;

use critical_section::Mutex;

use crate::config::{DaemonMode, KernelConfig, MAX_OBJECT_SLOTS, TIMER_SERVICE_TASK_NAME};
use crate::error::{Error, Result};
use crate::port::Port;
use crate::trace::{NoTrace, TimerApi, TraceHooks};
use crate::types::{tick_word, TaskHandle, TickType, TimerHandle};

use event_groups::EventGroupRegistry;
use queue::QueueRegistry;
use tasks::{Scheduler, SchedulerState};
use timers::{
    DaemonMessage, Invocation, NewTimer, StaticTimer, TimerCallback, TimerCommand, TimerService,
};

#[cfg(feature = "pend-function-call")]
use timers::PendedFunction;

struct KernelCore {
    scheduler: Scheduler,
    timers: TimerService,
    queues: QueueRegistry,
    event_groups: EventGroupRegistry,
    daemon_active: bool,
}

impl KernelCore {
    /// One daemon command. Event group updates are applied here; everything
    /// else belongs to the timer service.
    fn process_command(&mut self, trace: &dyn TraceHooks) -> Option<alloc::vec::Vec<Invocation>> {
        let now = self.scheduler.tick_count();
        let message = self.timers.receive_command(trace)?;
        if let DaemonMessage::EventBits { group, bits, set } = message {
            event_groups::apply_deferred(&mut self.event_groups, group, bits, set, trace);
            return Some(alloc::vec::Vec::new());
        }
        Some(self.timers.dispatch_command(message, now, trace))
    }

    /// Gives the processor back to the task the daemon preempted.
    fn leave_daemon(&mut self, resumed: Option<TaskHandle>) {
        self.daemon_active = false;
        self.scheduler.switch_to(resumed);
    }
}

/// Scheduler and timer service of one kernel instance.
pub struct Kernel<P: Port> {
    port: P,
    config: KernelConfig,
    trace: Arc<dyn TraceHooks>,
    core: Mutex<RefCell<KernelCore>>,
}

/// Leaves the daemon if a callback unwinds.
struct DaemonGuard<'a, P: Port> {
    kernel: &'a Kernel<P>,
    resumed: Option<TaskHandle>,
}

impl<P: Port> Drop for DaemonGuard<'_, P> {
    fn drop(&mut self) {
        let resumed = self.resumed;
        self.kernel.with_core(|core, _| core.leave_daemon(resumed));
    }
}

fn name_word(name: Option<&'static str>) -> u32 {
    name.map_or(0, |n| n.as_ptr() as usize as u32)
}

impl<P: Port> Kernel<P> {
    /// Creates a kernel with the scheduler not yet started.
    pub fn new(port: P, config: KernelConfig) -> Result<Self> {
        config.validate()?;
        let core = KernelCore {
            scheduler: Scheduler::new(config.initial_tick_count, config.max_priorities),
            timers: TimerService::new(config.timer_queue_length, config.max_timers),
            queues: QueueRegistry::new(MAX_OBJECT_SLOTS),
            event_groups: EventGroupRegistry::new(MAX_OBJECT_SLOTS),
            daemon_active: false,
        };
        Ok(Self {
            port,
            config,
            trace: Arc::new(NoTrace),
            core: Mutex::new(RefCell::new(core)),
        })
    }

    /// Replaces the trace hooks.
    pub fn with_trace(mut self, trace: Arc<dyn TraceHooks>) -> Self {
        self.trace = trace;
        self
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    pub fn trace(&self) -> &dyn TraceHooks {
        &*self.trace
    }

    fn with_core<R>(&self, f: impl FnOnce(&mut KernelCore, &dyn TraceHooks) -> R) -> R {
        critical_section::with(|cs| f(&mut self.core.borrow_ref_mut(cs), &*self.trace))
    }

    /// Runs `f` between the API entry and return events of `api`.
    fn traced<R>(
        &self,
        api: TimerApi,
        args: [u32; 4],
        ret: impl FnOnce(&R) -> u32,
        f: impl FnOnce(&mut KernelCore, &dyn TraceHooks) -> R,
    ) -> R {
        self.with_core(|core, trace| {
            trace.timer_api_enter(api, args);
            let result = f(core, trace);
            trace.timer_api_return(api, ret(&result));
            result
        })
    }

    // =========================================================================
    // Scheduler
    // =========================================================================

    /// `vTaskStartScheduler()`
    ///
    /// Creates the timer daemon task, starts the scheduler and lets the
    /// daemon process whatever was queued before the start.
    pub fn start_scheduler(&self) -> Result<()> {
        self.with_core(|core, _| {
            if core.scheduler.state() != SchedulerState::NotStarted {
                return Err(Error::Parameter("scheduler already started"));
            }
            Ok(())
        })?;
        self.timer_create_timer_task()?;
        self.with_core(|core, _| core.scheduler.start());
        log::info!(
            "scheduler started at tick {} ({} Hz)",
            self.tick_count(),
            self.config.tick_rate_hz
        );
        self.run_timer_service();
        Ok(())
    }

    pub fn scheduler_state(&self) -> SchedulerState {
        self.with_core(|core, _| core.scheduler.state())
    }

    /// `vTaskSuspendAll()`
    pub fn suspend_all(&self) {
        self.with_core(|core, _| core.scheduler.suspend_all());
    }

    /// `xTaskResumeAll()`
    ///
    /// Returns `true` once the last suspension level is gone; the pended
    /// ticks have then been applied and the daemon has run.
    pub fn resume_all(&self) -> bool {
        let resumed = self.with_core(|core, trace| core.scheduler.resume_all(trace));
        if resumed {
            self.run_timer_service();
        }
        resumed
    }

    /// `xTaskGetTickCount()`
    pub fn tick_count(&self) -> TickType {
        self.with_core(|core, _| core.scheduler.tick_count())
    }

    /// `xTaskGetTickCountFromISR()`
    pub fn tick_count_from_isr(&self) -> TickType {
        self.tick_count()
    }

    /// Tick interrupt: advances the tick count and lets the daemon run.
    ///
    /// Returns whether the tick count advanced (it does not while the
    /// scheduler is suspended).
    pub fn tick(&self) -> bool {
        let advanced = self.with_core(|core, trace| {
            if core.scheduler.state() == SchedulerState::NotStarted {
                return false;
            }
            core.scheduler.increment_tick(trace)
        });
        if advanced {
            self.run_timer_service();
        }
        advanced
    }

    /// Delivers `ticks` tick interrupts.
    pub fn advance(&self, ticks: u32) {
        for _ in 0..ticks {
            self.tick();
        }
    }

    /// Task name and priority of `task`.
    pub fn task_info(&self, task: TaskHandle) -> Option<(&'static str, u32)> {
        self.with_core(|core, _| core.scheduler.task(task).map(|t| (t.name, t.priority)))
    }

    // =========================================================================
    // Tasks
    // =========================================================================

    /// Registers an application task record.
    pub fn create_task(
        &self,
        name: &'static str,
        priority: u32,
        stack_depth: usize,
    ) -> Result<TaskHandle> {
        self.with_core(|core, trace| core.scheduler.create_task(name, priority, stack_depth, trace))
    }

    /// `xTaskGetCurrentTaskHandle()`
    pub fn current_task(&self) -> Option<TaskHandle> {
        self.with_core(|core, _| core.scheduler.current_task())
    }

    /// Makes `task` the current task, the one mutexes are taken for.
    /// Returns the task it replaces.
    pub fn switch_context(&self, task: Option<TaskHandle>) -> Result<Option<TaskHandle>> {
        self.with_core(|core, _| {
            if let Some(task) = task {
                core.scheduler.task(task).ok_or(Error::InvalidHandle)?;
            }
            Ok(core.scheduler.switch_to(task))
        })
    }

    fn sleep(&self, ticks: TickType) {
        let mut remaining = ticks;
        while remaining > 0 {
            self.tick();
            remaining -= 1;
        }
    }

    /// `vTaskDelay()`
    ///
    /// The calling task sleeps for `ticks` tick interrupts, which are
    /// delivered here; timers expiring meanwhile fire on the way. A delay
    /// of 0 only yields. Delaying needs a running scheduler.
    pub fn task_delay(&self, ticks: TickType) -> Result<()> {
        self.with_core(|core, trace| {
            if !core.scheduler.is_running() {
                return Err(Error::Parameter("delay needs a running scheduler"));
            }
            if ticks > 0 {
                trace.task_delay(tick_word(ticks));
            }
            Ok(())
        })?;
        self.sleep(ticks);
        Ok(())
    }

    /// `xTaskDelayUntil()`
    ///
    /// Sleeps until `*previous_wake + increment` and advances
    /// `previous_wake` to that time. Returns `false` when the wake time has
    /// already passed, in which case no time elapses.
    pub fn task_delay_until(
        &self,
        previous_wake: &mut TickType,
        increment: TickType,
    ) -> Result<bool> {
        if increment == 0 {
            return Err(Error::Parameter("delay increment must be non-zero"));
        }
        let wait = self.with_core(|core, trace| {
            if !core.scheduler.is_running() {
                return Err(Error::Parameter("delay needs a running scheduler"));
            }
            let now = core.scheduler.tick_count();
            let time_to_wake = previous_wake.wrapping_add(increment);
            let should_delay = if now < *previous_wake {
                // The tick count overflowed since the last wake.
                time_to_wake < *previous_wake && time_to_wake > now
            } else {
                time_to_wake < *previous_wake || time_to_wake > now
            };
            *previous_wake = time_to_wake;
            if !should_delay {
                return Ok(None);
            }
            trace.task_delay_until(tick_word(time_to_wake));
            Ok(Some(time_to_wake.wrapping_sub(now)))
        })?;
        match wait {
            Some(ticks) => {
                self.sleep(ticks);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // =========================================================================
    // Timer daemon
    // =========================================================================

    /// Runs the timer daemon until it would block.
    ///
    /// Does nothing before the scheduler starts, while it is suspended, or
    /// when called from a callback the daemon is already running. Returns
    /// the number of callbacks and pended functions executed.
    pub fn run_timer_service(&self) -> usize {
        let entered = self.with_core(|core, _| {
            if !core.scheduler.is_running() || core.daemon_active {
                return None;
            }
            core.daemon_active = true;
            let daemon = core.timers.daemon_task();
            Some(core.scheduler.switch_to(daemon))
        });
        let Some(resumed) = entered else {
            return 0;
        };
        let guard = DaemonGuard {
            kernel: self,
            resumed,
        };

        let mut executed = 0;
        let mut expired = self.with_core(|core, trace| {
            let now = core.scheduler.tick_count();
            core.timers.process_timer(now, trace)
        });
        loop {
            if let Some(batch) = expired.take() {
                executed += run_batch(batch);
            }
            while let Some(batch) = self.with_core(|core, trace| core.process_command(trace)) {
                executed += run_batch(batch);
            }
            // The idle decision and the flag release share one critical
            // section, so a command posted afterwards finds the daemon idle.
            let (batch, idle) = self.with_core(|core, trace| {
                let now = core.scheduler.tick_count();
                let batch = core.timers.process_timer(now, trace);
                let idle = batch.is_none() && core.timers.pending_commands() == 0;
                if idle {
                    core.leave_daemon(resumed);
                }
                (batch, idle)
            });
            if idle {
                core::mem::forget(guard);
                return executed;
            }
            expired = batch;
        }
    }

    fn schedule_daemon(&self) {
        if self.config.daemon_mode == DaemonMode::Immediate {
            self.run_timer_service();
        }
    }

    /// Commands queued for the daemon.
    pub fn pending_timer_commands(&self) -> usize {
        self.with_core(|core, _| core.timers.pending_commands())
    }

    /// Live timers.
    pub fn timer_count(&self) -> usize {
        self.with_core(|core, _| core.timers.timer_count())
    }

    // =========================================================================
    // Timer creation
    // =========================================================================

    /// `xTimerCreateTimerTask()`
    pub fn timer_create_timer_task(&self) -> Result<()> {
        let priority = self.config.timer_task_priority;
        let stack_depth = self.config.timer_task_stack_depth;
        self.traced(
            TimerApi::CreateTimerTask,
            [0; 4],
            |r: &Result<TaskHandle>| u32::from(r.is_ok()),
            |core, trace| {
                core.timers.create_timer_task(
                    &mut core.scheduler,
                    TIMER_SERVICE_TASK_NAME,
                    priority,
                    stack_depth,
                    trace,
                )
            },
        )
        .map(|_| ())
    }

    /// `xTimerCreate()`
    ///
    /// Creates a dormant timer; it runs once started. `period` must be
    /// non-zero.
    pub fn timer_create<F>(
        &self,
        name: Option<&'static str>,
        period: TickType,
        auto_reload: bool,
        id: usize,
        callback: F,
    ) -> Result<TimerHandle>
    where
        F: Fn(TimerHandle) + Send + Sync + 'static,
    {
        let params = NewTimer {
            name,
            period,
            auto_reload,
            id,
            callback: Arc::new(callback),
        };
        self.create_traced(TimerApi::Create, params, None)
    }

    /// `xTimerCreateStatic()`: like [`Kernel::timer_create`], storing the
    /// timer in `buffer`.
    pub fn timer_create_static<F>(
        &self,
        name: Option<&'static str>,
        period: TickType,
        auto_reload: bool,
        id: usize,
        callback: F,
        buffer: &'static mut StaticTimer,
    ) -> Result<TimerHandle>
    where
        F: Fn(TimerHandle) + Send + Sync + 'static,
    {
        let params = NewTimer {
            name,
            period,
            auto_reload,
            id,
            callback: Arc::new(callback),
        };
        self.create_traced(TimerApi::CreateStatic, params, Some(buffer))
    }

    pub(crate) fn timer_create_shared(
        &self,
        name: Option<&'static str>,
        period: TickType,
        auto_reload: bool,
        callback: TimerCallback,
        buffer: Option<&'static mut StaticTimer>,
    ) -> Result<TimerHandle> {
        let api = if buffer.is_some() {
            TimerApi::CreateStatic
        } else {
            TimerApi::Create
        };
        let params = NewTimer {
            name,
            period,
            auto_reload,
            id: 0,
            callback,
        };
        self.create_traced(api, params, buffer)
    }

    fn create_traced(
        &self,
        api: TimerApi,
        params: NewTimer,
        buffer: Option<&'static mut StaticTimer>,
    ) -> Result<TimerHandle> {
        let args = [
            name_word(params.name),
            tick_word(params.period),
            u32::from(params.auto_reload),
            params.id as u32,
        ];
        self.traced(
            api,
            args,
            |r: &Result<TimerHandle>| r.as_ref().map_or(0, |h| h.raw()),
            |core, trace| core.timers.create(params, buffer, trace),
        )
    }

    // =========================================================================
    // Timer commands
    // =========================================================================

    /// `xTimerGenericCommandFromTask()`
    ///
    /// Queues a task-context command. `ticks_to_wait` is accepted for API
    /// parity; a full queue is reported immediately.
    pub fn timer_generic_command_from_task(
        &self,
        timer: TimerHandle,
        command: TimerCommand,
        value: TickType,
        ticks_to_wait: TickType,
    ) -> Result<()> {
        let args = [
            timer.raw(),
            command.id() as u32,
            tick_word(value),
            tick_word(ticks_to_wait),
        ];
        let result = self.traced(
            TimerApi::GenericCommandFromTask,
            args,
            |r: &Result<()>| u32::from(r.is_ok()),
            |core, trace| core.timers.post_command(timer, command, value, false, trace),
        );
        if result.is_ok() {
            self.schedule_daemon();
        }
        result
    }

    /// `xTimerGenericCommandFromISR()`
    ///
    /// Returns whether the daemon was woken, which is the case whenever the
    /// scheduler runs.
    pub fn timer_generic_command_from_isr(
        &self,
        timer: TimerHandle,
        command: TimerCommand,
        value: TickType,
    ) -> Result<bool> {
        let args = [timer.raw(), command.id() as u32, tick_word(value), 0];
        self.traced(
            TimerApi::GenericCommandFromIsr,
            args,
            |r: &Result<bool>| u32::from(r.is_ok()),
            |core, trace| {
                core.timers
                    .post_command(timer, command, value, true, trace)
                    .map(|()| core.scheduler.is_running())
            },
        )
    }

    /// `xTimerStart()`: (re)starts the timer, measuring from the current tick.
    pub fn timer_start(&self, timer: TimerHandle, ticks_to_wait: TickType) -> Result<()> {
        let now = self.tick_count();
        self.timer_generic_command_from_task(timer, TimerCommand::Start, now, ticks_to_wait)
    }

    /// `xTimerStop()`
    pub fn timer_stop(&self, timer: TimerHandle, ticks_to_wait: TickType) -> Result<()> {
        self.timer_generic_command_from_task(timer, TimerCommand::Stop, 0, ticks_to_wait)
    }

    /// `xTimerReset()`
    pub fn timer_reset(&self, timer: TimerHandle, ticks_to_wait: TickType) -> Result<()> {
        let now = self.tick_count();
        self.timer_generic_command_from_task(timer, TimerCommand::Reset, now, ticks_to_wait)
    }

    /// `xTimerChangePeriod()`: sets the period and (re)starts the timer.
    pub fn timer_change_period(
        &self,
        timer: TimerHandle,
        new_period: TickType,
        ticks_to_wait: TickType,
    ) -> Result<()> {
        if new_period == 0 {
            return Err(Error::Parameter("timer period must be non-zero"));
        }
        self.timer_generic_command_from_task(
            timer,
            TimerCommand::ChangePeriod,
            new_period,
            ticks_to_wait,
        )
    }

    /// `xTimerDelete()`
    pub fn timer_delete(&self, timer: TimerHandle, ticks_to_wait: TickType) -> Result<()> {
        self.timer_generic_command_from_task(timer, TimerCommand::Delete, 0, ticks_to_wait)
    }

    /// `xTimerStartFromISR()`
    pub fn timer_start_from_isr(&self, timer: TimerHandle) -> Result<bool> {
        let now = self.tick_count_from_isr();
        self.timer_generic_command_from_isr(timer, TimerCommand::StartFromIsr, now)
    }

    /// `xTimerStopFromISR()`
    pub fn timer_stop_from_isr(&self, timer: TimerHandle) -> Result<bool> {
        self.timer_generic_command_from_isr(timer, TimerCommand::StopFromIsr, 0)
    }

    /// `xTimerResetFromISR()`
    pub fn timer_reset_from_isr(&self, timer: TimerHandle) -> Result<bool> {
        let now = self.tick_count_from_isr();
        self.timer_generic_command_from_isr(timer, TimerCommand::ResetFromIsr, now)
    }

    /// `xTimerChangePeriodFromISR()`
    pub fn timer_change_period_from_isr(
        &self,
        timer: TimerHandle,
        new_period: TickType,
    ) -> Result<bool> {
        if new_period == 0 {
            return Err(Error::Parameter("timer period must be non-zero"));
        }
        self.timer_generic_command_from_isr(timer, TimerCommand::ChangePeriodFromIsr, new_period)
    }

    // =========================================================================
    // Timer queries
    // =========================================================================

    /// `xTimerGetTimerDaemonTaskHandle()`; `None` before the daemon exists.
    pub fn timer_get_daemon_task_handle(&self) -> Option<TaskHandle> {
        self.traced(
            TimerApi::GetTimerDaemonTaskHandle,
            [0; 4],
            |r: &Option<TaskHandle>| r.map_or(0, TaskHandle::raw),
            |core, _| core.timers.daemon_task(),
        )
    }

    /// `xTimerGetPeriod()`
    pub fn timer_get_period(&self, timer: TimerHandle) -> Result<TickType> {
        self.traced(
            TimerApi::GetPeriod,
            [timer.raw(), 0, 0, 0],
            |r: &Result<TickType>| r.map_or(0, tick_word),
            |core, _| core.timers.get(timer).map(|t| t.period()),
        )
    }

    /// `vTimerSetReloadMode()`
    pub fn timer_set_reload_mode(&self, timer: TimerHandle, auto_reload: bool) -> Result<()> {
        self.traced(
            TimerApi::SetReloadMode,
            [timer.raw(), u32::from(auto_reload), 0, 0],
            |_: &Result<()>| 0,
            |core, _| core.timers.set_reload_mode(timer, auto_reload),
        )
    }

    /// `xTimerGetReloadMode()`
    pub fn timer_get_reload_mode(&self, timer: TimerHandle) -> Result<bool> {
        self.traced(
            TimerApi::GetReloadMode,
            [timer.raw(), 0, 0, 0],
            |r: &Result<bool>| u32::from(matches!(r, Ok(true))),
            |core, _| core.timers.get(timer).map(|t| t.auto_reload()),
        )
    }

    /// `uxTimerGetReloadMode()`
    pub fn timer_ux_get_reload_mode(&self, timer: TimerHandle) -> Result<u32> {
        self.traced(
            TimerApi::UxGetReloadMode,
            [timer.raw(), 0, 0, 0],
            |r: &Result<u32>| r.unwrap_or(0),
            |core, _| core.timers.get(timer).map(|t| u32::from(t.auto_reload())),
        )
    }

    /// `xTimerGetExpiryTime()`
    pub fn timer_get_expiry_time(&self, timer: TimerHandle) -> Result<TickType> {
        self.traced(
            TimerApi::GetExpiryTime,
            [timer.raw(), 0, 0, 0],
            |r: &Result<TickType>| r.map_or(0, tick_word),
            |core, _| core.timers.get(timer).map(|t| t.expiry()),
        )
    }

    /// `pcTimerGetName()`
    pub fn timer_get_name(&self, timer: TimerHandle) -> Result<Option<&'static str>> {
        self.traced(
            TimerApi::GetName,
            [timer.raw(), 0, 0, 0],
            |r: &Result<Option<&'static str>>| r.map_or(0, name_word),
            |core, _| core.timers.get(timer).map(|t| t.name()),
        )
    }

    /// `xTimerIsTimerActive()`
    pub fn timer_is_active(&self, timer: TimerHandle) -> Result<bool> {
        self.traced(
            TimerApi::IsTimerActive,
            [timer.raw(), 0, 0, 0],
            |r: &Result<bool>| u32::from(matches!(r, Ok(true))),
            |core, _| core.timers.get(timer).map(|t| t.is_active()),
        )
    }

    /// `pvTimerGetTimerID()`
    pub fn timer_get_id(&self, timer: TimerHandle) -> Result<usize> {
        self.traced(
            TimerApi::GetTimerId,
            [timer.raw(), 0, 0, 0],
            |r: &Result<usize>| r.map_or(0, |id| id as u32),
            |core, _| core.timers.get(timer).map(|t| t.id()),
        )
    }

    /// `vTimerSetTimerID()`
    pub fn timer_set_id(&self, timer: TimerHandle, id: usize) -> Result<()> {
        self.traced(
            TimerApi::SetTimerId,
            [timer.raw(), id as u32, 0, 0],
            |_: &Result<()>| 0,
            |core, _| core.timers.set_id(timer, id),
        )
    }

    /// `xTimerGetStaticBuffer()`: whether the timer lives in a caller buffer.
    pub fn timer_get_static_buffer(&self, timer: TimerHandle) -> Result<bool> {
        self.traced(
            TimerApi::GetStaticBuffer,
            [timer.raw(), 0, 0, 0],
            |r: &Result<bool>| u32::from(matches!(r, Ok(true))),
            |core, _| core.timers.get(timer).map(|t| t.is_static()),
        )
    }

    /// `uxTimerGetTimerNumber()`
    #[cfg(feature = "trace-facility")]
    pub fn timer_get_number(&self, timer: TimerHandle) -> Result<u32> {
        self.traced(
            TimerApi::GetTimerNumber,
            [timer.raw(), 0, 0, 0],
            |r: &Result<u32>| r.unwrap_or(0),
            |core, _| core.timers.get(timer).map(|t| t.number()),
        )
    }

    /// `vTimerSetTimerNumber()`
    #[cfg(feature = "trace-facility")]
    pub fn timer_set_number(&self, timer: TimerHandle, number: u32) -> Result<()> {
        self.traced(
            TimerApi::SetTimerNumber,
            [timer.raw(), number, 0, 0],
            |_: &Result<()>| 0,
            |core, _| core.timers.set_number(timer, number),
        )
    }

    // =========================================================================
    // Pended function calls
    // =========================================================================

    /// `xTimerPendFunctionCall()`: runs `function(param1, param2)` in the
    /// daemon.
    #[cfg(feature = "pend-function-call")]
    pub fn timer_pend_function_call(
        &self,
        function: PendedFunction,
        param1: usize,
        param2: u32,
        ticks_to_wait: TickType,
    ) -> Result<()> {
        let args = [
            function as usize as u32,
            param1 as u32,
            param2,
            tick_word(ticks_to_wait),
        ];
        let result = self.traced(
            TimerApi::PendFunctionCall,
            args,
            |r: &Result<()>| u32::from(r.is_ok()),
            |core, trace| core.timers.post_pended(function, param1, param2, false, trace),
        );
        if result.is_ok() {
            self.schedule_daemon();
        }
        result
    }

    /// `xTimerPendFunctionCallFromISR()`
    #[cfg(feature = "pend-function-call")]
    pub fn timer_pend_function_call_from_isr(
        &self,
        function: PendedFunction,
        param1: usize,
        param2: u32,
    ) -> Result<bool> {
        let args = [function as usize as u32, param1 as u32, param2, 0];
        self.traced(
            TimerApi::PendFunctionCallFromIsr,
            args,
            |r: &Result<bool>| u32::from(r.is_ok()),
            |core, trace| {
                core.timers
                    .post_pended(function, param1, param2, true, trace)
                    .map(|()| core.scheduler.is_running())
            },
        )
    }
}

fn run_batch(batch: alloc::vec::Vec<Invocation>) -> usize {
    let count = batch.len();
    for invocation in batch {
        invocation.run();
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::HostPort;
    use core::sync::atomic::{AtomicU32, Ordering};

    fn kernel(mode: DaemonMode) -> Kernel<HostPort> {
        let config = KernelConfig {
            daemon_mode: mode,
            ..KernelConfig::default()
        };
        Kernel::new(HostPort::cortex_m4(), config).unwrap()
    }

    fn counter() -> (Arc<AtomicU32>, impl Fn(TimerHandle) + Send + Sync + 'static) {
        let hits = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&hits);
        (hits, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = KernelConfig {
            tick_rate_hz: 0,
            ..KernelConfig::default()
        };
        assert!(Kernel::new(HostPort::cortex_m4(), config).is_err());
    }

    #[test]
    fn start_creates_the_daemon_task() {
        let k = kernel(DaemonMode::Immediate);
        assert_eq!(k.timer_get_daemon_task_handle(), None);
        k.start_scheduler().unwrap();
        let daemon = k.timer_get_daemon_task_handle().unwrap();
        assert_eq!(k.task_info(daemon), Some(("Tmr Svc", 40)));
        assert!(k.start_scheduler().is_err());
    }

    #[test]
    fn commands_before_start_wait_for_the_scheduler() {
        let k = kernel(DaemonMode::Immediate);
        let (hits, cb) = counter();
        let t = k.timer_create(Some("early"), 3, false, 0, cb).unwrap();
        k.timer_start(t, 0).unwrap();
        assert_eq!(k.pending_timer_commands(), 1);
        assert!(!k.timer_is_active(t).unwrap());
        // Ticks are ignored before the scheduler runs.
        assert!(!k.tick());

        k.start_scheduler().unwrap();
        assert_eq!(k.pending_timer_commands(), 0);
        assert!(k.timer_is_active(t).unwrap());
        k.advance(3);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn deferred_mode_waits_for_a_tick() {
        let k = kernel(DaemonMode::Deferred);
        k.start_scheduler().unwrap();
        let (_hits, cb) = counter();
        let t = k.timer_create(None, 10, true, 0, cb).unwrap();
        k.timer_start(t, 0).unwrap();
        assert!(!k.timer_is_active(t).unwrap());
        k.tick();
        assert!(k.timer_is_active(t).unwrap());
        // Start was issued at tick 0, so the expiry is measured from there.
        assert_eq!(k.timer_get_expiry_time(t).unwrap(), 10);
    }

    #[test]
    fn suspended_scheduler_pends_ticks_and_timers() {
        let k = kernel(DaemonMode::Immediate);
        k.start_scheduler().unwrap();
        let (hits, cb) = counter();
        let t = k.timer_create(None, 2, false, 0, cb).unwrap();
        k.timer_start(t, 0).unwrap();

        k.suspend_all();
        assert!(!k.tick());
        assert!(!k.tick());
        assert_eq!(k.tick_count(), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        assert!(k.resume_all());
        assert_eq!(k.tick_count(), 2);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn callbacks_may_call_back_into_the_kernel() {
        static KERNEL: static_cell::StaticCell<Kernel<HostPort>> = static_cell::StaticCell::new();
        let k: &'static Kernel<HostPort> = KERNEL.init(kernel(DaemonMode::Immediate));
        k.start_scheduler().unwrap();

        let hits = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&hits);
        let t = k
            .timer_create(Some("self-stop"), 5, true, 0, move |me| {
                if c.fetch_add(1, Ordering::SeqCst) + 1 == 2 {
                    k.timer_stop(me, 0).unwrap();
                }
            })
            .unwrap();
        k.timer_start(t, 0).unwrap();
        k.advance(30);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert!(!k.timer_is_active(t).unwrap());
    }

    #[test]
    fn change_period_zero_is_rejected_up_front() {
        let k = kernel(DaemonMode::Immediate);
        let (_hits, cb) = counter();
        let t = k.timer_create(None, 10, true, 0, cb).unwrap();
        assert!(matches!(
            k.timer_change_period(t, 0, 0),
            Err(Error::Parameter(_))
        ));
        assert_eq!(k.pending_timer_commands(), 0);
    }

    #[test]
    fn id_reload_mode_and_number_accessors() {
        let k = kernel(DaemonMode::Immediate);
        let (_hits, cb) = counter();
        let t = k.timer_create(Some("acc"), 10, false, 7, cb).unwrap();
        assert_eq!(k.timer_get_id(t).unwrap(), 7);
        k.timer_set_id(t, 9).unwrap();
        assert_eq!(k.timer_get_id(t).unwrap(), 9);
        assert!(!k.timer_get_reload_mode(t).unwrap());
        k.timer_set_reload_mode(t, true).unwrap();
        assert_eq!(k.timer_ux_get_reload_mode(t).unwrap(), 1);
        assert_eq!(k.timer_get_name(t).unwrap(), Some("acc"));
        assert!(!k.timer_get_static_buffer(t).unwrap());
        #[cfg(feature = "trace-facility")]
        {
            k.timer_set_number(t, 3).unwrap();
            assert_eq!(k.timer_get_number(t).unwrap(), 3);
        }
    }

    #[cfg(feature = "pend-function-call")]
    #[test]
    fn pended_function_runs_in_the_daemon() {
        static SEEN: AtomicU32 = AtomicU32::new(0);
        fn pended(param1: usize, param2: u32) {
            SEEN.store(param1 as u32 + param2, Ordering::SeqCst);
        }
        let k = kernel(DaemonMode::Deferred);
        k.start_scheduler().unwrap();
        k.timer_pend_function_call(pended, 40, 2, 0).unwrap();
        assert_eq!(SEEN.load(Ordering::SeqCst), 0);
        assert_eq!(k.run_timer_service(), 1);
        assert_eq!(SEEN.load(Ordering::SeqCst), 42);
    }
}
