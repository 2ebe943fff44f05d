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

//! Software Timer Service
//!
//! Timer storage, the two active-timer lists and the daemon's command queue.
//!
//! Timers are never touched directly by API callers. Every start, stop,
//! reset, period change and delete travels through the command queue and is
//! applied by the timer daemon, exactly as the FreeRTOS timer task does.
//!
//! ## Lists
//!
//! Active timers sit in one of two lists ordered by expiry time. Timers whose
//! expiry lies beyond the next tick-count overflow go to the overflow list;
//! when the tick count wraps, whatever is left in the current list has
//! expired and the lists swap roles.
//!
//! ## Callbacks
//!
//! Service primitives never call user code. They return [`Invocation`]s that
//! [`super::Kernel`] runs once it has left its critical section, so callbacks
//! are free to call back into the kernel.

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use bitflags::bitflags;

use crate::config::MAX_TIMER_SLOTS;
use crate::error::{Error, Result};
use crate::kernel::list::OrderedList;
use crate::kernel::queue::{Queue, QUEUE_TYPE_BASE};
use crate::kernel::tasks::Scheduler;
use crate::trace::TraceHooks;
use crate::types::{
    tick_word, EventGroupHandle, QueueHandle, TaskHandle, TickType, TimerHandle, MAX_DELAY,
};

// =============================================================================
// Commands
// =============================================================================

/// Timer daemon command ids.
///
/// Negative ids carry pended function calls; ids from
/// [`TimerCommand::FIRST_FROM_ISR`] up are only valid from interrupts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i8)]
pub enum TimerCommand {
    ExecuteCallbackFromIsr = -2,
    ExecuteCallback = -1,
    StartDontTrace = 0,
    Start = 1,
    Reset = 2,
    Stop = 3,
    ChangePeriod = 4,
    Delete = 5,
    StartFromIsr = 6,
    ResetFromIsr = 7,
    StopFromIsr = 8,
    ChangePeriodFromIsr = 9,
}

impl TimerCommand {
    /// First command id reserved for interrupt context.
    pub const FIRST_FROM_ISR: i32 = 6;

    pub const fn id(self) -> i32 {
        self as i8 as i32
    }

    pub const fn is_from_isr(self) -> bool {
        self.id() >= Self::FIRST_FROM_ISR
    }

    /// Whether the command targets a timer (as opposed to a pended call).
    pub const fn is_timer_command(self) -> bool {
        self.id() >= 0
    }

    pub fn from_id(id: i32) -> Option<Self> {
        let command = match id {
            -2 => Self::ExecuteCallbackFromIsr,
            -1 => Self::ExecuteCallback,
            0 => Self::StartDontTrace,
            1 => Self::Start,
            2 => Self::Reset,
            3 => Self::Stop,
            4 => Self::ChangePeriod,
            5 => Self::Delete,
            6 => Self::StartFromIsr,
            7 => Self::ResetFromIsr,
            8 => Self::StopFromIsr,
            9 => Self::ChangePeriodFromIsr,
            _ => return None,
        };
        Some(command)
    }
}

/// Function run by the daemon on behalf of `timer_pend_function_call`.
pub type PendedFunction = fn(usize, u32);

/// Timer callback; receives the handle of the expired timer.
pub type TimerCallback = Arc<dyn Fn(TimerHandle) + Send + Sync>;

/// Entry of the timer command queue.
#[derive(Debug, Clone, Copy)]
pub enum DaemonMessage {
    Timer {
        command: TimerCommand,
        timer: TimerHandle,
        value: TickType,
    },
    Pended {
        command: TimerCommand,
        function: PendedFunction,
        param1: usize,
        param2: u32,
    },
    /// Deferred `xEventGroupSetBitsFromISR` / `xEventGroupClearBitsFromISR`.
    EventBits {
        group: EventGroupHandle,
        bits: TickType,
        set: bool,
    },
}

/// Deferred user code produced by a service step.
pub enum Invocation {
    Timer {
        handle: TimerHandle,
        callback: TimerCallback,
    },
    Pended {
        function: PendedFunction,
        param1: usize,
        param2: u32,
    },
}

impl Invocation {
    pub fn run(self) {
        match self {
            Self::Timer { handle, callback } => callback(handle),
            Self::Pended {
                function,
                param1,
                param2,
            } => function(param1, param2),
        }
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timer { handle, .. } => write!(f, "Invocation::Timer({handle:?})"),
            Self::Pended { param1, param2, .. } => {
                write!(f, "Invocation::Pended({param1:#x}, {param2:#x})")
            }
        }
    }
}

// =============================================================================
// Timer control block
// =============================================================================

bitflags! {
    /// `ucStatus` bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TimerStatus: u8 {
        const ACTIVE = 0x01;
        const STATICALLY_ALLOCATED = 0x02;
        const AUTORELOAD = 0x04;
    }
}

/// Timer control block.
pub struct TimerControl {
    name: Option<&'static str>,
    period: TickType,
    expiry: TickType,
    list: Option<usize>,
    id: usize,
    callback: TimerCallback,
    status: TimerStatus,
    #[cfg(feature = "trace-facility")]
    number: u32,
}

impl TimerControl {
    pub fn name(&self) -> Option<&'static str> {
        self.name
    }

    pub fn period(&self) -> TickType {
        self.period
    }

    /// Item value of the timer's list entry; the next expiry while active.
    pub fn expiry(&self) -> TickType {
        self.expiry
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn status(&self) -> TimerStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status.contains(TimerStatus::ACTIVE)
    }

    pub fn auto_reload(&self) -> bool {
        self.status.contains(TimerStatus::AUTORELOAD)
    }

    pub fn is_static(&self) -> bool {
        self.status.contains(TimerStatus::STATICALLY_ALLOCATED)
    }

    #[cfg(feature = "trace-facility")]
    pub fn number(&self) -> u32 {
        self.number
    }
}

impl fmt::Debug for TimerControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerControl")
            .field("name", &self.name)
            .field("period", &self.period)
            .field("expiry", &self.expiry)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// Caller-provided storage for a timer (`StaticTimer_t`).
#[derive(Debug)]
pub struct StaticTimer {
    control: Option<TimerControl>,
}

impl StaticTimer {
    pub const fn new() -> Self {
        Self { control: None }
    }
}

impl Default for StaticTimer {
    fn default() -> Self {
        Self::new()
    }
}

enum TimerStorage {
    Dynamic(Box<TimerControl>),
    Static(&'static mut StaticTimer),
}

struct Slot {
    generation: u16,
    storage: Option<TimerStorage>,
}

// =============================================================================
// Service
// =============================================================================

/// Heap footprint reported for a dynamically allocated timer.
const TIMER_ALLOCATION_SIZE: u32 = core::mem::size_of::<TimerControl>() as u32;

/// Parameters of a timer creation.
pub struct NewTimer {
    pub name: Option<&'static str>,
    pub period: TickType,
    pub auto_reload: bool,
    pub id: usize,
    pub callback: TimerCallback,
}

pub struct TimerService {
    slots: Vec<Slot>,
    free_slots: Vec<u16>,
    lists: [OrderedList<TimerHandle>; 2],
    current: usize,
    queue: Option<Queue<DaemonMessage>>,
    queue_length: usize,
    last_time: TickType,
    daemon_task: Option<TaskHandle>,
    dynamic_count: usize,
    max_timers: usize,
}

impl TimerService {
    pub fn new(queue_length: usize, max_timers: usize) -> Self {
        Self {
            slots: Vec::new(),
            free_slots: Vec::new(),
            lists: [OrderedList::new(), OrderedList::new()],
            current: 0,
            queue: None,
            queue_length,
            last_time: 0,
            daemon_task: None,
            dynamic_count: 0,
            max_timers,
        }
    }

    // =========================================================================
    // Setup
    // =========================================================================

    /// Creates the command queue on first use.
    fn check_for_valid_list_and_queue(&mut self, trace: &dyn TraceHooks) -> Result<()> {
        if self.queue.is_some() {
            return Ok(());
        }
        match Queue::new(QueueHandle::TIMER_COMMANDS, self.queue_length) {
            Ok(queue) => {
                trace.queue_create(queue.handle().raw());
                self.queue = Some(queue);
                Ok(())
            }
            Err(e) => {
                trace.queue_create_failed(QUEUE_TYPE_BASE);
                Err(e)
            }
        }
    }

    /// Creates the timer daemon task (once) and its command queue.
    pub fn create_timer_task(
        &mut self,
        scheduler: &mut Scheduler,
        name: &'static str,
        priority: u32,
        stack_depth: usize,
        trace: &dyn TraceHooks,
    ) -> Result<TaskHandle> {
        self.check_for_valid_list_and_queue(trace)?;
        if let Some(task) = self.daemon_task {
            return Ok(task);
        }
        let task = scheduler.create_task(name, priority, stack_depth, trace)?;
        self.daemon_task = Some(task);
        Ok(task)
    }

    pub fn daemon_task(&self) -> Option<TaskHandle> {
        self.daemon_task
    }

    pub fn queue_handle(&self) -> Option<QueueHandle> {
        self.queue.as_ref().map(Queue::handle)
    }

    /// Commands waiting for the daemon.
    pub fn pending_commands(&self) -> usize {
        self.queue.as_ref().map_or(0, Queue::messages_waiting)
    }

    // =========================================================================
    // Creation
    // =========================================================================

    /// `xTimerCreate` / `xTimerCreateStatic`
    pub fn create(
        &mut self,
        params: NewTimer,
        buffer: Option<&'static mut StaticTimer>,
        trace: &dyn TraceHooks,
    ) -> Result<TimerHandle> {
        if params.period == 0 {
            return Err(Error::Parameter("timer period must be non-zero"));
        }
        let is_static = buffer.is_some();
        if !is_static && self.max_timers != 0 && self.dynamic_count >= self.max_timers {
            log::warn!("timer allocation limit of {} reached", self.max_timers);
            trace.timer_create_failed();
            return Err(Error::NoMemory);
        }
        let Some(index) = self.allocate_slot() else {
            trace.timer_create_failed();
            return Err(Error::NoMemory);
        };
        if let Err(e) = self.check_for_valid_list_and_queue(trace) {
            self.free_slots.push(index);
            return Err(e);
        }

        let mut status = TimerStatus::empty();
        status.set(TimerStatus::AUTORELOAD, params.auto_reload);
        status.set(TimerStatus::STATICALLY_ALLOCATED, is_static);
        let control = TimerControl {
            name: params.name,
            period: params.period,
            expiry: 0,
            list: None,
            id: params.id,
            callback: params.callback,
            status,
            #[cfg(feature = "trace-facility")]
            number: 0,
        };

        let slot = &mut self.slots[index as usize];
        let handle = TimerHandle::new(index, slot.generation);
        slot.storage = Some(match buffer {
            Some(buffer) => {
                buffer.control = Some(control);
                TimerStorage::Static(buffer)
            }
            None => {
                self.dynamic_count += 1;
                trace.malloc(handle.raw(), TIMER_ALLOCATION_SIZE);
                TimerStorage::Dynamic(Box::new(control))
            }
        });
        trace.timer_create(handle.raw());
        log::trace!("created {handle:?} ({:?})", params.name);
        Ok(handle)
    }

    fn allocate_slot(&mut self) -> Option<u16> {
        if let Some(index) = self.free_slots.pop() {
            return Some(index);
        }
        if self.slots.len() >= MAX_TIMER_SLOTS {
            return None;
        }
        let index = u16::try_from(self.slots.len()).ok()?;
        self.slots.push(Slot {
            generation: 0,
            storage: None,
        });
        Some(index)
    }

    /// Frees a deleted timer's slot; its handle goes stale.
    fn release(&mut self, handle: TimerHandle, trace: &dyn TraceHooks) {
        let Some(slot) = self.slots.get_mut(handle.index()) else {
            return;
        };
        if slot.generation != handle.generation() {
            return;
        }
        match slot.storage.take() {
            Some(TimerStorage::Dynamic(_)) => {
                self.dynamic_count -= 1;
                trace.free(handle.raw(), TIMER_ALLOCATION_SIZE);
            }
            Some(TimerStorage::Static(buffer)) => buffer.control = None,
            None => return,
        }
        slot.generation = slot.generation.wrapping_add(1);
        self.free_slots.push(handle.index() as u16);
        log::trace!("deleted {handle:?}");
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    fn control(&self, handle: TimerHandle) -> Option<&TimerControl> {
        let slot = self.slots.get(handle.index())?;
        if slot.generation != handle.generation() {
            return None;
        }
        match slot.storage.as_ref()? {
            TimerStorage::Dynamic(control) => Some(&**control),
            TimerStorage::Static(buffer) => buffer.control.as_ref(),
        }
    }

    fn control_mut(&mut self, handle: TimerHandle) -> Option<&mut TimerControl> {
        let slot = self.slots.get_mut(handle.index())?;
        if slot.generation != handle.generation() {
            return None;
        }
        match slot.storage.as_mut()? {
            TimerStorage::Dynamic(control) => Some(&mut **control),
            TimerStorage::Static(buffer) => buffer.control.as_mut(),
        }
    }

    /// Control block of a live timer.
    pub fn get(&self, handle: TimerHandle) -> Result<&TimerControl> {
        self.control(handle).ok_or(Error::InvalidHandle)
    }

    pub fn contains(&self, handle: TimerHandle) -> bool {
        self.control(handle).is_some()
    }

    /// Live timers, dynamic and static.
    pub fn timer_count(&self) -> usize {
        self.slots.iter().filter(|s| s.storage.is_some()).count()
    }

    /// `vTimerSetReloadMode`
    pub fn set_reload_mode(&mut self, handle: TimerHandle, auto_reload: bool) -> Result<()> {
        let control = self.control_mut(handle).ok_or(Error::InvalidHandle)?;
        control.status.set(TimerStatus::AUTORELOAD, auto_reload);
        Ok(())
    }

    /// `vTimerSetTimerID`
    pub fn set_id(&mut self, handle: TimerHandle, id: usize) -> Result<()> {
        self.control_mut(handle).ok_or(Error::InvalidHandle)?.id = id;
        Ok(())
    }

    /// `vTimerSetTimerNumber`
    #[cfg(feature = "trace-facility")]
    pub fn set_number(&mut self, handle: TimerHandle, number: u32) -> Result<()> {
        self.control_mut(handle).ok_or(Error::InvalidHandle)?.number = number;
        Ok(())
    }

    // =========================================================================
    // Command queue
    // =========================================================================

    fn enqueue(
        &mut self,
        message: DaemonMessage,
        from_isr: bool,
        trace: &dyn TraceHooks,
    ) -> Result<()> {
        let Some(queue) = self.queue.as_mut() else {
            log::warn!("timer command queue not created yet");
            return Err(Error::QueueFull);
        };
        let raw = queue.handle().raw();
        match queue.send_to_back(message) {
            Ok(()) => {
                if from_isr {
                    trace.queue_send_from_isr(raw);
                } else {
                    trace.queue_send(raw);
                }
                Ok(())
            }
            Err(_) => {
                if from_isr {
                    trace.queue_send_from_isr_failed(raw);
                } else {
                    trace.queue_send_failed(raw);
                }
                log::warn!("timer command queue full, dropping {message:?}");
                Err(Error::QueueFull)
            }
        }
    }

    /// `xTimerGenericCommandFromTask` / `xTimerGenericCommandFromISR`
    ///
    /// Queues `command` for `handle`. Task-context callers may only send
    /// commands below [`TimerCommand::FIRST_FROM_ISR`], interrupts only those
    /// from it up.
    pub fn post_command(
        &mut self,
        handle: TimerHandle,
        command: TimerCommand,
        value: TickType,
        from_isr: bool,
        trace: &dyn TraceHooks,
    ) -> Result<()> {
        if !command.is_timer_command() {
            return Err(Error::Parameter("pended-call command sent to a timer"));
        }
        if command.is_from_isr() != from_isr {
            return Err(Error::WrongContext);
        }
        if !self.contains(handle) {
            log::warn!("{command:?} for stale {handle:?}");
            return Err(Error::InvalidHandle);
        }
        if self.queue.is_none() {
            return Err(Error::QueueFull);
        }
        let message = DaemonMessage::Timer {
            command,
            timer: handle,
            value,
        };
        let result = self.enqueue(message, from_isr, trace);
        trace.timer_command_send(
            handle.raw(),
            command.id(),
            tick_word(value),
            u32::from(result.is_ok()),
        );
        result
    }

    /// `xTimerPendFunctionCall` / `xTimerPendFunctionCallFromISR`
    pub fn post_pended(
        &mut self,
        function: PendedFunction,
        param1: usize,
        param2: u32,
        from_isr: bool,
        trace: &dyn TraceHooks,
    ) -> Result<()> {
        let command = if from_isr {
            TimerCommand::ExecuteCallbackFromIsr
        } else {
            TimerCommand::ExecuteCallback
        };
        let message = DaemonMessage::Pended {
            command,
            function,
            param1,
            param2,
        };
        let result = self.enqueue(message, from_isr, trace);
        let ret = u32::from(result.is_ok());
        let function_word = function as usize as u32;
        if from_isr {
            trace.pend_func_call_from_isr(function_word, param1 as u32, param2, ret);
        } else {
            trace.pend_func_call(function_word, param1 as u32, param2, ret);
        }
        result
    }

    /// Queues an event group update for the daemon, on behalf of an
    /// interrupt.
    pub fn post_event_bits(
        &mut self,
        group: EventGroupHandle,
        bits: TickType,
        set: bool,
        trace: &dyn TraceHooks,
    ) -> Result<()> {
        self.enqueue(DaemonMessage::EventBits { group, bits, set }, true, trace)
    }

    // =========================================================================
    // Active lists
    // =========================================================================

    /// `prvGetNextExpireTime`: head of the current list, or `(0, true)`.
    pub fn next_expire_time(&self) -> (TickType, bool) {
        match self.lists[self.current].head() {
            Some((expiry, _)) => (expiry, false),
            None => (0, true),
        }
    }

    /// Active timers in the current and the overflow list.
    pub fn active_list_lengths(&self) -> (usize, usize) {
        (
            self.lists[self.current].len(),
            self.lists[self.current ^ 1].len(),
        )
    }

    /// `prvInsertTimerInActiveList`
    ///
    /// Returns `true` when the timer already expired and must be processed
    /// now instead of being listed.
    fn insert_in_active_list(
        &mut self,
        handle: TimerHandle,
        next_expiry: TickType,
        now: TickType,
        command_time: TickType,
    ) -> bool {
        let current = self.current;
        let Some(timer) = self.control_mut(handle) else {
            return false;
        };
        timer.expiry = next_expiry;
        let period = timer.period;

        let target = if next_expiry <= now {
            // Expired between issuing the command and processing it?
            if now.wrapping_sub(command_time) >= period {
                return true;
            }
            current ^ 1
        } else if now < command_time && next_expiry >= command_time {
            // The tick count overflowed since the command was issued, but
            // the expiry did not.
            return true;
        } else {
            current
        };

        timer.list = Some(target);
        self.lists[target].insert(next_expiry, handle);
        false
    }

    fn remove_from_list(&mut self, handle: TimerHandle) {
        let Some(timer) = self.control_mut(handle) else {
            return;
        };
        if let Some(list) = timer.list.take() {
            self.lists[list].remove(handle);
        }
    }

    fn clear_active(&mut self, handle: TimerHandle) {
        if let Some(timer) = self.control_mut(handle) {
            timer.status.remove(TimerStatus::ACTIVE);
        }
    }

    fn expire(&self, handle: TimerHandle, out: &mut Vec<Invocation>, trace: &dyn TraceHooks) {
        if let Some(timer) = self.control(handle) {
            trace.timer_expired(handle.raw());
            log::trace!("{handle:?} expired at {}", timer.expiry);
            out.push(Invocation::Timer {
                handle,
                callback: Arc::clone(&timer.callback),
            });
        }
    }

    /// `prvReloadTimer`: relists an auto-reload timer, firing once for every
    /// whole period that already went by.
    fn reload(
        &mut self,
        handle: TimerHandle,
        mut expired: TickType,
        now: TickType,
        out: &mut Vec<Invocation>,
        trace: &dyn TraceHooks,
    ) {
        loop {
            let Some(period) = self.control(handle).map(TimerControl::period) else {
                return;
            };
            let next = expired.wrapping_add(period);
            if !self.insert_in_active_list(handle, next, now, expired) {
                return;
            }
            expired = next;
            self.expire(handle, out, trace);
        }
    }

    /// `prvProcessExpiredTimer`: pops the head of the current list.
    fn process_expired(
        &mut self,
        next_expire: TickType,
        now: TickType,
        out: &mut Vec<Invocation>,
        trace: &dyn TraceHooks,
    ) {
        let Some((_, handle)) = self.lists[self.current].pop_head() else {
            return;
        };
        let Some(timer) = self.control_mut(handle) else {
            return;
        };
        timer.list = None;
        if timer.auto_reload() {
            self.reload(handle, next_expire, now, out, trace);
        } else {
            timer.status.remove(TimerStatus::ACTIVE);
        }
        self.expire(handle, out, trace);
    }

    /// `prvSwitchTimerLists`: everything left in the current list expired
    /// before the tick count wrapped.
    fn switch_lists(&mut self, out: &mut Vec<Invocation>, trace: &dyn TraceHooks) {
        while let Some((next_expire, _)) = self.lists[self.current].head() {
            self.process_expired(next_expire, MAX_DELAY, out, trace);
        }
        self.current ^= 1;
        log::debug!("timer lists switched");
    }

    /// `prvSampleTimeNow`: returns whether the lists were switched.
    fn sample_time_now(
        &mut self,
        now: TickType,
        out: &mut Vec<Invocation>,
        trace: &dyn TraceHooks,
    ) -> bool {
        let switched = now < self.last_time;
        if switched {
            self.switch_lists(out, trace);
        }
        self.last_time = now;
        switched
    }

    // =========================================================================
    // Daemon steps
    // =========================================================================

    /// `prvProcessTimerOrBlockTask`, minus the blocking.
    ///
    /// Processes the list switch or the earliest expired timer. `None` means
    /// the daemon would block here.
    pub fn process_timer(
        &mut self,
        now: TickType,
        trace: &dyn TraceHooks,
    ) -> Option<Vec<Invocation>> {
        let (next_expire, list_was_empty) = self.next_expire_time();
        let mut out = Vec::new();
        if self.sample_time_now(now, &mut out, trace) {
            return Some(out);
        }
        if !list_was_empty && next_expire <= now {
            self.process_expired(next_expire, now, &mut out, trace);
            return Some(out);
        }
        None
    }

    /// Receive half of one `prvProcessReceivedCommands` iteration. `None`
    /// when the queue is empty.
    pub fn receive_command(&mut self, trace: &dyn TraceHooks) -> Option<DaemonMessage> {
        let queue = self.queue.as_mut()?;
        let message = queue.receive()?;
        trace.queue_receive(queue.handle().raw());
        Some(message)
    }

    /// Acts on a received timer command or pended call.
    pub fn dispatch_command(
        &mut self,
        message: DaemonMessage,
        now: TickType,
        trace: &dyn TraceHooks,
    ) -> Vec<Invocation> {
        let mut out = Vec::new();
        match message {
            DaemonMessage::Pended {
                function,
                param1,
                param2,
                ..
            } => out.push(Invocation::Pended {
                function,
                param1,
                param2,
            }),
            DaemonMessage::Timer {
                command,
                timer,
                value,
            } => self.apply_command(command, timer, value, now, &mut out, trace),
            DaemonMessage::EventBits { group, .. } => {
                log::warn!("event bits for {group:?} reached the timer service");
            }
        }
        out
    }

    fn apply_command(
        &mut self,
        command: TimerCommand,
        handle: TimerHandle,
        value: TickType,
        now: TickType,
        out: &mut Vec<Invocation>,
        trace: &dyn TraceHooks,
    ) {
        if !self.contains(handle) {
            log::warn!("dropping {command:?} for deleted {handle:?}");
            return;
        }
        self.remove_from_list(handle);
        trace.timer_command_received(handle.raw(), command.id(), tick_word(value));
        log::debug!("{handle:?} <- {command:?}({value})");
        self.sample_time_now(now, out, trace);

        match command {
            TimerCommand::StartDontTrace
            | TimerCommand::Start
            | TimerCommand::StartFromIsr
            | TimerCommand::Reset
            | TimerCommand::ResetFromIsr => {
                let Some(timer) = self.control_mut(handle) else {
                    return;
                };
                timer.status.insert(TimerStatus::ACTIVE);
                let auto_reload = timer.auto_reload();
                let next_expiry = value.wrapping_add(timer.period);
                if self.insert_in_active_list(handle, next_expiry, now, value) {
                    if auto_reload {
                        self.reload(handle, next_expiry, now, out, trace);
                    } else {
                        self.clear_active(handle);
                    }
                    self.expire(handle, out, trace);
                }
            }
            TimerCommand::Stop | TimerCommand::StopFromIsr => self.clear_active(handle),
            TimerCommand::ChangePeriod | TimerCommand::ChangePeriodFromIsr => {
                if value == 0 {
                    log::warn!("ignoring zero period for {handle:?}");
                    return;
                }
                let Some(timer) = self.control_mut(handle) else {
                    return;
                };
                timer.status.insert(TimerStatus::ACTIVE);
                timer.period = value;
                self.insert_in_active_list(handle, now.wrapping_add(value), now, now);
            }
            TimerCommand::Delete => {
                self.clear_active(handle);
                self.release(handle, trace);
            }
            TimerCommand::ExecuteCallback | TimerCommand::ExecuteCallbackFromIsr => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::NoTrace;
    use core::sync::atomic::{AtomicU32, Ordering};

    use std::sync::Mutex;

    fn counting(counter: &Arc<AtomicU32>) -> TimerCallback {
        let counter = Arc::clone(counter);
        Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    fn new_timer(period: TickType, auto_reload: bool, callback: TimerCallback) -> NewTimer {
        NewTimer {
            name: Some("t"),
            period,
            auto_reload,
            id: 0,
            callback,
        }
    }

    /// Runs the daemon to quiescence at tick `now`, returning the number of
    /// callbacks run.
    fn drain(service: &mut TimerService, now: TickType) -> usize {
        let mut ran = 0;
        loop {
            let mut progressed = false;
            if let Some(batch) = service.process_timer(now, &NoTrace) {
                progressed = true;
                ran += batch.len();
                batch.into_iter().for_each(Invocation::run);
            }
            while let Some(message) = service.receive_command(&NoTrace) {
                let batch = service.dispatch_command(message, now, &NoTrace);
                progressed = true;
                ran += batch.len();
                batch.into_iter().for_each(Invocation::run);
            }
            if !progressed {
                return ran;
            }
        }
    }

    #[test]
    fn command_ids_partition_contexts() {
        assert!(!TimerCommand::ChangePeriod.is_from_isr());
        assert!(TimerCommand::StartFromIsr.is_from_isr());
        assert!(!TimerCommand::ExecuteCallback.is_timer_command());
        assert_eq!(TimerCommand::from_id(9), Some(TimerCommand::ChangePeriodFromIsr));
        assert_eq!(TimerCommand::from_id(10), None);
        assert_eq!(TimerCommand::ExecuteCallbackFromIsr.id(), -2);
    }

    #[test]
    fn zero_period_is_rejected() {
        let mut service = TimerService::new(4, 0);
        let hits = Arc::new(AtomicU32::new(0));
        let result = service.create(new_timer(0, false, counting(&hits)), None, &NoTrace);
        assert_eq!(result.err(), Some(Error::Parameter("timer period must be non-zero")));
    }

    #[test]
    fn one_shot_fires_once() {
        let mut service = TimerService::new(4, 0);
        let hits = Arc::new(AtomicU32::new(0));
        let h = service
            .create(new_timer(10, false, counting(&hits)), None, &NoTrace)
            .unwrap();
        service
            .post_command(h, TimerCommand::Start, 0, false, &NoTrace)
            .unwrap();
        drain(&mut service, 0);
        assert!(service.get(h).unwrap().is_active());
        assert_eq!(service.get(h).unwrap().expiry(), 10);

        drain(&mut service, 9);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        drain(&mut service, 10);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(!service.get(h).unwrap().is_active());
        drain(&mut service, 30);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn late_command_fires_immediately() {
        let mut service = TimerService::new(4, 0);
        let hits = Arc::new(AtomicU32::new(0));
        let h = service
            .create(new_timer(5, false, counting(&hits)), None, &NoTrace)
            .unwrap();
        // Issued at tick 0, processed at tick 7: already past due.
        service
            .post_command(h, TimerCommand::Start, 0, false, &NoTrace)
            .unwrap();
        drain(&mut service, 7);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(!service.get(h).unwrap().is_active());
    }

    #[test]
    fn auto_reload_catches_up_missed_periods() {
        let mut service = TimerService::new(4, 0);
        let hits = Arc::new(AtomicU32::new(0));
        let h = service
            .create(new_timer(10, true, counting(&hits)), None, &NoTrace)
            .unwrap();
        service
            .post_command(h, TimerCommand::Start, 0, false, &NoTrace)
            .unwrap();
        drain(&mut service, 0);
        // The daemon was starved until tick 35: expiries 10, 20 and 30 are due.
        drain(&mut service, 35);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
        assert_eq!(service.get(h).unwrap().expiry(), 40);
        assert!(service.get(h).unwrap().is_active());
    }

    #[test]
    fn change_period_restarts_from_now() {
        let mut service = TimerService::new(4, 0);
        let hits = Arc::new(AtomicU32::new(0));
        let h = service
            .create(new_timer(100, false, counting(&hits)), None, &NoTrace)
            .unwrap();
        service
            .post_command(h, TimerCommand::ChangePeriod, 20, false, &NoTrace)
            .unwrap();
        drain(&mut service, 50);
        let timer = service.get(h).unwrap();
        assert_eq!(timer.period(), 20);
        assert_eq!(timer.expiry(), 70);
        assert!(timer.is_active());
    }

    #[test]
    fn stop_takes_timer_off_the_list() {
        let mut service = TimerService::new(4, 0);
        let hits = Arc::new(AtomicU32::new(0));
        let h = service
            .create(new_timer(10, true, counting(&hits)), None, &NoTrace)
            .unwrap();
        service
            .post_command(h, TimerCommand::Start, 0, false, &NoTrace)
            .unwrap();
        service
            .post_command(h, TimerCommand::Stop, 0, false, &NoTrace)
            .unwrap();
        drain(&mut service, 0);
        assert_eq!(service.active_list_lengths(), (0, 0));
        drain(&mut service, 100);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn isr_commands_require_isr_context() {
        let mut service = TimerService::new(4, 0);
        let hits = Arc::new(AtomicU32::new(0));
        let h = service
            .create(new_timer(10, true, counting(&hits)), None, &NoTrace)
            .unwrap();
        assert_eq!(
            service.post_command(h, TimerCommand::StartFromIsr, 0, false, &NoTrace),
            Err(Error::WrongContext)
        );
        assert_eq!(
            service.post_command(h, TimerCommand::Start, 0, true, &NoTrace),
            Err(Error::WrongContext)
        );
        assert!(service
            .post_command(h, TimerCommand::StartFromIsr, 0, true, &NoTrace)
            .is_ok());
    }

    #[test]
    fn full_queue_rejects_commands() {
        let mut service = TimerService::new(2, 0);
        let hits = Arc::new(AtomicU32::new(0));
        let h = service
            .create(new_timer(10, true, counting(&hits)), None, &NoTrace)
            .unwrap();
        for _ in 0..2 {
            service
                .post_command(h, TimerCommand::Reset, 0, false, &NoTrace)
                .unwrap();
        }
        assert_eq!(
            service.post_command(h, TimerCommand::Reset, 0, false, &NoTrace),
            Err(Error::QueueFull)
        );
        assert_eq!(service.pending_commands(), 2);
    }

    #[test]
    fn delete_makes_handle_stale_and_recycles_slot() {
        let mut service = TimerService::new(4, 0);
        let hits = Arc::new(AtomicU32::new(0));
        let h = service
            .create(new_timer(10, true, counting(&hits)), None, &NoTrace)
            .unwrap();
        service
            .post_command(h, TimerCommand::Delete, 0, false, &NoTrace)
            .unwrap();
        drain(&mut service, 0);
        assert_eq!(service.get(h).err(), Some(Error::InvalidHandle));
        assert_eq!(service.timer_count(), 0);

        let h2 = service
            .create(new_timer(10, true, counting(&hits)), None, &NoTrace)
            .unwrap();
        assert_eq!(h2.index(), h.index());
        assert_ne!(h2, h);
        assert!(!service.contains(h));
    }

    #[test]
    fn allocation_limit_applies_to_dynamic_timers() {
        let mut service = TimerService::new(4, 1);
        let hits = Arc::new(AtomicU32::new(0));
        service
            .create(new_timer(10, true, counting(&hits)), None, &NoTrace)
            .unwrap();
        let second = service.create(new_timer(10, true, counting(&hits)), None, &NoTrace);
        assert_eq!(second.err(), Some(Error::NoMemory));
    }

    #[test]
    fn static_buffer_bypasses_allocation_limit_and_is_released() {
        let mut service = TimerService::new(4, 1);
        let hits = Arc::new(AtomicU32::new(0));
        service
            .create(new_timer(10, true, counting(&hits)), None, &NoTrace)
            .unwrap();
        let buffer: &'static mut StaticTimer = Box::leak(Box::new(StaticTimer::new()));
        let h = service
            .create(new_timer(5, false, counting(&hits)), Some(buffer), &NoTrace)
            .unwrap();
        assert!(service.get(h).unwrap().is_static());
        assert_eq!(service.timer_count(), 2);

        service
            .post_command(h, TimerCommand::Delete, 0, false, &NoTrace)
            .unwrap();
        drain(&mut service, 0);
        assert_eq!(service.get(h).err(), Some(Error::InvalidHandle));
        assert_eq!(service.timer_count(), 1);
    }

    #[test]
    fn equal_expiries_fire_in_start_order() {
        let mut service = TimerService::new(4, 0);
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut handles = Vec::new();
        for tag in 1..=3u32 {
            let order = Arc::clone(&order);
            let callback: TimerCallback = Arc::new(move |_| order.lock().unwrap().push(tag));
            let h = service
                .create(new_timer(5, false, callback), None, &NoTrace)
                .unwrap();
            handles.push(h);
        }
        for h in &handles {
            service
                .post_command(*h, TimerCommand::Start, 0, false, &NoTrace)
                .unwrap();
        }
        drain(&mut service, 0);
        drain(&mut service, 5);
        assert_eq!(*order.lock().unwrap(), [1, 2, 3]);
    }

    #[test]
    fn tick_overflow_switches_lists() {
        let mut service = TimerService::new(4, 0);
        let hits = Arc::new(AtomicU32::new(0));
        let h = service
            .create(new_timer(10, false, counting(&hits)), None, &NoTrace)
            .unwrap();
        let start = MAX_DELAY - 4;
        service
            .post_command(h, TimerCommand::Start, start, false, &NoTrace)
            .unwrap();
        drain(&mut service, start);
        // Expiry wrapped past zero, so the timer waits in the overflow list.
        assert_eq!(service.active_list_lengths(), (0, 1));
        assert_eq!(service.get(h).unwrap().expiry(), 5);

        drain(&mut service, MAX_DELAY);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        drain(&mut service, 2);
        assert_eq!(service.active_list_lengths(), (1, 0));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        drain(&mut service, 5);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
