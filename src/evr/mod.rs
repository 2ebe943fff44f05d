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

//! Event Recorder
//!
//! Records kernel events into a fixed-size ring buffer, filtered per
//! component and level the way Arm's Event Recorder filters
//! `EventRecord2` / `EventRecord4` calls.
//!
//! An event id packs the level, the component number and a message number:
//!
//! ```text
//!   bits 17..16  level (Error, API, Op, Detail)
//!   bits 15..8   component (0xF0 tasks .. 0xF5 stream buffers)
//!   bits  7..0   message
//! ```
//!
//! [`EventRecorder`] implements [`TraceHooks`], so it plugs straight into
//! [`crate::kernel::Kernel::with_trace`].

pub mod catalog;

use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;

use critical_section::Mutex;
use heapless::HistoryBuffer;

use crate::config::{EvrConfig, EVR_LEVEL_ALL};
use crate::trace::{TimerApi, TraceHooks};

// =============================================================================
// Event ids
// =============================================================================

/// Event level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventLevel {
    Error,
    Api,
    Op,
    Detail,
}

impl EventLevel {
    /// Level field of the event id.
    pub const fn bits(self) -> u32 {
        match self {
            Self::Error => 0x0_0000,
            Self::Api => 0x1_0000,
            Self::Op => 0x2_0000,
            Self::Detail => 0x3_0000,
        }
    }

    /// Bit of this level in a component's recording mask.
    pub const fn mask(self) -> u8 {
        match self {
            Self::Error => 0x01,
            Self::Api => 0x02,
            Self::Op => 0x04,
            Self::Detail => 0x08,
        }
    }

    const fn from_bits(bits: u32) -> Self {
        match bits & 0x3_0000 {
            0x0_0000 => Self::Error,
            0x1_0000 => Self::Api,
            0x2_0000 => Self::Op,
            _ => Self::Detail,
        }
    }
}

/// FreeRTOS components known to the recorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Component {
    Tasks = 0xF0,
    Queue = 0xF1,
    Timers = 0xF2,
    EventGroups = 0xF3,
    Heap = 0xF4,
    StreamBuf = 0xF5,
}

impl Component {
    pub const ALL: [Component; 6] = [
        Self::Tasks,
        Self::Queue,
        Self::Timers,
        Self::EventGroups,
        Self::Heap,
        Self::StreamBuf,
    ];

    pub const fn number(self) -> u8 {
        self as u8
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Tasks => "Tasks",
            Self::Queue => "Queue",
            Self::Timers => "Timers",
            Self::EventGroups => "EventGroups",
            Self::Heap => "Heap",
            Self::StreamBuf => "StreamBuf",
        }
    }

    pub fn from_number(number: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.number() == number)
    }
}

/// Packed event id.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId(u32);

impl EventId {
    /// `EventID(level, comp, msg)`
    pub const fn new(level: EventLevel, component: u8, message: u8) -> Self {
        Self(level.bits() | ((component as u32) << 8) | message as u32)
    }

    pub const fn value(self) -> u32 {
        self.0
    }

    pub const fn level(self) -> EventLevel {
        EventLevel::from_bits(self.0)
    }

    pub const fn component(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub const fn message(self) -> u8 {
        self.0 as u8
    }
}

impl fmt::Debug for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match catalog::name_of(*self) {
            Some(name) => write!(f, "{name}"),
            None => write!(f, "EventId({:#07x})", self.0),
        }
    }
}

/// Event ids of the FreeRTOS components.
pub mod ids {
    use super::{Component, EventId, EventLevel};

    const TASKS: u8 = Component::Tasks.number();
    const QUEUE: u8 = Component::Queue.number();
    const TIMERS: u8 = Component::Timers.number();
    const EVENT_GROUPS: u8 = Component::EventGroups.number();
    const HEAP: u8 = Component::Heap.number();

    pub const TASK_TRACKING_RESET: EventId = EventId::new(EventLevel::Op, TASKS, 0xFF);
    pub const TASK_CREATE: EventId = EventId::new(EventLevel::Op, TASKS, 0x00);
    pub const TASK_CREATE_FAILED: EventId = EventId::new(EventLevel::Error, TASKS, 0x01);
    pub const TASK_DELAY_UNTIL: EventId = EventId::new(EventLevel::Op, TASKS, 0x03);
    pub const TASK_DELAY: EventId = EventId::new(EventLevel::Op, TASKS, 0x04);
    pub const TASK_INCREMENT_TICK: EventId = EventId::new(EventLevel::Detail, TASKS, 0x09);

    pub const QUEUE_CREATE: EventId = EventId::new(EventLevel::Op, QUEUE, 0x00);
    pub const QUEUE_CREATE_FAILED: EventId = EventId::new(EventLevel::Error, QUEUE, 0x01);
    pub const CREATE_MUTEX: EventId = EventId::new(EventLevel::Op, QUEUE, 0x02);
    pub const CREATE_MUTEX_FAILED: EventId = EventId::new(EventLevel::Error, QUEUE, 0x03);
    pub const GIVE_MUTEX_RECURSIVE: EventId = EventId::new(EventLevel::Op, QUEUE, 0x04);
    pub const GIVE_MUTEX_RECURSIVE_FAILED: EventId = EventId::new(EventLevel::Error, QUEUE, 0x05);
    pub const TAKE_MUTEX_RECURSIVE: EventId = EventId::new(EventLevel::Op, QUEUE, 0x06);
    pub const TAKE_MUTEX_RECURSIVE_FAILED: EventId = EventId::new(EventLevel::Error, QUEUE, 0x07);
    pub const CREATE_COUNTING_SEMAPHORE: EventId = EventId::new(EventLevel::Op, QUEUE, 0x08);
    pub const CREATE_COUNTING_SEMAPHORE_FAILED: EventId =
        EventId::new(EventLevel::Error, QUEUE, 0x09);
    pub const QUEUE_SEND: EventId = EventId::new(EventLevel::Op, QUEUE, 0x0A);
    pub const QUEUE_SEND_FAILED: EventId = EventId::new(EventLevel::Error, QUEUE, 0x0B);
    pub const QUEUE_RECEIVE: EventId = EventId::new(EventLevel::Op, QUEUE, 0x0C);
    pub const QUEUE_RECEIVE_FAILED: EventId = EventId::new(EventLevel::Error, QUEUE, 0x0F);
    pub const QUEUE_SEND_FROM_ISR: EventId = EventId::new(EventLevel::Op, QUEUE, 0x10);
    pub const QUEUE_SEND_FROM_ISR_FAILED: EventId = EventId::new(EventLevel::Error, QUEUE, 0x11);
    pub const QUEUE_RECEIVE_FROM_ISR: EventId = EventId::new(EventLevel::Op, QUEUE, 0x12);
    pub const QUEUE_RECEIVE_FROM_ISR_FAILED: EventId =
        EventId::new(EventLevel::Error, QUEUE, 0x13);
    pub const QUEUE_DELETE: EventId = EventId::new(EventLevel::Op, QUEUE, 0x15);

    pub const TIMER_CREATE: EventId = EventId::new(EventLevel::Op, TIMERS, 0x00);
    pub const TIMER_CREATE_FAILED: EventId = EventId::new(EventLevel::Error, TIMERS, 0x01);
    pub const TIMER_COMMAND_SEND: EventId = EventId::new(EventLevel::Op, TIMERS, 0x02);
    pub const TIMER_COMMAND_RECEIVED: EventId = EventId::new(EventLevel::Op, TIMERS, 0x03);
    pub const TIMER_EXPIRED: EventId = EventId::new(EventLevel::Op, TIMERS, 0x04);
    pub const PEND_FUNC_CALL: EventId = EventId::new(EventLevel::Op, TIMERS, 0x05);
    pub const PEND_FUNC_CALL_FROM_ISR: EventId = EventId::new(EventLevel::Op, TIMERS, 0x06);

    /// First message number of the timer API entry/return pairs.
    const TIMER_API_BASE: u8 = 0x07;

    /// Entry event of a timer API function.
    pub const fn timer_api_enter(ordinal: u8) -> EventId {
        EventId::new(EventLevel::Api, TIMERS, TIMER_API_BASE + 2 * ordinal)
    }

    /// Return event of a timer API function.
    pub const fn timer_api_return(ordinal: u8) -> EventId {
        EventId::new(EventLevel::Api, TIMERS, TIMER_API_BASE + 2 * ordinal + 1)
    }

    pub const EVENT_GROUP_CREATE: EventId = EventId::new(EventLevel::Op, EVENT_GROUPS, 0x00);
    pub const EVENT_GROUP_CREATE_FAILED: EventId =
        EventId::new(EventLevel::Error, EVENT_GROUPS, 0x01);
    pub const EVENT_GROUP_WAIT_BITS_END: EventId =
        EventId::new(EventLevel::Op, EVENT_GROUPS, 0x05);
    pub const EVENT_GROUP_CLEAR_BITS: EventId = EventId::new(EventLevel::Op, EVENT_GROUPS, 0x06);
    pub const EVENT_GROUP_CLEAR_BITS_FROM_ISR: EventId =
        EventId::new(EventLevel::Op, EVENT_GROUPS, 0x07);
    pub const EVENT_GROUP_SET_BITS: EventId = EventId::new(EventLevel::Op, EVENT_GROUPS, 0x08);
    pub const EVENT_GROUP_SET_BITS_FROM_ISR: EventId =
        EventId::new(EventLevel::Op, EVENT_GROUPS, 0x09);
    pub const EVENT_GROUP_DELETE: EventId = EventId::new(EventLevel::Op, EVENT_GROUPS, 0x0A);

    pub const HEAP_MALLOC: EventId = EventId::new(EventLevel::Op, HEAP, 0x00);
    pub const HEAP_FREE: EventId = EventId::new(EventLevel::Op, HEAP, 0x01);
}

impl TimerApi {
    pub const fn enter_event(self) -> EventId {
        ids::timer_api_enter(self.ordinal())
    }

    pub const fn return_event(self) -> EventId {
        ids::timer_api_return(self.ordinal())
    }
}

// =============================================================================
// Records
// =============================================================================

/// Payload of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventData {
    Two([u32; 2]),
    Four([u32; 4]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventRecord {
    pub id: EventId,
    /// Tick count when the event was recorded.
    pub timestamp: u32,
    pub data: EventData,
}

impl EventRecord {
    /// Payload words, two or four of them.
    pub fn values(&self) -> &[u32] {
        match &self.data {
            EventData::Two(v) => v,
            EventData::Four(v) => v,
        }
    }
}

// =============================================================================
// Recorder
// =============================================================================

struct RecorderState<const N: usize> {
    masks: [u8; 256],
    running: bool,
    setup_done: bool,
    timestamp: u32,
    recorded: u64,
    filtered: u64,
    buffer: HistoryBuffer<EventRecord, N>,
}

impl<const N: usize> RecorderState<N> {
    const fn new() -> Self {
        Self {
            masks: [0; 256],
            running: false,
            setup_done: false,
            timestamp: 0,
            recorded: 0,
            filtered: 0,
            buffer: HistoryBuffer::new(),
        }
    }

    fn record(&mut self, id: EventId, data: EventData) -> bool {
        let enabled = self.masks[id.component() as usize] & id.level().mask() != 0;
        if !self.running || !enabled {
            self.filtered += 1;
            return false;
        }
        self.buffer.write(EventRecord {
            id,
            timestamp: self.timestamp,
            data,
        });
        self.recorded += 1;
        true
    }
}

/// Ring buffer of the last `N` recorded events.
///
/// `const`-constructible so it can live in a `static`; all state sits
/// behind a critical section.
pub struct EventRecorder<const N: usize = 64> {
    state: Mutex<RefCell<RecorderState<N>>>,
}

impl<const N: usize> Default for EventRecorder<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> EventRecorder<N> {
    /// Stopped recorder with every component filtered out.
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(RefCell::new(RecorderState::new())),
        }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut RecorderState<N>) -> R) -> R {
        critical_section::with(|cs| f(&mut self.state.borrow_ref_mut(cs)))
    }

    /// `EventRecorderInitialize(recording, start)`
    ///
    /// Clears the buffer and applies `recording` to every component.
    pub fn initialize(&self, recording: u8, start: bool) {
        self.with_state(|s| {
            s.masks = [recording & EVR_LEVEL_ALL; 256];
            s.buffer.clear();
            s.recorded = 0;
            s.filtered = 0;
            s.running = start;
        });
    }

    /// `EventRecorderEnable(mask, comp_start, comp_end)`
    pub fn enable(&self, mask: u8, comp_start: u8, comp_end: u8) {
        self.with_state(|s| {
            for comp in comp_start..=comp_end {
                s.masks[comp as usize] |= mask & EVR_LEVEL_ALL;
            }
        });
    }

    /// `EventRecorderDisable(mask, comp_start, comp_end)`
    pub fn disable(&self, mask: u8, comp_start: u8, comp_end: u8) {
        self.with_state(|s| {
            for comp in comp_start..=comp_end {
                s.masks[comp as usize] &= !mask;
            }
        });
    }

    pub fn start(&self) {
        self.with_state(|s| s.running = true);
    }

    pub fn stop(&self) {
        self.with_state(|s| s.running = false);
    }

    pub fn is_running(&self) -> bool {
        self.with_state(|s| s.running)
    }

    /// Level mask currently applied to `component`.
    pub fn level_mask(&self, component: u8) -> u8 {
        self.with_state(|s| s.masks[component as usize])
    }

    /// `EventRecord2`; `false` when stopped or filtered out.
    pub fn record2(&self, id: EventId, val1: u32, val2: u32) -> bool {
        self.with_state(|s| s.record(id, EventData::Two([val1, val2])))
    }

    /// `EventRecord4`; `false` when stopped or filtered out.
    pub fn record4(&self, id: EventId, val1: u32, val2: u32, val3: u32, val4: u32) -> bool {
        self.with_state(|s| s.record(id, EventData::Four([val1, val2, val3, val4])))
    }

    /// `EvrFreeRTOSSetup(reset)`
    ///
    /// Initializes the recorder and applies the component levels of `config`
    /// on the first call, then records a task tracking reset. Later calls do
    /// nothing unless `reset` is set.
    pub fn setup(&self, reset: bool, config: &EvrConfig) {
        let first = self.with_state(|s| {
            if reset {
                s.setup_done = false;
            }
            !core::mem::replace(&mut s.setup_done, true)
        });
        if !first {
            return;
        }

        if config.initialize {
            self.initialize(config.init_recording, config.init_start);
        }
        if config.setup_level {
            let levels = [
                (Component::Tasks, config.tasks),
                (Component::Queue, config.queue),
                (Component::Timers, config.timers),
                (Component::EventGroups, config.event_groups),
                (Component::Heap, config.heap),
                (Component::StreamBuf, config.stream_buffer),
            ];
            for (component, level) in levels {
                self.enable(level, component.number(), component.number());
            }
        }
        log::info!("event recorder set up (running: {})", self.is_running());
        self.record2(ids::TASK_TRACKING_RESET, 0, 0);
    }

    /// Recorded events, oldest first.
    pub fn records(&self) -> Vec<EventRecord> {
        self.with_state(|s| s.buffer.oldest_ordered().copied().collect())
    }

    /// Recorded events with the given id, oldest first.
    pub fn records_of(&self, id: EventId) -> Vec<EventRecord> {
        self.with_state(|s| {
            s.buffer
                .oldest_ordered()
                .filter(|r| r.id == id)
                .copied()
                .collect()
        })
    }

    /// Events currently held in the buffer.
    pub fn len(&self) -> usize {
        self.with_state(|s| s.buffer.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Events accepted since initialization, including overwritten ones.
    pub fn total_recorded(&self) -> u64 {
        self.with_state(|s| s.recorded)
    }

    /// Events rejected by the filter or because recording was stopped.
    pub fn total_filtered(&self) -> u64 {
        self.with_state(|s| s.filtered)
    }

    /// Drops the buffered events, keeping the filter settings.
    pub fn clear(&self) {
        self.with_state(|s| s.buffer.clear());
    }

    /// Timestamp given to subsequent records.
    pub fn set_timestamp(&self, timestamp: u32) {
        self.with_state(|s| s.timestamp = timestamp);
    }
}

// =============================================================================
// Kernel hooks
// =============================================================================

impl<const N: usize> TraceHooks for EventRecorder<N> {
    fn setup(&self, reset: bool, config: &EvrConfig) {
        EventRecorder::setup(self, reset, config);
    }

    fn task_create(&self, task: u32) {
        self.record2(ids::TASK_CREATE, task, 0);
    }

    fn task_create_failed(&self) {
        self.record2(ids::TASK_CREATE_FAILED, 0, 0);
    }

    fn task_increment_tick(&self, tick_count: u32) {
        self.record2(ids::TASK_INCREMENT_TICK, tick_count, 0);
        self.set_timestamp(tick_count.wrapping_add(1));
    }

    fn task_delay(&self, ticks: u32) {
        self.record2(ids::TASK_DELAY, ticks, 0);
    }

    fn task_delay_until(&self, time_to_wake: u32) {
        self.record2(ids::TASK_DELAY_UNTIL, time_to_wake, 0);
    }

    fn queue_create(&self, queue: u32) {
        self.record2(ids::QUEUE_CREATE, queue, 0);
    }

    fn queue_create_failed(&self, queue_type: u8) {
        self.record2(ids::QUEUE_CREATE_FAILED, u32::from(queue_type), 0);
    }

    fn queue_send(&self, queue: u32) {
        self.record2(ids::QUEUE_SEND, queue, 0);
    }

    fn queue_send_failed(&self, queue: u32) {
        self.record2(ids::QUEUE_SEND_FAILED, queue, 0);
    }

    fn queue_send_from_isr(&self, queue: u32) {
        self.record2(ids::QUEUE_SEND_FROM_ISR, queue, 0);
    }

    fn queue_send_from_isr_failed(&self, queue: u32) {
        self.record2(ids::QUEUE_SEND_FROM_ISR_FAILED, queue, 0);
    }

    fn queue_receive(&self, queue: u32) {
        self.record2(ids::QUEUE_RECEIVE, queue, 0);
    }

    fn queue_receive_failed(&self, queue: u32) {
        self.record2(ids::QUEUE_RECEIVE_FAILED, queue, 0);
    }

    fn queue_receive_from_isr(&self, queue: u32) {
        self.record2(ids::QUEUE_RECEIVE_FROM_ISR, queue, 0);
    }

    fn queue_receive_from_isr_failed(&self, queue: u32) {
        self.record2(ids::QUEUE_RECEIVE_FROM_ISR_FAILED, queue, 0);
    }

    fn queue_delete(&self, queue: u32) {
        self.record2(ids::QUEUE_DELETE, queue, 0);
    }

    fn create_mutex(&self, mutex: u32) {
        self.record2(ids::CREATE_MUTEX, mutex, 0);
    }

    fn create_mutex_failed(&self) {
        self.record2(ids::CREATE_MUTEX_FAILED, 0, 0);
    }

    fn give_mutex_recursive(&self, mutex: u32) {
        self.record2(ids::GIVE_MUTEX_RECURSIVE, mutex, 0);
    }

    fn give_mutex_recursive_failed(&self, mutex: u32) {
        self.record2(ids::GIVE_MUTEX_RECURSIVE_FAILED, mutex, 0);
    }

    fn take_mutex_recursive(&self, mutex: u32) {
        self.record2(ids::TAKE_MUTEX_RECURSIVE, mutex, 0);
    }

    fn take_mutex_recursive_failed(&self, mutex: u32) {
        self.record2(ids::TAKE_MUTEX_RECURSIVE_FAILED, mutex, 0);
    }

    fn create_counting_semaphore(&self, semaphore: u32) {
        self.record2(ids::CREATE_COUNTING_SEMAPHORE, semaphore, 0);
    }

    fn create_counting_semaphore_failed(&self) {
        self.record2(ids::CREATE_COUNTING_SEMAPHORE_FAILED, 0, 0);
    }

    fn timer_create(&self, timer: u32) {
        self.record2(ids::TIMER_CREATE, timer, 0);
    }

    fn timer_create_failed(&self) {
        self.record2(ids::TIMER_CREATE_FAILED, 0, 0);
    }

    fn timer_command_send(&self, timer: u32, command: i32, value: u32, ret: u32) {
        self.record4(ids::TIMER_COMMAND_SEND, timer, command as u32, value, ret);
    }

    fn timer_command_received(&self, timer: u32, command: i32, value: u32) {
        self.record4(ids::TIMER_COMMAND_RECEIVED, timer, command as u32, value, 0);
    }

    fn timer_expired(&self, timer: u32) {
        self.record2(ids::TIMER_EXPIRED, timer, 0);
    }

    fn pend_func_call(&self, function: u32, param1: u32, param2: u32, ret: u32) {
        self.record4(ids::PEND_FUNC_CALL, function, param1, param2, ret);
    }

    fn pend_func_call_from_isr(&self, function: u32, param1: u32, param2: u32, ret: u32) {
        self.record4(ids::PEND_FUNC_CALL_FROM_ISR, function, param1, param2, ret);
    }

    fn timer_api_enter(&self, api: TimerApi, args: [u32; 4]) {
        let [a, b, c, d] = args;
        self.record4(api.enter_event(), a, b, c, d);
    }

    fn timer_api_return(&self, api: TimerApi, value: u32) {
        self.record2(api.return_event(), value, 0);
    }

    fn event_group_create(&self, group: u32) {
        self.record2(ids::EVENT_GROUP_CREATE, group, 0);
    }

    fn event_group_create_failed(&self) {
        self.record2(ids::EVENT_GROUP_CREATE_FAILED, 0, 0);
    }

    fn event_group_wait_bits_end(&self, group: u32, bits_to_wait_for: u32, timeout_occurred: u32) {
        self.record4(
            ids::EVENT_GROUP_WAIT_BITS_END,
            group,
            bits_to_wait_for,
            timeout_occurred,
            0,
        );
    }

    fn event_group_clear_bits(&self, group: u32, bits: u32) {
        self.record2(ids::EVENT_GROUP_CLEAR_BITS, group, bits);
    }

    fn event_group_clear_bits_from_isr(&self, group: u32, bits: u32) {
        self.record2(ids::EVENT_GROUP_CLEAR_BITS_FROM_ISR, group, bits);
    }

    fn event_group_set_bits(&self, group: u32, bits: u32) {
        self.record2(ids::EVENT_GROUP_SET_BITS, group, bits);
    }

    fn event_group_set_bits_from_isr(&self, group: u32, bits: u32) {
        self.record2(ids::EVENT_GROUP_SET_BITS_FROM_ISR, group, bits);
    }

    fn event_group_delete(&self, group: u32) {
        self.record2(ids::EVENT_GROUP_DELETE, group, 0);
    }

    fn malloc(&self, address: u32, size: u32) {
        self.record2(ids::HEAP_MALLOC, address, size);
    }

    fn free(&self, address: u32, size: u32) {
        self.record2(ids::HEAP_FREE, address, size);
    }
}
