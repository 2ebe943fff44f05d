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

//! Trace Hooks
//!
//! The kernel reports what it does through a [`TraceHooks`] object, the
//! counterpart of the `trace*` macros in `FreeRTOS.h`. Every hook defaults to
//! a no-op, so an implementation only overrides what it records.
//!
//! ## Usage
//!
//! Hooks run inside the kernel's critical section. They must not call back
//! into the kernel. [`crate::evr::EventRecorder`] is the bundled
//! implementation; [`NoTrace`] records nothing.
//!
//! Object arguments are the `raw()` values of the kernel handles.

#![allow(unused_variables)]

use crate::config::EvrConfig;

// =============================================================================
// Timer API identifiers
// =============================================================================

/// Timer API functions that report entry and return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerApi {
    CreateTimerTask,
    Create,
    CreateStatic,
    GenericCommandFromTask,
    GenericCommandFromIsr,
    GetTimerDaemonTaskHandle,
    GetPeriod,
    SetReloadMode,
    GetReloadMode,
    UxGetReloadMode,
    GetExpiryTime,
    GetName,
    IsTimerActive,
    GetTimerId,
    SetTimerId,
    GetStaticBuffer,
    GetTimerNumber,
    SetTimerNumber,
    PendFunctionCall,
    PendFunctionCallFromIsr,
}

impl TimerApi {
    /// Every timer API, in event-id order.
    pub const ALL: [TimerApi; 20] = [
        Self::CreateTimerTask,
        Self::Create,
        Self::CreateStatic,
        Self::GenericCommandFromTask,
        Self::GenericCommandFromIsr,
        Self::GetTimerDaemonTaskHandle,
        Self::GetPeriod,
        Self::SetReloadMode,
        Self::GetReloadMode,
        Self::UxGetReloadMode,
        Self::GetExpiryTime,
        Self::GetName,
        Self::IsTimerActive,
        Self::GetTimerId,
        Self::SetTimerId,
        Self::GetStaticBuffer,
        Self::GetTimerNumber,
        Self::SetTimerNumber,
        Self::PendFunctionCall,
        Self::PendFunctionCallFromIsr,
    ];

    /// Position in [`TimerApi::ALL`].
    pub const fn ordinal(self) -> u8 {
        self as u8
    }

    /// FreeRTOS function name.
    pub const fn function_name(self) -> &'static str {
        match self {
            Self::CreateTimerTask => "xTimerCreateTimerTask",
            Self::Create => "xTimerCreate",
            Self::CreateStatic => "xTimerCreateStatic",
            Self::GenericCommandFromTask => "xTimerGenericCommandFromTask",
            Self::GenericCommandFromIsr => "xTimerGenericCommandFromISR",
            Self::GetTimerDaemonTaskHandle => "xTimerGetTimerDaemonTaskHandle",
            Self::GetPeriod => "xTimerGetPeriod",
            Self::SetReloadMode => "vTimerSetReloadMode",
            Self::GetReloadMode => "xTimerGetReloadMode",
            Self::UxGetReloadMode => "uxTimerGetReloadMode",
            Self::GetExpiryTime => "xTimerGetExpiryTime",
            Self::GetName => "pcTimerGetName",
            Self::IsTimerActive => "xTimerIsTimerActive",
            Self::GetTimerId => "pvTimerGetTimerID",
            Self::SetTimerId => "vTimerSetTimerID",
            Self::GetStaticBuffer => "xTimerGetStaticBuffer",
            Self::GetTimerNumber => "uxTimerGetTimerNumber",
            Self::SetTimerNumber => "vTimerSetTimerNumber",
            Self::PendFunctionCall => "xTimerPendFunctionCall",
            Self::PendFunctionCallFromIsr => "xTimerPendFunctionCallFromISR",
        }
    }
}

// =============================================================================
// Hooks
// =============================================================================

/// Kernel instrumentation points.
pub trait TraceHooks: Send + Sync {
    /// Recorder setup with the kernel's Event Recorder configuration; runs
    /// once per kernel unless `reset` is set.
    fn setup(&self, reset: bool, config: &EvrConfig) {}

    // -------------------------------------------------------------------------
    // Tasks
    // -------------------------------------------------------------------------

    fn task_create(&self, task: u32) {}

    fn task_create_failed(&self) {}

    /// Tick interrupt; `tick_count` is the value before the increment.
    fn task_increment_tick(&self, tick_count: u32) {}

    fn task_delay(&self, ticks: u32) {}

    fn task_delay_until(&self, time_to_wake: u32) {}

    // -------------------------------------------------------------------------
    // Queues
    // -------------------------------------------------------------------------

    fn queue_create(&self, queue: u32) {}

    fn queue_create_failed(&self, queue_type: u8) {}

    fn queue_send(&self, queue: u32) {}

    fn queue_send_failed(&self, queue: u32) {}

    fn queue_send_from_isr(&self, queue: u32) {}

    fn queue_send_from_isr_failed(&self, queue: u32) {}

    fn queue_receive(&self, queue: u32) {}

    fn queue_receive_failed(&self, queue: u32) {}

    fn queue_receive_from_isr(&self, queue: u32) {}

    fn queue_receive_from_isr_failed(&self, queue: u32) {}

    fn queue_delete(&self, queue: u32) {}

    fn create_mutex(&self, mutex: u32) {}

    fn create_mutex_failed(&self) {}

    fn give_mutex_recursive(&self, mutex: u32) {}

    fn give_mutex_recursive_failed(&self, mutex: u32) {}

    fn take_mutex_recursive(&self, mutex: u32) {}

    fn take_mutex_recursive_failed(&self, mutex: u32) {}

    fn create_counting_semaphore(&self, semaphore: u32) {}

    fn create_counting_semaphore_failed(&self) {}

    // -------------------------------------------------------------------------
    // Timers
    // -------------------------------------------------------------------------

    fn timer_create(&self, timer: u32) {}

    fn timer_create_failed(&self) {}

    /// `ret` is 1 when the command was queued.
    fn timer_command_send(&self, timer: u32, command: i32, value: u32, ret: u32) {}

    fn timer_command_received(&self, timer: u32, command: i32, value: u32) {}

    fn timer_expired(&self, timer: u32) {}

    fn pend_func_call(&self, function: u32, param1: u32, param2: u32, ret: u32) {}

    fn pend_func_call_from_isr(&self, function: u32, param1: u32, param2: u32, ret: u32) {}

    /// Timer API entry with up to four arguments.
    fn timer_api_enter(&self, api: TimerApi, args: [u32; 4]) {}

    /// Timer API return value.
    fn timer_api_return(&self, api: TimerApi, value: u32) {}

    // -------------------------------------------------------------------------
    // Event groups
    // -------------------------------------------------------------------------

    fn event_group_create(&self, group: u32) {}

    fn event_group_create_failed(&self) {}

    /// End of a bit test; `timeout_occurred` is 1 when the condition failed.
    fn event_group_wait_bits_end(&self, group: u32, bits_to_wait_for: u32, timeout_occurred: u32) {}

    fn event_group_clear_bits(&self, group: u32, bits: u32) {}

    fn event_group_clear_bits_from_isr(&self, group: u32, bits: u32) {}

    fn event_group_set_bits(&self, group: u32, bits: u32) {}

    fn event_group_set_bits_from_isr(&self, group: u32, bits: u32) {}

    fn event_group_delete(&self, group: u32) {}

    // -------------------------------------------------------------------------
    // Heap
    // -------------------------------------------------------------------------

    fn malloc(&self, address: u32, size: u32) {}

    fn free(&self, address: u32, size: u32) {}
}

/// Records nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTrace;

impl TraceHooks for NoTrace {}
