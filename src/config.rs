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

//! Kernel Configuration
//!
//! Runtime counterpart of `FreeRTOSConfig.h`. Defaults follow the
//! CMSIS-FreeRTOS reference configuration.

use crate::error::{Error, Result};
use crate::types::TickType;

// =============================================================================
// Kernel identification
// =============================================================================

/// Kernel major version
pub const KERNEL_VERSION_MAJOR: u32 = 11;

/// Kernel minor version
pub const KERNEL_VERSION_MINOR: u32 = 1;

/// Kernel build number
pub const KERNEL_VERSION_BUILD: u32 = 0;

/// Version encoded as `major * 10000000 + minor * 10000 + build`.
pub const KERNEL_VERSION: u32 =
    KERNEL_VERSION_MAJOR * 10_000_000 + KERNEL_VERSION_MINOR * 10_000 + KERNEL_VERSION_BUILD;

/// Kernel identification string returned by `osKernelGetInfo`.
pub const KERNEL_ID: &str = "FreeRTOS V9.0.0";

/// Name of the timer daemon task
pub const TIMER_SERVICE_TASK_NAME: &str = "Tmr Svc";

/// Arena slots available for timers (handles encode 12 bits of slot index).
pub const MAX_TIMER_SLOTS: usize = 0x1000;

/// Arena slots available per kind of queue-like object and for event groups.
/// Queue slot `0xFFF` is the timer command queue's.
pub const MAX_OBJECT_SLOTS: usize = 0x0FFF;

// =============================================================================
// Daemon scheduling
// =============================================================================

/// When the timer daemon gets to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonMode {
    /// The daemon outranks every caller: a task-context timer command is
    /// processed before the call returns, as long as the scheduler runs.
    Immediate,
    /// Commands wait in the queue until the next tick, scheduler resume or
    /// explicit service pass.
    Deferred,
}

// =============================================================================
// Event Recorder configuration
// =============================================================================

/// Level mask bit: errors
pub const EVR_LEVEL_ERROR: u8 = 0x01;
/// Level mask bit: API calls
pub const EVR_LEVEL_API: u8 = 0x02;
/// Level mask bit: operations
pub const EVR_LEVEL_OP: u8 = 0x04;
/// Level mask bit: detailed operations
pub const EVR_LEVEL_DETAIL: u8 = 0x08;
/// Every level
pub const EVR_LEVEL_ALL: u8 = 0x0F;

/// Event Recorder setup, the `EVR_RTOS_*` / `configEVR_*` settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvrConfig {
    /// Initialize the recorder during setup.
    pub initialize: bool,
    /// Apply the per-component levels during setup.
    pub setup_level: bool,
    /// Recording mask applied to every component at initialization.
    pub init_recording: u8,
    /// Start recording right after initialization.
    pub init_start: bool,
    pub tasks: u8,
    pub queue: u8,
    pub timers: u8,
    pub event_groups: u8,
    pub heap: u8,
    pub stream_buffer: u8,
}

impl Default for EvrConfig {
    fn default() -> Self {
        Self::reference()
    }
}

impl EvrConfig {
    /// `configEVR_*` defaults: recorder initialized and started, errors and
    /// operations recorded for every component.
    pub const fn reference() -> Self {
        Self {
            initialize: true,
            setup_level: true,
            init_recording: EVR_LEVEL_ERROR,
            init_start: true,
            tasks: EVR_LEVEL_ERROR | EVR_LEVEL_OP,
            queue: EVR_LEVEL_ERROR | EVR_LEVEL_OP,
            timers: EVR_LEVEL_ERROR | EVR_LEVEL_OP,
            event_groups: EVR_LEVEL_ERROR | EVR_LEVEL_OP,
            heap: EVR_LEVEL_ERROR | EVR_LEVEL_OP,
            stream_buffer: EVR_LEVEL_ERROR | EVR_LEVEL_OP,
        }
    }

    /// Every level for every component.
    pub fn all() -> Self {
        Self {
            init_recording: EVR_LEVEL_ALL,
            tasks: EVR_LEVEL_ALL,
            queue: EVR_LEVEL_ALL,
            timers: EVR_LEVEL_ALL,
            event_groups: EVR_LEVEL_ALL,
            heap: EVR_LEVEL_ALL,
            stream_buffer: EVR_LEVEL_ALL,
            ..Self::default()
        }
    }

    /// Rejects level masks with bits outside `EVR_LEVEL_ALL`.
    pub fn validate(&self) -> Result<()> {
        let masks = [
            ("init_recording", self.init_recording),
            ("tasks", self.tasks),
            ("queue", self.queue),
            ("timers", self.timers),
            ("event_groups", self.event_groups),
            ("heap", self.heap),
            ("stream_buffer", self.stream_buffer),
        ];
        for (name, mask) in masks {
            if mask & !EVR_LEVEL_ALL != 0 {
                log::warn!("evr level mask {name}={mask:#x} has bits outside 0x0F");
                return Err(Error::Config("invalid Event Recorder level mask"));
            }
        }
        Ok(())
    }
}

// =============================================================================
// Kernel configuration
// =============================================================================

/// Kernel settings consumed by [`crate::kernel::Kernel::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelConfig {
    /// Tick rate in Hz
    pub tick_rate_hz: u32,
    /// CPU clock, also the system timer frequency
    pub cpu_clock_hz: u32,
    /// Number of task priority levels
    pub max_priorities: u32,
    /// Priority of the timer daemon task
    pub timer_task_priority: u32,
    /// Capacity of the timer command queue
    pub timer_queue_length: usize,
    /// Stack depth of the timer daemon task, in words
    pub timer_task_stack_depth: usize,
    /// Limit on dynamically allocated timers; 0 means unlimited
    pub max_timers: usize,
    /// Tick count at kernel creation
    pub initial_tick_count: TickType,
    pub daemon_mode: DaemonMode,
    pub evr: EvrConfig,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 1000,
            cpu_clock_hz: 80_000_000,
            max_priorities: 56,
            timer_task_priority: 40,
            timer_queue_length: 5,
            timer_task_stack_depth: 80,
            max_timers: 0,
            initial_tick_count: 0,
            daemon_mode: DaemonMode::Immediate,
            evr: EvrConfig::default(),
        }
    }
}

impl KernelConfig {
    /// Checks the `configASSERT`-style constraints up front.
    pub fn validate(&self) -> Result<()> {
        if self.tick_rate_hz == 0 {
            return Err(Error::Config("tick rate must be non-zero"));
        }
        if self.timer_queue_length == 0 {
            return Err(Error::Config("timer queue length must be non-zero"));
        }
        if self.timer_task_priority >= self.max_priorities {
            return Err(Error::Config("timer task priority out of range"));
        }
        if self.max_timers > MAX_TIMER_SLOTS {
            return Err(Error::Config("max_timers exceeds the timer arena"));
        }
        self.evr.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = KernelConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.evr.timers, 0x05);
    }

    #[test]
    fn kernel_version_encoding() {
        assert_eq!(KERNEL_VERSION, 110_010_000);
    }

    #[test]
    fn rejects_timer_priority_at_max() {
        let cfg = KernelConfig {
            timer_task_priority: 56,
            ..KernelConfig::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(Error::Config("timer task priority out of range"))
        );
    }

    #[test]
    fn rejects_zero_queue_length() {
        let cfg = KernelConfig {
            timer_queue_length: 0,
            ..KernelConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_evr_mask() {
        let mut cfg = KernelConfig::default();
        cfg.evr.heap = 0x10;
        assert!(matches!(cfg.validate(), Err(Error::Config(_))));
    }
}
