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

//! Core Type Definitions
//!
//! Tick type selection and the handle types shared by the kernel, the
//! CMSIS-RTOS2 layer and the trace recorder.
//!
//! Handles are generational: a deleted object's handle never aliases a
//! newer object stored in the same slot.

use core::fmt;

// =============================================================================
// Tick type (configurable width independent of architecture)
// =============================================================================

/// Tick counter type - 16-bit variant
/// Suitable for very resource-constrained systems.
#[cfg(feature = "tick-16bit")]
pub type TickType = u16;

/// Tick counter type - 64-bit variant
/// For systems needing very long delays without overflow.
#[cfg(all(feature = "tick-64bit", not(feature = "tick-16bit")))]
pub type TickType = u64;

/// Tick counter type - 32-bit variant (most common)
#[cfg(not(any(feature = "tick-16bit", feature = "tick-64bit")))]
pub type TickType = u32;

/// Maximum tick value; also "wait forever" for blocking calls.
pub const MAX_DELAY: TickType = TickType::MAX;

/// Converts milliseconds to ticks at `tick_rate_hz`, saturating at [`MAX_DELAY`].
pub fn ms_to_ticks(ms: u32, tick_rate_hz: u32) -> TickType {
    let ticks = u64::from(ms) * u64::from(tick_rate_hz) / 1000;
    TickType::try_from(ticks).unwrap_or(MAX_DELAY)
}

/// Converts ticks to milliseconds at `tick_rate_hz`.
pub fn ticks_to_ms(ticks: TickType, tick_rate_hz: u32) -> u64 {
    if tick_rate_hz == 0 {
        return 0;
    }
    (ticks as u64).saturating_mul(1000) / u64::from(tick_rate_hz)
}

/// Truncates a tick value to the 32-bit payload width of trace records.
#[inline(always)]
pub(crate) fn tick_word(ticks: TickType) -> u32 {
    ticks as u32
}

// =============================================================================
// Handles
// =============================================================================

/// Handle to a software timer.
///
/// Encodes the arena slot and the slot generation. Handles to deleted timers
/// are rejected by every kernel call instead of touching recycled storage.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle {
    index: u16,
    generation: u16,
}

impl TimerHandle {
    pub(crate) const fn new(index: u16, generation: u16) -> Self {
        Self { index, generation }
    }

    pub(crate) const fn index(self) -> usize {
        self.index as usize
    }

    pub(crate) const fn generation(self) -> u16 {
        self.generation
    }

    /// Stable 32-bit value used as the object address in trace records.
    ///
    /// Slot indices above `0xFFF` are never issued. Never zero, so a recorded
    /// `0` always means "no timer".
    pub const fn raw(self) -> u32 {
        0x2000_0000 | ((self.generation as u32) << 12) | (self.index as u32 & 0x0FFF)
    }
}

impl fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timer#{}.{}", self.index, self.generation)
    }
}

/// Handle to a kernel task record.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct TaskHandle(u16);

impl TaskHandle {
    pub(crate) const fn new(index: u16) -> Self {
        Self(index)
    }

    pub(crate) const fn index(self) -> usize {
        self.0 as usize
    }

    /// Stable 32-bit value used as the TCB address in trace records.
    pub const fn raw(self) -> u32 {
        0x1000_0000 | self.0 as u32
    }
}

/// Handle to a kernel queue, semaphore or mutex.
///
/// Generational like [`TimerHandle`]. Slot `0xFFF` belongs to the timer
/// command queue and is never issued for other queues.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueueHandle {
    index: u16,
    generation: u16,
}

impl QueueHandle {
    /// The timer service's command queue.
    pub(crate) const TIMER_COMMANDS: QueueHandle = QueueHandle::new(0x0FFF, 0);

    pub(crate) const fn new(index: u16, generation: u16) -> Self {
        Self { index, generation }
    }

    pub(crate) const fn index(self) -> usize {
        self.index as usize
    }

    pub(crate) const fn generation(self) -> u16 {
        self.generation
    }

    /// Stable 32-bit value used as the queue address in trace records.
    pub const fn raw(self) -> u32 {
        0x3000_0000 | ((self.generation as u32) << 12) | (self.index as u32 & 0x0FFF)
    }
}

impl fmt::Debug for QueueHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Queue#{}.{}", self.index, self.generation)
    }
}

/// Handle to an event group.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventGroupHandle {
    index: u16,
    generation: u16,
}

impl EventGroupHandle {
    pub(crate) const fn new(index: u16, generation: u16) -> Self {
        Self { index, generation }
    }

    pub(crate) const fn index(self) -> usize {
        self.index as usize
    }

    pub(crate) const fn generation(self) -> u16 {
        self.generation
    }

    /// Stable 32-bit value used as the event group address in trace records.
    pub const fn raw(self) -> u32 {
        0x4000_0000 | ((self.generation as u32) << 12) | (self.index as u32 & 0x0FFF)
    }
}

impl fmt::Debug for EventGroupHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventGroup#{}.{}", self.index, self.generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ms_conversion_at_1khz_is_identity() {
        assert_eq!(ms_to_ticks(250, 1000), 250);
        assert_eq!(ticks_to_ms(250, 1000), 250);
    }

    #[test]
    fn ms_conversion_scales_with_rate() {
        assert_eq!(ms_to_ticks(1000, 100), 100);
        assert_eq!(ticks_to_ms(100, 100), 1000);
        assert_eq!(ticks_to_ms(5, 0), 0);
    }

    #[test]
    fn raw_handles_are_distinct_per_generation() {
        let a = TimerHandle::new(3, 0);
        let b = TimerHandle::new(3, 1);
        assert_ne!(a.raw(), b.raw());
        assert_ne!(a.raw(), 0);
    }

    #[test]
    fn object_handles_occupy_distinct_address_ranges() {
        let queue = QueueHandle::new(3, 1);
        let group = EventGroupHandle::new(3, 1);
        assert_eq!(queue.raw(), 0x3000_1003);
        assert_eq!(group.raw(), 0x4000_1003);
        assert_eq!(QueueHandle::TIMER_COMMANDS.raw(), 0x3000_0FFF);
    }
}
