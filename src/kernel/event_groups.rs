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

//! Event Groups
//!
//! A word of event bits that tasks set, clear and test. The top byte is
//! reserved for the kernel, as in FreeRTOS, so a group carries 8 bits with
//! 16-bit ticks and 24 bits otherwise (56 with 64-bit ticks).
//!
//! Interrupts never touch a group directly: their set and clear requests are
//! queued for the timer daemon, which applies them in task context.

use crate::error::{Error, Result};
use crate::kernel::registry::{Registry, StaticObject};
use crate::kernel::Kernel;
use crate::port::Port;
use crate::trace::TraceHooks;
use crate::types::{tick_word, EventGroupHandle, TickType};

/// `EventBits_t`, as wide as the tick type.
pub type EventBits = TickType;

/// Bits reserved for the kernel (`eventEVENT_BITS_CONTROL_BYTES`).
#[cfg(feature = "tick-16bit")]
pub const EVENT_BITS_CONTROL_BYTES: EventBits = 0xFF00;

#[cfg(all(feature = "tick-64bit", not(feature = "tick-16bit")))]
pub const EVENT_BITS_CONTROL_BYTES: EventBits = 0xFF00_0000_0000_0000;

#[cfg(not(any(feature = "tick-16bit", feature = "tick-64bit")))]
pub const EVENT_BITS_CONTROL_BYTES: EventBits = 0xFF00_0000;

#[derive(Debug, Default)]
pub struct EventGroup {
    bits: EventBits,
}

impl EventGroup {
    pub const fn new() -> Self {
        Self { bits: 0 }
    }

    pub fn bits(&self) -> EventBits {
        self.bits
    }

    /// Returns the bits after setting.
    fn set(&mut self, bits: EventBits) -> EventBits {
        self.bits |= bits;
        self.bits
    }

    /// Returns the bits before clearing.
    fn clear(&mut self, bits: EventBits) -> EventBits {
        let before = self.bits;
        self.bits &= !bits;
        before
    }

    /// `prvTestWaitCondition()`
    fn condition_met(&self, wait_for: EventBits, wait_for_all: bool) -> bool {
        if wait_for_all {
            self.bits & wait_for == wait_for
        } else {
            self.bits & wait_for != 0
        }
    }
}

/// `StaticEventGroup_t`
pub type StaticEventGroup = StaticObject<EventGroup>;

pub(crate) type EventGroupRegistry = Registry<EventGroupHandle, EventGroup>;

const EVENT_GROUP_ALLOCATION_SIZE: u32 = core::mem::size_of::<EventGroup>() as u32;

fn check_bits(bits: EventBits) -> Result<()> {
    if bits & EVENT_BITS_CONTROL_BYTES != 0 {
        return Err(Error::Parameter("event bits overlap the control byte"));
    }
    Ok(())
}

/// `vEventGroupSetBitsCallback` / `vEventGroupClearBitsCallback`: applies
/// an interrupt's request in the daemon.
pub(crate) fn apply_deferred(
    groups: &mut EventGroupRegistry,
    group: EventGroupHandle,
    bits: EventBits,
    set: bool,
    trace: &dyn TraceHooks,
) {
    let Some(object) = groups.get_mut(group) else {
        log::warn!("dropping deferred bits {bits:#x} for deleted {group:?}");
        return;
    };
    if set {
        trace.event_group_set_bits(group.raw(), tick_word(bits));
        object.set(bits);
    } else {
        trace.event_group_clear_bits(group.raw(), tick_word(bits));
        object.clear(bits);
    }
}

impl<P: Port> Kernel<P> {
    /// `xEventGroupCreate()` / `xEventGroupCreateStatic()`
    pub fn event_group_create(
        &self,
        buffer: Option<&'static mut StaticEventGroup>,
    ) -> Result<EventGroupHandle> {
        let is_static = buffer.is_some();
        self.with_core(|core, trace| {
            match core.event_groups.insert_with(buffer, |_| Ok(EventGroup::new())) {
                Ok(group) => {
                    if !is_static {
                        trace.malloc(group.raw(), EVENT_GROUP_ALLOCATION_SIZE);
                    }
                    trace.event_group_create(group.raw());
                    Ok(group)
                }
                Err(e) => {
                    trace.event_group_create_failed();
                    Err(e)
                }
            }
        })
    }

    fn with_group<R>(
        &self,
        group: EventGroupHandle,
        f: impl FnOnce(&mut EventGroup, &dyn TraceHooks) -> R,
    ) -> Result<R> {
        self.with_core(|core, trace| {
            let object = core.event_groups.get_mut(group).ok_or(Error::InvalidHandle)?;
            Ok(f(object, trace))
        })
    }

    /// `xEventGroupSetBits()`: returns the bits after setting.
    pub fn event_group_set_bits(
        &self,
        group: EventGroupHandle,
        bits: EventBits,
    ) -> Result<EventBits> {
        check_bits(bits)?;
        self.with_group(group, |object, trace| {
            trace.event_group_set_bits(group.raw(), tick_word(bits));
            object.set(bits)
        })
    }

    /// `xEventGroupClearBits()`: returns the bits before clearing.
    pub fn event_group_clear_bits(
        &self,
        group: EventGroupHandle,
        bits: EventBits,
    ) -> Result<EventBits> {
        check_bits(bits)?;
        self.with_group(group, |object, trace| {
            trace.event_group_clear_bits(group.raw(), tick_word(bits));
            object.clear(bits)
        })
    }

    /// `xEventGroupGetBits()`, which FreeRTOS implements as clearing no
    /// bits.
    pub fn event_group_get_bits(&self, group: EventGroupHandle) -> Result<EventBits> {
        self.event_group_clear_bits(group, 0)
    }

    /// `xEventGroupGetBitsFromISR()`
    pub fn event_group_get_bits_from_isr(&self, group: EventGroupHandle) -> Result<EventBits> {
        self.with_group(group, |object, _| object.bits())
    }

    fn event_group_defer(
        &self,
        group: EventGroupHandle,
        bits: EventBits,
        set: bool,
    ) -> Result<bool> {
        check_bits(bits)?;
        self.with_core(|core, trace| {
            if !core.event_groups.contains(group) {
                return Err(Error::InvalidHandle);
            }
            if set {
                trace.event_group_set_bits_from_isr(group.raw(), tick_word(bits));
            } else {
                trace.event_group_clear_bits_from_isr(group.raw(), tick_word(bits));
            }
            core.timers
                .post_event_bits(group, bits, set, trace)
                .map(|()| core.scheduler.is_running())
        })
    }

    /// `xEventGroupSetBitsFromISR()`
    ///
    /// Queues the update for the timer daemon; fails with
    /// [`Error::QueueFull`] when its command queue is full. Returns whether
    /// the daemon was woken.
    pub fn event_group_set_bits_from_isr(
        &self,
        group: EventGroupHandle,
        bits: EventBits,
    ) -> Result<bool> {
        self.event_group_defer(group, bits, true)
    }

    /// `xEventGroupClearBitsFromISR()`, deferred like
    /// [`Kernel::event_group_set_bits_from_isr`].
    pub fn event_group_clear_bits_from_isr(
        &self,
        group: EventGroupHandle,
        bits: EventBits,
    ) -> Result<bool> {
        self.event_group_defer(group, bits, false)
    }

    /// `xEventGroupWaitBits()` without blocking.
    ///
    /// Tests the bits once and returns them as they were at the test. When
    /// the condition holds and `clear_on_exit` is set, the awaited bits are
    /// cleared. `bits_to_wait_for` must be non-zero.
    pub fn event_group_wait_bits(
        &self,
        group: EventGroupHandle,
        bits_to_wait_for: EventBits,
        clear_on_exit: bool,
        wait_for_all: bool,
    ) -> Result<EventBits> {
        check_bits(bits_to_wait_for)?;
        if bits_to_wait_for == 0 {
            return Err(Error::Parameter("no event bits to wait for"));
        }
        self.with_group(group, |object, trace| {
            let bits = object.bits();
            let met = object.condition_met(bits_to_wait_for, wait_for_all);
            if met && clear_on_exit {
                object.clear(bits_to_wait_for);
            }
            trace.event_group_wait_bits_end(
                group.raw(),
                tick_word(bits_to_wait_for),
                u32::from(!met),
            );
            bits
        })
    }

    /// `vEventGroupDelete()`; the handle goes stale.
    pub fn event_group_delete(&self, group: EventGroupHandle) -> Result<()> {
        self.with_core(|core, trace| {
            let removed = core.event_groups.remove(group).ok_or(Error::InvalidHandle)?;
            trace.event_group_delete(group.raw());
            if !removed.is_static {
                trace.free(group.raw(), EVENT_GROUP_ALLOCATION_SIZE);
            }
            Ok(())
        })
    }

    /// Live event groups.
    pub fn event_group_count(&self) -> usize {
        self.with_core(|core, _| core.event_groups.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_returns_after_and_clear_returns_before() {
        let mut g = EventGroup::new();
        assert_eq!(g.set(0b0101), 0b0101);
        assert_eq!(g.clear(0b0001), 0b0101);
        assert_eq!(g.bits(), 0b0100);
    }

    #[test]
    fn wait_condition_any_and_all() {
        let mut g = EventGroup::new();
        g.set(0b0110);
        assert!(g.condition_met(0b0011, false));
        assert!(!g.condition_met(0b0011, true));
        assert!(g.condition_met(0b0110, true));
    }

    #[test]
    fn control_byte_is_reserved() {
        assert!(check_bits(EVENT_BITS_CONTROL_BYTES).is_err());
        assert!(check_bits(1).is_ok());
    }
}
