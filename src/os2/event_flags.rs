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

//! Event flags: `osEventFlags*`
//!
//! Flags map onto an event group. The top byte of a flags word is
//! reserved, so only the low 24 bits may be used.

use bitflags::bitflags;

use crate::error::{Error, OsError, OsResult};
use crate::kernel::event_groups::{EventBits, StaticEventGroup};
use crate::port::Port;
use crate::types::{tick_word, EventGroupHandle};

use super::{control_block, Os2};

/// Flags outside the usable range; setting, clearing or waiting for any of
/// them is an [`OsError::Parameter`].
pub const EVENT_FLAGS_INVALID_BITS: u32 = !((1 << 24) - 1);

bitflags! {
    /// `osFlagsWaitAny` / `osFlagsWaitAll` / `osFlagsNoClear`
    ///
    /// The empty set waits for any flag and clears the ones it saw.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FlagsOptions: u32 {
        const WAIT_ALL = 0x01;
        const NO_CLEAR = 0x02;
    }
}

impl FlagsOptions {
    /// `osFlagsWaitAny`
    pub const WAIT_ANY: Self = Self::empty();
}

/// `osEventFlagsAttr_t`
#[derive(Debug, Default)]
pub struct EventFlagsAttr {
    pub cb_mem: Option<&'static mut StaticEventGroup>,
    pub cb_size: usize,
}

/// `osEventFlagsId_t`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OsEventFlagsId(EventGroupHandle);

impl OsEventFlagsId {
    /// Kernel event group handle behind the id.
    pub fn handle(self) -> EventGroupHandle {
        self.0
    }
}

fn event_bits(flags: u32) -> OsResult<EventBits> {
    if flags & EVENT_FLAGS_INVALID_BITS != 0 {
        return Err(OsError::Parameter);
    }
    EventBits::try_from(flags).map_err(|_| OsError::Parameter)
}

fn object_error(error: Error) -> OsError {
    match error {
        Error::InvalidHandle | Error::Parameter(_) => OsError::Parameter,
        _ => OsError::Resource,
    }
}

impl<P: Port> Os2<P> {
    /// `osEventFlagsNew()`
    pub fn event_flags_new(&self, attr: Option<EventFlagsAttr>) -> Option<OsEventFlagsId> {
        if self.is_irq() {
            return None;
        }
        let buffer = match attr {
            None => None,
            Some(attr) => control_block(attr.cb_mem, attr.cb_size)?,
        };
        match self.kernel.event_group_create(buffer) {
            Ok(handle) => Some(OsEventFlagsId(handle)),
            Err(e) => {
                log::warn!("osEventFlagsNew failed: {e}");
                None
            }
        }
    }

    /// `osEventFlagsSet()`
    ///
    /// Returns the flags after setting. From an interrupt the update is
    /// handed to the timer daemon and the requested flags are returned.
    pub fn event_flags_set(&self, ef_id: OsEventFlagsId, flags: u32) -> OsResult<u32> {
        let bits = event_bits(flags)?;
        if self.is_irq() {
            return self
                .kernel
                .event_group_set_bits_from_isr(ef_id.0, bits)
                .map(|_| flags)
                .map_err(object_error);
        }
        self.kernel
            .event_group_set_bits(ef_id.0, bits)
            .map(tick_word)
            .map_err(object_error)
    }

    /// `osEventFlagsClear()`: returns the flags before clearing. From an
    /// interrupt the clear is deferred like [`Os2::event_flags_set`].
    pub fn event_flags_clear(&self, ef_id: OsEventFlagsId, flags: u32) -> OsResult<u32> {
        let bits = event_bits(flags)?;
        if self.is_irq() {
            let before = self
                .kernel
                .event_group_get_bits_from_isr(ef_id.0)
                .map_err(object_error)?;
            self.kernel
                .event_group_clear_bits_from_isr(ef_id.0, bits)
                .map_err(object_error)?;
            return Ok(tick_word(before));
        }
        self.kernel
            .event_group_clear_bits(ef_id.0, bits)
            .map(tick_word)
            .map_err(object_error)
    }

    /// `osEventFlagsGet()`; 0 for a deleted object.
    pub fn event_flags_get(&self, ef_id: OsEventFlagsId) -> u32 {
        let bits = if self.is_irq() {
            self.kernel.event_group_get_bits_from_isr(ef_id.0)
        } else {
            self.kernel.event_group_get_bits(ef_id.0)
        };
        bits.map_or(0, tick_word)
    }

    /// `osEventFlagsWait()`
    ///
    /// Returns the flags as they were when the wait was satisfied; unless
    /// [`FlagsOptions::NO_CLEAR`] is given, the awaited flags are cleared.
    pub fn event_flags_wait(
        &self,
        ef_id: OsEventFlagsId,
        flags: u32,
        options: FlagsOptions,
        timeout: u32,
    ) -> OsResult<u32> {
        let bits = event_bits(flags)?;
        if self.is_irq() {
            return Err(OsError::Isr);
        }
        let wait_all = options.contains(FlagsOptions::WAIT_ALL);
        let clear = !options.contains(FlagsOptions::NO_CLEAR);
        let current = self
            .kernel
            .event_group_wait_bits(ef_id.0, bits, clear, wait_all)
            .map(tick_word)
            .map_err(|_| OsError::Parameter)?;
        let met = if wait_all {
            current & flags == flags
        } else {
            current & flags != 0
        };
        if met {
            Ok(current)
        } else if timeout != 0 {
            Err(OsError::Timeout)
        } else {
            Err(OsError::Resource)
        }
    }

    /// `osEventFlagsDelete()`
    pub fn event_flags_delete(&self, ef_id: OsEventFlagsId) -> OsResult<()> {
        if self.is_irq() {
            return Err(OsError::Isr);
        }
        self.kernel
            .event_group_delete(ef_id.0)
            .map_err(|_| OsError::Parameter)
    }
}
