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

//! Mutexes: `osMutex*`
//!
//! A mutex belongs to the task that acquired it, as reported by
//! [`Kernel::current_task`](crate::Kernel::current_task). Only that task
//! may release it.

use bitflags::bitflags;

use crate::error::{Error, OsError, OsResult};
use crate::kernel::queue::StaticSemaphore;
use crate::port::Port;
use crate::types::QueueHandle;

use super::{control_block, wait_error, Os2, OsThreadId};

bitflags! {
    /// `osMutexAttr_t::attr_bits`
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MutexAttrBits: u32 {
        /// `osMutexRecursive`
        const RECURSIVE = 0x01;
        /// `osMutexPrioInherit`; FreeRTOS mutexes always inherit.
        const PRIO_INHERIT = 0x02;
        /// `osMutexRobust`, which FreeRTOS cannot provide.
        const ROBUST = 0x08;
    }
}

impl Default for MutexAttrBits {
    fn default() -> Self {
        Self::empty()
    }
}

/// `osMutexAttr_t`
#[derive(Debug, Default)]
pub struct MutexAttr {
    pub attr_bits: MutexAttrBits,
    pub cb_mem: Option<&'static mut StaticSemaphore>,
    pub cb_size: usize,
}

/// `osMutexId_t`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OsMutexId(QueueHandle);

impl OsMutexId {
    /// Kernel queue handle behind the id.
    pub fn handle(self) -> QueueHandle {
        self.0
    }
}

impl<P: Port> Os2<P> {
    /// `osMutexNew()`; `None` for robust mutexes.
    pub fn mutex_new(&self, attr: Option<MutexAttr>) -> Option<OsMutexId> {
        if self.is_irq() {
            return None;
        }
        let (bits, buffer) = match attr {
            None => (MutexAttrBits::empty(), None),
            Some(attr) => {
                if attr.attr_bits.contains(MutexAttrBits::ROBUST) {
                    return None;
                }
                (attr.attr_bits, control_block(attr.cb_mem, attr.cb_size)?)
            }
        };
        let recursive = bits.contains(MutexAttrBits::RECURSIVE);
        match self.kernel.mutex_create(recursive, buffer) {
            Ok(handle) => Some(OsMutexId(handle)),
            Err(e) => {
                log::warn!("osMutexNew failed: {e}");
                None
            }
        }
    }

    /// `osMutexAcquire()` for the current task.
    pub fn mutex_acquire(&self, mutex_id: OsMutexId, timeout: u32) -> OsResult<()> {
        if self.is_irq() {
            return Err(OsError::Isr);
        }
        self.kernel
            .mutex_take(mutex_id.0)
            .map_err(|e| wait_error(e, timeout))
    }

    /// `osMutexRelease()`; [`OsError::Resource`] unless the current task
    /// holds the mutex.
    pub fn mutex_release(&self, mutex_id: OsMutexId) -> OsResult<()> {
        if self.is_irq() {
            return Err(OsError::Isr);
        }
        match self.kernel.mutex_give(mutex_id.0) {
            Ok(()) => Ok(()),
            Err(Error::InvalidHandle | Error::Parameter(_)) => Err(OsError::Parameter),
            Err(_) => Err(OsError::Resource),
        }
    }

    /// `osMutexGetOwner()`; `None` for a free or deleted mutex and in
    /// interrupt context.
    pub fn mutex_get_owner(&self, mutex_id: OsMutexId) -> Option<OsThreadId> {
        if self.is_irq() {
            return None;
        }
        self.kernel
            .mutex_holder(mutex_id.0)
            .ok()
            .flatten()
            .map(OsThreadId)
    }

    /// `osMutexDelete()`
    pub fn mutex_delete(&self, mutex_id: OsMutexId) -> OsResult<()> {
        if self.is_irq() {
            return Err(OsError::Isr);
        }
        self.kernel
            .queue_delete(mutex_id.0)
            .map_err(|_| OsError::Parameter)
    }
}
