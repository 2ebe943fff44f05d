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

//! Semaphores: `osSemaphore*`
//!
//! A maximum count of 1 makes a binary semaphore, anything larger a
//! counting one.

use crate::error::{OsError, OsResult, Result};
use crate::kernel::queue::StaticSemaphore;
use crate::port::Port;
use crate::types::QueueHandle;

use super::{control_block, wait_error, Os2};

/// `osSemaphoreAttr_t`
#[derive(Debug, Default)]
pub struct SemaphoreAttr {
    pub cb_mem: Option<&'static mut StaticSemaphore>,
    pub cb_size: usize,
}

/// `osSemaphoreId_t`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OsSemaphoreId(QueueHandle);

impl OsSemaphoreId {
    /// Kernel queue handle behind the id.
    pub fn handle(self) -> QueueHandle {
        self.0
    }
}

impl<P: Port> Os2<P> {
    /// `osSemaphoreNew()`
    pub fn semaphore_new(
        &self,
        max_count: u32,
        initial_count: u32,
        attr: Option<SemaphoreAttr>,
    ) -> Option<OsSemaphoreId> {
        if self.is_irq() || max_count == 0 || initial_count > max_count {
            return None;
        }
        let buffer = match attr {
            None => None,
            Some(attr) => control_block(attr.cb_mem, attr.cb_size)?,
        };
        let result = if max_count == 1 {
            self.binary_semaphore(initial_count != 0, buffer)
        } else {
            self.kernel.semaphore_create_counting(
                max_count as usize,
                initial_count as usize,
                buffer,
            )
        };
        match result {
            Ok(handle) => Some(OsSemaphoreId(handle)),
            Err(e) => {
                log::warn!("osSemaphoreNew failed: {e}");
                None
            }
        }
    }

    fn binary_semaphore(
        &self,
        given: bool,
        buffer: Option<&'static mut StaticSemaphore>,
    ) -> Result<QueueHandle> {
        let handle = self.kernel.semaphore_create_binary(buffer)?;
        if given {
            if let Err(e) = self.kernel.semaphore_give(handle) {
                let _ = self.kernel.queue_delete(handle);
                return Err(e);
            }
        }
        Ok(handle)
    }

    /// `osSemaphoreAcquire()`: takes one token. From an interrupt,
    /// `timeout` must be 0.
    pub fn semaphore_acquire(&self, semaphore_id: OsSemaphoreId, timeout: u32) -> OsResult<()> {
        if self.is_irq() {
            if timeout != 0 {
                return Err(OsError::Parameter);
            }
            return self
                .kernel
                .semaphore_take_from_isr(semaphore_id.0)
                .map_err(|e| wait_error(e, 0));
        }
        self.kernel
            .semaphore_take(semaphore_id.0)
            .map_err(|e| wait_error(e, timeout))
    }

    /// `osSemaphoreRelease()`: returns one token; fails with
    /// [`OsError::Resource`] at the maximum count.
    pub fn semaphore_release(&self, semaphore_id: OsSemaphoreId) -> OsResult<()> {
        let result = if self.is_irq() {
            self.kernel.semaphore_give_from_isr(semaphore_id.0)
        } else {
            self.kernel.semaphore_give(semaphore_id.0)
        };
        result.map_err(|e| wait_error(e, 0))
    }

    /// `osSemaphoreGetCount()`; 0 for a deleted semaphore.
    pub fn semaphore_get_count(&self, semaphore_id: OsSemaphoreId) -> u32 {
        self.kernel
            .semaphore_get_count(semaphore_id.0)
            .map_or(0, |n| n as u32)
    }

    /// `osSemaphoreDelete()`
    pub fn semaphore_delete(&self, semaphore_id: OsSemaphoreId) -> OsResult<()> {
        if self.is_irq() {
            return Err(OsError::Isr);
        }
        self.kernel
            .queue_delete(semaphore_id.0)
            .map_err(|_| OsError::Parameter)
    }
}
