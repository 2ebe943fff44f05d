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

//! Message queues: `osMessageQueue*`

use crate::error::{OsError, OsResult};
use crate::kernel::queue::StaticQueue;
use crate::port::Port;
use crate::types::QueueHandle;

use super::{control_block, wait_error, Os2};

/// `osMessageQueueAttr_t`
///
/// A queue is static when both `cb_mem` and `mq_mem` are given, with
/// `mq_size` covering `msg_count * msg_size` bytes. Without either, both
/// sizes must be 0. Any other combination is rejected.
#[derive(Debug, Default)]
pub struct MessageQueueAttr {
    pub cb_mem: Option<&'static mut StaticQueue>,
    pub cb_size: usize,
    pub mq_mem: Option<&'static mut [u8]>,
    pub mq_size: usize,
}

/// `osMessageQueueId_t`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OsMessageQueueId(QueueHandle);

impl OsMessageQueueId {
    /// Kernel queue handle behind the id.
    pub fn handle(self) -> QueueHandle {
        self.0
    }
}

impl<P: Port> Os2<P> {
    /// `osMessageQueueNew()`
    pub fn message_queue_new(
        &self,
        msg_count: u32,
        msg_size: u32,
        attr: Option<MessageQueueAttr>,
    ) -> Option<OsMessageQueueId> {
        if self.is_irq() || msg_count == 0 || msg_size == 0 {
            return None;
        }
        let count = msg_count as usize;
        let size = msg_size as usize;
        let storage_size = count.checked_mul(size)?;
        let (cb_mem, mq_mem) = match attr {
            None => (None, None),
            Some(attr) => {
                let mq_mem = match attr.mq_mem {
                    Some(mem) if attr.mq_size >= storage_size => Some(mem),
                    None if attr.mq_size == 0 => None,
                    _ => return None,
                };
                (control_block(attr.cb_mem, attr.cb_size)?, mq_mem)
            }
        };
        let result = match (cb_mem, mq_mem) {
            (Some(cb), Some(mq)) => self.kernel.queue_create_static(count, size, mq, cb),
            (None, None) => self.kernel.queue_create(count, size),
            _ => return None,
        };
        match result {
            Ok(handle) => Some(OsMessageQueueId(handle)),
            Err(e) => {
                log::warn!("osMessageQueueNew failed: {e}");
                None
            }
        }
    }

    /// `osMessageQueuePut()`: copies the first `msg_size` bytes of `msg`.
    /// Message priorities are not supported and `_msg_prio` is ignored.
    ///
    /// From an interrupt, `timeout` must be 0.
    pub fn message_queue_put(
        &self,
        mq_id: OsMessageQueueId,
        msg: &[u8],
        _msg_prio: u8,
        timeout: u32,
    ) -> OsResult<()> {
        if self.is_irq() {
            if timeout != 0 {
                return Err(OsError::Parameter);
            }
            return self
                .kernel
                .queue_send_to_back_from_isr(mq_id.0, msg)
                .map_err(|e| wait_error(e, 0));
        }
        self.kernel
            .queue_send_to_back(mq_id.0, msg)
            .map_err(|e| wait_error(e, timeout))
    }

    /// `osMessageQueueGet()`: copies the oldest message into the first
    /// `msg_size` bytes of `msg`. No priority is reported.
    ///
    /// From an interrupt, `timeout` must be 0.
    pub fn message_queue_get(
        &self,
        mq_id: OsMessageQueueId,
        msg: &mut [u8],
        timeout: u32,
    ) -> OsResult<()> {
        if self.is_irq() {
            if timeout != 0 {
                return Err(OsError::Parameter);
            }
            return self
                .kernel
                .queue_receive_from_isr(mq_id.0, msg)
                .map_err(|e| wait_error(e, 0));
        }
        self.kernel
            .queue_receive(mq_id.0, msg)
            .map_err(|e| wait_error(e, timeout))
    }

    /// `osMessageQueueGetCapacity()`; 0 for a deleted queue.
    pub fn message_queue_get_capacity(&self, mq_id: OsMessageQueueId) -> u32 {
        self.kernel.queue_length(mq_id.0).map_or(0, |n| n as u32)
    }

    /// `osMessageQueueGetMsgSize()`; 0 for a deleted queue.
    pub fn message_queue_get_msg_size(&self, mq_id: OsMessageQueueId) -> u32 {
        self.kernel.queue_item_size(mq_id.0).map_or(0, |n| n as u32)
    }

    /// `osMessageQueueGetCount()`; 0 for a deleted queue.
    pub fn message_queue_get_count(&self, mq_id: OsMessageQueueId) -> u32 {
        self.kernel
            .queue_messages_waiting(mq_id.0)
            .map_or(0, |n| n as u32)
    }

    /// `osMessageQueueGetSpace()`; 0 for a deleted queue.
    pub fn message_queue_get_space(&self, mq_id: OsMessageQueueId) -> u32 {
        self.kernel
            .queue_spaces_available(mq_id.0)
            .map_or(0, |n| n as u32)
    }

    /// `osMessageQueueReset()`: drops every queued message.
    pub fn message_queue_reset(&self, mq_id: OsMessageQueueId) -> OsResult<()> {
        if self.is_irq() {
            return Err(OsError::Isr);
        }
        self.kernel
            .queue_reset(mq_id.0)
            .map_err(|_| OsError::Parameter)
    }

    /// `osMessageQueueDelete()`
    pub fn message_queue_delete(&self, mq_id: OsMessageQueueId) -> OsResult<()> {
        if self.is_irq() {
            return Err(OsError::Isr);
        }
        self.kernel
            .queue_delete(mq_id.0)
            .map_err(|_| OsError::Parameter)
    }
}
