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

//! Queues
//!
//! Bounded FIFO with a capacity fixed at creation, the storage behind the
//! timer command queue, plus the queue-family objects applications create:
//! message queues, semaphores and mutexes. Sends and receives never block:
//! a full or empty queue is reported to the caller, who decides whether
//! that is an error.

use alloc::boxed::Box;
use alloc::collections::VecDeque;
use alloc::vec::Vec;

use crate::error::{Error, Result};
use crate::kernel::registry::{Registry, StaticObject};
use crate::kernel::Kernel;
use crate::port::Port;
use crate::trace::TraceHooks;
use crate::types::{QueueHandle, TaskHandle};

/// Queue type recorded by `QueueCreateFailed` (`queueQUEUE_TYPE_BASE`).
pub const QUEUE_TYPE_BASE: u8 = 0;
/// `queueQUEUE_TYPE_MUTEX`
pub const QUEUE_TYPE_MUTEX: u8 = 1;
/// `queueQUEUE_TYPE_COUNTING_SEMAPHORE`
pub const QUEUE_TYPE_COUNTING_SEMAPHORE: u8 = 2;
/// `queueQUEUE_TYPE_BINARY_SEMAPHORE`
pub const QUEUE_TYPE_BINARY_SEMAPHORE: u8 = 3;
/// `queueQUEUE_TYPE_RECURSIVE_MUTEX`
pub const QUEUE_TYPE_RECURSIVE_MUTEX: u8 = 4;

#[derive(Debug)]
pub struct Queue<T> {
    handle: QueueHandle,
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> Queue<T> {
    /// Creates an empty queue holding at most `capacity` items.
    pub fn new(handle: QueueHandle, capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::Parameter("queue length must be non-zero"));
        }
        let mut items = VecDeque::new();
        items
            .try_reserve_exact(capacity)
            .map_err(|_| Error::NoMemory)?;
        Ok(Self {
            handle,
            items,
            capacity,
        })
    }

    pub fn handle(&self) -> QueueHandle {
        self.handle
    }

    /// Appends `item`; gives it back when the queue is full.
    pub fn send_to_back(&mut self, item: T) -> core::result::Result<(), T> {
        if self.is_full() {
            return Err(item);
        }
        self.items.push_back(item);
        Ok(())
    }

    /// Prepends `item`; gives it back when the queue is full.
    pub fn send_to_front(&mut self, item: T) -> core::result::Result<(), T> {
        if self.is_full() {
            return Err(item);
        }
        self.items.push_front(item);
        Ok(())
    }

    pub fn receive(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    pub fn peek(&self) -> Option<&T> {
        self.items.front()
    }

    pub fn messages_waiting(&self) -> usize {
        self.items.len()
    }

    pub fn spaces_available(&self) -> usize {
        self.capacity - self.items.len()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Discards every queued item.
    pub fn reset(&mut self) {
        self.items.clear();
    }
}

// =============================================================================
// Message queues
// =============================================================================

enum MessageStorage {
    Heap(Box<[u8]>),
    Static(&'static mut [u8]),
}

impl MessageStorage {
    fn bytes(&self) -> &[u8] {
        match self {
            Self::Heap(bytes) => bytes,
            Self::Static(bytes) => bytes,
        }
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        match self {
            Self::Heap(bytes) => bytes,
            Self::Static(bytes) => bytes,
        }
    }
}

/// Ring of `capacity` fixed-size messages, copied in and out by value.
pub struct MessageQueue {
    storage: MessageStorage,
    msg_size: usize,
    capacity: usize,
    head: usize,
    count: usize,
}

impl MessageQueue {
    /// Creates an empty queue, in `buffer` when given, else on the heap.
    pub fn new(
        capacity: usize,
        msg_size: usize,
        buffer: Option<&'static mut [u8]>,
    ) -> Result<Self> {
        if capacity == 0 || msg_size == 0 {
            return Err(Error::Parameter("queue length and item size must be non-zero"));
        }
        let total = capacity.checked_mul(msg_size).ok_or(Error::NoMemory)?;
        let storage = match buffer {
            Some(buffer) if buffer.len() >= total => MessageStorage::Static(buffer),
            Some(_) => return Err(Error::Parameter("queue storage too small")),
            None => {
                let mut bytes = Vec::new();
                bytes.try_reserve_exact(total).map_err(|_| Error::NoMemory)?;
                bytes.resize(total, 0);
                MessageStorage::Heap(bytes.into_boxed_slice())
            }
        };
        Ok(Self {
            storage,
            msg_size,
            capacity,
            head: 0,
            count: 0,
        })
    }

    /// Copies the first `msg_size` bytes of `msg` to the back.
    pub fn put(&mut self, msg: &[u8]) -> Result<()> {
        let msg = msg
            .get(..self.msg_size)
            .ok_or(Error::Parameter("message shorter than the item size"))?;
        if self.is_full() {
            return Err(Error::QueueFull);
        }
        let slot = (self.head + self.count) % self.capacity * self.msg_size;
        self.storage.bytes_mut()[slot..slot + self.msg_size].copy_from_slice(msg);
        self.count += 1;
        Ok(())
    }

    /// Copies the front message into the first `msg_size` bytes of `out`.
    pub fn get(&mut self, out: &mut [u8]) -> Result<()> {
        let out = out
            .get_mut(..self.msg_size)
            .ok_or(Error::Parameter("buffer shorter than the item size"))?;
        if self.count == 0 {
            return Err(Error::QueueEmpty);
        }
        let slot = self.head * self.msg_size;
        out.copy_from_slice(&self.storage.bytes()[slot..slot + self.msg_size]);
        self.head = (self.head + 1) % self.capacity;
        self.count -= 1;
        Ok(())
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn space(&self) -> usize {
        self.capacity - self.count
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn msg_size(&self) -> usize {
        self.msg_size
    }

    pub fn is_full(&self) -> bool {
        self.count == self.capacity
    }

    /// `xQueueReset()`
    pub fn reset(&mut self) {
        self.head = 0;
        self.count = 0;
    }

    fn heap_bytes(&self) -> usize {
        match self.storage {
            MessageStorage::Heap(ref bytes) => bytes.len(),
            MessageStorage::Static(_) => 0,
        }
    }
}

// =============================================================================
// Semaphores and mutexes
// =============================================================================

/// Binary or counting semaphore: a queue of empty items.
pub struct Semaphore {
    tokens: Queue<()>,
    queue_type: u8,
}

impl Semaphore {
    fn new(
        handle: QueueHandle,
        max_count: usize,
        initial_count: usize,
        queue_type: u8,
    ) -> Result<Self> {
        if initial_count > max_count {
            return Err(Error::Parameter("initial count exceeds the maximum"));
        }
        let mut tokens = Queue::new(handle, max_count)?;
        for _ in 0..initial_count {
            let _ = tokens.send_to_back(());
        }
        Ok(Self { tokens, queue_type })
    }

    pub fn count(&self) -> usize {
        self.tokens.messages_waiting()
    }

    pub fn max_count(&self) -> usize {
        self.tokens.messages_waiting() + self.tokens.spaces_available()
    }

    fn take(&mut self) -> Result<()> {
        self.tokens.receive().ok_or(Error::QueueEmpty)
    }

    fn give(&mut self) -> Result<()> {
        self.tokens.send_to_back(()).map_err(|()| Error::QueueFull)
    }
}

/// Mutex with an owning task; recursive mutexes count nested takes.
#[derive(Debug)]
pub struct KernelMutex {
    recursive: bool,
    holder: Option<TaskHandle>,
    depth: u32,
}

impl KernelMutex {
    pub fn new(recursive: bool) -> Self {
        Self {
            recursive,
            holder: None,
            depth: 0,
        }
    }

    pub fn is_recursive(&self) -> bool {
        self.recursive
    }

    pub fn is_taken(&self) -> bool {
        self.depth > 0
    }

    /// `xSemaphoreGetMutexHolder()`
    pub fn holder(&self) -> Option<TaskHandle> {
        self.holder.filter(|_| self.is_taken())
    }

    /// Takes the mutex for `caller`. A recursive mutex may be taken again by
    /// its holder.
    fn take(&mut self, caller: Option<TaskHandle>) -> Result<()> {
        if self.is_taken() {
            if !(self.recursive && self.holder == caller) {
                return Err(Error::QueueEmpty);
            }
        } else {
            self.holder = caller;
        }
        self.depth += 1;
        Ok(())
    }

    /// Releases one take; only the holder may give.
    fn give(&mut self, caller: Option<TaskHandle>) -> Result<()> {
        if !self.is_taken() || self.holder != caller {
            return Err(Error::NotOwner);
        }
        self.depth -= 1;
        if self.depth == 0 {
            self.holder = None;
        }
        Ok(())
    }
}

/// Anything created through the queue API.
pub enum QueueObject {
    Messages(MessageQueue),
    Semaphore(Semaphore),
    Mutex(KernelMutex),
}

impl QueueObject {
    /// `ucQueueType`
    pub fn queue_type(&self) -> u8 {
        match self {
            Self::Messages(_) => QUEUE_TYPE_BASE,
            Self::Semaphore(semaphore) => semaphore.queue_type,
            Self::Mutex(mutex) if mutex.recursive => QUEUE_TYPE_RECURSIVE_MUTEX,
            Self::Mutex(_) => QUEUE_TYPE_MUTEX,
        }
    }

    /// Bytes reported to the heap trace for a dynamically created object.
    fn allocation_size(&self) -> u32 {
        let storage = match self {
            Self::Messages(queue) => queue.heap_bytes(),
            _ => 0,
        };
        (core::mem::size_of::<Self>() + storage) as u32
    }
}

/// `StaticQueue_t`
pub type StaticQueue = StaticObject<QueueObject>;

/// `StaticSemaphore_t`
pub type StaticSemaphore = StaticQueue;

pub(crate) type QueueRegistry = Registry<QueueHandle, QueueObject>;

/// `prvInitialiseNewQueue` and its trace, for every queue-family object.
fn insert_queue(
    queues: &mut QueueRegistry,
    trace: &dyn TraceHooks,
    queue_type: u8,
    buffer: Option<&'static mut StaticQueue>,
    build: impl FnOnce(QueueHandle) -> Result<QueueObject>,
) -> Result<QueueHandle> {
    let is_static = buffer.is_some();
    match queues.insert_with(buffer, build) {
        Ok(handle) => {
            if !is_static {
                if let Some(object) = queues.get(handle) {
                    trace.malloc(handle.raw(), object.allocation_size());
                }
            }
            trace.queue_create(handle.raw());
            log::trace!("created {handle:?} (type {queue_type})");
            Ok(handle)
        }
        Err(e) => {
            trace.queue_create_failed(queue_type);
            Err(e)
        }
    }
}

fn trace_send(trace: &dyn TraceHooks, queue: QueueHandle, from_isr: bool, result: &Result<()>) {
    let raw = queue.raw();
    match (result, from_isr) {
        (Ok(()), false) => trace.queue_send(raw),
        (Ok(()), true) => trace.queue_send_from_isr(raw),
        (Err(Error::QueueFull), false) => trace.queue_send_failed(raw),
        (Err(Error::QueueFull), true) => trace.queue_send_from_isr_failed(raw),
        (Err(_), _) => {}
    }
}

fn trace_receive(trace: &dyn TraceHooks, queue: QueueHandle, from_isr: bool, result: &Result<()>) {
    let raw = queue.raw();
    match (result, from_isr) {
        (Ok(()), false) => trace.queue_receive(raw),
        (Ok(()), true) => trace.queue_receive_from_isr(raw),
        (Err(Error::QueueEmpty), false) => trace.queue_receive_failed(raw),
        (Err(Error::QueueEmpty), true) => trace.queue_receive_from_isr_failed(raw),
        (Err(_), _) => {}
    }
}

const NOT_A_MESSAGE_QUEUE: Error = Error::Parameter("not a message queue");
const NOT_A_SEMAPHORE: Error = Error::Parameter("not a semaphore");
const NOT_A_MUTEX: Error = Error::Parameter("not a mutex");

// =============================================================================
// Kernel API
// =============================================================================

impl<P: Port> Kernel<P> {
    /// Runs `f` on the live object behind `queue` with the current task.
    fn with_queue<R>(
        &self,
        queue: QueueHandle,
        f: impl FnOnce(&mut QueueObject, Option<TaskHandle>, &dyn TraceHooks) -> Result<R>,
    ) -> Result<R> {
        self.with_core(|core, trace| {
            let current = core.scheduler.current_task();
            let object = core.queues.get_mut(queue).ok_or(Error::InvalidHandle)?;
            f(object, current, trace)
        })
    }

    /// `xQueueCreate()`
    pub fn queue_create(&self, length: usize, item_size: usize) -> Result<QueueHandle> {
        self.with_core(|core, trace| {
            insert_queue(&mut core.queues, trace, QUEUE_TYPE_BASE, None, |_| {
                MessageQueue::new(length, item_size, None).map(QueueObject::Messages)
            })
        })
    }

    /// `xQueueCreateStatic()`: the messages live in `storage`, the queue in
    /// `buffer`.
    pub fn queue_create_static(
        &self,
        length: usize,
        item_size: usize,
        storage: &'static mut [u8],
        buffer: &'static mut StaticQueue,
    ) -> Result<QueueHandle> {
        self.with_core(|core, trace| {
            insert_queue(&mut core.queues, trace, QUEUE_TYPE_BASE, Some(buffer), |_| {
                MessageQueue::new(length, item_size, Some(storage)).map(QueueObject::Messages)
            })
        })
    }

    fn queue_send_inner(&self, queue: QueueHandle, item: &[u8], from_isr: bool) -> Result<()> {
        self.with_queue(queue, |object, _, trace| {
            let QueueObject::Messages(messages) = object else {
                return Err(NOT_A_MESSAGE_QUEUE);
            };
            let result = messages.put(item);
            trace_send(trace, queue, from_isr, &result);
            result
        })
    }

    /// `xQueueSendToBack()`; a full queue fails with [`Error::QueueFull`].
    pub fn queue_send_to_back(&self, queue: QueueHandle, item: &[u8]) -> Result<()> {
        self.queue_send_inner(queue, item, false)
    }

    /// `xQueueSendToBackFromISR()`
    pub fn queue_send_to_back_from_isr(&self, queue: QueueHandle, item: &[u8]) -> Result<()> {
        self.queue_send_inner(queue, item, true)
    }

    fn queue_receive_inner(
        &self,
        queue: QueueHandle,
        out: &mut [u8],
        from_isr: bool,
    ) -> Result<()> {
        self.with_queue(queue, |object, _, trace| {
            let QueueObject::Messages(messages) = object else {
                return Err(NOT_A_MESSAGE_QUEUE);
            };
            let result = messages.get(out);
            trace_receive(trace, queue, from_isr, &result);
            result
        })
    }

    /// `xQueueReceive()`; an empty queue fails with [`Error::QueueEmpty`].
    pub fn queue_receive(&self, queue: QueueHandle, out: &mut [u8]) -> Result<()> {
        self.queue_receive_inner(queue, out, false)
    }

    /// `xQueueReceiveFromISR()`
    pub fn queue_receive_from_isr(&self, queue: QueueHandle, out: &mut [u8]) -> Result<()> {
        self.queue_receive_inner(queue, out, true)
    }

    /// `uxQueueMessagesWaiting()`: messages, semaphore count, or 1 for a
    /// free mutex.
    pub fn queue_messages_waiting(&self, queue: QueueHandle) -> Result<usize> {
        self.with_queue(queue, |object, _, _| {
            Ok(match object {
                QueueObject::Messages(messages) => messages.count(),
                QueueObject::Semaphore(semaphore) => semaphore.count(),
                QueueObject::Mutex(mutex) => usize::from(!mutex.is_taken()),
            })
        })
    }

    /// `uxQueueSpacesAvailable()`
    pub fn queue_spaces_available(&self, queue: QueueHandle) -> Result<usize> {
        self.with_queue(queue, |object, _, _| match object {
            QueueObject::Messages(messages) => Ok(messages.space()),
            _ => Err(NOT_A_MESSAGE_QUEUE),
        })
    }

    /// `uxQueueGetQueueLength()`
    pub fn queue_length(&self, queue: QueueHandle) -> Result<usize> {
        self.with_queue(queue, |object, _, _| match object {
            QueueObject::Messages(messages) => Ok(messages.capacity()),
            _ => Err(NOT_A_MESSAGE_QUEUE),
        })
    }

    /// `uxQueueGetQueueItemSize()`
    pub fn queue_item_size(&self, queue: QueueHandle) -> Result<usize> {
        self.with_queue(queue, |object, _, _| match object {
            QueueObject::Messages(messages) => Ok(messages.msg_size()),
            _ => Err(NOT_A_MESSAGE_QUEUE),
        })
    }

    /// `xQueueReset()`: discards every queued message.
    pub fn queue_reset(&self, queue: QueueHandle) -> Result<()> {
        self.with_queue(queue, |object, _, _| match object {
            QueueObject::Messages(messages) => {
                messages.reset();
                Ok(())
            }
            _ => Err(NOT_A_MESSAGE_QUEUE),
        })
    }

    /// `vQueueDelete()` / `vSemaphoreDelete()`; the handle goes stale.
    pub fn queue_delete(&self, queue: QueueHandle) -> Result<()> {
        self.with_core(|core, trace| {
            let removed = core.queues.remove(queue).ok_or(Error::InvalidHandle)?;
            trace.queue_delete(queue.raw());
            if !removed.is_static {
                trace.free(queue.raw(), removed.object.allocation_size());
            }
            log::trace!("deleted {queue:?}");
            Ok(())
        })
    }

    /// Live queues, semaphores and mutexes, the timer command queue not
    /// included.
    pub fn queue_count(&self) -> usize {
        self.with_core(|core, _| core.queues.len())
    }

    // =========================================================================
    // Semaphores
    // =========================================================================

    /// `xSemaphoreCreateBinary()` / `xSemaphoreCreateBinaryStatic()`: the
    /// semaphore starts empty.
    pub fn semaphore_create_binary(
        &self,
        buffer: Option<&'static mut StaticSemaphore>,
    ) -> Result<QueueHandle> {
        self.with_core(|core, trace| {
            insert_queue(&mut core.queues, trace, QUEUE_TYPE_BINARY_SEMAPHORE, buffer, |h| {
                Semaphore::new(h, 1, 0, QUEUE_TYPE_BINARY_SEMAPHORE).map(QueueObject::Semaphore)
            })
        })
    }

    /// `xSemaphoreCreateCounting()` / `xSemaphoreCreateCountingStatic()`
    pub fn semaphore_create_counting(
        &self,
        max_count: usize,
        initial_count: usize,
        buffer: Option<&'static mut StaticSemaphore>,
    ) -> Result<QueueHandle> {
        self.with_core(|core, trace| {
            let result = insert_queue(
                &mut core.queues,
                trace,
                QUEUE_TYPE_COUNTING_SEMAPHORE,
                buffer,
                |h| {
                    Semaphore::new(h, max_count, initial_count, QUEUE_TYPE_COUNTING_SEMAPHORE)
                        .map(QueueObject::Semaphore)
                },
            );
            match &result {
                Ok(handle) => trace.create_counting_semaphore(handle.raw()),
                Err(_) => trace.create_counting_semaphore_failed(),
            }
            result
        })
    }

    fn semaphore_take_inner(&self, semaphore: QueueHandle, from_isr: bool) -> Result<()> {
        self.with_queue(semaphore, |object, _, trace| {
            let QueueObject::Semaphore(semaphore_object) = object else {
                return Err(NOT_A_SEMAPHORE);
            };
            let result = semaphore_object.take();
            trace_receive(trace, semaphore, from_isr, &result);
            result
        })
    }

    /// `xSemaphoreTake()`; fails with [`Error::QueueEmpty`] at count zero.
    pub fn semaphore_take(&self, semaphore: QueueHandle) -> Result<()> {
        self.semaphore_take_inner(semaphore, false)
    }

    /// `xSemaphoreTakeFromISR()`
    pub fn semaphore_take_from_isr(&self, semaphore: QueueHandle) -> Result<()> {
        self.semaphore_take_inner(semaphore, true)
    }

    fn semaphore_give_inner(&self, semaphore: QueueHandle, from_isr: bool) -> Result<()> {
        self.with_queue(semaphore, |object, _, trace| {
            let QueueObject::Semaphore(semaphore_object) = object else {
                return Err(NOT_A_SEMAPHORE);
            };
            let result = semaphore_object.give();
            trace_send(trace, semaphore, from_isr, &result);
            result
        })
    }

    /// `xSemaphoreGive()`; fails with [`Error::QueueFull`] at the maximum
    /// count.
    pub fn semaphore_give(&self, semaphore: QueueHandle) -> Result<()> {
        self.semaphore_give_inner(semaphore, false)
    }

    /// `xSemaphoreGiveFromISR()`
    pub fn semaphore_give_from_isr(&self, semaphore: QueueHandle) -> Result<()> {
        self.semaphore_give_inner(semaphore, true)
    }

    /// `uxSemaphoreGetCount()`
    pub fn semaphore_get_count(&self, semaphore: QueueHandle) -> Result<usize> {
        self.with_queue(semaphore, |object, _, _| match object {
            QueueObject::Semaphore(semaphore) => Ok(semaphore.count()),
            _ => Err(NOT_A_SEMAPHORE),
        })
    }

    // =========================================================================
    // Mutexes
    // =========================================================================

    /// `xSemaphoreCreateMutex()` / `xSemaphoreCreateRecursiveMutex()` and
    /// their static variants.
    pub fn mutex_create(
        &self,
        recursive: bool,
        buffer: Option<&'static mut StaticSemaphore>,
    ) -> Result<QueueHandle> {
        let queue_type = if recursive {
            QUEUE_TYPE_RECURSIVE_MUTEX
        } else {
            QUEUE_TYPE_MUTEX
        };
        self.with_core(|core, trace| {
            let result = insert_queue(&mut core.queues, trace, queue_type, buffer, |_| {
                Ok(QueueObject::Mutex(KernelMutex::new(recursive)))
            });
            match &result {
                Ok(handle) => trace.create_mutex(handle.raw()),
                Err(_) => trace.create_mutex_failed(),
            }
            result
        })
    }

    /// `xSemaphoreTake()` / `xSemaphoreTakeRecursive()` on behalf of the
    /// current task. A held mutex fails with [`Error::QueueEmpty`].
    pub fn mutex_take(&self, mutex: QueueHandle) -> Result<()> {
        self.with_queue(mutex, |object, current, trace| {
            let QueueObject::Mutex(mutex_object) = object else {
                return Err(NOT_A_MUTEX);
            };
            let result = mutex_object.take(current);
            if mutex_object.is_recursive() {
                match result {
                    Ok(()) => trace.take_mutex_recursive(mutex.raw()),
                    Err(_) => trace.take_mutex_recursive_failed(mutex.raw()),
                }
            } else {
                trace_receive(trace, mutex, false, &result);
            }
            result
        })
    }

    /// `xSemaphoreGive()` / `xSemaphoreGiveRecursive()`; only the holder may
    /// give, anyone else gets [`Error::NotOwner`].
    pub fn mutex_give(&self, mutex: QueueHandle) -> Result<()> {
        self.with_queue(mutex, |object, current, trace| {
            let QueueObject::Mutex(mutex_object) = object else {
                return Err(NOT_A_MUTEX);
            };
            let result = mutex_object.give(current);
            if mutex_object.is_recursive() {
                match result {
                    Ok(()) => trace.give_mutex_recursive(mutex.raw()),
                    Err(_) => trace.give_mutex_recursive_failed(mutex.raw()),
                }
            } else if result.is_ok() {
                trace.queue_send(mutex.raw());
            } else {
                trace.queue_send_failed(mutex.raw());
            }
            result
        })
    }

    /// `xSemaphoreGetMutexHolder()`
    pub fn mutex_holder(&self, mutex: QueueHandle) -> Result<Option<TaskHandle>> {
        self.with_queue(mutex, |object, _, _| match object {
            QueueObject::Mutex(mutex) => Ok(mutex.holder()),
            _ => Err(NOT_A_MUTEX),
        })
    }

    /// Whether `mutex` was created recursive.
    pub fn mutex_is_recursive(&self, mutex: QueueHandle) -> Result<bool> {
        self.with_queue(mutex, |object, _, _| match object {
            QueueObject::Mutex(mutex) => Ok(mutex.is_recursive()),
            _ => Err(NOT_A_MUTEX),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(Queue::<u8>::new(QueueHandle::new(0, 0), 0).is_err());
    }

    #[test]
    fn fifo_until_full() {
        let mut q = Queue::new(QueueHandle::new(1, 0), 2).unwrap();
        assert!(q.send_to_back(1).is_ok());
        assert!(q.send_to_back(2).is_ok());
        assert_eq!(q.send_to_back(3), Err(3));
        assert_eq!(q.spaces_available(), 0);
        assert_eq!(q.receive(), Some(1));
        assert_eq!(q.receive(), Some(2));
        assert_eq!(q.receive(), None);
    }

    #[test]
    fn send_to_front_jumps_the_line() {
        let mut q = Queue::new(QueueHandle::new(1, 0), 3).unwrap();
        q.send_to_back(1).unwrap();
        q.send_to_front(0).unwrap();
        assert_eq!(q.peek(), Some(&0));
        assert_eq!(q.messages_waiting(), 2);
        q.reset();
        assert!(q.is_empty());
    }

    #[test]
    fn message_queue_wraps_around() {
        let mut q = MessageQueue::new(2, 3, None).unwrap();
        let mut out = [0u8; 3];
        q.put(b"abc").unwrap();
        q.put(b"def").unwrap();
        assert_eq!(q.put(b"ghi"), Err(Error::QueueFull));
        q.get(&mut out).unwrap();
        assert_eq!(&out, b"abc");
        q.put(b"ghi").unwrap();
        q.get(&mut out).unwrap();
        assert_eq!(&out, b"def");
        q.get(&mut out).unwrap();
        assert_eq!(&out, b"ghi");
        assert_eq!(q.get(&mut out), Err(Error::QueueEmpty));
        assert_eq!(q.space(), 2);
    }

    #[test]
    fn message_queue_checks_sizes() {
        assert!(MessageQueue::new(0, 4, None).is_err());
        assert!(MessageQueue::new(4, 0, None).is_err());
        let small: &'static mut [u8] = Box::leak(Box::new([0u8; 7]));
        assert!(matches!(
            MessageQueue::new(2, 4, Some(small)),
            Err(Error::Parameter(_))
        ));

        let mut q = MessageQueue::new(1, 4, None).unwrap();
        assert!(matches!(q.put(b"abc"), Err(Error::Parameter(_))));
        q.put(b"abcdef").unwrap();
        let mut out = [0u8; 6];
        q.get(&mut out).unwrap();
        assert_eq!(&out, b"abcd\0\0");
    }

    #[test]
    fn recursive_mutex_counts_nested_takes() {
        let owner = Some(TaskHandle::new(1));
        let other = Some(TaskHandle::new(2));
        let mut m = KernelMutex::new(true);
        m.take(owner).unwrap();
        m.take(owner).unwrap();
        assert_eq!(m.take(other), Err(Error::QueueEmpty));
        assert_eq!(m.give(other), Err(Error::NotOwner));
        m.give(owner).unwrap();
        assert_eq!(m.holder(), owner);
        m.give(owner).unwrap();
        assert_eq!(m.holder(), None);
        assert_eq!(m.give(owner), Err(Error::NotOwner));
    }

    #[test]
    fn plain_mutex_is_not_reentrant() {
        let owner = Some(TaskHandle::new(1));
        let mut m = KernelMutex::new(false);
        m.take(owner).unwrap();
        assert_eq!(m.take(owner), Err(Error::QueueEmpty));
        m.give(owner).unwrap();
        assert!(!m.is_taken());
    }

    #[test]
    fn counting_semaphore_bounds() {
        let handle = QueueHandle::new(2, 0);
        let mut s = Semaphore::new(handle, 2, 1, QUEUE_TYPE_COUNTING_SEMAPHORE).unwrap();
        assert_eq!(s.count(), 1);
        s.give().unwrap();
        assert_eq!(s.give(), Err(Error::QueueFull));
        assert_eq!(s.max_count(), 2);
        s.take().unwrap();
        s.take().unwrap();
        assert_eq!(s.take(), Err(Error::QueueEmpty));
        assert!(Semaphore::new(QueueHandle::new(2, 0), 1, 2, QUEUE_TYPE_BINARY_SEMAPHORE).is_err());
    }
}
