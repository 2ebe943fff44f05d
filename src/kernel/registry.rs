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

//! Object Registry
//!
//! Generational slot storage for the queues, semaphores, mutexes and event
//! groups created at run time. An object lives either on the heap or in a
//! caller-provided [`StaticObject`], the counterpart of `StaticQueue_t` and
//! `StaticEventGroup_t`.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;
use core::marker::PhantomData;

use crate::error::{Error, Result};
use crate::types::{EventGroupHandle, QueueHandle};

/// Handle type issued by a [`Registry`].
pub trait ObjectHandle: Copy {
    fn from_parts(index: u16, generation: u16) -> Self;
    fn slot(self) -> usize;
    fn generation(self) -> u16;
}

impl ObjectHandle for QueueHandle {
    fn from_parts(index: u16, generation: u16) -> Self {
        QueueHandle::new(index, generation)
    }

    fn slot(self) -> usize {
        self.index()
    }

    fn generation(self) -> u16 {
        QueueHandle::generation(self)
    }
}

impl ObjectHandle for EventGroupHandle {
    fn from_parts(index: u16, generation: u16) -> Self {
        EventGroupHandle::new(index, generation)
    }

    fn slot(self) -> usize {
        self.index()
    }

    fn generation(self) -> u16 {
        EventGroupHandle::generation(self)
    }
}

/// Caller-provided storage for one kernel object.
///
/// Handed to the kernel as `&'static mut`; the kernel keeps the reference
/// for good, so the buffer cannot back a second object.
pub struct StaticObject<T> {
    object: Option<T>,
}

impl<T> StaticObject<T> {
    pub const fn new() -> Self {
        Self { object: None }
    }
}

impl<T> Default for StaticObject<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for StaticObject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticObject")
            .field("in_use", &self.object.is_some())
            .finish()
    }
}

enum Storage<T: 'static> {
    Dynamic(Box<T>),
    Static(&'static mut StaticObject<T>),
}

impl<T: 'static> Storage<T> {
    fn get(&self) -> Option<&T> {
        match self {
            Self::Dynamic(object) => Some(object),
            Self::Static(buffer) => buffer.object.as_ref(),
        }
    }

    fn get_mut(&mut self) -> Option<&mut T> {
        match self {
            Self::Dynamic(object) => Some(object),
            Self::Static(buffer) => buffer.object.as_mut(),
        }
    }
}

struct Slot<T: 'static> {
    generation: u16,
    storage: Option<Storage<T>>,
}

/// Objects of one kind, addressed by generational handles.
pub struct Registry<H, T: 'static> {
    slots: Vec<Slot<T>>,
    free: Vec<u16>,
    limit: usize,
    live: usize,
    _handle: PhantomData<fn() -> H>,
}

/// An object taken out of its registry.
pub struct Removed<T> {
    pub object: T,
    /// The object lived in a [`StaticObject`].
    pub is_static: bool,
}

impl<H: ObjectHandle, T: 'static> Registry<H, T> {
    /// Empty registry that hands out at most `limit` slots.
    pub const fn new(limit: usize) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            limit,
            live: 0,
            _handle: PhantomData,
        }
    }

    fn allocate(&mut self) -> Option<u16> {
        if let Some(index) = self.free.pop() {
            return Some(index);
        }
        if self.slots.len() >= self.limit {
            return None;
        }
        let index = u16::try_from(self.slots.len()).ok()?;
        self.slots.try_reserve(1).ok()?;
        self.free.try_reserve(self.slots.len() + 1).ok()?;
        self.slots.push(Slot {
            generation: 0,
            storage: None,
        });
        Some(index)
    }

    /// Stores the object `build` makes for its future handle.
    ///
    /// With `buffer` the object lives there, otherwise on the heap. A failed
    /// `build` leaves the registry unchanged.
    pub fn insert_with(
        &mut self,
        buffer: Option<&'static mut StaticObject<T>>,
        build: impl FnOnce(H) -> Result<T>,
    ) -> Result<H> {
        let index = self.allocate().ok_or(Error::NoMemory)?;
        let slot = &mut self.slots[index as usize];
        let handle = H::from_parts(index, slot.generation);
        let object = match build(handle) {
            Ok(object) => object,
            Err(e) => {
                self.free.push(index);
                return Err(e);
            }
        };
        slot.storage = Some(match buffer {
            Some(buffer) => {
                buffer.object = Some(object);
                Storage::Static(buffer)
            }
            None => Storage::Dynamic(Box::new(object)),
        });
        self.live += 1;
        Ok(handle)
    }

    fn slot(&self, handle: H) -> Option<&Slot<T>> {
        self.slots
            .get(handle.slot())
            .filter(|slot| slot.generation == handle.generation())
    }

    pub fn get(&self, handle: H) -> Option<&T> {
        self.slot(handle)?.storage.as_ref()?.get()
    }

    pub fn get_mut(&mut self, handle: H) -> Option<&mut T> {
        let slot = self
            .slots
            .get_mut(handle.slot())
            .filter(|slot| slot.generation == handle.generation())?;
        slot.storage.as_mut()?.get_mut()
    }

    pub fn contains(&self, handle: H) -> bool {
        self.get(handle).is_some()
    }

    /// Takes the object out; its handle goes stale.
    pub fn remove(&mut self, handle: H) -> Option<Removed<T>> {
        let slot = self
            .slots
            .get_mut(handle.slot())
            .filter(|slot| slot.generation == handle.generation())?;
        let removed = match slot.storage.take()? {
            Storage::Dynamic(object) => Removed {
                object: *object,
                is_static: false,
            },
            Storage::Static(buffer) => Removed {
                object: buffer.object.take()?,
                is_static: true,
            },
        };
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.slot() as u16);
        self.live -= 1;
        Some(removed)
    }

    /// Live objects.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removed_handles_go_stale_and_slots_recycle() {
        let mut registry: Registry<QueueHandle, u32> = Registry::new(4);
        let a = registry.insert_with(None, |_| Ok(1)).unwrap();
        assert_eq!(registry.get(a), Some(&1));
        let removed = registry.remove(a).unwrap();
        assert_eq!(removed.object, 1);
        assert!(!removed.is_static);
        assert!(registry.get(a).is_none());
        assert!(registry.remove(a).is_none());

        let b = registry.insert_with(None, |_| Ok(2)).unwrap();
        assert_eq!(b.index(), a.index());
        assert_ne!(b, a);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn limit_bounds_live_objects() {
        let mut registry: Registry<EventGroupHandle, ()> = Registry::new(2);
        registry.insert_with(None, |_| Ok(())).unwrap();
        registry.insert_with(None, |_| Ok(())).unwrap();
        assert_eq!(registry.insert_with(None, |_| Ok(())), Err(Error::NoMemory));
    }

    #[test]
    fn failed_build_frees_the_slot() {
        let mut registry: Registry<QueueHandle, u8> = Registry::new(1);
        let failed = registry.insert_with(None, |_| Err(Error::Parameter("no")));
        assert!(failed.is_err());
        assert!(registry.is_empty());
        let h = registry.insert_with(None, |h| Ok(h.index() as u8)).unwrap();
        assert_eq!(registry.get(h), Some(&0));
    }

    #[test]
    fn static_objects_live_in_the_buffer() {
        let buffer: &'static mut StaticObject<u32> = Box::leak(Box::new(StaticObject::new()));
        let mut registry: Registry<QueueHandle, u32> = Registry::new(4);
        let h = registry.insert_with(Some(buffer), |_| Ok(7)).unwrap();
        *registry.get_mut(h).unwrap() += 1;
        let removed = registry.remove(h).unwrap();
        assert_eq!(removed.object, 8);
        assert!(removed.is_static);
    }
}
