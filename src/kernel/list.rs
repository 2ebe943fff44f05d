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

//! Ordered Lists
//!
//! Lists of `(item value, owner)` pairs kept in ascending item value order,
//! the way the kernel keeps its delayed and active-timer lists.
//!
//! ## Functions
//!
//! - [`OrderedList::insert`] - Insert in sorted order, after equal values
//! - [`OrderedList::remove`] - Remove an owner's item
//! - [`OrderedList::head`] - Item with the lowest value

use alloc::vec::Vec;

use crate::types::TickType;

/// An ascending list of `(value, owner)` items.
///
/// Items with equal values stay in insertion order, so two timers that
/// expire on the same tick fire in the order they were started.
#[derive(Debug, Clone)]
pub struct OrderedList<T> {
    items: Vec<(TickType, T)>,
}

impl<T> Default for OrderedList<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Copy + PartialEq> OrderedList<T> {
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Inserts `owner` with item value `value`.
    ///
    /// The new item goes after every item whose value is less than or equal
    /// to `value`.
    pub fn insert(&mut self, value: TickType, owner: T) {
        let position = self.items.partition_point(|(v, _)| *v <= value);
        self.items.insert(position, (value, owner));
    }

    /// Removes the item owned by `owner`. Returns whether one was present.
    pub fn remove(&mut self, owner: T) -> bool {
        match self.items.iter().position(|(_, o)| *o == owner) {
            Some(index) => {
                self.items.remove(index);
                true
            }
            None => false,
        }
    }

    /// Item with the lowest value.
    pub fn head(&self) -> Option<(TickType, T)> {
        self.items.first().copied()
    }

    /// Removes and returns the item with the lowest value.
    pub fn pop_head(&mut self) -> Option<(TickType, T)> {
        if self.items.is_empty() {
            None
        } else {
            Some(self.items.remove(0))
        }
    }

    pub fn contains(&self, owner: T) -> bool {
        self.items.iter().any(|(_, o)| *o == owner)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Items in list order.
    pub fn iter(&self) -> impl Iterator<Item = &(TickType, T)> + '_ {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inserts_in_ascending_order() {
        let mut list = OrderedList::new();
        list.insert(30, 'c');
        list.insert(10, 'a');
        list.insert(20, 'b');
        let order: Vec<char> = list.iter().map(|(_, o)| *o).collect();
        assert_eq!(order, ['a', 'b', 'c']);
        assert_eq!(list.head(), Some((10, 'a')));
    }

    #[test]
    fn equal_values_keep_arrival_order() {
        let mut list = OrderedList::new();
        list.insert(5, 1);
        list.insert(5, 2);
        list.insert(4, 0);
        list.insert(5, 3);
        let order: Vec<i32> = list.iter().map(|(_, o)| *o).collect();
        assert_eq!(order, [0, 1, 2, 3]);
    }

    #[test]
    fn remove_and_pop() {
        let mut list = OrderedList::new();
        list.insert(1, 'x');
        list.insert(2, 'y');
        assert!(list.remove('x'));
        assert!(!list.remove('x'));
        assert!(list.contains('y'));
        assert_eq!(list.pop_head(), Some((2, 'y')));
        assert!(list.is_empty());
        assert_eq!(list.pop_head(), None);
    }
}
