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

//! Scheduler State
//!
//! Tick counting, scheduler suspension and task records. Context switching
//! is reduced to a current-task marker: the only task whose execution the
//! kernel drives is the timer daemon, which runs inline, and the caller
//! names the task it is running as.

use alloc::vec::Vec;

use crate::error::{Error, Result};
use crate::trace::TraceHooks;
use crate::types::{tick_word, TaskHandle, TickType};

// =============================================================================
// Scheduler state
// =============================================================================

/// `xTaskGetSchedulerState()`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    NotStarted,
    Running,
    Suspended,
}

/// Task control block, reduced to what the kernel reports.
#[derive(Debug, Clone)]
pub struct TaskRecord {
    pub name: &'static str,
    pub priority: u32,
    pub stack_depth: usize,
}

#[derive(Debug)]
pub struct Scheduler {
    started: bool,
    suspended: u32,
    tick_count: TickType,
    pended_ticks: TickType,
    max_priorities: u32,
    tasks: Vec<TaskRecord>,
    current: Option<TaskHandle>,
}

impl Scheduler {
    pub fn new(initial_tick_count: TickType, max_priorities: u32) -> Self {
        Self {
            started: false,
            suspended: 0,
            tick_count: initial_tick_count,
            pended_ticks: 0,
            max_priorities,
            tasks: Vec::new(),
            current: None,
        }
    }

    pub fn state(&self) -> SchedulerState {
        if !self.started {
            SchedulerState::NotStarted
        } else if self.suspended > 0 {
            SchedulerState::Suspended
        } else {
            SchedulerState::Running
        }
    }

    /// `xTaskGetSchedulerState() == taskSCHEDULER_RUNNING`
    pub fn is_running(&self) -> bool {
        self.state() == SchedulerState::Running
    }

    pub fn start(&mut self) {
        self.started = true;
    }

    pub fn tick_count(&self) -> TickType {
        self.tick_count
    }

    pub fn pended_ticks(&self) -> TickType {
        self.pended_ticks
    }

    pub fn suspension_depth(&self) -> u32 {
        self.suspended
    }

    // =========================================================================
    // Suspension
    // =========================================================================

    /// `vTaskSuspendAll()`
    pub fn suspend_all(&mut self) {
        self.suspended += 1;
    }

    /// `xTaskResumeAll()`
    ///
    /// Undoes one level of suspension. When the last level goes, the ticks
    /// that arrived meanwhile are replayed. Returns `true` if the scheduler
    /// is no longer suspended; resuming an unsuspended scheduler does
    /// nothing and returns `false`.
    pub fn resume_all(&mut self, trace: &dyn TraceHooks) -> bool {
        if self.suspended == 0 {
            log::warn!("resume_all called without a matching suspend_all");
            return false;
        }
        self.suspended -= 1;
        if self.suspended > 0 {
            return false;
        }
        while self.pended_ticks > 0 {
            self.increment_tick(trace);
            self.pended_ticks -= 1;
        }
        true
    }

    // =========================================================================
    // Ticks
    // =========================================================================

    /// `xTaskIncrementTick()`
    ///
    /// While suspended, the tick is pended instead. Returns whether the tick
    /// count advanced.
    pub fn increment_tick(&mut self, trace: &dyn TraceHooks) -> bool {
        if self.suspended > 0 {
            self.pended_ticks = self.pended_ticks.wrapping_add(1);
            return false;
        }
        trace.task_increment_tick(tick_word(self.tick_count));
        self.tick_count = self.tick_count.wrapping_add(1);
        if self.tick_count == 0 {
            log::debug!("tick count overflowed");
        }
        true
    }

    // =========================================================================
    // Tasks
    // =========================================================================

    /// Registers a task record.
    pub fn create_task(
        &mut self,
        name: &'static str,
        priority: u32,
        stack_depth: usize,
        trace: &dyn TraceHooks,
    ) -> Result<TaskHandle> {
        if priority >= self.max_priorities || stack_depth == 0 {
            trace.task_create_failed();
            return Err(Error::Parameter("task priority or stack depth out of range"));
        }
        let Ok(index) = u16::try_from(self.tasks.len()) else {
            trace.task_create_failed();
            return Err(Error::NoMemory);
        };
        if self.tasks.try_reserve(1).is_err() {
            trace.task_create_failed();
            return Err(Error::NoMemory);
        }
        self.tasks.push(TaskRecord {
            name,
            priority,
            stack_depth,
        });
        let handle = TaskHandle::new(index);
        trace.task_create(handle.raw());
        Ok(handle)
    }

    pub fn task(&self, handle: TaskHandle) -> Option<&TaskRecord> {
        self.tasks.get(handle.index())
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// `xTaskGetCurrentTaskHandle()`
    pub fn current_task(&self) -> Option<TaskHandle> {
        self.current
    }

    /// Switches the current task; returns the previous one.
    pub fn switch_to(&mut self, task: Option<TaskHandle>) -> Option<TaskHandle> {
        core::mem::replace(&mut self.current, task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::NoTrace;

    #[test]
    fn lifecycle_states() {
        let mut s = Scheduler::new(0, 8);
        assert_eq!(s.state(), SchedulerState::NotStarted);
        s.start();
        assert_eq!(s.state(), SchedulerState::Running);
        s.suspend_all();
        assert_eq!(s.state(), SchedulerState::Suspended);
        assert!(s.resume_all(&NoTrace));
        assert!(s.is_running());
    }

    #[test]
    fn ticks_pend_while_suspended() {
        let mut s = Scheduler::new(0, 8);
        s.start();
        s.suspend_all();
        s.suspend_all();
        assert!(!s.increment_tick(&NoTrace));
        assert!(!s.increment_tick(&NoTrace));
        assert_eq!(s.tick_count(), 0);
        assert_eq!(s.pended_ticks(), 2);
        assert!(!s.resume_all(&NoTrace));
        assert_eq!(s.tick_count(), 0);
        assert!(s.resume_all(&NoTrace));
        assert_eq!(s.tick_count(), 2);
        assert_eq!(s.pended_ticks(), 0);
    }

    #[test]
    fn resume_without_suspend_is_harmless() {
        let mut s = Scheduler::new(0, 8);
        s.start();
        assert!(!s.resume_all(&NoTrace));
        assert!(s.is_running());
    }

    #[test]
    fn tick_count_wraps() {
        let mut s = Scheduler::new(TickType::MAX, 8);
        s.start();
        s.increment_tick(&NoTrace);
        assert_eq!(s.tick_count(), 0);
    }

    #[test]
    fn task_priority_is_bounded() {
        let mut s = Scheduler::new(0, 8);
        assert!(s.create_task("hi", 8, 64, &NoTrace).is_err());
        let h = s.create_task("ok", 7, 64, &NoTrace).unwrap();
        assert_eq!(s.task(h).map(|t| t.name), Some("ok"));
        assert_eq!(s.task_count(), 1);
    }

    #[test]
    fn switch_reports_the_previous_task() {
        let mut s = Scheduler::new(0, 8);
        let a = s.create_task("a", 1, 64, &NoTrace).unwrap();
        let b = s.create_task("b", 1, 64, &NoTrace).unwrap();
        assert_eq!(s.switch_to(Some(a)), None);
        assert_eq!(s.switch_to(Some(b)), Some(a));
        assert_eq!(s.current_task(), Some(b));
    }
}
