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

//! Host Port
//!
//! Simulates the core registers the kernel inspects, so interrupt context,
//! masking and the tick timer can be driven from tests and host demos.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use super::{IrqMaskModel, Port, ARM_MODE_IRQ};

/// Exception number used for simulated interrupts (SysTick).
const SIMULATED_EXCEPTION: u32 = 15;

/// Port with atomically simulated registers.
#[derive(Debug)]
pub struct HostPort {
    model: IrqMaskModel,
    irq_mode: AtomicU32,
    primask: AtomicU32,
    basepri: AtomicU32,
    timer_period: AtomicU32,
    timer_value: AtomicU32,
    timer_overflow: AtomicBool,
}

impl HostPort {
    /// Creates a port with the given masking model, thread mode and
    /// interrupts enabled.
    ///
    /// The tick timer reload value is `cpu_clock_hz / tick_rate_hz - 1`, the
    /// same value SysTick would be programmed with.
    pub const fn new(model: IrqMaskModel, cpu_clock_hz: u32, tick_rate_hz: u32) -> Self {
        let period = if tick_rate_hz == 0 {
            0
        } else {
            (cpu_clock_hz / tick_rate_hz).saturating_sub(1)
        };
        Self {
            model,
            irq_mode: AtomicU32::new(0),
            primask: AtomicU32::new(0),
            basepri: AtomicU32::new(0),
            timer_period: AtomicU32::new(period),
            timer_value: AtomicU32::new(period),
            timer_overflow: AtomicBool::new(false),
        }
    }

    /// ARMv7-M port at 80 MHz with a 1 kHz tick.
    pub const fn cortex_m4() -> Self {
        Self::new(IrqMaskModel::ArmV7M, 80_000_000, 1000)
    }

    /// Enters simulated interrupt context until the guard drops.
    pub fn enter_isr(&self) -> IsrGuard<'_> {
        let value = match self.model {
            IrqMaskModel::ArmV7A => ARM_MODE_IRQ,
            _ => SIMULATED_EXCEPTION,
        };
        let previous = self.irq_mode.swap(value, Ordering::SeqCst);
        IsrGuard {
            port: self,
            previous,
        }
    }

    pub fn set_primask(&self, value: u32) {
        self.primask.store(value, Ordering::SeqCst);
    }

    pub fn set_basepri(&self, value: u32) {
        self.basepri.store(value, Ordering::SeqCst);
    }

    pub fn set_irq_mode(&self, value: u32) {
        self.irq_mode.store(value, Ordering::SeqCst);
    }

    /// Sets the down-counter value and the pending-overflow flag.
    pub fn set_tick_timer(&self, value: u32, overflow: bool) {
        self.timer_value.store(value, Ordering::SeqCst);
        self.timer_overflow.store(overflow, Ordering::SeqCst);
    }
}

impl Port for HostPort {
    fn mask_model(&self) -> IrqMaskModel {
        self.model
    }

    fn irq_mode(&self) -> u32 {
        self.irq_mode.load(Ordering::SeqCst)
    }

    fn primask(&self) -> u32 {
        self.primask.load(Ordering::SeqCst)
    }

    fn basepri(&self) -> u32 {
        self.basepri.load(Ordering::SeqCst)
    }

    fn tick_timer_period(&self) -> u32 {
        self.timer_period.load(Ordering::SeqCst)
    }

    fn tick_timer_value(&self) -> u32 {
        self.timer_value.load(Ordering::SeqCst)
    }

    fn tick_timer_overflow(&self) -> bool {
        self.timer_overflow.load(Ordering::SeqCst)
    }
}

/// Leaves simulated interrupt context on drop.
#[must_use = "interrupt context ends when the guard is dropped"]
pub struct IsrGuard<'a> {
    port: &'a HostPort,
    previous: u32,
}

impl Drop for IsrGuard<'_> {
    fn drop(&mut self) {
        self.port.irq_mode.store(self.previous, Ordering::SeqCst);
    }
}
