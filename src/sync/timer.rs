//! Safe Timer wrapper
//!
//! Owns a kernel software timer and deletes it when dropped.
//! Callbacks run in the timer daemon, outside any critical section.

use crate::error::Result;
use crate::kernel::Kernel;
use crate::port::Port;
use crate::types::{TaskHandle, TickType, TimerHandle};

/// A software timer that executes a callback after a specified period.
///
/// Timers can be one-shot (fire once) or auto-reload (periodic).
///
/// # Example
///
/// ```ignore
/// use cmsis_freertos::sync::Timer;
///
/// let timer = Timer::new_periodic(&kernel, "blink", 1000, |_| {
///     log::info!("timer fired");
/// })?;
///
/// timer.start()?;
/// ```
pub struct Timer<'k, P: Port> {
    kernel: &'k Kernel<P>,
    handle: TimerHandle,
}

impl<'k, P: Port> Timer<'k, P> {
    /// Creates a new periodic (auto-reload) timer.
    ///
    /// The callback will be called every `period_ticks` ticks until stopped.
    pub fn new_periodic<F>(
        kernel: &'k Kernel<P>,
        name: &'static str,
        period_ticks: TickType,
        callback: F,
    ) -> Result<Self>
    where
        F: Fn(TimerHandle) + Send + Sync + 'static,
    {
        let handle = kernel.timer_create(Some(name), period_ticks, true, 0, callback)?;
        Ok(Self { kernel, handle })
    }

    /// Creates a new one-shot timer.
    ///
    /// The callback will be called once after `period_ticks`, then the timer
    /// stops. Call `start()` or `reset()` to fire again.
    pub fn new_oneshot<F>(
        kernel: &'k Kernel<P>,
        name: &'static str,
        period_ticks: TickType,
        callback: F,
    ) -> Result<Self>
    where
        F: Fn(TimerHandle) + Send + Sync + 'static,
    {
        let handle = kernel.timer_create(Some(name), period_ticks, false, 0, callback)?;
        Ok(Self { kernel, handle })
    }

    /// Starts the timer.
    pub fn start(&self) -> Result<()> {
        self.kernel.timer_start(self.handle, 0)
    }

    /// Starts the timer, allowing `ticks` to queue the command.
    pub fn start_timeout(&self, ticks: TickType) -> Result<()> {
        self.kernel.timer_start(self.handle, ticks)
    }

    /// Stops the timer.
    pub fn stop(&self) -> Result<()> {
        self.kernel.timer_stop(self.handle, 0)
    }

    /// Restarts the period from now; starts a stopped timer.
    pub fn reset(&self) -> Result<()> {
        self.kernel.timer_reset(self.handle, 0)
    }

    /// Changes the timer's period and (re)starts it.
    pub fn set_period(&self, new_period_ticks: TickType) -> Result<()> {
        self.kernel.timer_change_period(self.handle, new_period_ticks, 0)
    }

    pub fn is_active(&self) -> bool {
        self.kernel.timer_is_active(self.handle).unwrap_or(false)
    }

    /// Period in ticks.
    pub fn period(&self) -> Result<TickType> {
        self.kernel.timer_get_period(self.handle)
    }

    /// Tick count at which the timer will next expire.
    ///
    /// Only meaningful if the timer is active.
    pub fn expiry_time(&self) -> Result<TickType> {
        self.kernel.timer_get_expiry_time(self.handle)
    }

    pub fn handle(&self) -> TimerHandle {
        self.handle
    }

    /// Timer daemon task, once the scheduler has created it.
    pub fn daemon_task_handle(&self) -> Option<TaskHandle> {
        self.kernel.timer_get_daemon_task_handle()
    }
}

impl<P: Port> Drop for Timer<'_, P> {
    fn drop(&mut self) {
        if let Err(e) = self.kernel.timer_delete(self.handle, 0) {
            log::warn!("dropping {:?}: delete failed: {e}", self.handle);
        }
    }
}
