//! End-to-end tests of the timer service through the kernel facade.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use cmsis_freertos::kernel::timers::{StaticTimer, TimerCommand};
use cmsis_freertos::port::HostPort;
use cmsis_freertos::{DaemonMode, Error, Kernel, KernelConfig, TickType, TimerHandle};
use static_cell::StaticCell;

fn started(config: KernelConfig) -> Kernel<HostPort> {
    let kernel = Kernel::new(HostPort::cortex_m4(), config).unwrap();
    kernel.start_scheduler().unwrap();
    kernel
}

fn counter() -> (Arc<AtomicU32>, impl Fn(TimerHandle) + Send + Sync + 'static) {
    let hits = Arc::new(AtomicU32::new(0));
    let c = Arc::clone(&hits);
    (hits, move |_| {
        c.fetch_add(1, Ordering::SeqCst);
    })
}

#[test]
fn periodic_timer_keeps_its_phase() {
    let kernel = started(KernelConfig::default());
    let fired_at = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&fired_at);
    let tick_source = Arc::new(AtomicU32::new(0));
    let ticks = Arc::clone(&tick_source);
    let t = kernel
        .timer_create(Some("phase"), 7, true, 0, move |_| {
            log.lock().unwrap().push(ticks.load(Ordering::SeqCst));
        })
        .unwrap();
    kernel.timer_start(t, 0).unwrap();
    for _ in 0..30 {
        kernel.tick();
        tick_source.store(kernel.tick_count() as u32, Ordering::SeqCst);
    }
    // The callback sees the tick stored after the previous tick.
    assert_eq!(*fired_at.lock().unwrap(), vec![6, 13, 20, 27]);
    assert_eq!(kernel.timer_get_expiry_time(t).unwrap(), 35);
}

#[test]
fn reset_pushes_the_expiry_out() {
    let kernel = started(KernelConfig::default());
    let (hits, cb) = counter();
    let t = kernel.timer_create(Some("watchdog"), 10, false, 0, cb).unwrap();
    kernel.timer_start(t, 0).unwrap();
    for _ in 0..5 {
        kernel.advance(8);
        kernel.timer_reset(t, 0).unwrap();
    }
    assert_eq!(hits.load(Ordering::SeqCst), 0);
    assert_eq!(kernel.timer_get_expiry_time(t).unwrap(), 50);
    kernel.advance(10);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn missed_periods_are_caught_up_while_suspended() {
    let kernel = started(KernelConfig::default());
    let (hits, cb) = counter();
    let t = kernel.timer_create(Some("fast"), 3, true, 0, cb).unwrap();
    kernel.timer_start(t, 0).unwrap();

    kernel.suspend_all();
    kernel.advance(10);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
    assert!(kernel.resume_all());
    // Expiries at 3, 6 and 9 all fall into the resumed window.
    assert_eq!(hits.load(Ordering::SeqCst), 3);
    assert_eq!(kernel.timer_get_expiry_time(t).unwrap(), 12);
}

#[test]
fn tick_count_overflow_switches_lists() {
    let config = KernelConfig {
        initial_tick_count: TickType::MAX - 4,
        ..KernelConfig::default()
    };
    let kernel = started(config);
    let (hits, cb) = counter();
    let t = kernel.timer_create(Some("wrap"), 10, true, 0, cb).unwrap();
    kernel.timer_start(t, 0).unwrap();
    assert_eq!(kernel.timer_get_expiry_time(t).unwrap(), 5);

    kernel.advance(9);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
    kernel.advance(1);
    assert_eq!(kernel.tick_count(), 5);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    kernel.advance(10);
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[test]
fn isr_commands_are_checked_for_context() {
    let kernel = started(KernelConfig {
        daemon_mode: DaemonMode::Deferred,
        ..KernelConfig::default()
    });
    let (hits, cb) = counter();
    let t = kernel.timer_create(None, 2, false, 0, cb).unwrap();

    assert_eq!(
        kernel.timer_generic_command_from_task(t, TimerCommand::StartFromIsr, 0, 0),
        Err(Error::WrongContext)
    );
    assert_eq!(
        kernel.timer_generic_command_from_isr(t, TimerCommand::Start, 0),
        Err(Error::WrongContext)
    );

    let woken = {
        let _isr = kernel.port().enter_isr();
        kernel.timer_start_from_isr(t).unwrap()
    };
    assert!(woken);
    assert_eq!(kernel.pending_timer_commands(), 1);
    kernel.advance(2);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn full_command_queue_rejects_sends() {
    let kernel = started(KernelConfig {
        daemon_mode: DaemonMode::Deferred,
        timer_queue_length: 2,
        ..KernelConfig::default()
    });
    let (_hits, cb) = counter();
    let t = kernel.timer_create(None, 5, true, 0, cb).unwrap();
    kernel.timer_start(t, 0).unwrap();
    kernel.timer_stop(t, 0).unwrap();
    assert_eq!(kernel.timer_reset(t, 100), Err(Error::QueueFull));
    assert_eq!(kernel.run_timer_service(), 0);
    assert_eq!(kernel.pending_timer_commands(), 0);
    assert!(!kernel.timer_is_active(t).unwrap());
    assert!(kernel.timer_reset(t, 0).is_ok());
}

#[test]
fn static_timer_is_released_on_delete() {
    static BUFFER: StaticCell<StaticTimer> = StaticCell::new();
    let buffer: &'static mut StaticTimer = BUFFER.init(StaticTimer::new());

    let kernel = started(KernelConfig::default());
    let (hits, cb) = counter();
    let t = kernel
        .timer_create_static(Some("static"), 4, false, 11, cb, buffer)
        .unwrap();
    assert!(kernel.timer_get_static_buffer(t).unwrap());
    assert_eq!(kernel.timer_get_id(t).unwrap(), 11);
    kernel.timer_start(t, 0).unwrap();
    kernel.advance(4);
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    kernel.timer_delete(t, 0).unwrap();
    assert_eq!(kernel.timer_get_period(t), Err(Error::InvalidHandle));
    assert_eq!(kernel.timer_count(), 0);
}

#[test]
fn allocation_limit_applies_to_dynamic_timers() {
    let kernel = started(KernelConfig {
        max_timers: 2,
        ..KernelConfig::default()
    });
    let a = kernel.timer_create(None, 1, false, 0, |_| {}).unwrap();
    let _b = kernel.timer_create(None, 1, false, 0, |_| {}).unwrap();
    assert_eq!(
        kernel.timer_create(None, 1, false, 0, |_| {}).err(),
        Some(Error::NoMemory)
    );
    kernel.timer_delete(a, 0).unwrap();
    assert!(kernel.timer_create(None, 1, false, 0, |_| {}).is_ok());
}

#[test]
fn concurrent_starts_never_strand_a_command() {
    let kernel = started(KernelConfig {
        timer_queue_length: 64,
        ..KernelConfig::default()
    });
    let timers: Vec<TimerHandle> = (0..8)
        .map(|_| kernel.timer_create(None, 1_000, false, 0, |_| {}).unwrap())
        .collect();

    for _ in 0..50 {
        std::thread::scope(|s| {
            for &t in &timers {
                let kernel = &kernel;
                s.spawn(move || {
                    kernel.timer_stop(t, 0).unwrap();
                    kernel.timer_start(t, 0).unwrap();
                });
            }
        });
        // Every caller returned, so some daemon pass must have drained the
        // queue after the last post.
        assert_eq!(kernel.pending_timer_commands(), 0);
        for &t in &timers {
            assert!(kernel.timer_is_active(t).unwrap());
        }
    }
}
