//! Property tests for the active lists and timer expiry arithmetic.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use cmsis_freertos::kernel::list::OrderedList;
use cmsis_freertos::port::HostPort;
use cmsis_freertos::{Kernel, KernelConfig, TickType};
use proptest::prelude::*;

// ── Ordered list ─────────────────────────────────────────────

proptest! {
    /// Whatever the insertion order, the list stays sorted by value and
    /// equal values keep their insertion order.
    #[test]
    fn list_stays_sorted_and_stable(values in proptest::collection::vec(0u32..16, 0..64)) {
        let mut list = OrderedList::new();
        for (i, v) in values.iter().enumerate() {
            list.insert(*v as TickType, i);
        }
        let entries: Vec<(TickType, usize)> = list.iter().copied().collect();
        prop_assert_eq!(entries.len(), values.len());
        for pair in entries.windows(2) {
            prop_assert!(pair[0].0 <= pair[1].0);
            if pair[0].0 == pair[1].0 {
                prop_assert!(pair[0].1 < pair[1].1, "equal values reordered");
            }
        }
    }

    /// Removing an item leaves every other item in place.
    #[test]
    fn list_remove_keeps_others(
        values in proptest::collection::vec(0u32..100, 1..32),
        pick in any::<prop::sample::Index>(),
    ) {
        let mut list = OrderedList::new();
        for (i, v) in values.iter().enumerate() {
            list.insert(*v as TickType, i);
        }
        let victim = pick.index(values.len());
        prop_assert!(list.remove(victim));
        prop_assert!(!list.contains(victim));
        prop_assert_eq!(list.len(), values.len() - 1);
    }
}

// ── Timer firing ─────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// A periodic timer fires once per whole period, wherever the tick
    /// count starts, including across the tick counter wrapping.
    #[test]
    fn periodic_timer_fires_once_per_period(
        period in 1u32..50,
        ticks in 0u32..400,
        start in prop_oneof![Just(0u32), Just(u32::MAX - 100), 0u32..1000],
    ) {
        let config = KernelConfig {
            initial_tick_count: start as TickType,
            ..KernelConfig::default()
        };
        let kernel = Kernel::new(HostPort::cortex_m4(), config).unwrap();
        kernel.start_scheduler().unwrap();

        let hits = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&hits);
        let t = kernel
            .timer_create(None, period as TickType, true, 0, move |_| {
                c.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        kernel.timer_start(t, 0).unwrap();
        kernel.advance(ticks);

        prop_assert_eq!(hits.load(Ordering::SeqCst), ticks / period);
    }

    /// A one-shot timer fires exactly once, no matter how late the ticks
    /// are processed.
    #[test]
    fn oneshot_fires_once_after_suspension(period in 1u32..50, late in 0u32..100) {
        let kernel = Kernel::new(HostPort::cortex_m4(), KernelConfig::default()).unwrap();
        kernel.start_scheduler().unwrap();

        let hits = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&hits);
        let t = kernel
            .timer_create(None, period as TickType, false, 0, move |_| {
                c.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        kernel.timer_start(t, 0).unwrap();
        kernel.suspend_all();
        kernel.advance(period + late);
        prop_assert_eq!(hits.load(Ordering::SeqCst), 0);
        kernel.resume_all();
        prop_assert_eq!(hits.load(Ordering::SeqCst), 1);
        prop_assert!(!kernel.timer_is_active(t).unwrap());
    }
}
