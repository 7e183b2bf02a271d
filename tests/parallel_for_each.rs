//! parallel_for_each semantics: iteration-order starts, full drain before
//! the composite resolves, single representative exception.

mod common;

use common::init_test_logging;
use conflux::{
    ignored_failure_count, later, parallel_for_each, runtime, sleep, Error,
};
use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

#[test]
fn sums_one_to_five_with_ready_actions() {
    init_test_logging();
    let sum = Rc::new(Cell::new(0));
    let s = Rc::clone(&sum);
    let done = parallel_for_each(1..=5, move |v| {
        s.set(s.get() + v);
        conflux::now()
    });
    assert!(done.available());
    assert!(done.get().is_ok());
    assert_eq!(sum.get(), 15);
}

#[test]
fn sums_one_to_five_with_suspending_actions() {
    init_test_logging();
    let sum = Rc::new(Cell::new(0));
    let s = Rc::clone(&sum);
    let done = parallel_for_each(1..=5, move |v| {
        let s = Rc::clone(&s);
        later().then(move |()| s.set(s.get() + v))
    });
    assert!(!done.available());
    runtime::run_until_idle();
    assert!(done.get().is_ok());
    assert_eq!(sum.get(), 15);
}

#[test]
fn failure_surfaces_only_after_the_slow_sibling_completes() {
    init_test_logging();
    let flag = Rc::new(Cell::new(false));
    let f = Rc::clone(&flag);
    let done = parallel_for_each(0..=1, move |i| {
        if i == 0 {
            let f = Rc::clone(&f);
            sleep(Duration::from_millis(300)).then(move |()| f.set(true))
        } else {
            later().then(|()| Err::<(), _>(Error::user("fiber 1 failed")))
        }
    });
    runtime::run_until_idle();
    // The failing fiber is already done; the slow one is still running and
    // the composite must keep waiting for it.
    assert!(!done.available());
    assert!(!flag.get());
    runtime::advance(Duration::from_millis(300));
    assert!(done.available());
    assert!(flag.get());
    assert!(done.get().is_err());
}

#[test]
fn one_exception_is_reported_when_several_fail() {
    init_test_logging();
    let before = ignored_failure_count();
    let done = parallel_for_each(0..4, |i| {
        later().then(move |()| {
            if i % 2 == 0 {
                Err(Error::user(format!("fiber {i}")))
            } else {
                Ok(())
            }
        })
    });
    runtime::run_until_idle();
    assert!(done.failed());
    let err = done.get().unwrap_err();
    assert!(err.context().is_some());
    assert_eq!(ignored_failure_count(), before);
}

#[test]
fn empty_range_resolves_immediately() {
    init_test_logging();
    let done = parallel_for_each(Vec::<u32>::new(), |_| conflux::now());
    assert!(done.available());
    assert!(done.get().is_ok());
}

#[test]
fn throwing_action_is_reified_not_propagated() {
    init_test_logging();
    let done = parallel_for_each(0..3, |i| -> () {
        assert!(i != 1, "action rejected element {i}");
    });
    runtime::run_until_idle();
    assert!(done.failed());
    let _ = done.get();
}
