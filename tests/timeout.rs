//! with_timeout under the virtual clock: firing, cancellation, detach
//! semantics, custom exception factories.

mod common;

use common::init_test_logging;
use conflux::runtime::{self, current_time};
use conflux::{
    ignored_failure_count, make_ready_future, sleep, with_timeout, with_timeout_factory, Error,
    Promise, TimedOutError, TimeoutExceptionFactory,
};
use std::time::Duration;

#[test]
fn times_out_when_the_promise_is_never_set() {
    init_test_logging();
    let mut pr: Promise<i32> = Promise::new();
    let done = with_timeout(current_time() + Duration::from_secs(2), pr.get_future());
    runtime::advance(Duration::from_secs(1));
    assert!(!done.available());
    runtime::advance(Duration::from_secs(1));
    assert!(done.available());
    let err = done.get().unwrap_err();
    assert!(err.is_timed_out());
    assert!(err.downcast_ref::<TimedOutError>().is_some());
    // Setting the promise afterwards must not crash, and the late result
    // is observed rather than leaked.
    let before = ignored_failure_count();
    pr.set_value(42);
    runtime::run_until_idle();
    assert_eq!(ignored_failure_count(), before);
}

#[test]
fn late_failure_after_timeout_is_discarded_quietly() {
    init_test_logging();
    let mut pr: Promise<i32> = Promise::new();
    let done = with_timeout(current_time() + Duration::from_secs(1), pr.get_future());
    runtime::advance(Duration::from_secs(1));
    assert!(done.get().is_err());
    let before = ignored_failure_count();
    pr.set_exception(Error::user("too late to matter"));
    runtime::run_until_idle();
    assert_eq!(ignored_failure_count(), before);
}

#[test]
fn completion_before_the_deadline_wins() {
    init_test_logging();
    let mut pr = Promise::new();
    let done = with_timeout(current_time() + Duration::from_secs(2), pr.get_future());
    pr.set_value(42);
    runtime::run_until_idle();
    assert_eq!(done.get().ok(), Some(42));
    // The timer must not fire after losing the race.
    runtime::advance(Duration::from_secs(3));
}

#[test]
fn available_input_short_circuits() {
    init_test_logging();
    let done = with_timeout(current_time() + Duration::from_secs(1), make_ready_future(7));
    assert!(done.available());
    assert_eq!(done.get().ok(), Some(7));
}

#[test]
fn custom_exception_factory_is_used() {
    init_test_logging();

    struct MyFactory;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
    #[error("my exception")]
    struct MyException;

    impl TimeoutExceptionFactory for MyFactory {
        fn timeout() -> Error {
            Error::user("my exception").with_source(MyException)
        }
    }

    let mut pr: Promise<i32> = Promise::new();
    let done =
        with_timeout_factory::<MyFactory, _>(current_time() + Duration::from_secs(1), pr.get_future());
    runtime::advance(Duration::from_secs(1));
    let err = done.get().unwrap_err();
    assert!(err.downcast_ref::<MyException>().is_some());
    assert!(err.downcast_ref::<TimedOutError>().is_none());
    drop(pr);
    runtime::run_until_idle();
}

#[test]
fn sleep_wakes_after_the_requested_duration() {
    init_test_logging();
    let done = sleep(Duration::from_millis(300));
    runtime::advance(Duration::from_millis(299));
    assert!(!done.available());
    runtime::advance(Duration::from_millis(1));
    assert!(done.get().is_ok());
}

#[test]
fn timeout_composes_with_sleep() {
    init_test_logging();
    // A sleep shorter than the deadline completes normally.
    let done = with_timeout(
        current_time() + Duration::from_secs(1),
        sleep(Duration::from_millis(100)),
    );
    runtime::advance(Duration::from_millis(100));
    assert!(done.get().is_ok());

    // A sleep longer than the deadline times out, and the sleeper still
    // finishes in the background.
    let done = with_timeout(
        current_time() + Duration::from_millis(50),
        sleep(Duration::from_secs(1)),
    );
    runtime::advance(Duration::from_millis(50));
    assert!(done.get().unwrap_err().is_timed_out());
    runtime::advance(Duration::from_secs(1));
}
