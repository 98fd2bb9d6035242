//! Tests for Context deadlines and cancellation

use std::thread;
use std::time::{Duration, Instant};

use routekv::{Context, Error};

#[test]
fn test_background_never_expires() {
    let ctx = Context::background();

    assert!(ctx.check().is_ok());
    assert_eq!(ctx.deadline(), None);
    assert_eq!(ctx.remaining(), None);
}

#[test]
fn test_cancel_reaches_clones() {
    let ctx = Context::with_timeout(Duration::from_secs(60));
    let clone = ctx.clone();

    clone.cancel();

    assert!(ctx.is_cancelled());
    assert!(matches!(ctx.check(), Err(Error::Cancelled)));
}

#[test]
fn test_deadline_expires() {
    let ctx = Context::with_timeout(Duration::from_millis(20));
    assert!(ctx.check().is_ok());
    assert!(ctx.remaining().unwrap() <= Duration::from_millis(20));

    thread::sleep(Duration::from_millis(30));

    assert!(matches!(ctx.check(), Err(Error::DeadlineExceeded)));
    assert_eq!(ctx.remaining(), Some(Duration::ZERO));
}

#[test]
fn test_cancellation_wins_over_deadline() {
    let ctx = Context::with_deadline(Instant::now());
    ctx.cancel();

    assert!(matches!(ctx.check(), Err(Error::Cancelled)));
}
