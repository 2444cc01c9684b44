//! Category D: property tests for the context mutators.

use proptest::prelude::*;

use crate::config::RunloopConfig;
use crate::output::NullOutput;
use crate::work::RunloopContext;

fn context() -> RunloopContext {
    RunloopContext::new(RunloopConfig::new("test"), Box::new(NullOutput))
}

proptest! {
    /// Timeouts representable in microseconds round-trip exactly.
    #[test]
    fn timeout_round_trip(micros in 0u64..1_000_000_000_000) {
        let seconds = micros as f64 / 1_000_000.0;
        let mut ctx = context();
        prop_assert!(ctx.set_timeout(seconds).is_ok());
        prop_assert_eq!(ctx.timeout(), seconds);
        prop_assert_eq!(ctx.timeout_duration().as_micros(), u128::from(micros));
    }

    /// Every negative timeout is rejected and leaves the old value.
    #[test]
    fn negative_timeout_rejected(seconds in -1.0e9f64..-1.0e-9) {
        let mut ctx = context();
        let err = ctx.set_timeout(seconds).unwrap_err();
        prop_assert!(err.is_config());
        prop_assert_eq!(ctx.timeout(), 5.0);
    }

    /// Every non-negative return code round-trips.
    #[test]
    fn return_code_round_trip(code in 0i32..=i32::MAX) {
        let mut ctx = context();
        prop_assert!(ctx.set_return_code(code).is_ok());
        prop_assert_eq!(ctx.return_code(), code);
    }

    /// Every negative return code is rejected and leaves the old value.
    #[test]
    fn negative_return_code_rejected(code in i32::MIN..0) {
        let mut ctx = context();
        prop_assert!(ctx.set_return_code(code).unwrap_err().is_config());
        prop_assert_eq!(ctx.return_code(), 0);
    }
}

#[test]
fn timeout_boundaries() {
    let mut ctx = context();
    assert!(ctx.set_timeout(-0.0).is_err());
    assert!(ctx.set_timeout(-1.0).is_err());
    assert!(ctx.set_timeout(-0.5).is_err());
    assert!(ctx.set_timeout(f64::NAN).is_err());
    assert!(ctx.set_timeout(0.0).is_ok());
    assert_eq!(ctx.timeout(), 0.0);
    for seconds in [0.5, 1.0, 1.5, 5.0] {
        ctx.set_timeout(seconds).unwrap();
        assert_eq!(ctx.timeout(), seconds);
    }
}

#[test]
fn return_code_resets_to_zero() {
    let mut ctx = context();
    assert_eq!(ctx.return_code(), 0);
    ctx.set_return_code(9).unwrap();
    assert_eq!(ctx.return_code(), 9);
    ctx.set_return_code(0).unwrap();
    assert_eq!(ctx.return_code(), 0);
    assert!(ctx.set_return_code(-1).is_err());
    assert_eq!(ctx.return_code(), 0);
}
