//! Assertion helpers for results carrying workspace errors.

/// Asserts that a result is `Ok` and unwraps it.
#[macro_export]
macro_rules! assert_ok {
    ($expr:expr) => {
        match $expr {
            Ok(val) => val,
            Err(err) => panic!("Expected Ok, got Err: {:?}", err),
        }
    };
    ($expr:expr, $($arg:tt)+) => {
        match $expr {
            Ok(val) => val,
            Err(err) => panic!("Expected Ok, got Err: {:?} ({})", err, format!($($arg)+)),
        }
    };
}

/// Asserts that a result is `Err` and returns the error.
#[macro_export]
macro_rules! assert_err {
    ($expr:expr) => {
        match $expr {
            Ok(val) => panic!("Expected Err, got Ok: {:?}", val),
            Err(err) => err,
        }
    };
}

/// Asserts that a `TxResult` failed with the given error code.
#[macro_export]
macro_rules! assert_tx_code {
    ($result:expr, $code:expr) => {{
        let result = &$result;
        assert_eq!(
            result.code, $code,
            "unexpected tx result: {} ({})",
            result.code, result.log
        );
    }};
}
