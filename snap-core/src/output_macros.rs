//! Output macros for user-facing CLI text.
//!
//! Operator logs go through `tracing`; these are for the command's own
//! report on stdout/stderr.

#[macro_export]
macro_rules! snap_println {
    () => {
        println!();
    };
    ($($arg:tt)*) => {
        println!("{}", format!($($arg)*));
    }
}

#[macro_export]
macro_rules! snap_error {
    ($($arg:tt)*) => {
        eprintln!("{}", format!($($arg)*));
    }
}

#[macro_export]
macro_rules! snap_success {
    ($($arg:tt)*) => {
        eprintln!("✓ {}", format!($($arg)*));
    };
}

#[macro_export]
macro_rules! snap_warning {
    ($($arg:tt)*) => {
        eprintln!("⚠ {}", format!($($arg)*));
    };
}
