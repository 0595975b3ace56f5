pub use log::debug;

/// Log a debug message, or print it to stderr regardless of log level when a local flag is set
///
/// The local flag lets a single cluster be traced without turning on debug logging for the whole
/// sample.
///
/// ```ignore
/// debug_msg!(false, "Cluster {} chains: {}", id, n); // debug log level only
/// debug_msg!(true, "Cluster {} chains: {}", id, n); // always printed to stderr
/// ```
macro_rules! debug_msg {
    ($flag:expr, $($arg:tt)+) => {
        if $flag {
            eprintln!($($arg)+);
        } else {
            $crate::log_utils::debug!($($arg)+);
        }
    }
}

pub(crate) use debug_msg;
