//! Type-safe logging macros using Code types with Display support
//!
//! Context values accept anything implementing `Display`. Every macro is a
//! no-op until a global logger has been installed.

// ============================================================================
// ERROR LOGGING
// ============================================================================

#[macro_export]
macro_rules! log_error {
    ($code:expr, $message:expr) => {
        $crate::logging::log_with_context(
            $crate::logging::LogLevel::Error, $code, $message, None, vec![],
        )
    };

    ($code:expr, $message:expr, span = $span:expr) => {
        $crate::logging::log_with_context(
            $crate::logging::LogLevel::Error, $code, $message, Some($span), vec![],
        )
    };

    ($code:expr, $message:expr, $($key:expr => $value:expr),+) => {
        {
            let context_strings: Vec<(&str, String)> = vec![$(($key, format!("{}", $value))),+];
            let context_refs: Vec<(&str, &str)> = context_strings.iter()
                .map(|(k, v)| (*k, v.as_str()))
                .collect();
            $crate::logging::log_with_context(
                $crate::logging::LogLevel::Error, $code, $message, None, context_refs,
            )
        }
    };

    ($code:expr, $message:expr, span = $span:expr, $($key:expr => $value:expr),+) => {
        {
            let context_strings: Vec<(&str, String)> = vec![$(($key, format!("{}", $value))),+];
            let context_refs: Vec<(&str, &str)> = context_strings.iter()
                .map(|(k, v)| (*k, v.as_str()))
                .collect();
            $crate::logging::log_with_context(
                $crate::logging::LogLevel::Error, $code, $message, Some($span), context_refs,
            )
        }
    };
}

// ============================================================================
// WARNING LOGGING
// ============================================================================

#[macro_export]
macro_rules! log_warning {
    ($code:expr, $message:expr) => {
        $crate::logging::log_with_context(
            $crate::logging::LogLevel::Warning, $code, $message, None, vec![],
        )
    };

    ($code:expr, $message:expr, $($key:expr => $value:expr),+) => {
        {
            let context_strings: Vec<(&str, String)> = vec![$(($key, format!("{}", $value))),+];
            let context_refs: Vec<(&str, &str)> = context_strings.iter()
                .map(|(k, v)| (*k, v.as_str()))
                .collect();
            $crate::logging::log_with_context(
                $crate::logging::LogLevel::Warning, $code, $message, None, context_refs,
            )
        }
    };
}

// ============================================================================
// SUCCESS / INFO LOGGING
// ============================================================================

#[macro_export]
macro_rules! log_success {
    ($code:expr, $message:expr) => {
        $crate::logging::log_with_context(
            $crate::logging::LogLevel::Info, $code, $message, None, vec![],
        )
    };

    ($code:expr, $message:expr, $($key:expr => $value:expr),+) => {
        {
            let context_strings: Vec<(&str, String)> = vec![$(($key, format!("{}", $value))),+];
            let context_refs: Vec<(&str, &str)> = context_strings.iter()
                .map(|(k, v)| (*k, v.as_str()))
                .collect();
            $crate::logging::log_with_context(
                $crate::logging::LogLevel::Info, $code, $message, None, context_refs,
            )
        }
    };
}

#[macro_export]
macro_rules! log_info {
    ($message:expr) => {
        $crate::logging::log_with_context(
            $crate::logging::LogLevel::Info,
            $crate::logging::Code::new("I000"),
            $message,
            None,
            vec![],
        )
    };

    ($message:expr, $($key:expr => $value:expr),+) => {
        {
            let context_strings: Vec<(&str, String)> = vec![$(($key, format!("{}", $value))),+];
            let context_refs: Vec<(&str, &str)> = context_strings.iter()
                .map(|(k, v)| (*k, v.as_str()))
                .collect();
            $crate::logging::log_with_context(
                $crate::logging::LogLevel::Info,
                $crate::logging::Code::new("I000"),
                $message,
                None,
                context_refs,
            )
        }
    };
}

// ============================================================================
// DEBUG LOGGING
// ============================================================================

/// Debug events skip formatting entirely unless debug output is enabled
#[macro_export]
macro_rules! log_debug {
    ($message:expr) => {
        {
            if $crate::logging::debug_enabled() {
                $crate::logging::log_with_context(
                    $crate::logging::LogLevel::Debug,
                    $crate::logging::Code::new("D000"),
                    $message,
                    None,
                    vec![],
                )
            }
        }
    };

    ($message:expr, $($key:expr => $value:expr),+) => {
        {
            if $crate::logging::debug_enabled() {
                let context_strings: Vec<(&str, String)> = vec![$(($key, format!("{}", $value))),+];
                let context_refs: Vec<(&str, &str)> = context_strings.iter()
                    .map(|(k, v)| (*k, v.as_str()))
                    .collect();
                $crate::logging::log_with_context(
                    $crate::logging::LogLevel::Debug,
                    $crate::logging::Code::new("D000"),
                    $message,
                    None,
                    context_refs,
                )
            }
        }
    };
}
