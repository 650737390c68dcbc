//! # Logging Utilities
//!
//! Rate-limited logging for events raised from interrupt context (CRC failures,
//! FIFO overflows) and hex frame dumps for protocol debugging.
//!
//! ## Usage
//!
//! ```rust
//! use cc2500_rs::util::logging::{LogThrottle, log_frame_hex};
//!
//! let mut throttle = LogThrottle::new(1000, 5); // 5 messages per second
//! if throttle.allow() {
//!     log::warn!("CRC error detected");
//! }
//!
//! log_frame_hex("RX frame", &[0x03, 0x01, 0x02, 0x03]);
//! ```

use std::time::Instant;

/// Throttling structure for rate-limiting log messages
///
/// A node sitting in a noisy channel can see a CRC failure on every
/// interrupt; this keeps the log readable.
#[derive(Debug)]
pub struct LogThrottle {
    /// Time window for throttling (in milliseconds)
    window_ms: u64,
    /// Maximum messages allowed per window
    cap: u32,
    /// Current message count in window
    count: u32,
    /// Start time of current window
    t0: Instant,
}

impl LogThrottle {
    /// Create new throttle with time window and message cap
    pub fn new(window_ms: u64, cap: u32) -> Self {
        Self {
            window_ms,
            cap,
            count: 0,
            t0: Instant::now(),
        }
    }

    /// Check if logging is allowed (resets counter after window expires)
    pub fn allow(&mut self) -> bool {
        let now = Instant::now();
        let elapsed_ms = now.duration_since(self.t0).as_millis() as u64;

        if elapsed_ms > self.window_ms {
            self.t0 = now;
            self.count = 0;
        }

        self.count = self.count.saturating_add(1);
        self.count <= self.cap
    }

    /// Messages suppressed in the current window
    pub fn suppressed(&self) -> u32 {
        self.count.saturating_sub(self.cap)
    }

    /// Reset the throttle (start new window immediately)
    pub fn reset(&mut self) {
        self.t0 = Instant::now();
        self.count = 0;
    }
}

/// Log frame data in hex format for debugging
pub fn log_frame_hex(prefix: &str, data: &[u8]) {
    const MAX_LOG_BYTES: usize = 64;

    if !log::log_enabled!(log::Level::Debug) {
        return;
    }

    let shown = &data[..data.len().min(MAX_LOG_BYTES)];
    let hex_str = crate::util::hex::format_hex_compact(shown);
    let suffix = if data.len() > MAX_LOG_BYTES {
        format!(" ... ({} bytes total)", data.len())
    } else {
        String::new()
    };

    log::debug!(target: "cc2500::frame", "{prefix}: {hex_str}{suffix}");
}

/// Enter a tracing span covering receive interrupt handling
#[cfg(feature = "tracing")]
pub fn span_rx_interrupt(armed: bool) -> tracing::span::EnteredSpan {
    tracing::debug_span!("rx_interrupt", armed = armed).entered()
}

#[cfg(not(feature = "tracing"))]
pub fn span_rx_interrupt(_armed: bool) {}

/// Enter a tracing span covering a blocking transmit
#[cfg(feature = "tracing")]
pub fn span_transmit(len: usize) -> tracing::span::EnteredSpan {
    tracing::debug_span!("transmit", len = len).entered()
}

#[cfg(not(feature = "tracing"))]
pub fn span_transmit(_len: usize) {}

/// Log a warning with throttling
#[macro_export]
macro_rules! log_warn_throttled {
    ($throttle:expr, $($arg:tt)*) => {
        if $throttle.allow() {
            log::warn!($($arg)*);
        }
    };
}
