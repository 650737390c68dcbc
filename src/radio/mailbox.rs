//! # Receive Mailbox
//!
//! Hand-off of received frames from interrupt context to the foreground.
//!
//! The receive callback runs inside the GDO0 interrupt. It posts the frame
//! here; the main loop polls [`RxMailbox::take`] and re-arms the receiver.
//! Access is guarded by `critical_section`, so the mailbox can live in a
//! `static` on a single-core target or behind an `Arc` on a host.
//!
//! ```rust
//! use cc2500_rs::radio::mailbox::{ReceivedFrame, RxMailbox};
//!
//! static MAILBOX: RxMailbox = RxMailbox::new();
//!
//! MAILBOX.post(ReceivedFrame { payload: vec![1, 2, 3], rssi_dbm: -60, lqi: 4 });
//! assert!(MAILBOX.is_pending());
//! let frame = MAILBOX.take().unwrap();
//! assert_eq!(frame.payload, vec![1, 2, 3]);
//! ```

use crate::radio::driver::RxEvent;
use core::cell::{Cell, RefCell};
use critical_section::Mutex;

/// A frame copied out of the driver's receive buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedFrame {
    pub payload: Vec<u8>,
    pub rssi_dbm: i16,
    pub lqi: u8,
}

/// Single-slot mailbox shared between interrupt and foreground
pub struct RxMailbox {
    slot: Mutex<RefCell<Option<ReceivedFrame>>>,
    dropped: Mutex<Cell<u32>>,
}

impl Default for RxMailbox {
    fn default() -> Self {
        Self::new()
    }
}

impl RxMailbox {
    pub const fn new() -> Self {
        Self {
            slot: Mutex::new(RefCell::new(None)),
            dropped: Mutex::new(Cell::new(0)),
        }
    }

    /// Store a frame, replacing (and counting) any frame not yet taken
    pub fn post(&self, frame: ReceivedFrame) {
        critical_section::with(|cs| {
            let previous = self.slot.borrow_ref_mut(cs).replace(frame);
            if previous.is_some() {
                let dropped = self.dropped.borrow(cs);
                dropped.set(dropped.get().saturating_add(1));
            }
        });
    }

    /// Post the payload of a successful receive event; errors are ignored.
    ///
    /// Returns true when a frame was posted.
    pub fn post_event(&self, event: &RxEvent<'_>) -> bool {
        if event.result.is_err() {
            return false;
        }
        self.post(ReceivedFrame {
            payload: event.payload.to_vec(),
            rssi_dbm: event.rssi_dbm,
            lqi: event.lqi,
        });
        true
    }

    pub fn take(&self) -> Option<ReceivedFrame> {
        critical_section::with(|cs| self.slot.borrow_ref_mut(cs).take())
    }

    pub fn is_pending(&self) -> bool {
        critical_section::with(|cs| self.slot.borrow_ref(cs).is_some())
    }

    /// Frames overwritten before the foreground took them
    pub fn dropped(&self) -> u32 {
        critical_section::with(|cs| self.dropped.borrow(cs).get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RxError;

    fn frame(byte: u8) -> ReceivedFrame {
        ReceivedFrame {
            payload: vec![byte],
            rssi_dbm: -50,
            lqi: 2,
        }
    }

    #[test]
    fn test_post_and_take() {
        let mailbox = RxMailbox::new();
        assert!(!mailbox.is_pending());
        assert_eq!(mailbox.take(), None);

        mailbox.post(frame(7));
        assert!(mailbox.is_pending());
        assert_eq!(mailbox.take(), Some(frame(7)));
        assert!(!mailbox.is_pending());
        assert_eq!(mailbox.dropped(), 0);
    }

    #[test]
    fn test_overwrite_counts_drop() {
        let mailbox = RxMailbox::new();
        mailbox.post(frame(1));
        mailbox.post(frame(2));
        assert_eq!(mailbox.dropped(), 1);
        assert_eq!(mailbox.take(), Some(frame(2)));
    }

    #[test]
    fn test_post_event_skips_errors() {
        let mailbox = RxMailbox::new();
        let bad = RxEvent {
            payload: &[],
            result: Err(RxError::BadCrc),
            rssi_dbm: 0,
            lqi: 0,
        };
        assert!(!mailbox.post_event(&bad));
        assert!(!mailbox.is_pending());

        let good = RxEvent {
            payload: &[9, 8],
            result: Ok(2),
            rssi_dbm: -61,
            lqi: 5,
        };
        assert!(mailbox.post_event(&good));
        let taken = mailbox.take().unwrap();
        assert_eq!(taken.payload, vec![9, 8]);
        assert_eq!(taken.rssi_dbm, -61);
        assert_eq!(taken.lqi, 5);
    }

    #[test]
    fn test_shared_across_threads() {
        let mailbox = std::sync::Arc::new(RxMailbox::new());
        let poster = std::sync::Arc::clone(&mailbox);
        std::thread::spawn(move || poster.post(frame(3)))
            .join()
            .unwrap();
        assert_eq!(mailbox.take(), Some(frame(3)));
    }
}
