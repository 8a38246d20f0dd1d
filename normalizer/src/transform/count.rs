//! Best-effort row counting and interrupt handling.

use std::io::{ErrorKind, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Bytes read between two interrupt checks.
const COUNT_BLOCK_SIZE: usize = 64 * 1024;

/// Shared flag raised by an external interrupt (Ctrl-C).
///
/// Whoever acts on the interrupt clears it with [`Interrupt::take`], so one
/// Ctrl-C cancels one thing.
#[derive(Debug, Clone, Default)]
pub struct Interrupt(Arc<AtomicBool>);

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Consume a pending interrupt.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }
}

/// Count lines in a reader, or `None` when reading fails or the interrupt
/// fires first.
///
/// A final line without a trailing newline still counts. Quoted fields that
/// span lines make this an over-estimate, which is fine for a progress total.
pub fn count_rows<R: Read>(mut reader: R, interrupt: &Interrupt) -> Option<u64> {
    let mut buf = vec![0u8; COUNT_BLOCK_SIZE];
    let mut lines = 0u64;
    let mut last = None;

    loop {
        if interrupt.take() {
            return None;
        }

        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(_) => return None,
        };

        lines += buf[..n].iter().filter(|&&b| b == b'\n').count() as u64;
        last = Some(buf[n - 1]);
    }

    match last {
        Some(b) if b != b'\n' => Some(lines + 1),
        _ => Some(lines),
    }
}
