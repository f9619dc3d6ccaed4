//! core-writable: the emulator-to-tty byte queue.
//!
//! Bytes the terminal wants written to the pty (query replies, encoded
//! keys, pasted text) accumulate here until the host's event loop finds
//! the pty writable. Two stages: a fixed 16 KiB ring for the common case,
//! and a FIFO list of heap chunks once the ring fills. One slot of the
//! ring is reserved as a guard so `start == end` always means empty; the
//! ring therefore holds at most `RING_SIZE - 1` bytes.
//!
//! Ordering is strict FIFO across both stages. To keep it that way, once
//! any heap chunk exists new bytes always append to the heap; the ring is
//! never back-filled behind queued chunks.
//!
//! Consumption protocol: `peek` hands out the next contiguous run and
//! provisionally consumes it. The host then reports what actually went
//! out with `commit(n)` (or equivalently hands back the tail with
//! `rewind(unneeded)`); the unsent tail becomes the head of the queue
//! again. The window is single-shot: it closes on `commit`/`rewind` or on
//! the next call into the queue, and a window that closes unreported
//! counts as fully written. Misusing the protocol (committing more than
//! was peeked, rewinding with no open window) is a caller bug and
//! asserts.

use std::collections::VecDeque;
use tracing::trace;

const RING_SIZE: usize = 16384;

#[derive(Debug)]
struct HeapChunk {
    bytes: Box<[u8]>,
    written: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Window {
    Closed,
    Ring(usize),
    Heap(usize),
}

#[derive(Debug)]
pub struct WritableQueue {
    ring: Box<[u8; RING_SIZE]>,
    start: usize,
    end: usize,
    chunks: VecDeque<HeapChunk>,
    window: Window,
}

impl Default for WritableQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl WritableQueue {
    pub fn new() -> Self {
        Self {
            ring: Box::new([0; RING_SIZE]),
            start: 0,
            end: 0,
            chunks: VecDeque::new(),
            window: Window::Closed,
        }
    }

    #[inline]
    fn ring_len(&self) -> usize {
        ((self.start > self.end) as usize * RING_SIZE + self.end) - self.start
    }

    /// Close the return window from the previous `peek`. A heap chunk the
    /// window fully consumed is unlinked here.
    fn close_window(&mut self) {
        if let Window::Heap(_) = self.window
            && let Some(front) = self.chunks.front()
            && front.written == front.bytes.len()
        {
            self.chunks.pop_front();
        }
        self.window = Window::Closed;
    }

    fn push_chunk(&mut self, bytes: &[u8]) {
        trace!(target: "writable.queue", len = bytes.len(), "spilling to heap");
        self.chunks.push_back(HeapChunk {
            bytes: bytes.into(),
            written: 0,
        });
    }

    // copy into the ring; caller has checked it fits
    fn push_ring(&mut self, bytes: &[u8]) {
        let cp_lim = RING_SIZE - self.end;
        if bytes.len() < cp_lim {
            self.ring[self.end..self.end + bytes.len()].copy_from_slice(bytes);
        } else {
            // split copy across the physical end of the ring
            self.ring[self.end..].copy_from_slice(&bytes[..cp_lim]);
            self.ring[..bytes.len() - cp_lim].copy_from_slice(&bytes[cp_lim..]);
        }
        self.end = (self.end + bytes.len()) % RING_SIZE;
    }

    /// Queue bytes for the tty.
    pub fn append(&mut self, bytes: &[u8]) {
        self.close_window();
        if bytes.is_empty() {
            return;
        }

        // once a heap chunk exists, everything piles on behind it
        if !self.chunks.is_empty() {
            self.push_chunk(bytes);
            return;
        }

        let ringable = RING_SIZE - self.ring_len() - 1;
        if ringable == 0 {
            self.push_chunk(bytes);
        } else if bytes.len() > ringable {
            self.push_ring(&bytes[..ringable]);
            self.push_chunk(&bytes[ringable..]);
        } else {
            self.push_ring(bytes);
        }
    }

    /// True when any bytes are still queued.
    pub fn has_pending(&self) -> bool {
        self.ring_len() > 0 || self.chunks.iter().any(|c| c.written < c.bytes.len())
    }

    /// Total bytes currently queued.
    pub fn pending_len(&self) -> usize {
        self.ring_len()
            + self
                .chunks
                .iter()
                .map(|c| c.bytes.len() - c.written)
                .sum::<usize>()
    }

    /// Hand out the next contiguous run of queued bytes and provisionally
    /// consume it, opening the return window. A run from the ring stops
    /// at the ring's physical end (call again for the wrapped part); a
    /// run from the heap is the unwritten tail of the head chunk. Returns
    /// `None` when the queue is empty.
    pub fn peek(&mut self) -> Option<&[u8]> {
        self.close_window();

        if self.ring_len() > 0 {
            let at = self.start;
            let len = if self.start > self.end {
                RING_SIZE - self.start
            } else {
                self.end - self.start
            };
            self.start = (self.start + len) % RING_SIZE;
            self.window = Window::Ring(len);
            return Some(&self.ring[at..at + len]);
        }

        if let Some(front) = self.chunks.front_mut() {
            let at = front.written;
            let len = front.bytes.len() - at;
            front.written = front.bytes.len();
            self.window = Window::Heap(len);
            return Some(&front.bytes[at..]);
        }

        None
    }

    /// Report that `n` bytes of the last `peek` were written; the rest
    /// re-queues at the head. Closes the window.
    pub fn commit(&mut self, n: usize) {
        let len = match self.window {
            Window::Closed => panic!("commit without an open peek window"),
            Window::Ring(len) | Window::Heap(len) => len,
        };
        assert!(n <= len, "commit of {n} bytes exceeds peeked run of {len}");
        self.give_back(len - n);
        self.close_window();
    }

    /// Hand back the trailing `unneeded` bytes of the last `peek` (the
    /// short-write retry path). Legal once per peek, before any other
    /// call, for `0 < unneeded <= peeked`.
    pub fn rewind(&mut self, unneeded: usize) {
        let len = match self.window {
            Window::Closed => panic!("rewind without an open peek window"),
            Window::Ring(len) | Window::Heap(len) => len,
        };
        assert!(
            unneeded > 0 && unneeded <= len,
            "rewind of {unneeded} bytes outside peeked run of {len}"
        );
        self.give_back(unneeded);
        // the head chunk cannot be complete here, so nothing to unlink
        self.window = Window::Closed;
    }

    fn give_back(&mut self, unneeded: usize) {
        if unneeded == 0 {
            return;
        }
        match self.window {
            Window::Closed => unreachable!("give_back with closed window"),
            Window::Ring(_) => {
                self.start = (self.start + RING_SIZE - unneeded) % RING_SIZE;
            }
            Window::Heap(_) => {
                let front = self.chunks.front_mut().expect("heap window implies chunk");
                front.written -= unneeded;
            }
        }
    }
}
