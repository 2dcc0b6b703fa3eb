// Copyright 2025 Vijaykumar Singh
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.

//! Blocking queue with high/low watermark flow control
//!
//! A producer whose push brings the queue to the high watermark blocks until
//! consumers drain it down to the low watermark. Consumers block while the
//! queue is empty. Closing the queue releases every waiter.

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;

struct QueueState<T> {
    items: VecDeque<T>,
    closed: bool,
    peak: usize,
}

pub struct WatermarkQueue<T> {
    state: Mutex<QueueState<T>>,
    changed: Condvar,
    high: usize,
    low: usize,
}

impl<T> WatermarkQueue<T> {
    pub fn new(high: usize, low: usize) -> Self {
        debug_assert!(low < high);
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                closed: false,
                peak: 0,
            }),
            changed: Condvar::new(),
            high,
            low,
        }
    }

    /// Enqueue `item`, then wait for the drain if the high watermark is reached.
    ///
    /// Returns false (dropping the item) if the queue is already closed.
    pub fn push(&self, item: T) -> bool {
        let mut state = self.state.lock();
        if state.closed {
            return false;
        }
        state.items.push_back(item);
        state.peak = state.peak.max(state.items.len());
        self.changed.notify_all();

        if state.items.len() >= self.high {
            while !state.closed && state.items.len() > self.low {
                self.changed.wait(&mut state);
            }
        }
        true
    }

    /// Dequeue the oldest item, waiting while the queue is empty.
    ///
    /// Returns `None` once the queue is closed.
    pub fn pop(&self) -> Option<T> {
        let mut state = self.state.lock();
        loop {
            if state.closed {
                return None;
            }
            if let Some(item) = state.items.pop_front() {
                self.changed.notify_all();
                return Some(item);
            }
            self.changed.wait(&mut state);
        }
    }

    /// Wake every waiter and refuse further work
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        self.changed.notify_all();
    }

    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Largest length observed so far
    pub fn peak(&self) -> usize {
        self.state.lock().peak
    }

    pub fn high_watermark(&self) -> usize {
        self.high
    }
}
