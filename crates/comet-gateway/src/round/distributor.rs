//! Round-robin assignment of buffer pools and timer wheels

use super::pool::BufferPool;
use crate::timer::TimerWheel;
use comet_common::AppConfig;
use std::sync::Arc;

/// Sizing for a [`Round`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundOptions {
    pub reader: usize,
    pub reader_buf: usize,
    pub reader_buf_size: usize,
    pub writer: usize,
    pub writer_buf: usize,
    pub writer_buf_size: usize,
    pub timer: usize,
    pub timer_size: usize,
}

impl From<&AppConfig> for RoundOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            reader: config.tcp.reader_num,
            reader_buf: config.tcp.readbuf_num,
            reader_buf_size: config.tcp.readbuf_size,
            writer: config.tcp.writer_num,
            writer_buf: config.tcp.writebuf_num,
            writer_buf_size: config.tcp.writebuf_size,
            timer: config.timer.timer_num,
            timer_size: config.timer.timer_size,
        }
    }
}

/// Fixed sets of reader pools, writer pools and timer wheels
///
/// Connections pick one of each by `index % len`, which spreads lock
/// contention; it does not balance load.
#[derive(Debug)]
pub struct Round {
    readers: Vec<Arc<BufferPool>>,
    writers: Vec<Arc<BufferPool>>,
    timers: Vec<Arc<TimerWheel>>,
}

impl Round {
    /// Pre-create every pool and wheel; must run inside a Tokio runtime
    #[must_use]
    pub fn new(options: RoundOptions) -> Self {
        let readers = (0..options.reader.max(1))
            .map(|_| BufferPool::new(options.reader_buf, options.reader_buf_size))
            .collect();
        let writers = (0..options.writer.max(1))
            .map(|_| BufferPool::new(options.writer_buf, options.writer_buf_size))
            .collect();
        let timers = (0..options.timer.max(1))
            .map(|_| Arc::new(TimerWheel::new(options.timer_size)))
            .collect();

        tracing::debug!(
            readers = options.reader,
            writers = options.writer,
            timers = options.timer,
            "round initialized"
        );
        Self {
            readers,
            writers,
            timers,
        }
    }

    #[must_use]
    pub fn pick_reader(&self, index: usize) -> &Arc<BufferPool> {
        &self.readers[index % self.readers.len()]
    }

    #[must_use]
    pub fn pick_writer(&self, index: usize) -> &Arc<BufferPool> {
        &self.writers[index % self.writers.len()]
    }

    #[must_use]
    pub fn pick_timer(&self, index: usize) -> &Arc<TimerWheel> {
        &self.timers[index % self.timers.len()]
    }

    /// Entries scheduled across all wheels
    #[must_use]
    pub fn scheduled_timers(&self) -> usize {
        self.timers.iter().map(|timer| timer.len()).sum()
    }
}
