use crate::frame::DEFAULT_MAX_FRAME_SIZE;

const DEFAULT_WRITE_BUFFER_CAPACITY: usize = 8 * 1024;

/// Settings applied to every codec a registry constructs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecConfig {
    /// Largest header or body segment accepted in either direction
    pub max_frame_size: usize,
    /// Capacity of the write-side buffer
    pub write_buffer_capacity: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            write_buffer_capacity: DEFAULT_WRITE_BUFFER_CAPACITY,
        }
    }
}

impl CodecConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the largest segment size
    pub fn max_frame_size(mut self, max_frame_size: usize) -> Self {
        self.max_frame_size = max_frame_size;
        self
    }

    /// Set the write buffer capacity
    pub fn write_buffer_capacity(mut self, capacity: usize) -> Self {
        self.write_buffer_capacity = capacity;
        self
    }
}
