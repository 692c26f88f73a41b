//! Carving options

/// Bytes read by a quick scan
pub const DEFAULT_QUICK_SCAN_LIMIT: u64 = 1024 * 1024;
/// Bytes held per window during a deep carve
pub const DEFAULT_WINDOW_SIZE: usize = 8 * 1024 * 1024;

/// Options for a [`Carver`](crate::carver::Carver)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CarveOptions {
    /// Prefix length examined by a quick scan
    pub quick_scan_limit: u64,
    /// Window length used when streaming a source during a deep carve
    pub window_size: usize,
}

impl Default for CarveOptions {
    fn default() -> Self {
        Self {
            quick_scan_limit: DEFAULT_QUICK_SCAN_LIMIT,
            window_size: DEFAULT_WINDOW_SIZE,
        }
    }
}

impl CarveOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the quick scan prefix length
    pub fn with_quick_scan_limit(mut self, limit: u64) -> Self {
        self.quick_scan_limit = limit;
        self
    }

    /// Sets the deep carve window length (at least one byte)
    pub fn with_window_size(mut self, size: usize) -> Self {
        self.window_size = size.max(1);
        self
    }
}
