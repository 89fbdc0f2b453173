//! Executor configuration.

/// Name given to the worker thread spawned by
/// [`Executor::with_config`](super::Executor::with_config).
pub const DEFAULT_THREAD_NAME: &str = "taskloop-executor";

/// Configuration for an [`Executor`](super::Executor).
///
/// # Example
///
/// ```rust
/// use taskloop::executor::ExecutorConfig;
///
/// let config = ExecutorConfig::new()
///     .thread_name("reader")
///     .keep_context_on_dispose();
///
/// assert_eq!(config.thread_name, "reader");
/// assert!(!config.quit_on_dispose);
/// ```
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Name of the worker thread, when the executor spawns one.
    pub thread_name: String,
    /// Whether `dispose` quits the execution context when nothing is
    /// running. Set to `false` when the context is shared.
    pub quit_on_dispose: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            thread_name: DEFAULT_THREAD_NAME.to_string(),
            quit_on_dispose: true,
        }
    }
}

impl ExecutorConfig {
    /// Create a new default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the worker thread name.
    #[must_use]
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Leave the execution context running on dispose.
    #[must_use]
    pub fn keep_context_on_dispose(mut self) -> Self {
        self.quit_on_dispose = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ExecutorConfig::default();
        assert_eq!(config.thread_name, DEFAULT_THREAD_NAME);
        assert!(config.quit_on_dispose);
    }
}
