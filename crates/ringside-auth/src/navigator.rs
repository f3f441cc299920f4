//! Hard-redirect seam.
//!
//! A logout must leave the current view entirely, discarding any state held
//! outside the session store. The embedding application decides what that
//! means (a full page load, a process exit, a prompt to log in again).

use tracing::info;

/// Performs a hard navigation to an application route.
pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str);
}

/// Navigator that only records the redirect in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate(&self, path: &str) {
        info!(path, "Redirecting");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn log_navigator_is_a_navigator() {
        let navigator: Arc<dyn Navigator> = Arc::new(LogNavigator);
        navigator.navigate("/login");
    }
}
