//! Embedded static resources.
//!
//! The wire constants shared between the proxy router and the injected
//! browser script live here so the two can never drift apart.

/// Path the proxy serves the refresh event stream on.
pub const SSE_PATH: &str = "/eavesdrop_sse";

/// Payload broadcast to browsers when a watcher finishes a successful run.
pub const SSE_EVENT: &[u8] = b"data: refresh\n\n";

/// Browser-side refresh listener injected into proxied HTML pages.
pub const REFRESH_SCRIPT: &str = include_str!("refresher.js");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_targets_sse_path() {
        assert!(REFRESH_SCRIPT.contains(SSE_PATH));
    }

    #[test]
    fn test_script_reloads_on_refresh() {
        assert!(REFRESH_SCRIPT.contains("refresh"));
        assert!(REFRESH_SCRIPT.contains("location.reload"));
    }
}
