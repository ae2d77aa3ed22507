//! Shared constants for end-to-end tests

// ============================================================================
// Test Accounts
// ============================================================================

pub const TEST_EMAIL: &str = "ana@example.com";
pub const TEST_PASS: &str = "ana-pass-123";
pub const TEST_USERNAME: &str = "ana";

pub const OTHER_EMAIL: &str = "bruno@example.com";
pub const OTHER_PASS: &str = "bruno-pass-456";

// ============================================================================
// Timeouts
// ============================================================================

/// Maximum time to wait for a spawned server to answer its first request.
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

pub const SERVER_READY_POLL_MS: u64 = 20;
