//! Property-based tests for the condition engine
//!
//! ## Properties Tested
//!
//! - **Balance**: stack depth after any nest of binds equals the depth before
//! - **Nearest handler**: `signal` runs exactly the innermost matching handler
//! - **Restart order**: `compute_restarts` lists restarts innermost first
//! - **Cleanup once**: `unwind_protect` cleanups run once on every exit path
