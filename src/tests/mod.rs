//! Consolidated test modules.
//!
//! End-to-end tests that run a real HTTP connection against a mock directory,
//! parameterized across providers.

mod directory_e2e;
