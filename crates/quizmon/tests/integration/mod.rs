//! Integration tests for quizmon.
//!
//! These tests run the components against a local mock backend:
//! - Event stream subscription and monitor lifecycle
//! - Health and metrics polling
//! - Admin commands
//! - Dashboard WebSocket

pub mod common;
