//! Integration tests for loading projects from disk.

mod common;
mod junction_tests;
mod refs_tests;
