// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagelink contributors

//! Utility modules
//!
//! Common utilities for the stagelink CLI.

pub mod colors;

pub use colors::*;
