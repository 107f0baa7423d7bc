//! The composition layer between a window system client and a display
//! engine.
//!
//! A [`display::HwcDisplay`] holds the client's layers, asks a
//! [`engine::DisplayEngine`] how to compose them and commits the result.

#![allow(
    clippy::len_zero,
    clippy::enum_variant_names,
    clippy::too_many_arguments,
    clippy::new_without_default
)]

#[macro_use]
mod macros;

pub mod callbacks;
pub mod cli;
pub mod color_mode;
pub mod config;
pub mod display;
pub mod engine;
pub mod error;
pub mod fence;
pub mod flags;
pub mod format;
pub mod layer;
pub mod layer_set;
pub mod logger;
pub mod manager;
pub mod readback;
pub mod refresh;
pub mod sim;
pub mod stack;
pub mod time;
pub mod tone_map;
pub mod utils;
pub mod validate;
