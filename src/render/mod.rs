// src/render/mod.rs

//! Presentation of collected results.
//!
//! - [`layout`] renders a [`Collected`](crate::collect::Collected) mapping in
//!   one of the summary layouts (one-line, grouped by server, transposed).
//! - [`body`] is the clipped output body used by the grouped layouts.
//! - [`redirect`] bypasses collection and streams artifacts straight to the
//!   process's own stdout / stderr (raw and quiet modes).
//! - [`terminal`] resolves terminal geometry; [`ansi`] colours and truncates.

pub mod ansi;
pub mod body;
pub mod layout;
pub mod redirect;
pub mod terminal;

pub use layout::{render, RenderOptions, TimeWindow};
pub use redirect::{redirect, RedirectOptions};
pub use terminal::TermGeometry;
