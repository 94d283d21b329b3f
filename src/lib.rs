//! gg-botapi — client for the Gadu-Gadu BotAPI push service.
//!
//! Builds rich-text messages as three byte-consistent views — HTML, a
//! plain-text fallback and a binary style-run stream — attaches
//! content-addressed images, and pushes the assembled payloads through
//! the Botmaster gateway.
//!
//! See `DESIGN.md` for full architecture documentation.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod credentials;
pub mod logging;

pub mod markup;
pub mod message;
pub mod style;
pub mod wire;

pub mod gateway;
