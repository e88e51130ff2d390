//! Reusable UI building blocks, rendered via Leptos SSR.
//!
//! - [`Button`]: clickable button with variants
//! - [`Badge`]: small status label (mode, rank)
//! - [`icons`]: inline SVG icons

mod badge;
mod button;
mod icons;

pub use badge::{Badge, BadgeVariant};
pub use button::{Button, ButtonVariant};
pub use icons::*;
