//! Chart rendering.
//!
//! [`layout`] turns region analyses into a backend-independent [`Figure`];
//! [`render_svg`] draws a figure with plotters' SVG backend.

pub mod layout;
mod svg;

pub use layout::{Coloring, Figure, LayoutOptions, layout};
pub use svg::{DEFAULT_SIZE, render_svg};
