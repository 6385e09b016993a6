//! Mosaic engine crate.
//!
//! Tile-chunk rendering on wgpu: the WGSL programs for chunks, sprites and
//! tile-index debugging, a CPU mirror of those programs, the host-side tile map
//! that feeds them, and the platform + GPU runtime used to drive them.

pub mod device;
pub mod window;
pub mod time;
pub mod core;

pub mod logging;
pub mod color;
pub mod camera;
pub mod render;
pub mod shading;
pub mod sheet;
pub mod tiles;
