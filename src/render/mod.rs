//! Plot output: backend-independent day figures and their PNG rendering.
//!
//! The viewer draws [`figure::DayFigure`] with `egui_plot`; batch runs
//! draw the same figure with `plotters` through [`raster`].

pub mod figure;
pub mod rapids;
pub mod raster;
