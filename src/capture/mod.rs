//! Frame Acquisition Layer
//!
//! Panels are photographed elsewhere; this layer only turns image files
//! into in-memory frames.

pub mod frame;

pub use frame::PanelFrame;
