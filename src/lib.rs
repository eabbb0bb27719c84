//! Panel Reader - seven-segment display reader for roaster control panels
//!
//! Locates every display on a photographed panel, calibrates the panel
//! layout from the POWER display and turns the recognized text into a
//! typed [`analysis::Reading`].

pub mod analysis;
pub mod capture;
pub mod config;
pub mod error;
pub mod storage;
pub mod vision;

pub use analysis::Reading;
pub use capture::PanelFrame;
pub use config::AppConfig;
pub use error::PanelError;
pub use vision::{Detection, PanelReader, Services};
