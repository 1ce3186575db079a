//! Capture Adapter - 屏幕截图实现

mod command_capture;

pub use command_capture::CommandScreenCapture;
