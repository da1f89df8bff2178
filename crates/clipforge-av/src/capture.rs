//! Screen capture input selection.
//!
//! The capture tool records the desktop through ffmpeg's platform grab
//! device. This module picks the device and default input specifier for the
//! current platform; the stop sequence itself (the `q` keypress with a
//! configurable escalation timeout) lives in [`crate::exec::GracefulStop`].

/// The `-f <device> -i <input>` pair for capturing the primary display.
pub fn grab_input() -> (&'static str, &'static str) {
    #[cfg(target_os = "linux")]
    {
        ("x11grab", ":0.0")
    }
    #[cfg(target_os = "macos")]
    {
        ("avfoundation", "1:none")
    }
    #[cfg(target_os = "windows")]
    {
        ("gdigrab", "desktop")
    }
    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
    {
        ("x11grab", ":0.0")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grab_input_is_nonempty() {
        let (device, input) = grab_input();
        assert!(!device.is_empty());
        assert!(!input.is_empty());
    }
}
