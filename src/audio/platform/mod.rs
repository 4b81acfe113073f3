#[cfg(target_os = "windows")]
pub mod windows;

#[cfg(not(target_os = "windows"))]
pub mod unsupported;

use super::backend::AudioBackend;

pub fn create_backend() -> Box<dyn AudioBackend> {
    #[cfg(target_os = "windows")]
    return Box::new(windows::WindowsAudioBackend::new());

    #[cfg(not(target_os = "windows"))]
    return Box::new(unsupported::UnsupportedAudioBackend::new());
}
