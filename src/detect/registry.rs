use anyhow::{anyhow, Result};
use image::GrayImage;

use crate::detect::result::DetectionResult;

use super::backend::{DetectionCapability, DetectorBackend};

/// The detector backends of one monitor, looked up by capability.
///
/// Each capability is served by the first registered backend that supports
/// it; a backend may serve both roles.
#[derive(Default)]
pub struct BackendRegistry {
    backends: Vec<Box<dyn DetectorBackend>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<B: DetectorBackend + 'static>(&mut self, backend: B) {
        self.backends.push(Box::new(backend));
    }

    /// Registered backend names, in registration order.
    pub fn list(&self) -> Vec<&'static str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    pub fn detect_with_capability(
        &mut self,
        capability: DetectionCapability,
        gray: &GrayImage,
    ) -> Result<DetectionResult> {
        let backend = self
            .backends
            .iter_mut()
            .find(|b| b.supports(capability))
            .ok_or_else(|| anyhow!("no registered backend supports capability {:?}", capability))?;
        backend.detect(capability, gray)
    }

    pub fn warm_up_all(&mut self) -> Result<()> {
        for backend in &mut self.backends {
            log::debug!("warming up backend {}", backend.name());
            backend.warm_up()?;
        }
        Ok(())
    }
}
