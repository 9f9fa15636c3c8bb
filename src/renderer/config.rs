//! Renderer configuration.

use bitflags::bitflags;
use glamx::Vec3;

use crate::camera::Handedness;

/// How the scene is lit.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RenderMode {
    /// G-buffer, then one lighting pass per light, with stencil shadow volumes.
    #[default]
    Deferred,
    /// One lit draw per mesh part, lights passed as uniform arrays.
    Forward,
}

bitflags! {
    /// Buffers cleared at the beginning of a frame.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    pub struct ClearFlags: u32 {
        /// Clear the frame color with the clear color.
        const COLOR = 1 << 0;
        /// Clear the depth buffer.
        const DEPTH = 1 << 1;
        /// Clear the stencil buffer.
        const STENCIL = 1 << 2;
    }
}

impl Default for ClearFlags {
    fn default() -> Self {
        ClearFlags::all()
    }
}

/// Renderer construction parameters.
///
/// ```
/// # use deferred3d::renderer::{RendererConfig, RenderMode};
/// let config = RendererConfig::default()
///     .with_mode(RenderMode::Forward)
///     .with_sample_count(4);
/// assert!(!config.uses_shadow_volumes());
/// ```
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RendererConfig {
    /// Deferred or forward lighting.
    pub mode: RenderMode,
    /// Samples per pixel. MSAA is on when greater than 1.
    pub sample_count: u32,
    /// Stencil shadows for lights that cast them. Deferred mode only.
    pub shadow_volumes: bool,
    /// Wait for the vertical blank when presenting.
    pub vsync: bool,
    /// Convention of the view and projection matrices built from a camera.
    pub handedness: Handedness,
    /// Size of the light gizmo cubes.
    pub gizmo_size: f32,
    /// Outline the light gizmos. Forward mode only.
    pub gizmo_outline: bool,
    /// Scene-wide ambient light.
    pub ambient: Vec3,
}

impl Default for RendererConfig {
    fn default() -> Self {
        RendererConfig {
            mode: RenderMode::Deferred,
            sample_count: 1,
            shadow_volumes: true,
            vsync: false,
            handedness: Handedness::Right,
            gizmo_size: 0.1,
            gizmo_outline: true,
            ambient: Vec3::splat(0.05),
        }
    }
}

impl RendererConfig {
    /// Sets the lighting mode.
    pub fn with_mode(mut self, mode: RenderMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the number of samples per pixel.
    pub fn with_sample_count(mut self, sample_count: u32) -> Self {
        self.sample_count = sample_count;
        self
    }

    /// Enables or disables shadow volumes.
    pub fn with_shadow_volumes(mut self, shadow_volumes: bool) -> Self {
        self.shadow_volumes = shadow_volumes;
        self
    }

    /// Enables or disables vsync.
    pub fn with_vsync(mut self, vsync: bool) -> Self {
        self.vsync = vsync;
        self
    }

    /// Sets the matrix convention.
    pub fn with_handedness(mut self, handedness: Handedness) -> Self {
        self.handedness = handedness;
        self
    }

    /// Sets the light gizmo size.
    pub fn with_gizmo_size(mut self, gizmo_size: f32) -> Self {
        self.gizmo_size = gizmo_size;
        self
    }

    /// Enables or disables the gizmo outline.
    pub fn with_gizmo_outline(mut self, gizmo_outline: bool) -> Self {
        self.gizmo_outline = gizmo_outline;
        self
    }

    /// Sets the ambient light.
    pub fn with_ambient(mut self, ambient: Vec3) -> Self {
        self.ambient = ambient;
        self
    }

    /// Whether the renderer works on a multisampled G-buffer and frame.
    #[inline]
    pub fn is_multisampled(&self) -> bool {
        self.sample_count > 1
    }

    /// Whether shadow volumes are rendered at all.
    #[inline]
    pub fn uses_shadow_volumes(&self) -> bool {
        self.mode == RenderMode::Deferred && self.shadow_volumes
    }

    /// Whether gizmos get an outline.
    #[inline]
    pub fn uses_gizmo_outline(&self) -> bool {
        self.mode == RenderMode::Forward && self.gizmo_outline
    }

    /// Winding of front faces on screen for this convention.
    ///
    /// Meshes are clockwise when seen from the outside.
    pub fn front_face(&self) -> wgpu::FrontFace {
        match self.handedness {
            Handedness::Right => wgpu::FrontFace::Cw,
            Handedness::Left => wgpu::FrontFace::Ccw,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = RendererConfig::default();
        assert_eq!(config.mode, RenderMode::Deferred);
        assert_eq!(config.sample_count, 1);
        assert!(config.uses_shadow_volumes());
        assert!(!config.uses_gizmo_outline());
        assert!(!config.is_multisampled());
        assert_eq!(ClearFlags::default(), ClearFlags::COLOR | ClearFlags::DEPTH | ClearFlags::STENCIL);
    }

    #[test]
    fn forward_mode_outlines_gizmos() {
        let config = RendererConfig::default()
            .with_mode(RenderMode::Forward)
            .with_handedness(Handedness::Left);
        assert!(config.uses_gizmo_outline());
        assert_eq!(config.front_face(), wgpu::FrontFace::Ccw);
    }
}
