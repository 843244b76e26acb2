//! Base pass trait for post-processing.

use crate::core::{RenderDestination, RenderError, Renderer};
use crate::texture::RenderTarget;
use serde::{Deserialize, Serialize};

/// How the composer's mask tracking reacts to a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PassRole {
    /// Plain image pass.
    #[default]
    Normal,
    /// Arms the stencil mask.
    MaskSet,
    /// Disarms the stencil mask.
    MaskClear,
}

/// Flags the composer reads when scheduling a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PassState {
    /// Disabled passes are skipped entirely.
    pub enabled: bool,
    /// Swap read and write buffers after rendering.
    pub needs_swap: bool,
    /// Clear the destination before drawing.
    pub clear: bool,
    /// Draw to the screen instead of the write buffer.
    pub render_to_screen: bool,
}

impl Default for PassState {
    fn default() -> Self {
        Self {
            enabled: true,
            needs_swap: true,
            clear: false,
            render_to_screen: false,
        }
    }
}

impl PassState {
    /// State of a pass that works in place and never swaps.
    pub fn in_place() -> Self {
        Self {
            needs_swap: false,
            ..Default::default()
        }
    }

    /// The screen when rendering to screen, `target` otherwise.
    #[inline]
    pub fn destination<'a>(&self, target: &'a RenderTarget) -> RenderDestination<'a> {
        RenderDestination::screen_or(self.render_to_screen, target)
    }
}

/// A pass in the post-processing chain.
///
/// Passes draw into `write` (or the screen) reading `read`, and own every
/// resource they allocate besides the two buffers they are handed.
pub trait Pass<R: Renderer> {
    /// Get the name of this pass.
    fn name(&self) -> &str;

    /// Scheduling flags.
    fn state(&self) -> &PassState;

    /// Mutable scheduling flags.
    fn state_mut(&mut self) -> &mut PassState;

    /// Check if this pass is enabled.
    fn enabled(&self) -> bool {
        self.state().enabled
    }

    /// Set whether this pass is enabled.
    fn set_enabled(&mut self, enabled: bool) {
        self.state_mut().enabled = enabled;
    }

    /// Mask role of this pass.
    fn role(&self) -> PassRole {
        PassRole::Normal
    }

    /// Render this pass.
    ///
    /// # Arguments
    /// * `renderer` - Backend to draw with
    /// * `write` - Buffer to draw into unless rendering to screen
    /// * `read` - Output of the previous pass
    /// * `delta_time` - Seconds since the previous frame
    /// * `mask_active` - Whether a stencil mask is armed
    fn render(
        &mut self,
        renderer: &mut R,
        write: &RenderTarget,
        read: &RenderTarget,
        delta_time: f32,
        mask_active: bool,
    ) -> Result<(), RenderError>;

    /// Called when the composer's targets change size.
    fn resize(&mut self, _renderer: &mut R, _width: u32, _height: u32) {}

    /// Release auxiliary render targets.
    fn dispose(&mut self, _renderer: &mut R) {}
}
