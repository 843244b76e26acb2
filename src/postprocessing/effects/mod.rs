//! Post-processing effects.

mod adaptive_tone_mapping_pass;
mod bloom_pass;
mod bokeh_pass;
mod dot_screen_pass;
mod film_pass;
mod glitch_pass;
mod mask_pass;
mod render_pass;
mod save_pass;
mod shader_pass;
mod texture_pass;

pub use adaptive_tone_mapping_pass::*;
pub use bloom_pass::*;
pub use bokeh_pass::*;
pub use dot_screen_pass::*;
pub use film_pass::*;
pub use glitch_pass::*;
pub use mask_pass::*;
pub use render_pass::*;
pub use save_pass::*;
pub use shader_pass::*;
pub use texture_pass::*;
