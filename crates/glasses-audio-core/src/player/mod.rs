mod active;
mod decoder;
#[allow(clippy::module_inception)]
mod player;
mod render_buffer;

pub use player::Player;

pub(crate) use {
    active::{ActivePlayback, PlaybackStop},
    decoder::{convert_for_render, load_wav},
    render_buffer::RenderBuffer,
};

#[cfg(test)]
pub(crate) use decoder::decode_wav;
