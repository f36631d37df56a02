mod converter;
mod level;
mod resampler;

pub(crate) use {
    converter::{FormatConverter, remix},
    level::LevelMeter,
    resampler::Resampler,
};

#[cfg(test)]
pub(crate) use converter::downmix;
