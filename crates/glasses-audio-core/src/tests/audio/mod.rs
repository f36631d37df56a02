mod converter;
mod resampler;
