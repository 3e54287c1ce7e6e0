//! Implementations of external collaborator traits.

pub mod imagemagick;

pub use imagemagick::ImageMagickThumbnailer;
