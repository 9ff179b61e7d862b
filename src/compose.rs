//! Image composition for round reveals
//!
//! Composition is a pure function of a backdrop and a list of layers. Each
//! layer is stretched to exactly fill its slot rectangle; aspect ratio is not
//! kept, since the scenario author's slot dimensions decide the final shape.

use std::{io::Cursor, path::PathBuf};

use image::{DynamicImage, ImageFormat, imageops};
use thiserror::Error;

use crate::scenario::{Image, Position, Scenario, Size};

/// Errors raised while composing an image
#[derive(Error, Debug)]
pub enum Error {
    /// An asset or a submitted image could not be decoded or encoded
    #[error("image processing failed: {0}")]
    Image(#[from] image::ImageError),
    /// A slot had no submitted image
    #[error("slot {0} has no image")]
    MissingImage(usize),
}

/// The fixed parts of a scenario picture
#[derive(Debug, Clone, Copy)]
pub struct Backdrop<'a> {
    /// Background asset path
    pub background: &'a str,
    /// Foreground asset path, drawn over every layer
    pub foreground: Option<&'a str>,
    /// Canvas size
    pub size: Size,
}

/// A submitted image and the rectangle it is stretched into
#[derive(Debug, Clone, Copy)]
pub struct Layer<'a> {
    /// The submitted image
    pub image: &'a Image,
    /// Top-left corner of the target rectangle
    pub position: Position,
    /// Size of the target rectangle
    pub size: Size,
}

/// Splits a filled scenario into its backdrop and layers (in slot order)
///
/// # Errors
///
/// `Error::MissingImage` if a slot has not been filled.
pub fn layers_of(scenario: &Scenario) -> Result<(Backdrop<'_>, Vec<Layer<'_>>), Error> {
    let definition = scenario.definition();
    let backdrop = Backdrop {
        background: &definition.background,
        foreground: definition.foreground.as_deref(),
        size: definition.size,
    };

    let layers = scenario
        .slots()
        .iter()
        .enumerate()
        .map(|(index, slot)| {
            slot.submitted()
                .map(|image| Layer {
                    image,
                    position: slot.position(),
                    size: slot.size(),
                })
                .ok_or(Error::MissingImage(index))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok((backdrop, layers))
}

/// Trait for turning a backdrop and layers into one encoded image
pub trait Composer {
    /// Composes and encodes the final picture
    ///
    /// # Errors
    ///
    /// Returns an error if an asset or layer cannot be processed.
    fn compose(&self, backdrop: &Backdrop<'_>, layers: &[Layer<'_>]) -> Result<Vec<u8>, Error>;
}

/// [`Composer`] backed by the `image` crate, reading assets from disk
#[derive(Debug, Clone)]
pub struct RasterComposer {
    assets: PathBuf,
}

impl RasterComposer {
    /// Creates a composer resolving asset paths relative to `assets`
    pub fn new(assets: impl Into<PathBuf>) -> Self {
        Self {
            assets: assets.into(),
        }
    }
}

impl Composer for RasterComposer {
    fn compose(&self, backdrop: &Backdrop<'_>, layers: &[Layer<'_>]) -> Result<Vec<u8>, Error> {
        let mut canvas = image::open(self.assets.join(backdrop.background))?.to_rgba8();

        for layer in layers {
            let overlay = image::load_from_memory(layer.image.bytes())?
                .resize_exact(
                    layer.size.width,
                    layer.size.height,
                    imageops::FilterType::Triangle,
                )
                .to_rgba8();
            imageops::replace(
                &mut canvas,
                &overlay,
                i64::from(layer.position.x),
                i64::from(layer.position.y),
            );
        }

        if let Some(foreground) = backdrop.foreground {
            let foreground = image::open(self.assets.join(foreground))?
                .resize_exact(
                    canvas.width(),
                    canvas.height(),
                    imageops::FilterType::Triangle,
                )
                .to_rgba8();
            imageops::overlay(&mut canvas, &foreground, 0, 0);
        }

        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(canvas).write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok(bytes)
    }
}
