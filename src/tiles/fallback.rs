use super::image::TileImage;
use super::provider::TileProvider;
use crate::core::geo::TileCoord;
use crate::Result;

/// Prefers `primary`, falls back to `secondary` when it fails
///
/// Strictly sequential: the secondary is only called after the primary has
/// returned an error, and its result (success or error) is returned as is.
/// Invalid coordinates are rejected up front so neither provider sees them.
pub struct FallbackProvider<P: TileProvider, S: TileProvider> {
    primary: P,
    secondary: S,
    name: String,
}

impl<P: TileProvider, S: TileProvider> FallbackProvider<P, S> {
    pub fn new(primary: P, secondary: S) -> Self {
        let name = format!("{}+{}", primary.name(), secondary.name());
        Self {
            primary,
            secondary,
            name,
        }
    }

    pub fn primary(&self) -> &P {
        &self.primary
    }

    pub fn secondary(&self) -> &S {
        &self.secondary
    }
}

impl<P: TileProvider, S: TileProvider> TileProvider for FallbackProvider<P, S> {
    fn fetch_tile(&self, coord: TileCoord) -> Result<TileImage> {
        coord.validate()?;

        match self.primary.fetch_tile(coord) {
            Ok(tile) => Ok(tile),
            Err(err) => {
                log::debug!(
                    "{} failed for tile {} ({}), trying {}",
                    self.primary.name(),
                    coord,
                    err,
                    self.secondary.name()
                );
                self.secondary.fetch_tile(coord)
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}
