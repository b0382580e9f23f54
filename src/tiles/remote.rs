use super::http::{HttpClient, ReqwestClient};
use super::image::TileImage;
use super::provider::TileProvider;
use super::source::{TileSource, UrlTemplate};
use crate::core::geo::TileCoord;
use crate::Result;

/// Fetches tiles from an HTTP tile server
///
/// The URL comes from a [`TileSource`], the body is decoded as PNG/JPEG.
/// Failures map to [`MapError::Network`](crate::MapError::Network),
/// [`MapError::HttpStatus`](crate::MapError::HttpStatus) or
/// [`MapError::Decode`](crate::MapError::Decode).
pub struct RemoteProvider<C: HttpClient = ReqwestClient> {
    source: Box<dyn TileSource>,
    http_client: C,
    name: String,
}

impl<C: HttpClient> RemoteProvider<C> {
    pub fn new(source: impl TileSource + 'static, http_client: C) -> Self {
        Self {
            source: Box::new(source),
            http_client,
            name: "remote".to_string(),
        }
    }

    /// Override the name used in logs
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn url(&self, coord: TileCoord) -> String {
        self.source.url(coord)
    }
}

impl RemoteProvider<ReqwestClient> {
    /// OpenStreetMap behind the default reqwest client
    pub fn openstreetmap() -> Result<Self> {
        let source = UrlTemplate::parse(super::source::OSM_URL_TEMPLATE)?;
        Ok(Self::new(source, ReqwestClient::new()?).with_name("openstreetmap"))
    }
}

impl<C: HttpClient> TileProvider for RemoteProvider<C> {
    fn fetch_tile(&self, coord: TileCoord) -> Result<TileImage> {
        coord.validate()?;

        let url = self.source.url(coord);
        log::debug!("fetching tile {} from {}", coord, url);
        let body = self.http_client.get(&url)?;
        log::trace!("tile {} downloaded ({} bytes)", coord, body.len());

        TileImage::decode(&body)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
