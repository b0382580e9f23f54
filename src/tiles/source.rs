use crate::core::geo::TileCoord;
use crate::{MapError, Result};

/// Standard OpenStreetMap tile server
pub const OSM_URL_TEMPLATE: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";

/// Trait representing anything that can produce tile URLs for a given coordinate.
pub trait TileSource: Send + Sync {
    /// Build a URL for the requested `coord`.
    fn url(&self, coord: TileCoord) -> String;
}

/// URL template with `{z}`, `{x}` and `{y}` placeholders and an optional `{s}`
///
/// `{s}` is replaced by one of the configured subdomains, chosen from the
/// tile address so the same tile always hits the same host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate {
    template: String,
    subdomains: Vec<String>,
}

impl UrlTemplate {
    /// Parse a template, requiring all three coordinate placeholders
    pub fn parse(template: &str) -> Result<Self> {
        for placeholder in ["{z}", "{x}", "{y}"] {
            if !template.contains(placeholder) {
                return Err(MapError::InvalidTemplate(format!(
                    "{} is missing {}",
                    template, placeholder
                )));
            }
        }
        if !(template.starts_with("http://") || template.starts_with("https://")) {
            return Err(MapError::InvalidTemplate(format!(
                "{} is not an http(s) URL",
                template
            )));
        }
        Ok(Self {
            template: template.to_string(),
            subdomains: Vec::new(),
        })
    }

    pub fn with_subdomains(mut self, subdomains: Vec<String>) -> Self {
        self.subdomains = subdomains;
        self
    }

    pub fn template(&self) -> &str {
        &self.template
    }
}

impl TileSource for UrlTemplate {
    fn url(&self, coord: TileCoord) -> String {
        let mut url = self
            .template
            .replace("{z}", &coord.z.to_string())
            .replace("{x}", &coord.x.to_string())
            .replace("{y}", &coord.y.to_string());

        // Guard against empty subdomain list
        if url.contains("{s}") && !self.subdomains.is_empty() {
            let idx = ((u64::from(coord.x) + u64::from(coord.y)) % self.subdomains.len() as u64) as usize;
            url = url.replace("{s}", &self.subdomains[idx]);
        }
        url
    }
}

/// Simple implementation that hits the default OpenStreetMap tile server.
#[derive(Debug, Clone, Default)]
pub struct OpenStreetMapSource;

impl OpenStreetMapSource {
    pub fn new() -> Self {
        Self
    }
}

impl TileSource for OpenStreetMapSource {
    fn url(&self, coord: TileCoord) -> String {
        format!("https://tile.openstreetmap.org/{}/{}/{}.png", coord.z, coord.x, coord.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_osm_url() {
        let url = OpenStreetMapSource::new().url(TileCoord::new(4, 7, 5));
        assert_eq!(url, "https://tile.openstreetmap.org/4/7/5.png");
        assert_eq!(
            UrlTemplate::parse(OSM_URL_TEMPLATE).unwrap().url(TileCoord::new(4, 7, 5)),
            url
        );
    }

    #[test]
    fn test_template_substitution_order() {
        let source = UrlTemplate::parse("https://example.com/tiles/{z}/{y}/{x}.jpg").unwrap();
        assert_eq!(
            source.url(TileCoord::new(12, 2047, 1362)),
            "https://example.com/tiles/12/1362/2047.jpg"
        );
    }

    #[test]
    fn test_subdomains_are_stable() {
        let source = UrlTemplate::parse("https://{s}.tiles.example.com/{z}/{x}/{y}.png")
            .unwrap()
            .with_subdomains(vec!["a".into(), "b".into(), "c".into()]);
        let coord = TileCoord::new(3, 1, 1);
        assert_eq!(source.url(coord), "https://c.tiles.example.com/3/1/1.png");
        assert_eq!(source.url(coord), source.url(coord));
    }

    #[test]
    fn test_rejects_incomplete_template() {
        assert!(matches!(
            UrlTemplate::parse("https://example.com/{z}/{x}.png"),
            Err(MapError::InvalidTemplate(_))
        ));
        assert!(UrlTemplate::parse("ftp://example.com/{z}/{x}/{y}.png").is_err());
    }
}
