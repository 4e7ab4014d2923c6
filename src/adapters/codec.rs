use crate::adapters::ascii_grid;
use crate::domain::model::Raster;
use crate::domain::ports::RasterCodec;
use crate::utils::error::{ImpactError, Result};

pub const SUPPORTED_FORMATS: &[&str] = &["asc", "json"];

/// Plain-text raster formats: ESRI ASCII grid and the JSON raster document.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextRasterCodec;

impl TextRasterCodec {
    pub fn format_of(path: &str) -> String {
        std::path::Path::new(path)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_default()
    }
}

impl RasterCodec for TextRasterCodec {
    fn decode(&self, name: &str, format: &str, bytes: &[u8]) -> Result<Raster> {
        let text = std::str::from_utf8(bytes).map_err(|e| ImpactError::RasterFormatError {
            source_name: name.to_string(),
            line: 0,
            message: format!("not UTF-8 text: {}", e),
        })?;

        match format {
            "asc" => ascii_grid::parse(name, text),
            "json" => {
                let mut raster: Raster = serde_json::from_str(text)?;
                if raster.name.is_empty() {
                    raster.name = name.to_string();
                }
                raster.check_shape()?;
                Ok(raster)
            }
            other => Err(ImpactError::RasterFormatError {
                source_name: name.to_string(),
                line: 0,
                message: format!(
                    "unsupported raster format '{}', expected one of {}",
                    other,
                    SUPPORTED_FORMATS.join(", ")
                ),
            }),
        }
    }

    fn encode(&self, raster: &Raster, format: &str) -> Result<Vec<u8>> {
        match format {
            "asc" => Ok(ascii_grid::write(raster)?.into_bytes()),
            "json" => Ok(serde_json::to_vec_pretty(raster)?),
            other => Err(ImpactError::RasterFormatError {
                source_name: raster.name.clone(),
                line: 0,
                message: format!("cannot encode raster as '{}'", other),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::GeoTransform;

    #[test]
    fn test_format_of() {
        assert_eq!(TextRasterCodec::format_of("data/Depth.ASC"), "asc");
        assert_eq!(TextRasterCodec::format_of("people.json"), "json");
        assert_eq!(TextRasterCodec::format_of("noext"), "");
    }

    #[test]
    fn test_json_document_is_shape_checked() {
        let doc = r#"{
            "name": "people",
            "width": 2,
            "height": 2,
            "transform": {"origin_x": 0.0, "origin_y": 2.0, "cell_width": 1.0, "cell_height": -1.0},
            "nodata": null,
            "values": [1.0, 2.0, 3.0]
        }"#;

        let err = TextRasterCodec.decode("people.json", "json", doc.as_bytes()).unwrap_err();
        assert!(matches!(err, ImpactError::RasterShapeError { .. }));
    }

    #[test]
    fn test_json_encode_decode() {
        let raster = Raster::new("grid", 1, 2, GeoTransform::north_up(0.0, 2.0, 1.0), Some(-1.0), vec![3.0, 4.0])
            .unwrap()
            .with_crs("EPSG:4326");
        let bytes = TextRasterCodec.encode(&raster, "json").unwrap();
        let decoded = TextRasterCodec.decode("grid.json", "json", &bytes).unwrap();
        assert_eq!(decoded, raster);
    }

    #[test]
    fn test_unsupported_format() {
        assert!(matches!(
            TextRasterCodec.decode("x.tif", "tif", b""),
            Err(ImpactError::RasterFormatError { .. })
        ));
    }
}
