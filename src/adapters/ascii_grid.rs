//! ESRI ASCII grid (`.asc`) reader and writer.

use crate::domain::model::{GeoTransform, Raster};
use crate::utils::error::{ImpactError, Result};
use std::collections::HashMap;
use std::fmt::Write;

const HEADER_KEYS: &[&str] = &[
    "ncols",
    "nrows",
    "xllcorner",
    "yllcorner",
    "xllcenter",
    "yllcenter",
    "cellsize",
    "dx",
    "dy",
    "nodata_value",
];

fn format_error(name: &str, line: usize, message: impl Into<String>) -> ImpactError {
    ImpactError::RasterFormatError {
        source_name: name.to_string(),
        line,
        message: message.into(),
    }
}

pub fn parse(name: &str, content: &str) -> Result<Raster> {
    let mut header: HashMap<String, f64> = HashMap::new();
    let mut lines = content.lines().enumerate().peekable();

    // 讀取檔頭，直到遇到第一行數值資料
    while let Some(&(index, line)) = lines.peek() {
        let mut tokens = line.split_whitespace();
        let Some(key) = tokens.next() else {
            lines.next();
            continue;
        };
        let key = key.to_ascii_lowercase();
        if !HEADER_KEYS.contains(&key.as_str()) {
            break;
        }
        let line_no = index + 1;
        let value = tokens
            .next()
            .ok_or_else(|| format_error(name, line_no, format!("missing value for '{}'", key)))?;
        let value: f64 = value
            .parse()
            .map_err(|_| format_error(name, line_no, format!("invalid number '{}' for '{}'", value, key)))?;
        header.insert(key, value);
        lines.next();
    }

    let required = |key: &str| {
        header
            .get(key)
            .copied()
            .ok_or_else(|| format_error(name, 0, format!("header is missing '{}'", key)))
    };
    let as_count = |key: &str| -> Result<usize> {
        let value = required(key)?;
        if value < 1.0 || value.fract() != 0.0 {
            return Err(format_error(name, 0, format!("'{}' must be a positive integer, got {}", key, value)));
        }
        Ok(value as usize)
    };

    let ncols = as_count("ncols")?;
    let nrows = as_count("nrows")?;
    let (dx, dy) = match (header.get("cellsize"), header.get("dx"), header.get("dy")) {
        (Some(size), _, _) => (*size, *size),
        (None, Some(dx), Some(dy)) => (*dx, *dy),
        _ => return Err(format_error(name, 0, "header needs 'cellsize' or 'dx'/'dy'")),
    };
    let xll = match header.get("xllcorner") {
        Some(x) => *x,
        None => required("xllcenter")? - dx / 2.0,
    };
    let yll = match header.get("yllcorner") {
        Some(y) => *y,
        None => required("yllcenter")? - dy / 2.0,
    };
    let nodata = header.get("nodata_value").copied();

    let mut values = Vec::with_capacity(ncols * nrows);
    for (index, line) in lines {
        for token in line.split_whitespace() {
            let value: f64 = token
                .parse()
                .map_err(|_| format_error(name, index + 1, format!("invalid cell value '{}'", token)))?;
            values.push(value);
        }
    }

    let transform = GeoTransform::new(xll, yll + dy * nrows as f64, dx, -dy);
    Raster::new(name, ncols, nrows, transform, nodata, values)
}

pub fn write(raster: &Raster) -> Result<String> {
    let t = &raster.transform;
    if t.cell_width <= 0.0 || t.cell_height >= 0.0 {
        return Err(format_error(
            &raster.name,
            0,
            "ASCII grids must be north-up with positive cell width",
        ));
    }

    let dx = t.cell_width;
    let dy = -t.cell_height;
    let yll = t.origin_y + t.cell_height * raster.height as f64;

    let mut out = String::new();
    // write! 到 String 不會失敗
    let _ = writeln!(out, "ncols {}", raster.width);
    let _ = writeln!(out, "nrows {}", raster.height);
    let _ = writeln!(out, "xllcorner {}", t.origin_x);
    let _ = writeln!(out, "yllcorner {}", yll);
    if dx == dy {
        let _ = writeln!(out, "cellsize {}", dx);
    } else {
        let _ = writeln!(out, "dx {}", dx);
        let _ = writeln!(out, "dy {}", dy);
    }
    let nodata = raster.nodata_or_default();
    let _ = writeln!(out, "NODATA_value {}", nodata);

    for row in raster.values.chunks(raster.width) {
        let line: Vec<String> = row
            .iter()
            .map(|v| if v.is_nan() { nodata.to_string() } else { v.to_string() })
            .collect();
        let _ = writeln!(out, "{}", line.join(" "));
    }
    Ok(out)
}
