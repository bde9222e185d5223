//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This is the single place where INI key names are mapped to struct
//! fields.

use std::path::PathBuf;
use std::str::FromStr;

use ini::{Ini, Properties};

use super::file::ConfigFileError;
use super::settings::ConfigFile;
use crate::provider::{DeliveryMode, RateLimitPolicy, DEFAULT_ARCHIVE_FILENAME};
use crate::coord::{TileCoord, MAX_ZOOM};
use crate::raster::{GridSpec, PixelSize};
use crate::samples::MaskMode;
use crate::targets::{
    IntervalResolver, DEFAULT_DATE_FORMAT, DEFAULT_HALF_WIDTH_DAYS, DEFAULT_PREFIX_LEN,
};

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    if let Some(section) = ini.section(Some("api")) {
        parse_api(section, &mut config)?;
    }
    if let Some(section) = ini.section(Some("search")) {
        parse_search(section, &mut config)?;
    }
    // The ordered item type follows the first searched one unless set.
    if let Some(first) = config.search.item_types.first() {
        config.order.item_type = first.clone();
    }
    if let Some(section) = ini.section(Some("order")) {
        parse_order(section, &mut config)?;
    }
    if let Some(section) = ini.section(Some("samples")) {
        parse_samples(section, &mut config)?;
    }

    // [storage] section
    if let Some(section) = ini.section(Some("storage")) {
        if let Some(v) = non_empty(section, "data_dir") {
            config.storage.data_dir = PathBuf::from(v);
        }
        if let Some(v) = non_empty(section, "targets_dir") {
            config.storage.targets_dir = PathBuf::from(v);
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = non_empty(section, "file") {
            config.logging.file = v.to_string();
        }
        if let Some(v) = section.get("stdout") {
            config.logging.stdout = parse_bool("logging", "stdout", v)?;
        }
    }

    Ok(config)
}

fn parse_api(section: &Properties, config: &mut ConfigFile) -> Result<(), ConfigFileError> {
    if let Some(v) = non_empty(section, "api_key") {
        config.api.api_key = Some(v.to_string());
    }
    if let Some(v) = non_empty(section, "search_url") {
        config.api.search_url = v.to_string();
    }
    if let Some(v) = non_empty(section, "orders_url") {
        config.api.orders_url = v.to_string();
    }
    if let Some(v) = section.get("concurrency") {
        config.api.concurrency = parse_positive("api", "concurrency", v)?;
    }
    if let Some(v) = section.get("timeout_secs") {
        config.api.timeout_secs = parse_number("api", "timeout_secs", v, "expected whole seconds")?;
    }
    if let Some(v) = section.get("max_retries") {
        let v = v.trim();
        config.api.rate_limit = if v.is_empty() || v.eq_ignore_ascii_case("none") {
            RateLimitPolicy::unbounded()
        } else {
            RateLimitPolicy::capped(parse_number(
                "api",
                "max_retries",
                v,
                "expected a retry count or 'none'",
            )?)
        };
    }
    Ok(())
}

fn parse_search(section: &Properties, config: &mut ConfigFile) -> Result<(), ConfigFileError> {
    if let Some(v) = section.get("item_types") {
        let types = parse_list(v);
        if types.is_empty() {
            return Err(invalid("search", "item_types", v, "at least one item type is required"));
        }
        config.search.item_types = types;
    }
    if let Some(v) = section.get("asset_names") {
        config.search.asset_names = parse_list(v);
    }
    if let Some(v) = section.get("max_cloud_cover") {
        let cover: f64 = parse_number("search", "max_cloud_cover", v, "expected a fraction")?;
        if !(0.0..=1.0).contains(&cover) {
            return Err(invalid("search", "max_cloud_cover", v, "must be between 0.0 and 1.0"));
        }
        config.search.max_cloud_cover = cover;
    }

    let mode = section.get("interval").map(|v| v.trim().to_lowercase());
    config.interval = match mode.as_deref() {
        None | Some("filename") => IntervalResolver::FromFilename {
            half_width_days: match section.get("half_width_days") {
                Some(v) => parse_number("search", "half_width_days", v, "expected a number of days")?,
                None => DEFAULT_HALF_WIDTH_DAYS,
            },
            date_format: non_empty(section, "date_format")
                .unwrap_or(DEFAULT_DATE_FORMAT)
                .to_string(),
            prefix_len: match section.get("prefix_len") {
                Some(v) => parse_positive("search", "prefix_len", v)?,
                None => DEFAULT_PREFIX_LEN,
            },
        },
        Some("attributes") => IntervalResolver::FromAttributes {
            start_key: non_empty(section, "start_key").unwrap_or("start").to_string(),
            end_key: non_empty(section, "end_key").unwrap_or("end").to_string(),
        },
        Some(other) => {
            return Err(invalid(
                "search",
                "interval",
                other,
                "must be one of: filename, attributes",
            ))
        }
    };
    Ok(())
}

fn parse_order(section: &Properties, config: &mut ConfigFile) -> Result<(), ConfigFileError> {
    let order = &mut config.order;
    if let Some(v) = non_empty(section, "bucket") {
        order.bucket = v.to_string();
    }
    if let Some(v) = non_empty(section, "credentials") {
        order.credentials = v.to_string();
    }
    if let Some(v) = section.get("path_prefix") {
        order.path_prefix = v.trim().to_string();
    }
    if let Some(v) = non_empty(section, "item_type") {
        order.item_type = v.to_string();
    }
    if let Some(v) = non_empty(section, "product_bundle") {
        order.product_bundle = v.to_string();
    }
    if let Some(v) = section.get("email_on_completion") {
        order.email_on_completion = parse_bool("order", "email_on_completion", v)?;
    }
    if let Some(v) = section.get("subscription_id") {
        order.subscription_id = parse_number("order", "subscription_id", v, "expected a number")?;
    }
    if let Some(v) = section.get("max_order_size") {
        order.max_order_size = parse_positive("order", "max_order_size", v)?;
    }
    if let Some(v) = section.get("dry_run") {
        order.dry_run = parse_bool("order", "dry_run", v)?;
    }

    let single_archive = match section.get("single_archive") {
        Some(v) => parse_bool("order", "single_archive", v)?,
        None => false,
    };
    order.delivery = if single_archive {
        DeliveryMode::SingleArchive {
            archive_filename: non_empty(section, "archive_filename")
                .unwrap_or(DEFAULT_ARCHIVE_FILENAME)
                .to_string(),
        }
    } else {
        DeliveryMode::PerItem
    };
    Ok(())
}

fn parse_samples(section: &Properties, config: &mut ConfigFile) -> Result<(), ConfigFileError> {
    let samples = &mut config.samples;
    if let Some(v) = section.get("zooms") {
        let zooms = parse_list(v)
            .iter()
            .map(|z| parse_number::<u8>("samples", "zooms", z, "expected zoom levels like '14, 15'"))
            .collect::<Result<Vec<_>, _>>()?;
        if zooms.is_empty() {
            return Err(invalid("samples", "zooms", v, "at least one zoom level is required"));
        }
        samples.zooms = zooms;
    }
    if let Some(v) = section.get("truncate") {
        samples.truncate = parse_bool("samples", "truncate", v)?;
    }
    let mut pixel_size = PixelSize::default();
    if let Some(v) = section.get("pixel_size_x") {
        pixel_size.x = parse_nonzero("samples", "pixel_size_x", v)?;
    }
    if let Some(v) = section.get("pixel_size_y") {
        pixel_size.y = parse_nonzero("samples", "pixel_size_y", v)?;
    }
    samples.pixel_size = pixel_size;
    if let Some(v) = section.get("training") {
        samples.training = parse_bool("samples", "training", v)?;
    }
    if let Some(v) = section.get("mask_mode") {
        samples.mask_mode = match v.trim().to_lowercase().as_str() {
            "binary" => MaskMode::Binary,
            "multiclass" => MaskMode::Multiclass,
            _ => {
                return Err(invalid(
                    "samples",
                    "mask_mode",
                    v,
                    "must be one of: binary, multiclass",
                ))
            }
        };
    }
    if let Some(v) = non_empty(section, "quality_suffix") {
        samples.quality_suffix = v.to_string();
    }
    if let Some(v) = non_empty(section, "raster_extension") {
        samples.raster_extension = if v.starts_with('.') {
            v.to_string()
        } else {
            format!(".{}", v)
        };
    }
    if let Some(v) = section.get("parallel_tiles") {
        samples.parallel_tiles = parse_bool("samples", "parallel_tiles", v)?;
    }

    // Every zoom's tile grid must be allocatable at this pixel size
    for &zoom in &samples.zooms {
        let tile = TileCoord {
            row: 0,
            col: 0,
            zoom: zoom.min(MAX_ZOOM),
        };
        if let Err(e) = GridSpec::for_tile(&tile, samples.pixel_size) {
            return Err(invalid("samples", "zooms", &zoom.to_string(), &e.to_string()));
        }
    }
    Ok(())
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn non_empty<'a>(section: &'a Properties, key: &str) -> Option<&'a str> {
    section.get(key).map(str::trim).filter(|v| !v.is_empty())
}

/// Comma-separated values, trimmed, empties dropped.
fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_bool(section: &str, key: &str, value: &str) -> Result<bool, ConfigFileError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(invalid(section, key, value, "must be true or false")),
    }
}

fn parse_number<T: FromStr>(
    section: &str,
    key: &str,
    value: &str,
    reason: &str,
) -> Result<T, ConfigFileError> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(section, key, value, reason))
}

fn parse_positive(section: &str, key: &str, value: &str) -> Result<usize, ConfigFileError> {
    match parse_number::<usize>(section, key, value, "must be a positive integer")? {
        0 => Err(invalid(section, key, value, "must be a positive integer")),
        n => Ok(n),
    }
}

fn parse_nonzero(section: &str, key: &str, value: &str) -> Result<f64, ConfigFileError> {
    let n: f64 = parse_number(section, key, value, "expected metres per pixel")?;
    if n == 0.0 || !n.is_finite() {
        return Err(invalid(section, key, value, "must be a non-zero number"));
    }
    Ok(n)
}
