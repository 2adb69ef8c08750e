//! Per-resource metadata: image counts, frame sizes and compatible palettes, keyed by bare file
//! name.

use std::{collections::HashMap, path::Path};

use crate::{
    error::{Error, Result},
    settings::Settings,
};

pub const DEFAULT_PALETTE: &str = "town";

const PALETTES_GROUP: &str = "palettes";
const TRANSITIONS_GROUP: &str = "transitions";

const BUNDLED_PROPERTIES: &str = include_str!("../assets/properties.ini");

/// Frame indices a dimension override applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameRange {
    Single(usize),
    /// Both ends included
    Inclusive(usize, usize),
}

impl FrameRange {
    pub fn contains(&self, index: usize) -> bool {
        match *self {
            FrameRange::Single(i) => i == index,
            FrameRange::Inclusive(first, last) => (first..=last).contains(&index),
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s.split_once('-') {
            Some((first, last)) => {
                let first = first.trim().parse().ok()?;
                let last = last.trim().parse().ok()?;
                (first <= last).then_some(FrameRange::Inclusive(first, last))
            }
            None => s.trim().parse().ok().map(FrameRange::Single),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyRecord {
    pub image_count: usize,
    pub frame_header_size: usize,
    pub width: u32,
    pub height: u32,
    /// Checked in order, first match wins
    pub width_overrides: Vec<(FrameRange, u32)>,
    pub height_overrides: Vec<(FrameRange, u32)>,
    pub palettes: Vec<String>,
    pub transitions: Vec<String>,
}

impl PropertyRecord {
    pub fn frame_width(&self, index: usize) -> u32 {
        lookup_override(&self.width_overrides, index).unwrap_or(self.width)
    }

    pub fn frame_height(&self, index: usize) -> u32 {
        lookup_override(&self.height_overrides, index).unwrap_or(self.height)
    }

    pub fn supports_palette(&self, palette: &str) -> bool {
        self.palettes.iter().any(|p| p.eq_ignore_ascii_case(palette))
    }

    pub fn supports_transition(&self, transition: &str) -> bool {
        self.transitions
            .iter()
            .any(|t| t.eq_ignore_ascii_case(transition))
    }
}

fn lookup_override(overrides: &[(FrameRange, u32)], index: usize) -> Option<u32> {
    overrides
        .iter()
        .find(|(range, _)| range.contains(index))
        .map(|(_, value)| *value)
}

fn parse_number<T: std::str::FromStr>(settings: &Settings, key: &str) -> Result<Option<T>> {
    settings
        .value(key)
        .map(|v| {
            v.parse().map_err(|_| Error::InvalidProperty {
                key: key.to_string(),
                reason: format!("{v:?} is not a valid number"),
            })
        })
        .transpose()
}

fn required_number<T: std::str::FromStr>(settings: &Settings, key: &str) -> Result<T> {
    parse_number(settings, key)?.ok_or_else(|| Error::InvalidProperty {
        key: key.to_string(),
        reason: "missing".to_string(),
    })
}

fn parse_overrides(
    settings: &Settings,
    group: &str,
    dimension: &str,
) -> Result<Vec<(FrameRange, u32)>> {
    let prefix = format!("{dimension}.");
    settings
        .group_keys(group)
        .filter_map(|key| key.strip_prefix(prefix.as_str()).map(|range| (key, range)))
        .map(|(key, range)| {
            let full_key = format!("{group}/{key}");
            let range = FrameRange::parse(range).ok_or_else(|| Error::InvalidProperty {
                key: full_key.clone(),
                reason: format!("{range:?} is not a frame index or range"),
            })?;
            let value = required_number(settings, &full_key)?;
            Ok((range, value))
        })
        .collect()
}

fn parse_record(settings: &Settings, group: &str) -> Result<PropertyRecord> {
    let key = |field: &str| format!("{group}/{field}");

    let image_count = parse_number(settings, &key("images"))?.unwrap_or(1);
    if image_count == 0 {
        return Err(Error::InvalidProperty {
            key: key("images"),
            reason: "must be at least 1".to_string(),
        });
    }

    Ok(PropertyRecord {
        image_count,
        frame_header_size: parse_number(settings, &key("header"))?.unwrap_or(0),
        width: required_number(settings, &key("width"))?,
        height: required_number(settings, &key("height"))?,
        width_overrides: parse_overrides(settings, group, "width")?,
        height_overrides: parse_overrides(settings, group, "height")?,
        palettes: settings
            .value_list(&key("palettes"))
            .filter(|list| !list.is_empty())
            .unwrap_or_else(|| vec![DEFAULT_PALETTE.to_string()]),
        transitions: settings
            .value_list(&key("transitions"))
            .unwrap_or_default(),
    })
}

fn name_map(settings: &Settings, group: &str) -> HashMap<String, String> {
    settings
        .group_keys(group)
        .filter_map(|name| {
            settings
                .value(&format!("{group}/{name}"))
                .map(|path| (name.to_ascii_lowercase(), path.to_string()))
        })
        .collect()
}

/// Read-only lookup over the property database
#[derive(Debug, Clone, Default)]
pub struct PropertyRegistry {
    records: HashMap<String, PropertyRecord>,
    palette_paths: HashMap<String, String>,
    transition_paths: HashMap<String, String>,
}

impl PropertyRegistry {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let records = settings
            .groups()
            .into_iter()
            .filter(|g| *g != PALETTES_GROUP && *g != TRANSITIONS_GROUP)
            .map(|g| parse_record(settings, g).map(|record| (g.to_string(), record)))
            .collect::<Result<HashMap<_, _>>>()?;

        Ok(Self {
            records,
            palette_paths: name_map(settings, PALETTES_GROUP),
            transition_paths: name_map(settings, TRANSITIONS_GROUP),
        })
    }

    pub fn parse(contents: &str) -> Result<Self> {
        Self::from_settings(&Settings::parse(contents)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::from_settings(&Settings::load(path)?)
    }

    /// The property database shipped with the crate
    pub fn bundled() -> Result<Self> {
        Self::parse(BUNDLED_PROPERTIES)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.records.contains_key(&name.to_ascii_lowercase())
    }

    pub fn record(&self, name: &str) -> Result<&PropertyRecord> {
        self.records
            .get(&name.to_ascii_lowercase())
            .ok_or_else(|| Error::MissingProperties(name.to_string()))
    }

    /// Record for an image alias, falling back to the file it came from
    pub fn record_for(&self, alias: &str, file_name: &str) -> Result<&PropertyRecord> {
        self.record(alias).or_else(|_| self.record(file_name))
    }

    pub fn image_count(&self, name: &str) -> Result<usize> {
        Ok(self.record(name)?.image_count)
    }

    pub fn frame_header_size(&self, name: &str) -> Result<usize> {
        Ok(self.record(name)?.frame_header_size)
    }

    pub fn frame_width(&self, name: &str, index: usize) -> Result<u32> {
        Ok(self.record(name)?.frame_width(index))
    }

    pub fn frame_height(&self, name: &str, index: usize) -> Result<u32> {
        Ok(self.record(name)?.frame_height(index))
    }

    pub fn palette_names(&self, name: &str) -> Result<&[String]> {
        Ok(&self.record(name)?.palettes)
    }

    pub fn transition_names(&self, name: &str) -> Result<&[String]> {
        Ok(&self.record(name)?.transitions)
    }

    /// Archive path of a named palette
    pub fn palette_path(&self, palette: &str) -> Option<&str> {
        self.palette_paths
            .get(&palette.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Archive path of a named color transition
    pub fn transition_path(&self, transition: &str) -> Option<&str> {
        self.transition_paths
            .get(&transition.to_ascii_lowercase())
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const SAMPLE: &str = r#"
[palettes]
town = levels\towndata\town.pal
l1 = levels\l1data\l1.pal

[transitions]
red = monsters\red.trn

[objcurs.cel]
width = 28
height = 28
width.10-12 = 56
width.11 = 99
height.12 = 84
palettes = town, l1
transitions = red

[wlsas.cl2]
images = 8
header = 10
width = 96
height = 96
"#;

    #[test]
    fn defaults() {
        let registry = PropertyRegistry::parse(SAMPLE).unwrap();

        assert_eq!(registry.image_count("wlsas.cl2").unwrap(), 8);
        assert_eq!(registry.frame_header_size("wlsas.cl2").unwrap(), 10);
        assert_eq!(registry.image_count("objcurs.cel").unwrap(), 1);
        assert_eq!(registry.frame_header_size("objcurs.cel").unwrap(), 0);
        assert_eq!(registry.palette_names("wlsas.cl2").unwrap(), &["town"]);
        assert!(registry.transition_names("wlsas.cl2").unwrap().is_empty());
    }

    #[test]
    fn overrides_first_match_wins() {
        let registry = PropertyRegistry::parse(SAMPLE).unwrap();

        assert_eq!(registry.frame_width("objcurs.cel", 0).unwrap(), 28);
        assert_eq!(registry.frame_width("objcurs.cel", 10).unwrap(), 56);
        // The range is listed before the single index
        assert_eq!(registry.frame_width("objcurs.cel", 11).unwrap(), 56);
        assert_eq!(registry.frame_width("objcurs.cel", 13).unwrap(), 28);
        assert_eq!(registry.frame_height("objcurs.cel", 12).unwrap(), 84);
        assert_eq!(registry.frame_height("objcurs.cel", 11).unwrap(), 28);
    }

    #[test]
    fn lookups_are_case_insensitive() {
        let registry = PropertyRegistry::parse(SAMPLE).unwrap();
        assert!(registry.contains("OBJCURS.CEL"));
        assert_eq!(registry.palette_path("Town"), Some("levels\\towndata\\town.pal"));
        assert_eq!(registry.transition_path("red"), Some("monsters\\red.trn"));
        assert_eq!(
            registry.palette_names("objcurs.cel").unwrap(),
            &["town", "l1"]
        );
    }

    #[test]
    fn alias_falls_back_to_file() {
        let registry = PropertyRegistry::parse(SAMPLE).unwrap();
        let record = registry.record_for("wlsas3.cl2", "wlsas.cl2").unwrap();
        assert_eq!(record.width, 96);
    }

    #[test]
    fn missing_records_and_fields() {
        let registry = PropertyRegistry::parse(SAMPLE).unwrap();
        assert!(matches!(
            registry.record("nope.cel"),
            Err(Error::MissingProperties(_))
        ));

        let err = PropertyRegistry::parse("[a.cel]\nwidth = 3\n").unwrap_err();
        assert!(matches!(err, Error::InvalidProperty { key, .. } if key == "a.cel/height"));

        let err = PropertyRegistry::parse("[a.cel]\nwidth = 3\nheight = x\n").unwrap_err();
        assert!(matches!(err, Error::InvalidProperty { .. }));
    }

    #[test]
    fn bundled_database_parses() {
        let registry = PropertyRegistry::bundled().unwrap();
        for level in ["l1.cel", "l2.cel", "l3.cel", "l4.cel", "town.cel"] {
            assert_eq!(registry.frame_width(level, 0).unwrap(), 32);
            assert_eq!(registry.frame_height(level, 0).unwrap(), 32);
        }
        assert!(registry.palette_path("town").is_some());
    }
}
