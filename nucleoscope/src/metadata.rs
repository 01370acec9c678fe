//! Experiment metadata inferred from file and folder naming conventions.
//!
//! Folder names carry the biological context (`istl_mutant_elongation_zone/`),
//! file names carry the replicate and acquisition indices
//! (`h2b-istl345_seedling12_elong_z16c1.tif`). Nothing here touches the
//! filesystem: every field is a pure function of the path string.

#[cfg(test)]
mod tests;

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

static SEEDLING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"seedling(\d+)").expect("valid regex"));
static ZSLICE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_z(\d+)").expect("valid regex"));
static CHANNEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"c(\d+)$").expect("valid regex"));

/// Channel label used when the file name does not carry one.
pub const UNKNOWN_CHANNEL: &str = "unknown";

/// Root zone the image was acquired in.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Display,
    AsRefStr,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    Meristem,
    Elongation,
    #[default]
    Unknown,
}

impl Region {
    /// Keywords in match preference order.
    const KEYWORDS: [(&'static str, Region); 2] = [
        ("meristem", Region::Meristem),
        ("elongation", Region::Elongation),
    ];
}

/// Plant line the seedling belongs to.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Display,
    AsRefStr,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Genotype {
    Control,
    Mutant,
    #[default]
    Unknown,
}

impl Genotype {
    const KEYWORDS: [(&'static str, Genotype); 2] = [
        ("control", Genotype::Control),
        ("mutant", Genotype::Mutant),
    ];
}

/// Acquisition settings fixed by the imaging protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Acquisition {
    pub magnification: String,
    pub fluorophore: String,
}

impl Default for Acquisition {
    fn default() -> Self {
        Self {
            magnification: "40x".to_string(),
            fluorophore: "mCherry-H2B".to_string(),
        }
    }
}

/// Metadata of one image file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageMetadata {
    pub path: PathBuf,
    pub region: Region,
    pub genotype: Genotype,
    /// Seedling number; the biological replicate.
    pub seedling: Option<u32>,
    /// Optical section index. `None` for stitched / maximum-projection images.
    pub zslice: Option<u32>,
    pub channel: String,
    pub magnification: String,
    pub fluorophore: String,
}

impl ImageMetadata {
    /// Infer metadata from `path`.
    ///
    /// Region and genotype are searched in every path component; seedling,
    /// z-slice and channel only in the file name. Fields that cannot be
    /// inferred degrade to `Unknown` / `None` / `"unknown"`.
    pub fn from_path(path: &Path, acquisition: &Acquisition) -> Self {
        let components: Vec<String> = path
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_lowercase())
            .collect();

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let file_stem = path
            .file_stem()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        Self {
            path: path.to_path_buf(),
            region: match_keyword(&components, &Region::KEYWORDS).unwrap_or_default(),
            genotype: match_keyword(&components, &Genotype::KEYWORDS).unwrap_or_default(),
            seedling: capture_number(&SEEDLING_RE, &file_name),
            zslice: capture_number(&ZSLICE_RE, &file_name),
            channel: parse_channel(&file_stem),
            magnification: acquisition.magnification.clone(),
            fluorophore: acquisition.fluorophore.clone(),
        }
    }

    /// True for stitched / maximum-projection images (no z-slice index).
    pub fn is_projection(&self) -> bool {
        self.zslice.is_none()
    }

    /// Path as stored in result records.
    pub fn filename(&self) -> String {
        self.path.display().to_string()
    }
}

/// First keyword, in preference order, contained in any component.
fn match_keyword<T: Copy>(components: &[String], keywords: &[(&str, T)]) -> Option<T> {
    keywords
        .iter()
        .find(|(keyword, _)| components.iter().any(|c| c.contains(keyword)))
        .map(|&(_, value)| value)
}

fn capture_number(re: &Regex, text: &str) -> Option<u32> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// `c<digits>` ending the file stem, i.e. right before the extension.
fn parse_channel(file_stem: &str) -> String {
    CHANNEL_RE
        .captures(file_stem)
        .and_then(|caps| caps.get(1))
        .map(|m| format!("c{}", m.as_str()))
        .unwrap_or_else(|| UNKNOWN_CHANNEL.to_string())
}
