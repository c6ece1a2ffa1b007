//! Manifest data model.
//!
//! A [`Manifest`] owns its driver and layer records. Each record carries the
//! module's identifying properties, the resolved library path, optional
//! enable/disable environment gates and its function map. The library
//! itself is loaded lazily on first binding and cached in the record.

use std::cell::OnceCell;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use uuid::Uuid;

use crate::platform::LoadedLibrary;

/// `major.minor.patch` version triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct Version {
    /// Major component
    pub major: u32,
    /// Minor component
    pub minor: u32,
    /// Patch component
    pub patch: u32,
}

impl Version {
    /// Build a version from its components.
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse `major.minor.patch`.
    ///
    /// Components are read left to right and reading stops at the first one
    /// that is not a plain decimal number; missing components are zero. Only
    /// the major component is required.
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts = [0u32; 3];
        let mut read = 0;
        for (slot, component) in parts.iter_mut().zip(text.split('.')) {
            if component.is_empty() || !component.bytes().all(|b| b.is_ascii_digit()) {
                break;
            }
            match component.parse() {
                Ok(value) => *slot = value,
                Err(_) => break,
            }
            read += 1;
        }
        if read == 0 {
            return None;
        }
        Some(Self::new(parts[0], parts[1], parts[2]))
    }

    /// Pack as `major << 22 | minor << 12 | patch`.
    pub fn packed(&self) -> u32 {
        (self.major << 22) | ((self.minor & 0x3FF) << 12) | (self.patch & 0xFFF)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Identifying properties of a driver.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DriverProperties {
    /// Driver UUID
    pub uuid: Uuid,
    /// Short identifier (`id`)
    pub driver_id: String,
    /// Lookup name (`name`)
    pub driver_name: String,
    /// Human readable name
    pub display_name: String,
    /// Free-form description
    pub description: String,
    /// API version the driver implements
    pub api_version: Version,
    /// Driver's own version
    pub impl_version: Version,
}

/// Identifying properties of a layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LayerProperties {
    /// Layer UUID
    pub uuid: Uuid,
    /// Lookup name (`name`)
    pub layer_name: String,
    /// Human readable name
    pub display_name: String,
    /// Free-form description
    pub description: String,
    /// API version the layer implements
    pub api_version: Version,
    /// Layer's own version
    pub impl_version: Version,
}

/// Properties that can be looked up by name.
pub trait RecordProperties: Clone {
    /// Name used for lookup during binding.
    fn name(&self) -> &str;
}

impl RecordProperties for DriverProperties {
    fn name(&self) -> &str {
        &self.driver_name
    }
}

impl RecordProperties for LayerProperties {
    fn name(&self) -> &str {
        &self.layer_name
    }
}

/// One `original -> mapped` symbol rename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionMapping {
    /// Symbol name the loader asks for.
    pub original: String,
    /// Symbol name actually exported by the library.
    pub mapped: String,
}

/// Symbol renames declared by a manifest record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FunctionMap {
    entries: Vec<FunctionMapping>,
}

impl FunctionMap {
    pub(crate) fn from_entries(entries: Vec<FunctionMapping>) -> Self {
        Self { entries }
    }

    /// Name to look up for `symbol`, after applying the map.
    pub fn resolve<'a>(&'a self, symbol: &'a str) -> &'a str {
        self.entries
            .iter()
            .find(|entry| entry.original == symbol)
            .map_or(symbol, |entry| entry.mapped.as_str())
    }

    /// All mappings, in declaration order.
    pub fn entries(&self) -> &[FunctionMapping] {
        &self.entries
    }

    /// Number of mappings.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is remapped.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A driver or layer registration.
pub struct ManifestRecord<P> {
    pub(crate) properties: P,
    pub(crate) library_path: PathBuf,
    pub(crate) enable_environment: Option<String>,
    pub(crate) disable_environment: Option<String>,
    pub(crate) functions: FunctionMap,
    pub(crate) library: OnceCell<Box<dyn LoadedLibrary>>,
}

/// A driver registration.
pub type DriverRecord = ManifestRecord<DriverProperties>;

/// A layer registration.
pub type LayerRecord = ManifestRecord<LayerProperties>;

impl<P> ManifestRecord<P> {
    /// Identifying properties.
    pub fn properties(&self) -> &P {
        &self.properties
    }

    /// Resolved library path.
    pub fn library_path(&self) -> &Path {
        &self.library_path
    }

    /// Variable that must be set for the record to be visible implicitly.
    pub fn enable_environment(&self) -> Option<&str> {
        self.enable_environment.as_deref()
    }

    /// Variable that hides the record from implicit enumeration when set.
    pub fn disable_environment(&self) -> Option<&str> {
        self.disable_environment.as_deref()
    }

    /// Declared symbol renames.
    pub fn functions(&self) -> &FunctionMap {
        &self.functions
    }

    /// Returns true once the library has been loaded for binding.
    pub fn is_loaded(&self) -> bool {
        self.library.get().is_some()
    }

    /// Path reported by the loaded library, if it has been loaded.
    pub fn loaded_path(&self) -> Option<&Path> {
        self.library.get().map(|library| library.path())
    }
}

impl<P: fmt::Debug> fmt::Debug for ManifestRecord<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManifestRecord")
            .field("properties", &self.properties)
            .field("library_path", &self.library_path)
            .field("enable_environment", &self.enable_environment)
            .field("disable_environment", &self.disable_environment)
            .field("functions", &self.functions)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

/// Maximum byte lengths of bounded string fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLimits {
    /// `id`
    pub max_id_length: usize,
    /// `name`
    pub max_name_length: usize,
    /// `display_name`
    pub max_display_name_length: usize,
    /// `description`
    pub max_description_length: usize,
}

impl Default for FieldLimits {
    fn default() -> Self {
        Self {
            max_id_length: 32,
            max_name_length: 64,
            max_display_name_length: 256,
            max_description_length: 256,
        }
    }
}

/// Options controlling manifest construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ManifestOptions {
    /// Discard records that fail validation instead of failing the manifest.
    pub skip_invalid_records: bool,
    /// Bounds for string fields.
    pub field_limits: FieldLimits,
}

impl ManifestOptions {
    /// Options that skip invalid records.
    pub fn lenient() -> Self {
        Self {
            skip_invalid_records: true,
            ..Self::default()
        }
    }
}

/// A parsed driver/layer manifest.
#[derive(Debug)]
pub struct Manifest {
    pub(crate) path: PathBuf,
    pub(crate) search_path: Option<PathBuf>,
    pub(crate) format_version: Version,
    pub(crate) defined_driver_count: usize,
    pub(crate) defined_layer_count: usize,
    pub(crate) drivers: Vec<DriverRecord>,
    pub(crate) layers: Vec<LayerRecord>,
}

impl Manifest {
    /// Path of the manifest file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory relative library paths are resolved against.
    pub fn search_path(&self) -> Option<&Path> {
        self.search_path.as_deref()
    }

    /// Declared `file_format_version`.
    pub fn format_version(&self) -> Version {
        self.format_version
    }

    /// Number of driver entries declared in the document.
    pub fn defined_driver_count(&self) -> usize {
        self.defined_driver_count
    }

    /// Number of driver entries that parsed successfully.
    pub fn valid_driver_count(&self) -> usize {
        self.drivers.len()
    }

    /// Number of layer entries declared in the document.
    pub fn defined_layer_count(&self) -> usize {
        self.defined_layer_count
    }

    /// Number of layer entries that parsed successfully.
    pub fn valid_layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Valid driver records.
    pub fn drivers(&self) -> &[DriverRecord] {
        &self.drivers
    }

    /// Valid layer records.
    pub fn layers(&self) -> &[LayerRecord] {
        &self.layers
    }

    /// Driver record by exact name.
    pub fn driver(&self, name: &str) -> Option<&DriverRecord> {
        self.drivers.iter().find(|d| d.properties.name() == name)
    }

    /// Layer record by exact name.
    pub fn layer(&self, name: &str) -> Option<&LayerRecord> {
        self.layers.iter().find(|l| l.properties.name() == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_parse() {
        assert_eq!(Version::parse("1.2.3"), Some(Version::new(1, 2, 3)));
        assert_eq!(Version::parse("4"), Some(Version::new(4, 0, 0)));
        assert_eq!(Version::parse("4.1"), Some(Version::new(4, 1, 0)));
        assert_eq!(Version::parse("1.x.3"), Some(Version::new(1, 0, 0)));
        assert_eq!(Version::parse("0.0.0"), Some(Version::default()));
        assert_eq!(Version::parse("x.1.2"), None);
        assert_eq!(Version::parse(""), None);
        assert_eq!(Version::parse("-1.0.0"), None);
    }

    #[test]
    fn test_version_packed_and_display() {
        let v = Version::new(1, 2, 3);
        assert_eq!(v.packed(), (1 << 22) | (2 << 12) | 3);
        assert_eq!(v.to_string(), "1.2.3");
        assert!(Version::new(1, 0, 0) > Version::new(0, 9, 9));
    }

    #[test]
    fn test_function_map_resolve() {
        let map = FunctionMap::from_entries(vec![FunctionMapping {
            original: "skGetDriverProcAddr".into(),
            mapped: "fooGetDriverProcAddr".into(),
        }]);
        assert_eq!(map.resolve("skGetDriverProcAddr"), "fooGetDriverProcAddr");
        assert_eq!(map.resolve("skGetInstanceProcAddr"), "skGetInstanceProcAddr");
        assert_eq!(map.len(), 1);
        assert!(FunctionMap::default().is_empty());
    }
}
