//! Manifest construction from a parsed JSON document (format 1.0.0).
//!
//! Each driver/layer entry is read into a local staging record and only
//! committed to the manifest once every field has validated. A failure
//! drops the staging record, so a partially filled record never occupies a
//! counted slot.

use std::cell::OnceCell;
use std::mem::size_of;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

use super::types::{
    DriverProperties, DriverRecord, FieldLimits, FunctionMap, FunctionMapping, LayerProperties,
    LayerRecord, Manifest, ManifestOptions, ManifestRecord, Version,
};
use crate::alloc::{copy_str, DefaultAllocator, HostAllocator};
use crate::error::{ErrorCode, SkResult};
use crate::json::{self, JsonObject, JsonValue, Limits};
use crate::platform::{combine_paths, file_exists, is_absolute_path, remove_path_stem};

/// Highest manifest format this parser understands.
pub const MANIFEST_FORMAT_VERSION: Version = Version::new(1, 0, 0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordKind {
    Driver,
    Layer,
}

impl RecordKind {
    fn label(self) -> &'static str {
        match self {
            RecordKind::Driver => "driver",
            RecordKind::Layer => "layer",
        }
    }

    fn not_found(self, what: String) -> ErrorCode {
        match self {
            RecordKind::Driver => ErrorCode::DriverNotFound(what),
            RecordKind::Layer => ErrorCode::LayerNotFound(what),
        }
    }
}

fn invalid(reason: impl Into<String>) -> ErrorCode {
    ErrorCode::ManifestInvalid(reason.into())
}

/// Entries under `single` XOR `plural`.
fn entries<'j>(
    root: &'j JsonObject,
    single: &str,
    plural: &str,
) -> SkResult<&'j [JsonValue]> {
    match (root.get(single), root.get(plural)) {
        (Some(_), Some(_)) => Err(invalid(format!(
            "both '{single}' and '{plural}' are present"
        ))),
        (Some(value @ JsonValue::Object(_)), None) => Ok(std::slice::from_ref(value)),
        (Some(value), None) => Err(invalid(format!(
            "'{single}' must be an object, found {}",
            value.type_name()
        ))),
        (None, Some(JsonValue::Array(items))) => Ok(items),
        (None, Some(value)) => Err(invalid(format!(
            "'{plural}' must be an array, found {}",
            value.type_name()
        ))),
        (None, None) => Ok(&[]),
    }
}

/// Typed field access over one driver/layer object.
struct Fields<'j, 'a> {
    object: &'j JsonObject,
    alloc: &'a dyn HostAllocator,
}

impl<'j> Fields<'j, '_> {
    fn optional_str(&self, key: &str) -> SkResult<Option<&'j str>> {
        match self.object.get(key) {
            None => Ok(None),
            Some(JsonValue::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(ErrorCode::ManifestUnexpectedType {
                field: key.to_string(),
                expected: "string",
                found: other.type_name(),
            }),
        }
    }

    fn required_str(&self, key: &str) -> SkResult<&'j str> {
        self.optional_str(key)?
            .ok_or_else(|| invalid(format!("missing required field '{key}'")))
    }

    fn bounded(&self, key: &'static str, limit: usize) -> SkResult<String> {
        let value = self.required_str(key)?;
        if value.len() > limit {
            return Err(ErrorCode::ManifestOverflow {
                field: key,
                length: value.len(),
                limit,
            });
        }
        copy_str(value, self.alloc)
    }

    fn optional_owned(&self, key: &str) -> SkResult<Option<String>> {
        self.optional_str(key)?
            .map(|s| copy_str(s, self.alloc))
            .transpose()
    }

    fn uuid(&self) -> SkResult<Uuid> {
        let text = self.required_str("uuid")?;
        Uuid::parse_str(text).map_err(|e| invalid(format!("malformed uuid '{text}': {e}")))
    }

    fn version(&self, key: &str) -> SkResult<Version> {
        let text = self.required_str(key)?;
        Version::parse(text).ok_or_else(|| invalid(format!("malformed version '{key}': '{text}'")))
    }

    fn functions(&self) -> SkResult<FunctionMap> {
        let object = match self.object.get("functions") {
            Some(JsonValue::Object(o)) => o,
            Some(other) => {
                return Err(ErrorCode::ManifestUnexpectedType {
                    field: "functions".to_string(),
                    expected: "object",
                    found: other.type_name(),
                })
            }
            None => return Err(invalid("missing required field 'functions'")),
        };

        self.alloc
            .allocate(object.len().saturating_mul(size_of::<FunctionMapping>()))?;
        let mut mappings = Vec::new();
        mappings
            .try_reserve_exact(object.len())
            .map_err(|_| ErrorCode::OutOfHostMemory)?;
        for (original, value) in object.iter() {
            let mapped = value
                .try_as_str()
                .ok_or_else(|| ErrorCode::ManifestUnexpectedType {
                    field: format!("functions.{original}"),
                    expected: "string",
                    found: value.type_name(),
                })?;
            mappings.push(FunctionMapping {
                original: copy_str(original, self.alloc)?,
                mapped: copy_str(mapped, self.alloc)?,
            });
        }
        Ok(FunctionMap::from_entries(mappings))
    }
}

/// Inputs shared by every record of one manifest.
struct RecordContext<'a> {
    search_path: Option<&'a Path>,
    limits: FieldLimits,
    alloc: &'a dyn HostAllocator,
}

impl RecordContext<'_> {
    fn library_path(&self, fields: &Fields<'_, '_>, kind: RecordKind) -> SkResult<PathBuf> {
        let declared = Path::new(fields.required_str("library_path")?);
        let resolved = match self.search_path {
            Some(base) if !is_absolute_path(declared) => combine_paths(base, declared),
            _ => declared.to_path_buf(),
        };
        if !file_exists(&resolved) {
            return Err(kind.not_found(resolved.display().to_string()));
        }
        Ok(resolved)
    }

    fn record<P>(
        &self,
        fields: &Fields<'_, '_>,
        kind: RecordKind,
        build: impl FnOnce(&Fields<'_, '_>) -> SkResult<P>,
    ) -> SkResult<ManifestRecord<P>> {
        let library_path = self.library_path(fields, kind)?;
        let properties = build(fields)?;
        let functions = fields.functions()?;
        let enable_environment = fields.optional_owned("enable_environment")?;
        let disable_environment = fields.optional_owned("disable_environment")?;
        Ok(ManifestRecord {
            properties,
            library_path,
            enable_environment,
            disable_environment,
            functions,
            library: OnceCell::new(),
        })
    }

    fn driver(&self, value: &JsonValue) -> SkResult<DriverRecord> {
        let fields = self.fields(value)?;
        let limits = self.limits;
        self.record(&fields, RecordKind::Driver, |f| {
            Ok(DriverProperties {
                uuid: f.uuid()?,
                driver_id: f.bounded("id", limits.max_id_length)?,
                driver_name: f.bounded("name", limits.max_name_length)?,
                display_name: f.bounded("display_name", limits.max_display_name_length)?,
                description: f.bounded("description", limits.max_description_length)?,
                api_version: f.version("api_version")?,
                impl_version: f.version("impl_version")?,
            })
        })
    }

    fn layer(&self, value: &JsonValue) -> SkResult<LayerRecord> {
        let fields = self.fields(value)?;
        let limits = self.limits;
        self.record(&fields, RecordKind::Layer, |f| {
            Ok(LayerProperties {
                uuid: f.uuid()?,
                layer_name: f.bounded("name", limits.max_name_length)?,
                display_name: f.bounded("display_name", limits.max_display_name_length)?,
                description: f.bounded("description", limits.max_description_length)?,
                api_version: f.version("api_version")?,
                impl_version: f.version("impl_version")?,
            })
        })
    }

    fn fields<'j>(&self, value: &'j JsonValue) -> SkResult<Fields<'j, '_>> {
        match value {
            JsonValue::Object(object) => Ok(Fields {
                object,
                alloc: self.alloc,
            }),
            other => Err(ErrorCode::ManifestUnexpectedType {
                field: "entry".to_string(),
                expected: "object",
                found: other.type_name(),
            }),
        }
    }
}

/// Parse every entry and commit the valid ones into `out`.
fn collect<P>(
    items: &[JsonValue],
    out: &mut Vec<ManifestRecord<P>>,
    kind: RecordKind,
    options: &ManifestOptions,
    parse: impl Fn(&JsonValue) -> SkResult<ManifestRecord<P>>,
) -> SkResult<()> {
    for (index, item) in items.iter().enumerate() {
        let record = match parse(item) {
            Ok(record) => record,
            Err(ErrorCode::OutOfHostMemory) => return Err(ErrorCode::OutOfHostMemory),
            Err(e) if options.skip_invalid_records => {
                warn!(
                    target: "opensk::manifest",
                    kind = kind.label(),
                    index,
                    error = e.name(),
                    "skip invalid manifest entry: {e}"
                );
                continue;
            }
            Err(e) => return Err(e),
        };
        if out.len() >= items.len() {
            return Err(invalid(format!("{} count exceeds declared count", kind.label())));
        }
        debug!(
            target: "opensk::manifest",
            kind = kind.label(),
            index,
            library = %record.library_path.display(),
            "committed manifest entry"
        );
        out.push(record);
    }
    Ok(())
}

fn format_version(root: &JsonObject) -> SkResult<Version> {
    let Some(value) = root.get("file_format_version") else {
        return Ok(MANIFEST_FORMAT_VERSION);
    };
    let text = value
        .try_as_str()
        .ok_or_else(|| ErrorCode::ManifestUnexpectedType {
            field: "file_format_version".to_string(),
            expected: "string",
            found: value.type_name(),
        })?;
    let version =
        Version::parse(text).ok_or_else(|| invalid(format!("malformed file_format_version '{text}'")))?;
    if version.major != MANIFEST_FORMAT_VERSION.major {
        return Err(invalid(format!("unsupported file_format_version {version}")));
    }
    Ok(version)
}

fn with_capacity<T>(count: usize) -> SkResult<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(count)
        .map_err(|_| ErrorCode::OutOfHostMemory)?;
    Ok(v)
}

impl Manifest {
    /// Load and parse the manifest file at `path`.
    pub fn load(path: impl AsRef<Path>) -> SkResult<Self> {
        Self::load_with(path, ManifestOptions::default(), &DefaultAllocator)
    }

    /// Load and parse the manifest file at `path` with explicit options and allocator.
    pub fn load_with(
        path: impl AsRef<Path>,
        options: ManifestOptions,
        alloc: &dyn HostAllocator,
    ) -> SkResult<Self> {
        let path = path.as_ref();
        let root = json::parse_file_with(path, alloc, Limits::manifest())?;
        Self::from_json_with(path, &root, options, alloc)
    }

    /// Build a manifest from an already parsed document.
    ///
    /// `path` is the manifest's own location; relative library paths are
    /// resolved against its directory.
    pub fn from_json(path: impl AsRef<Path>, root: &JsonObject) -> SkResult<Self> {
        Self::from_json_with(path, root, ManifestOptions::default(), &DefaultAllocator)
    }

    /// Build a manifest from an already parsed document with explicit options and allocator.
    pub fn from_json_with(
        path: impl AsRef<Path>,
        root: &JsonObject,
        options: ManifestOptions,
        alloc: &dyn HostAllocator,
    ) -> SkResult<Self> {
        let path = path.as_ref();
        let format_version = format_version(root)?;
        let driver_items = entries(root, "driver", "drivers")?;
        let layer_items = entries(root, "layer", "layers")?;
        let search_path = remove_path_stem(path);

        // One request covering the header, both record arrays and the path.
        let path_len = path.as_os_str().len();
        alloc.allocate(
            size_of::<Manifest>()
                .saturating_add(driver_items.len().saturating_mul(size_of::<DriverRecord>()))
                .saturating_add(layer_items.len().saturating_mul(size_of::<LayerRecord>()))
                .saturating_add(path_len),
        )?;
        let mut manifest = Manifest {
            path: path.to_path_buf(),
            search_path,
            format_version,
            defined_driver_count: driver_items.len(),
            defined_layer_count: layer_items.len(),
            drivers: with_capacity(driver_items.len())?,
            layers: with_capacity(layer_items.len())?,
        };

        let ctx = RecordContext {
            search_path: manifest.search_path.as_deref(),
            limits: options.field_limits,
            alloc,
        };
        collect(
            driver_items,
            &mut manifest.drivers,
            RecordKind::Driver,
            &options,
            |item| ctx.driver(item),
        )?;
        collect(
            layer_items,
            &mut manifest.layers,
            RecordKind::Layer,
            &options,
            |item| ctx.layer(item),
        )?;

        debug!(
            target: "opensk::manifest",
            path = %path.display(),
            drivers = manifest.drivers.len(),
            layers = manifest.layers.len(),
            "manifest loaded"
        );
        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json::parse_str;

    #[test]
    fn test_entries_arity() {
        let doc = parse_str(r#"{"driver": {}, "drivers": []}"#).unwrap();
        assert!(matches!(
            entries(&doc, "driver", "drivers"),
            Err(ErrorCode::ManifestInvalid(_))
        ));

        let doc = parse_str(r#"{"driver": []}"#).unwrap();
        assert!(matches!(
            entries(&doc, "driver", "drivers"),
            Err(ErrorCode::ManifestInvalid(_))
        ));

        let doc = parse_str(r#"{"drivers": {}}"#).unwrap();
        assert!(matches!(
            entries(&doc, "driver", "drivers"),
            Err(ErrorCode::ManifestInvalid(_))
        ));

        let doc = parse_str(r#"{"driver": {"a": 1}}"#).unwrap();
        assert_eq!(entries(&doc, "driver", "drivers").unwrap().len(), 1);

        let doc = parse_str(r#"{"drivers": [{}, {}, {}]}"#).unwrap();
        assert_eq!(entries(&doc, "driver", "drivers").unwrap().len(), 3);

        let doc = parse_str("{}").unwrap();
        assert!(entries(&doc, "layer", "layers").unwrap().is_empty());
    }

    #[test]
    fn test_format_version() {
        let doc = parse_str("{}").unwrap();
        assert_eq!(format_version(&doc).unwrap(), MANIFEST_FORMAT_VERSION);

        let doc = parse_str(r#"{"file_format_version": "1.0.2"}"#).unwrap();
        assert_eq!(format_version(&doc).unwrap(), Version::new(1, 0, 2));

        let doc = parse_str(r#"{"file_format_version": "2.0.0"}"#).unwrap();
        assert!(matches!(format_version(&doc), Err(ErrorCode::ManifestInvalid(_))));

        let doc = parse_str(r#"{"file_format_version": 1}"#).unwrap();
        assert!(matches!(
            format_version(&doc),
            Err(ErrorCode::ManifestUnexpectedType { .. })
        ));
    }

    #[test]
    fn test_empty_manifest() {
        let doc = parse_str("{}").unwrap();
        let manifest = Manifest::from_json("/etc/opensk/empty.json", &doc).unwrap();
        assert_eq!(manifest.defined_driver_count(), 0);
        assert_eq!(manifest.valid_layer_count(), 0);
        assert_eq!(manifest.search_path(), Some(Path::new("/etc/opensk")));
    }
}
