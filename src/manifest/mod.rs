//! Driver and layer manifests.
//!
//! A manifest is a JSON document registering driver and layer libraries:
//!
//! ```json
//! {
//!   "file_format_version": "1.0.0",
//!   "drivers": [{
//!     "library_path": "./libfoo.so",
//!     "uuid": "00000000-0000-0000-0000-000000000001",
//!     "id": "foo",
//!     "name": "foo",
//!     "display_name": "Foo Driver",
//!     "description": "test",
//!     "api_version": "0.0.0",
//!     "impl_version": "0.0.0",
//!     "functions": {},
//!     "enable_environment": "SK_ENABLE_FOO"
//!   }]
//! }
//! ```
//!
//! A single entry may be given as `driver` / `layer` instead of an array.
//!
//! - [`types`] - manifest data model
//! - loading: [`Manifest::load`], [`Manifest::from_json`]
//! - enumeration: [`Manifest::enumerate_driver_properties`] and friends
//! - binding: [`Manifest::driver_create_info`], [`Manifest::layer_create_info`]

mod bind;
mod enumerate;
mod parse;
pub mod types;

pub use bind::{DriverCreateInfo, LayerCreateInfo, SymbolResolution};
pub use enumerate::{EnumerateFlags, Environment, ProcessEnvironment};
pub use parse::MANIFEST_FORMAT_VERSION;
pub use types::{
    DriverProperties, DriverRecord, FieldLimits, FunctionMap, FunctionMapping, LayerProperties,
    LayerRecord, Manifest, ManifestOptions, ManifestRecord, RecordProperties, Version,
};
