//! Driver and layer binding.
//!
//! Binding looks a record up by name, loads its library on first use and
//! resolves the entry points the caller needs. Symbol names pass through
//! the record's function map before lookup.

use std::marker::PhantomData;
use std::mem;

use tracing::{debug, warn};

use super::types::{DriverProperties, LayerProperties, Manifest, ManifestRecord};
use crate::api::{
    PfnGetDriverProcAddr, PfnGetInstanceProcAddr, PfnGetPcmStreamProcAddr, PfnVoidFunction,
    GET_DRIVER_PROC_ADDR, GET_INSTANCE_PROC_ADDR, GET_PCM_STREAM_PROC_ADDR,
};
use crate::error::{ErrorCode, SkResult};
use crate::platform::{DynamicLoader, LibraryLoader, LoadedLibrary};

/// Outcome of looking up one entry point.
#[derive(Debug, Clone, Copy)]
pub enum SymbolResolution {
    /// The library exports a real implementation.
    Resolved(PfnVoidFunction),
    /// The symbol resolved to one of the loader's placeholders.
    Placeholder,
    /// The library does not export the symbol.
    NotFound,
}

impl SymbolResolution {
    /// The function pointer, if resolved to a real implementation.
    pub fn function(self) -> Option<PfnVoidFunction> {
        match self {
            SymbolResolution::Resolved(f) => Some(f),
            SymbolResolution::Placeholder | SymbolResolution::NotFound => None,
        }
    }

    /// Returns true for [`SymbolResolution::Resolved`].
    pub fn is_resolved(self) -> bool {
        matches!(self, SymbolResolution::Resolved(_))
    }
}

impl<P> ManifestRecord<P> {
    fn load_library(&self, loader: &dyn LibraryLoader) -> SkResult<&dyn LoadedLibrary> {
        if let Some(library) = self.library.get() {
            return Ok(library.as_ref());
        }
        let library = loader.load(&self.library_path)?;
        debug!(target: "opensk::bind", path = %library.path().display(), "library loaded");
        Ok(self.library.get_or_init(|| library).as_ref())
    }

    /// Resolve `symbol` in the record's library, loading it if needed.
    pub fn resolve_symbol(
        &self,
        loader: &dyn LibraryLoader,
        symbol: &str,
    ) -> SkResult<SymbolResolution> {
        let library = self.load_library(loader)?;
        let mapped = self.functions.resolve(symbol);
        if mapped != symbol {
            debug!(target: "opensk::bind", symbol, mapped, "symbol remapped");
        }
        Ok(match library.symbol(mapped) {
            None => SymbolResolution::NotFound,
            Some(function) if loader.is_placeholder(function) => SymbolResolution::Placeholder,
            Some(function) => SymbolResolution::Resolved(function),
        })
    }
}

/// What a caller needs to instantiate a driver.
///
/// The entry point stays valid while the manifest that produced it is alive.
#[derive(Debug, Clone)]
pub struct DriverCreateInfo<'m> {
    /// Copy of the driver's properties.
    pub properties: DriverProperties,
    /// `skGetDriverProcAddr`
    pub pfn_get_driver_proc_addr: PfnGetDriverProcAddr,
    _manifest: PhantomData<&'m Manifest>,
}

/// What a caller needs to instantiate a layer.
///
/// Layers may implement any subset of the entry points; unresolved ones are
/// `None`.
#[derive(Debug, Clone)]
pub struct LayerCreateInfo<'m> {
    /// Copy of the layer's properties.
    pub properties: LayerProperties,
    /// `skGetInstanceProcAddr`
    pub pfn_get_instance_proc_addr: Option<PfnGetInstanceProcAddr>,
    /// `skGetDriverProcAddr`
    pub pfn_get_driver_proc_addr: Option<PfnGetDriverProcAddr>,
    /// `skGetPcmStreamProcAddr`
    pub pfn_get_pcm_stream_proc_addr: Option<PfnGetPcmStreamProcAddr>,
    _manifest: PhantomData<&'m Manifest>,
}

impl LayerCreateInfo<'_> {
    /// Number of entry points the layer provides.
    pub fn entry_point_count(&self) -> usize {
        [
            self.pfn_get_instance_proc_addr.is_some(),
            self.pfn_get_driver_proc_addr.is_some(),
            self.pfn_get_pcm_stream_proc_addr.is_some(),
        ]
        .into_iter()
        .filter(|present| *present)
        .count()
    }
}

fn layer_entry_point(
    layer: &ManifestRecord<LayerProperties>,
    loader: &dyn LibraryLoader,
    symbol: &str,
) -> SkResult<Option<PfnVoidFunction>> {
    let resolution = layer.resolve_symbol(loader, symbol)?;
    if let SymbolResolution::Placeholder = resolution {
        warn!(
            target: "opensk::bind",
            layer = %layer.properties.layer_name,
            symbol,
            "layer entry point resolved to a placeholder"
        );
    }
    Ok(resolution.function())
}

impl Manifest {
    /// Bind the named driver using the system dynamic loader.
    pub fn driver_create_info(&self, name: &str) -> SkResult<DriverCreateInfo<'_>> {
        self.driver_create_info_with(name, &DynamicLoader::new())
    }

    /// Bind the named driver through `loader`.
    ///
    /// The driver must export `skGetDriverProcAddr` (or whatever its
    /// function map renames it to).
    pub fn driver_create_info_with(
        &self,
        name: &str,
        loader: &dyn LibraryLoader,
    ) -> SkResult<DriverCreateInfo<'_>> {
        let driver = self
            .driver(name)
            .ok_or_else(|| ErrorCode::DriverNotFound(name.to_string()))?;

        let function = match driver.resolve_symbol(loader, GET_DRIVER_PROC_ADDR)? {
            SymbolResolution::Resolved(function) => function,
            SymbolResolution::Placeholder => {
                return Err(ErrorCode::ManifestInvalid(format!(
                    "driver '{name}' entry point {GET_DRIVER_PROC_ADDR} resolves to a placeholder"
                )))
            }
            SymbolResolution::NotFound => {
                return Err(ErrorCode::ManifestInvalid(format!(
                    "driver '{name}' does not export {GET_DRIVER_PROC_ADDR}"
                )))
            }
        };

        Ok(DriverCreateInfo {
            properties: driver.properties.clone(),
            // SAFETY: the exported name promises the skGetDriverProcAddr signature.
            pfn_get_driver_proc_addr: unsafe {
                mem::transmute::<PfnVoidFunction, PfnGetDriverProcAddr>(function)
            },
            _manifest: PhantomData,
        })
    }

    /// Bind the named layer using the system dynamic loader.
    pub fn layer_create_info(&self, name: &str) -> SkResult<LayerCreateInfo<'_>> {
        self.layer_create_info_with(name, &DynamicLoader::new())
    }

    /// Bind the named layer through `loader`.
    pub fn layer_create_info_with(
        &self,
        name: &str,
        loader: &dyn LibraryLoader,
    ) -> SkResult<LayerCreateInfo<'_>> {
        let layer = self
            .layer(name)
            .ok_or_else(|| ErrorCode::LayerNotFound(name.to_string()))?;

        let instance = layer_entry_point(layer, loader, GET_INSTANCE_PROC_ADDR)?;
        let driver = layer_entry_point(layer, loader, GET_DRIVER_PROC_ADDR)?;
        let stream = layer_entry_point(layer, loader, GET_PCM_STREAM_PROC_ADDR)?;

        // SAFETY: each exported name promises the matching *ProcAddr signature.
        unsafe {
            Ok(LayerCreateInfo {
                properties: layer.properties.clone(),
                pfn_get_instance_proc_addr: instance
                    .map(|f| mem::transmute::<PfnVoidFunction, PfnGetInstanceProcAddr>(f)),
                pfn_get_driver_proc_addr: driver
                    .map(|f| mem::transmute::<PfnVoidFunction, PfnGetDriverProcAddr>(f)),
                pfn_get_pcm_stream_proc_addr: stream
                    .map(|f| mem::transmute::<PfnVoidFunction, PfnGetPcmStreamProcAddr>(f)),
                _manifest: PhantomData,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, OnceCell};
    use std::path::{Path, PathBuf};

    use crate::manifest::types::{FunctionMap, FunctionMapping};

    unsafe extern "C" fn exported() {
        std::hint::black_box(7u8);
    }

    struct OneSymbol {
        path: PathBuf,
    }

    impl LoadedLibrary for OneSymbol {
        fn symbol(&self, name: &str) -> Option<PfnVoidFunction> {
            (name == "fooExported").then_some(exported as PfnVoidFunction)
        }

        fn path(&self) -> &Path {
            &self.path
        }
    }

    #[derive(Default)]
    struct CountingLoader {
        loads: Cell<usize>,
    }

    impl LibraryLoader for CountingLoader {
        fn load(&self, path: &Path) -> SkResult<Box<dyn LoadedLibrary>> {
            self.loads.set(self.loads.get() + 1);
            Ok(Box::new(OneSymbol {
                path: path.to_path_buf(),
            }))
        }
    }

    fn record(functions: Vec<FunctionMapping>) -> ManifestRecord<()> {
        ManifestRecord {
            properties: (),
            library_path: PathBuf::from("/opt/sk/libfoo.so"),
            enable_environment: None,
            disable_environment: None,
            functions: FunctionMap::from_entries(functions),
            library: OnceCell::new(),
        }
    }

    #[test]
    fn test_resolve_through_function_map() {
        let loader = CountingLoader::default();
        let rec = record(vec![FunctionMapping {
            original: "skExported".into(),
            mapped: "fooExported".into(),
        }]);

        assert!(!rec.is_loaded());
        assert!(rec.resolve_symbol(&loader, "skExported").unwrap().is_resolved());
        assert!(matches!(
            rec.resolve_symbol(&loader, "fooMissing").unwrap(),
            SymbolResolution::NotFound
        ));
        assert!(rec.is_loaded());
        assert_eq!(loader.loads.get(), 1);
    }

    #[test]
    fn test_unmapped_lookup_uses_original_name() {
        let loader = CountingLoader::default();
        let rec = record(Vec::new());
        assert!(rec.resolve_symbol(&loader, "fooExported").unwrap().is_resolved());
        assert!(rec.resolve_symbol(&loader, "skExported").unwrap().function().is_none());
    }
}
