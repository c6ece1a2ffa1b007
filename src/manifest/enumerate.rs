//! Property enumeration with environment gating.
//!
//! Both calls follow the two-call protocol: pass `None` to learn how many
//! records are visible, then pass a slice of that length to receive them.
//! A slice shorter than the visible count is filled completely and the
//! call reports [`SkStatus::Incomplete`].

use std::env;

use bitflags::bitflags;
use tracing::trace;

use super::types::{DriverProperties, LayerProperties, Manifest, ManifestRecord};
use crate::error::SkStatus;

bitflags! {
    /// Flags accepted by the enumeration calls.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct EnumerateFlags: u32 {
        /// Apply `enable_environment` / `disable_environment` gating.
        const IMPLICIT = 0x1;
    }
}

/// Read access to environment variables.
pub trait Environment {
    /// Returns true if `name` is set.
    fn is_set(&self, name: &str) -> bool;
}

/// The current process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnvironment;

impl Environment for ProcessEnvironment {
    fn is_set(&self, name: &str) -> bool {
        env::var_os(name).is_some()
    }
}

/// A fixed list of variable names that count as set.
impl Environment for [&str] {
    fn is_set(&self, name: &str) -> bool {
        self.iter().any(|set| *set == name)
    }
}

impl<P> ManifestRecord<P> {
    /// Returns true if the record passes both environment gates.
    ///
    /// A set disable variable hides the record; a declared enable variable
    /// hides it unless set.
    pub fn is_enabled<E: Environment + ?Sized>(&self, env: &E) -> bool {
        if let Some(var) = self.disable_environment.as_deref() {
            if env.is_set(var) {
                trace!(target: "opensk::manifest", var, "record disabled by environment");
                return false;
            }
        }
        if let Some(var) = self.enable_environment.as_deref() {
            if !env.is_set(var) {
                trace!(target: "opensk::manifest", var, "record not enabled by environment");
                return false;
            }
        }
        true
    }
}

fn enumerate<P: Clone, E: Environment + ?Sized>(
    records: &[ManifestRecord<P>],
    flags: EnumerateFlags,
    env: &E,
    out: Option<&mut [P]>,
) -> (usize, SkStatus) {
    let mut visible = records
        .iter()
        .filter(|record| !flags.contains(EnumerateFlags::IMPLICIT) || record.is_enabled(env))
        .map(|record| &record.properties);

    let Some(out) = out else {
        return (visible.count(), SkStatus::Success);
    };

    let mut written = 0;
    for slot in out.iter_mut() {
        match visible.next() {
            Some(properties) => {
                *slot = properties.clone();
                written += 1;
            }
            None => break,
        }
    }
    let status = if visible.next().is_some() {
        SkStatus::Incomplete
    } else {
        SkStatus::Success
    };
    (written, status)
}

impl Manifest {
    /// Enumerate driver properties, reading gates from the process environment.
    ///
    /// Returns the visible count (when `out` is `None`) or the number of
    /// entries written.
    pub fn enumerate_driver_properties(
        &self,
        flags: EnumerateFlags,
        out: Option<&mut [DriverProperties]>,
    ) -> (usize, SkStatus) {
        self.enumerate_driver_properties_with(&ProcessEnvironment, flags, out)
    }

    /// Enumerate driver properties against an explicit environment.
    pub fn enumerate_driver_properties_with<E: Environment + ?Sized>(
        &self,
        env: &E,
        flags: EnumerateFlags,
        out: Option<&mut [DriverProperties]>,
    ) -> (usize, SkStatus) {
        let result = enumerate(&self.drivers, flags, env, out);
        trace!(target: "opensk::manifest", count = result.0, status = result.1.name(), "enumerated drivers");
        result
    }

    /// Enumerate layer properties, reading gates from the process environment.
    pub fn enumerate_layer_properties(
        &self,
        flags: EnumerateFlags,
        out: Option<&mut [LayerProperties]>,
    ) -> (usize, SkStatus) {
        self.enumerate_layer_properties_with(&ProcessEnvironment, flags, out)
    }

    /// Enumerate layer properties against an explicit environment.
    pub fn enumerate_layer_properties_with<E: Environment + ?Sized>(
        &self,
        env: &E,
        flags: EnumerateFlags,
        out: Option<&mut [LayerProperties]>,
    ) -> (usize, SkStatus) {
        let result = enumerate(&self.layers, flags, env, out);
        trace!(target: "opensk::manifest", count = result.0, status = result.1.name(), "enumerated layers");
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::OnceCell;
    use std::path::PathBuf;

    use crate::manifest::types::FunctionMap;

    fn record(name: &str, enable: Option<&str>, disable: Option<&str>) -> ManifestRecord<String> {
        ManifestRecord {
            properties: name.to_string(),
            library_path: PathBuf::from("/opt/sk/lib.so"),
            enable_environment: enable.map(str::to_string),
            disable_environment: disable.map(str::to_string),
            functions: FunctionMap::default(),
            library: OnceCell::new(),
        }
    }

    #[test]
    fn test_gates() {
        let none: &[&str] = &[];
        let foo: &[&str] = &["FOO"];
        let foo_bar: &[&str] = &["FOO", "BAR"];

        let gated = record("a", Some("FOO"), Some("BAR"));
        assert!(!gated.is_enabled(none));
        assert!(gated.is_enabled(foo));
        assert!(!gated.is_enabled(foo_bar));

        assert!(record("b", None, None).is_enabled(none));
        assert!(!record("c", None, Some("BAR")).is_enabled(&["BAR"][..]));
    }

    #[test]
    fn test_two_call_protocol() {
        let records = vec![
            record("a", None, None),
            record("b", Some("FOO"), None),
            record("c", None, None),
        ];
        let env: &[&str] = &[];

        let (count, status) = enumerate(&records, EnumerateFlags::empty(), env, None);
        assert_eq!((count, status), (3, SkStatus::Success));

        let (count, _) = enumerate(&records, EnumerateFlags::IMPLICIT, env, None);
        assert_eq!(count, 2);

        let mut out = vec![String::new(); 2];
        let (written, status) = enumerate(&records, EnumerateFlags::IMPLICIT, env, Some(out.as_mut_slice()));
        assert_eq!((written, status), (2, SkStatus::Success));
        assert_eq!(out, ["a", "c"]);

        let mut short = vec![String::new(); 1];
        let (written, status) = enumerate(&records, EnumerateFlags::empty(), env, Some(short.as_mut_slice()));
        assert_eq!((written, status), (1, SkStatus::Incomplete));
        assert_eq!(short, ["a"]);

        let mut long = vec![String::new(); 5];
        let (written, status) = enumerate(&records, EnumerateFlags::empty(), env, Some(long.as_mut_slice()));
        assert_eq!((written, status), (3, SkStatus::Success));
    }
}
