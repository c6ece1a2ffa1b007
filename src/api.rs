//! Entry-point function pointer types exchanged with drivers and layers.
//!
//! Drivers and layers export "get proc addr" functions that return further
//! entry points by name. The handles passed through them are opaque to this
//! crate.

use std::ffi::{c_char, c_void};

/// Generic function pointer returned by every `*ProcAddr` query.
pub type PfnVoidFunction = unsafe extern "C" fn();

/// `skGetInstanceProcAddr(instance, name)`
pub type PfnGetInstanceProcAddr =
    unsafe extern "C" fn(instance: *mut c_void, name: *const c_char) -> Option<PfnVoidFunction>;

/// `skGetDriverProcAddr(driver, name)`
pub type PfnGetDriverProcAddr =
    unsafe extern "C" fn(driver: *mut c_void, name: *const c_char) -> Option<PfnVoidFunction>;

/// `skGetPcmStreamProcAddr(stream, name)`
pub type PfnGetPcmStreamProcAddr =
    unsafe extern "C" fn(stream: *mut c_void, name: *const c_char) -> Option<PfnVoidFunction>;

/// Exported name of the instance-level entry point.
pub const GET_INSTANCE_PROC_ADDR: &str = "skGetInstanceProcAddr";

/// Exported name of the driver-level entry point.
pub const GET_DRIVER_PROC_ADDR: &str = "skGetDriverProcAddr";

/// Exported name of the stream-level entry point.
pub const GET_PCM_STREAM_PROC_ADDR: &str = "skGetPcmStreamProcAddr";
