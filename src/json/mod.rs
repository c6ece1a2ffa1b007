//! JSON parsing for manifest ingestion.
//!
//! A purpose-built parser: ECMA-404 grammar plus `//` and `/* */` comments,
//! numbers decoded to doubles, `\u` escapes restricted to single-byte code
//! points. The document form is always an object.
//!
//! # Architecture
//!
//! - [`types`] - JSON value tree
//! - [`source`] - file and in-memory character sources, two-byte lookahead
//! - [`lexer`] - tokenizer with single-token lookahead
//! - [`parser`] - recursive descent parser
//! - [`limits`] - nesting and string length limits
//!
//! # Example
//!
//! ```
//! use opensk::json::{parse_str, JsonType};
//!
//! let doc = parse_str(r#"{ "a": [1, 2] /* comment */ }"#).unwrap();
//! assert_eq!(doc.get("a").unwrap().json_type(), JsonType::Array);
//! ```

pub mod lexer;
pub mod limits;
pub mod parser;
pub mod source;
pub mod types;

use std::path::Path;

use tracing::debug;

use crate::alloc::{DefaultAllocator, HostAllocator};
use crate::error::SkResult;

// Re-export commonly used items
pub use limits::Limits;
pub use parser::Parser;
pub use source::{CharSource, FileSource, StrSource};
pub use types::{JsonObject, JsonType, JsonValue};

/// Parse a JSON document held in memory.
pub fn parse_str(text: &str) -> SkResult<JsonObject> {
    parse_str_with(text, &DefaultAllocator, Limits::default())
}

/// Parse a JSON document held in memory with an explicit allocator and limits.
pub fn parse_str_with(
    text: &str,
    alloc: &dyn HostAllocator,
    limits: Limits,
) -> SkResult<JsonObject> {
    parse_source(StrSource::new(text), alloc, limits)
}

/// Parse the JSON document stored at `path`.
///
/// A missing file is reported as [`crate::ErrorCode::FileNotFound`].
pub fn parse_file(path: impl AsRef<Path>) -> SkResult<JsonObject> {
    parse_file_with(path, &DefaultAllocator, Limits::default())
}

/// Parse the JSON document stored at `path` with an explicit allocator and limits.
pub fn parse_file_with(
    path: impl AsRef<Path>,
    alloc: &dyn HostAllocator,
    limits: Limits,
) -> SkResult<JsonObject> {
    let path = path.as_ref();
    let object = parse_source(FileSource::open(path)?, alloc, limits)?;
    debug!(
        target: "opensk::json",
        path = %path.display(),
        properties = object.len(),
        "parsed json document"
    );
    Ok(object)
}

/// Parse a document from any character source.
pub fn parse_source<S: CharSource>(
    source: S,
    alloc: &dyn HostAllocator,
    limits: Limits,
) -> SkResult<JsonObject> {
    Parser::new(source, alloc, limits)?.parse_document()
}
