//! Result codes for the OpenSK manifest subsystem.
//!
//! Every fallible operation returns [`SkResult`]. The taxonomy is flat: one
//! variant per result code, grouped into lexer/parser, I/O, manifest and
//! binding errors. Each code has a stable numeric value and an `SK_ERROR_*`
//! name for human-readable reporting.

use thiserror::Error;

/// All error codes surfaced by the JSON parser, manifest model and binder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
pub enum ErrorCode {
    /// An allocation request was refused by the host allocator.
    #[error("out of host memory")]
    OutOfHostMemory,

    /// A string escape used a character outside the JSON escape set.
    #[error("invalid escape code '\\{}'", char::from(*.0))]
    InvalidEscapeCode(u8),

    /// A `\u` escape above U+007F.
    #[error("unsupported unicode escape \\u{0:04X}")]
    UnsupportedEscape(u16),

    /// A number literal did not match the JSON number grammar.
    #[error("invalid number format")]
    InvalidNumberFormat,

    /// A bare word other than `true`, `false` or `null`.
    #[error("invalid keyword '{0}'")]
    InvalidKeyword(String),

    /// The grammar expected something other than what was found.
    #[error("unexpected token: expected {expected}, found {found}")]
    UnexpectedToken {
        /// What the production required.
        expected: &'static str,
        /// Description of the token that was present.
        found: String,
    },

    /// The path exists but cannot be used as a character source.
    #[error("unsupported file source: {0}")]
    UnsupportedFileSource(String),

    /// The requested file does not exist.
    #[error("file not found: {0}")]
    FileNotFound(String),

    /// Reading from a source failed for a reason other than absence.
    #[error("i/o error: {0}")]
    Io(String),

    /// String token bytes were not valid UTF-8.
    #[error("string is not valid utf-8")]
    InvalidUtf8,

    /// Nesting of objects/arrays exceeded the configured depth.
    #[error("nesting too deep ({0} > {1})")]
    NestingTooDeep(u64, u64),

    /// A string token exceeded the configured maximum length.
    #[error("string too long ({0} > {1})")]
    StringTooLong(u64, u64),

    /// The manifest is structurally invalid.
    #[error("manifest invalid: {0}")]
    ManifestInvalid(String),

    /// A manifest field had the wrong JSON type.
    #[error("manifest field '{field}' has unexpected type: expected {expected}, found {found}")]
    ManifestUnexpectedType {
        /// Offending key.
        field: String,
        /// Required JSON type.
        expected: &'static str,
        /// JSON type present in the document.
        found: &'static str,
    },

    /// A manifest string field exceeded its maximum length.
    #[error("manifest field '{field}' overflows its limit ({length} > {limit})")]
    ManifestOverflow {
        /// Offending key.
        field: &'static str,
        /// Byte length of the value.
        length: usize,
        /// Maximum byte length.
        limit: usize,
    },

    /// No driver with that name, or its library file is missing.
    #[error("driver not found: {0}")]
    DriverNotFound(String),

    /// No layer with that name, or its library file is missing.
    #[error("layer not found: {0}")]
    LayerNotFound(String),

    /// The platform loader could not open a shared library.
    #[error("failed to load library {path}: {reason}")]
    LibraryLoadFailed {
        /// Library path handed to the loader.
        path: String,
        /// Loader diagnostic.
        reason: String,
    },
}

impl ErrorCode {
    /// Get the numeric result code.
    pub fn code(&self) -> i32 {
        match self {
            ErrorCode::OutOfHostMemory => -1,
            ErrorCode::InvalidEscapeCode(_) => -100,
            ErrorCode::UnsupportedEscape(_) => -101,
            ErrorCode::InvalidNumberFormat => -102,
            ErrorCode::InvalidKeyword(_) => -103,
            ErrorCode::UnexpectedToken { .. } => -104,
            ErrorCode::UnsupportedFileSource(_) => -105,
            ErrorCode::InvalidUtf8 => -106,
            ErrorCode::NestingTooDeep(..) => -107,
            ErrorCode::StringTooLong(..) => -108,
            ErrorCode::FileNotFound(_) => -200,
            ErrorCode::Io(_) => -201,
            ErrorCode::ManifestInvalid(_) => -300,
            ErrorCode::ManifestUnexpectedType { .. } => -301,
            ErrorCode::ManifestOverflow { .. } => -302,
            ErrorCode::DriverNotFound(_) => -400,
            ErrorCode::LayerNotFound(_) => -401,
            ErrorCode::LibraryLoadFailed { .. } => -402,
        }
    }

    /// Get the result code name as a string.
    pub fn name(&self) -> &'static str {
        match self {
            ErrorCode::OutOfHostMemory => "SK_ERROR_OUT_OF_HOST_MEMORY",
            ErrorCode::InvalidEscapeCode(_) => "SK_ERROR_JSON_INVALID_ESCAPE_CODE",
            ErrorCode::UnsupportedEscape(_) => "SK_ERROR_JSON_UNSUPPORTED",
            ErrorCode::InvalidNumberFormat => "SK_ERROR_JSON_INVALID_NUMBER_FORMAT",
            ErrorCode::InvalidKeyword(_) => "SK_ERROR_JSON_INVALID_KEYWORD",
            ErrorCode::UnexpectedToken { .. } => "SK_ERROR_JSON_UNEXPECTED_TOKEN",
            ErrorCode::UnsupportedFileSource(_) => "SK_ERROR_JSON_UNSUPPORTED_FILE_SOURCE",
            ErrorCode::InvalidUtf8 => "SK_ERROR_JSON_INVALID_UTF8",
            ErrorCode::NestingTooDeep(..) => "SK_ERROR_JSON_NESTING_TOO_DEEP",
            ErrorCode::StringTooLong(..) => "SK_ERROR_JSON_STRING_TOO_LONG",
            ErrorCode::FileNotFound(_) => "SK_ERROR_FILE_NOT_FOUND",
            ErrorCode::Io(_) => "SK_ERROR_IO",
            ErrorCode::ManifestInvalid(_) => "SK_ERROR_MANIFEST_INVALID",
            ErrorCode::ManifestUnexpectedType { .. } => "SK_ERROR_MANIFEST_UNEXPECTED_TYPE",
            ErrorCode::ManifestOverflow { .. } => "SK_ERROR_MANIFEST_OVERFLOW",
            ErrorCode::DriverNotFound(_) => "SK_ERROR_DRIVER_NOT_FOUND",
            ErrorCode::LayerNotFound(_) => "SK_ERROR_LAYER_NOT_FOUND",
            ErrorCode::LibraryLoadFailed { .. } => "SK_ERROR_LIBRARY_LOAD_FAILED",
        }
    }
}

/// Non-error completion status of a call that may fill a caller buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkStatus {
    /// Every available item was returned.
    Success,
    /// The caller buffer was smaller than the number of available items.
    Incomplete,
}

impl SkStatus {
    /// Get the numeric status code.
    pub fn code(&self) -> i32 {
        match self {
            SkStatus::Success => 0,
            SkStatus::Incomplete => 1,
        }
    }

    /// Get the status name as a string.
    pub fn name(&self) -> &'static str {
        match self {
            SkStatus::Success => "SK_SUCCESS",
            SkStatus::Incomplete => "SK_INCOMPLETE",
        }
    }
}

/// Result type for OpenSK operations.
pub type SkResult<T> = Result<T, ErrorCode>;
