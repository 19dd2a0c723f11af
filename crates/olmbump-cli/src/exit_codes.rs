//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions and sysexits.h where applicable.

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Version error - a version argument cannot name a ClusterServiceVersion
pub const VERSION_ERROR: i32 = 2;

/// Bundle error - the existing bundle cannot be upgraded as-is
pub const BUNDLE_ERROR: i32 = 3;

/// Parse error - a YAML file or profile could not be parsed
pub const PARSE_ERROR: i32 = 4;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;
