//! Provider limits the generated schema enforces.

/// Smallest allocatable storage, in GiB.
pub const MIN_STORAGE_GIB: i64 = 20;
/// Largest allocatable storage, in GiB.
pub const MAX_STORAGE_GIB: i64 = 64_000;

pub const MIN_BACKUP_RETENTION_DAYS: i64 = 0;
pub const MAX_BACKUP_RETENTION_DAYS: i64 = 35;

/// IOPS bounds for provisioned-IOPS storage.
pub const MIN_IOPS: i64 = 1_000;
pub const MAX_IOPS: i64 = 80_000;

/// Database and user names: a letter, then letters, digits or underscores.
pub const IDENTIFIER_PATTERN: &str = "^[A-Za-z][A-Za-z0-9_]*$";

/// Instance classes all carry the `db.` prefix.
pub const INSTANCE_CLASS_PATTERN: &str = "^db\\.";
