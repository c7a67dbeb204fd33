//! Tree configuration.

use plotline_block::BlockId;

/// Id of the super-root unless configured otherwise.
pub const DEFAULT_ROOT_ID: &str = "__WORLD__";

/// Archive version tag written on save.
pub const ARCHIVE_VERSION: &str = "1.0";

/// Encoding used when saving an archive.
///
/// Loading detects the encoding on its own.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// Human-readable JSON.
    #[default]
    Json,
    /// Compact `MessagePack` with named fields.
    MessagePack,
}

/// Configuration for a [`crate::BlockTreeManager`].
#[derive(Clone, Debug)]
pub struct TreeConfig {
    /// Id of the super-root block.
    pub root_id: BlockId,
    /// Seed for block id generation; `None` seeds from entropy.
    pub id_seed: Option<u64>,
    /// Encoding used on save.
    pub archive_format: ArchiveFormat,
    /// Version tag written on save.
    pub archive_version: String,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            root_id: BlockId::new(DEFAULT_ROOT_ID),
            id_seed: None,
            archive_format: ArchiveFormat::Json,
            archive_version: ARCHIVE_VERSION.to_string(),
        }
    }
}

impl TreeConfig {
    /// Creates a configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration whose generated ids repeat from run to run.
    #[must_use]
    pub fn deterministic(seed: u64) -> Self {
        Self::default().with_id_seed(seed)
    }

    /// Builder method to set the super-root id.
    #[must_use]
    pub fn with_root_id(mut self, root_id: impl Into<BlockId>) -> Self {
        self.root_id = root_id.into();
        self
    }

    /// Builder method to set the id seed.
    #[must_use]
    pub const fn with_id_seed(mut self, seed: u64) -> Self {
        self.id_seed = Some(seed);
        self
    }

    /// Builder method to set the save encoding.
    #[must_use]
    pub const fn with_archive_format(mut self, format: ArchiveFormat) -> Self {
        self.archive_format = format;
        self
    }

    /// Builder method to set the version tag written on save.
    #[must_use]
    pub fn with_archive_version(mut self, version: impl Into<String>) -> Self {
        self.archive_version = version.into();
        self
    }
}
