//! # pescope Prelude
//!
//! This module provides a convenient prelude for the most commonly used types from the
//! pescope library. Import this module to get quick access to the essential types for
//! PE image analysis.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all pescope operations
pub use crate::Error;

/// The result type used throughout pescope
pub use crate::Result;

/// A recognized structure that has no decoder
pub use crate::Unsupported;

/// Parse policy for image loading
pub use crate::ParseConfig;

// ================================================================================================
// Main Entry Points
// ================================================================================================

/// Main entry point for PE image analysis
pub use crate::Image;

/// RVA and file offset translation
pub use crate::AddressSpace;

/// Low-level parsing utilities
pub use crate::Parser;

// ================================================================================================
// Headers
// ================================================================================================

/// Header types
pub use crate::headers::{
    Characteristics, DataDirectory, DataDirectoryKind, DllCharacteristics, FileHeader, Machine,
    Magic, OptionalHeader, SectionFlags, SectionHeader, Subsystem,
};

// ================================================================================================
// Directories
// ================================================================================================

/// Import directory types
pub use crate::directories::imports::{
    HintName, ImportDescriptor, ImportEntry, ImportThunk, ThunkTarget,
};

/// Base relocation types
pub use crate::directories::relocations::{BaseRelocBlock, BaseRelocation, BaseRelocationType};

/// Debug directory types
pub use crate::directories::debug::{
    CodeViewInfo, DebugDirectory, DebugRecord, DebugType, FpoData, FrameType,
};
