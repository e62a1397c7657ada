// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
// - 'file/physical.rs' uses mmap to map a file into memory

//! # pescope
//!
//! [![License](https://img.shields.io/badge/license-Apache--2.0-blue.svg)](https://www.apache.org/licenses/LICENSE-2.0)
//!
//! A cross-platform parser for Portable Executable (PE) images, the executable format used by
//! Windows. `pescope` decodes the fixed headers, translates between file offsets and relative
//! virtual addresses through the section table, and decodes the import, base relocation and
//! debug directories into plain Rust types.
//!
//! ## Features
//!
//! - **Memory-mapped input** - Files are mapped rather than read; buffers and readers are accepted too
//! - **Both layouts** - PE32 and PE32+ optional headers decode into one representation
//! - **Checked address translation** - Every RVA must map into exactly one section, every range must fit
//! - **Recoverable gaps** - Populated directories without a decoder are recorded, not fatal, unless asked
//! - **Structured errors** - Each failure names the structure and offset involved
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! pescope = "0.1"
//! ```
//!
//! ### Using the Prelude
//!
//! ```rust,no_run
//! use pescope::prelude::*;
//!
//! let image = Image::from_file("C:/Windows/System32/kernel32.dll".as_ref())?;
//! for import in image.imports() {
//!     println!("{}: {} symbols", import.descriptor.name, import.symbols().len());
//! }
//! # Ok::<(), pescope::Error>(())
//! ```
//!
//! ### Debug Information
//!
//! ```rust,no_run
//! use pescope::{CodeViewInfo, DebugRecord, Image};
//!
//! let image = Image::from_mem(std::fs::read("app.exe")?)?;
//! for record in image.debug() {
//!     if let DebugRecord::CodeView { info: CodeViewInfo::Pdb70 { guid, age, path, .. }, .. } = record {
//!         println!("{} {}{:X}", path, guid, age);
//!     }
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! - [`file`] - Byte sources and the bounds-checked [`Parser`]
//! - [`headers`] - COFF, optional, data directory and section headers
//! - [`image`] - The [`Image`] aggregate, its staged loader and the [`AddressSpace`] translator
//! - [`directories`] - Import, base relocation and debug directory decoders
//! - [`config`] - [`ParseConfig`] parse policy
//! - [`prelude`] - Convenient re-exports
//!
//! ## Unsupported Data
//!
//! A populated directory with no decoder (exports, TLS, load config, ...) or a debug record of
//! an unknown type is recorded in [`Image::unsupported`] by default. Load with
//! [`ParseConfig::strict`] to fail instead, or call [`Image::ensure_supported`] afterwards:
//!
//! ```rust,no_run
//! use pescope::{Error, Image, ParseConfig};
//!
//! match Image::from_file_with_config("app.exe".as_ref(), ParseConfig::strict()) {
//!     Ok(image) => println!("{} sections", image.sections().len()),
//!     Err(Error::Unsupported(what)) => println!("cannot decode {}", what),
//!     Err(e) => println!("Other error: {}", e),
//! }
//! ```
//!
//! ## Logging
//!
//! Load stages report through the [`log`](https://docs.rs/log) facade. Install any logger
//! to see them; nothing is printed otherwise.
//!
//! ### References
//!
//! - [PE Format](https://learn.microsoft.com/en-us/windows/win32/debug/pe-format) - Microsoft's format documentation

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types.
///
/// # Example
///
/// ```rust,no_run
/// use pescope::prelude::*;
///
/// let image = Image::from_file("app.exe".as_ref())?;
/// let text = image.sections().iter().find(|s| s.name == ".text");
/// # Ok::<(), pescope::Error>(())
/// ```
pub mod prelude;

/// Byte sources and low-level readers
pub mod file;

/// Fixed-layout PE headers
pub mod headers;

/// The loaded image and address translation
pub mod image;

/// Data directory decoders
pub mod directories;

/// Parse policy
pub mod config;

/// `pescope` Result type
///
/// A type alias for `std::result::Result<T, Error>` where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

pub use config::ParseConfig;
pub use directories::{
    debug::{CodeViewInfo, DebugDirectory, DebugRecord, DebugType, FpoData, FrameType},
    imports::{HintName, ImportDescriptor, ImportEntry, ImportThunk, ThunkTarget},
    relocations::{BaseRelocBlock, BaseRelocation, BaseRelocationType},
};
pub use error::{Error, Unsupported};
pub use file::parser::Parser;
pub use headers::{
    DataDirectory, DataDirectoryKind, FileHeader, Machine, Magic, OptionalHeader, SectionHeader,
};
pub use image::{AddressSpace, Image};
