//! Pure-Rust codec for the subset of the HDF5 file format the `h5entry`
//! object store persists to.
//!
//! Files are read and written whole: [`file_reader::read_graph`] decodes an
//! image into an [`object_graph::ObjectGraph`] and
//! [`file_writer::write_graph`] encodes one back. Supported structures are
//! v2/v3 superblocks, v2 object headers, compact link storage, contiguous
//! or compact numeric datasets and compact attributes. It supports
//! `no_std` environments with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod attribute;
mod bytes;
pub mod checksum;
pub mod data_layout;
pub mod dataspace;
pub mod datatype;
pub mod error;
pub mod file_reader;
pub mod file_writer;
pub mod group_info;
pub mod link_info;
pub mod link_message;
pub mod message_type;
pub mod object_graph;
pub mod object_header;
pub mod object_header_writer;
pub mod signature;
pub mod superblock;

pub use bytes::UNDEFINED_ADDRESS;
pub use error::FormatError;
