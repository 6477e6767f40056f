#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

mod block;
pub mod crc32;

pub use block::BlockChecksum;
pub use crc32::{Crc32, Crc32Hasher};
