/*---------------------------------------------------------------------------------------------
 *  Copyright (c) Varian Trajectory Log Working Group. All rights reserved.
 *  Licensed under the Apache License, Version 2.0.
 *--------------------------------------------------------------------------------------------*/

//! Trajectory log codecs (§4.1, §4.2): the native `VOSTL` binary format and the compressed
//! `VOSTLC` delta/quantization format, both built on the shared framing in `common`.

mod common;

pub mod compressed;
pub mod native;

#[cfg(feature = "async")]
pub mod asynchronous;

pub use compressed::CompressedVersion;
