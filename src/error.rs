/*---------------------------------------------------------------------------------------------
 *  Copyright (c) Varian Trajectory Log Working Group. All rights reserved.
 *  Licensed under the Apache License, Version 2.0.
 *--------------------------------------------------------------------------------------------*/

use thiserror::Error;

/// Errors surfaced by every fallible public entry point in this crate.
#[derive(Error, Debug)]
pub enum TrajLogError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("file not found: {0}")]
    NotFound(String),

    #[error("invalid format: {0}")]
    InvalidFormat(String),

    #[error("unexpected end of file")]
    UnexpectedEof,

    #[error("quantization overflow: value {value} does not fit in {bits}-bit base width")]
    QuantizationOverflow { value: f64, bits: u8 },

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("out of range: {0}")]
    OutOfRange(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TrajLogError>;
