/*---------------------------------------------------------------------------------------------
 *  Copyright (c) Varian Trajectory Log Working Group. All rights reserved.
 *  Licensed under the Apache License, Version 2.0.
 *--------------------------------------------------------------------------------------------*/

//! Async entry points gated behind the `async` feature. Per §5, these exist only to overlap
//! I/O with other async work: the whole stream is read into a buffer first, then parsed
//! synchronously by the same codepath as the blocking reader. No suspension points exist
//! inside parsing itself.

use std::io::Cursor;
use std::path::Path;

use tokio::fs::File;
use tokio::io::AsyncReadExt;

use crate::error::{Result, TrajLogError};
use crate::log::TrajectoryLog;

use super::{compressed, native};

async fn read_whole_file<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
    let mut file = File::open(&path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            TrajLogError::NotFound(path.as_ref().display().to_string())
        } else {
            TrajLogError::Io(e)
        }
    })?;
    let mut buf = Vec::new();
    file.read_to_end(&mut buf).await.map_err(TrajLogError::Io)?;
    Ok(buf)
}

/// Reads a native `VOSTL` log asynchronously (buffer then parse synchronously).
pub async fn read_native<P: AsRef<Path>>(path: P) -> Result<TrajectoryLog> {
    let buf = read_whole_file(path).await?;
    native::read_from(&mut Cursor::new(buf))
}

/// Reads a compressed `VOSTLC` log asynchronously (buffer then parse synchronously).
pub async fn read_compressed<P: AsRef<Path>>(path: P) -> Result<TrajectoryLog> {
    let buf = read_whole_file(path).await?;
    compressed::read_from(&mut Cursor::new(buf))
}
