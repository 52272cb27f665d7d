/*---------------------------------------------------------------------------------------------
 *  Copyright (c) Varian Trajectory Log Working Group. All rights reserved.
 *  Licensed under the Apache License, Version 2.0.
 *--------------------------------------------------------------------------------------------*/

//! Reader/writer and analysis toolkit for Varian TrueBeam trajectory logs: native and
//! compressed binary codecs, a stride-based time-series model, 2-D fluence reconstruction,
//! and gamma-index comparison. See `SPEC_FULL.md` / `DESIGN.md` in the repository root for
//! the module-by-module design rationale.

pub mod anonymize;
pub mod axis_data;
pub mod clip;
pub mod codec;
pub mod error;
pub mod export;
pub mod fluence;
pub mod gamma;
pub mod geometry;
pub mod grid;
pub mod header;
pub mod log;
pub mod mlc;
pub mod scale;
pub mod subbeam;
pub mod views;

pub use codec::CompressedVersion;
pub use error::{Result, TrajLogError};
pub use header::{AxisKind, AxisScale, Header, MetaData, MlcModel};
pub use log::TrajectoryLog;
