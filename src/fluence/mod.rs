/*---------------------------------------------------------------------------------------------
 *  Copyright (c) Varian Trajectory Log Working Group. All rights reserved.
 *  Licensed under the Apache License, Version 2.0.
 *--------------------------------------------------------------------------------------------*/

pub mod engine;
pub mod gold_standard;
pub mod options;

pub use engine::{compute_extent, reconstruct, FieldFluence};
pub use gold_standard::FluenceGoldStandardFormat;
pub use options::FluenceOptions;
