/*---------------------------------------------------------------------------------------------
 *  Copyright (c) Varian Trajectory Log Working Group. All rights reserved.
 *  Licensed under the Apache License, Version 2.0.
 *--------------------------------------------------------------------------------------------*/

//! Anonymization is an out-of-scope collaborator (§1, §6): this module fixes the
//! configuration surface a host application supplies, not a concrete implementation.

/// Per-field overrides applied when de-identifying a log before export or storage.
#[derive(Default)]
pub struct AnonymizationOptions {
    pub patient_id: Option<String>,
    pub plan_name: Option<String>,
    pub plan_uid: Option<String>,
    pub sop_instance_uid: Option<String>,
    pub beam_name: Option<String>,
    pub file_path: Option<String>,
    /// Given a sub-beam's sequence index, returns its replacement name.
    pub sub_beam_name: Option<Box<dyn Fn(i32) -> String>>,
}
