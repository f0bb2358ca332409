// SPDX-FileCopyrightText: 2025-2026 TII (SSRC) and the Ghaf contributors
// SPDX-License-Identifier: Apache-2.0

pub mod names;
pub mod store;

pub use names::SubjectNames;
pub use store::{CertStore, Certificate, VerifyError, VerifyFailure};
