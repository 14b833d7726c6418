// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authorization engine switches.

use edd_server_authz::{EngineOptions, StudyCreationPolicy};
use serde::Deserialize;

/// Authorization configuration (runtime, fully resolved).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthzConfig {
	pub study_creation: StudyCreationPolicy,
	pub elevated_role_reads_studies: bool,
}

impl Default for AuthzConfig {
	fn default() -> Self {
		let options = EngineOptions::default();
		Self {
			study_creation: options.study_creation,
			elevated_role_reads_studies: options.elevated_role_reads_studies,
		}
	}
}

impl AuthzConfig {
	pub fn engine_options(&self) -> EngineOptions {
		EngineOptions {
			study_creation: self.study_creation,
			elevated_role_reads_studies: self.elevated_role_reads_studies,
		}
	}
}

/// Authorization configuration layer (partial, for merging).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthzConfigLayer {
	/// `anyone`, `superuser` or `permission`.
	#[serde(default)]
	pub study_creation: Option<StudyCreationPolicy>,
	#[serde(default)]
	pub elevated_role_reads_studies: Option<bool>,
}

impl AuthzConfigLayer {
	pub fn merge(&mut self, other: AuthzConfigLayer) {
		if other.study_creation.is_some() {
			self.study_creation = other.study_creation;
		}
		if other.elevated_role_reads_studies.is_some() {
			self.elevated_role_reads_studies = other.elevated_role_reads_studies;
		}
	}

	pub fn finalize(self) -> AuthzConfig {
		let defaults = AuthzConfig::default();
		AuthzConfig {
			study_creation: self.study_creation.unwrap_or(defaults.study_creation),
			elevated_role_reads_studies: self
				.elevated_role_reads_studies
				.unwrap_or(defaults.elevated_role_reads_studies),
		}
	}
}
