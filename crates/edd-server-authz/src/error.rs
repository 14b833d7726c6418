// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use http::StatusCode;

use crate::types::{Operation, ResourceType};

/// Malformed request input. Always reported to the caller so the request can be fixed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
	#[error("'{value}' is not a valid {resource_type} identifier (expected {expected})")]
	Identifier {
		resource_type: ResourceType,
		value: String,
		expected: &'static str,
	},

	#[error("an identifier is required to {operation} a {resource_type}")]
	MissingIdentifier {
		resource_type: ResourceType,
		operation: Operation,
	},

	#[error("{param} {value} is not a valid date/time.")]
	Timestamp { param: &'static str, value: String },

	#[error("{param}: invalid regular expression: {message}")]
	Pattern { param: String, message: String },

	#[error("{}{message}", metadata_prefix(.ordinal))]
	Metadata {
		ordinal: Option<usize>,
		message: String,
	},

	#[error(
		"unsupported search type '{0}' (expected one of: studies, lines, assays, measurements, strains)"
	)]
	SearchType(String),

	#[error("a {0} can only be created within a study")]
	MissingScope(ResourceType),

	#[error("{0} cannot be looked up within a study")]
	NotNestable(ResourceType),

	#[error("{0} cannot be looked up within a strain (only studies can)")]
	NotStrainNestable(ResourceType),
}

fn metadata_prefix(ordinal: &Option<usize>) -> String {
	match ordinal {
		Some(n) => format!("meta (comparison {n}): "),
		None => "meta: ".to_string(),
	}
}

/// Terminal outcome of the engine other than a result set.
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
	#[error("Bad request: {0}")]
	Input(#[from] InputError),

	#[error("Not found")]
	NotFound,

	#[error("Forbidden")]
	Forbidden,

	#[error("Method not supported: cannot {operation} a {resource_type}")]
	MethodNotSupported {
		resource_type: ResourceType,
		operation: Operation,
	},

	#[error("Storage error: {0}")]
	Storage(String),
}

impl AuthzError {
	/// HTTP status the calling layer should surface.
	pub fn status_code(&self) -> StatusCode {
		match self {
			AuthzError::Input(_) => StatusCode::BAD_REQUEST,
			AuthzError::NotFound => StatusCode::NOT_FOUND,
			AuthzError::Forbidden => StatusCode::FORBIDDEN,
			AuthzError::MethodNotSupported { .. } => StatusCode::METHOD_NOT_ALLOWED,
			AuthzError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}
}

pub type Result<T> = std::result::Result<T, AuthzError>;
