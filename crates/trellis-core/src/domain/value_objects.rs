//! Domain value objects: Platform and Framework.
//!
//! # Design
//!
//! These are pure value types; `Copy`, equality-by-value, no identity.
//! This file's only job is to define the types, their string representations,
//! their `FromStr` parsers, and the pairwise compatibility rule the
//! inheritance validator applies between chain levels.
//!
//! # Adding New Variants
//!
//! 1. Add the enum variant here
//! 2. Add the `as_str` arm and the `FromStr` arm here
//! 3. Done; nothing else changes

use crate::domain::error::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ── Platform ─────────────────────────────────────────────────────────────────

/// A target platform a template may constrain itself to.
///
/// A template with `platform: None` is platform-agnostic and composes with
/// anything. Two templates with different concrete platforms cannot share a
/// chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linux,
    MacOs,
    Windows,
    Wasm,
}

impl Platform {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::MacOs => "macos",
            Self::Windows => "windows",
            Self::Wasm => "wasm",
        }
    }

    /// Whether two platform constraints can coexist in one chain.
    pub const fn compatible_with(self, other: Platform) -> bool {
        matches!(
            (self, other),
            (Self::Linux, Self::Linux)
                | (Self::MacOs, Self::MacOs)
                | (Self::Windows, Self::Windows)
                | (Self::Wasm, Self::Wasm)
        )
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "linux" => Ok(Self::Linux),
            "macos" | "darwin" => Ok(Self::MacOs),
            "windows" | "win" => Ok(Self::Windows),
            "wasm" | "wasm32" => Ok(Self::Wasm),
            other => Err(DomainError::InvalidDefinition(format!(
                "unknown platform: {other}"
            ))),
        }
    }
}

// ── Framework ────────────────────────────────────────────────────────────────

/// A framework a template generates code for.
///
/// Chains mixing two different concrete frameworks are rejected by the
/// validator: a `react` level composed over an `axum` base would emit files
/// that make no sense together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Framework {
    Axum,
    Actix,
    React,
    Vue,
    Django,
    FastApi,
    Express,
}

impl Framework {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Axum => "axum",
            Self::Actix => "actix",
            Self::React => "react",
            Self::Vue => "vue",
            Self::Django => "django",
            Self::FastApi => "fastapi",
            Self::Express => "express",
        }
    }

    /// Whether two framework constraints can coexist in one chain.
    pub fn compatible_with(self, other: Framework) -> bool {
        self == other
    }
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Framework {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "axum" => Ok(Self::Axum),
            "actix" | "actix-web" => Ok(Self::Actix),
            "react" => Ok(Self::React),
            "vue" => Ok(Self::Vue),
            "django" => Ok(Self::Django),
            "fastapi" => Ok(Self::FastApi),
            "express" => Ok(Self::Express),
            other => Err(DomainError::InvalidDefinition(format!(
                "unknown framework: {other}"
            ))),
        }
    }
}
