// ABOUTME: Image pull requests and image removal targets.
// ABOUTME: Targets are either a digest ID or a validated reference.

use super::{Checks, ValidationError};
use crate::types::{ImageId, ImageRef};
use serde::Deserialize;
use std::fmt;

/// An image pull request as callers send it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRequest {
    #[serde(alias = "imageName")]
    pub image: String,
    /// Pull even when the reference is already present locally.
    #[serde(default)]
    pub refresh: bool,
}

impl ImageRequest {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            refresh: false,
        }
    }

    pub fn refresh(mut self) -> Self {
        self.refresh = true;
        self
    }

    pub fn validate(&self) -> Result<ImageSpec, ValidationError> {
        let mut checks = Checks::default();
        let reference = checks.check("image", ImageRef::parse(&self.image));
        checks.finish(|| {
            Some(ImageSpec {
                reference: reference?,
                refresh: self.refresh,
            })
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSpec {
    pub reference: ImageRef,
    pub refresh: bool,
}

/// What an image removal addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageTarget {
    Id(ImageId),
    Reference(ImageRef),
}

impl ImageTarget {
    pub(crate) fn parse(input: &str) -> Result<Self, String> {
        if let Some(hex) = input.strip_prefix("sha256:") {
            if !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit()) {
                return Ok(ImageTarget::Id(ImageId::new(input)));
            }
            return Err(format!("invalid image ID: {input:?}"));
        }
        // Bare hex of CLI short-ID length or longer is an ID, as the runtime
        // resolves it before trying repository names.
        if (12..=64).contains(&input.len())
            && input
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        {
            return Ok(ImageTarget::Id(ImageId::new(input)));
        }
        ImageRef::parse(input)
            .map(ImageTarget::Reference)
            .map_err(|e| e.to_string())
    }
}

impl fmt::Display for ImageTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageTarget::Id(id) => write!(f, "{id}"),
            ImageTarget::Reference(reference) => write!(f, "{reference}"),
        }
    }
}
