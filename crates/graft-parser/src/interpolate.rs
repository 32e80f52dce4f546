//! Interpolation seam
//!
//! String interpolation (`${expr}` with named resolver functions) is a
//! consumed service, not part of this crate: [`Interpolate`] is the
//! contract and [`InterpolationParser`] adapts an implementation into the
//! parser chain. It runs first so templates expand before the reference
//! resolver reads them.

use crate::chain::ConfigParser;
use crate::error::ParseError;
use graft_config::ConfigValue;
use std::fmt;
use std::sync::Arc;

/// External interpolation service: substitute every `${expr}` and return
/// the substituted tree
pub trait Interpolate: Send + Sync + fmt::Debug {
    /// Return `config` with all interpolations substituted.
    ///
    /// # Errors
    /// Service-defined; surfaced as [`ParseError::Interpolation`].
    fn interpolate(&self, config: &ConfigValue) -> Result<ConfigValue, ParseError>;
}

/// Parser-chain adapter for an [`Interpolate`] service
#[derive(Debug, Clone)]
pub struct InterpolationParser {
    service: Arc<dyn Interpolate>,
}

impl InterpolationParser {
    /// Wrap an interpolation service
    #[must_use]
    pub fn new(service: Arc<dyn Interpolate>) -> Self {
        Self { service }
    }
}

impl ConfigParser for InterpolationParser {
    fn parse(&self, config: &ConfigValue) -> Result<ConfigValue, ParseError> {
        self.service.interpolate(config)
    }
}
