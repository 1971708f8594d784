//! Post-authentication portal routing.
//!
//! Routing fails closed: a principal whose role could not be resolved is
//! never sent to a default portal.

use serde::Serialize;
use thiserror::Error;

use crate::{Portal, Principal};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RouteError {
    #[error("no role resolved for principal; portal entry denied")]
    NoRole,

    #[error("unrecognized portal '{0}'; portal entry denied")]
    UnrecognizedPortal(String),

    #[error("portal '{requested}' is not open to this principal (belongs to '{actual}')")]
    Forbidden { requested: Portal, actual: Portal },
}

/// Where a principal lands after login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteDecision {
    pub portal: Portal,
    pub landing_path: &'static str,
}

impl Portal {
    /// Entry page of each surface.
    pub fn landing_path(&self) -> &'static str {
        match self {
            Portal::Admin => "/dashboard",
            Portal::Employee => "/employee/profile",
        }
    }
}

/// The one portal the principal may enter.
pub fn route(principal: &Principal) -> Result<Portal, RouteError> {
    principal.role().map(|r| r.portal).ok_or(RouteError::NoRole)
}

pub fn decide(principal: &Principal) -> Result<RouteDecision, RouteError> {
    let portal = route(principal)?;
    Ok(RouteDecision {
        portal,
        landing_path: portal.landing_path(),
    })
}

/// Gate entry to `requested`, e.g. a surface named in a URL.
///
/// The raw value is parsed strictly; unknown names deny rather than fall back.
pub fn enter(principal: &Principal, requested: &str) -> Result<Portal, RouteError> {
    let requested: Portal = requested
        .parse()
        .map_err(|_| RouteError::UnrecognizedPortal(requested.to_string()))?;
    let actual = route(principal)?;

    if actual == requested {
        Ok(actual)
    } else {
        Err(RouteError::Forbidden { requested, actual })
    }
}
