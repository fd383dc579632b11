//! Error types for quantity conversion and report building
//!
//! Every error here is fatal to the current report run. Nothing is
//! defaulted or papered over with `inf`/`NaN`.

use crate::quantity::ResourceKind;
use std::fmt;
use thiserror::Error;

/// A quantity string that matches none of the recognized unit forms
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed {resource} quantity {raw:?}")]
pub struct QuantityError {
    pub resource: ResourceKind,
    pub raw: String,
}

/// Where a ratio was being derived when it turned out to be undefined
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Node(String),
    Cluster,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Node(name) => write!(f, "node {}", name),
            Scope::Cluster => f.write_str("cluster-wide"),
        }
    }
}

/// Errors raised while building a report
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReportError {
    #[error("node {node}: {field}: {source}")]
    MalformedQuantity {
        node: String,
        field: &'static str,
        #[source]
        source: QuantityError,
    },

    #[error("{scope}: {resource} ratio {ratio} is undefined because {denominator} is zero")]
    UndefinedRatio {
        scope: Scope,
        resource: ResourceKind,
        ratio: &'static str,
        denominator: &'static str,
    },

    #[error("metrics reported for node {0} which is not in the node listing")]
    UnknownNode(String),

    #[error("no nodes in scope, nothing to report")]
    EmptySelection,
}

impl ReportError {
    pub(crate) fn undefined(
        scope: &Scope,
        resource: ResourceKind,
        ratio: &'static str,
        denominator: &'static str,
    ) -> Self {
        ReportError::UndefinedRatio {
            scope: scope.clone(),
            resource,
            ratio,
            denominator,
        }
    }
}
