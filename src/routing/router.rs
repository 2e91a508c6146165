//! Route table and lookup.
//!
//! # Responsibilities
//! - Store compiled operations grouped by HTTP method
//! - Look up the operation for a request method and path
//! - Distinguish "no such path" from "path exists under another method"
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(1) method lookup via HashMap, then an ordered scan of templates
//! - Templates sorted by specificity at build time; first match wins
//! - Two templates of equal precedence that can match the same path are a
//!   registration error, so the winner never depends on insertion order

use std::collections::HashMap;

use http::Method;
use thiserror::Error;

use crate::routing::descriptor::{CallKind, OperationDescriptor};
use crate::routing::matcher::{split_path, PathParams, PatternError};

/// Errors raised while building the route table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("{rpc_method} is a {kind:?} method; only unary calls can be bridged")]
    Streaming {
        rpc_method: &'static str,
        kind: CallKind,
    },

    #[error("{method} {first} and {method} {second} match the same paths with equal precedence")]
    Ambiguous {
        method: Method,
        first: String,
        second: String,
    },

    #[error(transparent)]
    Pattern(#[from] PatternError),
}

/// Lookup failure for an incoming request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("no operation matches the request path")]
    NotFound,

    #[error("path exists but not for this method")]
    MethodNotAllowed { allowed: Vec<Method> },
}

struct Route<T> {
    descriptor: OperationDescriptor,
    target: T,
}

/// Result of a successful lookup.
pub struct RouteMatch<'a, T> {
    pub descriptor: &'a OperationDescriptor,
    pub target: &'a T,
    pub params: PathParams,
}

/// Collects routes before they are frozen into a [`RouteTable`].
pub struct RouteTableBuilder<T> {
    routes: Vec<Route<T>>,
}

impl<T> Default for RouteTableBuilder<T> {
    fn default() -> Self {
        Self { routes: Vec::new() }
    }
}

impl<T> RouteTableBuilder<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an operation. Streaming operations are rejected here.
    pub fn register(
        &mut self,
        descriptor: OperationDescriptor,
        target: T,
    ) -> Result<(), RegistrationError> {
        if descriptor.kind.is_streaming() {
            return Err(RegistrationError::Streaming {
                rpc_method: descriptor.rpc_method,
                kind: descriptor.kind,
            });
        }
        self.routes.push(Route { descriptor, target });
        Ok(())
    }

    /// Freeze the table, ordering templates by specificity.
    pub fn build(self) -> Result<RouteTable<T>, RegistrationError> {
        let mut by_method: HashMap<Method, Vec<Route<T>>> = HashMap::new();
        for route in self.routes {
            by_method
                .entry(route.descriptor.method.clone())
                .or_default()
                .push(route);
        }

        for (method, routes) in by_method.iter_mut() {
            routes.sort_by(|a, b| {
                b.descriptor
                    .pattern
                    .specificity()
                    .cmp(&a.descriptor.pattern.specificity())
            });

            for (i, a) in routes.iter().enumerate() {
                for b in &routes[i + 1..] {
                    let (pa, pb) = (&a.descriptor.pattern, &b.descriptor.pattern);
                    if pa.specificity() == pb.specificity() && pa.overlaps(pb) {
                        return Err(RegistrationError::Ambiguous {
                            method: method.clone(),
                            first: pa.template().to_string(),
                            second: pb.template().to_string(),
                        });
                    }
                }
            }
        }

        Ok(RouteTable { by_method })
    }
}

/// Immutable operation table.
pub struct RouteTable<T> {
    by_method: HashMap<Method, Vec<Route<T>>>,
}

impl<T> RouteTable<T> {
    pub fn builder() -> RouteTableBuilder<T> {
        RouteTableBuilder::new()
    }

    /// Find the operation serving `method` and `path`.
    pub fn lookup(&self, method: &Method, path: &str) -> Result<RouteMatch<'_, T>, RouteError> {
        let segments = split_path(path);

        if let Some(routes) = self.by_method.get(method) {
            for route in routes {
                if let Some(params) = route.descriptor.pattern.matches(&segments) {
                    return Ok(RouteMatch {
                        descriptor: &route.descriptor,
                        target: &route.target,
                        params,
                    });
                }
            }
        }

        let mut allowed: Vec<Method> = self
            .by_method
            .iter()
            .filter(|(other, _)| *other != method)
            .filter(|(_, routes)| {
                routes
                    .iter()
                    .any(|r| r.descriptor.pattern.matches(&segments).is_some())
            })
            .map(|(other, _)| other.clone())
            .collect();

        if allowed.is_empty() {
            Err(RouteError::NotFound)
        } else {
            allowed.sort_by(|a, b| a.as_str().cmp(b.as_str()));
            Err(RouteError::MethodNotAllowed { allowed })
        }
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &OperationDescriptor> {
        self.by_method
            .values()
            .flat_map(|routes| routes.iter().map(|r| &r.descriptor))
    }

    pub fn len(&self) -> usize {
        self.by_method.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::descriptor::BodyBinding;

    fn op(method: Method, template: &str, rpc: &'static str) -> OperationDescriptor {
        OperationDescriptor::new(method, template, rpc).unwrap()
    }

    fn table() -> RouteTable<&'static str> {
        let mut builder = RouteTable::builder();
        builder
            .register(op(Method::GET, "/config", "GetConfig"), "get")
            .unwrap();
        builder
            .register(
                op(Method::POST, "/config:update", "UpdateConfig").with_body(BodyBinding::Message),
                "update",
            )
            .unwrap();
        builder
            .register(op(Method::GET, "/config/iplist", "GetIpBlackList"), "iplist")
            .unwrap();
        builder
            .register(op(Method::GET, "/config/{section}", "GetSection"), "section")
            .unwrap();
        builder.build().unwrap()
    }

    #[test]
    fn test_exact_lookup() {
        let table = table();
        let found = table.lookup(&Method::GET, "/config").unwrap();
        assert_eq!(*found.target, "get");
        assert!(found.params.is_empty());

        let found = table.lookup(&Method::POST, "/config:update").unwrap();
        assert_eq!(*found.target, "update");
    }

    #[test]
    fn test_literal_beats_capture() {
        let table = table();
        let found = table.lookup(&Method::GET, "/config/iplist").unwrap();
        assert_eq!(*found.target, "iplist");

        let found = table.lookup(&Method::GET, "/config/limits").unwrap();
        assert_eq!(*found.target, "section");
        assert_eq!(found.params.get("section"), Some("limits"));
    }

    #[test]
    fn test_method_not_allowed() {
        let table = table();
        match table.lookup(&Method::POST, "/config") {
            Err(RouteError::MethodNotAllowed { allowed }) => assert_eq!(allowed, vec![Method::GET]),
            other => panic!("unexpected lookup result: {:?}", other.map(|m| *m.target)),
        }
    }

    #[test]
    fn test_not_found() {
        let table = table();
        assert!(matches!(
            table.lookup(&Method::GET, "/nothing/here"),
            Err(RouteError::NotFound)
        ));
        assert!(matches!(
            table.lookup(&Method::DELETE, "/unknown"),
            Err(RouteError::NotFound)
        ));
    }

    #[test]
    fn test_streaming_rejected() {
        let mut builder = RouteTable::builder();
        let err = builder
            .register(
                op(Method::GET, "/watch", "Watch").with_kind(CallKind::ServerStreaming),
                (),
            )
            .unwrap_err();
        assert!(matches!(err, RegistrationError::Streaming { .. }));
    }

    #[test]
    fn test_ambiguous_templates_rejected() {
        let mut builder = RouteTable::builder();
        builder.register(op(Method::GET, "/v1/{a}", "A"), ()).unwrap();
        builder.register(op(Method::GET, "/v1/{b}", "B"), ()).unwrap();
        assert!(matches!(
            builder.build(),
            Err(RegistrationError::Ambiguous { .. })
        ));
    }

    #[test]
    fn test_same_template_different_methods_allowed() {
        let mut builder = RouteTable::builder();
        builder.register(op(Method::GET, "/v1/{a}", "A"), ()).unwrap();
        builder.register(op(Method::DELETE, "/v1/{a}", "B"), ()).unwrap();
        let table = builder.build().unwrap();
        assert_eq!(table.len(), 2);
    }
}
