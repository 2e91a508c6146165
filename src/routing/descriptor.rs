//! Static description of one bridged operation.

use http::Method;

use crate::routing::matcher::{PathPattern, PatternError};

/// Where the request body lands in the RPC input message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyBinding {
    /// The body is ignored.
    None,
    /// The body is the whole input message (`body: "*"`).
    Message,
    /// The body populates a single top-level field.
    Field(&'static str),
}

/// RPC call shape. Only `Unary` can be registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Unary,
    ClientStreaming,
    ServerStreaming,
    BidiStreaming,
}

impl CallKind {
    pub fn is_streaming(self) -> bool {
        !matches!(self, CallKind::Unary)
    }
}

/// Maps an HTTP method and path template onto a fully qualified RPC method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationDescriptor {
    pub method: Method,
    pub pattern: PathPattern,
    /// Fully qualified RPC path, e.g. `/api.v1.ConfigService/GetConfig`.
    pub rpc_method: &'static str,
    pub body: BodyBinding,
    pub kind: CallKind,
}

impl OperationDescriptor {
    /// Unary operation without a body binding.
    pub fn new(method: Method, template: &str, rpc_method: &'static str) -> Result<Self, PatternError> {
        Ok(Self {
            method,
            pattern: PathPattern::parse(template)?,
            rpc_method,
            body: BodyBinding::None,
            kind: CallKind::Unary,
        })
    }

    pub fn with_body(mut self, body: BodyBinding) -> Self {
        self.body = body;
        self
    }

    pub fn with_kind(mut self, kind: CallKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn has_body(&self) -> bool {
        !matches!(self.body, BodyBinding::None)
    }

    pub fn template(&self) -> &str {
        self.pattern.template()
    }
}
