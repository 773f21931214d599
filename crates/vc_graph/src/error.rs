use core::fmt;

use thiserror::Error;
use vc_reflect::info::AccessFault;

/// Result type of the graph engine.
pub type Result<T, E = GraphError> = core::result::Result<T, E>;

// -----------------------------------------------------------------------------
// ErrorKind

/// What went wrong.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ErrorKind {
    #[error("target is not an instance of the declaring type")]
    InvalidTarget,
    #[error(transparent)]
    AccessorInvocation(#[from] AccessFault),
    #[error("cannot convert {from} to `{to}`")]
    UnsupportedConversion { from: String, to: &'static str },
    #[error("`{name}` is not a constant of `{enum_path}`")]
    UnknownEnumConstant { enum_path: &'static str, name: String },
    #[error("no object is declared for ids {ids:?}")]
    DanglingReference { ids: Vec<u64> },
    #[error("graph nesting exceeds {limit} levels")]
    GraphTooDeep { limit: usize },
    #[error("`{tag}` names no registered type")]
    UnresolvableType { tag: String },
    #[error("id {id} is declared twice")]
    DuplicateIdentity { id: u64 },
    #[error("malformed input: {reason}")]
    MalformedInput { reason: String },
    #[error("`{name}` is not a member of the target type")]
    UnknownMember { name: String },
    #[error("`{type_path}` has no registered constructor")]
    MissingConstructor { type_path: &'static str },
    #[error(transparent)]
    Parse(#[from] serde_json::Error),
    #[error("token sink rejected output: {0}")]
    Sink(String),
}

impl ErrorKind {
    #[inline]
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        ErrorKind::MalformedInput {
            reason: reason.into(),
        }
    }

    #[inline]
    pub(crate) fn unsupported(from: impl fmt::Display, to: &'static str) -> Self {
        ErrorKind::UnsupportedConversion {
            from: from.to_string(),
            to,
        }
    }
}

// -----------------------------------------------------------------------------
// Site

/// Where an error happened: the owning type, the member and the object id.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Site {
    pub owner: Option<&'static str>,
    pub member: Option<String>,
    pub identity: Option<u64>,
}

impl Site {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.owner.is_none() && self.member.is_none() && self.identity.is_none()
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.owner, &self.member) {
            (Some(owner), Some(member)) => write!(f, " at `{owner}.{member}`")?,
            (Some(owner), None) => write!(f, " in `{owner}`")?,
            (None, Some(member)) => write!(f, " at `{member}`")?,
            (None, None) => {}
        }
        if let Some(id) = self.identity {
            write!(f, " (object {id})")?;
        }
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// GraphError

/// An error of the graph engine with its [`Site`].
///
/// Errors for which [`is_graph_level`](GraphError::is_graph_level) holds abort
/// the whole operation. All others fail one member or element only and are
/// collected as issues unless fail-fast is requested.
#[derive(Debug, Error)]
#[error("{kind}{site}")]
pub struct GraphError {
    pub kind: ErrorKind,
    pub site: Site,
}

impl GraphError {
    #[inline]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            site: Site::default(),
        }
    }

    #[inline]
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    #[inline]
    pub fn site(&self) -> &Site {
        &self.site
    }

    /// Fills the owner and member unless an inner frame already did.
    pub fn at(mut self, owner: &'static str, member: &str) -> Self {
        if self.site.owner.is_none() && self.site.member.is_none() {
            self.site.owner = Some(owner);
            self.site.member = Some(String::from(member));
        }
        self
    }

    pub fn with_identity(mut self, id: u64) -> Self {
        self.site.identity.get_or_insert(id);
        self
    }

    /// Errors that leave the graph itself unusable.
    pub fn is_graph_level(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::DanglingReference { .. }
                | ErrorKind::GraphTooDeep { .. }
                | ErrorKind::DuplicateIdentity { .. }
                | ErrorKind::MalformedInput { .. }
                | ErrorKind::Parse(_)
                | ErrorKind::Sink(_)
        )
    }
}

impl From<ErrorKind> for GraphError {
    #[inline]
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl From<AccessFault> for GraphError {
    #[inline]
    fn from(fault: AccessFault) -> Self {
        Self::new(ErrorKind::AccessorInvocation(fault))
    }
}

impl From<serde_json::Error> for GraphError {
    #[inline]
    fn from(err: serde_json::Error) -> Self {
        Self::new(ErrorKind::Parse(err))
    }
}
