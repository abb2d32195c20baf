//! Type annotation nodes
//!
//! Annotations stay close to their written form: the backend resolves them
//! through the type-alias table by canonical text, so this module also owns
//! the canonical `type_text` rendering (`number`, `Point`, `Point[4]`).

use super::*;

/// A written type annotation.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeAnnotation {
    /// A named type: `number`, `boolean`, `string`, or a declared alias.
    Named(Identifier),

    /// A fixed-size array of a named element type: `Point[4]`.
    ///
    /// A missing size means the declaration relies on its initializer for
    /// the element count.
    Array {
        element: Identifier,
        size: Option<u32>,
        span: Span,
    },
}

impl TypeAnnotation {
    pub fn span(&self) -> &Span {
        match self {
            TypeAnnotation::Named(ident) => &ident.span,
            TypeAnnotation::Array { span, .. } => span,
        }
    }

    /// Canonical text used as the layout-table key.
    pub fn type_text(&self) -> String {
        match self {
            TypeAnnotation::Named(ident) => ident.name.clone(),
            TypeAnnotation::Array { element, size, .. } => match size {
                Some(n) => format!("{}[{}]", element.name, n),
                None => format!("{}[]", element.name),
            },
        }
    }
}

/// One member of a type alias or interface body.
///
/// `native_code` is populated by the front end for ambient host-interface
/// declarations whose members map onto native actor properties rather than
/// plain fields.
#[derive(Debug, Clone, PartialEq)]
pub struct AliasMember {
    pub name: Identifier,
    pub annotation: TypeAnnotation,
    pub native_code: Option<String>,
    pub span: Span,
}

/// The right-hand side of a type alias declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum AliasBody {
    /// `type Health = number;`
    PrimitiveNumber,
    /// `type Name = string;`
    PrimitiveString,
    /// `type Point = { x: number; y: number; }`
    Members(Vec<AliasMember>),
}
