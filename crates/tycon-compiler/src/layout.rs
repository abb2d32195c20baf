//! Memory layout engine
//!
//! Computes slot layouts for everything that lives on the emitted stack or
//! heap: scalars take one slot, primitive arrays take one slot per element
//! plus a length header, arrays of objects take one pointer slot per
//! element followed by the contiguous sub-blocks, and alias-shaped objects
//! take their members in declaration order from offset 0. Offsets inside
//! one layout are contiguous and order-stable across repeated
//! computations, so two independently laid-out instances of the same
//! alias have identical shapes.

use crate::symbols::{AliasShape, TypeAliasTable};
use thiserror::Error;
use tycon_ast as ast;

/// Primitive type names; everything else resolves through the alias table.
pub const PRIMITIVE_TYPES: [&str; 3] = ["number", "boolean", "string"];

pub fn is_primitive(type_text: &str) -> bool {
    PRIMITIVE_TYPES.contains(&type_text)
}

/// Problems a layout computation can surface. These become structural
/// diagnostics at the call site; layout itself never aborts compilation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutIssue {
    #[error("type alias cycle through `{0}`")]
    Cycle(String),

    #[error("unknown type `{0}`")]
    Unknown(String),
}

/// Offset map for one alias shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub size: u32,
    pub members: Vec<MemberLayout>,
}

impl Layout {
    pub fn member(&self, name: &str) -> Option<&MemberLayout> {
        self.members.iter().find(|m| m.name == name)
    }
}

/// One member's position inside a layout.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberLayout {
    pub name: String,
    pub offset: u32,
    pub size: u32,
    pub type_text: String,
    pub elem_count: Option<u32>,
    pub native_code: Option<String>,
}

/// Layout engine over the alias table.
pub struct LayoutEngine<'a> {
    aliases: &'a TypeAliasTable,
}

impl<'a> LayoutEngine<'a> {
    pub fn new(aliases: &'a TypeAliasTable) -> Self {
        Self { aliases }
    }

    /// Slots occupied by a value of the given canonical type text.
    pub fn size_of(&self, type_text: &str) -> Result<u32, LayoutIssue> {
        let mut visiting = Vec::new();
        self.size_of_inner(type_text, &mut visiting)
    }

    fn size_of_inner(&self, type_text: &str, visiting: &mut Vec<String>) -> Result<u32, LayoutIssue> {
        if is_primitive(type_text) || parse_pointer_text(type_text).is_some() {
            return Ok(1);
        }
        if let Some((element, count)) = parse_array_text(type_text) {
            let count = count.ok_or_else(|| LayoutIssue::Unknown(type_text.to_string()))?;
            if is_primitive(&element) {
                // one slot per element plus the length header
                return Ok(count + 1);
            }
            let elem_size = self.size_of_inner(&element, visiting)?;
            // one pointer slot per element, then the contiguous sub-blocks
            return Ok(count + count * elem_size);
        }
        let shape = self
            .aliases
            .shape(type_text)
            .ok_or_else(|| LayoutIssue::Unknown(type_text.to_string()))?;
        if shape.primitive.is_some() {
            return Ok(1);
        }
        if visiting.iter().any(|n| n == type_text) {
            return Err(LayoutIssue::Cycle(type_text.to_string()));
        }
        visiting.push(type_text.to_string());
        let mut size = 0u32;
        for member in &shape.members {
            size += self.size_of_inner(&member.type_text, visiting)?;
        }
        visiting.pop();
        Ok(size)
    }

    /// Offset map for a declared alias, members in declaration order from
    /// offset 0.
    pub fn layout_of(&self, alias: &str) -> Result<Layout, LayoutIssue> {
        let shape = self
            .aliases
            .shape(alias)
            .ok_or_else(|| LayoutIssue::Unknown(alias.to_string()))?;
        let mut visiting = vec![alias.to_string()];
        self.layout_of_shape(shape, &mut visiting)
    }

    fn layout_of_shape(
        &self,
        shape: &AliasShape,
        visiting: &mut Vec<String>,
    ) -> Result<Layout, LayoutIssue> {
        let mut members = Vec::new();
        let mut offset = 0u32;
        for member in &shape.members {
            let size = if member.native_code.is_some() {
                // native members occupy no storage
                0
            } else {
                self.size_of_inner(&member.type_text, visiting)?
            };
            let elem_count = parse_array_text(&member.type_text).and_then(|(_, n)| n);
            members.push(MemberLayout {
                name: member.name.clone(),
                offset,
                size,
                type_text: member.type_text.clone(),
                elem_count,
                native_code: member.native_code.clone(),
            });
            offset += size;
        }
        Ok(Layout { size: offset, members })
    }
}

/// Strip the `*` suffix of a pointer type text (`Turret*`). Class-typed
/// members occupy one pointer slot instead of an inline block.
pub fn parse_pointer_text(type_text: &str) -> Option<&str> {
    type_text.strip_suffix('*')
}

/// Split `T[n]` / `T[]` type text into element name and count.
pub fn parse_array_text(type_text: &str) -> Option<(String, Option<u32>)> {
    let open = type_text.find('[')?;
    if !type_text.ends_with(']') {
        return None;
    }
    let element = type_text[..open].to_string();
    let inner = &type_text[open + 1..type_text.len() - 1];
    if inner.is_empty() {
        return Some((element, None));
    }
    inner.parse::<u32>().ok().map(|n| (element, Some(n)))
}

// ============================================================================
// Inline layout for object literals without a backing alias
// ============================================================================

/// Inline layout of an aliasless object literal: every property gets the
/// next sequential slot, and nested object/array literals are laid out
/// immediately following all sibling properties - headers first, then
/// bodies, depth-first.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineObject {
    pub size: u32,
    pub props: Vec<InlineProp>,
}

impl InlineObject {
    pub fn prop(&self, name: &str) -> Option<&InlineProp> {
        self.props.iter().find(|p| p.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InlineProp {
    pub name: String,
    /// The property's own (header) slot.
    pub header_offset: u32,
    pub body: InlineBody,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InlineBody {
    /// Scalar property; the header slot is the value.
    Scalar,
    /// Nested object literal occupying `[offset, offset + object.size)`.
    Object { offset: u32, object: Box<InlineObject> },
    /// Nested array literal of `len` element slots at `offset`.
    Array { offset: u32, len: u32 },
}

/// Compute the inline layout of an object literal.
pub fn inline_object_layout(obj: &ast::ObjectLiteral) -> InlineObject {
    let header_count = obj.properties.len() as u32;
    let mut props = Vec::new();
    let mut body_offset = header_count;

    for (idx, prop) in obj.properties.iter().enumerate() {
        let header_offset = idx as u32;
        let body = match &prop.value {
            ast::Expression::ObjectLiteral(nested) => {
                let object = inline_object_layout(nested);
                let offset = body_offset;
                body_offset += object.size;
                InlineBody::Object { offset, object: Box::new(object) }
            }
            ast::Expression::ArrayLiteral(array) => {
                let len = array.elements.len() as u32;
                let offset = body_offset;
                body_offset += len;
                InlineBody::Array { offset, len }
            }
            _ => InlineBody::Scalar,
        };
        props.push(InlineProp {
            name: prop.name.name.clone(),
            header_offset,
            body,
        });
    }

    InlineObject { size: body_offset, props }
}

/// Recognize a fixed-size array initializer and derive the element count:
/// either an array literal or the `array(n)` constructor call with a
/// numeric literal. Anything else is unrecognized and the caller decides
/// whether that is a diagnostic or a silent zero.
pub fn array_size_hint(init: &ast::Expression) -> Option<u32> {
    match init {
        ast::Expression::ArrayLiteral(lit) => Some(lit.elements.len() as u32),
        ast::Expression::Call(call) => match call.callee.as_ref() {
            ast::Expression::Identifier(ident) if ident.name == "array" => {
                match call.arguments.first() {
                    Some(ast::Expression::NumberLiteral(n)) if n.value >= 0 => {
                        Some(n.value as u32)
                    }
                    _ => None,
                }
            }
            _ => None,
        },
        _ => None,
    }
}
