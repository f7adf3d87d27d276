//! Syntax tree storage.
//!
//! Nodes live in a flat [`NodeArena`] and refer to each other through
//! [`NodeIndex`] handles. Optional children use [`NodeIndex::NONE`].

use kite_common::Span;
use std::fmt::Write as _;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIndex(pub u32);

impl NodeIndex {
    pub const NONE: NodeIndex = NodeIndex(u32::MAX);

    #[inline]
    pub fn is_none(self) -> bool {
        self == NodeIndex::NONE
    }

    #[inline]
    pub fn is_some(self) -> bool {
        self != NodeIndex::NONE
    }
}

pub type NodeList = Vec<NodeIndex>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Minus,
    Not,
}

impl UnaryOp {
    /// Member function the operator resolves to.
    pub fn function_name(self) -> &'static str {
        match self {
            UnaryOp::Minus => "unaryMinus",
            UnaryOp::Not => "not",
        }
    }

    pub fn text(self) -> &'static str {
        match self {
            UnaryOp::Minus => "-",
            UnaryOp::Not => "!",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Times,
    Div,
    Rem,
    Plus,
    Minus,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    Eq,
    NotEq,
    And,
    Or,
    Elvis,
}

impl BinaryOp {
    /// Member function an arithmetic or comparison operator resolves to.
    pub fn function_name(self) -> Option<&'static str> {
        Some(match self {
            BinaryOp::Times => "times",
            BinaryOp::Div => "div",
            BinaryOp::Rem => "rem",
            BinaryOp::Plus => "plus",
            BinaryOp::Minus => "minus",
            BinaryOp::Less | BinaryOp::LessEq | BinaryOp::Greater | BinaryOp::GreaterEq => "compareTo",
            _ => return None,
        })
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Less | BinaryOp::LessEq | BinaryOp::Greater | BinaryOp::GreaterEq
        )
    }

    pub fn text(self) -> &'static str {
        match self {
            BinaryOp::Times => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Plus => "+",
            BinaryOp::Minus => "-",
            BinaryOp::Less => "<",
            BinaryOp::LessEq => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEq => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Elvis => "?:",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    SourceFile {
        imports: NodeList,
        statements: NodeList,
    },
    Import {
        path: Vec<String>,
        all_under: bool,
    },
    Property {
        is_private: bool,
        is_var: bool,
        name: String,
        name_span: Span,
        ty: NodeIndex,
        initializer: NodeIndex,
    },
    Function {
        is_private: bool,
        name: String,
        name_span: Span,
        type_parameters: NodeList,
        parameters: NodeList,
        return_type: NodeIndex,
        body: NodeIndex,
        /// `fun f() = expr` rather than a block body.
        expression_body: bool,
    },
    TypeParameter {
        name: String,
        bound: NodeIndex,
    },
    Parameter {
        name: String,
        ty: NodeIndex,
    },
    TypeReference {
        qualifier: Vec<String>,
        name: String,
        arguments: NodeList,
        nullable: bool,
    },
    IntLiteral(i32),
    BooleanLiteral(bool),
    StringLiteral(String),
    NullLiteral,
    Name(String),
    /// `receiver.name` without a call.
    Dot {
        receiver: NodeIndex,
        name: String,
        name_span: Span,
    },
    Call {
        receiver: NodeIndex,
        name: String,
        name_span: Span,
        type_arguments: NodeList,
        arguments: NodeList,
    },
    Unary {
        op: UnaryOp,
        operand: NodeIndex,
    },
    Binary {
        op: BinaryOp,
        left: NodeIndex,
        right: NodeIndex,
    },
    Assign {
        target: NodeIndex,
        value: NodeIndex,
    },
    If {
        condition: NodeIndex,
        then_branch: NodeIndex,
        else_branch: NodeIndex,
    },
    When {
        subject: NodeIndex,
        entries: NodeList,
    },
    /// An entry with no conditions is the `else` branch.
    WhenEntry {
        conditions: NodeList,
        body: NodeIndex,
    },
    While {
        condition: NodeIndex,
        body: NodeIndex,
    },
    Try {
        body: NodeIndex,
        catches: NodeList,
        finally: NodeIndex,
    },
    Catch {
        name: String,
        ty: NodeIndex,
        body: NodeIndex,
    },
    Throw {
        value: NodeIndex,
    },
    Return {
        value: NodeIndex,
    },
    Block {
        statements: NodeList,
    },
    Parenthesized(NodeIndex),
    /// Placeholder produced by error recovery.
    Missing,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
}

#[derive(Clone, Debug, Default)]
pub struct NodeArena {
    nodes: Vec<Node>,
}

impl NodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, kind: NodeKind, span: Span) -> NodeIndex {
        let index = NodeIndex(self.nodes.len() as u32);
        self.nodes.push(Node { kind, span });
        index
    }

    /// # Panics
    ///
    /// If `index` is [`NodeIndex::NONE`] or out of range.
    pub fn get(&self, index: NodeIndex) -> &Node {
        &self.nodes[index.0 as usize]
    }

    pub fn try_get(&self, index: NodeIndex) -> Option<&Node> {
        self.nodes.get(index.0 as usize)
    }

    pub fn kind(&self, index: NodeIndex) -> &NodeKind {
        &self.get(index).kind
    }

    pub fn span(&self, index: NodeIndex) -> Span {
        self.get(index).span
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Drop nodes created after a parser snapshot.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.nodes.truncate(len);
    }

    /// Whether `index` is a stable name or qualified access (`a`, `a.b.c`).
    pub fn is_qualified_name(&self, index: NodeIndex) -> bool {
        match self.kind(index) {
            NodeKind::Name(_) => true,
            NodeKind::Dot { receiver, .. } => self.is_qualified_name(*receiver),
            _ => false,
        }
    }

    /// Segments of a qualified name expression, outermost last.
    pub fn qualified_name_segments(&self, index: NodeIndex) -> Option<Vec<&str>> {
        match self.kind(index) {
            NodeKind::Name(name) => Some(vec![name.as_str()]),
            NodeKind::Dot { receiver, name, .. } => {
                let mut segments = self.qualified_name_segments(*receiver)?;
                segments.push(name.as_str());
                Some(segments)
            }
            _ => None,
        }
    }

    /// Compact S-expression rendering, used in tests and `--dump-ast`
    /// style debugging.
    pub fn dump(&self, index: NodeIndex) -> String {
        let mut out = String::new();
        self.dump_into(index, &mut out);
        out
    }

    fn dump_list(&self, head: &str, items: &[NodeIndex], out: &mut String) {
        out.push('(');
        out.push_str(head);
        for &item in items {
            out.push(' ');
            self.dump_into(item, out);
        }
        out.push(')');
    }

    fn dump_into(&self, index: NodeIndex, out: &mut String) {
        if index.is_none() {
            out.push('_');
            return;
        }
        match &self.get(index).kind {
            NodeKind::SourceFile { imports, statements } => {
                let all: Vec<_> = imports.iter().chain(statements).copied().collect();
                self.dump_list("file", &all, out);
            }
            NodeKind::Import { path, all_under } => {
                let _ = write!(out, "(import {}{})", path.join("."), if *all_under { ".*" } else { "" });
            }
            NodeKind::Property { is_var, name, ty, initializer, .. } => {
                let _ = write!(out, "({} {name} ", if *is_var { "var" } else { "val" });
                self.dump_into(*ty, out);
                out.push(' ');
                self.dump_into(*initializer, out);
                out.push(')');
            }
            NodeKind::Function { name, parameters, return_type, body, .. } => {
                let _ = write!(out, "(fun {name} ");
                self.dump_list("params", parameters, out);
                out.push(' ');
                self.dump_into(*return_type, out);
                out.push(' ');
                self.dump_into(*body, out);
                out.push(')');
            }
            NodeKind::TypeParameter { name, bound } => {
                let _ = write!(out, "(tp {name} ");
                self.dump_into(*bound, out);
                out.push(')');
            }
            NodeKind::Parameter { name, ty } => {
                let _ = write!(out, "(param {name} ");
                self.dump_into(*ty, out);
                out.push(')');
            }
            NodeKind::TypeReference { qualifier, name, arguments, nullable } => {
                for segment in qualifier {
                    out.push_str(segment);
                    out.push('.');
                }
                out.push_str(name);
                if !arguments.is_empty() {
                    out.push('<');
                    for (i, &argument) in arguments.iter().enumerate() {
                        if i > 0 {
                            out.push(',');
                        }
                        self.dump_into(argument, out);
                    }
                    out.push('>');
                }
                if *nullable {
                    out.push('?');
                }
            }
            NodeKind::IntLiteral(value) => {
                let _ = write!(out, "{value}");
            }
            NodeKind::BooleanLiteral(value) => {
                let _ = write!(out, "{value}");
            }
            NodeKind::StringLiteral(value) => {
                let _ = write!(out, "{value:?}");
            }
            NodeKind::NullLiteral => out.push_str("null"),
            NodeKind::Name(name) => out.push_str(name),
            NodeKind::Dot { receiver, name, .. } => {
                out.push_str("(. ");
                self.dump_into(*receiver, out);
                let _ = write!(out, " {name})");
            }
            NodeKind::Call { receiver, name, arguments, .. } => {
                out.push_str("(call ");
                if receiver.is_some() {
                    self.dump_into(*receiver, out);
                    out.push('.');
                }
                out.push_str(name);
                for &argument in arguments {
                    out.push(' ');
                    self.dump_into(argument, out);
                }
                out.push(')');
            }
            NodeKind::Unary { op, operand } => {
                let _ = write!(out, "({} ", op.text());
                self.dump_into(*operand, out);
                out.push(')');
            }
            NodeKind::Binary { op, left, right } => {
                let _ = write!(out, "({} ", op.text());
                self.dump_into(*left, out);
                out.push(' ');
                self.dump_into(*right, out);
                out.push(')');
            }
            NodeKind::Assign { target, value } => {
                out.push_str("(= ");
                self.dump_into(*target, out);
                out.push(' ');
                self.dump_into(*value, out);
                out.push(')');
            }
            NodeKind::If { condition, then_branch, else_branch } => {
                self.dump_list("if", &[*condition, *then_branch, *else_branch], out);
            }
            NodeKind::When { subject, entries } => {
                out.push_str("(when ");
                self.dump_into(*subject, out);
                for &entry in entries {
                    out.push(' ');
                    self.dump_into(entry, out);
                }
                out.push(')');
            }
            NodeKind::WhenEntry { conditions, body } => {
                out.push('(');
                if conditions.is_empty() {
                    out.push_str("else");
                }
                for (i, &condition) in conditions.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    self.dump_into(condition, out);
                }
                out.push_str(" -> ");
                self.dump_into(*body, out);
                out.push(')');
            }
            NodeKind::While { condition, body } => self.dump_list("while", &[*condition, *body], out),
            NodeKind::Try { body, catches, finally } => {
                let mut items = vec![*body];
                items.extend(catches);
                items.push(*finally);
                self.dump_list("try", &items, out);
            }
            NodeKind::Catch { name, ty, body } => {
                let _ = write!(out, "(catch {name} ");
                self.dump_into(*ty, out);
                out.push(' ');
                self.dump_into(*body, out);
                out.push(')');
            }
            NodeKind::Throw { value } => self.dump_list("throw", &[*value], out),
            NodeKind::Return { value } => self.dump_list("return", &[*value], out),
            NodeKind::Block { statements } => self.dump_list("block", statements, out),
            NodeKind::Parenthesized(inner) => self.dump_into(*inner, out),
            NodeKind::Missing => out.push_str("<missing>"),
        }
    }
}
