//! Token kinds.

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SyntaxKind {
    EndOfFile,
    Unknown,

    Identifier,
    IntLiteral,
    StringLiteral,

    // Keywords
    ImportKeyword,
    ValKeyword,
    VarKeyword,
    FunKeyword,
    PrivateKeyword,
    IfKeyword,
    ElseKeyword,
    WhenKeyword,
    WhileKeyword,
    TryKeyword,
    CatchKeyword,
    FinallyKeyword,
    ThrowKeyword,
    ReturnKeyword,
    TrueKeyword,
    FalseKeyword,
    NullKeyword,
    InKeyword,
    OutKeyword,

    // Punctuation
    OpenParen,
    CloseParen,
    OpenBrace,
    CloseBrace,
    LessThan,
    GreaterThan,
    LessThanEquals,
    GreaterThanEquals,
    Comma,
    Dot,
    Colon,
    Semicolon,
    Question,
    QuestionColon,
    Exclamation,
    Equals,
    EqualsEquals,
    ExclamationEquals,
    Arrow,
    Plus,
    Minus,
    Asterisk,
    Slash,
    Percent,
    AmpersandAmpersand,
    BarBar,
}

impl SyntaxKind {
    pub fn keyword(text: &str) -> Option<SyntaxKind> {
        Some(match text {
            "import" => SyntaxKind::ImportKeyword,
            "val" => SyntaxKind::ValKeyword,
            "var" => SyntaxKind::VarKeyword,
            "fun" => SyntaxKind::FunKeyword,
            "private" => SyntaxKind::PrivateKeyword,
            "if" => SyntaxKind::IfKeyword,
            "else" => SyntaxKind::ElseKeyword,
            "when" => SyntaxKind::WhenKeyword,
            "while" => SyntaxKind::WhileKeyword,
            "try" => SyntaxKind::TryKeyword,
            "catch" => SyntaxKind::CatchKeyword,
            "finally" => SyntaxKind::FinallyKeyword,
            "throw" => SyntaxKind::ThrowKeyword,
            "return" => SyntaxKind::ReturnKeyword,
            "true" => SyntaxKind::TrueKeyword,
            "false" => SyntaxKind::FalseKeyword,
            "null" => SyntaxKind::NullKeyword,
            "in" => SyntaxKind::InKeyword,
            "out" => SyntaxKind::OutKeyword,
            _ => return None,
        })
    }

    /// Soft keywords that may also be used as names.
    pub fn is_soft_keyword(self) -> bool {
        matches!(self, SyntaxKind::InKeyword | SyntaxKind::OutKeyword)
    }

    pub fn text(self) -> &'static str {
        match self {
            SyntaxKind::EndOfFile => "end of input",
            SyntaxKind::Unknown => "unknown",
            SyntaxKind::Identifier => "identifier",
            SyntaxKind::IntLiteral => "integer literal",
            SyntaxKind::StringLiteral => "string literal",
            SyntaxKind::ImportKeyword => "import",
            SyntaxKind::ValKeyword => "val",
            SyntaxKind::VarKeyword => "var",
            SyntaxKind::FunKeyword => "fun",
            SyntaxKind::PrivateKeyword => "private",
            SyntaxKind::IfKeyword => "if",
            SyntaxKind::ElseKeyword => "else",
            SyntaxKind::WhenKeyword => "when",
            SyntaxKind::WhileKeyword => "while",
            SyntaxKind::TryKeyword => "try",
            SyntaxKind::CatchKeyword => "catch",
            SyntaxKind::FinallyKeyword => "finally",
            SyntaxKind::ThrowKeyword => "throw",
            SyntaxKind::ReturnKeyword => "return",
            SyntaxKind::TrueKeyword => "true",
            SyntaxKind::FalseKeyword => "false",
            SyntaxKind::NullKeyword => "null",
            SyntaxKind::InKeyword => "in",
            SyntaxKind::OutKeyword => "out",
            SyntaxKind::OpenParen => "(",
            SyntaxKind::CloseParen => ")",
            SyntaxKind::OpenBrace => "{",
            SyntaxKind::CloseBrace => "}",
            SyntaxKind::LessThan => "<",
            SyntaxKind::GreaterThan => ">",
            SyntaxKind::LessThanEquals => "<=",
            SyntaxKind::GreaterThanEquals => ">=",
            SyntaxKind::Comma => ",",
            SyntaxKind::Dot => ".",
            SyntaxKind::Colon => ":",
            SyntaxKind::Semicolon => ";",
            SyntaxKind::Question => "?",
            SyntaxKind::QuestionColon => "?:",
            SyntaxKind::Exclamation => "!",
            SyntaxKind::Equals => "=",
            SyntaxKind::EqualsEquals => "==",
            SyntaxKind::ExclamationEquals => "!=",
            SyntaxKind::Arrow => "->",
            SyntaxKind::Plus => "+",
            SyntaxKind::Minus => "-",
            SyntaxKind::Asterisk => "*",
            SyntaxKind::Slash => "/",
            SyntaxKind::Percent => "%",
            SyntaxKind::AmpersandAmpersand => "&&",
            SyntaxKind::BarBar => "||",
        }
    }
}

impl fmt::Display for SyntaxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}
