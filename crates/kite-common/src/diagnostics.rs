//! Diagnostic types and message lookup.
//!
//! Every phase (parser, resolver, analyzer) reports problems as
//! [`Diagnostic`] values collected into a sink; nothing user-facing is thrown.
//! Message templates use `{0}`, `{1}` placeholders filled by [`format_message`].

use serde::Serialize;

// =============================================================================
// Diagnostic Types
// =============================================================================

/// Diagnostic category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum DiagnosticCategory {
    Warning = 0,
    Error = 1,
    Message = 2,
}

/// Related information for a diagnostic (e.g. the conflicting declaration).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DiagnosticRelatedInformation {
    pub file: String,
    pub start: u32,
    pub length: u32,
    pub message_text: String,
    pub category: DiagnosticCategory,
    pub code: u32,
}

/// A positioned, severity-tagged message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub file: String,
    pub start: u32,
    pub length: u32,
    pub message_text: String,
    pub category: DiagnosticCategory,
    pub code: u32,
    /// Related information spans (e.g., where a name was first declared)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub related_information: Vec<DiagnosticRelatedInformation>,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    #[must_use]
    pub const fn error(file: String, start: u32, length: u32, message: String, code: u32) -> Self {
        Self {
            file,
            start,
            length,
            message_text: message,
            category: DiagnosticCategory::Error,
            code,
            related_information: Vec::new(),
        }
    }

    /// Create a new warning diagnostic.
    #[must_use]
    pub const fn warning(
        file: String,
        start: u32,
        length: u32,
        message: String,
        code: u32,
    ) -> Self {
        Self {
            file,
            start,
            length,
            message_text: message,
            category: DiagnosticCategory::Warning,
            code,
            related_information: Vec::new(),
        }
    }

    /// Build a diagnostic from a registered code, formatting its template with `args`.
    ///
    /// Unknown codes fall back to the joined arguments so that a missing
    /// table entry never hides the problem.
    #[must_use]
    pub fn from_code(file: &str, start: u32, length: u32, code: u32, args: &[&str]) -> Self {
        let (category, text) = match get_diagnostic_message(code) {
            Some(message) => (message.category, format_message(message.message, args)),
            None => (DiagnosticCategory::Error, args.join(" ")),
        };
        Self {
            file: file.to_string(),
            start,
            length,
            message_text: text,
            category,
            code,
            related_information: Vec::new(),
        }
    }

    /// Add related information to this diagnostic.
    #[must_use]
    pub fn with_related(mut self, file: String, start: u32, length: u32, message: String) -> Self {
        self.related_information.push(DiagnosticRelatedInformation {
            file,
            start,
            length,
            message_text: message,
            category: DiagnosticCategory::Message,
            code: 0,
        });
        self
    }

    pub fn is_error(&self) -> bool {
        self.category == DiagnosticCategory::Error
    }

    /// Offset one past the end of the highlighted range.
    pub fn end(&self) -> u32 {
        self.start + self.length
    }
}

/// Format a diagnostic message by replacing {0}, {1}, etc. with arguments.
#[must_use]
pub fn format_message(template: &str, args: &[&str]) -> String {
    let mut result = template.to_string();
    for (i, arg) in args.iter().enumerate() {
        result = result.replace(&format!("{{{i}}}"), arg);
    }
    result
}

/// A diagnostic message definition with code, category, and message template.
#[derive(Clone, Copy, Debug)]
pub struct DiagnosticMessage {
    pub code: u32,
    pub category: DiagnosticCategory,
    pub message: &'static str,
}

/// Numeric diagnostic codes.
///
/// 1xxx are syntax errors, 2xxx semantic errors, 3xxx warnings.
pub mod diagnostic_codes {
    pub const EXPECTING_EXPRESSION: u32 = 1001;
    pub const EXPECTING_TOKEN: u32 = 1002;
    pub const UNEXPECTED_TOKEN: u32 = 1003;
    pub const EXPECTING_TYPE: u32 = 1004;
    pub const EXPECTING_IDENTIFIER: u32 = 1005;
    pub const UNTERMINATED_STRING: u32 = 1006;
    pub const INVALID_CHARACTER: u32 = 1007;
    pub const INT_LITERAL_OUT_OF_RANGE: u32 = 1008;
    pub const UNTERMINATED_COMMENT: u32 = 1009;
    pub const EXPRESSION_TOO_DEEP: u32 = 1010;

    pub const UNRESOLVED_REFERENCE: u32 = 2001;
    pub const TYPE_MISMATCH: u32 = 2002;
    pub const NONE_APPLICABLE: u32 = 2003;
    pub const OVERLOAD_RESOLUTION_AMBIGUITY: u32 = 2004;
    pub const TOO_MANY_ARGUMENTS: u32 = 2005;
    pub const NO_VALUE_FOR_PARAMETER: u32 = 2006;
    pub const UNSAFE_CALL: u32 = 2007;
    pub const VAL_REASSIGNMENT: u32 = 2008;
    pub const TYPE_INFERENCE_FAILED: u32 = 2009;
    pub const INVISIBLE_MEMBER: u32 = 2010;
    pub const CONDITION_TYPE_MISMATCH: u32 = 2011;
    pub const RETURN_NOT_ALLOWED: u32 = 2012;
    pub const REDECLARATION: u32 = 2013;
    pub const UNRESOLVED_IMPORT: u32 = 2014;
    pub const NOT_A_FUNCTION: u32 = 2015;
    pub const WRONG_NUMBER_OF_TYPE_ARGUMENTS: u32 = 2016;
    pub const UPPER_BOUND_VIOLATED: u32 = 2017;
    pub const NOT_A_THROWABLE: u32 = 2018;
    pub const NO_ELSE_IN_WHEN: u32 = 2019;
    pub const PACKAGE_USED_AS_EXPRESSION: u32 = 2020;
    pub const ASSIGNMENT_TARGET: u32 = 2021;
    pub const NOT_A_CLASS: u32 = 2022;

    pub const UNUSED_EXPRESSION: u32 = 3001;
    pub const USELESS_ELVIS: u32 = 3002;
}

/// Registered diagnostic messages.
pub static DIAGNOSTIC_MESSAGES: &[DiagnosticMessage] = {
    use DiagnosticCategory::{Error, Warning};
    use diagnostic_codes::*;
    &[
        DiagnosticMessage { code: EXPECTING_EXPRESSION, category: Error, message: "Expecting an expression" },
        DiagnosticMessage { code: EXPECTING_TOKEN, category: Error, message: "Expecting '{0}'" },
        DiagnosticMessage { code: UNEXPECTED_TOKEN, category: Error, message: "Unexpected token '{0}'" },
        DiagnosticMessage { code: EXPECTING_TYPE, category: Error, message: "Type expected" },
        DiagnosticMessage { code: EXPECTING_IDENTIFIER, category: Error, message: "Expecting an identifier" },
        DiagnosticMessage { code: UNTERMINATED_STRING, category: Error, message: "Unterminated string literal" },
        DiagnosticMessage { code: INVALID_CHARACTER, category: Error, message: "Invalid character '{0}'" },
        DiagnosticMessage { code: INT_LITERAL_OUT_OF_RANGE, category: Error, message: "The value '{0}' is out of range for Int" },
        DiagnosticMessage { code: UNTERMINATED_COMMENT, category: Error, message: "Unclosed comment" },
        DiagnosticMessage { code: EXPRESSION_TOO_DEEP, category: Error, message: "Expression is nested too deeply" },
        DiagnosticMessage { code: UNRESOLVED_REFERENCE, category: Error, message: "Unresolved reference: {0}" },
        DiagnosticMessage { code: TYPE_MISMATCH, category: Error, message: "Type mismatch: inferred type is {0} but {1} was expected" },
        DiagnosticMessage { code: NONE_APPLICABLE, category: Error, message: "None of the following candidates is applicable: {0}" },
        DiagnosticMessage { code: OVERLOAD_RESOLUTION_AMBIGUITY, category: Error, message: "Overload resolution ambiguity: {0}" },
        DiagnosticMessage { code: TOO_MANY_ARGUMENTS, category: Error, message: "Too many arguments for {0}" },
        DiagnosticMessage { code: NO_VALUE_FOR_PARAMETER, category: Error, message: "No value passed for parameter '{0}'" },
        DiagnosticMessage { code: UNSAFE_CALL, category: Error, message: "Only safe calls are allowed on a nullable receiver of type {0}" },
        DiagnosticMessage { code: VAL_REASSIGNMENT, category: Error, message: "Val cannot be reassigned: {0}" },
        DiagnosticMessage { code: TYPE_INFERENCE_FAILED, category: Error, message: "Not enough information to infer type variable {0}" },
        DiagnosticMessage { code: INVISIBLE_MEMBER, category: Error, message: "Cannot access '{0}': it is private in '{1}'" },
        DiagnosticMessage { code: CONDITION_TYPE_MISMATCH, category: Error, message: "Condition must be of type Boolean, but is {0}" },
        DiagnosticMessage { code: RETURN_NOT_ALLOWED, category: Error, message: "'return' is not allowed here" },
        DiagnosticMessage { code: REDECLARATION, category: Error, message: "Conflicting declarations: {0}" },
        DiagnosticMessage { code: UNRESOLVED_IMPORT, category: Error, message: "Unresolved import: {0}" },
        DiagnosticMessage { code: NOT_A_FUNCTION, category: Error, message: "Expression '{0}' of type {1} cannot be invoked as a function" },
        DiagnosticMessage { code: WRONG_NUMBER_OF_TYPE_ARGUMENTS, category: Error, message: "{0} type arguments expected for {1}" },
        DiagnosticMessage { code: UPPER_BOUND_VIOLATED, category: Error, message: "Type argument is not within its bounds: {0} is not a subtype of {1}" },
        DiagnosticMessage { code: NOT_A_THROWABLE, category: Error, message: "Thrown expression must be a Throwable, but is {0}" },
        DiagnosticMessage { code: NO_ELSE_IN_WHEN, category: Error, message: "'when' expression must be exhaustive, add an 'else' branch" },
        DiagnosticMessage { code: PACKAGE_USED_AS_EXPRESSION, category: Error, message: "Expression expected, but a package name found: {0}" },
        DiagnosticMessage { code: ASSIGNMENT_TARGET, category: Error, message: "Variable expected on the left side of an assignment" },
        DiagnosticMessage { code: NOT_A_CLASS, category: Error, message: "{0} is not a class" },
        DiagnosticMessage { code: UNUSED_EXPRESSION, category: Warning, message: "The expression is unused" },
        DiagnosticMessage { code: USELESS_ELVIS, category: Warning, message: "Elvis operator always returns the left operand of non-nullable type {0}" },
    ]
};

/// Look up a diagnostic message definition by code.
#[must_use]
pub fn get_diagnostic_message(code: u32) -> Option<&'static DiagnosticMessage> {
    DIAGNOSTIC_MESSAGES.iter().find(|m| m.code == code)
}

/// Get the message template for a diagnostic code.
#[must_use]
pub fn get_message_template(code: u32) -> Option<&'static str> {
    get_diagnostic_message(code).map(|m| m.message)
}
