use super::reporter::Reporter;
use kite_common::Diagnostic;
use kite_common::diagnostics::DiagnosticRelatedInformation;
use kite_common::DiagnosticCategory;

fn reporter(file: &str, text: &str) -> Reporter {
    let mut reporter = Reporter::new(false);
    reporter.add_source(file, text);
    reporter
}

#[test]
fn test_location_code_and_underline() {
    let mut reporter = reporter("main.kite", "val x = 1\nval y: Int = \"no\"\n");
    let diagnostic = Diagnostic::error("main.kite".to_string(), 23, 4, "Type mismatch".to_string(), 2322);
    assert_eq!(
        reporter.format_diagnostic(&diagnostic),
        "main.kite:2:14 - error KT2322: Type mismatch\n    2   val y: Int = \"no\"\n                     ~~~~"
    );
}

#[test]
fn test_related_information_and_multiple_diagnostics() {
    let mut reporter = reporter("a.kite", "val x = 1\nval x = 2\n");
    let mut diagnostic = Diagnostic::error("a.kite".to_string(), 14, 1, "Conflicting declarations: x".to_string(), 2300);
    diagnostic.related_information.push(DiagnosticRelatedInformation {
        file: "a.kite".to_string(),
        start: 4,
        length: 1,
        message_text: "x is declared here".to_string(),
        category: DiagnosticCategory::Message,
        code: 0,
    });
    let rendered = reporter.render(&[diagnostic.clone(), diagnostic]);
    assert!(rendered.contains("  Related: a.kite:1:5 - x is declared here\n    1   val x = 1\n            ~"), "{rendered}");
    assert_eq!(rendered.matches("a.kite:2:5 - error KT2300").count(), 2, "{rendered}");
}

#[test]
fn test_unknown_files_and_codes() {
    let mut reporter = Reporter::new(false);
    let diagnostic = Diagnostic::error(String::new(), 0, 0, "no file".to_string(), 0);
    assert_eq!(reporter.format_diagnostic(&diagnostic), "<unknown> - error: no file");

    let diagnostic = Diagnostic::error("nowhere/missing.kite".to_string(), 3, 2, "gone".to_string(), 1001);
    assert_eq!(reporter.format_diagnostic(&diagnostic), "nowhere/missing.kite - error KT1001: gone");
}

#[test]
fn test_sources_are_read_from_disk() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("disk.kite");
    std::fs::write(&path, "x\n").expect("write source");
    let file = path.display().to_string();
    let mut reporter = Reporter::new(false);
    let diagnostic = Diagnostic::error(file.clone(), 0, 1, "Unresolved reference: x".to_string(), 2304);
    assert!(reporter.format_diagnostic(&diagnostic).starts_with(&format!("{file}:1:1 - error KT2304")));
}
