use super::*;
use crate::test_support::Session;

/// Names offered when completing at the end of `line`, after `history`.
fn complete_at_end(history: &[&str], line: &str) -> Vec<String> {
    let mut session = Session::new();
    for earlier in history {
        let (_, analysis) = session.line(earlier);
        assert!(!analysis.has_errors(), "{:?}", analysis.diagnostics());
    }
    let (script, analysis) = session.line(line);
    let target = completion_target(&script, line.len() as u32).expect("completion target at end");
    let tips = TipsManager::new(&analysis.trace, &script, &session.env.finder, &session.env.builtins);
    let mut names: Vec<String> = tips
        .complete(&target)
        .iter()
        .map(|variant| variant.name().as_str().to_string())
        .collect();
    // Overloads come back once per arity.
    names.dedup();
    names
}

#[test]
fn test_earlier_line_members_are_offered() {
    let names = complete_at_end(&["val bar = 1\nprivate val foo = 2"], "ba");
    assert!(names.contains(&"bar".to_string()), "{names:?}");

    let names = complete_at_end(&["val bar = 1\nprivate val foo = 2"], "fo");
    assert!(!names.contains(&"foo".to_string()), "{names:?}");
}

#[test]
fn test_stdlib_names_by_prefix() {
    let names = complete_at_end(&[], "print");
    assert_eq!(names, vec!["print", "println"]);
}

#[test]
fn test_receiver_members_and_extensions() {
    let names = complete_at_end(&[], "\"kite\".l");
    assert_eq!(names, vec!["lastIndex", "length"]);

    let names = complete_at_end(&[], "3.sq");
    assert_eq!(names, vec!["squared"]);

    let names = complete_at_end(&[], "\"kite\".sq");
    assert!(names.is_empty(), "{names:?}");
}

#[test]
fn test_package_receiver_offers_members_and_subpackages() {
    let names = complete_at_end(&[], "kite.io.pr");
    assert_eq!(names, vec!["print", "println"]);

    let names = complete_at_end(&[], "kite.co");
    assert_eq!(names, vec!["collections"]);
}

#[test]
fn test_import_segment() {
    let mut session = Session::new();
    let text = "import kite.col";
    let script = kite_syntax::parse_script("Line1.kite", text);
    let target = completion_target(&script, text.len() as u32).expect("import target");
    assert_eq!(
        target,
        CompletionTarget::Import {
            package: FqName::parse("kite"),
            prefix: "col".to_string(),
        }
    );
    let (_, analysis) = session.line("1");
    let tips = TipsManager::new(&analysis.trace, &script, &session.env.finder, &session.env.builtins);
    let names: Vec<String> = tips
        .complete(&target)
        .iter()
        .map(|variant| variant.name().as_str().to_string())
        .collect();
    assert_eq!(names, vec!["collections"]);
}

#[test]
fn test_import_offers_packages_only() {
    let mut session = Session::new();
    let (_, analysis) = session.line("1");
    let complete = |text: &str| {
        let script = kite_syntax::parse_script("Line1.kite", text);
        let target = completion_target(&script, text.len() as u32).expect("import target");
        let tips = TipsManager::new(&analysis.trace, &script, &session.env.finder, &session.env.builtins);
        tips.complete(&target)
    };

    // `kite.io` declares `print` and two `println` overloads.
    assert!(complete("import kite.io.pr").is_empty());

    let variants = complete("import kite.i");
    assert_eq!(variants.len(), 1);
    assert!(matches!(&variants[0], DeclarationDescriptor::Package(package) if package.to_string() == "kite.io"));
}

#[test]
fn test_no_target_inside_literal() {
    let script = kite_syntax::parse_script("Line1.kite", "1 + 2");
    assert_eq!(completion_target(&script, 5), None);
}
