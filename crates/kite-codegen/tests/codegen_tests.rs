use crate::test_support::{Session, compile_file, compile_line, instructions, listing};
use crate::types::RESULT_FIELD;
use crate::{CodegenError, ScriptUnit, generate_script};
use kite_bytecode::{AccessFlags, Instruction, TypeDesc};
use kite_resolve::{ResolveEnvironment, ScriptMode, analyze_script};
use kite_syntax::parse_script;

fn contains(listing: &[String], needle: &str) -> bool {
    listing.iter().any(|line| line == needle)
}

fn position(listing: &[String], needle: &str) -> usize {
    listing
        .iter()
        .position(|line| line == needle)
        .unwrap_or_else(|| panic!("{needle} not in {listing:#?}"))
}

#[test]
fn test_line_property_becomes_a_field() {
    let generated = compile_line("val x = 5");
    let class = &generated.class;
    assert_eq!(&*class.name, "Line1");
    assert!(class.flags.contains(AccessFlags::SCRIPT));
    assert_eq!(class.source_file.as_deref(), Some("Line1.kite"));

    let field = class.field("x").expect("field x");
    assert_eq!(field.ty, TypeDesc::Int);
    assert!(field.flags.contains(AccessFlags::PUBLIC | AccessFlags::FINAL));
    assert!(generated.result.is_none());
    assert!(class.field(RESULT_FIELD).is_none());

    let init = listing(class, "<init>");
    assert_eq!(init[0], "aload 0");
    assert_eq!(init[1], "invokespecial kite/Any.<init>()V");
    assert!(contains(&init, "iconst 5"));
    assert!(contains(&init, "putfield Line1.x:I"));
    assert_eq!(init.last().map(String::as_str), Some("return"));
}

#[test]
fn test_later_line_reads_earlier_line_through_its_field() {
    let mut session = Session::new();
    session.line("val x = 5");
    let generated = session.line("x + 1");
    let class = &generated.class;

    let result = generated.result.as_ref().expect("line has a value");
    assert_eq!(result.ty, TypeDesc::Int);
    assert!(class.field("$line1").is_some());

    let init_method = class.methods_named("<init>").next().expect("constructor");
    assert_eq!(init_method.descriptor.to_string(), "(LLine1;)V");

    let init = listing(class, "<init>");
    let stored = position(&init, "putfield Line2.$line1:LLine1;");
    let read = position(&init, "getfield Line2.$line1:LLine1;");
    assert!(stored < read);
    assert_eq!(init[read + 1], "getfield Line1.x:I");
    assert_eq!(init[read + 2], "iconst 1");
    assert_eq!(init[read + 3], "iadd");
    assert_eq!(init[read + 4], "putfield Line2.$$result:I");
}

#[test]
fn test_division_compiles_to_idiv() {
    let generated = compile_line("1 / 0");
    let init = listing(&generated.class, "<init>");
    assert!(contains(&init, "idiv"));
    assert!(contains(&init, "putfield Line1.$$result:I"));
}

#[test]
fn test_if_else_is_a_value() {
    let generated = compile_line("if (true) {\n  1\n} else {\n  2\n}");
    assert_eq!(generated.result.as_ref().map(|field| field.ty.clone()), Some(TypeDesc::Int));
    let init = listing(&generated.class, "<init>");
    assert!(contains(&init, "iconst 1"));
    // A constant `true` condition never jumps.
    assert!(!init.iter().any(|line| line.starts_with("ifeq") || line.starts_with("ifne")));
}

#[test]
fn test_unit_line_has_no_result_field() {
    let generated = compile_line("println(\"hi\")");
    assert!(generated.result.is_none());
    let init = listing(&generated.class, "<init>");
    assert!(contains(&init, "ldc \"hi\""));
    assert!(contains(&init, "invokestatic kite/io/ConsoleKt.println(Lkite/Any;)V"));
}

#[test]
fn test_functions_are_instance_methods_of_the_line() {
    let generated = compile_line("fun add(a: Int, b: Int) = a + b\nadd(1, 2)");
    let class = &generated.class;
    let add = class.methods_named("add").next().expect("method add");
    assert!(!add.is_static());
    assert_eq!(add.descriptor.to_string(), "(II)I");
    assert_eq!(listing(class, "add"), vec!["iload 1", "iload 2", "iadd", "ireturn"]);

    let init = listing(class, "<init>");
    assert!(contains(&init, "invokevirtual Line1.add(II)I"));
}

#[test]
fn test_private_functions_use_invokespecial() {
    let generated = compile_line("private fun secret() = 42\nsecret()");
    let class = &generated.class;
    let secret = class.methods_named("secret").next().expect("method secret");
    assert!(secret.flags.contains(AccessFlags::PRIVATE));
    assert!(contains(&listing(class, "<init>"), "invokespecial Line1.secret()I"));
}

#[test]
fn test_comparisons_of_ints_use_if_icmp() {
    let generated = compile_line("1 < 2");
    let init = listing(&generated.class, "<init>");
    assert!(init.iter().any(|line| line.starts_with("if_icmpge")));
    assert!(contains(&init, "bconst true"));
    assert!(contains(&init, "bconst false"));
    assert!(contains(&init, "putfield Line1.$$result:Z"));
}

#[test]
fn test_string_comparison_calls_compare_to() {
    let generated = compile_line("\"a\" < \"b\"");
    let init = listing(&generated.class, "<init>");
    assert!(contains(&init, "invokevirtual kite/String.compareTo(Lkite/String;)I"));
    assert!(init.iter().any(|line| line.starts_with("ifge")));
}

#[test]
fn test_object_equality_calls_the_intrinsic() {
    let generated = compile_line("\"a\" == \"b\"");
    let init = listing(&generated.class, "<init>");
    assert!(contains(
        &init,
        "invokestatic kite/internal/Intrinsics.areEqual(Lkite/Any;Lkite/Any;)Z"
    ));
}

#[test]
fn test_null_checks_use_ifnull() {
    let generated = compile_line("val s: String? = null\ns == null");
    let init = listing(&generated.class, "<init>");
    assert!(init.iter().any(|line| line.starts_with("ifnonnull")));
    assert!(!init.iter().any(|line| line.contains("areEqual")));
}

#[test]
fn test_elvis_duplicates_and_tests_for_null() {
    let generated = compile_line("val s: String? = null\ns ?: \"default\"");
    let init = listing(&generated.class, "<init>");
    let dup = position(&init, "dup");
    assert!(init[dup + 1].starts_with("ifnull"));
    assert!(contains(&init, "ldc \"default\""));
}

#[test]
fn test_generic_results_are_cast_back() {
    let generated = compile_line("identity(5) + 1");
    let init = listing(&generated.class, "<init>");
    let call = position(&init, "invokestatic kite/StandardKt.identity(Lkite/Any;)Lkite/Any;");
    assert_eq!(init[call + 1], "checkcast kite/Int");
    assert_eq!(init[call + 3], "iadd");
}

#[test]
fn test_extension_function_takes_receiver_as_first_argument() {
    let generated = compile_line("val n = 3\nn.squared()");
    let init = listing(&generated.class, "<init>");
    let call = position(&init, "invokestatic kite/StandardKt.squared(I)I");
    assert_eq!(init[call - 1], "getfield Line1.n:I");
}

#[test]
fn test_constructor_call_and_member_property() {
    let generated = compile_line("import kite.collections.Box\nBox(1).value");
    let init = listing(&generated.class, "<init>");
    let new = position(&init, "new kite/collections/Box");
    assert_eq!(init[new + 1], "dup");
    assert_eq!(init[new + 2], "iconst 1");
    assert_eq!(init[new + 3], "invokespecial kite/collections/Box.<init>(Lkite/Any;)V");
    assert_eq!(init[new + 4], "invokevirtual kite/collections/Box.getValue()Lkite/Any;");
    assert_eq!(init[new + 5], "checkcast kite/Int");
}

#[test]
fn test_constants_are_inlined() {
    let generated = compile_line("MAX_INT");
    let init = listing(&generated.class, "<init>");
    assert!(contains(&init, &format!("iconst {}", i32::MAX)));
    assert!(!init.iter().any(|line| line.contains("getMAX_INT")));
}

#[test]
fn test_nothing_call_ends_the_flow() {
    let generated = compile_line("fun fail(): Int = error(\"boom\")");
    let fail = listing(&generated.class, "fail");
    let call = position(&fail, "invokestatic kite/StandardKt.error(Lkite/Any;)V");
    assert_eq!(fail.last().map(String::as_str), Some("athrow"));
    assert!(!fail[call..].iter().any(|line| line == "ireturn"));
}

#[test]
fn test_when_with_subject_compares_each_condition() {
    let generated = compile_line("val n = 2\nwhen (n) {\n  1 -> \"one\"\n  2 -> \"two\"\n  else -> \"many\"\n}");
    assert_eq!(
        generated.result.as_ref().map(|field| field.ty.clone()),
        Some(TypeDesc::object("kite/String"))
    );
    let init = listing(&generated.class, "<init>");
    let compares = init.iter().filter(|line| line.starts_with("if_icmpeq")).count();
    assert_eq!(compares, 2);
    assert!(contains(&init, "ldc \"many\""));
}

#[test]
fn test_while_loop_jumps_back() {
    let generated = compile_line("var i = 0\nwhile (i < 3) {\n  i = i + 1\n}\ni");
    let code = instructions(&generated.class, "<init>");
    let backward = code
        .iter()
        .enumerate()
        .any(|(offset, instruction)| matches!(instruction, Instruction::Goto(target) if (*target as usize) < offset));
    assert!(backward, "{code:#?}");
}

#[test]
fn test_local_variables_in_functions_use_slots() {
    let generated = compile_line("fun f(): Int {\n  val a = 2\n  var b = a * 3\n  b = b - 1\n  return b\n}");
    let f = listing(&generated.class, "f");
    assert_eq!(
        f,
        vec![
            "iconst 2", "istore 1", "iload 1", "iconst 3", "imul", "istore 2", "iload 2", "iconst 1", "isub",
            "istore 2", "iload 2", "ireturn",
        ]
    );
}

#[test]
fn test_try_catch_registers_handlers() {
    let generated = compile_line("try { 1 / 0 } catch (e: ArithmeticException) { -1 }");
    let code = crate::test_support::code(&generated.class, "<init>");
    assert_eq!(code.exception_table.len(), 1);
    assert_eq!(code.exception_table[0].catch_type.as_deref(), Some("kite/ArithmeticException"));
    let init = listing(&generated.class, "<init>");
    assert!(contains(&init, "iconst -1"));
    assert!(!init.iter().any(|line| line.starts_with("jsr")));
}

#[test]
fn test_finally_is_a_subroutine() {
    let generated = compile_line(
        "try {\n  1 / 0\n} catch (e: ArithmeticException) {\n  -1\n} finally {\n  println(\"done\")\n}",
    );
    let code = crate::test_support::code(&generated.class, "<init>");
    let catch_types: Vec<Option<&str>> = code
        .exception_table
        .iter()
        .map(|entry| entry.catch_type.as_deref())
        .collect();
    assert!(catch_types.contains(&Some("kite/ArithmeticException")));
    assert!(catch_types.contains(&None));

    let init = listing(&generated.class, "<init>");
    // The protected body, the catch and the rethrowing handler each call it.
    assert_eq!(init.iter().filter(|line| line.starts_with("jsr")).count(), 3);
    assert_eq!(init.iter().filter(|line| line.starts_with("ret ")).count(), 1);
    assert_eq!(
        init.iter().filter(|line| *line == "invokestatic kite/io/ConsoleKt.println(Lkite/Any;)V").count(),
        1
    );
}

#[test]
fn test_return_inside_finally_runs_the_subroutine_first() {
    let generated = compile_line(
        "fun f(): Int {\n  try {\n    return 1\n  } finally {\n    println(\"cleanup\")\n  }\n  return 0\n}",
    );
    let f = listing(&generated.class, "f");
    let first_return = position(&f, "ireturn");
    let jsr = f.iter().position(|line| line.starts_with("jsr")).expect("jsr");
    assert!(jsr < first_return);
    assert_eq!(f[0], "iconst 1");
}

#[test]
fn test_try_in_expression_spills_the_stack() {
    let generated = compile_line("1 + try { 2 } catch (e: Exception) { 3 }");
    let init = listing(&generated.class, "<init>");
    let spill = init.iter().position(|line| line.starts_with("istore")).expect("spilled operand");
    assert_eq!(init[spill - 1], "iconst 1");
    assert!(contains(&init, "iadd"));
}

#[test]
fn test_line_numbers_follow_statements() {
    let generated = compile_line("val a = 1\nval b = 2\na + b");
    let code = crate::test_support::code(&generated.class, "<init>");
    let lines: Vec<u32> = code.line_numbers.iter().map(|entry| entry.line).collect();
    assert_eq!(lines, vec![1, 2, 3]);
}

#[test]
fn test_file_facade_uses_static_members() {
    let generated = compile_file(
        "counter.kite",
        "val greeting = \"hi\"\nvar count = 0\nfun bump(): Int {\n  count = count + 1\n  return count\n}\nprintln(greeting)",
    );
    let class = &generated.class;
    assert_eq!(&*class.name, "CounterKt");
    assert!(generated.result.is_none());

    let count = class.field("count").expect("field count");
    assert!(count.flags.contains(AccessFlags::STATIC | AccessFlags::PRIVATE));
    assert!(!count.flags.contains(AccessFlags::FINAL));

    let clinit = listing(class, "<clinit>");
    assert!(contains(&clinit, "putstatic CounterKt.greeting:Lkite/String;"));
    assert!(contains(&clinit, "getstatic CounterKt.greeting:Lkite/String;"));

    let bump = class.methods_named("bump").next().expect("bump");
    assert!(bump.is_static());
    assert!(contains(&listing(class, "bump"), "putstatic CounterKt.count:I"));

    assert_eq!(listing(class, "getGreeting"), vec!["getstatic CounterKt.greeting:Lkite/String;", "areturn"]);
    assert_eq!(listing(class, "setCount"), vec!["iload 0", "putstatic CounterKt.count:I", "return"]);
}

#[test]
fn test_scripts_with_errors_are_rejected() {
    let env = ResolveEnvironment::stdlib().expect("stdlib environment loads");
    let script = parse_script("Line1.kite", "undefinedName + 1");
    let analysis = analyze_script(&env, &script, ScriptMode::ReplLine { line: 1 }, &env.default_scope());
    let error = generate_script(&ScriptUnit {
        script: &script,
        source: "undefinedName + 1",
        analysis: &analysis,
        earlier_lines: &[],
    })
    .expect_err("analysis errors");
    assert!(matches!(error, CodegenError::AnalysisErrors { .. }));
}
