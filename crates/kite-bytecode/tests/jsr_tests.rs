use super::cfg_tests::{assert_well_formed, call, code};
use super::*;
use crate::builder::CodeBuilder;
use crate::class_file::Code;
use crate::stack::Frame;

/// `calls` call sites of one subroutine that stores its return address
/// in local 1, calls `flush` and returns.
fn shared_subroutine(calls: u32) -> Code {
    let subroutine = calls + 2;
    let mut instructions: Vec<Instruction> = (0..calls).map(|_| Instruction::Jsr(subroutine)).collect();
    instructions.push(Instruction::IConst(0));
    instructions.push(Instruction::IReturn);
    instructions.push(Instruction::AStore(1));
    instructions.push(call("flush"));
    instructions.push(Instruction::Ret(1));
    code(instructions)
}

fn blocks_calling<'a>(graph: &'a ControlFlowGraph, name: &str) -> Vec<&'a BasicBlock> {
    let target = call(name);
    graph
        .blocks()
        .filter(|block| block.instructions.contains(&target))
        .collect()
}

fn assert_no_subroutine_plumbing(graph: &ControlFlowGraph) {
    for block in graph.blocks() {
        for instruction in &block.instructions {
            assert!(
                !matches!(instruction, Instruction::Jsr(_) | Instruction::Ret(_)),
                "block {} still holds {instruction}",
                block.id
            );
        }
    }
    assert_eq!(graph.subroutines().count(), 0);
}

#[test]
fn test_ret_returns_to_the_block_after_each_jsr() {
    let graph = ControlFlowGraph::build_blocks(&shared_subroutine(2)).expect("valid code");
    // b0: jsr, b1: jsr, b2: iconst/ireturn, b3: subroutine, b4: sink
    assert_eq!(graph.block(0).expect("first call").successors(), &[3]);
    assert_eq!(graph.block(3).expect("subroutine").successors(), &[1, 2]);
    assert_eq!(graph.subroutines().collect::<Vec<_>>(), vec![(0, 1), (1, 2)]);
    assert_well_formed(&graph);
}

#[test]
fn test_each_call_site_gets_its_own_copy() {
    for calls in 1..=4 {
        let mut graph = ControlFlowGraph::build_blocks(&shared_subroutine(calls)).expect("valid code");
        graph.inline_jsr().expect("inlining converges");
        assert_eq!(blocks_calling(&graph, "flush").len(), calls as usize, "{calls} call sites");
        assert_no_subroutine_plumbing(&graph);
        assert_well_formed(&graph);
        for block in graph.blocks() {
            assert!(
                !matches!(block.instructions.first(), Some(Instruction::AStore(1))),
                "return address store left in block {}",
                block.id
            );
        }
    }
}

#[test]
fn test_inlined_copies_form_a_chain() {
    let mut graph = ControlFlowGraph::build_blocks(&shared_subroutine(2)).expect("valid code");
    graph.inline_jsr().expect("inlining converges");
    // The first call's copy is new; the second call keeps the original.
    let entry = graph.entry();
    assert!(entry > graph.sink(), "copies get fresh ids");
    let first = graph.block(entry).expect("entry");
    assert_eq!(first.instructions, vec![call("flush")]);
    assert_eq!(first.successors(), &[3]);
    let second = graph.block(3).expect("original subroutine");
    assert_eq!(second.successors(), &[2]);
    assert_eq!(graph.block(2).expect("tail").successors(), &[graph.sink()]);
}

#[test]
fn test_nested_subroutines_terminate() {
    // Two calls of an outer subroutine that itself calls an inner one.
    let body = code(vec![
        Instruction::Jsr(3),
        Instruction::Jsr(3),
        Instruction::Return,
        Instruction::AStore(1),
        Instruction::Jsr(6),
        Instruction::Ret(1),
        Instruction::AStore(2),
        call("flush"),
        Instruction::Ret(2),
    ]);
    let mut graph = ControlFlowGraph::build_blocks(&body).expect("valid code");
    assert_eq!(graph.subroutines().count(), 3);
    assert_well_formed(&graph);

    graph.inline_jsr().expect("inlining converges");
    assert_eq!(blocks_calling(&graph, "flush").len(), 2);
    assert_no_subroutine_plumbing(&graph);
    assert_well_formed(&graph);
}

#[test]
fn test_try_finally_inlines_and_still_verifies() {
    let close = call("close");
    let mut builder = CodeBuilder::new(0);
    let start = builder.new_label();
    let end = builder.new_label();
    let handler = builder.new_label();
    let finally = builder.new_label();
    let done = builder.new_label();

    builder.place(start);
    builder.emit(call("flush"));
    builder.place(end);
    builder.exception_handler(start, end, handler, None);
    builder.jsr(finally);
    builder.goto(done);
    builder.place(handler);
    let thrown = builder.new_local();
    builder.emit(Instruction::AStore(thrown));
    builder.jsr(finally);
    builder.emit(Instruction::ALoad(thrown));
    builder.emit(Instruction::AThrow);
    builder.place(finally);
    let address = builder.new_local();
    builder.emit(Instruction::AStore(address));
    builder.emit(close.clone());
    builder.emit(Instruction::Ret(address));
    builder.place(done);
    builder.emit(Instruction::Return);
    let body = builder.finish().expect("try/finally builds");

    let mut graph = ControlFlowGraph::build_blocks(&body).expect("valid code");
    graph.verify(Frame::default()).expect("verifies with subroutines");
    graph.inline_jsr().expect("inlining converges");
    graph.verify(Frame::default()).expect("verifies after inlining");
    assert_eq!(blocks_calling(&graph, "close").len(), 2);
    assert_no_subroutine_plumbing(&graph);
    assert_well_formed(&graph);
    assert_eq!(graph.exception_ranges().len(), 1);
}

#[test]
fn test_removing_a_call_site_drops_its_subroutine_records() {
    let mut graph = ControlFlowGraph::build_blocks(&shared_subroutine(2)).expect("valid code");
    assert!(graph.remove_block(1));
    // Block 1 was the second call and the first call's return site.
    assert_eq!(graph.subroutines().count(), 0);
    assert_eq!(graph.block(3).expect("subroutine").successors(), &[2]);
    assert_well_formed(&graph);
}
