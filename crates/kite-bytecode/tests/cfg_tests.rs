use super::*;
use crate::class_file::{Code, ExceptionEntry};
use crate::error::CfgError;
use crate::instruction::{Condition, MethodDescriptor, MethodRef, TypeDesc};
use crate::stack::{Frame, SlotKind};

pub(crate) fn code(instructions: Vec<Instruction>) -> Code {
    Code {
        instructions,
        ..Code::default()
    }
}

pub(crate) fn call(name: &str) -> Instruction {
    Instruction::InvokeStatic(MethodRef::new(
        "kite/io/ConsoleKt",
        name,
        MethodDescriptor::new(Vec::new(), TypeDesc::Void),
    ))
}

/// Edges are symmetric, only the sink lacks successors, and the sink has
/// no outgoing edges.
pub(crate) fn assert_well_formed(graph: &ControlFlowGraph) {
    for block in graph.blocks() {
        for &successor in block.successors() {
            let target = graph.block(successor).expect("successor exists");
            assert!(target.predecessors().contains(&block.id), "{} -> {successor} not mirrored", block.id);
        }
        for &predecessor in block.predecessors() {
            let source = graph.block(predecessor).expect("predecessor exists");
            assert!(source.successors().contains(&block.id), "{predecessor} -> {} not mirrored", block.id);
        }
        for &handler in block.exception_successors() {
            let target = graph.block(handler).expect("handler exists");
            assert!(target.exception_predecessors().contains(&block.id));
        }
        for &protected in block.exception_predecessors() {
            let source = graph.block(protected).expect("protected block exists");
            assert!(source.exception_successors().contains(&block.id));
        }
        if block.id == graph.sink() {
            assert!(block.successors().is_empty());
            assert!(block.exception_successors().is_empty());
            assert!(block.is_empty());
        } else {
            assert!(!block.successors().is_empty(), "block {} has no successor", block.id);
        }
    }
}

/// `if (x == 0) 2 else 1`
fn branch() -> Code {
    code(vec![
        Instruction::ILoad(0),
        Instruction::If(Condition::Eq, 4),
        Instruction::IConst(1),
        Instruction::IReturn,
        Instruction::IConst(2),
        Instruction::IReturn,
    ])
}

#[test]
fn test_straight_line_code_is_one_block() {
    let graph = ControlFlowGraph::build_blocks(&code(vec![Instruction::IConst(1), Instruction::IReturn]))
        .expect("valid code");
    assert_eq!(graph.block_count(), 2);
    let entry = graph.block(graph.entry()).expect("entry");
    assert_eq!(entry.instructions.len(), 2);
    assert_eq!(entry.successors(), &[graph.sink()]);
    assert_well_formed(&graph);
}

#[test]
fn test_conditional_jump_lists_target_before_fallthrough() {
    let graph = ControlFlowGraph::build_blocks(&branch()).expect("valid code");
    assert_eq!(graph.block_count(), 4);
    let entry = graph.block(graph.entry()).expect("entry");
    assert_eq!(entry.offsets, vec![0, 1]);
    assert_eq!(entry.successors(), &[2, 1]);
    assert_eq!(graph.block(2).and_then(BasicBlock::start_offset), Some(4));
    assert_eq!(graph.sink(), 3);
    assert_well_formed(&graph);
}

#[test]
fn test_switch_lists_default_before_cases() {
    let graph = ControlFlowGraph::build_blocks(&code(vec![
        Instruction::ILoad(0),
        Instruction::LookupSwitch {
            default: 6,
            cases: vec![(1, 2), (2, 4)],
        },
        Instruction::IConst(10),
        Instruction::IReturn,
        Instruction::IConst(20),
        Instruction::IReturn,
        Instruction::IConst(0),
        Instruction::IReturn,
    ]))
    .expect("valid code");
    let entry = graph.block(graph.entry()).expect("entry");
    assert_eq!(entry.successors(), &[3, 1, 2]);
    assert_well_formed(&graph);
}

#[test]
fn test_handler_entries_with_the_same_range_are_merged() {
    let mut body = code(vec![call("flush"), Instruction::Return, Instruction::AStore(0), Instruction::Return]);
    for catch_type in ["kite/IllegalStateException", "kite/ArithmeticException"] {
        body.exception_table.push(ExceptionEntry {
            from: 0,
            to: 1,
            handler: 2,
            catch_type: Some(catch_type.into()),
        });
    }
    let graph = ControlFlowGraph::build_blocks(&body).expect("valid code");
    let ranges = graph.exception_ranges();
    assert_eq!(ranges.len(), 1);
    assert_eq!(ranges[0].protected, vec![0]);
    assert_eq!(ranges[0].handler, 2);
    assert_eq!(
        ranges[0].catch_types,
        vec![
            Some("kite/IllegalStateException".into()),
            Some("kite/ArithmeticException".into())
        ]
    );
    assert_eq!(graph.block(0).expect("protected").exception_successors(), &[2]);
    assert_well_formed(&graph);
}

#[test]
fn test_malformed_code_is_rejected() {
    assert_eq!(ControlFlowGraph::build_blocks(&code(Vec::new())).err(), Some(CfgError::EmptyCode));
    assert_eq!(
        ControlFlowGraph::build_blocks(&code(vec![Instruction::Goto(3)])).err(),
        Some(CfgError::JumpOutOfRange { offset: 0, target: 3 })
    );
    assert_eq!(
        ControlFlowGraph::build_blocks(&code(vec![Instruction::IConst(1)])).err(),
        Some(CfgError::FallsOffEnd { offset: 0 })
    );
    assert_eq!(
        ControlFlowGraph::build_blocks(&code(vec![Instruction::AStore(0), Instruction::Ret(0), Instruction::Jsr(0)]))
            .err(),
        Some(CfgError::JsrWithoutReturn { offset: 2 })
    );
}

#[test]
fn test_reverse_postorder_starts_at_the_entry() {
    let graph = ControlFlowGraph::build_blocks(&branch()).expect("valid code");
    let order = graph.reverse_postorder();
    assert_eq!(order.first(), Some(&graph.entry()));
    assert_eq!(order.last(), Some(&graph.sink()));
    assert_eq!(order.len(), graph.block_count());
}

#[test]
fn test_unreachable_blocks_are_left_out_of_traversals() {
    let graph = ControlFlowGraph::build_blocks(&code(vec![
        Instruction::Goto(2),
        Instruction::Return,
        Instruction::Return,
    ]))
    .expect("valid code");
    assert_eq!(graph.block_count(), 4);
    assert!(!graph.reverse_postorder().contains(&1));
    assert!(!graph.dominators().dominates(0, 1));
}

#[test]
fn test_dominators_of_a_diamond() {
    let graph = ControlFlowGraph::build_blocks(&branch()).expect("valid code");
    let dominators = graph.dominators();
    let sink = graph.sink();
    assert!(dominators.dominates(0, 1));
    assert!(dominators.dominates(0, sink));
    assert!(!dominators.dominates(1, sink));
    assert!(!dominators.dominates(1, 2));
    assert!(dominators.dominates(2, 2));
    assert_eq!(dominators.immediate_dominator(1), Some(0));
    assert_eq!(dominators.immediate_dominator(sink), Some(0));
    assert_eq!(dominators.immediate_dominator(0), None);
}

#[test]
fn test_removing_a_dead_block_keeps_the_graph_consistent() {
    let mut graph = ControlFlowGraph::build_blocks(&code(vec![
        Instruction::Goto(2),
        Instruction::Goto(2),
        Instruction::Return,
    ]))
    .expect("valid code");
    assert!(graph.remove_block(1));
    assert!(graph.block(1).is_none());
    assert_eq!(graph.block(2).expect("target").predecessors(), &[0]);
    assert!(!graph.remove_block(1));
    assert_well_formed(&graph);
}

#[test]
fn test_removing_a_handler_drops_its_range() {
    let mut body = code(vec![call("flush"), Instruction::Return, Instruction::AStore(0), Instruction::Return]);
    body.exception_table.push(ExceptionEntry {
        from: 0,
        to: 1,
        handler: 2,
        catch_type: None,
    });
    let mut graph = ControlFlowGraph::build_blocks(&body).expect("valid code");
    assert!(graph.remove_block(2));
    assert!(graph.exception_ranges().is_empty());
    assert!(graph.block(0).expect("entry").exception_successors().is_empty());
    assert_well_formed(&graph);
}

#[test]
fn test_removing_the_last_protected_block_drops_its_range() {
    let mut body = code(vec![
        Instruction::Goto(2),
        call("flush"),
        Instruction::Return,
        Instruction::AStore(0),
        Instruction::Return,
    ]);
    body.exception_table.push(ExceptionEntry {
        from: 1,
        to: 2,
        handler: 3,
        catch_type: None,
    });
    let mut graph = ControlFlowGraph::build_blocks(&body).expect("valid code");
    assert_eq!(graph.exception_ranges()[0].protected, vec![1]);
    assert!(graph.remove_block(1));
    assert!(graph.exception_ranges().is_empty());
    assert!(graph.block(3).expect("handler").exception_predecessors().is_empty());
}

#[test]
#[should_panic(expected = "cannot remove the entry or sink")]
fn test_removing_the_entry_is_an_invariant_violation() {
    let mut graph = ControlFlowGraph::build_blocks(&branch()).expect("valid code");
    let entry = graph.entry();
    graph.remove_block(entry);
}

#[test]
fn test_verify_accepts_consistent_stacks() {
    let graph = ControlFlowGraph::build_blocks(&branch()).expect("valid code");
    let initial = Frame {
        stack: Vec::new(),
        locals: vec![Some(SlotKind::Int)],
    };
    assert!(graph.verify(initial).is_ok());
}

#[test]
fn test_verify_rejects_mismatched_stack_heights() {
    let graph = ControlFlowGraph::build_blocks(&code(vec![
        Instruction::ILoad(0),
        Instruction::If(Condition::Eq, 4),
        Instruction::IConst(1),
        Instruction::Goto(5),
        Instruction::Nop,
        Instruction::IReturn,
    ]))
    .expect("valid code");
    assert!(matches!(graph.verify(Frame::default()), Err(CfgError::Verify { .. })));
}

#[test]
fn test_dump_lists_blocks_edges_and_ranges() {
    let mut body = code(vec![call("flush"), Instruction::Return, Instruction::AStore(0), Instruction::Return]);
    body.exception_table.push(ExceptionEntry {
        from: 0,
        to: 1,
        handler: 2,
        catch_type: None,
    });
    let dump = ControlFlowGraph::build_blocks(&body).expect("valid code").dump();
    assert!(dump.contains("block 0 (entry)"));
    assert!(dump.contains("block 3 (sink)"));
    assert!(dump.contains("=> 2"));
    assert!(dump.contains("catch [any] in blocks 0 -> block 2"));
}
