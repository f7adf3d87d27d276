use super::*;
use crate::class_file::AccessFlags;
use crate::instruction::{MethodDescriptor, MethodRef};

fn run(frame: &mut Frame, instructions: &[Instruction]) -> Result<(), StackError> {
    instructions.iter().try_for_each(|instruction| frame.step(instruction))
}

#[test]
fn test_method_frame_holds_receiver_and_arguments() {
    let method = MethodInfo {
        name: "f".into(),
        descriptor: MethodDescriptor::new(vec![TypeDesc::Int, TypeDesc::object("kite/String")], TypeDesc::Void),
        flags: AccessFlags::PUBLIC,
        code: None,
    };
    let frame = Frame::for_method(&method);
    assert_eq!(
        frame.locals,
        vec![Some(SlotKind::Reference), Some(SlotKind::Int), Some(SlotKind::Reference)]
    );
    assert!(frame.stack.is_empty());
}

#[test]
fn test_arithmetic_and_invocation_effects() {
    let mut frame = Frame::default();
    let max_of = MethodRef::new(
        "kite/StandardKt",
        "maxOf",
        MethodDescriptor::new(
            vec![TypeDesc::object("kite/Comparable"), TypeDesc::object("kite/Comparable")],
            TypeDesc::object("kite/Comparable"),
        ),
    );
    run(
        &mut frame,
        &[
            Instruction::IConst(1),
            Instruction::IConst(2),
            Instruction::IAdd,
            Instruction::AConstNull,
            Instruction::AConstNull,
            Instruction::InvokeStatic(max_of),
        ],
    )
    .expect("well-typed sequence");
    assert_eq!(frame.stack, vec![SlotKind::Int, SlotKind::Reference]);
}

#[test]
fn test_underflow_is_reported() {
    let mut frame = Frame::default();
    let error = frame.step(&Instruction::IAdd).expect_err("empty stack");
    assert_eq!(
        error,
        StackError::Underflow {
            mnemonic: "iadd",
            needed: 2,
            found: 0
        }
    );
}

#[test]
fn test_return_address_flows_from_jsr_to_ret() {
    let mut frame = Frame::default();
    run(&mut frame, &[Instruction::Jsr(4), Instruction::AStore(1), Instruction::Ret(1)])
        .expect("subroutine entry and exit");
    assert_eq!(frame.locals[1], Some(SlotKind::ReturnAddress));
    assert!(frame.stack.is_empty());
}

#[test]
fn test_return_address_cannot_be_used_as_a_value() {
    let mut frame = Frame::default();
    frame.step(&Instruction::Jsr(4)).expect("jsr pushes");
    let error = frame.step(&Instruction::AThrow).expect_err("address is not throwable");
    assert_eq!(error, StackError::ReturnAddressMisuse { mnemonic: "athrow" });

    let mut frame = Frame::default();
    frame.step(&Instruction::Jsr(4)).expect("jsr pushes");
    frame.step(&Instruction::Pop).expect("pop discards an address");
}

#[test]
fn test_ret_requires_a_return_address() {
    let mut frame = Frame::default();
    run(&mut frame, &[Instruction::AConstNull, Instruction::AStore(0)]).expect("store a reference");
    assert_eq!(
        frame.step(&Instruction::Ret(0)),
        Err(StackError::NotAReturnAddress { slot: 0 })
    );
}

#[test]
fn test_handler_frame_keeps_locals_and_holds_the_exception() {
    let mut frame = Frame::default();
    run(&mut frame, &[Instruction::IConst(3), Instruction::IStore(2), Instruction::IConst(1)]).expect("store");
    let handler = frame.for_handler();
    assert_eq!(handler.stack, vec![SlotKind::Reference]);
    assert_eq!(handler.locals, frame.locals);
}
