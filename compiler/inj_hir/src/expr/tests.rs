use super::*;
use pretty_assertions::assert_eq;

fn ty() -> TypeRef {
    TypeRef::simple(ClassifierId::new(0))
}

#[test]
fn call_children_follow_evaluation_order() {
    let mut arena = ExprArena::new();
    let receiver = arena.push(ExprKind::Unit, Span::DUMMY, ty());
    let first = arena.push(ExprKind::Int(1), Span::DUMMY, ty());
    let third = arena.push(ExprKind::Int(3), Span::DUMMY, ty());
    let mut call = Call::new(DeclId::new(0), vec![Some(first), None, Some(third)]);
    call.dispatch_receiver = Some(receiver);

    assert_eq!(ExprKind::Call(call).children(), vec![receiver, first, third]);
}

#[test]
fn replace_keeps_span_and_type() {
    let mut arena = ExprArena::new();
    let id = arena.push(ExprKind::Int(1), Span::new(4, 9), ty());
    let old = arena.replace(id, ExprKind::Null);
    assert_eq!(old, ExprKind::Int(1));
    assert_eq!(arena.kind(id), &ExprKind::Null);
    assert_eq!(arena.span(id), Span::new(4, 9));
}

#[test]
fn duplicate_allocates_new_node() {
    let mut arena = ExprArena::new();
    let id = arena.push(ExprKind::Str("a".to_string()), Span::new(1, 2), ty());
    let copy = arena.duplicate(id);
    assert_ne!(id, copy);
    assert_eq!(arena.get(id), arena.get(copy));
    assert_eq!(arena.len(), 2);
}

#[test]
fn block_children_end_with_result() {
    let mut arena = ExprArena::new();
    let a = arena.push(ExprKind::Unit, Span::DUMMY, ty());
    let b = arena.push(ExprKind::Unit, Span::DUMMY, ty());
    let block = ExprKind::Block {
        statements: vec![a],
        result: Some(b),
    };
    assert_eq!(block.children(), vec![a, b]);
}
