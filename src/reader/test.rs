use super::*;
use crate::ir::{BuiltinType, ConstValue};

const PROGRAM: &str = r#"
module "demo"
file "a.kt"
fun main(): Int {
    val x: Int = 1
    return call twice(get x)
}
fun twice(n: Int): Int { return get n }
"#;

// Helper function to read input without file I/O
fn read_str(input: &str) -> (IrTree, Reader) {
    let mut reader = Reader::new(input, "test.ir");
    let tree = reader.read_module();
    (tree, reader)
}

fn find(tree: &IrTree, name: &str) -> ElementId {
    (0..tree.len())
        .map(ElementId::from_index)
        .find(|id| tree.declaration(*id).is_some_and(|decl| decl.name == name))
        .unwrap_or_else(|| panic!("no declaration named {}", name))
}

fn find_expression(tree: &IrTree, matches: impl Fn(&ExpressionKind) -> bool) -> ElementId {
    (0..tree.len())
        .map(ElementId::from_index)
        .find(|id| tree.expression(*id).is_some_and(|expr| matches(&expr.kind)))
        .expect("no matching expression")
}

#[test]
fn test_read_module_structure() {
    let (tree, reader) = read_str(PROGRAM);
    assert!(!reader.has_errors());

    let root = tree.root().unwrap();
    assert_eq!(tree.render(root), "MODULE_FRAGMENT name:demo");

    let files = tree.children(root);
    assert_eq!(files.len(), 1);
    assert_eq!(tree.render(files[0]), "FILE fileName:a.kt");

    let declarations = tree.children(files[0]);
    assert_eq!(declarations, vec![find(&tree, "main"), find(&tree, "twice")]);
}

#[test]
fn test_module_name_defaults_to_main() {
    let (tree, reader) = read_str("file \"b.kt\" val answer: Int = 42");
    assert!(!reader.has_errors());
    assert_eq!(tree.render(tree.root().unwrap()), "MODULE_FRAGMENT name:main");
}

#[test]
fn test_parents_follow_containers() {
    let (tree, _) = read_str(PROGRAM);
    let file = tree.children(tree.root().unwrap())[0];
    let main = find(&tree, "main");
    let twice = find(&tree, "twice");

    assert_eq!(tree.parent_of(main), Ok(file));
    assert_eq!(tree.parent_of(twice), Ok(file));
    // locals of a body belong to the function, not the block
    assert_eq!(tree.parent_of(find(&tree, "x")), Ok(main));
    assert_eq!(tree.parent_of(find(&tree, "n")), Ok(twice));
}

#[test]
fn test_class_members_and_descriptors() {
    let (tree, reader) = read_str(
        "file \"c.kt\"
        class Point {
            val x: Int = 0
            fun norm(): Int { return get x }
        }
        fun origin(p: Point?): Point? { return get p }",
    );
    assert!(!reader.has_errors());

    let point = find(&tree, "Point");
    let norm = find(&tree, "norm");
    assert_eq!(tree.parent_of(find(&tree, "x")), Ok(point));
    assert_eq!(tree.parent_of(norm), Ok(point));
    assert_eq!(tree.children(point).len(), 2);

    let descriptor = tree.declaration(norm).unwrap().descriptor.clone().unwrap();
    assert_eq!(descriptor.name, "norm");
    assert_eq!(descriptor.kind, crate::ir::DescriptorKind::Function);

    let p = find(&tree, "p");
    assert_eq!(tree.value_type(p), Some(&IrType::class(point).make_nullable()));
    assert_eq!(tree.render(p), "VALUE_PARAMETER name:p index:0 type:Point?");
}

#[test]
fn test_property_accessors() {
    let (tree, reader) = read_str(
        "file \"p.kt\"
        prop size: Int {
            field = 0
            get
            set { }
        }",
    );
    assert!(!reader.has_errors());

    let file = tree.children(tree.root().unwrap())[0];
    let size = find(&tree, "size");
    let getter = find(&tree, "<get-size>");
    let setter = find(&tree, "<set-size>");

    let Some(DeclarationKind::Property {
        backing_field: Some(field),
        getter: Some(get),
        setter: Some(set),
        ..
    }) = tree.declaration(size).map(|decl| &decl.kind)
    else {
        panic!("property was not read with all accessors");
    };
    assert_eq!((*get, *set), (getter, setter));

    // accessors and the field take the property's container
    assert_eq!(tree.parent_of(*field), Ok(file));
    assert_eq!(tree.parent_of(getter), Ok(file));
    assert_eq!(tree.parent_of(setter), Ok(file));

    assert_eq!(tree.children(getter).len(), 0);
    let setter_children = tree.children(setter);
    assert_eq!(setter_children.len(), 2);
    assert_eq!(tree.name_of(setter_children[0]), Some("value"));
    assert_eq!(tree.parent_of(setter_children[0]), Ok(setter));
    assert_eq!(tree.return_type(setter), Some(&IrType::builtin(BuiltinType::Unit)));
}

#[test]
fn test_forward_call_is_resolved() {
    let (tree, reader) = read_str(PROGRAM);
    assert!(!reader.has_errors());

    let call = find_expression(&tree, |kind| matches!(kind, ExpressionKind::Call { .. }));
    let Some(ExpressionKind::Call { callee, args }) = tree.expression(call).map(|expr| &expr.kind) else {
        unreachable!()
    };
    assert_eq!(*callee, find(&tree, "twice"));
    assert_eq!(args.len(), 1);
    assert_eq!(tree.expression_type(call), Some(&IrType::builtin(BuiltinType::Int)));
    assert_eq!(tree.render(call), "CALL 'twice' type=Int");
}

#[test]
fn test_values_resolve_to_innermost_binding() {
    let (tree, reader) = read_str(
        "file \"s.kt\"
        val x: Int = 1
        fun f(x: Long): Long { return get x }",
    );
    assert!(!reader.has_errors());

    let get = find_expression(&tree, |kind| matches!(kind, ExpressionKind::GetValue { .. }));
    let Some(ExpressionKind::GetValue { symbol }) = tree.expression(get).map(|expr| &expr.kind) else {
        unreachable!()
    };
    assert!(matches!(
        tree.declaration(*symbol).map(|decl| &decl.kind),
        Some(DeclarationKind::ValueParameter { .. })
    ));
    assert_eq!(tree.expression_type(get), Some(&IrType::builtin(BuiltinType::Long)));
}

#[test]
fn test_block_and_if_types() {
    let (tree, reader) = read_str(
        "file \"t.kt\"
        fun pick(flag: Boolean): String {
            if get flag { \"yes\" } else { \"no\" }
        }
        fun effect(flag: Boolean) {
            if get flag { 1 }
        }",
    );
    assert!(!reader.has_errors());

    let string = IrType::builtin(BuiltinType::String);
    let whens: Vec<_> = (0..tree.len())
        .map(ElementId::from_index)
        .filter(|id| matches!(tree.expression(*id).map(|expr| &expr.kind), Some(ExpressionKind::When { .. })))
        .collect();
    assert_eq!(whens.len(), 2);
    assert_eq!(tree.expression_type(whens[0]), Some(&string));
    assert_eq!(tree.expression_type(whens[1]), Some(&IrType::builtin(BuiltinType::Unit)));

    let Some(DeclarationKind::Function { body: Some(body), .. }) =
        tree.declaration(find(&tree, "pick")).map(|decl| &decl.kind)
    else {
        panic!("pick has no body");
    };
    assert_eq!(tree.expression_type(*body), Some(&string));
}

#[test]
fn test_literals_and_null() {
    let (tree, reader) = read_str(
        "file \"l.kt\"
        val c: Char = 'z'
        val l: Long = 10L
        val s: String? = null",
    );
    assert!(!reader.has_errors());

    let null = find_expression(&tree, |kind| matches!(kind, ExpressionKind::Const(ConstValue::Null)));
    assert_eq!(
        tree.expression_type(null),
        Some(&IrType::builtin(BuiltinType::Nothing).make_nullable())
    );
    let long = find_expression(&tree, |kind| matches!(kind, ExpressionKind::Const(ConstValue::Long(10))));
    assert_eq!(tree.render(long), "CONST type=Long value=10L");
}

#[test]
fn test_forced_type_is_kept() {
    let (tree, reader) = read_str("file \"f.kt\" val x: Int = 1 : String");
    assert!(!reader.has_errors());

    let constant = find_expression(&tree, |kind| matches!(kind, ExpressionKind::Const(_)));
    assert_eq!(tree.expression_type(constant), Some(&IrType::builtin(BuiltinType::String)));
}

#[test]
fn test_unknown_type_becomes_error_type() {
    let (tree, reader) = read_str("file \"u.kt\" val x: Widget = 1");
    assert!(!reader.has_errors());

    let x = find(&tree, "x");
    assert_eq!(tree.value_type(x), Some(&IrType::error("unresolved type `Widget`")));
}

#[test]
fn test_unresolved_reference_is_an_error() {
    let (tree, reader) = read_str("file \"e.kt\" fun f(): Int { return get missing }");
    assert!(reader.has_errors());

    // the element still exists, bound to nothing
    let get = find_expression(&tree, |kind| matches!(kind, ExpressionKind::GetValue { .. }));
    assert_eq!(tree.render(get), format!("GET_VAR '<unbound {}>' type=<error: unresolved value `missing`>", UNRESOLVED));
}

#[test]
fn test_return_outside_function_is_an_error() {
    let (_, reader) = read_str("file \"r.kt\" val x: Int = return 1");
    assert!(reader.has_errors());
}

#[test]
fn test_recovers_after_malformed_declaration() {
    let (tree, reader) = read_str(
        "file \"m.kt\"
        fun (x: Int) { }
        val ok: Int = 1",
    );
    assert!(reader.has_errors());

    let file = tree.children(tree.root().unwrap())[0];
    assert_eq!(tree.children(file), vec![find(&tree, "ok")]);
}

#[test]
fn test_unexpected_character_is_reported() {
    let (_, reader) = read_str("file \"x.kt\" val x: Int = 1 @");
    assert!(reader.has_errors());
}

#[test]
fn test_if_type_covers_both_branches() {
    let (tree, reader) = read_str(
        "file \"w.kt\"
        fun mixed(b: Boolean): Any { return if get b { 1 } else { \"s\" } }
        fun maybe(b: Boolean): Int? { return if get b { 1 } else { null } }
        fun early(b: Boolean): String { return if get b { return \"x\" } else { \"y\" } }",
    );
    assert!(!reader.has_errors());

    let whens: Vec<_> = (0..tree.len())
        .map(ElementId::from_index)
        .filter(|id| matches!(tree.expression(*id).map(|expr| &expr.kind), Some(ExpressionKind::When { .. })))
        .collect();
    let types: Vec<_> = whens.iter().map(|id| tree.expression_type(*id).cloned()).collect();
    assert_eq!(
        types,
        vec![
            Some(IrType::builtin(BuiltinType::Any)),
            Some(IrType::builtin(BuiltinType::Int).make_nullable()),
            Some(IrType::builtin(BuiltinType::String)),
        ]
    );
}
