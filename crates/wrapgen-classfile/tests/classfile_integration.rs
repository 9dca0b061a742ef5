//! Integration tests for class assembly, encoding and verification

use wrapgen_classfile::{
    access, annotation::decode_annotations, parse_instructions, verify_class, version, Annotation,
    ClassBuilder, ClassFile, ElementValue, LdcConstant, Opcode, VerifyError,
};

fn helper_skeleton() -> ClassBuilder {
    ClassBuilder::new(
        version::V1_5,
        access::ACC_PUBLIC | access::ACC_SUPER,
        "pkg/Wrapper_WrapperTypeHelper1",
        Some("java/lang/Object"),
        &["wrapgen/WrapperHelper".to_string()],
    )
}

#[test]
fn test_signature_method_roundtrip() {
    let mut class = helper_skeleton();
    let m = class.add_method(access::ACC_PUBLIC, "getSignature", "()Ljava/lang/String;", None, &[]);
    let (code, pool) = class.code(m).unwrap();
    code.ldc(pool, &LdcConstant::Str("1:null,".into())).unwrap();
    code.insn(Opcode::Areturn).unwrap();

    let built = class.build(true).unwrap();
    verify_class(&built).unwrap();

    let decoded = ClassFile::decode(&built.encode()).unwrap();
    verify_class(&decoded).unwrap();
    assert_eq!(decoded.this_class, "pkg/Wrapper_WrapperTypeHelper1");
    assert_eq!(decoded.interfaces, vec!["wrapgen/WrapperHelper".to_string()]);

    let body = decoded
        .method("getSignature", "()Ljava/lang/String;")
        .and_then(|m| m.code.as_ref())
        .unwrap();
    let instrs = parse_instructions(&body.code).unwrap();
    assert_eq!(instrs[0].opcode, Opcode::Ldc);
    assert_eq!(instrs[1].opcode, Opcode::Areturn);
    assert_eq!(body.max_stack, 1);
    assert_eq!(body.max_locals, 1);
}

#[test]
fn test_null_check_branch_merges() {
    // aload_1; dup; ifnull L; pop; aload_1; L: areturn -- depths agree at L
    let mut class = helper_skeleton();
    let m = class.add_method(
        access::ACC_PUBLIC,
        "pick",
        "(Ljava/lang/Object;)Ljava/lang/Object;",
        None,
        &[],
    );
    let (code, _) = class.code(m).unwrap();
    let done = code.new_label();
    code.var_insn(Opcode::Aload, 1).unwrap();
    code.insn(Opcode::Dup).unwrap();
    code.jump_insn(Opcode::Ifnull, done).unwrap();
    code.insn(Opcode::Pop).unwrap();
    code.var_insn(Opcode::Aload, 1).unwrap();
    code.mark(done).unwrap();
    code.insn(Opcode::Areturn).unwrap();

    let built = class.build(true).unwrap();
    verify_class(&built).unwrap();
    assert_eq!(built.methods[0].code.as_ref().unwrap().max_stack, 2);
}

#[test]
fn test_explicit_maxs_are_checked() {
    let mut class = helper_skeleton();
    let m = class.add_method(access::ACC_PUBLIC, "make", "()Ljava/lang/Object;", None, &[]);
    {
        let (code, pool) = class.code(m).unwrap();
        code.type_insn(pool, Opcode::New, "java/util/ArrayList").unwrap();
        code.insn(Opcode::Dup).unwrap();
        code.method_insn(pool, Opcode::Invokespecial, "java/util/ArrayList", "<init>", "()V", false)
            .unwrap();
        code.insn(Opcode::Areturn).unwrap();
    }
    class.method_mut(m).unwrap().maxs = Some((1, 1));

    let built = class.build(false).unwrap();
    assert!(matches!(
        verify_class(&built),
        Err(VerifyError::StackOverflow(_, 2))
    ));
}

#[test]
fn test_annotations_and_signature_attributes() {
    let mut class = helper_skeleton();
    let mut marker = Annotation::new("Lwrapgen/Generated;");
    marker
        .elements
        .push(("value".into(), ElementValue::Str("wrapgen".into())));
    class.annotations_mut().push(marker.clone());
    let f = class.add_field(access::ACC_PRIVATE, "factory", "Lpkg/ObjectFactory;", None);
    class.field_mut(f).unwrap().annotations.push(Annotation::new("Lpkg/Marker;"));
    class.add_method(
        access::ACC_PUBLIC | access::ACC_ABSTRACT,
        "parts",
        "(Ljava/lang/Object;)Ljava/util/List;",
        Some("(Ljava/lang/Object;)Ljava/util/List<Ljava/lang/Object;>;"),
        &["java/lang/Exception".to_string()],
    );

    let decoded = ClassFile::decode(&class.build(true).unwrap().encode()).unwrap();
    verify_class(&decoded).unwrap();

    let attr = decoded.attribute("RuntimeVisibleAnnotations").unwrap();
    assert_eq!(decode_annotations(&decoded.pool, &attr.data).unwrap(), vec![marker]);
    let method = &decoded.methods[0];
    assert!(method.code.is_none());
    let names: Vec<_> = method.attributes.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["Exceptions", "Signature"]);
    assert_eq!(decoded.fields[0].attributes[0].name, "RuntimeVisibleAnnotations");
}

#[test]
fn test_missing_body_rejected() {
    let mut class = helper_skeleton();
    class.add_method(access::ACC_PUBLIC, "broken", "()V", None, &[]);
    let built = class.build(true).unwrap();
    assert_eq!(
        verify_class(&built),
        Err(VerifyError::InvalidBody("broken".into()))
    );
}

#[test]
fn test_debug_tables_emitted() {
    let mut class = helper_skeleton();
    let m = class.add_method(access::ACC_PUBLIC, "id", "(Ljava/lang/Object;)Ljava/lang/Object;", None, &[]);
    {
        let (code, _) = class.code(m).unwrap();
        let start = code.new_label();
        let end = code.new_label();
        code.mark(start).unwrap();
        code.line_number(10, start);
        code.var_insn(Opcode::Aload, 1).unwrap();
        code.insn(Opcode::Areturn).unwrap();
        code.mark(end).unwrap();
        code.local_variable("value", "Ljava/lang/Object;", None, start, end, 1);
    }
    let decoded = ClassFile::decode(&class.build(true).unwrap().encode()).unwrap();
    let code = decoded.methods[0].code.as_ref().unwrap();
    let names: Vec<_> = code.attributes.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["LineNumberTable", "LocalVariableTable"]);
}
