//! Helper synthesizer
//!
//! Emits the class of a generated wrapper helper through the facade. The
//! class implements the helper interface with three methods:
//!
//! - `getSignature()` returns the structural signature as a constant
//! - `createWrapperObject(List)` allocates the wrapper and assigns each part
//! - `getWrapperParts(Object)` reads each part into a fresh list
//!
//! Every part is planned before anything is emitted, so shapes that cannot
//! be generated are rejected without touching the class writer.

use super::facade::{ClassWriter, Emitter, Label, LdcValue, MethodVisitor};
use super::opcodes::Op;
use crate::config::CodeGenConfig;
use crate::defaults::{
    ARRAY_LIST, ELEMENT, FACTORY_FIELD, GENERATED_ANNOTATION, HELPER_INTERFACE, LIST,
    OBJECT, RUNTIME_EXCEPTION, STRING,
};
use crate::descriptor;
use crate::error::{CodeGenError, CodeGenResult};
use crate::helper::resolve::{returns_element, returns_list};
use crate::helper::{AccessorDescriptor, WrapperSpec};
use crate::runtime::{ClassResolver, Method};
use crate::types::{internal_name, JType, Primitive};
use wrapgen_sdk::NativeValue;

/// Opcodes every generated helper may use
const REQUIRED_OPS: &[Op] = &[
    Op::V1_5,
    Op::AccPublic,
    Op::AccSuper,
    Op::AconstNull,
    Op::Sipush,
    Op::Ldc,
    Op::Aload,
    Op::Astore,
    Op::Pop,
    Op::Dup,
    Op::Ifnull,
    Op::Ifnonnull,
    Op::Goto,
    Op::Areturn,
    Op::Return,
    Op::Getfield,
    Op::Putfield,
    Op::Invokevirtual,
    Op::Invokespecial,
    Op::Invokestatic,
    Op::Invokeinterface,
    Op::New,
    Op::Athrow,
    Op::Checkcast,
];

const LIST_GET: (&str, &str) = ("get", "(I)Ljava/lang/Object;");
const LIST_ADD: (&str, &str) = ("add", "(Ljava/lang/Object;)Z");
const LIST_ADD_ALL: (&str, &str) = ("addAll", "(Ljava/util/Collection;)Z");
const INIT: (&str, &str) = ("<init>", "()V");
const INIT_MESSAGE: (&str, &str) = ("<init>", "(Ljava/lang/String;)V");
const GET_VALUE: (&str, &str) = ("getValue", "()Ljava/lang/Object;");

// Locals of createWrapperObject
const LST: u16 = 1;
const WRAPPER: u16 = 2;
const CURRENT: u16 = 3;
const INCOMING: u16 = 4;

// Locals of getWrapperParts
const OBJ: u16 = 1;
const RET: u16 = 2;
const OK: u16 = 3;

// ===== Plans =====

/// How `createWrapperObject` assigns one part
enum Assign<'s> {
    Skip,
    Merge {
        getter: &'s Method,
        setter: Option<&'s Method>,
    },
    Unbox {
        primitive: Primitive,
        setter: &'s Method,
    },
    Element {
        factory: &'s Method,
        setter: &'s Method,
    },
    Cast {
        target: String,
        setter: &'s Method,
    },
}

/// How `getWrapperParts` reads one part
enum Read<'s> {
    Null,
    Getter {
        getter: &'s Method,
        boxed: Option<Primitive>,
        element: bool,
    },
}

struct PartPlan<'s> {
    assign: Assign<'s>,
    read: Read<'s>,
}

// ===== Synthesizer =====

/// Emits helper classes for one provider
pub struct Synthesizer<'a> {
    emitter: &'a Emitter,
    resolver: &'a dyn ClassResolver,
    config: &'a CodeGenConfig,
}

impl<'a> Synthesizer<'a> {
    /// Synthesizer resolving wrapper member types through `resolver`
    pub fn new(emitter: &'a Emitter, resolver: &'a dyn ClassResolver, config: &'a CodeGenConfig) -> Self {
        Self {
            emitter,
            resolver,
            config,
        }
    }

    /// Class-file bytes of helper `class_name` for `spec`
    pub fn emit(&self, spec: &WrapperSpec, class_name: &str, signature: &str) -> CodeGenResult<Vec<u8>> {
        self.emitter.opcodes()?.require(REQUIRED_OPS)?;
        let plans = self.plan(spec)?;

        let this = internal_name(class_name);
        let wrapper = internal_name(spec.wrapper.name());
        let factory = spec
            .object_factory
            .as_ref()
            .filter(|_| spec.needs_factory())
            .map(|f| internal_name(f.name()));

        let cw = self.emitter.create_class_writer()?;
        cw.visit(
            Op::V1_5,
            &[Op::AccPublic, Op::AccSuper],
            &this,
            None,
            &internal_name(OBJECT),
            &[internal_name(HELPER_INTERFACE)],
        )?;
        if let Some(source) = &self.config.source_file {
            cw.visit_source(source, None)?;
        }
        if self.config.annotate_generated {
            let av = cw.visit_annotation(GENERATED_ANNOTATION, true)?;
            av.visit(Some("value"), NativeValue::from(signature))?;
            av.visit_end()?;
        }
        if let Some(factory) = &factory {
            cw.visit_field(&[], FACTORY_FIELD, &object_descriptor(factory), None)?
                .visit_end()?;
        }

        let ctx = Emission {
            emitter: self.emitter,
            debug: self.config.debug_info,
            this: &this,
            wrapper: &wrapper,
            factory: factory.as_deref(),
        };
        ctx.constructor(&cw)?;
        ctx.get_signature(&cw, signature)?;
        ctx.create_wrapper_object(&cw, &plans)?;
        ctx.get_wrapper_parts(&cw, &plans)?;

        cw.visit_end()?;
        cw.to_byte_array()
    }

    fn plan<'s>(&self, spec: &'s WrapperSpec) -> CodeGenResult<Vec<PartPlan<'s>>> {
        spec.parts
            .iter()
            .enumerate()
            .map(|(index, part)| self.plan_part(spec, index, part))
            .collect()
    }

    fn plan_part<'s>(
        &self,
        spec: &WrapperSpec,
        index: usize,
        part: &'s AccessorDescriptor,
    ) -> CodeGenResult<PartPlan<'s>> {
        let unsupported = |reason: &str| CodeGenError::UnsupportedPart {
            wrapper: spec.wrapper.name().to_string(),
            index,
            reason: reason.to_string(),
        };

        let Some(getter) = part.getter.as_deref() else {
            if part.is_placeholder() {
                return Ok(PartPlan {
                    assign: Assign::Skip,
                    read: Read::Null,
                });
            }
            return Err(unsupported("no getter"));
        };

        let setter = part.setter.as_deref();
        if let Some(setter) = setter {
            if setter.return_type().as_primitive().is_some_and(Primitive::is_wide) {
                return Err(unsupported("setter returns a two-slot value"));
            }
        }

        let element = returns_element(self.resolver, getter);
        let boxed = getter.return_type().as_primitive();
        let read = Read::Getter {
            getter,
            boxed,
            element,
        };

        let assign = if returns_list(self.resolver, getter) {
            Assign::Merge { getter, setter }
        } else {
            let setter = setter.ok_or_else(|| unsupported("no setter"))?;
            if let Some(primitive) = boxed {
                Assign::Unbox { primitive, setter }
            } else if element {
                let factory = part
                    .factory_method
                    .as_deref()
                    .filter(|_| spec.object_factory.is_some())
                    .ok_or_else(|| unsupported("no object factory method"))?;
                if factory.params().len() != 1 || factory.params()[0].as_primitive().is_some() {
                    return Err(unsupported("factory method must take one reference"));
                }
                Assign::Element { factory, setter }
            } else {
                Assign::Cast {
                    target: cast_target(getter.return_type())?,
                    setter,
                }
            }
        };
        Ok(PartPlan { assign, read })
    }
}

// ===== Emission =====

struct Emission<'a> {
    emitter: &'a Emitter,
    debug: bool,
    this: &'a str,
    wrapper: &'a str,
    factory: Option<&'a str>,
}

/// An open method body
struct Body<'a> {
    mv: MethodVisitor,
    emitter: &'a Emitter,
    begin: Option<Label>,
}

impl<'a> Body<'a> {
    fn open(emitter: &'a Emitter, mv: MethodVisitor, debug: bool, line: i32) -> CodeGenResult<Self> {
        mv.visit_code()?;
        let begin = if debug {
            let label = emitter.create_label()?;
            mv.visit_label(&label)?;
            mv.visit_line_number(line, &label)?;
            Some(label)
        } else {
            None
        };
        Ok(Self { mv, emitter, begin })
    }

    fn label(&self) -> CodeGenResult<Label> {
        self.emitter.create_label()
    }

    fn invoke(&self, op: Op, owner: &str, (name, desc): (&str, &str)) -> CodeGenResult<()> {
        self.mv
            .visit_method_insn(op, owner, name, desc, op == Op::Invokeinterface)
    }

    fn list_call(&self, call: (&str, &str)) -> CodeGenResult<()> {
        self.invoke(Op::Invokeinterface, &internal_name(LIST), call)
    }

    /// Push element `index` of the parts list
    fn part(&self, index: usize) -> CodeGenResult<()> {
        self.mv.visit_var_insn(Op::Aload, LST)?;
        self.mv.visit_int_insn(Op::Sipush, sipush_operand(index)?)?;
        self.list_call(LIST_GET)
    }

    /// Call `setter` on the wrapper; drops a one-slot result
    fn call_setter(&self, wrapper: &str, setter: &Method) -> CodeGenResult<()> {
        self.invoke(Op::Invokevirtual, wrapper, (setter.name(), setter.descriptor()))?;
        if *setter.return_type() != JType::Void {
            self.mv.visit_insn(Op::Pop)?;
        }
        Ok(())
    }

    /// Finish the body; `locals` are `(name, descriptor, signature)` by slot
    fn close(self, locals: &[(&str, String, Option<&str>)]) -> CodeGenResult<()> {
        if let Some(begin) = &self.begin {
            let end = self.label()?;
            self.mv.visit_label(&end)?;
            for (slot, (name, desc, signature)) in locals.iter().enumerate() {
                self.mv
                    .visit_local_variable(name, desc, *signature, begin, &end, slot as u16)?;
            }
        }
        self.mv.visit_maxs(0, 0)?;
        self.mv.visit_end()
    }
}

impl<'a> Emission<'a> {
    fn method(
        &self,
        cw: &ClassWriter,
        name: &str,
        desc: &str,
        signature: Option<&str>,
        line: i32,
    ) -> CodeGenResult<Body<'a>> {
        let mv = cw.visit_method(&[Op::AccPublic], name, desc, signature, &[])?;
        Body::open(self.emitter, mv, self.debug, line)
    }

    fn this_local(&self) -> (&'static str, String, Option<&'static str>) {
        ("this", object_descriptor(self.this), None)
    }

    fn constructor(&self, cw: &ClassWriter) -> CodeGenResult<()> {
        let body = self.method(cw, INIT.0, INIT.1, None, 1)?;
        let mv = &body.mv;
        mv.visit_var_insn(Op::Aload, 0)?;
        body.invoke(Op::Invokespecial, &internal_name(OBJECT), INIT)?;
        if let Some(factory) = self.factory {
            mv.visit_var_insn(Op::Aload, 0)?;
            mv.visit_type_insn(Op::New, factory)?;
            mv.visit_insn(Op::Dup)?;
            body.invoke(Op::Invokespecial, factory, INIT)?;
            mv.visit_field_insn(Op::Putfield, self.this, FACTORY_FIELD, &object_descriptor(factory))?;
        }
        mv.visit_insn(Op::Return)?;
        body.close(&[self.this_local()])
    }

    fn get_signature(&self, cw: &ClassWriter, signature: &str) -> CodeGenResult<()> {
        let desc = format!("(){}", object_descriptor(&internal_name(STRING)));
        let body = self.method(cw, "getSignature", &desc, None, 2)?;
        body.mv.visit_ldc_insn(LdcValue::Str(signature.to_string()))?;
        body.mv.visit_insn(Op::Areturn)?;
        body.close(&[self.this_local()])
    }

    fn create_wrapper_object(&self, cw: &ClassWriter, plans: &[PartPlan<'_>]) -> CodeGenResult<()> {
        let body = self.method(
            cw,
            "createWrapperObject",
            "(Ljava/util/List;)Ljava/lang/Object;",
            Some("(Ljava/util/List<*>;)Ljava/lang/Object;"),
            3,
        )?;
        let mv = &body.mv;
        mv.visit_type_insn(Op::New, self.wrapper)?;
        mv.visit_insn(Op::Dup)?;
        body.invoke(Op::Invokespecial, self.wrapper, INIT)?;
        mv.visit_var_insn(Op::Astore, WRAPPER)?;

        for (index, plan) in plans.iter().enumerate() {
            match &plan.assign {
                Assign::Skip => {}
                Assign::Merge { getter, setter } => self.merge_list(&body, index, getter, *setter)?,
                Assign::Unbox { primitive, setter } => {
                    let boxed = internal_name(primitive.box_class());
                    let is_null = body.label()?;
                    let done = body.label()?;
                    mv.visit_var_insn(Op::Aload, WRAPPER)?;
                    body.part(index)?;
                    mv.visit_type_insn(Op::Checkcast, &boxed)?;
                    mv.visit_insn(Op::Dup)?;
                    mv.visit_jump_insn(Op::Ifnull, &is_null)?;
                    let unbox = format!("(){}", primitive.descriptor());
                    body.invoke(Op::Invokevirtual, &boxed, (primitive.unbox_method().as_str(), unbox.as_str()))?;
                    body.call_setter(self.wrapper, setter)?;
                    mv.visit_jump_insn(Op::Goto, &done)?;
                    mv.visit_label(&is_null)?;
                    // Drop both the null part and the wrapper
                    mv.visit_insn(Op::Pop)?;
                    mv.visit_insn(Op::Pop)?;
                    mv.visit_label(&done)?;
                }
                Assign::Element { factory, setter } => {
                    let owner = self.factory.ok_or_else(|| CodeGenError::UnsupportedPart {
                        wrapper: self.wrapper.to_string(),
                        index,
                        reason: "no object factory".to_string(),
                    })?;
                    mv.visit_var_insn(Op::Aload, WRAPPER)?;
                    mv.visit_var_insn(Op::Aload, 0)?;
                    mv.visit_field_insn(Op::Getfield, self.this, FACTORY_FIELD, &object_descriptor(owner))?;
                    body.part(index)?;
                    mv.visit_type_insn(Op::Checkcast, &cast_target(&factory.params()[0])?)?;
                    body.invoke(Op::Invokevirtual, owner, (factory.name(), factory.descriptor()))?;
                    body.call_setter(self.wrapper, setter)?;
                }
                Assign::Cast { target, setter } => {
                    mv.visit_var_insn(Op::Aload, WRAPPER)?;
                    body.part(index)?;
                    mv.visit_type_insn(Op::Checkcast, target)?;
                    body.call_setter(self.wrapper, setter)?;
                }
            }
        }

        mv.visit_var_insn(Op::Aload, WRAPPER)?;
        mv.visit_insn(Op::Areturn)?;
        body.close(&[
            self.this_local(),
            ("lst", "Ljava/util/List;".to_string(), Some("Ljava/util/List<*>;")),
            ("ok", object_descriptor(self.wrapper), None),
        ])
    }

    /// `current = getter(); incoming = lst.get(i);` then set or `addAll`
    fn merge_list(
        &self,
        body: &Body<'_>,
        index: usize,
        getter: &Method,
        setter: Option<&Method>,
    ) -> CodeGenResult<()> {
        let mv = &body.mv;
        let list = internal_name(LIST);
        mv.visit_var_insn(Op::Aload, WRAPPER)?;
        body.invoke(Op::Invokevirtual, self.wrapper, (getter.name(), getter.descriptor()))?;
        mv.visit_var_insn(Op::Astore, CURRENT)?;
        body.part(index)?;
        mv.visit_type_insn(Op::Checkcast, &list)?;
        mv.visit_var_insn(Op::Astore, INCOMING)?;

        let has_current = body.label()?;
        let done = body.label()?;
        mv.visit_var_insn(Op::Aload, CURRENT)?;
        mv.visit_jump_insn(Op::Ifnonnull, &has_current)?;
        match setter {
            Some(setter) => {
                mv.visit_var_insn(Op::Aload, WRAPPER)?;
                mv.visit_var_insn(Op::Aload, INCOMING)?;
                mv.visit_type_insn(Op::Checkcast, &cast_target(getter.return_type())?)?;
                body.call_setter(self.wrapper, setter)?;
                mv.visit_jump_insn(Op::Goto, &done)?;
            }
            None => {
                let exception = internal_name(RUNTIME_EXCEPTION);
                mv.visit_type_insn(Op::New, &exception)?;
                mv.visit_insn(Op::Dup)?;
                mv.visit_ldc_insn(LdcValue::Str(format!(
                    "{} returned null and there isn't a set method.",
                    getter.name()
                )))?;
                body.invoke(Op::Invokespecial, &exception, INIT_MESSAGE)?;
                mv.visit_insn(Op::Athrow)?;
            }
        }
        mv.visit_label(&has_current)?;
        mv.visit_var_insn(Op::Aload, INCOMING)?;
        mv.visit_jump_insn(Op::Ifnull, &done)?;
        mv.visit_var_insn(Op::Aload, CURRENT)?;
        mv.visit_var_insn(Op::Aload, INCOMING)?;
        body.list_call(LIST_ADD_ALL)?;
        mv.visit_insn(Op::Pop)?;
        mv.visit_label(&done)?;
        Ok(())
    }

    fn get_wrapper_parts(&self, cw: &ClassWriter, plans: &[PartPlan<'_>]) -> CodeGenResult<()> {
        let body = self.method(
            cw,
            "getWrapperParts",
            "(Ljava/lang/Object;)Ljava/util/List;",
            Some("(Ljava/lang/Object;)Ljava/util/List<Ljava/lang/Object;>;"),
            4,
        )?;
        let mv = &body.mv;
        let array_list = internal_name(ARRAY_LIST);
        mv.visit_type_insn(Op::New, &array_list)?;
        mv.visit_insn(Op::Dup)?;
        body.invoke(Op::Invokespecial, &array_list, INIT)?;
        mv.visit_var_insn(Op::Astore, RET)?;
        mv.visit_var_insn(Op::Aload, OBJ)?;
        mv.visit_type_insn(Op::Checkcast, self.wrapper)?;
        mv.visit_var_insn(Op::Astore, OK)?;

        for plan in plans {
            mv.visit_var_insn(Op::Aload, RET)?;
            match &plan.read {
                Read::Null => mv.visit_insn(Op::AconstNull)?,
                Read::Getter {
                    getter,
                    boxed,
                    element,
                } => {
                    mv.visit_var_insn(Op::Aload, OK)?;
                    body.invoke(Op::Invokevirtual, self.wrapper, (getter.name(), getter.descriptor()))?;
                    if let Some(primitive) = boxed {
                        let owner = internal_name(primitive.box_class());
                        let value_of = format!("({}){}", primitive.descriptor(), object_descriptor(&owner));
                        body.invoke(Op::Invokestatic, &owner, ("valueOf", value_of.as_str()))?;
                    }
                    if *element {
                        let skip = body.label()?;
                        mv.visit_insn(Op::Dup)?;
                        mv.visit_jump_insn(Op::Ifnull, &skip)?;
                        body.invoke(Op::Invokevirtual, &internal_name(ELEMENT), GET_VALUE)?;
                        mv.visit_label(&skip)?;
                    }
                }
            }
            body.list_call(LIST_ADD)?;
            mv.visit_insn(Op::Pop)?;
        }

        mv.visit_var_insn(Op::Aload, RET)?;
        mv.visit_insn(Op::Areturn)?;
        body.close(&[
            self.this_local(),
            ("o", "Ljava/lang/Object;".to_string(), None),
            ("ret", "Ljava/util/List;".to_string(), Some("Ljava/util/List<Ljava/lang/Object;>;")),
            ("ok", object_descriptor(self.wrapper), None),
        ])
    }
}

fn object_descriptor(internal: &str) -> String {
    format!("L{};", internal)
}

/// Operand of `checkcast`: internal name, or the descriptor for arrays
fn cast_target(ty: &JType) -> CodeGenResult<String> {
    match ty.erasure() {
        JType::Class(name) => Ok(internal_name(&name)),
        array @ JType::Array(_) => Ok(descriptor::encode(&array)?),
        other => Ok(internal_name(&other.type_name())),
    }
}

fn sipush_operand(index: usize) -> CodeGenResult<i32> {
    i16::try_from(index)
        .map(i32::from)
        .map_err(|_| CodeGenError::UnsupportedPart {
            wrapper: String::new(),
            index,
            reason: "part index exceeds SIPUSH range".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::discovery::{Discovery, LibraryCatalog};
    use crate::helper::{resolve_accessors, PartDescription};
    use crate::runtime::{ClassRef, ClassRegistry, HostClassBuilder};
    use std::sync::Arc;
    use wrapgen_classfile::{verify_class, ClassFile};

    fn emitter(identity: &str) -> Emitter {
        let catalog = LibraryCatalog::with_bundled();
        let discovery = Discovery::new(vec![identity.to_string()]);
        Emitter::new(discovery.acquire(&catalog)).unwrap()
    }

    fn order(registry: &ClassRegistry) -> ClassRef {
        registry.register(
            HostClassBuilder::new("pkg.Order")
                .property("count", JType::int())
                .property("items", JType::list_of(JType::string()))
                .property("note", JType::string())
                .build()
                .unwrap(),
        )
    }

    fn spec(registry: &ClassRegistry, wrapper: &ClassRef, names: &[&str]) -> WrapperSpec {
        let parts: Vec<_> = names.iter().map(|n| Some(PartDescription::new(n))).collect();
        resolve_accessors(registry, wrapper, &parts)
    }

    #[test]
    fn test_emitted_class_verifies() {
        let registry = ClassRegistry::with_builtins();
        let wrapper = order(&registry);
        let spec = spec(&registry, &wrapper, &["count", "items", "note"]);
        let config = CodeGenConfig::default();
        let emitter = emitter("asm");
        let bytes = Synthesizer::new(&emitter, &registry, &config)
            .emit(&spec, "pkg.Order_WrapperTypeHelper1", &spec.signature())
            .unwrap();
        let class = ClassFile::decode(&bytes).unwrap();
        verify_class(&class).unwrap();
        assert_eq!(class.this_class, "pkg/Order_WrapperTypeHelper1");
        assert_eq!(class.interfaces, vec!["wrapgen/WrapperHelper".to_string()]);
        assert!(class.method("createWrapperObject", "(Ljava/util/List;)Ljava/lang/Object;").is_some());
        assert!(class.method("getWrapperParts", "(Ljava/lang/Object;)Ljava/util/List;").is_some());
        assert!(class.attribute("SourceFile").is_none());
    }

    #[test]
    fn test_dialects_emit_same_helper() {
        let registry = ClassRegistry::with_builtins();
        let wrapper = order(&registry);
        let spec = spec(&registry, &wrapper, &["count", "items", "note"]);
        let config = CodeGenConfig {
            debug_info: true,
            source_file: Some("Helper.java".to_string()),
            annotate_generated: true,
            ..CodeGenConfig::default()
        };
        let name = "pkg.Order_WrapperTypeHelper1";
        let modern = Synthesizer::new(&emitter("asm"), &registry, &config)
            .emit(&spec, name, &spec.signature())
            .unwrap();
        let legacy = Synthesizer::new(&emitter("asm-legacy"), &registry, &config)
            .emit(&spec, name, &spec.signature())
            .unwrap();
        assert_eq!(modern, legacy);
        let class = ClassFile::decode(&modern).unwrap();
        verify_class(&class).unwrap();
        assert!(class.attribute("SourceFile").is_some());
        assert!(class.attribute("RuntimeVisibleAnnotations").is_some());
    }

    #[test]
    fn test_missing_getter_with_setter_aborts() {
        let registry = ClassRegistry::with_builtins();
        let wrapper = registry.register(
            HostClassBuilder::new("pkg.WriteOnly")
                .field("value", JType::string())
                .setter("setValue", "value", JType::string())
                .build()
                .unwrap(),
        );
        let spec = spec(&registry, &wrapper, &["value"]);
        let emitter = emitter("asm");
        let config = CodeGenConfig::default();
        let err = Synthesizer::new(&emitter, &registry, &config)
            .emit(&spec, "pkg.WriteOnly_WrapperTypeHelper1", &spec.signature())
            .unwrap_err();
        assert!(matches!(err, CodeGenError::UnsupportedPart { index: 0, .. }));
    }

    #[test]
    fn test_read_only_scalar_aborts() {
        let registry = ClassRegistry::with_builtins();
        let wrapper = registry.register(
            HostClassBuilder::new("pkg.Fixed")
                .read_only_property("note", JType::string())
                .build()
                .unwrap(),
        );
        let spec = spec(&registry, &wrapper, &["note"]);
        let emitter = emitter("asm");
        let config = CodeGenConfig::default();
        let err = Synthesizer::new(&emitter, &registry, &config)
            .emit(&spec, "pkg.Fixed_WrapperTypeHelper1", &spec.signature())
            .unwrap_err();
        assert!(err.to_string().contains("no setter"));
    }

    #[test]
    fn test_cast_targets() {
        assert_eq!(cast_target(&JType::string()).unwrap(), "java/lang/String");
        assert_eq!(cast_target(&JType::array_of(JType::int())).unwrap(), "[I");
        assert_eq!(
            cast_target(&JType::list_of(JType::string())).unwrap(),
            "java/util/List"
        );
        assert!(sipush_operand(40_000).is_err());
    }
}
