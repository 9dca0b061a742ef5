//! Accessor resolution
//!
//! Maps the element names of a wrapper's parts to the getters, setters,
//! fields and object-factory methods that bridge them, following the
//! XML-name to identifier rules of the data-binding layer.

use super::accessor::{AccessorDescriptor, WrapperSpec};
use crate::defaults::{COLLECTION, ELEMENT, LIST, OBJECT_FACTORY};
use crate::runtime::{ClassRef, ClassRegistry, ClassResolver, Field, Method};
use crate::types::{package_name, simple_name};
use std::sync::Arc;

/// Part name whose accessors get `_return` spellings as well
const RETURN_PART: &str = "return";

/// Characters that separate words in an XML name
const XML_NAME_PUNCTUATION: &[char] = &[
    '-', '.', ':', '_', '\u{00B7}', '\u{0387}', '\u{06DD}', '\u{06DE}',
];

const JAVA_KEYWORDS: &[&str] = &[
    "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class", "const",
    "continue", "default", "do", "double", "else", "enum", "extends", "false", "final", "finally",
    "float", "for", "goto", "if", "implements", "import", "instanceof", "int", "interface",
    "long", "native", "new", "null", "package", "private", "protected", "public", "return",
    "short", "static", "strictfp", "super", "switch", "synchronized", "this", "throw", "throws",
    "transient", "true", "try", "void", "volatile", "while",
];

// ===== Identifiers =====

/// Identifier style produced by [`name_to_identifier`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierKind {
    /// `getFooBar`
    Getter,
    /// `setFooBar`
    Setter,
    /// `fooBar`
    Variable,
    /// `FooBar`
    Class,
    /// `FOO_BAR`
    Constant,
}

/// Convert an XML name to an identifier of the given style
///
/// Names that are already legal and conventional for `kind` come back
/// unchanged, except that keywords used as variables get a `_` prefix.
pub fn name_to_identifier(name: &str, kind: IdentifierKind) -> String {
    if name.is_empty() {
        return String::new();
    }

    if is_legal_identifier(name) && is_conventional(name, kind) {
        if kind == IdentifierKind::Variable && is_keyword(name) {
            return format!("_{}", name);
        }
        return name.to_string();
    }

    let words: Vec<String> = name
        .split(XML_NAME_PUNCTUATION)
        .filter(|token| !token.is_empty())
        .flat_map(split_word)
        .collect();
    make_conventional(&words, kind)
}

/// Whether `word` is a reserved word
pub fn is_keyword(word: &str) -> bool {
    JAVA_KEYWORDS.contains(&word)
}

fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_identifier_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

fn is_cased(c: char) -> bool {
    c.is_uppercase() || c.is_lowercase()
}

fn is_mark(c: char) -> bool {
    is_identifier_part(c) && !c.is_alphabetic() && !c.is_numeric()
}

fn is_legal_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(is_identifier_start) && chars.all(is_identifier_part)
}

fn is_conventional(name: &str, kind: IdentifierKind) -> bool {
    let starts_upper_at = |pos: usize| name.chars().nth(pos).is_some_and(char::is_uppercase);
    match kind {
        IdentifierKind::Constant => !name.chars().any(char::is_lowercase),
        IdentifierKind::Variable => name.chars().next().is_some_and(char::is_lowercase),
        IdentifierKind::Getter => name.starts_with("get") && starts_upper_at(3),
        IdentifierKind::Setter => name.starts_with("set") && starts_upper_at(3),
        IdentifierKind::Class => starts_upper_at(0),
    }
}

fn capitalize_first(word: &str) -> String {
    crate::runtime::class::capitalize(word)
}

/// Split one token on case changes, digit runs and uncased runs
fn split_word(token: &str) -> Vec<String> {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 1 {
        return vec![token.to_string()];
    }

    let mut words = Vec::new();
    let mut first = 0;
    while first < chars.len() {
        let lead = chars[first];
        let mut i = first + 1;
        if lead.is_numeric() {
            while i < chars.len() && chars[i].is_numeric() {
                i += 1;
            }
        } else if is_cased(lead) {
            let mut previous_lower = lead.is_lowercase();
            while i < chars.len() && is_cased(chars[i]) {
                if chars[i].is_uppercase() && previous_lower {
                    break;
                }
                previous_lower = chars[i].is_lowercase();
                i += 1;
            }
        } else {
            while i < chars.len() && (is_mark(chars[i]) || !is_cased(chars[i])) {
                i += 1;
            }
        }
        let word: String = chars[first..i].iter().collect();
        // The leading word is always capitalized; later one-character words keep their case
        if first == 0 || i - first > 1 {
            words.push(capitalize_first(&word));
        } else {
            words.push(word);
        }
        first = i;
    }
    words
}

fn make_conventional(words: &[String], kind: IdentifierKind) -> String {
    let mut out = match kind {
        IdentifierKind::Getter => String::from("get"),
        IdentifierKind::Setter => String::from("set"),
        _ => String::new(),
    };
    for (index, word) in words.iter().enumerate() {
        match kind {
            IdentifierKind::Constant => {
                if !out.is_empty() {
                    out.push('_');
                }
                out.push_str(&word.to_uppercase());
            }
            IdentifierKind::Variable if index == 0 => {
                let mut chars = word.chars();
                if let Some(c) = chars.next() {
                    out.extend(c.to_lowercase());
                    out.push_str(chars.as_str());
                }
            }
            IdentifierKind::Variable => out.push_str(word),
            _ if index == 0 => out.push_str(&capitalize_first(word)),
            _ => out.push_str(word),
        }
    }
    out
}

// ===== Accessors =====

/// A named wrapper part
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartDescription {
    /// Element name
    pub name: String,
    /// Schema type name of the element, when known (`boolean`, `string`)
    pub element_type: Option<String>,
}

impl PartDescription {
    /// Part without type information
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            element_type: None,
        }
    }

    /// Part with a schema type name
    pub fn typed(name: &str, element_type: &str) -> Self {
        Self {
            name: name.to_string(),
            element_type: Some(element_type.to_string()),
        }
    }
}

/// Build the accessor descriptors for each part of `wrapper`
///
/// `None` parts become placeholders. The object factory is looked up as
/// `<package>.ObjectFactory` in `registry`.
pub fn resolve_accessors(
    registry: &ClassRegistry,
    wrapper: &ClassRef,
    parts: &[Option<PartDescription>],
) -> WrapperSpec {
    let factory_name = format!("{}.{}", package_name(wrapper.name()), OBJECT_FACTORY);
    let object_factory = registry.get(factory_name.trim_start_matches('.'));

    let accessors = parts
        .iter()
        .map(|part| match part {
            Some(part) => resolve_part(registry, wrapper, object_factory.as_ref(), part),
            None => AccessorDescriptor::placeholder(),
        })
        .collect();

    let spec = WrapperSpec::new(wrapper.clone(), accessors);
    match object_factory {
        Some(factory) => spec.with_object_factory(factory),
        None => spec,
    }
}

fn resolve_part(
    registry: &ClassRegistry,
    wrapper: &ClassRef,
    object_factory: Option<&ClassRef>,
    part: &PartDescription,
) -> AccessorDescriptor {
    let name = part.name.as_str();
    let mut get_accessor = name_to_identifier(name, IdentifierKind::Getter);
    let mut set_accessor = name_to_identifier(name, IdentifierKind::Setter);

    let mut getter = find_method(registry, wrapper, &get_accessor, 0);
    let field = element_field(wrapper, name);

    let is_boolean = part
        .element_type
        .as_deref()
        .is_some_and(|t| t.eq_ignore_ascii_case("boolean"));
    let field_is_collection = field.as_ref().is_some_and(|f| {
        f.ty.is_array()
            || f.ty
                .class_name()
                .is_some_and(|c| registry.is_assignable_name(&c, COLLECTION))
    });
    if getter.is_none() && is_boolean && !field_is_collection {
        let is_accessor = get_accessor.replacen("get", "is", 1);
        getter = find_method(registry, wrapper, &is_accessor, 0);
    }

    if getter.is_none() && name == RETURN_PART {
        getter = find_method(registry, wrapper, "get_return", 0)
            .or_else(|| find_method(registry, wrapper, "is_return", 0));
    }

    if getter.is_none() {
        if let Some(field) = &field {
            get_accessor = name_to_identifier(&field.name, IdentifierKind::Getter);
            set_accessor = name_to_identifier(&field.name, IdentifierKind::Setter);
            getter = find_method(registry, wrapper, &get_accessor, 0);
        }
    }

    let set_accessor_alt = if name == RETURN_PART {
        "set_return".to_string()
    } else {
        set_accessor.clone()
    };
    let setter = all_methods(registry, wrapper).into_iter().find(|m| {
        m.params().len() == 1 && (m.name() == set_accessor || m.name() == set_accessor_alt)
    });

    let factory_method = setter
        .as_ref()
        .filter(|s| takes_element(registry, s))
        .and_then(|s| {
            let suffix = s.name().get(3..).unwrap_or("");
            let wanted = format!("create{}{}", simple_name(wrapper.name()), suffix);
            object_factory.and_then(|f| f.methods_named(&wanted).next().cloned())
        });

    let field = field.filter(|f| f.element_name.as_deref() == Some(name));

    tracing::trace!(
        wrapper = %wrapper.name(),
        part = %name,
        getter = getter.as_ref().map(|m| m.name()),
        setter = setter.as_ref().map(|m| m.name()),
        field = field.as_ref().map(|f| f.name.as_str()),
        "resolved part accessors"
    );

    AccessorDescriptor {
        field,
        getter,
        setter,
        factory_method,
    }
}

/// First declared field bound to `part` by element name or by identifier
fn element_field(wrapper: &ClassRef, part: &str) -> Option<Arc<Field>> {
    let variable = name_to_identifier(part, IdentifierKind::Variable);
    wrapper
        .fields()
        .iter()
        .find(|f| f.element_name.as_deref() == Some(part) || f.name == variable)
        .cloned()
}

/// Instance methods of `class` and its superclasses, most derived first
fn all_methods(resolver: &dyn ClassResolver, class: &ClassRef) -> Vec<Arc<Method>> {
    let mut methods = Vec::new();
    let mut current = Some(class.clone());
    while let Some(cls) = current {
        methods.extend(
            cls.methods()
                .iter()
                .filter(|m| !m.is_static() && !m.name().starts_with('<'))
                .cloned(),
        );
        current = cls.superclass().and_then(|s| resolver.resolve(s));
    }
    methods
}

fn find_method(
    resolver: &dyn ClassResolver,
    class: &ClassRef,
    name: &str,
    arity: usize,
) -> Option<Arc<Method>> {
    all_methods(resolver, class)
        .into_iter()
        .find(|m| m.name() == name && m.params().len() == arity)
}

fn takes_element(resolver: &dyn ClassResolver, setter: &Method) -> bool {
    setter
        .params()
        .first()
        .and_then(|ty| ty.class_name())
        .is_some_and(|name| resolver.is_assignable_name(&name, ELEMENT))
}

/// Whether the getter of a part yields a list
pub(crate) fn returns_list(resolver: &dyn ClassResolver, method: &Method) -> bool {
    method
        .return_type()
        .class_name()
        .is_some_and(|name| resolver.is_assignable_name(&name, LIST))
}

/// Whether the getter of a part yields an element holder
pub(crate) fn returns_element(resolver: &dyn ClassResolver, method: &Method) -> bool {
    method
        .return_type()
        .class_name()
        .is_some_and(|name| resolver.is_assignable_name(&name, ELEMENT))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{HostClassBuilder, Value};
    use crate::types::JType;

    #[test]
    fn test_identifier_conventional_names_unchanged() {
        assert_eq!(name_to_identifier("getFoo", IdentifierKind::Getter), "getFoo");
        assert_eq!(name_to_identifier("count", IdentifierKind::Variable), "count");
        assert_eq!(name_to_identifier("MAX", IdentifierKind::Constant), "MAX");
        assert_eq!(name_to_identifier("Order", IdentifierKind::Class), "Order");
    }

    #[test]
    fn test_identifier_styles() {
        assert_eq!(name_to_identifier("count", IdentifierKind::Getter), "getCount");
        assert_eq!(name_to_identifier("count", IdentifierKind::Setter), "setCount");
        assert_eq!(name_to_identifier("order-id", IdentifierKind::Getter), "getOrderId");
        assert_eq!(name_to_identifier("order-id", IdentifierKind::Variable), "orderId");
        assert_eq!(name_to_identifier("order_id", IdentifierKind::Variable), "order_id");
        assert_eq!(name_to_identifier("order.id", IdentifierKind::Class), "OrderId");
        assert_eq!(name_to_identifier("orderId", IdentifierKind::Constant), "ORDER_ID");
        assert_eq!(name_to_identifier("Item", IdentifierKind::Variable), "item");
    }

    #[test]
    fn test_identifier_word_splitting() {
        assert_eq!(name_to_identifier("XMLName", IdentifierKind::Getter), "getXMLName");
        assert_eq!(name_to_identifier("line2item", IdentifierKind::Getter), "getLine2Item");
        assert_eq!(name_to_identifier("a1b", IdentifierKind::Getter), "getA1b");
    }

    #[test]
    fn test_identifier_keywords() {
        assert_eq!(name_to_identifier("return", IdentifierKind::Variable), "_return");
        assert_eq!(name_to_identifier("return", IdentifierKind::Getter), "getReturn");
        assert_eq!(name_to_identifier("", IdentifierKind::Getter), "");
        assert!(is_keyword("class"));
        assert!(!is_keyword("klass"));
    }

    fn registry_with(classes: Vec<ClassRef>) -> ClassRegistry {
        let registry = ClassRegistry::with_builtins();
        for class in classes {
            registry.register(class);
        }
        registry
    }

    #[test]
    fn test_resolve_bean_properties() {
        let wrapper = HostClassBuilder::new("pkg.Request")
            .property("count", JType::int())
            .property("items", JType::list_of(JType::string()))
            .property("ready", JType::boolean())
            .build()
            .unwrap();
        let registry = registry_with(vec![wrapper.clone()]);
        let spec = resolve_accessors(
            &registry,
            &wrapper,
            &[
                Some(PartDescription::new("count")),
                None,
                Some(PartDescription::new("items")),
                Some(PartDescription::typed("ready", "boolean")),
            ],
        );
        assert_eq!(
            spec.signature(),
            "4:getCount/int,null,getItems/java.util.List,isReady/boolean,"
        );
        assert!(spec.parts[1].is_placeholder());
        assert_eq!(spec.parts[0].setter.as_ref().unwrap().name(), "setCount");
        assert!(spec.parts[0].field.is_none());
        assert!(spec.object_factory.is_none());
    }

    #[test]
    fn test_resolve_return_part() {
        let wrapper = HostClassBuilder::new("pkg.Response")
            .field("_return", JType::string())
            .getter("get_return", "_return", JType::string())
            .setter("set_return", "_return", JType::string())
            .build()
            .unwrap();
        let registry = registry_with(vec![wrapper.clone()]);
        let spec = resolve_accessors(&registry, &wrapper, &[Some(PartDescription::new("return"))]);
        let part = &spec.parts[0];
        assert_eq!(part.getter.as_ref().unwrap().name(), "get_return");
        assert_eq!(part.setter.as_ref().unwrap().name(), "set_return");
    }

    #[test]
    fn test_resolve_through_element_field() {
        let wrapper = HostClassBuilder::new("pkg.Renamed")
            .element_field("value", JType::string(), "arg0")
            .getter("getValue", "value", JType::string())
            .setter("setValue", "value", JType::string())
            .build()
            .unwrap();
        let registry = registry_with(vec![wrapper.clone()]);
        let spec = resolve_accessors(&registry, &wrapper, &[Some(PartDescription::new("arg0"))]);
        let part = &spec.parts[0];
        assert_eq!(part.getter.as_ref().unwrap().name(), "getValue");
        assert_eq!(part.setter.as_ref().unwrap().name(), "setValue");
        assert_eq!(part.field.as_ref().unwrap().name, "value");
    }

    #[test]
    fn test_field_without_getter() {
        let wrapper = HostClassBuilder::new("pkg.Bare")
            .element_field("secret", JType::string(), "secret")
            .build()
            .unwrap();
        let registry = registry_with(vec![wrapper.clone()]);
        let spec = resolve_accessors(&registry, &wrapper, &[Some(PartDescription::new("secret"))]);
        let part = &spec.parts[0];
        assert!(part.getter.is_none());
        assert!(part.field.is_some());
        assert_eq!(spec.signature(), "1:null,");
    }

    #[test]
    fn test_resolve_factory_method() {
        let element = JType::class(ELEMENT);
        let wrapper = HostClassBuilder::new("pkg.Holder")
            .property("note", element.clone())
            .build()
            .unwrap();
        let factory = HostClassBuilder::new("pkg.ObjectFactory")
            .default_constructor()
            .method("createHolderNote", vec![JType::string()], element, |resolver, _, args| {
                let value = args.first().cloned().unwrap_or(Value::Null);
                let class = resolver.require(ELEMENT)?;
                let holder = resolver.allocate(&class)?;
                if let Some(obj) = holder.as_object() {
                    obj.set_field("value", value);
                }
                Ok(holder)
            })
            .build()
            .unwrap();
        let registry = registry_with(vec![wrapper.clone(), factory]);
        let spec = resolve_accessors(&registry, &wrapper, &[Some(PartDescription::new("note"))]);
        assert!(spec.needs_factory());
        assert_eq!(
            spec.parts[0].factory_method.as_ref().unwrap().name(),
            "createHolderNote"
        );
        assert!(returns_element(&registry, spec.parts[0].getter.as_ref().unwrap()));
    }
}
