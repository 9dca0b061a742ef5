use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use wrapgen_engine::{
    resolve_accessors, ClassRef, ClassRegistry, CodeGenConfig, CodeGenContext, HostClassBuilder,
    JType, LibraryCatalog, PartDescription, ReflectiveWrapperHelper, Value, WrapperHelper,
    WrapperHelperFactory,
};

fn order(registry: &ClassRegistry) -> ClassRef {
    registry.register(
        HostClassBuilder::new("bench.Order")
            .property("count", JType::int())
            .property("items", JType::list_of(JType::string()))
            .property("note", JType::string())
            .build()
            .unwrap(),
    )
}

fn parts() -> Vec<Option<PartDescription>> {
    ["count", "items", "note"]
        .iter()
        .map(|n| Some(PartDescription::new(n)))
        .collect()
}

fn values() -> Vec<Value> {
    vec![
        Value::Int(3),
        Value::list(vec![Value::str("a"), Value::str("b")]),
        Value::str("note"),
    ]
}

fn bench_create_wrapper_object(c: &mut Criterion) {
    let factory = WrapperHelperFactory::default();
    let wrapper = order(factory.context().registry());
    let generated = factory.create_for(&wrapper, &parts());
    let registry = factory.context().registry().clone();
    let reflective: Arc<dyn WrapperHelper> = Arc::new(ReflectiveWrapperHelper::new(
        registry.clone(),
        resolve_accessors(&registry, &wrapper, &parts()),
    ));
    let input = values();

    let mut group = c.benchmark_group("create_wrapper_object");
    for (name, helper) in [("generated", &generated), ("reflective", &reflective)] {
        group.bench_with_input(BenchmarkId::new(name, 3), &input, |b, input| {
            b.iter(|| helper.create_wrapper_object(black_box(input)).unwrap());
        });
    }
    group.finish();
}

fn bench_wrapper_parts(c: &mut Criterion) {
    let factory = WrapperHelperFactory::default();
    let wrapper = order(factory.context().registry());
    let generated = factory.create_for(&wrapper, &parts());
    let object = generated.create_wrapper_object(&values()).unwrap();
    let registry = factory.context().registry().clone();
    let reflective: Arc<dyn WrapperHelper> = Arc::new(ReflectiveWrapperHelper::new(
        registry.clone(),
        resolve_accessors(&registry, &wrapper, &parts()),
    ));

    let mut group = c.benchmark_group("wrapper_parts");
    for (name, helper) in [("generated", &generated), ("reflective", &reflective)] {
        group.bench_with_input(BenchmarkId::new(name, 3), &object, |b, object| {
            b.iter(|| helper.wrapper_parts(black_box(object)).unwrap());
        });
    }
    group.finish();
}

fn bench_cached_lookup(c: &mut Criterion) {
    let context = Arc::new(CodeGenContext::new(
        CodeGenConfig::default(),
        Arc::new(ClassRegistry::with_builtins()),
        Arc::new(LibraryCatalog::with_bundled()),
    ));
    let factory = WrapperHelperFactory::new(context);
    let wrapper = order(factory.context().registry());
    factory.create_for(&wrapper, &parts());

    c.bench_function("cached_helper_lookup", |b| {
        b.iter(|| factory.create_for(black_box(&wrapper), &parts()));
    });
}

criterion_group!(
    benches,
    bench_create_wrapper_object,
    bench_wrapper_parts,
    bench_cached_lookup
);
criterion_main!(benches);
