//! Cross-crate pipeline: a host-reported class graph goes through the
//! Class Descriptor Importer, gets resolved by the Type Resolver, and a
//! hand-assembled ABC method body referencing one of those classes is
//! verified and translated into a finalized native method body — the same
//! chain spec.md §4 describes as five cooperating components.

mod support;

use avm_cdi::{CdiClassSource, HostClassDecl, HostField, HostMethod, HostTypeRef};
use avm_core::types::TypeSignature;
use avm_core::DomainId;
use avm_ie::InstructionEmitter;
use avm_resolve::{ClassKind, TypeResolver};
use avm_token::{MethodSignature, StaticTokenProviderBuilder};
use avm_verify::abc::wire;
use avm_verify::{
    translate_method, AbcConstantPool, AbcExceptionInfo, AbcMethodInput, TranslateError, VerifyError,
    VerifyOptions,
};

fn u32_bytes(n: u32) -> [u8; 4] {
    n.to_le_bytes()
}

fn object_decl() -> HostClassDecl {
    HostClassDecl {
        canonical_name: "Object".to_string(),
        kind: ClassKind::Class,
        is_generic: false,
        is_generic_vector_base: false,
        is_nested: false,
        is_abstract: false,
        is_public: true,
        descends_from_object_root: true,
        is_boxed_primitive_wrapper: false,
        base_name: None,
        interface_names: Vec::new(),
        exported_constructor_count: 0,
        methods: Vec::new(),
        fields: Vec::new(),
        properties: Vec::new(),
    }
}

/// `Widget`, a public class descending from `Object` with an exported field
/// `count` and an exported void instance method `bump`.
fn widget_decl() -> HostClassDecl {
    HostClassDecl {
        canonical_name: "Widget".to_string(),
        kind: ClassKind::Class,
        is_generic: false,
        is_generic_vector_base: false,
        is_nested: false,
        is_abstract: false,
        is_public: true,
        descends_from_object_root: true,
        is_boxed_primitive_wrapper: false,
        base_name: Some("Object".to_string()),
        interface_names: Vec::new(),
        exported_constructor_count: 1,
        methods: vec![HostMethod {
            name: "bump".to_string(),
            is_exported: true,
            params: vec![],
            return_type: HostTypeRef::Void,
            metadata: Vec::new(),
        }],
        fields: vec![HostField {
            name: "count".to_string(),
            is_exported: true,
            ty: HostTypeRef::Primitive(avm_core::types::PrimitiveKind::Int32),
            metadata: Vec::new(),
        }],
        properties: Vec::new(),
    }
}

struct FakePool;
impl AbcConstantPool for FakePool {
    fn string(&self, _index: u32) -> &str {
        ""
    }
    fn multiname(&self, index: u32) -> &str {
        match index {
            1 => "count",
            2 => "bump",
            _ => panic!("unexpected multiname index {index}"),
        }
    }
    fn method_signature(&self, class_name: &str, member_name: &str) -> MethodSignature {
        assert_eq!(class_name, "Widget");
        assert_eq!(member_name, "bump");
        MethodSignature { params: Vec::new(), return_type: TypeSignature::Void, has_this: true }
    }
}

/// Reads a field and discards it, then calls a void method on the same
/// receiver — `GetLocal(0); GetProperty(count); Pop; GetLocal(0);
/// CallPropertyVoid(bump, 0); ReturnVoid`.
fn widget_run_method_code() -> Vec<u8> {
    let mut code = Vec::new();
    code.push(wire::GET_LOCAL);
    code.extend_from_slice(&u32_bytes(0));
    code.push(wire::GET_PROPERTY);
    code.extend_from_slice(&u32_bytes(1));
    code.push(wire::POP);
    code.push(wire::GET_LOCAL);
    code.extend_from_slice(&u32_bytes(0));
    code.push(wire::CALL_PROPERTY_VOID);
    code.extend_from_slice(&u32_bytes(2));
    code.extend_from_slice(&u32_bytes(0));
    code.push(wire::RETURN_VOID);
    code
}

#[test]
fn cdi_resolve_ie_verify_pipeline_produces_a_method_body() {
    support::init_test_logging();

    let source = CdiClassSource::new(vec![object_decl(), widget_decl()]);
    let resolver = TypeResolver::new(DomainId(0), &source);
    let widget = resolver.resolve_by_name("Widget").unwrap();

    let descriptor = resolver.descriptor(widget).unwrap();
    assert_eq!(descriptor.qualified_name.local_name, "Widget");
    let base = resolver.descriptor(descriptor.base.unwrap()).unwrap();
    assert_eq!(base.qualified_name.local_name, "Object");

    let mut builder = StaticTokenProviderBuilder::new();
    builder.define_field(widget, "count");
    builder.define_method(
        widget,
        "bump",
        MethodSignature { params: Vec::new(), return_type: TypeSignature::Void, has_this: true },
    );
    let token_provider = builder.build();

    let code = widget_run_method_code();
    let pool = FakePool;
    let input = AbcMethodInput {
        method_name: "Widget::run".to_string(),
        code: &code,
        exceptions: &[],
        constants: &pool,
        local_count: 1,
    };

    let mut emitter = InstructionEmitter::new(Some(&token_provider));
    let body = translate_method(
        &input,
        &resolver,
        &[TypeSignature::Class(widget)],
        &mut emitter,
        &VerifyOptions::default(),
    )
    .unwrap();

    assert!(!body.code_bytes.is_empty());
    assert!(body.max_stack >= 1);
    assert!(body.init_locals_flag);
    assert!(body.exception_section_bytes.is_empty());
}

/// A class the importer rejects (not public) never reaches the resolver, so
/// resolution surfaces the CDI validation failure through `DescribeError`.
#[test]
fn an_importer_rejection_surfaces_through_resolve() {
    support::init_test_logging();

    let mut not_public = widget_decl();
    not_public.is_public = false;
    let source = CdiClassSource::new(vec![object_decl(), not_public]);
    let resolver = TypeResolver::new(DomainId(0), &source);

    let err = resolver.resolve_by_name("Widget").unwrap_err();
    assert!(matches!(err, avm_resolve::ResolveError::ImportFailed(_, _)));
}

/// A try/catch around the field access, translated end to end: the handler
/// discards the caught value and falls through to the same void call, so
/// the emitted exception section is non-empty and the catch type resolves
/// to `Widget` itself (an arbitrary but legal catch-type choice here).
#[test]
fn pipeline_round_trips_a_try_catch_region() {
    support::init_test_logging();

    let source = CdiClassSource::new(vec![object_decl(), widget_decl()]);
    let resolver = TypeResolver::new(DomainId(0), &source);
    let widget = resolver.resolve_by_name("Widget").unwrap();

    let mut builder = StaticTokenProviderBuilder::new();
    builder.define_field(widget, "count");
    builder.define_method(
        widget,
        "bump",
        MethodSignature { params: Vec::new(), return_type: TypeSignature::Void, has_this: true },
    );
    let token_provider = builder.build();

    // try { GetLocal(0); GetProperty(count); Pop } catch(Widget) { Pop }
    // ReturnVoid
    let mut code = Vec::new();
    code.push(wire::GET_LOCAL);
    code.extend_from_slice(&u32_bytes(0));
    code.push(wire::GET_PROPERTY);
    code.extend_from_slice(&u32_bytes(1));
    code.push(wire::POP);
    let try_end = code.len() as u32;
    let handler_start = code.len() as u32;
    code.push(wire::POP);
    let handler_end = code.len() as u32;
    code.push(wire::RETURN_VOID);

    let pool = FakePool;
    let exceptions = [AbcExceptionInfo {
        try_start: 0,
        try_end,
        handler_start,
        handler_end,
        kind: avm_core::ExceptionKind::Catch,
        catch_type_name: Some("Widget".to_string()),
        filter_start: None,
    }];
    let input = AbcMethodInput {
        method_name: "Widget::guarded".to_string(),
        code: &code,
        exceptions: &exceptions,
        constants: &pool,
        local_count: 1,
    };

    let mut emitter = InstructionEmitter::new(Some(&token_provider));
    let body = translate_method(
        &input,
        &resolver,
        &[TypeSignature::Class(widget)],
        &mut emitter,
        &VerifyOptions::default(),
    )
    .unwrap();

    assert!(!body.exception_section_bytes.is_empty());
}

/// A try/filter/catch translated end to end: the filter expression and the
/// catch body are two distinct regions starting at two distinct offsets
/// (`filter_start` and `handler_start`), not a single merged region — the
/// two-step `begin_filter`/`begin_catch` structure spec.md §4.1 describes.
#[test]
fn pipeline_round_trips_a_try_filter_catch_region() {
    support::init_test_logging();

    let source = CdiClassSource::new(vec![object_decl(), widget_decl()]);
    let resolver = TypeResolver::new(DomainId(0), &source);
    let widget = resolver.resolve_by_name("Widget").unwrap();

    let mut builder = StaticTokenProviderBuilder::new();
    builder.define_field(widget, "count");
    builder.define_method(
        widget,
        "bump",
        MethodSignature { params: Vec::new(), return_type: TypeSignature::Void, has_this: true },
    );
    let token_provider = builder.build();

    // try { GetLocal(0); GetProperty(count); Pop }
    // filter(Widget) { Pop; PushTrue } — discards the caught value and
    // leaves a boolean in its place, so the block's net stack depth (1)
    // matches the catch body's directly-seeded entry depth.
    // catch { Pop }
    // ReturnVoid
    let mut code = Vec::new();
    code.push(wire::GET_LOCAL);
    code.extend_from_slice(&u32_bytes(0));
    code.push(wire::GET_PROPERTY);
    code.extend_from_slice(&u32_bytes(1));
    code.push(wire::POP);
    let try_end = code.len() as u32;
    let filter_start = code.len() as u32;
    code.push(wire::POP);
    code.push(wire::PUSH_TRUE);
    let handler_start = code.len() as u32;
    code.push(wire::POP);
    let handler_end = code.len() as u32;
    code.push(wire::RETURN_VOID);

    let pool = FakePool;
    let exceptions = [AbcExceptionInfo {
        try_start: 0,
        try_end,
        handler_start,
        handler_end,
        kind: avm_core::ExceptionKind::Filter,
        catch_type_name: Some("Widget".to_string()),
        filter_start: Some(filter_start),
    }];
    let input = AbcMethodInput {
        method_name: "Widget::filtered".to_string(),
        code: &code,
        exceptions: &exceptions,
        constants: &pool,
        local_count: 1,
    };

    let mut emitter = InstructionEmitter::new(Some(&token_provider));
    let body = translate_method(
        &input,
        &resolver,
        &[TypeSignature::Class(widget)],
        &mut emitter,
        &VerifyOptions::default(),
    )
    .unwrap();

    assert!(!body.exception_section_bytes.is_empty());
}

/// Omitting `filter_start` on a `Filter`-kind exception entry is rejected
/// before any code gets emitted, rather than silently collapsing the filter
/// expression and the catch body into one region.
#[test]
fn pipeline_rejects_a_filter_region_missing_filter_start() {
    support::init_test_logging();

    let source = CdiClassSource::new(vec![object_decl(), widget_decl()]);
    let resolver = TypeResolver::new(DomainId(0), &source);
    let widget = resolver.resolve_by_name("Widget").unwrap();

    let mut code = Vec::new();
    code.push(wire::POP);
    let handler_start = code.len() as u32;
    code.push(wire::POP);
    let handler_end = code.len() as u32;
    code.push(wire::RETURN_VOID);

    let pool = FakePool;
    let exceptions = [AbcExceptionInfo {
        try_start: 0,
        try_end: handler_start,
        handler_start,
        handler_end,
        kind: avm_core::ExceptionKind::Filter,
        catch_type_name: Some("Widget".to_string()),
        filter_start: None,
    }];
    let input = AbcMethodInput {
        method_name: "Widget::badFilter".to_string(),
        code: &code,
        exceptions: &exceptions,
        constants: &pool,
        local_count: 1,
    };

    let mut emitter = InstructionEmitter::new(None);
    let err = translate_method(&input, &resolver, &[TypeSignature::Class(widget)], &mut emitter, &VerifyOptions::default())
        .unwrap_err();
    assert!(matches!(err, TranslateError::Verify(VerifyError::MalformedExceptionRegion { .. })));
}

/// Feeding a stack-underflowing method through the full pipeline surfaces
/// the same `VerifyError` the verifier crate's own unit tests exercise in
/// isolation — confirming the error type survives the CDI/resolve wiring.
#[test]
fn pipeline_surfaces_stack_underflow() {
    support::init_test_logging();

    let source = CdiClassSource::new(vec![object_decl(), widget_decl()]);
    let resolver = TypeResolver::new(DomainId(0), &source);
    let pool = FakePool;
    let code = [wire::POP, wire::RETURN_VOID];
    let input = AbcMethodInput {
        method_name: "broken".to_string(),
        code: &code,
        exceptions: &[],
        constants: &pool,
        local_count: 0,
    };
    let mut emitter = InstructionEmitter::new(None);
    let err = translate_method(&input, &resolver, &[], &mut emitter, &VerifyOptions::default()).unwrap_err();
    assert!(matches!(err, TranslateError::Verify(VerifyError::StackUnderflow { offset: 0 })));
}
