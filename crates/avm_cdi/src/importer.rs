use std::collections::{BTreeSet, HashMap};

use avm_resolve::{ClassKind, DescribeError, RawClassDecl, RawClassSource};

use crate::errors::LoadError;
use crate::metadata::parse_member_metadata;
use crate::model::{HostAccessor, HostClassDecl, HostParam, HostTypeRef, OptionalKind};

fn validate_type(ty: &HostTypeRef, allow_void: bool, member: &str) -> Result<(), LoadError> {
    match ty {
        HostTypeRef::Void if !allow_void => {
            Err(LoadError::DisallowedMemberType(member.to_string()))
        }
        _ => Ok(()),
    }
}

fn validate_params(params: &[HostParam], method: &str) -> Result<(), LoadError> {
    let mut seen_optional = false;
    for (i, p) in params.iter().enumerate() {
        match p.optional {
            OptionalKind::Required => {
                if seen_optional {
                    return Err(LoadError::OptionalParameterOrder(method.to_string()));
                }
            }
            OptionalKind::Optional => seen_optional = true,
            OptionalKind::Rest => {
                if i != params.len() - 1 {
                    return Err(LoadError::RestParameterNotLast(method.to_string()));
                }
            }
        }
        validate_type(&p.ty, false, method)?;
    }
    Ok(())
}

fn validate_accessors(
    name: &str,
    getter: &Option<HostAccessor>,
    setter: &Option<HostAccessor>,
) -> Result<(), LoadError> {
    if let Some(g) = getter {
        if !g.params.is_empty() || g.return_type == HostTypeRef::Void {
            return Err(LoadError::AccessorSignatureMismatch(name.to_string()));
        }
        validate_type(&g.return_type, false, name)?;
    }
    if let Some(s) = setter {
        if s.params.len() != 1 || s.return_type != HostTypeRef::Void {
            return Err(LoadError::AccessorSignatureMismatch(name.to_string()));
        }
        validate_type(&s.params[0].ty, false, name)?;
    }
    if let (Some(g), Some(s)) = (getter, setter) {
        if g.return_type != s.params[0].ty {
            return Err(LoadError::AccessorSignatureMismatch(name.to_string()));
        }
    }
    Ok(())
}

fn collect_ref(ty: &HostTypeRef, out: &mut BTreeSet<String>) {
    if let HostTypeRef::ClassRef(name) = ty {
        out.insert(name.clone());
    }
}

/// Validates a host class declaration against spec.md §4.4's structural
/// rules and lowers it into the form `avm_resolve::TypeResolver` consumes.
pub fn import(decl: &HostClassDecl) -> Result<RawClassDecl, LoadError> {
    let name = &decl.canonical_name;

    if decl.is_generic && !decl.is_generic_vector_base {
        return Err(LoadError::GenericNotAllowed(name.clone()));
    }
    if decl.is_nested {
        return Err(LoadError::NestedNotAllowed(name.clone()));
    }
    if decl.is_abstract && decl.kind != ClassKind::Interface {
        return Err(LoadError::AbstractNotAllowed(name.clone()));
    }
    if decl.kind == ClassKind::Class && !decl.descends_from_object_root {
        return Err(LoadError::MissingObjectRootAncestor(name.clone()));
    }
    if !decl.is_public {
        return Err(LoadError::NotPublic(name.clone()));
    }
    if decl.exported_constructor_count > 1 {
        return Err(LoadError::MultipleConstructors(name.clone()));
    }

    let mut referenced = BTreeSet::new();
    let mut has_unexported_instance_method = false;

    for m in &decl.methods {
        parse_member_metadata(&m.metadata)?;
        validate_params(&m.params, &m.name)?;
        validate_type(&m.return_type, true, &m.name)?;
        for p in &m.params {
            collect_ref(&p.ty, &mut referenced);
        }
        collect_ref(&m.return_type, &mut referenced);
        if decl.kind == ClassKind::Interface && !m.is_exported {
            has_unexported_instance_method = true;
        }
    }

    for f in &decl.fields {
        parse_member_metadata(&f.metadata)?;
        validate_type(&f.ty, false, &f.name)?;
        collect_ref(&f.ty, &mut referenced);
    }

    for p in &decl.properties {
        parse_member_metadata(&p.metadata)?;
        validate_accessors(&p.name, &p.getter, &p.setter)?;
        if let Some(g) = &p.getter {
            collect_ref(&g.return_type, &mut referenced);
        }
        if let Some(s) = &p.setter {
            collect_ref(&s.params[0].ty, &mut referenced);
        }
    }

    if decl.kind == ClassKind::Interface && has_unexported_instance_method {
        return Err(LoadError::InterfaceHasUnexportedMethod(name.clone()));
    }

    log::debug!("imported class descriptor for {name}");

    Ok(RawClassDecl {
        kind: decl.kind,
        is_exported: decl.is_public,
        is_boxed_primitive_wrapper: decl.is_boxed_primitive_wrapper,
        base_name: decl.base_name.clone(),
        interface_names: decl.interface_names.clone(),
        referenced_type_names: referenced.into_iter().collect(),
        has_unexported_instance_method,
    })
}

/// A fixed table of host class declarations, importing each on demand
/// (spec.md §4.3: "creating it on demand when the source is a native
/// (host-language) declaration"). Implements [`RawClassSource`] so a
/// `TypeResolver` can be built over it directly.
pub struct CdiClassSource {
    classes: HashMap<String, HostClassDecl>,
}

impl CdiClassSource {
    pub fn new(classes: Vec<HostClassDecl>) -> Self {
        CdiClassSource {
            classes: classes
                .into_iter()
                .map(|c| (c.canonical_name.clone(), c))
                .collect(),
        }
    }
}

impl RawClassSource for CdiClassSource {
    fn describe(&self, canonical_name: &str) -> Result<RawClassDecl, DescribeError> {
        let decl = self
            .classes
            .get(canonical_name)
            .ok_or(DescribeError::NotFound)?;
        import(decl).map_err(|e| DescribeError::Malformed(e.to_string()))
    }
}
