use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use avm_core::types::{PrimitiveKind, TypeSignature};
use avm_core::{ClassId, DomainId, DomainSymbolTable};

use crate::errors::{ResolveError, Result};
use crate::model::{ClassDescriptor, ClassKind, Namespace, NamespaceKind, QualifiedName};
use crate::source::{DescribeError, RawClassSource};

/// Resolves qualified names to [`ClassDescriptor`]s for one application
/// domain, importing from `source` on a cache miss (spec.md §4.3).
///
/// Uses `Mutex`/`AtomicU32` rather than `Cell`/`RefCell` throughout, matching
/// [`DomainSymbolTable`]'s single-writer concurrency model (spec.md §5) —
/// unlike `avm_token::DynamicTokenProvider`, nothing here is documented as
/// single-threaded.
pub struct TypeResolver<'a> {
    domain: DomainId,
    table: DomainSymbolTable<ClassDescriptor>,
    by_id: Mutex<HashMap<ClassId, Arc<ClassDescriptor>>>,
    next_id: AtomicU32,
    in_progress: Mutex<HashSet<String>>,
    source: &'a dyn RawClassSource,
}

struct ProgressGuard<'a> {
    set: &'a Mutex<HashSet<String>>,
    name: String,
}

impl<'a> ProgressGuard<'a> {
    fn enter(set: &'a Mutex<HashSet<String>>, name: &str) -> Option<Self> {
        let mut guard = set.lock().expect("resolver poisoned");
        if guard.contains(name) {
            return None;
        }
        guard.insert(name.to_string());
        Some(ProgressGuard {
            set,
            name: name.to_string(),
        })
    }
}

impl<'a> Drop for ProgressGuard<'a> {
    fn drop(&mut self) {
        self.set.lock().expect("resolver poisoned").remove(&self.name);
    }
}

impl<'a> TypeResolver<'a> {
    pub fn new(domain: DomainId, source: &'a dyn RawClassSource) -> Self {
        TypeResolver {
            domain,
            table: DomainSymbolTable::new(domain),
            by_id: Mutex::new(HashMap::new()),
            next_id: AtomicU32::new(0),
            in_progress: Mutex::new(HashSet::new()),
            source,
        }
    }

    pub fn domain(&self) -> DomainId {
        self.domain
    }

    /// spec.md §4.3 "Name formation": rejects `private`; a null URI selects
    /// the public namespace regardless of the reported kind.
    pub fn form_qualified_name(
        &self,
        uri: Option<&str>,
        kind: NamespaceKind,
        local_name: &str,
    ) -> Result<QualifiedName> {
        if kind == NamespaceKind::Private {
            return Err(ResolveError::PrivateNamespaceRejected);
        }
        let namespace = match uri {
            None => Namespace::public(),
            Some(u) => Namespace {
                uri: Some(u.to_string()),
                kind,
            },
        };
        Ok(QualifiedName {
            namespace,
            local_name: local_name.to_string(),
        })
    }

    pub fn resolve(&self, name: &QualifiedName) -> Result<ClassId> {
        self.resolve_canonical(&name.canonical())
    }

    /// Resolves a host-reported canonical name directly, for base/interface/
    /// member-type references that arrive pre-formed (spec.md §4.3
    /// "Dependency closure").
    pub fn resolve_by_name(&self, raw: &str) -> Result<ClassId> {
        self.resolve_canonical(raw)
    }

    pub fn descriptor(&self, id: ClassId) -> Option<Arc<ClassDescriptor>> {
        self.by_id.lock().expect("resolver poisoned").get(&id).cloned()
    }

    fn resolve_canonical(&self, canonical: &str) -> Result<ClassId> {
        if let Some(existing) = self.table.lookup(canonical) {
            return Ok(existing.id);
        }

        let _guard = ProgressGuard::enter(&self.in_progress, canonical)
            .ok_or_else(|| ResolveError::CyclicBaseChain(canonical.to_string()))?;

        let decl = self.source.describe(canonical).map_err(|e| match e {
            DescribeError::NotFound => ResolveError::NotFound(canonical.to_string()),
            DescribeError::Malformed(reason) => {
                ResolveError::ImportFailed(canonical.to_string(), reason)
            }
        })?;

        let base = match &decl.base_name {
            Some(n) => Some(self.resolve_canonical(n)?),
            None => None,
        };

        let mut interfaces = Vec::with_capacity(decl.interface_names.len());
        for iface_name in &decl.interface_names {
            let iface_id = self.resolve_canonical(iface_name)?;
            if decl.kind == ClassKind::Interface {
                let exported = self.descriptor(iface_id).map(|d| d.is_exported).unwrap_or(false);
                if !exported {
                    return Err(ResolveError::InterfaceBaseNotExported(iface_name.clone()));
                }
            }
            interfaces.push(iface_id);
        }

        if decl.kind == ClassKind::Interface && decl.has_unexported_instance_method {
            return Err(ResolveError::InterfaceHasUnexportedMethod(canonical.to_string()));
        }

        let id = ClassId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let descriptor = ClassDescriptor {
            id,
            qualified_name: QualifiedName::from_canonical(canonical),
            kind: decl.kind,
            is_exported: decl.is_exported,
            base,
            interfaces,
            vector_element: None,
            is_boxed_primitive_wrapper: decl.is_boxed_primitive_wrapper,
        };

        let published = self
            .table
            .try_define_global_trait(canonical.to_string(), descriptor)
            .map_err(|e| ResolveError::ImportFailed(canonical.to_string(), e.to_string()))?;
        self.by_id.lock().expect("resolver poisoned").insert(id, published);

        log::debug!("resolved class {canonical}");

        for referenced in &decl.referenced_type_names {
            self.resolve_canonical(referenced)?;
        }

        Ok(id)
    }

    /// spec.md §4.3 "Vector instantiations".
    pub fn instantiate_vector(&self, vector_base: ClassId, element: &TypeSignature) -> Result<ClassId> {
        match element {
            TypeSignature::Any => {
                return Err(ResolveError::VectorElementInvalid("the any-type".into()))
            }
            TypeSignature::Vector(_) => {
                return Err(ResolveError::VectorElementInvalid("the vector type itself".into()))
            }
            TypeSignature::Class(id) if *id == vector_base => {
                return Err(ResolveError::VectorElementInvalid("the vector type itself".into()))
            }
            TypeSignature::Class(id) => {
                if self
                    .descriptor(*id)
                    .map(|d| d.is_boxed_primitive_wrapper)
                    .unwrap_or(false)
                {
                    return Err(ResolveError::VectorElementInvalid(
                        "a boxed-primitive wrapper".into(),
                    ));
                }
            }
            _ => {}
        }

        let base = self
            .descriptor(vector_base)
            .ok_or_else(|| ResolveError::NotFound(format!("vector base {vector_base:?}")))?;
        let element_local = element_local_name(self, element);
        let local_name = format!("{}.<{}>", base.qualified_name.local_name, element_local);
        let namespace = base.qualified_name.namespace.clone();
        let canonical = match &namespace.uri {
            Some(uri) if !uri.is_empty() => format!("{uri}::{local_name}"),
            _ => local_name.clone(),
        };

        if let Some(existing) = self.table.lookup(&canonical) {
            return Ok(existing.id);
        }

        let vector_element = if let TypeSignature::Class(eid) = element {
            Some(*eid)
        } else {
            None
        };
        let id = ClassId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let descriptor = ClassDescriptor {
            id,
            qualified_name: QualifiedName { namespace, local_name },
            kind: ClassKind::VectorInstantiation,
            is_exported: base.is_exported,
            base: Some(vector_base),
            interfaces: Vec::new(),
            vector_element,
            is_boxed_primitive_wrapper: false,
        };
        let published = self
            .table
            .try_define_global_trait(canonical.clone(), descriptor)
            .map_err(|e| ResolveError::ImportFailed(canonical, e.to_string()))?;
        self.by_id.lock().expect("resolver poisoned").insert(id, published);
        Ok(id)
    }
}


fn element_local_name(resolver: &TypeResolver, element: &TypeSignature) -> String {
    match element {
        TypeSignature::Primitive(PrimitiveKind::Int32) => "int".to_string(),
        TypeSignature::Primitive(PrimitiveKind::UInt32) => "uint".to_string(),
        TypeSignature::Primitive(PrimitiveKind::Float64) => "Number".to_string(),
        TypeSignature::Primitive(PrimitiveKind::Bool) => "Boolean".to_string(),
        TypeSignature::String => "String".to_string(),
        TypeSignature::Void => "void".to_string(),
        TypeSignature::Class(id) => resolver
            .descriptor(*id)
            .map(|d| d.qualified_name.local_name.clone())
            .unwrap_or_else(|| "Object".to_string()),
        TypeSignature::ByRef(inner) => element_local_name(resolver, inner),
        TypeSignature::Any | TypeSignature::Vector(_) => unreachable!("rejected above"),
    }
}
