#![allow(dead_code)]

use avm_resolve::{ClassKind, DescribeError, RawClassDecl, RawClassSource};

/// Initializes `env_logger` once per test process, the way the teacher's
/// integration tests let `RUST_LOG` drive trace output without any binary
/// crate installing a logger itself.
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A small, hand-authored class hierarchy for resolver tests:
/// `Object <- Shape <- Circle`, with `IArea` an exported interface `Shape`
/// implements, so both the base-chain walk and the interface-export rule can
/// be exercised by the same fixture.
pub struct FixtureSource;

impl RawClassSource for FixtureSource {
    fn describe(&self, name: &str) -> Result<RawClassDecl, DescribeError> {
        let plain = |base_name: Option<&str>| RawClassDecl {
            kind: ClassKind::Class,
            is_exported: true,
            is_boxed_primitive_wrapper: false,
            base_name: base_name.map(str::to_string),
            interface_names: Vec::new(),
            referenced_type_names: Vec::new(),
            has_unexported_instance_method: false,
        };
        Ok(match name {
            "Object" => plain(None),
            "IArea" => RawClassDecl {
                kind: ClassKind::Interface,
                ..plain(None)
            },
            "Shape" => RawClassDecl {
                interface_names: vec!["IArea".to_string()],
                ..plain(Some("Object"))
            },
            "Circle" => plain(Some("Shape")),
            _ => return Err(DescribeError::NotFound),
        })
    }
}
