//! Declarations of the built-in namespace, lowered like user code.

use crate::ast::{ClassDecl, EnumDecl, FnDecl, InterfaceDecl, Item, NamespaceDecl};

/// The built-in namespace named `namespace` (normally `std`).
pub(crate) fn prelude(namespace: &str) -> Item {
    let extern_fn = |name: &str| FnDecl::new(name).external();
    let items = vec![
        Item::Enum(
            EnumDecl::new("Option")
                .generic("T")
                .variant("none")
                .variant_with("some", "T"),
        ),
        Item::Interface(
            InterfaceDecl::new("Copy")
                .generic("T")
                .method(FnDecl::new("copy").returns("T")),
        ),
        Item::Class(ClassDecl::new("Atomic").field("value", "i64")),
        Item::Function(extern_fn("print").param("text", "string")),
        Item::Function(extern_fn("println").param("text", "string")),
        Item::Function(extern_fn("atomic_load").param("atomic", "Atomic").returns("i64")),
        Item::Function(
            extern_fn("atomic_store")
                .param("atomic", "Atomic")
                .param("value", "i64"),
        ),
        Item::Function(
            extern_fn("atomic_add")
                .param("atomic", "Atomic")
                .param("delta", "i64")
                .returns("i64"),
        ),
        Item::Function(
            extern_fn("atomic_compare_exchange")
                .param("atomic", "Atomic")
                .param("expected", "i64")
                .param("desired", "i64")
                .returns("bool"),
        ),
        Item::Function(
            extern_fn("enum_copy")
                .generic("T")
                .param("value", "T")
                .returns("T"),
        ),
    ];
    Item::Namespace(NamespaceDecl::new(namespace, items))
}
