//! Implicit and explicit conversions between types.

use std::collections::VecDeque;

use rustc_hash::FxHashSet;
use strand_ir::{CastKind, Primitive, TypeId, TypeKind, VTableId};

use super::Model;

/// Single-step widening conversions between numeric primitives.
fn widenings(prim: Primitive) -> &'static [Primitive] {
    match prim {
        Primitive::U8 => &[Primitive::U16, Primitive::I16],
        Primitive::U16 => &[Primitive::U32, Primitive::I32],
        Primitive::U32 => &[Primitive::U64, Primitive::I64],
        Primitive::I8 => &[Primitive::I16],
        Primitive::I16 => &[Primitive::I32],
        Primitive::I32 => &[Primitive::I64],
        Primitive::F32 => &[Primitive::F64],
        _ => &[],
    }
}

impl Model {
    fn cast_edges(&self, from: TypeId) -> Vec<TypeId> {
        match self.kind(from) {
            TypeKind::Primitive(p) => widenings(*p).iter().map(|w| self.prim(*w)).collect(),
            TypeKind::Class(info) => info.interfaces.clone(),
            TypeKind::Interface(info) => info.supers.clone(),
            _ => Vec::new(),
        }
    }

    /// Whether a value of `from` converts to `to` without an explicit cast: the reflexive,
    /// transitive closure of the single-step edges.
    pub(crate) fn can_implicitly_cast(&mut self, from: TypeId, to: TypeId) -> bool {
        if from == to {
            return true;
        }
        if let Some(known) = self.cast_cache.get(&(from, to)) {
            return *known;
        }
        let mut seen = FxHashSet::default();
        let mut queue = VecDeque::from([from]);
        let mut found = false;
        while let Some(ty) = queue.pop_front() {
            if !seen.insert(ty) {
                continue;
            }
            if ty == to {
                found = true;
                break;
            }
            queue.extend(self.cast_edges(ty));
        }
        self.cast_cache.insert((from, to), found);
        found
    }

    pub(crate) fn vtable_for(&self, class: TypeId, interface: TypeId) -> Option<VTableId> {
        self.class_info(class)?
            .vtables
            .iter()
            .find(|(iface, _)| *iface == interface)
            .map(|(_, vt)| *vt)
    }

    /// The operation implementing an implicit conversion; `None` when the value passes through
    /// unchanged. Callers check [`Model::can_implicitly_cast`] first.
    pub(crate) fn implicit_cast_kind(&self, from: TypeId, to: TypeId) -> Option<CastKind> {
        if from == to {
            return None;
        }
        match (self.kind(from), self.kind(to)) {
            (TypeKind::Primitive(a), TypeKind::Primitive(b)) => {
                Some(CastKind::Numeric { from: *a, to: *b })
            }
            (TypeKind::Class(_), TypeKind::Interface(_)) => self
                .vtable_for(from, to)
                .map(|vtable| CastKind::Upcast { vtable }),
            (TypeKind::Interface(_), TypeKind::Interface(_)) => {
                Some(CastKind::Reinterface { target: to })
            }
            _ => None,
        }
    }

    /// The operation for `value as to`. `None` means the conversion is not allowed, except for
    /// `from == to`, which callers treat as a plain copy.
    pub(crate) fn explicit_cast_kind(&mut self, from: TypeId, to: TypeId) -> Option<CastKind> {
        if self.can_implicitly_cast(from, to) {
            return self.implicit_cast_kind(from, to);
        }
        match (self.kind(from), self.kind(to)) {
            (TypeKind::Primitive(a), TypeKind::Primitive(Primitive::Str)) if *a != Primitive::Void => {
                Some(CastKind::ToString { from: *a })
            }
            (TypeKind::Primitive(a), TypeKind::Primitive(b)) => {
                let convertible = |p: Primitive| p.is_numeric() || p == Primitive::Char;
                (convertible(*a) && convertible(*b) && !(a.is_float() && *b == Primitive::Char)
                    && !(*a == Primitive::Char && b.is_float()))
                .then_some(CastKind::Numeric { from: *a, to: *b })
            }
            (TypeKind::Interface(_), TypeKind::Class(_)) => {
                Some(CastKind::Downcast { class: to })
            }
            (TypeKind::Interface(_), TypeKind::Interface(_)) => {
                Some(CastKind::Reinterface { target: to })
            }
            _ => None,
        }
    }

    /// The type both operands of a binary operator convert to.
    pub(crate) fn common_type(&mut self, a: TypeId, b: TypeId) -> Option<TypeId> {
        if self.can_implicitly_cast(a, b) {
            Some(b)
        } else if self.can_implicitly_cast(b, a) {
            Some(a)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::CompileOptions;

    #[test]
    fn numeric_widening_is_transitive() {
        let mut model = Model::new(CompileOptions::default());
        let u8_ty = model.prim(Primitive::U8);
        let i16_ty = model.prim(Primitive::I16);
        let i64_ty = model.prim(Primitive::I64);
        let i8_ty = model.prim(Primitive::I8);
        let u64_ty = model.prim(Primitive::U64);
        let f64_ty = model.prim(Primitive::F64);

        assert!(model.can_implicitly_cast(u8_ty, i16_ty));
        assert!(model.can_implicitly_cast(u8_ty, i64_ty));
        assert!(model.can_implicitly_cast(u8_ty, u64_ty));
        assert!(!model.can_implicitly_cast(i8_ty, u64_ty));
        assert!(!model.can_implicitly_cast(i64_ty, i8_ty));
        assert!(!model.can_implicitly_cast(i64_ty, f64_ty));
        assert_eq!(model.common_type(u8_ty, i16_ty), Some(i16_ty));
        assert_eq!(model.common_type(i8_ty, u8_ty), None);
    }

    #[test]
    fn explicit_casts_cover_narrowing_and_strings() {
        let mut model = Model::new(CompileOptions::default());
        let i64_ty = model.prim(Primitive::I64);
        let u8_ty = model.prim(Primitive::U8);
        let str_ty = model.prim(Primitive::Str);
        let bool_ty = model.prim(Primitive::Bool);

        assert_eq!(
            model.explicit_cast_kind(i64_ty, u8_ty),
            Some(CastKind::Numeric {
                from: Primitive::I64,
                to: Primitive::U8
            })
        );
        assert_eq!(
            model.explicit_cast_kind(bool_ty, str_ty),
            Some(CastKind::ToString {
                from: Primitive::Bool
            })
        );
        assert_eq!(model.explicit_cast_kind(str_ty, i64_ty), None);
        assert_eq!(model.explicit_cast_kind(i64_ty, i64_ty), None);
    }
}
