//! Member lookup on class, interface and enum values.

use strand_ir::{
    CallMode, Callee, ContainerId, FieldRef, Intrinsic, Op, Primitive, SymbolId, TypeId, TypeKind,
};

use super::{FunctionLowerer, Lowered};
use crate::diagnostics::CompileResult;

/// What `value.name` refers to for a value of a given type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Member {
    Field {
        index: u32,
        ty: TypeId,
        readonly: bool,
    },
    /// A class method called without dispatch.
    Method { container: ContainerId, sig: TypeId },
    Static(SymbolId),
    /// An interface method, dispatched through the table of `iface`.
    Slot { iface: TypeId, slot: u32, sig: TypeId },
    /// An enum's discriminant (`_value`).
    Tag,
    Variant { tag: i64, payload: Option<TypeId> },
}

impl FunctionLowerer<'_> {
    pub(super) fn lookup_member(&self, ty: TypeId, name: &str) -> CompileResult<Member> {
        match self.model.kind(ty) {
            TypeKind::Class(info) => {
                if let Some(index) = info.field_index(name) {
                    let field = &info.fields[index];
                    return Ok(Member::Field {
                        index: index as u32,
                        ty: field.ty,
                        readonly: field.readonly,
                    });
                }
                let interfaces = info.interfaces.clone();
                let own = self.model.class_methods.get(&ty).and_then(|records| {
                    records
                        .iter()
                        .rev()
                        .find(|r| !r.is_static && r.via.is_none() && r.name == name)
                        .map(|r| Member::Method {
                            container: r.container,
                            sig: r.sig,
                        })
                });
                if let Some(method) = own {
                    return Ok(method);
                }
                let full = format!("{}.{name}", self.model.type_name(ty));
                if let Some(sym) = self.model.named.get(&full).copied() {
                    let symbol = self.model.symbol(sym);
                    if symbol.flags.is_static {
                        return Ok(Member::Static(sym));
                    }
                }
                self.interface_member(ty, &interfaces, name)
            }
            TypeKind::Interface(info) => match info.slot(name) {
                Some(slot) => Ok(Member::Slot {
                    iface: ty,
                    slot: slot as u32,
                    sig: info.methods[slot].sig,
                }),
                None => Err(self.no_member(ty, name)),
            },
            TypeKind::Enum(info) => {
                if name == "_value" {
                    return Ok(Member::Tag);
                }
                match info.variant(name) {
                    Some(variant) => Ok(Member::Variant {
                        tag: variant.tag,
                        payload: variant.payload,
                    }),
                    None => Err(self.no_member(ty, name)),
                }
            }
            _ => Err(self.no_member(ty, name)),
        }
    }

    /// Picks the most derived implemented interface that declares `name`.
    fn interface_member(
        &self,
        class: TypeId,
        interfaces: &[TypeId],
        name: &str,
    ) -> CompileResult<Member> {
        let declaring: Vec<TypeId> = interfaces
            .iter()
            .copied()
            .filter(|iface| {
                self.model
                    .interface_info(*iface)
                    .is_some_and(|info| info.slot(name).is_some())
            })
            .collect();
        let maximal: Vec<TypeId> = declaring
            .iter()
            .copied()
            .filter(|candidate| {
                !declaring
                    .iter()
                    .any(|other| other != candidate && self.model.interface_extends(*other, *candidate))
            })
            .collect();
        match maximal.as_slice() {
            [] => Err(self.no_member(class, name)),
            [iface] => self.lookup_member(*iface, name),
            [a, b, ..] => Err(self.error(format!(
                "`{name}` on `{}` is ambiguous between `{}` and `{}`; cast to one of them",
                self.model.type_name(class),
                self.model.type_name(*a),
                self.model.type_name(*b)
            ))),
        }
    }

    fn no_member(&self, ty: TypeId, name: &str) -> crate::diagnostics::CompileError {
        self.error(format!(
            "type `{}` has no member `{name}`",
            self.model.type_name(ty)
        ))
    }

    /// Converts a class or interface value to an interface value of `iface`.
    pub(super) fn as_interface(&mut self, value: SymbolId, iface: TypeId) -> CompileResult<SymbolId> {
        self.coerce(value, iface)
    }

    /// Lowers `object.name` read as a value.
    pub(super) fn read_member(
        &mut self,
        object: SymbolId,
        name: &str,
        dest: Option<SymbolId>,
    ) -> CompileResult<Lowered> {
        let ty = self.ty(object);
        let member = self.lookup_member(ty, name)?;
        let value = match member {
            Member::Field { index, ty, .. } => {
                let dst = self.slot(dest, ty);
                self.emit(Op::MemberRead {
                    dst,
                    object,
                    field: FieldRef { index },
                });
                dst
            }
            Member::Method { container, sig } => {
                let dst = self.slot(dest, sig);
                self.emit(Op::Call {
                    dst: Some(dst),
                    callee: Callee::Intrinsic(Intrinsic::BindMethod(container)),
                    args: vec![object],
                    mode: CallMode::Sync,
                });
                dst
            }
            Member::Static(sym) => return self.symbol_value(sym, dest),
            Member::Slot { iface, slot, sig } => {
                let receiver = self.as_interface(object, iface)?;
                let dst = self.slot(dest, sig);
                self.emit(Op::Call {
                    dst: Some(dst),
                    callee: Callee::Intrinsic(Intrinsic::BindVirtual { slot }),
                    args: vec![receiver],
                    mode: CallMode::Sync,
                });
                dst
            }
            Member::Tag => {
                let i64_ty = self.model.prim(Primitive::I64);
                let dst = self.slot(dest, i64_ty);
                self.emit(Op::EnumTagRead { dst, value: object });
                dst
            }
            Member::Variant {
                tag,
                payload: Some(payload),
            } => {
                let dst = self.slot(dest, payload);
                self.emit(Op::EnumPayloadRead {
                    dst,
                    value: object,
                    tag,
                });
                dst
            }
            Member::Variant { payload: None, .. } => {
                return Err(self.error(format!(
                    "variant `{name}` of `{}` has no payload",
                    self.model.type_name(ty)
                )))
            }
        };
        Ok(Lowered::Value(value))
    }
}
