//! Dispatch table construction for classes.

use strand_ir::{SlotReceiver, SourceLocation, TypeId, VTable, VTableId, VTableSlot};

use super::Model;
use crate::diagnostics::{CompileError, CompileResult};

impl Model {
    /// Builds one table per implemented interface. Table ids are allocated before any slot is
    /// filled so default bodies can name the table of their declaring interface.
    pub(crate) fn build_vtables(&mut self, class: TypeId, loc: SourceLocation) -> CompileResult<()> {
        let interfaces = match self.class_info(class) {
            Some(info) => info.interfaces.clone(),
            None => return Ok(()),
        };
        let mut ids = Vec::with_capacity(interfaces.len());
        for iface in interfaces {
            let id = VTableId(self.vtables.len() as u32);
            self.vtables.push(VTable {
                class,
                interface: iface,
                slots: Vec::new(),
            });
            ids.push((iface, id));
        }
        if let strand_ir::TypeKind::Class(info) = &mut self.types[class.0 as usize].kind {
            info.vtables = ids.clone();
        }
        for (iface, id) in ids {
            let slots = self.build_vtable(class, iface, loc)?;
            self.vtables[id.0 as usize].slots = slots;
        }
        Ok(())
    }

    fn interfaces_related(&self, a: TypeId, b: TypeId) -> bool {
        a == b || self.interface_extends(a, b) || self.interface_extends(b, a)
    }

    fn build_vtable(
        &self,
        class: TypeId,
        iface: TypeId,
        loc: SourceLocation,
    ) -> CompileResult<Vec<VTableSlot>> {
        let methods = self
            .interface_info(iface)
            .map(|info| info.methods.clone())
            .unwrap_or_default();
        let records = self.class_methods.get(&class).cloned().unwrap_or_default();
        let closure = self
            .class_info(class)
            .map(|info| info.interfaces.clone())
            .unwrap_or_default();
        let class_name = self.type_name(class);

        let mut slots = Vec::with_capacity(methods.len());
        for method in &methods {
            // The class's own declarations win; among them the last one does.
            let own = records.iter().rev().find(|r| {
                !r.is_static
                    && r.name == method.name
                    && r.via.map_or(true, |via| self.interfaces_related(via, iface))
            });
            if let Some(record) = own {
                if record.sig != method.sig {
                    return Err(CompileError::new(
                        format!(
                            "`{class_name}.{}` does not match the signature of `{}.{}`",
                            method.name,
                            self.type_name(method.declared_in),
                            method.name
                        ),
                        loc,
                    ));
                }
                slots.push(VTableSlot {
                    method: method.name.clone(),
                    target: record.container,
                    receiver: SlotReceiver::Object,
                });
                continue;
            }

            let mut sources = vec![(method.declared_in, method.default)];
            for k in &closure {
                if *k == iface || !self.interface_extends(*k, iface) {
                    continue;
                }
                let redeclared = self.interface_info(*k).and_then(|info| {
                    info.methods
                        .iter()
                        .find(|m| m.name == method.name && m.declared_in == *k)
                });
                if let Some(m) = redeclared {
                    if !sources.iter().any(|(d, _)| d == k) {
                        sources.push((*k, m.default));
                    }
                }
            }
            let best: Vec<_> = sources
                .iter()
                .filter(|(d, _)| {
                    !sources
                        .iter()
                        .any(|(other, _)| self.interface_extends(*other, *d))
                })
                .copied()
                .collect();

            match best.as_slice() {
                [(declared_in, Some(default))] => {
                    let Some(vtable) = self.vtable_for(class, *declared_in) else {
                        return Err(CompileError::new(
                            format!(
                                "`{class_name}` has no table for `{}`",
                                self.type_name(*declared_in)
                            ),
                            loc,
                        ));
                    };
                    slots.push(VTableSlot {
                        method: method.name.clone(),
                        target: *default,
                        receiver: SlotReceiver::Interface(vtable),
                    });
                }
                [(declared_in, None)] => {
                    return Err(CompileError::new(
                        format!(
                            "class `{class_name}` does not implement `{}.{}`",
                            self.type_name(*declared_in),
                            method.name
                        ),
                        loc,
                    ));
                }
                _ => {
                    let providers = best
                        .iter()
                        .map(|(d, _)| format!("`{}`", self.type_name(*d)))
                        .collect::<Vec<_>>()
                        .join(" and ");
                    return Err(CompileError::new(
                        format!(
                            "ambiguous implementation of `{}` in `{class_name}`: provided by {providers}",
                            method.name
                        ),
                        loc,
                    ));
                }
            }
        }
        Ok(slots)
    }
}
