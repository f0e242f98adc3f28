//! Human-readable instruction tables. The format is a debugging aid, not a stable interchange
//! format.

use std::fmt::Write as _;

use crate::{
    CallMode, Callee, CastKind, CodeContainer, ContainerId, FieldRef, Intrinsic, Op, Program,
    SymbolId, TypeKind,
};

impl Program {
    /// Renders the instruction table of one container.
    pub fn dump_container(&self, id: ContainerId) -> String {
        let Some(container) = self.container(id) else {
            return format!("<unknown container {}>\n", id.0);
        };
        let mut out = String::new();
        self.write_header(&mut out, container);
        for (idx, inst) in container.instructions.iter().enumerate() {
            for label in &inst.labels {
                let _ = writeln!(out, "{label}:");
            }
            let _ = writeln!(
                out,
                "  {idx:>3}: {} @{}",
                self.render_op(&inst.op),
                inst.location
            );
        }
        out
    }

    /// Renders every non-extern container in id order, separated by blank lines.
    pub fn dump_all(&self) -> String {
        let mut sections = Vec::new();
        for (idx, container) in self.containers.iter().enumerate() {
            if container.is_extern() {
                continue;
            }
            sections.push(self.dump_container(ContainerId(idx as u32)));
        }
        sections.join("\n")
    }

    fn write_header(&self, out: &mut String, container: &CodeContainer) {
        let params = container
            .params
            .iter()
            .map(|p| {
                let ty = self
                    .symbol(*p)
                    .map_or("<unknown type>", |s| self.type_name(s.ty));
                format!("{}: {}", self.symbol_name(*p), ty)
            })
            .collect::<Vec<_>>()
            .join(", ");
        let _ = write!(
            out,
            "{} {}({}) -> {}",
            container.kind.name(),
            container.name,
            params,
            self.type_name(container.ret)
        );
        if let Some(name) = &container.extern_name {
            let _ = write!(out, " extern {name}");
        }
        out.push('\n');
    }

    fn field_name(&self, object: SymbolId, field: FieldRef) -> String {
        let class = self
            .symbol(object)
            .and_then(|s| self.type_def(s.ty))
            .and_then(|t| match &t.kind {
                TypeKind::Class(info) => info.fields.get(field.index as usize),
                _ => None,
            });
        match class {
            Some(f) => f.name.clone(),
            None => format!("#{}", field.index),
        }
    }

    fn container_name(&self, id: ContainerId) -> &str {
        self.container(id).map_or("<unknown container>", |c| c.name.as_str())
    }

    fn render_callee(&self, callee: &Callee) -> String {
        match callee {
            Callee::Direct(id) => self.container_name(*id).to_string(),
            Callee::Virtual { slot } => format!("[slot {slot}]"),
            Callee::Indirect(sym) => format!("*{}", self.symbol_name(*sym)),
            Callee::Intrinsic(intrinsic) => match intrinsic {
                Intrinsic::Closure(id) | Intrinsic::BindMethod(id) => {
                    format!("@{}<{}>", intrinsic.name(), self.container_name(*id))
                }
                Intrinsic::BindVirtual { slot } => format!("@{}<{slot}>", intrinsic.name()),
                _ => format!("@{}", intrinsic.name()),
            },
        }
    }

    fn render_cast(&self, kind: &CastKind) -> String {
        match kind {
            CastKind::Numeric { from, to } => format!("numeric({from} -> {to})"),
            CastKind::ToString { from } => format!("string({from})"),
            CastKind::Upcast { vtable } => match self.vtable(*vtable) {
                Some(vt) => format!(
                    "upcast({} as {})",
                    self.type_name(vt.class),
                    self.type_name(vt.interface)
                ),
                None => format!("upcast(<vtable {}>)", vtable.0),
            },
            CastKind::Reinterface { target } => format!("reinterface({})", self.type_name(*target)),
            CastKind::Downcast { class } => format!("downcast({})", self.type_name(*class)),
            CastKind::Test { target } => format!("test({})", self.type_name(*target)),
        }
    }

    fn render_op(&self, op: &Op) -> String {
        let name = |id: &SymbolId| self.symbol_name(*id).to_string();
        let text = match op {
            Op::Assign { src, .. } => format!("assign {}", name(src)),
            Op::Literal { value, .. } => format!("literal {value}"),
            Op::Binary {
                op, lhs, rhs, operand, ..
            } => format!("{}.{} {}, {}", op.name(), operand, name(lhs), name(rhs)),
            Op::Unary {
                op, src, operand, ..
            } => format!("{}.{} {}", op.name(), operand, name(src)),
            Op::MemberRead { object, field, .. } => format!(
                "member.read {}.{}",
                name(object),
                self.field_name(*object, *field)
            ),
            Op::MemberWrite { object, field, src } => format!(
                "member.write {}.{}, {}",
                name(object),
                self.field_name(*object, *field),
                name(src)
            ),
            Op::EnumTagRead { value, .. } => format!("enum.tag {}", name(value)),
            Op::EnumTagWrite { value, tag } => format!("enum.set_tag {}, {tag}", name(value)),
            Op::EnumPayloadRead { value, tag, .. } => {
                format!("enum.payload {}, {tag}", name(value))
            }
            Op::EnumPayloadWrite { value, tag, src } => {
                format!("enum.set_payload {}, {tag}, {}", name(value), name(src))
            }
            Op::Cast { src, kind, .. } => format!("cast.{} {}", self.render_cast(kind), name(src)),
            Op::Call {
                callee, args, mode, ..
            } => {
                let mode = match mode {
                    CallMode::Sync => "",
                    CallMode::Async => ".async",
                    CallMode::Generator => ".generator",
                };
                let args = args.iter().map(name).collect::<Vec<_>>().join(", ");
                format!("call{mode} {}({args})", self.render_callee(callee))
            }
            Op::Jump { target } => format!("jump {target}"),
            Op::Branch { cond, when, target } => {
                format!("branch.{when} {}, {target}", name(cond))
            }
            Op::Return { value, status } => match value {
                Some(v) => format!("return.{} {}", status.name(), name(v)),
                None => format!("return.{}", status.name()),
            },
            Op::New { ty, .. } => format!("new {}", self.type_name(*ty)),
        };
        match op.result() {
            Some(dst) => format!("{text} -> {}", name(&dst)),
            None => text,
        }
    }
}
