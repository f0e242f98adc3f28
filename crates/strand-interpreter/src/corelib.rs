use strand_ir::ReturnStatus;

use crate::error::RuntimeFault;
use crate::value::{ObjectRef, Value};
use crate::vm::Vm;

/// Namespace the built-in externs are declared in.
pub const CORE_NAMESPACE: &str = "std";

/// Installs the `std` primitives: printing, the `Atomic` cell operations and enum copying.
pub fn register_core_host_fns(vm: &mut Vm) {
    register_print_fns(vm);
    register_atomic_fns(vm);
    register_enum_fns(vm);
}

fn name(short: &str) -> String {
    format!("{CORE_NAMESPACE}.{short}")
}

fn register_print_fns(vm: &mut Vm) {
    vm.register_host_fn(name("print"), |ctx, _result, args| match args {
        [Value::Str(text)] => {
            ctx.write(text);
            Ok(ReturnStatus::Finished)
        }
        other => Err(RuntimeFault::host("std.print", format!("bad args: {other:?}"))),
    });
    vm.register_host_fn(name("println"), |ctx, _result, args| match args {
        [Value::Str(text)] => {
            ctx.write(text);
            ctx.write("\n");
            Ok(ReturnStatus::Finished)
        }
        other => Err(RuntimeFault::host("std.println", format!("bad args: {other:?}"))),
    });
}

/// The `value` field of an `Atomic` instance.
fn atomic_value(function: &str, atomic: &ObjectRef) -> Result<i64, RuntimeFault> {
    match atomic.field(0) {
        Some(Value::Int(value)) => Ok(value),
        other => Err(RuntimeFault::host(
            function,
            format!("atomic cell holds {other:?}"),
        )),
    }
}

fn register_atomic_fns(vm: &mut Vm) {
    vm.register_host_fn(name("atomic_load"), |_ctx, result, args| match args {
        [Value::Object(atomic)] => {
            *result = Some(Value::Int(atomic_value("std.atomic_load", atomic)?));
            Ok(ReturnStatus::Finished)
        }
        other => Err(RuntimeFault::host("std.atomic_load", format!("bad args: {other:?}"))),
    });
    vm.register_host_fn(name("atomic_store"), |_ctx, _result, args| match args {
        [Value::Object(atomic), Value::Int(value)] => {
            atomic.set_field(0, Value::Int(*value));
            Ok(ReturnStatus::Finished)
        }
        other => Err(RuntimeFault::host("std.atomic_store", format!("bad args: {other:?}"))),
    });
    // Returns the updated value.
    vm.register_host_fn(name("atomic_add"), |_ctx, result, args| match args {
        [Value::Object(atomic), Value::Int(delta)] => {
            let updated = atomic_value("std.atomic_add", atomic)?.wrapping_add(*delta);
            atomic.set_field(0, Value::Int(updated));
            *result = Some(Value::Int(updated));
            Ok(ReturnStatus::Finished)
        }
        other => Err(RuntimeFault::host("std.atomic_add", format!("bad args: {other:?}"))),
    });
    vm.register_host_fn(name("atomic_compare_exchange"), |_ctx, result, args| match args {
        [Value::Object(atomic), Value::Int(expected), Value::Int(desired)] => {
            let current = atomic_value("std.atomic_compare_exchange", atomic)?;
            let swapped = current == *expected;
            if swapped {
                atomic.set_field(0, Value::Int(*desired));
            }
            *result = Some(Value::Bool(swapped));
            Ok(ReturnStatus::Finished)
        }
        other => Err(RuntimeFault::host(
            "std.atomic_compare_exchange",
            format!("bad args: {other:?}"),
        )),
    });
}

fn register_enum_fns(vm: &mut Vm) {
    vm.register_host_fn(name("enum_copy"), |_ctx, result, args| match args {
        [Value::Enum(value)] => {
            *result = Some(Value::Enum(value.deep_copy()));
            Ok(ReturnStatus::Finished)
        }
        other => Err(RuntimeFault::host("std.enum_copy", format!("bad args: {other:?}"))),
    });
}
