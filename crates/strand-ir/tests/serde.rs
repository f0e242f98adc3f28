#![cfg(feature = "serde")]

use strand_ir::{
    CodeContainer, ContainerId, ContainerKind, Instruction, Literal, Op, Primitive, Program,
    ReturnStatus, SourceLocation, Storage, Symbol, SymbolFlags, SymbolId, SymbolKind, TypeDef,
    TypeId, TypeKind,
};

fn sample() -> Program {
    let mut program = Program {
        types: vec![TypeDef {
            name: "i32".to_string(),
            kind: TypeKind::Primitive(Primitive::I32),
            generic_params: Vec::new(),
            generic_args: Vec::new(),
            generic_origin: None,
        }],
        symbols: vec![Symbol {
            kind: SymbolKind::Variable,
            full_name: "$t0".to_string(),
            origin_name: "$t0".to_string(),
            scope_depth: 1,
            container: Some(ContainerId(0)),
            owner_type: None,
            ty: TypeId(0),
            readonly: false,
            flags: SymbolFlags {
                local: true,
                temporary: true,
                ..SymbolFlags::default()
            },
            param_index: None,
            storage: Storage::Local(0),
        }],
        ..Program::default()
    };
    let mut container = CodeContainer::new("answer", ContainerKind::Function, TypeId(0));
    container.locals = vec![SymbolId(0)];
    container.instructions = vec![
        Instruction {
            op: Op::Literal {
                dst: SymbolId(0),
                value: Literal::Int(42),
            },
            labels: Vec::new(),
            location: SourceLocation::new(1, 1),
        },
        Instruction {
            op: Op::Return {
                value: Some(SymbolId(0)),
                status: ReturnStatus::Finished,
            },
            labels: Vec::new(),
            location: SourceLocation::new(2, 1),
        },
    ];
    container.index_labels();
    program.containers.push(container);
    program
        .container_ids
        .insert("answer".to_string(), ContainerId(0));
    program
}

#[test]
fn frozen_program_survives_json() {
    let program = sample();
    let json = serde_json::to_string(&program).expect("serialize");
    let back: Program = serde_json::from_str(&json).expect("deserialize");

    assert_eq!(back.container_id("answer"), Some(ContainerId(0)));
    assert_eq!(back.dump_all(), program.dump_all());
}

#[test]
fn lookup_tables_default_when_absent() {
    let mut value = serde_json::to_value(sample()).expect("serialize");
    let object = value.as_object_mut().expect("object");
    object.remove("container_ids");
    object.remove("type_ids");
    let back: Program = serde_json::from_value(value).expect("deserialize");
    assert!(back.container_ids.is_empty());
    assert_eq!(back.containers.len(), 1);
}

#[test]
fn binary_artifact_round_trips_and_reindexes_labels() {
    let mut program = sample();
    program.containers[0].instructions[1]
        .labels
        .push(strand_ir::Label("answer_0".to_string()));
    program.containers[0].index_labels();

    let bytes = strand_ir::to_bytes(&program).expect("save");
    let back = strand_ir::load_program(&bytes).expect("load");
    assert_eq!(back.dump_all(), program.dump_all());
    assert_eq!(
        back.containers[0].label_target(&strand_ir::Label("answer_0".to_string())),
        Some(1)
    );
    assert!(strand_ir::load_program(&bytes[..bytes.len() / 2]).is_err());
}
