use protolink::{
    file::{File, FileResolver},
    model::{ImportKind, Label, OptionValue, Parent, ScalarType, Syntax, Type, UserType},
    Compiler, Error,
};

struct TestFileResolver {
    files: &'static [(&'static str, &'static str)],
}

impl FileResolver for TestFileResolver {
    fn open_file(&self, name: &str) -> Result<File, Error> {
        for file in self.files {
            if file.0 == name {
                return File::from_source(name, file.1);
            }
        }

        Err(Error::file_not_found(name))
    }
}

/// Opens the last of `files`, which loads the others through its imports.
fn check(files: &'static [(&'static str, &'static str)]) -> Result<Compiler, Error> {
    let mut compiler = Compiler::with_file_resolver(TestFileResolver { files });
    compiler.open_file(files[files.len() - 1].0)?;
    Ok(compiler)
}

const SHOP: &[(&str, &str)] = &[
    (
        "common/money.proto",
        "syntax = \"proto3\";
        package shop.common;

        message Money {
            string currency = 1;
            int64 units = 2;
        }",
    ),
    (
        "common/all.proto",
        "syntax = \"proto3\";
        package shop.common;
        import public \"common/money.proto\";

        enum Status {
            STATUS_UNKNOWN = 0;
            STATUS_OK = 1 [deprecated = true];
        }",
    ),
    (
        "shop.proto",
        "syntax = \"proto3\";
        package shop.api;
        import \"common/all.proto\";

        option java_package = \"com.example.shop\";

        // An order placed by a customer.
        message Order {
            message Line {
                string sku = 1;
                common.Money price = 2;
            }

            repeated Line lines = 1;
            map<string, common.Status> statuses = 2;
            oneof payment {
                string card = 3;
                string voucher = 4;
            }
            reserved 10 to 20;
        }

        service Orders {
            rpc Place (Order) returns (Order);
            rpc Watch (Order) returns (stream Order) { option deprecated = true; }
        }",
    ),
];

#[test]
fn module_graph() {
    let compiler = check(SHOP).unwrap();
    let module = compiler.module();

    let names: Vec<&str> = module.files().map(|file| file.file_name()).collect();
    similar_asserts::assert_eq!(
        names,
        vec!["common/money.proto", "common/all.proto", "shop.proto"]
    );

    let root: Vec<&str> = compiler.files().map(|file| file.file_name()).collect();
    assert_eq!(root, ["shop.proto"]);

    let all = module.file_by_name("common/all.proto").unwrap();
    assert_eq!(all.name(), "all");
    assert_eq!(all.syntax(), Syntax::Proto3);
    assert_eq!(all.package(), Some("shop.common"));
    assert_eq!(all.imports()[0].kind, ImportKind::Public);
    assert_eq!(
        all.imports()[0].file,
        Some(module.file_by_name("common/money.proto").unwrap().id())
    );

    let shop = module.file_by_name("shop.proto").unwrap();
    assert_eq!(
        shop.options().get("java_package"),
        Some(&OptionValue::String("com.example.shop".to_owned()))
    );
    assert!(module.context(shop.id()).is_initialized());
    assert!(module.context(shop.id()).conflicts().is_empty());
}

#[test]
fn resolved_types() {
    let compiler = check(SHOP).unwrap();
    let module = compiler.module();

    let order = module.get_message_by_name("shop.api.Order").unwrap();
    let line = module.get_message_by_name(".shop.api.Order.Line").unwrap();
    let money = module.get_message_by_name("shop.common.Money").unwrap();
    let status = module.get_enum_by_name("shop.common.Status").unwrap();

    assert_eq!(module[order].messages, [line]);
    assert_eq!(module[line].parent, Parent::Message(order));
    assert!(module[line].nested);
    assert!(module[order]
        .comments
        .as_deref()
        .unwrap()
        .contains("An order placed by a customer."));

    let price = module[line].get_field_by_name("price").unwrap();
    assert_eq!(price.ty, Some(Type::Message(money)));

    let lines = module[order].get_field(1).unwrap();
    assert_eq!(lines.label, Label::Repeated);
    assert_eq!(lines.ty, Some(Type::Message(line)));

    match &module[order].get_field_by_name("statuses").unwrap().ty {
        Some(Type::Map(map)) => {
            assert_eq!(map.key, ScalarType::String);
            assert_eq!(map.value, Type::Enum(status));
        }
        ty => panic!("unexpected type {:?}", ty),
    }

    let oneof_fields: Vec<&str> = module[order]
        .fields
        .iter()
        .filter(|field| field.oneof == Some(0))
        .map(|field| field.name.as_str())
        .collect();
    assert_eq!(module[order].oneofs[0].name, "payment");
    assert_eq!(oneof_fields, ["card", "voucher"]);

    assert!(module[status].values[1].options.deprecated());
    assert_eq!(module[status].location.line, 5);
}

#[test]
fn service_methods() {
    let compiler = check(SHOP).unwrap();
    let module = compiler.module();

    let orders = module.get_service_by_name("shop.api.Orders").unwrap();
    let order = module.get_message_by_name("shop.api.Order").unwrap();
    let service = &module[orders];

    assert_eq!(service.full_name, ".shop.api.Orders");
    assert_eq!(service.methods.len(), 2);

    let place = &service.methods[0];
    assert_eq!(place.input, Some(order));
    assert_eq!(place.output, Some(order));
    assert!(!place.client_streaming && !place.server_streaming);

    let watch = &service.methods[1];
    assert_eq!(watch.output_type, "Order");
    assert!(watch.server_streaming);
    assert!(watch.options.deprecated());

    let shop = module.file_by_name("shop.proto").unwrap().id();
    assert_eq!(
        module.resolve(shop, ".shop.api.Orders"),
        Some(UserType::Service(orders))
    );
}

#[test]
fn method_returning_enum() {
    let err = check(&[(
        "root.proto",
        "enum Status { OK = 0; }
        message Request {}
        service S { rpc Call (Request) returns (Status); }",
    )])
    .unwrap_err();

    assert_eq!(err.to_string(), "method output type 'Status' is not a message");
    assert_eq!(err.location().unwrap().line, 3);
}

#[test]
fn field_of_service_type() {
    let err = check(&[(
        "root.proto",
        "service S {}
        message M { optional S s = 1; }",
    )])
    .unwrap_err();

    assert_eq!(
        err.to_string(),
        "'S' is a service, which cannot be used as a field type"
    );
}

#[test]
fn include_imports() {
    let mut compiler = Compiler::with_file_resolver(TestFileResolver {
        files: &[("dep.proto", ""), ("root.proto", "import 'dep.proto';")],
    });

    compiler.include_imports(true);
    compiler.open_file("root.proto").unwrap();

    let files: Vec<&str> = compiler.files().map(|file| file.file_name()).collect();
    assert_eq!(files, ["dep.proto", "root.proto"]);
}

#[test]
fn reopening_an_import_marks_it_as_root() {
    let mut compiler = Compiler::with_file_resolver(TestFileResolver {
        files: &[("dep.proto", ""), ("root.proto", "import 'dep.proto';")],
    });

    compiler.open_file("root.proto").unwrap();
    compiler.open_file("dep.proto").unwrap();

    let files: Vec<&str> = compiler.files().map(|file| file.file_name()).collect();
    assert_eq!(files, ["dep.proto", "root.proto"]);
    assert_eq!(compiler.module().len(), 2);
}

#[test]
fn later_declarations_replace_earlier_ones() {
    let compiler = check(&[
        ("a.proto", "package pkg; message Dup { optional int32 a = 1; }"),
        (
            "b.proto",
            "import 'a.proto'; package pkg; message Dup { optional int32 b = 1; }",
        ),
    ])
    .unwrap();
    let module = compiler.module();

    let dup = module.get_message_by_name("pkg.Dup").unwrap();
    assert_eq!(module[dup].fields[0].name, "b");

    let b = module.file_by_name("b.proto").unwrap().id();
    let conflicts = module.context(b).conflicts();
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].name, ".pkg.Dup");
    assert_eq!(conflicts[0].current, UserType::Message(dup));
}
