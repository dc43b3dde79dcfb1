use serde_json::json;
use spl_engine::parser::{
    CommandParser, ParseStatus, ParserOptions, ResolverSchemas, to_command_line, to_command_tokens,
};
use spl_registry::ActionResolver;
use spl_types::PipelineDescriptor;

const SCHEMA: &str = r#"[
    {"name": "file", "alias": "f", "type": "String"},
    {"name": "count", "type": "Number"},
    {"name": "tag", "type": "String", "multiple": true},
    {"name": "force", "type": "Boolean"},
    {"name": "id", "type": "BigInt"}
]"#;

fn resolver(root: &std::path::Path) -> ActionResolver {
    for uri in ["ns/read", "ns/write"] {
        let dir = root.join("modules").join(uri);
        std::fs::create_dir_all(&dir).expect("module dir");
        let name = uri.rsplit('/').next().expect("last segment");
        std::fs::write(dir.join(format!("{name}_arguments.json")), SCHEMA).expect("schema");
    }
    ActionResolver::scan(root).expect("scan")
}

#[test]
fn serialized_descriptors_parse_back_unchanged() {
    let temp_dir = tempfile::tempdir().expect("tempdir");
    let resolver = resolver(temp_dir.path());
    let schema = resolver.load_schema("ns/read").expect("schema");

    let descriptors = vec![
        PipelineDescriptor::new("ns/read")
            .with_param("file", json!("two words"))
            .with_param("count", json!(3))
            .with_param("tag", json!(["-dash", "_!_", "say \"hi\""]))
            .with_param("force", json!(true))
            .with_param("id", json!("170141183460469231731687303715884105727"))
            .with_ttl(7),
        PipelineDescriptor::new("ns/write").with_param("count", json!(2.5)),
        PipelineDescriptor::new("ns/read"),
    ];

    let groups: Vec<Vec<String>> = descriptors
        .iter()
        .map(|descriptor| to_command_tokens(descriptor, &schema))
        .collect();
    let line = to_command_line(&groups);

    let parser = CommandParser::new(ParserOptions::default());
    let ParseStatus::Parsed(outcome) = parser.parse_line(&line, &mut ResolverSchemas::new(&resolver)) else {
        panic!("direct schema source never suspends");
    };

    assert!(outcome.failures.is_empty(), "failures: {:?}", outcome.failures);
    assert_eq!(outcome.pipeline, descriptors);
}

#[test]
fn boolean_false_round_trips_explicitly() {
    let temp_dir = tempfile::tempdir().expect("tempdir");
    let resolver = resolver(temp_dir.path());
    let schema = resolver.load_schema("ns/read").expect("schema");

    let descriptor = PipelineDescriptor::new("ns/read").with_param("force", json!(false));
    let tokens = to_command_tokens(&descriptor, &schema);
    assert_eq!(tokens, vec!["ns/read", "--force=false"]);

    let parser = CommandParser::new(ParserOptions::default());
    let ParseStatus::Parsed(outcome) = parser.parse_groups(&[tokens], &mut ResolverSchemas::new(&resolver)) else {
        panic!("direct schema source never suspends");
    };
    assert_eq!(outcome.pipeline, vec![descriptor]);
}
