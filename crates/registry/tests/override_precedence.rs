use std::path::Path;

use spl_registry::{ActionResolver, ModuleOrigin};

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().expect("parent")).expect("create parent");
    std::fs::write(path, content).expect("write file");
}

#[test]
fn application_override_is_selected_over_global_module() {
    let temp_dir = tempfile::tempdir().expect("tempdir");
    let root = temp_dir.path();
    write(root, "modules/usr/x/index.json", r#"{"handler": "usr/x:global"}"#);
    write(root, "apps/usr/modules/x/index.json", r#"{"handler": "usr/x:override"}"#);

    let resolver = ActionResolver::scan(root).expect("scan");
    let module = resolver.resolve_module("usr/x").expect("resolve").expect("module");

    assert_eq!(module.origin, ModuleOrigin::Override { app: "usr".into() });
    assert_eq!(module.path, root.join("apps/usr/modules/x/index.json"));
}

#[test]
fn removing_the_override_falls_back_to_global_module() {
    let temp_dir = tempfile::tempdir().expect("tempdir");
    let root = temp_dir.path();
    write(root, "modules/usr/x/index.json", r#"{"handler": "usr/x:global"}"#);
    std::fs::create_dir_all(root.join("apps/usr/modules")).expect("empty override tree");

    let resolver = ActionResolver::scan(root).expect("scan");
    let module = resolver.resolve_module("usr/x").expect("resolve").expect("module");

    assert_eq!(module.origin, ModuleOrigin::Global);
    assert_eq!(module.path, root.join("modules/usr/x/index.json"));
}

#[test]
fn unknown_uri_has_no_module_and_no_schema() {
    let temp_dir = tempfile::tempdir().expect("tempdir");
    let resolver = ActionResolver::scan(temp_dir.path()).expect("scan");

    assert!(resolver.resolve_module("usr/missing").expect("resolve").is_none());
    let error = resolver.load_schema("usr/missing").expect_err("no schema");
    assert_eq!(error.code(), "ERESOLVE");
}
