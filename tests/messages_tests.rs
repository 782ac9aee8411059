//! Diagnostics Integration Tests
//!
//! Tests for:
//! - Warnings delivered over the message channel
//! - Unknown options, attributes and commands
//! - Custom attributes clashing with built-in parameters
//! - Light linking roles

use std::any::Any;

use flume::Receiver;
use prism::render::{LightHandle, ObjectHandle, ParamValue};
use prism::scene::{MeshPrimitive, Shader};
use prism::{
    CompoundData, Dictionary, Message, MessageHandler, ObjectInterface, ObjectInterfacePtr, Renderer,
    RendererSettings, SceneRenderer, Severity, ShaderNetwork, Value,
};

fn renderer() -> (Renderer, Receiver<Message>) {
    let _ = env_logger::builder().is_test(true).try_init();
    let (messages, rx) = MessageHandler::with_channel();
    let renderer = Renderer::new(RendererSettings {
        messages,
        ..Default::default()
    })
    .unwrap();
    (renderer, rx)
}

fn warnings(rx: &Receiver<Message>) -> Vec<String> {
    rx.try_iter()
        .filter(|m| m.severity == Severity::Warning)
        .map(|m| m.text)
        .collect()
}

fn object_handle(object: &ObjectInterfacePtr) -> &ObjectHandle {
    let any: &dyn Any = &**object;
    any.downcast_ref::<ObjectHandle>().unwrap()
}

fn light_handle(object: &ObjectInterfacePtr) -> &LightHandle {
    let any: &dyn Any = &**object;
    any.downcast_ref::<LightHandle>().unwrap()
}

// ============================================================================
// Options and commands
// ============================================================================

#[test]
fn unknown_options_warn() {
    let (r, rx) = renderer();
    r.option("prism:bogus", Some(&Value::from(1)));
    r.option("cycles:samples", Some(&Value::from(16)));

    let warnings = warnings(&rx);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("prism:bogus"));
}

#[test]
fn mistyped_options_warn_and_keep_their_value() {
    let (r, rx) = renderer();
    r.option("prism:AA_samples", Some(&Value::from(4)));
    r.option("prism:AA_samples", Some(&Value::from("many")));

    let warnings = warnings(&rx);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("AA_samples"));
    let options = r.globals().options();
    assert_eq!(r.universe().param(options, "AA_samples"), Some(ParamValue::Int(4)));
}

#[test]
fn unknown_commands_warn() {
    let (r, rx) = renderer();
    assert_eq!(r.command("prism:defragment", &CompoundData::new()), None);
    let warnings = warnings(&rx);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("prism:defragment"));
}

// ============================================================================
// Attributes
// ============================================================================

#[test]
fn unknown_attributes_warn_once_per_bundle() {
    let (r, rx) = renderer();
    let _attrs = r.attributes(
        &Dictionary::new()
            .with("prism:visibility:telepathy", Value::from(false))
            .with("prism:matte", Value::from(true))
            .with("renderman:shadingRate", Value::from(1.0f32)),
    );

    let warnings = warnings(&rx);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("prism:visibility:telepathy"));
}

#[test]
fn custom_attribute_clashing_with_a_builtin_is_ignored() {
    let (r, rx) = renderer();
    let attrs = r.attributes(
        &Dictionary::new()
            .with("user:matte", Value::from("yes"))
            .with("user:shot", Value::from("sh010")),
    );
    let object = r.object("/plane", &MeshPrimitive::plane().into(), &attrs).unwrap();

    let warnings = warnings(&rx);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("\"matte\""));

    let u = r.universe();
    let node = object_handle(&object).node();
    assert_eq!(u.param(node, "matte"), Some(ParamValue::Bool(false)));
    assert_eq!(u.param(node, "shot"), Some(ParamValue::from("sh010")));
}

// ============================================================================
// Light linking
// ============================================================================

#[test]
fn light_links_set_and_clear_groups() {
    let (r, rx) = renderer();
    let point = ShaderNetwork::single("l", Shader::new("point_light", "light"));
    let light = r
        .light("/key", None, &r.attributes(&Dictionary::new().with("prism:light", point)))
        .unwrap();
    let object = r
        .object("/plane", &MeshPrimitive::plane().into(), &r.attributes(&Dictionary::new()))
        .unwrap();
    let node = object_handle(&object).node();
    let root = light_handle(&light).root();

    object.link("lights", Some(&vec![light.clone()]));
    object.link("shadowedLights", Some(&Vec::new()));

    let u = r.universe();
    assert_eq!(u.param(node, "use_light_group"), Some(ParamValue::Bool(true)));
    assert_eq!(u.param(node, "light_group"), Some(ParamValue::nodes(vec![root])));
    assert_eq!(u.param(node, "use_shadow_group"), Some(ParamValue::Bool(true)));
    assert_eq!(u.param(node, "shadow_group"), Some(ParamValue::nodes(Vec::new())));

    object.link("lights", None);
    assert_eq!(u.param(node, "use_light_group"), Some(ParamValue::Bool(false)));
    assert!(!u.is_set(node, "light_group"));

    object.link("reflections", None);
    let warnings = warnings(&rx);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("reflections"));
}
