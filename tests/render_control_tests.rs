//! Render Control Integration Tests
//!
//! Tests for:
//! - Batch mode: one render invocation per output camera
//! - Interactive mode: interrupt-then-restart, blocking pause
//! - Scene description mode: JSON dump of the native scene
//! - Render error mapping and commands

use std::sync::Arc;

use glam::Vec2;
use prism::render::{DriverMode, InterruptMode, Registry, RenderStatus};
use prism::scene::MeshPrimitive;
use prism::{
    CameraData, CompoundData, Data, Dictionary, Output, PrismError, RecordingDriver, RenderDriver, RenderError,
    RenderMode, RenderState, Renderer, RendererSettings, SceneRenderer, Value,
};

fn renderer(settings: RendererSettings) -> (Renderer, Arc<RecordingDriver>) {
    let driver = Arc::new(RecordingDriver::new());
    let renderer = Renderer::with_driver(settings, Registry::with_builtins(), driver.clone()).unwrap();
    (renderer, driver)
}

fn mode(mode: RenderMode) -> RendererSettings {
    RendererSettings {
        mode,
        ..Default::default()
    }
}

fn add_camera(r: &Renderer, name: &str, camera: &CameraData) -> prism::ObjectInterfacePtr {
    r.camera(name, camera, &r.attributes(&Dictionary::new())).unwrap()
}

// ============================================================================
// Batch
// ============================================================================

#[test]
fn batch_renders_once_per_output_camera() {
    let (r, driver) = renderer(mode(RenderMode::Batch));
    let _a = add_camera(&r, "camA", &CameraData::default().with_resolution(1920, 1080));
    let _b = add_camera(&r, "camB", &CameraData::default().with_resolution(320, 240));

    r.option("camera", Some(&Value::from("camA")));
    r.output("beauty", Some(&Output::new("beauty.exr", "exr", "rgba"))).unwrap();
    r.output(
        "witness",
        Some(&Output::new("witness.png", "png", "rgb").with_parameter("camera", "camB")),
    )
    .unwrap();
    r.render().unwrap();

    let invocations = driver.invocations();
    assert_eq!(invocations.len(), 2);

    assert_eq!(invocations[0].camera.as_deref(), Some("camA"));
    assert_eq!(invocations[0].resolution, (1920, 1080));
    assert_eq!(
        invocations[0].outputs,
        vec!["RGBA RGBA prism:filter:beauty prism:driver:beauty"]
    );

    assert_eq!(invocations[1].camera.as_deref(), Some("camB"));
    assert_eq!(invocations[1].resolution, (320, 240));
    assert_eq!(
        invocations[1].outputs,
        vec!["RGB RGB prism:filter:witness prism:driver:witness"]
    );
    assert!(invocations.iter().all(|i| i.mode == DriverMode::Batch));
    assert_eq!(r.render_state(), RenderState::Finished);
}

#[test]
fn crop_window_becomes_a_render_region() {
    let (r, driver) = renderer(mode(RenderMode::Batch));
    let camera = CameraData::default()
        .with_resolution(100, 100)
        .with_crop_window(Vec2::new(0.25, 0.5), Vec2::new(0.75, 1.0));
    let _cam = add_camera(&r, "crop", &camera);
    r.option("camera", Some(&Value::from("crop")));
    r.output("beauty", Some(&Output::new("beauty.exr", "exr", "rgba"))).unwrap();
    r.render().unwrap();

    assert_eq!(driver.invocations()[0].region, Some([25, 50, 74, 99]));
}

#[test]
fn selecting_a_missing_camera_fails() {
    let (r, driver) = renderer(mode(RenderMode::Batch));
    r.option("camera", Some(&Value::from("ghost")));
    r.output("beauty", Some(&Output::new("beauty.exr", "exr", "rgba"))).unwrap();

    assert!(matches!(
        r.render(),
        Err(PrismError::Render(RenderError::NoCamera(name))) if name == "ghost"
    ));
    assert!(driver.invocations().is_empty());
}

#[test]
fn released_cameras_cannot_be_selected() {
    let (r, _) = renderer(mode(RenderMode::Batch));
    let camera = add_camera(&r, "temp", &CameraData::default());
    drop(camera);
    r.option("camera", Some(&Value::from("temp")));
    r.output("beauty", Some(&Output::new("beauty.exr", "exr", "rgba"))).unwrap();
    assert!(matches!(r.render(), Err(PrismError::Render(RenderError::NoCamera(_)))));
}

#[test]
fn renderer_statuses_become_errors() {
    let (r, driver) = renderer(mode(RenderMode::Batch));
    r.output("beauty", Some(&Output::new("beauty.exr", "exr", "rgba"))).unwrap();

    driver.fail_next(RenderStatus::Interrupted);
    assert!(matches!(r.render(), Err(PrismError::Render(RenderError::Interrupted))));
    driver.fail_next(RenderStatus::Failed("out of memory".into()));
    assert!(matches!(
        r.render(),
        Err(PrismError::Render(RenderError::Failed(text))) if text == "out of memory"
    ));
    r.render().unwrap();
}

#[test]
fn invalid_outputs_are_errors() {
    let (r, _) = renderer(mode(RenderMode::Batch));
    assert!(matches!(
        r.output("o", Some(&Output::new("o.xyz", "xyz", "rgba"))),
        Err(PrismError::UnknownDriver { .. })
    ));
    assert!(matches!(
        r.output("o", Some(&Output::new("o.exr", "exr", "mystery"))),
        Err(PrismError::InvalidOutputData { .. })
    ));
}

#[test]
fn light_path_expression_outputs() {
    let (r, _) = renderer(mode(RenderMode::Batch));
    r.output("diffuse", Some(&Output::new("diffuse.exr", "exr", "lpe C<RD>.*L"))).unwrap();
    r.render().unwrap();

    let u = r.universe();
    let options = r.globals().options();
    let lpes = u.param(options, "light_path_expressions").unwrap();
    assert_eq!(lpes.elements()[0].as_str(), Some("diffuse C<RD>.*L"));
    let outputs = u.param(options, "outputs").unwrap();
    assert_eq!(
        outputs.elements()[0].as_str(),
        Some("diffuse RGB prism:filter:diffuse prism:driver:diffuse")
    );
}

// ============================================================================
// Interactive
// ============================================================================

#[test]
fn interactive_render_restarts_after_interrupt() {
    let (r, driver) = renderer(mode(RenderMode::Interactive));
    r.output("beauty", Some(&Output::new("beauty.exr", "exr", "rgba"))).unwrap();

    r.render().unwrap();
    assert!(driver.is_rendering());
    assert_eq!(r.render_state(), RenderState::Rendering);
    assert!(driver.interrupts().is_empty());

    r.render().unwrap();
    assert_eq!(driver.interrupts(), vec![InterruptMode::Blocking]);

    let modes: Vec<_> = driver.invocations().iter().map(|i| i.mode).collect();
    assert_eq!(
        modes,
        vec![
            DriverMode::Interactive { preserve_samples: false },
            DriverMode::Interactive { preserve_samples: true },
        ]
    );
}

#[test]
fn pause_is_a_blocking_interrupt_and_render_resumes() {
    let (r, driver) = renderer(mode(RenderMode::Interactive));
    r.output("beauty", Some(&Output::new("beauty.exr", "exr", "rgba"))).unwrap();
    r.render().unwrap();

    r.pause();
    assert_eq!(driver.interrupts(), vec![InterruptMode::Blocking]);
    assert_eq!(r.render_state(), RenderState::Paused);

    // Already stopped: nothing to interrupt, but the samples carry over.
    r.render().unwrap();
    assert_eq!(driver.interrupts().len(), 1);
    assert_eq!(r.render_state(), RenderState::Rendering);

    let modes: Vec<_> = driver.invocations().iter().map(|i| i.mode).collect();
    assert_eq!(
        modes,
        vec![
            DriverMode::Interactive { preserve_samples: false },
            DriverMode::Interactive { preserve_samples: true },
        ]
    );
}

#[test]
fn interactive_nodes_are_destroyed_with_their_handles() {
    let (r, _) = renderer(mode(RenderMode::Interactive));
    let before = r.universe().node_count();
    let attrs = r.attributes(&Dictionary::new());
    let object = r.object("/plane", &MeshPrimitive::plane().into(), &attrs).unwrap();
    assert!(r.universe().node_count() > before);

    drop(object);
    r.command("prism:clearUnused", &CompoundData::new()).unwrap();
    assert_eq!(r.universe().node_count(), before);
}

#[test]
fn dropping_an_interactive_renderer_stops_the_session() {
    let (r, driver) = renderer(mode(RenderMode::Interactive));
    r.output("beauty", Some(&Output::new("beauty.exr", "exr", "rgba"))).unwrap();
    r.render().unwrap();
    let universe = r.universe().clone();

    drop(r);
    assert_eq!(driver.interrupts(), vec![InterruptMode::Blocking]);
    assert_eq!(universe.node_count(), 0);
}

// ============================================================================
// Scene description
// ============================================================================

#[test]
fn scene_description_is_written_as_json() {
    let dir = std::env::temp_dir().join(format!("prism-scene-{}", std::process::id()));
    let path = dir.join("nested").join("scene.json");
    let (r, driver) = renderer(RendererSettings {
        mode: RenderMode::SceneDescription,
        file_name: Some(path.clone()),
        ..Default::default()
    });
    let attrs = r.attributes(&Dictionary::new());
    let _plane = r.object("/plane", &MeshPrimitive::plane().into(), &attrs).unwrap();
    r.output("beauty", Some(&Output::new("beauty.exr", "exr", "rgba"))).unwrap();
    r.render().unwrap();

    assert_eq!(driver.scenes(), vec![path.clone()]);
    assert!(driver.invocations().is_empty());
    let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let names: Vec<&str> = json["nodes"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|n| n["name"].as_str())
        .collect();
    assert!(names.contains(&"/plane"));
    assert!(names.contains(&"options"));

    std::fs::remove_dir_all(&dir).ok();
}

// ============================================================================
// Commands
// ============================================================================

#[test]
fn cache_statistics() {
    let (r, _) = renderer(mode(RenderMode::Batch));
    let attrs = r.attributes(&Dictionary::new());
    let _a = r.object("/a", &MeshPrimitive::plane().into(), &attrs).unwrap();
    let _b = r.object("/b", &MeshPrimitive::plane().into(), &attrs).unwrap();

    let Some(Data::Compound(stats)) = r.command("prism:cacheStats", &CompoundData::new()) else {
        panic!("cacheStats should return a compound");
    };
    assert_eq!(stats.get_i32("instances", -1), 1);
    assert_eq!(
        r.command("prism:nodeCount", &CompoundData::new()),
        Some(Data::Int(r.universe().node_count() as i32))
    );
}

#[test]
fn clear_unused_is_refused_while_rendering() {
    let (r, _) = renderer(mode(RenderMode::Interactive));
    r.output("beauty", Some(&Output::new("beauty.exr", "exr", "rgba"))).unwrap();
    r.render().unwrap();
    assert_eq!(r.command("prism:clearUnused", &CompoundData::new()), None);
    r.pause();
    assert!(r.command("prism:clearUnused", &CompoundData::new()).is_some());
}
