use flow_ar::{
    config::{ArConfig, DEFAULT_MODEL_URL},
    xr::ReferenceSpaceType,
};

#[test]
fn empty_document_yields_the_defaults() {
    let config = ArConfig::from_toml_str("").unwrap();

    assert_eq!(config.model_url, DEFAULT_MODEL_URL);
    assert_eq!(config.target_height, 1.0);
    assert_eq!(config.opacity, 0.5);
    assert_eq!(config.camera.fov_y_deg, 70.0);
    assert_eq!(config.camera.near, 0.01);
    assert_eq!(config.camera.far, 20.0);
    assert_eq!(config.light.sky, 0xffffff);
    assert_eq!(config.light.ground, 0xbbbbff);
    assert_eq!(config.light.intensity, 1.0);
    assert_eq!(config.session.required_features, vec!["hit-test"]);
    assert_eq!(config.session.optional_features, vec!["dom-overlay"]);
    assert_eq!(config.session.dom_overlay_root.as_deref(), Some("body"));
    assert_eq!(config.session.reference_space, ReferenceSpaceType::LocalFloor);
    assert_eq!(config.emulation.eye_height, 1.6);
}

#[test]
fn partial_document_overrides_only_what_it_names() {
    let config = ArConfig::from_toml_str(
        r#"
        model_url = "models/chair.glb"
        opacity = 0.8

        [session]
        reference_space = "local"
        optional_features = []

        [emulation]
        floor_height = -0.5
        "#,
    )
    .unwrap();

    assert_eq!(config.model_url, "models/chair.glb");
    assert_eq!(config.opacity, 0.8);
    assert_eq!(config.target_height, 1.0);
    assert_eq!(config.session.reference_space, ReferenceSpaceType::Local);
    assert!(config.session.optional_features.is_empty());
    assert_eq!(config.session.required_features, vec!["hit-test"]);
    assert_eq!(config.emulation.floor_height, -0.5);
    assert_eq!(config.emulation.eye_height, 1.6);
}

#[test]
fn session_init_mirrors_the_session_settings() {
    let config = ArConfig::default();
    let init = config.session.to_session_init();

    assert_eq!(init.required_features, vec!["hit-test"]);
    assert_eq!(init.optional_features, vec!["dom-overlay"]);
    assert_eq!(init.dom_overlay_root.as_deref(), Some("body"));
}

#[test]
fn malformed_documents_are_rejected() {
    assert!(ArConfig::from_toml_str("opacity = \"half\"").is_err());
    assert!(ArConfig::from_toml_str("[session]\nreference_space = \"sideways\"").is_err());
}
