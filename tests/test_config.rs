extern crate bvr_anchor_head;

use bvr_anchor_head::common::{HeadConfig, HeadOptions};


use mock_template::{DIR_CFG, SINGLE_ANCHOR_CFG};

#[test]
fn parses_anchor_generators_and_defaults() {
    let cfg = HeadConfig::from_json(SINGLE_ANCHOR_CFG).unwrap();

    assert_eq!(cfg.num_anchors_per_location(), vec![1]);
    assert_eq!(cfg.code_size(), 7);
    assert_eq!(cfg.num_dir_bins, 2);
    assert!(!cfg.use_direction_classifier());
    assert_eq!(cfg.cls_weight(), 1.0);
    assert_eq!(cfg.target_assigner_config.box_coder, "ResidualCoder");
    assert_eq!(cfg.anchor_generator_config[0].feature_map_stride, 1);
}

#[test]
fn counts_anchors_per_generator() {
    let cfg = HeadConfig::from_json(DIR_CFG).unwrap();

    assert_eq!(cfg.num_anchors_per_location(), vec![2, 2]);
    assert!(cfg.use_direction_classifier());
    assert_eq!(cfg.anchor_generator_config[0].feature_map_stride, 8);
    assert_eq!(cfg.anchor_generator_config[1].class_name, "Pedestrian");
}

#[test]
fn direction_classifier_follows_key_presence() {
    let json = r#"{
        "ANCHOR_GENERATOR_CONFIG": [
            {"class_name": "Car", "anchor_sizes": [[3.9, 1.6, 1.56]], "anchor_rotations": [0.0], "anchor_bottom_heights": [-1.78]}
        ],
        "USE_DIRECTION_CLASSIFIER": false
    }"#;
    let cfg = HeadConfig::from_json(json).unwrap();
    assert!(cfg.use_direction_classifier());
}

#[test]
fn sincos_angle_encoding_extends_code_size() {
    let json = r#"{
        "ANCHOR_GENERATOR_CONFIG": [
            {"class_name": "Car", "anchor_sizes": [[3.9, 1.6, 1.56]], "anchor_rotations": [0.0], "anchor_bottom_heights": [-1.78]}
        ],
        "TARGET_ASSIGNER_CONFIG": {
            "BOX_CODER": "ResidualCoder",
            "BOX_CODER_CONFIG": {"ENCODE_ANGLE_BY_SINCOS": true}
        }
    }"#;
    let cfg = HeadConfig::from_json(json).unwrap();
    assert_eq!(cfg.code_size(), 8);
}

#[test]
fn rejects_empty_anchor_generators() {
    let err = HeadConfig::from_json(r#"{"ANCHOR_GENERATOR_CONFIG": []}"#).unwrap_err();
    assert!(err.to_string().contains("ANCHOR_GENERATOR_CONFIG"));
}

#[test]
fn loss_weights_without_code_weights_use_defaults() {
    let json = r#"{
        "ANCHOR_GENERATOR_CONFIG": [
            {"class_name": "Car", "anchor_sizes": [[3.9, 1.6, 1.56]], "anchor_rotations": [0.0], "anchor_bottom_heights": [-1.78]}
        ],
        "LOSS_CONFIG": {"LOSS_WEIGHTS": {"cls_weight": 2.0}}
    }"#;
    let cfg = HeadConfig::from_json(json).unwrap();
    let defaults = HeadConfig::from_json(SINGLE_ANCHOR_CFG).unwrap();

    assert_eq!(cfg.cls_weight(), 2.0);
    assert_eq!(cfg.loss_config.loss_weights.code_weights, vec![1.0; 7]);
    assert_eq!(cfg.loss_config.loss_weights.code_weights, defaults.loss_config.loss_weights.code_weights);
}

#[test]
fn rejects_zero_direction_bins() {
    let json = r#"{
        "ANCHOR_GENERATOR_CONFIG": [
            {"class_name": "Car", "anchor_sizes": [[3.9, 1.6, 1.56]], "anchor_rotations": [0.0], "anchor_bottom_heights": [-1.78]}
        ],
        "USE_DIRECTION_CLASSIFIER": true,
        "NUM_DIR_BINS": 0
    }"#;
    assert!(HeadConfig::from_json(json).is_err());
}

#[test]
fn loads_config_from_file() {
    let path = std::env::temp_dir().join(format!("bvr_anchor_head_cfg_{}.json", std::process::id()));
    std::fs::write(&path, DIR_CFG).unwrap();

    let cfg = HeadConfig::from_file(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(cfg.num_anchors_per_location().iter().sum::<usize>(), 4);
    assert!(HeadConfig::from_file(&path).is_err());
}

#[test]
fn options_validation() {
    let cfg = HeadConfig::from_json(SINGLE_ANCHOR_CFG).unwrap();

    assert!(HeadOptions::new().with_input_channels(4).validate().is_err());

    let no_channels = HeadOptions::new()
        .with_model_cfg(cfg.clone())
        .with_class_names(&["a"], &["b"]);
    assert!(no_channels.validate().is_err());

    let no_type_classes = HeadOptions::new()
        .with_model_cfg(cfg.clone())
        .with_input_channels(4)
        .with_class_names(&["a"], &[]);
    assert!(no_type_classes.validate().is_err());

    let name_mismatch = HeadOptions::new()
        .with_model_cfg(cfg.clone())
        .with_input_channels(4)
        .with_class_names(&["a"], &["b"])
        .with_num_class([2, 1]);
    assert!(name_mismatch.validate().is_err());

    let ok = HeadOptions::new()
        .with_model_cfg(cfg)
        .with_input_channels(4)
        .with_class_names(&["a", "c"], &["b"]);
    assert!(ok.validate().is_ok());
    assert!(ok.predict_boxes_when_training);
}

#[test]
fn rejects_generators_without_anchors() {
    let json = r#"{
        "ANCHOR_GENERATOR_CONFIG": [
            {"class_name": "Car", "anchor_sizes": [], "anchor_rotations": [0.0], "anchor_bottom_heights": [-1.78]}
        ]
    }"#;
    let options = HeadOptions::new()
        .with_model_cfg(HeadConfig::from_json(json).unwrap())
        .with_input_channels(4)
        .with_class_names(&["Car"], &["moving"]);
    let err = options.validate().unwrap_err();
    assert!(err.to_string().contains("no anchors"));
}
