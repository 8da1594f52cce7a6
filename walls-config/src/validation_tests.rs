use crate::*;

fn field_of(result: Result<Config>) -> (String, ValidationError) {
    match result {
        Err(WallsError::Config(ConfigError::Validation { field, source })) => (field, source),
        other => panic!("Expected a validation error, got {:?}", other),
    }
}

#[test]
fn test_effect_without_output_placeholder() {
    let config_content = r#"
        [effects]
        blur = ["convert", "%i", "-blur", "0x8", "out.jpg"]
    "#;

    let (field, source) = field_of(Config::parse(config_content));
    assert_eq!(field, "effects");
    assert!(matches!(
        source,
        ValidationError::MissingPlaceholder { placeholder: "%o", .. }
    ));
}

#[test]
fn test_effect_without_input_placeholder() {
    let config_content = r#"
        [effects]
        blur = ["convert", "in.jpg", "%o"]
    "#;

    let (_, source) = field_of(Config::parse(config_content));
    assert!(matches!(
        source,
        ValidationError::MissingPlaceholder { placeholder: "%i", .. }
    ));
}

#[test]
fn test_empty_effect_command() {
    let config_content = r#"
        [effects]
        blur = []
    "#;

    let (_, source) = field_of(Config::parse(config_content));
    assert!(matches!(source, ValidationError::EmptyCommand { .. }));
}

#[test]
fn test_unknown_default_effect() {
    let config_content = r#"
        [effects]
        default = "sepia"
        blur = ["convert", "%i", "%o"]
    "#;

    let (field, source) = field_of(Config::parse(config_content));
    assert_eq!(field, "effects");
    assert!(matches!(source, ValidationError::UnknownEffect { ref name } if name == "sepia"));
}

#[test]
fn test_set_rule_without_wallpaper_placeholder() {
    let config_content = r#"
        [[behavior.set]]
        command = ["swaybg", "-i", "/tmp/wall.jpg"]
    "#;

    let (field, source) = field_of(Config::parse(config_content));
    assert_eq!(field, "behavior.set[0]");
    assert!(matches!(
        source,
        ValidationError::MissingPlaceholder { placeholder: "%w", .. }
    ));
}

#[test]
fn test_set_rule_with_unknown_effect() {
    let config_content = r#"
        [effects]
        blur = ["convert", "%i", "%o"]

        [[behavior.set]]
        command = ["swaybg", "-i", "%w"]

        [[behavior.set]]
        command = ["feh", "--bg-fill", "%w"]
        effect = "dim"
    "#;

    let (field, source) = field_of(Config::parse(config_content));
    assert_eq!(field, "behavior.set[1]");
    assert!(matches!(source, ValidationError::UnknownEffect { ref name } if name == "dim"));
}

#[test]
fn test_placeholder_must_be_a_whole_token() {
    let config_content = r#"
        [[behavior.set]]
        command = ["feh", "--bg-fill=%w"]
    "#;

    let (_, source) = field_of(Config::parse(config_content));
    assert!(matches!(source, ValidationError::MissingPlaceholder { .. }));
}

#[test]
fn test_set_rule_requires_command() {
    let config_content = r#"
        [[behavior.set]]
        pkill = "swaybg"
    "#;

    assert!(matches!(
        Config::parse(config_content),
        Err(WallsError::Config(ConfigError::TomlParse { .. }))
    ));
}
