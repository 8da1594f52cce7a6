use std::collections::BTreeMap;

use crate::command::{
    contains_placeholder, INPUT_PLACEHOLDER, OUTPUT_PLACEHOLDER, WALLPAPER_PLACEHOLDER,
};
use crate::error::ValidationError;

/// Named effect command templates plus the optional default effect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EffectRegistry {
    default: Option<String>,
    effects: BTreeMap<String, Vec<String>>,
}

impl EffectRegistry {
    /// Builds a registry, rejecting templates without `%i`/`%o` and an unknown default.
    pub fn new(
        effects: BTreeMap<String, Vec<String>>,
        default: Option<String>,
    ) -> Result<Self, ValidationError> {
        for (name, template) in &effects {
            validate_effect(name, template)?;
        }
        if let Some(name) = &default {
            if !effects.contains_key(name) {
                return Err(ValidationError::UnknownEffect { name: name.clone() });
            }
        }
        Ok(Self { default, effects })
    }

    pub fn default_effect(&self) -> Option<&str> {
        self.default.as_deref()
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.effects.get(name).map(Vec::as_slice)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.effects.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.effects.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.effects
            .iter()
            .map(|(name, template)| (name.as_str(), template.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }
}

pub fn validate_effect(name: &str, template: &[String]) -> Result<(), ValidationError> {
    let context = format!("effect {}", name);
    if template.is_empty() {
        return Err(ValidationError::EmptyCommand { context });
    }
    for placeholder in [INPUT_PLACEHOLDER, OUTPUT_PLACEHOLDER] {
        if !contains_placeholder(template, placeholder) {
            return Err(ValidationError::MissingPlaceholder {
                context,
                placeholder,
            });
        }
    }
    Ok(())
}

/// One step run when a wallpaper is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetRule {
    pub command: Vec<String>,
    pub effect: Option<String>,
    pub pkill: Option<String>,
}

impl SetRule {
    /// The rule's override, else the registry default.
    pub fn effective_effect<'a>(&'a self, registry: &'a EffectRegistry) -> Option<&'a str> {
        self.effect.as_deref().or_else(|| registry.default_effect())
    }

    pub fn validate(&self, index: usize, registry: &EffectRegistry) -> Result<(), ValidationError> {
        let context = format!("set rule {}", index);
        if self.command.is_empty() {
            return Err(ValidationError::EmptyCommand { context });
        }
        if !contains_placeholder(&self.command, WALLPAPER_PLACEHOLDER) {
            return Err(ValidationError::MissingPlaceholder {
                context,
                placeholder: WALLPAPER_PLACEHOLDER,
            });
        }
        if let Some(name) = &self.effect {
            if !registry.contains(name) {
                return Err(ValidationError::UnknownEffect { name: name.clone() });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    fn registry() -> EffectRegistry {
        let mut effects = BTreeMap::new();
        effects.insert("blur".to_string(), tokens(&["convert", "%i", "-blur", "0x8", "%o"]));
        effects.insert("dim".to_string(), tokens(&["convert", "%i", "-brightness-contrast", "-30", "%o"]));
        EffectRegistry::new(effects, Some("blur".to_string())).unwrap()
    }

    #[test]
    fn test_effect_requires_both_placeholders() {
        assert!(validate_effect("blur", &tokens(&["convert", "%i", "%o"])).is_ok());

        match validate_effect("blur", &tokens(&["convert", "%i", "out.jpg"])) {
            Err(ValidationError::MissingPlaceholder { placeholder, .. }) => assert_eq!(placeholder, "%o"),
            other => panic!("Expected missing %o, got {:?}", other),
        }
        match validate_effect("blur", &tokens(&["convert", "in.jpg", "%o"])) {
            Err(ValidationError::MissingPlaceholder { placeholder, .. }) => assert_eq!(placeholder, "%i"),
            other => panic!("Expected missing %i, got {:?}", other),
        }
        assert!(matches!(
            validate_effect("blur", &[]),
            Err(ValidationError::EmptyCommand { .. })
        ));
    }

    #[test]
    fn test_registry_rejects_unknown_default() {
        let mut effects = BTreeMap::new();
        effects.insert("blur".to_string(), tokens(&["convert", "%i", "%o"]));

        let result = EffectRegistry::new(effects, Some("sepia".to_string()));
        assert!(matches!(result, Err(ValidationError::UnknownEffect { ref name }) if name == "sepia"));
    }

    #[test]
    fn test_effective_effect() {
        let registry = registry();
        let plain = SetRule {
            command: tokens(&["feh", "--bg-fill", "%w"]),
            effect: None,
            pkill: None,
        };
        let overridden = SetRule {
            effect: Some("dim".to_string()),
            ..plain.clone()
        };

        assert_eq!(plain.effective_effect(&registry), Some("blur"));
        assert_eq!(overridden.effective_effect(&registry), Some("dim"));
        assert_eq!(plain.effective_effect(&EffectRegistry::default()), None);
    }

    #[test]
    fn test_set_rule_validation() {
        let registry = registry();
        let rule = SetRule {
            command: tokens(&["feh", "--bg-fill", "%w"]),
            effect: Some("dim".to_string()),
            pkill: Some("feh".to_string()),
        };
        assert!(rule.validate(0, &registry).is_ok());

        let missing = SetRule {
            command: tokens(&["feh", "--bg-fill", "wall.jpg"]),
            ..rule.clone()
        };
        assert!(matches!(
            missing.validate(0, &registry),
            Err(ValidationError::MissingPlaceholder { placeholder: "%w", .. })
        ));

        let unknown = SetRule {
            effect: Some("sepia".to_string()),
            ..rule
        };
        assert!(matches!(
            unknown.validate(1, &registry),
            Err(ValidationError::UnknownEffect { .. })
        ));
    }
}
