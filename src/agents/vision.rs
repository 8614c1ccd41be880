//! Vision stage trigger
//!
//! The vision agent runs only for visual tasks: an image reference was
//! supplied, or the task mentions a visual-design keyword as a whole word.

use regex::Regex;

use crate::types::{Result, SwarmError};

const VISUAL_KEYWORDS: &[&str] = &[
    "sketch",
    "mockup",
    "screenshot",
    "image",
    "picture",
    "design",
    "figma",
    "wireframe",
    "ui",
    "layout",
    "photo",
    "drawing",
    "diagram",
];

/// Decides whether the vision stage should run
#[derive(Debug, Clone)]
pub struct VisionTrigger {
    pattern: Regex,
}

impl VisionTrigger {
    pub fn new() -> Result<Self> {
        let pattern = format!(r"(?i)\b(?:{})\b", VISUAL_KEYWORDS.join("|"));
        let pattern = Regex::new(&pattern)
            .map_err(|e| SwarmError::Config(format!("invalid vision keyword pattern: {}", e)))?;
        Ok(Self { pattern })
    }

    /// First visual keyword found in the task, if any
    pub fn matched_keyword<'a>(&self, task: &'a str) -> Option<&'a str> {
        self.pattern.find(task).map(|m| m.as_str())
    }

    pub fn should_run(&self, task: &str, image: Option<&str>) -> bool {
        image.is_some_and(|i| !i.trim().is_empty()) || self.matched_keyword(task).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords_match_whole_words() {
        let trigger = VisionTrigger::new().unwrap();
        assert!(trigger.should_run("Build a UI from this Figma file", None));
        assert_eq!(trigger.matched_keyword("turn my sketch into code"), Some("sketch"));

        // "build" contains "ui" and "redesigned" contains "design"
        assert!(!trigger.should_run("build a REST API", None));
        assert!(!trigger.should_run("a redesigned parser", None));
    }

    #[test]
    fn test_image_reference_forces_vision() {
        let trigger = VisionTrigger::new().unwrap();
        assert!(trigger.should_run("create a login page", Some("mockup.png")));
        assert!(!trigger.should_run("create a login page", Some("  ")));
        assert!(!trigger.should_run("create a login page", None));
    }
}
