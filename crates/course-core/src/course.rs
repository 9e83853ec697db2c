//! # Course Catalog
//!
//! Course listing types for coursecart.
//! Courses are loaded from `config/courses.toml`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A course in the catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    /// Unique course identifier (e.g., "crypto-fundamentals")
    pub id: String,

    /// Display title
    pub title: String,

    /// Short description
    pub description: String,

    /// Price in `currency`
    pub price: Decimal,

    /// Currency code (lowercase, defaults to "usd")
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Difficulty level (e.g., "Beginner")
    #[serde(default)]
    pub level: Option<String>,

    /// Course duration (e.g., "4 weeks")
    #[serde(default)]
    pub duration: Option<String>,

    /// Whether this course is available for purchase
    #[serde(default = "default_true")]
    pub active: bool,

    /// Optional cover image URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

fn default_currency() -> String {
    "usd".to_string()
}

fn default_true() -> bool {
    true
}

impl Course {
    /// Create a new active course
    pub fn new(id: impl Into<String>, title: impl Into<String>, price: Decimal) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            price,
            currency: default_currency(),
            level: None,
            duration: None,
            active: true,
            image_url: None,
        }
    }

    /// Builder: set description
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    /// Builder: set difficulty level
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = Some(level.into());
        self
    }

    /// Builder: set duration
    pub fn with_duration(mut self, duration: impl Into<String>) -> Self {
        self.duration = Some(duration.into());
        self
    }
}

/// Course catalog (loaded from config)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CourseCatalog {
    pub courses: Vec<Course>,
}

impl CourseCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self {
            courses: Vec::new(),
        }
    }

    /// Add a course to the catalog
    pub fn add(&mut self, course: Course) {
        self.courses.push(course);
    }

    /// Find a course by ID
    pub fn get(&self, id: &str) -> Option<&Course> {
        self.courses.iter().find(|c| c.id == id)
    }

    /// Get all active courses
    pub fn active_courses(&self) -> impl Iterator<Item = &Course> {
        self.courses.iter().filter(|c| c.active)
    }

    /// Load catalog from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_course_builder() {
        let course = Course::new("crypto-fundamentals", "Crypto Fundamentals", dec!(90.00))
            .with_description("Learn the basics of blockchain, wallets, and transactions.")
            .with_level("Beginner")
            .with_duration("4 weeks");

        assert_eq!(course.id, "crypto-fundamentals");
        assert_eq!(course.currency, "usd");
        assert!(course.active);
        assert_eq!(course.level.as_deref(), Some("Beginner"));
    }

    #[test]
    fn test_catalog_lookup() {
        let mut catalog = CourseCatalog::new();
        catalog.add(Course::new("a", "Course A", dec!(10)));
        let mut inactive = Course::new("b", "Course B", dec!(20));
        inactive.active = false;
        catalog.add(inactive);

        assert!(catalog.get("a").is_some());
        assert!(catalog.get("missing").is_none());
        assert_eq!(catalog.active_courses().count(), 1);
    }

    #[test]
    fn test_catalog_from_toml() {
        let toml_str = r#"
            [[courses]]
            id = "starter-park"
            title = "Starter Park"
            description = "Crypto course"
            price = "90.00"
            level = "Beginner"
            duration = "4 weeks"
        "#;

        let catalog = CourseCatalog::from_toml(toml_str).unwrap();
        let course = catalog.get("starter-park").unwrap();
        assert_eq!(course.price, dec!(90.00));
        assert_eq!(course.currency, "usd");
    }
}
